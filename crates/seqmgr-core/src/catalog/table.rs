//! Table and column definitions mirrored from a source database.

use serde::{Deserialize, Serialize};

/// A table in a source database's catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Postgres `pg_class.oid` of the table.
    pub oid: u32,
    /// Schema (namespace) name.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns ordered by `attnum`.
    #[serde(default)]
    pub columns: Vec<Column>,
}

/// A column of a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Postgres `pg_attribute.attnum`, stable across renames.
    pub attnum: i16,
    /// Column name.
    pub name: String,
    /// Formatted column type (e.g. `timestamp with time zone`).
    #[serde(rename = "type")]
    pub column_type: String,
}

impl Table {
    /// Create a new table definition without columns.
    pub fn new(oid: u32, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            oid,
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column to the table, keeping columns ordered by `attnum`.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self.columns.sort_by_key(|c| c.attnum);
        self
    }

    /// Add multiple columns.
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self.columns.sort_by_key(|c| c.attnum);
        self
    }

    /// Get a column by its `attnum`.
    pub fn column(&self, attnum: i16) -> Option<&Column> {
        self.columns.iter().find(|c| c.attnum == attnum)
    }

    /// Schema-qualified, quoted name suitable for SQL.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

impl Column {
    /// Create a new column definition.
    pub fn new(attnum: i16, name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            attnum,
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Quote a Postgres identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_sorted_by_attnum() {
        let table = Table::new(100, "public", "users")
            .with_column(Column::new(3, "created_at", "timestamp"))
            .with_column(Column::new(1, "id", "bigint"))
            .with_column(Column::new(2, "email", "text"));

        let attnums: Vec<i16> = table.columns.iter().map(|c| c.attnum).collect();
        assert_eq!(attnums, vec![1, 2, 3]);
        assert_eq!(table.column(3).unwrap().name, "created_at");
        assert!(table.column(9).is_none());
    }

    #[test]
    fn test_qualified_name_quotes() {
        let table = Table::new(1, "Sales", "order \"items\"");
        assert_eq!(table.qualified_name(), "\"Sales\".\"order \"\"items\"\"\"");
    }

    #[test]
    fn test_column_type_serializes_as_type() {
        let json = serde_json::to_value(Column::new(1, "id", "uuid")).unwrap();
        assert_eq!(json["type"], "uuid");
        assert_eq!(json["attnum"], 1);
    }
}
