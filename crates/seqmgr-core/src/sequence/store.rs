//! Sled-backed sequence store.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sled::{Db, Tree};
use uuid::Uuid;

use super::model::{CreateSequence, Sequence, FIELD_TABLE_OID, MSG_TAKEN};
use super::repository::SequenceRepository;
use crate::error::{EntityKind, Error, FieldErrors, Result};

/// Tree name for sequence records.
const SEQUENCE_TREE: &str = "sequences:data";

/// Tree name for the (account, database, table) uniqueness index.
const TABLE_INDEX_TREE: &str = "index:sequence_table";

/// Sequence store on top of sled.
///
/// Record key: `account_id ++ sequence_id` -> JSON record.
/// Index key: `account_id ++ database_id ++ table_oid (be)` -> `sequence_id`.
pub struct SequenceStore {
    /// Keeps the sled handle alive for the trees.
    db: Db,
    records: Tree,
    table_index: Tree,
}

impl SequenceStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a store that is discarded when dropped.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    /// Create a store over an existing sled database.
    pub fn from_db(db: Db) -> Result<Self> {
        let records = db.open_tree(SEQUENCE_TREE)?;
        let table_index = db.open_tree(TABLE_INDEX_TREE)?;
        Ok(Self {
            db,
            records,
            table_index,
        })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<()> {
        self.records.flush()?;
        self.table_index.flush()?;
        Ok(())
    }

    fn record_key(account_id: Uuid, sequence_id: Uuid) -> Vec<u8> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(account_id.as_bytes());
        key.extend_from_slice(sequence_id.as_bytes());
        key
    }

    fn index_key(account_id: Uuid, database_id: Uuid, table_oid: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(36);
        key.extend_from_slice(account_id.as_bytes());
        key.extend_from_slice(database_id.as_bytes());
        key.extend_from_slice(&table_oid.to_be_bytes());
        key
    }

    fn decode(bytes: &[u8]) -> Result<Sequence> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn check(&self, account_id: Uuid, params: &CreateSequence) -> Result<()> {
        let fields = params.require()?;
        let key = Self::index_key(account_id, fields.postgres_database_id, fields.table_oid);
        if self.table_index.contains_key(key)? {
            return Err(Error::FieldValidation(FieldErrors::single(
                FIELD_TABLE_OID,
                MSG_TAKEN,
            )));
        }
        Ok(())
    }

    fn insert(&self, account_id: Uuid, params: &CreateSequence) -> Result<Sequence> {
        let fields = params.require()?;
        let now = Utc::now();
        let sequence = Sequence {
            id: Uuid::new_v4(),
            account_id,
            postgres_database_id: fields.postgres_database_id,
            table_oid: fields.table_oid,
            sort_column_attnum: fields.sort_column_attnum,
            table_schema: None,
            table_name: None,
            sort_column_name: None,
            inserted_at: now,
            updated_at: now,
        };

        // Claim the table binding first so concurrent creates cannot both win.
        let index_key = Self::index_key(account_id, fields.postgres_database_id, fields.table_oid);
        let claimed = self.table_index.compare_and_swap(
            &index_key,
            None as Option<&[u8]>,
            Some(sequence.id.as_bytes().to_vec()),
        )?;
        if claimed.is_err() {
            return Err(Error::FieldValidation(FieldErrors::single(
                FIELD_TABLE_OID,
                MSG_TAKEN,
            )));
        }

        let value = serde_json::to_vec(&sequence)?;
        if let Err(e) = self
            .records
            .insert(Self::record_key(account_id, sequence.id), value)
        {
            self.table_index.remove(&index_key)?;
            return Err(e.into());
        }

        Ok(sequence)
    }

    fn load(&self, account_id: Uuid, sequence_id: Uuid) -> Result<Sequence> {
        match self.records.get(Self::record_key(account_id, sequence_id))? {
            Some(bytes) => Self::decode(&bytes),
            None => Err(Error::NotFound(EntityKind::Sequence)),
        }
    }

    fn scan(&self, account_id: Uuid) -> Result<Vec<Sequence>> {
        let mut sequences = Vec::new();
        for entry in self.records.scan_prefix(account_id.as_bytes()) {
            let (_, bytes) = entry?;
            sequences.push(Self::decode(&bytes)?);
        }
        sequences.sort_by(|a, b| a.inserted_at.cmp(&b.inserted_at).then(a.id.cmp(&b.id)));
        Ok(sequences)
    }

    fn overwrite(&self, sequence: &Sequence) -> Result<Sequence> {
        let existing = self.load(sequence.account_id, sequence.id)?;
        if existing.postgres_database_id != sequence.postgres_database_id
            || existing.table_oid != sequence.table_oid
        {
            return Err(Error::CallerInvariant(format!(
                "sequence {} cannot be rebound to another table",
                sequence.id
            )));
        }

        let mut updated = sequence.clone();
        updated.inserted_at = existing.inserted_at;
        updated.updated_at = Utc::now();
        let value = serde_json::to_vec(&updated)?;
        self.records
            .insert(Self::record_key(updated.account_id, updated.id), value)?;
        Ok(updated)
    }

    fn remove(&self, sequence: &Sequence) -> Result<Sequence> {
        let removed = self
            .records
            .remove(Self::record_key(sequence.account_id, sequence.id))?
            .ok_or(Error::NotFound(EntityKind::Sequence))?;
        let removed = Self::decode(&removed)?;
        self.table_index.remove(Self::index_key(
            removed.account_id,
            removed.postgres_database_id,
            removed.table_oid,
        ))?;
        Ok(removed)
    }
}

#[async_trait]
impl SequenceRepository for SequenceStore {
    async fn validate(&self, account_id: Uuid, params: &CreateSequence) -> Result<()> {
        self.check(account_id, params)
    }

    async fn create(&self, account_id: Uuid, params: &CreateSequence) -> Result<Sequence> {
        let sequence = self.insert(account_id, params)?;
        tracing::debug!(
            sequence_id = %sequence.id,
            table_oid = sequence.table_oid,
            "sequence record stored"
        );
        Ok(sequence)
    }

    async fn get(&self, account_id: Uuid, sequence_id: Uuid) -> Result<Sequence> {
        self.load(account_id, sequence_id)
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Sequence>> {
        self.scan(account_id)
    }

    async fn update(&self, sequence: &Sequence) -> Result<Sequence> {
        self.overwrite(sequence)
    }

    async fn delete(&self, sequence: &Sequence) -> Result<Sequence> {
        self.remove(sequence)
    }
}
