//! Integration tests for the sequence workflow over a sled-backed store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use seqmgr_core::{
    frequencies, Column, Consumer, CreateSequence, EntityKind, Error, Event, EventOutcome,
    MemoryCatalog, MemoryConsumers, NotificationKind, Phase, PostgresDatabase, PublicationVerifier,
    ReplicationSlot, Result, Sequence, SequenceForm, SequenceRepository, SequenceStore,
    SequenceWorkflow, Services, StaticPublicationVerifier, Table, WorkflowConfig,
};

/// Verifier that records how often it is asked.
struct CountingVerifier {
    inner: StaticPublicationVerifier,
    calls: AtomicUsize,
}

#[async_trait]
impl PublicationVerifier for CountingVerifier {
    async fn verify_table_in_publication(
        &self,
        database: &PostgresDatabase,
        table_oid: u32,
    ) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify_table_in_publication(database, table_oid).await
    }
}

/// Repository that records calls and can be told to fail deletes.
struct InstrumentedStore {
    inner: SequenceStore,
    calls: AtomicUsize,
    fail_delete: AtomicBool,
}

impl InstrumentedStore {
    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SequenceRepository for InstrumentedStore {
    async fn validate(&self, account_id: Uuid, params: &CreateSequence) -> Result<()> {
        self.touch();
        self.inner.validate(account_id, params).await
    }

    async fn create(&self, account_id: Uuid, params: &CreateSequence) -> Result<Sequence> {
        self.touch();
        self.inner.create(account_id, params).await
    }

    async fn get(&self, account_id: Uuid, sequence_id: Uuid) -> Result<Sequence> {
        self.inner.get(account_id, sequence_id).await
    }

    async fn list(&self, account_id: Uuid) -> Result<Vec<Sequence>> {
        self.inner.list(account_id).await
    }

    async fn update(&self, sequence: &Sequence) -> Result<Sequence> {
        self.touch();
        self.inner.update(sequence).await
    }

    async fn delete(&self, sequence: &Sequence) -> Result<Sequence> {
        self.touch();
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Error::Other("delete rejected by source".into()));
        }
        self.inner.delete(sequence).await
    }
}

struct TestContext {
    account: Uuid,
    database: PostgresDatabase,
    catalog: Arc<MemoryCatalog>,
    verifier: Arc<CountingVerifier>,
    store: Arc<InstrumentedStore>,
    consumers: Arc<MemoryConsumers>,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let account = Uuid::new_v4();

        let database = PostgresDatabase::new(account, "warehouse")
            .with_replication_slot(ReplicationSlot::new("slot1", "pub1"))
            .with_table(
                Table::new(100, "public", "audit_log")
                    .with_column(Column::new(1, "created_at", "timestamp with time zone")),
            )
            .with_table(Table::new(200, "public", "orders").with_columns([
                Column::new(2, "id", "bigint"),
                Column::new(1, "created_at", "timestamp with time zone"),
            ]));

        let inner = StaticPublicationVerifier::new();
        inner.add_table("pub1", 200);

        Self {
            account,
            catalog: Arc::new(MemoryCatalog::with_databases([database.clone()])),
            database,
            verifier: Arc::new(CountingVerifier {
                inner,
                calls: AtomicUsize::new(0),
            }),
            store: Arc::new(InstrumentedStore {
                inner: SequenceStore::open(dir.path()).unwrap(),
                calls: AtomicUsize::new(0),
                fail_delete: AtomicBool::new(false),
            }),
            consumers: Arc::new(MemoryConsumers::new()),
            _dir: dir,
        }
    }

    fn services(&self) -> Services {
        Services {
            repository: self.store.clone(),
            catalog: self.catalog.clone(),
            verifier: self.verifier.clone(),
            consumers: self.consumers.clone(),
        }
    }

    async fn workflow(&self) -> SequenceWorkflow {
        SequenceWorkflow::mount(self.account, self.services(), WorkflowConfig::default())
            .await
            .unwrap()
    }

    async fn persisted(&self) -> Vec<Sequence> {
        self.store.list(self.account).await.unwrap()
    }

    async fn create_orders_sequence(&self, workflow: &mut SequenceWorkflow) -> Uuid {
        workflow
            .handle(Event::FormSubmitted {
                form: SequenceForm::new(self.database.id, 200, 1),
            })
            .await
            .unwrap();
        workflow.take_notifications();
        workflow.sequences()[0].id
    }
}

#[tokio::test]
async fn test_table_outside_publication_is_rejected() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    workflow.handle(Event::NewSequence).await.unwrap();

    let outcome = workflow
        .handle(Event::FormSubmitted {
            form: SequenceForm::new(ctx.database.id, 100, 1),
        })
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Applied);
    assert_eq!(workflow.phase(), Phase::Drafting);
    let view = workflow.view();
    let form = view.form.unwrap();
    assert!(form.submit_error.unwrap().contains("pub1"));
    assert!(ctx.persisted().await.is_empty());
}

#[tokio::test]
async fn test_table_in_publication_is_created_and_enriched() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    workflow.handle(Event::NewSequence).await.unwrap();

    workflow
        .handle(Event::FormSubmitted {
            form: SequenceForm::new(ctx.database.id, 200, 1),
        })
        .await
        .unwrap();

    let persisted = ctx.persisted().await;
    assert_eq!(persisted.len(), 1);
    let sequence = &persisted[0];
    assert_eq!(sequence.table_oid, 200);
    assert_eq!(sequence.table_schema.as_deref(), Some("public"));
    assert_eq!(sequence.table_name.as_deref(), Some("orders"));
    assert_eq!(sequence.sort_column_name.as_deref(), Some("created_at"));
    assert!(sequence.is_enriched());

    let view = workflow.view();
    assert_eq!(view.phase, Phase::Listing);
    assert!(view.form.is_none());
    assert_eq!(view.sequences[0].postgres_database.name, "warehouse");
    assert_eq!(view.sequences[0].consumer_count, 0);
}

#[tokio::test]
async fn test_missing_database_never_reaches_collaborators() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    let before = ctx.store.calls.load(Ordering::SeqCst);

    let form = SequenceForm::new(ctx.database.id, 200, 1).with_database_id(None);
    workflow
        .handle(Event::FormSubmitted { form })
        .await
        .unwrap();

    assert_eq!(ctx.verifier.calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.store.calls.load(Ordering::SeqCst), before);
    let form = workflow.view().form.unwrap();
    assert!(form.errors.has("postgres_database_id"));
    assert!(form.submit_error.is_none());
}

#[tokio::test]
async fn test_frequencies_match_consumer_references() {
    let ctx = TestContext::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let consumers = vec![
        Consumer::new(ctx.account, "one", Some(a)),
        Consumer::new(ctx.account, "two", Some(a)),
        Consumer::new(ctx.account, "three", Some(b)),
        Consumer::new(ctx.account, "four", None),
    ];

    let counts = frequencies(&consumers);
    for id in [a, b, Uuid::new_v4()] {
        let expected = consumers
            .iter()
            .filter(|c| c.sequence_id == Some(id))
            .count();
        assert_eq!(counts.get(&id).copied().unwrap_or(0), expected);
    }
    assert_eq!(counts.len(), 2);
}

#[tokio::test]
async fn test_listing_reports_consumer_counts() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    let id = ctx.create_orders_sequence(&mut workflow).await;

    ctx.consumers.insert(Consumer::new(ctx.account, "mirror", Some(id)));
    ctx.consumers.insert(Consumer::new(ctx.account, "webhook", Some(id)));
    workflow.load_sequences().await.unwrap();

    assert_eq!(workflow.view().sequences[0].consumer_count, 2);
}

#[tokio::test]
async fn test_delete_missing_sequence_keeps_listing() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    ctx.create_orders_sequence(&mut workflow).await;
    let before = workflow.view().sequences;

    workflow
        .handle(Event::DeleteSequence {
            id: Uuid::new_v4().to_string(),
        })
        .await
        .unwrap();

    let notifications = workflow.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert_eq!(workflow.view().sequences, before);
}

#[tokio::test]
async fn test_delete_removes_from_listing() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    let id = ctx.create_orders_sequence(&mut workflow).await;

    workflow
        .handle(Event::DeleteSequence { id: id.to_string() })
        .await
        .unwrap();

    assert!(ctx.persisted().await.is_empty());
    assert!(workflow.sequences().is_empty());
    let err = ctx.store.get(ctx.account, id).await.unwrap_err();
    assert!(err.is_not_found(EntityKind::Sequence));
}

#[tokio::test]
async fn test_failed_delete_keeps_listing() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    let id = ctx.create_orders_sequence(&mut workflow).await;
    ctx.store.fail_delete.store(true, Ordering::SeqCst);

    workflow
        .handle(Event::DeleteSequence { id: id.to_string() })
        .await
        .unwrap();

    let notifications = workflow.take_notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind, NotificationKind::Error);
    assert!(notifications[0].message.contains("delete rejected"));
    assert_eq!(workflow.sequences().len(), 1);
    assert_eq!(ctx.persisted().await.len(), 1);
}

#[tokio::test]
async fn test_refresh_tables_unknown_database_keeps_cache() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    let before = workflow.databases().to_vec();

    let outcome = workflow
        .handle(Event::RefreshTables {
            database_id: Uuid::new_v4().to_string(),
        })
        .await
        .unwrap();

    assert!(matches!(outcome, EventOutcome::RefreshFailed(_)));
    assert_eq!(workflow.databases(), before.as_slice());
}

#[tokio::test]
async fn test_refresh_tables_picks_up_new_columns() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;

    ctx.catalog
        .set_tables(
            ctx.database.id,
            vec![Table::new(300, "sales", "invoices")
                .with_column(Column::new(1, "issued_at", "date"))],
        )
        .unwrap();

    let outcome = workflow
        .handle(Event::RefreshTables {
            database_id: ctx.database.id.to_string(),
        })
        .await
        .unwrap();

    assert_eq!(outcome, EventOutcome::Applied);
    let tables = &workflow.databases()[0].tables;
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].qualified_name(), "\"sales\".\"invoices\"");
}

#[tokio::test]
async fn test_refresh_databases_replaces_cache() {
    let ctx = TestContext::new();
    let mut workflow = ctx.workflow().await;
    ctx.catalog.remove(ctx.database.id);

    workflow.handle(Event::RefreshDatabases).await.unwrap();
    assert!(workflow.databases().is_empty());

    ctx.catalog.insert(ctx.database.clone());
    workflow.refresh_databases().await.unwrap();
    assert_eq!(workflow.databases().len(), 1);
}

#[tokio::test]
async fn test_sequences_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let account = Uuid::new_v4();
    let database_id = Uuid::new_v4();
    let created = {
        let store = SequenceStore::open(dir.path()).unwrap();
        let sequence = store
            .create(account, &CreateSequence::new(database_id, 200, 1))
            .await
            .unwrap();
        store.flush().unwrap();
        sequence
    };

    let store = SequenceStore::open(dir.path()).unwrap();
    assert!(store.was_recovered());
    let reloaded = store.get(account, created.id).await.unwrap();
    assert_eq!(reloaded, created);

    let err = store
        .create(account, &CreateSequence::new(database_id, 200, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FieldValidation(ref errors) if errors.has("table_oid")));
}
