use crate::config::StudioConfig;
use crate::error::Result;
use crate::seed::Seed;
use crate::session::SessionManager;
use seqmgr_core::{
    MemoryCatalog, MemoryConsumers, SequenceStore, Services, StaticPublicationVerifier,
};
use std::sync::Arc;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub config: StudioConfig,
}

impl AppState {
    pub fn new(config: StudioConfig, services: Services) -> Self {
        Self {
            sessions: Arc::new(SessionManager::new(config.clone(), services)),
            config,
        }
    }

    /// Open the sequence store, load the seed and wire the collaborators.
    pub fn from_config(config: StudioConfig) -> Result<Self> {
        let seed = match &config.seed {
            Some(path) => Seed::load(path)?,
            None => Seed::demo(),
        };
        let services = build_services(&config, &seed)?;
        Ok(Self::new(config, services))
    }
}

fn open_store(config: &StudioConfig) -> Result<SequenceStore> {
    let store = match &config.data_dir {
        Some(dir) => SequenceStore::open(dir)?,
        None => SequenceStore::temporary()?,
    };
    if store.was_recovered() {
        tracing::info!(data_dir = ?config.data_dir, "reopened existing sequence store");
    }
    Ok(store)
}

#[cfg(not(feature = "postgres"))]
fn build_services(config: &StudioConfig, seed: &Seed) -> Result<Services> {
    memory_services(config, seed)
}

#[cfg(feature = "postgres")]
fn build_services(config: &StudioConfig, seed: &Seed) -> Result<Services> {
    if config.live_publication_check {
        live_services(config, seed)
    } else {
        memory_services(config, seed)
    }
}

fn memory_services(config: &StudioConfig, seed: &Seed) -> Result<Services> {
    let catalog = Arc::new(MemoryCatalog::new());
    let verifier = Arc::new(StaticPublicationVerifier::new());
    let consumers = Arc::new(MemoryConsumers::new());
    seed.apply(&catalog, &verifier, &consumers);

    Ok(Services {
        repository: Arc::new(open_store(config)?),
        catalog,
        verifier,
        consumers,
    })
}

#[cfg(feature = "postgres")]
fn live_services(config: &StudioConfig, seed: &Seed) -> Result<Services> {
    use crate::error::StudioError;
    use seqmgr_core::postgres::{PgCatalogMirror, PgPublicationVerifier, SourcePools};

    let pools = Arc::new(SourcePools::new());
    let catalog = Arc::new(PgCatalogMirror::new(pools.clone()));
    for seeded in &seed.databases {
        let url = seeded.url.as_deref().ok_or_else(|| {
            StudioError::Seed(format!(
                "database {} has no url for live checks",
                seeded.database.name
            ))
        })?;
        pools.connect_lazy(seeded.database.id, url)?;
        catalog.register(seeded.database.clone());
    }

    let consumers = Arc::new(MemoryConsumers::with_consumers(seed.consumers.clone()));
    tracing::info!(databases = seed.databases.len(), "live publication checks enabled");

    Ok(Services {
        repository: Arc::new(open_store(config)?),
        catalog,
        verifier: Arc::new(PgPublicationVerifier::new(pools)),
        consumers,
    })
}
