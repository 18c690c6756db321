use std::sync::Arc;

use anyhow::Result;

use anycal_core::{AnycalConfig, EngineConfig, MemoryStore, ProviderKind, SyncEngine};
use anycal_provider_ghl::GhlProvider;
use anycal_provider_goujana::GoujanaProvider;
use anycal_provider_hubspot::HubspotProvider;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    engine: Arc<SyncEngine>,
}

impl AppState {
    pub fn new() -> Result<Self> {
        let config = AnycalConfig::load_default()?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: AnycalConfig) -> Self {
        let mut engine = SyncEngine::new(Arc::new(MemoryStore::new()), EngineConfig::default());
        engine.register_provider(ProviderKind::Hubspot, Arc::new(HubspotProvider::new()));
        engine.register_provider(ProviderKind::Ghl, Arc::new(GhlProvider::new()));
        engine.register_provider(ProviderKind::Goujana, Arc::new(GoujanaProvider::new()));

        for link in config.links {
            let (link, credential) = link.into_parts();
            engine.add_link(link, Some(credential));
        }

        AppState { engine: Arc::new(engine) }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Owned handle for work that must outlive the request.
    pub fn engine_handle(&self) -> Arc<SyncEngine> {
        self.engine.clone()
    }
}
