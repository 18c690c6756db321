//! Builds a sync engine from the config file.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use anycal_core::{AnycalConfig, EngineConfig, MemoryStore, ProviderKind, SyncEngine};
use anycal_provider_ghl::GhlProvider;
use anycal_provider_goujana::GoujanaProvider;
use anycal_provider_hubspot::HubspotProvider;

pub fn build(config_path: Option<&Path>) -> Result<SyncEngine> {
    let config = match config_path {
        Some(path) => AnycalConfig::load(path)?,
        None => AnycalConfig::load_default()?,
    };

    let mut engine = SyncEngine::new(Arc::new(MemoryStore::new()), EngineConfig::default());
    engine.register_provider(ProviderKind::Hubspot, Arc::new(HubspotProvider::new()));
    engine.register_provider(ProviderKind::Ghl, Arc::new(GhlProvider::new()));
    engine.register_provider(ProviderKind::Goujana, Arc::new(GoujanaProvider::new()));

    for link in config.links {
        let (link, credential) = link.into_parts();
        engine.add_link(link, Some(credential));
    }

    Ok(engine)
}
