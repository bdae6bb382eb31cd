use std::sync::Arc;

use crate::config::Config;
use crate::offer::templates::TemplateCatalog;
use crate::store::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Built once in `main`; the store is shut down there after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub templates: TemplateCatalog,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn RecordStore>) -> Self {
        let templates = TemplateCatalog::new(config.templates_dir.clone());
        Self {
            config,
            store,
            templates,
        }
    }
}
