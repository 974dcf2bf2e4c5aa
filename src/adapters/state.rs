use std::sync::Arc;

use crate::application::services::DocumentStore;

/// `store` is `None` when the Graph settings were incomplete at startup; the
/// service still answers diagnostics and preflight, and every upload attempt
/// reports the configuration error.
#[derive(Clone)]
pub struct AppState {
    pub store: Option<Arc<dyn DocumentStore>>,
}
