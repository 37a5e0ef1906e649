use std::sync::Arc;

use crate::interview::manager::SessionManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The single interview session. Every handler goes through it.
    pub session: Arc<SessionManager>,
}
