use std::sync::Arc;

use crate::engine::EngineCell;
use crate::store::{Catalog, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionStore>,
    pub engine: EngineCell,
}

impl AppState {
    pub fn new(catalog: Catalog, engine: EngineCell) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions: Arc::new(SessionStore::new()),
            engine,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Catalog::empty(), EngineCell::new())
    }
}
