use std::sync::Arc;
use tollgate_engine::TokenEngine;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    engine: Arc<TokenEngine>,
}

impl AppState {
    pub fn new(engine: Arc<TokenEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &TokenEngine {
        &self.engine
    }
}
