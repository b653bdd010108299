//! Application state management

use mongodb::{Client, Database};

/// Live MongoDB handles
#[derive(Clone)]
pub struct MongoState {
    pub client: Client,
    pub db: Database,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// `None` when running on the in-memory store
    pub mongo: Option<MongoState>,
}
