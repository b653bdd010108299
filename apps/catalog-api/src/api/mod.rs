//! API routes module

pub mod catalog;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Create all API routes, mounted under `/api` by the router builder
pub fn routes(state: &AppState) -> Router {
    catalog::router(state)
}

/// Prepare storage before the first request is served
pub async fn init_storage(state: &AppState) -> eyre::Result<()> {
    catalog::init_storage(state).await
}
