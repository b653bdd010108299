//! Catalog API routes

use axum::Router;
use domain_catalog::{
    handlers, CatalogService, InMemoryCatalogRepository, MongoCatalogRepository,
};
use tracing::info;

use crate::state::{AppState, MongoState};

fn mongo_repository(mongo: &MongoState) -> MongoCatalogRepository {
    MongoCatalogRepository::new(mongo.client.clone(), &mongo.db)
}

/// Create the catalog router on whichever store the state carries
pub fn router(state: &AppState) -> Router {
    let settings = state.config.catalog.clone();

    match &state.mongo {
        Some(mongo) => {
            handlers::router(CatalogService::with_settings(mongo_repository(mongo), settings))
        }
        None => handlers::router(CatalogService::with_settings(
            InMemoryCatalogRepository::new(),
            settings,
        )),
    }
}

/// Create indexes and seed the id counters from stored products
pub async fn init_storage(state: &AppState) -> eyre::Result<()> {
    let Some(mongo) = &state.mongo else {
        info!("Using in-memory catalog store, nothing to initialize");
        return Ok(());
    };

    let repository = mongo_repository(mongo);
    repository.init_indexes().await?;
    repository.init_counters().await?;
    Ok(())
}
