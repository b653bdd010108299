//! Catalog API - bookstore catalog and category management server

use axum_helpers::server::{create_production_app, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_catalog::StoreKind;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::{AppState, MongoState};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let mongo = match (&config.catalog.store, &config.mongodb) {
        (StoreKind::Mongodb, Some(mongodb)) => {
            info!("Connecting to MongoDB at {}", mongodb.redacted_url());

            let client = database::mongodb::connect_from_config_with_retry(mongodb, None).await?;
            let db = client.database(mongodb.database());

            info!(
                "Successfully connected to MongoDB database: {}",
                mongodb.database()
            );
            Some(MongoState { client, db })
        }
        (StoreKind::Mongodb, None) => {
            return Err(eyre::eyre!("MongoDB store selected without MongoDB configuration"));
        }
        (StoreKind::Memory, _) => {
            info!("Using in-memory catalog store; data is lost on restart");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        mongo,
    };

    api::init_storage(&state).await?;

    let api_routes = api::routes(&state);
    let router = axum_helpers::create_router::<openapi::ApiDoc>(api_routes).await?;
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::health::router(state.clone()));

    info!(
        store = %state.config.catalog.store,
        "Starting Catalog API on port {}",
        state.config.server.port
    );

    create_production_app(
        app,
        &state.config.server,
        Duration::from_secs(30),
        async move {
            if let Some(mongo) = state.mongo {
                info!("Shutting down: closing MongoDB connections");
                mongo.client.shutdown().await;
                info!("MongoDB connection closed");
            }
        },
    )
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Catalog API shutdown complete");
    Ok(())
}
