//! Configuration for Catalog API

use core_config::{app_info, server::ServerConfig, AppInfo, FromEnv};
use database::mongodb::MongoConfig;
use domain_catalog::{CatalogSettings, StoreKind};

pub use core_config::Environment;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub catalog: CatalogSettings,
    /// Present only when the catalog is backed by MongoDB
    pub mongodb: Option<MongoConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?;
        let catalog = CatalogSettings::from_env()?;

        let mongodb = match catalog.store {
            StoreKind::Mongodb => {
                let mongodb = MongoConfig::from_env()?;
                Some(match mongodb.app_name {
                    Some(_) => mongodb,
                    None => mongodb.with_app_name(env!("CARGO_PKG_NAME")),
                })
            }
            StoreKind::Memory => None,
        };

        Ok(Self {
            app: app_info!(),
            server,
            environment,
            catalog,
            mongodb,
        })
    }
}
