//! Catalog Domain
//!
//! Books, the categories they are grouped into, and the id allocation that
//! keeps both consistent under concurrent writers.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints, {message, data} envelope
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Validation, category rules, id retry
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐     ┌───────────────┐
//! │ Repository  │ ──▶ │ CategoryIndex │  ← derived from stored products
//! └──────┬──────┘     └───────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Product, inputs, id sequences
//! └─────────────┘
//! ```
//!
//! Categories are not stored on their own. An empty category is kept alive by
//! a placeholder product whose id is zero or negative; real books have
//! positive ids.
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_catalog::{handlers, CatalogService, MongoCatalogRepository};
//! use mongodb::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::with_uri_str("mongodb://localhost:27017/?replicaSet=rs0").await?;
//! let db = client.database("bookstore");
//!
//! let repository = MongoCatalogRepository::new(client.clone(), &db);
//! repository.init_indexes().await?;
//! repository.init_counters().await?;
//!
//! let router = handlers::router(CatalogService::new(repository));
//! # Ok(())
//! # }
//! ```

pub mod allocator;
pub mod category_index;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;
pub mod settings;

// Re-export commonly used types
pub use error::{CatalogError, CatalogResult};
pub use handlers::ApiDoc;
pub use memory::InMemoryCatalogRepository;
pub use models::{
    ApiResponse, CategoryChange, CreateCategory, FeaturedFlag, IdKind, Product, ProductChanges,
    ProductInput, ProductScope, RenameCategory,
};
pub use mongodb::MongoCatalogRepository;
pub use repository::CatalogRepository;
pub use service::CatalogService;
pub use settings::{CatalogSettings, CategoryMergePolicy, FlagPolicy, StoreKind};
