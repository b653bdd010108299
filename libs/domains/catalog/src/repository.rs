use async_trait::async_trait;

use crate::error::CatalogResult;
use crate::models::{FeaturedFlag, IdKind, Product, ProductChanges, ProductScope};
use crate::settings::CategoryMergePolicy;

/// Persistence interface for the catalog.
///
/// Listings come back ordered by `productId` ascending. Bulk category writes
/// are all-or-nothing and report how many records they touched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Get a product by its catalog id
    async fn find_by_id(&self, product_id: i64) -> CatalogResult<Option<Product>>;

    /// List products within `scope`
    async fn find_all(&self, scope: ProductScope) -> CatalogResult<Vec<Product>>;

    /// List products of one category within `scope`
    async fn find_by_category(
        &self,
        category: &str,
        scope: ProductScope,
    ) -> CatalogResult<Vec<Product>>;

    /// List real products carrying `flag`
    async fn find_flagged(&self, flag: FeaturedFlag) -> CatalogResult<Vec<Product>>;

    /// Store a new product; fails with `DuplicateId` if the id is taken
    async fn insert(&self, product: Product) -> CatalogResult<Product>;

    /// Store a category placeholder unless its category already holds records.
    ///
    /// The check and the insert are one atomic step: of two concurrent calls
    /// for the same category at most one succeeds, the other gets `Conflict`.
    /// Fails with `DuplicateId` if the id is taken.
    async fn insert_placeholder(&self, placeholder: Product) -> CatalogResult<Product>;

    /// Apply `changes` to an existing product
    async fn update_by_id(&self, product_id: i64, changes: ProductChanges)
        -> CatalogResult<Product>;

    /// Remove a single product
    async fn delete_by_id(&self, product_id: i64) -> CatalogResult<()>;

    /// Move every product of `current` into `updated`.
    ///
    /// With [`CategoryMergePolicy::Reject`] the move fails with `Conflict` when
    /// `updated` already holds records, checked atomically with the write.
    async fn update_where_category(
        &self,
        current: &str,
        updated: &str,
        merge: CategoryMergePolicy,
    ) -> CatalogResult<u64>;

    /// Remove every product of `category`
    async fn delete_where_category(&self, category: &str) -> CatalogResult<u64>;

    /// Distinct category names across all products, placeholders included
    async fn distinct_categories(&self) -> CatalogResult<Vec<String>>;

    /// Atomically allocate the next id of `kind`
    async fn allocate_id(&self, kind: IdKind) -> CatalogResult<i64>;

    /// Re-seed the `kind` counter from the ids currently stored
    async fn resync_ids(&self, kind: IdKind) -> CatalogResult<()>;
}
