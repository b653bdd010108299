//! In-process implementation of CatalogRepository
//!
//! Backs tests and `CATALOG_STORE=memory` local runs. Bulk category writes
//! hold the write lock for their whole duration, so readers see either the
//! state before or after, never a mix.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::allocator::{counter_seed, IdSequence};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{FeaturedFlag, IdKind, Product, ProductChanges, ProductScope};
use crate::repository::CatalogRepository;
use crate::settings::CategoryMergePolicy;

#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    products: RwLock<BTreeMap<i64, Product>>,
    ids: IdSequence,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing records, seeding both id sequences past them.
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products: BTreeMap<i64, Product> = products
            .into_iter()
            .map(|product| (product.product_id, product))
            .collect();
        let ids = IdSequence::new();
        Self::seed_from(&ids, &products, IdKind::Real);
        Self::seed_from(&ids, &products, IdKind::Placeholder);

        Self {
            products: RwLock::new(products),
            ids,
        }
    }

    /// Store a record directly, bypassing the id sequence.
    ///
    /// Mirrors a write made by an external tool; the next allocation may
    /// collide with it.
    pub async fn insert_raw(&self, product: Product) {
        self.products
            .write()
            .await
            .insert(product.product_id, product);
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }

    fn seed_from(ids: &IdSequence, products: &BTreeMap<i64, Product>, kind: IdKind) {
        let max = products.keys().next_back().copied();
        let min = products.keys().next().copied();
        ids.seed(kind, counter_seed(kind, max, min));
    }

    fn holds_category(products: &BTreeMap<i64, Product>, category: &str) -> bool {
        products.values().any(|p| p.category == category)
    }

    fn collect<'a>(
        products: impl Iterator<Item = &'a Product>,
        filter: impl Fn(&Product) -> bool,
    ) -> Vec<Product> {
        products.filter(|&p| filter(p)).cloned().collect()
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, product_id: i64) -> CatalogResult<Option<Product>> {
        Ok(self.products.read().await.get(&product_id).cloned())
    }

    #[instrument(skip(self))]
    async fn find_all(&self, scope: ProductScope) -> CatalogResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(Self::collect(products.values(), |p| {
            scope.contains(p.product_id)
        }))
    }

    #[instrument(skip(self))]
    async fn find_by_category(
        &self,
        category: &str,
        scope: ProductScope,
    ) -> CatalogResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(Self::collect(products.values(), |p| {
            p.category == category && scope.contains(p.product_id)
        }))
    }

    #[instrument(skip(self))]
    async fn find_flagged(&self, flag: FeaturedFlag) -> CatalogResult<Vec<Product>> {
        let products = self.products.read().await;
        Ok(Self::collect(products.values(), |p| {
            !p.is_placeholder() && flag.is_set_on(p)
        }))
    }

    #[instrument(skip(self, product), fields(product_id = product.product_id))]
    async fn insert(&self, product: Product) -> CatalogResult<Product> {
        let mut products = self.products.write().await;
        if products.contains_key(&product.product_id) {
            return Err(CatalogError::DuplicateId(product.product_id));
        }
        products.insert(product.product_id, product.clone());
        Ok(product)
    }

    #[instrument(skip(self, placeholder), fields(product_id = placeholder.product_id))]
    async fn insert_placeholder(&self, placeholder: Product) -> CatalogResult<Product> {
        let mut products = self.products.write().await;
        if Self::holds_category(&products, &placeholder.category) {
            return Err(CatalogError::category_exists(&placeholder.category));
        }
        if products.contains_key(&placeholder.product_id) {
            return Err(CatalogError::DuplicateId(placeholder.product_id));
        }
        products.insert(placeholder.product_id, placeholder.clone());
        Ok(placeholder)
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(
        &self,
        product_id: i64,
        changes: ProductChanges,
    ) -> CatalogResult<Product> {
        let mut products = self.products.write().await;
        let product = products
            .get_mut(&product_id)
            .ok_or_else(|| CatalogError::book_not_found(product_id))?;
        product.apply_changes(changes);
        Ok(product.clone())
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, product_id: i64) -> CatalogResult<()> {
        self.products
            .write()
            .await
            .remove(&product_id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::book_not_found(product_id))
    }

    #[instrument(skip(self))]
    async fn update_where_category(
        &self,
        current: &str,
        updated: &str,
        merge: CategoryMergePolicy,
    ) -> CatalogResult<u64> {
        let mut products = self.products.write().await;
        if merge == CategoryMergePolicy::Reject && Self::holds_category(&products, updated) {
            return Err(CatalogError::category_exists(updated));
        }
        let now = chrono::Utc::now();
        let mut affected = 0;
        for product in products.values_mut().filter(|p| p.category == current) {
            product.category = updated.to_string();
            product.updated_at = now;
            affected += 1;
        }
        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn delete_where_category(&self, category: &str) -> CatalogResult<u64> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|_, p| p.category != category);
        Ok((before - products.len()) as u64)
    }

    #[instrument(skip(self))]
    async fn distinct_categories(&self) -> CatalogResult<Vec<String>> {
        let products = self.products.read().await;
        let names: BTreeSet<&str> = products.values().map(|p| p.category.as_str()).collect();
        Ok(names.into_iter().map(str::to_string).collect())
    }

    #[instrument(skip(self))]
    async fn allocate_id(&self, kind: IdKind) -> CatalogResult<i64> {
        Ok(self.ids.allocate(kind))
    }

    #[instrument(skip(self))]
    async fn resync_ids(&self, kind: IdKind) -> CatalogResult<()> {
        let products = self.products.read().await;
        Self::seed_from(&self.ids, &products, kind);
        tracing::debug!(%kind, current = self.ids.current(kind), "Id sequence resynced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookFlags, ProductInput};

    fn book(id: i64, category: &str) -> Product {
        Product::new(
            id,
            ProductInput {
                title: format!("Book {}", id),
                author: "Author".to_string(),
                price: "1000".to_string(),
                category: category.to_string(),
                introduction: "Intro".to_string(),
                img_url: "img.png".to_string(),
                publisher: "Press".to_string(),
            },
            BookFlags {
                best_seller: id % 2 == 0,
                ..BookFlags::default()
            },
        )
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let repo = InMemoryCatalogRepository::new();
        repo.insert(book(1, "Fiction")).await.unwrap();

        let err = repo.insert(book(1, "Poetry")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(1)));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_scopes_split_on_zero() {
        let repo = InMemoryCatalogRepository::with_products(vec![
            Product::placeholder(0, "Fiction"),
            book(1, "Fiction"),
            book(2, "Fiction"),
        ]);

        let real = repo.find_all(ProductScope::Real).await.unwrap();
        let placeholders = repo.find_all(ProductScope::Placeholders).await.unwrap();
        let all = repo.find_all(ProductScope::All).await.unwrap();

        assert_eq!(real.iter().map(|p| p.product_id).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(placeholders.len(), 1);
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_with_products_seeds_sequences() {
        let repo = InMemoryCatalogRepository::with_products(vec![
            Product::placeholder(-2, "Poetry"),
            book(7, "Fiction"),
        ]);

        assert_eq!(repo.allocate_id(IdKind::Real).await.unwrap(), 8);
        assert_eq!(repo.allocate_id(IdKind::Placeholder).await.unwrap(), -3);
    }

    #[tokio::test]
    async fn test_resync_skips_raw_inserts() {
        let repo = InMemoryCatalogRepository::new();
        repo.insert_raw(book(1, "Fiction")).await;
        repo.insert_raw(book(2, "Fiction")).await;

        repo.resync_ids(IdKind::Real).await.unwrap();
        assert_eq!(repo.allocate_id(IdKind::Real).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_bulk_category_writes_report_counts() {
        let repo = InMemoryCatalogRepository::with_products(vec![
            Product::placeholder(0, "Fiction"),
            book(1, "Fiction"),
            book(2, "Essays"),
        ]);

        let allow = CategoryMergePolicy::Allow;
        assert_eq!(repo.update_where_category("Fiction", "Novels", allow).await.unwrap(), 2);
        assert_eq!(repo.update_where_category("Fiction", "Novels", allow).await.unwrap(), 0);
        assert_eq!(
            repo.distinct_categories().await.unwrap(),
            vec!["Essays".to_string(), "Novels".to_string()]
        );

        assert_eq!(repo.delete_where_category("Novels").await.unwrap(), 2);
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_find_flagged_skips_placeholders() {
        let mut placeholder = Product::placeholder(0, "Fiction");
        placeholder.best_seller = true;
        let repo = InMemoryCatalogRepository::with_products(vec![
            placeholder,
            book(1, "Fiction"),
            book(2, "Fiction"),
        ]);

        let flagged = repo.find_flagged(FeaturedFlag::BestSeller).await.unwrap();
        assert_eq!(flagged.iter().map(|p| p.product_id).collect::<Vec<_>>(), vec![2]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_id() {
        let repo = InMemoryCatalogRepository::new();
        let changes = ProductChanges::new(ProductInput::default(), None);

        assert!(matches!(
            repo.update_by_id(9, changes).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_by_id(9).await,
            Err(CatalogError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_placeholder_refuses_known_category() {
        let repo = InMemoryCatalogRepository::with_products(vec![book(1, "Fiction")]);

        assert!(matches!(
            repo.insert_placeholder(Product::placeholder(0, "Fiction")).await,
            Err(CatalogError::Conflict(_))
        ));
        repo.insert_placeholder(Product::placeholder(0, "Poetry"))
            .await
            .unwrap();
        assert!(matches!(
            repo.insert_placeholder(Product::placeholder(-1, "Poetry")).await,
            Err(CatalogError::Conflict(_))
        ));
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_reject_rename_onto_populated_category() {
        let repo = InMemoryCatalogRepository::with_products(vec![
            book(1, "Comics"),
            book(2, "Manga"),
        ]);

        assert!(matches!(
            repo.update_where_category("Comics", "Manga", CategoryMergePolicy::Reject)
                .await,
            Err(CatalogError::Conflict(_))
        ));
        assert_eq!(
            repo.find_by_category("Comics", ProductScope::All)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            repo.update_where_category("Comics", "Graphic", CategoryMergePolicy::Reject)
                .await
                .unwrap(),
            1
        );
    }
}
