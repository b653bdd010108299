//! Catalog Service - Business logic layer

use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::category_index::CategoryIndex;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    BookFlags, FeaturedFlag, IdKind, Product, ProductChanges, ProductInput, ProductScope,
};
use crate::repository::CatalogRepository;
use crate::settings::{CatalogSettings, FlagPolicy};

/// Category and book operations on top of a [`CatalogRepository`].
///
/// Handles validation, id allocation and category bookkeeping; the
/// repository only stores and queries records.
pub struct CatalogService<R: CatalogRepository> {
    repository: Arc<R>,
    settings: CatalogSettings,
}

impl<R: CatalogRepository> CatalogService<R> {
    /// Create a new CatalogService with default settings
    pub fn new(repository: R) -> Self {
        Self::with_settings(repository, CatalogSettings::default())
    }

    pub fn with_settings(repository: R, settings: CatalogSettings) -> Self {
        Self {
            repository: Arc::new(repository),
            settings,
        }
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    fn categories(&self) -> CategoryIndex<'_, R> {
        CategoryIndex::new(self.repository.as_ref())
    }

    /// All category names, placeholders included
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> CatalogResult<Vec<String>> {
        self.categories().list().await
    }

    /// Register an empty category by storing a placeholder for it
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> CatalogResult<Product> {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidArgument(
                "category name is required".to_string(),
            ));
        }
        if self.categories().contains(name).await? {
            return Err(CatalogError::category_exists(name));
        }

        let placeholder = self
            .insert_with_fresh_id(IdKind::Placeholder, |id| Product::placeholder(id, name))
            .await?;

        info!(category = name, product_id = placeholder.product_id, "Category created");
        Ok(placeholder)
    }

    /// Move every product of `current` under `updated`; returns how many moved
    #[instrument(skip(self))]
    pub async fn rename_category(&self, current: &str, updated: &str) -> CatalogResult<u64> {
        if current.trim().is_empty() || updated.trim().is_empty() {
            return Err(CatalogError::InvalidArgument(
                "both the current and the new category name are required".to_string(),
            ));
        }
        if current == updated {
            return Err(CatalogError::InvalidArgument(
                "new category name must differ from the current one".to_string(),
            ));
        }

        let affected = self
            .repository
            .update_where_category(current, updated, self.settings.merge_policy)
            .await?;
        if affected == 0 {
            return Err(CatalogError::category_not_found(current));
        }

        info!(category = current, updated, affected, "Category renamed");
        Ok(affected)
    }

    /// Remove a category together with every book in it
    #[instrument(skip(self))]
    pub async fn delete_category(&self, name: &str) -> CatalogResult<u64> {
        if name.trim().is_empty() {
            return Err(CatalogError::InvalidArgument(
                "category name is required".to_string(),
            ));
        }
        if !self.categories().contains(name).await? {
            return Err(CatalogError::category_not_found(name));
        }

        let affected = self.repository.delete_where_category(name).await?;
        info!(category = name, affected, "Category deleted");
        Ok(affected)
    }

    /// Add a book with a fresh id and randomly assigned featured flags
    #[instrument(skip(self, input), fields(category = %input.category))]
    pub async fn create_product(&self, input: ProductInput) -> CatalogResult<Product> {
        input
            .validate()
            .map_err(|e| CatalogError::InvalidArgument(e.to_string()))?;

        let flags = BookFlags::random();
        let product = self
            .insert_with_fresh_id(IdKind::Real, |id| Product::new(id, input.clone(), flags))
            .await?;

        info!(product_id = product.product_id, "Book created");
        Ok(product)
    }

    /// Replace the descriptive fields of an existing book
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        product_id: i64,
        input: ProductInput,
    ) -> CatalogResult<Product> {
        input
            .validate()
            .map_err(|e| CatalogError::InvalidArgument(e.to_string()))?;

        if product_id <= 0 {
            return Err(CatalogError::book_not_found(product_id));
        }

        let flags = match self.settings.flag_policy {
            FlagPolicy::Preserve => None,
            FlagPolicy::Reroll => Some(BookFlags::random()),
        };

        let product = self
            .repository
            .update_by_id(product_id, ProductChanges::new(input, flags))
            .await?;

        info!(product_id, "Book updated");
        Ok(product)
    }

    /// Remove a single book; placeholders are only removed with their category
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i64) -> CatalogResult<()> {
        if product_id <= 0 {
            return Err(CatalogError::book_not_found(product_id));
        }

        self.repository.delete_by_id(product_id).await?;
        info!(product_id, "Book deleted");
        Ok(())
    }

    /// Every real book
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> CatalogResult<Vec<Product>> {
        self.repository.find_all(ProductScope::Real).await
    }

    /// Real books of one category
    #[instrument(skip(self))]
    pub async fn list_by_category(&self, name: &str) -> CatalogResult<Vec<Product>> {
        if !self.categories().contains(name).await? {
            return Err(CatalogError::category_not_found(name));
        }

        let products = self
            .repository
            .find_by_category(name, ProductScope::Real)
            .await?;
        if products.is_empty() {
            return Err(CatalogError::NotFound(format!(
                "Category '{}' has no books yet",
                name
            )));
        }
        Ok(products)
    }

    /// Look up a single product by id
    #[instrument(skip(self))]
    pub async fn get_by_product_id(&self, product_id: i64) -> CatalogResult<Product> {
        self.repository
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| CatalogError::book_not_found(product_id))
    }

    /// Real books shown in one storefront section
    #[instrument(skip(self))]
    pub async fn list_featured(&self, flag: FeaturedFlag) -> CatalogResult<Vec<Product>> {
        self.repository.find_flagged(flag).await
    }

    /// Allocate an id of `kind` and insert the record built from it.
    ///
    /// A `DuplicateId` means something stored that id without going through
    /// the counter: resync the counter and try again with a new id.
    async fn insert_with_fresh_id<F>(&self, kind: IdKind, build: F) -> CatalogResult<Product>
    where
        F: Fn(i64) -> Product + Send + Sync,
    {
        let attempts = self.settings.id_max_retries.max(1);
        let mut taken = None;

        for attempt in 1..=attempts {
            let product_id = self.repository.allocate_id(kind).await?;
            let inserted = match kind {
                IdKind::Real => self.repository.insert(build(product_id)).await,
                IdKind::Placeholder => {
                    self.repository.insert_placeholder(build(product_id)).await
                }
            };
            match inserted {
                Ok(product) => return Ok(product),
                Err(CatalogError::DuplicateId(id)) => {
                    warn!(%kind, product_id = id, attempt, "Allocated id already taken, resyncing");
                    taken = Some(id);
                    self.repository.resync_ids(kind).await?;
                }
                Err(e) => return Err(e),
            }
        }

        Err(CatalogError::DuplicateId(taken.unwrap_or_default()))
    }
}

impl<R: CatalogRepository> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            settings: self.settings.clone(),
        }
    }
}
