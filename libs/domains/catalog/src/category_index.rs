//! Category projection over stored products.
//!
//! Categories are not persisted on their own: a name exists while at least
//! one product (real or placeholder) references it.

use crate::error::CatalogResult;
use crate::repository::CatalogRepository;

pub struct CategoryIndex<'a, R: CatalogRepository + ?Sized> {
    repository: &'a R,
}

impl<'a, R: CatalogRepository + ?Sized> CategoryIndex<'a, R> {
    pub fn new(repository: &'a R) -> Self {
        Self { repository }
    }

    /// Current category names, sorted and deduplicated.
    pub async fn list(&self) -> CatalogResult<Vec<String>> {
        let mut names = self.repository.distinct_categories().await?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn contains(&self, name: &str) -> CatalogResult<bool> {
        Ok(self.list().await?.iter().any(|existing| existing == name))
    }
}
