//! MongoDB implementation of CatalogRepository
//!
//! Ids come from the `counters` collection (one document per sequence,
//! advanced with `$inc`). The unique index on `productId` catches anything
//! that was written without going through a counter. Category bulk writes run
//! inside a multi-document transaction, which needs a replica set.
//!
//! Writes that must not race on one category name (creating its placeholder,
//! renaming onto it under the reject policy) also bump a document in
//! `category_guards` inside their transaction. Two such transactions on the
//! same name cannot both commit; the loser reports `Conflict`.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, to_bson, Bson, Document},
    error::{ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR},
    options::{FindOneOptions, FindOptions, IndexOptions, ReturnDocument},
    Client, ClientSession, Collection, Database, IndexModel,
};
use tracing::instrument;

use crate::allocator::counter_seed;
use crate::error::{CatalogError, CatalogResult};
use crate::models::{FeaturedFlag, IdKind, Product, ProductChanges, ProductScope};
use crate::repository::CatalogRepository;
use crate::settings::CategoryMergePolicy;

const PRODUCTS: &str = "products";
const COUNTERS: &str = "counters";
const CATEGORY_GUARDS: &str = "category_guards";
const DUPLICATE_KEY: i32 = 11000;

/// MongoDB implementation of the CatalogRepository
pub struct MongoCatalogRepository {
    client: Client,
    products: Collection<Product>,
    counters: Collection<Document>,
    guards: Collection<Document>,
}

impl MongoCatalogRepository {
    /// Create a new MongoCatalogRepository
    ///
    /// The client is needed to open sessions for transactional bulk writes.
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            products: db.collection::<Product>(PRODUCTS),
            counters: db.collection::<Document>(COUNTERS),
            guards: db.collection::<Document>(CATEGORY_GUARDS),
        }
    }

    /// Create the unique id index and the category lookup index
    pub async fn init_indexes(&self) -> CatalogResult<()> {
        let indexes = vec![
            IndexModel::builder()
                .keys(doc! { "productId": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("idx_product_id_unique".to_string())
                        .build(),
                )
                .build(),
            IndexModel::builder()
                .keys(doc! { "category": 1, "productId": 1 })
                .options(
                    IndexOptions::builder()
                        .name("idx_category".to_string())
                        .build(),
                )
                .build(),
        ];

        self.products.create_indexes(indexes).await?;
        tracing::info!("Catalog indexes created successfully");
        Ok(())
    }

    /// Seed both id counters from the ids already stored.
    ///
    /// Idempotent: counters only ever move away from zero.
    pub async fn init_counters(&self) -> CatalogResult<()> {
        self.resync_ids(IdKind::Real).await?;
        self.resync_ids(IdKind::Placeholder).await?;
        tracing::info!("Catalog id counters seeded");
        Ok(())
    }

    /// Get the underlying products collection for advanced operations
    pub fn collection(&self) -> &Collection<Product> {
        &self.products
    }

    fn scope_filter(scope: ProductScope) -> Document {
        match scope {
            ProductScope::All => doc! {},
            ProductScope::Real => doc! { "productId": { "$gt": 0_i64 } },
            ProductScope::Placeholders => doc! { "productId": { "$lte": 0_i64 } },
        }
    }

    fn sorted_by_id() -> FindOptions {
        FindOptions::builder().sort(doc! { "productId": 1 }).build()
    }

    /// `$set` body for a product update
    fn changes_document(changes: &ProductChanges) -> CatalogResult<Document> {
        let details = &changes.details;
        let mut set = doc! {
            "title": details.title.as_str(),
            "author": details.author.as_str(),
            "price": details.price.as_str(),
            "category": details.category.as_str(),
            "introduction": details.introduction.as_str(),
            "imgUrl": details.img_url.as_str(),
            "publisher": details.publisher.as_str(),
            "updatedAt": to_bson(&changes.updated_at)?,
        };
        if let Some(flags) = changes.flags {
            set.insert("bestSeller", flags.best_seller);
            set.insert("newBook", flags.new_book);
            set.insert("recommend", flags.recommend);
        }
        Ok(set)
    }

    async fn find_sorted(&self, filter: Document) -> CatalogResult<Vec<Product>> {
        let cursor = self
            .products
            .find(filter)
            .with_options(Self::sorted_by_id())
            .await?;
        let products: Vec<Product> = cursor.try_collect().await?;
        Ok(products)
    }

    /// Stored id at one end of the id space (`1` = smallest, `-1` = largest)
    async fn extreme_id(&self, direction: i32) -> CatalogResult<Option<i64>> {
        let options = FindOneOptions::builder()
            .sort(doc! { "productId": direction })
            .build();
        let product = self.products.find_one(doc! {}).with_options(options).await?;
        Ok(product.map(|p| p.product_id))
    }

    /// Bump the guard document of `category` within the session's transaction
    async fn claim_category(
        &self,
        session: &mut ClientSession,
        category: &str,
    ) -> CatalogResult<()> {
        self.guards
            .update_one(doc! { "_id": category }, doc! { "$inc": { "writes": 1_i64 } })
            .upsert(true)
            .session(&mut *session)
            .await
            .map_err(|e| {
                if is_write_conflict(&e) || is_duplicate_key(&e) {
                    CatalogError::Conflict(format!(
                        "Category '{}' is being changed by another request",
                        category
                    ))
                } else {
                    CatalogError::from(e)
                }
            })?;
        Ok(())
    }

    async fn holds_category(
        &self,
        session: &mut ClientSession,
        category: &str,
    ) -> CatalogResult<bool> {
        let count = self
            .products
            .count_documents(doc! { "category": category })
            .session(&mut *session)
            .await?;
        Ok(count > 0)
    }

    async fn insert_placeholder_in(
        &self,
        session: &mut ClientSession,
        placeholder: &Product,
    ) -> CatalogResult<()> {
        self.claim_category(session, &placeholder.category).await?;
        if self.holds_category(session, &placeholder.category).await? {
            return Err(CatalogError::category_exists(&placeholder.category));
        }

        match self
            .products
            .insert_one(placeholder)
            .session(&mut *session)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(CatalogError::DuplicateId(placeholder.product_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn move_category_in(
        &self,
        session: &mut ClientSession,
        current: &str,
        updated: &str,
        merge: CategoryMergePolicy,
    ) -> CatalogResult<u64> {
        if merge == CategoryMergePolicy::Reject {
            self.claim_category(session, updated).await?;
            if self.holds_category(session, updated).await? {
                return Err(CatalogError::category_exists(updated));
            }
        }

        let update = doc! {
            "$set": {
                "category": updated,
                "updatedAt": to_bson(&chrono::Utc::now())?,
            }
        };
        let result = self
            .products
            .update_many(doc! { "category": current }, update)
            .session(&mut *session)
            .await?;
        Ok(result.matched_count)
    }

    async fn commit_or_abort<T>(
        session: &mut ClientSession,
        result: CatalogResult<T>,
    ) -> CatalogResult<T> {
        match result {
            Ok(value) => {
                session.commit_transaction().await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = session.abort_transaction().await {
                    tracing::warn!(error = %abort_err, "Failed to abort transaction");
                }
                Err(e)
            }
        }
    }
}

/// True when a transaction lost a write conflict and may be retried whole.
pub fn is_write_conflict(err: &mongodb::error::Error) -> bool {
    err.contains_label(TRANSIENT_TRANSACTION_ERROR)
}

/// True when a write failed on a unique index.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn counter_value(counter: &Document) -> CatalogResult<i64> {
    match counter.get("value") {
        Some(Bson::Int64(value)) => Ok(*value),
        Some(Bson::Int32(value)) => Ok(i64::from(*value)),
        other => Err(CatalogError::Internal(format!(
            "Counter document has unexpected value: {:?}",
            other
        ))),
    }
}

#[async_trait]
impl CatalogRepository for MongoCatalogRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, product_id: i64) -> CatalogResult<Option<Product>> {
        let product = self
            .products
            .find_one(doc! { "productId": product_id })
            .await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn find_all(&self, scope: ProductScope) -> CatalogResult<Vec<Product>> {
        self.find_sorted(Self::scope_filter(scope)).await
    }

    #[instrument(skip(self))]
    async fn find_by_category(
        &self,
        category: &str,
        scope: ProductScope,
    ) -> CatalogResult<Vec<Product>> {
        let mut filter = Self::scope_filter(scope);
        filter.insert("category", category);
        self.find_sorted(filter).await
    }

    #[instrument(skip(self))]
    async fn find_flagged(&self, flag: FeaturedFlag) -> CatalogResult<Vec<Product>> {
        let mut filter = Self::scope_filter(ProductScope::Real);
        filter.insert(flag.field_name(), true);
        self.find_sorted(filter).await
    }

    #[instrument(skip(self, product), fields(product_id = product.product_id))]
    async fn insert(&self, product: Product) -> CatalogResult<Product> {
        match self.products.insert_one(&product).await {
            Ok(_) => Ok(product),
            Err(e) if is_duplicate_key(&e) => Err(CatalogError::DuplicateId(product.product_id)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, placeholder), fields(product_id = placeholder.product_id))]
    async fn insert_placeholder(&self, placeholder: Product) -> CatalogResult<Product> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let result = self.insert_placeholder_in(&mut session, &placeholder).await;
        Self::commit_or_abort(&mut session, result).await?;
        Ok(placeholder)
    }

    #[instrument(skip(self, changes))]
    async fn update_by_id(
        &self,
        product_id: i64,
        changes: ProductChanges,
    ) -> CatalogResult<Product> {
        let set = Self::changes_document(&changes)?;
        self.products
            .find_one_and_update(doc! { "productId": product_id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| CatalogError::book_not_found(product_id))
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, product_id: i64) -> CatalogResult<()> {
        let result = self
            .products
            .delete_one(doc! { "productId": product_id })
            .await?;

        if result.deleted_count == 0 {
            return Err(CatalogError::book_not_found(product_id));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_where_category(
        &self,
        current: &str,
        updated: &str,
        merge: CategoryMergePolicy,
    ) -> CatalogResult<u64> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let result = self
            .move_category_in(&mut session, current, updated, merge)
            .await;
        let affected = Self::commit_or_abort(&mut session, result).await?;

        tracing::info!(category = current, updated, affected, "Category renamed");
        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn delete_where_category(&self, category: &str) -> CatalogResult<u64> {
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;
        let result = self
            .products
            .delete_many(doc! { "category": category })
            .session(&mut session)
            .await
            .map(|r| r.deleted_count)
            .map_err(CatalogError::from);
        let affected = Self::commit_or_abort(&mut session, result).await?;

        tracing::info!(category, affected, "Category deleted");
        Ok(affected)
    }

    #[instrument(skip(self))]
    async fn distinct_categories(&self) -> CatalogResult<Vec<String>> {
        let values = self.products.distinct("category", doc! {}).await?;
        Ok(values
            .into_iter()
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect())
    }

    #[instrument(skip(self))]
    async fn allocate_id(&self, kind: IdKind) -> CatalogResult<i64> {
        let step: i64 = match kind {
            IdKind::Real => 1,
            IdKind::Placeholder => -1,
        };
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": kind.counter_name() },
                doc! { "$inc": { "value": step } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| {
                CatalogError::Internal(format!("Counter '{}' missing after upsert", kind))
            })?;

        counter_value(&counter)
    }

    #[instrument(skip(self))]
    async fn resync_ids(&self, kind: IdKind) -> CatalogResult<()> {
        let max_id = self.extreme_id(-1).await?;
        let min_id = self.extreme_id(1).await?;
        let seed = counter_seed(kind, max_id, min_id);
        let operator = match kind {
            IdKind::Real => "$max",
            IdKind::Placeholder => "$min",
        };

        let mut update = Document::new();
        update.insert(operator, doc! { "value": seed });

        self.counters
            .update_one(doc! { "_id": kind.counter_name() }, update)
            .upsert(true)
            .await?;

        tracing::debug!(%kind, seed, "Id counter resynced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookFlags, ProductInput};

    #[test]
    fn test_scope_filter() {
        assert!(MongoCatalogRepository::scope_filter(ProductScope::All).is_empty());

        let real = MongoCatalogRepository::scope_filter(ProductScope::Real);
        let bound = real.get_document("productId").unwrap();
        assert_eq!(bound.get_i64("$gt").unwrap(), 0);

        let placeholders = MongoCatalogRepository::scope_filter(ProductScope::Placeholders);
        let bound = placeholders.get_document("productId").unwrap();
        assert_eq!(bound.get_i64("$lte").unwrap(), 0);
    }

    #[test]
    fn test_changes_document_without_flags() {
        let changes = ProductChanges::new(
            ProductInput {
                title: "Title".to_string(),
                img_url: "cover.png".to_string(),
                ..ProductInput::default()
            },
            None,
        );
        let set = MongoCatalogRepository::changes_document(&changes).unwrap();

        assert_eq!(set.get_str("title").unwrap(), "Title");
        assert_eq!(set.get_str("imgUrl").unwrap(), "cover.png");
        assert!(set.contains_key("updatedAt"));
        assert!(!set.contains_key("bestSeller"));
    }

    #[test]
    fn test_changes_document_with_flags() {
        let flags = BookFlags {
            best_seller: true,
            new_book: false,
            recommend: true,
        };
        let changes = ProductChanges::new(ProductInput::default(), Some(flags));
        let set = MongoCatalogRepository::changes_document(&changes).unwrap();

        assert!(set.get_bool("bestSeller").unwrap());
        assert!(!set.get_bool("newBook").unwrap());
        assert!(set.get_bool("recommend").unwrap());
    }

    #[test]
    fn test_counter_value_accepts_both_widths() {
        assert_eq!(counter_value(&doc! { "value": 7_i64 }).unwrap(), 7);
        assert_eq!(counter_value(&doc! { "value": -2_i32 }).unwrap(), -2);
        assert!(counter_value(&doc! { "value": "x" }).is_err());
        assert!(counter_value(&doc! {}).is_err());
    }

    #[test]
    fn test_legacy_document_decodes() {
        let document = doc! {
            "productId": 4_i64,
            "title": "Demian",
            "author": "Hermann Hesse",
            "price": "12000",
            "category": "Fiction",
            "introduction": "A coming-of-age novel",
        };

        let product: Product = mongodb::bson::from_document(document).unwrap();
        assert_eq!(product.title, "Demian");
        assert!(product.img_url.is_empty());
        assert!(product.publisher.is_empty());
    }

    #[test]
    fn test_product_roundtrips_through_bson() {
        let product = Product::placeholder(-1, "Poetry");
        let document = mongodb::bson::to_document(&product).unwrap();
        assert_eq!(document.get_i64("productId").unwrap(), -1);

        let decoded: Product = mongodb::bson::from_document(document).unwrap();
        assert_eq!(decoded, product);
    }

    #[tokio::test]
    #[ignore] // Requires a MongoDB replica set
    async fn test_allocate_and_rename_against_live_database() {
        let url = std::env::var("MONGODB_URL")
            .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string());
        let client = Client::with_uri_str(url).await.unwrap();
        let db = client.database("catalog_repository_test");
        db.drop().await.unwrap();

        let repo = MongoCatalogRepository::new(client.clone(), &db);
        repo.init_indexes().await.unwrap();
        repo.init_counters().await.unwrap();

        assert_eq!(repo.allocate_id(IdKind::Placeholder).await.unwrap(), 0);
        repo.insert_placeholder(Product::placeholder(0, "Fiction"))
            .await
            .unwrap();
        assert!(matches!(
            repo.insert_placeholder(Product::placeholder(-1, "Fiction")).await,
            Err(CatalogError::Conflict(_))
        ));

        let id = repo.allocate_id(IdKind::Real).await.unwrap();
        assert_eq!(id, 1);
        let mut book = Product::placeholder(id, "Fiction");
        book.title = "Norwegian Wood".to_string();
        repo.insert(book.clone()).await.unwrap();

        assert!(matches!(
            repo.insert(book).await,
            Err(CatalogError::DuplicateId(1))
        ));

        assert!(matches!(
            repo.update_where_category("Fiction", "Fiction", CategoryMergePolicy::Reject)
                .await,
            Err(CatalogError::Conflict(_))
        ));
        assert_eq!(
            repo.update_where_category("Fiction", "Novels", CategoryMergePolicy::Reject)
                .await
                .unwrap(),
            2
        );
        assert_eq!(repo.distinct_categories().await.unwrap(), vec!["Novels".to_string()]);
        assert_eq!(repo.find_all(ProductScope::Real).await.unwrap().len(), 1);

        assert_eq!(repo.delete_where_category("Novels").await.unwrap(), 2);
        assert_eq!(repo.collection().count_documents(doc! {}).await.unwrap(), 0);

        db.drop().await.unwrap();
    }
}
