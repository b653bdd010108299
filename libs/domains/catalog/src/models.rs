use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

/// Descriptive value stored on placeholder products.
pub const BLANK: &str = " ";

/// Book record stored in the `products` collection.
///
/// Ids greater than zero are real books; ids at or below zero are category
/// placeholders that keep an otherwise empty category visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog-wide unique identifier
    pub product_id: i64,
    pub title: String,
    pub author: String,
    /// Price as entered by the administrator
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    pub category: String,
    pub introduction: String,
    /// Absent on records written before covers and publishers were tracked
    #[serde(default)]
    pub img_url: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub best_seller: bool,
    #[serde(default)]
    pub new_book: bool,
    #[serde(default)]
    pub recommend: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Administrator payload for creating or replacing a book.
///
/// Absent fields decode as empty strings so they surface as validation
/// errors rather than JSON decoding failures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "author is required"))]
    pub author: String,
    /// Accepts a JSON string or number
    #[serde(default, deserialize_with = "string_or_number")]
    #[schema(value_type = String, example = "15000")]
    #[validate(length(min = 1, message = "price is required"))]
    pub price: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "category is required"))]
    pub category: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "introduction is required"))]
    pub introduction: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "imgUrl is required"))]
    pub img_url: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "publisher is required"))]
    pub publisher: String,
}

/// Featured-section flags assigned by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BookFlags {
    pub best_seller: bool,
    pub new_book: bool,
    pub recommend: bool,
}

impl BookFlags {
    /// Each flag is drawn independently.
    pub fn random() -> Self {
        Self {
            best_seller: rand::random(),
            new_book: rand::random(),
            recommend: rand::random(),
        }
    }
}

/// Replacement applied by `CatalogRepository::update_by_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductChanges {
    pub details: ProductInput,
    /// `None` keeps the stored flags
    pub flags: Option<BookFlags>,
    pub updated_at: DateTime<Utc>,
}

impl ProductChanges {
    pub fn new(details: ProductInput, flags: Option<BookFlags>) -> Self {
        Self {
            details,
            flags,
            updated_at: Utc::now(),
        }
    }
}

/// Request body for `POST /categories`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCategory {
    #[serde(default)]
    #[validate(length(min = 1, message = "category name is required"))]
    pub name: String,
}

/// Request body for `PUT /categories`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RenameCategory {
    #[serde(default)]
    #[validate(length(min = 1, message = "current category name is required"))]
    pub current: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "new category name is required"))]
    pub updated: String,
}

/// Outcome of a bulk category rename or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryChange {
    pub category: String,
    /// Number of products touched
    pub affected: u64,
}

/// Success envelope shared by every catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// Which slice of the id space a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductScope {
    All,
    /// `productId > 0`
    Real,
    /// `productId <= 0`
    Placeholders,
}

impl ProductScope {
    pub fn contains(self, product_id: i64) -> bool {
        match self {
            ProductScope::All => true,
            ProductScope::Real => product_id > 0,
            ProductScope::Placeholders => product_id <= 0,
        }
    }
}

/// The two independent id sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum IdKind {
    Real,
    Placeholder,
}

impl IdKind {
    /// Key of this sequence in the `counters` collection.
    pub fn counter_name(self) -> &'static str {
        match self {
            IdKind::Real => "real_product_id",
            IdKind::Placeholder => "placeholder_product_id",
        }
    }
}

/// Storefront section selected by `GET /books/featured/{flag}`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FeaturedFlag {
    BestSeller,
    NewBook,
    Recommend,
}

impl FeaturedFlag {
    /// Stored field backing this flag.
    pub fn field_name(self) -> &'static str {
        match self {
            FeaturedFlag::BestSeller => "bestSeller",
            FeaturedFlag::NewBook => "newBook",
            FeaturedFlag::Recommend => "recommend",
        }
    }

    pub fn is_set_on(self, product: &Product) -> bool {
        match self {
            FeaturedFlag::BestSeller => product.best_seller,
            FeaturedFlag::NewBook => product.new_book,
            FeaturedFlag::Recommend => product.recommend,
        }
    }
}

impl Product {
    /// Build a real book from validated input.
    pub fn new(product_id: i64, input: ProductInput, flags: BookFlags) -> Self {
        let now = Utc::now();
        Self {
            product_id,
            title: input.title,
            author: input.author,
            price: input.price,
            category: input.category,
            introduction: input.introduction,
            img_url: input.img_url,
            publisher: input.publisher,
            best_seller: flags.best_seller,
            new_book: flags.new_book,
            recommend: flags.recommend,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stub record that makes `category` exist while it has no books.
    pub fn placeholder(product_id: i64, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            product_id,
            title: BLANK.to_string(),
            author: BLANK.to_string(),
            price: BLANK.to_string(),
            category: category.into(),
            introduction: BLANK.to_string(),
            img_url: BLANK.to_string(),
            publisher: BLANK.to_string(),
            best_seller: false,
            new_book: false,
            recommend: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.product_id <= 0
    }

    pub fn flags(&self) -> BookFlags {
        BookFlags {
            best_seller: self.best_seller,
            new_book: self.new_book,
            recommend: self.recommend,
        }
    }

    /// Overwrite descriptive fields and, when present, the flags.
    pub fn apply_changes(&mut self, changes: ProductChanges) {
        let ProductChanges {
            details,
            flags,
            updated_at,
        } = changes;

        self.title = details.title;
        self.author = details.author;
        self.price = details.price;
        self.category = details.category;
        self.introduction = details.introduction;
        self.img_url = details.img_url;
        self.publisher = details.publisher;
        if let Some(flags) = flags {
            self.best_seller = flags.best_seller;
            self.new_book = flags.new_book;
            self.recommend = flags.recommend;
        }
        self.updated_at = updated_at;
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Text(String),
    Integer(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(text) => text,
        StringOrNumber::Integer(n) => n.to_string(),
        StringOrNumber::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input() -> ProductInput {
        ProductInput {
            title: "Demian".to_string(),
            author: "Hermann Hesse".to_string(),
            price: "12000".to_string(),
            category: "Fiction".to_string(),
            introduction: "A coming-of-age novel".to_string(),
            img_url: "https://img.example/demian.png".to_string(),
            publisher: "S. Fischer".to_string(),
        }
    }

    #[test]
    fn test_product_serializes_camel_case() {
        let product = Product::new(7, input(), BookFlags::default());
        let value = serde_json::to_value(&product).unwrap();

        assert_eq!(value["productId"], 7);
        assert_eq!(value["imgUrl"], "https://img.example/demian.png");
        assert_eq!(value["bestSeller"], false);
        assert!(value.get("createdAt").is_some());
        assert!(value.get("product_id").is_none());
    }

    #[test]
    fn test_product_decodes_record_without_cover_or_publisher() {
        let product: Product = serde_json::from_value(json!({
            "productId": 3, "title": "Siddhartha", "author": "Hermann Hesse",
            "price": 11000, "category": "Fiction", "introduction": "A journey"
        }))
        .unwrap();

        assert_eq!(product.product_id, 3);
        assert_eq!(product.price, "11000");
        assert!(product.img_url.is_empty());
        assert!(product.publisher.is_empty());
        assert!(!product.best_seller);
    }

    #[test]
    fn test_input_price_accepts_number() {
        let parsed: ProductInput = serde_json::from_value(json!({
            "title": "t", "author": "a", "price": 15000, "category": "c",
            "introduction": "i", "imgUrl": "u", "publisher": "p"
        }))
        .unwrap();
        assert_eq!(parsed.price, "15000");

        let parsed: ProductInput = serde_json::from_value(json!({ "price": 9.5 })).unwrap();
        assert_eq!(parsed.price, "9.5");
    }

    #[test]
    fn test_input_missing_fields_fail_validation() {
        let parsed: ProductInput = serde_json::from_value(json!({ "title": "only" })).unwrap();
        let errors = parsed.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(!fields.contains_key("title"));
        assert!(fields.contains_key("author"));
        assert!(fields.contains_key("publisher"));
    }

    #[test]
    fn test_placeholder_is_blank() {
        let placeholder = Product::placeholder(0, "Poetry");
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.title, BLANK);
        assert_eq!(placeholder.price, BLANK);
        assert_eq!(placeholder.category, "Poetry");
        assert_eq!(placeholder.flags(), BookFlags::default());
    }

    #[test]
    fn test_apply_changes_preserves_flags_when_absent() {
        let flags = BookFlags {
            best_seller: true,
            new_book: false,
            recommend: true,
        };
        let mut product = Product::new(1, input(), flags);
        let mut details = input();
        details.title = "Siddhartha".to_string();

        product.apply_changes(ProductChanges::new(details, None));

        assert_eq!(product.title, "Siddhartha");
        assert_eq!(product.flags(), flags);
        assert!(product.updated_at >= product.created_at);
    }

    #[test]
    fn test_scope_contains() {
        assert!(ProductScope::All.contains(-3));
        assert!(ProductScope::Real.contains(1));
        assert!(!ProductScope::Real.contains(0));
        assert!(ProductScope::Placeholders.contains(0));
        assert!(!ProductScope::Placeholders.contains(2));
    }

    #[test]
    fn test_featured_flag_parses_kebab_case() {
        assert_eq!(
            "best-seller".parse::<FeaturedFlag>().unwrap(),
            FeaturedFlag::BestSeller
        );
        assert_eq!(FeaturedFlag::NewBook.to_string(), "new-book");
        assert_eq!(FeaturedFlag::Recommend.field_name(), "recommend");
        assert!("popular".parse::<FeaturedFlag>().is_err());
    }
}
