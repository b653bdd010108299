use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Product id {0} is already taken")]
    DuplicateId(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

impl CatalogError {
    pub fn book_not_found(id: i64) -> Self {
        CatalogError::NotFound(format!("Book {} not found", id))
    }

    pub fn category_not_found(name: &str) -> Self {
        CatalogError::NotFound(format!("Category '{}' not found", name))
    }

    pub fn category_exists(name: &str) -> Self {
        CatalogError::Conflict(format!("Category '{}' already exists", name))
    }
}

/// Convert CatalogError to AppError for standardized error responses
impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidArgument(msg) => AppError::BadRequest(msg),
            CatalogError::NotFound(msg) => AppError::NotFound(msg),
            CatalogError::Conflict(msg) => AppError::Conflict(msg),
            CatalogError::DuplicateId(id) => {
                AppError::Conflict(format!("Product id {} is already taken", id))
            }
            CatalogError::Database(msg) => AppError::Database(msg),
            CatalogError::Internal(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for CatalogError {
    fn from(err: mongodb::error::Error) -> Self {
        CatalogError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for CatalogError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        CatalogError::Internal(format!("BSON encoding failed: {}", err))
    }
}
