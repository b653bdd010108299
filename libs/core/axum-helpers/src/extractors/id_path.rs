//! Signed integer path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};

/// Extractor for a single `i64` path parameter.
///
/// Non-numeric segments are rejected with a 400 `INVALID_PATH_PARAM` body
/// instead of axum's plain-text rejection.
///
/// ```ignore
/// async fn get_book(IdPath(id): IdPath) -> String {
///     format!("Book {}", id)
/// }
///
/// let app = Router::new().route("/books/{id}", get(get_book));
/// ```
pub struct IdPath(pub i64);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        raw.trim().parse::<i64>().map(IdPath).map_err(|_| {
            AppError::InvalidPathParam(format!("Expected an integer id, got '{}'", raw))
                .into_response()
        })
    }
}
