//! HTTP handlers for the Catalog API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use axum_helpers::{
    errors::responses::{
        BadRequestPathResponse, BadRequestValidationResponse, ConflictResponse,
        InternalServerErrorResponse, NotFoundResponse,
    },
    IdPath, ValidatedJson,
};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    ApiResponse, CategoryChange, CreateCategory, FeaturedFlag, Product, ProductInput,
    RenameCategory,
};
use crate::repository::CatalogRepository;
use crate::service::CatalogService;

/// OpenAPI documentation for the Catalog API
#[derive(OpenApi)]
#[openapi(
    paths(
        list_categories,
        create_category,
        rename_category,
        delete_category,
        list_books,
        create_book,
        list_featured,
        list_by_category,
        get_book,
        update_book,
        delete_book,
    ),
    components(
        schemas(
            Product, ProductInput, CreateCategory, RenameCategory,
            CategoryChange, FeaturedFlag
        ),
        responses(
            NotFoundResponse,
            BadRequestValidationResponse,
            BadRequestPathResponse,
            ConflictResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Categories", description = "Category management endpoints"),
        (name = "Books", description = "Book catalog endpoints")
    )
)]
pub struct ApiDoc;

type SharedService<R> = Arc<CatalogService<R>>;

/// Create the catalog router with all HTTP endpoints
pub fn router<R: CatalogRepository + 'static>(service: CatalogService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route(
            "/categories",
            get(list_categories)
                .post(create_category)
                .put(rename_category),
        )
        .route("/categories/{name}", delete(delete_category))
        .route("/books", get(list_books).post(create_book))
        .route("/books/featured/{flag}", get(list_featured))
        .route("/books/category/{name}", get(list_by_category))
        .route(
            "/books/{productId}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(shared_service)
}

/// List every category name
#[utoipa::path(
    get,
    path = "/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "Category names", body = ApiResponse<Vec<String>>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_categories<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
) -> CatalogResult<Json<ApiResponse<Vec<String>>>> {
    let categories = service.list_categories().await?;
    Ok(Json(ApiResponse::new("Categories retrieved", categories)))
}

/// Create an empty category
#[utoipa::path(
    post,
    path = "/categories",
    tag = "Categories",
    request_body = CreateCategory,
    responses(
        (status = 201, description = "Category created; data is its placeholder record", body = ApiResponse<Product>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    ValidatedJson(input): ValidatedJson<CreateCategory>,
) -> CatalogResult<impl IntoResponse> {
    let placeholder = service.create_category(&input.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Category created", placeholder)),
    ))
}

/// Rename a category, moving every book in it
#[utoipa::path(
    put,
    path = "/categories",
    tag = "Categories",
    request_body = RenameCategory,
    responses(
        (status = 200, description = "Category renamed", body = ApiResponse<CategoryChange>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn rename_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    ValidatedJson(input): ValidatedJson<RenameCategory>,
) -> CatalogResult<Json<ApiResponse<CategoryChange>>> {
    let affected = service
        .rename_category(&input.current, &input.updated)
        .await?;
    Ok(Json(ApiResponse::new(
        "Category renamed",
        CategoryChange {
            category: input.updated,
            affected,
        },
    )))
}

/// Delete a category together with all of its books
#[utoipa::path(
    delete,
    path = "/categories/{name}",
    tag = "Categories",
    params(
        ("name" = String, Path, description = "Category name")
    ),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<CategoryChange>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Path(name): Path<String>,
) -> CatalogResult<Json<ApiResponse<CategoryChange>>> {
    let affected = service.delete_category(&name).await?;
    Ok(Json(ApiResponse::new(
        "Category deleted",
        CategoryChange {
            category: name,
            affected,
        },
    )))
}

/// List every book
#[utoipa::path(
    get,
    path = "/books",
    tag = "Books",
    responses(
        (status = 200, description = "All books", body = ApiResponse<Vec<Product>>),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_books<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
) -> CatalogResult<Json<ApiResponse<Vec<Product>>>> {
    let books = service.list_all().await?;
    Ok(Json(ApiResponse::new("Books retrieved", books)))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "Books",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Book created", body = ApiResponse<Product>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 409, response = ConflictResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    ValidatedJson(input): ValidatedJson<ProductInput>,
) -> CatalogResult<impl IntoResponse> {
    let book = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new("Book created", book))))
}

/// List books of one storefront section
#[utoipa::path(
    get,
    path = "/books/featured/{flag}",
    tag = "Books",
    params(
        ("flag" = FeaturedFlag, Path, description = "best-seller, new-book or recommend")
    ),
    responses(
        (status = 200, description = "Featured books", body = ApiResponse<Vec<Product>>),
        (status = 400, response = BadRequestPathResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_featured<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Path(flag): Path<String>,
) -> CatalogResult<Json<ApiResponse<Vec<Product>>>> {
    let flag: FeaturedFlag = flag
        .parse()
        .map_err(|_| CatalogError::InvalidArgument(format!("Unknown featured section '{}'", flag)))?;
    let books = service.list_featured(flag).await?;
    Ok(Json(ApiResponse::new("Featured books retrieved", books)))
}

/// List books of one category
#[utoipa::path(
    get,
    path = "/books/category/{name}",
    tag = "Books",
    params(
        ("name" = String, Path, description = "Category name")
    ),
    responses(
        (status = 200, description = "Books in category", body = ApiResponse<Vec<Product>>),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_by_category<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    Path(name): Path<String>,
) -> CatalogResult<Json<ApiResponse<Vec<Product>>>> {
    let books = service.list_by_category(&name).await?;
    Ok(Json(ApiResponse::new("Books in category retrieved", books)))
}

/// Get a book by its product id
#[utoipa::path(
    get,
    path = "/books/{productId}",
    tag = "Books",
    params(
        ("productId" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Book found", body = ApiResponse<Product>),
        (status = 400, response = BadRequestPathResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn get_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    IdPath(product_id): IdPath,
) -> CatalogResult<Json<ApiResponse<Product>>> {
    let book = service.get_by_product_id(product_id).await?;
    Ok(Json(ApiResponse::new("Book retrieved", book)))
}

/// Replace the details of a book
#[utoipa::path(
    put,
    path = "/books/{productId}",
    tag = "Books",
    params(
        ("productId" = i64, Path, description = "Product ID")
    ),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Book updated", body = ApiResponse<Product>),
        (status = 400, response = BadRequestValidationResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn update_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    IdPath(product_id): IdPath,
    ValidatedJson(input): ValidatedJson<ProductInput>,
) -> CatalogResult<Json<ApiResponse<Product>>> {
    let book = service.update_product(product_id, input).await?;
    Ok(Json(ApiResponse::new("Book updated", book)))
}

/// Remove a book; data is the removed product id
#[utoipa::path(
    delete,
    path = "/books/{productId}",
    tag = "Books",
    params(
        ("productId" = i64, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Book deleted", body = ApiResponse<i64>),
        (status = 400, response = BadRequestPathResponse),
        (status = 404, response = NotFoundResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn delete_book<R: CatalogRepository>(
    State(service): State<SharedService<R>>,
    IdPath(product_id): IdPath,
) -> CatalogResult<Json<ApiResponse<i64>>> {
    service.delete_product(product_id).await?;
    Ok(Json(ApiResponse::new("Book deleted", product_id)))
}
