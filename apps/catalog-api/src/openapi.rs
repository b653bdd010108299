//! OpenAPI documentation configuration

use utoipa::OpenApi;

/// Combined OpenAPI documentation for Catalog API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Catalog API",
        version = "0.1.0",
        description = "Bookstore catalog and category management API",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    nest(
        (path = "/api", api = domain_catalog::ApiDoc)
    ),
    tags(
        (name = "Categories", description = "Category management endpoints"),
        (name = "Books", description = "Book catalog endpoints")
    )
)]
pub struct ApiDoc;
