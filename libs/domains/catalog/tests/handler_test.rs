//! Handler tests for the Catalog domain
//!
//! These drive `handlers::router` directly with in-memory storage to check
//! routing, the `{message, data}` envelope, status codes and error bodies.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use domain_catalog::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // For oneshot()

fn app() -> Router {
    handlers::router(CatalogService::new(InMemoryCatalogRepository::new()))
}

// Helper to parse JSON response body
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn book_body(category: &str) -> Value {
    json!({
        "title": "Norwegian Wood",
        "author": "Haruki Murakami",
        "price": 14000,
        "category": category,
        "introduction": "A story of loss and sexuality",
        "imgUrl": "https://img.example/wood.png",
        "publisher": "Kodansha"
    })
}

#[tokio::test]
async fn test_create_book_returns_201_with_envelope() {
    let response = app()
        .oneshot(json_request("POST", "/books", book_body("Fiction")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response.into_body()).await;
    assert!(body["message"].is_string());
    assert_eq!(body["data"]["productId"], 1);
    assert_eq!(body["data"]["price"], "14000");
    assert_eq!(body["data"]["imgUrl"], "https://img.example/wood.png");
    assert!(body["data"]["bestSeller"].is_boolean());
}

#[tokio::test]
async fn test_create_book_missing_field_is_400() {
    let mut body = book_body("Fiction");
    body.as_object_mut().unwrap().remove("publisher");

    let response = app()
        .oneshot(json_request("POST", "/books", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let request = Request::builder()
        .method("POST")
        .uri("/books")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_book_round_trip() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/books", book_body("Fiction")))
        .await
        .unwrap();

    let response = app.oneshot(empty_request("GET", "/books/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"]["title"], "Norwegian Wood");
}

#[tokio::test]
async fn test_get_unknown_book_is_404() {
    let response = app()
        .oneshot(empty_request("GET", "/books/404"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_non_numeric_product_id_is_400() {
    let response = app()
        .oneshot(empty_request("GET", "/books/abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["error"], "INVALID_PATH_PARAM");
}

#[tokio::test]
async fn test_update_and_delete_book() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/books", book_body("Fiction")))
        .await
        .unwrap();

    let mut changes = book_body("Classics");
    changes["price"] = json!("16000");
    let response = app
        .clone()
        .oneshot(json_request("PUT", "/books/1", changes))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"]["category"], "Classics");
    assert_eq!(body["data"]["price"], "16000");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/books/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("DELETE", "/books/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_unknown_book_is_404() {
    let response = app()
        .oneshot(json_request("PUT", "/books/77", book_body("Fiction")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_category_endpoints() {
    let app = app();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/categories", json!({ "name": "Poetry" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"]["productId"], 0);
    assert_eq!(body["data"]["category"], "Poetry");

    let response = app
        .clone()
        .oneshot(json_request("POST", "/categories", json!({ "name": "Poetry" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            "/categories",
            json!({ "current": "Poetry", "updated": "Verse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"], json!({ "category": "Verse", "affected": 1 }));

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/categories"))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"], json!(["Verse"]));

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/categories/Verse"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(empty_request("DELETE", "/categories/Verse"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rename_to_same_name_is_400() {
    let response = app()
        .oneshot(json_request(
            "PUT",
            "/categories",
            json!({ "current": "Poetry", "updated": "Poetry" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_category_listing_hides_placeholders() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/categories", json!({ "name": "Fiction" })))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/books/category/Fiction"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(json_request("POST", "/books", book_body("Fiction")))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/books/category/Fiction"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let response = app.oneshot(empty_request("GET", "/books")).await.unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_featured_sections() {
    let app = app();
    for _ in 0..5 {
        app.clone()
            .oneshot(json_request("POST", "/books", book_body("Fiction")))
            .await
            .unwrap();
    }

    for flag in ["best-seller", "new-book", "recommend"] {
        let response = app
            .clone()
            .oneshot(empty_request("GET", &format!("/books/featured/{}", flag)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .oneshot(empty_request("GET", "/books/featured/popular"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_placeholder_through_books_is_404() {
    let app = app();
    app.clone()
        .oneshot(json_request("POST", "/categories", json!({ "name": "Poetry" })))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", "/books/0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(empty_request("GET", "/categories"))
        .await
        .unwrap();
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"], json!(["Poetry"]));
}
