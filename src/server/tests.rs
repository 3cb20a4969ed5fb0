use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

use super::router;
use crate::storage::{CatalogStorage, sqlite::SqliteCatalogStorage};

async fn create_in_memory_storage() -> Arc<SqliteCatalogStorage> {
    Arc::new(SqliteCatalogStorage::new("sqlite::memory:").await.unwrap())
}

#[tokio::test]
async fn test_get_products_empty_catalog() {
    let app = router(create_in_memory_storage().await);

    let response = app
        .oneshot(Request::builder().uri("/products").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_get_products_returns_catalog() {
    let storage = create_in_memory_storage().await;
    storage
        .insert_new_product("123", "Milk 2L", 129.0, "https://vendor.example/p/123")
        .await
        .unwrap();

    let app = router(storage);

    let response = app
        .oneshot(Request::builder().uri("/products").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Milk 2L");
    assert_eq!(body[0]["price"]["value"], 129.0);
    assert_eq!(body[0]["price"]["currency"], "");
    assert_eq!(body[0]["url"], "https://vendor.example/p/123");
    assert_eq!(body[0]["code"], "123");
    assert!(body[0]["createdAt"].is_string());
    assert!(body[0].get("updatedAt").is_none());
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = router(create_in_memory_storage().await);

    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
