#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;

use crate::storage::{CatalogStorage, Product, StorageError};

/// Error wrapper turning store failures into plain-text 500 responses.
struct AppError(StorageError);

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        Self(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Failed to read products: {:?}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch products from database")
            .into_response()
    }
}

/// Builds the read-endpoint router.
pub fn router(storage: Arc<dyn CatalogStorage>) -> Router {
    Router::new().route("/products", get(list_products_handler)).with_state(storage)
}

async fn list_products_handler(
    State(storage): State<Arc<dyn CatalogStorage>>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = storage.list_products().await?;
    Ok(Json(products))
}

/// Serve the product read endpoint until the process exits.
pub async fn serve(storage: Arc<dyn CatalogStorage>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Starting server on :{port}");

    axum::serve(listener, router(storage)).await
}
