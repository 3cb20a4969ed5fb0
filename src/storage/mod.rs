mod product;
pub mod sqlite;

use async_trait::async_trait;
use mockall::automock;
pub use product::{Price, Product};
use teloxide::types::ChatId;
use thiserror::Error;

/// Errors returned by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying database operation failed.
    #[error("Database error: {0}")]
    DbError(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable CRUD over products, subscribers, and keyword subscriptions.
///
/// No operation here sends notifications; side effects are limited to the
/// store itself.
#[automock]
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    /// Insert a product observed for the first time. A row that already
    /// exists for the code is left untouched.
    async fn insert_new_product(
        &self,
        code: &str,
        name: &str,
        price: f64,
        url: &str,
    ) -> StorageResult<()>;

    /// Update the stored price (and `updatedAt`) for an existing product.
    async fn update_product_price(&self, code: &str, new_price: f64) -> StorageResult<()>;

    /// Get the stored price for a product code, if the product is known.
    async fn get_product_price(&self, code: &str) -> StorageResult<Option<f64>>;

    /// Full snapshot of all tracked products.
    async fn list_products(&self) -> StorageResult<Vec<Product>>;

    /// The set of keywords currently subscribed by anyone.
    async fn list_distinct_keywords(&self) -> StorageResult<Vec<String>>;

    /// Register a chat as a subscriber. Idempotent.
    async fn add_subscriber(&self, chat_id: ChatId) -> StorageResult<()>;

    /// The distinct chats subscribed to a keyword.
    async fn subscribers_of_keyword(&self, keyword: &str) -> StorageResult<Vec<ChatId>>;

    /// Subscribe a chat to a keyword. Returns `false` when the subscription
    /// already existed.
    async fn add_keyword_subscription(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> StorageResult<bool>;

    /// Remove a (chat, keyword) subscription. Returns `false` when nothing
    /// matched.
    async fn remove_keyword_subscription(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> StorageResult<bool>;

    /// All keywords subscribed by a chat.
    async fn list_keywords_for(&self, chat_id: ChatId) -> StorageResult<Vec<String>>;

    /// Number of distinct subscribed keywords.
    async fn count_distinct_keywords(&self) -> StorageResult<i64>;

    /// Number of tracked products.
    async fn count_products(&self) -> StorageResult<i64>;

    /// Products whose name contains the given substring.
    async fn search_products_by_name(&self, substring: &str) -> StorageResult<Vec<Product>>;

    /// Distinct subscribed keywords containing the given substring.
    async fn search_keywords(&self, substring: &str) -> StorageResult<Vec<String>>;
}
