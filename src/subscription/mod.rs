
use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use teloxide::types::ChatId;
use thiserror::Error;

use crate::{
    poller::{FetchStats, SharedFetchStats},
    storage::{CatalogStorage, Product, StorageError},
};

/// Errors returned by the subscription service.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// The storage layer failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for subscription operations.
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

/// A snapshot of the system for the status command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    /// Number of distinct subscribed keywords.
    pub keyword_count: i64,
    /// Number of tracked products.
    pub product_count: i64,
    /// Counters from the most recent fetch cycle.
    pub stats: FetchStats,
}

/// Manages subscribers and their keyword subscriptions, and answers the
/// catalog queries exposed through the bot.
#[automock]
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Register a chat as a subscriber. Idempotent.
    async fn subscribe(&self, chat_id: ChatId) -> SubscriptionResult<()>;

    /// Subscribe a chat to a keyword, registering the chat first if needed.
    /// Returns `false` when the subscription already existed.
    async fn add_keyword(&self, chat_id: ChatId, keyword: &str) -> SubscriptionResult<bool>;

    /// Remove a (chat, keyword) subscription. Returns `false` when nothing
    /// matched.
    async fn remove_keyword(&self, chat_id: ChatId, keyword: &str) -> SubscriptionResult<bool>;

    /// All keywords subscribed by a chat.
    async fn list_keywords(&self, chat_id: ChatId) -> SubscriptionResult<Vec<String>>;

    /// Current system status.
    async fn status(&self) -> SubscriptionResult<StatusReport>;

    /// Tracked products whose name contains the keyword.
    async fn query_products(&self, keyword: &str) -> SubscriptionResult<Vec<Product>>;

    /// Subscribed keywords containing the given text, for inline suggestion.
    async fn suggest_keywords(&self, partial: &str) -> SubscriptionResult<Vec<String>>;
}

/// [`SubscriptionService`] backed by the persistent store and the shared
/// fetch-cycle counters.
pub struct DefaultSubscriptionService {
    storage: Arc<dyn CatalogStorage>,
    stats: SharedFetchStats,
}

impl DefaultSubscriptionService {
    /// Creates a new `DefaultSubscriptionService`.
    pub fn new(storage: Arc<dyn CatalogStorage>, stats: SharedFetchStats) -> Self {
        Self { storage, stats }
    }
}

#[async_trait]
impl SubscriptionService for DefaultSubscriptionService {
    async fn subscribe(&self, chat_id: ChatId) -> SubscriptionResult<()> {
        self.storage.add_subscriber(chat_id).await.map_err(SubscriptionError::from)
    }

    async fn add_keyword(&self, chat_id: ChatId, keyword: &str) -> SubscriptionResult<bool> {
        // The subscriber row must exist for the foreign key to hold; chats
        // that only ever issued commands have not been registered yet.
        self.storage.add_subscriber(chat_id).await?;
        self.storage
            .add_keyword_subscription(chat_id, keyword)
            .await
            .map_err(SubscriptionError::from)
    }

    async fn remove_keyword(&self, chat_id: ChatId, keyword: &str) -> SubscriptionResult<bool> {
        self.storage
            .remove_keyword_subscription(chat_id, keyword)
            .await
            .map_err(SubscriptionError::from)
    }

    async fn list_keywords(&self, chat_id: ChatId) -> SubscriptionResult<Vec<String>> {
        self.storage.list_keywords_for(chat_id).await.map_err(SubscriptionError::from)
    }

    async fn status(&self) -> SubscriptionResult<StatusReport> {
        let keyword_count = self.storage.count_distinct_keywords().await?;
        let product_count = self.storage.count_products().await?;
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone();

        Ok(StatusReport { keyword_count, product_count, stats })
    }

    async fn query_products(&self, keyword: &str) -> SubscriptionResult<Vec<Product>> {
        self.storage.search_products_by_name(keyword).await.map_err(SubscriptionError::from)
    }

    async fn suggest_keywords(&self, partial: &str) -> SubscriptionResult<Vec<String>> {
        self.storage.search_keywords(partial).await.map_err(SubscriptionError::from)
    }
}
