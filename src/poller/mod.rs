
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use mockall::automock;
use thiserror::Error;

use crate::{
    catalog::{CatalogClient, CatalogError, Listing},
    messaging::MessagingService,
    storage::{CatalogStorage, StorageError},
};

/// Errors returned by the poller.
#[derive(Debug, Error)]
pub enum PollerError {
    /// The vendor catalog could not be fetched.
    #[error("Failed to fetch the product catalog")]
    Catalog(#[from] CatalogError),
    /// The storage layer failed.
    #[error("Failed to access storage")]
    Storage(#[from] StorageError),
}

/// Result type for poller operations.
pub type PollerResult<T> = Result<T, PollerError>;

/// Ephemeral counters for the most recent fetch cycle. Reset when a cycle
/// starts; lost on restart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchStats {
    /// When the last fetch cycle started.
    pub last_fetch_time: Option<DateTime<Utc>>,
    /// How many listings the last cycle fetched across all keywords.
    pub total_products_fetched: usize,
    /// Keywords whose fetch failed during the last cycle.
    pub failed_keywords: Vec<String>,
}

/// Shared handle to the cycle counters, read by the status command.
pub type SharedFetchStats = Arc<Mutex<FetchStats>>;

/// Allows an immediate fetch cycle to be requested outside the schedule.
#[automock]
#[async_trait]
pub trait FetchTrigger: Send + Sync {
    /// Run one full fetch cycle over every subscribed keyword.
    async fn trigger_fetch(&self) -> PollerResult<()>;
}

/// Periodically fetches the catalog for every subscribed keyword, diffs it
/// against the store, and notifies subscribers of new listings and price
/// changes.
#[derive(Clone)]
pub struct CatalogPoller {
    catalog_client: Arc<dyn CatalogClient>,
    storage: Arc<dyn CatalogStorage>,
    messaging_service: Arc<dyn MessagingService>,
    // The interval in seconds between fetch cycles.
    poll_interval: u64,
    // The maximum number of concurrent notification sends.
    max_concurrency: usize,
    stats: SharedFetchStats,
}

impl CatalogPoller {
    /// Create a new CatalogPoller.
    pub fn new(
        catalog_client: Arc<dyn CatalogClient>,
        storage: Arc<dyn CatalogStorage>,
        messaging_service: Arc<dyn MessagingService>,
        poll_interval: u64,
        max_concurrency: usize,
        stats: SharedFetchStats,
    ) -> Self {
        Self { catalog_client, storage, messaging_service, poll_interval, max_concurrency, stats }
    }

    fn lock_stats(&self) -> MutexGuard<'_, FetchStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run the poller. The first cycle starts immediately; subsequent cycles
    /// follow the configured interval. Cycle failures are logged, never
    /// fatal.
    pub async fn run(&self) {
        tracing::debug!("Starting catalog poller");

        let mut interval = tokio::time::interval(Duration::from_secs(self.poll_interval));

        loop {
            interval.tick().await;
            if let Err(e) = self.run_cycle().await {
                tracing::error!("Fetch cycle failed: {e:?}");
            }
        }
    }

    /// Run one fetch cycle over every distinct subscribed keyword,
    /// sequentially. A keyword whose fetch fails is recorded and skipped;
    /// the cycle continues with the next keyword.
    pub async fn run_cycle(&self) -> PollerResult<()> {
        let keywords = self.storage.list_distinct_keywords().await?;

        {
            let mut stats = self.lock_stats();
            stats.last_fetch_time = Some(Utc::now());
            stats.total_products_fetched = 0;
            stats.failed_keywords.clear();
        }

        for keyword in keywords {
            match self.poll_keyword(&keyword).await {
                Ok(fetched) => {
                    tracing::info!("Keyword: {keyword}, Total Products Fetched: {fetched}");
                    self.lock_stats().total_products_fetched += fetched;
                }
                Err(e) => {
                    tracing::error!(
                        "Fetch failed for keyword '{keyword}': {e:?}. Skipping for this cycle."
                    );
                    self.lock_stats().failed_keywords.push(keyword);
                }
            }
        }

        Ok(())
    }

    /// Fetch all listings for one keyword and diff each against the store.
    /// Returns the number of listings fetched.
    async fn poll_keyword(&self, keyword: &str) -> PollerResult<usize> {
        tracing::debug!("Polling catalog for keyword: {keyword}");

        let listings = self.catalog_client.search_all_pages(keyword).await?;
        let fetched = listings.len();

        for listing in &listings {
            // A failure on one product must not take down the rest of the
            // keyword's listings.
            if let Err(e) = self.check_and_notify(listing, keyword).await {
                tracing::error!("Failed to process product {}: {e:?}", listing.code);
            }
        }

        Ok(fetched)
    }

    /// Diff one listing against the store and notify the keyword's
    /// subscribers of a new listing or a changed price. Unchanged prices
    /// write nothing and notify no one.
    async fn check_and_notify(&self, listing: &Listing, keyword: &str) -> PollerResult<()> {
        match self.storage.get_product_price(&listing.code).await? {
            None => {
                self.storage
                    .insert_new_product(
                        &listing.code,
                        &listing.name,
                        listing.price.value,
                        &listing.url,
                    )
                    .await?;

                let message =
                    format_price_message(&listing.name, None, listing.price.value, &listing.url);
                self.notify_subscribers(keyword, &message).await?;
            }
            Some(old_price) if old_price != listing.price.value => {
                self.storage.update_product_price(&listing.code, listing.price.value).await?;

                let message = format_price_message(
                    &listing.name,
                    Some(old_price),
                    listing.price.value,
                    &listing.url,
                );
                self.notify_subscribers(keyword, &message).await?;
            }
            Some(_) => {}
        }

        Ok(())
    }

    /// Send a composed alert to every subscriber of a keyword. A failed send
    /// is logged and never blocks delivery to the remaining subscribers.
    async fn notify_subscribers(&self, keyword: &str, message: &str) -> PollerResult<()> {
        let subscribers = self.storage.subscribers_of_keyword(keyword).await?;

        let sends = subscribers.into_iter().map(|chat_id| async move {
            (chat_id, self.messaging_service.send_price_alert(chat_id, message).await)
        });

        let mut buffered_sends = stream::iter(sends).buffer_unordered(self.max_concurrency);

        while let Some((chat_id, result)) = buffered_sends.next().await {
            if let Err(e) = result {
                tracing::error!("Failed to send message to chat ID {chat_id}: {e:?}");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl FetchTrigger for CatalogPoller {
    async fn trigger_fetch(&self) -> PollerResult<()> {
        self.run_cycle().await
    }
}

/// The wire-visible notification template. New listings show a single price;
/// price changes show old and new. Prices always render with two decimals.
pub(crate) fn format_price_message(
    name: &str,
    old_price: Option<f64>,
    new_price: f64,
    url: &str,
) -> String {
    match old_price {
        None => format!("*{name}*\nPrice: *{new_price:.2}*\n[Check it out!]({url})"),
        Some(old_price) => format!(
            "*{name}*\nOld Price: *{old_price:.2}*\nNew Price: *{new_price:.2}*\n[Check it out!]({url})"
        ),
    }
}
