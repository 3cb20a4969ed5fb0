
use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::storage::Price;

/// Errors returned by the catalog fetcher.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The HTTP request could not be sent or completed.
    #[error("Search request failed: {source}")]
    Request {
        /// The underlying transport error.
        #[from]
        source: reqwest::Error,
    },
    /// The vendor answered with a non-success status.
    #[error("Search returned HTTP {status}: {body}")]
    Status {
        /// The HTTP status code.
        status: StatusCode,
        /// The response body, for diagnostics.
        body: String,
    },
    /// The response body was not the expected JSON shape.
    #[error("Failed to decode search response: {0}")]
    Decode(String),
    /// A configured endpoint URL is not a valid URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// One product listing as returned by the vendor search API.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Listing {
    /// The product name.
    #[serde(default)]
    pub name: String,
    /// The listed price.
    #[serde(default)]
    pub price: Price,
    /// The product URL, absolute after normalization.
    #[serde(default)]
    pub url: String,
    /// The vendor-assigned product code.
    #[serde(default)]
    pub code: String,
}

/// Pagination metadata attached to every search response.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SearchPagination {
    /// The zero-based page this response covers.
    #[serde(rename = "currentPage", default)]
    pub current_page: i64,
    /// The number of records per page.
    #[serde(rename = "pageSize", default)]
    pub page_size: i64,
    /// The total number of pages for the query.
    #[serde(rename = "totalPages", default)]
    pub total_pages: i64,
    /// The total number of matching records.
    #[serde(rename = "totalResults", default)]
    pub total_results: i64,
}

/// One page of the vendor search response.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    /// The product records on this page.
    #[serde(default)]
    pub products: Vec<Listing>,
    /// Pagination metadata.
    #[serde(default)]
    pub pagination: SearchPagination,
}

/// Client for the vendor product-search API.
#[automock]
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Fetch every result page for a keyword and return the normalized,
    /// per-code deduplicated listings in first-seen order.
    async fn search_all_pages(&self, keyword: &str) -> CatalogResult<Vec<Listing>>;
}

/// [`CatalogClient`] backed by `reqwest`, with transient-failure retry.
#[derive(Clone)]
pub struct DefaultCatalogClient {
    client: Client,
    search_api_url: String,
    site_base_url: String,
}

impl DefaultCatalogClient {
    /// Create a new client. Both endpoint URLs are validated up front.
    pub fn new(search_api_url: &str, site_base_url: &str) -> CatalogResult<Self> {
        Url::parse(search_api_url)?;
        Url::parse(site_base_url)?;

        let client = Client::builder().user_agent("price-watch-bot").build()?;

        Ok(Self {
            client,
            search_api_url: search_api_url.to_string(),
            site_base_url: site_base_url.to_string(),
        })
    }

    /// Re-usable configuration for exponential backoff.
    fn backoff_config() -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(30),
            max_elapsed_time: Some(Duration::from_secs(60)),
            multiplier: 2.0,
            ..Default::default()
        }
    }

    /// Fetch and decode a single result page, retrying transient failures.
    async fn fetch_page(&self, keyword: &str, page: i64) -> CatalogResult<SearchResponse> {
        let operation = || async {
            let resp = self
                .client
                .get(&self.search_api_url)
                .query(&[("query", keyword.to_string()), ("currentPage", page.to_string())])
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!("Network error fetching search page: {e}. Retrying...");
                    BackoffError::transient(CatalogError::from(e))
                })?;

            let status = resp.status();
            if !status.is_success() {
                let body = match resp.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        tracing::warn!("Failed to read response text: {e}. Using empty fallback.");
                        String::new()
                    }
                };
                let err = CatalogError::Status { status, body };
                let be = if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!("Non-success HTTP {status}. Retrying...");
                    BackoffError::transient(err)
                } else {
                    BackoffError::permanent(err)
                };
                return Err(be);
            }

            resp.json::<SearchResponse>().await.map_err(|e| {
                BackoffError::permanent(CatalogError::Decode(e.to_string()))
            })
        };

        retry(Self::backoff_config(), operation).await
    }
}

#[async_trait]
impl CatalogClient for DefaultCatalogClient {
    async fn search_all_pages(&self, keyword: &str) -> CatalogResult<Vec<Listing>> {
        let mut listings = Vec::new();
        let mut seen_codes = HashSet::new();
        let mut page = 0;

        loop {
            tracing::debug!("Fetching page {page} for keyword '{keyword}'");
            let response = self.fetch_page(keyword, page).await?;

            for raw in response.products {
                let Some(listing) = validate_listing(raw, &self.site_base_url) else {
                    continue;
                };
                if seen_codes.insert(listing.code.clone()) {
                    listings.push(listing);
                }
            }

            if page + 1 >= response.pagination.total_pages {
                break;
            }
            page += 1;
        }

        Ok(listings)
    }
}

/// Drop malformed records and normalize the product URL.
fn validate_listing(mut listing: Listing, site_base_url: &str) -> Option<Listing> {
    if listing.name.is_empty()
        || listing.price.value == 0.0
        || listing.url.is_empty()
        || listing.code.is_empty()
    {
        tracing::warn!("Incomplete product data: {listing:?}");
        return None;
    }

    listing.url = normalize_product_url(site_base_url, &listing.url);
    Some(listing)
}

/// Absolutize a product URL against the site base and collapse an accidental
/// double path separator immediately after the domain, first occurrence only.
fn normalize_product_url(site_base_url: &str, url: &str) -> String {
    let absolute = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{site_base_url}{url}")
    };

    absolute.replacen(&format!("{site_base_url}//"), &format!("{site_base_url}/"), 1)
}
