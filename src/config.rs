use std::env::{self, VarError};

const DEFAULT_DATABASE_URL: &str = "sqlite:products.db";
const DEFAULT_SEARCH_API_URL: &str =
    "https://www.costco.com.tw/rest/v2/taiwan/products/search";
const DEFAULT_SITE_BASE_URL: &str = "https://www.costco.com.tw";
const DEFAULT_FETCH_INTERVAL_SECS: u64 = 600;
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Represents the application configuration.
#[derive(Debug)]
pub struct Config {
    /// The Telegram bot token.
    pub telegram_bot_token: String,
    /// The URL of the database.
    pub database_url: String,
    /// The vendor product-search endpoint.
    pub search_api_url: String,
    /// The base URL used to absolutize relative product URLs.
    pub site_base_url: String,
    /// The interval in seconds between scheduled fetch cycles.
    pub fetch_interval: u64,
    /// The port the product read endpoint listens on.
    pub http_port: u16,
    /// The maximum number of concurrent notification sends.
    pub max_concurrency: usize,
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    pub fn from_env() -> Result<Self, VarError> {
        Ok(Self {
            telegram_bot_token: env::var("TELOXIDE_TOKEN")?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            search_api_url: env::var("SEARCH_API_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_API_URL.to_string()),
            site_base_url: env::var("SITE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_SITE_BASE_URL.to_string()),
            fetch_interval: env::var("FETCH_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_FETCH_INTERVAL_SECS),
            http_port: env::var("HTTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_HTTP_PORT),
            max_concurrency: env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
        })
    }
}

#[cfg(test)]
mod tests {
    use temp_env::with_vars;

    use super::*;

    #[test]
    fn test_from_env() {
        with_vars(
            [
                ("TELOXIDE_TOKEN", Some("test telegram bot token")),
                ("DATABASE_URL", Some("sqlite:test/test.db")),
                ("SEARCH_API_URL", Some("https://vendor.example/search")),
                ("SITE_BASE_URL", Some("https://vendor.example")),
                ("FETCH_INTERVAL_SECS", Some("60")),
                ("HTTP_PORT", Some("9090")),
                ("MAX_CONCURRENCY", Some("5")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.telegram_bot_token, "test telegram bot token");
                assert_eq!(config.database_url, "sqlite:test/test.db");
                assert_eq!(config.search_api_url, "https://vendor.example/search");
                assert_eq!(config.site_base_url, "https://vendor.example");
                assert_eq!(config.fetch_interval, 60);
                assert_eq!(config.http_port, 9090);
                assert_eq!(config.max_concurrency, 5);
            },
        );
    }

    #[test]
    fn test_missing_telegram_bot_token_error() {
        with_vars(
            [
                ("DATABASE_URL", Some("sqlite:test/test.db")),
                ("TELOXIDE_TOKEN", None),
            ],
            || {
                let config = Config::from_env();
                assert!(config.is_err());
            },
        );
    }

    #[test]
    fn test_missing_optional_vars_defaults() {
        with_vars(
            [
                ("TELOXIDE_TOKEN", Some("test telegram bot token")),
                ("DATABASE_URL", None),
                ("SEARCH_API_URL", None),
                ("SITE_BASE_URL", None),
                ("FETCH_INTERVAL_SECS", None),
                ("HTTP_PORT", None),
                ("MAX_CONCURRENCY", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
                assert_eq!(config.search_api_url, DEFAULT_SEARCH_API_URL);
                assert_eq!(config.site_base_url, DEFAULT_SITE_BASE_URL);
                assert_eq!(config.fetch_interval, DEFAULT_FETCH_INTERVAL_SECS);
                assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
                assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
            },
        );
    }

    #[test]
    fn test_unparseable_interval_falls_back() {
        with_vars(
            [
                ("TELOXIDE_TOKEN", Some("test telegram bot token")),
                ("FETCH_INTERVAL_SECS", Some("not a number")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.fetch_interval, DEFAULT_FETCH_INTERVAL_SECS);
            },
        );
    }
}
