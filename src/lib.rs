#![warn(missing_docs)]
//! A Telegram bot for tracking product prices.
//!
//! The bot polls a vendor product-search API for every subscribed keyword,
//! stores product state in SQLite, and notifies subscribers of new listings
//! and price changes. A small HTTP endpoint exposes the current catalog.

/// The main handler for the bot's logic.
pub mod bot_handler;
/// The client for the vendor product-search API.
pub mod catalog;
/// The configuration for the application.
pub mod config;
/// The dispatcher for routing updates to the correct handlers.
pub mod dispatcher;
/// The service for sending messages to the user.
pub mod messaging;
/// The scheduler running fetch cycles and the diff-and-notify engine.
pub mod poller;
/// The HTTP read endpoint for the product catalog.
pub mod server;
/// The storage layer for persisting data.
pub mod storage;
/// The service for managing keyword subscriptions.
pub mod subscription;

use std::sync::Arc;

use teloxide::prelude::*;

use crate::{
    bot_handler::BotHandler,
    catalog::DefaultCatalogClient,
    config::Config,
    messaging::{MessagingService, TelegramMessagingService},
    poller::{CatalogPoller, SharedFetchStats},
    storage::sqlite::SqliteCatalogStorage,
    subscription::DefaultSubscriptionService,
};

/// Runs the bot, the fetch scheduler, and the read endpoint.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let storage = Arc::new(SqliteCatalogStorage::new(&config.database_url).await?);
    let bot = Bot::new(config.telegram_bot_token.clone());
    let catalog_client =
        Arc::new(DefaultCatalogClient::new(&config.search_api_url, &config.site_base_url)?);

    let messaging_service = Arc::new(TelegramMessagingService::new(bot.clone()));
    messaging_service.register_commands().await?;

    let stats = SharedFetchStats::default();

    let poller = Arc::new(CatalogPoller::new(
        catalog_client,
        storage.clone(),
        messaging_service.clone(),
        config.fetch_interval,
        config.max_concurrency,
        stats.clone(),
    ));

    // Spawn the scheduled fetch cycles.
    {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run().await });
    }

    // Spawn the product read endpoint.
    {
        let storage = storage.clone();
        let port = config.http_port;
        tokio::spawn(async move {
            if let Err(e) = server::serve(storage, port).await {
                tracing::error!("HTTP server failed: {e}");
            }
        });
    }

    let subscription_service = Arc::new(DefaultSubscriptionService::new(storage, stats));
    let handler = Arc::new(BotHandler::new(messaging_service, subscription_service, poller));
    let mut dispatcher = dispatcher::BotDispatcher::new(handler).build(bot);
    tracing::debug!("Dispatcher built successfully.");

    dispatcher.dispatch().await;

    Ok(())
}
