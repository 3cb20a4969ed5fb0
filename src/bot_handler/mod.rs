
use std::sync::Arc;

use teloxide::{
    types::{ChatId, InlineQuery, Message},
    utils::command::BotCommands,
};
use thiserror::Error;

use crate::{
    messaging::{MessagingError, MessagingService},
    poller::FetchTrigger,
    subscription::SubscriptionService,
};

const ADD_USAGE: &str = "Please provide a keyword to add. Usage: /add <keyword>";
const REMOVE_USAGE: &str = "Please provide a keyword to remove. Usage: /remove <keyword>";
const QUERY_USAGE: &str = "Please provide a keyword to query. Usage: /q <keyword>";

/// The commands the bot understands.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    /// Get system status.
    #[command(description = "Get system status.")]
    Status,
    /// Query tracked products by keyword.
    #[command(description = "Query products.")]
    Q(String),
    /// Subscribe a keyword.
    #[command(description = "Add a keyword to track.")]
    Add(String),
    /// Unsubscribe a keyword.
    #[command(description = "Remove a keyword.")]
    Remove(String),
    /// List this chat's keywords.
    #[command(description = "List all keywords.")]
    List,
}

/// Errors returned by the bot handler.
#[derive(Debug, Error)]
pub enum BotHandlerError {
    /// A reply could not be delivered.
    #[error("Failed to send message: {0}")]
    Messaging(#[from] MessagingError),
}

/// Result type for bot handler operations.
pub type BotHandlerResult<T> = Result<T, BotHandlerError>;

/// Routes inbound Telegram updates to the subscription manager and the
/// catalog queries, and replies to the user.
///
/// Store failures are logged and answered with a failure message; only
/// delivery failures propagate to the dispatcher.
pub struct BotHandler {
    messaging_service: Arc<dyn MessagingService>,
    subscription_service: Arc<dyn SubscriptionService>,
    fetch_trigger: Arc<dyn FetchTrigger>,
}

impl BotHandler {
    /// Creates a new `BotHandler` instance.
    pub fn new(
        messaging_service: Arc<dyn MessagingService>,
        subscription_service: Arc<dyn SubscriptionService>,
        fetch_trigger: Arc<dyn FetchTrigger>,
    ) -> Self {
        Self { messaging_service, subscription_service, fetch_trigger }
    }

    /// Dispatches the incoming command to the appropriate handler.
    pub async fn handle_commands(&self, msg: &Message, cmd: Command) -> BotHandlerResult<()> {
        let chat_id = msg.chat.id;

        match cmd {
            Command::Status => self.process_status(chat_id).await,
            Command::Q(keyword) => self.process_query(chat_id, keyword.trim()).await,
            Command::Add(keyword) => self.process_add(chat_id, keyword.trim()).await,
            Command::Remove(keyword) => self.process_remove(chat_id, keyword.trim()).await,
            Command::List => self.process_list(chat_id).await,
        }
    }

    /// Handle a plain (non-command) message: register the chat as a
    /// subscriber and confirm.
    pub async fn handle_message(&self, msg: &Message) -> BotHandlerResult<()> {
        self.process_subscribe(msg.chat.id).await
    }

    async fn process_subscribe(&self, chat_id: ChatId) -> BotHandlerResult<()> {
        match self.subscription_service.subscribe(chat_id).await {
            Ok(()) => self.messaging_service.send_subscribed_msg(chat_id).await?,
            Err(e) => {
                tracing::error!("Failed to subscribe chat {chat_id}: {e:?}");
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to subscribe.")
                    .await?;
            }
        }

        Ok(())
    }

    /// Reply to a message that looks like a command but did not parse.
    pub async fn handle_unknown_command(&self, msg: &Message) -> BotHandlerResult<()> {
        self.messaging_service.send_unknown_command_msg(msg.chat.id).await.map_err(Into::into)
    }

    /// Answer an inline query with matching subscribed keywords.
    pub async fn handle_inline_query(&self, query: &InlineQuery) -> BotHandlerResult<()> {
        self.process_suggestions(&query.id, &query.query).await
    }

    async fn process_suggestions(&self, query_id: &str, text: &str) -> BotHandlerResult<()> {
        match self.subscription_service.suggest_keywords(text).await {
            Ok(keywords) => {
                self.messaging_service.answer_keyword_suggestions(query_id, keywords).await?;
            }
            Err(e) => {
                tracing::error!("Failed to suggest keywords for '{text}': {e:?}");
            }
        }

        Ok(())
    }

    async fn process_status(&self, chat_id: ChatId) -> BotHandlerResult<()> {
        match self.subscription_service.status().await {
            Ok(report) => self.messaging_service.send_status_msg(chat_id, &report).await?,
            Err(e) => {
                tracing::error!("Failed to assemble status for chat {chat_id}: {e:?}");
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to query system status.")
                    .await?;
            }
        }

        Ok(())
    }

    async fn process_query(&self, chat_id: ChatId, keyword: &str) -> BotHandlerResult<()> {
        if keyword.is_empty() {
            return self
                .messaging_service
                .send_usage_msg(chat_id, QUERY_USAGE)
                .await
                .map_err(Into::into);
        }

        match self.subscription_service.query_products(keyword).await {
            Ok(products) if products.is_empty() => {
                self.messaging_service.send_no_products_msg(chat_id, keyword).await?;
            }
            Ok(products) => {
                self.messaging_service.send_product_list_msgs(chat_id, products).await?;
            }
            Err(e) => {
                tracing::error!("Failed to query products for '{keyword}': {e:?}");
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to query products.")
                    .await?;
            }
        }

        Ok(())
    }

    async fn process_add(&self, chat_id: ChatId, keyword: &str) -> BotHandlerResult<()> {
        if keyword.is_empty() {
            return self
                .messaging_service
                .send_usage_msg(chat_id, ADD_USAGE)
                .await
                .map_err(Into::into);
        }

        match self.subscription_service.add_keyword(chat_id, keyword).await {
            Ok(_) => {
                self.messaging_service.send_keyword_added_msg(chat_id, keyword).await?;

                // Capture the new keyword's current listings right away
                // instead of waiting for the next scheduled tick.
                if let Err(e) = self.fetch_trigger.trigger_fetch().await {
                    tracing::error!("Fetch cycle after adding '{keyword}' failed: {e:?}");
                }
            }
            Err(e) => {
                tracing::error!("Failed to add keyword '{keyword}' for chat {chat_id}: {e:?}");
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to add keyword.")
                    .await?;
            }
        }

        Ok(())
    }

    async fn process_remove(&self, chat_id: ChatId, keyword: &str) -> BotHandlerResult<()> {
        if keyword.is_empty() {
            return self
                .messaging_service
                .send_usage_msg(chat_id, REMOVE_USAGE)
                .await
                .map_err(Into::into);
        }

        match self.subscription_service.remove_keyword(chat_id, keyword).await {
            Ok(_) => {
                self.messaging_service.send_keyword_removed_msg(chat_id, keyword).await?;
            }
            Err(e) => {
                tracing::error!(
                    "Failed to remove keyword '{keyword}' for chat {chat_id}: {e:?}"
                );
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to remove keyword.")
                    .await?;
            }
        }

        Ok(())
    }

    async fn process_list(&self, chat_id: ChatId) -> BotHandlerResult<()> {
        match self.subscription_service.list_keywords(chat_id).await {
            Ok(keywords) => {
                self.messaging_service.send_keyword_list_msg(chat_id, keywords).await?;
            }
            Err(e) => {
                tracing::error!("Failed to list keywords for chat {chat_id}: {e:?}");
                self.messaging_service
                    .send_failure_msg(chat_id, "Failed to list keywords.")
                    .await?;
            }
        }

        Ok(())
    }
}
