#[cfg(test)]
mod tests;

use async_trait::async_trait;
use mockall::automock;
use teloxide::{
    prelude::*,
    types::{
        ChatId, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
        InputMessageContentText, ParseMode,
    },
    utils::command::BotCommands,
};
use thiserror::Error;

use crate::{bot_handler::Command, storage::Product, subscription::StatusReport};

/// The Telegram hard limit on message length, in bytes.
const MAX_MESSAGE_LENGTH: usize = 4096;

/// Errors returned by the messaging service.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// The Telegram API rejected or failed the request.
    #[error("Telegram API request failed: {0}")]
    TeloxideRequest(#[from] teloxide::RequestError),
}

/// Result type for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Trait for sending messages to the user.
#[automock]
#[async_trait]
pub trait MessagingService: Send + Sync {
    /// Registers the bot's command list with the platform.
    async fn register_commands(&self) -> MessagingResult<()>;

    /// Confirms a subscription to price drop notifications.
    async fn send_subscribed_msg(&self, chat_id: ChatId) -> MessagingResult<()>;

    /// Sends a price alert composed by the diff engine.
    async fn send_price_alert(&self, chat_id: ChatId, message: &str) -> MessagingResult<()>;

    /// Sends a usage hint for a command that is missing its argument.
    async fn send_usage_msg(&self, chat_id: ChatId, text: &str) -> MessagingResult<()>;

    /// Sends a user-visible failure notice.
    async fn send_failure_msg(&self, chat_id: ChatId, text: &str) -> MessagingResult<()>;

    /// Confirms a keyword was added.
    async fn send_keyword_added_msg(&self, chat_id: ChatId, keyword: &str) -> MessagingResult<()>;

    /// Confirms a keyword was removed.
    async fn send_keyword_removed_msg(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> MessagingResult<()>;

    /// Sends the chat's keyword list, or a note that there is none.
    async fn send_keyword_list_msg(
        &self,
        chat_id: ChatId,
        keywords: Vec<String>,
    ) -> MessagingResult<()>;

    /// Sends the system status summary.
    async fn send_status_msg(
        &self,
        chat_id: ChatId,
        report: &StatusReport,
    ) -> MessagingResult<()>;

    /// Sends the product query results, split into messages that respect the
    /// platform length limit.
    async fn send_product_list_msgs(
        &self,
        chat_id: ChatId,
        products: Vec<Product>,
    ) -> MessagingResult<()>;

    /// Tells the user a product query matched nothing.
    async fn send_no_products_msg(&self, chat_id: ChatId, keyword: &str) -> MessagingResult<()>;

    /// Replies to an unrecognized command.
    async fn send_unknown_command_msg(&self, chat_id: ChatId) -> MessagingResult<()>;

    /// Answers an inline query with keyword suggestions. Results are
    /// personal to the requester and never cached.
    async fn answer_keyword_suggestions(
        &self,
        query_id: &str,
        keywords: Vec<String>,
    ) -> MessagingResult<()>;
}

/// Telegram messaging service.
pub struct TelegramMessagingService {
    bot: Bot,
}

impl TelegramMessagingService {
    /// Creates a new `TelegramMessagingService`.
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send_plain(&self, chat_id: ChatId, text: String) -> MessagingResult<()> {
        self.bot
            .send_message(chat_id, text)
            .await
            .map(|_| ())
            .map_err(MessagingError::TeloxideRequest)
    }

    async fn send_markdown(&self, chat_id: ChatId, text: String) -> MessagingResult<()> {
        self.bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Markdown)
            .await
            .map(|_| ())
            .map_err(MessagingError::TeloxideRequest)
    }
}

#[async_trait]
impl MessagingService for TelegramMessagingService {
    async fn register_commands(&self) -> MessagingResult<()> {
        self.bot
            .set_my_commands(Command::bot_commands())
            .await
            .map(|_| ())
            .map_err(MessagingError::TeloxideRequest)
    }

    async fn send_subscribed_msg(&self, chat_id: ChatId) -> MessagingResult<()> {
        self.send_plain(
            chat_id,
            "You have been subscribed to price drop notifications.".to_string(),
        )
        .await
    }

    async fn send_price_alert(&self, chat_id: ChatId, message: &str) -> MessagingResult<()> {
        self.send_markdown(chat_id, message.to_string()).await
    }

    async fn send_usage_msg(&self, chat_id: ChatId, text: &str) -> MessagingResult<()> {
        self.send_markdown(chat_id, text.to_string()).await
    }

    async fn send_failure_msg(&self, chat_id: ChatId, text: &str) -> MessagingResult<()> {
        self.send_markdown(chat_id, text.to_string()).await
    }

    async fn send_keyword_added_msg(&self, chat_id: ChatId, keyword: &str) -> MessagingResult<()> {
        self.send_plain(chat_id, format!("Keyword '{keyword}' added.")).await
    }

    async fn send_keyword_removed_msg(
        &self,
        chat_id: ChatId,
        keyword: &str,
    ) -> MessagingResult<()> {
        self.send_plain(chat_id, format!("Keyword '{keyword}' removed.")).await
    }

    async fn send_keyword_list_msg(
        &self,
        chat_id: ChatId,
        keywords: Vec<String>,
    ) -> MessagingResult<()> {
        self.send_plain(chat_id, format_keyword_list_text(&keywords)).await
    }

    async fn send_status_msg(
        &self,
        chat_id: ChatId,
        report: &StatusReport,
    ) -> MessagingResult<()> {
        self.send_markdown(chat_id, format_status_text(report)).await
    }

    async fn send_product_list_msgs(
        &self,
        chat_id: ChatId,
        products: Vec<Product>,
    ) -> MessagingResult<()> {
        for message in build_product_list_messages(&products) {
            self.send_markdown(chat_id, message).await?;
        }
        Ok(())
    }

    async fn send_no_products_msg(&self, chat_id: ChatId, keyword: &str) -> MessagingResult<()> {
        self.send_markdown(chat_id, format!("No products found for keyword: {keyword}")).await
    }

    async fn send_unknown_command_msg(&self, chat_id: ChatId) -> MessagingResult<()> {
        self.send_plain(chat_id, "Unknown command".to_string()).await
    }

    async fn answer_keyword_suggestions(
        &self,
        query_id: &str,
        keywords: Vec<String>,
    ) -> MessagingResult<()> {
        let results: Vec<InlineQueryResult> = keywords
            .into_iter()
            .map(|keyword| {
                InlineQueryResult::Article(InlineQueryResultArticle::new(
                    keyword.clone(),
                    keyword.clone(),
                    InputMessageContent::Text(InputMessageContentText::new(keyword)),
                ))
            })
            .collect();

        self.bot
            .answer_inline_query(query_id.to_string(), results)
            .cache_time(0)
            .is_personal(true)
            .await
            .map(|_| ())
            .map_err(MessagingError::TeloxideRequest)
    }
}

fn format_keyword_list_text(keywords: &[String]) -> String {
    if keywords.is_empty() {
        "No keywords found.".to_string()
    } else {
        format!("Your keywords: {}", keywords.join(", "))
    }
}

fn format_status_text(report: &StatusReport) -> String {
    let last_fetch = report
        .stats
        .last_fetch_time
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());

    let mut text = format!(
        "*System Status*\n- Keywords: {}\n- Products: {}\n- Last Fetch: {}\n- Total Products Fetched Last Time: {}",
        report.keyword_count, report.product_count, last_fetch, report.stats.total_products_fetched
    );

    if !report.stats.failed_keywords.is_empty() {
        text.push_str(&format!(
            "\n- Failed Keywords Last Time: {}",
            report.stats.failed_keywords.join(", ")
        ));
    }

    text
}

fn format_product_line(product: &Product) -> String {
    format!(
        "*{}*: ${:.2}\n[Check it out!]({})\n",
        product.name, product.price.value, product.url
    )
}

/// Render the product list into messages, flushing whenever appending the
/// next line would cross the platform length limit. Order is preserved.
fn build_product_list_messages(products: &[Product]) -> Vec<String> {
    let mut messages = Vec::new();
    let mut message = String::from("*Product List*\n");

    for product in products {
        let line = format_product_line(product);
        if message.len() + line.len() + 1 > MAX_MESSAGE_LENGTH {
            messages.push(message);
            message = String::new();
        }
        message.push_str(&line);
        message.push('\n');
    }

    if !message.is_empty() {
        messages.push(message);
    }

    messages
}
