use std::sync::Arc;

use teloxide::{
    dispatching::{DefaultKey, UpdateHandler},
    dptree::deps,
    prelude::*,
    types::{InlineQuery, Update},
};

use crate::bot_handler::{BotHandler, Command};

/// Type alias to simplify handler type signatures.
type BotResultHandler = UpdateHandler<anyhow::Error>;

/// Encapsulates the dispatcher logic for the bot.
pub struct BotDispatcher {
    handler: Arc<BotHandler>,
}

impl BotDispatcher {
    /// Creates a new `BotDispatcher`.
    pub fn new(handler: Arc<BotHandler>) -> Self {
        Self { handler }
    }

    /// Builds the dispatcher using the provided `bot` instance.
    ///
    /// Branch order matters: parsed commands first, then the
    /// unknown-command fallback for anything else starting with `/`, then
    /// the implicit-subscribe branch for plain messages.
    #[must_use = "This function returns a Dispatcher that should not be ignored"]
    pub fn build(&self, bot: Bot) -> Dispatcher<Bot, anyhow::Error, DefaultKey> {
        Dispatcher::builder(
            bot,
            dptree::entry()
                .branch(self.build_commands_branch())
                .branch(self.build_unknown_command_branch())
                .branch(self.build_messages_branch())
                .branch(self.build_inline_queries_branch()),
        )
        .dependencies(deps![self.handler.clone()])
        .enable_ctrlc_handler()
        .build()
    }

    /// Builds the branch for handling recognized text commands.
    fn build_commands_branch(&self) -> BotResultHandler {
        Update::filter_message().filter_command::<Command>().endpoint(
            |msg: Message, cmd: Command, handler: Arc<BotHandler>| async move {
                handler.handle_commands(&msg, cmd).await?;
                Ok(())
            },
        )
    }

    /// Builds the branch replying to slash-prefixed text that did not parse
    /// as a command.
    fn build_unknown_command_branch(&self) -> BotResultHandler {
        Update::filter_message()
            .filter(|msg: Message| msg.text().map(|text| text.starts_with('/')).unwrap_or(false))
            .endpoint(|msg: Message, handler: Arc<BotHandler>| async move {
                handler.handle_unknown_command(&msg).await?;
                Ok(())
            })
    }

    /// Builds the branch treating any other message as an implicit
    /// subscribe.
    fn build_messages_branch(&self) -> BotResultHandler {
        Update::filter_message().endpoint(
            |msg: Message, handler: Arc<BotHandler>| async move {
                handler.handle_message(&msg).await?;
                Ok(())
            },
        )
    }

    /// Builds the branch for handling inline queries.
    fn build_inline_queries_branch(&self) -> BotResultHandler {
        Update::filter_inline_query().endpoint(
            |query: InlineQuery, handler: Arc<BotHandler>| async move {
                handler.handle_inline_query(&query).await?;
                Ok(())
            },
        )
    }
}
