//! Telegram channel. Long-polls updates, hands text messages to the
//! [`ChatHandler`], and implements [`Messenger`] on top of `teloxide::Bot`.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, ParseMode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::generator::ResponseGenerator;
use crate::handler::ChatHandler;
use crate::messenger::{ChatKind, IncomingMessage, Messenger, TextFormat, UserId as SenderId};
use crate::session::ChatId as ChatKey;

// ── Messenger for Bot ───────────────────────────────────────────────────────

impl Messenger for Bot {
    async fn send_text(&self, chat_id: ChatKey, text: &str, format: TextFormat) -> Result<(), AppError> {
        let request = self.send_message(ChatId(chat_id), text.to_string());
        let request = match format {
            TextFormat::Plain => request,
            TextFormat::Html => request.parse_mode(ParseMode::Html),
        };
        request
            .await
            .map(|_| ())
            .map_err(|e| AppError::Transport(format!("send_message: {e}")))
    }

    async fn ban_member(&self, chat_id: ChatKey, user_id: SenderId) -> Result<(), AppError> {
        self.ban_chat_member(ChatId(chat_id), UserId(user_id))
            .await
            .map(|_| ())
            .map_err(|e| AppError::Transport(format!("ban_chat_member: {e}")))
    }

    async fn send_typing(&self, chat_id: ChatKey) -> Result<(), AppError> {
        self.send_chat_action(ChatId(chat_id), ChatAction::Typing)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Transport(format!("send_chat_action: {e}")))
    }
}

/// Reduce a Telegram message to what the handler needs. Messages without
/// text (stickers, photos, service messages) or without a sender yield
/// `None`.
pub fn incoming(msg: &Message) -> Option<IncomingMessage> {
    let text = msg.text()?;
    let from = msg.from.as_ref()?;
    let chat_kind = if msg.chat.is_group() || msg.chat.is_supergroup() {
        ChatKind::Group
    } else if msg.chat.is_private() {
        ChatKind::Private
    } else {
        ChatKind::Other
    };
    Some(IncomingMessage {
        chat_id: msg.chat.id.0,
        chat_kind,
        sender_id: from.id.0,
        sender_name: from.first_name.clone(),
        sender_username: from.username.clone(),
        text: text.to_string(),
    })
}

// ── run ─────────────────────────────────────────────────────────────────────

/// Run the long-polling loop until `shutdown` is cancelled.
///
/// Updates for the same chat are handled in order; different chats run
/// concurrently.
pub async fn run(
    config: &Config,
    generator: ResponseGenerator,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let bot = Bot::new(config.require_telegram_token()?);

    let me = bot
        .get_me()
        .await
        .map_err(|e| AppError::Transport(format!("get_me failed (check TELEGRAM_BOT_TOKEN): {e}")))?;
    let username = me.username().to_string();
    info!(bot = %username, provider = generator.provider().name(), "telegram channel starting");

    let handler = Arc::new(ChatHandler::new(config, generator).with_bot_username(username));

    let endpoint = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let handler = handler.clone();
        async move {
            match incoming(&msg) {
                Some(incoming) => {
                    let outcome = handler.handle(&bot, incoming).await;
                    debug!(chat_id = msg.chat.id.0, ?outcome, "message handled");
                }
                None => debug!(chat_id = msg.chat.id.0, "non-text message ignored"),
            }
            respond(())
        }
    });

    let mut dispatcher = Dispatcher::builder(bot, endpoint).build();

    tokio::select! {
        biased;

        _ = shutdown.cancelled() => {
            info!("shutdown signal received, closing telegram channel");
        }
        _ = dispatcher.dispatch() => {
            warn!("telegram dispatcher exited unexpectedly");
        }
    }

    Ok(())
}
