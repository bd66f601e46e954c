//! Messaging-backend boundary.
//!
//! The conversation handler only talks to the chat platform through the
//! [`Messenger`] trait and only sees inbound traffic as [`IncomingMessage`].
//! The Telegram channel implements the trait for `teloxide::Bot`; tests use
//! a recording implementation.

use std::future::Future;

use crate::error::AppError;
use crate::session::ChatId;

/// Platform user identifier.
pub type UserId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with the bot.
    Private,
    /// Group or supergroup; subject to moderation.
    Group,
    /// Broadcast channel or anything else.
    Other,
}

/// One inbound text message, stripped down to what the handler needs.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    pub sender_id: UserId,
    /// Display name (first name) of the sender.
    pub sender_name: String,
    pub sender_username: Option<String>,
    pub text: String,
}

impl IncomingMessage {
    /// `@username` when the sender has one, otherwise the display name.
    pub fn sender_mention(&self) -> String {
        match &self.sender_username {
            Some(username) => format!("@{username}"),
            None => self.sender_name.clone(),
        }
    }

    pub fn is_group(&self) -> bool {
        self.chat_kind == ChatKind::Group
    }
}

/// How the transport should interpret outbound text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    Plain,
    /// Telegram HTML subset; dynamic fragments must be escaped.
    Html,
}

/// Outbound capabilities of the messaging backend.
pub trait Messenger: Send + Sync {
    fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: TextFormat,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Remove `user_id` from the group `chat_id`.
    fn ban_member(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Show the "typing…" indicator.
    fn send_typing(&self, chat_id: ChatId) -> impl Future<Output = Result<(), AppError>> + Send;
}
