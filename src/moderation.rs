//! Restricted-word moderation for group chats.
//!
//! A group message containing any denylist entry (case-insensitive
//! substring) gets its sender banned and the group notified. Only the first
//! matching entry counts, so one message triggers at most one ban.

use tracing::{error, warn};

use crate::messenger::{IncomingMessage, Messenger, TextFormat};

/// Static, lower-cased list of restricted substrings.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    words: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// First entry (in list order) contained in `text`, ignoring case.
    pub fn find(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.words.iter().find(|w| text.contains(w.as_str())).map(String::as_str)
    }
}

/// Result of enforcing a denylist match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcement {
    pub word: String,
    pub banned: bool,
    pub notified: bool,
}

pub fn removal_notice(msg: &IncomingMessage, word: &str) -> String {
    format!(
        "🚨 User {} was removed for using restricted word: '{word}'",
        msg.sender_mention()
    )
}

/// Ban the sender of `msg` and notify the chat.
///
/// A failed ban (already removed, bot lacks rights) is logged and the
/// notice is still sent.
pub async fn enforce<M: Messenger>(messenger: &M, msg: &IncomingMessage, word: &str) -> Enforcement {
    let banned = match messenger.ban_member(msg.chat_id, msg.sender_id).await {
        Ok(()) => {
            warn!(chat_id = msg.chat_id, user_id = msg.sender_id, word, "banned user for restricted word");
            true
        }
        Err(e) => {
            error!(chat_id = msg.chat_id, user_id = msg.sender_id, error = %e, "ban failed");
            false
        }
    };

    let notified = match messenger
        .send_text(msg.chat_id, &removal_notice(msg, word), TextFormat::Plain)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            error!(chat_id = msg.chat_id, error = %e, "failed to send moderation notice");
            false
        }
    };

    Enforcement { word: word.to_string(), banned, notified }
}
