//! Outbound reply chunking.
//!
//! Telegram rejects messages over 4096 characters, so long replies are cut
//! into consecutive pieces of at most `limit` characters (Unicode scalar
//! values, not bytes). Cuts are positional and may fall mid-word.

use tracing::{debug, warn};

use crate::messenger::{Messenger, TextFormat};
use crate::session::ChatId;

/// Default chunk length; leaves headroom under Telegram's 4096 limit.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Split `text` into ordered chunks of at most `limit` characters whose
/// concatenation is exactly `text`. Empty input yields no chunks.
pub fn split_reply(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == limit {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(text[start..].to_string());
    }
    chunks
}

/// Send `text` to `chat_id` chunk by chunk, in order.
///
/// Stops at the first failed send; later chunks are not attempted.
/// Returns the number of chunks delivered.
pub async fn dispatch_reply<M: Messenger>(
    messenger: &M,
    chat_id: ChatId,
    text: &str,
    limit: usize,
    format: TextFormat,
) -> usize {
    let chunks = split_reply(text, limit);
    let total = chunks.len();
    for (i, chunk) in chunks.iter().enumerate() {
        if let Err(e) = messenger.send_text(chat_id, chunk, format).await {
            warn!(chat_id, chunk = i + 1, total, error = %e, "failed to send reply chunk");
            return i;
        }
    }
    if total > 1 {
        debug!(chat_id, total, "sent chunked reply");
    }
    total
}
