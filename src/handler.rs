//! Conversation handler: one call per inbound text message.
//!
//! ```text
//! text ─► moderation (groups) ─► command? ─► history append ─► generate ─► dispatch
//! ```
//!
//! Everything the handler mutates lives in [`SessionStore`]; the chat's
//! session lock is held for the whole unit of work so two messages from the
//! same chat are answered strictly one after the other. No error escapes:
//! failures are logged and turned into user-facing text.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::commands::{self, Command, Parsed};
use crate::config::Config;
use crate::dispatch::dispatch_reply;
use crate::generator::{GenerationError, ResponseGenerator};
use crate::messenger::{IncomingMessage, Messenger, TextFormat, UserId};
use crate::moderation::{self, Denylist, Enforcement};
use crate::session::{Mode, Role, SessionStore};
use crate::status::{self, BotStats, SystemSnapshot};

/// What the handler did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Empty text or a command for another bot.
    Ignored,
    /// Sender removed; the message went no further.
    Moderated(Enforcement),
    Command,
    /// Model reply delivered in `chunks` messages.
    Replied { chunks: usize },
    /// Generation failed; the user got the timeout or apology text.
    Failed,
}

pub struct ChatHandler {
    sessions: SessionStore,
    denylist: Denylist,
    admins: HashSet<UserId>,
    generator: ResponseGenerator,
    stats: BotStats,
    bot_name: String,
    bot_username: String,
    max_message_length: usize,
}

impl ChatHandler {
    pub fn new(config: &Config, generator: ResponseGenerator) -> Self {
        Self {
            sessions: SessionStore::new(config.history_cap),
            denylist: Denylist::new(&config.restricted_words),
            admins: config.admin_ids.clone(),
            generator,
            stats: BotStats::new(),
            bot_name: config.bot_name.clone(),
            bot_username: String::new(),
            max_message_length: config.max_message_length,
        }
    }

    /// Username the platform knows the bot by, for `/cmd@username`.
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = username.into();
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn stats(&self) -> &BotStats {
        &self.stats
    }

    pub async fn handle<M: Messenger>(&self, messenger: &M, msg: IncomingMessage) -> Outcome {
        let text = msg.text.trim();
        if text.is_empty() {
            return Outcome::Ignored;
        }
        self.stats.record_message();

        if msg.is_group() {
            if let Some(word) = self.denylist.find(text) {
                let enforcement = moderation::enforce(messenger, &msg, word).await;
                if enforcement.banned {
                    self.stats.record_ban();
                }
                return Outcome::Moderated(enforcement);
            }
        }

        if text.starts_with('/') {
            return match commands::parse(text, &self.bot_username) {
                Parsed::Command(cmd) => {
                    self.run_command(messenger, &msg, cmd).await;
                    Outcome::Command
                }
                Parsed::Unknown(word) => {
                    debug!(chat_id = msg.chat_id, %word, "unknown command");
                    self.reply(messenger, &msg, &commands::unknown(&word), TextFormat::Html).await;
                    Outcome::Command
                }
                Parsed::OtherBot => Outcome::Ignored,
            };
        }

        self.converse(messenger, &msg, text).await
    }

    /// Append the user turn, generate from the full history and dispatch the
    /// reply, all under the chat's session lock.
    async fn converse<M: Messenger>(&self, messenger: &M, msg: &IncomingMessage, text: &str) -> Outcome {
        let session = self.sessions.session(msg.chat_id);
        let mut session = session.lock().await;

        if let Err(e) = session.append(Role::User, text) {
            warn!(chat_id = msg.chat_id, error = %e, "user turn rejected");
            return Outcome::Ignored;
        }

        if let Err(e) = messenger.send_typing(msg.chat_id).await {
            debug!(chat_id = msg.chat_id, error = %e, "typing indicator failed");
        }

        debug!(chat_id = msg.chat_id, turns = session.history().len(), "generating reply");
        match self.generator.generate(session.history()).await {
            Ok(reply) => {
                if let Err(e) = session.append(Role::Model, reply.as_str()) {
                    warn!(chat_id = msg.chat_id, error = %e, "model turn rejected");
                }
                let chunks = dispatch_reply(
                    messenger,
                    msg.chat_id,
                    &reply,
                    self.max_message_length,
                    TextFormat::Plain,
                )
                .await;
                self.stats.record_reply();
                Outcome::Replied { chunks }
            }
            Err(e) => {
                match e {
                    GenerationError::Timeout(_) => self.stats.record_timeout(),
                    GenerationError::Backend(_) => self.stats.record_failure(),
                }
                self.reply(messenger, msg, e.user_message(), TextFormat::Plain).await;
                Outcome::Failed
            }
        }
    }

    async fn run_command<M: Messenger>(&self, messenger: &M, msg: &IncomingMessage, cmd: Command) {
        debug!(chat_id = msg.chat_id, user_id = msg.sender_id, ?cmd, "command");

        if cmd.is_privileged() && !self.admins.contains(&msg.sender_id) {
            info!(chat_id = msg.chat_id, user_id = msg.sender_id, ?cmd, "privileged command refused");
            self.reply(messenger, msg, commands::RESTRICTED, TextFormat::Plain).await;
            return;
        }

        let text = match cmd {
            Command::Start => commands::start(&self.bot_name, &msg.sender_name, env!("CARGO_PKG_VERSION")),
            Command::Help => commands::help(&self.bot_name),
            Command::Mode(arg) => self.select_mode(msg, &arg).await,
            Command::Reset => {
                self.sessions.reset(msg.chat_id).await;
                info!(chat_id = msg.chat_id, "conversation reset");
                commands::RESET_DONE.to_string()
            }
            Command::Status => self.status_text(msg).await,
            Command::Version => {
                let provider = self.generator.provider();
                commands::version(&self.bot_name, env!("CARGO_PKG_VERSION"), provider.name(), provider.model())
            }
            Command::Stats => {
                let body = status::render_stats(
                    &self.stats.snapshot(),
                    self.sessions.len(),
                    self.sessions.total_turns(),
                );
                commands::stats(&body)
            }
            Command::Admin => commands::admin(),
        };

        self.reply(messenger, msg, &text, TextFormat::Html).await;
    }

    /// `/mode` with zero args reports; one arg selects. Anything after the
    /// first word is ignored.
    async fn select_mode(&self, msg: &IncomingMessage, arg: &str) -> String {
        let Some(wanted) = arg.split_whitespace().next() else {
            return commands::mode_overview(self.sessions.mode(msg.chat_id).await);
        };
        match wanted.parse::<Mode>() {
            Ok(mode) => {
                self.sessions.set_mode(msg.chat_id, mode).await;
                info!(chat_id = msg.chat_id, %mode, "response mode changed");
                commands::mode_set(mode)
            }
            Err(e) => {
                debug!(chat_id = msg.chat_id, error = %e, "invalid mode");
                commands::mode_invalid()
            }
        }
    }

    async fn status_text(&self, msg: &IncomingMessage) -> String {
        let system = match tokio::task::spawn_blocking(SystemSnapshot::collect).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "system metrics collection failed");
                SystemSnapshot::default()
            }
        };
        let bot = status::render_stats(
            &self.stats.snapshot(),
            self.sessions.len(),
            self.sessions.total_turns(),
        );
        commands::status(
            &status::render_system(&system),
            &bot,
            self.sessions.mode(msg.chat_id).await,
        )
    }

    /// Send a possibly long text, logging (not propagating) failures.
    async fn reply<M: Messenger>(&self, messenger: &M, msg: &IncomingMessage, text: &str, format: TextFormat) {
        dispatch_reply(messenger, msg.chat_id, text, self.max_message_length, format).await;
    }
}
