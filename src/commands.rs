//! In-chat slash commands and their reply texts.
//!
//! Parsing is done by teloxide's [`BotCommands`] derive, which also handles
//! the `/cmd@botname` form used in groups. All texts here are Telegram HTML;
//! anything user-supplied must go through [`escape`].

use teloxide::utils::command::{BotCommands, ParseError};
use teloxide::utils::html::escape;

use crate::session::Mode;

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "show the full feature list")]
    Help,
    #[command(description = "show or change the response style")]
    Mode(String),
    #[command(description = "reset the conversation")]
    Reset,
    #[command(description = "system status")]
    Status,
    #[command(description = "bot version")]
    Version,
    #[command(description = "usage statistics (admins)")]
    Stats,
    #[command(description = "admin command list (admins)")]
    Admin,
}

impl Command {
    /// Commands restricted to the configured admin set.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Command::Stats | Command::Admin)
    }
}

/// Outcome of looking at a `/`-prefixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    /// Unknown or malformed command; carries the command word.
    Unknown(String),
    /// `/cmd@otherbot`, meant for another bot in the same group.
    OtherBot,
}

/// Parse `text` as a command addressed to `bot_username`.
///
/// Extra arguments to argument-less commands are ignored, so `/reset now`
/// still resets.
pub fn parse(text: &str, bot_username: &str) -> Parsed {
    match Command::parse(text, bot_username) {
        Ok(cmd) => Parsed::Command(cmd),
        Err(ParseError::WrongBotName(_)) => Parsed::OtherBot,
        Err(ParseError::TooManyArguments { .. }) => {
            let head = text.split_whitespace().next().unwrap_or_default();
            match Command::parse(head, bot_username) {
                Ok(cmd) => Parsed::Command(cmd),
                Err(_) => Parsed::Unknown(command_word(text)),
            }
        }
        Err(ParseError::TooFewArguments { .. }) if command_word(text) == "/mode" => {
            Parsed::Command(Command::Mode(String::new()))
        }
        Err(_) => Parsed::Unknown(command_word(text)),
    }
}

fn command_word(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or_default()
        .split('@')
        .next()
        .unwrap_or_default()
        .to_string()
}

// ── Reply texts ─────────────────────────────────────────────────────────────

pub const RESTRICTED: &str = "⚠️ Restricted to administrators.";
pub const RESET_DONE: &str = "🔄 Conversation reset. Let's start fresh!";

pub fn unknown(word: &str) -> String {
    format!("Unknown command {}. Type /help for the list of commands.", escape(word))
}

pub fn start(bot_name: &str, first_name: &str, version: &str) -> String {
    format!(
        "🚀 <b>Welcome to {bot}, {user}!</b> 🚀\n\
         \n\
         <b>Version:</b> {version}\n\
         <b>Powered by Google Gemini AI</b>\n\
         \n\
         📌 <b>Main Features:</b>\n\
         - Smart AI conversations with memory\n\
         - Customizable response modes\n\
         - System monitoring\n\
         - Restricted word filtering in groups\n\
         \n\
         🛠 <b>Commands:</b>\n\
         /help - Show full feature list\n\
         /mode - Change response style\n\
         /reset - Reset conversation\n\
         /status - System status\n\
         /version - Bot version\n\
         \n\
         Just send me a message to start chatting!",
        bot = escape(bot_name),
        user = escape(first_name),
    )
}

pub fn help(bot_name: &str) -> String {
    let modes: String = Mode::ALL
        .iter()
        .map(|m| format!("/mode {} - {}\n", m.name(), m.description()))
        .collect();
    format!(
        "<b>🌟 {bot} Feature Menu 🌟</b>\n\
         \n\
         <b>🤖 Core AI Capabilities:</b>\n\
         - Google Gemini-powered responses\n\
         - Multi-turn conversation memory (/reset to clear)\n\
         - Long answers split across several messages\n\
         \n\
         <b>⚙️ Customization:</b>\n\
         {modes}\
         \n\
         <b>👥 Group Chat Features:</b>\n\
         - Every message gets an AI reply\n\
         - Users posting restricted words are removed\n\
         \n\
         <b>🔒 Privacy:</b>\n\
         - No permanent message storage; history is lost on restart\n\
         \n\
         {commands}",
        bot = escape(bot_name),
        commands = escape(&Command::descriptions().to_string()),
    )
}

pub fn mode_overview(current: Mode) -> String {
    let options: String = Mode::ALL
        .iter()
        .map(|m| format!("/mode {} - {}\n", m.name(), m.description()))
        .collect();
    format!(
        "Current response mode: <b>{}</b>\nAvailable modes:\n{}",
        current.title(),
        options.trim_end()
    )
}

pub fn mode_set(mode: Mode) -> String {
    format!("Response mode set to: <b>{}</b>", mode.title())
}

pub fn mode_invalid() -> String {
    format!("Invalid mode. Choose from: {}", Mode::names())
}

pub fn status(system: &str, bot: &str, mode: Mode) -> String {
    format!(
        "<b>🟢 System Status: Operational</b>\n\
         \n\
         🖥 <b>Host</b>\n{system}\n\
         \n\
         🤖 <b>Bot</b>\n{bot}\n\
         \n\
         💬 Current mode in this chat: <b>{}</b>",
        mode.title()
    )
}

pub fn version(bot_name: &str, version: &str, provider: &str, model: &str) -> String {
    format!(
        "<b>{} System Information</b>\n\
         \n\
         <b>Version:</b> {version}\n\
         <b>Provider:</b> {}\n\
         <b>Model:</b> {}",
        escape(bot_name),
        escape(provider),
        escape(model),
    )
}

pub fn stats(body: &str) -> String {
    format!("<b>📊 Usage Statistics</b>\n\n{body}")
}

pub fn admin() -> String {
    "<b>🛡 Admin Commands</b>\n\
     \n\
     /stats - Show usage statistics\n\
     /admin - Show this list\n\
     \n\
     Moderation runs automatically in groups; the bot needs the\n\
     \"ban users\" right to remove members."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(parse("/start", "gembot"), Parsed::Command(Command::Start));
        assert_eq!(parse("/help", "gembot"), Parsed::Command(Command::Help));
        assert_eq!(parse("/reset", "gembot"), Parsed::Command(Command::Reset));
        assert_eq!(parse("/status", "gembot"), Parsed::Command(Command::Status));
    }

    #[test]
    fn mode_takes_optional_argument() {
        assert_eq!(parse("/mode", "gembot"), Parsed::Command(Command::Mode(String::new())));
        assert_eq!(
            parse("/mode Creative", "gembot"),
            Parsed::Command(Command::Mode("Creative".into()))
        );
    }

    #[test]
    fn addressed_commands() {
        assert_eq!(parse("/reset@gembot", "gembot"), Parsed::Command(Command::Reset));
        assert_eq!(parse("/reset@otherbot", "gembot"), Parsed::OtherBot);
    }

    #[test]
    fn extra_arguments_are_ignored() {
        assert_eq!(parse("/reset please", "gembot"), Parsed::Command(Command::Reset));
    }

    #[test]
    fn unknown_commands() {
        assert_eq!(parse("/feedback great bot", "gembot"), Parsed::Unknown("/feedback".into()));
        assert!(unknown("/<x>").contains("&lt;x&gt;"));
    }

    #[test]
    fn privileged_commands() {
        assert!(Command::Stats.is_privileged());
        assert!(Command::Admin.is_privileged());
        assert!(!Command::Status.is_privileged());
    }

    #[test]
    fn start_escapes_user_name() {
        let text = start("Gemini BOT", "<script>", "1.0");
        assert!(text.contains("&lt;script&gt;"));
        assert!(!text.contains("<script>"));
    }

    #[test]
    fn mode_texts() {
        let overview = mode_overview(Mode::Standard);
        assert!(overview.contains("Current response mode: <b>Standard</b>"));
        for m in Mode::ALL {
            assert!(overview.contains(&format!("/mode {}", m.name())));
        }
        assert_eq!(mode_set(Mode::Casual), "Response mode set to: <b>Casual</b>");
        assert!(mode_invalid().contains("professional"));
    }

    #[test]
    fn help_lists_modes_and_commands() {
        let text = help("Gemini BOT");
        assert!(text.contains("/mode technical"));
        assert!(text.contains("/reset"));
    }
}
