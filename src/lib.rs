//! Gemini Bot: a Telegram chat bot that relays conversations to Google
//! Gemini, keeps per-chat history, and moderates group chats.
//!
//! The binary in `main.rs` wires these modules together; the library split
//! exists so integration tests can drive [`handler::ChatHandler`] directly.

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod handler;
pub mod llm;
pub mod logger;
pub mod messenger;
pub mod moderation;
pub mod session;
pub mod status;
pub mod telegram;
