//! End-to-end conversation flows through the public API: handler, session
//! store, generator and a Gemini backend served by wiremock.

use std::sync::Mutex;
use std::time::Duration;

use gemini_bot::config::Config;
use gemini_bot::error::AppError;
use gemini_bot::generator::{APOLOGY_MESSAGE, ResponseGenerator};
use gemini_bot::handler::{ChatHandler, Outcome};
use gemini_bot::llm::providers;
use gemini_bot::messenger::{ChatKind, IncomingMessage, Messenger, TextFormat, UserId};
use gemini_bot::session::{ChatId, Role};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Outbox {
    texts: Mutex<Vec<(ChatId, String)>>,
    bans: Mutex<Vec<(ChatId, UserId)>>,
}

impl Outbox {
    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

impl Messenger for Outbox {
    async fn send_text(&self, chat_id: ChatId, text: &str, _format: TextFormat) -> Result<(), AppError> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn ban_member(&self, chat_id: ChatId, user_id: UserId) -> Result<(), AppError> {
        self.bans.lock().unwrap().push((chat_id, user_id));
        Ok(())
    }

    async fn send_typing(&self, _chat_id: ChatId) -> Result<(), AppError> {
        Ok(())
    }
}

fn sse(texts: &[&str]) -> String {
    texts
        .iter()
        .map(|t| {
            let chunk = serde_json::json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": t }] } }]
            });
            format!("data: {chunk}\r\n\r\n")
        })
        .collect()
}

async fn gemini_handler(server: &MockServer, max_message_length: usize) -> ChatHandler {
    let mut config = Config::test_default();
    config.llm.provider = "gemini".into();
    config.llm.gemini.api_base_url = format!("{}/v1beta/models", server.uri());
    config.max_message_length = max_message_length;
    let provider = providers::build(&config.llm, Some("test-key".into())).unwrap();
    let generator = ResponseGenerator::new(provider, Duration::from_secs(5));
    ChatHandler::new(&config, generator).with_bot_username("gembot")
}

fn text(chat_id: ChatId, chat_kind: ChatKind, body: &str) -> IncomingMessage {
    IncomingMessage {
        chat_id,
        chat_kind,
        sender_id: 7,
        sender_name: "Ada".into(),
        sender_username: None,
        text: body.into(),
    }
}

#[tokio::test]
async fn second_turn_sends_full_history_to_gemini() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:streamGenerateContent"))
        .and(body_partial_json(serde_json::json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "My name is Ada." }] },
                { "role": "model", "parts": [{ "text": "Nice to meet you, Ada!" }] },
                { "role": "user", "parts": [{ "text": "What is my name?" }] }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&["Your name ", "is Ada."]), "text/event-stream"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/test-model:streamGenerateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&["Nice to meet you, Ada!"]), "text/event-stream"))
        .mount(&server)
        .await;

    let handler = gemini_handler(&server, 4000).await;
    let outbox = Outbox::default();

    handler.handle(&outbox, text(1, ChatKind::Private, "My name is Ada.")).await;
    let outcome = handler.handle(&outbox, text(1, ChatKind::Private, "What is my name?")).await;

    assert_eq!(outcome, Outcome::Replied { chunks: 1 });
    assert_eq!(outbox.texts(), vec!["Nice to meet you, Ada!", "Your name is Ada."]);
    let history = handler.sessions().read(1).await;
    assert_eq!(history.len(), 4);
    assert_eq!(history[3].role, Role::Model);
    assert_eq!(history[3].text, "Your name is Ada.");
}

#[tokio::test]
async fn long_gemini_reply_is_split_in_order() {
    let server = MockServer::start().await;
    let long = "x".repeat(8001);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&[&long[..5000], &long[5000..]]), "text/event-stream"))
        .mount(&server)
        .await;

    let handler = gemini_handler(&server, 4000).await;
    let outbox = Outbox::default();

    let outcome = handler.handle(&outbox, text(1, ChatKind::Private, "write a lot")).await;

    assert_eq!(outcome, Outcome::Replied { chunks: 3 });
    let lengths: Vec<usize> = outbox.texts().iter().map(|t| t.chars().count()).collect();
    assert_eq!(lengths, vec![4000, 4000, 1]);
    assert_eq!(outbox.texts().concat(), long);
}

#[tokio::test]
async fn gemini_error_yields_apology_and_keeps_user_turn() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "code": 500, "message": "internal", "status": "INTERNAL" }
        })))
        .mount(&server)
        .await;

    let handler = gemini_handler(&server, 4000).await;
    let outbox = Outbox::default();

    let outcome = handler.handle(&outbox, text(1, ChatKind::Private, "hello")).await;

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(outbox.texts(), vec![APOLOGY_MESSAGE]);
    assert_eq!(handler.sessions().read(1).await.len(), 1);
}

#[tokio::test]
async fn group_violation_never_reaches_gemini() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&["unused"]), "text/event-stream"))
        .expect(0)
        .mount(&server)
        .await;

    let handler = gemini_handler(&server, 4000).await;
    let outbox = Outbox::default();

    let outcome = handler.handle(&outbox, text(-100, ChatKind::Group, "buy cheap SCAM coins")).await;

    assert!(matches!(outcome, Outcome::Moderated(ref e) if e.banned && e.word == "scam"));
    assert_eq!(*outbox.bans.lock().unwrap(), vec![(-100, 7)]);
    assert_eq!(
        outbox.texts(),
        vec!["🚨 User Ada was removed for using restricted word: 'scam'"]
    );
}

#[tokio::test]
async fn chats_keep_separate_histories() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse(&["ok"]), "text/event-stream"))
        .mount(&server)
        .await;

    let handler = gemini_handler(&server, 4000).await;
    let outbox = Outbox::default();

    let (a, b) = tokio::join!(
        handler.handle(&outbox, text(1, ChatKind::Private, "first chat")),
        handler.handle(&outbox, text(2, ChatKind::Private, "second chat")),
    );
    assert_eq!(a, Outcome::Replied { chunks: 1 });
    assert_eq!(b, Outcome::Replied { chunks: 1 });

    assert_eq!(handler.sessions().read(1).await[0].text, "first chat");
    assert_eq!(handler.sessions().read(2).await[0].text, "second chat");
    assert_eq!(handler.sessions().len(), 2);
}
