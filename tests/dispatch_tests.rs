// Integration tests for the webhook dispatcher against a local mock server.
//
// The multipart bodies use ASCII audio bytes so the raw request body can be
// inspected as text.

use bytes::Bytes;
use serde_json::json;
use tutor_voice::capture::FinalizedRecording;
use tutor_voice::dispatch::{BotDispatcher, BotPersona, OutboundMessage};
use tutor_voice::identity::UserIdentity;
use tutor_voice::playback::AudioSource;
use tutor_voice::FALLBACK_TEXT;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn identity() -> UserIdentity {
    UserIdentity::new("chat-42", "Ana Maria Silva")
}

fn recording(mime_type: &str) -> FinalizedRecording {
    FinalizedRecording {
        data: Bytes::from_static(b"fake-encoded-audio"),
        mime_type: mime_type.to_string(),
        duration_secs: 3,
    }
}

async fn received_body(server: &MockServer) -> String {
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    String::from_utf8_lossy(&requests[0].body).into_owned()
}

#[tokio::test]
async fn test_text_dispatch_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/webhook/fluent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reply": "Tres bien!",
            "mistakes_summary": "No mistakes, keep going",
            "next_question": "Comment tu t'appelles?"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(
        format!("{}/webhook/fluent", server.uri()),
        format!("{}/webhook/khushi", server.uri()),
    );

    let message = OutboundMessage::text(BotPersona::Fluent, "Bonjour, je m'appelle Ana");
    let reply = dispatcher.dispatch(&identity(), &message).await;

    assert!(!reply.fallback);
    assert_eq!(reply.answer.as_deref(), Some("Tres bien!"));
    assert!(reply.is_praise());
    assert_eq!(reply.next_question.as_deref(), Some("Comment tu t'appelles?"));

    let body = received_body(&server).await;
    assert!(body.contains("name=\"first_name\""));
    assert!(body.contains("Ana"));
    assert!(body.contains("name=\"last_name\""));
    assert!(body.contains("Maria Silva"));
    assert!(body.contains("name=\"chat_id\""));
    assert!(body.contains("chat-42"));
    assert!(body.contains("name=\"mode\""));
    assert!(body.contains("Chat"));
    assert!(body.contains("name=\"text\""));
    assert!(body.contains("Bonjour, je m'appelle Ana"));
    assert!(body.contains("name=\"date\""));
}

#[tokio::test]
async fn test_voice_dispatch_attaches_m4a_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(server.uri(), server.uri());
    let message = OutboundMessage::voice(
        BotPersona::Fluent,
        &recording("audio/mp4;codecs=mp4a.40.2"),
    );
    let reply = dispatcher.dispatch(&identity(), &message).await;
    assert!(!reply.fallback);

    let body = received_body(&server).await;
    assert!(body.contains("name=\"mode\""));
    assert!(body.contains("Voice"));
    assert!(body.contains("name=\"audio\""));
    // MP4 recordings upload under the .m4a name, codec parameters stripped.
    assert!(body.contains("filename=\"voice-message.m4a\""));
    assert!(body.to_lowercase().contains("content-type: audio/mp4"));
    assert!(!body.contains("mp4a.40.2"));
    assert!(body.contains("fake-encoded-audio"));
}

#[tokio::test]
async fn test_voice_dispatch_defaults_to_webm_name() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "reply": "ok" })))
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(server.uri(), server.uri());
    let message = OutboundMessage::voice(BotPersona::Khushi, &recording("audio/webm;codecs=opus"));
    dispatcher.dispatch(&identity(), &message).await;

    let body = received_body(&server).await;
    assert!(body.contains("filename=\"voice-message.webm\""));
    assert!(body.to_lowercase().contains("content-type: audio/webm"));
}

#[tokio::test]
async fn test_audio_reply_payload_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "Listen to this",
            "audio": "https://cdn.example.com/reply.mp3"
        })))
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(server.uri(), server.uri());
    let reply = dispatcher
        .dispatch(&identity(), &OutboundMessage::text(BotPersona::Fluent, "hi"))
        .await;

    assert_eq!(reply.answer.as_deref(), Some("Listen to this"));
    match reply.audio {
        Some(AudioSource::Url(url)) => assert_eq!(url, "https://cdn.example.com/reply.mp3"),
        other => panic!("expected URL source, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_becomes_fallback_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(server.uri(), server.uri());
    let reply = dispatcher
        .dispatch(&identity(), &OutboundMessage::text(BotPersona::Fluent, "hi"))
        .await;

    assert!(reply.fallback);
    assert_eq!(reply.answer.as_deref(), Some(FALLBACK_TEXT));
}

#[tokio::test]
async fn test_unreachable_endpoint_becomes_fallback_reply() {
    // Nothing listens here; the connection is refused immediately.
    let dispatcher = BotDispatcher::new("http://127.0.0.1:1/webhook", "http://127.0.0.1:1/webhook");
    let reply = dispatcher
        .dispatch(&identity(), &OutboundMessage::text(BotPersona::Khushi, "hi"))
        .await;

    assert!(reply.fallback);
    assert_eq!(reply.answer.as_deref(), Some(FALLBACK_TEXT));
}

#[tokio::test]
async fn test_invalid_json_becomes_fallback_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let dispatcher = BotDispatcher::new(server.uri(), server.uri());
    let reply = dispatcher
        .dispatch(&identity(), &OutboundMessage::text(BotPersona::Fluent, "hi"))
        .await;

    assert!(reply.fallback);
}
