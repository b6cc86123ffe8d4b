use base64::Engine;
use bytes::Bytes;
use serde_json::Value;
use tracing::warn;

use crate::playback::AudioSource;

/// Single user-visible notice inserted where the real reply would have gone.
pub const FALLBACK_TEXT: &str = "Connection issue. Please try again in a moment.";

/// Normalized webhook reply.
///
/// The endpoints are loosely typed and use several synonymous field names
/// for the same semantic value; everything is decoded once here, at the
/// boundary, with left-to-right fallback as the contract. Absent fields
/// stay `None` and are simply skipped by the renderer.
#[derive(Debug, Clone, Default)]
pub struct BotReply {
    /// Textual answer: `reply` | `text` | `output` | `ans`.
    pub answer: Option<String>,
    /// Error-correction summary: `mistakes_summary` | `mistake`.
    pub mistakes: Option<String>,
    /// Follow-up prompt: `next_question`.
    pub next_question: Option<String>,
    /// Synthesized audio payload: `audio` | `audio_base64` | `file`.
    pub audio: Option<AudioSource>,
    /// Set when this reply stands in for a failed dispatch.
    pub fallback: bool,
}

impl BotReply {
    pub fn from_value(value: &Value) -> Self {
        Self {
            answer: pick_string(value, &["reply", "text", "output", "ans"]),
            mistakes: pick_string(value, &["mistakes_summary", "mistake"]),
            next_question: pick_string(value, &["next_question"]),
            audio: pick_string(value, &["audio", "audio_base64", "file"]).map(classify_audio),
            fallback: false,
        }
    }

    /// The reply inserted on transport failure; never retried.
    pub fn fallback() -> Self {
        Self {
            answer: Some(FALLBACK_TEXT.to_string()),
            fallback: true,
            ..Default::default()
        }
    }

    /// A "No mistakes" summary renders as praise, not as a correction.
    pub fn is_praise(&self) -> bool {
        self.mistakes
            .as_deref()
            .is_some_and(|m| m.contains("No mistakes"))
    }
}

fn pick_string(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| value.get(*name).and_then(Value::as_str))
        .map(str::to_string)
        .filter(|s| !s.is_empty())
}

/// Sort a raw audio field into a playable source.
///
/// Bare base64 bodies are decoded here so the sink never has to; a body
/// that fails to decode is wrapped as the MP3 data URI the endpoints mean
/// when they send base64.
fn classify_audio(raw: String) -> AudioSource {
    if raw.starts_with("data:") {
        AudioSource::DataUri(raw)
    } else if raw.starts_with("http://") || raw.starts_with("https://") {
        AudioSource::Url(raw)
    } else {
        match base64::engine::general_purpose::STANDARD.decode(raw.as_bytes()) {
            Ok(data) => AudioSource::Blob {
                data: Bytes::from(data),
                mime_type: "audio/mpeg".to_string(),
            },
            Err(err) => {
                warn!("audio payload is not valid base64 ({err}); passing through as data URI");
                AudioSource::DataUri(format!("data:audio/mp3;base64,{raw}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_answer_synonym_precedence_is_left_to_right() {
        let reply = BotReply::from_value(&json!({
            "ans": "fourth",
            "output": "third",
            "text": "second",
            "reply": "first",
        }));
        assert_eq!(reply.answer.as_deref(), Some("first"));

        let reply = BotReply::from_value(&json!({ "ans": "fourth", "output": "third" }));
        assert_eq!(reply.answer.as_deref(), Some("third"));

        let reply = BotReply::from_value(&json!({ "ans": "fourth" }));
        assert_eq!(reply.answer.as_deref(), Some("fourth"));
    }

    #[test]
    fn test_absent_and_empty_fields_are_skipped() {
        let reply = BotReply::from_value(&json!({ "reply": "", "next_question": "And you?" }));
        assert_eq!(reply.answer, None);
        assert_eq!(reply.mistakes, None);
        assert_eq!(reply.next_question.as_deref(), Some("And you?"));
        assert!(reply.audio.is_none());
    }

    #[test]
    fn test_mistakes_synonyms_and_praise() {
        let reply = BotReply::from_value(&json!({ "mistake": "said goed, use went" }));
        assert_eq!(reply.mistakes.as_deref(), Some("said goed, use went"));
        assert!(!reply.is_praise());

        let reply = BotReply::from_value(&json!({ "mistakes_summary": "No mistakes, well done!" }));
        assert!(reply.is_praise());
    }

    #[test]
    fn test_audio_classification() {
        let reply = BotReply::from_value(&json!({ "audio": "data:audio/mp3;base64,AAAA" }));
        assert!(matches!(reply.audio, Some(AudioSource::DataUri(_))));

        let reply = BotReply::from_value(&json!({ "file": "https://cdn.example.com/a.mp3" }));
        assert!(matches!(reply.audio, Some(AudioSource::Url(_))));

        // Bare base64 decodes to an in-memory blob.
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"mp3-bytes");
        let reply = BotReply::from_value(&json!({ "audio_base64": encoded }));
        match reply.audio {
            Some(AudioSource::Blob { data, mime_type }) => {
                assert_eq!(&data[..], b"mp3-bytes");
                assert_eq!(mime_type, "audio/mpeg");
            }
            other => panic!("expected blob, got {other:?}"),
        }
    }

    #[test]
    fn test_fallback_reply() {
        let reply = BotReply::fallback();
        assert!(reply.fallback);
        assert_eq!(reply.answer.as_deref(), Some(FALLBACK_TEXT));
        assert!(reply.mistakes.is_none() && reply.next_question.is_none());
    }
}
