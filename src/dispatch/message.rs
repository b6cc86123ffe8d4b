use bytes::Bytes;

use crate::capture::FinalizedRecording;

/// One of the two conversational tutoring identities, each with its own
/// webhook endpoint and chat surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotPersona {
    /// Grammar-explainer bot.
    Fluent,
    /// Conversational practice bot.
    Khushi,
}

impl BotPersona {
    pub fn as_str(&self) -> &'static str {
        match self {
            BotPersona::Fluent => "fluent",
            BotPersona::Khushi => "khushi",
        }
    }
}

/// Wire-level mode tag carried on every submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    Chat,
    Voice,
}

impl ChatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Chat => "Chat",
            ChatMode::Voice => "Voice",
        }
    }
}

#[derive(Debug, Clone)]
pub enum MessageBody {
    Text {
        body: String,
    },
    Audio {
        blob: Bytes,
        mime_type: String,
        duration_secs: u64,
    },
}

/// Immutable outbound submission; sent exactly once per user gesture.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub persona: BotPersona,
    pub mode: ChatMode,
    pub body: MessageBody,
}

impl OutboundMessage {
    pub fn text(persona: BotPersona, body: impl Into<String>) -> Self {
        Self {
            persona,
            mode: ChatMode::Chat,
            body: MessageBody::Text { body: body.into() },
        }
    }

    pub fn voice(persona: BotPersona, recording: &FinalizedRecording) -> Self {
        Self {
            persona,
            mode: ChatMode::Voice,
            body: MessageBody::Audio {
                blob: recording.data.clone(),
                mime_type: recording.mime_type.clone(),
                duration_secs: recording.duration_secs,
            },
        }
    }
}
