pub mod capture;
pub mod chat;
pub mod config;
pub mod dispatch;
pub mod identity;
pub mod playback;

pub use capture::{
    format_clock, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError,
    CaptureEvent, CaptureSession, CaptureSource, CaptureState, CaptureStream, FinalizedRecording,
    RecordingTimer,
};
pub use chat::{ChatSurface, TranscriptFragment, TranscriptSink};
pub use config::Config;
pub use dispatch::{
    BotDispatcher, BotPersona, BotReply, ChatMode, MessageBody, OutboundMessage, FALLBACK_TEXT,
};
pub use identity::UserIdentity;
pub use playback::{
    AudioSink, AudioSource, PlaybackController, PlaybackError, PlaybackEvent, PlaybackItem,
    SinkEvent, SinkFactory, SpeechSynthesizer, ToggleOutcome, SPEED_PRESETS,
};
