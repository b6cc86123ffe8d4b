//! Playback slot arbitration
//!
//! The `PlaybackController` owns the application's single "currently
//! audible item" resource: bot voice cards and user voice bubbles all
//! compete for the same slot, with speed presets and a synthesized-speech
//! fallback for items without a decodable payload.

pub mod controller;
pub mod sink;

pub use controller::{
    PlaybackController, PlaybackEvent, PlaybackItem, ToggleOutcome, SPEED_PRESETS,
};
pub use sink::{
    AudioSink, AudioSource, PlaybackError, SinkEvent, SinkFactory, SpeechSynthesizer,
};
