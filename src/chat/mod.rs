//! Chat surface orchestration
//!
//! Binds one capture session, the shared playback slot and the webhook
//! dispatcher together per bot persona, and pushes rendered fragments to
//! the out-of-scope transcript surface.

mod surface;

pub use surface::{ChatSurface, TranscriptFragment, TranscriptSink};
