//! Voice capture pipeline
//!
//! One `CaptureSession` per chat surface turns a user gesture into a
//! finalized audio blob or a clean no-op:
//! - asynchronous device acquisition behind the `CaptureBackend` trait
//! - ranked encoding negotiation with a logged platform-default fallback
//! - time-sliced chunk buffering and single-blob finalization
//! - a deferred-stop queue for stops requested mid-initialization

pub mod backend;
pub mod encoding;
pub mod session;
pub mod timer;

pub use backend::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError, CaptureHandle,
    CaptureSource, CaptureStream, FileCaptureBackend,
};
pub use encoding::{extension_for_mime, PREFERRED_MIME_TYPES};
pub use session::{CaptureEvent, CaptureSession, CaptureState, FinalizedRecording};
pub use timer::{format_clock, RecordingTimer};
