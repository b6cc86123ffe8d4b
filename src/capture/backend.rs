use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use super::encoding;

/// Classified capture failures surfaced to the recording UI.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The platform lacks a usable recording API. Terminal for this attempt;
    /// the session never enters `Recording`.
    #[error("audio capture is not supported on this device")]
    DeviceUnavailable,
    /// The user declined microphone access. Terminal for this attempt.
    #[error("microphone access denied")]
    PermissionDenied,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Configuration for a capture backend.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Ranked encoding preference list; the first supported entry wins.
    pub preferred_mime_types: Vec<String>,
    /// Chunk time-slice. Small slices make a partial failure lose at most
    /// the last slice instead of the whole recording.
    pub timeslice: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_mime_types: encoding::PREFERRED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeslice: Duration::from_millis(250), // stable chunks across recorders
        }
    }
}

/// Control handle for a granted device stream.
///
/// Contract: `release` halts the recorder, releases every device track (so
/// the microphone indicator goes dark) and closes the chunk channel.
#[async_trait::async_trait]
pub trait CaptureHandle: Send {
    async fn release(&mut self) -> Result<()>;
}

/// A granted microphone stream: the negotiated encoding plus an incremental
/// chunk feed at the configured time-slice.
pub struct CaptureStream {
    /// Negotiated encoding; empty when the platform default was used.
    pub mime_type: String,
    /// Ordered binary fragments, append-only while recording.
    pub chunks: mpsc::Receiver<Bytes>,
    pub handle: Box<dyn CaptureHandle>,
}

/// Microphone capture backend trait.
///
/// Platform-specific implementations own device acquisition and encoding
/// negotiation; `acquire` may reject with a permission or availability
/// error before any chunk is produced.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    async fn acquire(&self, config: &CaptureConfig) -> Result<CaptureStream, CaptureError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Capture source type.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Live microphone input.
    Microphone,
    /// Pre-recorded file input (for testing/batch processing).
    File(PathBuf),
}

/// Capture backend factory.
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(source: CaptureSource) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            // The OS microphone bridge is not wired up on this target; the
            // recording UI surfaces this as a device-unavailable notice.
            CaptureSource::Microphone => Err(CaptureError::DeviceUnavailable),
            CaptureSource::File(path) => Ok(Box::new(FileCaptureBackend::new(path))),
        }
    }
}

/// File-backed capture backend.
///
/// Replays an already-encoded recording as a chunk stream, which is enough
/// to drive the whole capture pipeline end to end without a device.
pub struct FileCaptureBackend {
    path: PathBuf,
}

impl FileCaptureBackend {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

struct FileCaptureHandle {
    feeder: Option<tokio::task::JoinHandle<()>>,
}

#[async_trait::async_trait]
impl CaptureHandle for FileCaptureHandle {
    async fn release(&mut self) -> Result<()> {
        if let Some(feeder) = self.feeder.take() {
            // Dropping the feeder closes the chunk channel.
            feeder.abort();
            let _ = feeder.await;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CaptureBackend for FileCaptureBackend {
    async fn acquire(&self, config: &CaptureConfig) -> Result<CaptureStream, CaptureError> {
        let data = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read recording file: {:?}", self.path))?;

        let ext = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let essence = encoding::mime_for_extension(ext);

        // Rank the file's encoding family against the preference list the
        // way a live recorder negotiates; an unranked family keeps its
        // essence type.
        let mime_type = encoding::negotiate(
            config.preferred_mime_types.iter().map(String::as_str),
            |mime| mime.split(';').next() == Some(essence),
        )
        .unwrap_or_else(|| essence.to_string());

        info!(
            "File capture stream opened: {:?} ({} bytes, {})",
            self.path,
            data.len(),
            mime_type
        );

        let (tx, rx) = mpsc::channel(64);
        let feeder = tokio::spawn(async move {
            // 8 KiB slices stand in for the recorder's time-sliced chunks.
            for slice in data.chunks(8 * 1024) {
                if tx.send(Bytes::copy_from_slice(slice)).await.is_err() {
                    break;
                }
            }
        });

        Ok(CaptureStream {
            mime_type,
            chunks: rx,
            handle: Box::new(FileCaptureHandle {
                feeder: Some(feeder),
            }),
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}
