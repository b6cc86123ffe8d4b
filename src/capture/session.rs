use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{CaptureBackend, CaptureConfig, CaptureError, CaptureHandle, CaptureStream};
use super::timer::RecordingTimer;

/// Capture session lifecycle.
///
/// `StoppingPendingInit` marks a stop requested while device acquisition is
/// still outstanding; the stop is queued and replayed, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Initializing,
    Recording,
    StoppingPendingInit,
}

/// An immutable finalized recording, ready for upload.
#[derive(Debug, Clone)]
pub struct FinalizedRecording {
    pub data: Bytes,
    /// Negotiated encoding the blob was recorded with.
    pub mime_type: String,
    /// Elapsed recording time, clamped to at least one second.
    pub duration_secs: u64,
}

/// Terminal and progress events for one capture attempt.
///
/// Every `start` eventually yields exactly one of `Finalized`, `Cancelled`,
/// `EmptyRecording` or `Failed`.
#[derive(Debug)]
pub enum CaptureEvent {
    /// Device granted, encoding negotiated, chunks are buffering.
    Started { mime_type: String },
    Finalized(FinalizedRecording),
    Cancelled,
    /// The recorder produced zero bytes; recoverable, nothing is sent.
    EmptyRecording,
    Failed(CaptureError),
}

struct Inner {
    state: CaptureState,
    chunks: Vec<Bytes>,
    mime_type: String,
    /// Finalize flag of a stop requested during `Initializing`, replayed
    /// once acquisition completes.
    pending_stop: Option<bool>,
    stream_handle: Option<Box<dyn CaptureHandle>>,
    chunk_task: Option<JoinHandle<()>>,
    timer: RecordingTimer,
}

enum StartAction {
    Ignore,
    StopAndSend,
    Acquire,
}

/// One microphone recording lifecycle per chat surface.
///
/// Owns device acquisition, encoding negotiation, chunk buffering and
/// finalization; outcomes are delivered on the event channel returned by
/// [`CaptureSession::new`].
pub struct CaptureSession {
    backend: Arc<dyn CaptureBackend>,
    config: CaptureConfig,
    events_tx: mpsc::Sender<CaptureEvent>,
    timer_display: watch::Receiver<String>,
    inner: Arc<Mutex<Inner>>,
}

impl CaptureSession {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        config: CaptureConfig,
    ) -> (Self, mpsc::Receiver<CaptureEvent>) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let timer = RecordingTimer::new();
        let timer_display = timer.display();

        let session = Self {
            backend,
            config,
            events_tx,
            timer_display,
            inner: Arc::new(Mutex::new(Inner {
                state: CaptureState::Idle,
                chunks: Vec::new(),
                mime_type: String::new(),
                pending_stop: None,
                stream_handle: None,
                chunk_task: None,
                timer,
            })),
        };

        (session, events_rx)
    }

    pub async fn state(&self) -> CaptureState {
        self.inner.lock().await.state
    }

    /// Formatted `M:SS` elapsed-time display for the recording UI.
    pub fn timer_display(&self) -> watch::Receiver<String> {
        self.timer_display.clone()
    }

    /// Begin a recording attempt.
    ///
    /// Concurrent starts while acquisition is outstanding coalesce into a
    /// no-op; a start while already recording is a stop-and-send request.
    pub async fn start(&self) {
        let action = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                CaptureState::Initializing | CaptureState::StoppingPendingInit => {
                    StartAction::Ignore
                }
                CaptureState::Recording => StartAction::StopAndSend,
                CaptureState::Idle => {
                    inner.state = CaptureState::Initializing;
                    inner.chunks.clear();
                    inner.mime_type.clear();
                    inner.pending_stop = None;
                    inner.timer.reset();
                    StartAction::Acquire
                }
            }
        };

        match action {
            StartAction::Ignore => {}
            StartAction::StopAndSend => self.stop(true).await,
            StartAction::Acquire => self.spawn_acquisition(),
        }
    }

    /// Stop the current attempt.
    ///
    /// `finalize = false` is the cancel path: the device is still released
    /// and all buffered chunks are cleared, but nothing is sent. A stop
    /// issued during `Initializing` is deferred with its finalize flag and
    /// replayed exactly once when acquisition completes.
    pub async fn stop(&self, finalize: bool) {
        {
            let mut inner = self.inner.lock().await;
            match inner.state {
                CaptureState::Idle => return,
                CaptureState::Initializing | CaptureState::StoppingPendingInit => {
                    info!("capture still initializing, deferring stop (finalize={finalize})");
                    inner.pending_stop = Some(finalize);
                    inner.state = CaptureState::StoppingPendingInit;
                    return;
                }
                CaptureState::Recording => {}
            }
        }

        Self::perform_stop(Arc::clone(&self.inner), self.events_tx.clone(), finalize).await;
    }

    fn spawn_acquisition(&self) {
        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let inner = Arc::clone(&self.inner);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            match backend.acquire(&config).await {
                Ok(stream) => Self::on_stream_acquired(inner, events, stream).await,
                Err(err) => {
                    warn!("microphone acquisition failed: {err}");
                    {
                        let mut guard = inner.lock().await;
                        guard.state = CaptureState::Idle;
                        guard.pending_stop = None;
                        guard.chunks.clear();
                        guard.timer.reset();
                    }
                    let _ = events.send(CaptureEvent::Failed(err)).await;
                }
            }
        });
    }

    async fn on_stream_acquired(
        inner: Arc<Mutex<Inner>>,
        events: mpsc::Sender<CaptureEvent>,
        stream: CaptureStream,
    ) {
        let CaptureStream {
            mime_type,
            chunks,
            handle,
        } = stream;

        if mime_type.is_empty() {
            warn!("no preferred encoding supported; recording with the platform default");
        } else {
            info!("capture stream acquired ({mime_type})");
        }

        let deferred = {
            let mut guard = inner.lock().await;
            guard.mime_type = mime_type.clone();
            guard.stream_handle = Some(handle);

            let chunk_inner = Arc::clone(&inner);
            let mut chunks_rx = chunks;
            guard.chunk_task = Some(tokio::spawn(async move {
                while let Some(chunk) = chunks_rx.recv().await {
                    if chunk.is_empty() {
                        continue;
                    }
                    chunk_inner.lock().await.chunks.push(chunk);
                }
            }));

            guard.timer.start();
            let deferred = guard.pending_stop.take();
            guard.state = CaptureState::Recording;
            deferred
        };

        let _ = events.send(CaptureEvent::Started { mime_type }).await;

        if let Some(finalize) = deferred {
            info!("replaying stop deferred during initialization (finalize={finalize})");
            Self::perform_stop(inner, events, finalize).await;
        }
    }

    async fn perform_stop(
        inner: Arc<Mutex<Inner>>,
        events: mpsc::Sender<CaptureEvent>,
        finalize: bool,
    ) {
        // The stream handle doubles as the ownership token: a concurrent
        // stop that lost the race finds it gone and backs out.
        let (handle, chunk_task) = {
            let mut guard = inner.lock().await;
            let Some(handle) = guard.stream_handle.take() else {
                return;
            };
            guard.state = CaptureState::Idle;
            (handle, guard.chunk_task.take())
        };

        // Device tracks are released on every exit path; a leaked handle
        // keeps the microphone indicator lit.
        let mut handle = handle;
        if let Err(err) = handle.release().await {
            warn!("failed to release capture device: {err}");
        }

        // Releasing the device closes the chunk channel; draining the
        // collector here means only a slice in flight can be lost.
        if let Some(task) = chunk_task {
            let _ = task.await;
        }

        let (chunks, mime_type, elapsed) = {
            let mut guard = inner.lock().await;
            let chunks = std::mem::take(&mut guard.chunks);
            let mime_type = std::mem::take(&mut guard.mime_type);
            let elapsed = guard.timer.elapsed_seconds();
            guard.timer.reset();
            (chunks, mime_type, elapsed)
        };

        if !finalize {
            info!("recording cancelled, {} buffered chunks discarded", chunks.len());
            let _ = events.send(CaptureEvent::Cancelled).await;
            return;
        }

        let total: usize = chunks.iter().map(|c| c.len()).sum();
        if total == 0 {
            warn!("recording produced no audio");
            let _ = events.send(CaptureEvent::EmptyRecording).await;
            return;
        }

        let mut data = BytesMut::with_capacity(total);
        for chunk in &chunks {
            data.extend_from_slice(chunk);
        }

        let mime_type = if mime_type.is_empty() {
            "audio/webm".to_string()
        } else {
            mime_type
        };

        let recording = FinalizedRecording {
            data: data.freeze(),
            mime_type,
            duration_secs: elapsed.max(1),
        };

        info!(
            "recording finalized: {} bytes, {}s, {}",
            recording.data.len(),
            recording.duration_secs,
            recording.mime_type
        );

        let _ = events.send(CaptureEvent::Finalized(recording)).await;
    }
}
