use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

use crate::capture::{
    format_clock, CaptureBackend, CaptureConfig, CaptureError, CaptureEvent, CaptureSession,
    CaptureState, FinalizedRecording,
};
use crate::dispatch::{BotDispatcher, BotPersona, BotReply, OutboundMessage};
use crate::identity::UserIdentity;
use crate::playback::{AudioSource, PlaybackController, PlaybackItem};

/// Rendered content routed to the out-of-scope message surface.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptFragment {
    UserText { body: String },
    /// User-side voice bubble; replayable through the shared playback slot.
    UserVoice { item_id: String, clock: String },
    Answer { body: String },
    /// Bot voice card; tapping it toggles the playback slot.
    VoiceCard { item_id: String },
    Mistakes { summary: String },
    Praise { summary: String },
    NextQuestion { prompt: String },
    /// Stand-in reply for a failed dispatch, in transcript position.
    Fallback { body: String },
    /// Short inline notice (toast-style), e.g. a recording failure.
    Notice { body: String },
}

/// Message-rendering collaborator contract.
///
/// The surface pushes fragments keyed by bot persona; it does not own
/// layout.
pub trait TranscriptSink: Send + Sync {
    fn push(&self, persona: BotPersona, fragment: TranscriptFragment);

    /// Typing-indicator hook, toggled around each dispatch.
    fn set_typing(&self, persona: BotPersona, active: bool);
}

/// One chat surface per bot persona.
///
/// Owns that surface's capture session, shares the process-wide playback
/// controller, and routes finalized recordings and typed text through the
/// dispatcher into the transcript.
pub struct ChatSurface {
    persona: BotPersona,
    identity: UserIdentity,
    capture: CaptureSession,
    playback: Arc<PlaybackController>,
    dispatcher: Arc<BotDispatcher>,
    sink: Arc<dyn TranscriptSink>,
}

impl ChatSurface {
    pub fn new(
        persona: BotPersona,
        identity: UserIdentity,
        backend: Arc<dyn CaptureBackend>,
        capture_config: CaptureConfig,
        playback: Arc<PlaybackController>,
        dispatcher: Arc<BotDispatcher>,
        sink: Arc<dyn TranscriptSink>,
    ) -> Arc<Self> {
        let (capture, capture_events) = CaptureSession::new(backend, capture_config);

        let surface = Arc::new(Self {
            persona,
            identity,
            capture,
            playback,
            dispatcher,
            sink,
        });

        Self::spawn_capture_loop(Arc::clone(&surface), capture_events);
        surface
    }

    pub fn persona(&self) -> BotPersona {
        self.persona
    }

    pub async fn capture_state(&self) -> CaptureState {
        self.capture.state().await
    }

    /// `M:SS` recording-timer display for this surface.
    pub fn timer_display(&self) -> watch::Receiver<String> {
        self.capture.timer_display()
    }

    /// Mic gesture. Capture always pre-empts playback, so any active
    /// audio (or in-flight speech) is force-stopped before acquisition.
    pub async fn press_mic(&self) {
        match self.capture.state().await {
            CaptureState::Idle => {
                self.playback.stop_all().await;
                self.capture.start().await;
            }
            // Already recording (or still initializing): the mic button
            // toggles into a stop-and-send.
            _ => self.capture.stop(true).await,
        }
    }

    /// Send gesture while a recording is active: stop and send it.
    pub async fn press_send(&self) {
        if self.capture.state().await != CaptureState::Idle {
            self.capture.stop(true).await;
        }
    }

    /// Cancel gesture: discard the recording, release the device.
    pub async fn press_cancel(&self) {
        self.capture.stop(false).await;
    }

    /// Typed text submission.
    pub async fn send_text(&self, text: &str) {
        let body = text.trim();
        if body.is_empty() {
            return;
        }
        self.sink.push(
            self.persona,
            TranscriptFragment::UserText {
                body: body.to_string(),
            },
        );
        self.deliver(OutboundMessage::text(self.persona, body)).await;
    }

    fn spawn_capture_loop(surface: Arc<Self>, mut events: mpsc::Receiver<CaptureEvent>) {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    CaptureEvent::Started { mime_type } => {
                        info!(
                            "{} surface recording ({})",
                            surface.persona.as_str(),
                            if mime_type.is_empty() { "default encoding" } else { &mime_type }
                        );
                    }
                    CaptureEvent::Cancelled => {
                        info!("{} surface recording cancelled", surface.persona.as_str());
                    }
                    CaptureEvent::EmptyRecording => {
                        surface.notice("Voice recording failed. Please try again.");
                    }
                    CaptureEvent::Failed(err) => {
                        warn!("{} surface capture failed: {err}", surface.persona.as_str());
                        surface.notice(match err {
                            CaptureError::DeviceUnavailable => {
                                "Microphone recording is not supported on this device."
                            }
                            CaptureError::PermissionDenied => {
                                "Microphone access denied. Please allow mic permission and try again."
                            }
                            CaptureError::Backend(_) => "Error processing recording.",
                        });
                    }
                    CaptureEvent::Finalized(recording) => {
                        surface.on_recording_finalized(recording).await;
                    }
                }
            }
        });
    }

    async fn on_recording_finalized(&self, recording: FinalizedRecording) {
        // The user's own bubble replays through the same playback slot as
        // bot audio.
        let item_id = format!("voice-{}", uuid::Uuid::new_v4());
        self.playback
            .register(PlaybackItem::new(
                item_id.clone(),
                Some(AudioSource::Blob {
                    data: recording.data.clone(),
                    mime_type: recording.mime_type.clone(),
                }),
                String::new(),
            ))
            .await;
        self.sink.push(
            self.persona,
            TranscriptFragment::UserVoice {
                item_id,
                clock: format_clock(recording.duration_secs),
            },
        );

        self.deliver(OutboundMessage::voice(self.persona, &recording))
            .await;
    }

    async fn deliver(&self, message: OutboundMessage) {
        self.sink.set_typing(self.persona, true);
        let reply = self.dispatcher.dispatch(&self.identity, &message).await;
        self.sink.set_typing(self.persona, false);
        self.route_reply(reply).await;
    }

    /// Route each present reply field to its rendering destination; absent
    /// fields are skipped.
    async fn route_reply(&self, reply: BotReply) {
        if reply.fallback {
            self.sink.push(
                self.persona,
                TranscriptFragment::Fallback {
                    body: reply.answer.unwrap_or_default(),
                },
            );
            return;
        }

        let is_praise = reply.is_praise();

        if reply.audio.is_some() {
            // Voice card, auto-played: silently pre-empts whatever the
            // slot currently holds.
            let item_id = format!("voice-{}", uuid::Uuid::new_v4());
            self.playback
                .register(PlaybackItem::new(
                    item_id.clone(),
                    reply.audio,
                    reply.answer.unwrap_or_default(),
                ))
                .await;
            self.sink.push(
                self.persona,
                TranscriptFragment::VoiceCard {
                    item_id: item_id.clone(),
                },
            );
            if let Err(err) = self.playback.toggle(&item_id).await {
                warn!("auto-play failed for {item_id}: {err}");
            }
        } else if let Some(body) = reply.answer {
            self.sink
                .push(self.persona, TranscriptFragment::Answer { body });
        }

        if let Some(summary) = reply.mistakes {
            let fragment = if is_praise {
                TranscriptFragment::Praise { summary }
            } else {
                TranscriptFragment::Mistakes { summary }
            };
            self.sink.push(self.persona, fragment);
        }

        if let Some(prompt) = reply.next_question {
            self.sink
                .push(self.persona, TranscriptFragment::NextQuestion { prompt });
        }
    }

    fn notice(&self, body: &str) {
        self.sink.push(
            self.persona,
            TranscriptFragment::Notice {
                body: body.to_string(),
            },
        );
    }
}
