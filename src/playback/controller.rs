use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::sink::{AudioSink, AudioSource, PlaybackError, SinkEvent, SinkFactory, SpeechSynthesizer};
use crate::capture::format_clock;

/// Discrete speed presets; anything else is rejected with `InvalidRate`.
pub const SPEED_PRESETS: &[f32] = &[0.75, 1.0, 1.25, 1.5, 2.0];

/// One playable transcript item (a bot voice card or a user voice bubble).
#[derive(Debug, Clone)]
pub struct PlaybackItem {
    pub id: String,
    /// Absent when the reply carried no audio; such items fall back to
    /// synthesized speech on the item text.
    pub source: Option<AudioSource>,
    pub text: String,
    /// Rate applied at next activation; live rate changes go through
    /// [`PlaybackController::set_speed`].
    pub default_rate: f32,
}

impl PlaybackItem {
    pub fn new(id: impl Into<String>, source: Option<AudioSource>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source,
            text: text.into(),
            default_rate: 1.0,
        }
    }
}

/// UI-facing notifications from the playback slot.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The item lost the slot; its icon reverts to the default play state.
    Deactivated { item_id: String },
    /// Continuous position readout while playing.
    Progress {
        item_id: String,
        position_secs: f64,
        readout: String,
    },
    /// Metadata loaded; the full duration is known.
    DurationKnown { item_id: String, readout: String },
    /// Natural completion; the readout shows the final duration.
    Finished { item_id: String, readout: String },
    /// The item had no playable audio and was spoken via text-to-speech.
    SpokeFallback { item_id: String },
}

/// What a toggle gesture did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Playing,
    Paused,
    Resumed,
    SpokeFallback,
}

struct ActiveSlot {
    item_id: String,
    sink: Box<dyn AudioSink>,
    playing: bool,
    event_task: Option<JoinHandle<()>>,
}

/// Single-flight audio playback arbitration.
///
/// At most one sink exists across the whole application; activating a new
/// item fully releases the previous one (pause + reset + icon revert)
/// before the new sink is opened, so no two sources ever emit sound
/// simultaneously.
pub struct PlaybackController {
    factory: Arc<dyn SinkFactory>,
    speech: Arc<dyn SpeechSynthesizer>,
    items: Mutex<HashMap<String, PlaybackItem>>,
    slot: Arc<Mutex<Option<ActiveSlot>>>,
    events_tx: mpsc::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(
        factory: Arc<dyn SinkFactory>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> (Self, mpsc::Receiver<PlaybackEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);
        (
            Self {
                factory,
                speech,
                items: Mutex::new(HashMap::new()),
                slot: Arc::new(Mutex::new(None)),
                events_tx,
            },
            events_rx,
        )
    }

    /// Register (or replace) a playable item.
    pub async fn register(&self, item: PlaybackItem) {
        self.items.lock().await.insert(item.id.clone(), item);
    }

    /// Identifier of the item currently holding the slot, if any.
    pub async fn active_item(&self) -> Option<String> {
        self.slot.lock().await.as_ref().map(|s| s.item_id.clone())
    }

    pub async fn is_playing(&self) -> bool {
        self.slot.lock().await.as_ref().is_some_and(|s| s.playing)
    }

    /// Play/pause gesture for one item.
    pub async fn toggle(&self, item_id: &str) -> Result<ToggleOutcome, PlaybackError> {
        let (source, text, rate) = {
            let items = self.items.lock().await;
            let item = items
                .get(item_id)
                .ok_or_else(|| PlaybackError::UnknownItem(item_id.to_string()))?;
            (item.source.clone(), item.text.clone(), item.default_rate)
        };

        let mut slot = self.slot.lock().await;

        // Same item: plain pause/resume on the retained position.
        if let Some(mut active) = slot.take_if(|s| s.item_id == item_id) {
            if active.playing {
                active.sink.pause();
                active.playing = false;
                *slot = Some(active);
                return Ok(ToggleOutcome::Paused);
            }
            return match active.sink.play().await {
                Ok(()) => {
                    active.playing = true;
                    *slot = Some(active);
                    Ok(ToggleOutcome::Resumed)
                }
                Err(err) => {
                    warn!("resume rejected ({err}); falling back to synthesized speech");
                    self.release_slot(active).await;
                    self.speak_fallback(item_id, &text).await;
                    Ok(ToggleOutcome::SpokeFallback)
                }
            };
        }

        // No decodable payload: synthesized speech, slot untouched.
        let Some(source) = source else {
            self.speak_fallback(item_id, &text).await;
            return Ok(ToggleOutcome::SpokeFallback);
        };

        // Fully release the previous holder before acquiring the new one.
        if let Some(prev) = slot.take() {
            self.release_slot(prev).await;
        }

        let mut sink = self.factory.open(&source)?;
        sink.set_rate(rate);
        let sink_events = sink.events();

        match sink.play().await {
            Ok(()) => {
                let event_task = sink_events.map(|rx| self.spawn_sink_watcher(item_id, rx));
                *slot = Some(ActiveSlot {
                    item_id: item_id.to_string(),
                    sink,
                    playing: true,
                    event_task,
                });
                Ok(ToggleOutcome::Playing)
            }
            Err(err) => {
                warn!("playback start rejected ({err}); falling back to synthesized speech");
                self.speak_fallback(item_id, &text).await;
                Ok(ToggleOutcome::SpokeFallback)
            }
        }
    }

    /// Set the playback speed for one item.
    ///
    /// The stored per-item default always updates; the live rate changes
    /// only when the item currently holds the slot.
    pub async fn set_speed(&self, item_id: &str, rate: f32) -> Result<(), PlaybackError> {
        if !SPEED_PRESETS.iter().any(|p| (p - rate).abs() < f32::EPSILON) {
            return Err(PlaybackError::InvalidRate(rate));
        }

        {
            let mut items = self.items.lock().await;
            let item = items
                .get_mut(item_id)
                .ok_or_else(|| PlaybackError::UnknownItem(item_id.to_string()))?;
            item.default_rate = rate;
        }

        let mut slot = self.slot.lock().await;
        if let Some(active) = slot.as_mut() {
            if active.item_id == item_id {
                active.sink.set_rate(rate);
            }
        }
        Ok(())
    }

    /// Force-stop whatever holds the slot, including any in-flight
    /// synthesized speech. Starting a recording calls this first: capture
    /// always pre-empts playback.
    pub async fn stop_all(&self) {
        self.speech.cancel();
        let prev = self.slot.lock().await.take();
        if let Some(prev) = prev {
            info!("playback slot force-stopped ({})", prev.item_id);
            self.release_slot(prev).await;
        }
    }

    async fn release_slot(&self, mut prev: ActiveSlot) {
        prev.sink.pause();
        prev.sink.reset();
        if let Some(task) = prev.event_task.take() {
            task.abort();
        }
        let _ = self
            .events_tx
            .send(PlaybackEvent::Deactivated {
                item_id: prev.item_id,
            })
            .await;
    }

    async fn speak_fallback(&self, item_id: &str, text: &str) {
        self.speech.cancel();
        self.speech.speak(text, None);
        let _ = self
            .events_tx
            .send(PlaybackEvent::SpokeFallback {
                item_id: item_id.to_string(),
            })
            .await;
    }

    fn spawn_sink_watcher(
        &self,
        item_id: &str,
        mut rx: mpsc::Receiver<SinkEvent>,
    ) -> JoinHandle<()> {
        let item_id = item_id.to_string();
        let slot = Arc::clone(&self.slot);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    SinkEvent::LoadedMetadata { duration_secs } => {
                        let _ = events
                            .send(PlaybackEvent::DurationKnown {
                                item_id: item_id.clone(),
                                readout: format_clock(duration_secs as u64),
                            })
                            .await;
                    }
                    SinkEvent::TimeUpdate { position_secs } => {
                        let _ = events
                            .send(PlaybackEvent::Progress {
                                item_id: item_id.clone(),
                                position_secs,
                                readout: format_clock(position_secs as u64),
                            })
                            .await;
                    }
                    SinkEvent::Ended => {
                        let finished = {
                            let mut guard = slot.lock().await;
                            match guard.take() {
                                Some(active) if active.item_id == item_id => Some(active),
                                other => {
                                    *guard = other;
                                    None
                                }
                            }
                        };
                        if let Some(active) = finished {
                            let duration = active.sink.duration_secs().unwrap_or(0.0);
                            let _ = events
                                .send(PlaybackEvent::Finished {
                                    item_id: item_id.clone(),
                                    readout: format_clock(duration as u64),
                                })
                                .await;
                        }
                        break;
                    }
                }
            }
        })
    }
}
