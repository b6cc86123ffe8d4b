use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

/// Classified playback failures.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Requested speed is not one of the fixed presets. Rejected with no
    /// state change.
    #[error("unsupported playback rate: {0}")]
    InvalidRate(f32),
    #[error("unknown playback item: {0}")]
    UnknownItem(String),
    /// The platform playback call rejected (e.g. autoplay policy).
    #[error("audio sink error: {0}")]
    Sink(String),
}

/// Where a playable audio payload comes from.
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Complete `data:` URI straight from the webhook reply.
    DataUri(String),
    /// Remote or object URL.
    Url(String),
    /// In-memory blob, e.g. a finalized local recording or a decoded
    /// base64 reply payload.
    Blob { data: Bytes, mime_type: String },
}

/// Notifications from a platform audio element.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Decodable metadata arrived; the full duration is known.
    LoadedMetadata { duration_secs: f64 },
    /// Playback position advanced.
    TimeUpdate { position_secs: f64 },
    /// Natural completion.
    Ended,
}

/// One decodable audio resource.
///
/// The `PlaybackController` holds at most one sink at a time and fully
/// releases it (pause + reset) before opening the next.
#[async_trait::async_trait]
pub trait AudioSink: Send {
    /// Begin or resume playback from the retained position. May reject,
    /// e.g. under an autoplay policy.
    async fn play(&mut self) -> Result<(), PlaybackError>;

    /// Pause, retaining the current position.
    fn pause(&mut self);

    /// Rewind to the start: "stopped" semantics rather than "paused".
    fn reset(&mut self);

    fn set_rate(&mut self, rate: f32);

    /// Full duration in seconds, once metadata has loaded.
    fn duration_secs(&self) -> Option<f64>;

    /// Take the sink's event stream. Yielded at most once per sink.
    fn events(&mut self) -> Option<mpsc::Receiver<SinkEvent>>;
}

/// Opens platform sinks for audio payloads.
pub trait SinkFactory: Send + Sync {
    fn open(&self, source: &AudioSource) -> Result<Box<dyn AudioSink>, PlaybackError>;
}

/// On-device text-to-speech fallback.
///
/// Used when an item carries no decodable audio payload or playback start
/// is rejected; an utterance never occupies the playback slot.
pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, voice_hint: Option<&str>);

    /// Cancel any in-flight utterance.
    fn cancel(&self);
}
