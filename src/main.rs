use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tutor_voice::{
    CaptureBackendFactory, CaptureEvent, CaptureSession, CaptureSource, Config,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/tutor-voice")?;

    info!("Tutor Voice v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Fluent webhook: {}", cfg.bots.fluent_webhook);
    info!("Khushi webhook: {}", cfg.bots.khushi_webhook);

    // Exercise the capture pipeline against a fixture recording if present.
    let fixture = "tests/fixtures/sample-voice.webm";
    if std::path::Path::new(fixture).exists() {
        let backend = CaptureBackendFactory::create(CaptureSource::File(fixture.into()))?;
        let (session, mut events) =
            CaptureSession::new(Arc::from(backend), (&cfg.capture).into());

        session.start().await;
        // Give the file backend a moment to stream its chunks through.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        session.stop(true).await;

        while let Some(event) = events.recv().await {
            match event {
                CaptureEvent::Started { mime_type } => {
                    info!("Capture started ({mime_type})");
                }
                CaptureEvent::Finalized(recording) => {
                    info!(
                        "Finalized recording: {} bytes, {}s, {}",
                        recording.data.len(),
                        recording.duration_secs,
                        recording.mime_type
                    );
                    break;
                }
                other => {
                    info!("Capture ended without a recording: {other:?}");
                    break;
                }
            }
        }
    } else {
        info!("No test fixture found at {fixture}");
        info!("To exercise capture, place an audio file at: {fixture}");
    }

    Ok(())
}
