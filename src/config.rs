use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::capture::CaptureConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub bots: BotsConfig,
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Webhook endpoint per bot persona.
#[derive(Debug, Deserialize)]
pub struct BotsConfig {
    pub fluent_webhook: String,
    pub khushi_webhook: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    /// Chunk time-slice in milliseconds.
    pub timeslice_ms: u64,
    /// Ranked encoding preference list; empty means the built-in ranking.
    #[serde(default)]
    pub preferred_mime_types: Vec<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl From<&CaptureSettings> for CaptureConfig {
    fn from(settings: &CaptureSettings) -> Self {
        let defaults = CaptureConfig::default();
        CaptureConfig {
            preferred_mime_types: if settings.preferred_mime_types.is_empty() {
                defaults.preferred_mime_types
            } else {
                settings.preferred_mime_types.clone()
            },
            timeslice: Duration::from_millis(settings.timeslice_ms),
        }
    }
}
