use anyhow::{Context, Result};
use reqwest::multipart;
use tracing::{error, info};

use super::message::{BotPersona, MessageBody, OutboundMessage};
use super::reply::BotReply;
use crate::capture::extension_for_mime;
use crate::identity::UserIdentity;

/// Submits outbound messages to the configured webhook endpoints and
/// normalizes whatever comes back.
pub struct BotDispatcher {
    client: reqwest::Client,
    fluent_webhook: String,
    khushi_webhook: String,
}

impl BotDispatcher {
    pub fn new(fluent_webhook: impl Into<String>, khushi_webhook: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            fluent_webhook: fluent_webhook.into(),
            khushi_webhook: khushi_webhook.into(),
        }
    }

    fn endpoint(&self, persona: BotPersona) -> &str {
        match persona {
            BotPersona::Fluent => &self.fluent_webhook,
            BotPersona::Khushi => &self.khushi_webhook,
        }
    }

    /// Submit one message and decode the reply.
    ///
    /// Any transport error or non-success status collapses into a single
    /// fallback reply in transcript position; failures are never retried.
    pub async fn dispatch(&self, identity: &UserIdentity, message: &OutboundMessage) -> BotReply {
        match self.post(identity, message).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(
                    "dispatch to {} bot failed: {err:#}",
                    message.persona.as_str()
                );
                BotReply::fallback()
            }
        }
    }

    async fn post(&self, identity: &UserIdentity, message: &OutboundMessage) -> Result<BotReply> {
        let mut form = multipart::Form::new()
            .text("first_name", identity.first_name().to_string())
            .text("last_name", identity.last_name())
            .text("date", chrono::Utc::now().timestamp().to_string())
            .text("mode", message.mode.as_str())
            .text("chat_id", identity.chat_id().to_string());

        form = match &message.body {
            MessageBody::Text { body } => form.text("text", body.clone()),
            MessageBody::Audio {
                blob, mime_type, ..
            } => {
                let ext = extension_for_mime(mime_type);
                // Essence only; codec parameters confuse multipart headers.
                let essence = mime_type.split(';').next().unwrap_or("audio/webm");
                let part = multipart::Part::bytes(blob.to_vec())
                    .file_name(format!("voice-message.{ext}"))
                    .mime_str(essence)
                    .context("invalid audio MIME type")?;
                form.part("audio", part)
            }
        };

        info!(
            "dispatching {} message to {} bot",
            message.mode.as_str(),
            message.persona.as_str()
        );

        let res = self
            .client
            .post(self.endpoint(message.persona))
            .multipart(form)
            .send()
            .await
            .context("webhook request failed")?;

        let status = res.status();
        if !status.is_success() {
            anyhow::bail!("webhook returned HTTP {status}");
        }

        let value: serde_json::Value = res
            .json()
            .await
            .context("webhook returned invalid JSON")?;

        Ok(BotReply::from_value(&value))
    }
}
