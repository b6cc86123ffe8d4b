/// Stable identity supplied by the out-of-scope authentication provider.
///
/// The voice pipeline only reads it to tag outbound messages with the
/// sender's name parts and conversation identifier.
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub uid: String,
    pub display_name: String,
}

impl UserIdentity {
    pub fn new(uid: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: display_name.into(),
        }
    }

    /// Placeholder identity used before sign-in completes.
    pub fn anonymous() -> Self {
        Self::new("anonymous", "Guest")
    }

    /// First whitespace-separated token of the display name.
    pub fn first_name(&self) -> &str {
        self.display_name.split_whitespace().next().unwrap_or("")
    }

    /// Everything after the first token, joined back together.
    pub fn last_name(&self) -> String {
        self.display_name
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Conversation identifier sent as `chat_id`.
    pub fn chat_id(&self) -> &str {
        &self.uid
    }
}
