use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::store::SessionMarker;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Mint a process-unique, opaque message id.
pub fn next_message_id() -> String {
    format!("m{:08x}", NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Sender {
    User,
    OpenAi,
    Anthropic,
    System,
    /// Verdict turn of the combined all-provider dialog.
    Final,
}

impl Sender {
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::OpenAi => "openai",
            Sender::Anthropic => "anthropic",
            Sender::System => "system",
            Sender::Final => "final",
        }
    }

    pub fn is_user(self) -> bool {
        self == Sender::User
    }

    /// Provider-authored turns, including the combined verdict.
    pub fn is_assistant(self) -> bool {
        matches!(self, Sender::OpenAi | Sender::Anthropic | Sender::Final)
    }

    pub fn is_system(self) -> bool {
        self == Sender::System
    }
}

impl AsRef<str> for Sender {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Sender {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Sender::User),
            "openai" => Ok(Sender::OpenAi),
            "anthropic" => Ok(Sender::Anthropic),
            "system" => Ok(Sender::System),
            "final" => Ok(Sender::Final),
            _ => Err(format!("invalid sender: {value}")),
        }
    }
}

impl TryFrom<String> for Sender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Sender> for String {
    fn from(value: Sender) -> Self {
        value.as_str().to_string()
    }
}

/// One transcript entry. Created by the dispatcher (user turn) or the
/// stream path (assistant turn, initially empty); mutated only by its
/// creator until `is_streaming` drops to false, then immutable. Entries are
/// appended for the lifetime of the session, never removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_streaming: bool,
    #[serde(default)]
    pub is_typing: bool,
    pub session: SessionMarker,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, session: SessionMarker) -> Self {
        Self {
            id: next_message_id(),
            sender: Sender::User,
            text: text.into(),
            is_streaming: false,
            is_typing: false,
            session,
            created_at: Utc::now(),
        }
    }

    /// Empty assistant turn created before the first byte of a response
    /// arrives. The stream path grows it and eventually finalizes it.
    pub fn assistant_placeholder(sender: Sender, session: SessionMarker) -> Self {
        Self {
            id: next_message_id(),
            sender,
            text: String::new(),
            is_streaming: true,
            is_typing: true,
            session,
            created_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>, session: SessionMarker) -> Self {
        Self {
            id: next_message_id(),
            sender: Sender::System,
            text: text.into(),
            is_streaming: false,
            is_typing: false,
            session,
            created_at: Utc::now(),
        }
    }

    /// Mark the message terminal. After this no component may mutate it.
    pub fn finalize(&mut self) {
        self.is_streaming = false;
        self.is_typing = false;
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_streaming
    }
}
