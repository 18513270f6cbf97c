use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::message::ChatMessage;

/// Identity of one conversation: the (project, role, chat session) triple.
///
/// A marker is immutable once captured for a dispatch; project/role switches
/// and reconciliation install a new marker, they never mutate one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub project_id: i64,
    pub role_id: i64,
    pub chat_session_id: String,
}

impl SessionMarker {
    pub fn new(project_id: i64, role_id: i64, chat_session_id: impl Into<String>) -> Self {
        Self {
            project_id,
            role_id,
            chat_session_id: chat_session_id.into(),
        }
    }

    /// A marker only counts as resolved with a non-empty session id.
    pub fn is_resolved(&self) -> bool {
        !self.chat_session_id.is_empty()
    }

    pub fn scopes(&self, role_id: i64, project_id: i64) -> bool {
        self.role_id == role_id && self.project_id == project_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Ephemeral status line shown alongside the transcript, replaced wholesale
/// on every update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// The single shared mutable resource of the core: the current session
/// identity plus the transcript of the active session.
///
/// Presentation reads the message list, the `in_flight` flag, per-message
/// streaming flags, and the notice slot; nothing else is exposed. All writes
/// go through the setters below; in particular `set_marker` installs the
/// whole triple at once so observers never see a half-switched session.
#[derive(Debug, Default)]
pub struct SessionStore {
    marker: Option<SessionMarker>,
    messages: Vec<ChatMessage>,
    in_flight: bool,
    notice: Option<Notice>,
}

pub type SharedStore = Arc<Mutex<SessionStore>>;

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStore {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn marker(&self) -> Option<&SessionMarker> {
        self.marker.as_ref()
    }

    /// Install a new current session. Role, project, and session id land
    /// together; there is no per-field setter.
    pub fn set_marker(&mut self, marker: SessionMarker) {
        self.marker = Some(marker);
    }

    /// Install a marker and its fetched history in one step, discarding the
    /// transcript of whatever session was current before.
    pub fn install_session(&mut self, marker: SessionMarker, messages: Vec<ChatMessage>) {
        self.marker = Some(marker);
        self.messages = messages;
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn push_message(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    /// Append a delta to a streaming message. Terminal messages are left
    /// untouched; the stream that owned them has already let go.
    pub fn append_to_message(&mut self, index: usize, delta: &str) {
        if let Some(msg) = self.messages.get_mut(index) {
            if msg.is_streaming {
                msg.text.push_str(delta);
            }
        }
    }

    /// Replace a streaming message's text with a recomputed snapshot.
    pub fn replace_message_text(&mut self, index: usize, text: String) {
        if let Some(msg) = self.messages.get_mut(index) {
            if msg.is_streaming {
                msg.text = text;
            }
        }
    }

    pub fn finalize_message(&mut self, index: usize) {
        if let Some(msg) = self.messages.get_mut(index) {
            msg.finalize();
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn set_in_flight(&mut self, in_flight: bool) {
        self.in_flight = in_flight;
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice = Some(Notice {
            level,
            text: text.into(),
        });
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }
}
