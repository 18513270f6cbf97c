//! Wire payloads exchanged with the chat backend, plus the incremental
//! stream event union. The HTTP client lives in [`client`].

use serde::{Deserialize, Serialize};

use crate::core::message::ChatMessage;

pub mod client;

/// Body of the synchronous ask endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub provider: String,
    pub role_id: i64,
}

/// A supplementary web source attached to a synchronous answer.
#[derive(Debug, Clone, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// A supplementary video source attached to a synchronous answer.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResult {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub provider: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub details: Option<Vec<WebResult>>,
    #[serde(default)]
    pub youtube_results: Option<Vec<VideoResult>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionLookupResponse {
    #[serde(default)]
    pub chat_session_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// Body of the incremental stream endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StreamRequest {
    pub query: String,
    pub provider: String,
    pub role_id: i64,
    pub project_id: i64,
    pub chat_session_id: String,
}

/// One decoded event from the incremental response stream.
///
/// The wire shape is one JSON object per `data:` line, carrying an `event`
/// tag and a `data` payload. The `file_*` variants form the nested
/// sub-protocol for multi-file code generation: exactly one file is open at
/// a time, and `file_chunk` always appends to it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    Chunk { content: String },
    FilesDetected { total_files: u32 },
    FileStart { filename: String, index: u32, total: u32 },
    FileChunk { content: String },
    FileEnd { filename: String },
    Done {},
    Error { message: String },
}

impl StreamEvent {
    /// Parse one data payload. Unknown future event tags come back as
    /// errors and are skipped by the caller rather than killing the stream.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Join a base URL and an endpoint path without doubling slashes.
pub fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
