use std::error::Error as StdError;
use std::fmt;

/// Failures surfaced by the send/stream/session core.
///
/// `InvalidRequest` and `Cancelled` are absorbed locally and never reach the
/// user; the remaining variants either retry (network, timeout, server) or
/// surface immediately (auth, rate limit, protocol).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The request never reached the backend (DNS, connect, broken pipe).
    NetworkUnavailable(String),

    /// The request or one of its phases exceeded its deadline.
    Timeout,

    /// The backend rejected the caller's credentials (HTTP 401).
    Unauthorized,

    /// The backend asked the caller to slow down (HTTP 429).
    RateLimited,

    /// The backend failed internally (HTTP 5xx).
    ServerError { status: u16, body: String },

    /// The response stream or payload violated the wire protocol.
    ProtocolError(String),

    /// The dispatch was issued without a resolved role/project pair.
    InvalidRequest(String),

    /// A newer dispatch superseded this one.
    Cancelled,
}

impl ChatError {
    /// One-line summary suitable for a system-authored transcript message.
    pub fn user_summary(&self) -> String {
        match self {
            ChatError::NetworkUnavailable(_) => {
                "Could not reach the server. Check your connection and try again.".to_string()
            }
            ChatError::Timeout => {
                "The request timed out. The server may be overloaded; try again.".to_string()
            }
            ChatError::Unauthorized => {
                "Authentication failed. Please re-enter your credentials.".to_string()
            }
            ChatError::RateLimited => {
                "Rate limit reached. Please wait a moment before sending again.".to_string()
            }
            ChatError::ServerError { status, .. } => {
                format!("The server reported an error (HTTP {status}). Try again shortly.")
            }
            ChatError::ProtocolError(detail) => {
                format!("The response stream was malformed: {detail}")
            }
            ChatError::InvalidRequest(detail) => detail.clone(),
            ChatError::Cancelled => "Request cancelled.".to_string(),
        }
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::NetworkUnavailable(detail) => {
                write!(f, "network unavailable: {detail}")
            }
            ChatError::Timeout => write!(f, "request timed out"),
            ChatError::Unauthorized => write!(f, "unauthorized (HTTP 401)"),
            ChatError::RateLimited => write!(f, "rate limited (HTTP 429)"),
            ChatError::ServerError { status, body } => {
                if body.is_empty() {
                    write!(f, "server error (HTTP {status})")
                } else {
                    write!(f, "server error (HTTP {status}): {body}")
                }
            }
            ChatError::ProtocolError(detail) => write!(f, "protocol error: {detail}"),
            ChatError::InvalidRequest(detail) => write!(f, "invalid request: {detail}"),
            ChatError::Cancelled => write!(f, "superseded by a newer dispatch"),
        }
    }
}

impl StdError for ChatError {}
