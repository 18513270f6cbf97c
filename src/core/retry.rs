//! Failure classification, bounded retry with exponential backoff, and the
//! escalating wait notices shown while a synchronous request drags on.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::error::ChatError;
use crate::core::store::NoticeLevel;

pub const MAX_RETRIES: u32 = 3;

/// Escalation schedule for a synchronous wait: informational notice,
/// warning notice, then a hard abort. All three race in one `select!`, so
/// completion on any path drops every timer together.
pub const INFO_NOTICE_AFTER: Duration = Duration::from_secs(15);
pub const WARNING_NOTICE_AFTER: Duration = Duration::from_secs(30);
pub const HARD_TIMEOUT_AFTER: Duration = Duration::from_secs(120);

const INFO_NOTICE_TEXT: &str = "Still waiting for the server...";
const WARNING_NOTICE_TEXT: &str =
    "The server is taking unusually long. Still waiting...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Network,
    Timeout,
    Auth,
    RateLimit,
    Server,
    Unknown,
}

/// Classify a failure by its inspectable shape. Pure; no side effects.
pub fn classify(error: &ChatError) -> ErrorClass {
    match error {
        ChatError::NetworkUnavailable(_) => ErrorClass::Network,
        ChatError::Timeout => ErrorClass::Timeout,
        ChatError::Unauthorized => ErrorClass::Auth,
        ChatError::RateLimited => ErrorClass::RateLimit,
        ChatError::ServerError { .. } => ErrorClass::Server,
        ChatError::ProtocolError(_) | ChatError::InvalidRequest(_) | ChatError::Cancelled => {
            ErrorClass::Unknown
        }
    }
}

/// Only transient classes retry, and only while attempts remain. Auth and
/// rate-limit failures always surface to the user instead.
pub fn should_retry(class: ErrorClass, attempt: u32, max_retries: u32) -> bool {
    if attempt >= max_retries {
        return false;
    }
    matches!(
        class,
        ErrorClass::Network | ErrorClass::Timeout | ErrorClass::Server
    )
}

/// Delay before retry `attempt` (starting at 1): 2^attempt seconds.
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.min(16)))
}

/// Per-dispatch retry bookkeeping, discarded on success or exhaustion.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    pub attempt: u32,
    pub max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            attempt: 0,
            max_retries,
        }
    }

    pub fn register_failure(&mut self) {
        self.attempt += 1;
    }
}

/// Sleep out the backoff for `attempt`, bailing early if the dispatch is
/// superseded meanwhile.
pub async fn wait_before_retry(
    attempt: u32,
    cancel: &CancellationToken,
) -> Result<(), ChatError> {
    tokio::select! {
        _ = tokio::time::sleep(backoff_delay(attempt)) => Ok(()),
        _ = cancel.cancelled() => Err(ChatError::Cancelled),
    }
}

/// Drive `fut` under the escalation schedule: an info notice at 15s, a
/// warning at 30s, a hard `Timeout` at 120s, and immediate `Cancelled` on
/// supersession. The notice callback fires at most once per level.
pub async fn run_with_deadlines<T, F>(
    fut: F,
    cancel: &CancellationToken,
    mut on_notice: impl FnMut(NoticeLevel, &'static str),
) -> Result<T, ChatError>
where
    F: Future<Output = Result<T, ChatError>>,
{
    tokio::pin!(fut);

    let info = tokio::time::sleep(INFO_NOTICE_AFTER);
    let warning = tokio::time::sleep(WARNING_NOTICE_AFTER);
    let hard = tokio::time::sleep(HARD_TIMEOUT_AFTER);
    tokio::pin!(info, warning, hard);

    let mut info_fired = false;
    let mut warning_fired = false;

    loop {
        tokio::select! {
            result = &mut fut => return result,
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            _ = &mut info, if !info_fired => {
                info_fired = true;
                on_notice(NoticeLevel::Info, INFO_NOTICE_TEXT);
            }
            _ = &mut warning, if !warning_fired => {
                warning_fired = true;
                on_notice(NoticeLevel::Warning, WARNING_NOTICE_TEXT);
            }
            _ = &mut hard => return Err(ChatError::Timeout),
        }
    }
}
