use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{AskRequest, AskResponse, SessionLookupResponse, StreamRequest};
use crate::core::error::ChatError;
use crate::core::message::ChatMessage;
use crate::core::store::SessionMarker;
use crate::core::stream::StreamMessage;

/// The backend collaborator surface the core depends on. The HTTP
/// implementation lives in [`crate::api::client`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Last known chat session for a role+project pair.
    async fn last_session(
        &self,
        role_id: i64,
        project_id: i64,
    ) -> Result<SessionLookupResponse, ChatError>;

    /// Message history of one session.
    async fn history(&self, marker: &SessionMarker) -> Result<Vec<ChatMessage>, ChatError>;

    /// Synchronous single-provider ask.
    async fn ask(&self, request: AskRequest) -> Result<AskResponse, ChatError>;

    /// Synchronous combined-dialog ask across all providers.
    async fn ask_combined(&self, request: AskRequest) -> Result<AskResponse, ChatError>;

    /// Open the incremental response channel for one dispatch. Must stop
    /// yielding once `cancel` trips; events report over `tx` tagged with
    /// `stream_id`.
    fn open_stream(
        &self,
        request: StreamRequest,
        tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
        cancel: CancellationToken,
        stream_id: u64,
    );
}
