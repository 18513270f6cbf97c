//! HTTP implementation of the [`Backend`] collaborator surface.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::api::{
    endpoint_url, AskRequest, AskResponse, HistoryResponse, SessionLookupResponse, StreamRequest,
};
use crate::core::backend::Backend;
use crate::core::error::ChatError;
use crate::core::message::ChatMessage;
use crate::core::store::SessionMarker;
use crate::core::stream::{spawn_stream, StreamMessage, StreamParams};

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        endpoint_url(&self.base_url, endpoint)
    }
}

fn map_transport_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::NetworkUnavailable(err.to_string())
    }
}

/// Map the response status onto the error taxonomy, yielding the response
/// back only when it is usable.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ChatError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status.as_u16() {
        401 => Err(ChatError::Unauthorized),
        429 => Err(ChatError::RateLimited),
        code if (500..600).contains(&code) => {
            let body = response.text().await.unwrap_or_default();
            Err(ChatError::ServerError { status: code, body })
        }
        code => Err(ChatError::ProtocolError(format!(
            "unexpected status {code}"
        ))),
    }
}

fn map_decode_error(err: reqwest::Error) -> ChatError {
    ChatError::ProtocolError(format!("undecodable response body: {err}"))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn last_session(
        &self,
        role_id: i64,
        project_id: i64,
    ) -> Result<SessionLookupResponse, ChatError> {
        let response = self
            .client
            .get(self.url("last-session"))
            .query(&[("role_id", role_id), ("project_id", project_id)])
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response)
            .await?
            .json::<SessionLookupResponse>()
            .await
            .map_err(map_decode_error)
    }

    async fn history(&self, marker: &SessionMarker) -> Result<Vec<ChatMessage>, ChatError> {
        let response = self
            .client
            .get(self.url("history"))
            .query(&[
                ("project_id", marker.project_id.to_string()),
                ("role_id", marker.role_id.to_string()),
                ("session_id", marker.chat_session_id.clone()),
            ])
            .send()
            .await
            .map_err(map_transport_error)?;
        let history = check_status(response)
            .await?
            .json::<HistoryResponse>()
            .await
            .map_err(map_decode_error)?;
        Ok(history.messages)
    }

    async fn ask(&self, request: AskRequest) -> Result<AskResponse, ChatError> {
        let response = self
            .client
            .post(self.url("ask"))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response)
            .await?
            .json::<AskResponse>()
            .await
            .map_err(map_decode_error)
    }

    async fn ask_combined(&self, request: AskRequest) -> Result<AskResponse, ChatError> {
        let response = self
            .client
            .post(self.url("ask-ai-to-ai"))
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response)
            .await?
            .json::<AskResponse>()
            .await
            .map_err(map_decode_error)
    }

    fn open_stream(
        &self,
        request: StreamRequest,
        tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
        cancel: CancellationToken,
        stream_id: u64,
    ) {
        spawn_stream(
            StreamParams {
                client: self.client.clone(),
                base_url: self.base_url.clone(),
                request,
                cancel_token: cancel,
                stream_id,
            },
            tx,
        );
    }
}
