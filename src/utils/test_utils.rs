#[cfg(test)]
use std::collections::VecDeque;
#[cfg(test)]
use std::sync::atomic::{AtomicU32, Ordering};
#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
use async_trait::async_trait;
#[cfg(test)]
use tokio::sync::mpsc;
#[cfg(test)]
use tokio_util::sync::CancellationToken;

#[cfg(test)]
use crate::api::{AskRequest, AskResponse, SessionLookupResponse, StreamRequest};
#[cfg(test)]
use crate::core::backend::Backend;
#[cfg(test)]
use crate::core::error::ChatError;
#[cfg(test)]
use crate::core::message::ChatMessage;
#[cfg(test)]
use crate::core::store::SessionMarker;
#[cfg(test)]
use crate::core::stream::StreamMessage;

#[cfg(test)]
pub fn ask_response(answer: &str) -> AskResponse {
    AskResponse {
        provider: None,
        answer: answer.to_string(),
        details: None,
        youtube_results: None,
    }
}

/// Scripted in-memory stand-in for the HTTP backend. Behavior is fixed at
/// construction: which session lookup answers, how asks resolve, and what a
/// stream replays.
#[cfg(test)]
pub struct ScriptedBackend {
    offline: bool,
    hanging: bool,
    session_id: Option<String>,
    history_texts: Vec<String>,
    remaining_lookup_failures: AtomicU32,
    ask_script: Mutex<VecDeque<Result<AskResponse, ChatError>>>,
    default_ask: Result<AskResponse, ChatError>,
    ask_attempts: AtomicU32,
    stream_replay: Vec<StreamMessage>,
    stream_cancel_tokens: Mutex<Vec<CancellationToken>>,
}

#[cfg(test)]
impl ScriptedBackend {
    fn base() -> Self {
        Self {
            offline: false,
            hanging: false,
            session_id: None,
            history_texts: Vec::new(),
            remaining_lookup_failures: AtomicU32::new(0),
            ask_script: Mutex::new(VecDeque::new()),
            default_ask: Ok(ask_response("ok")),
            ask_attempts: AtomicU32::new(0),
            stream_replay: Vec::new(),
            stream_cancel_tokens: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a network error.
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::base()
        }
    }

    /// Every ask call suspends forever.
    pub fn hanging() -> Self {
        Self {
            hanging: true,
            ..Self::base()
        }
    }

    pub fn with_session(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            ..Self::base()
        }
    }

    pub fn answering(answer: &str) -> Self {
        Self {
            default_ask: Ok(ask_response(answer)),
            ..Self::base()
        }
    }

    pub fn answering_with(response: AskResponse) -> Self {
        Self {
            default_ask: Ok(response),
            ..Self::base()
        }
    }

    pub fn ask_failing(error: ChatError) -> Self {
        Self {
            default_ask: Err(error),
            ..Self::base()
        }
    }

    pub fn with_history_message(mut self, text: &str) -> Self {
        self.history_texts.push(text.to_string());
        self
    }

    /// Make the next `count` session lookups fail before the scripted
    /// session takes over.
    pub fn failing_calls(self, count: u32) -> Self {
        self.remaining_lookup_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Queue ask outcomes consumed before the default takes over.
    pub fn with_ask_script(
        self,
        script: impl IntoIterator<Item = Result<AskResponse, ChatError>>,
    ) -> Self {
        self.ask_script.lock().unwrap().extend(script);
        self
    }

    pub fn with_stream(mut self, replay: Vec<StreamMessage>) -> Self {
        self.stream_replay = replay;
        self
    }

    pub fn ask_attempts(&self) -> u32 {
        self.ask_attempts.load(Ordering::SeqCst)
    }

    pub fn stream_cancel_tokens(&self) -> Vec<CancellationToken> {
        self.stream_cancel_tokens.lock().unwrap().clone()
    }

    async fn run_ask(&self) -> Result<AskResponse, ChatError> {
        self.ask_attempts.fetch_add(1, Ordering::SeqCst);
        if self.hanging {
            std::future::pending::<()>().await;
        }
        if self.offline {
            return Err(ChatError::NetworkUnavailable("scripted offline".into()));
        }
        if let Some(next) = self.ask_script.lock().unwrap().pop_front() {
            return next;
        }
        self.default_ask.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Backend for ScriptedBackend {
    async fn last_session(
        &self,
        _role_id: i64,
        _project_id: i64,
    ) -> Result<SessionLookupResponse, ChatError> {
        if self.offline {
            return Err(ChatError::NetworkUnavailable("scripted offline".into()));
        }
        let remaining = self.remaining_lookup_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_lookup_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(ChatError::NetworkUnavailable("scripted failure".into()));
        }
        Ok(SessionLookupResponse {
            chat_session_id: self.session_id.clone(),
        })
    }

    async fn history(&self, marker: &SessionMarker) -> Result<Vec<ChatMessage>, ChatError> {
        if self.offline {
            return Err(ChatError::NetworkUnavailable("scripted offline".into()));
        }
        Ok(self
            .history_texts
            .iter()
            .map(|text| ChatMessage::user(text.clone(), marker.clone()))
            .collect())
    }

    async fn ask(&self, _request: AskRequest) -> Result<AskResponse, ChatError> {
        self.run_ask().await
    }

    async fn ask_combined(&self, _request: AskRequest) -> Result<AskResponse, ChatError> {
        self.run_ask().await
    }

    fn open_stream(
        &self,
        _request: StreamRequest,
        tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
        cancel: CancellationToken,
        stream_id: u64,
    ) {
        self.stream_cancel_tokens.lock().unwrap().push(cancel);
        for message in &self.stream_replay {
            let _ = tx.send((message.clone(), stream_id));
        }
    }
}
