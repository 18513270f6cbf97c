//! Message dispatch: the single entry point for a user turn.
//!
//! A dispatch echoes the user message, supersedes any in-flight request for
//! the conversation slot, then routes to the synchronous or streaming
//! transport. Responses flow back as [`StreamMessage`]s tagged with the
//! dispatch's stream id; the handler drops anything tagged with a stale id,
//! so only the newest dispatch ever mutates the live message.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::api::{AskRequest, AskResponse, StreamRequest, VideoResult, WebResult};
use crate::core::backend::Backend;
use crate::core::batch::RenderBatcher;
use crate::core::error::ChatError;
use crate::core::intent::is_code_generation_request;
use crate::core::message::{ChatMessage, Sender};
use crate::core::provider::ProviderTarget;
use crate::core::retry::{self, RetryState, MAX_RETRIES};
use crate::core::store::{NoticeLevel, SessionMarker, SharedStore};
use crate::core::stream::StreamMessage;

/// Size at which a synchronous answer is sliced for progressive reveal.
const REVEAL_SLICE_LEN: usize = 64;

/// Per-dispatch adjustments to the default routing.
#[derive(Debug, Clone, Default)]
pub struct SendOverrides {
    pub targets: Option<Vec<ProviderTarget>>,
}

/// One queued mutation of the live message, applied at flush time.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Append(String),
    Replace(String),
}

pub struct ChatClient {
    store: SharedStore,
    backend: Arc<dyn Backend>,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    cancel_slot: Option<CancellationToken>,
    current_stream_id: u64,
    live_message: Option<usize>,
    default_targets: Vec<ProviderTarget>,
    max_retries: u32,
}

impl ChatClient {
    pub fn new(
        store: SharedStore,
        backend: Arc<dyn Backend>,
        default_targets: Vec<ProviderTarget>,
    ) -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                backend,
                tx,
                cancel_slot: None,
                current_stream_id: 0,
                live_message: None,
                default_targets,
                max_retries: MAX_RETRIES,
            },
            rx,
        )
    }

    pub fn current_stream_id(&self) -> u64 {
        self.current_stream_id
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    /// Cancel whatever is in flight without starting anything new. Used on
    /// teardown; also bumps the stream id so straggler events are dropped.
    pub fn cancel_current(&mut self) {
        if let Some(token) = self.cancel_slot.take() {
            token.cancel();
        }
        self.current_stream_id += 1;
        self.live_message = None;
    }

    /// Swap the conversation slot: cancel the prior request, install a
    /// fresh token, bump the stream id.
    fn begin_dispatch(&mut self) -> (CancellationToken, u64) {
        if let Some(token) = self.cancel_slot.take() {
            token.cancel();
        }
        let token = CancellationToken::new();
        self.cancel_slot = Some(token.clone());
        self.current_stream_id += 1;
        (token, self.current_stream_id)
    }

    /// Dispatch one user turn. A turn with no resolved session is a no-op:
    /// the role/project guard is UI behavior, not an error to propagate.
    pub async fn send(&mut self, text: &str, overrides: SendOverrides) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        let marker = self.store.lock().await.marker().cloned();
        let Some(marker) = marker.filter(SessionMarker::is_resolved) else {
            debug!("send ignored: session not resolved");
            return;
        };

        let (cancel, stream_id) = self.begin_dispatch();

        {
            let mut store = self.store.lock().await;
            // A superseded dispatch may leave its live message open; close
            // it before the new turn starts.
            if let Some(index) = self.live_message.take() {
                store.finalize_message(index);
            }
            store.clear_notice();
            store.push_message(ChatMessage::user(trimmed, marker.clone()));
            store.set_in_flight(true);
        }

        let targets = overrides
            .targets
            .filter(|targets| !targets.is_empty())
            .unwrap_or_else(|| self.default_targets.clone());

        if is_code_generation_request(trimmed) {
            self.start_streaming(trimmed, &marker, targets[0], cancel, stream_id)
                .await;
        } else {
            self.start_synchronous(trimmed.to_string(), marker, targets, cancel, stream_id);
        }
    }

    /// Streaming transport: one placeholder assistant message goes in
    /// before the first byte arrives, then the response channel opens.
    async fn start_streaming(
        &mut self,
        question: &str,
        marker: &SessionMarker,
        target: ProviderTarget,
        cancel: CancellationToken,
        stream_id: u64,
    ) {
        {
            let mut store = self.store.lock().await;
            let index = store.push_message(ChatMessage::assistant_placeholder(
                target.sender(),
                marker.clone(),
            ));
            self.live_message = Some(index);
        }

        let request = StreamRequest {
            query: question.to_string(),
            provider: target.as_str().to_string(),
            role_id: marker.role_id,
            project_id: marker.project_id,
            chat_session_id: marker.chat_session_id.clone(),
        };
        debug!(stream_id, provider = target.as_str(), "opening response stream");
        self.backend.open_stream(request, self.tx.clone(), cancel, stream_id);
    }

    /// Synchronous transport: the calls run concurrently, the reveals land
    /// in target order over the same channel the streaming path uses.
    fn start_synchronous(
        &self,
        question: String,
        marker: SessionMarker,
        targets: Vec<ProviderTarget>,
        cancel: CancellationToken,
        stream_id: u64,
    ) {
        let backend = self.backend.clone();
        let tx = self.tx.clone();
        let max_retries = self.max_retries;

        tokio::spawn(async move {
            tokio::select! {
                _ = run_synchronous_dispatch(
                    backend, tx, question, marker, targets, cancel.clone(), stream_id, max_retries,
                ) => {}
                // Superseded: drop partial state silently.
                _ = cancel.cancelled() => {}
            }
        });
    }

    /// Apply one incoming transport message. Anything tagged with a stale
    /// stream id is ignored; its dispatch has been superseded.
    pub async fn handle_stream_message(
        &mut self,
        message: StreamMessage,
        stream_id: u64,
        batcher: &mut RenderBatcher<RenderOp>,
    ) {
        if !self.is_current_stream(stream_id) {
            debug!(stream_id, current = self.current_stream_id, "dropping stale stream message");
            return;
        }

        match message {
            StreamMessage::Open { sender } => {
                let ops = batcher.flush_now();
                self.apply_render_ops(ops).await;
                let mut store = self.store.lock().await;
                if let Some(index) = self.live_message.take() {
                    store.finalize_message(index);
                }
                if let Some(marker) = store.marker().cloned() {
                    let index =
                        store.push_message(ChatMessage::assistant_placeholder(sender, marker));
                    self.live_message = Some(index);
                }
            }
            StreamMessage::Chunk(delta) => batcher.push(RenderOp::Append(delta)),
            StreamMessage::Snapshot(text) => batcher.push(RenderOp::Replace(text)),
            StreamMessage::Notice { level, text } => {
                self.store.lock().await.set_notice(level, text);
            }
            StreamMessage::Error(summary) => {
                let ops = batcher.flush_now();
                self.apply_render_ops(ops).await;
                let mut store = self.store.lock().await;
                if let Some(index) = self.live_message.take() {
                    store.finalize_message(index);
                }
                if let Some(marker) = store.marker().cloned() {
                    store.push_message(ChatMessage::system(summary.clone(), marker));
                }
                store.set_notice(NoticeLevel::Error, summary);
            }
            StreamMessage::End => {
                let ops = batcher.flush_now();
                self.apply_render_ops(ops).await;
                let mut store = self.store.lock().await;
                if let Some(index) = self.live_message.take() {
                    store.finalize_message(index);
                }
                store.set_in_flight(false);
                // Wait notices are done; error notices stay visible.
                if store
                    .notice()
                    .is_some_and(|notice| notice.level != NoticeLevel::Error)
                {
                    store.clear_notice();
                }
            }
        }
    }

    /// Flush a batch of queued render operations into the live message.
    pub async fn apply_render_ops(&mut self, ops: Vec<RenderOp>) {
        if ops.is_empty() {
            return;
        }
        let Some(index) = self.live_message else {
            return;
        };
        let mut store = self.store.lock().await;
        for op in ops {
            match op {
                RenderOp::Append(delta) => store.append_to_message(index, &delta),
                RenderOp::Replace(text) => store.replace_message_text(index, text),
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_synchronous_dispatch(
    backend: Arc<dyn Backend>,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    question: String,
    marker: SessionMarker,
    targets: Vec<ProviderTarget>,
    cancel: CancellationToken,
    stream_id: u64,
    max_retries: u32,
) {
    let calls = targets.iter().map(|target| {
        let backend = backend.clone();
        let tx = tx.clone();
        let cancel = cancel.clone();
        let request = AskRequest {
            question: question.clone(),
            provider: target.as_str().to_string(),
            role_id: marker.role_id,
        };
        let target = *target;
        async move {
            let result =
                ask_with_retry(backend, request, target, &cancel, &tx, stream_id, max_retries)
                    .await;
            (target, result)
        }
    });

    for (target, result) in join_all(calls).await {
        match result {
            Ok(response) => reveal_response(&tx, stream_id, target, &response),
            Err(ChatError::Cancelled) => return,
            Err(err) => {
                // Logged here; the user sees exactly one system message.
                error!(provider = target.as_str(), error = %err, "ask failed terminally");
                let _ = tx.send((StreamMessage::Error(err.user_summary()), stream_id));
            }
        }
    }
    let _ = tx.send((StreamMessage::End, stream_id));
}

/// One provider call under the retry policy and the escalation deadlines.
/// The deadlines span the whole dispatch: retries and their backoffs run
/// inside them, so the hard abort caps the total wait.
async fn ask_with_retry(
    backend: Arc<dyn Backend>,
    request: AskRequest,
    target: ProviderTarget,
    cancel: &CancellationToken,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    max_retries: u32,
) -> Result<AskResponse, ChatError> {
    let attempts = async {
        let mut state = RetryState::new(max_retries);
        loop {
            let result = if target.is_combined() {
                backend.ask_combined(request.clone()).await
            } else {
                backend.ask(request.clone()).await
            };

            match result {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let class = retry::classify(&err);
                    if !retry::should_retry(class, state.attempt, state.max_retries) {
                        return Err(err);
                    }
                    state.register_failure();
                    debug!(
                        provider = target.as_str(),
                        attempt = state.attempt,
                        error = %err,
                        "retrying after backoff"
                    );
                    retry::wait_before_retry(state.attempt, cancel).await?;
                }
            }
        }
    };

    retry::run_with_deadlines(attempts, cancel, |level, text| {
        let _ = tx.send((
            StreamMessage::Notice {
                level,
                text: text.to_string(),
            },
            stream_id,
        ));
    })
    .await
}

/// Reveal one synchronous response: the answer as a progressively-delivered
/// assistant message, then each supplementary source block as its own
/// synthetic message.
fn reveal_response(
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    target: ProviderTarget,
    response: &AskResponse,
) {
    let sender = response
        .provider
        .as_deref()
        .and_then(|name| Sender::try_from(name).ok())
        .unwrap_or_else(|| target.sender());

    reveal_text(tx, stream_id, sender, &response.answer);

    if let Some(details) = response.details.as_deref().filter(|d| !d.is_empty()) {
        reveal_text(tx, stream_id, Sender::System, &format_web_results(details));
    }
    if let Some(videos) = response
        .youtube_results
        .as_deref()
        .filter(|v| !v.is_empty())
    {
        reveal_text(tx, stream_id, Sender::System, &format_video_results(videos));
    }
}

fn reveal_text(
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
    sender: Sender,
    text: &str,
) {
    let _ = tx.send((StreamMessage::Open { sender }, stream_id));
    for slice in reveal_slices(text) {
        let _ = tx.send((StreamMessage::Chunk(slice), stream_id));
    }
}

/// Slice a complete answer on whitespace boundaries so even non-streamed
/// payloads render progressively. Concatenating the slices reproduces the
/// input exactly.
fn reveal_slices(text: &str) -> Vec<String> {
    let mut slices = Vec::new();
    let mut current = String::new();
    for piece in text.split_inclusive(char::is_whitespace) {
        current.push_str(piece);
        if current.len() >= REVEAL_SLICE_LEN {
            slices.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        slices.push(current);
    }
    slices
}

fn format_web_results(results: &[WebResult]) -> String {
    let mut out = String::from("Sources:");
    for result in results {
        out.push_str(&format!("\n- {}: {}", result.title, result.url));
        if let Some(snippet) = result.snippet.as_deref().filter(|s| !s.is_empty()) {
            out.push_str(&format!("\n  {snippet}"));
        }
    }
    out
}

fn format_video_results(results: &[VideoResult]) -> String {
    let mut out = String::from("Videos:");
    for result in results {
        out.push_str(&format!("\n- {}: {}", result.title, result.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AskResponse;
    use crate::core::store::SessionStore;
    use crate::utils::test_utils::ScriptedBackend;
    use std::time::Duration;
    use tokio::time::Instant;

    fn marker() -> SessionMarker {
        SessionMarker::new(7, 3, "s-test")
    }

    async fn seeded_store() -> SharedStore {
        let store = SessionStore::shared();
        store.lock().await.set_marker(marker());
        store
    }

    async fn client_with(
        backend: Arc<ScriptedBackend>,
    ) -> (
        ChatClient,
        mpsc::UnboundedReceiver<(StreamMessage, u64)>,
        SharedStore,
    ) {
        let store = seeded_store().await;
        let (client, rx) =
            ChatClient::new(store.clone(), backend, vec![ProviderTarget::OpenAi]);
        (client, rx, store)
    }

    /// Drive the handler until the current dispatch's End lands, the way
    /// the event loop would.
    async fn pump_until_end(
        client: &mut ChatClient,
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
        batcher: &mut RenderBatcher<RenderOp>,
    ) -> Vec<StreamMessage> {
        let mut seen = Vec::new();
        while let Some((message, stream_id)) = rx.recv().await {
            let ends_current =
                matches!(message, StreamMessage::End) && client.is_current_stream(stream_id);
            seen.push(message.clone());
            client.handle_stream_message(message, stream_id, batcher).await;
            if ends_current {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn send_without_resolved_session_is_a_noop() {
        let store = SessionStore::shared();
        let backend = Arc::new(ScriptedBackend::answering("unused"));
        let (mut client, mut rx) =
            ChatClient::new(store.clone(), backend, vec![ProviderTarget::OpenAi]);

        client.send("hello", SendOverrides::default()).await;

        assert!(store.lock().await.messages().is_empty());
        assert!(!store.lock().await.is_in_flight());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn synchronous_send_echoes_user_and_reveals_answer() {
        let backend = Arc::new(ScriptedBackend::answering("The capital is Paris."));
        let (mut client, mut rx, store) = client_with(backend).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client
            .send("what is the capital of France?", SendOverrides::default())
            .await;
        assert!(store.lock().await.is_in_flight());

        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].sender.is_user());
        assert_eq!(messages[0].text, "what is the capital of France?");
        assert_eq!(messages[1].sender, Sender::OpenAi);
        assert_eq!(messages[1].text, "The capital is Paris.");
        assert!(messages[1].is_terminal());
        assert!(!store.is_in_flight());
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_retry_three_times_then_surface() {
        let backend = Arc::new(ScriptedBackend::ask_failing(ChatError::ServerError {
            status: 500,
            body: String::new(),
        }));
        let (mut client, mut rx, store) = client_with(backend.clone()).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        let started = Instant::now();
        client.send("hello there", SendOverrides::default()).await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        // Initial call plus exactly three retries, spaced 2s/4s/8s.
        assert_eq!(backend.ask_attempts(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(14));

        let store = store.lock().await;
        let last = store.messages().last().expect("terminal message");
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("server reported an error"));
        assert!(!store.is_in_flight());
    }

    #[tokio::test]
    async fn auth_failures_surface_immediately_without_retry() {
        let backend = Arc::new(ScriptedBackend::ask_failing(ChatError::Unauthorized));
        let (mut client, mut rx, store) = client_with(backend.clone()).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("hello there", SendOverrides::default()).await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        assert_eq!(backend.ask_attempts(), 1);
        let store = store.lock().await;
        let last = store.messages().last().expect("terminal message");
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("credentials"));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_recovers_within_the_retry_budget() {
        let backend = Arc::new(
            ScriptedBackend::answering("recovered").with_ask_script([Err(
                ChatError::NetworkUnavailable("connection reset".into()),
            )]),
        );
        let (mut client, mut rx, store) = client_with(backend.clone()).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("hello there", SendOverrides::default()).await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        assert_eq!(backend.ask_attempts(), 2);
        let store = store.lock().await;
        assert_eq!(store.messages().last().unwrap().text, "recovered");
    }

    #[tokio::test]
    async fn newer_send_supersedes_the_older_stream() {
        let backend = Arc::new(ScriptedBackend::offline().with_stream(vec![
            StreamMessage::Chunk("generated".into()),
            StreamMessage::End,
        ]));
        let (mut client, mut rx, store) = client_with(backend.clone()).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        // Both turns route to the streaming transport; the fake replays
        // its script at open time, so A's events sit queued with a stale id.
        client.send("build an app one", SendOverrides::default()).await;
        client.send("build an app two", SendOverrides::default()).await;

        let tokens = backend.stream_cancel_tokens();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_cancelled());
        assert!(!tokens[1].is_cancelled());

        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let messages = store.messages();
        // user A, A's placeholder (closed empty), user B, B's reply.
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].text, "");
        assert!(messages[1].is_terminal());
        assert_eq!(messages[3].text, "generated");
        assert!(messages[3].is_terminal());
        assert!(!store.is_in_flight());
    }

    #[tokio::test]
    async fn streaming_send_places_placeholder_before_first_byte() {
        let backend = Arc::new(ScriptedBackend::offline().with_stream(vec![
            StreamMessage::Snapshot("### a.ts\nconst x=1;".into()),
            StreamMessage::End,
        ]));
        let (mut client, mut rx, store) = client_with(backend).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("write a script for me", SendOverrides::default()).await;

        {
            let store = store.lock().await;
            let placeholder = store.messages().last().expect("placeholder");
            assert!(placeholder.is_streaming);
            assert!(placeholder.text.is_empty());
        }

        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let reply = store.messages().last().expect("reply");
        assert_eq!(reply.text, "### a.ts\nconst x=1;");
        assert!(reply.is_terminal());
    }

    #[tokio::test]
    async fn supplementary_sources_become_their_own_messages() {
        let response = AskResponse {
            provider: Some("anthropic".into()),
            answer: "Short answer.".into(),
            details: Some(vec![WebResult {
                title: "Useful page".into(),
                url: "https://example.com".into(),
                snippet: None,
            }]),
            youtube_results: Some(vec![VideoResult {
                title: "Walkthrough".into(),
                url: "https://videos.example.com/1".into(),
            }]),
        };
        let backend = Arc::new(ScriptedBackend::answering_with(response));
        let (mut client, mut rx, store) = client_with(backend).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("tell me about it", SendOverrides::default()).await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let messages = store.messages();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].sender, Sender::Anthropic);
        assert_eq!(messages[1].text, "Short answer.");
        assert!(messages[2].text.starts_with("Sources:"));
        assert!(messages[2].text.contains("https://example.com"));
        assert!(messages[3].text.starts_with("Videos:"));
        assert!(messages.iter().skip(1).all(|m| m.is_terminal()));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_escalate_notices_then_time_out() {
        let backend = Arc::new(ScriptedBackend::hanging());
        let (mut client, mut rx, store) = client_with(backend).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("hello there", SendOverrides::default()).await;
        let seen = pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let notice_levels: Vec<NoticeLevel> = seen
            .iter()
            .filter_map(|m| match m {
                StreamMessage::Notice { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert!(notice_levels.contains(&NoticeLevel::Info));
        assert!(notice_levels.contains(&NoticeLevel::Warning));

        let store = store.lock().await;
        let last = store.messages().last().expect("terminal message");
        assert_eq!(last.sender, Sender::System);
        assert!(last.text.contains("timed out"));
    }

    #[tokio::test]
    async fn combined_target_uses_the_fanout_call() {
        let backend = Arc::new(ScriptedBackend::answering("joint verdict"));
        let store = seeded_store().await;
        let (mut client, mut rx) =
            ChatClient::new(store.clone(), backend, vec![ProviderTarget::All]);
        let mut batcher = RenderBatcher::with_frame_defaults();

        client.send("compare yourselves", SendOverrides::default()).await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let reply = &store.messages()[1];
        assert_eq!(reply.sender, Sender::Final);
        assert_eq!(reply.text, "joint verdict");
    }

    #[tokio::test]
    async fn multi_provider_overrides_reveal_in_target_order() {
        let backend = Arc::new(ScriptedBackend::answering("same answer"));
        let (mut client, mut rx, store) = client_with(backend).await;
        let mut batcher = RenderBatcher::with_frame_defaults();

        client
            .send(
                "hello both",
                SendOverrides {
                    targets: Some(vec![ProviderTarget::OpenAi, ProviderTarget::Anthropic]),
                },
            )
            .await;
        pump_until_end(&mut client, &mut rx, &mut batcher).await;

        let store = store.lock().await;
        let senders: Vec<Sender> = store.messages().iter().map(|m| m.sender).collect();
        assert_eq!(
            senders,
            vec![Sender::User, Sender::OpenAi, Sender::Anthropic]
        );
    }

    #[test]
    fn reveal_slices_reassemble_exactly() {
        let text = "one two three four five six seven eight nine ten eleven twelve \
                    thirteen fourteen fifteen sixteen seventeen eighteen";
        let slices = reveal_slices(text);
        assert!(slices.len() > 1);
        assert_eq!(slices.concat(), text);
    }

    #[test]
    fn reveal_slices_handle_short_and_empty_input() {
        assert_eq!(reveal_slices("hi"), vec!["hi".to_string()]);
        assert!(reveal_slices("").is_empty());
    }
}
