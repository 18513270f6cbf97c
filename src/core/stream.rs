//! Incremental response transport and decoding.
//!
//! The wire format is a newline-delimited event stream: only lines bearing
//! the `data:` prefix carry events, each one a JSON object with an `event`
//! tag and a `data` payload. A literal `[DONE]` line may trail the stream;
//! it is a sentinel, not an event. Decoding runs through an explicit state
//! machine ([`StreamAssembler`]) so every event application is a plain
//! `(state, event) -> state` transition.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;

use crate::api::{endpoint_url, StreamEvent, StreamRequest};
use crate::core::error::ChatError;
use crate::core::message::Sender;
use crate::core::store::NoticeLevel;

/// Messages flowing from a transport task to the dispatch handler. Both the
/// streaming and the synchronous reveal path speak this protocol, tagged
/// with the stream id of the dispatch that produced them.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// Open a fresh assistant message attributed to `sender`.
    Open { sender: Sender },
    /// Append a delta to the live message.
    Chunk(String),
    /// Replace the live message's text with a recomputed snapshot.
    Snapshot(String),
    /// Update the ephemeral notice slot.
    Notice { level: NoticeLevel, text: String },
    /// Terminal failure; becomes a system message.
    Error(String),
    /// Dispatch finished; finalize the live message.
    End,
}

struct FileBuffer {
    filename: String,
    content: String,
}

/// Outcome of applying one event to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamStep {
    /// Plain text arrived; emit the delta as-is.
    Delta(String),
    /// A file buffer changed; emit the recomputed full text.
    Snapshot(String),
    /// The stream announced how many files to expect.
    Progress { expected: u32 },
    /// A file opened or closed; no text change yet.
    FileBoundary,
    /// The stream completed; the final full text.
    Finished(String),
    /// The stream reported its own terminal error.
    Failed(String),
}

/// Reassembly state for one dispatch: a running text accumulator plus an
/// insertion-ordered map of named file buffers. Discarded once `done` or
/// `error` is observed.
#[derive(Default)]
pub struct StreamAssembler {
    text: String,
    files: Vec<FileBuffer>,
    current: Option<usize>,
    expected_files: Option<u32>,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected_files(&self) -> Option<u32> {
        self.expected_files
    }

    /// Apply one decoded event. A `file_chunk` with no open file is a
    /// protocol violation and is reported rather than dropped: silently
    /// losing generated content is the worse failure mode.
    pub fn apply(&mut self, event: StreamEvent) -> Result<StreamStep, ChatError> {
        match event {
            StreamEvent::Chunk { content } => {
                self.text.push_str(&content);
                Ok(StreamStep::Delta(content))
            }
            StreamEvent::FilesDetected { total_files } => {
                self.expected_files = Some(total_files);
                Ok(StreamStep::Progress {
                    expected: total_files,
                })
            }
            StreamEvent::FileStart { filename, .. } => {
                self.files.push(FileBuffer {
                    filename,
                    content: String::new(),
                });
                self.current = Some(self.files.len() - 1);
                Ok(StreamStep::FileBoundary)
            }
            StreamEvent::FileChunk { content } => match self.current {
                Some(index) => {
                    self.files[index].content.push_str(&content);
                    Ok(StreamStep::Snapshot(self.rendered()))
                }
                None => Err(ChatError::ProtocolError(
                    "file_chunk with no open file".to_string(),
                )),
            },
            // The current pointer stays; a well-formed stream follows with
            // another file_start or done.
            StreamEvent::FileEnd { .. } => Ok(StreamStep::FileBoundary),
            StreamEvent::Done {} => Ok(StreamStep::Finished(self.rendered())),
            StreamEvent::Error { message } => Ok(StreamStep::Failed(message)),
        }
    }

    /// The full text as currently known: plain text first, then every file
    /// buffer in insertion order, each preceded by its filename header.
    pub fn rendered(&self) -> String {
        if self.files.is_empty() {
            return self.text.clone();
        }

        let mut out = String::new();
        if !self.text.is_empty() {
            out.push_str(&self.text);
            out.push_str("\n\n");
        }
        for (i, file) in self.files.iter().enumerate() {
            if i > 0 {
                out.push_str("\n\n");
            }
            out.push_str(&format!("### {}\n{}", file.filename, file.content));
        }
        out
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Handle one framed line. Returns true when the stream is terminal.
fn process_event_line(
    line: &str,
    assembler: &mut StreamAssembler,
    tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) -> bool {
    let Some(payload) = extract_data_payload(line) else {
        return false;
    };

    // Trailing sentinel; not an event.
    if payload == "[DONE]" || payload.is_empty() {
        return false;
    }

    let event = match StreamEvent::parse(payload) {
        Ok(event) => event,
        Err(err) => {
            // Malformed or future-tagged lines are skipped, never fatal.
            tracing::debug!(stream_id, error = %err, "skipping unparseable stream line");
            return false;
        }
    };

    match assembler.apply(event) {
        Ok(StreamStep::Delta(delta)) => {
            let _ = tx.send((StreamMessage::Chunk(delta), stream_id));
            false
        }
        Ok(StreamStep::Snapshot(text)) => {
            let _ = tx.send((StreamMessage::Snapshot(text), stream_id));
            false
        }
        Ok(StreamStep::Progress { expected }) => {
            let _ = tx.send((
                StreamMessage::Notice {
                    level: NoticeLevel::Info,
                    text: format!("Generating {expected} files..."),
                },
                stream_id,
            ));
            false
        }
        Ok(StreamStep::FileBoundary) => false,
        Ok(StreamStep::Finished(text)) => {
            let _ = tx.send((StreamMessage::Snapshot(text), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
        Ok(StreamStep::Failed(message)) => {
            let _ = tx.send((StreamMessage::Error(message), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
        Err(err) => {
            let _ = tx.send((StreamMessage::Error(err.user_summary()), stream_id));
            let _ = tx.send((StreamMessage::End, stream_id));
            true
        }
    }
}

/// Condense an HTTP error body to a one-line summary for the transcript.
fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "The server returned an error with no detail.".to_string();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let summary = value
            .pointer("/error/message")
            .or_else(|| value.pointer("/message"))
            .and_then(|v| v.as_str());
        if let Some(summary) = summary {
            return format!("Server error: {summary}");
        }
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("Server error: {collapsed}")
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub request: StreamRequest,
    pub cancel_token: tokio_util::sync::CancellationToken,
    pub stream_id: u64,
}

/// Open the incremental response channel for one dispatch. The spawned task
/// frames the byte stream into lines, decodes events through a fresh
/// [`StreamAssembler`], and reports over `tx`; it stops yielding as soon as
/// the cancel token trips.
pub fn spawn_stream(params: StreamParams, tx: mpsc::UnboundedSender<(StreamMessage, u64)>) {
    tokio::spawn(async move {
        let StreamParams {
            client,
            base_url,
            request,
            cancel_token,
            stream_id,
        } = params;

        tokio::select! {
            _ = async {
                let url = endpoint_url(&base_url, "ask-stream");
                match client
                    .post(url)
                    .header("Content-Type", "application/json")
                    .json(&request)
                    .send()
                    .await
                {
                    Ok(response) => {
                        if !response.status().is_success() {
                            let error_text = response
                                .text()
                                .await
                                .unwrap_or_else(|_| "<no body>".to_string());
                            let _ = tx.send((
                                StreamMessage::Error(format_api_error(&error_text)),
                                stream_id,
                            ));
                            let _ = tx.send((StreamMessage::End, stream_id));
                            return;
                        }

                        let mut assembler = StreamAssembler::new();
                        let mut stream = response.bytes_stream();
                        let mut buffer: Vec<u8> = Vec::new();

                        while let Some(chunk) = stream.next().await {
                            if cancel_token.is_cancelled() {
                                return;
                            }

                            if let Ok(chunk_bytes) = chunk {
                                buffer.extend_from_slice(&chunk_bytes);

                                while let Some(newline_pos) = memchr(b'\n', &buffer) {
                                    let line = match std::str::from_utf8(&buffer[..newline_pos]) {
                                        Ok(s) => s.trim().to_string(),
                                        Err(err) => {
                                            tracing::debug!(stream_id, error = %err, "invalid UTF-8 in stream");
                                            buffer.drain(..=newline_pos);
                                            continue;
                                        }
                                    };
                                    buffer.drain(..=newline_pos);

                                    if process_event_line(&line, &mut assembler, &tx, stream_id) {
                                        return;
                                    }
                                }
                            }
                        }

                        // Connection closed without a done event; finalize
                        // with what was assembled.
                        let _ = tx.send((StreamMessage::End, stream_id));
                    }
                    Err(err) => {
                        let _ = tx.send((
                            StreamMessage::Error(format_api_error(&err.to_string())),
                            stream_id,
                        ));
                        let _ = tx.send((StreamMessage::End, stream_id));
                    }
                }
            } => {}
            _ = cancel_token.cancelled() => {}
        }
    });
}
