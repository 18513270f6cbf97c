use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

use colloquy::api::client::HttpBackend;
use colloquy::core::backend::Backend;
use colloquy::core::batch::RenderBatcher;
use colloquy::core::dispatch::{ChatClient, RenderOp, SendOverrides};
use colloquy::core::persistence::MarkerFile;
use colloquy::core::provider::ProviderTarget;
use colloquy::core::reconcile::SessionReconciler;
use colloquy::core::store::{SessionStore, SharedStore};
use colloquy::utils::logging::TranscriptLog;

/// Soft budget for startup session reconciliation.
const RESOLVE_BUDGET: Duration = Duration::from_secs(8);

#[derive(Parser)]
#[command(name = "colloquy")]
#[command(about = "Line-oriented chat client for one or more AI providers")]
#[command(long_about = "Colloquy reads one message per line from stdin and dispatches it to \
the configured provider (or the combined all-provider dialog), streaming \
code-generation responses incrementally. The current chat session is \
reconciled against a locally persisted marker and the backend at startup.")]
struct Args {
    #[arg(
        long,
        default_value = "http://localhost:8000",
        help = "Chat backend base URL"
    )]
    base_url: String,

    #[arg(long, default_value_t = 1, help = "Assistant role id")]
    role_id: i64,

    #[arg(long, default_value_t = 1, help = "Project id")]
    project_id: i64,

    #[arg(long, value_enum, default_value_t = ProviderTarget::OpenAi, help = "Provider target for each turn")]
    provider: ProviderTarget,

    #[arg(long, help = "Append the conversation transcript to this file")]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let transcript = TranscriptLog::new(args.log.clone())?;

    let store = SessionStore::shared();
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(args.base_url.clone()));
    let marker_file = MarkerFile::at(MarkerFile::default_path());

    let reconciler = SessionReconciler::new(store.clone(), backend.clone(), marker_file.clone());
    let marker = reconciler
        .resolve_session(args.role_id, args.project_id, RESOLVE_BUDGET)
        .await;
    eprintln!(
        "session {} (role {}, project {}) via {}",
        marker.chat_session_id, args.role_id, args.project_id, args.base_url
    );

    let (mut client, mut rx) = ChatClient::new(store.clone(), backend, vec![args.provider]);
    let mut batcher: RenderBatcher<RenderOp> = RenderBatcher::with_frame_defaults();
    let mut printed = store.lock().await.messages().len();

    // Dedicated reader task so the event loop below stays select-driven.
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if input_tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        let deadline = batcher.next_deadline();
        tokio::select! {
            line = input_rx.recv() => {
                match line {
                    Some(line) => client.send(&line, SendOverrides::default()).await,
                    None => break,
                }
            }
            incoming = rx.recv() => {
                match incoming {
                    Some((message, stream_id)) => {
                        client.handle_stream_message(message, stream_id, &mut batcher).await;
                        printed = print_finalized(&store, printed, &transcript).await;
                    }
                    None => break,
                }
            }
            _ = sleep_until_deadline(deadline), if deadline.is_some() => {
                let ops = batcher.flush_now();
                client.apply_render_ops(ops).await;
            }
        }
    }

    // Teardown: cancel in-flight work, drop pending flushes, and persist
    // the marker so the next run's reconciler can seed from it.
    client.cancel_current();
    batcher.dispose();
    if let Some(marker) = store.lock().await.marker().cloned() {
        if let Err(err) = marker_file.save(&marker) {
            tracing::warn!(error = %err, "could not persist session marker");
        }
    }

    Ok(())
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Print and log messages that have become terminal since the last call.
async fn print_finalized(store: &SharedStore, printed: usize, transcript: &TranscriptLog) -> usize {
    let store = store.lock().await;
    let messages = store.messages();
    let mut printed = printed;
    while printed < messages.len() && messages[printed].is_terminal() {
        let message = &messages[printed];
        if !message.sender.is_user() {
            println!("[{}] {}", message.sender.as_str(), message.text);
        }
        if let Err(err) = transcript.log_message(message) {
            tracing::warn!(error = %err, "could not write transcript entry");
        }
        printed += 1;
    }
    printed
}
