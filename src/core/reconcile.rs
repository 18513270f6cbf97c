//! Startup session reconciliation: decide which conversation is current by
//! racing a fast local restore against a backend lookup, minting a fresh
//! session if neither yields one. Every phase is bounded so the UI is never
//! blocked, and every failure degrades to the next phase.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::debug;

use crate::core::backend::Backend;
use crate::core::persistence::MarkerFile;
use crate::core::store::{SessionMarker, SharedStore};

/// Bound on the local-restore phase.
pub const LOCAL_RESTORE_BUDGET: Duration = Duration::from_millis(600);

const BACKEND_LOOKUP_FLOOR: Duration = Duration::from_secs(3);
const BACKEND_LOOKUP_CEIL: Duration = Duration::from_secs(5);

/// Bound on the backend-lookup phase: at least the floor, at most the
/// ceiling, stretched to whatever budget remains in between.
fn lookup_bound(remaining: Duration) -> Duration {
    remaining.clamp(BACKEND_LOOKUP_FLOOR, BACKEND_LOOKUP_CEIL)
}

/// Mint a fresh opaque chat session id.
pub fn mint_session_id() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::fill(&mut bytes).is_err() {
        // Entropy source unavailable; fall back to a timestamp-derived id.
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        return format!("s-{nanos:x}");
    }
    let mut id = String::with_capacity(34);
    id.push_str("s-");
    for byte in bytes {
        let _ = write!(id, "{byte:02x}");
    }
    id
}

pub struct SessionReconciler {
    store: SharedStore,
    backend: Arc<dyn Backend>,
    marker_file: MarkerFile,
    background_active: Arc<AtomicBool>,
}

impl SessionReconciler {
    pub fn new(store: SharedStore, backend: Arc<dyn Backend>, marker_file: MarkerFile) -> Self {
        Self {
            store,
            backend,
            marker_file,
            background_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether the best-effort background reconciliation kicked off by a
    /// fresh mint is still running.
    pub fn is_background_sync_active(&self) -> bool {
        self.background_active.load(Ordering::SeqCst)
    }

    /// Resolve the current session for a role+project pair under a soft
    /// time budget. Exactly one resolved marker is written to the store;
    /// the triple always lands through a single setter.
    pub async fn resolve_session(
        &self,
        role_id: i64,
        project_id: i64,
        budget: Duration,
    ) -> SessionMarker {
        let started = Instant::now();

        // Phase 1: local restore.
        if let Some(marker) = self.restore_local(role_id, project_id).await {
            debug!(session_id = %marker.chat_session_id, "session restored locally");
            self.store.lock().await.set_marker(marker.clone());
            return marker;
        }

        // Phase 2: backend lookup.
        let remaining = budget.saturating_sub(started.elapsed());
        let bound = lookup_bound(remaining);
        if let Some(marker) = self.lookup_remote(role_id, project_id, bound).await {
            debug!(session_id = %marker.chat_session_id, "session restored from backend");
            return marker;
        }

        // Phase 3: fresh mint. The store is usable immediately; a detached
        // best-effort sync may transparently overwrite it later.
        let marker = SessionMarker::new(project_id, role_id, mint_session_id());
        self.store.lock().await.set_marker(marker.clone());
        if let Err(err) = self.marker_file.save(&marker) {
            debug!(error = %err, "could not persist freshly minted session");
        }

        if started.elapsed() < budget {
            self.spawn_background_sync(role_id, project_id, marker.clone());
        }

        marker
    }

    async fn restore_local(&self, role_id: i64, project_id: i64) -> Option<SessionMarker> {
        // The in-memory store is authoritative when it already holds a
        // marker for this scope (e.g. a repeated resolution).
        if let Some(marker) = self.store.lock().await.marker() {
            if marker.scopes(role_id, project_id) && marker.is_resolved() {
                return Some(marker.clone());
            }
        }

        let marker_file = self.marker_file.clone();
        let loaded = timeout(
            LOCAL_RESTORE_BUDGET,
            tokio::task::spawn_blocking(move || marker_file.load()),
        )
        .await;

        match loaded {
            Ok(Ok(Ok(Some(marker)))) if marker.scopes(role_id, project_id) && marker.is_resolved() => {
                Some(marker)
            }
            Ok(Ok(Ok(_))) => None,
            Ok(Ok(Err(err))) => {
                debug!(error = %err, "persisted marker unreadable; continuing");
                None
            }
            Ok(Err(join_err)) => {
                debug!(error = %join_err, "marker restore task failed; continuing");
                None
            }
            Err(_) => {
                debug!("local restore exceeded its budget; continuing");
                None
            }
        }
    }

    /// Query the backend for the last session and, on success, its history
    /// under the same bound. Installs marker and history together. Any
    /// failure or timeout degrades to `None`.
    async fn lookup_remote(
        &self,
        role_id: i64,
        project_id: i64,
        bound: Duration,
    ) -> Option<SessionMarker> {
        let lookup = match timeout(bound, self.backend.last_session(role_id, project_id)).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(err)) => {
                debug!(error = %err, "session lookup failed; continuing");
                return None;
            }
            Err(_) => {
                debug!("session lookup timed out; continuing");
                return None;
            }
        };

        let session_id = lookup.chat_session_id.filter(|id| !id.is_empty())?;
        let marker = SessionMarker::new(project_id, role_id, session_id);

        match timeout(bound, self.backend.history(&marker)).await {
            Ok(Ok(messages)) => {
                self.store
                    .lock()
                    .await
                    .install_session(marker.clone(), messages);
            }
            Ok(Err(err)) => {
                debug!(error = %err, "history fetch failed; installing marker alone");
                self.store.lock().await.set_marker(marker.clone());
            }
            Err(_) => {
                debug!("history fetch timed out; installing marker alone");
                self.store.lock().await.set_marker(marker.clone());
            }
        }

        if let Err(err) = self.marker_file.save(&marker) {
            debug!(error = %err, "could not persist restored session");
        }
        Some(marker)
    }

    /// Detached best-effort reconciliation after a fresh mint. Never
    /// awaited by the main flow and never propagates errors; completion
    /// only releases the in-progress flag.
    fn spawn_background_sync(&self, role_id: i64, project_id: i64, minted: SessionMarker) {
        let backend = self.backend.clone();
        let store = self.store.clone();
        let marker_file = self.marker_file.clone();
        let active = self.background_active.clone();

        active.store(true, Ordering::SeqCst);
        tokio::spawn(async move {
            let outcome = async {
                let lookup = backend.last_session(role_id, project_id).await.ok()?;
                let session_id = lookup.chat_session_id.filter(|id| !id.is_empty())?;
                if session_id == minted.chat_session_id {
                    return None;
                }

                let marker = SessionMarker::new(project_id, role_id, session_id);
                let messages = backend.history(&marker).await.unwrap_or_default();

                // Re-validate after the suspension points: only overwrite
                // if the minted session is still current.
                let mut store = store.lock().await;
                match store.marker() {
                    Some(current) if *current == minted => {
                        store.install_session(marker.clone(), messages);
                        Some(marker)
                    }
                    _ => None,
                }
            }
            .await;

            if let Some(marker) = outcome {
                debug!(session_id = %marker.chat_session_id, "background sync adopted backend session");
                if let Err(err) = marker_file.save(&marker) {
                    debug!(error = %err, "could not persist background-synced session");
                }
            }
            active.store(false, Ordering::SeqCst);
        });
    }
}
