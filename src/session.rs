//! The analysis session: lifecycle of one submitted document.
//!
//! ## State machine
//!
//! ```text
//!            submit(pdf)                 success
//!   Idle ────────────────▶ Loading ────────────────▶ Completed
//!    ▲  ╲                     │                          │
//!    │   ╲ submit(non-pdf)    │ failure                  │ reset
//!    │    ╲                   ▼                          │
//!    └─────╲───────────── Errored ◀──────────────────────┘
//!      reset
//! ```
//!
//! `Completed` and `Errored` are terminal; `reset` is the only transition
//! out of them. Submitting while `Loading` is rejected outright (the
//! single-in-flight invariant), and resetting while `Loading` cancels the
//! underlying request instead of silently leaking it.
//!
//! ## Concurrency
//!
//! Progress callbacks arrive from the task driving the stream while
//! `reset`/accessors may run on other threads, so every mutation goes
//! through one `Mutex`. An epoch counter stamps each submission: callbacks
//! and completions carrying a stale epoch are dropped, so a reset-then-
//! resubmit is never clobbered by the cancelled call's leftovers.

use crate::client::{AnalysisClient, ProgressObserver};
use crate::document::{Document, EncodedPayload};
use crate::error::SessionError;
use crate::snapshot::AnalysisSnapshot;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document submitted.
    Idle,
    /// An analysis request is in flight.
    Loading,
    /// Analysis finished; the stored snapshot is the authoritative result.
    Completed,
    /// Analysis failed or the document was rejected; a partial snapshot may
    /// remain readable but is not a result.
    Errored,
}

/// Read-only view of the session for a presentation layer.
///
/// The UI only ever observes state: errors are already folded into
/// `error_message`, and `text` is the verbatim, whitespace-preserving
/// snapshot text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub state: SessionState,
    pub file_name: Option<String>,
    pub text: String,
    pub error_message: Option<String>,
    pub char_count: usize,
}

/// A completed transcription ready to hand to a download/save collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownExport {
    /// Original document name with the extension replaced (`report.pdf` →
    /// `report.md`).
    pub file_name: String,
    pub content: String,
}

#[derive(Debug)]
struct Inner {
    state: SessionState,
    document: Option<Document>,
    snapshot: AnalysisSnapshot,
    error: Option<SessionError>,
    cancel: Option<CancellationToken>,
    epoch: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            document: None,
            snapshot: AnalysisSnapshot::default(),
            error: None,
            cancel: None,
            epoch: 0,
        }
    }
}

/// Owns the lifecycle of one user-submitted document at a time.
///
/// Cheap to clone; all clones observe the same session.
#[derive(Clone)]
pub struct AnalysisSession {
    inner: Arc<Mutex<Inner>>,
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicked observer must not wedge the session; the data is a
        // plain snapshot/state pair and stays coherent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Submit a document for analysis and drive the request to completion.
    ///
    /// Resolves with the final snapshot once the stream closes. Terminal
    /// outcomes (and the validation rejection) are also stored on the
    /// session for observers; [`SessionError::SessionBusy`] is the one
    /// error that is returned without touching session state.
    pub async fn submit<C>(
        &self,
        document: Document,
        client: &C,
    ) -> Result<AnalysisSnapshot, SessionError>
    where
        C: AnalysisClient + ?Sized,
    {
        let (payload, cancel, epoch) = {
            let mut s = self.lock();

            if s.state == SessionState::Loading {
                // Single in-flight session invariant: reject, never queue.
                return Err(SessionError::SessionBusy);
            }

            if !document.is_pdf() {
                let err = SessionError::UnsupportedMediaType {
                    media_type: document.media_type().to_string(),
                };
                warn!("rejected '{}': {}", document.name(), err);
                s.epoch += 1;
                s.state = SessionState::Errored;
                s.snapshot = AnalysisSnapshot::default();
                s.error = Some(err.clone());
                // File name stays inspectable until reset.
                s.document = Some(document);
                s.cancel = None;
                return Err(err);
            }

            info!("submitting '{}' for analysis", document.name());
            let payload = EncodedPayload::encode(&document);
            let cancel = CancellationToken::new();
            s.epoch += 1;
            s.state = SessionState::Loading;
            s.snapshot = AnalysisSnapshot::default();
            s.error = None;
            s.document = Some(document);
            s.cancel = Some(cancel.clone());
            (payload, cancel, s.epoch)
        };

        let observer = Arc::new(SessionObserver {
            inner: Arc::clone(&self.inner),
            epoch,
        });

        match client.analyze(&payload, observer, cancel).await {
            Ok(final_snapshot) => {
                let mut s = self.lock();
                if s.epoch == epoch && s.state == SessionState::Loading {
                    info!("analysis completed: {} chars", final_snapshot.text.chars().count());
                    s.state = SessionState::Completed;
                    s.snapshot = final_snapshot.clone();
                    s.cancel = None;
                }
                Ok(final_snapshot)
            }
            Err(cause) => {
                let err = SessionError::AnalysisFailed {
                    cause: Arc::new(cause),
                };
                let mut s = self.lock();
                if s.epoch == epoch && s.state == SessionState::Loading {
                    warn!("analysis failed: {:?}", err.cause());
                    s.state = SessionState::Errored;
                    s.error = Some(err.clone());
                    s.cancel = None;
                } else {
                    // The session was reset mid-flight; its state already
                    // moved on and this outcome is only reported back.
                    debug!("discarding outcome of superseded analysis");
                }
                Err(err)
            }
        }
    }

    /// Return to `Idle`, clearing document, snapshot, and error.
    ///
    /// Cancels the in-flight request when called during `Loading`.
    /// Idempotent from any state.
    pub fn reset(&self) {
        let mut s = self.lock();
        if let Some(cancel) = s.cancel.take() {
            debug!("reset while loading: cancelling in-flight analysis");
            cancel.cancel();
        }
        s.epoch += 1;
        s.state = SessionState::Idle;
        s.document = None;
        s.snapshot = AnalysisSnapshot::default();
        s.error = None;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Latest snapshot (empty while `Idle` or before the first increment).
    pub fn snapshot(&self) -> AnalysisSnapshot {
        self.lock().snapshot.clone()
    }

    /// Terminal error, if the session is `Errored`.
    pub fn error(&self) -> Option<SessionError> {
        self.lock().error.clone()
    }

    /// Name of the submitted document, retained until reset.
    pub fn file_name(&self) -> Option<String> {
        self.lock().document.as_ref().map(|d| d.name().to_string())
    }

    /// One consistent view for rendering.
    pub fn view(&self) -> SessionView {
        let s = self.lock();
        SessionView {
            state: s.state,
            file_name: s.document.as_ref().map(|d| d.name().to_string()),
            char_count: s.snapshot.text.chars().count(),
            text: s.snapshot.text.clone(),
            error_message: s.error.as_ref().map(|e| e.to_string()),
        }
    }

    /// The completed transcription, ready for download.
    ///
    /// `None` unless the session is `Completed`. A partial snapshot left
    /// behind by a failed analysis stays readable via [`Self::snapshot`]
    /// but is never exported as a result.
    pub fn export(&self) -> Option<MarkdownExport> {
        let s = self.lock();
        if s.state != SessionState::Completed {
            return None;
        }
        let document = s.document.as_ref()?;
        Some(MarkdownExport {
            file_name: document.markdown_file_name(),
            content: s.snapshot.text.clone(),
        })
    }
}

/// Folds progress snapshots into the session while its submission is live.
struct SessionObserver {
    inner: Arc<Mutex<Inner>>,
    epoch: u64,
}

impl ProgressObserver for SessionObserver {
    fn on_progress(&self, snapshot: &AnalysisSnapshot) {
        let mut s = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if s.epoch != self.epoch || s.state != SessionState::Loading {
            // Stale callback from a superseded submission.
            return;
        }
        if !snapshot.extends(&s.snapshot) {
            // Cumulative contract violated upstream; the latest callback is
            // still authoritative, so apply it anyway.
            warn!(
                "snapshot is not a monotonic extension ({} chars after {})",
                snapshot.text.chars().count(),
                s.snapshot.text.chars().count()
            );
        }
        s.snapshot = snapshot.clone();
    }
}
