//! The streaming analysis client seam.
//!
//! [`AnalysisClient`] is the trait the session depends on; [`GeminiClient`]
//! is the production implementation. Keeping the seam a trait (rather than a
//! module-level singleton) means tests inject a scripted stub and credential
//! rotation is a matter of constructing a new client value.
//!
//! ## The snapshot contract
//!
//! For every increment the service delivers, the client appends it to an
//! internal accumulator and invokes [`ProgressObserver::on_progress`] with
//! the **full accumulated text so far, never the delta**. Consumers may
//! treat the latest callback as authoritative and discard all prior ones.
//! Callbacks are delivered strictly in arrival order.

mod gemini;

pub use gemini::GeminiClient;

use crate::document::EncodedPayload;
use crate::error::AnalyzeError;
use crate::snapshot::AnalysisSnapshot;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Receives cumulative snapshots as the analysis stream progresses.
///
/// Implementations must be `Send + Sync`: the callback fires from the async
/// task driving the stream, which may not be the thread that submitted the
/// document.
pub trait ProgressObserver: Send + Sync {
    /// Called once per received increment with the full accumulated text.
    fn on_progress(&self, snapshot: &AnalysisSnapshot);
}

/// A no-op observer for callers that only want the final result.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_progress(&self, _snapshot: &AnalysisSnapshot) {}
}

/// Performs exactly one streaming analysis request per invocation.
#[async_trait]
pub trait AnalysisClient: Send + Sync {
    /// Analyse an encoded document, delivering progress snapshots along the
    /// way and resolving with the final accumulated snapshot at end of
    /// stream.
    ///
    /// The payload must be non-empty; media-type validation is the caller's
    /// job (the session checks it before encoding). Cancelling `cancel`
    /// aborts the request promptly with [`AnalyzeError::Cancelled`];
    /// whatever was already delivered via the observer remains with the
    /// caller.
    async fn analyze(
        &self,
        payload: &EncodedPayload,
        observer: Arc<dyn ProgressObserver>,
        cancel: CancellationToken,
    ) -> Result<AnalysisSnapshot, AnalyzeError>;
}
