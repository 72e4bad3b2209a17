//! Stream-based analysis API: snapshots as a `futures::Stream`.
//!
//! The observer callback in [`crate::client::AnalysisClient`] is the
//! least-invasive integration point, but some consumers would rather pull
//! from a `Stream` (progress bars, `while let` loops, combinators). This
//! adapter bridges the two with an unbounded channel and a spawned task.
//!
//! Items arrive in delivery order; each is the full accumulated text. The
//! final snapshot is the last `Ok` item before the stream closes, and a
//! failure ends the stream with exactly one `Err`.

use crate::client::{AnalysisClient, ProgressObserver};
use crate::document::EncodedPayload;
use crate::error::AnalyzeError;
use crate::snapshot::AnalysisSnapshot;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

/// A boxed stream of cumulative snapshots.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<AnalysisSnapshot, AnalyzeError>> + Send>>;

/// Observer that forwards every snapshot into a channel.
struct ChannelObserver {
    tx: mpsc::UnboundedSender<Result<AnalysisSnapshot, AnalyzeError>>,
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, snapshot: &AnalysisSnapshot) {
        // A dropped receiver just means the consumer stopped listening.
        let _ = self.tx.send(Ok(snapshot.clone()));
    }
}

/// Run one analysis and expose its snapshot sequence as a stream.
///
/// The client call is driven by a background task; dropping the stream does
/// not abort it; cancel via `cancel` for that.
pub fn analyze_stream(
    client: Arc<dyn AnalysisClient>,
    payload: EncodedPayload,
    cancel: CancellationToken,
) -> SnapshotStream {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer = Arc::new(ChannelObserver { tx: tx.clone() });

    tokio::spawn(async move {
        match client.analyze(&payload, observer, cancel).await {
            Ok(final_snapshot) => {
                let _ = tx.send(Ok(final_snapshot));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    });

    Box::pin(UnboundedReceiverStream::new(rx))
}
