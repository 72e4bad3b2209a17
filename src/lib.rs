//! # pdfscribe
//!
//! Stream a PDF document through a vision-capable generative model and watch
//! the Markdown transcription grow live.
//!
//! ## Why streaming?
//!
//! A multi-page PDF takes the model tens of seconds to transcribe. Waiting for
//! the final payload means a blank screen the whole time. Instead the service
//! returns its answer as a sequence of text increments; this crate folds them
//! into **cumulative snapshots**: each callback carries the full accumulated
//! text so far, never a delta, so a frontend can always render the latest
//! snapshot and discard everything before it.
//!
//! ## Architecture
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Document   name + media type, validated at the session boundary
//!  ├─ 2. Encode     bytes → base64 EncodedPayload
//!  ├─ 3. Client     one streaming Gemini call, SSE → AnalysisSnapshot×N
//!  └─ 4. Session    Idle → Loading → Completed | Errored, observable state
//! ```
//!
//! The [`AnalysisSession`] is the piece a UI embeds: it owns one submitted
//! document at a time, applies progress snapshots in delivery order, and
//! exposes a single consistent [`SessionView`] to any observer. Resetting a
//! loading session cancels the underlying request rather than leaking it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfscribe::{AnalysisConfig, AnalysisSession, Document, GeminiClient, PDF_MEDIA_TYPE};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from GEMINI_API_KEY (or API_KEY) when not set explicitly
//!     let client = GeminiClient::new(AnalysisConfig::default());
//!     let session = AnalysisSession::new();
//!
//!     let bytes = std::fs::read("report.pdf")?;
//!     let document = Document::new("report.pdf", PDF_MEDIA_TYPE, bytes);
//!
//!     let snapshot = session.submit(document, &client).await?;
//!     println!("{}", snapshot.text);
//!     if let Some(export) = session.export() {
//!         std::fs::write(&export.file_name, &export.content)?; // report.md
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Tests substitute any [`AnalysisClient`] implementation for [`GeminiClient`];
//! the session never constructs its own client, so no network is needed to
//! exercise the full state machine.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod prompts;
pub mod session;
pub mod snapshot;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{AnalysisClient, GeminiClient, NoopObserver, ProgressObserver};
pub use config::{AnalysisConfig, AnalysisConfigBuilder};
pub use document::{Document, EncodedPayload, PDF_MEDIA_TYPE};
pub use error::{AnalyzeError, SessionError, ANALYSIS_FAILED_MESSAGE};
pub use session::{AnalysisSession, MarkdownExport, SessionState, SessionView};
pub use snapshot::AnalysisSnapshot;
pub use stream::{analyze_stream, SnapshotStream};
