//! Error types for the pdfscribe library.
//!
//! Two distinct error types reflect two distinct audiences:
//!
//! * [`AnalyzeError`] is **structured**: what actually went wrong talking to
//!   the analysis service (missing credential, HTTP failure, malformed
//!   response, abnormal stream termination). Returned by
//!   [`crate::client::AnalysisClient::analyze`] and kept intact so the
//!   taxonomy can grow (auth vs. quota vs. malformed-file) without breaking
//!   callers.
//!
//! * [`SessionError`] is **presentable**: what the session stores as its
//!   terminal error and what a frontend shows the user. Analysis failures
//!   collapse to one generic message here, but the structured cause stays
//!   reachable through `source()` for logging and diagnostics.

use std::sync::Arc;
use thiserror::Error;

/// The single user-facing message for any failed analysis.
///
/// Deliberately generic: connectivity, quota, and malformed-response
/// failures all read the same to the user, who can only retry anyway.
pub const ANALYSIS_FAILED_MESSAGE: &str = "PDF analysis failed. Reset the session and try again.";

/// Everything that can go wrong inside one streaming analysis call.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No API key in the config and none in the environment.
    #[error("no API key configured: set GEMINI_API_KEY or AnalysisConfig::api_key")]
    MissingApiKey,

    /// The encoded document is empty; the service would reject it anyway.
    #[error("document payload is empty")]
    EmptyPayload,

    /// The request never completed at the transport level.
    #[error("request to the analysis service failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("analysis service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// A stream event could not be decoded.
    #[error("analysis service sent a malformed response: {detail}")]
    MalformedResponse { detail: String },

    /// The service ended generation abnormally (safety block, token limit,
    /// or an error payload mid-stream).
    #[error("analysis service ended the stream early: {reason}")]
    Interrupted { reason: String },

    /// The cancellation token fired before the stream completed.
    #[error("analysis was cancelled")]
    Cancelled,
}

impl AnalyzeError {
    /// True when the call ended because the caller cancelled it.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalyzeError::Cancelled)
    }
}

/// A terminal session error, stored on the session and shown to the user.
///
/// `Clone` because observers read it out of the session while the session
/// keeps its own copy until reset.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The submitted document is not tagged as a PDF. Detected synchronously;
    /// the analysis client is never invoked.
    #[error("only PDF documents are supported (got '{media_type}')")]
    UnsupportedMediaType { media_type: String },

    /// A document was submitted while another analysis is in flight.
    /// Rejected outright, never queued, and the active session is untouched.
    #[error("a document is already being analysed; reset the session first")]
    SessionBusy,

    /// The streaming analysis call failed. Displays as one generic message;
    /// the structured cause is preserved as the error source.
    #[error("{}", ANALYSIS_FAILED_MESSAGE)]
    AnalysisFailed {
        #[source]
        cause: Arc<AnalyzeError>,
    },
}

impl SessionError {
    /// The structured failure behind an [`SessionError::AnalysisFailed`],
    /// if any.
    pub fn cause(&self) -> Option<&AnalyzeError> {
        match self {
            SessionError::AnalysisFailed { cause } => Some(cause),
            _ => None,
        }
    }
}
