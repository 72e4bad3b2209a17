//! Document input types: the submitted PDF and its wire encoding.
//!
//! A [`Document`] is immutable once accepted and owned by the session for its
//! lifetime. The media type is an exact tag match against
//! [`PDF_MEDIA_TYPE`]. Content sniffing is out of scope; the
//! tag comes from the file-selection collaborator and is trusted as-is.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// The only accepted media type.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// One user-submitted document: raw bytes, display name, media-type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl Document {
    /// Create a document from its parts. No validation happens here; the
    /// session's submit boundary enforces the media-type check.
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Display name as submitted (e.g. `report.pdf`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Media-type tag as submitted.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Exact-match media-type check.
    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    /// Name of the exported Markdown file: the `.pdf` extension is replaced
    /// with `.md`; names without that extension get `.md` appended.
    pub fn markdown_file_name(&self) -> String {
        let stem = self
            .name
            .strip_suffix(".pdf")
            .or_else(|| self.name.strip_suffix(".PDF"))
            .unwrap_or(&self.name);
        format!("{stem}.md")
    }
}

/// The document's bytes in transport-safe standard base64, ready to embed in
/// a request body. Derived deterministically from a [`Document`]; never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    data: String,
}

impl EncodedPayload {
    /// Encode a document's bytes.
    pub fn encode(document: &Document) -> Self {
        let data = STANDARD.encode(document.bytes());
        debug!("encoded '{}' → {} bytes base64", document.name(), data.len());
        Self { data }
    }

    /// The base64 text.
    pub fn as_str(&self) -> &str {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str) -> Document {
        Document::new(name, PDF_MEDIA_TYPE, b"%PDF-1.4 test".to_vec())
    }

    #[test]
    fn media_type_is_exact_match() {
        assert!(pdf("a.pdf").is_pdf());
        assert!(!Document::new("a.pdf", "application/pdf; charset=binary", vec![1]).is_pdf());
        assert!(!Document::new("a.txt", "text/plain", vec![1]).is_pdf());
    }

    #[test]
    fn markdown_file_name_replaces_extension() {
        assert_eq!(pdf("report.pdf").markdown_file_name(), "report.md");
        assert_eq!(pdf("archive.tar.pdf").markdown_file_name(), "archive.tar.md");
        assert_eq!(pdf("SCAN.PDF").markdown_file_name(), "SCAN.md");
    }

    #[test]
    fn markdown_file_name_without_pdf_extension_appends_md() {
        assert_eq!(pdf("notes").markdown_file_name(), "notes.md");
        assert_eq!(pdf("notes.txt").markdown_file_name(), "notes.txt.md");
    }

    #[test]
    fn encoding_is_deterministic_standard_base64() {
        let doc = Document::new("a.pdf", PDF_MEDIA_TYPE, vec![0xDE, 0xAD, 0xBE, 0xEF]);
        let payload = EncodedPayload::encode(&doc);
        assert_eq!(payload.as_str(), "3q2+7w==");
        assert_eq!(payload, EncodedPayload::encode(&doc));
    }

    #[test]
    fn empty_document_encodes_to_empty_payload() {
        let doc = Document::new("a.pdf", PDF_MEDIA_TYPE, vec![]);
        assert!(doc.is_empty());
        assert!(EncodedPayload::encode(&doc).is_empty());
    }
}
