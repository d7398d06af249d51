//! Error types for the edgequake-card2csv library.
//!
//! Failures fall into three groups, each handled differently:
//!
//! * [`Card2CsvError`] — **Fatal**: the batch cannot run at all (provider not
//!   configured, invalid configuration) or the export could not be written.
//!
//! * [`ImageConversionError`] — **Per-file, dropped**: an upload could not be
//!   decoded. The file contributes no record; the failure is reported as a
//!   [`FileError`] in [`crate::output::BatchOutput::skipped`].
//!
//! * [`ExtractionError`] — **Per-attempt, retried**: a provider call or a
//!   reply decode failed. The retry policy consumes these and degrades to the
//!   sentinel record once attempts run out, so they never reach the caller as
//!   an `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-card2csv library.
#[derive(Debug, Error)]
pub enum Card2CsvError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Export errors ─────────────────────────────────────────────────────
    /// Export was requested but no file reached the extraction stage.
    #[error("No records to export: all {total} files failed image conversion")]
    NoRecords { total: usize },

    /// The CSV writer rejected a row.
    #[error("CSV serialisation failed: {0}")]
    CsvWrite(#[from] csv::Error),

    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// An upload could not be decoded or re-encoded.
///
/// Whatever the underlying decoder reported is carried verbatim in `detail`;
/// callers never see a raw `image::ImageError` or libheif error.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[error("Image conversion failed for '{filename}': {detail}")]
pub struct ImageConversionError {
    pub filename: String,
    pub detail: String,
}

impl ImageConversionError {
    pub fn new(filename: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            filename: filename.into(),
            detail: detail.to_string(),
        }
    }
}

/// A single extraction attempt failed.
///
/// Network failures and malformed replies are deliberately not told apart by
/// the retry policy: each one costs exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// The provider call itself failed (network, auth, rate limit, ...).
    #[error("LLM call failed: {message}")]
    Provider { message: String },

    /// The provider answered with nothing but whitespace.
    #[error("LLM returned an empty reply")]
    EmptyReply,

    /// The reply was not valid JSON.
    #[error("Reply is not valid JSON: {detail}")]
    MalformedJson { detail: String },

    /// The reply was JSON, but not an object.
    #[error("Reply JSON is a {found}, expected an object")]
    NotAnObject { found: String },
}

/// A non-fatal error for one upload that was dropped from the result set.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("File #{index} ({filename}) skipped: {source}")]
pub struct FileError {
    /// 0-based position in the upload list.
    pub index: usize,
    pub filename: String,
    #[source]
    pub source: ImageConversionError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_conversion_display_keeps_detail() {
        let e = ImageConversionError::new("card.png", "Format error decoding Png: bad header");
        let msg = e.to_string();
        assert!(msg.contains("card.png"), "got: {msg}");
        assert!(msg.contains("bad header"), "got: {msg}");
    }

    #[test]
    fn no_records_display() {
        let e = Card2CsvError::NoRecords { total: 3 };
        assert!(e.to_string().contains("all 3 files"));
    }

    #[test]
    fn not_an_object_display() {
        let e = ExtractionError::NotAnObject {
            found: "array".into(),
        };
        assert_eq!(e.to_string(), "Reply JSON is a array, expected an object");
    }

    #[test]
    fn file_error_display_includes_source() {
        let e = FileError {
            index: 2,
            filename: "broken.jpg".into(),
            source: ImageConversionError::new("broken.jpg", "unexpected EOF"),
        };
        let msg = e.to_string();
        assert!(msg.contains("#2"), "got: {msg}");
        assert!(msg.contains("unexpected EOF"), "got: {msg}");
    }

    #[test]
    fn provider_not_configured_display() {
        let e = Card2CsvError::ProviderNotConfigured {
            provider: "openai".into(),
            hint: "OPENAI_API_KEY is not set".into(),
        };
        assert!(e.to_string().contains("openai"));
        assert!(e.to_string().contains("OPENAI_API_KEY"));
    }
}
