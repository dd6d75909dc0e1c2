//! Error types for the pdf2docx library.
//!
//! Every failure of a conversion is a [`ConvertError`]. The variants are
//! detailed enough to produce actionable messages ("PDF is encrypted",
//! "page 3 could not be decoded"), while [`ConvertError::kind`] folds them
//! into the coarse [`ErrorKind`] taxonomy that callers branch on:
//!
//! * `InvalidInput`: the bytes are not a parseable PDF.
//! * `UnsupportedInput`: a PDF we refuse (locked, too large, wrong name).
//! * `ExtractionFailure`: the PDF parsed but its content could not be read.
//! * `GenerationFailure`: the DOCX package could not be assembled.
//! * `ResourceFailure`: temporary storage, output file or download failed.
//!
//! None of these are fatal to the process: the HTTP layer maps each kind to
//! a status code and the CLI reports it and exits non-zero.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`ConvertError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedInput,
    ExtractionFailure,
    GenerationFailure,
    ResourceFailure,
    InvalidConfig,
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::UnsupportedInput => "unsupported_input",
            ErrorKind::ExtractionFailure => "extraction_failure",
            ErrorKind::GenerationFailure => "generation_failure",
            ErrorKind::ResourceFailure => "resource_failure",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All errors returned by the pdf2docx library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Invalid input ─────────────────────────────────────────────────────
    /// Zero bytes were supplied.
    #[error("Input is empty: expected the bytes of a PDF document")]
    EmptyInput,

    /// No `%PDF` header in the first KiB of the input.
    #[error("Input is not a PDF document (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header present but the object structure cannot be parsed.
    #[error("PDF is corrupt and cannot be parsed: {detail}")]
    CorruptPdf { detail: String },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    // ── Unsupported input ─────────────────────────────────────────────────
    /// Input exceeds the configured size limit.
    #[error("Input is {size} bytes, larger than the {limit} byte limit")]
    InputTooLarge { size: usize, limit: usize },

    /// Upload filename does not carry a `.pdf` extension.
    #[error("Only PDF files are supported (got '{filename}')")]
    NotPdfFilename { filename: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was provided but it does not open the document.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    // ── Extraction ────────────────────────────────────────────────────────
    /// The content of a page could not be decoded.
    #[error("Text extraction failed on page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// The document has no extractable text and no placeholder is configured.
    #[error("No extractable text found in {pages} page(s); the PDF may be scanned images")]
    NoTextFound { pages: usize },

    // ── Generation ────────────────────────────────────────────────────────
    /// The DOCX package could not be written.
    #[error("DOCX generation failed: {0}")]
    GenerationFailed(String),

    // ── Resources ─────────────────────────────────────────────────────────
    /// A scratch file could not be created or written.
    #[error("Could not allocate temporary storage in '{dir}': {source}")]
    ScratchAllocation {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A scratch file could not be removed.
    #[error("Could not release temporary file '{path}': {source}")]
    ScratchRelease {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output DOCX file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// Classify this error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::EmptyInput
            | ConvertError::NotAPdf { .. }
            | ConvertError::CorruptPdf { .. }
            | ConvertError::PageOutOfRange { .. }
            | ConvertError::FileNotFound { .. }
            | ConvertError::PermissionDenied { .. } => ErrorKind::InvalidInput,

            ConvertError::InputTooLarge { .. }
            | ConvertError::NotPdfFilename { .. }
            | ConvertError::PasswordRequired
            | ConvertError::WrongPassword => ErrorKind::UnsupportedInput,

            ConvertError::ExtractionFailed { .. } | ConvertError::NoTextFound { .. } => {
                ErrorKind::ExtractionFailure
            }

            ConvertError::GenerationFailed(_) => ErrorKind::GenerationFailure,

            ConvertError::ScratchAllocation { .. }
            | ConvertError::ScratchRelease { .. }
            | ConvertError::OutputWriteFailed { .. }
            | ConvertError::DownloadFailed { .. }
            | ConvertError::DownloadTimeout { .. } => ErrorKind::ResourceFailure,

            ConvertError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            ConvertError::Internal(_) => ErrorKind::Internal,
        }
    }
}
