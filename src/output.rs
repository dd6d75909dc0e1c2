//! Result types of a successful conversion.

use serde::{Deserialize, Serialize};

/// MIME type of a WordprocessingML package.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A finished conversion: the DOCX bytes plus what went into them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The generated `.docx` package.
    #[serde(skip)]
    pub docx: Vec<u8>,
    /// Suggested download name: sanitised source stem + `.docx`.
    pub filename: String,
    /// Plain text written into the document body, paragraphs joined by `\n`.
    pub text: String,
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// Information read from the PDF's trailer and Info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    pub is_encrypted: bool,
}

/// Counters and timings for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages selected and extracted.
    pub converted_pages: usize,
    /// Paragraphs written to the body (page-break paragraphs excluded).
    pub paragraphs: usize,
    /// Characters of body text.
    pub characters: usize,
    pub input_bytes: usize,
    pub output_bytes: usize,
    /// Whether the input went through a scratch file.
    pub staged_to_disk: bool,
    /// Whether the body text came from the OCR fallback.
    pub ocr_used: bool,
    pub extract_duration_ms: u64,
    pub generate_duration_ms: u64,
    pub total_duration_ms: u64,
}
