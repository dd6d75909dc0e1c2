//! Configuration types for PDF-to-DOCX conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The temporary-storage location lives
//! here too: it is injected into each [`crate::Converter`] rather than read
//! from a process-wide global, so tests and concurrent servers can point
//! conversions at isolated directories.
//!
//! [`ServerConfig`] holds the knobs of the HTTP surface.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default upper bound on input size: 50 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 50 * 1024 * 1024;

/// Body text written when a PDF has no extractable text.
pub const DEFAULT_EMPTY_TEXT_PLACEHOLDER: &str = "No text detected";

/// Below this many characters of extracted text the OCR fallback kicks in.
pub const DEFAULT_OCR_MIN_CHARS: usize = 20;

/// Configuration for a PDF-to-DOCX conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2docx::{ConversionConfig, ParagraphMode};
///
/// let config = ConversionConfig::builder()
///     .temp_dir("/tmp/pdf2docx")
///     .paragraph_mode(ParagraphMode::Blocks)
///     .font_size_pt(12)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Directory for scratch files. `None` uses the OS temp directory.
    ///
    /// Created on demand. Every scratch file gets a unique random name, so
    /// many conversions can share one directory.
    pub temp_dir: Option<PathBuf>,

    /// Inputs larger than this are rejected before any work. Default: 50 MiB.
    pub max_input_bytes: usize,

    /// PDF user password for encrypted documents.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// What to insert between consecutive pages. Default: a Word page break.
    pub page_separator: PageSeparator,

    /// How extracted text is split into paragraphs. Default: one per line.
    pub paragraph_mode: ParagraphMode,

    /// Body text used when nothing is extractable. Default: "No text detected".
    ///
    /// `None` makes a text-less PDF an extraction failure instead.
    pub empty_text_placeholder: Option<String>,

    /// Font of the Normal style. Default: "Calibri".
    pub font_name: String,

    /// Font size of the Normal style in points. Range: 6–72. Default: 11.
    pub font_size_pt: u32,

    /// Write title/author into `docProps/core.xml`. Default: true.
    pub include_metadata: bool,

    /// Extraction backend. Default: [`ExtractionEngine::Lopdf`].
    pub engine: ExtractionEngine,

    /// Explicit libpdfium location for [`ExtractionEngine::Pdfium`].
    pub pdfium_library_path: Option<PathBuf>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Re-read scanned pages with Tesseract when the text layer is too thin.
    /// Requires the `ocr` cargo feature. Default: false.
    pub ocr_fallback: bool,

    /// Tesseract language code(s), e.g. `eng` or `eng+deu`. Default: "eng".
    pub ocr_language: String,

    /// The fallback runs when the extracted text, trimmed, has fewer
    /// characters than this. Default: 20.
    pub ocr_min_chars: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            password: None,
            pages: PageSelection::default(),
            page_separator: PageSeparator::default(),
            paragraph_mode: ParagraphMode::default(),
            empty_text_placeholder: Some(DEFAULT_EMPTY_TEXT_PLACEHOLDER.to_string()),
            font_name: "Calibri".to_string(),
            font_size_pt: 11,
            include_metadata: true,
            engine: ExtractionEngine::default(),
            pdfium_library_path: None,
            download_timeout_secs: 120,
            ocr_fallback: false,
            ocr_language: "eng".to_string(),
            ocr_min_chars: DEFAULT_OCR_MIN_CHARS,
        }
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn max_input_bytes(mut self, n: usize) -> Self {
        self.config.max_input_bytes = n.max(1024);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn page_separator(mut self, sep: PageSeparator) -> Self {
        self.config.page_separator = sep;
        self
    }

    pub fn paragraph_mode(mut self, mode: ParagraphMode) -> Self {
        self.config.paragraph_mode = mode;
        self
    }

    pub fn empty_text_placeholder(mut self, text: Option<String>) -> Self {
        self.config.empty_text_placeholder = text;
        self
    }

    pub fn font_name(mut self, name: impl Into<String>) -> Self {
        self.config.font_name = name.into();
        self
    }

    pub fn font_size_pt(mut self, pt: u32) -> Self {
        self.config.font_size_pt = pt;
        self
    }

    pub fn include_metadata(mut self, v: bool) -> Self {
        self.config.include_metadata = v;
        self
    }

    pub fn engine(mut self, engine: ExtractionEngine) -> Self {
        self.config.engine = engine;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn ocr_fallback(mut self, v: bool) -> Self {
        self.config.ocr_fallback = v;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn ocr_min_chars(mut self, n: usize) -> Self {
        self.config.ocr_min_chars = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if !(6..=72).contains(&c.font_size_pt) {
            return Err(ConvertError::InvalidConfig(format!(
                "Font size must be 6–72 pt, got {}",
                c.font_size_pt
            )));
        }
        if c.font_name.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "Font name must not be empty".into(),
            ));
        }
        if let PageSeparator::Custom(s) = &c.page_separator {
            if s.trim().is_empty() {
                return Err(ConvertError::InvalidConfig(
                    "Custom page separator must not be empty".into(),
                ));
            }
        }
        if c.engine == ExtractionEngine::Pdfium && !cfg!(feature = "pdfium") {
            return Err(ConvertError::InvalidConfig(
                "The pdfium engine requires building with `--features pdfium`".into(),
            ));
        }
        if c.ocr_fallback && !cfg!(feature = "ocr") {
            return Err(ConvertError::InvalidConfig(
                "The OCR fallback requires building with `--features ocr`".into(),
            ));
        }
        if c.ocr_fallback && c.ocr_language.trim().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which library reads text out of the PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionEngine {
    /// Pure-Rust `lopdf` parser, reads from memory. (default)
    #[default]
    Lopdf,
    /// Native pdfium via `pdfium-render`; stages the upload to a scratch file.
    Pdfium,
}

/// Specifies which pages of the PDF to convert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Convert all pages (default).
    #[default]
    All,
    /// Convert a single page (1-indexed).
    Single(usize),
    /// Convert a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Convert specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// The first requested page number, used when reporting an empty selection.
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 1,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().copied().min().unwrap_or(0),
        }
    }
}

/// What goes between two pages in the generated document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSeparator {
    /// Pages run on without any marker.
    None,
    /// A hard Word page break (default).
    #[default]
    PageBreak,
    /// A paragraph containing this text.
    Custom(String),
}

/// How cleaned page text is split into DOCX paragraphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParagraphMode {
    /// One paragraph per text line; blank runs become one empty paragraph. (default)
    #[default]
    Lines,
    /// Blank-line separated blocks; wrapped lines inside a block are joined.
    Blocks,
}

// ── Server ───────────────────────────────────────────────────────────────

/// Settings of the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address. Default: 127.0.0.1:5001.
    pub bind: SocketAddr,

    /// Largest accepted upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,

    /// Reject uploads whose filename does not end in `.pdf`. Default: true.
    pub require_pdf_extension: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 5001)),
            max_upload_bytes: DEFAULT_MAX_INPUT_BYTES,
            require_pdf_extension: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.font_name, "Calibri");
        assert_eq!(c.font_size_pt, 11);
        assert_eq!(c.page_separator, PageSeparator::PageBreak);
        assert_eq!(c.paragraph_mode, ParagraphMode::Lines);
        assert_eq!(
            c.empty_text_placeholder.as_deref(),
            Some(DEFAULT_EMPTY_TEXT_PLACEHOLDER)
        );
        assert!(c.temp_dir.is_none());
    }

    #[test]
    fn builder_rejects_out_of_range_font_size() {
        let err = ConversionConfig::builder().font_size_pt(200).build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn builder_rejects_blank_custom_separator() {
        let err = ConversionConfig::builder()
            .page_separator(PageSeparator::Custom("  ".into()))
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn builder_clamps_tiny_input_limit() {
        let c = ConversionConfig::builder()
            .max_input_bytes(10)
            .build()
            .unwrap();
        assert_eq!(c.max_input_bytes, 1024);
    }

    #[cfg(not(feature = "pdfium"))]
    #[test]
    fn pdfium_engine_requires_feature() {
        let err = ConversionConfig::builder()
            .engine(ExtractionEngine::Pdfium)
            .build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));
    }

    #[cfg(not(feature = "ocr"))]
    #[test]
    fn ocr_fallback_requires_feature() {
        let err = ConversionConfig::builder().ocr_fallback(true).build();
        assert!(matches!(err, Err(ConvertError::InvalidConfig(_))));
    }

    #[test]
    fn ocr_defaults_follow_twenty_char_threshold() {
        let c = ConversionConfig::default();
        assert!(!c.ocr_fallback);
        assert_eq!(c.ocr_min_chars, 20);
        assert_eq!(c.ocr_language, "eng");
    }

    #[test]
    fn password_is_not_serialised() {
        let c = ConversionConfig::builder().password("hunter2").build().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(2).to_indices(3), vec![1]);
        assert_eq!(PageSelection::Single(9).to_indices(3), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 10).to_indices(3), vec![1, 2]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }

    #[test]
    fn first_requested_page() {
        assert_eq!(PageSelection::Set(vec![7, 4]).first_requested(), 4);
        assert_eq!(PageSelection::Range(5, 9).first_requested(), 5);
    }

    #[test]
    fn server_defaults() {
        let s = ServerConfig::default();
        assert_eq!(s.bind.port(), 5001);
        assert!(s.require_pdf_extension);
    }
}
