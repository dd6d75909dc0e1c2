//! # pdf2docx
//!
//! Upload a PDF, get a Word document back.
//!
//! The crate is a thin orchestration layer: PDF parsing is delegated to
//! [`lopdf`](https://docs.rs/lopdf) (or optionally pdfium), the DOCX package
//! is built with `docx-rs`, and
//! the HTTP surface is a small `axum` router. What the crate itself owns is
//! the workflow between them and the guarantee that no temporary file
//! outlives the request that created it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Validate  non-empty, within size limit, %PDF header
//!  ├─ 2. Stage     scoped temp file (only if the extractor needs a path)
//!  ├─ 3. Extract   page text + Info-dictionary metadata (OCR if too thin)
//!  ├─ 4. Layout    cleanup rules, paragraphs, page breaks
//!  └─ 5. Generate  .docx package bytes
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2docx::{ConversionConfig, Converter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConversionConfig::default())?;
//!     let bytes = std::fs::read("report.pdf")?;
//!     let output = converter.convert(&bytes, "report.pdf")?;
//!     std::fs::write(&output.filename, &output.docx)?;
//!     eprintln!("{} pages, {} paragraphs", output.stats.converted_pages, output.stats.paragraphs);
//!     Ok(())
//! }
//! ```
//!
//! ## Serving HTTP
//!
//! ```rust,no_run
//! use pdf2docx::{server, ConversionConfig, Converter, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::new(ConversionConfig::default())?;
//!     server::serve(ServerConfig::default(), converter).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `pdf2docx` binary (clap + anyhow + tracing-subscriber) |
//! | `pdfium` | off     | Adds the pdfium extraction engine (needs libpdfium at runtime) |
//! | `ocr`    | off     | Tesseract fallback for scanned pages (implies `pdfium`, needs libtesseract) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ExtractionEngine, PageSelection, PageSeparator,
    ParagraphMode, ServerConfig,
};
pub use convert::{convert_bytes, convert_file, convert_to_file, inspect, Converter};
pub use error::{ConvertError, ErrorKind};
pub use output::{ConversionOutput, ConversionStats, DocumentMetadata, DOCX_MIME};
pub use pipeline::docx::{Block, DocumentGenerator, DocxContent, OoxmlGenerator};
pub use pipeline::extract::{
    ExtractedDocument, ExtractedPage, LopdfExtractor, PdfSource, TextExtractor,
};
#[cfg(feature = "pdfium")]
pub use pipeline::extract::PdfiumExtractor;
#[cfg(feature = "ocr")]
pub use pipeline::ocr::OcrExtractor;
