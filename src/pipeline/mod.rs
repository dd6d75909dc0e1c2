//! Pipeline stages for PDF-to-DOCX conversion.
//!
//! Each submodule implements exactly one step. Keeping stages separate makes
//! each independently testable and lets us swap the extraction or
//! generation backend without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ [scratch] ──▶ extract ──▶ layout ──▶ docx
//! (check)   (temp file)   (lopdf)     (cleanup)   (docx-rs)
//! ```
//!
//! 1. [`input`]  : validate bytes, sanitise names, load paths and URLs
//! 2. [`scratch`]: scoped temp file, only for extractors that need a path
//! 3. [`extract`]: read page text and metadata out of the PDF
//! 4. [`layout`] : cleanup rules, then paragraphs and page breaks
//! 5. [`docx`]   : write the WordprocessingML package
//!
//! With the `ocr` feature, `ocr` provides a Tesseract extractor the
//! converter falls back to when the text layer is nearly empty.

pub mod docx;
pub mod extract;
pub mod input;
pub mod layout;
#[cfg(feature = "ocr")]
pub mod ocr;
pub mod scratch;
