//! Text extraction: the PDF-reading capability behind [`TextExtractor`].
//!
//! The orchestrator only ever talks to the trait, so tests can substitute
//! doubles and the backend can be swapped by configuration. Two backends
//! ship with the crate:
//!
//! * [`LopdfExtractor`] (default): pure Rust, reads straight from memory.
//! * `PdfiumExtractor` (feature `pdfium`): binds libpdfium at runtime and
//!   opens the document from a path, so the orchestrator stages the upload
//!   to a scratch file first.

use crate::config::PageSelection;
use crate::error::ConvertError;
use crate::output::DocumentMetadata;
use lopdf::{Document, Encoding, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Where the extractor should read the PDF from.
#[derive(Debug, Clone, Copy)]
pub enum PdfSource<'a> {
    Bytes(&'a [u8]),
    File(&'a Path),
}

/// Text of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// 1-indexed page number in the source document.
    pub number: usize,
    pub text: String,
}

/// Everything extraction hands to the layout stage.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub metadata: DocumentMetadata,
    /// Selected pages in document order.
    pub pages: Vec<ExtractedPage>,
}

/// PDF text-extraction capability.
///
/// Implementations must classify their failures: unparseable input as
/// `CorruptPdf`, locked documents as `PasswordRequired`/`WrongPassword`, and
/// unreadable page content as `ExtractionFailed`.
pub trait TextExtractor: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether [`PdfSource::File`] is required. Default: false.
    fn requires_file(&self) -> bool {
        false
    }

    /// Extract the text of the selected pages.
    fn extract(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
        pages: &PageSelection,
    ) -> Result<ExtractedDocument, ConvertError>;

    /// Read document metadata only.
    fn inspect(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, ConvertError> {
        self.extract(source, password, &PageSelection::All)
            .map(|doc| doc.metadata)
    }
}

// ── lopdf ────────────────────────────────────────────────────────────────

/// Extractor backed by the `lopdf` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn open(source: PdfSource<'_>, password: Option<&str>) -> Result<Document, ConvertError> {
        let loaded = match source {
            PdfSource::Bytes(bytes) => Document::load_mem(bytes),
            PdfSource::File(path) => Document::load(path),
        };

        let mut doc = loaded.map_err(|e| {
            let detail = e.to_string();
            let lower = detail.to_lowercase();
            if lower.contains("encrypt") || lower.contains("password") {
                if password.is_some() {
                    ConvertError::WrongPassword
                } else {
                    ConvertError::PasswordRequired
                }
            } else {
                ConvertError::CorruptPdf { detail }
            }
        })?;

        if doc.is_encrypted() {
            // Documents with an empty user password open without prompting.
            let attempt = password.unwrap_or("");
            doc.decrypt(attempt).map_err(|_| {
                if password.is_some() {
                    ConvertError::WrongPassword
                } else {
                    ConvertError::PasswordRequired
                }
            })?;
        }

        Ok(doc)
    }
}

impl TextExtractor for LopdfExtractor {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn extract(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
        pages: &PageSelection,
    ) -> Result<ExtractedDocument, ConvertError> {
        let doc = Self::open(source, password)?;
        let metadata = read_metadata(&doc);
        info!("PDF loaded: {} pages", metadata.page_count);

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let indices = pages.to_indices(page_ids.len());
        if indices.is_empty() {
            return Err(ConvertError::PageOutOfRange {
                page: pages.first_requested(),
                total: page_ids.len(),
            });
        }

        let mut extracted = Vec::with_capacity(indices.len());
        for idx in indices {
            let text =
                page_text(&doc, page_ids[idx]).map_err(|e| ConvertError::ExtractionFailed {
                    page: idx + 1,
                    detail: e.to_string(),
                })?;
            debug!("Page {} → {} chars", idx + 1, text.len());
            extracted.push(ExtractedPage {
                number: idx + 1,
                text,
            });
        }

        Ok(ExtractedDocument {
            metadata,
            pages: extracted,
        })
    }

    fn inspect(
        &self,
        source: PdfSource<'_>,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, ConvertError> {
        Self::open(source, password).map(|doc| read_metadata(&doc))
    }
}

// ── Content stream walk ──────────────────────────────────────────────────

/// `TJ` adjustments below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -100.0;

/// Text of one page in reading order of the content stream.
///
/// Line moves (`Td`/`TD` with a vertical offset, `T*`, `'`, `"`, a `Tm` to a
/// new baseline) and the end of a text object become `\n`; horizontal-only
/// moves and wide `TJ` gaps become a space.
fn page_text(doc: &Document, page_id: ObjectId) -> lopdf::Result<String> {
    let encodings: BTreeMap<Vec<u8>, Encoding<'_>> = doc
        .get_page_fonts(page_id)?
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(doc) {
            Ok(enc) => Some((name, enc)),
            Err(e) => {
                warn!("Skipping font {:?}: {}", String::from_utf8_lossy(&name), e);
                None
            }
        })
        .collect();
    let content = doc.get_and_decode_page_content(page_id)?;

    let mut text = String::new();
    let mut encoding: Option<&Encoding<'_>> = None;
    let mut baseline: Option<f32> = None;

    for op in &content.operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "Tf" => {
                let name = operands
                    .first()
                    .ok_or_else(|| lopdf::Error::Syntax("Tf without a font operand".into()))?
                    .as_name()?;
                encoding = encodings.get(name);
                if encoding.is_none() {
                    debug!("Font {:?} not in page resources", String::from_utf8_lossy(name));
                }
            }
            "Td" | "TD" => {
                let ty = operands.get(1).and_then(|o| o.as_float().ok()).unwrap_or(0.0);
                if ty != 0.0 {
                    line_break(&mut text);
                } else {
                    word_gap(&mut text);
                }
            }
            "Tm" => {
                let y = operands.get(5).and_then(|o| o.as_float().ok());
                if baseline.is_some() && y != baseline {
                    line_break(&mut text);
                }
                baseline = y;
            }
            "T*" => line_break(&mut text),
            "Tj" | "TJ" => show_text(&mut text, encoding, operands)?,
            "'" => {
                line_break(&mut text);
                show_text(&mut text, encoding, operands)?;
            }
            "\"" => {
                line_break(&mut text);
                show_text(&mut text, encoding, operands.get(2..).unwrap_or_default())?;
            }
            "ET" => line_break(&mut text),
            _ => {}
        }
    }

    Ok(text)
}

fn show_text(
    out: &mut String,
    encoding: Option<&Encoding<'_>>,
    operands: &[Object],
) -> lopdf::Result<()> {
    let Some(encoding) = encoding else {
        return Ok(());
    };
    for operand in operands {
        match operand {
            Object::String(bytes, _) => out.push_str(&Document::decode_text(encoding, bytes)?),
            Object::Array(items) => show_text(out, Some(encoding), items)?,
            Object::Integer(_) | Object::Real(_) => {
                if operand.as_float().is_ok_and(|adj| adj < TJ_SPACE_THRESHOLD) {
                    word_gap(out);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn word_gap(out: &mut String) {
    if !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

// ── Metadata ─────────────────────────────────────────────────────────────

/// Pull the Info dictionary fields, page count and version out of a document.
fn read_metadata(doc: &Document) -> DocumentMetadata {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        });

    let field = |key: &[u8]| -> Option<String> {
        let value = match info?.get(key).ok()? {
            Object::Reference(id) => doc.get_object(*id).ok()?,
            direct => direct,
        };
        let text = decode_pdf_string(value)?.trim().to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    };

    DocumentMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        subject: field(b"Subject"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
        page_count: doc.get_pages().len(),
        pdf_version: doc.version.clone(),
        is_encrypted: doc.trailer.get(b"Encrypt").is_ok(),
    }
}

/// Decode a PDF text string.
///
/// BOM-less strings that are valid non-ASCII UTF-8 are taken as UTF-8.
/// Everything else goes through lopdf's text-string decoder (UTF-16BE or
/// UTF-8 with BOM, PDFDocEncoding otherwise).
fn decode_pdf_string(obj: &Object) -> Option<String> {
    let raw = obj.as_str().ok()?;
    let has_bom = raw.starts_with(b"\xFE\xFF") || raw.starts_with(b"\xEF\xBB\xBF");
    if !has_bom && !raw.is_ascii() {
        if let Ok(utf8) = std::str::from_utf8(raw) {
            return Some(utf8.to_string());
        }
    }
    lopdf::decode_text_string(obj)
        .ok()
        .map(|s| s.trim_start_matches('\u{FEFF}').to_string())
}

// ── pdfium ───────────────────────────────────────────────────────────────

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumExtractor;

#[cfg(feature = "pdfium")]
pub(crate) mod pdfium {
    use super::{ExtractedDocument, ExtractedPage, PdfSource, TextExtractor};
    use crate::config::PageSelection;
    use crate::error::ConvertError;
    use crate::output::DocumentMetadata;
    use pdfium_render::prelude::*;
    use std::path::{Path, PathBuf};
    use tracing::{debug, info};

    /// Bind libpdfium from `library_path`, or the system library when unset.
    pub(crate) fn bind(library_path: Option<&Path>) -> Result<Pdfium, ConvertError> {
        let bindings = match library_path {
            Some(dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| ConvertError::Internal(format!("Failed to bind to pdfium: {e:?}")))?;
        Ok(Pdfium::new(bindings))
    }

    pub(crate) fn load<'a>(
        pdfium: &'a Pdfium,
        source: PdfSource<'a>,
        password: Option<&'a str>,
    ) -> Result<PdfDocument<'a>, ConvertError> {
        match source {
            PdfSource::File(path) => pdfium.load_pdf_from_file(path, password),
            PdfSource::Bytes(bytes) => pdfium.load_pdf_from_byte_slice(bytes, password),
        }
        .map_err(|e| load_error(e, password))
    }

    fn load_error(e: PdfiumError, password: Option<&str>) -> ConvertError {
        let detail = format!("{e:?}");
        if detail.contains("Password") || detail.contains("password") {
            if password.is_some() {
                ConvertError::WrongPassword
            } else {
                ConvertError::PasswordRequired
            }
        } else {
            ConvertError::CorruptPdf { detail }
        }
    }

    /// Resolve the selection against the document, or fail when it is empty.
    pub(crate) fn selected_indices(
        document: &PdfDocument<'_>,
        pages: &PageSelection,
    ) -> Result<Vec<usize>, ConvertError> {
        let total = document.pages().len() as usize;
        info!("PDF loaded: {} pages", total);
        let indices = pages.to_indices(total);
        if indices.is_empty() {
            return Err(ConvertError::PageOutOfRange {
                page: pages.first_requested(),
                total,
            });
        }
        Ok(indices)
    }

    pub(crate) fn page_error(page: usize, e: PdfiumError) -> ConvertError {
        ConvertError::ExtractionFailed {
            page,
            detail: format!("{e:?}"),
        }
    }

    pub(crate) fn read_metadata(document: &PdfDocument<'_>, password: Option<&str>) -> DocumentMetadata {
        let meta = document.metadata();
        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            meta.get(tag).and_then(|t| {
                let v = t.value().trim().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        DocumentMetadata {
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            page_count: document.pages().len() as usize,
            pdf_version: format!("{:?}", document.version()),
            is_encrypted: password.is_some(),
        }
    }

    /// Extractor backed by libpdfium through `pdfium-render`.
    ///
    /// pdfium keeps thread-local state, so a fresh binding is created per
    /// call; callers run this on a blocking thread.
    #[derive(Debug, Clone, Default)]
    pub struct PdfiumExtractor {
        library_path: Option<PathBuf>,
    }

    impl PdfiumExtractor {
        pub fn new(library_path: Option<PathBuf>) -> Self {
            Self { library_path }
        }
    }

    impl TextExtractor for PdfiumExtractor {
        fn name(&self) -> &str {
            "pdfium"
        }

        fn requires_file(&self) -> bool {
            true
        }

        fn extract(
            &self,
            source: PdfSource<'_>,
            password: Option<&str>,
            pages: &PageSelection,
        ) -> Result<ExtractedDocument, ConvertError> {
            let pdfium = bind(self.library_path.as_deref())?;
            let document = load(&pdfium, source, password)?;
            let indices = selected_indices(&document, pages)?;

            let doc_pages = document.pages();
            let mut extracted = Vec::with_capacity(indices.len());
            for idx in indices {
                let page = doc_pages
                    .get(idx as u16)
                    .map_err(|e| page_error(idx + 1, e))?;
                let text = page.text().map_err(|e| page_error(idx + 1, e))?.all();
                debug!("Page {} → {} chars", idx + 1, text.len());
                extracted.push(ExtractedPage {
                    number: idx + 1,
                    text,
                });
            }

            Ok(ExtractedDocument {
                metadata: read_metadata(&document, password),
                pages: extracted,
            })
        }
    }
}
