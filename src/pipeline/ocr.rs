//! OCR extractor for scanned documents (feature `ocr`).
//!
//! Each selected page is rendered with pdfium, encoded as PNG and read back
//! by Tesseract through `leptess`. The converter only calls this when the
//! text layer came back (nearly) empty.

use super::extract::pdfium::{bind, load, page_error, read_metadata, selected_indices};
use super::extract::{ExtractedDocument, ExtractedPage, PdfSource, TextExtractor};
use crate::config::PageSelection;
use crate::error::ConvertError;
use leptess::LepTess;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::debug;

/// Render resolution. PDF user space is 72 points per inch.
pub const OCR_DPI: f32 = 300.0;

/// Tesseract over pdfium-rendered page images.
#[derive(Debug, Clone)]
pub struct OcrExtractor {
    library_path: Option<PathBuf>,
    language: String,
}

impl OcrExtractor {
    pub fn new(library_path: Option<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            library_path,
            language: language.into(),
        }
    }

    fn render_png(page: &PdfPage<'_>, number: usize) -> Result<Vec<u8>, ConvertError> {
        let scale = OCR_DPI / 72.0;
        let config = PdfRenderConfig::new()
            .set_target_width((page.width().value * scale) as i32)
            .set_maximum_height((page.height().value * scale) as i32);
        let image = page
            .render_with_config(&config)
            .map_err(|e| page_error(number, e))?
            .as_image();

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, image::ImageFormat::Png)
            .map_err(|e| ConvertError::ExtractionFailed {
                page: number,
                detail: format!("Failed to encode page image: {e}"),
            })?;
        Ok(png.into_inner())
    }
}

impl TextExtractor for OcrExtractor {
    fn name(&self) -> &str {
        "tesseract"
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
        let mut tess = LepTess::new(None, &self.language).map_err(|e| {
            ConvertError::InvalidConfig(format!(
                "Failed to initialise Tesseract for '{}': {e}",
                self.language
            ))
        })?;

        let pdfium = bind(self.library_path.as_deref())?;
        let document = load(&pdfium, source, password)?;
        let indices = selected_indices(&document, pages)?;

        let doc_pages = document.pages();
        let mut extracted = Vec::with_capacity(indices.len());
        for idx in indices {
            let number = idx + 1;
            let page = doc_pages.get(idx as u16).map_err(|e| page_error(number, e))?;
            let png = Self::render_png(&page, number)?;

            tess.set_image_from_mem(&png)
                .map_err(|e| ConvertError::ExtractionFailed {
                    page: number,
                    detail: format!("Tesseract rejected page image: {e}"),
                })?;
            let text = tess
                .get_utf8_text()
                .map_err(|e| ConvertError::ExtractionFailed {
                    page: number,
                    detail: format!("Tesseract returned invalid text: {e}"),
                })?;
            debug!("OCR page {} → {} chars", number, text.len());
            extracted.push(ExtractedPage { number, text });
        }

        Ok(ExtractedDocument {
            metadata: read_metadata(&document, password),
            pages: extracted,
        })
    }
}
