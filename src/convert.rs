//! Conversion entry points: the [`Converter`] orchestrator and free-function
//! wrappers around it.
//!
//! ## Flow of one conversion
//!
//! ```text
//! bytes ─▶ validate ─▶ [stage] ─▶ extract ─▶ [release] ─▶ layout ─▶ generate
//! ```
//!
//! The scratch file only exists when the extractor needs a path. It is owned
//! by the call that staged it and released before layout starts, so every
//! exit path, including a panicking extractor, leaves the temp directory as
//! it was.
//!
//! When the primary extractor returns almost no text (a scanned document),
//! an optional fallback extractor, normally OCR, gets a second pass over the
//! same pages. Its text wins when it has any; a failing fallback is logged
//! and the primary text stands.
//!
//! `Converter::convert` is synchronous: extraction and generation are
//! CPU-bound. Async callers go through [`Converter::convert_async`], which
//! runs the same call on tokio's blocking pool.

use crate::config::{ConversionConfig, ExtractionEngine};
use crate::error::ConvertError;
use crate::output::{ConversionOutput, ConversionStats, DocumentMetadata};
use crate::pipeline::docx::{Block, DocumentGenerator, DocxContent, OoxmlGenerator};
use crate::pipeline::extract::{ExtractedDocument, LopdfExtractor, PdfSource, TextExtractor};
use crate::pipeline::scratch::ScratchSpace;
use crate::pipeline::{input, layout};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Stateless PDF-to-DOCX orchestrator.
///
/// Cheap to clone and safe to share across threads: the collaborators sit
/// behind `Arc`, and each call owns its own scratch file.
#[derive(Clone)]
pub struct Converter {
    config: Arc<ConversionConfig>,
    extractor: Arc<dyn TextExtractor>,
    fallback: Option<Arc<dyn TextExtractor>>,
    generator: Arc<dyn DocumentGenerator>,
    scratch: ScratchSpace,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("extractor", &self.extractor.name())
            .field("fallback", &self.fallback.as_ref().map(|f| f.name().to_string()))
            .field("generator", &self.generator.name())
            .field("scratch_dir", &self.scratch.dir())
            .finish()
    }
}

impl Converter {
    /// Build a converter with the extraction engine named in `config` and
    /// the built-in DOCX writer.
    pub fn new(config: ConversionConfig) -> Result<Self, ConvertError> {
        let extractor = default_extractor(&config)?;
        let fallback = fallback_extractor(&config)?;
        let converter =
            Self::with_collaborators(config, extractor, Arc::new(OoxmlGenerator::new()));
        Ok(match fallback {
            Some(f) => converter.with_fallback(f),
            None => converter,
        })
    }

    /// Build a converter around caller-supplied collaborators.
    pub fn with_collaborators(
        config: ConversionConfig,
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn DocumentGenerator>,
    ) -> Self {
        let scratch = ScratchSpace::new(config.temp_dir.clone());
        Self {
            config: Arc::new(config),
            extractor,
            fallback: None,
            generator,
            scratch,
        }
    }

    /// Second extractor tried when the first yields fewer than
    /// `ocr_min_chars` characters.
    pub fn with_fallback(mut self, fallback: Arc<dyn TextExtractor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert the bytes of one PDF into a DOCX.
    ///
    /// `filename` is the name the bytes arrived under; it only feeds the
    /// suggested output name and the fallback document title.
    ///
    /// # Errors
    /// Every failure is returned, never partially recovered: the caller gets
    /// either a complete document or a [`ConvertError`].
    pub fn convert(&self, bytes: &[u8], filename: &str) -> Result<ConversionOutput, ConvertError> {
        info!("Starting conversion: {} ({} bytes)", filename, bytes.len());
        let result = self.run(bytes, filename);
        match &result {
            Ok(output) => info!(
                "Conversion complete: {} → {} ({} pages, {}ms)",
                filename,
                output.filename,
                output.stats.converted_pages,
                output.stats.total_duration_ms
            ),
            Err(e) => warn!("Conversion of {} failed [{}]: {}", filename, e.kind(), e),
        }
        result
    }

    fn run(&self, bytes: &[u8], filename: &str) -> Result<ConversionOutput, ConvertError> {
        let total_start = Instant::now();

        // ── Step 1: Validate ─────────────────────────────────────────────
        input::validate_pdf_bytes(bytes, self.config.max_input_bytes)?;

        // ── Step 2: Extract ──────────────────────────────────────────────
        let extract_start = Instant::now();
        let password = self.config.password.as_deref();
        let (mut extracted, mut staged) = self.with_source(&*self.extractor, bytes, |source| {
            self.extractor.extract(source, password, &self.config.pages)
        })?;
        let mut ocr_used = false;
        if let Some(fallback) = &self.fallback {
            if let Some((pages, fallback_staged)) = self.try_fallback(&**fallback, bytes, &extracted)
            {
                extracted.pages = pages;
                staged |= fallback_staged;
                ocr_used = true;
            }
        }
        let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
        debug!(
            "Extracted {} page(s) with {} in {}ms",
            extracted.pages.len(),
            self.extractor.name(),
            extract_duration_ms
        );

        // ── Step 3: Layout ───────────────────────────────────────────────
        let blocks = layout::build_blocks(&extracted.pages, &self.config)?;
        let text = layout::blocks_to_text(&blocks);
        let paragraphs = blocks
            .iter()
            .filter(|b| matches!(b, Block::Paragraph(_)))
            .count();

        // ── Step 4: Generate ─────────────────────────────────────────────
        let generate_start = Instant::now();
        let out_name = input::docx_filename(filename);
        let content = DocxContent {
            title: self.document_title(&extracted.metadata, &out_name),
            author: self
                .config
                .include_metadata
                .then(|| extracted.metadata.author.clone())
                .flatten(),
            font_name: self.config.font_name.clone(),
            font_size_half_points: self.config.font_size_pt * 2,
            blocks,
        };
        let docx = self.generator.generate(&content)?;
        let generate_duration_ms = generate_start.elapsed().as_millis() as u64;
        debug!(
            "Generated {} bytes with {} in {}ms",
            docx.len(),
            self.generator.name(),
            generate_duration_ms
        );

        // ── Step 5: Assemble ─────────────────────────────────────────────
        let stats = ConversionStats {
            total_pages: extracted.metadata.page_count,
            converted_pages: extracted.pages.len(),
            paragraphs,
            characters: text.chars().filter(|&c| c != '\n').count(),
            input_bytes: bytes.len(),
            output_bytes: docx.len(),
            staged_to_disk: staged,
            ocr_used,
            extract_duration_ms,
            generate_duration_ms,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        Ok(ConversionOutput {
            docx,
            filename: out_name,
            text,
            metadata: extracted.metadata,
            stats,
        })
    }

    /// Run the fallback when the primary text is too thin. Returns its pages
    /// only when they carry text; errors count as no text.
    fn try_fallback(
        &self,
        fallback: &dyn TextExtractor,
        bytes: &[u8],
        primary: &ExtractedDocument,
    ) -> Option<(Vec<crate::pipeline::extract::ExtractedPage>, bool)> {
        let primary_chars = document_text(primary).trim().chars().count();
        if primary_chars >= self.config.ocr_min_chars {
            return None;
        }
        info!(
            "Only {} chars from {}; trying {}",
            primary_chars,
            self.extractor.name(),
            fallback.name()
        );

        let password = self.config.password.as_deref();
        match self.with_source(fallback, bytes, |source| {
            fallback.extract(source, password, &self.config.pages)
        }) {
            Ok((doc, staged)) if !document_text(&doc).trim().is_empty() => {
                info!("Using {} text", fallback.name());
                Some((doc.pages, staged))
            }
            Ok(_) => {
                debug!("{} found no text either", fallback.name());
                None
            }
            Err(e) => {
                warn!("{} failed [{}]: {}", fallback.name(), e.kind(), e);
                None
            }
        }
    }

    /// Title for `docProps/core.xml`: the PDF's own title, else the stem of
    /// the output name.
    fn document_title(&self, metadata: &DocumentMetadata, out_name: &str) -> Option<String> {
        if !self.config.include_metadata {
            return None;
        }
        metadata
            .title
            .clone()
            .or_else(|| out_name.strip_suffix(".docx").map(str::to_string))
    }

    /// Run `f` against the bytes, staged through a scratch file when
    /// `extractor` needs a path. Returns the result and whether staging
    /// happened.
    fn with_source<T>(
        &self,
        extractor: &dyn TextExtractor,
        bytes: &[u8],
        f: impl FnOnce(PdfSource<'_>) -> Result<T, ConvertError>,
    ) -> Result<(T, bool), ConvertError> {
        if !extractor.requires_file() {
            return f(PdfSource::Bytes(bytes)).map(|v| (v, false));
        }

        let scratch = self.scratch.stage(bytes)?;
        let result = f(PdfSource::File(scratch.path()));
        let released = scratch.release();

        match (result, released) {
            (Ok(value), Ok(())) => Ok((value, true)),
            (Ok(_), Err(release_err)) => Err(release_err),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!("Scratch release failed after extraction error: {}", release_err);
                Err(e)
            }
        }
    }

    /// Run [`convert`](Self::convert) on the blocking thread pool.
    pub async fn convert_async(
        &self,
        bytes: Vec<u8>,
        filename: String,
    ) -> Result<ConversionOutput, ConvertError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.convert(&bytes, &filename))
            .await
            .map_err(|e| ConvertError::Internal(format!("Conversion task failed: {e}")))?
    }

    /// Load a local path or HTTP(S) URL, then convert it.
    pub async fn convert_file(&self, input_str: &str) -> Result<ConversionOutput, ConvertError> {
        let loaded = input::load_source(input_str, self.config.download_timeout_secs).await?;
        self.convert_async(loaded.bytes, loaded.filename).await
    }

    /// Read document metadata without converting.
    pub fn inspect(&self, bytes: &[u8]) -> Result<DocumentMetadata, ConvertError> {
        input::validate_pdf_bytes(bytes, self.config.max_input_bytes)?;
        let password = self.config.password.as_deref();
        self.with_source(&*self.extractor, bytes, |source| {
            self.extractor.inspect(source, password)
        })
            .map(|(meta, _)| meta)
    }

    /// Load a local path or HTTP(S) URL and read its metadata.
    pub async fn inspect_file(&self, input_str: &str) -> Result<DocumentMetadata, ConvertError> {
        let loaded = input::load_source(input_str, self.config.download_timeout_secs).await?;
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.inspect(&loaded.bytes))
            .await
            .map_err(|e| ConvertError::Internal(format!("Inspect task failed: {e}")))?
    }
}

fn default_extractor(config: &ConversionConfig) -> Result<Arc<dyn TextExtractor>, ConvertError> {
    match config.engine {
        ExtractionEngine::Lopdf => Ok(Arc::new(LopdfExtractor::new())),
        #[cfg(feature = "pdfium")]
        ExtractionEngine::Pdfium => Ok(Arc::new(crate::pipeline::extract::PdfiumExtractor::new(
            config.pdfium_library_path.clone(),
        ))),
        #[cfg(not(feature = "pdfium"))]
        ExtractionEngine::Pdfium => Err(ConvertError::InvalidConfig(
            "The pdfium engine requires building with `--features pdfium`".into(),
        )),
    }
}

fn fallback_extractor(
    config: &ConversionConfig,
) -> Result<Option<Arc<dyn TextExtractor>>, ConvertError> {
    if !config.ocr_fallback {
        return Ok(None);
    }
    #[cfg(feature = "ocr")]
    {
        Ok(Some(Arc::new(crate::pipeline::ocr::OcrExtractor::new(
            config.pdfium_library_path.clone(),
            config.ocr_language.clone(),
        ))))
    }
    #[cfg(not(feature = "ocr"))]
    {
        Err(ConvertError::InvalidConfig(
            "The OCR fallback requires building with `--features ocr`".into(),
        ))
    }
}

fn document_text(doc: &ExtractedDocument) -> String {
    doc.pages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Free functions ───────────────────────────────────────────────────────

/// Convert PDF bytes in memory to DOCX.
///
/// # Example
/// ```rust,no_run
/// use pdf2docx::{convert_bytes, ConversionConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("report.pdf")?;
/// let output = convert_bytes(&bytes, "report.pdf", &ConversionConfig::default())?;
/// std::fs::write(&output.filename, &output.docx)?;
/// # Ok(())
/// # }
/// ```
pub fn convert_bytes(
    bytes: &[u8],
    filename: &str,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    Converter::new(config.clone())?.convert(bytes, filename)
}

/// Convert a local PDF file or URL to DOCX.
pub async fn convert_file(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    Converter::new(config.clone())?
        .convert_file(input_str.as_ref())
        .await
}

/// Convert a PDF and write the DOCX directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, ConvertError> {
    let output = convert_file(input_str, config).await?;
    write_docx(&output.docx, output_path.as_ref()).await?;
    Ok(output.stats)
}

/// Atomically write `docx` to `path`: write `<path>.docx.tmp`, then rename.
pub async fn write_docx(docx: &[u8], path: &Path) -> Result<(), ConvertError> {
    let write_err = |e| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("docx.tmp");
    tokio::fs::write(&tmp_path, docx).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

/// Extract PDF metadata without converting content.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, ConvertError> {
    Converter::new(ConversionConfig::default())?
        .inspect_file(input_str.as_ref())
        .await
}
