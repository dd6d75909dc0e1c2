//! DOCX generation: assemble a WordprocessingML package from body blocks.
//!
//! [`OoxmlGenerator`] builds the document tree with `docx-rs`: one
//! paragraph per [`Block`], tabs as `<w:tab/>`, page breaks as
//! `<w:br w:type="page"/>`, and the configured font and size as document
//! defaults. The packed archive is then rewritten once:
//!
//! * every entry gets the same fixed timestamp;
//! * `docProps/core.xml` is replaced with one carrying the title and
//!   creator.
//!
//! [`read_docx_text`] reads the body back with `quick-xml`.

use crate::error::ConvertError;
use docx_rs::{BreakType, Docx, Paragraph, Run, RunFonts};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Display;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One unit of document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A paragraph in the Normal style. Empty text gives an empty paragraph.
    Paragraph(String),
    /// A hard page break.
    PageBreak,
}

/// Everything the generator needs to write a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxContent {
    pub title: Option<String>,
    pub author: Option<String>,
    pub font_name: String,
    /// Font size in half-points, the unit of `<w:sz>` (22 = 11 pt).
    pub font_size_half_points: u32,
    pub blocks: Vec<Block>,
}

/// DOCX-building capability.
pub trait DocumentGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Serialise `content` into the bytes of a `.docx` package.
    fn generate(&self, content: &DocxContent) -> Result<Vec<u8>, ConvertError>;
}

/// Office Open XML writer built on `docx-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OoxmlGenerator;

impl OoxmlGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentGenerator for OoxmlGenerator {
    fn name(&self) -> &str {
        "ooxml"
    }

    fn generate(&self, content: &DocxContent) -> Result<Vec<u8>, ConvertError> {
        let mut packed = Cursor::new(Vec::new());
        build_document(content)
            .build()
            .pack(&mut packed)
            .map_err(|e| generation_error("package", e))?;
        repack(packed.get_ref(), content)
    }
}

fn build_document(content: &DocxContent) -> Docx {
    let font = content.font_name.as_str();
    let mut docx = Docx::new()
        .default_fonts(RunFonts::new().ascii(font).hi_ansi(font).east_asia(font).cs(font))
        .default_size(content.font_size_half_points as usize)
        .created_at(FIXED_TIMESTAMP)
        .updated_at(FIXED_TIMESTAMP);

    for block in &content.blocks {
        docx = docx.add_paragraph(match block {
            Block::Paragraph(text) if text.is_empty() => Paragraph::new(),
            Block::Paragraph(text) => Paragraph::new().add_run(text_run(text)),
            Block::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
        });
    }
    docx
}

/// One run per paragraph; tabs split the text into `<w:t>` segments.
fn text_run(text: &str) -> Run {
    let mut run = Run::new();
    for (i, segment) in text.split('\t').enumerate() {
        if i > 0 {
            run = run.add_tab();
        }
        if !segment.is_empty() {
            run = run.add_text(segment);
        }
    }
    run
}

/// Copy every entry into a fresh archive with a fixed timestamp, swapping
/// in our own core properties.
fn repack(packed: &[u8], content: &DocxContent) -> Result<Vec<u8>, ConvertError> {
    let mut source = ZipArchive::new(Cursor::new(packed)).map_err(|e| generation_error("package", e))?;
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for i in 0..source.len() {
        let mut entry = source.by_index(i).map_err(|e| generation_error("package", e))?;
        let name = entry.name().to_string();
        let mut data = Vec::new();
        if name == CORE_PART {
            data.extend_from_slice(core_xml(content).as_bytes());
        } else {
            entry
                .read_to_end(&mut data)
                .map_err(|e| generation_error(&name, e))?;
        }
        zip.start_file(name.as_str(), options)
            .map_err(|e| generation_error(&name, e))?;
        zip.write_all(&data).map_err(|e| generation_error(&name, e))?;
    }

    let cursor = zip
        .finish()
        .map_err(|e| generation_error("archive", e))?;
    Ok(cursor.into_inner())
}

fn generation_error(part: &str, e: impl Display) -> ConvertError {
    ConvertError::GenerationFailed(format!("failed to write {part}: {e}"))
}

const CORE_PART: &str = "docProps/core.xml";

/// Creation and modification time written into every package.
const FIXED_TIMESTAMP: &str = "1980-01-01T00:00:00Z";

fn core_xml(content: &DocxContent) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
    );
    if let Some(title) = &content.title {
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape(title.as_str())));
    }
    if let Some(author) = &content.author {
        xml.push_str(&format!("<dc:creator>{}</dc:creator>", escape(author.as_str())));
    }
    xml.push_str(&format!(
        r#"<dcterms:created xsi:type="dcterms:W3CDTF">{FIXED_TIMESTAMP}</dcterms:created><dcterms:modified xsi:type="dcterms:W3CDTF">{FIXED_TIMESTAMP}</dcterms:modified></cp:coreProperties>"#
    ));
    xml
}

// ── Reading back ─────────────────────────────────────────────────────────────

fn invalid_docx(e: impl Display) -> ConvertError {
    ConvertError::GenerationFailed(format!("not a valid DOCX: {e}"))
}

/// Body text of a `.docx`: one line per paragraph, page-break paragraphs
/// skipped, tabs kept as `\t`.
pub fn read_docx_text(bytes: &[u8]) -> Result<String, ConvertError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid_docx)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(invalid_docx)?
        .read_to_string(&mut xml)
        .map_err(invalid_docx)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut page_break = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    current.clear();
                    page_break = false;
                }
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => current.push('\t'),
                b"br" => page_break = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) if in_text => {
                let text = e.unescape().map_err(invalid_docx)?;
                current.push_str(&text);
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !(page_break && current.is_empty()) {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(invalid_docx(e)),
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}
