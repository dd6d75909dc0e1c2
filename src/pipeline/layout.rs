//! Layout: turn raw extracted page text into DOCX body blocks.
//!
//! PDF text extraction yields whatever the content stream happens to
//! contain: CRLF line endings, zero-width characters, stray control bytes
//! that are illegal in XML, ragged trailing spaces and long runs of blank
//! lines. [`clean_page_text`] applies a fixed set of string rules to each
//! page, then [`build_blocks`] splits the cleaned text into paragraphs and
//! inserts the configured separator between pages.
//!
//! ## Rule order
//!
//! Line endings are normalised first so every later rule can assume `\n`.
//! Invisible and control characters go before whitespace trimming, because
//! removing them can expose trailing spaces or turn a line blank.

use crate::config::{ConversionConfig, PageSeparator, ParagraphMode};
use crate::error::ConvertError;
use crate::pipeline::docx::Block;
use crate::pipeline::extract::ExtractedPage;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Apply all cleanup rules to one page of extracted text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, …)
/// 3. Strip characters that may not appear in XML 1.0
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 1
/// 6. Trim leading and trailing blank lines
pub fn clean_page_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = remove_xml_illegal_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    trim_blank_edges(&s)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip invisible Unicode ──────────────────────────────────────────

/// U+200B zero-width space, U+FEFF BOM, U+00AD soft hyphen, U+200C ZWNJ,
/// U+200D ZWJ, U+2060 word joiner.
static RE_INVISIBLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}\u{FEFF}\u{00AD}\u{200C}\u{200D}\u{2060}]").unwrap());

fn remove_invisible_chars(input: &str) -> String {
    RE_INVISIBLE.replace_all(input, "").into_owned()
}

// ── Rule 3: Strip XML-illegal characters ─────────────────────────────────────

fn remove_xml_illegal_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| match c {
            '\t' | '\n' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => c as u32 >= 0x20,
        })
        .collect()
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 6: Trim blank lines at both ends ────────────────────────────────────

fn trim_blank_edges(input: &str) -> String {
    input.trim_matches('\n').to_string()
}

// ── Paragraph building ───────────────────────────────────────────────────────

/// Split one cleaned page into paragraphs.
fn paragraphs(page: &str, mode: ParagraphMode) -> Vec<String> {
    match mode {
        ParagraphMode::Lines => page.split('\n').map(str::to_string).collect(),
        ParagraphMode::Blocks => {
            if !page.contains("\n\n") {
                return page.split('\n').map(str::to_string).collect();
            }
            page.split("\n\n")
                .map(|block| {
                    block
                        .split('\n')
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .filter(|p| !p.is_empty())
                .collect()
        }
    }
}

/// Build the document body from extracted pages.
///
/// Pages that are empty after cleanup contribute nothing, not even a
/// separator. When no page has any text the configured placeholder becomes
/// the only paragraph; without a placeholder this is
/// [`ConvertError::NoTextFound`].
pub fn build_blocks(
    pages: &[ExtractedPage],
    config: &ConversionConfig,
) -> Result<Vec<Block>, ConvertError> {
    let mut blocks = Vec::new();
    let mut wrote_page = false;

    for page in pages {
        let cleaned = clean_page_text(&page.text);
        if cleaned.is_empty() {
            debug!("Page {} has no text", page.number);
            continue;
        }

        if wrote_page {
            match &config.page_separator {
                PageSeparator::None => {}
                PageSeparator::PageBreak => blocks.push(Block::PageBreak),
                PageSeparator::Custom(text) => blocks.push(Block::Paragraph(text.clone())),
            }
        }

        blocks.extend(
            paragraphs(&cleaned, config.paragraph_mode)
                .into_iter()
                .map(Block::Paragraph),
        );
        wrote_page = true;
    }

    if !wrote_page {
        return match &config.empty_text_placeholder {
            Some(text) => Ok(vec![Block::Paragraph(text.clone())]),
            None => Err(ConvertError::NoTextFound { pages: pages.len() }),
        };
    }

    Ok(blocks)
}

/// Plain-text rendering of the body: paragraphs joined by `\n`.
pub fn blocks_to_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter_map(|b| match b {
            Block::Paragraph(text) => Some(text.as_str()),
            Block::PageBreak => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}
