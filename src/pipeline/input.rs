//! Input handling: validate uploaded bytes, tidy filenames, load local
//! paths or URLs.
//!
//! Validation here is shallow. We reject empty and oversize
//! input and anything without a `%PDF` header before a scratch file is ever
//! allocated; whether the rest of the file is a parseable PDF is the
//! extractor's call.

use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How far into the input the `%PDF` header may appear.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Name used when an upload carries no usable filename.
const FALLBACK_STEM: &str = "document";

/// Check that `bytes` plausibly hold a PDF and respect the size limit.
pub fn validate_pdf_bytes(bytes: &[u8], max_bytes: usize) -> Result<(), ConvertError> {
    if bytes.is_empty() {
        return Err(ConvertError::EmptyInput);
    }
    if bytes.len() > max_bytes {
        return Err(ConvertError::InputTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if !window.windows(4).any(|w| w == b"%PDF") {
        return Err(ConvertError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Reduce a client-supplied filename to a safe ASCII basename.
///
/// Directory components are dropped, whitespace becomes `_`, anything other
/// than ASCII alphanumerics, `.`, `-` and `_` is removed, and leading dots
/// are stripped so the result can never be a hidden file or a traversal.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_start_matches(['.', '_']).to_string()
}

/// Suggested download name for the DOCX built from `source_name`.
pub fn docx_filename(source_name: &str) -> String {
    let safe = sanitize_filename(source_name);
    let stem = match safe.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ if !safe.is_empty() => safe.as_str(),
        _ => FALLBACK_STEM,
    };
    format!("{stem}.docx")
}

/// Reject filenames that do not end in `.pdf` (case-insensitive).
pub fn check_pdf_extension(filename: &str) -> Result<(), ConvertError> {
    if filename.to_ascii_lowercase().ends_with(".pdf") {
        Ok(())
    } else {
        Err(ConvertError::NotPdfFilename {
            filename: filename.to_string(),
        })
    }
}

/// A PDF loaded from a path or URL.
#[derive(Debug)]
pub struct LoadedInput {
    pub bytes: Vec<u8>,
    /// Basename the bytes came from.
    pub filename: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download an HTTP(S) URL into memory.
pub async fn load_source(input: &str, timeout_secs: u64) -> Result<LoadedInput, ConvertError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

async fn load_local(path: &Path) -> Result<LoadedInput, ConvertError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ConvertError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{FALLBACK_STEM}.pdf"));

    debug!("Loaded local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedInput { bytes, filename })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedInput, ConvertError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedInput {
        bytes: bytes.to_vec(),
        filename: filename_from_url(url),
    })
}

/// Last path segment of the URL when it looks like a filename.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Default output path next to a local input: `report.pdf` → `report.docx`.
pub fn default_output_path(input: &str) -> PathBuf {
    if is_url(input) {
        PathBuf::from(docx_filename(&filename_from_url(input)))
    } else {
        Path::new(input).with_extension("docx")
    }
}
