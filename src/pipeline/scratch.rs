//! Scoped temporary storage for extractors that need a filesystem path.
//!
//! A [`ScratchFile`] owns a [`tempfile::NamedTempFile`]; the file is removed
//! when the handle is released or dropped, whichever comes first, so every
//! exit path of a conversion (success, error, panic, a dropped request
//! future) gives the disk space back. Names are random, so concurrent
//! conversions sharing one directory never collide.

use crate::error::ConvertError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const SCRATCH_PREFIX: &str = "pdf2docx-";
const SCRATCH_SUFFIX: &str = ".pdf";

/// Where scratch files are created. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct ScratchSpace {
    dir: Option<PathBuf>,
}

impl ScratchSpace {
    /// `None` means the OS temp directory.
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// The directory scratch files land in.
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Allocate a new, empty, uniquely named scratch file.
    pub fn acquire(&self) -> Result<ScratchFile, ConvertError> {
        let dir = self.dir();
        std::fs::create_dir_all(&dir).map_err(|e| ConvertError::ScratchAllocation {
            dir: dir.clone(),
            source: e,
        })?;

        let file = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(SCRATCH_SUFFIX)
            .tempfile_in(&dir)
            .map_err(|e| ConvertError::ScratchAllocation {
                dir: dir.clone(),
                source: e,
            })?;

        debug!("Acquired scratch file {}", file.path().display());
        Ok(ScratchFile { file })
    }

    /// Acquire a scratch file and fill it with `bytes`.
    pub fn stage(&self, bytes: &[u8]) -> Result<ScratchFile, ConvertError> {
        let mut scratch = self.acquire()?;
        let dir = self.dir();
        scratch
            .file
            .write_all(bytes)
            .and_then(|_| scratch.file.flush())
            .map_err(|e| ConvertError::ScratchAllocation { dir, source: e })?;
        Ok(scratch)
    }
}

/// Handle to one scratch file. Removed on [`release`](Self::release) or drop.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Remove the file now, reporting failure instead of swallowing it.
    pub fn release(self) -> Result<(), ConvertError> {
        let path = self.file.path().to_path_buf();
        self.file
            .close()
            .map_err(|e| ConvertError::ScratchRelease {
                path: path.clone(),
                source: e,
            })?;
        debug!("Released scratch file {}", path.display());
        Ok(())
    }
}
