//! Scoped temporary files for uploads.
//!
//! An upload lives on disk only while it is being normalized. [`StagedUpload`]
//! owns the uploaded file plus any files derived from it and removes all of
//! them when dropped, whichever way the request ends.

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, warn};

const RANDOM_CHARS: usize = 16;

pub struct StagedUpload {
    upload: PathBuf,
    derived: Vec<PathBuf>,
}

impl StagedUpload {
    /// Write `bytes` to `dir/<random>_<original_name>`.
    pub fn create(dir: &Path, original_name: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let suffix = format!("_{}", sanitize_file_name(original_name));
        let mut file = Builder::new()
            .prefix("")
            .suffix(&suffix)
            .rand_bytes(RANDOM_CHARS)
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        // Deletion is owned by our Drop from here on, which logs failures.
        let upload = file.into_temp_path().keep()?;
        debug!(path = %upload.display(), len = bytes.len(), "staged upload");
        Ok(Self {
            upload,
            derived: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.upload
    }

    /// Also remove `path` when this upload is dropped. Register it before it
    /// is written so that a partial write is cleaned up too.
    pub fn track(&mut self, path: PathBuf) {
        if path != self.upload {
            self.derived.push(path);
        }
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        for path in self.derived.iter().chain(std::iter::once(&self.upload)) {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "removed staged file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove staged file"),
            }
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
