//! File ingestion: size and extension checks happen before any byte is
//! written; stored names are generated, preserving the original extension.

use crate::analyzer::FileCategory;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Maximum accepted upload size: 50 MB.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub struct FileStore {
    dest_dir: PathBuf,
}

impl FileStore {
    pub fn new(dest_dir: impl Into<PathBuf>) -> Self {
        Self {
            dest_dir: dest_dir.into(),
        }
    }

    /// Validate and persist an uploaded byte stream, returning the stored path.
    pub fn save(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let size = bytes.len() as u64;
        if size > MAX_FILE_SIZE {
            return Err(Error::FileTooLarge {
                size,
                limit: MAX_FILE_SIZE,
            });
        }

        let ext = extension_of(original_name);
        if FileCategory::from_extension(&ext) == FileCategory::Unknown {
            return Err(Error::UnsupportedFormat(ext));
        }

        std::fs::create_dir_all(&self.dest_dir)?;
        let stored_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
        let dest_path = self.dest_dir.join(stored_name);
        std::fs::write(&dest_path, bytes)?;
        Ok(dest_path)
    }

    /// Best-effort removal of a partially processed upload.
    pub fn remove(&self, path: &Path) {
        std::fs::remove_file(path).ok();
    }
}

/// Lowercased extension of a declared file name, without the dot.
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}
