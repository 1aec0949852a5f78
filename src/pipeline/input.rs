//! Input resolution: validate a user-supplied path before pdfium sees it.
//!
//! pdfium reports a missing file, an unreadable file and a PNG renamed to
//! `.pdf` all as the same opaque load failure. Checking existence, read
//! permission and the `%PDF` magic bytes first gives callers a precise
//! [`FormulaError`] instead.

use crate::error::FormulaError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Validate a local PDF path, returning it unchanged on success.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<PathBuf, FormulaError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(FormulaError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(FormulaError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FormulaError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(FormulaError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}
