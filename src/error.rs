//! Error types for the formula-scan library.
//!
//! Two distinct error types reflect the two failure tiers of a scan:
//!
//! * [`FormulaError`] — **Fatal**: the document cannot be scanned at all
//!   (missing file, not a PDF, corrupt xref, pdfium unavailable, bad config).
//!   Returned as `Err(FormulaError)` from the top-level `detect*` functions.
//!   A document that simply contains no formulas is *not* an error: it comes
//!   back as `Ok` with an empty candidate list.
//!
//! * [`RegionError`] — **Non-fatal**: a single text block or embedded image
//!   could not be decoded, scored or rasterised. The region is dropped from
//!   the output and the error is recorded in
//!   [`crate::output::PageDetections`]; the walk always continues.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the formula-scan library.
///
/// Region-level failures use [`RegionError`] and are stored in
/// [`crate::output::PageDetections`] rather than propagated here.
#[derive(Debug, Error)]
pub enum FormulaError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection does not intersect the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library in the working\n\
directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write an exported candidate image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single region of a page.
///
/// `page` is 1-indexed; `index` is the 0-indexed position of the region
/// within its page's text blocks or images (whichever the variant concerns).
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum RegionError {
    /// Embedded image pixels could not be decoded into an RGB buffer.
    #[error("Page {page}, image {index}: decode failed: {detail}")]
    ImageDecode {
        page: usize,
        index: usize,
        detail: String,
    },

    /// Channel statistics could not be computed; the region is treated as colour.
    #[error("Page {page}, image {index}: colour gate failed: {detail}")]
    ColorGate {
        page: usize,
        index: usize,
        detail: String,
    },

    /// Feature extraction failed; the region scores `(false, 0.0)`.
    #[error("Page {page}, image {index}: scoring failed: {detail}")]
    ImageScore {
        page: usize,
        index: usize,
        detail: String,
    },

    /// An accepted text block could not be drawn into a pixel buffer.
    #[error("Page {page}, text block {index}: rasterisation failed: {detail}")]
    Rasterize {
        page: usize,
        index: usize,
        detail: String,
    },

    /// The page itself could not be loaded from the document.
    #[error("Page {page}: load failed: {detail}")]
    PageLoad { page: usize, detail: String },
}

impl RegionError {
    /// 1-indexed page the failed region belongs to.
    pub fn page(&self) -> usize {
        match self {
            RegionError::ImageDecode { page, .. }
            | RegionError::ColorGate { page, .. }
            | RegionError::ImageScore { page, .. }
            | RegionError::Rasterize { page, .. }
            | RegionError::PageLoad { page, .. } => *page,
        }
    }

    /// Re-address an error produced without page context.
    pub(crate) fn at(self, page_num: usize, region: usize) -> Self {
        match self {
            RegionError::ImageDecode { detail, .. } => RegionError::ImageDecode {
                page: page_num,
                index: region,
                detail,
            },
            RegionError::ColorGate { detail, .. } => RegionError::ColorGate {
                page: page_num,
                index: region,
                detail,
            },
            RegionError::ImageScore { detail, .. } => RegionError::ImageScore {
                page: page_num,
                index: region,
                detail,
            },
            RegionError::Rasterize { detail, .. } => RegionError::Rasterize {
                page: page_num,
                index: region,
                detail,
            },
            RegionError::PageLoad { detail, .. } => RegionError::PageLoad {
                page: page_num,
                detail,
            },
        }
    }
}
