//! Eager (whole-document) detection entry points.
//!
//! These wait for every selected page to be scanned and return one
//! [`DetectionOutput`]. Use [`crate::stream::detect_stream`] instead to
//! receive pages as they finish.
//!
//! Only document-level problems are errors here. A document with no formulas
//! is `Ok` with an empty candidate list; a page or region that fails is
//! recorded in the output and the scan continues.

use crate::config::DetectionConfig;
use crate::error::FormulaError;
use crate::output::{DetectionOutput, DocumentInfo};
use crate::pipeline::walk::FormulaDetector;
use crate::pipeline::{input, pdf};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Scan a PDF file for formula candidates.
///
/// pdfium work runs on tokio's blocking pool.
///
/// # Errors
/// Returns `Err(FormulaError)` only when the document cannot be scanned:
/// - file missing, unreadable or not a PDF
/// - corrupt document or wrong/missing password
/// - pdfium library unavailable
/// - page selection outside the document
pub async fn detect_file(
    path: impl AsRef<Path>,
    config: &DetectionConfig,
) -> Result<DetectionOutput, FormulaError> {
    let path = path.as_ref().to_path_buf();
    let config = config.clone();
    tokio::task::spawn_blocking(move || detect_file_blocking(&path, &config))
        .await
        .map_err(|e| FormulaError::Internal(format!("Detection task panicked: {}", e)))?
}

/// Blocking variant of [`detect_file`].
pub fn detect_file_blocking(
    path: impl AsRef<Path>,
    config: &DetectionConfig,
) -> Result<DetectionOutput, FormulaError> {
    let detector = FormulaDetector::new(config.clone());
    detect_file_with(&detector, path)
}

/// Scan a PDF file with an already-built detector (e.g. one with a custom
/// text rasteriser).
pub fn detect_file_with(
    detector: &FormulaDetector,
    path: impl AsRef<Path>,
) -> Result<DetectionOutput, FormulaError> {
    let start = Instant::now();
    let config = detector.config();

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let pdf_path = input::resolve_local(path)?;
    info!("Starting detection: {}", pdf_path.display());

    // ── Step 2: Open document ────────────────────────────────────────────
    let pdfium = pdf::bind_pdfium()?;
    let document = pdf::open_document(&pdfium, &pdf_path, config.password.as_deref())?;
    let total_pages = document.pages().len() as usize;

    // ── Step 3: Compute page indices ─────────────────────────────────────
    let page_indices = selected_pages(config, total_pages)?;
    debug!("Selected {} of {} pages", page_indices.len(), total_pages);

    // ── Step 4: Walk pages, decoding each lazily ─────────────────────────
    let pages = page_indices.iter().map(|&idx| pdf::load_page(&document, idx));
    let mut output = detector.walk(pages, page_indices.len());

    output.stats.total_pages = total_pages;
    output.stats.duration_ms = start.elapsed().as_millis() as u64;
    info!(
        "Detection complete: {} candidates on {}/{} pages, {}ms",
        output.candidates.len(),
        output.stats.pages_scanned,
        total_pages,
        output.stats.duration_ms
    );
    Ok(output)
}

/// Scan PDF bytes held in memory.
///
/// The bytes are written to a managed [`tempfile`] that is removed on return.
///
/// # Example
/// ```rust,no_run
/// use formula_scan::{detect_bytes, DetectionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("paper.pdf")?;
/// let output = detect_bytes(&bytes, &DetectionConfig::default()).await?;
/// println!("{} candidates", output.candidates.len());
/// # Ok(())
/// # }
/// ```
pub async fn detect_bytes(
    bytes: &[u8],
    config: &DetectionConfig,
) -> Result<DetectionOutput, FormulaError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| FormulaError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| FormulaError::Internal(format!("tempfile write: {e}")))?;
    // `tmp` is dropped (and the file deleted) when `detect_file` returns
    detect_file(tmp.path(), config).await
}

/// Report page count and metadata without scanning any page.
///
/// Does not need a font.
///
/// ```rust,no_run
/// # tokio_test::block_on(async {
/// let info = formula_scan::inspect("paper.pdf", None).await?;
/// println!("{} pages, PDF {}", info.page_count, info.pdf_version);
/// # Ok::<(), formula_scan::FormulaError>(())
/// # }).unwrap();
/// ```
pub async fn inspect(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, FormulaError> {
    let path = path.as_ref().to_path_buf();
    let password = password.map(str::to_string);
    tokio::task::spawn_blocking(move || inspect_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| FormulaError::Internal(format!("Inspect task panicked: {}", e)))?
}

/// Blocking variant of [`inspect`].
pub fn inspect_blocking(
    path: impl AsRef<Path>,
    password: Option<&str>,
) -> Result<DocumentInfo, FormulaError> {
    let pdf_path = input::resolve_local(path)?;
    let pdfium = pdf::bind_pdfium()?;
    let document = pdf::open_document(&pdfium, &pdf_path, password)?;
    Ok(pdf::document_info(&document))
}

/// Expand the configured selection, rejecting one that misses a non-empty document.
pub(crate) fn selected_pages(
    config: &DetectionConfig,
    total_pages: usize,
) -> Result<Vec<usize>, FormulaError> {
    let indices = config.pages.to_indices(total_pages);
    if indices.is_empty() && total_pages > 0 {
        return Err(FormulaError::PageOutOfRange {
            page: config.pages.first_requested(),
            total: total_pages,
        });
    }
    Ok(indices)
}
