//! Streaming detection API: emit pages as they are scanned.
//!
//! Unlike [`crate::detect::detect_file`], which returns only after every
//! page is done, [`detect_stream`] yields one [`PageDetections`] per selected
//! page, in page order, as soon as that page has been scanned. Callers can
//! show partial results, drive a progress bar, or stop early by dropping the
//! stream.
//!
//! The document is opened before the stream is returned, so fatal errors
//! (missing file, wrong password, no pdfium) surface as `Err` up front.
//! Decoding and scanning then run on a blocking thread; a small bounded
//! channel keeps it at most a few pages ahead of the consumer.

use crate::config::DetectionConfig;
use crate::detect::selected_pages;
use crate::error::FormulaError;
use crate::output::PageDetections;
use crate::pipeline::walk::FormulaDetector;
use crate::pipeline::{input, pdf};
use pdfium_render::prelude::{PdfDocument, Pdfium};
use std::path::Path;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// A boxed stream of per-page detections.
pub type PageStream = Pin<Box<dyn Stream<Item = PageDetections> + Send>>;

/// Pages scanned ahead of the consumer.
const PAGE_BUFFER: usize = 4;

/// Scan a PDF, streaming one [`PageDetections`] per page.
///
/// # Example
/// ```rust,no_run
/// use formula_scan::{detect_stream, DetectionConfig};
/// use tokio_stream::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut pages = detect_stream("paper.pdf", &DetectionConfig::default()).await?;
/// while let Some(page) = pages.next().await {
///     println!("Page {}: {} candidates", page.page_num, page.candidates.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn detect_stream(
    path: impl AsRef<Path>,
    config: &DetectionConfig,
) -> Result<PageStream, FormulaError> {
    let config = config.clone();
    start_stream(path.as_ref(), move || FormulaDetector::new(config)).await
}

/// [`detect_stream`] with an already-built detector.
pub async fn detect_stream_with(
    detector: FormulaDetector,
    path: impl AsRef<Path>,
) -> Result<PageStream, FormulaError> {
    start_stream(path.as_ref(), move || detector).await
}

/// Spawn the blocking worker; `build` runs on it too, since loading fonts
/// reads files.
async fn start_stream<F>(path: &Path, build: F) -> Result<PageStream, FormulaError>
where
    F: FnOnce() -> FormulaDetector + Send + 'static,
{
    let path = path.to_path_buf();
    info!("Starting streaming detection: {}", path.display());

    let (ready_tx, ready_rx) = oneshot::channel();
    let (page_tx, page_rx) = mpsc::channel(PAGE_BUFFER);
    tokio::task::spawn_blocking(move || stream_pages(&build(), &path, ready_tx, page_tx));

    let selected = ready_rx.await.map_err(|_| {
        FormulaError::Internal("Detection task ended before opening the document".into())
    })??;
    debug!("Streaming {selected} pages");

    Ok(Box::pin(ReceiverStream::new(page_rx)))
}

/// Blocking half of [`detect_stream_with`].
///
/// Reports the open outcome on `ready`, then sends pages until done or
/// until the receiver is dropped.
fn stream_pages(
    detector: &FormulaDetector,
    path: &Path,
    ready: oneshot::Sender<Result<usize, FormulaError>>,
    pages: mpsc::Sender<PageDetections>,
) {
    let bound = input::resolve_local(path).and_then(|p| Ok((p, pdf::bind_pdfium()?)));
    let (pdf_path, pdfium) = match bound {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let (document, indices) = match open_selected(detector, &pdfium, &pdf_path) {
        Ok(v) => v,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(indices.len())).is_err() {
        return;
    }

    let total = indices.len();
    let cb = detector.config().progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_detection_start(total);
    }

    let mut found = 0;
    for idx in indices {
        let detections = detector.walk_one(pdf::load_page(&document, idx), total);
        found += detections.candidates.len();
        if pages.blocking_send(detections).is_err() {
            debug!("Page stream dropped after page {}; stopping", idx + 1);
            return;
        }
    }

    if let Some(cb) = cb {
        cb.on_detection_complete(total, found);
    }
    info!("Streaming detection complete: {found} candidates on {total} pages");
}

fn open_selected<'a>(
    detector: &'a FormulaDetector,
    pdfium: &'a Pdfium,
    pdf_path: &Path,
) -> Result<(PdfDocument<'a>, Vec<usize>), FormulaError> {
    let config = detector.config();
    let document = pdf::open_document(pdfium, pdf_path, config.password.as_deref())?;
    let total_pages = document.pages().len() as usize;
    let indices = selected_pages(config, total_pages)?;
    Ok((document, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_fails_before_streaming() {
        let result = detect_stream("/definitely/not/here.pdf", &DetectionConfig::default()).await;
        assert!(matches!(result, Err(FormulaError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn detector_is_built_on_the_blocking_thread() {
        let caller = std::thread::current().id();
        let (tx, rx) = std::sync::mpsc::channel();
        let result = start_stream(Path::new("/definitely/not/here.pdf"), move || {
            let _ = tx.send(std::thread::current().id());
            FormulaDetector::new(DetectionConfig::default())
        })
        .await;
        assert!(matches!(result, Err(FormulaError::FileNotFound { .. })));
        assert_ne!(rx.recv().expect("builder ran"), caller);
    }

    #[tokio::test]
    async fn non_pdf_fails_before_streaming() {
        let mut tmp = tempfile::NamedTempFile::new().expect("tempfile");
        std::io::Write::write_all(&mut tmp, b"PK\x03\x04 zip archive").expect("write");
        let result = detect_stream(tmp.path(), &DetectionConfig::default()).await;
        assert!(matches!(result, Err(FormulaError::NotAPdf { .. })));
    }
}
