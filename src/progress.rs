//! Progress-callback trait for per-page detection events.
//!
//! Inject an [`Arc<dyn DetectionProgressCallback>`] via
//! [`crate::config::DetectionConfigBuilder::progress_callback`] to receive
//! events as the walker scans each page.
//!
//! # Example
//!
//! ```rust
//! use formula_scan::{DetectionConfig, DetectionProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     found: AtomicUsize,
//! }
//!
//! impl DetectionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, total_pages: usize, candidates: usize) {
//!         self.found.fetch_add(candidates, Ordering::SeqCst);
//!         eprintln!("Page {}/{}: {} candidates", page_num, total_pages, candidates);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { found: AtomicUsize::new(0) });
//!
//! let config = DetectionConfig::builder()
//!     .progress_callback(counter as Arc<dyn DetectionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::RegionError;
use std::sync::Arc;

/// Called by the page walker as it scans a document.
///
/// Implementations must be `Send + Sync`: detection runs on a blocking
/// thread, and callers may shard pages across threads. All methods have
/// default no-op implementations so callers only override what they need.
pub trait DetectionProgressCallback: Send + Sync {
    /// Called once before the first page is scanned.
    fn on_detection_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called before a page's text blocks and images are examined.
    ///
    /// * `page_num` — 1-indexed page number
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been scanned.
    ///
    /// * `candidates` — number of candidates this page contributed
    fn on_page_complete(&self, page_num: usize, total_pages: usize, candidates: usize) {
        let _ = (page_num, total_pages, candidates);
    }

    /// Called for each region that was dropped because of a failure.
    fn on_region_error(&self, page_num: usize, error: &RegionError) {
        let _ = (page_num, error);
    }

    /// Called once after all selected pages have been scanned.
    fn on_detection_complete(&self, total_pages: usize, total_candidates: usize) {
        let _ = (total_pages, total_candidates);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DetectionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DetectionConfig`].
pub type ProgressCallback = Arc<dyn DetectionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        candidates: AtomicUsize,
        errors: AtomicUsize,
    }

    impl DetectionProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, candidates: usize) {
            self.candidates.fetch_add(candidates, Ordering::SeqCst);
        }

        fn on_region_error(&self, _page_num: usize, _error: &RegionError) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_detection_start(2);
        cb.on_page_start(1, 2);
        cb.on_page_complete(1, 2, 3);
        cb.on_region_error(
            2,
            &RegionError::PageLoad {
                page: 2,
                detail: "x".into(),
            },
        );
        cb.on_detection_complete(2, 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(1, 2, 4);
        tracker.on_page_start(2, 2);
        tracker.on_region_error(
            2,
            &RegionError::ImageDecode {
                page: 2,
                index: 0,
                detail: "bad jpeg".into(),
            },
        );
        tracker.on_page_complete(2, 2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.candidates.load(Ordering::SeqCst), 5);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
    }
}
