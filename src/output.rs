//! Output types produced by a detection run.
//!
//! A run yields one [`DetectionOutput`]: the ordered candidate list for the
//! whole document, the per-page region failures, and aggregate statistics.
//! Candidates are created fresh per run and own their pixel buffers; nothing
//! here borrows from the document.

use crate::document::BoundingBox;
use crate::error::{FormulaError, RegionError};
use crate::pipeline::encode;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What [`crate::detect::inspect`] reports about a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub pdf_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,
}

/// Which detection path accepted a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Text,
    Image,
}

/// What a candidate holds.
///
/// Text candidates keep the original string together with the raster the
/// text was drawn into, so every candidate exposes pixels uniformly through
/// [`FormulaCandidate::pixels`].
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateContent {
    Text { text: String, pixels: RgbImage },
    Image(RgbImage),
}

/// A region provisionally identified as a formula.
///
/// `confidence` is an uncalibrated heuristic fusion score in `[0, 1]`:
/// threshold it, rank by it, but do not read it as a probability.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaCandidate {
    /// 1-indexed page the candidate was found on.
    pub page: usize,
    pub content: CandidateContent,
    /// Copied unchanged from the source block or image.
    pub bbox: BoundingBox,
    pub confidence: f64,
}

impl FormulaCandidate {
    pub fn source(&self) -> CandidateSource {
        match self.content {
            CandidateContent::Text { .. } => CandidateSource::Text,
            CandidateContent::Image(_) => CandidateSource::Image,
        }
    }

    pub fn pixels(&self) -> &RgbImage {
        match &self.content {
            CandidateContent::Text { pixels, .. } => pixels,
            CandidateContent::Image(pixels) => pixels,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            CandidateContent::Text { text, .. } => Some(text),
            CandidateContent::Image(_) => None,
        }
    }

    /// JSON-friendly view of this candidate.
    ///
    /// With `include_image`, the pixels are embedded as a PNG data URI (the
    /// form the recognition service accepts). Encoding failures leave the
    /// field empty rather than failing the report.
    pub fn to_report(&self, include_image: bool) -> CandidateReport {
        let image = if include_image {
            encode::to_data_uri(self.pixels()).ok()
        } else {
            None
        };
        CandidateReport {
            page: self.page,
            source: self.source(),
            bbox: self.bbox,
            confidence: self.confidence,
            width: self.pixels().width(),
            height: self.pixels().height(),
            text: self.text().map(str::to_string),
            image,
        }
    }
}

/// Serialisable summary of a [`FormulaCandidate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateReport {
    pub page: usize,
    pub source: CandidateSource,
    pub bbox: BoundingBox,
    pub confidence: f64,
    pub width: u32,
    pub height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `data:image/png;base64,…`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Everything one page contributed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageDetections {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Text candidates first, then image candidates, each in document order.
    pub candidates: Vec<FormulaCandidate>,
    /// Regions dropped because they failed to decode, score or rasterise.
    pub region_errors: Vec<RegionError>,
    pub stats: PageStats,
}

/// Counters for a single page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    pub text_blocks: usize,
    pub text_candidates: usize,
    pub images: usize,
    pub images_color_gated: usize,
    pub images_rejected: usize,
    pub image_candidates: usize,
    pub region_failures: usize,
}

/// Aggregate statistics for a detection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionStats {
    /// Pages in the source document.
    pub total_pages: usize,
    /// Pages actually walked.
    pub pages_scanned: usize,
    pub text_blocks: usize,
    pub text_candidates: usize,
    pub images: usize,
    pub images_color_gated: usize,
    pub images_rejected: usize,
    pub image_candidates: usize,
    pub region_failures: usize,
    pub duration_ms: u64,
}

impl DetectionStats {
    pub fn total_candidates(&self) -> usize {
        self.text_candidates + self.image_candidates
    }
}

/// Result of scanning a whole document.
///
/// An empty `candidates` list is a successful scan that found nothing; a
/// document that could not be read is reported as `Err(FormulaError)` by the
/// entry points instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionOutput {
    /// Page order; within a page, text candidates precede image candidates.
    pub candidates: Vec<FormulaCandidate>,
    pub region_errors: Vec<RegionError>,
    pub stats: DetectionStats,
}

impl DetectionOutput {
    /// Append one page's detections, preserving order.
    pub fn push_page(&mut self, page: PageDetections) {
        let s = &page.stats;
        self.stats.text_blocks += s.text_blocks;
        self.stats.text_candidates += s.text_candidates;
        self.stats.images += s.images;
        self.stats.images_color_gated += s.images_color_gated;
        self.stats.images_rejected += s.images_rejected;
        self.stats.image_candidates += s.image_candidates;
        self.stats.region_failures += s.region_failures;
        self.stats.pages_scanned += 1;

        self.candidates.extend(page.candidates);
        self.region_errors.extend(page.region_errors);
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates at or above `min_confidence`, in output order.
    ///
    /// No deduplication: overlapping text and image detections of the same
    /// visual region both survive if both clear the bar.
    pub fn select(&self, min_confidence: f64) -> Vec<&FormulaCandidate> {
        self.candidates
            .iter()
            .filter(|c| c.confidence >= min_confidence)
            .collect()
    }

    pub fn reports(&self, include_images: bool) -> Vec<CandidateReport> {
        self.candidates
            .iter()
            .map(|c| c.to_report(include_images))
            .collect()
    }

    /// Write every candidate to `dir` as `formula_{n}.png` (1-indexed).
    ///
    /// Returns the written paths in candidate order.
    pub fn export_pngs(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, FormulaError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| FormulaError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let mut written = Vec::with_capacity(self.candidates.len());
        for (i, candidate) in self.candidates.iter().enumerate() {
            let path = dir.join(format!("formula_{}.png", i + 1));
            let png = encode::encode_png(candidate.pixels())
                .map_err(|e| FormulaError::Internal(format!("PNG encoding failed: {e}")))?;
            std::fs::write(&path, png).map_err(|e| FormulaError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;
            written.push(path);
        }
        Ok(written)
    }
}
