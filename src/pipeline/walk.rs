//! Page walker / candidate assembler.
//!
//! Drives the detection stages over one page at a time:
//!
//! ```text
//! text blocks ──▶ classify ──▶ rasterise ──┐
//!                                          ├──▶ PageDetections
//! images ──▶ colour gate ──▶ score ────────┘
//! ```
//!
//! Within a page all text candidates come first, then all image candidates,
//! each in document order. A region that fails anywhere along its path is
//! recorded as a [`RegionError`] and skipped; the walk itself never fails.
//! The detector holds no per-page state, so one instance can be shared by
//! callers that shard pages across threads.

use crate::config::DetectionConfig;
use crate::document::Page;
use crate::error::RegionError;
use crate::output::{
    CandidateContent, DetectionOutput, FormulaCandidate, PageDetections, PageStats,
};
use crate::pipeline::color::is_color_image;
use crate::pipeline::features::score_image;
use crate::pipeline::rasterize::{rasterize_block, GlyphRasterizer, TextRasterizer};
use crate::pipeline::text::PatternCatalogue;
use std::borrow::Borrow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the text and image pipelines over decoded pages.
#[derive(Clone)]
pub struct FormulaDetector {
    config: DetectionConfig,
    patterns: &'static PatternCatalogue,
    rasterizer: Arc<dyn TextRasterizer>,
}

impl FormulaDetector {
    /// Detector using the built-in glyph rasteriser, with fonts resolved from `config`.
    pub fn new(config: DetectionConfig) -> Self {
        let rasterizer = Arc::new(GlyphRasterizer::from_config(&config));
        Self::with_rasterizer(config, rasterizer)
    }

    /// Detector drawing accepted text with a caller-supplied rasteriser.
    pub fn with_rasterizer(config: DetectionConfig, rasterizer: Arc<dyn TextRasterizer>) -> Self {
        Self {
            config,
            patterns: PatternCatalogue::standard(),
            rasterizer,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scan a single page.
    pub fn detect_page(&self, page: &Page) -> PageDetections {
        let page_num = page.page_num();
        let thresholds = &self.config.thresholds;
        let mut out = PageDetections {
            page_num,
            ..PageDetections::default()
        };
        let mut stats = PageStats {
            text_blocks: page.text_blocks.len(),
            images: page.images.len(),
            ..PageStats::default()
        };

        // ── Text blocks ──────────────────────────────────────────────────
        for (idx, block) in page.text_blocks.iter().enumerate() {
            let class = self.patterns.classify(&block.text);
            if !class.is_formula {
                continue;
            }
            debug!(
                "Page {page_num}, text block {idx}: formula-like ({:.2}, {:?})",
                class.confidence, class.matched
            );

            match rasterize_block(self.rasterizer.as_ref(), block, &self.config) {
                Ok(pixels) => {
                    stats.text_candidates += 1;
                    out.candidates.push(FormulaCandidate {
                        page: page_num,
                        content: CandidateContent::Text {
                            text: block.text.clone(),
                            pixels,
                        },
                        bbox: block.bbox,
                        confidence: class.confidence,
                    });
                }
                Err(e) => self.record(&mut out, e.at(page_num, idx)),
            }
        }

        // ── Embedded images ──────────────────────────────────────────────
        for (idx, region) in page.images.iter().enumerate() {
            let pixels = match &region.pixels {
                Ok(pixels) => pixels,
                Err(e) => {
                    self.record(&mut out, e.clone().at(page_num, idx));
                    continue;
                }
            };

            if is_color_image(pixels, thresholds) {
                stats.images_color_gated += 1;
                continue;
            }

            let score = score_image(pixels, thresholds);
            if let Err(e) = score.features {
                self.record(&mut out, e.at(page_num, idx));
                continue;
            }
            if !score.is_formula {
                stats.images_rejected += 1;
                continue;
            }

            stats.image_candidates += 1;
            out.candidates.push(FormulaCandidate {
                page: page_num,
                content: CandidateContent::Image(pixels.clone()),
                bbox: region.bbox,
                confidence: score.confidence,
            });
        }

        stats.region_failures = out.region_errors.len();
        out.stats = stats;
        debug!(
            "Page {page_num}: {} text + {} image candidates, {} region failures",
            stats.text_candidates, stats.image_candidates, stats.region_failures
        );
        out
    }

    /// Scan already-decoded pages, in order.
    pub fn detect_pages(&self, pages: &[Page]) -> DetectionOutput {
        self.walk(pages.iter().map(Ok), pages.len())
    }

    /// Walk a lazily decoded page sequence, firing progress events.
    ///
    /// A page that fails to load contributes a single
    /// [`RegionError::PageLoad`] and no candidates.
    pub(crate) fn walk<I, P>(&self, pages: I, total_pages: usize) -> DetectionOutput
    where
        I: IntoIterator<Item = Result<P, RegionError>>,
        P: Borrow<Page>,
    {
        let start = Instant::now();
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_detection_start(total_pages);
        }

        let mut output = DetectionOutput::default();
        output.stats.total_pages = total_pages;

        for page in pages {
            let detections = self.walk_one(page, total_pages);
            output.push_page(detections);
        }

        output.stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scanned {} pages: {} candidates ({} text, {} image), {} region failures",
            output.stats.pages_scanned,
            output.stats.total_candidates(),
            output.stats.text_candidates,
            output.stats.image_candidates,
            output.stats.region_failures
        );
        if let Some(cb) = cb {
            cb.on_detection_complete(total_pages, output.candidates.len());
        }
        output
    }

    /// Scan one page of a walk, with its progress events.
    pub(crate) fn walk_one<P: Borrow<Page>>(
        &self,
        page: Result<P, RegionError>,
        total_pages: usize,
    ) -> PageDetections {
        let cb = self.config.progress_callback.as_ref();
        match page {
            Ok(page) => {
                let page = page.borrow();
                let page_num = page.page_num();
                if let Some(cb) = cb {
                    cb.on_page_start(page_num, total_pages);
                }
                let detections = self.detect_page(page);
                if let Some(cb) = cb {
                    for e in &detections.region_errors {
                        cb.on_region_error(page_num, e);
                    }
                    cb.on_page_complete(page_num, total_pages, detections.candidates.len());
                }
                detections
            }
            Err(e) => {
                let page_num = e.page();
                warn!("{e}");
                if let Some(cb) = cb {
                    cb.on_page_start(page_num, total_pages);
                    cb.on_region_error(page_num, &e);
                    cb.on_page_complete(page_num, total_pages, 0);
                }
                PageDetections {
                    page_num,
                    candidates: Vec::new(),
                    region_errors: vec![e],
                    stats: PageStats {
                        region_failures: 1,
                        ..PageStats::default()
                    },
                }
            }
        }
    }

    fn record(&self, out: &mut PageDetections, error: RegionError) {
        warn!("{error}");
        out.region_errors.push(error);
    }
}

impl std::fmt::Debug for FormulaDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaDetector")
            .field("config", &self.config)
            .field("rasterizer", &"<dyn TextRasterizer>")
            .finish()
    }
}
