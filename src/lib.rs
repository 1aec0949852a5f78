//! # formula-scan
//!
//! Locate probable mathematical formulas in PDF documents.
//!
//! Every page is examined along two paths. Selectable text is matched
//! against a catalogue of symbolic patterns (LaTeX commands, operators,
//! Greek and Unicode math glyphs, sub/superscripts, delimiters,
//! environments). Embedded images are screened by a colour gate and then
//! scored on four structural features (white background, near-square
//! shape, many small ink components, dense edges). Whatever survives is
//! returned as a [`FormulaCandidate`]: a pixel buffer, the source bounding
//! box and a heuristic confidence in `[0, 1]`, ready for a recognition
//! service that turns images into LaTeX.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path / %PDF magic
//!  ├─ 2. Decode    text segments + image objects per page via pdfium
//!  ├─ 3. Text      pattern families → accept? → rasterise to pixels
//!  ├─ 4. Images    colour gate → feature score → accept?
//!  └─ 5. Output    ordered candidates + region failures + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formula_scan::{detect_file, DetectionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DetectionConfig::default();
//!     let output = detect_file("paper.pdf", &config).await?;
//!     for c in output.select(0.3) {
//!         println!("page {} {:?} {:.2}", c.page, c.source(), c.confidence);
//!     }
//!     output.export_pngs("formulas/")?;
//!     Ok(())
//! }
//! ```
//!
//! Pages that are already decoded (from another PDF library, or built in a
//! test) go straight to [`FormulaDetector::detect_pages`].
//!
//! ## Confidence
//!
//! Text and image confidences come from different heuristics and are not
//! calibrated against each other or against ground truth. Threshold and
//! rank with them; do not read them as probabilities.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `formula-scan` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! formula-scan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DetectionConfig, DetectionConfigBuilder, DetectionThresholds, PageSelection};
pub use detect::{
    detect_bytes, detect_file, detect_file_blocking, detect_file_with, inspect, inspect_blocking,
};
pub use document::{BoundingBox, ImageRegion, Page, TextBlock};
pub use error::{FormulaError, RegionError};
pub use output::{
    CandidateContent, CandidateReport, CandidateSource, DetectionOutput, DetectionStats,
    DocumentInfo, FormulaCandidate, PageDetections, PageStats,
};
pub use pipeline::color::is_color_image;
pub use pipeline::features::{score_image, FeatureScores, ImageScore};
pub use pipeline::rasterize::{GlyphRasterizer, TextRasterizer};
pub use pipeline::text::{classify_text, PatternFamily, TextClassification};
pub use pipeline::walk::FormulaDetector;
pub use progress::{DetectionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{detect_stream, detect_stream_with, PageStream};
