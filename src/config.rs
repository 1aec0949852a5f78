//! Configuration types for formula detection.
//!
//! All detection behaviour is controlled through [`DetectionConfig`], built
//! via its [`DetectionConfigBuilder`]. The numeric constants that decide
//! acceptance live in [`DetectionThresholds`], which is serialisable so two
//! runs can be diffed and tests can inject their own values.
//!
//! The defaults were tuned together against the unweighted feature mean in
//! [`crate::pipeline::features`]; change them as configuration, not as
//! ground truth.

use crate::error::FormulaError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Numeric thresholds shared by the colour gate and the image feature scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionThresholds {
    /// Intensity above which a pixel counts as background. Default: 240.
    ///
    /// Also the binarisation threshold for connected components: pixels at or
    /// below it are ink.
    pub near_white_threshold: u8,

    /// Mean absolute channel difference above which a region is colour
    /// content and rejected outright. Default: 10.0 (0–255 scale).
    pub color_threshold: f64,

    /// Multiplier on the near-white pixel ratio before clamping. Default: 1.0.
    pub white_scale: f64,

    /// Height/width ratio at which the aspect score peaks. Default: 1.0.
    pub aspect_target: f64,

    /// External contour count that saturates the component score. Default: 6.0.
    pub component_divisor: f64,

    /// Multiplier on the edge-pixel ratio before clamping. Default: 4.0.
    pub edge_scale: f64,

    /// Canny hysteresis low threshold. Default: 100.0.
    pub canny_low: f32,

    /// Canny hysteresis high threshold. Default: 200.0.
    pub canny_high: f32,

    /// Fused image confidence must exceed this to be accepted. Default: 0.3.
    ///
    /// Deliberately low: the scorer over-accepts and leaves final filtering
    /// to the selection step downstream.
    pub image_accept_threshold: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            near_white_threshold: 240,
            color_threshold: 10.0,
            white_scale: 1.0,
            aspect_target: 1.0,
            component_divisor: 6.0,
            edge_scale: 4.0,
            canny_low: 100.0,
            canny_high: 200.0,
            image_accept_threshold: 0.3,
        }
    }
}

/// Configuration for a formula-detection run.
///
/// Built via [`DetectionConfig::builder()`] or using
/// [`DetectionConfig::default()`].
///
/// # Example
/// ```rust
/// use formula_scan::DetectionConfig;
///
/// let config = DetectionConfig::builder()
///     .image_accept_threshold(0.45)
///     .color_threshold(12.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.thresholds.near_white_threshold, 240);
/// ```
#[derive(Clone)]
pub struct DetectionConfig {
    /// Colour-gate and feature-scorer constants.
    pub thresholds: DetectionThresholds,

    /// Font pixel height as a fraction of the text block height. Default: 0.8.
    pub font_height_ratio: f32,

    /// Font files tried, in order, before the built-in system font list.
    pub font_paths: Vec<PathBuf>,

    /// Largest width or height (px) a text block may be rasterised at. Default: 8192.
    ///
    /// Bounding boxes come straight from the document; a corrupt box must not
    /// turn into a multi-gigabyte allocation.
    pub max_raster_dimension: u32,

    /// Page selection for PDF inputs. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            thresholds: DetectionThresholds::default(),
            font_height_ratio: 0.8,
            font_paths: Vec::new(),
            max_raster_dimension: 8192,
            pages: PageSelection::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DetectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionConfig")
            .field("thresholds", &self.thresholds)
            .field("font_height_ratio", &self.font_height_ratio)
            .field("font_paths", &self.font_paths)
            .field("max_raster_dimension", &self.max_raster_dimension)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn DetectionProgressCallback>"),
            )
            .finish()
    }
}

impl DetectionConfig {
    /// Create a new builder for `DetectionConfig`.
    pub fn builder() -> DetectionConfigBuilder {
        DetectionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`DetectionConfig`].
#[derive(Debug)]
pub struct DetectionConfigBuilder {
    config: DetectionConfig,
}

impl DetectionConfigBuilder {
    pub fn thresholds(mut self, thresholds: DetectionThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    pub fn near_white_threshold(mut self, v: u8) -> Self {
        self.config.thresholds.near_white_threshold = v;
        self
    }

    pub fn color_threshold(mut self, v: f64) -> Self {
        self.config.thresholds.color_threshold = v;
        self
    }

    pub fn white_scale(mut self, v: f64) -> Self {
        self.config.thresholds.white_scale = v;
        self
    }

    pub fn aspect_target(mut self, v: f64) -> Self {
        self.config.thresholds.aspect_target = v;
        self
    }

    pub fn component_divisor(mut self, v: f64) -> Self {
        self.config.thresholds.component_divisor = v;
        self
    }

    pub fn edge_scale(mut self, v: f64) -> Self {
        self.config.thresholds.edge_scale = v;
        self
    }

    pub fn canny_thresholds(mut self, low: f32, high: f32) -> Self {
        self.config.thresholds.canny_low = low;
        self.config.thresholds.canny_high = high;
        self
    }

    pub fn image_accept_threshold(mut self, v: f64) -> Self {
        self.config.thresholds.image_accept_threshold = v;
        self
    }

    pub fn font_height_ratio(mut self, ratio: f32) -> Self {
        self.config.font_height_ratio = ratio;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_paths.push(path.into());
        self
    }

    pub fn max_raster_dimension(mut self, px: u32) -> Self {
        self.config.max_raster_dimension = px.max(1);
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DetectionConfig, FormulaError> {
        let t = &self.config.thresholds;
        if !(t.color_threshold.is_finite() && t.color_threshold >= 0.0) {
            return Err(FormulaError::InvalidConfig(format!(
                "colour threshold must be a finite value ≥ 0, got {}",
                t.color_threshold
            )));
        }
        if !(t.component_divisor.is_finite() && t.component_divisor > 0.0) {
            return Err(FormulaError::InvalidConfig(format!(
                "component divisor must be > 0, got {}",
                t.component_divisor
            )));
        }
        for (name, v) in [
            ("white scale", t.white_scale),
            ("edge scale", t.edge_scale),
            ("aspect target", t.aspect_target),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(FormulaError::InvalidConfig(format!(
                    "{name} must be a finite value ≥ 0, got {v}"
                )));
            }
        }
        if !(t.canny_low >= 0.0 && t.canny_low <= t.canny_high) {
            return Err(FormulaError::InvalidConfig(format!(
                "Canny thresholds must satisfy 0 ≤ low ≤ high, got {}/{}",
                t.canny_low, t.canny_high
            )));
        }
        if !t.image_accept_threshold.is_finite() {
            return Err(FormulaError::InvalidConfig(
                "image acceptance threshold must be finite".into(),
            ));
        }
        let r = self.config.font_height_ratio;
        if !(r > 0.0 && r <= 1.0) {
            return Err(FormulaError::InvalidConfig(format!(
                "font height ratio must be in (0, 1], got {r}"
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Scan all pages (default).
    #[default]
    All,
    /// Scan a single page (1-indexed).
    Single(usize),
    /// Scan a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Scan specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Lowest page the selection asks for (1-indexed), `0` for [`PageSelection::All`].
    pub fn first_requested(&self) -> usize {
        match self {
            PageSelection::All => 0,
            PageSelection::Single(p) => *p,
            PageSelection::Range(start, _) => *start,
            PageSelection::Set(pages) => pages.iter().min().copied().unwrap_or(0),
        }
    }
}
