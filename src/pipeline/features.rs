//! Image feature scoring for regions that passed the colour gate.
//!
//! Four structural sub-scores, each in `[0, 1]`, are averaged without
//! weights into the region's confidence:
//!
//! 1. **Background**: share of near-white pixels. Formulas sit on paper.
//! 2. **Aspect**: `1 − min(|h/w − target|, 1)`. Peaks at the target ratio and
//!    decays linearly for strips.
//! 3. **Components**: external ink contours divided by a saturation count.
//!    Symbolic notation is many small glyphs.
//! 4. **Edges**: Canny edge-pixel share times a scale. Dense strokes produce
//!    far more edges than flat graphics. imageproc's Canny pre-blurs
//!    (σ = 1.4) and uses an L2 gradient, so hairline strokes yield fewer
//!    edge pixels than an unblurred detector would; `edge_scale` absorbs it.
//!
//! The unweighted mean is what the acceptance threshold was tuned against;
//! keep it unweighted.

use crate::config::DetectionThresholds;
use crate::error::RegionError;
use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::edges::canny;
use std::panic;
use tracing::debug;

/// The four sub-scores behind an image confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureScores {
    pub background: f64,
    pub aspect: f64,
    pub components: f64,
    pub edges: f64,
}

impl FeatureScores {
    /// Unweighted mean of the sub-scores, clamped to `[0, 1]`.
    pub fn fused(&self) -> f64 {
        ((self.background + self.aspect + self.components + self.edges) / 4.0).clamp(0.0, 1.0)
    }
}

/// Outcome of [`score_image`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageScore {
    pub is_formula: bool,
    pub confidence: f64,
    /// The sub-scores, or why the region was failed closed.
    pub features: Result<FeatureScores, RegionError>,
}

/// Single-channel intensity using BT.601 luma weights.
pub fn to_intensity(pixels: &RgbImage) -> GrayImage {
    GrayImage::from_fn(pixels.width(), pixels.height(), |x, y| {
        let [r, g, b] = pixels.get_pixel(x, y).0;
        let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
        Luma([((weighted + 500) / 1000) as u8])
    })
}

/// Compute the four sub-scores, or explain why they cannot be computed.
pub fn extract_features(
    pixels: &RgbImage,
    thresholds: &DetectionThresholds,
) -> Result<FeatureScores, RegionError> {
    let (width, height) = pixels.dimensions();
    if width == 0 || height == 0 {
        return Err(RegionError::ImageScore {
            page: 0,
            index: 0,
            detail: format!("empty image ({width}x{height})"),
        });
    }

    let gray = to_intensity(pixels);
    let total = f64::from(width) * f64::from(height);
    let near_white = thresholds.near_white_threshold;

    // 1. Background
    let white = gray.pixels().filter(|p| p.0[0] > near_white).count();
    let white_ratio = white as f64 / total;
    let background = (white_ratio * thresholds.white_scale).min(1.0);
    debug!("Background score: {background:.2} (ratio: {white_ratio:.2})");

    // 2. Aspect
    let aspect_ratio = f64::from(height) / f64::from(width);
    let aspect = 1.0 - (aspect_ratio - thresholds.aspect_target).abs().min(1.0);
    debug!("Aspect score: {aspect:.2} (ratio: {aspect_ratio:.2})");

    // 3. Components: binarise inverted so ink is foreground, inside a one-pixel
    // blank frame; a border is only traced as `Outer` when it starts at x > 0.
    let ink = GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let inside = (1..=width).contains(&x) && (1..=height).contains(&y);
        if inside && gray.get_pixel(x - 1, y - 1).0[0] <= near_white {
            Luma([255])
        } else {
            Luma([0])
        }
    });
    let external = count_external(&find_contours::<i32>(&ink));
    let components = (external as f64 / thresholds.component_divisor).min(1.0);
    debug!("Component score: {components:.2} (found {external} components)");

    // 4. Edges
    let edge_map = canny(&gray, thresholds.canny_low, thresholds.canny_high);
    let edge_pixels = edge_map.pixels().filter(|p| p.0[0] > 0).count();
    let edge_ratio = edge_pixels as f64 / total;
    let edges = (edge_ratio * thresholds.edge_scale).min(1.0);
    debug!("Edge score: {edges:.2} (ratio: {edge_ratio:.2})");

    let scores = FeatureScores {
        background,
        aspect,
        components,
        edges,
    };
    if ![background, aspect, components, edges]
        .iter()
        .all(|s| s.is_finite() && *s >= 0.0)
    {
        return Err(RegionError::ImageScore {
            page: 0,
            index: 0,
            detail: format!("non-finite feature scores: {scores:?}"),
        });
    }
    Ok(scores)
}

/// Outer borders with no enclosing outer border, at any depth.
///
/// Holes in between do not count as enclosure breaks: ink inside a ring's
/// hole is still inside the ring.
fn count_external(contours: &[Contour<i32>]) -> usize {
    contours
        .iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .filter(|c| {
            let mut parent = c.parent;
            while let Some(i) = parent {
                let Some(p) = contours.get(i) else { break };
                if p.border_type == BorderType::Outer {
                    return false;
                }
                parent = p.parent;
            }
            true
        })
        .count()
}

/// Score a region that has already passed the colour gate.
///
/// Any failure yields `(false, 0.0)` with the error in `features`; scoring
/// is never retried.
pub fn score_image(pixels: &RgbImage, thresholds: &DetectionThresholds) -> ImageScore {
    // imageproc filters can panic on degenerate inputs; a panic is a region failure too.
    let features = panic::catch_unwind(|| extract_features(pixels, thresholds))
        .unwrap_or_else(|_| {
            Err(RegionError::ImageScore {
                page: 0,
                index: 0,
                detail: format!(
                    "feature extraction panicked on {}x{} image",
                    pixels.width(),
                    pixels.height()
                ),
            })
        });
    match features {
        Ok(scores) => {
            let confidence = scores.fused();
            debug!("Image confidence: {confidence:.2}");
            ImageScore {
                is_formula: confidence > thresholds.image_accept_threshold,
                confidence,
                features: Ok(scores),
            }
        }
        Err(e) => ImageScore {
            is_formula: false,
            confidence: 0.0,
            features: Err(e),
        },
    }
}
