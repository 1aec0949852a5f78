//! Colour gate: cheap rejection of photographs, logos and figures.
//!
//! Typeset formulas are black ink on white paper, so their red, green and
//! blue channels move together. The gate measures the mean absolute
//! difference between each pair of channels; if any pair differs on average
//! by more than the configured threshold the region is colour content and is
//! dropped before the feature scorer ever sees it.

use crate::config::DetectionThresholds;
use crate::error::RegionError;
use image::RgbImage;
use tracing::{debug, warn};

/// Mean absolute per-pixel difference between each pair of channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelDeltas {
    pub red_green: f64,
    pub red_blue: f64,
    pub green_blue: f64,
}

impl ChannelDeltas {
    pub fn max(&self) -> f64 {
        self.red_green.max(self.red_blue).max(self.green_blue)
    }
}

/// Compute [`ChannelDeltas`] for a region.
///
/// Fails on an empty buffer, where a mean is undefined.
pub fn channel_deltas(pixels: &RgbImage) -> Result<ChannelDeltas, RegionError> {
    let count = u64::from(pixels.width()) * u64::from(pixels.height());
    if count == 0 {
        return Err(RegionError::ColorGate {
            page: 0,
            index: 0,
            detail: format!("empty image ({}x{})", pixels.width(), pixels.height()),
        });
    }

    let (mut rg, mut rb, mut gb) = (0u64, 0u64, 0u64);
    for px in pixels.pixels() {
        let [r, g, b] = px.0;
        rg += u64::from(r.abs_diff(g));
        rb += u64::from(r.abs_diff(b));
        gb += u64::from(g.abs_diff(b));
    }

    let n = count as f64;
    Ok(ChannelDeltas {
        red_green: rg as f64 / n,
        red_blue: rb as f64 / n,
        green_blue: gb as f64 / n,
    })
}

/// True when the region should be rejected as colour content.
///
/// Fails closed: if the statistics cannot be computed the region is treated
/// as colour, so a broken image never surfaces as a formula.
pub fn is_color_image(pixels: &RgbImage, thresholds: &DetectionThresholds) -> bool {
    match channel_deltas(pixels) {
        Ok(deltas) => {
            let color = deltas.red_green > thresholds.color_threshold
                || deltas.red_blue > thresholds.color_threshold
                || deltas.green_blue > thresholds.color_threshold;
            debug!(
                "Colour gate: max channel delta {:.2} (threshold {:.2}) → {}",
                deltas.max(),
                thresholds.color_threshold,
                if color { "colour" } else { "monochrome" }
            );
            color
        }
        Err(e) => {
            warn!("{e}; treating region as colour");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn thresholds(color_threshold: f64) -> DetectionThresholds {
        DetectionThresholds {
            color_threshold,
            ..DetectionThresholds::default()
        }
    }

    #[test]
    fn pure_red_is_rejected() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 0, 0]));
        let d = channel_deltas(&img).expect("deltas");
        assert_eq!(d.red_green, 255.0);
        assert_eq!(d.red_blue, 255.0);
        assert_eq!(d.green_blue, 0.0);
        assert!(is_color_image(&img, &DetectionThresholds::default()));
    }

    #[test]
    fn exact_grayscale_never_rejected() {
        let img = RgbImage::from_fn(64, 64, |x, y| {
            let v = ((x * 4 + y) % 256) as u8;
            Rgb([v, v, v])
        });
        for t in [0.0, 0.5, 10.0, 100.0] {
            assert!(!is_color_image(&img, &thresholds(t)), "threshold {t}");
        }
    }

    #[test]
    fn near_grayscale_passes_above_its_true_delta() {
        // Every pixel differs by exactly 2 between red and the other channels.
        let img = RgbImage::from_fn(32, 32, |x, _| {
            let v = (x * 7 % 250) as u8;
            Rgb([v + 2, v, v])
        });
        let d = channel_deltas(&img).expect("deltas");
        assert_eq!(d.max(), 2.0);
        assert!(!is_color_image(&img, &thresholds(2.0)));
        assert!(!is_color_image(&img, &DetectionThresholds::default()));
        assert!(is_color_image(&img, &thresholds(1.5)));
    }

    #[test]
    fn small_colour_patch_on_white_passes() {
        // A 5% red logo corner averages to a delta well under 10.
        let img = RgbImage::from_fn(100, 100, |x, y| {
            if x < 10 && y < 50 {
                Rgb([200, 40, 40])
            } else {
                Rgb([255, 255, 255])
            }
        });
        let d = channel_deltas(&img).expect("deltas");
        assert!((d.red_green - 8.0).abs() < 1e-9, "got {}", d.red_green);
        assert!(!is_color_image(&img, &DetectionThresholds::default()));
    }

    #[test]
    fn empty_image_fails_closed() {
        let img = RgbImage::new(0, 0);
        assert!(channel_deltas(&img).is_err());
        assert!(is_color_image(&img, &DetectionThresholds::default()));
    }
}
