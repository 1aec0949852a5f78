//! Text rasterisation: draw an accepted text block into a pixel buffer.
//!
//! Every candidate leaves the detector as pixels, whether it started as
//! selectable text or as an embedded image. Text blocks are drawn black on
//! white into a canvas the size of their bounding box, with the font scaled
//! to a fraction (default 80%) of the box height.
//!
//! The drawing itself sits behind [`TextRasterizer`] so callers can plug in
//! their own renderer. [`GlyphRasterizer`] is the built-in one: it loads the
//! first usable TrueType/OpenType font from the configured paths, then from a
//! list of common system locations, and finally falls back to DejaVu Sans
//! compiled into the crate, so a font is always available.

use crate::config::DetectionConfig;
use crate::document::TextBlock;
use crate::error::RegionError;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// DejaVu Sans, embedded as the last-resort font (licence in `assets/`).
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Fonts tried after [`DetectionConfig::font_paths`], in order.
const SYSTEM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Draws text into a white `width × height` RGB canvas.
///
/// Implementations must be `Send + Sync`; the detector may be shared across
/// threads that scan different pages.
pub trait TextRasterizer: Send + Sync {
    fn rasterize(&self, text: &str, width: u32, height: u32) -> Result<RgbImage, RegionError>;
}

/// Built-in rasteriser backed by `ab_glyph` and `imageproc`.
pub struct GlyphRasterizer {
    font: Option<FontArc>,
    font_height_ratio: f32,
}

impl GlyphRasterizer {
    /// Load the first usable font from the config's paths, then the system
    /// list, then the bundled DejaVu Sans.
    pub fn from_config(config: &DetectionConfig) -> Self {
        let candidates = config
            .font_paths
            .iter()
            .cloned()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from));

        let mut font = None;
        for path in candidates {
            match load_font(&path) {
                Some(f) => {
                    info!("Text rasteriser using font {}", path.display());
                    font = Some(f);
                    break;
                }
                None => debug!("Font not usable: {}", path.display()),
            }
        }
        if font.is_none() {
            font = bundled_font();
            match font {
                Some(_) => info!("Text rasteriser using bundled DejaVu Sans"),
                None => warn!("No usable font found; text candidates will be dropped"),
            }
        }

        Self {
            font,
            font_height_ratio: config.font_height_ratio,
        }
    }

    /// Use an already-parsed font.
    pub fn with_font(font: FontArc, font_height_ratio: f32) -> Self {
        Self {
            font: Some(font),
            font_height_ratio,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }
}

impl std::fmt::Debug for GlyphRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphRasterizer")
            .field("font", &self.font.as_ref().map(|_| "<FontArc>"))
            .field("font_height_ratio", &self.font_height_ratio)
            .finish()
    }
}

fn load_font(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

/// The font compiled into the crate.
pub fn bundled_font() -> Option<FontArc> {
    FontArc::try_from_slice(BUNDLED_FONT).ok()
}

impl TextRasterizer for GlyphRasterizer {
    fn rasterize(&self, text: &str, width: u32, height: u32) -> Result<RgbImage, RegionError> {
        let font = self.font.as_ref().ok_or_else(|| RegionError::Rasterize {
            page: 0,
            index: 0,
            detail: "no usable font".into(),
        })?;

        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        let px = (height as f32 * self.font_height_ratio).max(1.0);
        let scale = PxScale::from(px);

        for (line_no, line) in text.lines().enumerate() {
            let y = (line_no as f32 * px) as i32;
            if y >= height as i32 {
                break;
            }
            draw_text_mut(&mut canvas, Rgb([0, 0, 0]), 0, y, scale, font, line);
        }
        Ok(canvas)
    }
}

/// Rasterise an accepted block into a canvas the size of its bounding box.
///
/// Never panics and never retries: zero-area or oversized boxes and any
/// failure inside the rasteriser come back as [`RegionError::Rasterize`].
pub fn rasterize_block(
    rasterizer: &dyn TextRasterizer,
    block: &TextBlock,
    config: &DetectionConfig,
) -> Result<RgbImage, RegionError> {
    let fail = |detail: String| RegionError::Rasterize {
        page: 0,
        index: 0,
        detail,
    };

    let (w, h) = (block.bbox.width(), block.bbox.height());
    if !(w.is_finite() && h.is_finite()) {
        return Err(fail(format!("non-finite bounding box {:?}", block.bbox)));
    }
    // Truncate like an integer cast of the box extent.
    let (width, height) = (w as u32, h as u32);
    if width == 0 || height == 0 {
        return Err(fail(format!("zero-area canvas {width}x{height}")));
    }
    let max = config.max_raster_dimension;
    if width > max || height > max {
        return Err(fail(format!(
            "canvas {width}x{height} exceeds the {max}px limit"
        )));
    }

    let drawn = panic::catch_unwind(AssertUnwindSafe(|| {
        rasterizer.rasterize(&block.text, width, height)
    }))
    .unwrap_or_else(|_| Err(fail("rasteriser panicked".into())))?;

    if drawn.dimensions() != (width, height) {
        return Err(fail(format!(
            "rasteriser returned {:?}, expected {width}x{height}",
            drawn.dimensions()
        )));
    }
    Ok(drawn)
}
