//! Page content as handed over by the document-decoding collaborator.
//!
//! These types are the input boundary of the detector: an ordered list of
//! text blocks and an ordered list of embedded images per page, each with a
//! bounding box in page coordinates. Geometry is passed through untouched;
//! the detector never validates or flips it.

use crate::error::RegionError;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned box in page coordinates, `(x0, y0)`–`(x1, y1)`.
///
/// The y-axis convention is whatever the source uses (pdfium reports y-up
/// points); it is preserved unchanged into every candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }
}

/// A run of selectable text and where it sits on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    pub bbox: BoundingBox,
}

impl TextBlock {
    pub fn new(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// An embedded raster image, decoded to 8-bit RGB.
///
/// `pixels` is an `Err` when the collaborator found the image object but
/// could not decode it; the walker drops such regions without scoring them.
#[derive(Debug, Clone)]
pub struct ImageRegion {
    pub pixels: Result<RgbImage, RegionError>,
    pub bbox: BoundingBox,
}

impl ImageRegion {
    pub fn new(pixels: RgbImage, bbox: BoundingBox) -> Self {
        Self {
            pixels: Ok(pixels),
            bbox,
        }
    }

    /// An image object whose pixel data could not be decoded.
    pub fn undecodable(detail: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            pixels: Err(RegionError::ImageDecode {
                page: 0,
                index: 0,
                detail: detail.into(),
            }),
            bbox,
        }
    }
}

/// One page of a document: text blocks and images, each in document order.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// 0-indexed position of the page in the document.
    pub index: usize,
    pub text_blocks: Vec<TextBlock>,
    pub images: Vec<ImageRegion>,
}

impl Page {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>, bbox: BoundingBox) -> Self {
        self.text_blocks.push(TextBlock::new(text, bbox));
        self
    }

    pub fn with_image(mut self, pixels: RgbImage, bbox: BoundingBox) -> Self {
        self.images.push(ImageRegion::new(pixels, bbox));
        self
    }

    pub fn with_region(mut self, region: ImageRegion) -> Self {
        self.images.push(region);
        self
    }

    /// 1-indexed page number, as used in logs and errors.
    pub fn page_num(&self) -> usize {
        self.index + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_extent_ignores_axis_direction() {
        // y-up source: y0 is the top edge, numerically larger
        let b = BoundingBox::new(10.0, 700.0, 110.0, 680.0);
        assert_eq!(b.width(), 100.0);
        assert_eq!(b.height(), 20.0);
    }

    #[test]
    fn page_builder_keeps_document_order() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let page = Page::new(2)
            .with_text("first", bbox)
            .with_text("second", bbox)
            .with_image(RgbImage::new(2, 2), bbox);
        assert_eq!(page.page_num(), 3);
        assert_eq!(page.text_blocks[0].text, "first");
        assert_eq!(page.text_blocks[1].text, "second");
        assert_eq!(page.images.len(), 1);
    }

    #[test]
    fn undecodable_region_carries_detail() {
        let region = ImageRegion::undecodable("truncated stream", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        match region.pixels {
            Err(RegionError::ImageDecode { detail, .. }) => assert_eq!(detail, "truncated stream"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
