//! Candidate encoding: `RgbImage` → PNG bytes / base64 data URI.
//!
//! Accepted candidates are handed to a recognition service (image in, LaTeX
//! out) or written to disk for review. Both take PNG: it is lossless, and
//! compression artefacts around thin strokes (fraction bars, sub/superscript
//! glyphs) hurt recognition far more than file size does.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::RgbImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a pixel buffer as PNG.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a pixel buffer as a `data:image/png;base64,…` URI, the image form
/// accepted by vision/recognition APIs.
pub fn to_data_uri(img: &RgbImage) -> Result<String, image::ImageError> {
    let png = encode_png(img)?;
    let b64 = STANDARD.encode(&png);
    debug!("Encoded {}x{} candidate → {} bytes base64", img.width(), img.height(), b64.len());
    Ok(format!("data:image/png;base64,{b64}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn encode_small_image() {
        let img = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let uri = to_data_uri(&img).expect("encode should succeed");
        let b64 = uri
            .strip_prefix("data:image/png;base64,")
            .expect("data uri prefix");
        let decoded = STANDARD.decode(b64).expect("valid base64");
        assert_eq!(&decoded[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn png_decodes_back_to_same_dimensions() {
        let img = RgbImage::from_pixel(7, 3, Rgb([255, 255, 255]));
        let png = encode_png(&img).expect("encode");
        let back = image::load_from_memory(&png).expect("decode").to_rgb8();
        assert_eq!(back.dimensions(), (7, 3));
    }
}
