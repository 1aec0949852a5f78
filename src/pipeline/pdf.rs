//! PDF document source: decode pages into [`Page`]s via pdfium.
//!
//! Text comes from pdfium's text segments (runs of characters sharing a
//! baseline and font), so a block is roughly one line of a paragraph or one
//! typeset display formula. Images come from the page's image objects,
//! decoded to 8-bit RGB regardless of their stored colour space.
//!
//! Bounding boxes are pdfium page coordinates: points, origin bottom-left,
//! y increasing upwards. They are passed through unchanged.
//!
//! pdfium is not async-safe; everything here is blocking and is run on a
//! `spawn_blocking` thread by the async entry points.

use crate::document::{BoundingBox, ImageRegion, Page, TextBlock};
use crate::error::{FormulaError, RegionError};
use crate::output::DocumentInfo;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable pointing at a pdfium shared library (file or directory).
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Bind the pdfium library.
///
/// Tried in order: `PDFIUM_LIB_PATH`, the working directory, the system
/// library search path.
pub fn bind_pdfium() -> Result<Pdfium, FormulaError> {
    let mut attempts = Vec::new();

    if let Some(configured) = std::env::var_os(PDFIUM_LIB_PATH_ENV) {
        let configured = PathBuf::from(configured);
        let lib = if configured.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(&configured)
        } else {
            configured
        };
        match Pdfium::bind_to_library(&lib) {
            Ok(bindings) => {
                debug!("Bound pdfium from {}", lib.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => attempts.push(format!("{}: {e:?}", lib.display())),
        }
    }

    let local = Pdfium::pdfium_platform_library_name_at_path("./");
    match Pdfium::bind_to_library(&local) {
        Ok(bindings) => {
            debug!("Bound pdfium from {}", local.display());
            return Ok(Pdfium::new(bindings));
        }
        Err(e) => attempts.push(format!("{}: {e:?}", local.display())),
    }

    match Pdfium::bind_to_system_library() {
        Ok(bindings) => {
            debug!("Bound system pdfium");
            Ok(Pdfium::new(bindings))
        }
        Err(e) => {
            attempts.push(format!("system library: {e:?}"));
            Err(FormulaError::PdfiumBindingFailed(attempts.join("; ")))
        }
    }
}

/// Open a PDF, mapping pdfium's load failures onto [`FormulaError`].
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, FormulaError> {
    let document = pdfium.load_pdf_from_file(path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                FormulaError::WrongPassword {
                    path: path.to_path_buf(),
                }
            } else {
                FormulaError::PasswordRequired {
                    path: path.to_path_buf(),
                }
            }
        } else {
            FormulaError::CorruptPdf {
                path: path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    info!(
        "PDF loaded: {} ({} pages)",
        path.display(),
        document.pages().len()
    );
    Ok(document)
}

/// Load page `index` (0-based) and decode it.
///
/// Any failure is confined to the page and comes back as
/// [`RegionError::PageLoad`].
pub fn load_page(document: &PdfDocument<'_>, index: usize) -> Result<Page, RegionError> {
    let page_load = |detail: String| RegionError::PageLoad {
        page: index + 1,
        detail,
    };
    let page_index =
        u16::try_from(index).map_err(|_| page_load(format!("page index {index} out of range")))?;
    let page = document
        .pages()
        .get(page_index)
        .map_err(|e| page_load(format!("{e:?}")))?;
    decode_page(&page, index)
}

/// Decode one pdfium page into text blocks and image regions, in document order.
pub fn decode_page(page: &PdfPage<'_>, index: usize) -> Result<Page, RegionError> {
    let page_num = index + 1;
    let mut decoded = Page::new(index);

    // ── Text ─────────────────────────────────────────────────────────────
    let text = page.text().map_err(|e| RegionError::PageLoad {
        page: page_num,
        detail: format!("text extraction failed: {e:?}"),
    })?;
    for segment in text.segments().iter() {
        let content = segment.text();
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        let bounds = segment.bounds();
        decoded.text_blocks.push(TextBlock::new(
            content,
            BoundingBox::new(
                f64::from(bounds.left().value),
                f64::from(bounds.bottom().value),
                f64::from(bounds.right().value),
                f64::from(bounds.top().value),
            ),
        ));
    }

    // ── Images ───────────────────────────────────────────────────────────
    for object in page.objects().iter() {
        let Some(image) = object.as_image_object() else {
            continue;
        };
        let bounds = object
            .bounds()
            .map(|b| {
                BoundingBox::new(
                    f64::from(b.left().value),
                    f64::from(b.bottom().value),
                    f64::from(b.right().value),
                    f64::from(b.top().value),
                )
            })
            .map_err(|e| format!("{e:?}"));
        if let Err(e) = &bounds {
            warn!("Page {page_num}: image object without bounds: {e}");
        }
        let pixels = bounds.is_ok().then(|| {
            image
                .get_raw_image()
                .map(|raw| raw.to_rgb8())
                .map_err(|e| format!("{e:?}"))
        });
        decoded.images.push(image_region(bounds, pixels));
    }

    debug!(
        "Decoded page {page_num}: {} text blocks, {} images",
        decoded.text_blocks.len(),
        decoded.images.len()
    );
    Ok(decoded)
}

/// Pair an image object's geometry with its pixels.
///
/// Missing bounds make the region undecodable: its geometry is not in the
/// source, so it must not reach the scorer. `pixels` is `None` when decoding
/// was skipped for that reason.
fn image_region(
    bounds: Result<BoundingBox, String>,
    pixels: Option<Result<RgbImage, String>>,
) -> ImageRegion {
    let placeholder = BoundingBox::new(0.0, 0.0, 0.0, 0.0);
    match (bounds, pixels) {
        (Err(e), _) => {
            ImageRegion::undecodable(format!("image object has no bounds: {e}"), placeholder)
        }
        (Ok(bbox), Some(Ok(rgb))) => ImageRegion::new(rgb, bbox),
        (Ok(bbox), Some(Err(e))) => ImageRegion::undecodable(e, bbox),
        (Ok(bbox), None) => ImageRegion::undecodable("image was not decoded", bbox),
    }
}

/// Document summary without scanning any page.
pub fn document_info(document: &PdfDocument<'_>) -> DocumentInfo {
    let metadata = document.metadata();
    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentInfo {
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
    }
}
