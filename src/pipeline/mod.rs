//! Detection stages.
//!
//! Each submodule implements one step; [`walk`] drives them per page.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf ──▶ walk ─┬─ text ──▶ rasterize ─┐
//! (path)   (pdfium)       └─ color ──▶ features ─┴──▶ candidates ──▶ encode
//! ```
//!
//! 1. [`input`]     — validate the user-supplied path before pdfium sees it
//! 2. [`pdf`]       — decode each selected page into text blocks and RGB images
//! 3. [`text`]      — pattern-family classification of text blocks
//! 4. [`rasterize`] — draw accepted text into a pixel buffer the size of its box
//! 5. [`color`]     — reject colour images before scoring
//! 6. [`features`]  — structural scoring of the remaining images
//! 7. [`walk`]      — run 3–6 over each page and assemble candidates in order
//! 8. [`encode`]    — PNG / data-URI encoding for export and recognition

pub mod color;
pub mod encode;
pub mod features;
pub mod input;
pub mod pdf;
pub mod rasterize;
pub mod text;
pub mod walk;
