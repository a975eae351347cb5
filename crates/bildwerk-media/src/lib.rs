// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// bildwerk-media — Pixel-level operations for the Bildwerk engine.
//
// Provides the codec adapter (decode, composite, encode), watermark
// rendering, size-targeted compression, layout merging, EXIF carry-over,
// and single-page PDF export. Everything here is synchronous and CPU-bound;
// storage and orchestration live in bildwerk-pipeline.

pub mod codec;
pub mod compress;
pub mod merge;
pub mod metadata;
pub mod pdf;
pub mod watermark;

// Re-export the primary entry points so callers can use
// `bildwerk_media::ImageCodec` etc.
pub use codec::{ImageCodec, Overlay, convert, encoder_available};
pub use compress::{CompressedImage, compress_to_target};
pub use merge::{LayoutPlan, MergedImage, merge_images, plan_layout};
pub use metadata::carry_exif;
pub use pdf::export_single_page_pdf;
pub use watermark::render_watermark;
