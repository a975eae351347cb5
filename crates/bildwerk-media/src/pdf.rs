// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF exporter — wraps one raster image in a single-page PDF sized to the
// image's pixel dimensions, using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use bildwerk_core::error::{BildwerkError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

/// Millimetres per PostScript point.
const MM_PER_PT: f32 = 25.4 / 72.0;

/// Render an encoded image into a one-page PDF.
///
/// The page is sized to the image's pixel dimensions at one point per pixel
/// with no margins, and the image is placed full-bleed at the origin — the
/// PDF is a print-ready wrapper around the exact raster, not a scaled
/// layout.
#[instrument(skip(image_bytes), fields(bytes_len = image_bytes.len()))]
pub fn export_single_page_pdf(image_bytes: &[u8]) -> Result<Vec<u8>> {
    // Decode to get dimensions and pixel data for embedding.
    let dynamic_image = image::load_from_memory(image_bytes)
        .map_err(|err| BildwerkError::Pdf(format!("failed to decode image for PDF: {err}")))?;

    let img_width = dynamic_image.width() as usize;
    let img_height = dynamic_image.height() as usize;

    info!(img_width, img_height, "Creating single-page PDF");

    // Convert to RGB8 for printpdf.
    let rgb_image = dynamic_image.to_rgb8();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb_image.into_raw()),
        width: img_width,
        height: img_height,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    let mut doc = PdfDocument::new("Bildwerk Merge");
    let xobject_id = doc.add_image(&raw);

    // One pixel maps to one point; at 72 dpi the XObject renders at its
    // native pixel size, filling the page edge to edge.
    let page_w = Mm(img_width as f32 * MM_PER_PT);
    let page_h = Mm(img_height as f32 * MM_PER_PT);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: None,
            scale_y: None,
            dpi: Some(72.0),
            rotate: None,
        },
    }];

    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

    debug!("Image placed full-bleed");

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let output = doc.save(&PdfSaveOptions::default(), &mut warnings);

    Ok(output)
}
