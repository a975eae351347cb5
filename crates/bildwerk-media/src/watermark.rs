// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Watermark renderer — rasterizes a text layer sized relative to the target
// image. Glyphs come from an embedded public-domain 5x7 pixel font scaled to
// the derived size, so rendering needs no font files on the host.

use bildwerk_core::error::{BildwerkError, Result};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use tracing::{debug, instrument};

use crate::codec::Overlay;

/// Glyph cell geometry of the embedded font: 5 columns x 7 rows, with one
/// blank column of advance between characters.
const GLYPH_COLS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_COLS + 1;

/// Fraction of the target image width used as the watermark glyph height.
const FONT_WIDTH_FRACTION: f32 = 0.05;

/// Fractional anchor for the text's right edge and baseline.
const ANCHOR_FRACTION: f32 = 0.95;

/// Render a text watermark layer for an image of the given dimensions.
///
/// The glyph height is derived as 5% of the target width so the watermark
/// keeps its proportion across image sizes. The text is white, right-aligned
/// with its baseline near the 95% width/height mark, and carries
/// `opacity` as its alpha. Opacity 0 still renders a fully transparent
/// layer so downstream compositing stays uniform.
///
/// The only failure mode is an opacity outside [0, 1].
#[instrument(skip(text), fields(text_len = text.len(), opacity, target_width, target_height))]
pub fn render_watermark(
    text: &str,
    opacity: f32,
    target_width: u32,
    target_height: u32,
) -> Result<Overlay> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(BildwerkError::InvalidOptions(format!(
            "watermark opacity must be within [0, 1], got {opacity}"
        )));
    }

    let mut layer = RgbaImage::from_pixel(target_width, target_height, Rgba([0, 0, 0, 0]));

    // Integer scale factor mapping the 7-row glyph grid to the derived
    // glyph height (5% of the image width), never below 1.
    let font_px = ((target_width as f32 * FONT_WIDTH_FRACTION) as u32).max(1);
    let scale = (font_px / GLYPH_ROWS).max(1);

    let chars: Vec<char> = text.chars().collect();
    let text_width = (chars.len() as u32 * GLYPH_ADVANCE).saturating_sub(1) * scale;
    let text_height = GLYPH_ROWS * scale;

    // Right edge and baseline sit at the 95% marks, clamped into frame.
    let right_edge = (target_width as f32 * ANCHOR_FRACTION) as i64;
    let baseline = (target_height as f32 * ANCHOR_FRACTION) as i64;
    let origin_x = (right_edge - text_width as i64).max(0);
    let origin_y = (baseline - text_height as i64).max(0);

    let alpha = (opacity * 255.0).round() as u8;
    let fill = Rgba([255, 255, 255, alpha]);

    for (index, ch) in chars.iter().enumerate() {
        let glyph = glyph_columns(*ch);
        let glyph_x = origin_x + (index as u32 * GLYPH_ADVANCE * scale) as i64;

        for (col, bits) in glyph.iter().enumerate() {
            for row in 0..GLYPH_ROWS {
                if bits >> row & 1 == 0 {
                    continue;
                }
                let x = glyph_x + (col as u32 * scale) as i64;
                let y = origin_y + (row * scale) as i64;
                // Rects falling outside the layer are clipped by imageproc.
                draw_filled_rect_mut(
                    &mut layer,
                    Rect::at(x as i32, y as i32).of_size(scale, scale),
                    fill,
                );
            }
        }
    }

    debug!(scale, text_width, "Watermark layer rendered");
    Ok(Overlay::full_bleed(layer))
}

/// Column bitmap for one character; bit 0 of each byte is the top row.
///
/// Characters outside the printable ASCII range fall back to `?`.
fn glyph_columns(ch: char) -> [u8; GLYPH_COLS as usize] {
    let index = (ch as usize).wrapping_sub(0x20);
    if index < FONT_5X7.len() {
        FONT_5X7[index]
    } else {
        FONT_5X7[b'?' as usize - 0x20]
    }
}

/// Classic 5x7 LCD dot-matrix font, printable ASCII 0x20-0x7E.
/// Column-major, LSB = top row. Public domain glyph data.
#[rustfmt::skip]
const FONT_5X7: [[u8; 5]; 95] = [
    [0x00, 0x00, 0x00, 0x00, 0x00], // space
    [0x00, 0x00, 0x5f, 0x00, 0x00], // !
    [0x00, 0x07, 0x00, 0x07, 0x00], // "
    [0x14, 0x7f, 0x14, 0x7f, 0x14], // #
    [0x24, 0x2a, 0x7f, 0x2a, 0x12], // $
    [0x23, 0x13, 0x08, 0x64, 0x62], // %
    [0x36, 0x49, 0x55, 0x22, 0x50], // &
    [0x00, 0x05, 0x03, 0x00, 0x00], // '
    [0x00, 0x1c, 0x22, 0x41, 0x00], // (
    [0x00, 0x41, 0x22, 0x1c, 0x00], // )
    [0x14, 0x08, 0x3e, 0x08, 0x14], // *
    [0x08, 0x08, 0x3e, 0x08, 0x08], // +
    [0x00, 0x50, 0x30, 0x00, 0x00], // ,
    [0x08, 0x08, 0x08, 0x08, 0x08], // -
    [0x00, 0x60, 0x60, 0x00, 0x00], // .
    [0x20, 0x10, 0x08, 0x04, 0x02], // /
    [0x3e, 0x51, 0x49, 0x45, 0x3e], // 0
    [0x00, 0x42, 0x7f, 0x40, 0x00], // 1
    [0x42, 0x61, 0x51, 0x49, 0x46], // 2
    [0x21, 0x41, 0x45, 0x4b, 0x31], // 3
    [0x18, 0x14, 0x12, 0x7f, 0x10], // 4
    [0x27, 0x45, 0x45, 0x45, 0x39], // 5
    [0x3c, 0x4a, 0x49, 0x49, 0x30], // 6
    [0x01, 0x71, 0x09, 0x05, 0x03], // 7
    [0x36, 0x49, 0x49, 0x49, 0x36], // 8
    [0x06, 0x49, 0x49, 0x29, 0x1e], // 9
    [0x00, 0x36, 0x36, 0x00, 0x00], // :
    [0x00, 0x56, 0x36, 0x00, 0x00], // ;
    [0x08, 0x14, 0x22, 0x41, 0x00], // <
    [0x14, 0x14, 0x14, 0x14, 0x14], // =
    [0x00, 0x41, 0x22, 0x14, 0x08], // >
    [0x02, 0x01, 0x51, 0x09, 0x06], // ?
    [0x32, 0x49, 0x79, 0x41, 0x3e], // @
    [0x7e, 0x11, 0x11, 0x11, 0x7e], // A
    [0x7f, 0x49, 0x49, 0x49, 0x36], // B
    [0x3e, 0x41, 0x41, 0x41, 0x22], // C
    [0x7f, 0x41, 0x41, 0x22, 0x1c], // D
    [0x7f, 0x49, 0x49, 0x49, 0x41], // E
    [0x7f, 0x09, 0x09, 0x09, 0x01], // F
    [0x3e, 0x41, 0x49, 0x49, 0x7a], // G
    [0x7f, 0x08, 0x08, 0x08, 0x7f], // H
    [0x00, 0x41, 0x7f, 0x41, 0x00], // I
    [0x20, 0x40, 0x41, 0x3f, 0x01], // J
    [0x7f, 0x08, 0x14, 0x22, 0x41], // K
    [0x7f, 0x40, 0x40, 0x40, 0x40], // L
    [0x7f, 0x02, 0x0c, 0x02, 0x7f], // M
    [0x7f, 0x04, 0x08, 0x10, 0x7f], // N
    [0x3e, 0x41, 0x41, 0x41, 0x3e], // O
    [0x7f, 0x09, 0x09, 0x09, 0x06], // P
    [0x3e, 0x41, 0x51, 0x21, 0x5e], // Q
    [0x7f, 0x09, 0x19, 0x29, 0x46], // R
    [0x46, 0x49, 0x49, 0x49, 0x31], // S
    [0x01, 0x01, 0x7f, 0x01, 0x01], // T
    [0x3f, 0x40, 0x40, 0x40, 0x3f], // U
    [0x1f, 0x20, 0x40, 0x20, 0x1f], // V
    [0x3f, 0x40, 0x38, 0x40, 0x3f], // W
    [0x63, 0x14, 0x08, 0x14, 0x63], // X
    [0x07, 0x08, 0x70, 0x08, 0x07], // Y
    [0x61, 0x51, 0x49, 0x45, 0x43], // Z
    [0x00, 0x7f, 0x41, 0x41, 0x00], // [
    [0x02, 0x04, 0x08, 0x10, 0x20], // backslash
    [0x00, 0x41, 0x41, 0x7f, 0x00], // ]
    [0x04, 0x02, 0x01, 0x02, 0x04], // ^
    [0x40, 0x40, 0x40, 0x40, 0x40], // _
    [0x00, 0x01, 0x02, 0x04, 0x00], // `
    [0x20, 0x54, 0x54, 0x54, 0x78], // a
    [0x7f, 0x48, 0x44, 0x44, 0x38], // b
    [0x38, 0x44, 0x44, 0x44, 0x20], // c
    [0x38, 0x44, 0x44, 0x48, 0x7f], // d
    [0x38, 0x54, 0x54, 0x54, 0x18], // e
    [0x08, 0x7e, 0x09, 0x01, 0x02], // f
    [0x0c, 0x52, 0x52, 0x52, 0x3e], // g
    [0x7f, 0x08, 0x04, 0x04, 0x78], // h
    [0x00, 0x44, 0x7d, 0x40, 0x00], // i
    [0x20, 0x40, 0x44, 0x3d, 0x00], // j
    [0x7f, 0x10, 0x28, 0x44, 0x00], // k
    [0x00, 0x41, 0x7f, 0x40, 0x00], // l
    [0x7c, 0x04, 0x18, 0x04, 0x78], // m
    [0x7c, 0x08, 0x04, 0x04, 0x78], // n
    [0x38, 0x44, 0x44, 0x44, 0x38], // o
    [0x7f, 0x14, 0x14, 0x14, 0x08], // p
    [0x08, 0x14, 0x14, 0x18, 0x7c], // q
    [0x7c, 0x08, 0x04, 0x04, 0x08], // r
    [0x48, 0x54, 0x54, 0x54, 0x20], // s
    [0x04, 0x3f, 0x44, 0x40, 0x20], // t
    [0x3c, 0x40, 0x40, 0x20, 0x7c], // u
    [0x1c, 0x20, 0x40, 0x20, 0x1c], // v
    [0x3c, 0x40, 0x30, 0x40, 0x3c], // w
    [0x44, 0x28, 0x10, 0x28, 0x44], // x
    [0x0c, 0x50, 0x50, 0x50, 0x3c], // y
    [0x44, 0x64, 0x54, 0x4c, 0x44], // z
    [0x00, 0x08, 0x36, 0x41, 0x00], // {
    [0x00, 0x00, 0x7f, 0x00, 0x00], // |
    [0x00, 0x41, 0x36, 0x08, 0x00], // }
    [0x08, 0x04, 0x08, 0x10, 0x08], // ~
];
