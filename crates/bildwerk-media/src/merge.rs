// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout compositor — places multiple images onto one background canvas
// using a horizontal strip, vertical strip, or square-ish grid, then encodes
// the result through the codec adapter.

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{MergeDirection, MergeOptions};
use tracing::{info, instrument};

use crate::codec::{ImageCodec, Overlay};

/// Canvas dimensions and per-image placement offsets for one merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutPlan {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// (left, top) of each input, in input order.
    pub placements: Vec<(i64, i64)>,
}

/// Compute canvas size and placements for the given image dimensions.
///
/// Horizontal: widths are summed with `spacing` between consecutive images
/// (none trailing), the canvas is as tall as the tallest image, and each
/// image is vertically centered. Vertical is the symmetric case.
///
/// Grid: `ceil(sqrt(n))` columns of max-extent cells in row-major order.
/// Images sit at the cell origin rather than centered within the cell —
/// a deliberate placement policy, not an oversight.
pub fn plan_layout(dims: &[(u32, u32)], direction: MergeDirection, spacing: u32) -> LayoutPlan {
    if dims.is_empty() {
        return LayoutPlan {
            canvas_width: 0,
            canvas_height: 0,
            placements: Vec::new(),
        };
    }

    match direction {
        MergeDirection::Horizontal => {
            let canvas_height = dims.iter().map(|(_, h)| *h).max().unwrap_or(0);
            let canvas_width = dims.iter().map(|(w, _)| *w).sum::<u32>()
                + spacing * dims.len().saturating_sub(1) as u32;

            let mut placements = Vec::with_capacity(dims.len());
            let mut x: i64 = 0;
            for (w, h) in dims {
                let top = ((canvas_height - h) / 2) as i64;
                placements.push((x, top));
                x += (*w + spacing) as i64;
            }
            LayoutPlan {
                canvas_width,
                canvas_height,
                placements,
            }
        }
        MergeDirection::Vertical => {
            let canvas_width = dims.iter().map(|(w, _)| *w).max().unwrap_or(0);
            let canvas_height = dims.iter().map(|(_, h)| *h).sum::<u32>()
                + spacing * dims.len().saturating_sub(1) as u32;

            let mut placements = Vec::with_capacity(dims.len());
            let mut y: i64 = 0;
            for (w, h) in dims {
                let left = ((canvas_width - w) / 2) as i64;
                placements.push((left, y));
                y += (*h + spacing) as i64;
            }
            LayoutPlan {
                canvas_width,
                canvas_height,
                placements,
            }
        }
        MergeDirection::Grid => {
            let count = dims.len() as u32;
            let cols = (count as f64).sqrt().ceil() as u32;
            let rows = count.div_ceil(cols);
            let cell_width = dims.iter().map(|(w, _)| *w).max().unwrap_or(0);
            let cell_height = dims.iter().map(|(_, h)| *h).max().unwrap_or(0);

            let placements = (0..count)
                .map(|index| {
                    let col = index % cols;
                    let row = index / cols;
                    (
                        (col * (cell_width + spacing)) as i64,
                        (row * (cell_height + spacing)) as i64,
                    )
                })
                .collect();

            LayoutPlan {
                canvas_width: (cols * (cell_width + spacing)).saturating_sub(spacing),
                canvas_height: (rows * (cell_height + spacing)).saturating_sub(spacing),
                placements,
            }
        }
    }
}

/// A composited merge output with its encoded bytes.
pub struct MergedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Composite the given images onto one canvas and encode the result.
///
/// Requires at least two decoded inputs — callers exclude unreadable
/// sources before getting here. The canvas is filled with the background
/// color and the output is 3-channel RGB: inputs carrying transparency are
/// flattened onto the background.
#[instrument(skip(images, options), fields(count = images.len(), direction = ?options.direction))]
pub fn merge_images(images: &[ImageCodec], options: &MergeOptions) -> Result<MergedImage> {
    if images.len() < 2 {
        return Err(BildwerkError::InsufficientInputs(images.len()));
    }

    let dims: Vec<(u32, u32)> = images.iter().map(|img| (img.width(), img.height())).collect();
    let plan = plan_layout(&dims, options.direction, options.spacing);

    let overlays: Vec<Overlay> = images
        .iter()
        .zip(&plan.placements)
        .map(|(img, (left, top))| Overlay::at(img.as_dynamic().to_rgba8(), *left, *top))
        .collect();

    let canvas = ImageCodec::solid(plan.canvas_width, plan.canvas_height, options.background)
        .composite(&overlays);

    // Flatten to 3-channel RGB before encoding; alpha never survives a merge.
    let flattened = ImageCodec::from_dynamic(image::DynamicImage::ImageRgb8(
        canvas.as_dynamic().to_rgb8(),
    ));
    let bytes = flattened.encode(options.format, options.quality)?;

    info!(
        width = plan.canvas_width,
        height = plan.canvas_height,
        size = bytes.len(),
        "Merge composited"
    );

    Ok(MergedImage {
        bytes,
        width: plan.canvas_width,
        height: plan.canvas_height,
    })
}
