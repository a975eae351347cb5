// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size-targeting compressor — bounded binary search for the highest quality
// whose encoded output fits a byte budget.

use bildwerk_core::error::Result;
use bildwerk_core::types::OutputFormat;
use tracing::{debug, info, instrument};

use crate::codec::ImageCodec;

/// Maximum number of probe encodes per search.
///
/// Caps worst-case CPU per image; with a 1-100 quality range this resolves
/// quality to roughly 1 part in 128, which is finer than the input range.
const MAX_PROBES: u32 = 7;

/// Encoded buffer plus the quality that produced it.
pub struct CompressedImage {
    pub bytes: Vec<u8>,
    pub quality: u8,
}

/// Search for the highest quality in [1, 100] whose encoded size does not
/// exceed `target_bytes`.
///
/// Binary search over the quality parameter, bounded to `MAX_PROBES` probe
/// encodes. Each probe that fits is recorded as best-so-far and the search
/// continues upward; each miss lowers the upper bound. Relies on encoded
/// size being non-decreasing in quality, which holds for the supported
/// lossy codecs.
///
/// Meeting the target is best-effort: when even quality 1 is too large, the
/// quality-1 encode is returned anyway and the caller sees a buffer above
/// budget.
#[instrument(skip(codec), fields(format = format.extension(), target_bytes))]
pub fn compress_to_target(
    codec: &ImageCodec,
    format: OutputFormat,
    target_bytes: u64,
) -> Result<CompressedImage> {
    let mut min_q: i32 = 1;
    let mut max_q: i32 = 100;
    let mut best: Option<CompressedImage> = None;

    for probe in 0..MAX_PROBES {
        if min_q > max_q {
            break;
        }
        let mid_q = ((min_q + max_q) / 2) as u8;
        let bytes = codec.encode(format, mid_q)?;
        debug!(probe, quality = mid_q, size = bytes.len(), "Probe encode");

        if bytes.len() as u64 <= target_bytes {
            best = Some(CompressedImage {
                bytes,
                quality: mid_q,
            });
            min_q = mid_q as i32 + 1; // try higher quality
        } else {
            max_q = mid_q as i32 - 1; // needs lower quality
        }
    }

    match best {
        Some(hit) => {
            info!(quality = hit.quality, size = hit.bytes.len(), "Target met");
            Ok(hit)
        }
        None => {
            // Even the lowest probed quality exceeded the budget; fall back
            // to an explicit quality-1 encode and let the caller keep it.
            let bytes = codec.encode(format, 1)?;
            info!(size = bytes.len(), "Target unmet, returning quality-1 encode");
            Ok(CompressedImage { bytes, quality: 1 })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    /// A noisy gradient: compresses poorly enough that quality actually
    /// moves the JPEG size around.
    fn textured(width: u32, height: u32) -> ImageCodec {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let noise = (x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 97;
            Rgba([
                (x * 255 / width) as u8,
                (y * 255 / height) as u8,
                noise as u8,
                255,
            ])
        });
        ImageCodec::from_dynamic(DynamicImage::ImageRgba8(img))
    }

    #[test]
    fn generous_target_returns_high_quality() {
        let codec = textured(200, 150);
        let result = compress_to_target(&codec, OutputFormat::Jpeg, 10 * 1024 * 1024).unwrap();
        assert!(result.bytes.len() as u64 <= 10 * 1024 * 1024);
        // Everything fits, so the search walks the upper half throughout.
        assert!(result.quality >= 99);
    }

    #[test]
    fn tight_target_is_respected_when_feasible() {
        let codec = textured(400, 300);
        let q1_size = codec.encode(OutputFormat::Jpeg, 1).unwrap().len() as u64;
        let q100_size = codec.encode(OutputFormat::Jpeg, 100).unwrap().len() as u64;
        let target = (q1_size + q100_size) / 2;

        let result = compress_to_target(&codec, OutputFormat::Jpeg, target).unwrap();
        assert!(
            result.bytes.len() as u64 <= target,
            "size {} exceeds feasible target {}",
            result.bytes.len(),
            target
        );
        assert!(result.quality >= 1);
    }

    #[test]
    fn impossible_target_falls_back_to_quality_one() {
        let codec = textured(400, 300);
        let result = compress_to_target(&codec, OutputFormat::Jpeg, 1).unwrap();
        assert_eq!(result.quality, 1);
        // The buffer may exceed the budget — best-effort contract.
        assert!(!result.bytes.is_empty());
    }

    #[test]
    fn quality_used_is_monotone_in_target() {
        let codec = textured(300, 200);
        let q1 = codec.encode(OutputFormat::Jpeg, 1).unwrap().len() as u64;
        let q100 = codec.encode(OutputFormat::Jpeg, 100).unwrap().len() as u64;

        // Shrinking budgets must never raise the quality the search picks.
        let targets = [q100 + 1024, (q1 + q100) / 2, q1 + (q100 - q1) / 4, q1];
        let mut last_quality = u8::MAX;
        for target in targets {
            let result = compress_to_target(&codec, OutputFormat::Jpeg, target).unwrap();
            assert!(
                result.quality <= last_quality,
                "quality rose from {last_quality} to {} as target shrank to {target}",
                result.quality
            );
            last_quality = result.quality;
        }
    }
}
