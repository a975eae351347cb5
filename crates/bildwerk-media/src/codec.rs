// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec adapter — decode, composite, and encode a single image. Wraps the
// `image` crate behind a narrow surface so the rest of the engine never
// touches codec types directly.

use std::io::Cursor;

use bildwerk_core::error::{BildwerkError, Result};
use bildwerk_core::types::{OutputFormat, RgbColor};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, info, instrument};

/// One-shot conversion of an encoded image: decode, composite the given
/// layers top-to-bottom, re-encode, and apply the metadata policy.
///
/// This is the single-image surface of the adapter; the batch pipeline uses
/// the step-by-step methods instead because it interleaves the
/// size-targeting search.
pub fn convert(
    source: &[u8],
    format: OutputFormat,
    quality: u8,
    keep_metadata: bool,
    overlays: &[Overlay],
) -> Result<Vec<u8>> {
    let encoded = ImageCodec::from_bytes(source)?
        .composite(overlays)
        .encode(format, quality)?;
    Ok(if keep_metadata {
        crate::metadata::carry_exif(source, encoded, format)
    } else {
        encoded
    })
}

/// Whether this build carries an encoder for the given format.
///
/// JPEG 2000, HEIF, and JPEG XL are valid request targets without a
/// compiled-in encoder; callers use this to reject them before doing any
/// pixel work.
pub fn encoder_available(format: OutputFormat) -> bool {
    !matches!(
        format,
        OutputFormat::Jp2 | OutputFormat::Heif | OutputFormat::Jxl
    )
}

/// One layer composited onto a base image.
///
/// Layers carry their own placement offsets; the default is origin-aligned
/// full-bleed, which is what the watermark renderer produces.
pub struct Overlay {
    pub image: RgbaImage,
    pub left: i64,
    pub top: i64,
}

impl Overlay {
    /// An overlay anchored at the base image's origin.
    pub fn full_bleed(image: RgbaImage) -> Self {
        Self {
            image,
            left: 0,
            top: 0,
        }
    }

    /// An overlay placed at the given offset.
    pub fn at(image: RgbaImage, left: i64, top: i64) -> Self {
        Self { image, left, top }
    }
}

/// Codec adapter wrapping one decoded image.
///
/// All operations are non-destructive: compositing consumes `self` and
/// returns a new `ImageCodec`, and `encode` borrows so the same pixels can
/// be probed repeatedly by the size-targeting search. The adapter never
/// writes to storage — it only returns buffers.
pub struct ImageCodec {
    /// The current working image.
    image: DynamicImage,
}

impl ImageCodec {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            BildwerkError::Decode(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a codec from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| BildwerkError::Decode(format!("failed to decode image: {err}")))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// A solid background canvas in the given color.
    ///
    /// The canvas is held as opaque RGBA so overlays with transparency
    /// flatten onto the background; 3-channel output falls out of the
    /// encode path.
    pub fn solid(width: u32, height: u32, color: RgbColor) -> Self {
        let [r, g, b] = color.0;
        let canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));
        Self {
            image: DynamicImage::ImageRgba8(canvas),
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the codec and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Compositing ----------------------------------------------------------

    /// Composite the given layers onto this image, top-to-bottom in list
    /// order, each at its own placement offset.
    #[instrument(skip_all, fields(layers = overlays.len()))]
    pub fn composite(self, overlays: &[Overlay]) -> Self {
        if overlays.is_empty() {
            return self;
        }

        let mut base = self.image.to_rgba8();
        for layer in overlays {
            image::imageops::overlay(&mut base, &layer.image, layer.left, layer.top);
        }
        debug!("Compositing complete");
        Self {
            image: DynamicImage::ImageRgba8(base),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image in the requested format.
    ///
    /// `quality` must be within [1, 100] for every format — lossless formats
    /// ignore it but still validate the range. Formats without a compiled-in
    /// encoder (JPEG 2000, HEIF, JPEG XL) fail with `UnsupportedFormat`.
    #[instrument(skip(self), fields(format = format.extension(), quality))]
    pub fn encode(&self, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        if !(1..=100).contains(&quality) {
            return Err(BildwerkError::InvalidOptions(format!(
                "quality must be within [1, 100], got {quality}"
            )));
        }

        match format {
            OutputFormat::Jpeg => self.to_jpeg_bytes(quality),
            OutputFormat::Avif => self.to_avif_bytes(quality),
            OutputFormat::Png => self.write_to_format(ImageFormat::Png),
            OutputFormat::WebP => self.to_webp_bytes(),
            OutputFormat::Tiff => self.write_to_format(ImageFormat::Tiff),
            OutputFormat::Gif => self.write_to_format(ImageFormat::Gif),
            OutputFormat::Bmp => self.write_to_format(ImageFormat::Bmp),
            OutputFormat::Ico => self.write_to_format(ImageFormat::Ico),
            OutputFormat::Jp2 | OutputFormat::Heif | OutputFormat::Jxl => {
                Err(BildwerkError::UnsupportedFormat(format!(
                    "no encoder available for {}",
                    format.extension()
                )))
            }
        }
    }

    /// Encode as JPEG with the given quality (1-100).
    fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::Encode(format!("JPEG encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode as lossless WebP — the only WebP flavour the `image` crate
    /// writes, so quality is validated but has no effect.
    fn to_webp_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgba = self.image.to_rgba8();
        let encoder = WebPEncoder::new_lossless(&mut buffer);
        rgba.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::Encode(format!("WebP encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode as AVIF with the given quality (1-100).
    fn to_avif_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgba = self.image.to_rgba8();
        let encoder = AvifEncoder::new_with_speed_quality(&mut buffer, 4, quality);
        rgba.write_with_encoder(encoder)
            .map_err(|err| BildwerkError::Encode(format!("AVIF encoding failed: {err}")))?;
        Ok(buffer)
    }

    /// Encode through the `image` crate's format dispatch.
    fn write_to_format(&self, format: ImageFormat) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, format)
            .map_err(|err| BildwerkError::Encode(format!("image encoding failed: {err}")))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn gradient(width: u32, height: u32) -> ImageCodec {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 64, 255])
        });
        ImageCodec::from_dynamic(DynamicImage::ImageRgba8(img))
    }

    #[test]
    fn encode_round_trips_to_requested_format() {
        let codec = gradient(64, 48);
        for (format, expected) in [
            (OutputFormat::Jpeg, ImageFormat::Jpeg),
            (OutputFormat::Png, ImageFormat::Png),
            (OutputFormat::Bmp, ImageFormat::Bmp),
            (OutputFormat::Tiff, ImageFormat::Tiff),
        ] {
            let bytes = codec.encode(format, 80).unwrap();
            let guessed = image::guess_format(&bytes).unwrap();
            assert_eq!(guessed, expected, "wrong container for {format:?}");

            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!(decoded.dimensions(), (64, 48));
        }
    }

    #[test]
    fn png_encode_is_bit_stable() {
        let codec = gradient(32, 32);
        let a = codec.encode(OutputFormat::Png, 80).unwrap();
        let b = codec.encode(OutputFormat::Png, 80).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn encode_rejects_out_of_range_quality() {
        let codec = gradient(8, 8);
        assert!(codec.encode(OutputFormat::Png, 0).is_err());
        assert!(codec.encode(OutputFormat::Jpeg, 101).is_err());
    }

    #[test]
    fn encode_rejects_formats_without_encoders() {
        let codec = gradient(8, 8);
        for format in [OutputFormat::Jp2, OutputFormat::Heif, OutputFormat::Jxl] {
            match codec.encode(format, 80) {
                Err(BildwerkError::UnsupportedFormat(_)) => {}
                other => panic!("expected UnsupportedFormat, got {other:?}"),
            }
        }
    }

    #[test]
    fn from_bytes_rejects_non_image_data() {
        assert!(matches!(
            ImageCodec::from_bytes(b"definitely not pixels"),
            Err(BildwerkError::Decode(_))
        ));
    }

    #[test]
    fn composite_flattens_overlay_onto_base() {
        // Opaque red overlay over the top-left quadrant of a white canvas.
        let overlay = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let composed = ImageCodec::solid(8, 8, RgbColor::WHITE)
            .composite(&[Overlay::full_bleed(overlay)]);

        let rgba = composed.as_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(rgba.get_pixel(7, 7), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn convert_recodes_with_overlays() {
        let source = gradient(32, 24).encode(OutputFormat::Png, 80).unwrap();
        let overlay = RgbaImage::from_pixel(32, 24, Rgba([0, 255, 0, 255]));

        let out = convert(
            &source,
            OutputFormat::Jpeg,
            85,
            false,
            &[Overlay::full_bleed(overlay)],
        )
        .unwrap();

        assert_eq!(image::guess_format(&out).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&out).unwrap().to_rgb8();
        // The opaque overlay replaced the gradient entirely.
        let p = decoded.get_pixel(16, 12);
        assert!(p[1] > 200 && p[0] < 60 && p[2] < 60);
    }

    #[test]
    fn composite_respects_layer_offsets() {
        let overlay = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));
        let composed = ImageCodec::solid(8, 8, RgbColor::WHITE)
            .composite(&[Overlay::at(overlay, 4, 4)]);

        let rgba = composed.as_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(4, 4), &Rgba([0, 0, 255, 255]));
        assert_eq!(rgba.get_pixel(3, 3), &Rgba([255, 255, 255, 255]));
    }
}
