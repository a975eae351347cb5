// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bildwerk image engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BildwerkError, Result};

/// Unique identifier for one batch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchId(pub Uuid);

impl BatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output formats the engine accepts.
///
/// Membership in this enum means the format is a valid request target; it
/// does not guarantee an encoder is compiled in. JPEG 2000, HEIF, and
/// JPEG XL are accepted here and rejected at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Avif,
    Tiff,
    Gif,
    Bmp,
    Ico,
    Jp2,
    Heif,
    Jxl,
}

impl OutputFormat {
    /// File extension used for output filenames.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Tiff => "tiff",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Ico => "ico",
            Self::Jp2 => "jp2",
            Self::Heif => "heif",
            Self::Jxl => "jxl",
        }
    }

    /// MIME type string for HTTP Content-Type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Avif => "image/avif",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Ico => "image/x-icon",
            Self::Jp2 => "image/jp2",
            Self::Heif => "image/heif",
            Self::Jxl => "image/jxl",
        }
    }

    /// Infer the output format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            "tif" | "tiff" => Some(Self::Tiff),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            "ico" => Some(Self::Ico),
            "jp2" | "jpx" => Some(Self::Jp2),
            "heif" | "heic" => Some(Self::Heif),
            "jxl" => Some(Self::Jxl),
            _ => None,
        }
    }
}

/// A 3-channel RGB color, parsed from `#rrggbb` or `#rgb` hex notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor(pub [u8; 3]);

impl RgbColor {
    pub const WHITE: Self = Self([0xff, 0xff, 0xff]);

    /// Parse a `#rrggbb` or `#rgb` hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        let expand = |d: u8| d << 4 | d;

        match digits.len() {
            6 => {
                let value = u32::from_str_radix(digits, 16).map_err(|_| {
                    BildwerkError::InvalidOptions(format!("invalid color: {hex}"))
                })?;
                Ok(Self([
                    (value >> 16) as u8,
                    (value >> 8) as u8,
                    value as u8,
                ]))
            }
            3 => {
                let value = u16::from_str_radix(digits, 16).map_err(|_| {
                    BildwerkError::InvalidOptions(format!("invalid color: {hex}"))
                })?;
                Ok(Self([
                    expand((value >> 8) as u8 & 0xf),
                    expand((value >> 4) as u8 & 0xf),
                    expand(value as u8 & 0xf),
                ]))
            }
            _ => Err(BildwerkError::InvalidOptions(format!(
                "invalid color: {hex}"
            ))),
        }
    }
}

impl Default for RgbColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl std::fmt::Display for RgbColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl TryFrom<String> for RgbColor {
    type Error = BildwerkError;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

impl From<RgbColor> for String {
    fn from(color: RgbColor) -> Self {
        color.to_string()
    }
}

/// Options for one batch conversion request.
///
/// When `target_size_kb` is set, `quality` is advisory only — the
/// size-targeting search overrides it with whatever quality fits the budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    pub format: OutputFormat,
    /// Codec quality, 1-100.
    pub quality: u8,
    /// Target output size in KB for size-targeted compression.
    pub target_size_kb: Option<u32>,
    pub watermark_text: Option<String>,
    /// Watermark text opacity, 0.0-1.0.
    pub watermark_opacity: f32,
    /// Preserve embedded metadata (EXIF) instead of stripping it.
    pub keep_metadata: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 80,
            target_size_kb: None,
            watermark_text: None,
            watermark_opacity: 0.5,
            keep_metadata: false,
        }
    }
}

impl ConversionOptions {
    /// Reject malformed options before any codec work begins.
    pub fn validate(&self) -> Result<()> {
        validate_quality(self.quality)?;
        if let Some(kb) = self.target_size_kb {
            if kb == 0 {
                return Err(BildwerkError::InvalidOptions(
                    "target_size_kb must be positive".into(),
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.watermark_opacity) {
            return Err(BildwerkError::InvalidOptions(format!(
                "watermark_opacity must be within [0, 1], got {}",
                self.watermark_opacity
            )));
        }
        Ok(())
    }
}

/// Placement strategy for merging multiple images onto one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeDirection {
    Horizontal,
    Vertical,
    Grid,
}

/// Options for one merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    pub direction: MergeDirection,
    /// Gap between adjacent images, in pixels.
    pub spacing: u32,
    pub background: RgbColor,
    pub format: OutputFormat,
    /// Codec quality, 1-100.
    pub quality: u8,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            direction: MergeDirection::Horizontal,
            spacing: 0,
            background: RgbColor::WHITE,
            format: OutputFormat::Jpeg,
            quality: 80,
        }
    }
}

impl MergeOptions {
    pub fn validate(&self) -> Result<()> {
        validate_quality(self.quality)
    }
}

fn validate_quality(quality: u8) -> Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(BildwerkError::InvalidOptions(format!(
            "quality must be within [1, 100], got {quality}"
        )));
    }
    Ok(())
}

/// Outcome of converting one input image within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResult {
    /// Maps back to the uploaded file id.
    pub source_id: String,
    pub url: String,
    pub filename: String,
    /// Input file's on-disk size at read time.
    pub original_size: u64,
    /// Encoded output's byte length.
    pub new_size: u64,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
}

/// Outcome of one merge request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub url: String,
    pub filename: String,
    /// Sum of the surviving inputs' on-disk sizes.
    pub combined_original_size: u64,
    pub new_size: u64,
    pub width: u32,
    pub height: u32,
    /// Absent when PDF export failed — the merge itself still succeeded.
    pub pdf_url: Option<String>,
    pub pdf_filename: Option<String>,
}

/// Success payload of one batch conversion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub batch_id: BatchId,
    /// One entry per surviving input, in input order.
    pub results: Vec<ProcessedResult>,
    pub archive_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_color_parses_six_digit_hex() {
        assert_eq!(RgbColor::from_hex("#ff8000").unwrap(), RgbColor([255, 128, 0]));
        assert_eq!(RgbColor::from_hex("000000").unwrap(), RgbColor([0, 0, 0]));
    }

    #[test]
    fn rgb_color_parses_shorthand_hex() {
        assert_eq!(RgbColor::from_hex("#fff").unwrap(), RgbColor::WHITE);
        assert_eq!(RgbColor::from_hex("#f00").unwrap(), RgbColor([255, 0, 0]));
    }

    #[test]
    fn rgb_color_rejects_garbage() {
        assert!(RgbColor::from_hex("#fffff").is_err());
        assert!(RgbColor::from_hex("red").is_err());
    }

    #[test]
    fn conversion_options_defaults_validate() {
        assert!(ConversionOptions::default().validate().is_ok());
    }

    #[test]
    fn conversion_options_rejects_out_of_range() {
        let mut opts = ConversionOptions::default();
        opts.quality = 0;
        assert!(opts.validate().is_err());

        let mut opts = ConversionOptions::default();
        opts.watermark_opacity = 1.5;
        assert!(opts.validate().is_err());

        let mut opts = ConversionOptions::default();
        opts.target_size_kb = Some(0);
        assert!(opts.validate().is_err());
    }

    #[test]
    fn output_format_round_trips_through_serde() {
        let json = serde_json::to_string(&OutputFormat::WebP).unwrap();
        assert_eq!(json, "\"webp\"");
        let back: OutputFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, OutputFormat::WebP);
    }

    #[test]
    fn output_format_from_extension_covers_aliases() {
        assert_eq!(OutputFormat::from_extension("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("tif"), Some(OutputFormat::Tiff));
        assert_eq!(OutputFormat::from_extension("heic"), Some(OutputFormat::Heif));
        assert_eq!(OutputFormat::from_extension("raw"), None);
    }
}
