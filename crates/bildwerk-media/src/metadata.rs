// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Metadata carry-over for keep-metadata conversions.
//
// Re-encoding always goes through decoded pixels, which strips embedded
// metadata — that is the keep_metadata=false path for free. When the caller
// asks to keep metadata, the source's raw EXIF payload is lifted out of its
// container (JPEG APP1 segment or PNG eXIf chunk) and spliced verbatim into
// the output container when that container can hold it. Anything else
// degrades to stripping, with a log line.

use bildwerk_core::types::OutputFormat;
use tracing::{debug, warn};

/// JPEG APP1 segments carrying EXIF start with this identifier.
const EXIF_HEADER: &[u8; 6] = b"Exif\0\0";

/// Largest EXIF body that fits one APP1 segment (two length bytes minus the
/// identifier).
const MAX_APP1_PAYLOAD: usize = 65533 - EXIF_HEADER.len();

/// Raw EXIF (TIFF-structured) data without any container framing.
pub struct ExifPayload(Vec<u8>);

impl ExifPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Carry the source's EXIF payload into an already-encoded output.
///
/// Returns the output unchanged when the source has no (parseable) EXIF or
/// the target container cannot hold it.
pub fn carry_exif(source: &[u8], encoded: Vec<u8>, format: OutputFormat) -> Vec<u8> {
    match extract_exif(source) {
        Some(payload) => embed_exif(encoded, &payload, format),
        None => encoded,
    }
}

/// Lift the raw EXIF payload out of a JPEG or PNG container.
///
/// Payloads that `kamadak-exif` cannot parse are dropped — carrying bytes we
/// cannot even read would reproduce corruption verbatim.
pub fn extract_exif(source: &[u8]) -> Option<ExifPayload> {
    let raw = if source.starts_with(&[0xff, 0xd8]) {
        jpeg_exif_segment(source)
    } else if source.starts_with(PNG_SIGNATURE) {
        png_chunk(source, b"eXIf")
    } else {
        None
    }?;

    if exif::Reader::new().read_raw(raw.clone()).is_err() {
        warn!("source EXIF payload is unparseable, dropping it");
        return None;
    }
    Some(ExifPayload(raw))
}

/// Splice an EXIF payload into an encoded output container.
pub fn embed_exif(encoded: Vec<u8>, payload: &ExifPayload, format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Jpeg => embed_jpeg_app1(encoded, payload),
        OutputFormat::Png => embed_png_exif_chunk(encoded, payload),
        other => {
            debug!(
                format = other.extension(),
                "container does not carry EXIF here, metadata stripped"
            );
            encoded
        }
    }
}

// -- JPEG segment handling ----------------------------------------------------

/// Walk JPEG segments and return the EXIF APP1 payload, if present.
fn jpeg_exif_segment(data: &[u8]) -> Option<Vec<u8>> {
    let mut pos = 2; // past SOI

    while pos + 4 <= data.len() {
        if data[pos] != 0xff {
            return None; // malformed marker stream
        }
        let marker = data[pos + 1];

        match marker {
            // Standalone markers carry no length.
            0x01 | 0xd0..=0xd7 => {
                pos += 2;
                continue;
            }
            // Start of scan: entropy-coded data follows, no EXIF past here.
            0xda => return None,
            _ => {}
        }

        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if length < 2 || pos + 2 + length > data.len() {
            return None;
        }
        let body = &data[pos + 4..pos + 2 + length];

        if marker == 0xe1 && body.starts_with(EXIF_HEADER) {
            return Some(body[EXIF_HEADER.len()..].to_vec());
        }
        pos += 2 + length;
    }
    None
}

/// Insert an EXIF APP1 segment directly after the SOI marker.
fn embed_jpeg_app1(encoded: Vec<u8>, payload: &ExifPayload) -> Vec<u8> {
    if !encoded.starts_with(&[0xff, 0xd8]) {
        warn!("encoded output is not a JPEG stream, metadata stripped");
        return encoded;
    }
    if payload.0.len() > MAX_APP1_PAYLOAD {
        warn!(
            size = payload.0.len(),
            "EXIF payload exceeds one APP1 segment, metadata stripped"
        );
        return encoded;
    }

    let segment_length = (payload.0.len() + EXIF_HEADER.len() + 2) as u16;
    let mut out = Vec::with_capacity(encoded.len() + payload.0.len() + 10);
    out.extend_from_slice(&encoded[..2]);
    out.extend_from_slice(&[0xff, 0xe1]);
    out.extend_from_slice(&segment_length.to_be_bytes());
    out.extend_from_slice(EXIF_HEADER);
    out.extend_from_slice(&payload.0);
    out.extend_from_slice(&encoded[2..]);
    out
}

// -- PNG chunk handling -------------------------------------------------------

const PNG_SIGNATURE: &[u8; 8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Return the data of the first chunk with the given type.
fn png_chunk(data: &[u8], chunk_type: &[u8; 4]) -> Option<Vec<u8>> {
    let mut pos = PNG_SIGNATURE.len();

    while pos + 8 <= data.len() {
        let length = u32::from_be_bytes(data[pos..pos + 4].try_into().ok()?) as usize;
        let kind = &data[pos + 4..pos + 8];
        let body_end = pos + 8 + length;
        if body_end + 4 > data.len() {
            return None;
        }
        if kind == chunk_type {
            return Some(data[pos + 8..body_end].to_vec());
        }
        if kind == b"IEND" {
            return None;
        }
        pos = body_end + 4; // skip CRC
    }
    None
}

/// Insert an eXIf chunk after IHDR.
fn embed_png_exif_chunk(encoded: Vec<u8>, payload: &ExifPayload) -> Vec<u8> {
    if !encoded.starts_with(PNG_SIGNATURE) {
        warn!("encoded output is not a PNG stream, metadata stripped");
        return encoded;
    }

    // IHDR is mandatory and always first: signature + 4 length + 4 type +
    // 13 data + 4 CRC.
    let ihdr_end = PNG_SIGNATURE.len() + 4 + 4 + 13 + 4;
    if encoded.len() < ihdr_end {
        warn!("encoded PNG is truncated, metadata stripped");
        return encoded;
    }

    let mut chunk = Vec::with_capacity(payload.0.len() + 12);
    chunk.extend_from_slice(&(payload.0.len() as u32).to_be_bytes());
    chunk.extend_from_slice(b"eXIf");
    chunk.extend_from_slice(&payload.0);
    let crc = png_crc32(&chunk[4..]);
    chunk.extend_from_slice(&crc.to_be_bytes());

    let mut out = Vec::with_capacity(encoded.len() + chunk.len());
    out.extend_from_slice(&encoded[..ihdr_end]);
    out.extend_from_slice(&chunk);
    out.extend_from_slice(&encoded[ihdr_end..]);
    out
}

/// CRC-32 over chunk type + data, as defined by the PNG specification.
fn png_crc32(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for byte in data {
        crc ^= *byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xedb8_8320 & mask);
        }
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use bildwerk_core::types::RgbColor;

    use crate::codec::ImageCodec;

    /// Smallest EXIF body kamadak-exif will parse: little-endian TIFF header
    /// plus an IFD0 holding Orientation=1.
    fn minimal_exif() -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II");
        tiff.extend_from_slice(&42u16.to_le_bytes());
        tiff.extend_from_slice(&8u32.to_le_bytes()); // IFD0 offset
        tiff.extend_from_slice(&1u16.to_le_bytes()); // entry count
        tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
        tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
        tiff.extend_from_slice(&1u32.to_le_bytes()); // count
        tiff.extend_from_slice(&1u32.to_le_bytes()); // value
        tiff.extend_from_slice(&0u32.to_le_bytes()); // next IFD
        tiff
    }

    fn encoded(format: OutputFormat) -> Vec<u8> {
        ImageCodec::solid(12, 12, RgbColor([80, 90, 100]))
            .encode(format, 80)
            .unwrap()
    }

    #[test]
    fn jpeg_round_trips_exif_payload() {
        let payload = ExifPayload(minimal_exif());
        let tagged = embed_exif(encoded(OutputFormat::Jpeg), &payload, OutputFormat::Jpeg);

        // Output must still decode and must carry the payload verbatim.
        assert!(image::load_from_memory(&tagged).is_ok());
        let roundtrip = extract_exif(&tagged).expect("embedded EXIF not found");
        assert_eq!(roundtrip.as_bytes(), minimal_exif().as_slice());
    }

    #[test]
    fn png_round_trips_exif_payload() {
        let payload = ExifPayload(minimal_exif());
        let tagged = embed_exif(encoded(OutputFormat::Png), &payload, OutputFormat::Png);

        assert!(image::load_from_memory(&tagged).is_ok());
        let roundtrip = extract_exif(&tagged).expect("embedded eXIf not found");
        assert_eq!(roundtrip.as_bytes(), minimal_exif().as_slice());
    }

    #[test]
    fn cross_container_carry_works() {
        // EXIF lifted from a JPEG source lands in a PNG output.
        let payload = ExifPayload(minimal_exif());
        let source = embed_exif(encoded(OutputFormat::Jpeg), &payload, OutputFormat::Jpeg);
        let output = carry_exif(&source, encoded(OutputFormat::Png), OutputFormat::Png);
        assert!(extract_exif(&output).is_some());
    }

    #[test]
    fn formats_without_exif_support_pass_through() {
        let payload = ExifPayload(minimal_exif());
        let bmp = encoded(OutputFormat::Bmp);
        let untouched = embed_exif(bmp.clone(), &payload, OutputFormat::Bmp);
        assert_eq!(untouched, bmp);
    }

    #[test]
    fn sources_without_exif_yield_none() {
        assert!(extract_exif(&encoded(OutputFormat::Jpeg)).is_none());
        assert!(extract_exif(&encoded(OutputFormat::Png)).is_none());
        assert!(extract_exif(b"plainly not an image").is_none());
    }

    #[test]
    fn unparseable_payload_is_dropped() {
        // Hand-build a JPEG whose APP1 claims EXIF but carries junk.
        let mut source = vec![0xff, 0xd8, 0xff, 0xe1];
        let junk = b"Exif\0\0garbage-not-tiff";
        source.extend_from_slice(&((junk.len() + 2) as u16).to_be_bytes());
        source.extend_from_slice(junk);
        source.extend_from_slice(&encoded(OutputFormat::Jpeg)[2..]);

        assert!(extract_exif(&source).is_none());
    }

    #[test]
    fn png_crc_matches_known_vector() {
        // CRC-32 of "IEND" is the well-known constant in every PNG tail.
        assert_eq!(png_crc32(b"IEND"), 0xae42_6082);
    }
}
