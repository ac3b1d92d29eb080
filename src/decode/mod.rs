//! Frame detection and decoding.
//!
//! Converts decoded video stills back into validated chunks. Detection
//! runs a small strategy cascade because stills arrive degraded by lossy
//! video compression: a hard-threshold binarization first (recovers
//! contrast), then the detector's own adaptive preparation, then inverted
//! polarity. Orientation handling is internal to the detector.

mod batch;

pub use batch::{BatchDecoder, BatchOptions, FrameDecode, ProgressFn};

use crate::chunk::{ChunkHeader, HeaderError, HEADER_SIZE};
use crate::image::ImageData;
use rqrr::PreparedImage;
use thiserror::Error;
use tracing::trace;

/// Binarization threshold applied to the luminance channel.
const BINARIZE_THRESHOLD: u8 = 128;

/// Errors from decoding a single frame.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    /// The still's buffer did not match its stated dimensions.
    #[error("image buffer of {actual} bytes does not match {width}x{height} RGBA dimensions")]
    MalformedImage {
        /// Stated width in pixels.
        width: u32,
        /// Stated height in pixels.
        height: u32,
        /// Actual buffer length in bytes.
        actual: usize,
    },
    /// No decodable symbol was found in the still.
    #[error("no code found in frame")]
    NoCodeFound,
    /// The decoded bytes failed magic/bounds validation. The raw bytes
    /// are preserved for diagnostics.
    #[error("header validation failed: {source}")]
    HeaderInvalid {
        /// The validation failure.
        #[source]
        source: HeaderError,
        /// Decoded bytes as recovered from the symbol.
        raw_data: Vec<u8>,
    },
    /// Payload length disagreed with the header's declared length.
    /// Distinct from header corruption: the header itself parsed, so this
    /// signals a truncated or padded capture.
    #[error("payload length {actual} does not match declared {declared}")]
    PayloadLengthMismatch {
        /// Length declared in the header.
        declared: u32,
        /// Actual payload bytes recovered.
        actual: usize,
    },
    /// The per-frame decode deadline elapsed (batch decoding only).
    #[error("decode timed out")]
    Timeout,
}

/// A successfully decoded chunk: validated header plus payload.
#[derive(Debug, Clone)]
pub struct DecodedChunk {
    /// Validated chunk header.
    pub header: ChunkHeader,
    /// Chunk payload (header stripped).
    pub payload: Vec<u8>,
}

/// Per-still output of batch decoding.
///
/// `frame_index` is the still's position in the *source* sequence, which
/// need not equal the chunk index recovered from its header.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Position in the input still sequence.
    pub frame_index: usize,
    /// Validated header, present only on success.
    pub header: Option<ChunkHeader>,
    /// Chunk payload, empty on failure.
    pub payload: Vec<u8>,
    /// Whether decoding succeeded.
    pub is_valid: bool,
    /// Failure description, present only on failure.
    pub error: Option<String>,
}

impl DecodedFrame {
    pub(crate) fn valid(frame_index: usize, chunk: DecodedChunk) -> Self {
        Self {
            frame_index,
            header: Some(chunk.header),
            payload: chunk.payload,
            is_valid: true,
            error: None,
        }
    }

    pub(crate) fn invalid(frame_index: usize, error: String) -> Self {
        Self {
            frame_index,
            header: None,
            payload: Vec::new(),
            is_valid: false,
            error: Some(error),
        }
    }
}

/// Decodes single stills into validated chunks.
///
/// Stateless; a single instance is shared across concurrent batch decode
/// tasks without synchronization.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl FrameDecoder {
    /// Creates a new frame decoder.
    pub fn new() -> Self {
        Self
    }

    /// Decodes one still into a validated chunk.
    pub fn decode_frame(&self, image: &ImageData) -> Result<DecodedChunk, FrameDecodeError> {
        if !image.is_valid() {
            return Err(FrameDecodeError::MalformedImage {
                width: image.width(),
                height: image.height(),
                actual: image.data().len(),
            });
        }
        let gray = image.to_grayscale();
        let w = image.width() as usize;
        let h = image.height() as usize;

        let raw = detect(&gray, w, h).ok_or(FrameDecodeError::NoCodeFound)?;
        trace!(bytes = raw.len(), "symbol decoded");

        let header = ChunkHeader::parse(&raw).map_err(|source| {
            FrameDecodeError::HeaderInvalid {
                source,
                raw_data: raw.clone(),
            }
        })?;

        let payload = &raw[HEADER_SIZE..];
        if payload.len() != header.data_length as usize {
            return Err(FrameDecodeError::PayloadLengthMismatch {
                declared: header.data_length,
                actual: payload.len(),
            });
        }

        Ok(DecodedChunk {
            header,
            payload: payload.to_vec(),
        })
    }
}

/// Detection strategy cascade; returns the first successful decode.
fn detect(gray: &[u8], w: usize, h: usize) -> Option<Vec<u8>> {
    // 1. Hard threshold: recovers contrast crushed by video compression.
    if let Some(bytes) = decode_bitmap(w, h, |x, y| gray[y * w + x] < BINARIZE_THRESHOLD) {
        return Some(bytes);
    }
    // 2. Raw grayscale: detector-internal adaptive binarization.
    if let Some(bytes) = decode_grayscale(gray, w, h) {
        return Some(bytes);
    }
    // 3. Inverted polarity.
    decode_bitmap(w, h, |x, y| gray[y * w + x] >= BINARIZE_THRESHOLD)
}

// Every detected grid is tried, not just the first; a frame may carry
// misdetections alongside the real symbol.

fn decode_grayscale(gray: &[u8], w: usize, h: usize) -> Option<Vec<u8>> {
    let mut img = PreparedImage::prepare_from_greyscale(w, h, |x, y| gray[y * w + x]);
    for grid in img.detect_grids() {
        let mut bytes = Vec::new();
        if grid.decode_to(&mut bytes).is_ok() && !bytes.is_empty() {
            return Some(bytes);
        }
    }
    None
}

fn decode_bitmap<F>(w: usize, h: usize, dark: F) -> Option<Vec<u8>>
where
    F: FnMut(usize, usize) -> bool,
{
    let mut img = PreparedImage::prepare_from_bitmap(w, h, dark);
    for grid in img.detect_grids() {
        let mut bytes = Vec::new();
        if grid.decode_to(&mut bytes).is_ok() && !bytes.is_empty() {
            return Some(bytes);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encoder;

    #[test]
    fn test_round_trip_single_frame() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let result = Encoder::new().encode(data).unwrap();
        assert_eq!(result.frames.len(), 1);

        let chunk = FrameDecoder::new()
            .decode_frame(&result.frames[0].image)
            .unwrap();
        assert_eq!(chunk.payload, data);
        assert_eq!(chunk.header.chunk_index, 0);
        assert_eq!(chunk.header.total_chunks, 1);
    }

    #[test]
    fn test_blank_frame_is_no_code_found() {
        let blank = ImageData::new(vec![255u8; 100 * 100 * 4], 100, 100);
        let err = FrameDecoder::new().decode_frame(&blank).unwrap_err();
        assert!(matches!(err, FrameDecodeError::NoCodeFound));
    }

    #[test]
    fn test_inverted_frame_still_decodes() {
        let result = Encoder::new().encode(b"polarity test payload").unwrap();
        let image = &result.frames[0].image;

        let inverted: Vec<u8> = image
            .data()
            .chunks_exact(4)
            .flat_map(|px| [255 - px[0], 255 - px[1], 255 - px[2], 255])
            .collect();
        let inverted = ImageData::new(inverted, image.width(), image.height());

        let chunk = FrameDecoder::new().decode_frame(&inverted).unwrap();
        assert_eq!(chunk.payload, b"polarity test payload");
    }

    #[test]
    fn test_undersized_buffer_is_typed_failure() {
        let short = ImageData::new(vec![255u8; 10], 100, 100);
        let err = FrameDecoder::new().decode_frame(&short).unwrap_err();
        assert!(matches!(err, FrameDecodeError::MalformedImage { .. }));
    }

    #[test]
    fn test_gray_noise_never_panics() {
        let noisy: Vec<u8> = (0..64 * 64 * 4u32)
            .map(|i| (i.wrapping_mul(97) % 251) as u8)
            .collect();
        let image = ImageData::new(noisy, 64, 64);
        assert!(FrameDecoder::new().decode_frame(&image).is_err());
    }
}
