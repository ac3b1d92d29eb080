//! Single-chunk frame rendering.
//!
//! One chunk becomes one QR symbol becomes one RGBA still. The symbol
//! version is forced to the run-wide selection so every frame of a run
//! rasterizes to identical pixel dimensions.

use crate::chunk::ContentChunk;
use crate::image::ImageData;
use crate::qr::{EcLevel, QrParameters};
use chrono::{DateTime, Utc};
use qrcode::{Color, QrCode, Version};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pixels per QR module.
pub const MODULE_SCALE: u32 = 4;

/// Quiet-zone border width in modules, per the QR specification minimum.
pub const QUIET_ZONE_MODULES: u32 = 4;

/// Errors from encoding a chunk into a frame.
#[derive(Debug, Error)]
pub enum FrameEncodeError {
    /// Header plus payload exceeded the selected symbol capacity. This is
    /// an invariant violation: run-uniform selection is sized from the
    /// largest chunk, so it must fit every chunk.
    #[error("chunk {chunk_index}: {needed} bytes exceed symbol capacity {capacity}")]
    CapacityExceeded {
        /// Index of the offending chunk.
        chunk_index: u16,
        /// Header + payload bytes.
        needed: usize,
        /// Capacity of the selected symbol.
        capacity: usize,
    },
    /// The QR library rejected the payload.
    #[error("qr generation failed: {0}")]
    Qr(#[from] qrcode::types::QrError),
}

/// Metadata stamped on every frame of a run. Read-only once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameMetadata {
    /// Frame position, equal to the chunk index at encode time.
    pub frame_index: u16,
    /// Total frames in the run.
    pub total_frames: u16,
    /// BLAKE3 hex digest of the original, pre-compression content.
    /// Shared by all frames of one run.
    pub content_hash: String,
    /// Whether the run's content stream is gzip-compressed.
    pub is_compressed: bool,
    /// Original content size in bytes.
    pub original_size: usize,
    /// Processed (possibly compressed) stream size in bytes.
    pub encoded_size: usize,
    /// Run-wide symbol version.
    pub qr_version: u8,
    /// Run-wide error-correction level.
    pub qr_error_correction: EcLevel,
    /// Frame creation time.
    pub timestamp: DateTime<Utc>,
    /// Chunk identifier this frame carries.
    pub chunk_id: String,
}

/// One rendered still image containing exactly one QR symbol.
///
/// Ownership passes to the muxing collaborator after encoding.
#[derive(Debug, Clone)]
pub struct QrFrame {
    /// Rasterized RGBA pixel grid.
    pub image: ImageData,
    /// Frame metadata.
    pub metadata: FrameMetadata,
    /// Header + payload bytes actually embedded in the symbol.
    pub raw_data: Vec<u8>,
}

/// Run-level fields shared by every frame's metadata.
#[derive(Debug, Clone)]
pub(crate) struct RunMetadata {
    pub content_hash: String,
    pub is_compressed: bool,
    pub original_size: usize,
    pub encoded_size: usize,
    pub total_frames: u16,
}

/// Encodes one chunk into a frame at the run's uniform parameters.
pub(crate) fn encode_frame(
    chunk: &ContentChunk,
    params: &QrParameters,
    run: &RunMetadata,
) -> Result<QrFrame, FrameEncodeError> {
    let header = chunk.header();
    let mut raw_data = Vec::with_capacity(crate::chunk::HEADER_SIZE + chunk.data.len());
    raw_data.extend_from_slice(&header.to_bytes());
    raw_data.extend_from_slice(&chunk.data);

    // Never silently truncate; selection bugs must fail loudly.
    if raw_data.len() > params.max_bytes {
        return Err(FrameEncodeError::CapacityExceeded {
            chunk_index: chunk.chunk_index,
            needed: raw_data.len(),
            capacity: params.max_bytes,
        });
    }

    let code = QrCode::with_version(
        &raw_data,
        Version::Normal(params.version as i16),
        ec_level(params.ec_level),
    )?;

    let image = rasterize(&code);
    let metadata = FrameMetadata {
        frame_index: chunk.chunk_index,
        total_frames: run.total_frames,
        content_hash: run.content_hash.clone(),
        is_compressed: run.is_compressed,
        original_size: run.original_size,
        encoded_size: run.encoded_size,
        qr_version: params.version,
        qr_error_correction: params.ec_level,
        timestamp: Utc::now(),
        chunk_id: chunk.chunk_id.clone(),
    };

    Ok(QrFrame {
        image,
        metadata,
        raw_data,
    })
}

/// Rasterizes a symbol to RGBA: each module becomes a [`MODULE_SCALE`]
/// pixel block, dark modules black and light modules white, full opacity,
/// inside a white quiet-zone border.
fn rasterize(code: &QrCode) -> ImageData {
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let side = (modules + 2 * QUIET_ZONE_MODULES) * MODULE_SCALE;

    // White canvas; only dark modules are painted.
    let mut data = vec![255u8; (side as usize) * (side as usize) * 4];

    for my in 0..modules {
        for mx in 0..modules {
            if colors[(my * modules + mx) as usize] != Color::Dark {
                continue;
            }
            let px0 = (mx + QUIET_ZONE_MODULES) * MODULE_SCALE;
            let py0 = (my + QUIET_ZONE_MODULES) * MODULE_SCALE;
            for py in py0..py0 + MODULE_SCALE {
                for px in px0..px0 + MODULE_SCALE {
                    let base = ((py * side + px) as usize) * 4;
                    data[base] = 0;
                    data[base + 1] = 0;
                    data[base + 2] = 0;
                    // alpha stays 255
                }
            }
        }
    }

    ImageData::new(data, side, side)
}

fn ec_level(level: EcLevel) -> qrcode::EcLevel {
    match level {
        EcLevel::L => qrcode::EcLevel::L,
        EcLevel::M => qrcode::EcLevel::M,
        EcLevel::Q => qrcode::EcLevel::Q,
        EcLevel::H => qrcode::EcLevel::H,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;
    use crate::qr::select_parameters;

    fn run_meta(total: u16) -> RunMetadata {
        RunMetadata {
            content_hash: "test".into(),
            is_compressed: false,
            original_size: 0,
            encoded_size: 0,
            total_frames: total,
        }
    }

    #[test]
    fn test_frame_dimensions_from_version() {
        let chunks = split(&[7u8; 100]).unwrap();
        let params = select_parameters(100 + crate::chunk::HEADER_SIZE);
        let frame = encode_frame(&chunks[0], &params, &run_meta(1)).unwrap();

        let side = (params.modules + 2 * QUIET_ZONE_MODULES) * MODULE_SCALE;
        assert_eq!(frame.image.width(), side);
        assert_eq!(frame.image.height(), side);
        assert!(frame.image.is_valid());
    }

    #[test]
    fn test_raw_data_is_header_plus_payload() {
        let chunks = split(&[42u8; 64]).unwrap();
        let params = select_parameters(64 + crate::chunk::HEADER_SIZE);
        let frame = encode_frame(&chunks[0], &params, &run_meta(1)).unwrap();

        assert_eq!(frame.raw_data.len(), crate::chunk::HEADER_SIZE + 64);
        assert_eq!(&frame.raw_data[crate::chunk::HEADER_SIZE..], &[42u8; 64]);
    }

    #[test]
    fn test_capacity_overflow_fails_loudly() {
        let chunks = split(&[1u8; 500]).unwrap();
        // Deliberately undersized symbol for a 500-byte chunk.
        let params = select_parameters(64);
        let err = encode_frame(&chunks[0], &params, &run_meta(1)).unwrap_err();

        assert!(matches!(err, FrameEncodeError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_opaque_black_and_white_only() {
        let chunks = split(&[3u8; 32]).unwrap();
        let params = select_parameters(32 + crate::chunk::HEADER_SIZE);
        let frame = encode_frame(&chunks[0], &params, &run_meta(1)).unwrap();

        for px in frame.image.data().chunks_exact(4) {
            assert!(px[0] == 0 || px[0] == 255);
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert_eq!(px[3], 255, "alpha must be full opacity");
        }
    }
}
