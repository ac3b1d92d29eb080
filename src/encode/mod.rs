//! Encoding orchestration.
//!
//! Drives the full forward pipeline: normalize to bytes, hash, optionally
//! compress, split into chunks, select one run-wide symbol parameter set,
//! and render every chunk at those parameters so all frames share
//! identical pixel geometry.

mod compress;
mod frame;

pub use compress::{
    decompress, has_gzip_signature, maybe_compress, COMPRESSION_THRESHOLD, GZIP_MAGIC,
};
pub use frame::{
    FrameEncodeError, FrameMetadata, QrFrame, MODULE_SCALE, QUIET_ZONE_MODULES,
};

use crate::chunk::{self, SplitError};
use crate::qr::{select_uniform_parameters, QrParameters};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors from an encoding run.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Splitting failed (empty or oversized input).
    #[error(transparent)]
    Split(#[from] SplitError),
    /// A chunk could not be rendered as a frame.
    #[error(transparent)]
    Frame(#[from] FrameEncodeError),
}

/// Manifest entry mapping one chunk to its byte offset in the processed
/// (possibly compressed) stream. Informational; reconstruction does not
/// need it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Frame index carrying this chunk.
    pub frame_index: u16,
    /// Byte offset of the chunk payload in the processed stream.
    pub byte_offset: usize,
}

/// Run-level summary of an encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingMetadata {
    /// Number of frames produced (== total chunks).
    pub total_frames: u16,
    /// BLAKE3 hex digest of the original content.
    pub content_hash: String,
    /// Whether the stream was gzip-compressed.
    pub is_compressed: bool,
    /// Original content size in bytes.
    pub original_size: usize,
    /// Processed stream size in bytes.
    pub encoded_size: usize,
    /// `original_size / encoded_size`.
    pub compression_ratio: f64,
    /// Run-wide symbol parameters.
    pub parameters: QrParameters,
}

/// Terminal output of [`Encoder::encode`].
#[derive(Debug)]
pub struct EncodingResult {
    /// Frames in chunk order, all with identical dimensions.
    pub frames: Vec<QrFrame>,
    /// Run summary.
    pub metadata: EncodingMetadata,
    /// Informational chunk-to-offset manifest.
    pub manifest: Vec<ManifestEntry>,
}

/// Configuration for an [`Encoder`].
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Attempt gzip compression before splitting.
    pub compression: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self { compression: true }
    }
}

/// Encodes arbitrary content into a run of uniform-geometry QR frames.
///
/// Stateless across calls; every run selects its own parameters.
#[derive(Debug, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    /// Creates an encoder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with the given configuration.
    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Encodes `content` into a run of frames.
    ///
    /// The content hash is computed over the original bytes before any
    /// compression, so the decode side can verify against it regardless
    /// of whether the stream was compressed.
    pub fn encode(&self, content: &[u8]) -> Result<EncodingResult, EncodeError> {
        let content_hash = blake3::hash(content).to_hex().to_string();
        let original_size = content.len();

        let (processed, is_compressed) = if self.config.compression {
            maybe_compress(content)
        } else {
            (content.to_vec(), false)
        };
        let encoded_size = processed.len();

        let chunks = chunk::split(&processed)?;
        let params = select_uniform_parameters(&chunks);
        debug!(
            chunks = chunks.len(),
            params = %params.label(),
            "selected run parameters"
        );

        let run = frame::RunMetadata {
            content_hash: content_hash.clone(),
            is_compressed,
            original_size,
            encoded_size,
            total_frames: chunks.len() as u16,
        };

        let mut frames = Vec::with_capacity(chunks.len());
        let mut manifest = Vec::with_capacity(chunks.len());
        let mut byte_offset = 0usize;
        for chunk in &chunks {
            manifest.push(ManifestEntry {
                chunk_id: chunk.chunk_id.clone(),
                frame_index: chunk.chunk_index,
                byte_offset,
            });
            byte_offset += chunk.data.len();
            frames.push(frame::encode_frame(chunk, &params, &run)?);
        }

        info!(
            frames = frames.len(),
            original = original_size,
            encoded = encoded_size,
            compressed = is_compressed,
            "encoding complete"
        );

        Ok(EncodingResult {
            frames,
            metadata: EncodingMetadata {
                total_frames: run.total_frames,
                content_hash,
                is_compressed,
                original_size,
                encoded_size,
                compression_ratio: original_size as f64 / encoded_size as f64,
                parameters: params,
            },
            manifest,
        })
    }

    /// Convenience wrapper for string content.
    pub fn encode_str(&self, content: &str) -> Result<EncodingResult, EncodeError> {
        self.encode(content.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkHeader, HEADER_SIZE};

    #[test]
    fn test_empty_input_rejected() {
        let err = Encoder::new().encode(&[]).unwrap_err();
        assert!(matches!(err, EncodeError::Split(SplitError::EmptyInput)));
    }

    #[test]
    fn test_frame_count_matches_chunks() {
        let data = vec![0x5Au8; 6000];
        let result = Encoder::with_config(EncoderConfig { compression: false })
            .encode(&data)
            .unwrap();

        assert_eq!(result.frames.len() as u16, result.metadata.total_frames);
        assert_eq!(result.frames.len(), result.manifest.len());
        assert!(result.frames.len() > 1);
    }

    #[test]
    fn test_uniform_geometry() {
        let data: Vec<u8> = (0..6000u32).map(|i| (i % 241) as u8).collect();
        let result = Encoder::with_config(EncoderConfig { compression: false })
            .encode(&data)
            .unwrap();

        let w = result.frames[0].image.width();
        let h = result.frames[0].image.height();
        for frame in &result.frames {
            assert_eq!(frame.image.width(), w);
            assert_eq!(frame.image.height(), h);
        }
    }

    #[test]
    fn test_repetitive_content_is_compressed() {
        let data = vec![b'x'; 10_000];
        let result = Encoder::new().encode(&data).unwrap();

        assert!(result.metadata.is_compressed);
        assert!(result.metadata.encoded_size < data.len() * 9 / 10);
        assert!(result.metadata.compression_ratio > 1.0);
        for frame in &result.frames {
            assert!(frame.metadata.is_compressed);
        }
    }

    #[test]
    fn test_high_entropy_content_not_compressed() {
        let data: Vec<u8> = (0..50u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 13) as u8)
            .collect();
        let result = Encoder::new().encode(&data).unwrap();

        assert!(!result.metadata.is_compressed);
        assert_eq!(result.metadata.encoded_size, data.len());
    }

    #[test]
    fn test_content_hash_is_pre_compression() {
        let data = vec![b'z'; 4000];
        let result = Encoder::new().encode(&data).unwrap();

        assert!(result.metadata.is_compressed);
        assert_eq!(
            result.metadata.content_hash,
            blake3::hash(&data).to_hex().to_string()
        );
    }

    #[test]
    fn test_manifest_offsets_cover_stream() {
        let data = vec![0x11u8; 5000];
        let result = Encoder::with_config(EncoderConfig { compression: false })
            .encode(&data)
            .unwrap();

        let mut expected_offset = 0;
        for (entry, frame) in result.manifest.iter().zip(&result.frames) {
            assert_eq!(entry.byte_offset, expected_offset);
            assert_eq!(entry.frame_index, frame.metadata.frame_index);
            expected_offset += frame.raw_data.len() - HEADER_SIZE;
        }
        assert_eq!(expected_offset, result.metadata.encoded_size);
    }

    #[test]
    fn test_embedded_headers_parse() {
        let data = vec![0x42u8; 3000];
        let result = Encoder::with_config(EncoderConfig { compression: false })
            .encode(&data)
            .unwrap();

        for (i, frame) in result.frames.iter().enumerate() {
            let header = ChunkHeader::parse(&frame.raw_data).unwrap();
            assert_eq!(header.chunk_index as usize, i);
            assert_eq!(header.total_chunks as usize, result.frames.len());
        }
    }
}
