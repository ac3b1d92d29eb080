//! Content chunking.
//!
//! This module divides a byte buffer into bounded-size chunks, each
//! independently encodable into one QR frame. Chunk payload capacity is
//! derived from the top entry of the capacity table so that any chunk,
//! once prefixed with its header, fits the largest supported symbol.

mod header;

pub use header::{fnv1a_32, ChunkHeader, HeaderError, FRAME_MAGIC, HEADER_SIZE};

use crate::qr::MAX_CHUNK_SIZE;
use thiserror::Error;

/// Errors from splitting content into chunks.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SplitError {
    /// The input buffer was empty. Zero-length payloads violate the
    /// header's `data_length > 0` invariant and are rejected up front.
    #[error("cannot split empty input")]
    EmptyInput,
    /// The input would require more chunks than a `u16` index can address.
    #[error("input of {bytes} bytes needs {chunks} chunks, more than {max} addressable")]
    TooManyChunks {
        /// Input length in bytes.
        bytes: usize,
        /// Chunks that would be required.
        chunks: usize,
        /// Maximum addressable chunk count.
        max: usize,
    },
}

/// One bounded-size slice of the content stream.
///
/// Created by [`split`], consumed once by the frame encoder and not
/// retained afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChunk {
    /// Chunk payload bytes (header not included).
    pub data: Vec<u8>,
    /// Position of this chunk in the run.
    pub chunk_index: u16,
    /// Total chunks in the run.
    pub total_chunks: u16,
    /// Human-readable chunk identifier, unique within the run. Only its
    /// 32-bit hash travels on the wire.
    pub chunk_id: String,
}

impl ContentChunk {
    /// Builds the wire header for this chunk.
    pub fn header(&self) -> ChunkHeader {
        ChunkHeader {
            chunk_index: self.chunk_index,
            total_chunks: self.total_chunks,
            data_length: self.data.len() as u32,
            chunk_id_hash: fnv1a_32(self.chunk_id.as_bytes()),
        }
    }
}

/// Maximum payload bytes per chunk, leaving room for the wire header.
pub const fn max_payload_size() -> usize {
    MAX_CHUNK_SIZE - HEADER_SIZE
}

/// Splits `data` into fixed-capacity chunks tagged with index/total.
///
/// The payload size is `min(MAX_CHUNK_SIZE - HEADER_SIZE, data.len())`;
/// the last chunk may be shorter. Every chunk receives a fresh id derived
/// from the content digest, its index, and the wall clock, unique within
/// the run. Ordering during reconstruction uses `chunk_index`, never ids.
pub fn split(data: &[u8]) -> Result<Vec<ContentChunk>, SplitError> {
    if data.is_empty() {
        return Err(SplitError::EmptyInput);
    }

    let payload_size = max_payload_size().min(data.len());
    let total = data.len().div_ceil(payload_size);
    if total > u16::MAX as usize {
        return Err(SplitError::TooManyChunks {
            bytes: data.len(),
            chunks: total,
            max: u16::MAX as usize,
        });
    }

    // Run token: content digest prefix + timestamp, shared by all ids in
    // this run so chunk ids are traceable back to one encode call.
    let digest = blake3::hash(data).to_hex();
    let run_token = &digest[..8];
    let stamp = chrono::Utc::now().timestamp_millis();

    let chunks = data
        .chunks(payload_size)
        .enumerate()
        .map(|(i, slice)| ContentChunk {
            data: slice.to_vec(),
            chunk_index: i as u16,
            total_chunks: total as u16,
            chunk_id: format!("{run_token}-{i:05}-{stamp}"),
        })
        .collect();

    Ok(chunks)
}
