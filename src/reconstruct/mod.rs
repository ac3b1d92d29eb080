//! Sequence reconstruction.
//!
//! Reassembles the original content from decoded frames that may arrive
//! partial, duplicated, or out of order. Reconstruction is all-or-nothing
//! once the expected index range is known: missing chunk indices fail the
//! call with an explicit list so the caller can re-request exactly those
//! frames (e.g. by re-extracting stills at adjusted timestamps).

use crate::decode::DecodedFrame;
use crate::encode::{decompress, has_gzip_signature};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors terminal to one reconstruction call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconstructError {
    /// No frame in the input decoded successfully.
    #[error("no valid frames to reconstruct from")]
    NoValidFrames,
    /// Valid frames disagreed about the run's total chunk count. A single
    /// corrupted-but-parseable header would otherwise desync the expected
    /// index range, so disagreement is surfaced as its own error rather
    /// than a misleading missing-frames report.
    #[error("frames disagree on total chunks: expected {expected}, frame {frame_index} says {found}")]
    TotalChunksMismatch {
        /// Total declared by the first valid frame.
        expected: u16,
        /// Conflicting total.
        found: u16,
        /// Source index of the conflicting frame.
        frame_index: usize,
    },
    /// One or more chunk indices had no valid frame.
    #[error("missing {} of {total} chunks: {missing:?}", .missing.len())]
    MissingFrames {
        /// Chunk indices with no valid frame, ascending.
        missing: Vec<u16>,
        /// Expected total chunks.
        total: u16,
        /// Valid frames that were available.
        processed: usize,
    },
}

/// Metadata accompanying a successful reconstruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconstructionMetadata {
    /// Total chunks in the run.
    pub total_frames: u16,
    /// Valid frames consumed (after duplicate suppression this may exceed
    /// `total_frames`).
    pub processed_frames: usize,
    /// Whether the concatenated stream carried the gzip signature and was
    /// decompressed.
    pub is_compressed: bool,
    /// Size of the reconstructed content in bytes.
    pub original_size: usize,
    /// BLAKE3 hex digest of the reconstructed content, for caller-side
    /// comparison against the hash stamped at encode time.
    pub content_hash: String,
}

/// Successful reconstruction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    /// The reconstructed original bytes.
    pub content: Vec<u8>,
    /// Reconstruction metadata.
    pub metadata: ReconstructionMetadata,
}

/// Diagnostic report from [`validate_sequence`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    /// Expected total chunks (0 when no frame was valid).
    pub total_chunks: u16,
    /// Chunk indices with no valid frame, ascending.
    pub missing: Vec<u16>,
    /// Source indices of frames superseded as duplicates (all but the
    /// first occurrence per chunk index).
    pub duplicates: Vec<usize>,
    /// Source indices of frames that failed basic decode.
    pub invalid: Vec<usize>,
}

impl SequenceReport {
    /// True when every chunk index is covered by a valid frame.
    pub fn is_complete(&self) -> bool {
        self.total_chunks > 0 && self.missing.is_empty()
    }
}

/// Reconstructs the original content from decoded frames.
///
/// Duplicate frames at the same chunk index are tolerated; the first
/// occurrence wins and later ones are superseded, never merged.
pub fn reconstruct(frames: &[DecodedFrame]) -> Result<Reconstruction, ReconstructError> {
    let valid: Vec<&DecodedFrame> = frames.iter().filter(|f| f.is_valid).collect();
    if valid.is_empty() {
        return Err(ReconstructError::NoValidFrames);
    }

    let total = expected_total(&valid)?;
    let by_index = map_by_chunk_index(&valid);

    let missing: Vec<u16> = (0..total).filter(|i| !by_index.contains_key(i)).collect();
    if !missing.is_empty() {
        warn!(?missing, total, "reconstruction missing chunks");
        return Err(ReconstructError::MissingFrames {
            missing,
            total,
            processed: valid.len(),
        });
    }

    // BTreeMap iteration gives canonical chunk order.
    let mut buffer = Vec::new();
    for frame in by_index.values() {
        buffer.extend_from_slice(&frame.payload);
    }

    // Compression is opportunistic: a failed decompression falls back to
    // treating the buffer as plaintext instead of failing the call.
    let (content, is_compressed) = if has_gzip_signature(&buffer) {
        match decompress(&buffer) {
            Ok(original) => (original, true),
            Err(e) => {
                warn!("gzip signature present but decompression failed, using raw bytes: {e}");
                (buffer, false)
            }
        }
    } else {
        (buffer, false)
    };

    let content_hash = blake3::hash(&content).to_hex().to_string();
    info!(
        chunks = total,
        bytes = content.len(),
        is_compressed,
        "reconstruction complete"
    );

    Ok(Reconstruction {
        metadata: ReconstructionMetadata {
            total_frames: total,
            processed_frames: valid.len(),
            is_compressed,
            original_size: content.len(),
            content_hash,
        },
        content,
    })
}

/// Validates a frame sequence without reconstructing.
///
/// Classifies every input frame as valid, duplicate, or invalid, and
/// lists the chunk indices still missing. Unlike [`reconstruct`], a
/// `total_chunks` disagreement is folded into the report (the conflicting
/// frame counts as a duplicate source of confusion, not a hard error),
/// since this path exists for diagnostics.
pub fn validate_sequence(frames: &[DecodedFrame]) -> SequenceReport {
    let mut report = SequenceReport {
        invalid: frames
            .iter()
            .filter(|f| !f.is_valid)
            .map(|f| f.frame_index)
            .collect(),
        ..Default::default()
    };

    let valid: Vec<&DecodedFrame> = frames.iter().filter(|f| f.is_valid).collect();
    let Some(first) = valid.first() else {
        return report;
    };
    // Headers are only present on valid frames.
    let total = first.header.map(|h| h.total_chunks).unwrap_or(0);
    report.total_chunks = total;

    let mut seen: BTreeMap<u16, usize> = BTreeMap::new();
    for frame in &valid {
        let Some(header) = frame.header else { continue };
        if seen.contains_key(&header.chunk_index) {
            report.duplicates.push(frame.frame_index);
        } else {
            seen.insert(header.chunk_index, frame.frame_index);
        }
    }

    report.missing = (0..total).filter(|i| !seen.contains_key(i)).collect();
    report
}

/// Degraded-path entry point: richer diagnostics for incomplete inputs.
///
/// Runs the sequence validator first; when the sequence turns out
/// complete, delegates to [`reconstruct`]. Otherwise fails with the
/// missing-index list. This path never synthesizes placeholder content
/// into the output stream.
pub fn attempt_partial(frames: &[DecodedFrame]) -> Result<Reconstruction, ReconstructError> {
    let report = validate_sequence(frames);
    debug!(
        total = report.total_chunks,
        missing = report.missing.len(),
        duplicates = report.duplicates.len(),
        invalid = report.invalid.len(),
        "sequence validated"
    );

    if report.total_chunks == 0 {
        return Err(ReconstructError::NoValidFrames);
    }
    if !report.is_complete() {
        let processed = frames.iter().filter(|f| f.is_valid).count();
        return Err(ReconstructError::MissingFrames {
            missing: report.missing,
            total: report.total_chunks,
            processed,
        });
    }
    reconstruct(frames)
}

/// Reads `total_chunks` from the first valid frame and cross-checks that
/// every other valid frame agrees.
fn expected_total(valid: &[&DecodedFrame]) -> Result<u16, ReconstructError> {
    let mut expected: Option<u16> = None;
    for frame in valid {
        let Some(header) = frame.header else { continue };
        match expected {
            None => expected = Some(header.total_chunks),
            Some(total) if header.total_chunks != total => {
                return Err(ReconstructError::TotalChunksMismatch {
                    expected: total,
                    found: header.total_chunks,
                    frame_index: frame.frame_index,
                });
            }
            Some(_) => {}
        }
    }
    expected.ok_or(ReconstructError::NoValidFrames)
}

/// Maps chunk index to the first valid frame seen at that index.
fn map_by_chunk_index<'a>(valid: &[&'a DecodedFrame]) -> BTreeMap<u16, &'a DecodedFrame> {
    let mut map: BTreeMap<u16, &DecodedFrame> = BTreeMap::new();
    for frame in valid {
        if let Some(header) = frame.header {
            map.entry(header.chunk_index).or_insert(frame);
        }
    }
    map
}
