//! Opportunistic gzip compression envelope.
//!
//! Compression is accepted only when it clears a size threshold; the
//! reconstructed stream is sniffed for the gzip signature, so decompression
//! never depends on out-of-band state.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::{debug, warn};

/// Standard gzip signature bytes.
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Fraction of the original size a compressed form must stay below.
pub const COMPRESSION_THRESHOLD: f64 = 0.9;

/// Compresses `data` if doing so clears [`COMPRESSION_THRESHOLD`].
///
/// Returns the processed bytes and whether compression was applied. The
/// original bytes are kept whenever gzip would not save at least 10%,
/// including on (unlikely) encoder I/O failure.
pub fn maybe_compress(data: &[u8]) -> (Vec<u8>, bool) {
    let compressed = match gzip(data) {
        Ok(out) => out,
        Err(e) => {
            warn!("gzip failed, storing uncompressed: {e}");
            return (data.to_vec(), false);
        }
    };

    let limit = (data.len() as f64 * COMPRESSION_THRESHOLD) as usize;
    if compressed.len() < limit {
        debug!(
            original = data.len(),
            compressed = compressed.len(),
            "compression accepted"
        );
        (compressed, true)
    } else {
        debug!(
            original = data.len(),
            compressed = compressed.len(),
            "compression below threshold, keeping original"
        );
        (data.to_vec(), false)
    }
}

/// Returns true if `data` starts with the gzip signature.
pub fn has_gzip_signature(data: &[u8]) -> bool {
    data.len() >= 2 && data[0..2] == GZIP_MAGIC
}

/// Decompresses a gzip stream.
pub fn decompress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
