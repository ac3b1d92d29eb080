//! Fixed 16-byte chunk header wire codec.
//!
//! Every frame payload begins with this header. The layout is big-endian
//! and bit-exact so that frames survive re-encoding by external tools:
//!
//! ```text
//! offset 0  u32  magic sentinel (0x4D454D56)
//! offset 4  u16  chunk index
//! offset 6  u16  total chunks
//! offset 8  u32  payload byte length (excluding header)
//! offset 12 u32  chunk-id hash (debug traceability only)
//! ```

use thiserror::Error;

/// Magic sentinel identifying the chunk format.
pub const FRAME_MAGIC: u32 = 0x4D45_4D56;

/// Size of the wire header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Errors from parsing or validating a chunk header.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Fewer than [`HEADER_SIZE`] bytes were available.
    #[error("buffer too short for header: {0} bytes")]
    TooShort(usize),
    /// The magic sentinel did not match [`FRAME_MAGIC`].
    #[error("bad magic number: {0:#010x}")]
    BadMagic(u32),
    /// `total_chunks` was zero.
    #[error("total chunks is zero")]
    ZeroTotal,
    /// `chunk_index` was not less than `total_chunks`.
    #[error("chunk index {index} out of range (total {total})")]
    IndexOutOfRange {
        /// The offending chunk index.
        index: u16,
        /// The declared total.
        total: u16,
    },
    /// `data_length` was zero.
    #[error("data length is zero")]
    ZeroLength,
    /// `data_length` exceeded the bytes actually available after the header.
    #[error("data length {declared} exceeds available payload {available}")]
    LengthOverrun {
        /// Length declared in the header.
        declared: u32,
        /// Bytes actually available after the header.
        available: u32,
    },
}

/// Parsed chunk header.
///
/// Invariants (enforced by [`ChunkHeader::parse`]):
/// `chunk_index < total_chunks`, `total_chunks > 0`, `data_length > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Position of this chunk in the run, starting at zero.
    pub chunk_index: u16,
    /// Total number of chunks in the run.
    pub total_chunks: u16,
    /// Payload byte length, excluding the header itself.
    pub data_length: u32,
    /// Hash of the human-readable chunk id. Opaque metadata, never
    /// validated against content.
    pub chunk_id_hash: u32,
}

impl ChunkHeader {
    /// Serializes the header into its fixed 16-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&FRAME_MAGIC.to_be_bytes());
        out[4..6].copy_from_slice(&self.chunk_index.to_be_bytes());
        out[6..8].copy_from_slice(&self.total_chunks.to_be_bytes());
        out[8..12].copy_from_slice(&self.data_length.to_be_bytes());
        out[12..16].copy_from_slice(&self.chunk_id_hash.to_be_bytes());
        out
    }

    /// Parses and validates a header from the front of `bytes`.
    ///
    /// `bytes` is the full decoded buffer (header plus payload); the
    /// declared payload length is checked against the bytes remaining
    /// after the header.
    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::TooShort(bytes.len()));
        }

        let magic = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != FRAME_MAGIC {
            return Err(HeaderError::BadMagic(magic));
        }

        let chunk_index = u16::from_be_bytes([bytes[4], bytes[5]]);
        let total_chunks = u16::from_be_bytes([bytes[6], bytes[7]]);
        let data_length = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let chunk_id_hash = u32::from_be_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

        if total_chunks == 0 {
            return Err(HeaderError::ZeroTotal);
        }
        if chunk_index >= total_chunks {
            return Err(HeaderError::IndexOutOfRange {
                index: chunk_index,
                total: total_chunks,
            });
        }
        if data_length == 0 {
            return Err(HeaderError::ZeroLength);
        }
        let available = (bytes.len() - HEADER_SIZE) as u32;
        if data_length > available {
            return Err(HeaderError::LengthOverrun {
                declared: data_length,
                available,
            });
        }

        Ok(Self {
            chunk_index,
            total_chunks,
            data_length,
            chunk_id_hash,
        })
    }
}

/// 32-bit FNV-1a hash used for the debug-only chunk-id field.
///
/// Not a checksum; a stable, cheap fingerprint of the chunk id string.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChunkHeader {
        ChunkHeader {
            chunk_index: 3,
            total_chunks: 7,
            data_length: 1024,
            chunk_id_hash: fnv1a_32(b"run-0003"),
        }
    }

    #[test]
    fn test_wire_layout() {
        let bytes = sample().to_bytes();
        assert_eq!(&bytes[0..4], &[0x4D, 0x45, 0x4D, 0x56]);
        assert_eq!(&bytes[4..6], &[0, 3]);
        assert_eq!(&bytes[6..8], &[0, 7]);
        assert_eq!(&bytes[8..12], &[0, 0, 4, 0]);
    }

    #[test]
    fn test_round_trip() {
        let header = sample();
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 1024]);

        assert_eq!(ChunkHeader::parse(&buf).unwrap(), header);
    }

    #[test]
    fn test_too_short_never_panics() {
        for len in 0..HEADER_SIZE {
            assert_eq!(
                ChunkHeader::parse(&vec![0u8; len]),
                Err(HeaderError::TooShort(len))
            );
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = sample().to_bytes().to_vec();
        buf[0] = 0xFF;
        buf.extend_from_slice(&[0u8; 1024]);
        assert!(matches!(
            ChunkHeader::parse(&buf),
            Err(HeaderError::BadMagic(_))
        ));
    }

    #[test]
    fn test_zero_total_rejected() {
        let mut header = sample();
        header.total_chunks = 0;
        header.chunk_index = 0;
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 1024]);
        assert_eq!(ChunkHeader::parse(&buf), Err(HeaderError::ZeroTotal));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut header = sample();
        header.chunk_index = 7;
        let mut buf = header.to_bytes().to_vec();
        buf.extend_from_slice(&[0u8; 1024]);
        assert_eq!(
            ChunkHeader::parse(&buf),
            Err(HeaderError::IndexOutOfRange { index: 7, total: 7 })
        );
    }

    #[test]
    fn test_length_overrun() {
        let buf = sample().to_bytes().to_vec(); // no payload at all
        assert_eq!(
            ChunkHeader::parse(&buf),
            Err(HeaderError::LengthOverrun {
                declared: 1024,
                available: 0
            })
        );
    }

    #[test]
    fn test_fnv1a_known_vector() {
        // FNV-1a("") is the offset basis; FNV-1a("a") = 0xe40c292c
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
    }
}
