//! Static capacity table and uniform parameter selection.

use crate::chunk::{ContentChunk, HEADER_SIZE};
use serde::{Deserialize, Serialize};

/// QR error-correction level.
///
/// Higher levels tolerate more visual corruption at the cost of capacity.
/// The table below is built at level M, the balance point for frames that
/// survive lossy video compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcLevel {
    /// ~7% recovery.
    L,
    /// ~15% recovery.
    M,
    /// ~25% recovery.
    Q,
    /// ~30% recovery.
    H,
}

impl std::fmt::Display for EcLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EcLevel::L => write!(f, "L"),
            EcLevel::M => write!(f, "M"),
            EcLevel::Q => write!(f, "Q"),
            EcLevel::H => write!(f, "H"),
        }
    }
}

/// Symbol parameters shared by every frame of one encoding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrParameters {
    /// Symbol version (1-40).
    pub version: u8,
    /// Error-correction level.
    pub ec_level: EcLevel,
    /// Maximum byte-mode capacity at this version/level.
    pub max_bytes: usize,
    /// Modules per side (`17 + 4 * version`).
    pub modules: u32,
}

impl QrParameters {
    /// Descriptive label, e.g. `"v25-M (117x117, 997B)"`.
    pub fn label(&self) -> String {
        format!(
            "v{}-{} ({}x{}, {}B)",
            self.version, self.ec_level, self.modules, self.modules, self.max_bytes
        )
    }
}

const fn entry(version: u8, max_bytes: usize) -> QrParameters {
    QrParameters {
        version,
        ec_level: EcLevel::M,
        max_bytes,
        modules: 17 + 4 * version as u32,
    }
}

/// Byte-mode capacities at error-correction level M, ascending.
///
/// Values are the payload sizes the symbol generator actually accepts,
/// verified at every boundary; v25, v30, and v35 admit slightly less
/// than the nominal character-capacity table.
pub const CAPACITY_TABLE: &[QrParameters] = &[
    entry(1, 14),
    entry(2, 26),
    entry(3, 42),
    entry(4, 62),
    entry(5, 84),
    entry(6, 106),
    entry(7, 122),
    entry(8, 152),
    entry(9, 180),
    entry(10, 213),
    entry(12, 287),
    entry(15, 412),
    entry(18, 560),
    entry(20, 666),
    entry(25, 997),
    entry(30, 1370),
    entry(35, 1809),
    entry(40, 2331),
];

/// Largest payload one symbol can hold: the table's top capacity.
///
/// The chunk splitter derives its payload bound from this constant, which
/// is what guarantees [`select_parameters`] always finds a fitting entry
/// for well-formed chunks.
pub const MAX_CHUNK_SIZE: usize = 2331;

/// Selects the smallest symbol that fits `total_bytes` (header included).
///
/// Scans the capacity table in ascending order and returns the first entry
/// whose capacity is sufficient. If nothing fits, returns the top entry;
/// that only happens when a chunk was produced outside the splitter's
/// bound, which is a configuration bug rather than a runtime condition.
pub fn select_parameters(total_bytes: usize) -> QrParameters {
    for params in CAPACITY_TABLE {
        if params.max_bytes >= total_bytes {
            return *params;
        }
    }
    debug_assert!(
        total_bytes <= MAX_CHUNK_SIZE,
        "chunk of {total_bytes} bytes exceeds MAX_CHUNK_SIZE"
    );
    CAPACITY_TABLE[CAPACITY_TABLE.len() - 1]
}

/// Selects one parameter set for an entire run.
///
/// Sized from the largest chunk plus header so the single selection fits
/// every chunk. Applying per-chunk parameters would produce frames of
/// differing pixel dimensions, which is not a valid video stream.
pub fn select_uniform_parameters(chunks: &[ContentChunk]) -> QrParameters {
    let largest = chunks.iter().map(|c| c.data.len()).max().unwrap_or(0);
    select_parameters(largest + HEADER_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::split;

    #[test]
    fn test_table_ascending() {
        for pair in CAPACITY_TABLE.windows(2) {
            assert!(pair[0].max_bytes < pair[1].max_bytes);
            assert!(pair[0].version < pair[1].version);
        }
    }

    #[test]
    fn test_max_chunk_size_matches_table_top() {
        let top = CAPACITY_TABLE[CAPACITY_TABLE.len() - 1];
        assert_eq!(MAX_CHUNK_SIZE, top.max_bytes);
    }

    #[test]
    fn test_smallest_fitting_entry() {
        assert_eq!(select_parameters(10).version, 1);
        assert_eq!(select_parameters(14).version, 1);
        assert_eq!(select_parameters(15).version, 2);
        assert_eq!(select_parameters(997).version, 25);
        assert_eq!(select_parameters(998).version, 30);
        assert_eq!(select_parameters(1809).version, 35);
        assert_eq!(select_parameters(1810).version, 40);
    }

    #[test]
    fn test_oversized_returns_top_entry() {
        let params = select_parameters(MAX_CHUNK_SIZE);
        assert_eq!(params.version, 40);
    }

    #[test]
    fn test_module_count() {
        assert_eq!(select_parameters(14).modules, 21); // v1
        assert_eq!(select_parameters(2331).modules, 177); // v40
    }

    #[test]
    fn test_uniform_selection_sized_for_largest() {
        // Chunks of 50, 2000, 100 bytes: one selection, sized for 2000+16.
        let mut chunks = split(&vec![1u8; 50]).unwrap();
        chunks.extend(split(&vec![2u8; 2000]).unwrap());
        chunks.extend(split(&vec![3u8; 100]).unwrap());

        let params = select_uniform_parameters(&chunks);
        assert!(params.max_bytes >= 2000 + HEADER_SIZE);
        assert_eq!(params, select_parameters(2000 + HEADER_SIZE));
    }
}
