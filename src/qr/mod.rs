//! QR symbol parameters and capacity planning.
//!
//! Capacity figures are static data from the QR specification; parameter
//! selection scans them once per encoding run so that every frame in the
//! run shares one symbol version and therefore identical pixel geometry.

mod capacity;

pub use capacity::{
    select_parameters, select_uniform_parameters, EcLevel, QrParameters, CAPACITY_TABLE,
    MAX_CHUNK_SIZE,
};
