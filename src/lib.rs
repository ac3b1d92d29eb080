//! qrframe — content-to-frame codec.
//!
//! Encodes arbitrary byte payloads as sequences of QR-code stills with
//! run-uniform pixel geometry, suitable for muxing into a video container
//! used purely as a durable, frame-addressable blob store; and recovers
//! the original payload from decoded stills that may be incomplete,
//! duplicated, reordered, or degraded by lossy video compression.
//!
//! # Architecture
//!
//! The codec follows an explicit data flow:
//!
//! ```text
//! encode:  bytes → [compress?] → chunks → uniform QR frames → (mux, external)
//! decode:  (demux, external) → stills → decoded frames → ordered chunks
//!                                      → [decompress?] → original bytes
//! ```
//!
//! # Design Principles
//!
//! - **Uniform geometry**: one symbol parameter set per run, sized from
//!   the largest chunk, so every frame has identical pixel dimensions.
//! - **Self-describing chunks**: every frame carries a fixed 16-byte
//!   header; reconstruction needs no out-of-band state.
//! - **Frame failures stay frame-local**: a failed or timed-out decode
//!   never aborts a batch; missing chunks surface as a structured error
//!   listing exactly which indices to re-request.
//! - **Opportunistic compression**: gzip is applied only when it clears a
//!   size threshold and is detected by signature on the way back.
//!
//! # Example
//!
//! ```no_run
//! use qrframe::{
//!     decode::{BatchDecoder, BatchOptions},
//!     encode::Encoder,
//!     reconstruct,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let encoded = Encoder::new().encode(b"hello, frames").unwrap();
//! let stills = encoded.frames.iter().map(|f| f.image.clone()).collect();
//!
//! let decoder = BatchDecoder::new(BatchOptions::default());
//! let frames = decoder.decode_batch(stills, None).await;
//!
//! let result = reconstruct::reconstruct(&frames).unwrap();
//! assert_eq!(result.content, b"hello, frames");
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod chunk;
pub mod config;
pub mod decode;
pub mod encode;
pub mod extract;
pub mod image;
pub mod qr;
pub mod reconstruct;

// Re-export commonly used types at crate root
pub use chunk::{ChunkHeader, ContentChunk, HeaderError, FRAME_MAGIC, HEADER_SIZE};
pub use decode::{BatchDecoder, BatchOptions, DecodedFrame, FrameDecoder};
pub use encode::{Encoder, EncodingResult, FrameMetadata, QrFrame};
pub use image::ImageData;
pub use qr::{QrParameters, MAX_CHUNK_SIZE};
pub use reconstruct::{Reconstruction, ReconstructError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
