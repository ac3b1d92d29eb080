//! Property test: any nonempty payload survives the full codec.

use proptest::prelude::*;
use qrframe::decode::{DecodedFrame, FrameDecoder};
use qrframe::encode::Encoder;
use qrframe::reconstruct::reconstruct;

proptest! {
    // Symbol generation and detection dominate runtime; a small case
    // count still covers length edges via the explicit tests above it.
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_round_trip(data in proptest::collection::vec(any::<u8>(), 1..3000)) {
        let encoded = Encoder::new().encode(&data).unwrap();

        let decoder = FrameDecoder::new();
        let frames: Vec<DecodedFrame> = encoded
            .frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                let chunk = decoder.decode_frame(&frame.image).unwrap();
                DecodedFrame {
                    frame_index: i,
                    header: Some(chunk.header),
                    payload: chunk.payload,
                    is_valid: true,
                    error: None,
                }
            })
            .collect();

        let result = reconstruct(&frames).unwrap();
        prop_assert_eq!(result.content, data);
    }

    #[test]
    fn prop_short_buffers_never_parse(data in proptest::collection::vec(any::<u8>(), 0..16)) {
        prop_assert!(qrframe::ChunkHeader::parse(&data).is_err());
    }
}
