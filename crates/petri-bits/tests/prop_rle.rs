use petri_bits::BitStream;
use proptest::prelude::*;

fn stream_from(bytes: &[u8]) -> BitStream {
    let mut bs = BitStream::new();
    for &b in bytes {
        bs.push_byte(b);
    }
    bs
}

proptest! {
    // decode_run_length8 inverts run_length_encode8 for arbitrary byte input,
    // including runs long enough to span several emitted groups.
    #[test]
    fn rle8_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let bs = stream_from(&bytes);
        let mut encoded = BitStream::new();
        bs.run_length_encode8(&mut encoded);
        let mut decoded = BitStream::new();
        encoded.decode_run_length8(&mut decoded);
        prop_assert_eq!(decoded.bytes(), bs.bytes());
    }

    // Zero-heavy input round-trips too, and the counter never saturates past 127
    #[test]
    fn rle8_round_trips_sparse(
        positions in proptest::collection::vec((0usize..512, any::<u8>()), 0..8),
    ) {
        let mut bytes = vec![0u8; 512];
        for (pos, val) in positions {
            bytes[pos] = val;
        }
        let bs = stream_from(&bytes);
        let mut encoded = BitStream::new();
        bs.run_length_encode8(&mut encoded);
        let mut decoded = BitStream::new();
        encoded.decode_run_length8(&mut decoded);
        prop_assert_eq!(decoded.bytes(), bs.bytes());
    }

    // Bit-level pushes reassemble into the same bytes once flushed
    #[test]
    fn push_low_bit_matches_push_byte(bytes in proptest::collection::vec(any::<u8>(), 1..64)) {
        let direct = stream_from(&bytes);
        let mut bitwise = BitStream::new();
        for &b in &bytes {
            for bit in 0..8 {
                bitwise.push_low_bit((b >> bit) & 1);
            }
        }
        bitwise.flush();
        prop_assert_eq!(bitwise.bytes(), direct.bytes());
    }

    // Zero-chunk output never contains a bare 0xFF count byte (0xFF is the escape)
    #[test]
    fn zero_chunk_counts_stay_below_escape(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let bs = stream_from(&bytes);
        let mut encoded = BitStream::new();
        bs.run_length_encode_zero_chunk8(&mut encoded);
        let mut i = 0;
        let out = encoded.bytes();
        while i < out.len() {
            if out[i] == 0xff {
                // Escape consumes the literal that follows
                prop_assert!(i + 1 < out.len());
                i += 2;
            } else {
                prop_assert!(out[i] >= 1 && out[i] <= 0x7f);
                i += 1;
            }
        }
    }
}
