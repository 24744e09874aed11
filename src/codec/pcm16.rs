//! PCM16 wire codec
//!
//! Floats in [-1, 1] map to signed 16-bit little-endian integers. Encoding
//! scales by 32767 so that +1.0 never overflows; decoding divides by 32768,
//! so the round trip is lossy by at most one and a half quantization steps.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::CodecError;

const ENCODE_SCALE: f32 = 32767.0;
const DECODE_SCALE: f32 = 32768.0;

/// Encode samples to PCM16 LE, two bytes per sample
pub fn encode(samples: &[f32]) -> Bytes {
    let mut out = BytesMut::with_capacity(samples.len() * 2);
    encode_into(samples, &mut out);
    out.freeze()
}

/// Encode samples, appending to `out`
pub fn encode_into(samples: &[f32], out: &mut BytesMut) {
    out.reserve(samples.len() * 2);
    for &sample in samples {
        // NaN clamps to NaN and casts to 0
        let scaled = (sample.clamp(-1.0, 1.0) * ENCODE_SCALE).round();
        out.put_i16_le(scaled as i16);
    }
}

/// Decode PCM16 LE bytes to samples in [-1, 1)
pub fn decode(bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::MalformedFrame(bytes.len()));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / DECODE_SCALE)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn as_i16(bytes: &[u8]) -> Vec<i16> {
        bytes
            .chunks_exact(2)
            .map(|p| i16::from_le_bytes([p[0], p[1]]))
            .collect()
    }

    #[test]
    fn test_encode_known_values() {
        let encoded = encode(&[0.0, 1.0, -1.0, 0.5]);
        assert_eq!(encoded.len(), 8);
        assert_eq!(as_i16(&encoded), vec![0, 32767, -32767, 16384]);
        assert_eq!(&encoded[2..4], &[0xFF, 0x7F]);
    }

    #[test]
    fn test_encode_clamps_out_of_range() {
        let encoded = encode(&[1.5, -3.0, f32::INFINITY]);
        assert_eq!(as_i16(&encoded), vec![32767, -32767, 32767]);
    }

    #[test]
    fn test_decode_known_values() {
        let bytes = [0x00, 0x00, 0x00, 0x80, 0x00, 0x40];
        assert_eq!(decode(&bytes).unwrap(), vec![0.0, -1.0, 0.5]);
    }

    #[test]
    fn test_decode_rejects_odd_length() {
        assert_eq!(decode(&[0x00, 0x01, 0x02]), Err(CodecError::MalformedFrame(3)));
        assert_eq!(decode(&[]), Ok(vec![]));
    }

    proptest! {
        #[test]
        fn prop_round_trip_error_bound(samples in prop::collection::vec(-2.0f32..2.0, 0..1024)) {
            let decoded = decode(&encode(&samples)).unwrap();
            prop_assert_eq!(decoded.len(), samples.len());
            // Half a step from rounding plus |x| / 32768 from the 32767 vs
            // 32768 scale mismatch
            let bound = 1.5 / 32768.0 + 1e-6;
            for (d, s) in decoded.iter().zip(&samples) {
                let expected = s.clamp(-1.0, 1.0);
                prop_assert!((d - expected).abs() <= bound, "{} vs {}", d, expected);
            }
        }

        #[test]
        fn prop_odd_length_is_malformed(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let result = decode(&bytes);
            if bytes.len() % 2 == 1 {
                prop_assert_eq!(result, Err(CodecError::MalformedFrame(bytes.len())));
            } else {
                prop_assert!(result.is_ok());
            }
        }

        #[test]
        fn prop_encoded_length(samples in prop::collection::vec(any::<f32>(), 0..1024)) {
            prop_assert_eq!(encode(&samples).len(), samples.len() * 2);
        }
    }
}
