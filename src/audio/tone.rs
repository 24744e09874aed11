//! Sine test tone, used when a peer has no speech audio to send

use bytes::{BufMut, Bytes, BytesMut};

pub const FALLBACK_FREQUENCY: f32 = 440.0;
pub const FALLBACK_DURATION_S: f32 = 0.5;
pub const FALLBACK_AMPLITUDE: i16 = 3000;

/// PCM16 LE sine tone; samples are truncated toward zero
pub fn fallback_tone(frequency: f32, duration_s: f32, sample_rate: u32, amplitude: i16) -> Bytes {
    let num_samples = (sample_rate as f32 * duration_s) as usize;
    let mut out = BytesMut::with_capacity(num_samples * 2);
    for i in 0..num_samples {
        let phase = 2.0 * std::f64::consts::PI * frequency as f64 * i as f64 / sample_rate as f64;
        let value = (amplitude as f64 * phase.sin()) as i16;
        out.put_i16_le(value);
    }
    tracing::debug!("Generated fallback tone: {} bytes", out.len());
    out.freeze()
}

/// The default 440 Hz, half-second tone at the wire rate
pub fn default_fallback_tone() -> Bytes {
    fallback_tone(
        FALLBACK_FREQUENCY,
        FALLBACK_DURATION_S,
        crate::constants::TARGET_SAMPLE_RATE,
        FALLBACK_AMPLITUDE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pcm16;

    #[test]
    fn test_default_tone_shape() {
        let tone = default_fallback_tone();
        assert_eq!(tone.len(), 16000);

        let samples = pcm16::decode(&tone).unwrap();
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 3000.0 / 32768.0).abs() < 1e-3);
        assert_eq!(samples[0], 0.0);
    }
}
