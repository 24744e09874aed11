//! Wire codecs
//!
//! `pcm16` converts between float samples and the 16-bit little-endian wire
//! format; `wav` wraps PCM16 payloads in a canonical WAV container.

pub mod pcm16;
pub mod wav;

pub use wav::WavFormat;
