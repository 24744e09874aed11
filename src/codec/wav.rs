//! Canonical 44-byte PCM WAV container
//!
//! ```text
//! offset  size  field
//!      0     4  "RIFF"
//!      4     4  36 + data length
//!      8     4  "WAVE"
//!     12     4  "fmt "
//!     16     4  16 (fmt chunk size)
//!     20     2  1 (PCM)
//!     22     2  channels
//!     24     4  sample rate
//!     28     4  byte rate = sample rate * block align
//!     32     2  block align = channels * 2
//!     34     2  16 (bits per sample)
//!     36     4  "data"
//!     40     4  data length
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{BITS_PER_SAMPLE, BYTES_PER_SAMPLE, CHANNELS, WAV_HEADER_LEN};
use crate::error::CodecError;

/// Format fields of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl WavFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
        }
    }

    pub fn block_align(&self) -> u16 {
        self.channels * BYTES_PER_SAMPLE as u16
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Write the header for a payload of `data_len` bytes
pub fn write_header(format: WavFormat, data_len: usize, out: &mut BytesMut) -> Result<(), CodecError> {
    let data_len_u32 = u32::try_from(data_len)
        .ok()
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(CodecError::ContainerTooLarge(data_len))?;

    out.reserve(WAV_HEADER_LEN);
    out.put_slice(b"RIFF");
    out.put_u32_le(36 + data_len_u32);
    out.put_slice(b"WAVE");
    out.put_slice(b"fmt ");
    out.put_u32_le(16);
    out.put_u16_le(1);
    out.put_u16_le(format.channels);
    out.put_u32_le(format.sample_rate);
    out.put_u32_le(format.byte_rate());
    out.put_u16_le(format.block_align());
    out.put_u16_le(BITS_PER_SAMPLE);
    out.put_slice(b"data");
    out.put_u32_le(data_len_u32);
    Ok(())
}

/// Header followed by every chunk in order
pub fn assemble<'a, I>(format: WavFormat, chunks: I) -> Result<Bytes, CodecError>
where
    I: IntoIterator<Item = &'a [u8]>,
    I::IntoIter: Clone,
{
    let chunks = chunks.into_iter();
    let data_len: usize = chunks.clone().map(<[u8]>::len).sum();

    let mut out = BytesMut::with_capacity(WAV_HEADER_LEN + data_len);
    write_header(format, data_len, &mut out)?;
    for chunk in chunks {
        out.put_slice(chunk);
    }
    Ok(out.freeze())
}

/// Fields read back from a canonical header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub riff_size: u32,
    pub format: WavFormat,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_len: u32,
}

/// Parse the canonical 44-byte layout produced by [`write_header`]
pub fn parse_header(bytes: &[u8]) -> Option<WavHeader> {
    if bytes.len() < WAV_HEADER_LEN
        || &bytes[0..4] != b"RIFF"
        || &bytes[8..12] != b"WAVE"
        || &bytes[12..16] != b"fmt "
        || &bytes[36..40] != b"data"
    {
        return None;
    }

    let u16_at = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
    let u32_at = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);

    if u16_at(20) != 1 {
        return None;
    }

    Some(WavHeader {
        riff_size: u32_at(4),
        format: WavFormat {
            sample_rate: u32_at(24),
            channels: u16_at(22),
        },
        byte_rate: u32_at(28),
        block_align: u16_at(32),
        bits_per_sample: u16_at(34),
        data_len: u32_at(40),
    })
}
