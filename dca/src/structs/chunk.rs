use crate::utils::errors::ConfigError;
use anyhow::Result;

/// Sample formats a source may hand to the encoder.
///
/// All formats are interleaved. `U8` is offset-binary, the integer formats
/// are full-scale signed and the float formats are nominally in `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    U8,
    S16,
    S32,
    F32,
    F64,
}

/// Format, rate and channel count of a source. Fixed for the source's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub format: SampleFormat,
    pub sample_rate: u32,
    pub channels: usize,
}

impl InputSpec {
    pub fn new(format: SampleFormat, sample_rate: u32, channels: usize) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(ConfigError::InvalidInputSpec.into());
        }
        Ok(Self {
            format,
            sample_rate,
            channels,
        })
    }
}

/// A borrowed run of interleaved samples handed to
/// [`EncodingSession::feed`](crate::process::session::EncodingSession::feed).
///
/// The chunk is converted immediately; nothing keeps a reference to it
/// after `feed` returns.
#[derive(Debug, Clone, Copy)]
pub enum Chunk<'a> {
    U8(&'a [u8]),
    S16(&'a [i16]),
    S32(&'a [i32]),
    F32(&'a [f32]),
    F64(&'a [f64]),
}

impl Chunk<'_> {
    pub fn format(&self) -> SampleFormat {
        match self {
            Chunk::U8(_) => SampleFormat::U8,
            Chunk::S16(_) => SampleFormat::S16,
            Chunk::S32(_) => SampleFormat::S32,
            Chunk::F32(_) => SampleFormat::F32,
            Chunk::F64(_) => SampleFormat::F64,
        }
    }

    /// Number of individual samples (all channels counted).
    pub fn len(&self) -> usize {
        match self {
            Chunk::U8(s) => s.len(),
            Chunk::S16(s) => s.len(),
            Chunk::S32(s) => s.len(),
            Chunk::F32(s) => s.len(),
            Chunk::F64(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends every sample to `dst` as a float in `[-1, 1]`.
    pub fn append_f32(&self, dst: &mut Vec<f32>) {
        dst.reserve(self.len());
        match self {
            Chunk::U8(s) => dst.extend(s.iter().map(|&v| (v as f32 - 128.0) / 128.0)),
            Chunk::S16(s) => dst.extend(s.iter().map(|&v| v as f32 / 32768.0)),
            Chunk::S32(s) => dst.extend(s.iter().map(|&v| (v as f64 / 2147483648.0) as f32)),
            Chunk::F32(s) => dst.extend(s.iter().map(|&v| v.clamp(-1.0, 1.0))),
            Chunk::F64(s) => dst.extend(s.iter().map(|&v| v.clamp(-1.0, 1.0) as f32)),
        }
    }
}

/// Owned counterpart of [`Chunk`], for handing decoded audio across threads.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedChunk {
    U8(Vec<u8>),
    S16(Vec<i16>),
    S32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl OwnedChunk {
    pub fn as_chunk(&self) -> Chunk<'_> {
        match self {
            OwnedChunk::U8(v) => Chunk::U8(v),
            OwnedChunk::S16(v) => Chunk::S16(v),
            OwnedChunk::S32(v) => Chunk::S32(v),
            OwnedChunk::F32(v) => Chunk::F32(v),
            OwnedChunk::F64(v) => Chunk::F64(v),
        }
    }

    pub fn format(&self) -> SampleFormat {
        self.as_chunk().format()
    }

    pub fn len(&self) -> usize {
        self.as_chunk().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Quantizes a float sample to 16-bit PCM.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}
