#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("channel count must be greater than 0")]
    ZeroChannels,

    #[error("sample rate must be greater than 0")]
    ZeroSampleRate,

    #[error("frame size must be greater than 0")]
    ZeroFrameSize,

    #[error("bit rate must be greater than 0")]
    ZeroBitRate,

    #[error("Opus supports 1 or 2 channels, got {0}")]
    UnsupportedChannels(usize),

    #[error("Opus does not support a sample rate of {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error(
        "frame size {frame_size} is not a valid Opus frame duration at {sample_rate} Hz (2.5, 5, 10, 20, 40 or 60 ms)"
    )]
    UnsupportedFrameSize { frame_size: usize, sample_rate: u32 },

    #[error("bit rate {0} is out of range for Opus (500..=512000)")]
    UnsupportedBitRate(u32),

    #[error("session config does not match encoder: {field} is {session} in session, {encoder} in encoder")]
    EncoderMismatch {
        field: &'static str,
        session: u32,
        encoder: u32,
    },

    #[error("input spec must have at least one channel and a non-zero sample rate")]
    InvalidInputSpec,

    #[error("Failed to initialize encoder: {0}")]
    EncoderInit(String),

    #[error("Failed to initialize resampler: {0}")]
    ResamplerInit(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ConversionError {
    #[error("chunk format {found:?} does not match the adapter input format {expected:?}")]
    FormatMismatch {
        found: crate::structs::chunk::SampleFormat,
        expected: crate::structs::chunk::SampleFormat,
    },

    #[error("chunk holds {samples} samples, which is not a whole number of {channels}-channel frames")]
    PartialFrame { samples: usize, channels: usize },

    #[error("Resampler failure: {0}")]
    Resampler(String),
}

#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("cannot drain a full frame: {available} of {frame_size} sample-frames buffered")]
    ShortFrame { available: usize, frame_size: usize },

    #[error("encoder expects {expected} interleaved samples, got {actual}")]
    WrongFrameLength { expected: usize, actual: usize },

    #[error("encoded frame of {0} bytes does not fit the 2-byte length prefix")]
    FrameTooLarge(usize),

    #[error("Opus encode error: {0}")]
    Opus(String),
}

#[derive(thiserror::Error, Debug)]
pub enum AllocationError {
    #[error("failed to grow scratch buffer to {0} samples")]
    Scratch(usize),

    #[error("failed to grow sample FIFO by {0} samples")]
    Fifo(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(i16),
}
