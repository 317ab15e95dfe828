/// Format adaptation ahead of the sample FIFO.
///
/// Provides the [`FormatAdapter`](adapt::FormatAdapter) and the
/// [`Resampler`](adapt::Resampler) capability it drives.
pub mod adapt;

/// DCA stream splitting.
///
/// Provides the [`Extractor`](extract::Extractor) for reading length-prefixed
/// frames back out of a byte stream.
pub mod extract;

/// Opus implementation of [`FrameEncoder`](session::FrameEncoder).
pub mod opus_encoder;

/// Frame aggregation and emission.
///
/// Provides the [`EncodingSession`](session::EncodingSession).
pub mod session;

/// Latest DCA version the library writes.
pub const DCA_VERSION: u8 = 0;

/// Output buffer size that holds any single Opus packet.
pub const MAX_FRAME_BYTES: usize = 4000;
