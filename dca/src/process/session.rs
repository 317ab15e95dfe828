use crate::process::adapt::FormatAdapter;
use crate::process::opus_encoder::OpusFrameEncoder;
use crate::structs::chunk::{Chunk, InputSpec};
use crate::structs::config::EncodingConfig;
use crate::utils::errors::ConfigError;
use crate::utils::fifo::SampleFifo;
use crate::utils::scratch::ScratchBuffer;
use anyhow::Result;

/// Perceptual encoding capability driven by [`EncodingSession::emit`].
pub trait FrameEncoder: Send {
    /// Encodes exactly one frame of interleaved samples into `out`.
    ///
    /// Returns the number of bytes written.
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize>;
}

/// Occupancy state of a session relative to its frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Fewer than `frame_size` sample-frames buffered.
    Accumulating,
    /// At least one full frame buffered.
    Ready,
}

/// Outcome of [`EncodingSession::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Emitted {
    /// Sample-frames consumed from the buffer, `frame_size` or 0.
    pub frames: usize,
    /// Encoded bytes written to the output buffer.
    pub len: usize,
}

impl Emitted {
    /// True for the "nothing buffered" result.
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }
}

/// Aggregates variable-size chunks into fixed-size encoded frames.
///
/// The session owns the format adapter, the sample FIFO, the scratch
/// region and the encoder. Callers alternate between [`feed`](Self::feed)
/// while [`needs_more`](Self::needs_more) is true and [`emit`](Self::emit)
/// once it is false.
///
/// # Example
///
/// ```rust,no_run
/// use dca::process::{MAX_FRAME_BYTES, session::EncodingSession};
/// use dca::structs::chunk::{Chunk, InputSpec, SampleFormat};
/// use dca::structs::config::EncodingConfig;
///
/// let input = InputSpec::new(SampleFormat::S16, 44_100, 2)?;
/// let mut session = EncodingSession::new(EncodingConfig::default(), input)?;
/// let mut out = [0u8; MAX_FRAME_BYTES];
///
/// let pcm = vec![0i16; 2048];
/// while session.needs_more() {
///     session.feed(Chunk::S16(&pcm))?;
/// }
/// let emitted = session.emit(&mut out)?;
/// println!("{} frames -> {} bytes", emitted.frames, emitted.len);
/// # Ok::<(), anyhow::Error>(())
/// ```
///
/// Only whole frames are emitted. Sample-frames still buffered when the
/// session is dropped are discarded; call [`pad_to_frame`](Self::pad_to_frame)
/// first to have them encoded.
pub struct EncodingSession {
    config: EncodingConfig,
    adapter: FormatAdapter,
    encoder: Box<dyn FrameEncoder>,
    fifo: SampleFifo,
    scratch: ScratchBuffer,
    frames_fed: u64,
    frames_emitted: u64,
}

impl EncodingSession {
    /// Creates a session with the Opus encoder and the default adapter for `input`.
    pub fn new(config: EncodingConfig, input: InputSpec) -> Result<Self> {
        config.validate()?;
        let adapter = FormatAdapter::new(input, config.channels, config.sample_rate)?;
        let encoder = OpusFrameEncoder::new(&config)?;
        Self::with_parts(config, adapter, Box::new(encoder))
    }

    /// Creates a session from an explicit adapter and encoder.
    pub fn with_parts(
        config: EncodingConfig,
        adapter: FormatAdapter,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<Self> {
        config.validate()?;
        if adapter.channels() != config.channels {
            return Err(ConfigError::EncoderMismatch {
                field: "channels",
                session: config.channels as u32,
                encoder: adapter.channels() as u32,
            }
            .into());
        }
        if adapter.sample_rate() != config.sample_rate {
            return Err(ConfigError::EncoderMismatch {
                field: "sample_rate",
                session: config.sample_rate,
                encoder: adapter.sample_rate(),
            }
            .into());
        }

        log::debug!(
            "Encoding session: {:?} -> {} Hz, {} ch, {} frames per packet",
            adapter.input_spec(),
            config.sample_rate,
            config.channels,
            config.frame_size
        );

        Ok(Self {
            config,
            adapter,
            encoder,
            fifo: SampleFifo::new(config.channels),
            scratch: ScratchBuffer::new(config.channels),
            frames_fed: 0,
            frames_emitted: 0,
        })
    }

    /// Parameters the session encodes with, fixed at creation.
    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Format, rate and channel count `feed` accepts.
    pub fn input_spec(&self) -> InputSpec {
        self.adapter.input_spec()
    }

    /// True while fewer than `frame_size` sample-frames are buffered.
    pub fn needs_more(&self) -> bool {
        self.fifo.size() < self.config.frame_size
    }

    pub fn state(&self) -> FrameState {
        if self.needs_more() {
            FrameState::Accumulating
        } else {
            FrameState::Ready
        }
    }

    /// Buffered sample-frames not yet emitted.
    pub fn pending_frames(&self) -> usize {
        self.fifo.size()
    }

    /// Scratch capacity in bytes. Never decreases.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity_bytes()
    }

    /// Sample-frames accepted into the buffer so far, after adaptation.
    pub fn frames_fed(&self) -> u64 {
        self.frames_fed
    }

    /// Encoded frames emitted so far.
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Adapts `chunk` and appends it to the buffer.
    ///
    /// Returns the number of sample-frames added after conversion.
    pub fn feed(&mut self, chunk: Chunk<'_>) -> Result<usize> {
        let converted = self.adapter.convert(chunk, &mut self.scratch)?;
        if converted > 0 {
            self.fifo.write(self.scratch.frames(converted))?;
            self.frames_fed += converted as u64;
        }
        Ok(converted)
    }

    /// Drains one frame, encodes it into `out` and reports what happened.
    ///
    /// Returns an empty [`Emitted`] when less than one whole frame is
    /// buffered; the buffer is left untouched in that case. An encoder
    /// failure loses the drained frame.
    pub fn emit(&mut self, out: &mut [u8]) -> Result<Emitted> {
        let frame_size = self.config.frame_size;
        let available = self.fifo.size();
        if available < frame_size {
            if available > 0 {
                log::trace!("Holding {available} sample-frames until a frame is complete");
            }
            return Ok(Emitted::default());
        }

        self.scratch.reserve(frame_size)?;
        let frames = self
            .fifo
            .read(frame_size, self.scratch.frames_mut(frame_size))?;

        let len = self.encoder.encode(self.scratch.frames(frame_size), out)?;
        self.frames_emitted += 1;

        log::trace!(
            "Frame {}: {frames} samples -> {len} bytes",
            self.frames_emitted
        );

        Ok(Emitted { frames, len })
    }

    /// Moves audio still held inside the adapter into the buffer.
    ///
    /// Call once the source is exhausted and before
    /// [`pad_to_frame`](Self::pad_to_frame). Returns the sample-frames added.
    pub fn flush(&mut self) -> Result<usize> {
        let flushed = self.adapter.flush(&mut self.scratch)?;
        if flushed > 0 {
            self.fifo.write(self.scratch.frames(flushed))?;
            self.frames_fed += flushed as u64;
            log::trace!("Flushed {flushed} sample-frames from the adapter");
        }
        Ok(flushed)
    }

    /// Pads the buffer with silence up to the next whole frame.
    ///
    /// Returns the number of silent sample-frames added; 0 when the buffer
    /// is empty or already holds whole frames.
    pub fn pad_to_frame(&mut self) -> Result<usize> {
        let residual = self.fifo.size() % self.config.frame_size;
        if residual == 0 {
            return Ok(0);
        }

        let padding = self.config.frame_size - residual;
        self.fifo.write_silence(padding)?;
        Ok(padding)
    }
}

impl Drop for EncodingSession {
    fn drop(&mut self) {
        if !self.fifo.is_empty() {
            log::debug!(
                "Discarding {} buffered sample-frames below one frame",
                self.fifo.size()
            );
        }
    }
}
