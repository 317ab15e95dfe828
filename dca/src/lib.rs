//! Frame aggregation engine for DCA audio streams.
//!
//! ## Technical Overview
//!
//! Decoders hand out audio in chunks whose length, sample format and sample
//! rate are decided by the source. Opus consumes fixed-size frames in a
//! fixed format. This crate sits between the two.
//!
//! ### Pipeline
//!
//! 1. **Adapt**: each chunk is converted to interleaved 16-bit PCM at the
//!    session's rate and channel count.
//! 2. **Aggregate**: converted sample-frames are appended to a FIFO.
//! 3. **Emit**: once a whole frame is buffered it is drained and encoded.
//!
//! ### Stream Format
//!
//! A DCA stream is a sequence of records, each a little-endian `i16` byte
//! length followed by one Opus packet.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dca::process::{MAX_FRAME_BYTES, session::EncodingSession};
//! use dca::structs::chunk::{Chunk, InputSpec, SampleFormat};
//! use dca::structs::config::EncodingConfig;
//! use dca::structs::frame::write_frame;
//!
//! let input = InputSpec::new(SampleFormat::F32, 44_100, 2)?;
//! let mut session = EncodingSession::new(EncodingConfig::default(), input)?;
//!
//! let decoded: Vec<Vec<f32>> = vec![vec![0.0; 2048]; 32];
//! let mut chunks = decoded.iter();
//! let mut out = [0u8; MAX_FRAME_BYTES];
//! let mut stream = Vec::new();
//!
//! loop {
//!     while session.needs_more() {
//!         match chunks.next() {
//!             Some(chunk) => session.feed(Chunk::F32(chunk))?,
//!             None => break,
//!         };
//!     }
//!
//!     let emitted = session.emit(&mut out)?;
//!     if emitted.is_empty() {
//!         break;
//!     }
//!     write_frame(&mut stream, &out[..emitted.len])?;
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

/// Processing stages.
///
/// - **Adaptation** ([`process::adapt`]): format, channel and rate conversion
/// - **Session** ([`process::session`]): buffering and frame emission
/// - **Opus** ([`process::opus_encoder`]): libopus frame encoder
/// - **Extraction** ([`process::extract`]): reading DCA streams back
pub mod process;

/// Data types passed through the pipeline.
///
/// - **Chunks** ([`structs::chunk`]): source samples and their format
/// - **Configuration** ([`structs::config`]): session parameters and defaults
/// - **Frames** ([`structs::frame`]): encoded frames and wire framing
pub mod structs;

/// Supporting infrastructure.
///
/// - **FIFO** ([`utils::fifo`]): sample aggregation buffer
/// - **Scratch** ([`utils::scratch`]): growable temporary region
/// - **Error Handling** ([`utils::errors`]): error types
pub mod utils;
