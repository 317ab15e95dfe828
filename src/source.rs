use std::io;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use dca::structs::chunk::{InputSpec, OwnedChunk, SampleFormat};
use symphonia::core::audio::{AudioBufferRef, SampleBuffer, SignalSpec};
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::conv::ConvertibleSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::input::open_media_source;

/// Decoded audio source producing interleaved chunks.
///
/// The first packet is decoded while opening so the [`InputSpec`] is known
/// before an encoding session is created. Every later chunk is converted to
/// the same sample format.
pub struct AudioSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    spec: InputSpec,
    pending: Option<OwnedChunk>,
    strict: bool,
    skipped_packets: u64,
}

impl AudioSource {
    /// Opens `path` (or stdin for "-"), selecting the first decodable track.
    pub fn open<P: AsRef<Path>>(path: P, strict: bool) -> Result<Self> {
        let path = path.as_ref();

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(ext.to_string_lossy().as_ref());
        }

        Self::from_media_source(open_media_source(path)?, &hint, strict)
    }

    /// Detects the container of an already opened byte source and opens it.
    pub fn from_media_source(
        source: Box<dyn MediaSource>,
        hint: &Hint,
        strict: bool,
    ) -> Result<Self> {
        let mss = MediaSourceStream::new(source, Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unsupported or unrecognized input format")?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No decodable audio track found"))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .context("Couldn't create audio decoder")?;

        let mut skipped_packets = 0;
        let (signal, first) = next_buffer(
            format.as_mut(),
            decoder.as_mut(),
            track_id,
            None,
            strict,
            &mut skipped_packets,
        )?
        .ok_or_else(|| anyhow!("Input contains no audio"))?;

        let spec = InputSpec::new(first.format(), signal.rate, signal.channels.count())?;
        log::debug!(
            "Track {track_id}: {:?} samples, {} Hz, {} channel(s)",
            spec.format,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            spec,
            pending: Some(first),
            strict,
            skipped_packets,
        })
    }

    pub fn spec(&self) -> InputSpec {
        self.spec
    }

    /// Packets dropped because they failed to decode.
    pub fn skipped_packets(&self) -> u64 {
        self.skipped_packets
    }

    /// Returns the next chunk, or `None` at end of stream.
    pub fn read_chunk(&mut self) -> Result<Option<OwnedChunk>> {
        if let Some(chunk) = self.pending.take() {
            return Ok(Some(chunk));
        }

        let Some((signal, chunk)) = next_buffer(
            self.format.as_mut(),
            self.decoder.as_mut(),
            self.track_id,
            Some(self.spec.format),
            self.strict,
            &mut self.skipped_packets,
        )?
        else {
            return Ok(None);
        };

        check_signal(&self.spec, &signal)?;
        Ok(Some(chunk))
    }
}

/// Rejects a decoded buffer whose rate or layout differs from the first one.
fn check_signal(spec: &InputSpec, signal: &SignalSpec) -> Result<()> {
    if signal.rate != spec.sample_rate || signal.channels.count() != spec.channels {
        bail!(
            "Stream parameters changed mid-stream: {} Hz/{} ch, was {} Hz/{} ch",
            signal.rate,
            signal.channels.count(),
            spec.sample_rate,
            spec.channels
        );
    }
    Ok(())
}

fn next_buffer(
    format: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
    target: Option<SampleFormat>,
    strict: bool,
    skipped_packets: &mut u64,
) -> Result<Option<(SignalSpec, OwnedChunk)>> {
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            // Chained streams with new parameters are not followed
            Err(SymphoniaError::ResetRequired) => {
                log::warn!("Stream reset required; stopping at the end of the first stream");
                return Ok(None);
            }
            Err(e) => return Err(e).context("Couldn't read packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if decoded.frames() == 0 {
                    continue;
                }
                let signal = *decoded.spec();
                let format = target.unwrap_or_else(|| native_format(&decoded));
                return Ok(Some((signal, interleave(decoded, format))));
            }
            Err(SymphoniaError::DecodeError(e)) => {
                if strict {
                    bail!("Decode error at packet ts {}: {e}", packet.ts());
                }
                log::warn!("Decode error at packet ts {}, skipping: {e}", packet.ts());
                *skipped_packets += 1;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(e) => return Err(e).context("Couldn't decode packet"),
        }
    }
}

/// Chunk format matching the decoder's own buffer type. Formats the library
/// has no variant for (24-bit, signed 8-bit, unsigned wide) go through `F32`.
fn native_format(decoded: &AudioBufferRef<'_>) -> SampleFormat {
    match decoded {
        AudioBufferRef::U8(_) => SampleFormat::U8,
        AudioBufferRef::S16(_) => SampleFormat::S16,
        AudioBufferRef::S32(_) => SampleFormat::S32,
        AudioBufferRef::F64(_) => SampleFormat::F64,
        _ => SampleFormat::F32,
    }
}

fn interleave(decoded: AudioBufferRef<'_>, format: SampleFormat) -> OwnedChunk {
    match format {
        SampleFormat::U8 => OwnedChunk::U8(copy_interleaved(decoded)),
        SampleFormat::S16 => OwnedChunk::S16(copy_interleaved(decoded)),
        SampleFormat::S32 => OwnedChunk::S32(copy_interleaved(decoded)),
        SampleFormat::F32 => OwnedChunk::F32(copy_interleaved(decoded)),
        SampleFormat::F64 => OwnedChunk::F64(copy_interleaved(decoded)),
    }
}

fn copy_interleaved<T: ConvertibleSample>(decoded: AudioBufferRef<'_>) -> Vec<T> {
    let mut buf = SampleBuffer::<T>::new(decoded.capacity() as u64, *decoded.spec());
    buf.copy_interleaved_ref(decoded);
    buf.samples().to_vec()
}
