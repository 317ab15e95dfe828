use super::output::FrameWriter;
use super::preset::{Preset, resolve};
use super::progress::{create_progress_bar, finalize_progress_bar, update_progress_bar};
use super::source_thread::{CHUNK_QUEUE_DEPTH, SourceThreadConfig, spawn_source_thread};
use crate::cli::command::{Cli, EncodeArgs};
use crate::source::AudioSource;
use anyhow::{Context, Result};
use dca::process::{MAX_FRAME_BYTES, session::EncodingSession};
use dca::structs::chunk::OwnedChunk;
use indicatif::MultiProgress;
use std::io::Write;
use std::sync::mpsc;

pub fn cmd_encode(args: &EncodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    let preset = match &args.preset {
        Some(path) => Preset::load(path)?,
        None => Preset::default(),
    };
    let settings = resolve(args, &preset);
    settings.config.validate()?;

    log::info!(
        "Encoding {} (strict mode: {})",
        args.input.display(),
        cli.strict
    );

    let source = AudioSource::open(&args.input, cli.strict)?;
    let mut session = EncodingSession::new(settings.config, source.spec())?;

    let input_spec = session.input_spec();
    log::info!(
        "Input: {:?}, {} Hz, {} channel(s)",
        input_spec.format,
        input_spec.sample_rate,
        input_spec.channels
    );
    let config = *session.config();
    log::info!(
        "Output: {} Hz, {} channel(s), {} kb/s, {} samples per frame ({:.1} ms), application {}",
        config.sample_rate,
        config.channels,
        config.bit_rate / 1000,
        config.frame_size,
        config.frame_duration_ms(),
        config.mode
    );

    let mut writer = FrameWriter::create(args.output.as_deref())?;
    let pb = multi.map(create_progress_bar).transpose()?;

    let (tx, rx) = mpsc::sync_channel(CHUNK_QUEUE_DEPTH);
    let source_thread = spawn_source_thread(SourceThreadConfig { source, tx });
    let start_time = std::time::Instant::now();

    let result = run_encode_loop(
        &mut session,
        rx.iter(),
        &mut writer,
        settings.pad_tail,
        |frames| {
            if let Some(pb) = &pb {
                update_progress_bar(
                    pb,
                    frames,
                    frames * config.frame_size as u64,
                    config.sample_rate,
                );
            }
        },
    );
    // Unblocks the source thread if the loop bailed early
    drop(rx);

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("encode failed");
            }
            let _ = source_thread.join();
            return Err(e);
        }
    };

    if summary.dropped > 0 {
        log::warn!(
            "Dropped {} trailing sample-frames shorter than one frame (use --pad-tail to keep them)",
            summary.dropped
        );
    }
    writer.finish()?;

    if source_thread.join().is_err() {
        if let Some(pb) = &pb {
            pb.finish_with_message("decode thread panicked");
        }
        return Err(anyhow::anyhow!("Decode thread panicked"));
    }

    let encoded_samples = summary.frames * config.frame_size as u64;
    if let Some(pb) = &pb {
        finalize_progress_bar(
            pb,
            summary.frames,
            encoded_samples,
            config.sample_rate,
            start_time,
        );
    }

    log::info!(
        "Encoded {} frames ({} bytes, {}) in {:.2}s",
        summary.frames,
        summary.bytes,
        crate::timestamp::time_str(encoded_samples, config.sample_rate),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Totals reported by [`run_encode_loop`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Frames written.
    pub frames: u64,
    /// Bytes written including length prefixes.
    pub bytes: u64,
    /// Silent sample-frames added to complete the last frame.
    pub padded: usize,
    /// Sample-frames left below one frame and not written.
    pub dropped: usize,
}

/// Feeds `chunks` through `session` and writes every emitted frame.
///
/// Chunks are pulled only while the session needs more input. Once they run
/// out, audio held in the adapter is flushed and, with `pad_tail`, the last
/// partial frame is completed with silence. The first error chunk aborts the
/// loop. `on_frame` sees the running frame count after each write.
pub fn run_encode_loop<W, I, F>(
    session: &mut EncodingSession,
    chunks: I,
    writer: &mut FrameWriter<W>,
    pad_tail: bool,
    mut on_frame: F,
) -> Result<EncodeSummary>
where
    W: Write,
    I: IntoIterator<Item = Result<OwnedChunk>>,
    F: FnMut(u64),
{
    let mut chunks = chunks.into_iter();
    let mut out = [0u8; MAX_FRAME_BYTES];
    let mut input_done = false;
    let mut padded = 0;

    loop {
        while session.needs_more() && !input_done {
            match chunks.next() {
                Some(chunk) => {
                    session
                        .feed(chunk?.as_chunk())
                        .context("Couldn't buffer decoded audio")?;
                }
                None => {
                    input_done = true;
                    let flushed = session.flush()?;
                    if flushed > 0 {
                        log::debug!("Flushed {flushed} resampled sample-frames at end of input");
                    }
                    if pad_tail {
                        padded = session.pad_to_frame()?;
                        if padded > 0 {
                            log::debug!("Padded final frame with {padded} silent sample-frames");
                        }
                    }
                }
            }
        }

        let emitted = session.emit(&mut out).context("Couldn't encode frame")?;
        if emitted.is_empty() {
            break;
        }

        writer.write(&out[..emitted.len])?;
        on_frame(writer.frames_written());
    }

    Ok(EncodeSummary {
        frames: writer.frames_written(),
        bytes: writer.bytes_written(),
        padded,
        dropped: session.pending_frames(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dca::process::adapt::FormatAdapter;
    use dca::process::extract::Extractor;
    use dca::process::session::FrameEncoder;
    use dca::structs::chunk::{InputSpec, SampleFormat};
    use dca::structs::config::EncodingConfig;

    /// Writes the first and last sample of every frame it is given.
    struct EdgeEncoder;

    impl FrameEncoder for EdgeEncoder {
        fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
            out[..2].copy_from_slice(&pcm[0].to_le_bytes());
            out[2..4].copy_from_slice(&pcm[pcm.len() - 1].to_le_bytes());
            Ok(4)
        }
    }

    fn mono_session(frame_size: usize) -> Result<EncodingSession> {
        let input = InputSpec::new(SampleFormat::S16, 48000, 1)?;
        let config = EncodingConfig {
            channels: 1,
            frame_size,
            ..Default::default()
        };
        EncodingSession::with_parts(
            config,
            FormatAdapter::new(input, 1, 48000)?,
            Box::new(EdgeEncoder),
        )
    }

    /// 250 mono samples counting up from 1, split into uneven chunks.
    fn counting_chunks() -> Vec<Result<OwnedChunk>> {
        let samples: Vec<i16> = (1..=250).collect();
        [0..70, 70..71, 71..200, 200..250]
            .into_iter()
            .map(|range| Ok(OwnedChunk::S16(samples[range].to_vec())))
            .collect()
    }

    fn payloads(stream: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut extractor = Extractor::default();
        extractor.push_bytes(stream);
        let mut frames = Vec::new();
        for frame in extractor.by_ref() {
            match frame {
                Ok(frame) => frames.push(frame.as_ref().to_vec()),
                Err(dca::utils::errors::ExtractError::InsufficientData) => break,
                Err(e) => return Err(e.into()),
            }
        }
        assert_eq!(extractor.buffered(), 0);
        Ok(frames)
    }

    fn edges(first: i16, last: i16) -> Vec<u8> {
        [first.to_le_bytes(), last.to_le_bytes()].concat()
    }

    #[test]
    fn trailing_partial_frame_is_dropped() -> Result<()> {
        let mut session = mono_session(100)?;
        let mut writer = FrameWriter::new(Vec::new());
        let mut seen = Vec::new();

        let summary = run_encode_loop(
            &mut session,
            counting_chunks(),
            &mut writer,
            false,
            |frames| seen.push(frames),
        )?;

        assert_eq!(
            summary,
            EncodeSummary {
                frames: 2,
                bytes: 2 * 6,
                padded: 0,
                dropped: 50,
            }
        );
        assert_eq!(seen, [1, 2]);

        let stream = writer.finish()?;
        assert_eq!(payloads(&stream)?, [edges(1, 100), edges(101, 200)]);
        Ok(())
    }

    #[test]
    fn pad_tail_completes_the_last_frame() -> Result<()> {
        let mut session = mono_session(100)?;
        let mut writer = FrameWriter::new(Vec::new());

        let summary = run_encode_loop(&mut session, counting_chunks(), &mut writer, true, |_| {})?;

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.padded, 50);
        assert_eq!(summary.dropped, 0);

        let stream = writer.finish()?;
        assert_eq!(
            payloads(&stream)?,
            [edges(1, 100), edges(101, 200), edges(201, 0)]
        );
        Ok(())
    }

    #[test]
    fn exact_multiple_needs_no_padding() -> Result<()> {
        let mut session = mono_session(50)?;
        let mut writer = FrameWriter::new(Vec::new());

        let summary = run_encode_loop(&mut session, counting_chunks(), &mut writer, true, |_| {})?;

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.padded, 0);
        assert_eq!(summary.dropped, 0);
        Ok(())
    }

    #[test]
    fn decode_error_stops_the_loop() -> Result<()> {
        let mut session = mono_session(100)?;
        let mut writer = FrameWriter::new(Vec::new());
        let chunks = vec![
            Ok(OwnedChunk::S16(vec![1; 150])),
            Err(anyhow::anyhow!("corrupt packet")),
            Ok(OwnedChunk::S16(vec![2; 150])),
        ];

        let err = run_encode_loop(&mut session, chunks, &mut writer, true, |_| {}).unwrap_err();
        assert_eq!(err.to_string(), "corrupt packet");
        // The frame completed before the error was still written
        assert_eq!(writer.frames_written(), 1);
        Ok(())
    }

    #[test]
    fn wrong_chunk_format_is_reported() -> Result<()> {
        let mut session = mono_session(100)?;
        let mut writer = FrameWriter::new(Vec::new());
        let chunks = vec![Ok(OwnedChunk::F32(vec![0.0; 10]))];

        let err = run_encode_loop(&mut session, chunks, &mut writer, false, |_| {}).unwrap_err();
        assert!(err.to_string().contains("Couldn't buffer decoded audio"));
        assert_eq!(writer.frames_written(), 0);
        Ok(())
    }
}
