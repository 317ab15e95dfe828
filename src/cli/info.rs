use anyhow::{Result, bail};
use dca::process::{DCA_VERSION, extract::Extractor};
use dca::structs::frame::EncodedFrame;
use dca::utils::errors::ExtractError;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use opus::{Bandwidth, Channels};

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::time_str;

/// Opus packets always describe their duration at this rate.
const OPUS_CLOCK: u32 = 48_000;

/// Magic of the later DCA format that carries a JSON metadata header.
const DCA1_MAGIC: &[u8; 4] = b"DCA1";

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing DCA stream: {}", args.input.display());

    let mut input_reader = InputReader::new(&args.input)?;
    let mut extractor = Extractor::default();
    let mut context = AnalysisContext::default();

    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analyzing frames...");
        context.pb = Some(pb);
    }

    let mut header = Vec::with_capacity(DCA1_MAGIC.len());
    input_reader.process_chunks(64 * 1024, |chunk| {
        sniff_header(&mut header, chunk)?;
        extractor.push_bytes(chunk);
        context.drain(&mut extractor, cli.strict)?;
        Ok(true)
    })?;

    if extractor.buffered() > 0 {
        let msg = format!(
            "Stream ends with a truncated record ({} bytes at offset {})",
            extractor.buffered(),
            extractor.bytes_consumed()
        );
        if cli.strict {
            bail!(msg);
        }
        log::warn!("{msg}");
    }

    if let Some(pb) = &context.pb {
        pb.finish_and_clear();
    }

    if context.stats.frames == 0 {
        println!("No frames found in the input.");
        println!("This doesn't appear to be a DCA stream.");
        return Ok(());
    }

    display_stream_info(&context.stats);
    display_summary(&context.stats, input_reader.bytes_read());
    Ok(())
}

/// Collects the first bytes of the stream across reads and rejects the
/// `DCA1` magic once enough of them are in.
fn sniff_header(header: &mut Vec<u8>, chunk: &[u8]) -> Result<()> {
    let missing = DCA1_MAGIC.len().saturating_sub(header.len());
    if missing == 0 {
        return Ok(());
    }

    header.extend_from_slice(&chunk[..missing.min(chunk.len())]);
    if header.as_slice() == DCA1_MAGIC {
        bail!("DCA1 streams with a metadata header are not supported; expected raw DCA{DCA_VERSION}");
    }
    Ok(())
}

#[derive(Default)]
struct AnalysisContext {
    stats: StreamStats,
    pb: Option<ProgressBar>,
}

impl AnalysisContext {
    fn drain(&mut self, extractor: &mut Extractor, strict: bool) -> Result<()> {
        for frame_result in extractor.by_ref() {
            match frame_result {
                Ok(frame) => {
                    self.stats.record(&frame);
                    if self.stats.frames.is_multiple_of(500) {
                        if let Some(pb) = &self.pb {
                            pb.set_message(format!(
                                "Analyzing frames...       {}",
                                self.stats.frames
                            ));
                        }
                    }
                }
                Err(ExtractError::InsufficientData) => break,
                Err(e) => {
                    if strict {
                        return Err(e.into());
                    }
                    log::warn!("Skipping record after frame {}: {e}", self.stats.frames);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StreamStats {
    frames: u64,
    payload_bytes: u64,
    min_len: Option<usize>,
    max_len: usize,
    /// Decoded duration in 48 kHz samples.
    samples: u64,
    undecodable: u64,
    stereo_frames: u64,
    first_bandwidth: Option<Bandwidth>,
    first_frame_samples: Option<usize>,
}

impl StreamStats {
    fn record(&mut self, frame: &EncodedFrame) {
        let len = frame.len();
        self.frames += 1;
        self.payload_bytes += len as u64;
        self.min_len = Some(self.min_len.map_or(len, |min| min.min(len)));
        self.max_len = self.max_len.max(len);

        let packet = frame.as_ref();
        match opus::packet::get_nb_samples(packet, OPUS_CLOCK) {
            Ok(samples) => {
                self.samples += samples as u64;
                self.first_frame_samples.get_or_insert(samples);
            }
            Err(e) => {
                log::debug!("Frame {}: {e}", self.frames);
                self.undecodable += 1;
                return;
            }
        }
        if let Ok(Channels::Stereo) = opus::packet::get_nb_channels(packet) {
            self.stereo_frames += 1;
        }
        if self.first_bandwidth.is_none() {
            self.first_bandwidth = opus::packet::get_bandwidth(packet).ok();
        }
    }
}

fn display_stream_info(stats: &StreamStats) {
    println!();
    println!("DCA Stream Information");
    println!("======================");
    println!();
    println!("Stream Information");
    println!("  DCA version               {DCA_VERSION} (no metadata header)");

    let channels = if stats.stereo_frames == 0 {
        "mono"
    } else if stats.stereo_frames + stats.undecodable == stats.frames {
        "stereo"
    } else {
        "mixed"
    };
    println!("  Channels                  {channels}");

    if let Some(bandwidth) = stats.first_bandwidth {
        println!("  Bandwidth                 {bandwidth:?}");
    }
    if let Some(samples) = stats.first_frame_samples {
        let ms = samples as f64 * 1000.0 / OPUS_CLOCK as f64;
        println!("  Frame duration            {ms:.1} ms ({samples} samples at 48 kHz)");
    }
    println!();
}

fn display_summary(stats: &StreamStats, total_bytes: u64) {
    println!("Analysis Summary");
    println!("  Frames processed          {}", stats.frames);
    if stats.undecodable > 0 {
        println!("  Invalid Opus packets      {}", stats.undecodable);
    }

    let size_mb = total_bytes as f64 / 1_000_000.0;
    println!("  Size                      {size_mb:.2} MB ({total_bytes} bytes)");

    let avg = stats.payload_bytes as f64 / stats.frames as f64;
    println!(
        "  Frame size                {} / {avg:.1} / {} bytes (min / avg / max)",
        stats.min_len.unwrap_or(0),
        stats.max_len
    );

    println!(
        "  Duration                  {}",
        time_str(stats.samples, OPUS_CLOCK)
    );

    let duration_secs = stats.samples as f64 / OPUS_CLOCK as f64;
    if duration_secs > 0.0 {
        let avg_data_rate_kbps = (stats.payload_bytes as f64 * 8.0) / (duration_secs * 1000.0);
        println!("  Average data rate         {avg_data_rate_kbps:.1} kbps");
    }

    println!();
}
