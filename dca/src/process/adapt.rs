use crate::structs::chunk::{Chunk, InputSpec, f32_to_i16};
use crate::utils::errors::{ConfigError, ConversionError};
use crate::utils::scratch::ScratchBuffer;
use anyhow::Result;
use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

/// Sample-rate conversion capability used by [`FormatAdapter`].
///
/// Works on interleaved `f32` samples at the adapter's output channel
/// count. Implementations may buffer internally, so the number of frames
/// produced need not be a simple ratio of the input.
pub trait Resampler: Send {
    /// Upper estimate of the output frames for `input_frames` more input frames.
    fn output_frames_hint(&self, input_frames: usize) -> usize;

    /// Converts `input`, appending to `output`. Returns the frames appended.
    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) -> Result<usize>;

    /// Appends whatever is still held back at end of stream.
    fn flush(&mut self, _output: &mut Vec<f32>) -> Result<usize> {
        Ok(0)
    }
}

/// Input frames handed to rubato per call.
pub const RESAMPLER_CHUNK_FRAMES: usize = 1024;

/// Band-limited resampler backed by rubato's windowed-sinc `SincFixedIn`.
///
/// rubato consumes fixed-size chunks, so input is held back until a whole
/// chunk is available. The filter's group delay is trimmed from the start
/// of the output; [`flush`](Resampler::flush) pushes the held-back tail out
/// so the total output matches the rate ratio.
pub struct SincResampler {
    inner: SincFixedIn<f32>,
    ratio: f64,
    pending: Vec<Vec<f32>>,
    planar_out: Vec<Vec<f32>>,
    skip: usize,
    frames_in: u64,
    frames_out: u64,
}

impl SincResampler {
    pub fn new(source_rate: u32, target_rate: u32, channels: usize) -> Result<Self> {
        if channels == 0 {
            return Err(ConfigError::ZeroChannels.into());
        }
        if source_rate == 0 || target_rate == 0 {
            return Err(ConfigError::ZeroSampleRate.into());
        }

        let ratio = target_rate as f64 / source_rate as f64;
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let inner =
            SincFixedIn::<f32>::new(ratio, 1.0, params, RESAMPLER_CHUNK_FRAMES, channels)
                .map_err(|e| ConfigError::ResamplerInit(e.to_string()))?;

        let skip = inner.output_delay();
        log::debug!(
            "Sinc resampler {source_rate} Hz -> {target_rate} Hz, {channels} ch, {skip} frames delay"
        );

        Ok(Self {
            planar_out: inner.output_buffer_allocate(true),
            inner,
            ratio,
            pending: vec![Vec::with_capacity(RESAMPLER_CHUNK_FRAMES); channels],
            skip,
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Input frames held back until a whole chunk is available.
    pub fn pending_frames(&self) -> usize {
        self.pending[0].len()
    }

    /// Resamples the chunk at the head of `pending`, appending at most
    /// `limit` frames after the delay trim.
    fn process_chunk(&mut self, output: &mut Vec<f32>, limit: usize) -> Result<usize> {
        let chunk: Vec<&[f32]> = self
            .pending
            .iter()
            .map(|channel| &channel[..RESAMPLER_CHUNK_FRAMES])
            .collect();
        let (_, produced) = self
            .inner
            .process_into_buffer(&chunk, &mut self.planar_out, None)
            .map_err(|e| ConversionError::Resampler(e.to_string()))?;
        for channel in &mut self.pending {
            channel.drain(..RESAMPLER_CHUNK_FRAMES);
        }

        let skip = self.skip.min(produced);
        self.skip -= skip;
        let take = (produced - skip).min(limit);

        output.reserve(take * self.planar_out.len());
        for i in skip..skip + take {
            output.extend(self.planar_out.iter().map(|channel| channel[i]));
        }
        self.frames_out += take as u64;
        Ok(take)
    }
}

impl Resampler for SincResampler {
    fn output_frames_hint(&self, input_frames: usize) -> usize {
        let chunks = (self.pending_frames() + input_frames) / RESAMPLER_CHUNK_FRAMES;
        chunks * self.inner.output_frames_max()
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) -> Result<usize> {
        let channels = self.pending.len();
        if input.len() % channels != 0 {
            return Err(ConversionError::PartialFrame {
                samples: input.len(),
                channels,
            }
            .into());
        }

        for frame in input.chunks_exact(channels) {
            for (channel, &sample) in self.pending.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }
        self.frames_in += (input.len() / channels) as u64;

        let mut produced = 0;
        while self.pending_frames() >= RESAMPLER_CHUNK_FRAMES {
            produced += self.process_chunk(output, usize::MAX)?;
        }
        Ok(produced)
    }

    fn flush(&mut self, output: &mut Vec<f32>) -> Result<usize> {
        let target = (self.frames_in as f64 * self.ratio).round() as u64;
        let mut remaining = target.saturating_sub(self.frames_out) as usize;

        let mut produced = 0;
        while remaining > 0 {
            for channel in &mut self.pending {
                channel.resize(RESAMPLER_CHUNK_FRAMES, 0.0);
            }
            let n = self.process_chunk(output, remaining)?;
            if n == 0 && self.skip == 0 {
                break;
            }
            remaining -= n;
            produced += n;
        }

        self.inner.reset();
        for channel in &mut self.pending {
            channel.clear();
        }
        self.skip = self.inner.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
        Ok(produced)
    }
}

/// Converts source chunks into the session's internal format.
///
/// The source format, rate and channel count are bound at construction;
/// output is interleaved `i16` at the target rate and channel count,
/// written into a caller-supplied [`ScratchBuffer`].
pub struct FormatAdapter {
    input: InputSpec,
    channels: usize,
    sample_rate: u32,
    resampler: Option<Box<dyn Resampler>>,
    decoded: Vec<f32>,
    mixed: Vec<f32>,
    resampled: Vec<f32>,
}

impl FormatAdapter {
    /// Creates an adapter using [`SincResampler`] when the rates differ.
    pub fn new(input: InputSpec, channels: usize, sample_rate: u32) -> Result<Self> {
        let resampler: Option<Box<dyn Resampler>> = if input.sample_rate == sample_rate {
            None
        } else {
            Some(Box::new(SincResampler::new(
                input.sample_rate,
                sample_rate,
                channels,
            )?))
        };
        Self::build(input, channels, sample_rate, resampler)
    }

    /// Creates an adapter that always runs `resampler`, even at equal rates.
    pub fn with_resampler(
        input: InputSpec,
        channels: usize,
        sample_rate: u32,
        resampler: Box<dyn Resampler>,
    ) -> Result<Self> {
        Self::build(input, channels, sample_rate, Some(resampler))
    }

    fn build(
        input: InputSpec,
        channels: usize,
        sample_rate: u32,
        resampler: Option<Box<dyn Resampler>>,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(ConfigError::ZeroChannels.into());
        }
        if sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate.into());
        }
        if input.channels == 0 || input.sample_rate == 0 {
            return Err(ConfigError::InvalidInputSpec.into());
        }

        Ok(Self {
            input,
            channels,
            sample_rate,
            resampler,
            decoded: Vec::new(),
            mixed: Vec::new(),
            resampled: Vec::new(),
        })
    }

    pub fn input_spec(&self) -> InputSpec {
        self.input
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Expected output frames for `input_frames` frames of input.
    pub fn expected_frames(&self, input_frames: usize) -> usize {
        match &self.resampler {
            Some(resampler) => resampler.output_frames_hint(input_frames),
            None => input_frames,
        }
    }

    /// Converts `chunk` into `scratch` and returns the frames produced.
    ///
    /// The converted samples occupy the first returned-count frames of
    /// `scratch` and stay valid until `scratch` is next reserved.
    pub fn convert(&mut self, chunk: Chunk<'_>, scratch: &mut ScratchBuffer) -> Result<usize> {
        if chunk.format() != self.input.format {
            return Err(ConversionError::FormatMismatch {
                found: chunk.format(),
                expected: self.input.format,
            }
            .into());
        }
        if chunk.len() % self.input.channels != 0 {
            return Err(ConversionError::PartialFrame {
                samples: chunk.len(),
                channels: self.input.channels,
            }
            .into());
        }

        let frames = chunk.len() / self.input.channels;
        if frames == 0 {
            return Ok(0);
        }

        let expected = self.expected_frames(frames);
        scratch.reserve(expected)?;

        if let (Chunk::S16(samples), None, true) =
            (chunk, &self.resampler, self.input.channels == self.channels)
        {
            scratch.frames_mut(frames).copy_from_slice(samples);
            return Ok(frames);
        }

        self.decoded.clear();
        chunk.append_f32(&mut self.decoded);

        let mixed: &[f32] = if self.input.channels == self.channels {
            &self.decoded
        } else {
            remix(
                &self.decoded,
                self.input.channels,
                &mut self.mixed,
                self.channels,
            );
            &self.mixed
        };

        let (samples, produced) = match self.resampler.as_mut() {
            Some(resampler) => {
                self.resampled.clear();
                let produced = resampler.process(mixed, &mut self.resampled)?;
                (&self.resampled[..], produced)
            }
            None => (mixed, frames),
        };

        if produced > expected {
            log::trace!("Resampler produced {produced} frames, expected {expected}");
        }
        store(samples, produced, self.channels, scratch)
    }

    /// Converts whatever the resampler still holds back into `scratch`.
    ///
    /// Meant for end of input. Returns 0 when no resampler is in use.
    pub fn flush(&mut self, scratch: &mut ScratchBuffer) -> Result<usize> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(0);
        };

        self.resampled.clear();
        let produced = resampler.flush(&mut self.resampled)?;
        store(&self.resampled, produced, self.channels, scratch)
    }
}

/// Quantizes `produced` frames of `samples` into the head of `scratch`.
fn store(
    samples: &[f32],
    produced: usize,
    channels: usize,
    scratch: &mut ScratchBuffer,
) -> Result<usize> {
    if samples.len() != produced * channels {
        return Err(ConversionError::Resampler(format!(
            "reported {produced} frames but wrote {} samples",
            samples.len()
        ))
        .into());
    }

    scratch.reserve(produced)?;
    for (dst, &src) in scratch.frames_mut(produced).iter_mut().zip(samples) {
        *dst = f32_to_i16(src);
    }
    Ok(produced)
}

/// Maps `in_channels`-channel frames onto `out_channels`-channel frames.
///
/// Mono is duplicated to every output channel, a mono target averages all
/// inputs, and anything else copies the leading channels and leaves extra
/// outputs silent.
fn remix(input: &[f32], in_channels: usize, output: &mut Vec<f32>, out_channels: usize) {
    output.clear();
    output.reserve(input.len() / in_channels * out_channels);

    for frame in input.chunks_exact(in_channels) {
        if in_channels == 1 {
            output.extend(std::iter::repeat_n(frame[0], out_channels));
        } else if out_channels == 1 {
            output.push(frame.iter().sum::<f32>() / in_channels as f32);
        } else {
            output.extend((0..out_channels).map(|c| frame.get(c).copied().unwrap_or(0.0)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::chunk::SampleFormat;

    fn spec(format: SampleFormat, sample_rate: u32, channels: usize) -> InputSpec {
        InputSpec {
            format,
            sample_rate,
            channels,
        }
    }

    /// Emits every input frame twice, plus one extra frame on each call.
    struct Doubler {
        channels: usize,
    }

    impl Resampler for Doubler {
        fn output_frames_hint(&self, input_frames: usize) -> usize {
            input_frames * 2
        }

        fn process(&mut self, input: &[f32], output: &mut Vec<f32>) -> Result<usize> {
            for frame in input.chunks_exact(self.channels) {
                output.extend_from_slice(frame);
                output.extend_from_slice(frame);
            }
            output.extend(std::iter::repeat_n(0.0, self.channels));
            Ok(input.len() / self.channels * 2 + 1)
        }
    }

    #[test]
    fn s16_passthrough_is_exact() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::S16, 48000, 2), 2, 48000)?;
        let mut scratch = ScratchBuffer::new(2);

        let input = [100, -100, 32767, -32768, 0, 1];
        assert_eq!(adapter.convert(Chunk::S16(&input), &mut scratch)?, 3);
        assert_eq!(scratch.frames(3), &input);
        Ok(())
    }

    #[test]
    fn float_input_is_quantized() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::F32, 48000, 1), 1, 48000)?;
        let mut scratch = ScratchBuffer::new(1);

        assert_eq!(
            adapter.convert(Chunk::F32(&[0.0, 0.5, -0.5, 1.5]), &mut scratch)?,
            4
        );
        assert_eq!(scratch.frames(4), &[0, 16384, -16384, 32767]);
        Ok(())
    }

    #[test]
    fn rejects_wrong_format_and_partial_frames() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::S16, 48000, 2), 2, 48000)?;
        let mut scratch = ScratchBuffer::new(2);

        let err = adapter
            .convert(Chunk::F32(&[0.0, 0.0]), &mut scratch)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConversionError>(),
            Some(ConversionError::FormatMismatch { .. })
        ));

        let err = adapter
            .convert(Chunk::S16(&[1, 2, 3]), &mut scratch)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConversionError>(),
            Some(ConversionError::PartialFrame {
                samples: 3,
                channels: 2
            })
        ));
        Ok(())
    }

    #[test]
    fn mono_is_duplicated_and_stereo_is_averaged() -> Result<()> {
        let mut up = FormatAdapter::new(spec(SampleFormat::S16, 48000, 1), 2, 48000)?;
        let mut scratch = ScratchBuffer::new(2);
        assert_eq!(up.convert(Chunk::S16(&[1000, -2000]), &mut scratch)?, 2);
        assert_eq!(scratch.frames(2), &[1000, 1000, -2000, -2000]);

        let mut down = FormatAdapter::new(spec(SampleFormat::S16, 48000, 2), 1, 48000)?;
        let mut scratch = ScratchBuffer::new(1);
        assert_eq!(down.convert(Chunk::S16(&[1000, 3000, -400, 0]), &mut scratch)?, 2);
        assert_eq!(scratch.frames(2), &[2000, -200]);
        Ok(())
    }

    #[test]
    fn surround_keeps_leading_channels() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::S16, 48000, 6), 2, 48000)?;
        let mut scratch = ScratchBuffer::new(2);

        let input = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        assert_eq!(adapter.convert(Chunk::S16(&input), &mut scratch)?, 2);
        assert_eq!(scratch.frames(2), &[1, 2, 7, 8]);
        Ok(())
    }

    #[test]
    fn injected_resampler_may_exceed_estimate() -> Result<()> {
        let mut adapter = FormatAdapter::with_resampler(
            spec(SampleFormat::S16, 24000, 2),
            2,
            48000,
            Box::new(Doubler { channels: 2 }),
        )?;
        let mut scratch = ScratchBuffer::new(2);

        assert_eq!(adapter.expected_frames(2), 4);
        assert_eq!(adapter.convert(Chunk::S16(&[10, 20, 30, 40]), &mut scratch)?, 5);
        assert_eq!(
            scratch.frames(5),
            &[10, 20, 10, 20, 30, 40, 30, 40, 0, 0]
        );
        assert!(scratch.capacity_frames() >= 5);
        Ok(())
    }

    fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                (i as f32 * frequency * std::f32::consts::TAU / sample_rate as f32).sin() * 0.5
            })
            .collect()
    }

    fn rms(samples: &[i16]) -> f32 {
        let sum: f32 = samples
            .iter()
            .map(|&s| (s as f32 / 32768.0).powi(2))
            .sum();
        (sum / samples.len() as f32).sqrt()
    }

    /// Runs `input` through a mono adapter in 960-frame chunks, then flushes.
    fn resample_mono(input: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<i16>> {
        let mut adapter =
            FormatAdapter::new(spec(SampleFormat::F32, source_rate, 1), 1, target_rate)?;
        let mut scratch = ScratchBuffer::new(1);
        let mut output = Vec::new();

        for chunk in input.chunks(960) {
            let produced = adapter.convert(Chunk::F32(chunk), &mut scratch)?;
            output.extend_from_slice(scratch.frames(produced));
        }
        let produced = adapter.flush(&mut scratch)?;
        output.extend_from_slice(scratch.frames(produced));
        Ok(output)
    }

    #[test]
    fn downsampling_filters_content_above_nyquist() -> Result<()> {
        let output = resample_mono(&sine(30_000.0, 96_000, 19_200), 96_000, 48_000)?;

        assert_eq!(output.len(), 9_600);
        let steady = &output[1_000..8_600];
        assert!(rms(steady) < 0.01, "alias rms {}", rms(steady));
        Ok(())
    }

    #[test]
    fn passband_survives_resampling() -> Result<()> {
        let output = resample_mono(&sine(1_000.0, 44_100, 44_100), 44_100, 48_000)?;

        assert_eq!(output.len(), 48_000);
        let steady = &output[2_000..46_000];
        assert!((rms(steady) - 0.3536).abs() < 0.01, "rms {}", rms(steady));
        Ok(())
    }

    #[test]
    fn sinc_resampler_holds_back_partial_chunks() -> Result<()> {
        let mut resampler = SincResampler::new(44_100, 48_000, 2)?;
        let input = vec![0.25f32; 441 * 2];
        let mut output = Vec::new();
        let mut total = 0;

        for _ in 0..10 {
            let hint = resampler.output_frames_hint(441);
            let produced = resampler.process(&input, &mut output)?;
            assert!(produced <= hint, "{produced} > {hint}");
            total += produced;
        }
        assert!(total < 4_800);
        assert_eq!(resampler.pending_frames(), 4_410 % RESAMPLER_CHUNK_FRAMES);

        total += resampler.flush(&mut output)?;
        assert_eq!(total, 4_800);
        assert_eq!(output.len(), total * 2);
        assert_eq!(resampler.pending_frames(), 0);
        Ok(())
    }

    #[test]
    fn sinc_resampler_rejects_bad_setup() {
        assert!(SincResampler::new(44_100, 48_000, 0).is_err());
        assert!(SincResampler::new(0, 48_000, 2).is_err());
    }

    #[test]
    fn adapter_resamples_when_rates_differ() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::S16, 24000, 1), 1, 48000)?;
        let mut scratch = ScratchBuffer::new(1);

        // Less than one resampler chunk is held back
        assert_eq!(adapter.expected_frames(100), 0);
        assert_eq!(adapter.convert(Chunk::S16(&[1000; 100]), &mut scratch)?, 0);

        let mut output = Vec::new();
        let produced = adapter.convert(Chunk::S16(&[1000; 2900]), &mut scratch)?;
        output.extend_from_slice(scratch.frames(produced));
        let produced = adapter.flush(&mut scratch)?;
        output.extend_from_slice(scratch.frames(produced));

        assert_eq!(output.len(), 6000);
        assert!(output[1000..5000].iter().all(|&s| (s - 1000).abs() <= 10));
        Ok(())
    }

    #[test]
    fn flush_without_resampler_is_empty() -> Result<()> {
        let mut adapter = FormatAdapter::new(spec(SampleFormat::S16, 48000, 2), 2, 48000)?;
        let mut scratch = ScratchBuffer::new(2);
        assert_eq!(adapter.flush(&mut scratch)?, 0);
        Ok(())
    }
}
