use crate::process::session::FrameEncoder;
use crate::structs::config::{EncoderMode, EncodingConfig};
use crate::utils::errors::{ConfigError, EncodeError};
use anyhow::Result;
use opus::{Application, Bitrate, Channels, Encoder};

/// Sample rates accepted by libopus.
pub const OPUS_SAMPLE_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

/// Frame durations accepted by libopus, in units of 2.5 ms.
const OPUS_FRAME_UNITS: [usize; 6] = [1, 2, 4, 8, 16, 24];

const OPUS_BIT_RATES: std::ops::RangeInclusive<u32> = 500..=512_000;

/// Checks `config` against the limits libopus enforces.
pub fn validate_opus_config(config: &EncodingConfig) -> Result<(), ConfigError> {
    if !(1..=2).contains(&config.channels) {
        return Err(ConfigError::UnsupportedChannels(config.channels));
    }
    if !OPUS_SAMPLE_RATES.contains(&config.sample_rate) {
        return Err(ConfigError::UnsupportedSampleRate(config.sample_rate));
    }

    // 2.5 ms at sample_rate is sample_rate / 400 frames
    let scaled = config.frame_size * 400;
    let rate = config.sample_rate as usize;
    if scaled % rate != 0 || !OPUS_FRAME_UNITS.contains(&(scaled / rate)) {
        return Err(ConfigError::UnsupportedFrameSize {
            frame_size: config.frame_size,
            sample_rate: config.sample_rate,
        });
    }

    if !OPUS_BIT_RATES.contains(&config.bit_rate) {
        return Err(ConfigError::UnsupportedBitRate(config.bit_rate));
    }
    Ok(())
}

/// [`FrameEncoder`] backed by libopus.
pub struct OpusFrameEncoder {
    encoder: Encoder,
    samples_per_frame: usize,
}

impl OpusFrameEncoder {
    pub fn new(config: &EncodingConfig) -> Result<Self> {
        config.validate()?;
        validate_opus_config(config)?;

        let channels = match config.channels {
            1 => Channels::Mono,
            _ => Channels::Stereo,
        };
        let application = match config.mode {
            EncoderMode::Generic => Application::Audio,
            EncoderMode::Voice => Application::Voip,
            EncoderMode::LowDelay => Application::LowDelay,
        };

        let mut encoder = Encoder::new(config.sample_rate, channels, application)
            .map_err(|e| ConfigError::EncoderInit(e.to_string()))?;
        encoder
            .set_bitrate(Bitrate::Bits(config.bit_rate as i32))
            .map_err(|e| ConfigError::EncoderInit(e.to_string()))?;

        log::debug!(
            "Opus encoder ready: {} Hz, {} ch, {} b/s, {} ({:.1} ms frames)",
            config.sample_rate,
            config.channels,
            config.bit_rate,
            config.mode,
            config.frame_duration_ms()
        );

        Ok(Self {
            encoder,
            samples_per_frame: config.samples_per_frame(),
        })
    }
}

impl FrameEncoder for OpusFrameEncoder {
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize> {
        if pcm.len() != self.samples_per_frame {
            return Err(EncodeError::WrongFrameLength {
                expected: self.samples_per_frame,
                actual: pcm.len(),
            }
            .into());
        }

        let len = self
            .encoder
            .encode(pcm, out)
            .map_err(|e| EncodeError::Opus(e.to_string()))?;
        Ok(len)
    }
}
