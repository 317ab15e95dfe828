use crate::utils::errors::ConfigError;
use anyhow::Result;
use std::fmt::Display;

/// Default audio bit rate in bits per second.
pub const DEFAULT_BIT_RATE: u32 = 64_000;

/// Default encoder sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Default number of encoded channels.
pub const DEFAULT_CHANNELS: usize = 2;

/// Default number of sample-frames per encoded frame (20 ms at 48 kHz).
pub const DEFAULT_FRAME_SIZE: usize = 960;

/// Tuning target handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncoderMode {
    /// General audio, Opus `Application::Audio`.
    #[default]
    Generic,
    /// Speech, Opus `Application::Voip`.
    Voice,
    /// Restricted low delay, Opus `Application::LowDelay`.
    LowDelay,
}

impl Display for EncoderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncoderMode::Generic => write!(f, "audio"),
            EncoderMode::Voice => write!(f, "voip"),
            EncoderMode::LowDelay => write!(f, "lowdelay"),
        }
    }
}

/// Parameters of one encoding session.
///
/// Every field is fixed once a session is created. `frame_size` is both the
/// number of sample-frames the encoder consumes per call and the unit in
/// which output is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingConfig {
    pub channels: usize,
    pub sample_rate: u32,
    pub frame_size: usize,
    pub bit_rate: u32,
    pub mode: EncoderMode,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            frame_size: DEFAULT_FRAME_SIZE,
            bit_rate: DEFAULT_BIT_RATE,
            mode: EncoderMode::default(),
        }
    }
}

impl EncodingConfig {
    /// Checks the encoder-independent constraints.
    ///
    /// Limits imposed by a particular encoder (supported rates, frame
    /// durations) are checked when that encoder is constructed.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 {
            return Err(ConfigError::ZeroChannels.into());
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::ZeroSampleRate.into());
        }
        if self.frame_size == 0 {
            return Err(ConfigError::ZeroFrameSize.into());
        }
        if self.bit_rate == 0 {
            return Err(ConfigError::ZeroBitRate.into());
        }
        Ok(())
    }

    /// Interleaved samples in one frame.
    pub fn samples_per_frame(&self) -> usize {
        self.frame_size * self.channels
    }

    pub fn frame_duration_ms(&self) -> f64 {
        self.frame_size as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[test]
fn default_config_matches_discord_profile() {
    let config = EncodingConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.samples_per_frame(), 1920);
    assert_eq!(config.frame_duration_ms(), 20.0);
    assert_eq!(config.mode.to_string(), "audio");
}

#[test]
fn zero_fields_are_config_errors() {
    let cases = [
        EncodingConfig {
            channels: 0,
            ..Default::default()
        },
        EncodingConfig {
            sample_rate: 0,
            ..Default::default()
        },
        EncodingConfig {
            frame_size: 0,
            ..Default::default()
        },
        EncodingConfig {
            bit_rate: 0,
            ..Default::default()
        },
    ];

    for config in cases {
        let err = config.validate().unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some(), "{config:?}");
    }
}
