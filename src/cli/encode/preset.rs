use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use dca::structs::config::{EncoderMode, EncodingConfig};
use serde::{Deserialize, Serialize};

use crate::cli::command::{Application, EncodeArgs};

/// Encoder settings loaded from a YAML file.
///
/// ```yaml
/// application: voip
/// bitrate: 48        # kb/s
/// channels: 1
/// sample-rate: 48000
/// frame-size: 960
/// pad-tail: true
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Preset {
    pub application: Option<Application>,
    pub bitrate: Option<u32>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub frame_size: Option<u32>,
    pub pad_tail: Option<bool>,
}

impl Preset {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Couldn't read preset {}", path.display()))?;
        let preset = serde_yaml_ng::from_str(&text)
            .with_context(|| format!("Invalid preset {}", path.display()))?;
        log::debug!("Loaded preset {}: {preset:?}", path.display());
        Ok(preset)
    }
}

/// Final encoder settings: explicit flags, then the preset, then defaults.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSettings {
    pub config: EncodingConfig,
    pub pad_tail: bool,
}

pub fn resolve(args: &EncodeArgs, preset: &Preset) -> ResolvedSettings {
    let defaults = EncodingConfig::default();

    let mode = args
        .application
        .or(preset.application)
        .map(EncoderMode::from)
        .unwrap_or(defaults.mode);
    let bit_rate = args
        .bitrate
        .or(preset.bitrate)
        .map(|kbps| kbps.saturating_mul(1000))
        .unwrap_or(defaults.bit_rate);
    let channels = args
        .channels
        .or(preset.channels)
        .map(usize::from)
        .unwrap_or(defaults.channels);
    let sample_rate = args
        .sample_rate
        .or(preset.sample_rate)
        .unwrap_or(defaults.sample_rate);
    let frame_size = args
        .frame_size
        .or(preset.frame_size)
        .map(|n| n as usize)
        .unwrap_or(defaults.frame_size);

    ResolvedSettings {
        config: EncodingConfig {
            channels,
            sample_rate,
            frame_size,
            bit_rate,
            mode,
        },
        pad_tail: args.pad_tail || preset.pad_tail.unwrap_or(false),
    }
}
