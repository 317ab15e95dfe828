use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use dca::structs::config::EncoderMode;
use serde::{Deserialize, Serialize};

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (dca ", env!("DCA_LIB_VERSION"), ", built ", env!("BUILD_TIMESTAMP"), ")"
    ),
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Encode audio into length-prefixed Opus (DCA) streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Encode an audio file into a DCA stream.
    Encode(EncodeArgs),

    /// Print statistics about a DCA stream.
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Input audio file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output DCA file [default: stdout].
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Opus application [default: audio].
    #[arg(short = 'a', long, value_enum)]
    pub application: Option<Application>,

    /// Audio bit rate in kb/s [default: 64].
    #[arg(short = 'b', long, value_name = "KBPS", value_parser = clap::value_parser!(u32).range(1..=512))]
    pub bitrate: Option<u32>,

    /// Encoded audio channels [default: 2].
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u16).range(1..))]
    pub channels: Option<u16>,

    /// Encoded sample rate in Hz [default: 48000].
    #[arg(short = 'r', long, value_name = "HZ", value_parser = clap::value_parser!(u32).range(1..))]
    pub sample_rate: Option<u32>,

    /// Samples per channel per frame; 960 (20ms), 1920 (40ms) or 2880 (60ms) at 48 kHz [default: 960].
    #[arg(short = 's', long, value_name = "SAMPLES", value_parser = clap::value_parser!(u32).range(1..))]
    pub frame_size: Option<u32>,

    /// Zero-pad the last partial frame instead of dropping it.
    #[arg(long)]
    pub pad_tail: bool,

    /// YAML preset with encoder settings; explicit flags take precedence.
    #[arg(long, value_name = "FILE")]
    pub preset: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input DCA stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Application {
    /// General music and mixed content.
    Audio,
    /// Speech.
    Voip,
    /// Restricted low delay.
    #[value(name = "lowdelay")]
    Lowdelay,
}

impl From<Application> for EncoderMode {
    fn from(application: Application) -> Self {
        match application {
            Application::Audio => EncoderMode::Generic,
            Application::Voip => EncoderMode::Voice,
            Application::Lowdelay => EncoderMode::LowDelay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_encoder_flags() {
        let cli = Cli::try_parse_from([
            "dcaenc", "encode", "-a", "voip", "-b", "96", "-c", "1", "-r", "24000", "-s", "480",
            "song.flac",
        ])
        .unwrap();

        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.application, Some(Application::Voip));
        assert_eq!(args.bitrate, Some(96));
        assert_eq!(args.channels, Some(1));
        assert_eq!(args.sample_rate, Some(24000));
        assert_eq!(args.frame_size, Some(480));
        assert_eq!(args.input, PathBuf::from("song.flac"));
        assert!(args.output.is_none());
        assert!(!args.pad_tail);
    }

    #[test]
    fn rejects_zero_values() {
        assert!(Cli::try_parse_from(["dcaenc", "encode", "-c", "0", "in.wav"]).is_err());
        assert!(Cli::try_parse_from(["dcaenc", "encode", "-b", "0", "in.wav"]).is_err());
        assert!(Cli::try_parse_from(["dcaenc", "encode", "-a", "music", "in.wav"]).is_err());
    }

    #[test]
    fn lowdelay_maps_to_low_delay_mode() {
        let cli =
            Cli::try_parse_from(["dcaenc", "--strict", "encode", "-a", "lowdelay", "-"]).unwrap();
        assert!(cli.strict);
        let Commands::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(
            EncoderMode::from(args.application.unwrap()),
            EncoderMode::LowDelay
        );
    }
}
