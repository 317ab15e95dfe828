use anyhow::Result;
use clap::Parser as ClapParser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

use cli::command::{Cli, Commands, LogFormat};
use cli::encode::cmd_encode;
use cli::info::cmd_info;

mod cli;
mod input;
mod source;
pub(crate) mod timestamp;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_level = cli.loglevel.to_level_filter();

    let multi = MultiProgress::new();

    // Logs go to stderr; stdout may carry the encoded stream
    let mut env_builder = env_logger::Builder::from_default_env();
    env_builder.filter_level(base_level);
    env_builder.target(env_logger::Target::Stderr);
    match cli.log_format {
        LogFormat::Plain => {
            env_builder.format_timestamp_secs();
        }
        LogFormat::Json => {
            env_builder.format(|buf, record| {
                use std::io::Write;
                writeln!(buf, "{}", json_record(&buf.timestamp().to_string(), record))
            });
        }
    }

    let pb = if cli.progress {
        let logger = env_builder.build();
        LogWrapper::new(multi.clone(), logger).try_init()?;
        Some(&multi)
    } else {
        env_builder.try_init()?;
        None
    };

    match cli.command {
        Commands::Encode(ref args) => cmd_encode(args, &cli, pb)?,
        Commands::Info(ref args) => cmd_info(args, &cli, pb)?,
    }

    Ok(())
}

/// One log record as a single-line JSON object.
fn json_record(ts: &str, record: &log::Record) -> serde_json::Value {
    serde_json::json!({
        "ts": ts,
        "lvl": record.level().as_str(),
        "target": record.target(),
        "msg": record.args().to_string(),
    })
}

#[test]
fn json_log_lines_escape_messages() -> Result<()> {
    let record = log::Record::builder()
        .args(format_args!("path \"C:\\tmp\"\ttab é"))
        .level(log::Level::Warn)
        .target("dcaenc::source")
        .build();

    let line = json_record("2026-01-01T00:00:00Z", &record).to_string();
    assert!(!line.contains('\n'));

    let parsed: serde_json::Value = serde_json::from_str(&line)?;
    assert_eq!(parsed["lvl"], "WARN");
    assert_eq!(parsed["target"], "dcaenc::source");
    assert_eq!(parsed["msg"], "path \"C:\\tmp\"\ttab é");
    assert_eq!(parsed["ts"], "2026-01-01T00:00:00Z");
    Ok(())
}
