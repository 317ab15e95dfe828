use std::time::Instant;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::timestamp::time_str;

const SPINNER_TEMPLATE: &str = "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}";

pub fn create_progress_bar(multi: &MultiProgress) -> Result<ProgressBar> {
    let pb = multi.add(ProgressBar::new_spinner());
    pb.set_style(ProgressStyle::with_template(SPINNER_TEMPLATE)?);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb.set_message("opening input");
    Ok(pb)
}

/// Refreshes the bar every 50 frames (one second at 20 ms frames).
pub fn update_progress_bar(pb: &ProgressBar, frames: u64, encoded_samples: u64, sample_rate: u32) {
    if frames.is_multiple_of(50) {
        pb.set_position(frames);
        pb.set_message(format!(
            "timestamp: {}",
            time_str(encoded_samples, sample_rate)
        ));
    }
}

pub fn finalize_progress_bar(
    pb: &ProgressBar,
    frames: u64,
    encoded_samples: u64,
    sample_rate: u32,
    start_time: Instant,
) {
    let elapsed = start_time.elapsed().as_secs_f64();
    let audio_secs = encoded_samples as f64 / sample_rate as f64;
    let realtime_multiplier = if elapsed > 0.0 {
        audio_secs / elapsed
    } else {
        0.0
    };

    pb.set_position(frames);
    pb.finish_with_message(format!(
        "speed: {realtime_multiplier:.1}x | timestamp: {}",
        time_str(encoded_samples, sample_rate)
    ));
}
