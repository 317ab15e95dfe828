/// Formats a sample count at `sample_rate` as `HH:MM:SS.mmm`.
pub fn time_str(samples: u64, sample_rate: u32) -> String {
    if sample_rate == 0 {
        return "--:--:--.---".to_string();
    }

    let ms = samples * 1000 / sample_rate as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let milliseconds = ms % 1000;

    format!(
        "{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[test]
fn formats_sample_counts() {
    assert_eq!(time_str(0, 48_000), "00:00:00.000");
    assert_eq!(time_str(960, 48_000), "00:00:00.020");
    assert_eq!(time_str(48_000 * 3_725 + 24_000, 48_000), "01:02:05.500");
    assert_eq!(time_str(44_100 * 3_600 * 123, 44_100), "123:00:00.000");
    assert_eq!(time_str(1, 0), "--:--:--.---");
}
