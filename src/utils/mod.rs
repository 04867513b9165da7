//! Common utilities and helpers

use std::time::Duration;

pub mod logging;
pub mod path;

/// Format duration for display
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let milliseconds = duration.subsec_millis();

    if hours > 0 {
        format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
    } else {
        format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
    }
}

/// Frames per second over `elapsed`, zero for an empty interval
pub fn throughput(frames: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        frames as f64 / secs
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(61_250)), "01:01.250");
        assert_eq!(format_duration(Duration::from_secs(3_723)), "01:02:03.000");
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(50, Duration::from_secs(2)), 25.0);
        assert_eq!(throughput(50, Duration::ZERO), 0.0);
    }
}
