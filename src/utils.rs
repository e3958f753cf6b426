use std::time::{Duration, Instant};

use tracing::warn;

/// Two-decimal `Debug` rendering with the unit picked by magnitude (`1.94ms`, `2.34s`).
pub fn fmt_duration(d: Duration) -> String {
    format!("{d:.2?}")
}

/// Warn when the operation started at `start` ran past `threshold`.
pub fn log_if_slow(start: Instant, threshold: Duration, label: &str) {
    let elapsed = start.elapsed();
    if elapsed > threshold {
        warn!(
            operation = label,
            duration = fmt_duration(elapsed),
            threshold = fmt_duration(threshold),
            "slow operation"
        );
    }
}
