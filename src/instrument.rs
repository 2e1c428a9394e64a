//! Elapsed-time accounting for batches and per unit of work.

use tokio::time::{Duration, Instant};
use tracing::info;

/// Renders a duration as `m:ss.mmm [m:s.ms]`.
///
/// With `per` set, the duration is divided by that count first, which gives
/// the average time per processed item.
pub fn format_elapsed(elapsed: Duration, per: Option<usize>) -> String {
    let mut elapsed_ms = elapsed.as_millis() as f64;
    if let Some(count) = per.filter(|count| *count > 0) {
        elapsed_ms /= count as f64;
    }

    let ms = (elapsed_ms % 1000.0).floor();
    let total_seconds = ((elapsed_ms - ms) / 1000.0).floor() as u64;
    let minutes = total_seconds / 60;
    let seconds = total_seconds - minutes * 60;

    format!("{}:{:02}.{:03} [m:s.ms]", minutes, seconds, ms as u64)
}

/// Wall clock started at construction.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start()
    }
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Logs total and per-item elapsed time for a finished unit of work.
    pub fn report(&self, name: &str, unit: &str, items: usize) {
        let elapsed = self.elapsed();
        info!(
            "Elapsed time for {}: {} (per {}: {}).",
            name,
            format_elapsed(elapsed, None),
            unit,
            format_elapsed(elapsed, Some(items))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trimmed(ms: u64, per: Option<usize>) -> String {
        let formatted = format_elapsed(Duration::from_millis(ms), per);
        formatted
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn formats_milliseconds() {
        assert_eq!(trimmed(3, None), "0:00.003");
        assert_eq!(trimmed(23, None), "0:00.023");
        assert_eq!(trimmed(123, None), "0:00.123");
    }

    #[test]
    fn formats_seconds() {
        assert_eq!(trimmed(1_700, None), "0:01.700");
        assert_eq!(trimmed(7_000, None), "0:07.000");
        assert_eq!(trimmed(21_700, None), "0:21.700");
    }

    #[test]
    fn formats_minutes() {
        assert_eq!(trimmed(60_000, None), "1:00.000");
        assert_eq!(trimmed(60_001, None), "1:00.001");
        assert_eq!(trimmed(120_001, None), "2:00.001");
        assert_eq!(trimmed((5 * 60 + 3) * 1000 + 4, None), "5:03.004");
    }

    #[test]
    fn divides_by_item_count() {
        assert_eq!(trimmed(120_000, Some(2)), "1:00.000");
        assert_eq!(trimmed(120_000, Some(4)), "0:30.000");
        assert_eq!(trimmed(120_000, Some(8)), "0:15.000");
        assert_eq!(trimmed(120_000, Some(16)), "0:07.500");
    }

    #[test]
    fn zero_items_is_not_a_division() {
        assert_eq!(trimmed(1_500, Some(0)), "0:01.500");
    }

    #[test]
    fn carries_unit_suffix() {
        assert!(format_elapsed(Duration::from_millis(5), None).ends_with("[m:s.ms]"));
    }
}
