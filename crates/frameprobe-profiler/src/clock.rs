//! Accumulating stopwatch backing interval and increment timers.

use std::time::{Duration, Instant};

/// Convert a duration to fractional milliseconds.
#[inline]
#[must_use]
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_nanos() as f64 / 1_000_000.0
}

/// Monotonic elapsed-time accumulator.
///
/// Repeated start/stop pairs sum their elapsed time. Starts are counted, so
/// nested scopes on the same stopwatch keep it running until the outermost
/// scope stops and overlapping time is only counted once.
#[derive(Debug, Clone, Default)]
pub(crate) struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
    depth: u32,
}

impl Stopwatch {
    /// Start or resume timing.
    #[inline]
    pub fn start(&mut self) {
        self.start_at(Instant::now());
    }

    pub(crate) fn start_at(&mut self, now: Instant) {
        if self.depth == 0 {
            self.running_since = Some(now);
        }
        self.depth = self.depth.saturating_add(1);
    }

    /// Close one open scope. Stopping a stopped stopwatch does nothing.
    #[inline]
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    pub(crate) fn stop_at(&mut self, now: Instant) {
        match self.depth {
            0 => {}
            1 => {
                if let Some(since) = self.running_since.take() {
                    self.accumulated += now.saturating_duration_since(since);
                }
                self.depth = 0;
            }
            _ => self.depth -= 1,
        }
    }

    /// Whether at least one scope is open.
    #[cfg(test)]
    pub const fn is_running(&self) -> bool {
        self.depth > 0
    }

    /// Total elapsed time, including the running segment.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    pub(crate) fn elapsed_at(&self, now: Instant) -> Duration {
        self.accumulated
            + self
                .running_since
                .map_or(Duration::ZERO, |since| now.saturating_duration_since(since))
    }

    /// Zero the elapsed time. A running stopwatch keeps running from `now`.
    pub(crate) fn reset_at(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        if self.running_since.is_some() {
            self.running_since = Some(now);
        }
    }

    /// Read the elapsed time up to `now` and reset in one step.
    pub(crate) fn take_at(&mut self, now: Instant) -> Duration {
        let elapsed = self.elapsed_at(now);
        self.reset_at(now);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn start_stop_pairs_accumulate() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::default();

        watch.start_at(t0);
        watch.stop_at(t0 + 4 * MS);
        watch.start_at(t0 + 10 * MS);
        watch.stop_at(t0 + 16 * MS);

        assert!(!watch.is_running());
        assert_eq!(watch.elapsed_at(t0 + 100 * MS), 10 * MS);
    }

    #[test]
    fn nested_scopes_count_overlap_once() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::default();

        watch.start_at(t0);
        watch.start_at(t0 + 2 * MS);
        watch.stop_at(t0 + 5 * MS);
        assert!(watch.is_running());
        watch.stop_at(t0 + 8 * MS);

        assert_eq!(watch.elapsed_at(t0 + 20 * MS), 8 * MS);
    }

    #[test]
    fn stop_without_start_is_noop() {
        let mut watch = Stopwatch::default();
        watch.stop();
        watch.stop();
        assert_eq!(watch.elapsed(), Duration::ZERO);
        assert!(!watch.is_running());
    }

    #[test]
    fn take_keeps_running_segment() {
        let t0 = Instant::now();
        let mut watch = Stopwatch::default();

        watch.start_at(t0);
        assert_eq!(watch.take_at(t0 + 3 * MS), 3 * MS);
        assert!(watch.is_running());

        watch.stop_at(t0 + 5 * MS);
        assert_eq!(watch.elapsed_at(t0 + 9 * MS), 2 * MS);
    }

    #[test]
    fn milliseconds_conversion() {
        assert!((duration_ms(Duration::from_micros(1500)) - 1.5).abs() < f64::EPSILON);
        assert!((duration_ms(Duration::from_millis(10)) - 10.0).abs() < f64::EPSILON);
    }
}
