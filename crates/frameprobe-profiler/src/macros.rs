//! Profiling macros and scope guards.

use crate::memory::MemoryCounters;
use crate::monitor::PerformanceMonitor;
use crate::registry::{EventKey, EventKeyRef, TimerKind};

struct ActiveTimer<'a> {
    monitor: &'a PerformanceMonitor,
    kind: TimerKind,
    key: EventKeyRef<'a>,
    epoch: u64,
}

/// RAII guard that stops an event's stopwatch on drop.
///
/// Returned inert when monitoring is disabled, in which case it holds nothing
/// and dropping it does nothing.
#[must_use = "the timer stops as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    active: Option<ActiveTimer<'a>>,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) const fn new(
        monitor: &'a PerformanceMonitor,
        kind: TimerKind,
        key: EventKeyRef<'a>,
        epoch: u64,
    ) -> Self {
        Self {
            active: Some(ActiveTimer {
                monitor,
                kind,
                key,
                epoch,
            }),
        }
    }

    /// A guard that measures nothing.
    #[inline]
    pub const fn inert() -> Self {
        Self { active: None }
    }

    /// Whether this guard still has a running timer to stop.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Stop the timer now. Later calls, and the eventual drop, do nothing.
    #[inline]
    pub fn release(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.monitor.stop_timer(timer.kind, timer.key, timer.epoch);
        }
    }
}

impl Drop for ScopeGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.release();
    }
}

struct ActiveSample<'a> {
    monitor: &'a PerformanceMonitor,
    key: EventKey,
    baseline: MemoryCounters,
    epoch: u64,
}

/// RAII guard that adds the allocator delta since acquisition to an event's
/// memory usage on drop.
#[must_use = "the sample ends as soon as the guard is dropped"]
pub struct MemoryScope<'a> {
    active: Option<ActiveSample<'a>>,
}

impl<'a> MemoryScope<'a> {
    pub(crate) const fn new(
        monitor: &'a PerformanceMonitor,
        key: EventKey,
        baseline: MemoryCounters,
        epoch: u64,
    ) -> Self {
        Self {
            active: Some(ActiveSample {
                monitor,
                key,
                baseline,
                epoch,
            }),
        }
    }

    /// A scope that samples nothing.
    #[inline]
    pub const fn inert() -> Self {
        Self { active: None }
    }

    /// Whether this scope still holds a baseline to compare against.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// End the sample now. Later calls, and the eventual drop, do nothing.
    pub fn release(&mut self) {
        if let Some(sample) = self.active.take() {
            sample
                .monitor
                .finish_memory_sample(&sample.key, sample.baseline, sample.epoch);
        }
    }
}

impl Drop for MemoryScope<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Time an interval event until the end of the enclosing scope.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
///
/// # Examples
///
/// ```ignore
/// use frameprobe_profiler::{profile_interval, PerformanceMonitor};
///
/// fn send(monitor: &PerformanceMonitor) {
///     profile_interval!(monitor, "Net", "Send");
///     // ... send packets
/// } // timer stopped here
/// ```
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_interval {
    ($monitor:expr, $component:expr, $event:expr) => {
        let _guard = $monitor.begin_interval($component, $event);
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_interval {
    ($monitor:expr, $component:expr, $event:expr) => {};
}

/// Time an increment event until the end of the enclosing scope.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_increment {
    ($monitor:expr, $component:expr, $event:expr) => {
        let _guard = $monitor.begin_increment($component, $event);
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_increment {
    ($monitor:expr, $component:expr, $event:expr) => {};
}

/// Count one occurrence of an event.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_count {
    ($monitor:expr, $component:expr, $event:expr) => {
        $monitor.increment_count($component, $event);
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_count {
    ($monitor:expr, $component:expr, $event:expr) => {};
}

/// Sample allocator counters until the end of the enclosing scope.
///
/// When the `profiling` feature is disabled, this macro expands to nothing.
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_memory {
    ($monitor:expr, $component:expr, $event:expr) => {
        let _sample = $monitor.begin_memory_sample($component, $event);
    };
}

#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_memory {
    ($monitor:expr, $component:expr, $event:expr) => {};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    #[test]
    fn inert_guards_are_noops() {
        let mut guard = ScopeGuard::inert();
        assert!(!guard.is_active());
        guard.release();

        let mut scope = MemoryScope::inert();
        scope.release();
        assert!(!scope.is_active());
    }

    #[test]
    fn release_is_idempotent() {
        let monitor = PerformanceMonitor::new(MonitorConfig::enabled());
        let outer = monitor.begin_interval("Net", "Send");
        let mut inner = monitor.begin_interval("Net", "Send");

        inner.release();
        inner.release();
        assert!(!inner.is_active());
        drop(inner);

        // The outer scope is still open, so the stopwatch must still run.
        let elapsed = monitor.interval_elapsed("Net", "Send").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(1));
        assert!(monitor.interval_elapsed("Net", "Send").unwrap() > elapsed);
        drop(outer);

        let stopped = monitor.interval_elapsed("Net", "Send").unwrap();
        assert_eq!(monitor.interval_elapsed("Net", "Send").unwrap(), stopped);
    }

    #[cfg(feature = "profiling")]
    #[test]
    fn macros_record_when_enabled() {
        let monitor = PerformanceMonitor::new(MonitorConfig::enabled());
        {
            profile_interval!(monitor, "Frame", "Update");
            profile_increment!(monitor, "Frame", "Total");
            profile_count!(monitor, "Frame", "Update");
            profile_memory!(monitor, "Frame", "Update");
        }
        assert_eq!(monitor.count("Frame", "Update"), Some(1));
        assert!(monitor.interval_elapsed("Frame", "Update").is_some());
        assert!(monitor.increment_elapsed("Frame", "Total").is_some());
    }
}
