//! Performance monitor owning the event registry.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::MonitorConfig;
use crate::error::Result;
use crate::macros::{MemoryScope, ScopeGuard};
use crate::memory::{MemoryCounters, MemoryIntrospector, MemoryUsage};
use crate::protocol;
use crate::registry::{EventKey, EventKeyRef, EventRegistry, TimerKind};
use crate::report::FrameReport;

/// Builder for [`PerformanceMonitor`].
#[derive(Default)]
pub struct PerformanceMonitorBuilder {
    config: MonitorConfig,
    introspector: Option<Box<dyn MemoryIntrospector>>,
}

impl PerformanceMonitorBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing config.
    #[must_use]
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the initial state of the reporting switch.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    /// Set the number of frames per report for `end_frame`.
    #[must_use]
    pub fn report_interval_frames(mut self, frames: u32) -> Self {
        self.config.report_interval_frames = frames;
        self
    }

    /// Set the allocator introspection used by memory samples.
    #[must_use]
    pub fn memory_introspector(mut self, introspector: impl MemoryIntrospector + 'static) -> Self {
        self.introspector = Some(Box::new(introspector));
        self
    }

    /// Build the monitor.
    #[must_use]
    pub fn build(self) -> PerformanceMonitor {
        PerformanceMonitor {
            enabled: AtomicBool::new(self.config.enabled),
            registry: Mutex::new(EventRegistry::new()),
            introspector: self.introspector,
            report_interval_frames: self.config.report_interval_frames.max(1),
            frames_since_report: AtomicU32::new(0),
        }
    }
}

/// Collects timings, counts and memory deltas for named events and writes
/// them out once per reporting interval.
///
/// Every measurement call checks the reporting switch first and returns an
/// inert result when it is off.
pub struct PerformanceMonitor {
    enabled: AtomicBool,
    registry: Mutex<EventRegistry>,
    introspector: Option<Box<dyn MemoryIntrospector>>,
    report_interval_frames: u32,
    frames_since_report: AtomicU32,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl PerformanceMonitor {
    /// Create a monitor without memory introspection.
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        PerformanceMonitorBuilder::new().config(config).build()
    }

    /// Create a builder.
    #[must_use]
    pub fn builder() -> PerformanceMonitorBuilder {
        PerformanceMonitorBuilder::new()
    }

    /// Whether performance reporting is switched on.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Flip the performance reporting switch.
    pub fn set_diagnostic_mode(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            tracing::info!(enabled, "Performance reporting switched");
        }
    }

    /// Frames per report used by [`end_frame`](Self::end_frame).
    #[must_use]
    pub const fn report_interval_frames(&self) -> u32 {
        self.report_interval_frames
    }

    /// Start timing an interval event, reset after every report.
    #[inline]
    pub fn begin_interval<'a>(&'a self, component: &'a str, event: &'a str) -> ScopeGuard<'a> {
        self.begin_timer(TimerKind::Interval, component, event)
    }

    /// Start timing an increment event, accumulated across reports.
    #[inline]
    pub fn begin_increment<'a>(&'a self, component: &'a str, event: &'a str) -> ScopeGuard<'a> {
        self.begin_timer(TimerKind::Increment, component, event)
    }

    fn begin_timer<'a>(
        &'a self,
        kind: TimerKind,
        component: &'a str,
        event: &'a str,
    ) -> ScopeGuard<'a> {
        if !self.is_enabled() {
            return ScopeGuard::inert();
        }
        let key = EventKeyRef::new(component, event);
        let mut registry = self.registry.lock();
        registry.timer_mut(kind, key).start();
        ScopeGuard::new(self, kind, key, registry.timer_epoch())
    }

    pub(crate) fn stop_timer(&self, kind: TimerKind, key: EventKeyRef<'_>, epoch: u64) {
        let mut registry = self.registry.lock();
        // The scope's stopwatch died with a reset; a same-key one belongs to newer scopes.
        if registry.timer_epoch() != epoch {
            tracing::debug!(?key, "Ignoring timer scope opened before reset");
            return;
        }
        // Stops even if reporting was switched off mid-scope so the stopwatch stays balanced.
        if let Some(watch) = registry.existing_timer_mut(kind, key) {
            watch.stop();
        }
    }

    /// Count one occurrence of an event.
    #[inline]
    pub fn increment_count(&self, component: &str, event: &str) {
        if !self.is_enabled() {
            return;
        }
        self.registry
            .lock()
            .increment_count(EventKeyRef::new(component, event));
    }

    /// Start sampling allocator counters for an event.
    ///
    /// Returns an inert scope, logging a warning, if memory introspection is
    /// not available.
    pub fn begin_memory_sample(&self, component: &str, event: &str) -> MemoryScope<'_> {
        if !self.is_enabled() {
            return MemoryScope::inert();
        }
        let Some(introspector) = self.active_introspector() else {
            tracing::warn!(
                component,
                event,
                "Memory introspection unavailable, skipping memory sample"
            );
            return MemoryScope::inert();
        };

        // Create the record before reading the baseline so its allocation is not measured.
        let key = EventKey::new(component, event);
        let epoch = {
            let mut registry = self.registry.lock();
            registry.memory_mut(key.borrowed());
            registry.memory_epoch()
        };

        match introspector.counters() {
            Some(baseline) => MemoryScope::new(self, key, baseline, epoch),
            None => {
                tracing::warn!(%key, "Memory introspection returned no counters");
                MemoryScope::inert()
            }
        }
    }

    pub(crate) fn finish_memory_sample(
        &self,
        key: &EventKey,
        baseline: MemoryCounters,
        epoch: u64,
    ) {
        if !self.is_enabled() {
            tracing::debug!(%key, "Reporting switched off, dropping memory sample");
            return;
        }
        let Some(current) = self.active_introspector().and_then(|i| i.counters()) else {
            tracing::warn!(%key, "Memory introspection became unavailable, dropping sample");
            return;
        };
        let delta = current.delta_since(&baseline);

        let mut registry = self.registry.lock();
        if registry.memory_epoch() != epoch {
            tracing::warn!(%key, "Memory usages cleared during sample, dropping sample");
            return;
        }
        match registry.existing_memory_mut(key.borrowed()) {
            Some(usage) => usage.accumulate(delta),
            None => tracing::warn!(%key, "No memory usage record, dropping sample"),
        }
    }

    fn active_introspector(&self) -> Option<&dyn MemoryIntrospector> {
        self.introspector
            .as_deref()
            .filter(|introspector| introspector.is_active())
    }

    /// Drain the registry into a report for `num_frames` frames.
    ///
    /// Interval timers and counts are reset as part of the snapshot.
    #[must_use]
    pub fn take_report(&self, num_frames: u32) -> FrameReport {
        if !self.is_enabled() {
            return FrameReport::disabled();
        }
        let mut registry = self.registry.lock();
        FrameReport::collect(&mut registry, num_frames, Instant::now())
    }

    /// Write one report message for the last `num_frames` frames.
    pub fn write_report<W: Write>(&self, writer: &mut W, num_frames: u32) -> Result<()> {
        let report = self.take_report(num_frames);
        protocol::write_report(writer, &report)?;
        tracing::debug!(
            num_frames,
            enabled = report.performance_monitoring_enabled,
            intervals = report.interval_durations.len(),
            increments = report.increment_durations.len(),
            counts = report.counts.len(),
            memory = report.memory_usages.len(),
            "Wrote performance report"
        );
        Ok(())
    }

    /// Mark the end of a frame.
    ///
    /// Every `report_interval_frames` frames this writes a report covering
    /// those frames and returns the encoded message.
    pub fn end_frame(&self) -> Result<Option<Vec<u8>>> {
        let frames = self.frames_since_report.fetch_add(1, Ordering::Relaxed) + 1;
        if frames < self.report_interval_frames {
            return Ok(None);
        }
        self.frames_since_report.store(0, Ordering::Relaxed);

        let mut buffer = Vec::new();
        self.write_report(&mut buffer, frames)?;
        Ok(Some(buffer))
    }

    /// Drop all memory usage records.
    pub fn clear_memory_usages(&self) {
        self.registry.lock().clear_memory_usages();
    }

    /// Drop every accumulator.
    pub fn reset(&self) {
        let mut registry = self.registry.lock();
        tracing::debug!(accumulators = registry.len(), "Resetting performance monitor");
        registry.reset();
        drop(registry);
        self.frames_since_report.store(0, Ordering::Relaxed);
    }

    /// Elapsed time of an interval event since the last report.
    #[must_use]
    pub fn interval_elapsed(&self, component: &str, event: &str) -> Option<Duration> {
        self.registry
            .lock()
            .interval(component, event)
            .map(|watch| watch.elapsed())
    }

    /// Total elapsed time of an increment event.
    #[must_use]
    pub fn increment_elapsed(&self, component: &str, event: &str) -> Option<Duration> {
        self.registry
            .lock()
            .increment(component, event)
            .map(|watch| watch.elapsed())
    }

    /// Occurrences of an event since the last report.
    #[must_use]
    pub fn count(&self, component: &str, event: &str) -> Option<u64> {
        self.registry.lock().count(component, event)
    }

    /// Accumulated memory usage of an event.
    #[must_use]
    pub fn memory_usage(&self, component: &str, event: &str) -> Option<MemoryUsage> {
        self.registry.lock().memory_usage(component, event)
    }
}
