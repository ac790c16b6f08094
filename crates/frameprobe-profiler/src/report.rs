//! Per-interval report snapshots.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::clock::duration_ms;
use crate::memory::MemoryUsage;
use crate::registry::EventRegistry;

/// Scale applied to interval durations and counts for `num_frames` frames.
///
/// Zero frames means the raw values are reported.
#[inline]
#[must_use]
pub fn scale_for(num_frames: u32) -> f64 {
    if num_frames == 0 {
        1.0
    } else {
        1.0 / f64::from(num_frames)
    }
}

/// One reporting interval's worth of measurements.
///
/// Produced by the monitor when writing a report and reconstructed by
/// [`read_report`](crate::read_report) on the receiving side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Whether the sender had monitoring enabled. All sections are empty when false.
    pub performance_monitoring_enabled: bool,
    /// Interval durations in milliseconds per frame.
    pub interval_durations: Vec<(String, f64)>,
    /// Cumulative increment durations in milliseconds.
    pub increment_durations: Vec<(String, f64)>,
    /// Occurrence counts per frame.
    pub counts: Vec<(String, i32)>,
    /// Cumulative memory deltas.
    pub memory_usages: Vec<(String, MemoryUsage)>,
}

impl FrameReport {
    /// Report sent while monitoring is disabled.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            performance_monitoring_enabled: false,
            interval_durations: Vec::new(),
            increment_durations: Vec::new(),
            counts: Vec::new(),
            memory_usages: Vec::new(),
        }
    }

    /// Snapshot the registry for `num_frames` frames.
    ///
    /// Interval stopwatches are reset and counts zeroed; increment stopwatches
    /// and memory usages are left untouched. Running stopwatches are measured
    /// up to `now` and keep running.
    pub(crate) fn collect(registry: &mut EventRegistry, num_frames: u32, now: Instant) -> Self {
        let scale = scale_for(num_frames);

        let interval_durations = registry
            .intervals_mut()
            .map(|(key, watch)| (key.label(), duration_ms(watch.take_at(now)) * scale))
            .collect();

        let increment_durations = registry
            .increments()
            .map(|(key, watch)| (key.label(), duration_ms(watch.elapsed_at(now))))
            .collect();

        let counts = registry
            .counts_mut()
            .map(|(key, count)| {
                // Float-to-int casts saturate, so huge counts clamp to i32::MAX.
                #[allow(clippy::cast_possible_truncation)]
                let per_frame = (*count as f64 * scale).floor() as i32;
                *count = 0;
                (key.label(), per_frame)
            })
            .collect();

        let memory_usages = registry
            .memory_usages()
            .map(|(key, usage)| (key.label(), *usage))
            .collect();

        Self {
            performance_monitoring_enabled: true,
            interval_durations,
            increment_durations,
            counts,
            memory_usages,
        }
    }

    /// Interval duration for a label, in milliseconds per frame.
    #[must_use]
    pub fn interval_duration(&self, label: &str) -> Option<f64> {
        find(&self.interval_durations, label).copied()
    }

    /// Increment duration for a label, in milliseconds.
    #[must_use]
    pub fn increment_duration(&self, label: &str) -> Option<f64> {
        find(&self.increment_durations, label).copied()
    }

    /// Per-frame count for a label.
    #[must_use]
    pub fn count(&self, label: &str) -> Option<i32> {
        find(&self.counts, label).copied()
    }

    /// Memory usage for a label.
    #[must_use]
    pub fn memory_usage(&self, label: &str) -> Option<MemoryUsage> {
        find(&self.memory_usages, label).copied()
    }

    /// Total number of entries across all sections.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.interval_durations.len()
            + self.increment_durations.len()
            + self.counts.len()
            + self.memory_usages.len()
    }
}

fn find<'a, T>(entries: &'a [(String, T)], label: &str) -> Option<&'a T> {
    entries
        .iter()
        .find(|(entry_label, _)| entry_label == label)
        .map(|(_, value)| value)
}
