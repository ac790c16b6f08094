//! Keyed storage for timing, count and memory accumulators.

use std::fmt;

use hashbrown::{Equivalent, HashMap};
use serde::{Deserialize, Serialize};

use crate::clock::Stopwatch;
use crate::memory::MemoryUsage;

/// Identity of an instrumented event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventKey {
    component: String,
    event: String,
}

impl EventKey {
    /// Create a key for `component.event`.
    #[must_use]
    pub fn new(component: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            event: event.into(),
        }
    }

    /// Component name.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Event name.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Dotted `component.event` label used on the wire.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.component, self.event)
    }

    pub(crate) fn borrowed(&self) -> EventKeyRef<'_> {
        EventKeyRef::new(&self.component, &self.event)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.event)
    }
}

/// Borrowed form of [`EventKey`] used for allocation-free lookups.
///
/// Field order and types mirror `EventKey`, so both hash identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EventKeyRef<'a> {
    component: &'a str,
    event: &'a str,
}

impl<'a> EventKeyRef<'a> {
    pub(crate) const fn new(component: &'a str, event: &'a str) -> Self {
        Self { component, event }
    }
}

impl Equivalent<EventKey> for EventKeyRef<'_> {
    fn equivalent(&self, key: &EventKey) -> bool {
        self.component == key.component && self.event == key.event
    }
}

impl From<&EventKeyRef<'_>> for EventKey {
    fn from(key: &EventKeyRef<'_>) -> Self {
        Self::new(key.component, key.event)
    }
}

/// Which stopwatch store a timer scope belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerKind {
    /// Reset after every report.
    Interval,
    /// Never reset by the reporter.
    Increment,
}

/// Accumulators for every instrumented event, one store per kind.
///
/// Lookups create a zeroed accumulator on first use, so each key has at most
/// one accumulator of each kind until it is cleared.
///
/// Clearing a store bumps its epoch. Scopes remember the epoch they started
/// in and must not touch an accumulator created after a clear.
#[derive(Debug, Default)]
pub(crate) struct EventRegistry {
    intervals: HashMap<EventKey, Stopwatch>,
    increments: HashMap<EventKey, Stopwatch>,
    counts: HashMap<EventKey, u64>,
    memory: HashMap<EventKey, MemoryUsage>,
    timer_epoch: u64,
    memory_epoch: u64,
}

#[inline]
fn get_or_create<'m, V: Default>(
    store: &'m mut HashMap<EventKey, V>,
    key: EventKeyRef<'_>,
) -> &'m mut V {
    store.entry_ref(&key).or_default()
}

impl EventRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) const fn timer_epoch(&self) -> u64 {
        self.timer_epoch
    }

    pub(crate) const fn memory_epoch(&self) -> u64 {
        self.memory_epoch
    }

    pub(crate) fn timer_mut(&mut self, kind: TimerKind, key: EventKeyRef<'_>) -> &mut Stopwatch {
        match kind {
            TimerKind::Interval => get_or_create(&mut self.intervals, key),
            TimerKind::Increment => get_or_create(&mut self.increments, key),
        }
    }

    pub(crate) fn existing_timer_mut(
        &mut self,
        kind: TimerKind,
        key: EventKeyRef<'_>,
    ) -> Option<&mut Stopwatch> {
        match kind {
            TimerKind::Interval => self.intervals.get_mut(&key),
            TimerKind::Increment => self.increments.get_mut(&key),
        }
    }

    pub(crate) fn increment_count(&mut self, key: EventKeyRef<'_>) {
        let count = get_or_create(&mut self.counts, key);
        *count = count.saturating_add(1);
    }

    pub(crate) fn memory_mut(&mut self, key: EventKeyRef<'_>) -> &mut MemoryUsage {
        get_or_create(&mut self.memory, key)
    }

    pub(crate) fn existing_memory_mut(&mut self, key: EventKeyRef<'_>) -> Option<&mut MemoryUsage> {
        self.memory.get_mut(&key)
    }

    pub(crate) fn intervals_mut(&mut self) -> impl Iterator<Item = (&EventKey, &mut Stopwatch)> {
        self.intervals.iter_mut()
    }

    pub(crate) fn increments(&self) -> impl Iterator<Item = (&EventKey, &Stopwatch)> {
        self.increments.iter()
    }

    pub(crate) fn counts_mut(&mut self) -> impl Iterator<Item = (&EventKey, &mut u64)> {
        self.counts.iter_mut()
    }

    pub(crate) fn memory_usages(&self) -> impl Iterator<Item = (&EventKey, &MemoryUsage)> {
        self.memory.iter()
    }

    /// Interval stopwatch for a key, if one was ever created.
    #[must_use]
    pub fn interval(&self, component: &str, event: &str) -> Option<&Stopwatch> {
        self.intervals.get(&EventKeyRef::new(component, event))
    }

    /// Increment stopwatch for a key, if one was ever created.
    #[must_use]
    pub fn increment(&self, component: &str, event: &str) -> Option<&Stopwatch> {
        self.increments.get(&EventKeyRef::new(component, event))
    }

    /// Current count for a key, if it was ever incremented.
    #[must_use]
    pub fn count(&self, component: &str, event: &str) -> Option<u64> {
        self.counts.get(&EventKeyRef::new(component, event)).copied()
    }

    /// Accumulated memory usage for a key, if it was ever sampled.
    #[must_use]
    pub fn memory_usage(&self, component: &str, event: &str) -> Option<MemoryUsage> {
        self.memory.get(&EventKeyRef::new(component, event)).copied()
    }

    /// Number of distinct keys across all four stores, counted per store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len() + self.increments.len() + self.counts.len() + self.memory.len()
    }

    /// Whether no accumulator has been created yet.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all memory usage records.
    pub fn clear_memory_usages(&mut self) {
        self.memory.clear();
        self.memory_epoch = self.memory_epoch.wrapping_add(1);
    }

    /// Drop every accumulator.
    pub fn reset(&mut self) {
        self.intervals.clear();
        self.increments.clear();
        self.counts.clear();
        self.timer_epoch = self.timer_epoch.wrapping_add(1);
        self.clear_memory_usages();
    }
}
