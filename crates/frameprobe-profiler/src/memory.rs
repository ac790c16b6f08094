//! Memory introspection and memory-usage accumulators.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// Allocator totals read at a point in time, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCounters {
    /// Bytes currently allocated.
    pub allocated: i64,
    /// Bytes reserved by the allocator.
    pub reserved: i64,
    /// Reserved bytes not currently allocated.
    pub unused_reserved: i64,
}

impl MemoryCounters {
    /// Difference between these counters and an earlier baseline.
    #[must_use]
    pub const fn delta_since(&self, baseline: &Self) -> MemoryUsage {
        MemoryUsage {
            allocated_delta: self.allocated.saturating_sub(baseline.allocated),
            reserved_delta: self.reserved.saturating_sub(baseline.reserved),
            unused_reserved_delta: self.unused_reserved.saturating_sub(baseline.unused_reserved),
        }
    }
}

/// Accumulated memory deltas for one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Change in allocated bytes.
    pub allocated_delta: i64,
    /// Change in reserved bytes.
    pub reserved_delta: i64,
    /// Change in unused reserved bytes.
    pub unused_reserved_delta: i64,
}

impl MemoryUsage {
    /// Create a usage record from explicit deltas.
    #[must_use]
    pub const fn new(allocated_delta: i64, reserved_delta: i64, unused_reserved_delta: i64) -> Self {
        Self {
            allocated_delta,
            reserved_delta,
            unused_reserved_delta,
        }
    }

    /// Add another delta into this record.
    pub fn accumulate(&mut self, delta: Self) {
        self.allocated_delta = self.allocated_delta.saturating_add(delta.allocated_delta);
        self.reserved_delta = self.reserved_delta.saturating_add(delta.reserved_delta);
        self.unused_reserved_delta = self
            .unused_reserved_delta
            .saturating_add(delta.unused_reserved_delta);
    }
}

/// Source of allocator totals for memory sampling.
pub trait MemoryIntrospector: Send + Sync {
    /// Whether counters can currently be read.
    fn is_active(&self) -> bool;

    /// Read the current counters, or `None` if introspection is unavailable.
    fn counters(&self) -> Option<MemoryCounters>;
}

impl<T: MemoryIntrospector + ?Sized> MemoryIntrospector for &T {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn counters(&self) -> Option<MemoryCounters> {
        (**self).counters()
    }
}

/// Global allocator wrapper that counts live and peak heap bytes.
///
/// Install it with `#[global_allocator]` and hand a `&'static` reference to
/// the monitor builder:
///
/// ```ignore
/// use frameprobe_profiler::CountingAllocator;
///
/// #[global_allocator]
/// static ALLOCATOR: CountingAllocator = CountingAllocator::new();
///
/// let monitor = frameprobe_profiler::PerformanceMonitor::builder()
///     .memory_introspector(&ALLOCATOR)
///     .build();
/// ```
///
/// Reserved bytes are the high-water mark of live bytes, so unused reserved
/// bytes are the headroom between the peak and the current allocation.
pub struct CountingAllocator {
    allocated: AtomicI64,
    peak: AtomicI64,
    installed: AtomicBool,
    enabled: AtomicBool,
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl CountingAllocator {
    /// Create an allocator with zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allocated: AtomicI64::new(0),
            peak: AtomicI64::new(0),
            installed: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
        }
    }

    /// Turn introspection on or off. Counting continues either way.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Whether this allocator has served at least one allocation.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Relaxed)
    }

    /// Read the counters regardless of the enabled flag.
    #[must_use]
    pub fn snapshot(&self) -> MemoryCounters {
        let allocated = self.allocated.load(Ordering::Relaxed);
        let reserved = self.peak.load(Ordering::Relaxed).max(allocated);
        MemoryCounters {
            allocated,
            reserved,
            unused_reserved: reserved - allocated,
        }
    }

    #[inline]
    fn record_alloc(&self, size: usize) {
        if !self.installed.load(Ordering::Relaxed) {
            self.installed.store(true, Ordering::Relaxed);
        }
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let live = self.allocated.fetch_add(size, Ordering::Relaxed).saturating_add(size);
        self.peak.fetch_max(live, Ordering::Relaxed);
    }

    #[inline]
    fn record_free(&self, size: usize) {
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        self.allocated.fetch_sub(size, Ordering::Relaxed);
    }
}

// SAFETY: every call is forwarded to `System` unchanged; the wrapper only
// updates atomic counters and never allocates itself.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            self.record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        self.record_free(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            self.record_free(layout.size());
            self.record_alloc(new_size);
        }
        new_ptr
    }
}

impl MemoryIntrospector for CountingAllocator {
    fn is_active(&self) -> bool {
        self.is_installed() && self.enabled.load(Ordering::Relaxed)
    }

    fn counters(&self) -> Option<MemoryCounters> {
        self.is_active().then(|| self.snapshot())
    }
}
