//! Lightweight runtime performance instrumentation.
//!
//! This crate records per-event elapsed time, occurrence counts and memory
//! usage deltas, and serializes them once per reporting interval into a
//! compact binary message for a remote observer.
//!
//! # Feature Flags
//!
//! - `profiling`: Enable the instrumentation macros. When disabled, all
//!   profiling macros expand to no-ops for zero overhead.
//!
//! # Usage
//!
//! Create a monitor at application startup and pass it to instrumented code:
//!
//! ```ignore
//! use frameprobe_profiler::{MonitorConfig, PerformanceMonitor};
//!
//! let monitor = PerformanceMonitor::new(MonitorConfig::enabled());
//! ```
//!
//! Measure events with scope guards or the profiling macros:
//!
//! ```ignore
//! use frameprobe_profiler::{profile_count, profile_interval};
//!
//! fn draw(monitor: &PerformanceMonitor) {
//!     profile_interval!(monitor, "Render", "Draw");
//!     profile_count!(monitor, "Render", "DrawCalls");
//!     // ... rendering code
//! }
//! ```
//!
//! At the end of each frame, call `end_frame` and ship any finished report:
//!
//! ```ignore
//! if let Some(message) = monitor.end_frame()? {
//!     transport.send(&message);
//! }
//! ```
//!
//! The receiving side decodes messages with [`read_report`].

mod clock;
mod config;
mod error;
mod macros;
mod memory;
mod monitor;
mod protocol;
mod registry;
mod report;

// Re-export public API
pub use clock::duration_ms;
pub use config::{MonitorConfig, DEFAULT_REPORT_INTERVAL_FRAMES};
pub use error::{ReportError, ReportSection, Result};
pub use macros::{MemoryScope, ScopeGuard};
pub use memory::{CountingAllocator, MemoryCounters, MemoryIntrospector, MemoryUsage};
pub use monitor::{PerformanceMonitor, PerformanceMonitorBuilder};
pub use protocol::{read_report, write_report, MAX_FIELD_BYTES};
pub use registry::EventKey;
pub use report::{scale_for, FrameReport};
