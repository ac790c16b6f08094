//! Monitor configuration.

use serde::{Deserialize, Serialize};

/// Default number of frames between reports.
pub const DEFAULT_REPORT_INTERVAL_FRAMES: u32 = 60;

/// Settings for a [`PerformanceMonitor`](crate::PerformanceMonitor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Initial state of the performance reporting switch.
    pub enabled: bool,
    /// Frames per report when driven through `end_frame`. Zero reports every frame.
    pub report_interval_frames: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            report_interval_frames: DEFAULT_REPORT_INTERVAL_FRAMES,
        }
    }
}

impl MonitorConfig {
    /// Config with reporting switched on.
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}
