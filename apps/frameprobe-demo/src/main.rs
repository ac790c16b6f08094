//! Frameprobe demo.
//!
//! Runs a simulated frame loop instrumented with the profiler, then decodes
//! each report as a remote observer would and logs it.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p frameprobe-demo
//! cargo run -p frameprobe-demo -- --frames 600 --interval 60
//! ```

use std::time::Duration;

use frameprobe_profiler::{
    profile_count, profile_increment, profile_interval, profile_memory, read_report,
    CountingAllocator, FrameReport, PerformanceMonitor,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static ALLOCATOR: CountingAllocator = CountingAllocator::new();

/// Default number of frames to simulate.
const DEFAULT_FRAMES: u32 = 240;

/// Default number of frames per report.
const DEFAULT_INTERVAL: u32 = 60;

/// Simulated frame budget.
const FRAME_TIME: Duration = Duration::from_millis(2);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let (frames, interval) = parse_args();
    info!(frames, interval, "Starting frameprobe demo");

    let monitor = PerformanceMonitor::builder()
        .enabled(true)
        .report_interval_frames(interval)
        .memory_introspector(&ALLOCATOR)
        .build();

    let mut retained: Vec<Vec<u8>> = Vec::new();
    for frame in 0..frames {
        if let Some(enabled) = switch_at(frame, frames, interval) {
            monitor.set_diagnostic_mode(enabled);
        }

        run_frame(&monitor, frame, &mut retained);

        if let Some(message) = monitor.end_frame()? {
            let report = read_report(&mut message.as_slice())?;
            log_report(frame, message.len(), &report);
        }
    }

    info!(retained = retained.len(), "Demo finished");
    Ok(())
}

/// Turns reporting off at the halfway frame and back on one interval later.
fn switch_at(frame: u32, frames: u32, interval: u32) -> Option<bool> {
    let off = frames / 2;
    if frame == off {
        Some(false)
    } else if frame == off.saturating_add(interval) {
        Some(true)
    } else {
        None
    }
}

fn run_frame(monitor: &PerformanceMonitor, frame: u32, retained: &mut Vec<Vec<u8>>) {
    profile_increment!(monitor, "Frame", "Total");

    {
        profile_interval!(monitor, "Frame", "Update");
        std::thread::sleep(FRAME_TIME / 4);
    }

    {
        profile_interval!(monitor, "Render", "Draw");
        for _ in 0..(frame % 5 + 1) {
            profile_count!(monitor, "Render", "DrawCall");
        }
        std::thread::sleep(FRAME_TIME / 2);
    }

    if frame % 10 == 0 {
        profile_memory!(monitor, "Assets", "Load");
        retained.push(vec![0u8; 16 * 1024]);
    }
}

fn log_report(frame: u32, bytes: usize, report: &FrameReport) {
    if !report.performance_monitoring_enabled {
        info!(frame, bytes, "Report: monitoring disabled");
        return;
    }

    info!(frame, bytes, entries = report.entry_count(), "Report");
    for (label, ms) in &report.interval_durations {
        info!("  {label:<16} {ms:>8.3} ms/frame");
    }
    for (label, ms) in &report.increment_durations {
        info!("  {label:<16} {ms:>8.1} ms total");
    }
    for (label, count) in &report.counts {
        info!("  {label:<16} {count:>8} /frame");
    }
    for (label, usage) in &report.memory_usages {
        info!(
            "  {label:<16} allocated {:+} reserved {:+} unused {:+}",
            usage.allocated_delta, usage.reserved_delta, usage.unused_reserved_delta
        );
    }
}

fn parse_args() -> (u32, u32) {
    let args: Vec<String> = std::env::args().collect();
    let mut frames = DEFAULT_FRAMES;
    let mut interval = DEFAULT_INTERVAL;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--frames" | "-f" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    frames = value;
                    i += 1;
                }
            }
            "--interval" | "-i" => {
                if let Some(value) = args.get(i + 1).and_then(|v| v.parse().ok()) {
                    interval = value;
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    (frames, interval)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_schedule() {
        assert_eq!(switch_at(120, 240, 60), Some(false));
        assert_eq!(switch_at(180, 240, 60), Some(true));
        assert_eq!(switch_at(121, 240, 60), None);
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        assert_eq!(switch_at(5, 10, u32::MAX), Some(false));
        assert_eq!(switch_at(u32::MAX, 10, u32::MAX), Some(true));
        assert_eq!(switch_at(6, 10, u32::MAX), None);
    }
}
