//! Cost of measurement calls with monitoring switched on and off.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frameprobe_profiler::{MonitorConfig, PerformanceMonitor};

fn bench_scopes(c: &mut Criterion) {
    let mut group = c.benchmark_group("scopes");

    for enabled in [false, true] {
        let monitor = PerformanceMonitor::new(MonitorConfig {
            enabled,
            ..MonitorConfig::default()
        });
        let state = if enabled { "enabled" } else { "disabled" };

        group.bench_function(format!("interval_{state}"), |b| {
            b.iter(|| drop(monitor.begin_interval(black_box("Render"), black_box("Draw"))));
        });

        group.bench_function(format!("count_{state}"), |b| {
            b.iter(|| monitor.increment_count(black_box("Render"), black_box("Draw")));
        });
    }

    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let monitor = PerformanceMonitor::new(MonitorConfig::enabled());
    for i in 0..64 {
        let event = format!("Event{i}");
        drop(monitor.begin_interval("Bench", &event));
        monitor.increment_count("Bench", &event);
    }

    let mut buffer = Vec::with_capacity(8 * 1024);
    c.bench_function("write_report_64_events", |b| {
        b.iter(|| {
            buffer.clear();
            monitor.write_report(&mut buffer, 60).unwrap();
            black_box(buffer.len())
        });
    });
}

criterion_group!(benches, bench_scopes, bench_report);
criterion_main!(benches);
