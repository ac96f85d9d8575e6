//! Benchmarks for the execution core.
//!
//! Benchmarks cover:
//! - Enqueue cost on the producer thread
//! - Rendering a record with arguments and an error chain
//! - Submitting one-off tasks to the scheduler

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use specter_exec::config::{PipelineConfig, SchedulerConfig};
use specter_exec::core::format::render;
use specter_exec::core::{CapturedError, Level, LogArg, LogPipeline, LogRecord, TaskScheduler};
use specter_exec::infra::RetainedConsole;
use specter_exec::util::system_clock;

// ============================================================================
// Pipeline
// ============================================================================

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_enqueue");
    for capacity in [64usize, 4096] {
        let console = Arc::new(RetainedConsole::new(1_000));
        let pipeline = LogPipeline::start(
            PipelineConfig::new()
                .with_file_enabled(false)
                .with_queue_capacity(capacity),
            system_clock(),
            Some(console),
        )
        .expect("pipeline starts");

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                black_box(pipeline.info("lookup {} took {}ms", vec![LogArg::new("alice"), LogArg::new(42)]))
            });
        });

        pipeline.flush(Duration::from_secs(10));
        pipeline.shutdown();
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(8, 30, 0))
        .expect("valid timestamp");
    let error = CapturedError::new("HttpError", "status 503")
        .caused_by(CapturedError::new("IoError", "connection reset"));
    let record = LogRecord::new(
        Level::Error,
        "breach lookup for {} failed after {} attempts",
        vec![LogArg::new("alice@example.com"), LogArg::new(3)],
        Some(error),
        ts,
    );

    c.bench_function("render_with_chain", |b| b.iter(|| black_box(render(&record))));
}

// ============================================================================
// Scheduler
// ============================================================================

fn bench_schedule(c: &mut Criterion) {
    let pipeline = LogPipeline::start(
        PipelineConfig::new().with_file_enabled(false).with_console_enabled(false),
        system_clock(),
        None,
    )
    .expect("pipeline starts");
    let scheduler = TaskScheduler::start(&SchedulerConfig::new().with_worker_count(4), Arc::clone(&pipeline))
        .expect("scheduler starts");

    c.bench_function("schedule_now", |b| {
        b.iter(|| black_box(scheduler.schedule_now(|| ()).expect("accepted")));
    });

    scheduler.shutdown();
    scheduler.await_termination(Duration::from_secs(10));
    pipeline.shutdown();
}

criterion_group!(benches, bench_enqueue, bench_render, bench_schedule);
criterion_main!(benches);
