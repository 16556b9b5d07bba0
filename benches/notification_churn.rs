// SPDX-License-Identifier: MPL-2.0
//! Benchmarks for notification lifecycle operations.
//!
//! Measures the performance of:
//! - Opening and closing a burst of notifications
//! - Coalescing repeated notifications by key
//! - Snapshot fan-out to subscribers

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::Duration;
use toast_manager::config::ManagerConfig;
use toast_manager::notifications::{NotificationConfig, NotificationManager, TimerScheduler};

/// Builds a manager on a runtime that is never driven, so timers never fire.
fn bench_manager(runtime: &tokio::runtime::Runtime) -> NotificationManager<String> {
    NotificationManager::with_scheduler(
        ManagerConfig::default(),
        TimerScheduler::new(runtime.handle().clone()),
    )
    .expect("manager")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

/// Benchmark opening then destroying a burst of timed notifications.
fn bench_open_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification_churn");
    let runtime = runtime();
    let manager = bench_manager(&runtime);

    group.bench_function("open_destroy_32", |b| {
        b.iter(|| {
            for i in 0..32 {
                let id = manager
                    .open(
                        NotificationConfig::info(format!("toast {i}"))
                            .with_duration(Duration::from_secs(5)),
                    )
                    .unwrap();
                black_box(id);
            }
            manager.destroy(None);
        });
    });

    group.finish();
}

/// Benchmark in-place replacement of a keyed notification.
fn bench_keyed_replace(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification_churn");
    let runtime = runtime();
    let manager = bench_manager(&runtime);
    for i in 0..16 {
        manager.info(format!("background {i}")).unwrap();
    }

    group.bench_function("keyed_replace", |b| {
        b.iter(|| {
            let id = manager
                .open(NotificationConfig::success("Saved").with_key("save-status"))
                .unwrap();
            black_box(id);
        });
    });

    group.finish();
}

/// Benchmark snapshot publication with several subscribers attached.
fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("notification_churn");
    let runtime = runtime();
    let manager = bench_manager(&runtime);
    let subscriptions: Vec<_> = (0..8)
        .map(|_| manager.subscribe(|toasts| {
            black_box(toasts.len());
        }))
        .collect();

    group.bench_function("open_close_with_8_subscribers", |b| {
        b.iter(|| {
            let id = manager.warning("Low disk space").unwrap();
            manager.close(id);
        });
    });

    for subscription in &subscriptions {
        subscription.unsubscribe();
    }
    group.finish();
}

criterion_group!(benches, bench_open_close, bench_keyed_replace, bench_fan_out);
criterion_main!(benches);
