//! Planner Benchmarks
//!
//! Measures a full planning run over synthetic timelines and clip pools.
//!
//! # Running Benchmarks
//! ```bash
//! cargo bench --package beatcut-planner --bench planner
//! ```

use beatcut_models::BeatTimeline;
use beatcut_planner::{ClipPool, ClipSource, PlannerConfig, SegmentPlanner};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Evenly spaced beats at 120 BPM.
fn synthetic_timeline(beats: usize) -> BeatTimeline {
    BeatTimeline::from_unsorted((0..beats).map(|i| i as f64 * 0.5).collect())
}

/// Pool with a long clip and a timelapse every ten clips.
fn synthetic_pool(clips: usize) -> ClipPool {
    let sources = (1..=clips)
        .map(|i| {
            let name = format!("IMG_{:04}.MOV", i);
            ClipSource::new(name.clone(), format!("/clips/{}", name), 2.0 + (i % 9) as f64)
        })
        .collect();
    let long: Vec<String> = (1..=clips)
        .step_by(10)
        .map(|i| format!("IMG_{:04}.MOV", i))
        .collect();
    let timelapse: Vec<String> = (6..=clips)
        .step_by(10)
        .map(|i| format!("IMG_{:04}.MOV", i))
        .collect();
    ClipPool::classify(sources, &long, &timelapse)
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for beats in [64usize, 512, 4096] {
        let timeline = synthetic_timeline(beats);
        let pool = synthetic_pool(beats);

        group.throughput(Throughput::Elements(beats as u64));
        group.bench_with_input(BenchmarkId::new("beats", beats), &pool, |b, pool| {
            b.iter(|| {
                let mut pool = pool.clone();
                let planner = SegmentPlanner::new(
                    &timeline,
                    PlannerConfig::default(),
                    StdRng::seed_from_u64(7),
                );
                black_box(planner.plan(&mut pool))
            })
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for clips in [100usize, 1000] {
        group.bench_with_input(BenchmarkId::new("clips", clips), &clips, |b, &clips| {
            b.iter(|| black_box(synthetic_pool(clips)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_plan, bench_classify);
criterion_main!(benches);
