use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use lumen_core::{CalibrationEngine, EngineConfig, FilterKind};
use lumen_traits::PanelSnapshot;

// Synthetic daylight: slow sine with additive white noise.
fn synth_trace(n: usize, noise_amp: f64, seed: u32) -> Vec<f64> {
    let mut state = seed.max(1);
    let mut next_unit = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        f64::from(x) / (f64::from(u32::MAX) + 1.0)
    };
    (0..n)
        .map(|i| {
            let t = i as f64 / 200.0;
            800.0 + 400.0 * t.sin() + (next_unit() * 2.0 - 1.0) * noise_amp
        })
        .collect()
}

// Engine with a full calibration window so each sample pays the worst-case
// estimator cost.
fn warmed_engine(filter: FilterKind, trace: &[f64]) -> CalibrationEngine {
    let mut engine = CalibrationEngine::new(EngineConfig {
        filter,
        ..EngineConfig::default()
    });
    for &lux in trace {
        engine.process_sample(lux);
    }
    engine
}

pub fn bench_sample(c: &mut Criterion) {
    let trace = synth_trace(2_000, 25.0, 0xC0FFEE);
    let mut group = c.benchmark_group("process_sample");
    for (name, kind) in [
        ("sma", FilterKind::SimpleMovingAverage { window: 11 }),
        ("ema", FilterKind::ExponentialMovingAverage { alpha: 0.1 }),
        ("savgol", FilterKind::SavitzkyGolay { window: 11, poly_order: 3 }),
    ] {
        group.bench_function(name, |b| {
            b.iter_batched(
                || warmed_engine(kind, &trace[..600]),
                |mut engine| {
                    for &lux in &trace[600..700] {
                        black_box(engine.process_sample(black_box(lux)));
                    }
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

pub fn bench_idle_tick(c: &mut Criterion) {
    let trace = synth_trace(600, 25.0, 7);
    let panel = PanelSnapshot::default();
    c.bench_function("tick_between_samples", |b| {
        let mut engine = warmed_engine(FilterKind::default(), &trace);
        engine.tick(0, panel, || Some(800.0));
        b.iter(|| black_box(engine.tick(black_box(10), panel, || Some(800.0))));
    });
}

criterion_group!(benches, bench_sample, bench_idle_tick);
criterion_main!(benches);
