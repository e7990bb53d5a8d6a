//! Plaintext reference vs encrypted division on the toy parameter set.

use ckks_division::{
    divide, reference_divide, Bounds, Ckks, CkksParams, LeveledScheme, LevelTracker,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn operands(slots: usize) -> (Vec<f64>, Vec<f64>) {
    let x = vec![100.0; slots];
    // 250..=10000, repeated across the slots
    let y = (0..slots).map(|i| ((i % 40) + 1) as f64 * 250.0).collect();
    (x, y)
}

fn bench_reference(c: &mut Criterion) {
    let bounds = Bounds::new(0.0, 10000.0).unwrap();
    let (x, y) = operands(8192);
    let mut group = c.benchmark_group("reference_divide");
    for d in [1, 3, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(d), &d, |b, &d| {
            b.iter(|| reference_divide(black_box(&x), black_box(&y), &bounds, d).unwrap())
        });
    }
    group.finish();
}

fn bench_encrypted(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0);
    let ckks = Ckks::generate_keys(CkksParams::toy(), &mut rng).unwrap();
    let bounds = Bounds::new(0.0, 10000.0).unwrap();
    let (x, y) = operands(ckks.slot_count());

    let mut group = c.benchmark_group("encrypted_divide");
    group.sample_size(10);
    for d in [1, 3, 5] {
        group.bench_with_input(BenchmarkId::from_parameter(d), &d, |b, &d| {
            b.iter(|| divide(&ckks, black_box(&x), black_box(&y), bounds, d, &mut rng).unwrap())
        });
    }
    group.finish();

    let pt = ckks.encode(&y, ckks.nominal_scale()).unwrap();
    let ct = ckks.encrypt(&pt, &mut rng).unwrap();
    let tracker = LevelTracker::new(&ckks);
    c.bench_function("tracked_square", |b| {
        b.iter(|| tracker.square(black_box(&ct)).unwrap())
    });
}

criterion_group!(benches, bench_reference, bench_encrypted);
criterion_main!(benches);
