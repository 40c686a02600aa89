use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tilestitch_core::PixelRegion;
use tilestitch_pairwise::{calculate_pcm, get_shift, ShiftSearch};

/// Uniform noise; `b` is `a` displaced by `offset` so the PCM has a real peak.
fn shifted_noise(dims: &[usize], offset: &[usize]) -> (PixelRegion, PixelRegion) {
    let big: Vec<usize> = dims.iter().zip(offset).map(|(d, o)| d + o).collect();
    let mut rng = StdRng::seed_from_u64(42);
    let n: usize = big.iter().product();
    let field: Vec<f32> = (0..n).map(|_| rng.random::<f32>()).collect();
    let source = PixelRegion::new(big, field).expect("valid dims");
    let shift: Vec<i64> = offset.iter().map(|&o| o as i64).collect();
    let a = source.crop(&vec![0; dims.len()], dims).expect("crop");
    let b = source.crop(&shift, dims).expect("crop");
    (a, b)
}

fn bench_pcm(c: &mut Criterion) {
    let mut group = c.benchmark_group("calculate_pcm");
    for dims in [vec![128usize, 128], vec![256, 192], vec![64, 64, 32]] {
        let (a, b) = shifted_noise(&dims, &vec![5; dims.len()]);
        let label = format!("{dims:?}");
        group.bench_with_input(BenchmarkId::from_parameter(label), &(a, b), |bench, (a, b)| {
            bench.iter(|| calculate_pcm(black_box(a), black_box(b), 0.1).expect("pcm"))
        });
    }
    group.finish();
}

fn bench_get_shift(c: &mut Criterion) {
    let dims = [256usize, 192];
    let (a, b) = shifted_noise(&dims, &[17, 9]);
    let pcm = calculate_pcm(&a, &b, 0.1).expect("pcm");
    let search = ShiftSearch::default();
    c.bench_function("get_shift 256x192", |bench| {
        bench.iter(|| get_shift(black_box(&pcm), &a, &b, &search))
    });
}

criterion_group!(benches, bench_pcm, bench_get_shift);
criterion_main!(benches);
