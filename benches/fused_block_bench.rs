use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fused_norm_lib::test_utils::random_tensor;
use fused_norm_lib::{
    block, norm_backward, norm_forward, pipeline_forward, BlockConfig, ChunkTriple, CpuBackend,
    CpuTensor, Weights,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

// (features, length, label); batch is fixed at 8
const SIZES: [(usize, usize, &str); 3] = [(16, 64, "small"), (64, 256, "medium"), (128, 512, "large")];

fn setup(features: usize, length: usize) -> (CpuTensor, CpuTensor, Weights<CpuBackend>) {
    let config = BlockConfig {
        features,
        ..BlockConfig::default()
    };
    let weights = Weights::init(&config, &mut StdRng::seed_from_u64(0)).unwrap();
    let x0 = random_tensor(&[8, features, length], 1).unwrap();
    let x1 = random_tensor(&[8, features, length], 2).unwrap();
    (x0, x1, weights)
}

fn bench_norm(c: &mut Criterion) {
    let mut group = c.benchmark_group("fused_norm");

    for (features, length, name) in SIZES.iter() {
        let shape = [8, *features, *length];
        let chunks = ChunkTriple::<CpuBackend>::new(
            random_tensor(&shape, 3).unwrap(),
            random_tensor(&shape, 4).unwrap(),
            random_tensor(&shape, 5).unwrap(),
        );
        let d_out: CpuTensor = random_tensor(&shape, 6).unwrap();
        let state = norm_forward(chunks.clone()).unwrap();

        group.bench_function(format!("cpu_norm_forward_{}", name), |bencher| {
            bencher.iter(|| {
                black_box(norm_forward(black_box(chunks.clone()))).unwrap();
            });
        });
        group.bench_function(format!("cpu_norm_backward_{}", name), |bencher| {
            bencher.iter(|| {
                black_box(norm_backward(black_box(&state), black_box(&d_out))).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_block(c: &mut Criterion) {
    let mut group = c.benchmark_group("block");
    group.sample_size(20);

    for (features, length, name) in SIZES.iter() {
        let (x0, x1, weights) = setup(*features, *length);
        let y1 = block::forward(&x0, &x1, &weights).unwrap();
        let dy: CpuTensor = random_tensor(y1.shape(), 7).unwrap();
        let trace = pipeline_forward(&x1, &weights).unwrap();

        group.bench_function(format!("cpu_forward_{}", name), |bencher| {
            bencher.iter(|| {
                black_box(block::forward(black_box(&x0), black_box(&x1), &weights)).unwrap();
            });
        });
        group.bench_function(format!("cpu_backward_recompute_{}", name), |bencher| {
            bencher.iter(|| {
                black_box(block::backward(&y1, black_box(&x1), black_box(&dy), &weights)).unwrap();
            });
        });
        group.bench_function(format!("cpu_backward_kept_trace_{}", name), |bencher| {
            bencher.iter(|| {
                black_box(block::backward_with_trace(&y1, &trace, black_box(&dy), &weights))
                    .unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_norm, bench_block);
criterion_main!(benches);
