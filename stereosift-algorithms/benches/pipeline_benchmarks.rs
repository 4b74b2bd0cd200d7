use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use stereosift_algorithms::{filter_outliers, process_cloud, project};
use stereosift_core::{synthetic, PipelineConfig};

fn bench_outlier_filter(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let cloud = synthetic::cylinder(&mut rng, 0.8, 2.0, 10_000);

    c.bench_function("filter_outliers_10k", |b| {
        b.iter(|| filter_outliers(&cloud, 2.0).unwrap())
    });
}

fn bench_projection(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(2);
    let cloud = synthetic::cylinder(&mut rng, 0.8, 2.0, 10_000);
    let config = PipelineConfig::default();

    c.bench_function("project_10k_256", |b| {
        b.iter(|| project(&cloud, &config).unwrap())
    });
}

fn bench_full_pipeline(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let cloud = synthetic::cylinder(&mut rng, 0.8, 2.0, 10_000);
    let config = PipelineConfig::default();

    c.bench_function("process_cloud_10k_cylinder", |b| {
        b.iter(|| process_cloud(&cloud, &config).unwrap())
    });
}

criterion_group!(
    benches,
    bench_outlier_filter,
    bench_projection,
    bench_full_pipeline
);
criterion_main!(benches);
