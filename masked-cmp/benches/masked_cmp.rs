use criterion::{Criterion, criterion_group, criterion_main};
use masked_cmp::*;
use rand::{SeedableRng, rngs::StdRng};

fn criterion_benchmark(c: &mut Criterion) {
    for (name, params) in [("kyber768", KYBER_768), ("saber", SABER)] {
        let mut ctx = Context::new(params, StdRng::seed_from_u64(0), Verification::Disabled).unwrap();

        // Preparation
        c.bench_function(&format!("{name}/prepare"), |b| {
            b.iter(|| ctx.prepare(Scenario::NoDecryptionFailure))
        });

        // Masked comparison
        ctx.prepare(Scenario::DecryptionFailure);
        c.bench_function(&format!("{name}/compare"), |b| b.iter(|| ctx.compare()));

        // Masking alone
        let q = Modulus::new(params.q).unwrap();
        let mut source = ShareSource::new(StdRng::seed_from_u64(1));
        let x = vec![1u32; params.b.ncoeffs];
        let mut shared = SharedVector::zeroed(params.b.ncoeffs, params.nshares).unwrap();
        c.bench_function(&format!("{name}/mask"), |b| {
            b.iter(|| mask(&mut source, &q, &x, &mut shared, Verification::Disabled))
        });
    }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
