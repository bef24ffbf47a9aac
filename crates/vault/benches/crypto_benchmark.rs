use cellar_vault::{CellCipher, KeyMaterial, derive_subkey, unwrap_data_key, wrap_data_key};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;

fn bench_key_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_generation");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("random_key", |b| {
        b.iter(|| black_box(KeyMaterial::random()));
    });

    group.finish();
}

fn bench_subkey_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("subkey_derivation");
    group.measurement_time(Duration::from_secs(30)); // PBKDF2 at 100k iterations is slow

    let master = KeyMaterial::random();
    let cell_ids = ["c1", "billing-prod", "a-rather-longer-cell-identifier-for-testing"];

    for cell_id in cell_ids {
        group.bench_with_input(BenchmarkId::new("pbkdf2_100k", cell_id), &cell_id, |b, cell_id| {
            b.iter(|| black_box(derive_subkey(&master, cell_id)));
        });
    }

    group.finish();
}

fn bench_key_wrapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_wrapping");
    group.measurement_time(Duration::from_secs(10));

    let master = KeyMaterial::random();
    let data_key = KeyMaterial::random();

    group.bench_function("wrap", |b| {
        b.iter(|| black_box(wrap_data_key(&master, "c1", &data_key).unwrap()));
    });

    let wrapped = wrap_data_key(&master, "c1", &data_key).unwrap();

    group.bench_function("unwrap", |b| {
        b.iter(|| black_box(unwrap_data_key(&master, "c1", &wrapped).unwrap()));
    });

    group.finish();
}

fn bench_cell_cipher_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("cell_cipher_operations");
    group.measurement_time(Duration::from_secs(10));

    let master = KeyMaterial::random();
    let cipher = CellCipher::new(&master, "c1");

    // 16B to 64KB
    let data_sizes = [16, 256, 1024, 8192, 65536];

    for &size in &data_sizes {
        let plaintext = vec![0u8; size];

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, plaintext| {
            b.iter(|| black_box(cipher.encrypt(plaintext).unwrap()));
        });

        let wire = cipher.encrypt(&plaintext).unwrap();

        group.bench_with_input(BenchmarkId::new("decrypt", size), &wire, |b, wire| {
            b.iter(|| black_box(cipher.decrypt(wire).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_generation,
    bench_subkey_derivation,
    bench_key_wrapping,
    bench_cell_cipher_operations
);
criterion_main!(benches);
