use criterion::{Criterion, black_box, criterion_group, criterion_main};
use scoped_webstore::codec::{decode_key, decode_value, encode_key, encode_value};
use scoped_webstore::{
    LmdbOptions, LmdbStorage, MemoryStorage, RangeOptions, Scope, Storage, Store, Value, range,
};
use std::sync::Arc;
use tempfile::TempDir;

fn benchmark_codec(c: &mut Criterion) {
    let key = b"test_key_12345";
    let value = Value::from(&b"test_value"[..]);

    c.bench_function("encode_key", |b| {
        b.iter(|| black_box(encode_key(black_box(key))));
    });

    let encoded_key = encode_key(key);
    c.bench_function("decode_key", |b| {
        b.iter(|| black_box(decode_key(&encoded_key, true).unwrap()));
    });

    c.bench_function("encode_value", |b| {
        b.iter(|| black_box(encode_value(black_box(&value))));
    });

    let encoded_value = encode_value(&value);
    c.bench_function("decode_value", |b| {
        b.iter(|| black_box(decode_value(&encoded_value, true).unwrap()));
    });
}

fn seed(storage: &dyn Storage, scopes: &[Scope], per_scope: usize) {
    for scope in scopes {
        for i in 0..per_scope {
            let key = encode_key(format!("key_{:05}", i).as_bytes());
            storage.set_item(&scope.physical_key(&key), "sv").unwrap();
        }
    }
}

fn benchmark_range_scan(c: &mut Criterion) {
    let scopes: Vec<Scope> = (0..4)
        .map(|i| Scope::named(&format!("tenant_{}", i)).unwrap())
        .collect();
    let range = RangeOptions::all().gte("key_00100").lt("key_00200");

    let memory = MemoryStorage::new();
    seed(&memory, &scopes, 1_000);
    c.bench_function("memory_matching_keys", |b| {
        b.iter(|| black_box(range::matching_keys(&memory, &scopes[1], &range).unwrap()));
    });

    let large = MemoryStorage::new();
    seed(&large, &scopes, 12_500);
    c.bench_function("memory_matching_keys_50k", |b| {
        b.iter(|| black_box(range::matching_keys(&large, &scopes[1], &range).unwrap()));
    });

    let dir = TempDir::new().unwrap();
    let lmdb = LmdbStorage::open(&LmdbOptions::new(dir.path()).map_size(64 * 1024 * 1024)).unwrap();
    seed(&lmdb, &scopes, 250);
    c.bench_function("lmdb_matching_keys", |b| {
        b.iter(|| black_box(range::matching_keys(&lmdb, &scopes[1], &range).unwrap()));
    });
}

fn benchmark_store(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let lmdb = Arc::new(LmdbStorage::open(&LmdbOptions::new(dir.path())).unwrap());
    let store = Store::new("bench", lmdb).unwrap();
    let key = "test_key_12345".into();
    let value = Value::from("test_value");

    c.bench_function("lmdb_store_put", |b| {
        b.iter(|| store.put(&key, &value).unwrap());
    });

    c.bench_function("lmdb_store_get", |b| {
        b.iter(|| black_box(store.get(&key, &Default::default()).unwrap()));
    });
}

criterion_group!(benches, benchmark_codec, benchmark_range_scan, benchmark_store);
criterion_main!(benches);
