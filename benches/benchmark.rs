use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use azely::cache::RecordCache;
use azely::query::parse;
use azely::record::Record;

fn parse_queries(c: &mut Criterion) {
    c.bench_function("parse plain", |b| b.iter(|| parse(black_box("NGC1068"))));
    c.bench_function("parse source and update", |b| {
        b.iter(|| parse(black_box("observatories:ALMA AOS!")))
    });
}

fn cache_hits(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let cache = RecordCache::new(dir.path().join("cache.toml"));
    for i in 0..100 {
        let key = format!("object {i}");
        cache
            .get_or_create("object", &key, true, false, || {
                Ok(Record::from_iter([("name", key.clone()), ("frame", "icrs".to_owned())]))
            })
            .unwrap();
    }
    c.bench_function("cache hit among 100", |b| {
        b.iter(|| {
            cache
                .get_or_create("object", black_box("object 50"), true, false, || unreachable!())
                .unwrap()
        })
    });
}

criterion_group!(benches, parse_queries, cache_hits);
criterion_main!(benches);
