use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hv_core::{AllowlistStore, Guard};

// The capture pipeline gives the whole check ~10ms; these paths should be
// orders of magnitude under that.
fn bench_decision(c: &mut Criterion) {
    let guard = Guard::new(Arc::new(AllowlistStore::from_bundled()));

    c.bench_function("exact_hit", |b| {
        b.iter(|| guard.is_url_protected(black_box("https://988lifeline.org/chat")))
    });

    c.bench_function("fuzzy_hit", |b| {
        b.iter(|| guard.is_url_protected(black_box("https://988lifelne.org/")))
    });

    c.bench_function("miss", |b| {
        b.iter(|| guard.is_url_protected(black_box("https://news.ycombinator.com/item?id=1")))
    });

    c.bench_function("non_web", |b| {
        b.iter(|| guard.is_url_protected(black_box("chrome://newtab")))
    });
}

criterion_group!(benches, bench_decision);
criterion_main!(benches);
