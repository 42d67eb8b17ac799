//! Performance benchmarks for property reads and registry lookups.
//!
//! Run with: `cargo bench -p dynaprop`

use std::sync::Arc;

use divan::Bencher;
use dynaprop::{MemorySource, PropertyRegistry};

fn main() {
    divan::main();
}

fn populated(count: usize) -> (PropertyRegistry, Arc<MemorySource>) {
    let source = Arc::new(MemorySource::with_values(
        "bench",
        (0..count).map(|i| (format!("key.{i}"), i.to_string())),
    ));
    let registry = PropertyRegistry::builder().source(source.clone()).build();

    for i in 0..count {
        registry.get_or_create(&format!("key.{i}"));
    }

    (registry, source)
}

// ============================================================================
// Typed Reads
// ============================================================================

#[divan::bench]
fn cached_integer_read(bencher: Bencher) {
    let (registry, _source) = populated(1);
    let prop = registry.typed("key.0", 0_u64);
    let _ = prop.value();

    bencher.bench_local(|| prop.value());
}

#[divan::bench]
fn cached_string_read(bencher: Bencher) {
    let (registry, _source) = populated(1);
    let prop = registry.string("key.0", None);

    bencher.bench_local(|| prop.value());
}

#[divan::bench]
fn read_after_change(bencher: Bencher) {
    let (registry, source) = populated(1);
    let prop = registry.typed("key.0", 0_u64);
    let mut n = 0_u64;

    bencher.bench_local(|| {
        n += 1;
        let _ = source.set("key.0", &n.to_string());
        prop.value()
    });
}

// ============================================================================
// Registry Lookups
// ============================================================================

#[divan::bench(args = [10, 1_000, 10_000])]
fn get_or_create_hit(bencher: Bencher, count: usize) {
    let (registry, _source) = populated(count);
    let name = format!("key.{}", count / 2);

    bencher.bench_local(|| registry.get_or_create(&name));
}

#[divan::bench(args = [10, 1_000])]
fn refresh_all(bencher: Bencher, count: usize) {
    let (registry, _source) = populated(count);

    bencher.bench_local(|| registry.refresh_all());
}
