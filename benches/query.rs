use benkyou_rs::query::{self, QueryParams, SortDirection};
use benkyou_rs::{GrammarEntry, GrammarIndex};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Once;

fn ensure_loaded() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        // Trigger the lazy catalog parse once so subsequent benches only
        // measure steady-state query performance.
        let _ = GrammarIndex::entries("N5").len();
    });
}

fn synthetic_catalog(size: u32) -> Vec<GrammarEntry> {
    (1..=size)
        .map(|n| GrammarEntry {
            id: format!("N3-{n}"),
            pattern: format!("pattern {n}"),
            meaning: if n % 7 == 0 {
                "conditional".to_string()
            } else {
                "plain".to_string()
            },
            explanation: String::new(),
            examples: Vec::new(),
        })
        .collect()
}

fn bench_bundled_catalog(c: &mut Criterion) {
    ensure_loaded();
    let entries = GrammarIndex::entries("N5");
    let params = QueryParams {
        sort: SortDirection::Desc,
        from: Some(2),
        to: Some(6),
        ..QueryParams::default()
    };
    c.bench_function("apply::bundled_n5", |b| {
        b.iter(|| {
            let filtered = query::apply(entries, &params);
            black_box(filtered.len());
        });
    });
}

fn bench_synthetic_catalogs(c: &mut Criterion) {
    for size in [100u32, 1_000, 10_000] {
        let entries = synthetic_catalog(size);
        let params = QueryParams {
            search: "conditional".to_string(),
            sort: SortDirection::Desc,
            from: Some(10),
            ..QueryParams::default()
        };
        c.bench_with_input(
            BenchmarkId::new("apply_paginate_locate", size),
            &entries,
            |b, entries| {
                b.iter(|| {
                    let filtered = query::apply(entries, &params);
                    let page = query::paginate(&filtered, params.per, params.page);
                    black_box(page.items.len());
                    if let Some(first) = filtered.first() {
                        let id = first.id.clone();
                        black_box(query::locate(&filtered, &id).is_some());
                    }
                });
            },
        );
    }
}

criterion_group!(benches, bench_bundled_catalog, bench_synthetic_catalogs);
criterion_main!(benches);
