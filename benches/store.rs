// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use tidemark::store::{DurableStore, WriteDurability};

mod fixtures;
mod profiler;

use fixtures::{Case, TempDir};

fn populated(tmp: &TempDir, case: Case) -> std::path::PathBuf {
    let path = tmp.path().join("history.jsonl");
    let mut store = DurableStore::open(&path, WriteDurability::BestEffort).expect("open store");
    for command in fixtures::commands(case) {
        store.append(&command).expect("append");
    }
    store.close().expect("close store");
    path
}

// Benchmark identity (keep stable):
// - Group names in this file: `store.append`, `store.open`, `store.evict`
// - Case IDs are the fixture ids (`small`, `medium`).
fn benches_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.append");
    for case in [Case::Small, Case::Medium] {
        let commands = fixtures::commands(case);
        group.bench_function(case.id(), move |b| {
            b.iter_batched_ref(
                || TempDir::new("store_append"),
                |tmp| {
                    let mut store =
                        DurableStore::open(tmp.path().join("history.jsonl"), WriteDurability::BestEffort)
                            .expect("open store");
                    for command in &commands {
                        black_box(store.append(black_box(command)).expect("append"));
                    }
                    black_box(store.size())
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();

    let mut group = c.benchmark_group("store.open");
    for case in [Case::Small, Case::Medium] {
        let tmp = TempDir::new("store_open");
        let path = populated(&tmp, case);
        group.bench_function(case.id(), move |b| {
            b.iter(|| {
                let store = DurableStore::open(black_box(&path), WriteDurability::BestEffort)
                    .expect("open store");
                black_box(store.recent(100).len())
            });
            let _ = &tmp;
        });
    }
    group.finish();

    let mut group = c.benchmark_group("store.evict");
    for case in [Case::Small, Case::Medium] {
        group.bench_function(case.id(), move |b| {
            b.iter_batched_ref(
                || {
                    let tmp = TempDir::new("store_evict");
                    let path = populated(&tmp, case);
                    (tmp, path)
                },
                |(_, path)| {
                    let mut store =
                        DurableStore::open(path.as_path(), WriteDurability::BestEffort)
                            .expect("open store");
                    let batch = store.size() / 10;
                    black_box(store.evict_oldest(batch).expect("evict"))
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = profiler::criterion();
    targets = benches_store
}
criterion_main!(benches);
