use criterion::{Criterion, black_box, criterion_group, criterion_main};

use rendergraph::{BufferInfo, BufferUsage, PassExecution, RenderGraph};

// ---------------------------------------------------------------------------
// Render graph construction
// ---------------------------------------------------------------------------

fn bench_graph_build_small(c: &mut Criterion) {
    c.bench_function("render_graph_build_4_passes", |b| {
        b.iter(|| {
            let mut graph = RenderGraph::new();
            graph
                .create_buffer(
                    "g_buffer",
                    BufferInfo {
                        size: 4096,
                        usage: BufferUsage::STORAGE,
                    },
                )
                .unwrap();
            for name in ["shadow", "geometry", "lighting", "post"] {
                graph.add_pass(name, PassExecution::Always, |db, r| {
                    let handle = db.get_buffer("g_buffer").unwrap();
                    let _ = handle;
                    r.bind_compute_pipeline("noop");
                    r.dispatch(1, 1, 1);
                });
            }
            black_box(&graph);
        });
    });
}

fn bench_graph_build_large(c: &mut Criterion) {
    c.bench_function("render_graph_build_32_passes_chain", |b| {
        b.iter(|| {
            let mut graph = RenderGraph::new();
            for i in 0..32 {
                let name = format!("pass_{i}");
                graph.add_pass(name, PassExecution::Always, |_db, r| {
                    r.bind_compute_pipeline("noop");
                    r.dispatch(1, 1, 1);
                });
            }
            black_box(&graph);
        });
    });
}

// ---------------------------------------------------------------------------
// Render graph compilation
// ---------------------------------------------------------------------------

fn bench_graph_compile_small(c: &mut Criterion) {
    c.bench_function("render_graph_compile_4_passes_chained_by_buffer", |b| {
        b.iter_batched(
            || {
                let mut graph = RenderGraph::new();
                graph
                    .create_buffer(
                        "g_buffer",
                        BufferInfo {
                            size: 4096,
                            usage: BufferUsage::STORAGE,
                        },
                    )
                    .unwrap();
                for (i, name) in ["shadow", "geometry", "lighting", "post"].into_iter().enumerate() {
                    let write = i % 2 == 0;
                    graph.add_pass(name, PassExecution::Always, move |db, r| {
                        let handle = db.get_buffer("g_buffer").unwrap();
                        let _ = handle;
                        r.bind_compute_pipeline(if write { "write" } else { "read" });
                        r.dispatch(1, 1, 1);
                    });
                }
                graph
            },
            |mut graph| {
                black_box(graph.compile().unwrap());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_graph_compile_large(c: &mut Criterion) {
    c.bench_function("render_graph_compile_32_passes_chain", |b| {
        b.iter_batched(
            || {
                let mut graph = RenderGraph::new();
                graph
                    .create_buffer(
                        "shared",
                        BufferInfo {
                            size: 4096,
                            usage: BufferUsage::STORAGE,
                        },
                    )
                    .unwrap();
                for i in 0..32 {
                    let name = format!("pass_{i}");
                    graph.add_pass(name, PassExecution::Always, |db, r| {
                        let handle = db.get_buffer("shared").unwrap();
                        let _ = handle;
                        r.bind_compute_pipeline("noop");
                        r.dispatch(1, 1, 1);
                    });
                }
                graph
            },
            |mut graph| {
                black_box(graph.compile().unwrap());
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

// ---------------------------------------------------------------------------
// Resource database operations
// ---------------------------------------------------------------------------

fn bench_database_create_buffer(c: &mut Criterion) {
    let graph = RenderGraph::new();
    let mut i = 0u32;

    c.bench_function("database_create_buffer_1kb", |b| {
        b.iter(|| {
            i += 1;
            black_box(
                graph
                    .create_buffer(
                        &format!("buf_{i}"),
                        BufferInfo {
                            size: 1024,
                            usage: BufferUsage::STORAGE,
                        },
                    )
                    .unwrap(),
            );
        });
    });
}

criterion_group!(
    benches,
    bench_graph_build_small,
    bench_graph_build_large,
    bench_graph_compile_small,
    bench_graph_compile_large,
    bench_database_create_buffer,
);
criterion_main!(benches);
