//! Benchmarks for placement, removal and alignment on growing forms.
//!
//! Run with: cargo bench -p formlay-designer

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use formlay_core::{Alignment, ComponentId, Dimension, LayoutModel, Rect, Size};
use formlay_designer::{LayoutDesigner, StaticMapper};
use std::hint::black_box;

const FORM_WIDTH: i32 = 1200;
const FORM_HEIGHT: i32 = 900;

fn form() -> ComponentId {
    ComponentId::from("form")
}

fn empty_designer() -> LayoutDesigner<StaticMapper> {
    let mut model = LayoutModel::new();
    model
        .create_container(form(), Size::new(FORM_WIDTH, FORM_HEIGHT))
        .expect("form");
    let mut mapper = StaticMapper::new();
    mapper.set_interior(form(), Rect::from_size(FORM_WIDTH, FORM_HEIGHT));
    let mut designer = LayoutDesigner::new(model, mapper);
    designer.update_current_state();
    designer
}

/// Cell `i` of a grid with `columns` per row.
fn cell(i: usize, columns: usize) -> Rect {
    let col = (i % columns) as i32;
    let row = (i / columns) as i32;
    Rect::new(12 + col * 90, 12 + row * 34, 80, 24)
}

/// A form with `n` components laid out in rows of `columns`.
fn populated(n: usize, columns: usize) -> (LayoutDesigner<StaticMapper>, Vec<ComponentId>) {
    let mut designer = empty_designer();
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let id = ComponentId::new(format!("c{i}"));
        designer
            .add_component(id.clone(), &form(), cell(i, columns))
            .expect("add");
        ids.push(id);
    }
    (designer, ids)
}

fn bench_add_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/add_row");

    for n in [1, 4, 8, 12] {
        group.bench_with_input(BenchmarkId::new("components", n), &n, |b, &n| {
            b.iter_batched(
                empty_designer,
                |mut designer| {
                    for i in 0..n {
                        let id = ComponentId::new(format!("c{i}"));
                        let _ = designer.add_component(id, &form(), cell(i, 12));
                    }
                    black_box(designer)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_add_into_grid(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/add_into_grid");

    for n in [4, 16, 48] {
        group.bench_with_input(BenchmarkId::new("existing", n), &n, |b, &n| {
            b.iter_batched(
                || populated(n, 4).0,
                |mut designer| {
                    let rect = cell(n, 4);
                    let _ = designer.add_component(ComponentId::from("extra"), &form(), rect);
                    black_box(designer)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/remove");

    for n in [4, 16, 48] {
        group.bench_with_input(BenchmarkId::new("middle", n), &n, |b, &n| {
            b.iter_batched(
                || populated(n, 4),
                |(mut designer, ids)| {
                    let _ = designer.remove_components(std::slice::from_ref(&ids[n / 2]));
                    black_box(designer)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_align(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/align");

    for rows in [2, 6, 12] {
        group.bench_with_input(BenchmarkId::new("column", rows), &rows, |b, &rows| {
            b.iter_batched(
                || populated(rows * 3, 3),
                |(mut designer, ids)| {
                    let column: Vec<ComponentId> = ids.iter().step_by(3).cloned().collect();
                    let _ = designer.align(&column, false, Dimension::Horizontal, Alignment::Leading);
                    black_box(designer)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_state_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/state");

    for n in [16, 48] {
        let (designer, _) = populated(n, 4);
        let [horizontal, _] = designer.model().default_roots(&form()).expect("roots");
        group.bench_with_input(BenchmarkId::new("dump", n), &designer, |b, designer| {
            b.iter(|| black_box(designer.model().dump_structure(horizontal)))
        });
        group.bench_with_input(BenchmarkId::new("invariants", n), &designer, |b, designer| {
            b.iter(|| black_box(designer.model().invariant_report()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_row,
    bench_add_into_grid,
    bench_remove,
    bench_align,
    bench_state_queries
);
criterion_main!(benches);
