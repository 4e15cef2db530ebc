//! Benchmarks for flowchart generation.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mindmapper::diagram::{self, RendererConfig};
use mindmapper::tree::{Details, Node, parse_tree};

fn wide_tree(branches: usize, leaves: usize) -> Node {
    let children = (0..branches)
        .map(|b| {
            let leaves = (0..leaves)
                .map(|l| {
                    Node::new(format!("n{b}_{l}"), format!("Leaf \"{b}.{l}\""))
                        .with_details(Details::One(format!("detail for {b}.{l}")))
                })
                .collect();
            Node::new(format!("n{b}"), format!("Branch {b}")).with_children(leaves)
        })
        .collect();
    Node::new("root", "Root").with_children(children)
}

fn bench_generate_fixture(c: &mut Criterion) {
    let tree = parse_tree(include_str!("../tests/fixtures/rust.json")).unwrap();
    let config = RendererConfig::default();
    c.bench_function("generate_fixture", |b| {
        b.iter(|| diagram::document(black_box(&tree), &config))
    });
}

fn bench_generate_wide(c: &mut Criterion) {
    let tree = wide_tree(20, 25);
    let config = RendererConfig::default();
    c.bench_function("generate_wide", |b| {
        b.iter(|| diagram::document(black_box(&tree), &config))
    });
}

criterion_group!(benches, bench_generate_fixture, bench_generate_wide);
criterion_main!(benches);
