//! # adlc benchmarks
//!
//! Criterion.rs benchmarks for each front-end stage.
//!
//! ## Groups
//! - `lexer`: tokenizing
//! - `parser`: tokens to syntax tree
//! - `lowering`: syntax tree to instruction stream
//!
//! ## Usage
//! ```bash
//! cargo bench          # everything
//! cargo bench lowering # one group
//! ```

use adlc::frontend::core::{parse, tokenize};
use adlc::middle::{lower, render_listing, LoweringConfig};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

const BLOCK: &str = r#"
obj goodJets{n} : jet
  select pt > 30 and abs(eta) < 2.4
  reject dR(this, electron[0]) < 0.4

comp pairs{n} : comb(goodJets{n}[0] j1, goodJets{n}[1] j2)
  select m(j1 j2) within [60, 120]

region sr{n}
  select size(goodJets{n}) >= 2
  select met > 100 ? mjj > 500 : all
  histo hmet{n}, "Missing energy", 40, 0, 1000, met
"#;

/// An analysis file with `blocks` copies of a small object/region set
fn analysis(blocks: usize) -> String {
    (0..blocks)
        .map(|n| BLOCK.replace("{n}", &n.to_string()))
        .collect()
}

fn bench_lexer(c: &mut Criterion) {
    let mut group = c.benchmark_group("lexer");
    for blocks in [1, 10, 100] {
        let source = analysis(blocks);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &source, |b, source| {
            b.iter(|| tokenize(black_box(source)).unwrap())
        });
    }
    group.finish();
}

fn bench_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser");
    for blocks in [1, 10, 100] {
        let tokens = tokenize(&analysis(blocks)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &tokens, |b, tokens| {
            b.iter(|| parse(black_box(tokens)).unwrap())
        });
    }
    group.finish();
}

fn bench_lowering(c: &mut Criterion) {
    let mut group = c.benchmark_group("lowering");
    let config = LoweringConfig::default();
    for blocks in [1, 10, 100] {
        let ast = parse(&tokenize(&analysis(blocks)).unwrap()).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(blocks), &ast, |b, ast| {
            b.iter(|| lower(black_box(ast), &config).unwrap())
        });
    }
    group.finish();
}

fn bench_listing(c: &mut Criterion) {
    let ast = parse(&tokenize(&analysis(10)).unwrap()).unwrap();
    let stream = lower(&ast, &LoweringConfig::default()).unwrap();
    c.bench_function("listing", |b| b.iter(|| render_listing(black_box(&stream))));
}

criterion_group!(benches, bench_lexer, bench_parser, bench_lowering, bench_listing);
criterion_main!(benches);
