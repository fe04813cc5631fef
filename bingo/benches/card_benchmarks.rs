use bingo::card::{Mulberry32, generate_card, winning_line};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{collections::HashSet, hint::black_box};

/// Benchmark raw generator output
fn bench_mulberry32(c: &mut Criterion) {
    c.bench_function("mulberry32_next_f64", |b| {
        let mut rng = Mulberry32::new(12345);
        b.iter(|| black_box(rng.next_f64()));
    });
}

/// Benchmark card generation across seeds
fn bench_generate_card(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_card");

    for seed in [0u32, 42, 9_999_999, u32::MAX] {
        group.bench_with_input(BenchmarkId::from_parameter(seed), &seed, |b, &seed| {
            b.iter(|| generate_card(black_box(seed)));
        });
    }

    group.finish();
}

/// Benchmark evaluation with no line, a late line and a first-row line
fn bench_winning_line(c: &mut Criterion) {
    let card = generate_card(2024);
    let mut group = c.benchmark_group("winning_line");

    let empty: HashSet<u8> = HashSet::new();
    group.bench_function("no_marks", |b| {
        b.iter(|| winning_line(black_box(&card), black_box(&empty)));
    });

    let anti_diagonal: HashSet<u8> = (0..5)
        .filter_map(|i| card.cell(i, 4 - i).number())
        .collect();
    group.bench_function("anti_diagonal", |b| {
        b.iter(|| winning_line(black_box(&card), black_box(&anti_diagonal)));
    });

    let all: HashSet<u8> = (1..=75).collect();
    group.bench_function("all_called", |b| {
        b.iter(|| winning_line(black_box(&card), black_box(&all)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mulberry32,
    bench_generate_card,
    bench_winning_line
);
criterion_main!(benches);
