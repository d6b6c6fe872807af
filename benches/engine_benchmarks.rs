//! Criterion benchmarks: perft, move generation and fixed-depth search.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use basalt::board::{Board, MoveList};
use basalt::eval::ClassicalEvaluator;
use basalt::search::{get_best_move, Limits, PonderSignal, ThreadPool};
use basalt::syzygy::NoTablebase;
use basalt::tt::TranspositionTable;

const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

fn bench_perft(c: &mut Criterion) {
    basalt::init();
    let mut group = c.benchmark_group("perft");

    let mut startpos = Board::new();
    for depth in 1..=4 {
        group.bench_with_input(BenchmarkId::new("startpos", depth), &depth, |b, &depth| {
            b.iter(|| startpos.perft(black_box(depth)))
        });
    }

    let mut kiwipete = Board::from_fen(KIWIPETE).unwrap();
    for depth in 1..=3 {
        group.bench_with_input(BenchmarkId::new("kiwipete", depth), &depth, |b, &depth| {
            b.iter(|| kiwipete.perft(black_box(depth)))
        });
    }

    group.finish();
}

fn bench_movegen(c: &mut Criterion) {
    basalt::init();
    let mut group = c.benchmark_group("movegen");

    let mut positions = vec![
        ("startpos", Board::new()),
        ("kiwipete", Board::from_fen(KIWIPETE).unwrap()),
        (
            "endgame",
            Board::from_fen("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1").unwrap(),
        ),
    ];

    for (name, board) in &mut positions {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let mut moves = MoveList::new();
                board.gen_all_legal_moves(black_box(&mut moves));
                moves.len()
            })
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    basalt::init();
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for depth in [4, 6] {
        group.bench_with_input(
            BenchmarkId::new("startpos", depth),
            &depth,
            |b, &depth| {
                b.iter(|| {
                    let board = Board::new();
                    let mut pool = ThreadPool::new(1, Arc::new(ClassicalEvaluator));
                    let limits = Limits {
                        depth: Some(depth),
                        silent: true,
                        ..Limits::default()
                    };
                    get_best_move(
                        &mut pool,
                        &board,
                        limits,
                        Arc::new(TranspositionTable::new(16)),
                        Arc::new(AtomicBool::new(false)),
                        Arc::new(PonderSignal::new()),
                        Arc::new(NoTablebase),
                    )
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_perft, bench_movegen, bench_search);
criterion_main!(benches);
