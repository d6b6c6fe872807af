use std::env;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use basalt::board::Board;
use basalt::eval::ClassicalEvaluator;
use basalt::search::{get_best_move, Limits, PonderSignal, ThreadPool};
use basalt::syzygy::NoTablebase;
use basalt::tt::TranspositionTable;
use basalt::uci;

/// Positions exercised by `basalt bench`: opening, middlegame, endgame.
const BENCH_POSITIONS: &[&str] = &[
    "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
];

const BENCH_DEPTH: i32 = 9;

/// Fixed-depth node-count benchmark over a small position set.
fn run_benchmark() {
    basalt::init();

    let mut pool = ThreadPool::new(1, Arc::new(ClassicalEvaluator));
    let tt = Arc::new(TranspositionTable::new(16));
    let start = Instant::now();
    let mut total_nodes = 0u64;

    for (i, fen) in BENCH_POSITIONS.iter().enumerate() {
        let board = match Board::from_fen(fen) {
            Ok(board) => board,
            Err(_) => continue,
        };
        let limits = Limits {
            depth: Some(BENCH_DEPTH),
            silent: true,
            ..Limits::default()
        };
        let result = get_best_move(
            &mut pool,
            &board,
            limits,
            Arc::clone(&tt),
            Arc::new(AtomicBool::new(false)),
            Arc::new(PonderSignal::new()),
            Arc::new(NoTablebase),
        );
        let nodes = pool.nodes_searched();
        total_nodes += nodes;
        println!(
            "position {} bestmove {} nodes {nodes}",
            i + 1,
            result.best_move.to_uci(false)
        );
    }

    let elapsed_ms = start.elapsed().as_millis().max(1) as u64;
    println!("total nodes {total_nodes}");
    println!("nps {}", total_nodes * 1000 / elapsed_ms);
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.get(1).map(String::as_str) == Some("bench") {
        run_benchmark();
        return;
    }

    uci::run_uci_loop();
}
