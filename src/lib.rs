//! basalt: a UCI chess engine.
//!
//! Bitboard move generation with magic-bitboard slider attacks, an
//! iterative-deepening principal-variation search over a Lazy-SMP thread
//! pool, and a lock-free shared transposition table.
//!
//! The library exposes the board, search and protocol layers separately;
//! the `basalt` binary wires them to stdin/stdout.

pub mod board;
pub mod eval;
pub mod search;
pub mod syzygy;
pub mod tt;
pub mod uci;

/// Build every static lookup table: attacks, Zobrist keys, evaluation
/// masks and the reduction schedule. Runs once before the command loop;
/// everything initialised here is immutable afterwards.
pub fn init() {
    board::init();
    eval::init();
    once_cell::sync::Lazy::force(&search::constants::LMR_TABLE);
}
