//! Chess board representation and move generation.
//!
//! Bitboard-based: one 64-bit word per piece kind and per color, with a
//! square-indexed mailbox kept in sync, magic-bitboard slider attacks,
//! make/unmake with undo records and incremental Zobrist hashing.
//!
//! # Example
//! ```
//! use basalt::board::{Board, MoveList};
//!
//! let mut board = Board::new();
//! let mut moves = MoveList::new();
//! board.gen_all_legal_moves(&mut moves);
//! assert_eq!(moves.len(), 20);
//! ```

pub(crate) mod attacks;
mod error;
mod fen;
mod make_unmake;
mod movegen;
mod perft;
mod see;
mod state;
mod types;
pub(crate) mod zobrist;

#[cfg(test)]
mod tests;

pub use error::{FenError, MoveParseError, SquareError};
pub use fen::START_FEN;
pub use make_unmake::{NullUndo, Undo};
pub use state::Board;
pub use types::{mirror_file, Bitboard, Color, Move, MoveKind, MoveList, Piece, Square};

pub(crate) use types::{MAX_MOVES, MAX_PLY};

/// Build every lookup table the board depends on. Called once at startup,
/// before the command loop.
pub fn init() {
    attacks::init();
    once_cell::sync::Lazy::force(&zobrist::ZOBRIST);
}
