//! Zobrist hashing keys.
//!
//! The full position hash covers pieces, castling rooks, en passant file and
//! the side to move. A second pawn-king hash covers only pawns and kings and
//! keys the evaluation's pawn-king cache.

use once_cell::sync::Lazy;
use rand::prelude::*;

use super::types::{Color, Piece, Square};

pub(crate) struct ZobristKeys {
    /// piece_keys[piece][color][square]
    pub(crate) piece_keys: [[[u64; 64]; 2]; 6],
    /// One key per potential castling rook square
    pub(crate) castle_keys: [u64; 64],
    /// Keyed by en passant file only
    pub(crate) en_passant_keys: [u64; 8],
    pub(crate) turn_key: u64,
}

impl ZobristKeys {
    fn new() -> Self {
        // Fixed seed keeps hashes reproducible across runs
        let mut rng = StdRng::seed_from_u64(0x3141_5926_5358_9793);
        let mut piece_keys = [[[0u64; 64]; 2]; 6];
        let mut castle_keys = [0u64; 64];
        let mut en_passant_keys = [0u64; 8];

        for piece in &mut piece_keys {
            for color in piece.iter_mut() {
                for key in color.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        for key in &mut castle_keys {
            *key = rng.gen();
        }
        for key in &mut en_passant_keys {
            *key = rng.gen();
        }

        ZobristKeys {
            piece_keys,
            castle_keys,
            en_passant_keys,
            turn_key: rng.gen(),
        }
    }
}

pub(crate) static ZOBRIST: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::new);

#[inline]
pub(crate) fn piece_key(color: Color, piece: Piece, sq: Square) -> u64 {
    ZOBRIST.piece_keys[piece.index()][color.index()][sq.index()]
}

#[inline]
pub(crate) fn castle_key(rook_sq: Square) -> u64 {
    ZOBRIST.castle_keys[rook_sq.index()]
}

#[inline]
pub(crate) fn en_passant_key(file: usize) -> u64 {
    ZOBRIST.en_passant_keys[file]
}

#[inline]
pub(crate) fn turn_key() -> u64 {
    ZOBRIST.turn_key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_deterministic() {
        let a = ZobristKeys::new();
        let b = ZobristKeys::new();
        assert_eq!(a.turn_key, b.turn_key);
        assert_eq!(a.piece_keys[0][0][0], b.piece_keys[0][0][0]);
        assert_eq!(a.castle_keys[63], b.castle_keys[63]);
    }

    #[test]
    fn test_keys_are_distinct() {
        let keys = ZobristKeys::new();
        assert_ne!(keys.piece_keys[0][0][0], keys.piece_keys[0][0][1]);
        assert_ne!(keys.turn_key, 0);
    }
}
