//! Board state: bitboards, mailbox, hashes, castling rights and history.

use std::fmt;

use super::attacks;
use super::types::{Bitboard, Color, Piece, Square, ALL_PIECES};
use super::zobrist;

/// Capacity of the repetition history ring. The ring is reset at every
/// irreversible move, so in practice it stays far below this bound.
pub(crate) const HISTORY_SIZE: usize = 512;

/// A chess position.
///
/// Piece placement is kept redundantly as per-kind and per-color bitboards
/// plus a square-indexed mailbox; the two views must always agree. Zobrist
/// hashes, the castling-rook set and the piece-square material score are
/// maintained incrementally by make/unmake.
#[derive(Clone)]
pub struct Board {
    pub(crate) pieces: [Bitboard; 6],
    pub(crate) colours: [Bitboard; 2],
    pub(crate) squares: [Option<(Color, Piece)>; 64],
    pub(crate) hash: u64,
    pub(crate) pkhash: u64,
    /// Rooks that retain castling rights, both sides
    pub(crate) castle_rooks: Bitboard,
    /// Per-square bits to drop from `castle_rooks` when the square is touched
    pub(crate) castle_masks: [Bitboard; 64],
    pub(crate) turn: Color,
    pub(crate) ep_square: Option<Square>,
    pub(crate) half_move_counter: u32,
    pub(crate) full_move_counter: u32,
    /// Ring of past position hashes for repetition detection
    pub(crate) history: [u64; HISTORY_SIZE],
    pub(crate) num_moves: usize,
    /// Running piece-square + material score, packed mg/eg, white's view
    pub(crate) psqtmat: i32,
    /// Opponent pieces currently attacking the side-to-move king
    pub(crate) king_attackers: Bitboard,
    pub(crate) chess960: bool,
}

impl Board {
    /// An empty board with no pieces. Used by FEN parsing.
    pub(crate) fn empty() -> Self {
        Board {
            pieces: [Bitboard::EMPTY; 6],
            colours: [Bitboard::EMPTY; 2],
            squares: [None; 64],
            hash: 0,
            pkhash: 0,
            castle_rooks: Bitboard::EMPTY,
            castle_masks: [Bitboard::EMPTY; 64],
            turn: Color::White,
            ep_square: None,
            half_move_counter: 0,
            full_move_counter: 1,
            history: [0; HISTORY_SIZE],
            num_moves: 0,
            psqtmat: 0,
            king_attackers: Bitboard::EMPTY,
            chess960: false,
        }
    }

    /// The standard starting position.
    #[must_use]
    pub fn new() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            Piece::Rook,
            Piece::Knight,
            Piece::Bishop,
            Piece::Queen,
            Piece::King,
            Piece::Bishop,
            Piece::Knight,
            Piece::Rook,
        ];
        for (file, &piece) in back_rank.iter().enumerate() {
            board.add_piece(Color::White, piece, Square::new(0, file));
            board.add_piece(Color::White, Piece::Pawn, Square::new(1, file));
            board.add_piece(Color::Black, Piece::Pawn, Square::new(6, file));
            board.add_piece(Color::Black, piece, Square::new(7, file));
        }

        board.register_castle_rook(Square::new(0, 0), Square::new(0, 4));
        board.register_castle_rook(Square::new(0, 7), Square::new(0, 4));
        board.register_castle_rook(Square::new(7, 0), Square::new(7, 4));
        board.register_castle_rook(Square::new(7, 7), Square::new(7, 4));

        let (hash, pkhash) = board.hash_from_scratch();
        board.hash = hash;
        board.pkhash = pkhash;
        board.king_attackers = board.compute_king_attackers();
        board
    }

    /// Grant castling rights to the rook on `rook_sq`, updating the
    /// touch-masks of both the rook and its king.
    pub(crate) fn register_castle_rook(&mut self, rook_sq: Square, king_sq: Square) {
        let bit = Bitboard::from_square(rook_sq);
        self.castle_rooks |= bit;
        self.castle_masks[rook_sq.index()] |= bit;
        self.castle_masks[king_sq.index()] |= bit;
    }

    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    #[must_use]
    pub fn pkhash(&self) -> u64 {
        self.pkhash
    }

    #[inline]
    #[must_use]
    pub fn turn(&self) -> Color {
        self.turn
    }

    #[inline]
    #[must_use]
    pub fn chess960(&self) -> bool {
        self.chess960
    }

    #[inline]
    #[must_use]
    pub fn half_move_counter(&self) -> u32 {
        self.half_move_counter
    }

    #[inline]
    #[must_use]
    pub fn full_move_counter(&self) -> u32 {
        self.full_move_counter
    }

    #[inline]
    #[must_use]
    pub fn piece_at(&self, sq: Square) -> Option<(Color, Piece)> {
        self.squares[sq.index()]
    }

    /// Running material + piece-square score, packed mg/eg, white's view.
    #[inline]
    #[must_use]
    pub fn psqtmat(&self) -> i32 {
        self.psqtmat
    }

    /// Number of pieces of the given kind on the board, both sides.
    #[inline]
    #[must_use]
    pub fn piece_count(&self, piece: Piece) -> u32 {
        self.pieces[piece.index()].popcount()
    }

    #[inline]
    #[must_use]
    pub fn occupied(&self) -> Bitboard {
        self.colours[0] | self.colours[1]
    }

    #[inline]
    #[must_use]
    pub(crate) fn pieces_of(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[piece.index()] & self.colours[color.index()]
    }

    #[inline]
    #[must_use]
    pub(crate) fn king_square(&self, color: Color) -> Square {
        self.pieces_of(color, Piece::King).lsb()
    }

    /// True when the side to move is in check.
    #[inline]
    #[must_use]
    pub fn in_check(&self) -> bool {
        !self.king_attackers.is_empty()
    }

    /// Forget the repetition history. The position command calls this after
    /// every irreversible move; earlier positions can never recur.
    pub fn reset_history(&mut self) {
        self.num_moves = 0;
    }

    /// All pieces of either color attacking `sq` through `occupied`.
    #[must_use]
    pub(crate) fn attackers_to(&self, sq: Square, occupied: Bitboard) -> Bitboard {
        let knights = self.pieces[Piece::Knight.index()];
        let kings = self.pieces[Piece::King.index()];
        let bishops = self.pieces[Piece::Bishop.index()] | self.pieces[Piece::Queen.index()];
        let rooks = self.pieces[Piece::Rook.index()] | self.pieces[Piece::Queen.index()];

        (attacks::pawn_attacks(Color::White, sq) & self.pieces_of(Color::Black, Piece::Pawn))
            | (attacks::pawn_attacks(Color::Black, sq) & self.pieces_of(Color::White, Piece::Pawn))
            | (attacks::knight_attacks(sq) & knights)
            | (attacks::king_attacks(sq) & kings)
            | (attacks::bishop_attacks(sq, occupied) & bishops)
            | (attacks::rook_attacks(sq, occupied) & rooks)
    }

    /// True when `sq` is attacked by any piece of `by`.
    #[must_use]
    pub(crate) fn attacked_by(&self, sq: Square, by: Color) -> bool {
        !(self.attackers_to(sq, self.occupied()) & self.colours[by.index()]).is_empty()
    }

    /// Opponent pieces attacking the side-to-move king.
    #[must_use]
    pub(crate) fn compute_king_attackers(&self) -> Bitboard {
        let king = self.king_square(self.turn);
        self.attackers_to(king, self.occupied()) & self.colours[self.turn.opponent().index()]
    }

    /// Recompute both Zobrist hashes from the current placement.
    #[must_use]
    pub(crate) fn hash_from_scratch(&self) -> (u64, u64) {
        let mut hash = 0u64;
        let mut pkhash = 0u64;

        for color in [Color::White, Color::Black] {
            for piece in ALL_PIECES {
                for sq in self.pieces_of(color, piece).iter() {
                    let key = zobrist::piece_key(color, piece, sq);
                    hash ^= key;
                    if matches!(piece, Piece::Pawn | Piece::King) {
                        pkhash ^= key;
                    }
                }
            }
        }
        for rook in self.castle_rooks.iter() {
            hash ^= zobrist::castle_key(rook);
        }
        if let Some(ep) = self.ep_square {
            hash ^= zobrist::en_passant_key(ep.file());
        }
        if self.turn == Color::Black {
            hash ^= zobrist::turn_key();
        }

        (hash, pkhash)
    }

    /// True when `color` still has a knight, bishop, rook or queen.
    #[must_use]
    pub(crate) fn has_non_pawn_material(&self, color: Color) -> bool {
        let minors_and_majors = self.colours[color.index()]
            & !(self.pieces[Piece::Pawn.index()] | self.pieces[Piece::King.index()]);
        !minors_and_majors.is_empty()
    }

    /// Draw by repetition, the fifty-move rule or insufficient material.
    ///
    /// `height` is the distance from the search root; repetitions inside
    /// the search tree count as draws on the first recurrence.
    #[must_use]
    pub fn is_drawn(&self, height: usize) -> bool {
        self.drawn_by_fifty_move_rule()
            || self.drawn_by_repetition(height)
            || self.drawn_by_insufficient_material()
    }

    #[must_use]
    pub fn drawn_by_fifty_move_rule(&self) -> bool {
        // A mate on the hundredth half-move takes precedence; the search
        // handles that by checking for legal moves before scoring draws.
        self.half_move_counter >= 100
    }

    #[must_use]
    pub fn drawn_by_repetition(&self, height: usize) -> bool {
        let num_moves = self.num_moves as isize;
        let lower = num_moves - self.half_move_counter as isize;
        let root_bound = num_moves - height as isize;
        let mut reps = 0;

        let mut i = num_moves - 2;
        while i >= 0 && i >= lower {
            if self.history[i as usize] == self.hash {
                // Inside the search tree one recurrence suffices; against
                // positions before the root we require a true threefold.
                if i > root_bound {
                    return true;
                }
                reps += 1;
                if reps == 2 {
                    return true;
                }
            }
            i -= 2;
        }
        false
    }

    #[must_use]
    pub fn drawn_by_insufficient_material(&self) -> bool {
        let heavy = self.pieces[Piece::Pawn.index()]
            | self.pieces[Piece::Rook.index()]
            | self.pieces[Piece::Queen.index()];
        if !heavy.is_empty() {
            return false;
        }

        let knights = self.pieces[Piece::Knight.index()];
        let bishops = self.pieces[Piece::Bishop.index()];
        let minors = knights.popcount() + bishops.popcount();

        if minors <= 1 {
            return true;
        }

        // Two bishops on the same square color cannot force mate
        if knights.is_empty() && minors == 2 {
            let one_per_side = self
                .colours
                .iter()
                .all(|c| (*c & bishops).popcount() <= 1);
            return one_per_side
                && ((bishops & Bitboard::LIGHT_SQUARES).is_empty()
                    || (bishops & Bitboard::DARK_SQUARES).is_empty());
        }

        false
    }

    /// Verify the redundant views agree. Debug builds only; called from
    /// make/unmake in tests.
    #[cfg(any(test, debug_assertions))]
    pub(crate) fn assert_consistent(&self) {
        let mut union = Bitboard::EMPTY;
        for (i, a) in self.pieces.iter().enumerate() {
            for b in self.pieces.iter().skip(i + 1) {
                assert!((*a & *b).is_empty(), "piece boards overlap");
            }
            union |= *a;
        }
        assert_eq!(union, self.occupied(), "piece union != occupancy");
        assert!((self.colours[0] & self.colours[1]).is_empty());

        for color in [Color::White, Color::Black] {
            assert_eq!(self.pieces_of(color, Piece::King).popcount(), 1);
        }

        for idx in 0..64 {
            let sq = Square::from_index(idx);
            match self.squares[idx] {
                None => assert!(!self.occupied().contains(sq), "mailbox empty, bitboard set"),
                Some((color, piece)) => {
                    assert!(self.pieces_of(color, piece).contains(sq), "mailbox disagrees");
                }
            }
        }

        let (hash, pkhash) = self.hash_from_scratch();
        assert_eq!(hash, self.hash, "incremental hash drifted");
        assert_eq!(pkhash, self.pkhash, "incremental pkhash drifted");
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8).rev() {
            write!(f, "{} ", rank + 1)?;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    Some((color, piece)) => write!(f, "{} ", piece.to_fen_char(color))?,
                    None => write!(f, ". ")?,
                }
            }
            writeln!(f)?;
        }
        writeln!(f, "  a b c d e f g h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_basics() {
        let board = Board::new();
        assert_eq!(board.turn(), Color::White);
        assert_eq!(board.occupied().popcount(), 32);
        assert_eq!(board.castle_rooks.popcount(), 4);
        assert!(!board.in_check());
        assert_eq!(board.king_square(Color::White).to_string(), "e1");
        assert_eq!(board.king_square(Color::Black).to_string(), "e8");
        board.assert_consistent();
    }

    #[test]
    fn test_startpos_not_drawn() {
        let board = Board::new();
        assert!(!board.is_drawn(0));
        assert!(board.has_non_pawn_material(Color::White));
    }

    #[test]
    fn test_insufficient_material() {
        let kk = Board::from_fen("8/8/4k3/8/8/3K4/8/8 w - - 0 1").unwrap();
        assert!(kk.drawn_by_insufficient_material());

        let kbk = Board::from_fen("8/8/4k3/8/8/3KB3/8/8 w - - 0 1").unwrap();
        assert!(kbk.drawn_by_insufficient_material());

        let krk = Board::from_fen("8/8/4k3/8/8/3KR3/8/8 w - - 0 1").unwrap();
        assert!(!krk.drawn_by_insufficient_material());

        // One bishop per side on opposite colors can still mate in the
        // corner: white Bc3 is dark, black Bb5 is light
        let opposite = Board::from_fen("8/8/4k3/1b6/8/2BK4/8/8 w - - 0 1").unwrap();
        assert!(!opposite.drawn_by_insufficient_material());

        // Same pair on matching colors (Bc3 and Ba5, both dark) is dead
        let same = Board::from_fen("8/8/4k3/b7/8/2BK4/8/8 w - - 0 1").unwrap();
        assert!(same.drawn_by_insufficient_material());
    }

    #[test]
    fn test_attackers_to() {
        let board = Board::from_fen("4k3/8/8/8/4r3/8/4P3/4K3 w - - 0 1").unwrap();
        let e2 = Square::from_name("e2").unwrap();
        let attackers = board.attackers_to(e2, board.occupied());
        // The rook on e4 and the king on e1 both hit e2
        assert!(attackers.contains(Square::from_name("e4").unwrap()));
        assert!(attackers.contains(Square::from_name("e1").unwrap()));
    }

    #[test]
    fn test_check_detection() {
        let board = Board::from_fen("4k3/8/8/8/8/8/4r3/4K3 w - - 0 1").unwrap();
        assert!(board.in_check());
        assert_eq!(board.king_attackers.popcount(), 1);
    }
}
