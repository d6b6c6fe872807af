//! Making and unmaking moves, including the null move.

use crate::eval::pst;

use super::attacks;
use super::state::{Board, HISTORY_SIZE};
use super::types::{Bitboard, Color, Move, MoveKind, Piece, Square};
use super::zobrist;

/// Pre-move state captured by [`Board::apply_move`] and consumed by
/// [`Board::revert_move`]. Lives on the stack of the search ply that made
/// the move.
#[derive(Clone, Copy, Debug)]
pub struct Undo {
    hash: u64,
    pkhash: u64,
    king_attackers: Bitboard,
    castle_rooks: Bitboard,
    ep_square: Option<Square>,
    half_move_counter: u32,
    psqtmat: i32,
    captured: Option<(Color, Piece)>,
}

/// Pre-move state for a null move.
#[derive(Clone, Copy, Debug)]
pub struct NullUndo {
    hash: u64,
    ep_square: Option<Square>,
    king_attackers: Bitboard,
}

/// King and rook destination squares for a castle of `color` encoded as
/// king-from / rook-from. File comparison generalises to Chess960.
pub(crate) fn castle_destinations(
    color: Color,
    king_from: Square,
    rook_from: Square,
) -> (Square, Square) {
    let back = match color {
        Color::White => 0,
        Color::Black => 7,
    };
    if rook_from.file() > king_from.file() {
        (Square::new(back, 6), Square::new(back, 5))
    } else {
        (Square::new(back, 2), Square::new(back, 3))
    }
}

impl Board {
    /// Place a piece, keeping bitboards, mailbox, hashes and the
    /// piece-square score in sync.
    pub(crate) fn add_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.pieces[piece.index()].set_bit(sq);
        self.colours[color.index()].set_bit(sq);
        self.squares[sq.index()] = Some((color, piece));

        let key = zobrist::piece_key(color, piece, sq);
        self.hash ^= key;
        if matches!(piece, Piece::Pawn | Piece::King) {
            self.pkhash ^= key;
        }
        self.psqtmat += pst::psqt(color, piece, sq);
    }

    /// Remove a piece, the exact inverse of [`Board::add_piece`].
    pub(crate) fn remove_piece(&mut self, color: Color, piece: Piece, sq: Square) {
        self.pieces[piece.index()].clear_bit(sq);
        self.colours[color.index()].clear_bit(sq);
        self.squares[sq.index()] = None;

        let key = zobrist::piece_key(color, piece, sq);
        self.hash ^= key;
        if matches!(piece, Piece::Pawn | Piece::King) {
            self.pkhash ^= key;
        }
        self.psqtmat -= pst::psqt(color, piece, sq);
    }

    /// Apply a pseudo-legal move. The caller is responsible for testing
    /// legality afterwards (see [`Board::last_move_was_legal`]).
    pub fn apply_move(&mut self, mv: Move) -> Undo {
        let us = self.turn;
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();

        let mut undo = Undo {
            hash: self.hash,
            pkhash: self.pkhash,
            king_attackers: self.king_attackers,
            castle_rooks: self.castle_rooks,
            ep_square: self.ep_square,
            half_move_counter: self.half_move_counter,
            psqtmat: self.psqtmat,
            captured: None,
        };

        debug_assert!(self.num_moves < HISTORY_SIZE);
        self.history[self.num_moves] = self.hash;
        self.num_moves += 1;

        if let Some(ep) = self.ep_square.take() {
            self.hash ^= zobrist::en_passant_key(ep.file());
        }

        // Any touch of a castling rook or king square drops the right
        let cleared =
            self.castle_rooks & (self.castle_masks[from.index()] | self.castle_masks[to.index()]);
        for rook in cleared.iter() {
            self.hash ^= zobrist::castle_key(rook);
        }
        self.castle_rooks ^= cleared;

        self.half_move_counter += 1;
        if us == Color::Black {
            self.full_move_counter += 1;
        }

        match mv.kind() {
            MoveKind::Normal => {
                let (_, piece) = self.piece_at(from).expect("apply_move: from square empty");
                if let Some((c, p)) = self.piece_at(to) {
                    undo.captured = Some((c, p));
                    self.remove_piece(c, p, to);
                    self.half_move_counter = 0;
                }
                self.remove_piece(us, piece, from);
                self.add_piece(us, piece, to);

                if piece == Piece::Pawn {
                    self.half_move_counter = 0;
                    // Double push: record the en passant square only when an
                    // enemy pawn could actually use it
                    if from.index().abs_diff(to.index()) == 16 {
                        let ep = Square::from_index((from.index() + to.index()) / 2);
                        let capturers =
                            attacks::pawn_attacks(us, ep) & self.pieces_of(them, Piece::Pawn);
                        if !capturers.is_empty() {
                            self.ep_square = Some(ep);
                            self.hash ^= zobrist::en_passant_key(ep.file());
                        }
                    }
                }
            }
            MoveKind::EnPassant => {
                let cap_sq = match us {
                    Color::White => Square::from_index(to.index() - 8),
                    Color::Black => Square::from_index(to.index() + 8),
                };
                undo.captured = Some((them, Piece::Pawn));
                self.remove_piece(them, Piece::Pawn, cap_sq);
                self.remove_piece(us, Piece::Pawn, from);
                self.add_piece(us, Piece::Pawn, to);
                self.half_move_counter = 0;
            }
            MoveKind::Promotion => {
                if let Some((c, p)) = self.piece_at(to) {
                    undo.captured = Some((c, p));
                    self.remove_piece(c, p, to);
                }
                self.remove_piece(us, Piece::Pawn, from);
                self.add_piece(us, mv.promoted(), to);
                self.half_move_counter = 0;
            }
            MoveKind::Castle => {
                let rook_from = to;
                let (king_to, rook_to) = castle_destinations(us, from, rook_from);
                // Remove both pieces before placing either; in Chess960 the
                // destinations may overlap the origin squares
                self.remove_piece(us, Piece::King, from);
                self.remove_piece(us, Piece::Rook, rook_from);
                self.add_piece(us, Piece::King, king_to);
                self.add_piece(us, Piece::Rook, rook_to);
            }
        }

        self.turn = them;
        self.hash ^= zobrist::turn_key();
        self.king_attackers = self.compute_king_attackers();

        undo
    }

    /// Restore the position before `mv`. Must mirror `apply_move` exactly,
    /// down to every hash bit.
    pub fn revert_move(&mut self, mv: Move, undo: &Undo) {
        self.turn = self.turn.opponent();
        let us = self.turn;
        let them = us.opponent();
        let from = mv.from();
        let to = mv.to();

        self.num_moves -= 1;
        if us == Color::Black {
            self.full_move_counter -= 1;
        }

        match mv.kind() {
            MoveKind::Normal => {
                let (_, piece) = self.piece_at(to).expect("revert_move: to square empty");
                self.remove_piece(us, piece, to);
                self.add_piece(us, piece, from);
                if let Some((c, p)) = undo.captured {
                    self.add_piece(c, p, to);
                }
            }
            MoveKind::EnPassant => {
                let cap_sq = match us {
                    Color::White => Square::from_index(to.index() - 8),
                    Color::Black => Square::from_index(to.index() + 8),
                };
                self.remove_piece(us, Piece::Pawn, to);
                self.add_piece(us, Piece::Pawn, from);
                self.add_piece(them, Piece::Pawn, cap_sq);
            }
            MoveKind::Promotion => {
                self.remove_piece(us, mv.promoted(), to);
                self.add_piece(us, Piece::Pawn, from);
                if let Some((c, p)) = undo.captured {
                    self.add_piece(c, p, to);
                }
            }
            MoveKind::Castle => {
                let rook_from = to;
                let (king_to, rook_to) = castle_destinations(us, from, rook_from);
                self.remove_piece(us, Piece::King, king_to);
                self.remove_piece(us, Piece::Rook, rook_to);
                self.add_piece(us, Piece::King, from);
                self.add_piece(us, Piece::Rook, rook_from);
            }
        }

        self.hash = undo.hash;
        self.pkhash = undo.pkhash;
        self.king_attackers = undo.king_attackers;
        self.castle_rooks = undo.castle_rooks;
        self.ep_square = undo.ep_square;
        self.half_move_counter = undo.half_move_counter;
        self.psqtmat = undo.psqtmat;
    }

    /// Pass the turn. Only valid when the side to move is not in check.
    pub fn apply_null_move(&mut self) -> NullUndo {
        debug_assert!(!self.in_check());

        let undo = NullUndo {
            hash: self.hash,
            ep_square: self.ep_square,
            king_attackers: self.king_attackers,
        };

        debug_assert!(self.num_moves < HISTORY_SIZE);
        self.history[self.num_moves] = self.hash;
        self.num_moves += 1;

        if let Some(ep) = self.ep_square.take() {
            self.hash ^= zobrist::en_passant_key(ep.file());
        }
        self.turn = self.turn.opponent();
        self.hash ^= zobrist::turn_key();
        self.king_attackers = self.compute_king_attackers();

        undo
    }

    pub fn revert_null_move(&mut self, undo: &NullUndo) {
        self.num_moves -= 1;
        self.turn = self.turn.opponent();
        self.hash = undo.hash;
        self.ep_square = undo.ep_square;
        self.king_attackers = undo.king_attackers;
    }

    /// After `apply_move`, true when the mover did not leave their own king
    /// attacked. Pseudo-legal generation relies on this filter.
    #[inline]
    #[must_use]
    pub(crate) fn last_move_was_legal(&self) -> bool {
        let mover = self.turn.opponent();
        !self.attacked_by(self.king_square(mover), self.turn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::MoveList;

    fn roundtrip(fen: &str) {
        let mut board = Board::from_fen(fen).unwrap();
        let reference = Board::from_fen(fen).unwrap();

        let mut moves = MoveList::new();
        board.gen_all_legal_moves(&mut moves);

        for &mv in moves.iter() {
            let undo = board.apply_move(mv);
            board.assert_consistent();
            board.revert_move(mv, &undo);
            board.assert_consistent();

            assert_eq!(board.hash, reference.hash, "hash after {mv}");
            assert_eq!(board.pkhash, reference.pkhash, "pkhash after {mv}");
            assert_eq!(board.psqtmat, reference.psqtmat, "psqtmat after {mv}");
            assert_eq!(board.castle_rooks, reference.castle_rooks);
            assert_eq!(board.ep_square, reference.ep_square);
            assert_eq!(board.half_move_counter, reference.half_move_counter);
            assert_eq!(board.to_fen(), reference.to_fen(), "fen after {mv}");
        }
    }

    #[test]
    fn test_make_unmake_startpos() {
        roundtrip("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1");
    }

    #[test]
    fn test_make_unmake_kiwipete() {
        roundtrip("r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1");
    }

    #[test]
    fn test_make_unmake_promotions_and_ep() {
        roundtrip("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1");
        roundtrip("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
    }

    #[test]
    fn test_null_move_roundtrip() {
        let mut board = Board::new();
        let hash = board.hash;
        let undo = board.apply_null_move();
        assert_ne!(board.hash, hash);
        assert_eq!(board.turn(), Color::Black);
        board.revert_null_move(&undo);
        assert_eq!(board.hash, hash);
        assert_eq!(board.turn(), Color::White);
        board.assert_consistent();
    }

    #[test]
    fn test_castling_updates_rights() {
        let mut board =
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let kingside = Move::castle(
            Square::from_name("e1").unwrap(),
            Square::from_name("h1").unwrap(),
        );
        let undo = board.apply_move(kingside);
        board.assert_consistent();

        assert_eq!(board.piece_at(Square::from_name("g1").unwrap()),
                   Some((Color::White, Piece::King)));
        assert_eq!(board.piece_at(Square::from_name("f1").unwrap()),
                   Some((Color::White, Piece::Rook)));
        // Both white rooks lost their rights, black kept theirs
        assert_eq!(board.castle_rooks.popcount(), 2);

        board.revert_move(kingside, &undo);
        assert_eq!(board.castle_rooks.popcount(), 4);
        board.assert_consistent();
    }

    #[test]
    fn test_halfmove_counter_resets() {
        let mut board = Board::new();
        let push = Move::normal(
            Square::from_name("e2").unwrap(),
            Square::from_name("e4").unwrap(),
        );
        board.apply_move(push);
        assert_eq!(board.half_move_counter(), 0);

        let knight = Move::normal(
            Square::from_name("g8").unwrap(),
            Square::from_name("f6").unwrap(),
        );
        board.apply_move(knight);
        assert_eq!(board.half_move_counter(), 1);
    }
}
