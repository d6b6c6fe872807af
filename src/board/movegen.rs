//! Move generation.
//!
//! Pseudo-legal moves are generated from the bitboards and filtered for
//! legality by make/test/unmake. Noisy moves are captures and promotions;
//! everything else is quiet.

use super::attacks;
use super::error::MoveParseError;
use super::make_unmake::castle_destinations;
use super::state::Board;
use super::types::{Bitboard, Color, Move, MoveList, Piece, Square, PROMOTION_PIECES};

/// All squares on the closed interval between two squares of one rank.
fn rank_span(a: Square, b: Square) -> Bitboard {
    let (lo, hi) = if a.index() <= b.index() {
        (a.index(), b.index())
    } else {
        (b.index(), a.index())
    };
    let mut span = Bitboard::EMPTY;
    for idx in lo..=hi {
        span |= Bitboard::from_square(Square::from_index(idx));
    }
    span
}

impl Board {
    /// Append every legal move to `out`.
    pub fn gen_all_legal_moves(&mut self, out: &mut MoveList) {
        let mut pseudo = MoveList::new();
        self.gen_pseudo_legal(&mut pseudo, true, true);
        self.filter_legal(&pseudo, out);
    }

    /// Append legal captures and promotions to `out`.
    pub fn gen_all_noisy_moves(&mut self, out: &mut MoveList) {
        let mut pseudo = MoveList::new();
        self.gen_pseudo_legal(&mut pseudo, true, false);
        self.filter_legal(&pseudo, out);
    }

    /// Append legal non-captures to `out`.
    pub fn gen_all_quiet_moves(&mut self, out: &mut MoveList) {
        let mut pseudo = MoveList::new();
        self.gen_pseudo_legal(&mut pseudo, false, true);
        self.filter_legal(&pseudo, out);
    }

    /// Number of legal moves in the position.
    #[must_use]
    pub fn legal_move_count(&mut self) -> usize {
        let mut moves = MoveList::new();
        self.gen_all_legal_moves(&mut moves);
        moves.len()
    }

    fn filter_legal(&mut self, pseudo: &MoveList, out: &mut MoveList) {
        for &mv in pseudo.iter() {
            let undo = self.apply_move(mv);
            if self.last_move_was_legal() {
                out.push(mv);
            }
            self.revert_move(mv, &undo);
        }
    }

    /// Generate pseudo-legal moves, partitioned by the two flags.
    pub(crate) fn gen_pseudo_legal(&self, out: &mut MoveList, noisy: bool, quiet: bool) {
        let us = self.turn;
        let them = us.opponent();
        let occupied = self.occupied();
        let empty = !occupied;
        let enemy = self.colours[them.index()];

        self.gen_pawn_moves(out, noisy, quiet);

        let mut targets = Bitboard::EMPTY;
        if noisy {
            targets |= enemy;
        }
        if quiet {
            targets |= empty;
        }

        for from in self.pieces_of(us, Piece::Knight).iter() {
            for to in (attacks::knight_attacks(from) & targets).iter() {
                out.push(Move::normal(from, to));
            }
        }
        for from in self.pieces_of(us, Piece::Bishop).iter() {
            for to in (attacks::bishop_attacks(from, occupied) & targets).iter() {
                out.push(Move::normal(from, to));
            }
        }
        for from in self.pieces_of(us, Piece::Rook).iter() {
            for to in (attacks::rook_attacks(from, occupied) & targets).iter() {
                out.push(Move::normal(from, to));
            }
        }
        for from in self.pieces_of(us, Piece::Queen).iter() {
            for to in (attacks::queen_attacks(from, occupied) & targets).iter() {
                out.push(Move::normal(from, to));
            }
        }

        let king = self.king_square(us);
        for to in (attacks::king_attacks(king) & targets).iter() {
            out.push(Move::normal(king, to));
        }

        if quiet {
            self.gen_castle_moves(out);
        }
    }

    fn gen_pawn_moves(&self, out: &mut MoveList, noisy: bool, quiet: bool) {
        let us = self.turn;
        let them = us.opponent();
        let pawns = self.pieces_of(us, Piece::Pawn);
        let empty = !self.occupied();
        let enemy = self.colours[them.index()];

        let up = |bb: Bitboard| match us {
            Color::White => Bitboard(bb.0 << 8),
            Color::Black => Bitboard(bb.0 >> 8),
        };
        let push_from = |to: Square| match us {
            Color::White => Square::from_index(to.index() - 8),
            Color::Black => Square::from_index(to.index() + 8),
        };
        let start_rank = match us {
            Color::White => Bitboard::RANK_2,
            Color::Black => Bitboard::RANK_7,
        };

        let single = up(pawns) & empty;

        if quiet {
            for to in (single & !Bitboard::PROMOTION_RANKS).iter() {
                out.push(Move::normal(push_from(to), to));
            }
            let double = up(up(pawns & start_rank) & empty) & empty;
            for to in double.iter() {
                out.push(Move::normal(push_from(push_from(to)), to));
            }
        }

        if noisy {
            for to in (single & Bitboard::PROMOTION_RANKS).iter() {
                let from = push_from(to);
                for &piece in &PROMOTION_PIECES {
                    out.push(Move::promotion(from, to, piece));
                }
            }

            for from in pawns.iter() {
                let captures = attacks::pawn_attacks(us, from) & enemy;
                for to in captures.iter() {
                    if Bitboard::PROMOTION_RANKS.contains(to) {
                        for &piece in &PROMOTION_PIECES {
                            out.push(Move::promotion(from, to, piece));
                        }
                    } else {
                        out.push(Move::normal(from, to));
                    }
                }
            }

            if let Some(ep) = self.ep_square {
                let capturers = attacks::pawn_attacks(them, ep) & pawns;
                for from in capturers.iter() {
                    out.push(Move::en_passant(from, ep));
                }
            }
        }
    }

    /// Castling over `castle_rooks`. The path squares must be empty apart
    /// from the moving king and rook, and the king's walk unattacked.
    fn gen_castle_moves(&self, out: &mut MoveList) {
        if self.in_check() {
            return;
        }

        let us = self.turn;
        let them = us.opponent();
        let king_from = self.king_square(us);
        let rooks = self.castle_rooks & self.colours[us.index()];

        'rooks: for rook_from in rooks.iter() {
            let (king_to, rook_to) = castle_destinations(us, king_from, rook_from);

            let path = rank_span(king_from, king_to) | rank_span(rook_from, rook_to);
            let movers = Bitboard::from_square(king_from) | Bitboard::from_square(rook_from);
            if !(path & self.occupied() & !movers).is_empty() {
                continue;
            }

            for sq in rank_span(king_from, king_to).iter() {
                if self.attacked_by(sq, them) {
                    continue 'rooks;
                }
            }

            out.push(Move::castle(king_from, rook_from));
        }
    }

    /// Parse a long-algebraic move string against the current position.
    ///
    /// Standard castles are accepted in both king-destination ("e1g1") and
    /// king-takes-rook ("e1h1") forms.
    pub fn parse_move(&mut self, text: &str) -> Result<Move, MoveParseError> {
        if !text.is_ascii() || text.len() < 4 || text.len() > 5 {
            return Err(MoveParseError::InvalidLength { len: text.len() });
        }
        Square::from_name(&text[0..2]).map_err(|_| MoveParseError::InvalidSquare {
            notation: text.to_string(),
        })?;
        Square::from_name(&text[2..4]).map_err(|_| MoveParseError::InvalidSquare {
            notation: text.to_string(),
        })?;

        let mut moves = MoveList::new();
        self.gen_all_legal_moves(&mut moves);

        for &mv in moves.iter() {
            if mv.to_uci(self.chess960) == text {
                return Ok(mv);
            }
            // King-takes-rook spelling of a standard castle
            if mv.is_castle() && format!("{}{}", mv.from(), mv.to()) == text {
                return Ok(mv);
            }
        }

        Err(MoveParseError::IllegalMove {
            notation: text.to_string(),
        })
    }
}
