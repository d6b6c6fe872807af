//! Static exchange evaluation.
//!
//! Iterative swap-off on the destination square: each side captures with
//! its least valuable attacker until one side runs out or stands to lose
//! material by continuing.

use super::attacks;
use super::state::Board;
use super::types::{Bitboard, Color, Move, MoveKind, Piece, Square};

/// Exchange values per piece kind. The king is zero: it can never be
/// profitably captured, only end the sequence.
const SEE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 0];

#[inline]
fn see_value(piece: Piece) -> i32 {
    SEE_VALUES[piece.index()]
}

impl Board {
    /// Material swing promised by the move before any recapture.
    fn move_estimated_value(&self, mv: Move) -> i32 {
        match mv.kind() {
            MoveKind::EnPassant => see_value(Piece::Pawn),
            MoveKind::Castle => 0,
            MoveKind::Promotion => {
                let captured = self
                    .piece_at(mv.to())
                    .map_or(0, |(_, piece)| see_value(piece));
                captured + see_value(mv.promoted()) - see_value(Piece::Pawn)
            }
            MoveKind::Normal => self
                .piece_at(mv.to())
                .map_or(0, |(_, piece)| see_value(piece)),
        }
    }

    /// True when the exchange started by `mv` wins at least `threshold`
    /// centipawns against best defence.
    #[must_use]
    pub fn see(&self, mv: Move, threshold: i32) -> bool {
        // Castles swap nothing
        if mv.is_castle() {
            return threshold <= 0;
        }

        let from = mv.from();
        let to = mv.to();

        let next_victim = if mv.is_promotion() {
            mv.promoted()
        } else {
            match self.piece_at(from) {
                Some((_, piece)) => piece,
                None => return false,
            }
        };

        // Best case: the capture stands with no recapture
        let mut balance = self.move_estimated_value(mv) - threshold;
        if balance < 0 {
            return false;
        }

        // Worst case: our capturing piece is lost for nothing
        balance -= see_value(next_victim);
        if balance >= 0 {
            return true;
        }

        let mut occupied = self.occupied()
            ^ Bitboard::from_square(from)
            ^ Bitboard::from_square(to);
        if mv.is_en_passant() {
            let cap_sq = match self.turn {
                Color::White => Square::from_index(to.index() - 8),
                Color::Black => Square::from_index(to.index() + 8),
            };
            occupied ^= Bitboard::from_square(cap_sq);
        }

        let bishops = self.pieces[Piece::Bishop.index()] | self.pieces[Piece::Queen.index()];
        let rooks = self.pieces[Piece::Rook.index()] | self.pieces[Piece::Queen.index()];

        let mut attackers = self.attackers_to(to, occupied) & occupied;
        let mut color = self.turn.opponent();

        loop {
            let my_attackers = attackers & self.colours[color.index()];
            if my_attackers.is_empty() {
                break;
            }

            // Least valuable attacker next
            let mut victim = Piece::King;
            for idx in 0..6 {
                if !(my_attackers & self.pieces[idx]).is_empty() {
                    victim = Piece::from_index(idx);
                    break;
                }
            }

            let attacker_bit =
                Bitboard::from_square((my_attackers & self.pieces[victim.index()]).lsb());
            occupied ^= attacker_bit;

            // A diagonal or orthogonal capture may reveal a new slider
            if matches!(victim, Piece::Pawn | Piece::Bishop | Piece::Queen) {
                attackers |= attacks::bishop_attacks(to, occupied) & bishops;
            }
            if matches!(victim, Piece::Rook | Piece::Queen) {
                attackers |= attacks::rook_attacks(to, occupied) & rooks;
            }
            attackers &= occupied;

            color = color.opponent();
            balance = -balance - 1 - see_value(victim);

            if balance >= 0 {
                // Capturing with the king only works if no defender remains
                if victim == Piece::King
                    && !(attackers & self.colours[color.index()]).is_empty()
                {
                    color = color.opponent();
                }
                break;
            }
        }

        // The side whose turn it would be has run out of profitable captures
        self.turn != color
    }
}
