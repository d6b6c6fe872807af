//! FEN parsing and emission.
//!
//! Accepts the standard 6-field form plus Shredder and X-FEN castling
//! fields so Chess960 back ranks round-trip cleanly.

use super::error::FenError;
use super::state::Board;
use super::types::{Bitboard, Color, Piece, Square};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    /// Parse a FEN string into a fresh board.
    ///
    /// On error the result carries no partial state; callers keep their
    /// previous board untouched.
    pub fn from_fen(fen: &str) -> Result<Board, FenError> {
        Board::from_fen_with_variant(fen, false)
    }

    /// Parse a FEN string, marking the position as Chess960 when requested.
    /// The flag changes castle-move text, not parsing: Shredder and X-FEN
    /// castling fields are always understood.
    pub fn from_fen_with_variant(fen: &str, chess960: bool) -> Result<Board, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        let mut board = Board::empty();
        board.chess960 = chess960;

        // Piece placement, rank 8 first
        for (i, rank_str) in parts[0].split('/').enumerate() {
            if i >= 8 {
                return Err(FenError::TooManyRanks);
            }
            let rank = 7 - i;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { piece: c })?;
                    let color = if c.is_ascii_uppercase() {
                        Color::White
                    } else {
                        Color::Black
                    };
                    if file >= 8 {
                        return Err(FenError::TooManyFiles { rank });
                    }
                    board.add_piece(color, piece, Square::new(rank, file));
                    file += 1;
                }
            }
        }

        for color in [Color::White, Color::Black] {
            if board.pieces_of(color, Piece::King).popcount() != 1 {
                return Err(FenError::BadKingCount);
            }
        }

        board.turn = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        board.parse_castling(parts[2])?;

        board.ep_square = match parts[3] {
            "-" => None,
            name => {
                let sq = Square::from_name(name).map_err(|_| FenError::InvalidEnPassant {
                    found: name.to_string(),
                })?;
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(FenError::InvalidEnPassant {
                        found: name.to_string(),
                    });
                }
                Some(sq)
            }
        };

        board.half_move_counter = parts
            .get(4)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        board.full_move_counter = parts
            .get(5)
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let (hash, pkhash) = board.hash_from_scratch();
        board.hash = hash;
        board.pkhash = pkhash;
        board.king_attackers = board.compute_king_attackers();

        Ok(board)
    }

    fn parse_castling(&mut self, field: &str) -> Result<(), FenError> {
        for c in field.chars() {
            if c == '-' {
                continue;
            }
            let color = if c.is_ascii_uppercase() {
                Color::White
            } else {
                Color::Black
            };
            let back = match color {
                Color::White => 0,
                Color::Black => 7,
            };
            let king_sq = self.king_square(color);
            let rooks = self.pieces_of(color, Piece::Rook) & Bitboard::rank_mask(back);

            let rook_sq = match c.to_ascii_lowercase() {
                // X-FEN: the outermost rook on the named side of the king
                'k' => {
                    let beyond = rooks
                        .iter()
                        .filter(|sq| sq.file() > king_sq.file())
                        .last();
                    beyond.ok_or(FenError::MissingCastlingRook { castling: c })?
                }
                'q' => {
                    let beyond = rooks.iter().find(|sq| sq.file() < king_sq.file());
                    beyond.ok_or(FenError::MissingCastlingRook { castling: c })?
                }
                // Shredder: an explicit file letter
                file @ 'a'..='h' => {
                    let sq = Square::new(back, file as usize - 'a' as usize);
                    if !rooks.contains(sq) {
                        return Err(FenError::MissingCastlingRook { castling: c });
                    }
                    sq
                }
                _ => return Err(FenError::InvalidCastling { castling: c }),
            };

            self.register_castle_rook(rook_sq, king_sq);
        }
        Ok(())
    }

    /// Emit the position as a FEN string. Canonical input round-trips.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8).rev() {
            let mut empties = 0;
            for file in 0..8 {
                match self.piece_at(Square::new(rank, file)) {
                    None => empties += 1,
                    Some((color, piece)) => {
                        if empties > 0 {
                            fen.push(char::from_digit(empties, 10).unwrap_or('0'));
                            empties = 0;
                        }
                        fen.push(piece.to_fen_char(color));
                    }
                }
            }
            if empties > 0 {
                fen.push(char::from_digit(empties, 10).unwrap_or('0'));
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(match self.turn {
            Color::White => 'w',
            Color::Black => 'b',
        });
        fen.push(' ');

        if self.castle_rooks.is_empty() {
            fen.push('-');
        } else {
            for color in [Color::White, Color::Black] {
                let king_file = self.king_square(color).file();
                let rooks = self.castle_rooks & self.colours[color.index()];
                // Kingside first, then queenside
                let mut files: Vec<usize> = rooks.iter().map(|sq| sq.file()).collect();
                files.sort_unstable_by(|a, b| b.cmp(a));
                for file in files {
                    let c = if self.chess960 {
                        (b'a' + file as u8) as char
                    } else if file > king_file {
                        'k'
                    } else {
                        'q'
                    };
                    fen.push(match color {
                        Color::White => c.to_ascii_uppercase(),
                        Color::Black => c,
                    });
                }
            }
        }

        fen.push(' ');
        match self.ep_square {
            None => fen.push('-'),
            Some(sq) => fen.push_str(&sq.to_string()),
        }
        fen.push_str(&format!(
            " {} {}",
            self.half_move_counter, self.full_move_counter
        ));

        fen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startpos_roundtrip() {
        let board = Board::from_fen(START_FEN).unwrap();
        assert_eq!(board.to_fen(), START_FEN);
        assert_eq!(board.hash(), Board::new().hash());
    }

    #[test]
    fn test_canonical_roundtrips() {
        let fens = [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
            "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3",
            "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1",
            "8/8/8/8/8/8/6k1/4K2R w K - 0 1",
        ];
        for fen in fens {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.to_fen(), fen, "roundtrip failed");
            board.assert_consistent();
        }
    }

    #[test]
    fn test_shredder_castling_field() {
        let xfen = "r3k2r/8/8/8/8/8/8/R3K2R w HAha - 0 1";
        let board = Board::from_fen_with_variant(xfen, true).unwrap();
        assert_eq!(board.castle_rooks.popcount(), 4);
        assert_eq!(board.to_fen(), xfen);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Board::from_fen("only three fields"),
            Err(FenError::TooFewParts { .. })
        ));
        assert!(Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1").is_err());
        assert!(Board::from_fen("zzz/8/8/8/8/8/8/8 w - - 0 1").is_err());
        // No kings
        assert!(matches!(
            Board::from_fen("8/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenError::BadKingCount)
        ));
    }

    #[test]
    fn test_missing_optional_fields() {
        let board = Board::from_fen("4k3/8/8/8/8/8/8/4K3 w - -").unwrap();
        assert_eq!(board.half_move_counter(), 0);
        assert_eq!(board.full_move_counter(), 1);
    }
}
