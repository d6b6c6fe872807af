//! Error types for board operations.

use std::fmt;

/// Error type for FEN parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few fields (needs at least 4)
    TooFewParts { found: usize },
    /// Invalid piece character in the placement field
    InvalidPiece { piece: char },
    /// Invalid castling character
    InvalidCastling { castling: char },
    /// Castling field names a rook that is not on the board
    MissingCastlingRook { castling: char },
    /// Invalid side to move (must be 'w' or 'b')
    InvalidSideToMove { found: String },
    /// Invalid en passant square
    InvalidEnPassant { found: String },
    /// More than eight ranks in the placement field
    TooManyRanks,
    /// A rank describes more than eight files
    TooManyFiles { rank: usize },
    /// A side is missing its king, or has more than one
    BadKingCount,
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewParts { found } => {
                write!(f, "FEN must have at least 4 fields, found {found}")
            }
            FenError::InvalidPiece { piece } => {
                write!(f, "invalid piece character '{piece}' in FEN")
            }
            FenError::InvalidCastling { castling } => {
                write!(f, "invalid castling character '{castling}' in FEN")
            }
            FenError::MissingCastlingRook { castling } => {
                write!(f, "no rook matches castling field '{castling}'")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidEnPassant { found } => {
                write!(f, "invalid en passant square '{found}'")
            }
            FenError::TooManyRanks => write!(f, "more than eight ranks in FEN"),
            FenError::TooManyFiles { rank } => {
                write!(f, "more than eight files in rank {rank}")
            }
            FenError::BadKingCount => write!(f, "each side must have exactly one king"),
        }
    }
}

impl std::error::Error for FenError {}

/// Error type for move parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveParseError {
    /// Move string has invalid length (must be 4-5 characters)
    InvalidLength { len: usize },
    /// Invalid square notation in the move
    InvalidSquare { notation: String },
    /// Move is not legal in the current position
    IllegalMove { notation: String },
}

impl fmt::Display for MoveParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveParseError::InvalidLength { len } => {
                write!(f, "move must be 4-5 characters, found {len}")
            }
            MoveParseError::InvalidSquare { notation } => {
                write!(f, "invalid square notation in '{notation}'")
            }
            MoveParseError::IllegalMove { notation } => {
                write!(f, "illegal move '{notation}'")
            }
        }
    }
}

impl std::error::Error for MoveParseError {}

/// Error type for square parsing failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SquareError {
    /// Square notation has wrong length
    InvalidLength { len: usize },
    /// Square notation is out of range
    InvalidNotation { notation: String },
}

impl fmt::Display for SquareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SquareError::InvalidLength { len } => {
                write!(f, "square must be 2 characters, found {len}")
            }
            SquareError::InvalidNotation { notation } => {
                write!(f, "invalid square '{notation}'")
            }
        }
    }
}

impl std::error::Error for SquareError {}
