//! Endgame tablebase oracle interface.
//!
//! File-format probing is external to this crate; the search consumes an
//! injected [`Tablebase`] capability and treats every failure as a miss,
//! falling through to normal search.

use crate::board::{Board, Move};

/// Win/draw/loss classification from the probing side's point of view.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Wdl {
    Loss,
    /// Lost, but saved by the fifty-move rule
    BlessedLoss,
    Draw,
    /// Won, but spoiled by the fifty-move rule
    CursedWin,
    Win,
}

/// Tablebase probing capability.
///
/// `None` results mean "no table, probe failed, or position out of range";
/// the caller never distinguishes these.
pub trait Tablebase: Send + Sync {
    /// Largest piece count covered by the available tables; zero when none.
    fn max_pieces(&self) -> u32;

    /// WDL probe for interior search nodes.
    fn probe_wdl(&self, board: &Board) -> Option<Wdl>;

    /// Root probe returning a DTZ-optimal move and its classification.
    fn probe_root(&self, board: &Board) -> Option<(Move, Wdl)>;
}

/// The default oracle: no tables on disk, every probe misses.
pub struct NoTablebase;

impl Tablebase for NoTablebase {
    fn max_pieces(&self) -> u32 {
        0
    }

    fn probe_wdl(&self, _board: &Board) -> Option<Wdl> {
        None
    }

    fn probe_root(&self, _board: &Board) -> Option<(Move, Wdl)> {
        None
    }
}
