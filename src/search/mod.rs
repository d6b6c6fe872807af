//! Iterative-deepening alpha-beta search.
//!
//! A principal-variation search with quiescence, transposition-table
//! cutoffs, null-move pruning, late-move reductions and aspiration
//! windows, run on a Lazy-SMP thread pool. Workers share only the
//! transposition table and two atomic control flags.

mod alphabeta;
pub mod constants;
pub mod ordering;
mod threads;
mod time;

pub use threads::{get_best_move, PonderSignal, ThreadPool};
pub use time::TimeManager;

use crate::board::Move;

/// Everything `go` told us about how long and deep to search.
#[derive(Clone, Debug)]
pub struct Limits {
    /// Remaining clock for the side to move, ms
    pub time: u64,
    /// Increment for the side to move, ms
    pub inc: u64,
    pub movestogo: Option<u64>,
    pub movetime: Option<u64>,
    pub depth: Option<i32>,
    pub infinite: bool,
    pub ponder: bool,
    pub multi_pv: usize,
    pub move_overhead: u64,
    pub syzygy_probe_depth: i32,
    /// Suppress info output; used by tests and the bench harness
    pub silent: bool,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            time: 0,
            inc: 0,
            movestogo: None,
            movetime: None,
            depth: None,
            infinite: false,
            ponder: false,
            multi_pv: 1,
            move_overhead: 100,
            syzygy_probe_depth: 0,
            silent: false,
        }
    }
}

/// What a finished search hands back to the dispatcher.
#[derive(Clone, Copy, Debug)]
pub struct SearchResult {
    pub best_move: Move,
    pub ponder_move: Move,
    /// Score of the principal line, side to move's view
    pub score: i32,
    /// Deepest fully completed iteration
    pub depth: i32,
}

/// A principal variation: the score and the expected line of play.
#[derive(Clone, Default, Debug)]
pub struct PVariation {
    pub score: i32,
    pub line: Vec<Move>,
}

impl PVariation {
    /// The move to play, if the line is non-empty.
    #[must_use]
    pub fn best_move(&self) -> Move {
        self.line.first().copied().unwrap_or(Move::NONE)
    }

    /// The expected reply, for pondering.
    #[must_use]
    pub fn ponder_move(&self) -> Move {
        self.line.get(1).copied().unwrap_or(Move::NONE)
    }
}
