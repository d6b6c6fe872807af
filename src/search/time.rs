//! Time management.
//!
//! Derives a soft deadline (consulted between iterations) and a hard
//! deadline (enforced at node-count checkpoints) from the clock situation.

use std::time::Instant;

use super::Limits;

/// Default number of moves assumed to remain when the GUI gives none.
const DEFAULT_MOVES_TO_GO: u64 = 30;

#[derive(Clone, Copy, Debug)]
pub struct TimeManager {
    start: Instant,
    soft_ms: Option<u64>,
    hard_ms: Option<u64>,
}

impl TimeManager {
    /// Compute deadlines for a search starting now.
    #[must_use]
    pub fn new(limits: &Limits) -> Self {
        TimeManager::with_start(limits, Instant::now())
    }

    #[must_use]
    pub(crate) fn with_start(limits: &Limits, start: Instant) -> Self {
        let overhead = limits.move_overhead;

        // Depth-limited and infinite searches run untimed
        if limits.infinite || limits.depth.is_some() {
            return TimeManager {
                start,
                soft_ms: None,
                hard_ms: None,
            };
        }

        if let Some(movetime) = limits.movetime {
            return TimeManager {
                start,
                soft_ms: None,
                hard_ms: Some(movetime.saturating_sub(overhead).max(1)),
            };
        }

        // Self-managed: budget a share of the remaining clock
        let remaining = limits.time;
        let mtg = limits.movestogo.unwrap_or(DEFAULT_MOVES_TO_GO).max(1);
        let ideal = remaining / mtg + limits.inc * 3 / 4;
        let soft = ideal.min(remaining / 4);
        let hard = (ideal * 6).min(remaining / 2);

        TimeManager {
            start,
            soft_ms: Some(soft.saturating_sub(overhead).max(1)),
            hard_ms: Some(hard.saturating_sub(overhead).max(1)),
        }
    }

    #[inline]
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Checked between iterations; a small safety factor accounts for the
    /// next iteration costing at least as much as the last.
    #[must_use]
    pub fn soft_exceeded(&self) -> bool {
        match self.soft_ms {
            Some(soft) => self.elapsed_ms() + soft / 10 >= soft,
            None => false,
        }
    }

    /// Checked at node-count checkpoints inside the tree.
    #[must_use]
    pub fn hard_exceeded(&self) -> bool {
        match self.hard_ms {
            Some(hard) => self.elapsed_ms() >= hard,
            None => false,
        }
    }
}
