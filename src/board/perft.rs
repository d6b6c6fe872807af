//! Perft: exhaustive move-tree leaf counting.
//!
//! The exact node counts are the correctness oracle for move generation
//! and make/unmake; see the test table under `board/tests`.

use super::state::Board;
use super::types::MoveList;

impl Board {
    /// Count leaf nodes of the legal move tree to `depth`.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }

        let mut moves = MoveList::new();
        self.gen_all_legal_moves(&mut moves);

        if depth == 1 {
            return moves.len() as u64;
        }

        let mut nodes = 0;
        for &mv in moves.iter() {
            let undo = self.apply_move(mv);
            nodes += self.perft(depth - 1);
            self.revert_move(mv, &undo);
        }
        nodes
    }

    /// Per-root-move breakdown of `perft`, for debugging generation bugs.
    #[must_use]
    pub fn perft_divide(&mut self, depth: usize) -> Vec<(String, u64)> {
        let mut moves = MoveList::new();
        self.gen_all_legal_moves(&mut moves);

        let mut results = Vec::with_capacity(moves.len());
        for &mv in moves.iter() {
            let undo = self.apply_move(mv);
            let nodes = if depth > 1 { self.perft(depth - 1) } else { 1 };
            self.revert_move(mv, &undo);
            results.push((mv.to_uci(self.chess960()), nodes));
        }
        results
    }
}
