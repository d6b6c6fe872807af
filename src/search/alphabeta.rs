//! Principal-variation search with quiescence.

use std::sync::atomic::Ordering;

use crate::board::{Move, MoveList, Piece, MAX_PLY};
use crate::syzygy::Wdl;
use crate::tt::Bound;
use crate::uci::report;

use super::constants::{
    lmr_reduction, mate_in, mated_in, ASPIRATION_FACTOR, ASPIRATION_MIN_DEPTH, ASPIRATION_WINDOW,
    FUTILITY_MARGIN, FUTILITY_MAX_DEPTH, IIR_MIN_DEPTH, MATE, MATED_IN_MAX, MAX_HEIGHT,
    NULL_MOVE_MIN_DEPTH, QUIET_FUTILITY_BASE, QUIET_FUTILITY_MAX_DEPTH, QUIET_FUTILITY_PER_DEPTH,
    RAZOR_MARGIN, RAZOR_MAX_DEPTH, SEE_NOISY_MARGIN, SEE_PRUNE_MAX_DEPTH, SEE_QUIET_MARGIN,
    TB_WIN, VALUE_NONE,
};
use super::ordering::{is_noisy, score_moves, score_noisy};
use super::threads::{SearchContext, ThreadData};
use super::PVariation;

/// Node interval between abort-flag and clock checks.
const POLL_INTERVAL: u64 = 1024;

/// Milliseconds before currmove and re-search telemetry starts.
const REPORT_DELAY_MS: u64 = 2500;

impl ThreadData {
    /// Iterative deepening driver, run by every worker.
    pub(crate) fn iterative_deepening(&mut self, ctx: &SearchContext) {
        let main = self.index == 0;
        let max_depth = ctx
            .limits
            .depth
            .unwrap_or(MAX_PLY as i32 - 1)
            .clamp(1, MAX_PLY as i32 - 1);
        let mut values = vec![0i32; ctx.limits.multi_pv];

        for base in 1..=max_depth {
            // Helpers on odd indices run a ply deeper to desynchronise the
            // pool; the shared table does the rest
            let depth = if main {
                base
            } else {
                (base + (self.index as i32 & 1)).min(max_depth)
            };

            self.root_excluded.clear();
            let mut interrupted = false;

            for pv_index in 0..ctx.limits.multi_pv {
                let value = self.aspiration(ctx, depth, values[pv_index], pv_index);
                if self.stop_now(ctx) {
                    interrupted = true;
                    break;
                }
                values[pv_index] = value;

                let line = PVariation {
                    score: value,
                    line: self.pv_table[0][..self.pv_len[0]].to_vec(),
                };
                let best = line.best_move();
                if pv_index < self.best_lines.len() {
                    self.best_lines[pv_index] = line;
                } else {
                    self.best_lines.push(line);
                }
                if !best.is_none() {
                    self.root_excluded.push(best);
                }

                if main && !ctx.limits.silent {
                    self.report_iteration(ctx, depth, pv_index, value, None);
                }
            }

            if interrupted {
                break;
            }
            self.completed_depth = depth;

            if main && !ctx.ponder.is_pondering() && ctx.time.soft_exceeded() {
                break;
            }
        }

        self.flush_counters(ctx);
    }

    /// Search one depth inside an aspiration window, widening on failure.
    fn aspiration(&mut self, ctx: &SearchContext, depth: i32, prev: i32, pv_index: usize) -> i32 {
        let main = self.index == 0;
        let mut delta = ASPIRATION_WINDOW;
        let (mut alpha, mut beta) = if depth >= ASPIRATION_MIN_DEPTH {
            ((prev - delta).max(-MATE), (prev + delta).min(MATE))
        } else {
            (-MATE, MATE)
        };

        loop {
            let value = self.search(ctx, alpha, beta, depth, 0);
            if self.stop_now(ctx) {
                return value;
            }

            if value <= alpha && alpha > -MATE {
                if main && !ctx.limits.silent && ctx.time.elapsed_ms() >= REPORT_DELAY_MS {
                    self.report_iteration(ctx, depth, pv_index, value, Some("upperbound"));
                }
                alpha = (value - delta).max(-MATE);
            } else if value >= beta && beta < MATE {
                if main && !ctx.limits.silent && ctx.time.elapsed_ms() >= REPORT_DELAY_MS {
                    self.report_iteration(ctx, depth, pv_index, value, Some("lowerbound"));
                }
                beta = (value + delta).min(MATE);
            } else {
                return value;
            }

            delta *= ASPIRATION_FACTOR;
            if delta >= MATE {
                alpha = -MATE;
                beta = MATE;
            }
        }
    }

    /// The recursive alpha-beta search. `height` is the distance from the
    /// root; `depth` the remaining plies to the quiescence horizon.
    fn search(
        &mut self,
        ctx: &SearchContext,
        mut alpha: i32,
        mut beta: i32,
        mut depth: i32,
        height: usize,
    ) -> i32 {
        let pv_node = beta != alpha + 1;
        let root = height == 0;
        let in_check = self.board.in_check();

        // Drop into quiescence at the horizon; check evasions keep a ply
        if depth <= 0 && !in_check {
            return self.qsearch(ctx, alpha, beta, height);
        }
        depth = depth.max(1);

        self.pv_len[height] = 0;
        self.nodes += 1;
        if self.nodes % POLL_INTERVAL == 0 {
            self.poll(ctx);
        }
        if self.stop_now(ctx) {
            return 0;
        }
        self.seldepth = self.seldepth.max(height);

        if !root {
            if self.board.is_drawn(height) {
                return 0;
            }
            if height >= MAX_HEIGHT {
                return self.evaluate();
            }

            // Mate distance pruning: a shorter mate elsewhere bounds us
            alpha = alpha.max(mated_in(height));
            beta = beta.min(mate_in(height + 1));
            if alpha >= beta {
                return alpha;
            }
        }

        let mut tt_move = Move::NONE;
        let mut tt_eval = VALUE_NONE;
        if let Some(hit) = ctx.tt.probe(self.board.hash(), height) {
            tt_move = hit.mv;
            tt_eval = hit.eval;
            if !pv_node && hit.depth >= depth {
                let cutoff = match hit.bound {
                    Bound::Exact => true,
                    Bound::Lower => hit.value >= beta,
                    Bound::Upper => hit.value <= alpha,
                    Bound::None => false,
                };
                if cutoff {
                    return hit.value;
                }
            }
        }

        // Tablebase probe: few pieces, no castling, fresh fifty-move clock
        if !root
            && ctx.oracle.max_pieces() > 0
            && depth >= ctx.limits.syzygy_probe_depth
            && self.board.half_move_counter() == 0
            && self.board.castle_rooks.is_empty()
            && self.board.occupied().popcount() <= ctx.oracle.max_pieces()
        {
            if let Some(wdl) = ctx.oracle.probe_wdl(&self.board) {
                self.tbhits += 1;
                let value = match wdl {
                    Wdl::Win => TB_WIN - height as i32,
                    Wdl::Loss => -TB_WIN + height as i32,
                    Wdl::Draw | Wdl::CursedWin | Wdl::BlessedLoss => 0,
                };
                ctx.tt
                    .store(self.board.hash(), Move::NONE, value, 0, depth, Bound::Exact, height);
                return value;
            }
        }

        let eval = if in_check {
            -MATE
        } else if tt_eval != VALUE_NONE {
            tt_eval
        } else {
            self.evaluate()
        };
        self.eval_stack[height] = eval;
        let improving = !in_check && height >= 2 && eval > self.eval_stack[height - 2];

        // Razoring: hopeless static eval at the last plies
        if !pv_node && !in_check && depth <= RAZOR_MAX_DEPTH && eval + RAZOR_MARGIN * depth < alpha
        {
            return self.qsearch(ctx, alpha, beta, height);
        }

        // Reverse futility: the static eval already beats beta comfortably
        if !pv_node && !in_check && depth <= FUTILITY_MAX_DEPTH && eval - FUTILITY_MARGIN * depth >= beta
        {
            return eval;
        }

        // Null move: give the opponent a free tempo and still beat beta
        if !pv_node
            && !in_check
            && depth >= NULL_MOVE_MIN_DEPTH
            && eval >= beta
            && self.board.has_non_pawn_material(self.board.turn())
            && height >= 1
            && self.move_stack[height - 1].is_some()
        {
            let reduction = 2 + depth / 5;
            let undo = self.board.apply_null_move();
            self.move_stack[height] = None;
            let value = -self.search(ctx, -beta, -beta + 1, depth - 1 - reduction, height + 1);
            self.board.revert_null_move(&undo);
            if self.stop_now(ctx) {
                return 0;
            }
            if value >= beta {
                return beta;
            }
        }

        // Internal iterative reduction when the table offers no move
        if depth >= IIR_MIN_DEPTH && tt_move.is_none() {
            depth -= 1;
        }

        let mut list = MoveList::new();
        self.board.gen_all_legal_moves(&mut list);
        if list.is_empty() {
            return if in_check { mated_in(height) } else { 0 };
        }

        let prev1 = if height >= 1 {
            self.move_stack[height - 1]
        } else {
            None
        };
        let prev2 = if height >= 2 {
            self.move_stack[height - 2]
        } else {
            None
        };
        let mut picker = score_moves(
            &self.board,
            &self.tables,
            list,
            tt_move,
            height,
            prev1,
            prev2,
        );

        let original_alpha = alpha;
        let mut best = -MATE;
        let mut best_move = Move::NONE;
        let mut played = 0usize;
        let mut quiets_tried = MoveList::new();
        let mut skip_quiets = false;

        while let Some(mv) = picker.next() {
            if root && self.root_excluded.contains(&mv) {
                continue;
            }

            let quiet = !is_noisy(&self.board, mv);
            if quiet && skip_quiets && best > MATED_IN_MAX {
                continue;
            }

            // Quiet futility: shallow and far below alpha, stop trying quiets
            if quiet
                && !root
                && !pv_node
                && !in_check
                && depth <= QUIET_FUTILITY_MAX_DEPTH
                && eval + QUIET_FUTILITY_BASE + QUIET_FUTILITY_PER_DEPTH * depth <= alpha
                && best > MATED_IN_MAX
            {
                skip_quiets = true;
                continue;
            }

            // Prune moves that lose too much material for their depth
            if !root && best > MATED_IN_MAX && depth <= SEE_PRUNE_MAX_DEPTH {
                let margin = if quiet {
                    SEE_QUIET_MARGIN * depth
                } else {
                    SEE_NOISY_MARGIN * depth
                };
                if !self.board.see(mv, margin) {
                    continue;
                }
            }

            let piece = self
                .board
                .piece_at(mv.from())
                .map_or(Piece::Pawn, |(_, p)| p);

            let undo = self.board.apply_move(mv);
            self.move_stack[height] = Some((piece, mv.to()));
            played += 1;
            if quiet {
                quiets_tried.push(mv);
            }

            if root
                && self.index == 0
                && !ctx.limits.silent
                && ctx.time.elapsed_ms() >= REPORT_DELAY_MS
            {
                report::print_currmove(depth, mv, played, self.board.chess960());
            }

            let gives_check = self.board.in_check();
            let new_depth = depth - 1 + i32::from(in_check);

            let value = if played == 1 {
                -self.search(ctx, -beta, -alpha, new_depth, height + 1)
            } else {
                // Zero-window probe, reduced for late quiets
                let mut reduction = 0;
                if quiet && depth >= 3 && played >= 3 && !gives_check {
                    reduction = lmr_reduction(depth, played)
                        - i32::from(pv_node)
                        - i32::from(improving);
                    reduction = reduction.clamp(0, new_depth - 1);
                }

                let mut value =
                    -self.search(ctx, -alpha - 1, -alpha, new_depth - reduction, height + 1);
                if value > alpha && reduction > 0 {
                    value = -self.search(ctx, -alpha - 1, -alpha, new_depth, height + 1);
                }
                if value > alpha && value < beta && pv_node {
                    value = -self.search(ctx, -beta, -alpha, new_depth, height + 1);
                }
                value
            };

            self.board.revert_move(mv, &undo);
            if self.stop_now(ctx) {
                return 0;
            }

            if value > best {
                best = value;
                best_move = mv;
                if value > alpha {
                    alpha = value;
                    self.update_pv(height, mv);
                    if alpha >= beta {
                        if quiet {
                            self.tables.update_quiet_stats(
                                self.board.turn(),
                                height,
                                mv,
                                piece,
                                &quiets_tried,
                                depth,
                                prev1,
                                prev2,
                            );
                        }
                        break;
                    }
                }
            }
        }

        debug_assert!(played > 0, "pruning must never skip every move");

        let bound = if best >= beta {
            Bound::Lower
        } else if best > original_alpha {
            Bound::Exact
        } else {
            Bound::Upper
        };
        ctx.tt
            .store(self.board.hash(), best_move, best, eval, depth, bound, height);

        best
    }

    /// Quiescence: stand pat on the static eval, then try winning noisy
    /// moves only.
    fn qsearch(&mut self, ctx: &SearchContext, mut alpha: i32, beta: i32, height: usize) -> i32 {
        self.pv_len[height] = 0;
        self.nodes += 1;
        if self.nodes % POLL_INTERVAL == 0 {
            self.poll(ctx);
        }
        if self.stop_now(ctx) {
            return 0;
        }
        self.seldepth = self.seldepth.max(height);

        if self.board.is_drawn(height) {
            return 0;
        }
        if height >= MAX_HEIGHT {
            return self.evaluate();
        }

        let eval = self.evaluate();
        if eval >= beta {
            return eval;
        }
        alpha = alpha.max(eval);
        let mut best = eval;

        let mut list = MoveList::new();
        self.board.gen_all_noisy_moves(&mut list);
        let mut picker = score_noisy(&self.board, list);

        while let Some(mv) = picker.next() {
            // Losing exchanges cannot beat the stand-pat
            if !self.board.see(mv, 0) {
                continue;
            }

            let undo = self.board.apply_move(mv);
            let value = -self.qsearch(ctx, -beta, -alpha, height + 1);
            self.board.revert_move(mv, &undo);
            if self.stop_now(ctx) {
                return 0;
            }

            if value > best {
                best = value;
                if value > alpha {
                    alpha = value;
                    if alpha >= beta {
                        break;
                    }
                }
            }
        }

        best
    }

    #[inline]
    fn evaluate(&mut self) -> i32 {
        self.evaluator.evaluate(&self.board, &mut self.pk_cache)
    }

    /// Prepend `mv` to the child's principal variation.
    fn update_pv(&mut self, height: usize, mv: Move) {
        let child_len = if height + 1 < MAX_PLY {
            self.pv_len[height + 1].min(MAX_PLY - 1)
        } else {
            0
        };

        let (head, tail) = self.pv_table.split_at_mut(height + 1);
        let dst = &mut head[height];
        dst[0] = mv;
        if child_len > 0 {
            dst[1..=child_len].copy_from_slice(&tail[0][..child_len]);
        }
        self.pv_len[height] = child_len + 1;
    }

    /// The abort flag is honored only once a first iteration has finished;
    /// whatever happens, the search hands back a playable move.
    #[inline]
    fn stop_now(&self, ctx: &SearchContext) -> bool {
        ctx.aborted() && self.completed_depth > 0
    }

    /// Publish local counters and, on the main worker, enforce the hard
    /// deadline by raising the abort flag.
    fn poll(&mut self, ctx: &SearchContext) {
        self.flush_counters(ctx);
        if self.index == 0 && !ctx.ponder.is_pondering() && ctx.time.hard_exceeded() {
            ctx.abort.store(true, Ordering::Release);
        }
    }

    pub(crate) fn flush_counters(&self, ctx: &SearchContext) {
        ctx.nodes[self.index].store(self.nodes, Ordering::Relaxed);
        ctx.tbhits[self.index].store(self.tbhits, Ordering::Relaxed);
    }

    fn report_iteration(
        &self,
        ctx: &SearchContext,
        depth: i32,
        pv_index: usize,
        value: i32,
        bound: Option<&str>,
    ) {
        self.flush_counters(ctx);
        let time_ms = ctx.time.elapsed_ms();
        let nodes = ctx.total_nodes();
        report::print_iteration(&report::IterationReport {
            depth,
            seldepth: self.seldepth,
            multipv: pv_index + 1,
            value,
            bound,
            time_ms,
            nodes,
            nps: nodes * 1000 / time_ms.max(1),
            tbhits: ctx.total_tbhits(),
            hashfull: ctx.tt.hashfull(),
            pv: &self.pv_table[0][..self.pv_len[0]],
            chess960: self.board.chess960(),
        });
    }
}
