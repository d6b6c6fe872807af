//! Worker threads and Lazy-SMP coordination.
//!
//! Each worker owns a copy of the root position and its move-ordering
//! tables. The transposition table is the only large shared region; the
//! abort and ponder flags are the only other cross-thread state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::board::{Board, Move, MAX_PLY};
use crate::eval::{Evaluate, PawnKingCache};
use crate::syzygy::{Tablebase, Wdl};
use crate::tt::TranspositionTable;
use crate::uci::report;

use super::ordering::{OrderingTables, PrevMove};
use super::time::TimeManager;
use super::{Limits, PVariation, SearchResult};

/// The ponder barrier: `bestmove` may not be printed while the flag is up.
/// `ponderhit` and `stop` lower it and wake the waiting search thread.
pub struct PonderSignal {
    flag: AtomicBool,
    lock: Mutex<()>,
    cond: Condvar,
}

impl PonderSignal {
    #[must_use]
    pub fn new() -> Self {
        PonderSignal {
            flag: AtomicBool::new(false),
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Lower the flag and wake anyone blocked in `wait_lowered`.
    pub fn lower(&self) {
        self.flag.store(false, Ordering::Release);
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    #[inline]
    #[must_use]
    pub fn is_pondering(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Block until the flag is lowered.
    pub fn wait_lowered(&self) {
        let mut guard = self.lock.lock();
        while self.flag.load(Ordering::Acquire) {
            self.cond.wait(&mut guard);
        }
    }
}

impl Default for PonderSignal {
    fn default() -> Self {
        PonderSignal::new()
    }
}

/// Per-`go` shared state, read by every worker.
pub(crate) struct SearchContext {
    pub tt: Arc<TranspositionTable>,
    pub abort: Arc<AtomicBool>,
    pub ponder: Arc<PonderSignal>,
    pub oracle: Arc<dyn Tablebase>,
    pub time: TimeManager,
    pub limits: Limits,
    /// Node counters, one slot per worker, flushed at poll points
    pub nodes: Vec<AtomicU64>,
    pub tbhits: Vec<AtomicU64>,
}

impl SearchContext {
    pub(crate) fn total_nodes(&self) -> u64 {
        self.nodes.iter().map(|n| n.load(Ordering::Relaxed)).sum()
    }

    pub(crate) fn total_tbhits(&self) -> u64 {
        self.tbhits.iter().map(|n| n.load(Ordering::Relaxed)).sum()
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::Acquire)
    }
}

/// One search worker: its board copy, heuristic tables and counters.
pub(crate) struct ThreadData {
    pub index: usize,
    pub board: Board,
    pub tables: OrderingTables,
    pub pk_cache: PawnKingCache,
    pub evaluator: Arc<dyn Evaluate>,
    pub nodes: u64,
    pub tbhits: u64,
    pub seldepth: usize,
    pub completed_depth: i32,
    /// Last fully searched line per MultiPV slot
    pub best_lines: Vec<PVariation>,
    /// Root moves already reported by earlier MultiPV passes
    pub root_excluded: Vec<Move>,
    pub pv_table: Vec<[Move; MAX_PLY]>,
    pub pv_len: [usize; MAX_PLY],
    pub eval_stack: [i32; MAX_PLY],
    pub move_stack: [PrevMove; MAX_PLY],
}

impl ThreadData {
    fn new(index: usize, evaluator: Arc<dyn Evaluate>) -> Self {
        ThreadData {
            index,
            board: Board::new(),
            tables: OrderingTables::new(),
            pk_cache: PawnKingCache::new(),
            evaluator,
            nodes: 0,
            tbhits: 0,
            seldepth: 0,
            completed_depth: 0,
            best_lines: Vec::new(),
            root_excluded: Vec::new(),
            pv_table: vec![[Move::NONE; MAX_PLY]; MAX_PLY],
            pv_len: [0; MAX_PLY],
            eval_stack: [0; MAX_PLY],
            move_stack: [None; MAX_PLY],
        }
    }

    /// Reset per-search state; heuristic tables persist between searches.
    fn prepare(&mut self, board: &Board) {
        self.board = board.clone();
        self.nodes = 0;
        self.tbhits = 0;
        self.seldepth = 0;
        self.completed_depth = 0;
        self.best_lines.clear();
        self.root_excluded.clear();
        self.pv_len = [0; MAX_PLY];
        self.eval_stack = [0; MAX_PLY];
        self.move_stack = [None; MAX_PLY];
    }
}

/// The Lazy-SMP worker pool. Owns per-thread heuristic state across
/// searches; actual OS threads are scoped to each `go`.
pub struct ThreadPool {
    pub(crate) threads: Vec<ThreadData>,
}

impl ThreadPool {
    #[must_use]
    pub fn new(count: usize, evaluator: Arc<dyn Evaluate>) -> Self {
        let count = count.max(1);
        ThreadPool {
            threads: (0..count)
                .map(|i| ThreadData::new(i, Arc::clone(&evaluator)))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Zero every move-ordering table and counter; used by `ucinewgame`.
    pub fn reset(&mut self) {
        for td in &mut self.threads {
            td.tables.clear();
            td.pk_cache.clear();
            td.nodes = 0;
            td.tbhits = 0;
        }
    }

    /// Nodes searched by all workers in the last search.
    #[must_use]
    pub fn nodes_searched(&self) -> u64 {
        self.threads.iter().map(|td| td.nodes).sum()
    }

    /// Tablebase hits across all workers in the last search.
    #[must_use]
    pub fn tbhits(&self) -> u64 {
        self.threads.iter().map(|td| td.tbhits).sum()
    }
}

/// Map a root tablebase result onto a reportable score.
fn wdl_score(wdl: Wdl) -> i32 {
    use super::constants::TB_WIN;
    match wdl {
        Wdl::Win => TB_WIN,
        Wdl::Loss => -TB_WIN,
        Wdl::Draw | Wdl::CursedWin | Wdl::BlessedLoss => 0,
    }
}

/// Run a full search and return its result.
///
/// The caller prepares the control flags before handing them over: `abort`
/// cleared and `ponder` raised for a ponder search. Doing it here instead
/// would lose a `stop` or `ponderhit` that lands between `go` and the
/// search thread actually starting. Spawns `pool.len() - 1` helper
/// workers; the calling thread doubles as worker zero. Returns only after
/// every helper has joined and any ponder barrier has been lowered.
pub fn get_best_move(
    pool: &mut ThreadPool,
    board: &Board,
    limits: Limits,
    tt: Arc<TranspositionTable>,
    abort: Arc<AtomicBool>,
    ponder: Arc<PonderSignal>,
    oracle: Arc<dyn Tablebase>,
) -> SearchResult {
    tt.update();

    // Tablebase short-circuit at the root
    if oracle.max_pieces() > 0
        && board.occupied().popcount() <= oracle.max_pieces()
        && board.castle_rooks.is_empty()
    {
        if let Some((mv, wdl)) = oracle.probe_root(board) {
            if !limits.silent {
                report::print_tb_root(wdl_score(wdl), mv, board.chess960());
            }
            ponder.wait_lowered();
            return SearchResult {
                best_move: mv,
                ponder_move: Move::NONE,
                score: wdl_score(wdl),
                depth: 0,
            };
        }
    }

    let mut limits = limits;
    let legal = board.clone().legal_move_count();
    limits.multi_pv = limits.multi_pv.clamp(1, legal.max(1));

    let worker_count = pool.len();
    let ctx = SearchContext {
        tt,
        abort,
        ponder,
        oracle,
        time: TimeManager::new(&limits),
        limits,
        nodes: (0..worker_count).map(|_| AtomicU64::new(0)).collect(),
        tbhits: (0..worker_count).map(|_| AtomicU64::new(0)).collect(),
    };

    for td in &mut pool.threads {
        td.prepare(board);
    }

    let (main_td, helpers) = pool
        .threads
        .split_first_mut()
        .expect("thread pool is never empty");

    thread::scope(|s| {
        for td in helpers.iter_mut() {
            let ctx = &ctx;
            s.spawn(move || td.iterative_deepening(ctx));
        }
        main_td.iterative_deepening(&ctx);
        // Main is done deciding; helpers stand down and the scope joins them
        ctx.abort.store(true, Ordering::Release);
    });

    // The protocol forbids bestmove while the GUI still has us pondering
    ctx.ponder.wait_lowered();

    let main = &pool.threads[0];
    let line = main.best_lines.first().cloned().unwrap_or_default();
    SearchResult {
        best_move: line.best_move(),
        ponder_move: line.ponder_move(),
        score: line.score,
        depth: main.completed_depth,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::ClassicalEvaluator;
    use crate::syzygy::NoTablebase;

    fn search_position(fen: &str, depth: i32) -> SearchResult {
        let board = Board::from_fen(fen).unwrap();
        let mut pool = ThreadPool::new(1, Arc::new(ClassicalEvaluator));
        let limits = Limits {
            depth: Some(depth),
            silent: true,
            ..Limits::default()
        };
        get_best_move(
            &mut pool,
            &board,
            limits,
            Arc::new(TranspositionTable::new(16)),
            Arc::new(AtomicBool::new(false)),
            Arc::new(PonderSignal::new()),
            Arc::new(NoTablebase),
        )
    }

    #[test]
    fn test_returns_legal_opening_move() {
        let result = search_position(crate::board::START_FEN, 3);
        let mut board = Board::new();
        assert!(board.parse_move(&result.best_move.to_uci(false)).is_ok());
    }

    #[test]
    fn test_checkmated_position_returns_no_move() {
        // Fool's mate: white is checkmated
        let result = search_position(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            4,
        );
        assert!(result.best_move.is_none());
        assert!(result.ponder_move.is_none());
        assert_eq!(result.score, -crate::search::constants::MATE);
    }

    #[test]
    fn test_stalemate_scores_zero() {
        let result = search_position("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1", 4);
        assert!(result.best_move.is_none());
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_finds_mate_in_one() {
        // Back-rank mate with the rook
        let result = search_position("6k1/5ppp/8/8/8/8/8/R3K3 w - - 0 1", 4);
        assert_eq!(result.best_move.to_uci(false), "a1a8");
        assert!(result.score >= crate::search::constants::MATE_IN_MAX);
    }

    #[test]
    fn test_multithreaded_search_is_legal() {
        let board = Board::new();
        let mut pool = ThreadPool::new(4, Arc::new(ClassicalEvaluator));
        let limits = Limits {
            depth: Some(5),
            silent: true,
            ..Limits::default()
        };
        let result = get_best_move(
            &mut pool,
            &board,
            limits,
            Arc::new(TranspositionTable::new(16)),
            Arc::new(AtomicBool::new(false)),
            Arc::new(PonderSignal::new()),
            Arc::new(NoTablebase),
        );
        let mut check = Board::new();
        assert!(check.parse_move(&result.best_move.to_uci(false)).is_ok());
    }
}
