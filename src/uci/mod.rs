//! Universal Chess Interface command loop.
//!
//! One thread reads stdin and dispatches; `go` spawns a search thread that
//! holds the ready lock until its `bestmove` is printed, so `isready` can
//! prove quiescence by briefly acquiring the same lock.

pub mod command;
pub mod options;
pub mod report;

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::board::Board;
use crate::eval::{ClassicalEvaluator, Evaluate};
use crate::search::{get_best_move, Limits, PonderSignal, ThreadPool};
use crate::syzygy::{NoTablebase, Tablebase};
use crate::tt::TranspositionTable;

use command::{GoParams, UciCommand};
use options::{OptionAction, UciOptions};
use report::emit;

pub const ENGINE_NAME: &str = "basalt";
pub const ENGINE_AUTHOR: &str = "the basalt developers";

/// Search threads are deep recursers; give them room.
const SEARCH_STACK_SIZE: usize = 32 * 1024 * 1024;

/// Everything a search mutates, behind the ready lock.
struct EngineState {
    pool: ThreadPool,
    tt: Arc<TranspositionTable>,
}

struct Engine {
    options: UciOptions,
    board: Board,
    ready: Arc<Mutex<EngineState>>,
    abort: Arc<AtomicBool>,
    ponder: Arc<PonderSignal>,
    evaluator: Arc<dyn Evaluate>,
    oracle: Arc<dyn Tablebase>,
    search_thread: Option<JoinHandle<()>>,
}

impl Engine {
    fn new() -> Self {
        let evaluator: Arc<dyn Evaluate> = Arc::new(ClassicalEvaluator);
        let options = UciOptions::new();
        let state = EngineState {
            pool: ThreadPool::new(options.threads, Arc::clone(&evaluator)),
            tt: Arc::new(TranspositionTable::new(options.hash_mb)),
        };

        Engine {
            options,
            board: Board::new(),
            ready: Arc::new(Mutex::new(state)),
            abort: Arc::new(AtomicBool::new(false)),
            ponder: Arc::new(PonderSignal::new()),
            evaluator,
            oracle: Arc::new(NoTablebase),
            search_thread: None,
        }
    }

    /// Handle one command. Returns false on `quit`.
    fn dispatch(&mut self, cmd: UciCommand) -> bool {
        match cmd {
            UciCommand::Uci => {
                emit(&format!(
                    "id name {ENGINE_NAME} {}",
                    env!("CARGO_PKG_VERSION")
                ));
                emit(&format!("id author {ENGINE_AUTHOR}"));
                self.options.print_all();
                emit("uciok");
            }
            UciCommand::IsReady => {
                // Blocks until any in-flight search or reallocation is done
                drop(self.ready.lock());
                emit("readyok");
            }
            UciCommand::UciNewGame => self.new_game(),
            UciCommand::SetOption { name, value } => self.set_option(&name, value.as_deref()),
            UciCommand::Position { fen, moves } => self.position(fen.as_deref(), &moves),
            UciCommand::Go(params) => self.go(&params),
            UciCommand::PonderHit => self.ponder.lower(),
            UciCommand::Stop => self.stop(),
            UciCommand::Quit => {
                self.stop();
                return false;
            }
            UciCommand::Perft { depth } => {
                let mut board = self.board.clone();
                emit(&format!("{}", board.perft(depth)));
            }
            UciCommand::Print => {
                emit(&format!("{}", self.board));
                emit(&format!("fen: {}", self.board.to_fen()));
            }
        }
        true
    }

    fn new_game(&mut self) {
        self.join_finished_search();
        let mut state = self.ready.lock();
        state.tt.clear();
        state.pool.reset();
        self.board = Board::new();
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) {
        match self.options.apply(name, value) {
            Some(OptionAction::ResizeHash(mb)) => {
                let mut state = self.ready.lock();
                state.tt = Arc::new(TranspositionTable::new(mb));
                #[cfg(feature = "logging")]
                log::info!("hash resized to {mb} MB");
            }
            Some(OptionAction::RebuildThreads(count)) => {
                let mut state = self.ready.lock();
                state.pool = ThreadPool::new(count, Arc::clone(&self.evaluator));
                #[cfg(feature = "logging")]
                log::info!("thread pool rebuilt with {count} workers");
            }
            None => {
                // Chess960 toggling retags the current position
                self.board.chess960 = self.options.chess960;
            }
        }
    }

    fn position(&mut self, fen: Option<&str>, moves: &[String]) {
        let mut board = match fen {
            None => {
                let mut board = Board::new();
                board.chess960 = self.options.chess960;
                board
            }
            Some(fen) => match Board::from_fen_with_variant(fen, self.options.chess960) {
                Ok(board) => board,
                // Keep the previous valid position, say nothing
                Err(_) => return,
            },
        };

        for text in moves {
            // The first unknown move ends the sequence
            let Ok(mv) = board.parse_move(text) else { break };
            board.apply_move(mv);
            // Positions before an irreversible move can never recur
            if board.half_move_counter() == 0 {
                board.reset_history();
            }
        }

        self.board = board;
    }

    fn go(&mut self, params: &GoParams) {
        self.join_finished_search();

        let (time, inc) = match self.board.turn() {
            crate::board::Color::White => (params.wtime, params.winc),
            crate::board::Color::Black => (params.btime, params.binc),
        };

        let limits = Limits {
            time: time.unwrap_or(0),
            inc: inc.unwrap_or(0),
            movestogo: params.movestogo,
            movetime: params.movetime,
            depth: params.depth,
            infinite: params.infinite,
            ponder: params.ponder,
            multi_pv: self.options.multi_pv,
            move_overhead: self.options.move_overhead,
            syzygy_probe_depth: self.options.syzygy_probe_depth,
            silent: false,
        };

        // Flags are prepared here, synchronously: a stop or ponderhit that
        // arrives right after go must see them in their armed state
        self.abort.store(false, Ordering::Release);
        if params.ponder {
            self.ponder.raise();
        }

        let board = self.board.clone();
        let ready = Arc::clone(&self.ready);
        let abort = Arc::clone(&self.abort);
        let ponder = Arc::clone(&self.ponder);
        let oracle = Arc::clone(&self.oracle);
        let chess960 = board.chess960();

        let spawned = thread::Builder::new()
            .name("search".into())
            .stack_size(SEARCH_STACK_SIZE)
            .spawn(move || {
                // Ready lock held until bestmove is out, on every exit path
                let mut state = ready.lock();
                let tt = Arc::clone(&state.tt);
                let result =
                    get_best_move(&mut state.pool, &board, limits, tt, abort, ponder, oracle);
                report::print_bestmove(result.best_move, result.ponder_move, chess960);
            });

        match spawned {
            Ok(handle) => self.search_thread = Some(handle),
            Err(_) => emit("info string failed to spawn search thread"),
        }
    }

    /// `stop`: raise the abort flag, release any ponder wait, then join.
    /// A stop with no search running is a no-op.
    fn stop(&mut self) {
        self.abort.store(true, Ordering::Release);
        self.ponder.lower();
        if let Some(handle) = self.search_thread.take() {
            let _ = handle.join();
        }
    }

    /// Reap a search thread that has already printed its bestmove.
    fn join_finished_search(&mut self) {
        if let Some(handle) = self.search_thread.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                // Still running; keep the handle so stop/quit can join it
                self.search_thread = Some(handle);
            }
        }
    }
}

/// Read stdin line by line and dispatch until `quit` or EOF.
pub fn run_uci_loop() {
    crate::init();

    let mut engine = Engine::new();
    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if let Some(cmd) = command::parse_command(&line) {
            if !engine.dispatch(cmd) {
                return;
            }
        }
    }

    // EOF without quit; make sure a running search is not left behind
    engine.stop();
}
