//! UCI options: declaration, parsing and application.

use super::report::emit;

/// Current option values and their defaults.
pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub multi_pv: usize,
    pub move_overhead: u64,
    pub syzygy_path: Option<String>,
    pub syzygy_probe_depth: i32,
    pub ponder: bool,
    pub chess960: bool,
}

/// Side effects an option change requires from the engine.
pub enum OptionAction {
    ResizeHash(usize),
    RebuildThreads(usize),
}

impl UciOptions {
    #[must_use]
    pub fn new() -> Self {
        UciOptions {
            hash_mb: 16,
            threads: 1,
            multi_pv: 1,
            move_overhead: 100,
            syzygy_path: None,
            syzygy_probe_depth: 0,
            ponder: false,
            chess960: false,
        }
    }

    /// The `option ...` block of the `uci` handshake.
    pub fn print_all(&self) {
        print_spin("Hash", self.hash_mb, 1, 65536);
        print_spin("Threads", self.threads, 1, 2048);
        print_spin("MultiPV", self.multi_pv, 1, 256);
        print_spin("MoveOverhead", self.move_overhead, 0, 10000);
        emit("option name SyzygyPath type string default <empty>");
        print_spin("SyzygyProbeDepth", self.syzygy_probe_depth, 0, 127);
        print_check("Ponder", self.ponder);
        print_check("UCI_Chess960", self.chess960);
    }

    /// Apply a `setoption` pair. Unknown names are ignored; the match is
    /// exclusive, mirroring UCI's one-option-per-line semantics.
    pub fn apply(&mut self, name: &str, value: Option<&str>) -> Option<OptionAction> {
        let name = name.trim().to_ascii_lowercase();

        if name == "hash" {
            if let Some(mb) = value.and_then(|v| v.parse::<usize>().ok()) {
                self.hash_mb = mb.clamp(1, 65536);
                return Some(OptionAction::ResizeHash(self.hash_mb));
            }
        } else if name == "threads" {
            if let Some(n) = value.and_then(|v| v.parse::<usize>().ok()) {
                self.threads = n.clamp(1, 2048);
                return Some(OptionAction::RebuildThreads(self.threads));
            }
        } else if name == "multipv" {
            if let Some(n) = value.and_then(|v| v.parse::<usize>().ok()) {
                self.multi_pv = n.clamp(1, 256);
            }
        } else if name == "moveoverhead" {
            if let Some(ms) = value.and_then(|v| v.parse::<u64>().ok()) {
                self.move_overhead = ms.min(10_000);
            }
        } else if name == "syzygypath" {
            self.syzygy_path = value
                .filter(|v| !v.is_empty() && *v != "<empty>")
                .map(str::to_string);
        } else if name == "syzygyprobedepth" {
            if let Some(depth) = value.and_then(|v| v.parse::<i32>().ok()) {
                self.syzygy_probe_depth = depth.clamp(0, 127);
            }
        } else if name == "ponder" {
            self.ponder = value == Some("true");
        } else if name == "uci_chess960" {
            self.chess960 = value == Some("true");
        }

        None
    }
}

impl Default for UciOptions {
    fn default() -> Self {
        UciOptions::new()
    }
}

fn print_spin(name: &str, default: impl std::fmt::Display, min: i64, max: i64) {
    emit(&format!(
        "option name {name} type spin default {default} min {min} max {max}"
    ));
}

fn print_check(name: &str, default: bool) {
    emit(&format!(
        "option name {name} type check default {}",
        if default { "true" } else { "false" }
    ));
}
