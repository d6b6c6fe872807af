//! End-to-end tests driving the compiled engine binary over pipes.

use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Feed `input` to the engine and capture everything it printed.
fn run_engine(input: &str) -> String {
    let exe = env!("CARGO_BIN_EXE_basalt");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    child
        .stdin
        .as_mut()
        .expect("stdin piped")
        .write_all(input.as_bytes())
        .expect("write to engine");

    let output = child.wait_with_output().expect("read engine output");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn last_bestmove(output: &str) -> String {
    output
        .lines()
        .filter(|line| line.starts_with("bestmove"))
        .last()
        .unwrap_or_else(|| panic!("no bestmove in output:\n{output}"))
        .split_whitespace()
        .nth(1)
        .expect("bestmove carries a move")
        .to_string()
}

#[test]
fn uci_handshake_lists_all_options() {
    let output = run_engine("uci\nquit\n");

    assert!(output.contains("id name basalt"));
    assert!(output.contains("id author"));
    for option in [
        "option name Hash type spin default 16 min 1 max 65536",
        "option name Threads type spin default 1 min 1 max 2048",
        "option name MultiPV type spin default 1 min 1 max 256",
        "option name MoveOverhead type spin default 100 min 0 max 10000",
        "option name SyzygyPath type string",
        "option name SyzygyProbeDepth type spin default 0 min 0 max 127",
        "option name Ponder type check default false",
        "option name UCI_Chess960 type check default false",
    ] {
        assert!(output.contains(option), "missing: {option}\n{output}");
    }
    assert!(output.contains("uciok"));
}

#[test]
fn isready_answers_readyok() {
    let output = run_engine("uci\nisready\nquit\n");
    assert!(output.contains("readyok"));
}

#[test]
fn go_depth_one_plays_an_opening_move() {
    let output = run_engine("ucinewgame\nposition startpos\ngo depth 1\nquit\n");
    let mv = last_bestmove(&output);

    let mut board = basalt::board::Board::new();
    assert!(
        board.parse_move(&mv).is_ok(),
        "bestmove {mv} is not a legal opening move"
    );
}

#[test]
fn perft_from_position_command() {
    let output = run_engine("position startpos\nperft 1\nquit\n");
    assert!(output.lines().any(|line| line.trim() == "20"), "{output}");

    let output = run_engine("position startpos moves e2e4 e7e5\nperft 1\nquit\n");
    assert!(output.lines().any(|line| line.trim() == "29"), "{output}");
}

#[test]
fn info_lines_carry_telemetry_fields() {
    let output = run_engine("position startpos\ngo depth 6\nquit\n");
    let info = output
        .lines()
        .filter(|line| line.starts_with("info depth"))
        .last()
        .expect("expected info lines");

    for field in ["seldepth", "multipv", "score", "time", "nodes", "nps", "tbhits", "hashfull", "pv"] {
        assert!(info.contains(field), "missing {field} in: {info}");
    }
}

#[test]
fn rook_endgame_scores_decisively() {
    let output = run_engine(
        "position fen 6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1\ngo depth 10\nquit\n",
    );
    last_bestmove(&output);

    let score: i32 = output
        .lines()
        .filter(|line| line.contains("score cp "))
        .last()
        .and_then(|line| {
            let idx = line.find("score cp ")? + "score cp ".len();
            line[idx..].split_whitespace().next()?.parse().ok()
        })
        .expect("expected a cp score");
    assert!(score > 400, "expected a winning score, got {score}");
}

#[test]
fn stop_interrupts_infinite_search() {
    let exe = env!("CARGO_BIN_EXE_basalt");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    let stdin = child.stdin.as_mut().expect("stdin piped");
    stdin
        .write_all(b"position startpos\ngo infinite\n")
        .expect("start infinite search");
    std::thread::sleep(std::time::Duration::from_millis(300));

    let stop_sent = Instant::now();
    stdin.write_all(b"stop\nquit\n").expect("send stop");

    let output = child.wait_with_output().expect("read engine output");
    let elapsed = stop_sent.elapsed();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("bestmove"), "{stdout}");
    assert!(
        elapsed.as_millis() < 2000,
        "stop took {elapsed:?} to produce bestmove"
    );
}

#[test]
fn position_moves_reach_the_expected_position() {
    let output = run_engine("position startpos moves e2e4 e7e5 g1f3\nprint\nquit\n");
    assert!(output.contains("fen: rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"));
}

#[test]
fn illegal_move_stops_the_move_list() {
    // e7e5 is illegal for white mid-list; board keeps moves applied so far
    let output = run_engine("position startpos moves e2e4 e7e5 e5e6\nprint\nquit\n");
    assert!(
        output.contains("fen: rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"),
        "{output}"
    );
}

#[test]
fn malformed_lines_are_ignored() {
    let output = run_engine("bogus command\nposition startpos\ngo depth 1\nquit\n");
    assert!(output.contains("bestmove"));
}

#[test]
fn multipv_reports_multiple_lines() {
    let output = run_engine(
        "setoption name MultiPV value 3\nposition startpos\ngo depth 5\nquit\n",
    );
    assert!(output.contains("multipv 1"));
    assert!(output.contains("multipv 2"));
    assert!(output.contains("multipv 3"));
}
