//! UCI command parsing.
//!
//! Unrecognised lines parse to `None` and are ignored by the loop.

/// Time-control and limit arguments of a `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub wtime: Option<u64>,
    pub btime: Option<u64>,
    pub winc: Option<u64>,
    pub binc: Option<u64>,
    pub movestogo: Option<u64>,
    pub depth: Option<i32>,
    pub movetime: Option<u64>,
    pub infinite: bool,
    pub ponder: bool,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption {
        name: String,
        value: Option<String>,
    },
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go(GoParams),
    PonderHit,
    Stop,
    Quit,
    Perft {
        depth: usize,
    },
    Print,
}

/// Parse one line of input. Returns `None` for anything malformed.
#[must_use]
pub fn parse_command(line: &str) -> Option<UciCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let verb = parts.first()?;

    match *verb {
        "uci" => Some(UciCommand::Uci),
        "isready" => Some(UciCommand::IsReady),
        "ucinewgame" => Some(UciCommand::UciNewGame),
        "setoption" => parse_setoption(&parts),
        "position" => parse_position(&parts),
        "go" => Some(UciCommand::Go(parse_go(&parts))),
        "ponderhit" => Some(UciCommand::PonderHit),
        "stop" => Some(UciCommand::Stop),
        "quit" => Some(UciCommand::Quit),
        // Depth is the first whitespace-delimited decimal token
        "perft" => {
            let depth = parts.get(1)?.parse().ok()?;
            Some(UciCommand::Perft { depth })
        }
        "print" => Some(UciCommand::Print),
        _ => None,
    }
}

fn parse_setoption(parts: &[&str]) -> Option<UciCommand> {
    // setoption name <tokens...> [value <tokens...>]
    let mut i = parts.iter().position(|&p| p == "name")? + 1;
    let mut name_tokens = Vec::new();
    while i < parts.len() && parts[i] != "value" {
        name_tokens.push(parts[i]);
        i += 1;
    }
    if name_tokens.is_empty() {
        return None;
    }

    let value = if i < parts.len() && parts[i] == "value" {
        Some(parts[i + 1..].join(" "))
    } else {
        None
    };

    Some(UciCommand::SetOption {
        name: name_tokens.join(" "),
        value,
    })
}

fn parse_position(parts: &[&str]) -> Option<UciCommand> {
    let mut i = 1;
    let fen = match parts.get(i)? {
        &"startpos" => {
            i += 1;
            None
        }
        &"fen" => {
            i += 1;
            let start = i;
            while i < parts.len() && parts[i] != "moves" {
                i += 1;
            }
            if start == i {
                return None;
            }
            Some(parts[start..i].join(" "))
        }
        _ => return None,
    };

    let mut moves = Vec::new();
    if parts.get(i) == Some(&"moves") {
        moves.extend(parts[i + 1..].iter().map(|s| (*s).to_string()));
    }

    Some(UciCommand::Position { fen, moves })
}

fn parse_go(parts: &[&str]) -> GoParams {
    let mut params = GoParams::default();
    let mut i = 1;

    while i < parts.len() {
        let take = |offset: usize| parts.get(i + offset).and_then(|s| s.parse().ok());
        match parts[i] {
            "wtime" => {
                params.wtime = take(1);
                i += 2;
            }
            "btime" => {
                params.btime = take(1);
                i += 2;
            }
            "winc" => {
                params.winc = take(1);
                i += 2;
            }
            "binc" => {
                params.binc = take(1);
                i += 2;
            }
            "movestogo" => {
                params.movestogo = take(1);
                i += 2;
            }
            "depth" => {
                params.depth = parts.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "movetime" => {
                params.movetime = take(1);
                i += 2;
            }
            "infinite" => {
                params.infinite = true;
                i += 1;
            }
            "ponder" => {
                params.ponder = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_verbs() {
        assert_eq!(parse_command("uci"), Some(UciCommand::Uci));
        assert_eq!(parse_command("isready"), Some(UciCommand::IsReady));
        assert_eq!(parse_command("stop"), Some(UciCommand::Stop));
        assert_eq!(parse_command("quit"), Some(UciCommand::Quit));
        assert_eq!(parse_command("garbage in"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_position_startpos_with_moves() {
        let cmd = parse_command("position startpos moves e2e4 e7e5").unwrap();
        assert_eq!(
            cmd,
            UciCommand::Position {
                fen: None,
                moves: vec!["e2e4".into(), "e7e5".into()],
            }
        );
    }

    #[test]
    fn test_position_fen() {
        let cmd =
            parse_command("position fen 8/8/8/8/8/8/6k1/4K2R w K - 0 1 moves e1g1").unwrap();
        assert_eq!(
            cmd,
            UciCommand::Position {
                fen: Some("8/8/8/8/8/8/6k1/4K2R w K - 0 1".into()),
                moves: vec!["e1g1".into()],
            }
        );
    }

    #[test]
    fn test_go_time_controls() {
        let cmd = parse_command("go wtime 30000 btime 28000 winc 100 binc 100 movestogo 20");
        let Some(UciCommand::Go(params)) = cmd else {
            panic!("expected go");
        };
        assert_eq!(params.wtime, Some(30_000));
        assert_eq!(params.btime, Some(28_000));
        assert_eq!(params.winc, Some(100));
        assert_eq!(params.movestogo, Some(20));
        assert!(!params.infinite);
    }

    #[test]
    fn test_go_depth_and_flags() {
        let Some(UciCommand::Go(params)) = parse_command("go depth 9 ponder") else {
            panic!("expected go");
        };
        assert_eq!(params.depth, Some(9));
        assert!(params.ponder);

        let Some(UciCommand::Go(params)) = parse_command("go infinite") else {
            panic!("expected go");
        };
        assert!(params.infinite);
    }

    #[test]
    fn test_setoption_multiword_name() {
        let cmd = parse_command("setoption name Move Overhead value 250").unwrap();
        assert_eq!(
            cmd,
            UciCommand::SetOption {
                name: "Move Overhead".into(),
                value: Some("250".into()),
            }
        );

        let cmd = parse_command("setoption name Clear Hash").unwrap();
        assert_eq!(
            cmd,
            UciCommand::SetOption {
                name: "Clear Hash".into(),
                value: None,
            }
        );
    }

    #[test]
    fn test_perft_takes_first_token() {
        assert_eq!(parse_command("perft 5"), Some(UciCommand::Perft { depth: 5 }));
        assert_eq!(parse_command("perft 3 extra"), Some(UciCommand::Perft { depth: 3 }));
        assert_eq!(parse_command("perft"), None);
        assert_eq!(parse_command("perft x"), None);
    }
}
