use crate::chess::UciMove;
use crate::search::{AllMoves, HashSize, KingMoves, Mate, PnsHashSize, Score, ThreadCount};
use crate::search::{SyzygyProbeDepth, SyzygyProbeLimit};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

/// A message sent over the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    BestMove {
        best: Option<UciMove>,
        ponder: Option<UciMove>,
    },
    ReadyOk,
    UciOk,
    Info {
        time: Option<Duration>,
        multipv: Option<u32>,
        depth: Option<u32>,
        sel_depth: Option<u32>,
        nodes: Option<u64>,
        nps: Option<u64>,
        tb_hits: Option<u64>,
        score: Option<Score>,
        pv: Vec<UciMove>,
    },
    CurrMove {
        mov: UciMove,
        number: u32,
    },
    /// A human-readable diagnostic, sent as an `info string` line.
    Message(String),
    /// Verbatim output for the debug commands.
    Text(String),
}

impl Outbound {
    /// A bare depth report, as emitted for positions without legal moves.
    pub fn depth_report(depth: u32, score: Score) -> Self {
        Outbound::Info {
            time: None,
            multipv: None,
            depth: Some(depth),
            sel_depth: None,
            nodes: None,
            nps: None,
            tb_hits: None,
            score: Some(score),
            pv: Vec::new(),
        }
    }
}

fn write_score(f: &mut Formatter<'_>, score: Score) -> fmt::Result {
    match score.mate() {
        Mate::None => write!(f, " score cp {}", score.get()),
        Mate::Mating(plies) => write!(f, " score mate {}", (plies + 1) / 2),
        Mate::Mated(plies) => write!(f, " score mate {}", -(plies / 2)),
    }
}

impl Display for Outbound {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Outbound::BestMove { best: None, .. } => f.write_str("bestmove (none)"),

            Outbound::BestMove {
                best: Some(best),
                ponder,
            } => {
                write!(f, "bestmove {best}")?;

                if let Some(ponder) = ponder {
                    write!(f, " ponder {ponder}")?;
                }

                Ok(())
            }

            Outbound::ReadyOk => f.write_str("readyok"),

            Outbound::Info {
                time,
                multipv,
                depth,
                sel_depth,
                nodes,
                nps,
                tb_hits,
                score,
                pv,
            } => {
                f.write_str("info")?;

                if let Some(t) = time {
                    write!(f, " time {}", t.as_millis())?;
                }

                if let Some(m) = multipv {
                    write!(f, " multipv {m}")?;
                }

                if let Some(d) = depth {
                    write!(f, " depth {d}")?;
                }

                if let Some(s) = sel_depth {
                    write!(f, " seldepth {s}")?;
                }

                if let Some(n) = nodes {
                    write!(f, " nodes {n}")?;
                }

                if let Some(n) = nps {
                    write!(f, " nps {n}")?;
                }

                if let Some(n) = tb_hits {
                    write!(f, " tbhits {n}")?;
                }

                if let Some(s) = score {
                    write_score(f, *s)?;
                }

                if !pv.is_empty() {
                    f.write_str(" pv")?;

                    for m in pv {
                        write!(f, " {m}")?;
                    }
                }

                Ok(())
            }

            Outbound::CurrMove { mov, number } => {
                write!(f, "info currmove {mov} currmovenumber {number}")
            }

            Outbound::Message(msg) => write!(f, "info string {msg}"),

            Outbound::Text(text) => f.write_str(text),

            Outbound::UciOk => {
                writeln!(f, "id name Smother {}", env!("CARGO_PKG_VERSION"))?;
                writeln!(f, "id author the Smother developers")?;
                writeln!(f)?;

                writeln!(
                    f,
                    "option name Hash type spin default {} min {} max {}",
                    HashSize::default(),
                    HashSize::MIN,
                    HashSize::MAX,
                )?;

                writeln!(
                    f,
                    "option name Threads type spin default {} min {} max {}",
                    ThreadCount::default(),
                    ThreadCount::MIN,
                    ThreadCount::MAX,
                )?;

                writeln!(
                    f,
                    "option name KingMoves type spin default {} min {} max {}",
                    KingMoves::default(),
                    KingMoves::MIN,
                    KingMoves::MAX,
                )?;

                writeln!(
                    f,
                    "option name AllMoves type spin default {} min {} max {}",
                    AllMoves::default(),
                    AllMoves::MIN,
                    AllMoves::MAX,
                )?;

                writeln!(f, "option name ProofNumberSearch type check default false")?;

                writeln!(
                    f,
                    "option name PNS Hash type spin default {} min {} max {}",
                    PnsHashSize::default(),
                    PnsHashSize::MIN,
                    PnsHashSize::MAX,
                )?;

                writeln!(f, "option name RootMoveStats type check default false")?;
                writeln!(f, "option name BishopGuard type check default true")?;
                writeln!(f, "option name SyzygyPath type string default <empty>")?;

                writeln!(
                    f,
                    "option name SyzygyProbeDepth type spin default {} min {} max {}",
                    SyzygyProbeDepth::default(),
                    SyzygyProbeDepth::MIN,
                    SyzygyProbeDepth::MAX,
                )?;

                writeln!(
                    f,
                    "option name SyzygyProbeLimit type spin default {} min {} max {}",
                    SyzygyProbeLimit::default(),
                    SyzygyProbeLimit::MIN,
                    SyzygyProbeLimit::MAX,
                )?;

                writeln!(f, "option name Syzygy50MoveRule type check default true")?;
                writeln!(f, "option name UCI_Chess960 type check default false")?;

                f.write_str("uciok")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bestmove_formats_the_move_and_ponder() {
        let best: UciMove = "d5g8".parse().unwrap();
        let ponder: UciMove = "e8d8".parse().unwrap();

        let outbound = Outbound::BestMove {
            best: Some(best),
            ponder: Some(ponder),
        };

        assert_eq!(outbound.to_string(), "bestmove d5g8 ponder e8d8");
    }

    #[test]
    fn a_missing_bestmove_formats_as_none() {
        let outbound = Outbound::BestMove {
            best: None,
            ponder: None,
        };

        assert_eq!(outbound.to_string(), "bestmove (none)");
    }

    #[test]
    fn the_depth_report_is_minimal() {
        assert_eq!(
            Outbound::depth_report(0, Score::DRAW).to_string(),
            "info depth 0 score cp 0"
        );

        assert_eq!(
            Outbound::depth_report(0, Score::mated_in(0)).to_string(),
            "info depth 0 score mate 0"
        );
    }

    #[test]
    fn info_lines_follow_the_protocol_order() {
        let outbound = Outbound::Info {
            time: Some(Duration::from_millis(15)),
            multipv: Some(1),
            depth: Some(3),
            sel_depth: Some(5),
            nodes: Some(1000),
            nps: Some(66666),
            tb_hits: Some(0),
            score: Some(Score::mate_in(3)),
            pv: vec!["b1g6".parse().unwrap(), "h8g8".parse().unwrap()],
        };

        assert_eq!(
            outbound.to_string(),
            "info time 15 multipv 1 depth 3 seldepth 5 nodes 1000 nps 66666 \
             tbhits 0 score mate 2 pv b1g6 h8g8"
        );
    }

    #[test]
    fn mate_scores_count_full_moves() {
        let mut line = String::new();
        use std::fmt::Write;

        write!(line, "{}", Outbound::depth_report(1, Score::mate_in(1))).unwrap();
        assert!(line.ends_with("score mate 1"));

        line.clear();
        write!(line, "{}", Outbound::depth_report(1, Score::mated_in(2))).unwrap();
        assert!(line.ends_with("score mate -1"));
    }

    #[test]
    fn currmove_reports_the_ordinal() {
        let outbound = Outbound::CurrMove {
            mov: "e2e4".parse().unwrap(),
            number: 7,
        };

        assert_eq!(
            outbound.to_string(),
            "info currmove e2e4 currmovenumber 7"
        );
    }

    #[test]
    fn messages_become_info_strings() {
        assert_eq!(
            Outbound::Message("Success! Mate in 2 found!".to_string()).to_string(),
            "info string Success! Mate in 2 found!"
        );
    }

    #[test]
    fn uciok_lists_every_option() {
        let listing = Outbound::UciOk.to_string();

        for option in [
            "Hash", "Threads", "KingMoves", "AllMoves", "ProofNumberSearch", "PNS Hash",
            "RootMoveStats", "BishopGuard", "SyzygyPath", "SyzygyProbeDepth",
            "SyzygyProbeLimit", "Syzygy50MoveRule", "UCI_Chess960",
        ] {
            assert!(listing.contains(&format!("option name {option} type")));
        }

        assert!(listing.starts_with("id name Smother"));
        assert!(listing.ends_with("uciok"));
    }
}
