use crate::chess::UciMove;
use crate::search::{AllMoves, HashSize, KingMoves, PnsHashSize, ThreadCount};
use crate::search::{SyzygyProbeDepth, SyzygyProbeLimit};
use crate::util::parsers::*;
use derive_more::with_trait::{Display, Error, From};
use nom::error::Error as ParseError;
use nom::{Finish, Parser, branch::*, bytes::complete::*, combinator::*, multi::*, sequence::*};
use shakmaty::fen::Fen;
use std::str::FromStr;
use std::time::Duration;

/// An option assignment received over the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum SetOption {
    Threads(ThreadCount),
    KingMoves(KingMoves),
    AllMoves(AllMoves),
    ProofNumberSearch(bool),
    PnsHash(PnsHashSize),
    RootMoveStats(bool),
    BishopGuard(bool),
    Hash(HashSize),
    SyzygyPath(String),
    SyzygyProbeDepth(SyzygyProbeDepth),
    SyzygyProbeLimit(SyzygyProbeLimit),
    Syzygy50MoveRule(bool),
    Chess960(bool),
}

/// A command received over the protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Position {
        fen: Option<Fen>,
        moves: Vec<UciMove>,
    },
    Go {
        searchmoves: Vec<UciMove>,
        depth: Option<u32>,
        mate: Option<u32>,
        nodes: Option<u64>,
        time: Option<Duration>,
        perft: Option<u32>,
        infinite: bool,
    },
    SetOption(SetOption),
    IsReady,
    UciNewGame,
    Uci,
    Stop,
    Quit,
    Display,
    Flip,
    Bench,
    Compiler,
    Eval,
}

impl Inbound {
    pub fn go_mate(mate: u32) -> Self {
        Inbound::Go {
            searchmoves: Vec::new(),
            depth: None,
            mate: Some(mate),
            nodes: None,
            time: None,
            perft: None,
            infinite: false,
        }
    }
}

#[derive(Debug, Display, Clone, Eq, PartialEq, Error, From)]
pub enum ParseUciError<'s> {
    #[display("unrecognized sequence `{}`", _0.input)]
    Unrecognized(#[error(not(source))] ParseError<&'s str>),
    #[display("illegal move `{_0}`")]
    IllegalMove(#[error(not(source))] &'s str),
}

fn uci_move(input: &str) -> nom::IResult<&str, UciMove> {
    word.map_res(UciMove::from_str).parse(input)
}

#[derive(Debug, Default)]
pub struct UciParser;

impl UciParser {
    #[inline(always)]
    pub fn parse<'s>(&mut self, s: &'s str) -> Result<Inbound, ParseUciError<'s>> {
        let mut cmd = t(alt((
            tag("position"),
            tag("go"),
            tag("setoption"),
            tag("isready"),
            tag("ucinewgame"),
            tag("uci"),
            tag("stop"),
            tag("quit"),
            tag("d"),
            tag("flip"),
            tag("bench"),
            tag("compiler"),
            tag("eval"),
        )));

        match cmd.parse(s).finish()? {
            (args, "position") => {
                let word6 = (word, t(word), t(word), t(word), t(word), word);
                let fen = field("fen", t(recognize(word6)))
                    .map_res(Fen::from_str)
                    .map(Some);
                let startpos = t(tag("startpos")).map(|_| None);
                let moves = opt(field("moves", rest));

                let mut position = terminated((alt((startpos, fen)), moves), eof);
                let (_, (fen, moves)) = position.parse(args).finish()?;

                let mut list = Vec::new();

                for s in moves.unwrap_or_default().split_ascii_whitespace() {
                    match UciMove::from_str(s) {
                        Ok(m) => list.push(m),
                        Err(_) => return Err(ParseUciError::IllegalMove(s)),
                    }
                }

                Ok(Inbound::Position { fen, moves: list })
            }

            (args, "go") => {
                let searchmoves = field("searchmoves", many1(t(uci_move)));
                let depth = field("depth", int);
                let mate = field("mate", int);
                let nodes = field("nodes", int);
                let time = field("movetime", millis);
                let perft = field("perft", int);
                let inf = t(tag("infinite"));

                let params = gather7((searchmoves, depth, mate, nodes, time, perft, inf));
                let mut go = terminated(opt(params), eof).map(Option::unwrap_or_default);
                let (_, (searchmoves, depth, mate, nodes, time, perft, inf)) =
                    go.parse(args).finish()?;

                Ok(Inbound::Go {
                    searchmoves: searchmoves.unwrap_or_default(),
                    depth,
                    mate,
                    nodes,
                    time,
                    perft,
                    infinite: inf.is_some(),
                })
            }

            (args, "setoption") => {
                let option = |n| preceded((t(tag("name")), tag_no_case(n), t(tag("value"))), rest);
                let check = |s: &str| s.trim().parse::<bool>();

                // The longer names must come before their prefixes.
                let options = alt((
                    option("threads").map_res(str::parse).map(SetOption::Threads),
                    option("kingmoves").map_res(str::parse).map(SetOption::KingMoves),
                    option("allmoves").map_res(str::parse).map(SetOption::AllMoves),
                    option("proofnumbersearch")
                        .map_res(check)
                        .map(SetOption::ProofNumberSearch),
                    option("pns hash").map_res(str::parse).map(SetOption::PnsHash),
                    option("rootmovestats")
                        .map_res(check)
                        .map(SetOption::RootMoveStats),
                    option("bishopguard").map_res(check).map(SetOption::BishopGuard),
                    option("hash").map_res(str::parse).map(SetOption::Hash),
                    option("syzygypath").map(|s: &str| SetOption::SyzygyPath(s.trim().to_string())),
                    option("syzygyprobedepth")
                        .map_res(str::parse)
                        .map(SetOption::SyzygyProbeDepth),
                    option("syzygyprobelimit")
                        .map_res(str::parse)
                        .map(SetOption::SyzygyProbeLimit),
                    option("syzygy50moverule")
                        .map_res(check)
                        .map(SetOption::Syzygy50MoveRule),
                    option("uci_chess960").map_res(check).map(SetOption::Chess960),
                ));

                let mut setoption = terminated(options, eof);
                let (_, option) = setoption.parse(args).finish()?;
                Ok(Inbound::SetOption(option))
            }

            ("", "isready") => Ok(Inbound::IsReady),
            ("", "ucinewgame") => Ok(Inbound::UciNewGame),
            ("", "uci") => Ok(Inbound::Uci),
            ("", "stop") => Ok(Inbound::Stop),
            ("", "quit") => Ok(Inbound::Quit),
            ("", "d") => Ok(Inbound::Display),
            ("", "flip") => Ok(Inbound::Flip),
            (_, "bench") => Ok(Inbound::Bench),
            ("", "compiler") => Ok(Inbound::Compiler),
            ("", "eval") => Ok(Inbound::Eval),

            _ => Err(ParseUciError::Unrecognized(ParseError::new(
                s,
                nom::error::ErrorKind::Fail,
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[test]
    fn parsing_position_with_startpos_succeeds() {
        assert_eq!(
            UciParser.parse("position startpos"),
            Ok(Inbound::Position {
                fen: None,
                moves: vec![],
            })
        );
    }

    #[test]
    fn parsing_position_with_startpos_and_moves_succeeds() {
        assert_eq!(
            UciParser.parse("position startpos moves e2e4 e7e5"),
            Ok(Inbound::Position {
                fen: None,
                moves: vec!["e2e4".parse().unwrap(), "e7e5".parse().unwrap()],
            })
        );
    }

    #[test]
    fn parsing_position_with_fen_succeeds() {
        let fen = "4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1";

        assert_eq!(
            UciParser.parse(&format!("position fen {fen}")),
            Ok(Inbound::Position {
                fen: Some(fen.parse().unwrap()),
                moves: vec![],
            })
        );
    }

    #[test]
    fn parsing_position_with_invalid_fen_fails() {
        assert!(UciParser.parse("position fen not a real fen at all").is_err());
    }

    #[test]
    fn parsing_position_with_malformed_move_fails() {
        assert_eq!(
            UciParser.parse("position startpos moves zz99"),
            Err(ParseUciError::IllegalMove("zz99"))
        );
    }

    #[proptest]
    fn parsing_go_mate_succeeds(#[strategy(1u32..256)] n: u32) {
        assert_eq!(
            UciParser.parse(&format!("go mate {n}")),
            Ok(Inbound::go_mate(n))
        );
    }

    #[proptest]
    fn parsing_go_depth_succeeds(#[strategy(1u32..256)] n: u32) {
        assert_eq!(
            UciParser.parse(&format!("go depth {n}")),
            Ok(Inbound::Go {
                searchmoves: vec![],
                depth: Some(n),
                mate: None,
                nodes: None,
                time: None,
                perft: None,
                infinite: false,
            })
        );
    }

    #[test]
    fn parsing_go_with_every_limit_succeeds() {
        assert_eq!(
            UciParser.parse("go mate 3 nodes 1000 movetime 250"),
            Ok(Inbound::Go {
                searchmoves: vec![],
                depth: None,
                mate: Some(3),
                nodes: Some(1000),
                time: Some(Duration::from_millis(250)),
                perft: None,
                infinite: false,
            })
        );
    }

    #[test]
    fn parsing_go_limits_in_any_order_succeeds() {
        assert_eq!(
            UciParser.parse("go nodes 1000 mate 3"),
            UciParser.parse("go mate 3 nodes 1000"),
        );
    }

    #[test]
    fn parsing_go_searchmoves_collects_moves() {
        assert_eq!(
            UciParser.parse("go searchmoves e2e4 d2d4 mate 2"),
            Ok(Inbound::Go {
                searchmoves: vec!["e2e4".parse().unwrap(), "d2d4".parse().unwrap()],
                depth: None,
                mate: Some(2),
                nodes: None,
                time: None,
                perft: None,
                infinite: false,
            })
        );
    }

    #[test]
    fn parsing_go_perft_succeeds() {
        assert_eq!(
            UciParser.parse("go perft 4"),
            Ok(Inbound::Go {
                searchmoves: vec![],
                depth: None,
                mate: None,
                nodes: None,
                time: None,
                perft: Some(4),
                infinite: false,
            })
        );
    }

    #[test]
    fn parsing_go_infinite_succeeds() {
        assert!(matches!(
            UciParser.parse("go infinite"),
            Ok(Inbound::Go { infinite: true, .. })
        ));
    }

    #[test]
    fn parsing_plain_commands_succeeds() {
        assert_eq!(UciParser.parse("uci"), Ok(Inbound::Uci));
        assert_eq!(UciParser.parse("isready"), Ok(Inbound::IsReady));
        assert_eq!(UciParser.parse("ucinewgame"), Ok(Inbound::UciNewGame));
        assert_eq!(UciParser.parse("stop"), Ok(Inbound::Stop));
        assert_eq!(UciParser.parse("quit"), Ok(Inbound::Quit));
        assert_eq!(UciParser.parse("d"), Ok(Inbound::Display));
        assert_eq!(UciParser.parse("flip"), Ok(Inbound::Flip));
        assert_eq!(UciParser.parse("bench"), Ok(Inbound::Bench));
        assert_eq!(UciParser.parse("compiler"), Ok(Inbound::Compiler));
        assert_eq!(UciParser.parse("eval"), Ok(Inbound::Eval));
    }

    #[proptest]
    fn parsing_option_threads_succeeds(t: ThreadCount) {
        assert_eq!(
            UciParser.parse(&format!("setoption name Threads value {t}")),
            Ok(Inbound::SetOption(SetOption::Threads(t)))
        );
    }

    #[proptest]
    fn parsing_option_king_moves_succeeds(k: KingMoves) {
        assert_eq!(
            UciParser.parse(&format!("setoption name KingMoves value {k}")),
            Ok(Inbound::SetOption(SetOption::KingMoves(k)))
        );
    }

    #[test]
    fn parsing_option_pns_hash_succeeds() {
        assert_eq!(
            UciParser.parse("setoption name PNS Hash value 128"),
            Ok(Inbound::SetOption(SetOption::PnsHash(PnsHashSize::new(128))))
        );
    }

    #[test]
    fn parsing_check_options_succeeds() {
        assert_eq!(
            UciParser.parse("setoption name ProofNumberSearch value true"),
            Ok(Inbound::SetOption(SetOption::ProofNumberSearch(true)))
        );

        assert_eq!(
            UciParser.parse("setoption name UCI_Chess960 value false"),
            Ok(Inbound::SetOption(SetOption::Chess960(false)))
        );
    }

    #[test]
    fn parsing_option_syzygy_path_succeeds() {
        assert_eq!(
            UciParser.parse("setoption name SyzygyPath value /tables/syzygy"),
            Ok(Inbound::SetOption(SetOption::SyzygyPath(
                "/tables/syzygy".to_string()
            )))
        );
    }

    #[test]
    fn parsing_an_out_of_range_option_fails() {
        assert!(UciParser.parse("setoption name Threads value 0").is_err());
        assert!(UciParser.parse("setoption name KingMoves value 9").is_err());
    }

    #[test]
    fn parsing_an_unknown_option_fails() {
        assert!(UciParser.parse("setoption name Ponder value true").is_err());
    }

    #[test]
    fn parsing_an_unknown_command_fails() {
        assert!(UciParser.parse("notacommand").is_err());
        assert!(UciParser.parse("").is_err());
    }
}
