mod bench;
mod inbound;
mod outbound;

pub use inbound::*;
pub use outbound::*;

use crate::chess::{Position, UciMove};
use crate::search::{Engine, Event, Limits};
use crate::warn;
use futures::{prelude::*, select_biased as select, stream::FusedStream};
use shakmaty::fen::Fen;
use std::time::Instant;

/// FEN string of the initial position.
const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Converts a search [`Event`] into an [`Outbound`] message.
///
/// Moves are rendered against the root position so that the castling
/// notation honors the configured convention.
fn outbound(pos: &Position, event: Event) -> Outbound {
    match event {
        Event::Info(info) if info.depth() == 0 && info.pv().is_empty() => {
            Outbound::depth_report(0, info.score())
        }

        Event::Info(info) => Outbound::Info {
            time: Some(info.time()),
            multipv: Some(1),
            depth: Some(info.depth()),
            sel_depth: Some(info.sel_depth()),
            nodes: Some(info.nodes()),
            nps: Some(info.nps()),
            tb_hits: Some(info.tb_hits()),
            score: Some(info.score()),
            pv: info.pv().iter().map(|m| pos.uci(m)).collect(),
        },

        Event::CurrMove { mov, number } => Outbound::CurrMove {
            mov: pos.uci(&mov),
            number,
        },

        Event::Message(msg) => Outbound::Message(msg),

        Event::BestMove { best, ponder } => Outbound::BestMove {
            best: best.map(|m| pos.uci(&m)),
            ponder: ponder.map(|m| pos.uci(&m)),
        },
    }
}

/// A basic UCI server.
#[derive(Debug)]
pub struct Uci<I, O> {
    input: I,
    output: O,
    engine: Engine,
    pos: Position,
}

impl<I, O> Uci<I, O> {
    /// Constructs a new UCI server instance.
    pub fn new(input: I, output: O) -> Self {
        Self {
            input,
            output,
            engine: Engine::new(),
            pos: Position::default(),
        }
    }

    fn set_position(&mut self, fen: Option<Fen>, moves: Vec<UciMove>) {
        let chess960 = self.engine.options().chess960;

        let fen = match &fen {
            None => STARTPOS.to_string(),
            Some(fen) => fen.to_string(),
        };

        let mut pos = match Position::from_fen(&fen, chess960) {
            Ok(pos) => pos,
            Err(e) => return warn!("ignored position, {e}"),
        };

        for uci in &moves {
            match pos.parse_move(uci) {
                Some(m) => pos.play(&m),
                None => return warn!("ignored position, illegal move `{uci}`"),
            }
        }

        self.pos = pos;
    }

    fn set_option(&mut self, option: SetOption) {
        let mut options = self.engine.options().clone();

        match option {
            SetOption::Threads(v) => options.threads = v,
            SetOption::KingMoves(v) => options.king_moves = v,
            SetOption::AllMoves(v) => options.all_moves = v,
            SetOption::ProofNumberSearch(v) => options.proof_number_search = v,
            SetOption::PnsHash(v) => options.pns_hash = v,
            SetOption::RootMoveStats(v) => options.root_move_stats = v,
            SetOption::BishopGuard(v) => options.bishop_guard = v,
            SetOption::Hash(v) => options.hash = v,
            SetOption::SyzygyPath(v) => options.syzygy_path = Some(v),
            SetOption::SyzygyProbeDepth(v) => options.syzygy_probe_depth = v,
            SetOption::SyzygyProbeLimit(v) => options.syzygy_probe_limit = v,
            SetOption::Syzygy50MoveRule(v) => options.syzygy_50_move_rule = v,
            SetOption::Chess960(v) => options.chess960 = v,
        }

        self.engine.configure(options);
    }
}

impl<I, O> Uci<I, O>
where
    I: FusedStream<Item = Inbound> + Unpin,
    O: Sink<Outbound> + Unpin,
{
    /// Runs the UCI server until `quit` or the end of input.
    pub async fn run(&mut self) -> Result<(), O::Error> {
        'quit: while let Some(inbound) = self.input.next().await {
            match inbound {
                Inbound::Position { fen, moves } => self.set_position(fen, moves),
                Inbound::SetOption(option) => self.set_option(option),

                Inbound::UciNewGame => {
                    self.pos = Position::default();
                    self.engine.reset();
                }

                Inbound::Go {
                    perft: Some(depth), ..
                } => self.perft(depth).await?,

                Inbound::Go {
                    searchmoves,
                    depth,
                    mate,
                    nodes,
                    time,
                    infinite,
                    ..
                } => {
                    let mut limits = Limits {
                        searchmoves,
                        mate: mate.or(depth).unwrap_or(0),
                        nodes,
                        movetime: time,
                        infinite,
                    };

                    // A mate distance is required; plain analysis is not
                    // supported.
                    if limits.mate == 0 {
                        let msg = "Infinite analysis or game playing mode not supported! \
                                   Please set a depth or mate limit."
                            .to_string();

                        self.output.send(Outbound::Message(msg)).await?;
                        limits.mate = 1;
                    }

                    let mut search = self.engine.search(&self.pos, limits);

                    loop {
                        if self.input.is_terminated() {
                            search.abort();
                        }

                        select! {
                            event = search.next() => match event {
                                Some(e) => {
                                    let message = outbound(&self.pos, e);
                                    self.output.send(message).await?
                                }

                                None => break,
                            },

                            inbound = self.input.next() => match inbound {
                                None => search.abort(),
                                Some(Inbound::Quit) => break 'quit,
                                Some(Inbound::Stop) => search.abort(),
                                _ => warn!("ignored unexpected command"),
                            }
                        }
                    }
                }

                Inbound::IsReady => self.output.send(Outbound::ReadyOk).await?,
                Inbound::Uci => self.output.send(Outbound::UciOk).await?,
                Inbound::Stop => continue,
                Inbound::Quit => break 'quit,

                Inbound::Display => {
                    let board = self.pos.to_string();
                    self.output.send(Outbound::Text(board)).await?;
                }

                Inbound::Flip => self.pos.flip(),
                Inbound::Bench => self.bench().await?,

                Inbound::Compiler => {
                    let info = format!(
                        "smother {} for {}-{}",
                        env!("CARGO_PKG_VERSION"),
                        std::env::consts::ARCH,
                        std::env::consts::OS,
                    );

                    self.output.send(Outbound::Text(info)).await?;
                }

                Inbound::Eval => {
                    let text = "No eval available!".to_string();
                    self.output.send(Outbound::Text(text)).await?;
                }
            }
        }

        Ok(())
    }

    /// Verifies move generation by counting the leaf nodes per root move.
    async fn perft(&mut self, depth: u32) -> Result<(), O::Error> {
        let mut nodes = 0u64;
        let mut text = String::new();

        for m in self.pos.legal_moves() {
            let count = if depth <= 1 {
                1
            } else {
                self.pos.child(&m).perft(depth - 1)
            };

            nodes += count;
            text.push_str(&format!("{}: {}\n", self.pos.uci(&m), count));
        }

        text.push_str(&format!("\nNodes searched: {nodes}\n"));
        self.output.send(Outbound::Text(text)).await
    }

    /// Runs the benchmark suite and reports the totals.
    async fn bench(&mut self) -> Result<(), O::Error> {
        let timer = Instant::now();
        let mut nodes = 0u64;

        for (number, (fen, mate)) in bench::POSITIONS.iter().enumerate() {
            let text = format!("\nPosition: {}/{}", number + 1, bench::POSITIONS.len());
            self.output.send(Outbound::Text(text)).await?;

            let pos = match Position::from_fen(fen, false) {
                Ok(pos) => pos,
                Err(_) => continue,
            };

            let mut search = self.engine.search(&pos, Limits::mate(*mate));

            while let Some(event) = search.next().await {
                let message = outbound(&pos, event);
                self.output.send(message).await?;
            }

            nodes += search.nodes();
        }

        let elapsed = timer.elapsed().as_millis().max(1) as u64;

        let summary = format!(
            "\n===========================\n\
             Total time (ms) : {elapsed}\n\
             Nodes searched  : {nodes}\n\
             Nodes/second    : {}",
            1000 * nodes / elapsed
        );

        self.output.send(Outbound::Text(summary)).await
    }
}
