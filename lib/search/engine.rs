use crate::chess::{DARK_SQUARES, Move, Position, Role};
use crate::search::{Control, ControlFlow, Info, Limits, MAX_PLY, Options, Pns, Prepared};
use crate::search::{RootMoves, Score, Stack, distribute, prepare, score_and_rank, walker};
use crate::syzygy::{self, Oracle};
use crate::util::Assume;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::stream::FusedStream;
use futures::{Stream, StreamExt};
use std::cmp::Reverse;
use std::panic::resume_unwind;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::thread::{Builder, JoinHandle};
use std::time::{Duration, Instant};

/// The stack size for search threads.
///
/// The search recurses once per ply, and every frame keeps a board snapshot
/// plus a ranked move buffer, which outgrows the platform default on the
/// deepest lines.
const STACK_SIZE: usize = (MAX_PLY + 2) * (64 << 10);

fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: Send + 'static + FnOnce() -> T,
    T: Send + 'static,
{
    Builder::new().stack_size(STACK_SIZE).spawn(f).assume()
}

fn join<T>(handle: JoinHandle<T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(payload) => resume_unwind(payload),
    }
}

/// A progress event emitted by an ongoing search.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Event {
    /// A new principal variation or depth report.
    Info(Info),
    /// The root move about to be searched.
    CurrMove { mov: Move, number: u32 },
    /// A human-readable diagnostic.
    Message(String),
    /// The final verdict; always the last event of a search.
    BestMove {
        best: Option<Move>,
        ponder: Option<Move>,
    },
}

/// A handle to an ongoing search.
///
/// Yields [`Event`]s as the search progresses; the stream ends after the
/// final [`Event::BestMove`]. Dropping the handle aborts the search.
#[derive(Debug)]
pub struct Search {
    ctrl: Arc<Control>,
    channel: UnboundedReceiver<Event>,
    handle: Option<JoinHandle<()>>,
}

impl Search {
    /// Interrupts the search as soon as possible.
    pub fn abort(&self) {
        self.ctrl.abort();
    }

    /// The number of nodes searched so far.
    pub fn nodes(&self) -> u64 {
        self.ctrl.nodes()
    }
}

impl Drop for Search {
    fn drop(&mut self) {
        self.ctrl.abort();

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Stream for Search {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.channel.poll_next_unpin(cx)
    }
}

impl FusedStream for Search {
    fn is_terminated(&self) -> bool {
        self.channel.is_terminated()
    }
}

/// A mate-solving chess engine.
#[derive(Debug)]
pub struct Engine {
    options: Options,
    oracle: Arc<Oracle>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Initializes the engine with the default [`Options`].
    pub fn new() -> Self {
        Self::with_options(&Options::default())
    }

    /// Initializes the engine with the given [`Options`].
    pub fn with_options(options: &Options) -> Self {
        Engine {
            options: options.clone(),
            oracle: Arc::new(Oracle::load(options)),
        }
    }

    /// The current configuration.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Reconfigures the engine, reloading the tablebases if necessary.
    pub fn configure(&mut self, options: Options) {
        let reload = options.syzygy_path != self.options.syzygy_path
            || options.syzygy_probe_limit != self.options.syzygy_probe_limit
            || options.syzygy_50_move_rule != self.options.syzygy_50_move_rule;

        self.options = options;

        if reload {
            self.oracle = Arc::new(Oracle::load(&self.options));
        }
    }

    /// Resets the engine between games.
    pub fn reset(&mut self) {
        self.oracle = Arc::new(Oracle::load(&self.options));
    }

    /// Initiates a [`Search`].
    pub fn search(&mut self, pos: &Position, limits: Limits) -> Search {
        let workers = if self.options.proof_number_search {
            1
        } else {
            self.options.threads.get()
        };

        let ctrl = Arc::new(Control::new(limits.clone(), workers));
        let (tx, rx) = unbounded();

        let searchmoves: Vec<Move> = limits
            .searchmoves
            .iter()
            .filter_map(|uci| pos.parse_move(uci))
            .collect();

        let Prepared { moves, in_tb } = prepare(pos, &searchmoves, &self.oracle);

        if in_tb {
            ctrl.count_tb_hits(0, moves.len() as u64);
        }

        if self.options.root_move_stats {
            for rm in &moves {
                let msg = format!("Root move: {}   Rank: {}", pos.uci(rm.head()), rm.tb_rank);
                let _ = tx.unbounded_send(Event::Message(msg));
            }
        }

        // Mate or stalemate at the root.
        if moves.is_empty() {
            let score = if pos.is_check() {
                Score::mated_in(0)
            } else {
                Score::DRAW
            };

            let info = Info::new(0, 0, ctrl.elapsed(), 0, 0, score, Vec::new());
            let _ = tx.unbounded_send(Event::Info(info));
            let _ = tx.unbounded_send(Event::BestMove {
                best: None,
                ponder: None,
            });

            return Search {
                ctrl,
                channel: rx,
                handle: None,
            };
        }

        let mate = limits.mate.clamp(1, MAX_PLY as u32 / 2);

        let handle = if self.options.proof_number_search {
            let msg = "Starting Proof-Number Search ...".to_string();
            let _ = tx.unbounded_send(Event::Message(msg));

            let pns = Pns::new(
                pos.clone(),
                moves,
                ctrl.clone(),
                self.oracle.clone(),
                tx.clone(),
                self.options.pns_hash.get(),
                self.options.king_moves.get(),
                mate,
            );

            let ctrl = ctrl.clone();
            spawn(move || {
                let (moves, depth) = pns.run();
                conclude(&ctrl, &tx, mate, vec![(moves, depth)]);
            })
        } else {
            let msg = "Starting Alpha-Beta Search ...".to_string();
            let _ = tx.unbounded_send(Event::Message(msg));

            let shares = distribute(moves, workers);
            let ctrl = ctrl.clone();
            let oracle = self.oracle.clone();
            let options = self.options.clone();
            let root = pos.clone();

            spawn(move || {
                let handles: Vec<_> = shares
                    .into_iter()
                    .enumerate()
                    .map(|(idx, share)| {
                        let mut worker = Worker::new(
                            idx,
                            root.clone(),
                            share,
                            ctrl.clone(),
                            oracle.clone(),
                            tx.clone(),
                            &options,
                            in_tb,
                            mate,
                        );

                        spawn(move || {
                            worker.run();
                            (worker.root_moves, worker.root_depth as u32)
                        })
                    })
                    .collect();

                let results = handles.into_iter().map(join).collect();
                conclude(&ctrl, &tx, mate, results);
            })
        };

        Search {
            ctrl,
            channel: rx,
            handle: Some(handle),
        }
    }
}

/// Collects the workers' results and emits the final verdict.
fn conclude(
    ctrl: &Control,
    tx: &UnboundedSender<Event>,
    mate: u32,
    results: Vec<(RootMoves, u32)>,
) {
    // Keep the finished search open until a stop request arrives.
    if ctrl.limits().infinite && !ctrl.stopped() {
        ctrl.wait();
    }

    ctrl.abort();

    let mut best = 0;

    for (idx, (moves, _)) in results.iter().enumerate() {
        if !moves.is_empty() && moves[0].score > results[best].0[0].score {
            best = idx;
        }
    }

    let (moves, depth) = &results[best];
    let rm = &moves[0];

    let msg = if rm.score < Score::MATE_IN_MAX_PLY {
        format!("Failure! No mate in {mate} found!")
    } else {
        let moves = (Score::MATE.get() - rm.score.get() + 1) / 2;
        format!("Success! Mate in {moves} found!")
    };

    let _ = tx.unbounded_send(Event::Message(msg));

    let info = Info::new(
        *depth,
        rm.sel_depth,
        ctrl.elapsed(),
        ctrl.nodes(),
        ctrl.tb_hits(),
        rm.score,
        rm.pv.clone(),
    );

    let _ = tx.unbounded_send(Event::Info(info));
    let _ = tx.unbounded_send(Event::BestMove {
        best: Some(rm.pv[0].clone()),
        ponder: rm.pv.get(1).cloned(),
    });
}

/// A search worker owning a disjoint share of the root moves.
#[derive(Debug)]
struct Worker {
    idx: usize,
    root: Position,
    root_moves: RootMoves,
    ctrl: Arc<Control>,
    oracle: Arc<Oracle>,
    tx: UnboundedSender<Event>,
    stack: Stack,
    king_moves: usize,
    all_moves: usize,
    bishop_guard: bool,
    in_tb: bool,
    mate: u32,
    root_depth: i32,
    target_depth: i32,
    full_depth: i32,
    sel_depth: usize,
    calls_cnt: i32,
    last_output: Instant,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    fn new(
        idx: usize,
        root: Position,
        root_moves: RootMoves,
        ctrl: Arc<Control>,
        oracle: Arc<Oracle>,
        tx: UnboundedSender<Event>,
        options: &Options,
        in_tb: bool,
        mate: u32,
    ) -> Self {
        Worker {
            idx,
            root,
            root_moves,
            ctrl,
            oracle,
            tx,
            stack: Stack::default(),
            king_moves: options.king_moves.get(),
            all_moves: options.all_moves.get(),
            bishop_guard: options.bishop_guard,
            in_tb,
            mate,
            root_depth: 0,
            target_depth: 0,
            full_depth: 0,
            sel_depth: 0,
            calls_cnt: 0,
            last_output: Instant::now(),
        }
    }

    fn is_main(&self) -> bool {
        self.idx == 0
    }

    fn report_pv(&self) {
        let rm = &self.root_moves[0];

        let info = Info::new(
            self.root_depth as u32,
            rm.sel_depth,
            self.ctrl.elapsed(),
            self.ctrl.nodes(),
            self.ctrl.tb_hits(),
            rm.score,
            rm.pv.clone(),
        );

        let _ = self.tx.unbounded_send(Event::Info(info));
    }

    /// The [iterative deepening] loop.
    ///
    /// [iterative deepening]: https://www.chessprogramming.org/Iterative_Deepening
    fn run(&mut self) {
        if self.root_moves.is_empty() {
            return;
        }

        // A basic endgame mate like KQK or KBNK needs no search; the
        // tablebase walker derives the mating line directly.
        if self.in_tb && self.root_moves[0].tb_rank > 900 && walker::is_basic_mate(&self.root) {
            if !self.is_main() {
                return;
            }

            let head = self.root_moves[0].head().clone();
            let next = self.root.child(&head);
            self.ctrl.count_node(self.idx);

            let (value, tail) = walker::walk(&next, &self.oracle, &self.ctrl, self.idx, 1);

            let rm = &mut self.root_moves[0];
            rm.score = -value;
            rm.pv.truncate(1);
            rm.pv.extend(tail);
            rm.sel_depth = rm.pv.len() as u32;
            self.root_depth = rm.pv.len() as i32;

            return;
        }

        self.target_depth = (2 * self.mate as i32 - 1).min(MAX_PLY as i32 - 1);
        self.full_depth = (self.target_depth - if self.mate > 5 { 4 } else { 2 }).max(1);

        // Alpha is chosen such that only scores proving a mate within the
        // requested distance can raise it.
        let alpha = Score::mate_in(2 * self.mate as usize);
        let beta = Score::INFINITE;
        let mut best_value = Score::new(Score::MATE_IN_MAX_PLY.get() - 1);

        self.root_depth = 1;

        loop {
            for idx in 0..self.root_moves.len() {
                let tb_rank = self.root_moves[idx].tb_rank;

                // Only search winning moves.
                if self.in_tb && tb_rank <= 0 {
                    continue;
                }

                if !self.in_tb && self.root_depth == 1 && tb_rank < 5000 {
                    continue;
                }

                self.sel_depth = 1;
                let number = self.ctrl.currmove_number(self.root_depth as usize);

                if self.is_main()
                    && (self.ctrl.elapsed() > Duration::from_millis(300)
                        || (self.root_depth == self.target_depth && self.target_depth >= 7)
                        || self.root_depth > 11)
                {
                    let _ = self.tx.unbounded_send(Event::CurrMove {
                        mov: self.root_moves[idx].head().clone(),
                        number,
                    });
                }

                // At lower iterations, skip root moves unlikely to force a
                // mate; the closer the final iteration, the fewer skips.
                if self.target_depth > 7 && self.root_depth > 3 && self.root_depth < self.target_depth
                {
                    if self.root_depth < self.target_depth - 4 && tb_rank < 8000 {
                        continue;
                    } else if self.root_depth < self.target_depth - 2 && tb_rank < 4000 {
                        continue;
                    } else if tb_rank < 0 {
                        continue;
                    }
                }

                let m = self.root_moves[idx].head().clone();
                let next = self.root.child(&m);
                self.ctrl.count_node(self.idx);

                let value = -self.search(&next, -beta, -alpha, self.root_depth - 1, 1);

                self.root_moves[idx].sel_depth = self.sel_depth as u32;

                if value > best_value {
                    best_value = value;

                    let rm = &mut self.root_moves[idx];
                    rm.score = value;
                    rm.pv.truncate(1);
                    rm.pv.extend_from_slice(self.stack.line(1));

                    self.root_moves[..=idx].sort_by_key(|rm| Reverse((rm.score, rm.tb_rank)));
                }

                // A mate within the specified limit stops all workers.
                if best_value >= alpha {
                    self.ctrl.abort();
                }

                if self.ctrl.stopped() {
                    break;
                }
            }

            if self.ctrl.stopped() {
                break;
            }

            if self.is_main() && self.root_depth < self.target_depth {
                self.last_output = Instant::now();
                self.report_pv();

                if self.root_depth > 7 {
                    let msg = format!("No mate in {} found ...", (self.root_depth + 1) / 2);
                    let _ = self.tx.unbounded_send(Event::Message(msg));
                }
            }

            if self.root_depth == self.target_depth {
                break;
            }

            self.root_depth += 2;
        }
    }

    /// The recursive [alpha-beta] mate search.
    ///
    /// At the leaves there is no evaluation: a position is either a mate or
    /// a draw from the solver's point of view.
    ///
    /// [alpha-beta]: https://www.chessprogramming.org/Alpha-Beta
    fn search(
        &mut self,
        pos: &Position,
        mut alpha: Score,
        beta: Score,
        depth: i32,
        ply: usize,
    ) -> Score {
        debug_assert!(-Score::INFINITE <= alpha && alpha < beta && beta <= Score::INFINITE);
        debug_assert!(ply > 0);

        self.stack.clear(ply);
        self.sel_depth = self.sel_depth.max(ply);

        if self.is_main() {
            if self.ctrl.check(&mut self.calls_cnt) == ControlFlow::Abort {
                return Score::DRAW;
            }

            // Re-emit the current line every full minute.
            if self.last_output.elapsed() >= Duration::from_secs(60) {
                self.last_output = Instant::now();
                self.report_pv();
            }
        }

        if self.ctrl.stopped() || ply >= MAX_PLY {
            return Score::DRAW;
        }

        let in_check = pos.is_check();

        if depth == 0 {
            return if in_check && pos.legal_moves().is_empty() {
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        let us = pos.turn();

        if ply % 2 == 1 {
            // Defender positions too mobile to be part of a composed mate
            // are pruned outright.
            if self.king_moves < 8 && pos.king_mobility() > self.king_moves {
                return Score::DRAW;
            }

            if self.all_moves < 250 && pos.legal_moves().len() > self.all_moves {
                return Score::DRAW;
            }
        } else if pos.count(us) == 1 {
            // No mating material left.
            return Score::DRAW;
        }

        if pos.is_draw() {
            return Score::DRAW;
        }

        // Cut subtrees that are won but cannot be mated within the budget,
        // and defender subtrees that are not even lost.
        if let Some(wdl) = self.oracle.probe_wdl(pos) {
            self.ctrl.count_tb_hits(self.idx, 1);

            if ply % 2 == 1 {
                if !syzygy::is_loss(wdl) {
                    return Score::DRAW;
                }
            } else if !syzygy::is_win(wdl) {
                return Score::DRAW;
            }
        }

        let mut best_value = -Score::INFINITE;
        let mut move_count = 0usize;

        for rm in &score_and_rank(pos, ply) {
            let m = &rm.mov;
            let mut extension = false;

            // At most one extension per node, and none during the final
            // iteration.
            if depth == 1
                && (ply as i32) < self.target_depth - 1
                && self.root_depth < self.target_depth
            {
                if rm.rank >= 6000 {
                    extension = true;
                } else if self.root_depth >= self.full_depth {
                    if m.is_capture() || m.is_promotion() {
                        extension = true;
                    } else if matches!(
                        m.role(),
                        Role::Knight | Role::Bishop | Role::Rook | Role::Queen
                    ) && !(pos.attacks_from(m.role(), m.to())
                        & pos.check_squares(m.role()))
                    .is_empty()
                    {
                        // A piece reaching a checking square on the next move.
                        extension = true;
                    }
                }
            }

            // In compositions with many same-colored bishops for the
            // defending side, skip bishop moves to prevent a search
            // explosion.
            if self.bishop_guard
                && ply % 2 == 1
                && depth > 1
                && move_count > 5
                && m.role() == Role::Bishop
                && pos.count_piece(us, Role::Bishop) > 3
                && !(pos.pieces(us, Role::Bishop) & DARK_SQUARES).is_empty()
                    != !(pos.by_color(us.other()) & DARK_SQUARES).is_empty()
            {
                continue;
            }

            // At lower iterations, skip unpromising moves for the mating
            // side, with the same banding as at the root.
            if ply % 2 == 0
                && !extension
                && move_count > 0
                && depth > 1
                && self.target_depth >= 7
                && self.root_depth > 3
                && self.root_depth < self.target_depth
            {
                if self.root_depth < self.target_depth - 4 && rm.rank < 8000 {
                    continue;
                } else if self.root_depth < self.target_depth - 2 && rm.rank < 4000 {
                    continue;
                } else if rm.rank < 0 {
                    continue;
                }
            }

            // At frontier nodes, non-checking and non-extended moves cannot
            // contribute to a proof.
            if depth == 1 && !extension && rm.rank < 6000 {
                continue;
            }

            move_count += 1;

            let next = pos.child(m);
            self.ctrl.count_node(self.idx);

            let value = -self.search(&next, -beta, -alpha, depth - 1 + 2 * extension as i32, ply + 1);

            if value > best_value {
                if value >= beta {
                    return value;
                }

                best_value = value;

                if value > alpha {
                    alpha = value;
                    self.stack.promote(ply, m);
                }
            }

            // A mate within the specified limit cannot be improved upon.
            if best_value > Score::mate_in(2 * self.mate as usize) {
                break;
            }
        }

        // No moves tried? Mate or stalemate.
        if move_count == 0 {
            best_value = if in_check {
                Score::mated_in(ply)
            } else {
                Score::DRAW
            };
        }

        debug_assert!(-Score::INFINITE <= best_value && best_value < Score::INFINITE);
        best_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on_stream;

    fn solve(fen: &str, limits: Limits) -> Vec<Event> {
        let mut engine = Engine::new();
        let pos: Position = fen.parse().unwrap();
        let search = engine.search(&pos, limits);
        block_on_stream(search).collect()
    }

    fn solve_with(options: &Options, fen: &str, limits: Limits) -> Vec<Event> {
        let mut engine = Engine::with_options(options);
        let pos: Position = fen.parse().unwrap();
        let search = engine.search(&pos, limits);
        block_on_stream(search).collect()
    }

    fn final_info(events: &[Event]) -> &Info {
        events
            .iter()
            .rev()
            .find_map(|e| match e {
                Event::Info(info) => Some(info),
                _ => None,
            })
            .unwrap()
    }

    fn best_move(events: &[Event]) -> Option<Move> {
        match events.last().unwrap() {
            Event::BestMove { best, .. } => best.clone(),
            _ => panic!("missing bestmove"),
        }
    }

    fn message_containing(events: &[Event], needle: &str) -> bool {
        events.iter().any(|e| match e {
            Event::Message(msg) => msg.contains(needle),
            _ => false,
        })
    }

    #[test]
    fn finds_a_mate_in_one() {
        let events = solve("4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1", Limits::mate(1));

        let info = final_info(&events);
        assert_eq!(info.score(), Score::mate_in(1));
        assert!(message_containing(&events, "Success! Mate in 1 found!"));

        let pos: Position = "4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1".parse().unwrap();
        let best = best_move(&events).unwrap();
        assert!(pos.child(&best).is_checkmate());
    }

    #[test]
    fn finds_the_back_rank_mate() {
        let events = solve("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", Limits::mate(1));

        let pos: Position = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1".parse().unwrap();
        let best = best_move(&events).unwrap();
        assert_eq!(pos.uci(&best).to_string(), "a1a8");
        assert_eq!(final_info(&events).score(), Score::mate_in(1));
    }

    #[test]
    fn finds_a_mate_in_two() {
        let events = solve("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", Limits::mate(2));

        let info = final_info(&events);
        assert_eq!(info.score(), Score::mate_in(3));
        assert_eq!(info.pv().len(), 3);

        // The line must end in checkmate.
        let mut pos: Position = "7k/8/5K2/8/8/8/8/1Q6 w - - 0 1".parse().unwrap();
        for m in info.pv() {
            pos.play(m);
        }

        assert!(pos.is_checkmate());
    }

    #[test]
    fn reports_failure_when_no_mate_exists() {
        let events = solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Limits::mate(2),
        );

        assert!(message_containing(&events, "Failure! No mate in 2 found!"));
        assert!(final_info(&events).score() < Score::MATE_IN_MAX_PLY);

        // Still a legal bestmove.
        let pos = Position::default();
        let best = best_move(&events).unwrap();
        assert!(pos.legal_moves().contains(&best));
    }

    #[test]
    fn refutes_a_deeper_mate_exhaustively() {
        // The attacking king is too far away for the queen to force a mate
        // in three on her own.
        let events = solve("7k/8/8/8/8/8/8/6QK w - - 0 1", Limits::mate(3));

        assert!(message_containing(&events, "Failure! No mate in 3 found!"));
        assert!(final_info(&events).score() < Score::MATE_IN_MAX_PLY);
    }

    #[test]
    fn reports_a_mated_root() {
        let events = solve("R3k3/8/4K3/8/8/8/8/8 b - - 0 1", Limits::mate(1));

        assert_eq!(best_move(&events), None);
        let info = final_info(&events);
        assert_eq!(info.depth(), 0);
        assert_eq!(info.score(), Score::mated_in(0));
    }

    #[test]
    fn reports_a_stalemated_root() {
        let events = solve("8/8/8/8/8/4k3/4p3/4K3 w - - 0 1", Limits::mate(1));

        assert_eq!(best_move(&events), None);
        let info = final_info(&events);
        assert_eq!(info.depth(), 0);
        assert_eq!(info.score(), Score::DRAW);
    }

    #[test]
    fn searchmoves_restricts_the_root() {
        let limits = Limits::mate(1).with_searchmoves(vec!["a1a2".parse().unwrap()]);
        let events = solve("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", limits);

        let pos: Position = "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1".parse().unwrap();
        let best = best_move(&events).unwrap();
        assert_eq!(pos.uci(&best).to_string(), "a1a2");
        assert!(message_containing(&events, "Failure!"));
    }

    #[test]
    fn the_mobility_caps_suppress_busy_defences() {
        // Mate in two, but the defender always has three legal replies.
        let fen = "7k/8/5K2/8/8/8/8/1Q5n w - - 0 1";

        let events = solve(fen, Limits::mate(2));
        assert!(message_containing(&events, "Success! Mate in 2 found!"));

        // Capping total defender mobility below the actual reply count
        // prunes the proof away.
        let options = Options {
            all_moves: crate::search::AllMoves::new(2),
            ..Options::default()
        };

        let events = solve_with(&options, fen, Limits::mate(2));
        assert!(message_containing(&events, "Failure! No mate in 2 found!"));
    }

    #[test]
    fn the_same_search_yields_the_same_verdict() {
        let first = solve("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", Limits::mate(2));
        let second = solve("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", Limits::mate(2));

        assert_eq!(best_move(&first), best_move(&second));
        assert_eq!(final_info(&first).score(), final_info(&second).score());
    }

    #[test]
    fn multiple_workers_agree_with_a_single_worker() {
        let options = Options {
            threads: crate::search::ThreadCount::new(4),
            ..Options::default()
        };

        let events = solve_with(&options, "7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", Limits::mate(2));
        assert_eq!(final_info(&events).score(), Score::mate_in(3));
    }

    #[test]
    fn the_node_limit_interrupts_the_search() {
        let events = solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Limits::mate(4).with_nodes(1),
        );

        // The search is cut short but still reports a verdict.
        assert!(matches!(events.last(), Some(Event::BestMove { .. })));
    }

    #[test]
    fn aborting_a_search_ends_the_stream() {
        let mut engine = Engine::new();
        let pos = Position::default();
        let search = engine.search(&pos, Limits::mate(4));
        search.abort();

        let events: Vec<_> = block_on_stream(search).collect();
        assert!(matches!(events.last(), Some(Event::BestMove { .. })));
    }

    #[test]
    fn mate_scores_count_plies_from_the_root() {
        let events = solve("4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1", Limits::mate(1));
        let info = final_info(&events);
        assert_eq!(info.pv().len(), 1);
        assert_eq!(info.score().mate(), crate::search::Mate::Mating(1));
    }
}
