use crate::chess::{Move, Position};
use crate::search::{Control, Event, Info, MAX_PLY, RootMoves, Score, score_and_rank};
use crate::syzygy::{self, Oracle};
use crate::util::Assume;
use futures::channel::mpsc::UnboundedSender;
use std::cmp::Reverse;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Proof and disproof numbers saturate at this sentinel.
const INFINITE: u32 = u32::MAX / 2;

/// A node of the AND/OR proof tree.
///
/// Links are arena indices; index 0 plays the dual role of the root and the
/// null link. Terminal status is encoded by the numbers themselves: `(0, ∞)`
/// is proven, `(∞, 0)` disproven.
#[derive(Debug, Clone, Default)]
struct Node {
    action: Option<Move>,
    pn: u32,
    dn: u32,
    next_sibling: u32,
    first_child: u32,
}

/// A bump-allocated arena of proof-tree nodes with FIFO recycling.
#[derive(Debug)]
struct Arena {
    nodes: Vec<Node>,
    next: usize,
    bin: VecDeque<u32>,
}

impl Arena {
    /// Freed slots are reused only once this many have accumulated, so a
    /// just-freed node is not immediately overwritten.
    const RECYCLING_THRESHOLD: usize = 40;

    /// Remaining headroom below which the search is stopped.
    const HEADROOM: usize = 100;

    fn with_capacity(count: usize) -> Option<Arena> {
        if count == 0 {
            return None;
        }

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(count).ok()?;
        nodes.resize(count, Node::default());

        Some(Arena {
            nodes,
            next: 1,
            bin: VecDeque::new(),
        })
    }

    /// Allocates a slot, preferring the oldest freed one.
    ///
    /// Returns the index and whether it was recycled.
    fn alloc(&mut self) -> Option<(u32, bool)> {
        if self.bin.len() >= Self::RECYCLING_THRESHOLD {
            return self.bin.pop_front().map(|idx| (idx, true));
        }

        if self.next < self.nodes.len() {
            let idx = self.next;
            self.next += 1;
            return Some((idx as u32, false));
        }

        self.bin.pop_front().map(|idx| (idx, true))
    }

    /// Whether the arena is about to run out of slots.
    fn is_low(&self) -> bool {
        self.next + Self::HEADROOM > self.nodes.len() && self.bin.len() < Self::HEADROOM
    }

    /// Frees a resolved node together with its immediate children.
    fn recycle(&mut self, idx: u32) {
        self.bin.push_back(idx);

        let mut child = self.nodes[idx as usize].first_child;

        while child != 0 {
            self.bin.push_back(child);
            child = self.nodes[child as usize].next_sibling;
        }
    }
}

#[derive(Debug, Default, Clone)]
struct PnsFrame {
    parent: u32,
    pv: Vec<Move>,
}

/// The [proof-number search].
///
/// Runs single-threaded over an explicit AND/OR game tree: OR nodes are the
/// attacker's, proved as soon as one child is proved; AND nodes are the
/// defender's, proved only once every child is.
///
/// [proof-number search]: https://www.chessprogramming.org/Proof-Number_Search
#[derive(Debug)]
pub struct Pns {
    root: Position,
    root_moves: RootMoves,
    ctrl: Arc<Control>,
    oracle: Arc<Oracle>,
    tx: UnboundedSender<Event>,
    hash_mb: usize,
    king_moves: usize,
    mate: u32,
    saved: u64,
    solved: u64,
    proven: u64,
    disproven: u64,
    recycled: u64,
}

impl Pns {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        root: Position,
        root_moves: RootMoves,
        ctrl: Arc<Control>,
        oracle: Arc<Oracle>,
        tx: UnboundedSender<Event>,
        hash_mb: usize,
        king_moves: usize,
        mate: u32,
    ) -> Self {
        Pns {
            root,
            root_moves,
            ctrl,
            oracle,
            tx,
            hash_mb,
            king_moves,
            mate,
            saved: 0,
            solved: 0,
            proven: 0,
            disproven: 0,
            recycled: 0,
        }
    }

    fn message(&self, msg: String) {
        let _ = self.tx.unbounded_send(Event::Message(msg));
    }

    fn report(&self, target_depth: usize) {
        let rm = &self.root_moves[0];

        let info = Info::new(
            target_depth as u32,
            rm.sel_depth,
            self.ctrl.elapsed(),
            self.ctrl.nodes(),
            self.ctrl.tb_hits(),
            rm.score,
            rm.pv.clone(),
        );

        let _ = self.tx.unbounded_send(Event::Info(info));
    }

    /// The `(pn, dn)` pair of a freshly created child, when it is terminal.
    fn evaluate(&self, child: &Position, and_node: bool, at_horizon: bool) -> Option<(u32, u32)> {
        if child.legal_moves().is_empty() {
            if child.is_check() {
                // Checkmate: a win for the root side at AND nodes, a
                // mated attacker otherwise.
                return Some(if and_node { (0, INFINITE) } else { (INFINITE, 0) });
            }

            // Stalemates count against the prover.
            return Some((INFINITE, 0));
        }

        if and_node && self.king_moves < 8 && child.king_mobility() > self.king_moves {
            return Some((INFINITE, 0));
        }

        if !and_node && child.count(child.turn()) == 1 {
            return Some((INFINITE, 0));
        }

        if child.is_draw() || at_horizon {
            return Some((INFINITE, 0));
        }

        if let Some(wdl) = self.oracle.probe_wdl(child) {
            self.ctrl.count_tb_hits(0, 1);

            if syzygy::is_loss(wdl) {
                if !and_node {
                    return Some((INFINITE, 0));
                }
            } else if syzygy::is_win(wdl) {
                if and_node {
                    return Some((INFINITE, 0));
                }
            } else {
                return Some((INFINITE, 0));
            }
        }

        None
    }

    /// Runs the search to completion and returns the root moves together
    /// with the reported depth.
    pub fn run(mut self) -> (RootMoves, u32) {
        let target_depth = (2 * self.mate as usize - 1).min(MAX_PLY - 1);

        for rm in &mut self.root_moves {
            rm.score = Score::DRAW;
            rm.sel_depth = target_depth as u32;
        }

        let node_count = (self.hash_mb << 20) / std::mem::size_of::<Node>();

        let Some(mut arena) = Arena::with_capacity(node_count) else {
            self.message(format!(
                "Failed to allocate {} MB for the proof tree.",
                self.hash_mb
            ));

            return (self.root_moves, target_depth as u32);
        };

        // Index 0 doubles as the root and the null link: the root can never
        // be anyone's child or sibling.
        arena.nodes[0] = Node {
            action: None,
            pn: 1,
            dn: 1,
            next_sibling: 0,
            first_child: 0,
        };

        self.saved += 1;

        let mut stack = vec![PnsFrame::default(); MAX_PLY + 2];
        let mut path = Vec::with_capacity(MAX_PLY + 2);
        path.push(self.root.clone());

        let mut last_output = Instant::now();
        let mut update_pv = false;

        while !self.ctrl.stopped() {
            // Selection: descend towards the most-proving node, picking the
            // child with the smallest proof number at OR nodes and the
            // smallest disproof number at AND nodes.
            let mut current: u32 = 0;
            let mut ply: usize = 0;

            loop {
                let first_child = arena.nodes[current as usize].first_child;

                if first_child == 0 || ply >= target_depth {
                    break;
                }

                let parent_pn = arena.nodes[current as usize].pn;
                let parent_dn = arena.nodes[current as usize].dn;
                let mut child = first_child;
                let mut best = child;

                if ply % 2 == 1 {
                    let mut min_dn = INFINITE + 1;

                    while child != 0 {
                        let c = &arena.nodes[child as usize];

                        if c.dn < min_dn {
                            min_dn = c.dn;
                            best = child;
                        }

                        // Descending further would not change the parent.
                        if c.dn == parent_dn {
                            break;
                        }

                        child = c.next_sibling;
                    }
                } else {
                    let mut min_pn = INFINITE + 1;

                    while child != 0 {
                        let c = &arena.nodes[child as usize];

                        if c.pn < min_pn {
                            min_pn = c.pn;
                            best = child;
                        }

                        if c.pn == parent_pn {
                            break;
                        }

                        child = c.next_sibling;
                    }
                }

                let action = arena.nodes[best as usize].action.clone().assume();
                let next = path[ply].child(&action);
                self.ctrl.count_node(0);

                path.push(next);
                ply += 1;
                stack[ply].parent = current;
                current = best;
            }

            // Expansion and evaluation: generate the children of the
            // most-proving node and score each immediately.
            let ranked = score_and_rank(&path[ply], ply);
            let and_node = (ply + 1) % 2 == 1;
            let mut first_move = true;
            let mut prev_sibling = 0u32;
            let mut move_count = 0usize;

            for rm in &ranked {
                let m = &rm.mov;

                // Only the prepared root moves seed the tree.
                if current == 0 && !self.root_moves.iter().any(|r| r.head() == m) {
                    continue;
                }

                // Just like in the alpha-beta search, non-checking moves at
                // the frontier cannot contribute to a proof.
                if ply == target_depth - 1 && move_count > 0 && !path[ply].gives_check(m) {
                    continue;
                }

                move_count += 1;

                let child_pos = path[ply].child(m);
                self.ctrl.count_node(0);

                let Some((idx, reused)) = arena.alloc() else {
                    self.message("Running out of memory ...".to_string());
                    self.ctrl.abort();
                    break;
                };

                if reused {
                    self.recycled += 1;
                }

                let n = child_pos.legal_moves().len() as u32;

                // New nodes are internal by default, estimated at the
                // number of moves necessary to prove or disprove them.
                let (mut pn, mut dn) = if and_node { (1 + n, 1) } else { (1, 1 + n) };

                if let Some((p, d)) = self.evaluate(&child_pos, and_node, ply + 1 == target_depth) {
                    (pn, dn) = (p, d);
                    self.solved += 1;

                    if pn == 0 {
                        self.proven += 1;

                        // A mate at the full distance starts a new proof
                        // line.
                        if ply + 1 == target_depth {
                            update_pv = true;
                            stack[ply + 1].pv.clear();
                            stack[ply + 1].pv.push(m.clone());
                        }
                    } else {
                        self.disproven += 1;
                    }
                }

                arena.nodes[idx as usize] = Node {
                    action: Some(m.clone()),
                    pn,
                    dn,
                    next_sibling: 0,
                    first_child: 0,
                };

                self.saved += 1;

                if first_move {
                    arena.nodes[current as usize].first_child = idx;
                    first_move = false;
                } else {
                    arena.nodes[prev_sibling as usize].next_sibling = idx;
                }

                prev_sibling = idx;

                // An OR parent is resolved by the first proven child, an
                // AND parent by the first disproven one.
                if (and_node && pn == 0) || (!and_node && dn == 0) {
                    break;
                }

                if arena.is_low() {
                    self.message("Running out of memory ...".to_string());
                    self.ctrl.abort();
                }
            }

            if arena.nodes[current as usize].first_child == 0 {
                // The arena filled up before a single child was created.
                break;
            }

            // Backpropagation: recompute every node on the path back to the
            // root, recycling resolved children along the way.
            loop {
                let first_child = arena.nodes[current as usize].first_child;

                let (pn, dn) = if ply % 2 == 1 {
                    let mut sum_pn: u32 = 0;
                    let mut min_dn = INFINITE + 1;
                    let mut child = first_child;

                    while child != 0 {
                        let (cpn, cdn, next) = {
                            let c = &arena.nodes[child as usize];
                            (c.pn, c.dn, c.next_sibling)
                        };

                        sum_pn = (sum_pn + cpn).min(INFINITE);
                        min_dn = min_dn.min(cdn);

                        if cpn == INFINITE && cdn == 0 {
                            arena.recycle(child);
                        }

                        child = next;
                    }

                    (sum_pn, min_dn)
                } else {
                    let mut min_pn = INFINITE + 1;
                    let mut sum_dn: u32 = 0;
                    let mut child = first_child;

                    while child != 0 {
                        let (cpn, cdn, next) = {
                            let c = &arena.nodes[child as usize];
                            (c.pn, c.dn, c.next_sibling)
                        };

                        min_pn = min_pn.min(cpn);
                        sum_dn = (sum_dn + cdn).min(INFINITE);

                        if cpn == 0 && cdn == INFINITE {
                            arena.recycle(child);
                        }

                        child = next;
                    }

                    (min_pn, sum_dn)
                };

                arena.nodes[current as usize].pn = pn;
                arena.nodes[current as usize].dn = dn;

                if current == 0 {
                    break;
                }

                if update_pv {
                    let action = arena.nodes[current as usize].action.clone().assume();
                    let (near, far) = stack.split_at_mut(ply + 1);
                    let pv = &mut near[ply].pv;

                    pv.clear();
                    pv.push(action);
                    pv.extend_from_slice(&far[0].pv);
                }

                path.pop();
                current = stack[ply].parent;
                ply -= 1;
            }

            debug_assert_eq!(current, 0);
            debug_assert_eq!(ply, 0);

            // Attach the recursively built proof line to its root move.
            if update_pv {
                let line = stack[1].pv.clone();
                let head = line.first().assume().clone();

                if let Some(rm) = self.root_moves.iter_mut().find(|rm| *rm.head() == head) {
                    if rm.pv.len() < line.len() {
                        rm.pv = line;
                    }
                }

                update_pv = false;
            }

            let root_pn = arena.nodes[0].pn;
            let root_dn = arena.nodes[0].dn;

            if root_pn == 0 || root_dn == 0 {
                self.ctrl.abort();
            } else if self.ctrl.nodes() >= self.ctrl.limits().max_nodes() {
                self.ctrl.abort();
            } else if self.ctrl.elapsed() >= self.ctrl.limits().max_time() {
                self.ctrl.abort();
            }

            let mut give_output = false;

            if !self.ctrl.stopped() {
                let elapsed = self.ctrl.elapsed().as_millis();
                let since = last_output.elapsed();

                give_output = if elapsed < 2_100 {
                    since >= Duration::from_millis(200)
                } else if elapsed < 10_100 {
                    since >= Duration::from_millis(1_000)
                } else if elapsed < 60_100 {
                    since >= Duration::from_millis(2_500)
                } else {
                    since >= Duration::from_millis(5_000)
                };

                if give_output {
                    last_output = Instant::now();
                }
            }

            if self.ctrl.stopped() || give_output {
                // Only a proven root earns a mate score.
                if root_pn == 0 {
                    let mut child = arena.nodes[0].first_child;

                    while child != 0 && arena.nodes[child as usize].pn != 0 {
                        child = arena.nodes[child as usize].next_sibling;
                    }

                    if child != 0 {
                        let action = arena.nodes[child as usize].action.clone().assume();

                        if let Some(rm) =
                            self.root_moves.iter_mut().find(|rm| *rm.head() == action)
                        {
                            rm.score = Score::new(Score::MATE.get() - rm.pv.len() as i16);
                        }
                    }
                }

                self.root_moves
                    .sort_by_key(|rm| Reverse((rm.score, rm.tb_rank)));

                if !self.ctrl.stopped() {
                    self.report(target_depth);
                }
            }
        }

        self.message("Search statistics summary".to_string());
        self.message(format!(
            "Nodes: {}   solved: {}   proven: {}   disproven: {}   recycled: {}",
            self.saved, self.solved, self.proven, self.disproven, self.recycled
        ));

        (self.root_moves, target_depth as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Engine, Event, Limits, Options};
    use futures::executor::block_on_stream;

    fn pns_options() -> Options {
        Options {
            proof_number_search: true,
            pns_hash: crate::search::PnsHashSize::new(1),
            ..Options::default()
        }
    }

    fn solve(fen: &str, limits: Limits) -> Vec<Event> {
        let mut engine = Engine::with_options(&pns_options());
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

    fn message_containing(events: &[Event], needle: &str) -> bool {
        events.iter().any(|e| match e {
            Event::Message(msg) => msg.contains(needle),
            _ => false,
        })
    }

    #[test]
    fn allocation_is_bump_first_then_recycled() {
        let mut arena = Arena::with_capacity(256).unwrap();

        assert_eq!(arena.alloc(), Some((1, false)));
        assert_eq!(arena.alloc(), Some((2, false)));

        // Too few freed slots for reuse to kick in.
        arena.bin.push_back(1);
        assert_eq!(arena.alloc(), Some((3, false)));
    }

    #[test]
    fn recycling_kicks_in_past_the_threshold() {
        let mut arena = Arena::with_capacity(1024).unwrap();

        for _ in 0..Arena::RECYCLING_THRESHOLD {
            let (idx, _) = arena.alloc().unwrap();
            arena.bin.push_back(idx);
        }

        assert_eq!(arena.alloc(), Some((1, true)));
    }

    #[test]
    fn an_exhausted_arena_reports_low_memory() {
        let mut arena = Arena::with_capacity(Arena::HEADROOM + 10).unwrap();
        assert!(arena.is_low());

        for _ in 1..Arena::HEADROOM + 10 {
            assert!(arena.alloc().is_some());
        }

        assert_eq!(arena.alloc(), None);
    }

    #[test]
    fn recycling_a_node_frees_its_immediate_children() {
        let mut arena = Arena::with_capacity(256).unwrap();

        let (parent, _) = arena.alloc().unwrap();
        let (a, _) = arena.alloc().unwrap();
        let (b, _) = arena.alloc().unwrap();

        arena.nodes[parent as usize].first_child = a;
        arena.nodes[a as usize].next_sibling = b;

        arena.recycle(parent);
        assert_eq!(Vec::from(arena.bin.clone()), vec![parent, a, b]);
    }

    #[test]
    fn proves_a_mate_in_one() {
        let events = solve("4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1", Limits::mate(1));

        let info = final_info(&events);
        assert_eq!(info.score(), Score::mate_in(1));
        assert_eq!(info.pv().len(), 1);
        assert!(message_containing(&events, "Success! Mate in 1 found!"));

        let pos: Position = "4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1".parse().unwrap();
        assert!(pos.child(&info.pv()[0]).is_checkmate());
    }

    #[test]
    fn proves_a_mate_in_two_with_a_full_line() {
        let events = solve("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", Limits::mate(2));

        let info = final_info(&events);
        assert_eq!(info.score(), Score::mate_in(3));
        assert_eq!(info.pv().len(), 3);

        let mut pos: Position = "7k/8/5K2/8/8/8/8/1Q6 w - - 0 1".parse().unwrap();
        for m in info.pv() {
            pos.play(m);
        }

        assert!(pos.is_checkmate());
    }

    #[test]
    fn disproves_an_impossible_mate() {
        let events = solve("7k/8/8/8/8/8/8/6QK w - - 0 1", Limits::mate(1));

        assert!(message_containing(&events, "Failure! No mate in 1 found!"));
        assert!(final_info(&events).score() < Score::MATE_IN_MAX_PLY);
    }

    #[test]
    fn reports_search_statistics() {
        let events = solve("4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1", Limits::mate(1));
        assert!(message_containing(&events, "Search statistics summary"));
        assert!(message_containing(&events, "proven:"));
    }

    #[test]
    fn respects_the_node_limit() {
        let events = solve(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            Limits::mate(4).with_nodes(256),
        );

        assert!(message_containing(&events, "Failure!"));
        assert!(matches!(events.last(), Some(Event::BestMove { .. })));
    }

    #[test]
    fn searchmoves_restricts_the_proof_tree() {
        let limits = Limits::mate(1).with_searchmoves(vec!["a1a2".parse().unwrap()]);
        let events = solve("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", limits);

        assert!(message_containing(&events, "Failure!"));
    }
}
