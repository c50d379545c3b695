use crate::chess::{Move, Position, Role};
use crate::search::{Control, MAX_PLY, RootMove, RootMoves, Score};
use crate::syzygy::Oracle;
use std::cmp::Reverse;

/// Whether the side to move has one of the basic mating configurations
/// against a bare king: KQ, KR, KBB, KBN or KNNN.
pub fn is_basic_mate(pos: &Position) -> bool {
    let us = pos.turn();

    if pos.count(us.other()) != 1 || pos.count_piece(us, Role::Pawn) != 0 {
        return false;
    }

    let knights = pos.count_piece(us, Role::Knight);
    let bishops = pos.count_piece(us, Role::Bishop);
    let rooks = pos.count_piece(us, Role::Rook);
    let queens = pos.count_piece(us, Role::Queen);

    matches!(
        (knights, bishops, rooks, queens),
        (0, 0, 1, 0) | (0, 0, 0, 1) | (0, 2, 0, 0) | (1, 1, 0, 0) | (3, 0, 0, 0)
    )
}

/// Builds a mating line by greedily following the distance-to-zero tables.
///
/// Called instead of searching when the root is a basic endgame the
/// tablebases already declare won; repeatedly picks the best-ranked move
/// until the defender is mated.
pub fn walk(
    pos: &Position,
    oracle: &Oracle,
    ctrl: &Control,
    worker: usize,
    ply: usize,
) -> (Score, Vec<Move>) {
    if ctrl.stopped() || ply >= MAX_PLY {
        return (Score::DRAW, Vec::new());
    }

    let legal = pos.legal_moves();

    if legal.is_empty() {
        let score = if pos.is_check() {
            Score::mated_in(ply)
        } else {
            Score::DRAW
        };

        return (score, Vec::new());
    }

    let mut moves: RootMoves = legal.iter().map(|m| RootMove::new(m.clone())).collect();

    if !oracle.rank_root_moves(pos, &mut moves) {
        return (Score::DRAW, Vec::new());
    }

    ctrl.count_tb_hits(worker, moves.len() as u64);
    moves.sort_by_key(|rm| Reverse(rm.tb_rank));

    let best = moves[0].head().clone();
    ctrl.count_node(worker);

    let (value, tail) = walk(&pos.child(&best), oracle, ctrl, worker, ply + 1);

    let mut pv = Vec::with_capacity(tail.len() + 1);
    pv.push(best);
    pv.extend(tail);

    (-value, pv)
}
