use crate::chess::{Move, Position};
use crate::search::{Ranker, Score};
use crate::syzygy::Oracle;
use std::cmp::Reverse;

/// A move at the root of the search tree.
///
/// Each root move carries its own principal variation; the first move of the
/// line is the root move itself.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RootMove {
    pub pv: Vec<Move>,
    pub score: Score,
    pub tb_rank: i32,
    pub sel_depth: u32,
}

impl RootMove {
    pub fn new(m: Move) -> Self {
        RootMove {
            pv: vec![m],
            score: Score::DRAW,
            tb_rank: 0,
            sel_depth: 0,
        }
    }

    /// The root move itself.
    #[inline(always)]
    pub fn head(&self) -> &Move {
        &self.pv[0]
    }
}

pub type RootMoves = Vec<RootMove>;

/// The ranked root moves of a position.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub moves: RootMoves,
    pub in_tb: bool,
}

/// Builds the ranked list of root moves.
///
/// Moves are ranked by the tablebases whenever the position is covered;
/// otherwise every move is scored like any other attacking move, with an
/// additional penalty per legal reply of the defending king.
pub fn prepare(pos: &Position, searchmoves: &[Move], oracle: &Oracle) -> Prepared {
    let mut moves: RootMoves = pos
        .legal_moves()
        .iter()
        .filter(|m| searchmoves.is_empty() || searchmoves.contains(m))
        .map(|m| RootMove::new(m.clone()))
        .collect();

    let in_tb = oracle.rank_root_moves(pos, &mut moves);

    if !in_tb {
        let ranker = Ranker::new(pos, 0);

        for rm in moves.iter_mut() {
            rm.tb_rank = ranker.rank(rm.head());

            let next = pos.child(rm.head());
            rm.tb_rank -= 40 * next.king_mobility() as i32;
        }
    }

    moves.sort_by_key(|rm| Reverse((rm.score, rm.tb_rank)));

    Prepared { moves, in_tb }
}

/// Splits the root moves round-robin across `n` workers.
pub fn distribute(moves: RootMoves, n: usize) -> Vec<RootMoves> {
    let mut shares = vec![RootMoves::new(); n];

    for (i, rm) in moves.into_iter().enumerate() {
        shares[i % n].push(rm);
    }

    shares
}
