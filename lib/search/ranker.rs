use crate::chess::{Bitboard, Move, Position, Role, Square};
use crate::chess::{distance, king_ring, pseudo_attacks};
use arrayvec::ArrayVec;
use std::cmp::Reverse;

/// A legal move together with its rank.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RankedMove {
    pub mov: Move,
    pub rank: i32,
}

/// A buffer large enough for every legal move.
pub type RankedMoves = ArrayVec<RankedMove, 256>;

/// Basic piece values used for move ordering.
#[inline(always)]
fn mvv(role: Role) -> i32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 300,
        Role::Bishop => 305,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

/// Scores moves by their mating potential.
///
/// Checking moves rank at least 8000; everything else is ordered by how much
/// it constrains the defending king. The defender's moves are instead ranked
/// by their ability to parry.
#[derive(Debug)]
pub struct Ranker<'a> {
    pos: &'a Position,
    ply: usize,
    in_check: bool,
    checker: Option<Square>,
    our_king: Square,
    their_king: Square,
    king_ring: Bitboard,
    no_heavy_pieces: bool,
}

impl<'a> Ranker<'a> {
    pub fn new(pos: &'a Position, ply: usize) -> Self {
        let us = pos.turn();
        let their_king = pos.their_king();

        Ranker {
            pos,
            ply,
            in_check: pos.is_check(),
            checker: pos.checkers().first(),
            our_king: pos.our_king(),
            their_king,
            king_ring: king_ring(their_king),
            no_heavy_pieces: pos.count_piece(us, Role::Queen) == 0
                && pos.count_piece(us, Role::Rook) <= 1,
        }
    }

    /// The rank of a legal move.
    pub fn rank(&self, m: &Move) -> i32 {
        let mut rank = 0;

        if self.pos.gives_check(m) {
            rank += 8000;
        }

        if let Some(victim) = m.capture() {
            rank += mvv(victim);
        }

        if self.ply % 2 == 1 {
            self.rank_defense(m, &mut rank);
        } else {
            self.rank_attack(m, &mut rank);
        }

        rank
    }

    /// Bonuses for the side to get mated.
    fn rank_defense(&self, m: &Move, rank: &mut i32) {
        let to = m.to();

        if self.in_check {
            if m.is_capture() {
                // Capturing the checker parries most directly.
                *rank += 1000;
            } else if let Some(checker) = self.checker {
                if m.role() != Role::King && crate::chess::aligned(checker, self.our_king, to) {
                    // Interposition on the checking ray.
                    *rank += 400;
                }
            }
        }

        // Sliders moving onto a king ray may create a pin.
        if m.role() == Role::Bishop
            && pseudo_attacks(Role::Bishop, self.their_king).contains(to)
            && *rank < 6000
        {
            *rank += 200;
        } else if m.role() == Role::Rook
            && pseudo_attacks(Role::Rook, self.their_king).contains(to)
            && *rank < 6000
        {
            *rank += 300;
        } else if m.role() == Role::Queen
            && pseudo_attacks(Role::Queen, self.their_king).contains(to)
            && *rank < 6000
        {
            *rank += 350;
        }
    }

    /// Bonuses for the mating side.
    fn rank_attack(&self, m: &Move, rank: &mut i32) {
        let pos = self.pos;
        let to = m.to();

        if *rank >= 6000 {
            if m.role() == Role::Knight {
                *rank += 400;
            } else if (m.role() == Role::Queen || m.role() == Role::Rook)
                && distance(self.their_king, to) == 1
            {
                // Contact checks leave the defender few replies.
                *rank += 500;
            }

            let replies = pos.count_moves_after(m) as i32;
            *rank += if replies == 0 { 4096 } else { -8 * replies };
        }

        if pos.advanced_pawn_push(m) {
            *rank += 1000;
        }

        if m.role() == Role::King && self.no_heavy_pieces {
            *rank += 480 - 20 * distance(to, self.their_king);
        }

        if pos.frees_promotion_square(m) {
            *rank += 500;
        }

        // A piece able to give check on the next move, or attacking squares
        // next to the defending king.
        if m.role() == Role::Knight {
            if !(pos.attacks_from(Role::Knight, to) & pos.check_squares(Role::Knight)).is_empty() {
                *rank += 600;
            }

            *rank += 256 * (pseudo_attacks(Role::Knight, to) & self.king_ring).count() as i32;
        } else if m.role() == Role::Queen {
            if !(pos.attacks_from(Role::Queen, to) & pos.check_squares(Role::Queen)).is_empty() {
                *rank += 500;
            }

            *rank += 128 * (pseudo_attacks(Role::Queen, to) & self.king_ring).count() as i32;
        } else if m.role() == Role::Rook {
            if !(pos.attacks_from(Role::Rook, to) & pos.check_squares(Role::Rook)).is_empty() {
                *rank += 400;
            }

            *rank += 96 * (pseudo_attacks(Role::Rook, to) & self.king_ring).count() as i32;
        } else if m.role() == Role::Bishop {
            if !(pos.attacks_from(Role::Bishop, to) & pos.check_squares(Role::Bishop)).is_empty() {
                *rank += 300;
            }

            *rank += 64 * (pseudo_attacks(Role::Bishop, to) & self.king_ring).count() as i32;
        }

        // Try to prevent some checks against our own king.
        if pseudo_attacks(Role::Bishop, self.our_king).contains(to) {
            *rank += 128 - 32 * distance(self.our_king, to);
        }

        if pseudo_attacks(Role::Rook, self.our_king).contains(to) {
            *rank += 128 - 32 * distance(self.our_king, to);
        }
    }
}

/// Generates and scores all legal moves, best first.
pub fn score_and_rank(pos: &Position, ply: usize) -> RankedMoves {
    let ranker = Ranker::new(pos, ply);

    let mut moves: RankedMoves = pos
        .legal_moves()
        .iter()
        .map(|m| RankedMove {
            rank: ranker.rank(m),
            mov: m.clone(),
        })
        .collect();

    moves.sort_by_key(|rm| Reverse(rm.rank));
    moves
}
