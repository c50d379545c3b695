use crate::chess::Position;
use crate::search::{Options, RootMoves};
use shakmaty::Chess;
use std::cmp::Reverse;

pub use shakmaty_syzygy::Wdl;
use shakmaty_syzygy::Tablebase;

#[cfg(unix)]
const PATH_DELIMITER: char = ':';

#[cfg(windows)]
const PATH_DELIMITER: char = ';';

/// Whether a verdict is a win for the side to move.
#[inline(always)]
pub fn is_win(wdl: Wdl) -> bool {
    matches!(wdl, Wdl::Win | Wdl::CursedWin)
}

/// Whether a verdict is a loss for the side to move.
#[inline(always)]
pub fn is_loss(wdl: Wdl) -> bool {
    matches!(wdl, Wdl::Loss | Wdl::BlessedLoss)
}

/// The endgame tablebase oracle.
///
/// Probes [Syzygy] tables to rank root moves by distance-to-zero and to cut
/// subtrees that cannot be part of a forced mate.
///
/// [Syzygy]: https://www.chessprogramming.org/Syzygy_Bases
#[derive(Default)]
pub struct Oracle {
    tables: Option<Tablebase<Chess>>,
    cardinality: usize,
    rule50: bool,
}

impl std::fmt::Debug for Oracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Oracle")
            .field("available", &self.available())
            .field("cardinality", &self.cardinality)
            .field("rule50", &self.rule50)
            .finish()
    }
}

impl Oracle {
    /// Loads the tables found under the configured path.
    pub fn load(options: &Options) -> Self {
        let mut tables = Tablebase::new();
        let mut found = 0;

        if let Some(paths) = &options.syzygy_path {
            for dir in paths.split(PATH_DELIMITER).filter(|d| !d.is_empty()) {
                found += tables.add_directory(dir).unwrap_or(0);
            }
        }

        let tables = (found > 0).then_some(tables);

        Oracle {
            cardinality: tables
                .as_ref()
                .map_or(0, |t| t.max_pieces().min(options.syzygy_probe_limit.get())),
            rule50: options.syzygy_50_move_rule,
            tables,
        }
    }

    /// Whether any tables were found.
    #[inline(always)]
    pub fn available(&self) -> bool {
        self.tables.is_some()
    }

    /// The maximum number of pieces probes may involve.
    #[inline(always)]
    pub fn cardinality(&self) -> usize {
        self.cardinality
    }

    /// Whether this position may be probed at all.
    #[inline(always)]
    pub fn covers(&self, pos: &Position) -> bool {
        self.tables.is_some()
            && pos.count_all() <= self.cardinality
            && !pos.has_castling_rights()
    }

    /// Probes the win/draw/loss verdict for the side to move.
    ///
    /// A failed probe means no information, never an error.
    pub fn probe_wdl(&self, pos: &Position) -> Option<Wdl> {
        if !self.covers(pos) {
            return None;
        }

        let tables = self.tables.as_ref()?;

        match tables.probe_wdl_after_zeroing(pos.rules()) {
            Ok(wdl) => Some(self.collapse(wdl)),
            Err(_) => None,
        }
    }

    /// Ranks the root moves by distance-to-zero, falling back to plain
    /// win/draw/loss ranks when the DTZ tables are missing.
    ///
    /// Returns whether the position was ranked by the tablebases.
    pub fn rank_root_moves(&self, pos: &Position, moves: &mut RootMoves) -> bool {
        if moves.is_empty() || !self.covers(pos) {
            return false;
        }

        let ranked = self.rank_by_dtz(pos, moves) || self.rank_by_wdl(pos, moves);

        if ranked {
            moves.sort_by_key(|rm| Reverse(rm.tb_rank));
        } else {
            for rm in moves.iter_mut() {
                rm.tb_rank = 0;
            }
        }

        ranked
    }

    fn rank_by_dtz(&self, pos: &Position, moves: &mut RootMoves) -> bool {
        let Some(tables) = self.tables.as_ref() else {
            return false;
        };

        for rm in moves.iter_mut() {
            let next = pos.child(rm.head());

            let dtz = if next.is_checkmate() {
                1
            } else {
                match tables.probe_dtz(next.rules()) {
                    Ok(dtz) => -dtz.ignore_rounding().0,
                    Err(_) => return false,
                }
            };

            let cnt50 = next.halfmoves() as i32;

            rm.tb_rank = if dtz > 0 {
                if dtz + cnt50 <= 99 && !next.is_draw() {
                    1000
                } else {
                    1000 - (dtz + cnt50)
                }
            } else if dtz < 0 {
                if -dtz * 2 + cnt50 < 100 {
                    -1000
                } else {
                    -1000 + (-dtz + cnt50)
                }
            } else {
                0
            };
        }

        true
    }

    fn rank_by_wdl(&self, pos: &Position, moves: &mut RootMoves) -> bool {
        let Some(tables) = self.tables.as_ref() else {
            return false;
        };

        for rm in moves.iter_mut() {
            let next = pos.child(rm.head());

            let wdl = match tables.probe_wdl_after_zeroing(next.rules()) {
                Ok(wdl) => flip(self.collapse(wdl)),
                Err(_) => return false,
            };

            rm.tb_rank = match wdl {
                Wdl::Win => 1000,
                Wdl::CursedWin => 900,
                Wdl::Draw => 0,
                Wdl::BlessedLoss => -900,
                Wdl::Loss => -1000,
            };
        }

        true
    }

    fn collapse(&self, wdl: Wdl) -> Wdl {
        if self.rule50 {
            wdl
        } else {
            match wdl {
                Wdl::CursedWin => Wdl::Win,
                Wdl::BlessedLoss => Wdl::Loss,
                wdl => wdl,
            }
        }
    }
}

/// The verdict from the opponent's point of view.
#[inline(always)]
fn flip(wdl: Wdl) -> Wdl {
    match wdl {
        Wdl::Win => Wdl::Loss,
        Wdl::CursedWin => Wdl::BlessedLoss,
        Wdl::Draw => Wdl::Draw,
        Wdl::BlessedLoss => Wdl::CursedWin,
        Wdl::Loss => Wdl::Win,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::RootMove;

    #[test]
    fn an_empty_path_yields_no_tables() {
        let oracle = Oracle::load(&Options::default());
        assert!(!oracle.available());
        assert_eq!(oracle.cardinality(), 0);
    }

    #[test]
    fn a_bogus_path_yields_no_tables() {
        let options = Options {
            syzygy_path: Some("/nonexistent/syzygy/path".to_string()),
            ..Options::default()
        };

        let oracle = Oracle::load(&options);
        assert!(!oracle.available());
    }

    #[test]
    fn probing_without_tables_yields_no_information() {
        let oracle = Oracle::load(&Options::default());
        let pos: Position = "4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1".parse().unwrap();
        assert_eq!(oracle.probe_wdl(&pos), None);
        assert!(!oracle.covers(&pos));
    }

    #[test]
    fn ranking_without_tables_reports_failure() {
        let oracle = Oracle::load(&Options::default());
        let pos: Position = "4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1".parse().unwrap();

        let mut moves: RootMoves = pos
            .legal_moves()
            .iter()
            .map(|m| RootMove::new(m.clone()))
            .collect();

        assert!(!oracle.rank_root_moves(&pos, &mut moves));
        assert!(moves.iter().all(|rm| rm.tb_rank == 0));
    }

    #[test]
    fn wins_and_losses_are_classified() {
        assert!(is_win(Wdl::Win));
        assert!(is_win(Wdl::CursedWin));
        assert!(is_loss(Wdl::Loss));
        assert!(is_loss(Wdl::BlessedLoss));
        assert!(!is_win(Wdl::Draw));
        assert!(!is_loss(Wdl::Draw));
    }
}
