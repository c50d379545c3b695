/// The benchmark suite: positions paired with the mate distance to search.
///
/// A mix of quick wins, a deeper forced mate and two refutations, so that
/// both the proving and the disproving paths contribute to the signature.
pub const POSITIONS: &[(&str, u32)] = &[
    ("4k3/8/3K4/3Q4/8/8/8/8 w - - 0 1", 1),
    ("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", 1),
    ("4k3/8/4K3/8/8/8/8/7R w - - 0 1", 1),
    ("7k/8/5K2/8/8/8/8/1Q6 w - - 0 1", 2),
    ("8/8/8/7k/8/5K2/8/1Q6 w - - 0 1", 3),
    ("7k/8/8/8/8/8/8/6QK w - - 0 1", 2),
    ("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1", 2),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::Position;

    #[test]
    fn every_bench_position_is_legal() {
        for (fen, mate) in POSITIONS {
            let pos: Position = fen.parse().unwrap();
            assert!(!pos.legal_moves().is_empty());
            assert!(*mate >= 1);
        }
    }
}
