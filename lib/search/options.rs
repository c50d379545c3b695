use derive_more::with_trait::{Display, Error};
use std::str::FromStr;

/// The reason why parsing an option value failed.
#[derive(Debug, Display, Clone, Eq, PartialEq, Error)]
#[display("expected integer in the range `({_0}..={_1})`")]
pub struct OptionOutOfRange(#[error(not(source))] pub i64, #[error(not(source))] pub i64);

macro_rules! spin_option {
    ($(#[$attr:meta])* $name:ident, $repr:ty, $min:literal..=$max:literal, $default:literal) => {
        $(#[$attr])*
        #[derive(Debug, Display, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[cfg_attr(test, derive(test_strategy::Arbitrary))]
        pub struct $name(#[cfg_attr(test, strategy($min..=$max as $repr))] $repr);

        impl $name {
            pub const MIN: $repr = $min;
            pub const MAX: $repr = $max;

            #[inline(always)]
            pub fn new(value: $repr) -> Self {
                assert!(($min..=$max).contains(&value));
                Self(value)
            }

            #[inline(always)]
            pub fn get(&self) -> $repr {
                self.0
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self($default)
            }
        }

        impl FromStr for $name {
            type Err = OptionOutOfRange;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let out_of_range = OptionOutOfRange($min, $max);
                match s.trim().parse::<$repr>() {
                    Ok(v) if ($min..=$max).contains(&v) => Ok(Self(v)),
                    _ => Err(out_of_range),
                }
            }
        }
    };
}

spin_option! {
    /// The size of the thread pool.
    ThreadCount, usize, 1..=512, 1
}

spin_option! {
    /// The defender king mobility cap.
    ///
    /// Defender positions with more legal king moves than this are assumed
    /// to be unmatable and pruned outright.
    KingMoves, usize, 1..=8, 8
}

spin_option! {
    /// The defender total mobility cap.
    AllMoves, usize, 1..=250, 250
}

spin_option! {
    /// The size of the proof-number search arena, in MiB.
    PnsHashSize, usize, 1..=32768, 256
}

spin_option! {
    /// The size of the general-purpose transposition table, in MiB.
    ///
    /// Accepted for GUI compatibility; the mate solver does not consult it.
    HashSize, usize, 1..=32768, 16
}

spin_option! {
    /// The maximum number of pieces for tablebase probes.
    SyzygyProbeLimit, usize, 0..=7, 7
}

spin_option! {
    /// The minimum depth at which to probe the tablebases.
    SyzygyProbeDepth, usize, 1..=100, 1
}

/// Configuration options.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub struct Options {
    /// The size of the thread pool.
    pub threads: ThreadCount,

    /// The defender king mobility cap.
    pub king_moves: KingMoves,

    /// The defender total mobility cap.
    pub all_moves: AllMoves,

    /// Whether to solve with proof-number search instead of alpha-beta.
    pub proof_number_search: bool,

    /// The size of the proof-number search arena, in MiB.
    pub pns_hash: PnsHashSize,

    /// The size of the transposition table, in MiB.
    pub hash: HashSize,

    /// Whether to print the rank of every root move before searching.
    pub root_move_stats: bool,

    /// Whether to prune bishop moves in positions with many same-colored
    /// bishops.
    pub bishop_guard: bool,

    /// The directories containing Syzygy tablebase files.
    #[cfg_attr(test, strategy(proptest::strategy::Just(None)))]
    pub syzygy_path: Option<String>,

    /// The minimum depth at which to probe the tablebases.
    pub syzygy_probe_depth: SyzygyProbeDepth,

    /// The maximum number of pieces for tablebase probes.
    pub syzygy_probe_limit: SyzygyProbeLimit,

    /// Whether tablebase probes respect the 50-move rule.
    pub syzygy_50_move_rule: bool,

    /// Whether to emit castling moves in Chess960 notation.
    pub chess960: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            threads: ThreadCount::default(),
            king_moves: KingMoves::default(),
            all_moves: AllMoves::default(),
            proof_number_search: false,
            pns_hash: PnsHashSize::default(),
            hash: HashSize::default(),
            root_move_stats: false,
            bishop_guard: true,
            syzygy_path: None,
            syzygy_probe_depth: SyzygyProbeDepth::default(),
            syzygy_probe_limit: SyzygyProbeLimit::default(),
            syzygy_50_move_rule: true,
            chess960: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_strategy::proptest;

    #[proptest]
    fn parsing_a_thread_count_in_range_succeeds(#[strategy(1..=512usize)] n: usize) {
        assert_eq!(n.to_string().parse(), Ok(ThreadCount::new(n)));
    }

    #[proptest]
    fn parsing_an_out_of_range_king_moves_fails(#[strategy(9..100usize)] n: usize) {
        assert!(n.to_string().parse::<KingMoves>().is_err());
        assert!("0".parse::<KingMoves>().is_err());
    }

    #[proptest]
    fn parsing_garbage_fails(#[strategy("[a-z]+")] s: String) {
        assert!(s.parse::<AllMoves>().is_err());
    }

    #[test]
    fn defaults_disable_the_mobility_caps() {
        let options = Options::default();
        assert_eq!(options.king_moves.get(), 8);
        assert_eq!(options.all_moves.get(), 250);
        assert!(!options.proof_number_search);
        assert!(options.bishop_guard);
    }
}
