use crate::chess::UciMove;
use std::time::Duration;

/// Search limits that can be applied simultaneously.
///
/// The search stops when the first limit is reached.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Limits {
    /// Restricts the search to these root moves.
    pub searchmoves: Vec<UciMove>,

    /// The mate distance to prove, in moves.
    pub mate: u32,

    /// The maximum number of nodes to search.
    pub nodes: Option<u64>,

    /// The maximum amount of time to spend searching.
    pub movetime: Option<Duration>,

    /// Whether to keep the search open until a stop request arrives.
    pub infinite: bool,
}

impl Limits {
    /// Creates limits for a mate-in-`n` search.
    #[inline(always)]
    pub fn mate(n: u32) -> Self {
        Limits {
            mate: n,
            ..Default::default()
        }
    }

    /// Restricts the search to the given root moves.
    #[must_use]
    #[inline(always)]
    pub fn with_searchmoves(mut self, moves: Vec<UciMove>) -> Self {
        self.searchmoves = moves;
        self
    }

    /// Limits the number of nodes searched.
    #[must_use]
    #[inline(always)]
    pub fn with_nodes(mut self, nodes: u64) -> Self {
        self.nodes = Some(nodes);
        self
    }

    /// Limits the time spent searching.
    #[must_use]
    #[inline(always)]
    pub fn with_movetime(mut self, time: Duration) -> Self {
        self.movetime = Some(time);
        self
    }

    /// Get the effective maximum number of nodes.
    #[inline(always)]
    pub fn max_nodes(&self) -> u64 {
        self.nodes.unwrap_or(u64::MAX)
    }

    /// Get the effective maximum time.
    #[inline(always)]
    pub fn max_time(&self) -> Duration {
        self.movetime.unwrap_or(Duration::MAX)
    }
}
