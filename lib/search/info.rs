use crate::chess::Move;
use crate::search::Score;
use derive_more::with_trait::Constructor;
use std::time::Duration;

/// Information about an ongoing or finished search.
#[derive(Debug, Clone, Eq, PartialEq, Constructor)]
pub struct Info {
    depth: u32,
    sel_depth: u32,
    time: Duration,
    nodes: u64,
    tb_hits: u64,
    score: Score,
    pv: Vec<Move>,
}

impl Info {
    /// The depth searched.
    #[inline(always)]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The maximum ply reached.
    #[inline(always)]
    pub fn sel_depth(&self) -> u32 {
        self.sel_depth
    }

    /// The duration searched.
    #[inline(always)]
    pub fn time(&self) -> Duration {
        self.time
    }

    /// The number of nodes searched.
    #[inline(always)]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    /// The number of nodes searched per second.
    #[inline(always)]
    pub fn nps(&self) -> u64 {
        (self.nodes as f64 / self.time.as_secs_f64().max(1E-3)) as u64
    }

    /// The number of tablebase probes that returned a verdict.
    #[inline(always)]
    pub fn tb_hits(&self) -> u64 {
        self.tb_hits
    }

    /// The score of the best line found.
    #[inline(always)]
    pub fn score(&self) -> Score {
        self.score
    }

    /// The principal variation.
    #[inline(always)]
    pub fn pv(&self) -> &[Move] {
        &self.pv
    }

    /// The best move found, if any.
    #[inline(always)]
    pub fn best(&self) -> Option<&Move> {
        self.pv.first()
    }
}
