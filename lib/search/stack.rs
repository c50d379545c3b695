use crate::chess::Move;
use crate::search::MAX_PLY;

/// A per-ply frame of the search stack.
#[derive(Debug, Default, Clone)]
struct Frame {
    pv: Vec<Move>,
}

/// The search stack.
///
/// Each frame owns the principal variation found below its ply; lines are
/// promoted towards the root as the search unwinds.
#[derive(Debug, Clone)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Default for Stack {
    fn default() -> Self {
        Stack {
            frames: vec![Frame::default(); MAX_PLY + 2],
        }
    }
}

impl Stack {
    /// The principal variation rooted at `ply`.
    #[inline(always)]
    pub fn line(&self, ply: usize) -> &[Move] {
        &self.frames[ply].pv
    }

    /// Discards the principal variation rooted at `ply`.
    #[inline(always)]
    pub fn clear(&mut self, ply: usize) {
        self.frames[ply].pv.clear();
    }

    /// Starts a new principal variation at `ply` with `m` followed by the
    /// line found one ply deeper.
    pub fn promote(&mut self, ply: usize, m: &Move) {
        let (near, far) = self.frames.split_at_mut(ply + 1);
        let pv = &mut near[ply].pv;

        pv.clear();
        pv.push(m.clone());
        pv.extend_from_slice(&far[0].pv);
    }
}
