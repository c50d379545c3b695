mod geometry;
mod position;

pub use geometry::*;
pub use position::*;

pub use shakmaty::uci::UciMove;
pub use shakmaty::{Bitboard, Color, Move, MoveList, Role, Square};
