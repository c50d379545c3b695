use crate::chess::{RANK_1, RANK_8, is_advanced_rank};
use crate::util::Assume;
use derive_more::with_trait::{Display, Error};
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{Bitboard, CastlingMode, Chess, Color, EnPassantMode, Move, MoveList, Piece};
use shakmaty::{Position as Rules, Role, Square, attacks, fen::Fen, uci::UciMove};
use std::fmt::{self, Formatter, Write};
use std::str::FromStr;

/// The reason why parsing a position failed.
#[derive(Debug, Display, Clone, Copy, Eq, PartialEq, Hash, Error)]
pub enum ParsePositionError {
    #[display("failed to parse fen string")]
    InvalidFen,
    #[display("the fen string describes an illegal position")]
    IllegalPosition,
}

/// The current position on the board.
///
/// Wraps the rule engine and keeps the hashes of the reversible tail of the
/// game, so that repetitions along the search path are detected.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    rules: Chess,
    chess960: bool,
    history: Vec<u64>,
}

impl Default for Position {
    fn default() -> Self {
        Position {
            rules: Chess::default(),
            chess960: false,
            history: Vec::new(),
        }
    }
}

impl Position {
    /// Parses a position from a FEN string.
    pub fn from_fen(fen: &str, chess960: bool) -> Result<Self, ParsePositionError> {
        let fen: Fen = fen.parse().map_err(|_| ParsePositionError::InvalidFen)?;

        let mode = if chess960 {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        };

        let rules: Chess = fen
            .into_position(mode)
            .map_err(|_| ParsePositionError::IllegalPosition)?;

        Ok(Position {
            rules,
            chess960,
            history: Vec::new(),
        })
    }

    /// The side to move.
    #[inline(always)]
    pub fn turn(&self) -> Color {
        self.rules.turn()
    }

    /// All legal moves in this position.
    #[inline(always)]
    pub fn legal_moves(&self) -> MoveList {
        self.rules.legal_moves()
    }

    /// The number of legal moves by the king of the side to move.
    pub fn king_mobility(&self) -> usize {
        self.legal_moves()
            .iter()
            .filter(|m| m.role() == Role::King)
            .count()
    }

    /// Whether the side to move is in check.
    #[inline(always)]
    pub fn is_check(&self) -> bool {
        self.rules.is_check()
    }

    /// The pieces giving check.
    #[inline(always)]
    pub fn checkers(&self) -> Bitboard {
        self.rules.checkers()
    }

    /// Whether the side to move has been mated.
    #[inline(always)]
    pub fn is_checkmate(&self) -> bool {
        self.rules.is_checkmate()
    }

    /// Whether the side to move has no move but is not in check.
    #[inline(always)]
    pub fn is_stalemate(&self) -> bool {
        self.rules.is_stalemate()
    }

    /// Whether this position is drawn by repetition or the 50-move rule.
    pub fn is_draw(&self) -> bool {
        if self.rules.halfmoves() >= 100 && !self.is_checkmate() {
            return true;
        }

        self.history.contains(&self.zobrist())
    }

    /// The Zobrist hash of this position.
    #[inline(always)]
    pub fn zobrist(&self) -> u64 {
        self.rules
            .zobrist_hash::<Zobrist64>(EnPassantMode::Legal)
            .0
    }

    /// The square of the king of `color`.
    #[inline(always)]
    pub fn king_of(&self, color: Color) -> Square {
        self.rules.board().king_of(color).assume()
    }

    /// The king of the side to move.
    #[inline(always)]
    pub fn our_king(&self) -> Square {
        self.king_of(self.turn())
    }

    /// The king of the opponent.
    #[inline(always)]
    pub fn their_king(&self) -> Square {
        self.king_of(self.turn().other())
    }

    /// All occupied squares.
    #[inline(always)]
    pub fn occupied(&self) -> Bitboard {
        self.rules.board().occupied()
    }

    /// The total number of pieces on the board.
    #[inline(always)]
    pub fn count_all(&self) -> usize {
        self.occupied().count()
    }

    /// The number of pieces of `color`.
    #[inline(always)]
    pub fn count(&self, color: Color) -> usize {
        self.rules.board().by_color(color).count()
    }

    /// The number of pieces of `color` and `role`.
    #[inline(always)]
    pub fn count_piece(&self, color: Color, role: Role) -> usize {
        self.pieces(color, role).count()
    }

    /// The pieces of `color` and `role`.
    #[inline(always)]
    pub fn pieces(&self, color: Color, role: Role) -> Bitboard {
        self.rules.board().by_piece(Piece { color, role })
    }

    /// All pieces of `color`.
    #[inline(always)]
    pub fn by_color(&self, color: Color) -> Bitboard {
        self.rules.board().by_color(color)
    }

    /// The piece on `sq`, if any.
    #[inline(always)]
    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.rules.board().piece_at(sq)
    }

    /// Whether either side still has castling rights.
    #[inline(always)]
    pub fn has_castling_rights(&self) -> bool {
        self.rules.castles().any()
    }

    /// The number of half-moves since the last capture or pawn move.
    #[inline(always)]
    pub fn halfmoves(&self) -> u32 {
        self.rules.halfmoves()
    }

    /// Plays a move.
    pub fn play(&mut self, m: &Move) {
        self.history.push(self.zobrist());
        self.rules.play_unchecked(m);

        // A zeroing move makes earlier positions unrepeatable.
        if self.rules.halfmoves() == 0 {
            self.history.clear();
        }
    }

    /// The position after a move.
    #[inline(always)]
    pub fn child(&self, m: &Move) -> Position {
        let mut next = self.clone();
        next.play(m);
        next
    }

    /// Whether a move gives check.
    #[inline(always)]
    pub fn gives_check(&self, m: &Move) -> bool {
        let mut next = self.rules.clone();
        next.play_unchecked(m);
        next.is_check()
    }

    /// The number of legal replies to a move.
    #[inline(always)]
    pub fn count_moves_after(&self, m: &Move) -> usize {
        let mut next = self.rules.clone();
        next.play_unchecked(m);
        next.legal_moves().len()
    }

    /// The squares attacked by a piece of `role` on `sq`, given the current
    /// occupancy.
    pub fn attacks_from(&self, role: Role, sq: Square) -> Bitboard {
        match role {
            Role::Pawn => attacks::pawn_attacks(self.turn(), sq),
            Role::Knight => attacks::knight_attacks(sq),
            Role::Bishop => attacks::bishop_attacks(sq, self.occupied()),
            Role::Rook => attacks::rook_attacks(sq, self.occupied()),
            Role::Queen => attacks::queen_attacks(sq, self.occupied()),
            Role::King => attacks::king_attacks(sq),
        }
    }

    /// The squares from which a piece of `role` of the side to move would
    /// give check.
    pub fn check_squares(&self, role: Role) -> Bitboard {
        let king = self.their_king();

        match role {
            Role::Pawn => attacks::pawn_attacks(self.turn().other(), king),
            Role::Knight => attacks::knight_attacks(king),
            Role::Bishop => attacks::bishop_attacks(king, self.occupied()),
            Role::Rook => attacks::rook_attacks(king, self.occupied()),
            Role::Queen => {
                attacks::bishop_attacks(king, self.occupied())
                    | attacks::rook_attacks(king, self.occupied())
            }
            Role::King => Bitboard::EMPTY,
        }
    }

    /// Whether a move pushes a pawn deep into enemy territory.
    pub fn advanced_pawn_push(&self, m: &Move) -> bool {
        m.role() == Role::Pawn && is_advanced_rank(self.turn(), m.to())
    }

    /// Whether a move vacates a square one of our pawns could promote on.
    pub fn frees_promotion_square(&self, m: &Move) -> bool {
        let Some(from) = m.from() else {
            return false;
        };

        let pawns = self.pieces(self.turn(), Role::Pawn);

        match self.turn() {
            Color::White => (Bitboard(pawns.0 << 8) & RANK_8).contains(from),
            Color::Black => (Bitboard(pawns.0 >> 8) & RANK_1).contains(from),
        }
    }

    /// Converts a move to UCI notation, honoring the castling convention.
    #[inline(always)]
    pub fn uci(&self, m: &Move) -> UciMove {
        let mode = if self.chess960 {
            CastlingMode::Chess960
        } else {
            CastlingMode::Standard
        };

        m.to_uci(mode)
    }

    /// Resolves a UCI move against this position.
    #[inline(always)]
    pub fn parse_move(&self, uci: &UciMove) -> Option<Move> {
        uci.to_move(&self.rules).ok()
    }

    /// Counts all leaf nodes up to the given depth.
    #[inline(always)]
    pub fn perft(&self, depth: u32) -> u64 {
        shakmaty::perft(&self.rules, depth)
    }

    /// The underlying rule engine state.
    #[inline(always)]
    pub fn rules(&self) -> &Chess {
        &self.rules
    }

    /// The FEN of this position.
    pub fn fen(&self) -> String {
        Fen(self.rules.clone().into_setup(EnPassantMode::Legal)).to_string()
    }

    /// Swaps the colors of all pieces and the side to move.
    pub fn flip(&mut self) {
        let fen = self.fen();
        let mut fields = fen.split_ascii_whitespace();

        let board: String = fields
            .next()
            .assume()
            .split('/')
            .rev()
            .map(swap_ascii_case)
            .collect::<Vec<_>>()
            .join("/");

        let turn = match fields.next().assume() {
            "w" => "b",
            _ => "w",
        };

        // Castling rights keep the conventional uppercase-first order.
        let mut castles: Vec<char> = swap_ascii_case(fields.next().assume()).chars().collect();
        castles.sort_by_key(|c| (c.is_ascii_lowercase(), *c));
        let castles: String = castles.into_iter().collect();

        let ep: String = fields
            .next()
            .assume()
            .chars()
            .map(|c| match c {
                '3' => '6',
                '6' => '3',
                c => c,
            })
            .collect();

        let halfmoves = fields.next().assume();
        let fullmoves = fields.next().assume();

        let flipped = format!("{board} {turn} {castles} {ep} {halfmoves} {fullmoves}");
        *self = Position::from_fen(&flipped, self.chess960).assume();
    }
}

fn swap_ascii_case(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_uppercase() {
                c.to_ascii_lowercase()
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::from_fen(s, false)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, " +---+---+---+---+---+---+---+---+")?;

        for rank in (0..8u32).rev() {
            for file in 0..8u32 {
                let sq = Square::new(rank * 8 + file);
                match self.piece_at(sq) {
                    Some(p) => write!(f, " | {}", p.char())?,
                    None => write!(f, " |  ")?,
                }
            }

            writeln!(f, " | {}", rank + 1)?;
            writeln!(f, " +---+---+---+---+---+---+---+---+")?;
        }

        writeln!(f, "   a   b   c   d   e   f   g   h")?;
        writeln!(f)?;
        write!(f, "Fen: {}", self.fen())?;

        if self.is_check() {
            f.write_char('+')?;
        }

        Ok(())
    }
}
