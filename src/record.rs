use crate::castling::CastlingRights;
use crate::moves::Move;
use crate::piece::Piece;
use crate::square::Square;

/// Everything needed to reverse an applied move exactly.
/// `captured_square` differs from the move's destination only for en
/// passant captures; `rook_move` is set only for castling.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MoveRecord {
    pub mv: Move,
    pub moved: Piece,
    pub captured: Option<Piece>,
    pub captured_square: Option<Square>,
    pub prev_en_passant: Option<Square>,
    pub prev_castling: CastlingRights,
    pub rook_move: Option<(Square, Square)>,
}

/// Reversal data for a null move: only the en-passant target is disturbed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NullRecord {
    pub prev_en_passant: Option<Square>,
}
