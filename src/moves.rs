use std::fmt::{Display, Formatter};

use crate::piece::PieceType;
use crate::square::{parse_square, square_representation, Square};

/// A move as the pair of squares it connects, plus an optional promotion
/// choice. Castling, en passant and double pushes are recognized from the
/// board when the move is applied, so they need no flags here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<PieceType>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Move {
        Move {
            from,
            to,
            promotion: None,
        }
    }

    pub fn promoting(from: Square, to: Square, piece_type: PieceType) -> Move {
        Move {
            from,
            to,
            promotion: Some(piece_type),
        }
    }

    /// Parses a move in long algebraic coordinates ("e2e4", "e7e8q").
    /// ```
    /// use ponder::moves::Move;
    /// assert_eq!(Move::parse("e2e4"), Some(Move::new(12, 28)));
    /// assert_eq!(Move::parse("e9e4"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Move> {
        if s.len() < 4 {
            return None;
        }
        let from = parse_square(&s[0..2])?;
        let to = parse_square(&s[2..4])?;
        let promotion = match s.len() {
            4 => None,
            5 => match &s[4..] {
                "n" => Some(PieceType::Knight),
                "b" => Some(PieceType::Bishop),
                "r" => Some(PieceType::Rook),
                "q" => Some(PieceType::Queen),
                _ => return None,
            },
            _ => return None,
        };
        Some(Move {
            from,
            to,
            promotion,
        })
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let from = square_representation(self.from).unwrap_or_else(|| String::from("**"));
        let to = square_representation(self.to).unwrap_or_else(|| String::from("**"));
        match self.promotion {
            Some(p) => write!(f, "{}{}{}", from, to, p),
            None => write!(f, "{}{}", from, to),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for text in ["e2e4", "a7a8q", "g8f6", "h2h1n"] {
            assert_eq!(Move::parse(text).unwrap().to_string(), text);
        }
        assert_eq!(Move::parse("e2"), None);
        assert_eq!(Move::parse("e2e4x"), None);
    }
}
