use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::bitboard::Bitboard;
use crate::board::Board;
use crate::piece::{Color, PieceType};
use crate::square::{rank_of, Square};
use crate::zobrist::Hash;

pub type Score = i32;

/// Static evaluation of a board from one side's perspective, memoized by
/// (position hash, perspective) in a bounded least-recently-used cache.
/// Both hits and inserts refresh recency; overflowing the capacity evicts
/// the least recently used entry. The cache is lock-protected so root
/// workers can share it.
pub struct Evaluator {
    cache: Mutex<LruCache<(Hash, Color), Score>>,
}

impl Evaluator {
    /// Deliberately coarse weights: pawn to queen, king carries none
    pub const PIECE_VALUE: [Score; 6] = [1, 3, 3, 5, 8, 0];
    pub const CACHE_CAPACITY: usize = 10_000;

    const WHITE_CASTLED_SQUARES: [Square; 2] = [6, 2]; // g1, c1
    const BLACK_CASTLED_SQUARES: [Square; 2] = [62, 58]; // g8, c8

    pub fn new() -> Evaluator {
        Self::with_capacity(Self::CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Evaluator {
        Evaluator {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("evaluation cache capacity must be non-zero"),
            )),
        }
    }

    pub fn evaluate(&self, board: &Board, color: Color, hash: Hash) -> Score {
        if let Some(&score) = self.cache.lock().unwrap().get(&(hash, color)) {
            return score;
        }
        let score = Self::score_board(board, color);
        self.cache.lock().unwrap().put((hash, color), score);
        score
    }

    /// The raw scoring function, uncached. Every component is mirrored
    /// (negated) for the opposing side's pieces.
    pub fn score_board(board: &Board, color: Color) -> Score {
        let mut value = 0;
        for owner in [Color::White, Color::Black] {
            let mul = if owner == color { 1 } else { -1 };
            for determinant in 0..6 {
                let piece_type = PieceType::from_determinant(determinant).unwrap();
                for sq in board.piece_bitboard(piece_type, owner) {
                    value += Self::PIECE_VALUE[determinant] * mul;
                    if Bitboard::CENTER.is_set(sq) {
                        value += mul;
                    }
                    if piece_type == PieceType::Pawn {
                        let advance = match owner {
                            Color::White => rank_of(sq),
                            Color::Black => 7 - rank_of(sq),
                        };
                        value += (advance as Score / 2) * mul;
                        let penultimate = if owner == Color::White { 6 } else { 1 };
                        if rank_of(sq) == penultimate {
                            value += 3 * mul;
                        }
                    }
                }
            }
        }
        // castled-square bonus is a position test only, whether or not
        // castling actually happened
        if let Some(king) = board.king_square(Color::White) {
            if Self::WHITE_CASTLED_SQUARES.contains(&king) {
                value += if color == Color::White { 1 } else { -1 };
            }
        }
        if let Some(king) = board.king_square(Color::Black) {
            if Self::BLACK_CASTLED_SQUARES.contains(&king) {
                value += if color == Color::Black { 1 } else { -1 };
            }
        }
        if board.in_check(color.opposite()) {
            value += 1;
        }
        if board.in_check(color) {
            value -= 1;
        }
        value
    }

    #[cfg(test)]
    fn cached(&self, hash: Hash, color: Color) -> bool {
        self.cache.lock().unwrap().contains(&(hash, color))
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::moves::Move;
    use crate::zobrist::ZobristHasher;

    #[test]
    fn starting_position_is_balanced() {
        let position = Position::startpos();
        assert_eq!(Evaluator::score_board(&position.board, Color::White), 0);
        assert_eq!(Evaluator::score_board(&position.board, Color::Black), 0);
    }

    #[test]
    fn perspectives_mirror_each_other() {
        let position =
            Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 0 1")
                .unwrap();
        let white = Evaluator::score_board(&position.board, Color::White);
        let black = Evaluator::score_board(&position.board, Color::Black);
        assert_eq!(white, -black);
        // the h4 queen checks the white king
        assert!(position.board.in_check(Color::White));
        assert!(white < 0);
    }

    #[test]
    fn material_advantage_dominates() {
        let position = Position::from_fen(
            "rnb1kbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        let score = Evaluator::score_board(&position.board, Color::White);
        assert!(score >= 8, "queen-up score was {}", score);
    }

    #[test]
    fn castled_king_square_earns_the_bonus() {
        let castled = Position::from_fen("4k3/8/8/8/8/8/8/6K1 w - - 0 1").unwrap();
        let centered = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let with_bonus = Evaluator::score_board(&castled.board, Color::White);
        let without = Evaluator::score_board(&centered.board, Color::White);
        assert_eq!(with_bonus - without, 1);
    }

    #[test]
    fn cached_scores_match_fresh_recomputation() {
        let hasher = ZobristHasher::default();
        let evaluator = Evaluator::new();
        let mut position = Position::startpos();
        for text in ["e2e4", "e7e5", "g1f3"] {
            position.apply_move(Move::parse(text).unwrap());
            let hash = hasher.hash(&position);
            let cached = evaluator.evaluate(&position.board, Color::White, hash);
            let again = evaluator.evaluate(&position.board, Color::White, hash);
            assert_eq!(cached, again);
            assert_eq!(cached, Evaluator::score_board(&position.board, Color::White));
        }
    }

    #[test]
    fn least_recently_used_entry_is_evicted() {
        let hasher = ZobristHasher::default();
        let evaluator = Evaluator::with_capacity(2);
        let mut position = Position::startpos();

        let key1 = hasher.hash(&position);
        evaluator.evaluate(&position.board, Color::White, key1);
        assert!(evaluator.cached(key1, Color::White));

        // a hit refreshes the entry rather than duplicating it
        evaluator.evaluate(&position.board, Color::White, key1);
        assert!(evaluator.cached(key1, Color::White));

        position.apply_move(Move::parse("e2e4").unwrap());
        let key2 = hasher.hash(&position);
        evaluator.evaluate(&position.board, Color::Black, key2);

        position.apply_move(Move::parse("e7e5").unwrap());
        let key3 = hasher.hash(&position);
        evaluator.evaluate(&position.board, Color::White, key3);

        assert!(evaluator.cached(key2, Color::Black));
        assert!(evaluator.cached(key3, Color::White));
        assert!(!evaluator.cached(key1, Color::White));
    }
}
