use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::Position;
use crate::piece::Color;
use crate::square::file_of;

pub type Hash = u64;

/// Zobrist-style structural hashing: one pseudo-random key per
/// (color, piece type, square), per castling-right bit, per en-passant
/// file, plus one for the side to move, combined by XOR.
///
/// The key table is owned by the instance and derived from an explicit
/// seed, so every hasher built from the same seed produces identical
/// hashes and independent engines cannot interfere through shared state.
pub struct ZobristHasher {
    piece_keys: [[[Hash; 64]; 6]; 2],
    castling_keys: [Hash; 4],
    en_passant_keys: [Hash; 8],
    side_key: Hash,
}

impl ZobristHasher {
    pub const DEFAULT_SEED: u64 = 0xcbf2_9ce4_8422_2325;

    pub fn new(seed: u64) -> ZobristHasher {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut piece_keys = [[[0u64; 64]; 6]; 2];
        for color_keys in piece_keys.iter_mut() {
            for type_keys in color_keys.iter_mut() {
                for key in type_keys.iter_mut() {
                    *key = rng.gen();
                }
            }
        }
        let mut castling_keys = [0u64; 4];
        for key in castling_keys.iter_mut() {
            *key = rng.gen();
        }
        let mut en_passant_keys = [0u64; 8];
        for key in en_passant_keys.iter_mut() {
            *key = rng.gen();
        }
        ZobristHasher {
            piece_keys,
            castling_keys,
            en_passant_keys,
            side_key: rng.gen(),
        }
    }

    /// Hashes a position: identical positions always collide, distinct
    /// positions rarely do (collisions are tolerated, not guarded)
    pub fn hash(&self, position: &Position) -> Hash {
        let board = &position.board;
        let mut hash = 0u64;
        for color in [Color::White, Color::Black] {
            for piece_type in 0..6 {
                let type_keys = &self.piece_keys[color as usize][piece_type];
                for sq in board.piece_bitboard(
                    crate::piece::PieceType::from_determinant(piece_type).unwrap(),
                    color,
                ) {
                    hash ^= type_keys[sq];
                }
            }
        }
        let (wk, wq) = board.castling_rights().get(Color::White);
        let (bk, bq) = board.castling_rights().get(Color::Black);
        for (granted, key) in [wk, wq, bk, bq].into_iter().zip(self.castling_keys) {
            if granted {
                hash ^= key;
            }
        }
        if let Some(target) = board.en_passant_target() {
            hash ^= self.en_passant_keys[file_of(target)];
        }
        if position.side_to_move == Color::White {
            hash ^= self.side_key;
        }
        hash
    }
}

impl Default for ZobristHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Move;

    #[test]
    fn hash_is_path_independent() {
        let hasher = ZobristHasher::default();
        let mut a = Position::startpos();
        for text in ["g1f3", "b8c6", "b1c3"] {
            a.apply_move(Move::parse(text).unwrap());
        }
        let mut b = Position::startpos();
        for text in ["b1c3", "b8c6", "g1f3"] {
            b.apply_move(Move::parse(text).unwrap());
        }
        assert_eq!(hasher.hash(&a), hasher.hash(&b));
    }

    #[test]
    fn castling_rights_change_the_hash() {
        let hasher = ZobristHasher::default();
        let with_rights = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let without = Position::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w Qkq - 0 1").unwrap();
        assert_ne!(hasher.hash(&with_rights), hasher.hash(&without));
    }

    #[test]
    fn side_to_move_and_en_passant_are_hashed() {
        let hasher = ZobristHasher::default();
        let white = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let black = Position::from_fen("4k3/8/8/8/8/8/8/4K3 b - - 0 1").unwrap();
        assert_ne!(hasher.hash(&white), hasher.hash(&black));

        let plain = Position::from_fen("4k3/8/8/4Pp2/8/8/8/4K3 w - - 0 1").unwrap();
        let with_target = Position::from_fen("4k3/8/8/4Pp2/8/8/8/4K3 w - f6 0 1").unwrap();
        assert_ne!(hasher.hash(&plain), hasher.hash(&with_target));
    }

    #[test]
    fn same_seed_means_same_hashes() {
        let a = ZobristHasher::new(42);
        let b = ZobristHasher::new(42);
        let position = Position::startpos();
        assert_eq!(a.hash(&position), b.hash(&position));
        let c = ZobristHasher::new(43);
        assert_ne!(a.hash(&position), c.hash(&position));
    }
}
