use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::evaluation::Score;
use crate::moves::Move;
use crate::zobrist::Hash;

/// One remembered search result. There is no exact/lower/upper bound tag:
/// a hit at sufficient depth is trusted as-is, a deliberate soundness gap
/// traded for table compactness.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TableEntry {
    pub depth: i8,
    pub score: Score,
    pub best_move: Move,
}

/// A bounded transposition table with least-recently-used eviction.
/// Probes refresh recency; writes replace an existing entry only at equal
/// or greater depth. The table is lock-protected so the parallel root
/// split can share it between workers.
pub struct TranspositionTable {
    entries: Mutex<LruCache<Hash, TableEntry>>,
}

impl TranspositionTable {
    pub const CAPACITY: usize = 100_000;

    pub fn new() -> TranspositionTable {
        Self::with_capacity(Self::CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> TranspositionTable {
        TranspositionTable {
            entries: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).expect("table capacity must be non-zero"),
            )),
        }
    }

    pub fn probe(&self, hash: Hash) -> Option<TableEntry> {
        self.entries.lock().unwrap().get(&hash).copied()
    }

    pub fn store(&self, hash: Hash, entry: TableEntry) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.peek(&hash) {
            if existing.depth > entry.depth {
                return;
            }
        }
        entries.put(hash, entry);
    }
}

impl Default for TranspositionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(depth: i8, score: Score) -> TableEntry {
        TableEntry {
            depth,
            score,
            best_move: Move::parse("e2e4").unwrap(),
        }
    }

    #[test]
    fn deeper_results_replace_shallower_ones_only() {
        let table = TranspositionTable::new();
        table.store(1, entry(3, 10));
        table.store(1, entry(1, -50));
        assert_eq!(table.probe(1).unwrap().score, 10);
        table.store(1, entry(3, 20));
        assert_eq!(table.probe(1).unwrap().score, 20);
        table.store(1, entry(5, 30));
        assert_eq!(table.probe(1).unwrap().depth, 5);
    }

    #[test]
    fn capacity_overflow_evicts_least_recently_used() {
        let table = TranspositionTable::with_capacity(2);
        table.store(1, entry(1, 1));
        table.store(2, entry(1, 2));
        // probing 1 makes 2 the eviction candidate
        assert!(table.probe(1).is_some());
        table.store(3, entry(1, 3));
        assert!(table.probe(2).is_none());
        assert!(table.probe(1).is_some());
        assert!(table.probe(3).is_some());
    }
}
