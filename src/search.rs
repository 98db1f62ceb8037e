use std::collections::VecDeque;
use std::fmt::{Display, Formatter};
use std::thread;
use std::time::{Duration, Instant};

use crate::board::Position;
use crate::evaluation::{Evaluator, Score};
use crate::movelist::MoveList;
use crate::moves::Move;
use crate::ordering::{order_moves, HistoryTable, KillerTable, MAX_PLY};
use crate::piece::PieceType;
use crate::transposition::{TableEntry, TranspositionTable};
use crate::zobrist::ZobristHasher;

pub const MATE_SCORE: Score = 9_999;
const SCORE_INFINITY: Score = 10_000;
const BASE_WINDOW: Score = 50;
const NULL_MOVE_DEPTH: i8 = 3;
const NULL_MOVE_REDUCTION: i8 = 3;
const LATE_MOVE_INDEX: usize = 3;
const LATE_MOVE_MIN_DEPTH: i8 = 3;
const LATE_MOVE_REDUCTION: i8 = 2;
const FAST_DECISION: Duration = Duration::from_secs(1);
const TIMING_WINDOW: usize = 4;

/// Knobs a caller can set on a search
#[derive(Clone)]
pub struct SearchConfig {
    pub target_depth: i8,
    pub workers: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            target_depth: 3,
            workers: 1,
        }
    }
}

impl SearchConfig {
    pub fn new(target_depth: i8) -> SearchConfig {
        SearchConfig {
            target_depth,
            workers: 1,
        }
    }

    /// Sized for one root worker per available core
    pub fn parallel(target_depth: i8) -> SearchConfig {
        SearchConfig {
            target_depth,
            workers: num_cpus::get(),
        }
    }

    pub fn set_depth(&mut self, target_depth: i8) -> &mut Self {
        self.target_depth = target_depth;
        self
    }

    pub fn set_workers(&mut self, workers: usize) -> &mut Self {
        self.workers = workers;
        self
    }
}

/// The outcome of one move decision
#[derive(Debug, Clone)]
pub struct Search {
    pub best_move: Move,
    pub score: Score,
    pub depth_reached: i8,
    pub nodes_searched: u64,
    pub time: Duration,
}

impl Display for Search {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mate = self.score.abs() > MATE_SCORE - MAX_PLY as Score;
        let nps = (self.nodes_searched as f64 / self.time.as_secs_f64().max(f64::EPSILON)) as u64;
        write!(
            f,
            "depth {} time {} nodes {} nps {} score {} {} bestmove {}",
            self.depth_reached,
            self.time.as_millis(),
            self.nodes_searched,
            nps,
            if mate { "mate" } else { "cp" },
            if mate {
                (MATE_SCORE - self.score.abs()) * self.score.signum()
            } else {
                self.score
            },
            self.best_move
        )
    }
}

// Per-search mutable state. Killers die with the search; the history
// table is copied in from the engine and written back afterwards.
struct SearchContext {
    killers: KillerTable,
    history: HistoryTable,
    nodes: u64,
}

/// Iterative-deepening negamax with alpha-beta pruning, quiescence,
/// null-move pruning, late-move reductions, aspiration windows and an
/// optional parallel root split on the final iteration.
///
/// Single-threaded searches are fully deterministic: the same position
/// and configuration always yield the same move.
pub struct SearchEngine {
    transposition_table: TranspositionTable,
    evaluator: Evaluator,
    hasher: ZobristHasher,
    history: HistoryTable,
    recent_decisions: VecDeque<Duration>,
}

impl SearchEngine {
    pub fn new() -> SearchEngine {
        Self::with_seed(ZobristHasher::DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> SearchEngine {
        SearchEngine {
            transposition_table: TranspositionTable::new(),
            evaluator: Evaluator::new(),
            hasher: ZobristHasher::new(seed),
            history: HistoryTable::new(),
            recent_decisions: VecDeque::with_capacity(TIMING_WINDOW),
        }
    }

    /// Picks one legal move for the side to move. The position must not
    /// be terminal; callers detect mate and stalemate beforehand.
    pub fn choose_move(&mut self, position: &mut Position, config: &SearchConfig) -> Move {
        self.search(position, config).best_move
    }

    /// Like [`SearchEngine::choose_move`], returning the full search
    /// summary
    pub fn search(&mut self, position: &mut Position, config: &SearchConfig) -> Search {
        let started = Instant::now();
        let root_moves = position.legal_moves();
        assert!(
            !root_moves.is_empty(),
            "search requires a position with at least one legal move"
        );

        let final_depth =
            (config.target_depth + self.depth_extension(position, root_moves.len())).max(1);

        let mut context = SearchContext {
            killers: KillerTable::new(),
            history: self.history.clone(),
            nodes: 0,
        };

        let mut best_move = root_moves.get(0).unwrap();
        let mut best_score = 0;
        let mut previous_score = 0;
        let mut depth_reached = 0;

        for depth in 1..=final_depth {
            let split = depth == final_depth && config.workers > 1;
            // aspiration: a narrow window around the previous score,
            // widened on whichever side fails until the result fits
            let (mut below, mut above) = (BASE_WINDOW, BASE_WINDOW);
            let (chosen, score) = loop {
                let (alpha, beta) = if depth == 1 {
                    (-SCORE_INFINITY, SCORE_INFINITY)
                } else {
                    (previous_score - below, previous_score + above)
                };
                let (chosen, score) = if split {
                    self.split_root(position, &root_moves, depth, alpha, beta, &mut context)
                } else {
                    self.search_root(position, &root_moves, depth, alpha, beta, &mut context)
                };
                if depth > 1 && score <= alpha {
                    below *= 2;
                } else if depth > 1 && score >= beta {
                    above *= 2;
                } else {
                    break (chosen, score);
                }
            };
            best_move = chosen;
            best_score = score;
            previous_score = score;
            depth_reached = depth;
        }

        self.history = context.history;
        let time = started.elapsed();
        self.recent_decisions.push_back(time);
        while self.recent_decisions.len() > TIMING_WINDOW {
            self.recent_decisions.pop_front();
        }

        Search {
            best_move,
            score: best_score,
            depth_reached,
            nodes_searched: context.nodes,
            time,
        }
    }

    // Adaptive deepening stands in for a clock: queenless boards,
    // near-forced roots and consistently quick recent decisions all buy
    // extra depth.
    fn depth_extension(&self, position: &Position, root_moves: usize) -> i8 {
        let mut extension = 0;
        if position.board.piece_count(PieceType::Queen) < 1 {
            extension += 2;
        }
        extension += match root_moves {
            0..=3 => 3,
            4..=6 => 2,
            7..=10 => 1,
            _ => 0,
        };
        if self.recent_decisions.len() == TIMING_WINDOW
            && self.recent_decisions.iter().all(|d| *d < FAST_DECISION)
        {
            extension += 1;
        }
        extension
    }

    fn search_root(
        &self,
        position: &mut Position,
        root_moves: &MoveList,
        depth: i8,
        mut alpha: Score,
        beta: Score,
        context: &mut SearchContext,
    ) -> (Move, Score) {
        let hash = self.hasher.hash(position);
        let hash_move = self.transposition_table.probe(hash).map(|e| e.best_move);
        let mut moves = root_moves.clone();
        order_moves(
            &mut moves,
            &position.board,
            hash_move,
            &context.killers,
            &context.history,
            0,
        );

        let mut best_move = moves.get(0).unwrap();
        let mut best_score = -SCORE_INFINITY;
        for &mv in &moves {
            let record = position.apply_move(mv);
            let score = -self.negamax(position, depth - 1, -beta, -alpha, 1, context);
            position.undo_move(record);
            if score > best_score {
                best_score = score;
                best_move = mv;
            }
            if best_score > alpha {
                alpha = best_score;
            }
            if alpha >= beta {
                break;
            }
        }
        self.transposition_table.store(
            hash,
            TableEntry {
                depth,
                score: best_score,
                best_move,
            },
        );
        (best_move, best_score)
    }

    // The final iteration's fan-out: every root move is searched by its
    // own worker on a cloned position, all sharing the transposition
    // table and the evaluation cache; the maximum of the negated scores
    // wins. Move order breaks ties exactly as the sequential driver does.
    fn split_root(
        &self,
        position: &Position,
        root_moves: &MoveList,
        depth: i8,
        alpha: Score,
        beta: Score,
        context: &mut SearchContext,
    ) -> (Move, Score) {
        let hash = self.hasher.hash(position);
        let hash_move = self.transposition_table.probe(hash).map(|e| e.best_move);
        let mut moves = root_moves.clone();
        order_moves(
            &mut moves,
            &position.board,
            hash_move,
            &context.killers,
            &context.history,
            0,
        );

        let results: Vec<(Move, Score, u64)> = thread::scope(|scope| {
            let workers: Vec<_> = moves
                .iter()
                .map(|&mv| {
                    let mut worker_position = position.clone();
                    let mut worker_context = SearchContext {
                        killers: KillerTable::new(),
                        history: context.history.clone(),
                        nodes: 0,
                    };
                    scope.spawn(move || {
                        worker_position.apply_move(mv);
                        let score = -self.negamax(
                            &mut worker_position,
                            depth - 1,
                            -beta,
                            -alpha,
                            1,
                            &mut worker_context,
                        );
                        (mv, score, worker_context.nodes)
                    })
                })
                .collect();
            workers
                .into_iter()
                .map(|worker| worker.join().expect("root worker panicked"))
                .collect()
        });

        let mut best_move = moves.get(0).unwrap();
        let mut best_score = -SCORE_INFINITY;
        for (mv, score, nodes) in results {
            context.nodes += nodes;
            if score > best_score {
                best_score = score;
                best_move = mv;
            }
        }
        self.transposition_table.store(
            hash,
            TableEntry {
                depth,
                score: best_score,
                best_move,
            },
        );
        (best_move, best_score)
    }

    fn negamax(
        &self,
        position: &mut Position,
        depth: i8,
        mut alpha: Score,
        beta: Score,
        ply: usize,
        context: &mut SearchContext,
    ) -> Score {
        context.nodes += 1;
        let hash = self.hasher.hash(position);
        let remembered = self.transposition_table.probe(hash);
        if let Some(entry) = remembered {
            // a deep-enough hit is trusted whole, however it was bounded
            if entry.depth >= depth {
                return entry.score;
            }
        }
        if depth <= 0 {
            return self.quiescence(position, alpha, beta, context);
        }

        let in_check = position.in_check();
        // null move: if even passing the turn fails high, the real moves
        // can only do better
        if depth >= NULL_MOVE_DEPTH && !in_check {
            let record = position.apply_null();
            let score = -self.negamax(
                position,
                depth - NULL_MOVE_REDUCTION,
                -beta,
                -beta + 1,
                ply + 1,
                context,
            );
            position.undo_null(record);
            if score >= beta {
                return score;
            }
        }

        let mut moves = position.legal_moves();
        if moves.is_empty() {
            // deeper mates score closer to zero, so the fastest mate wins
            return if in_check {
                -MATE_SCORE + ply as Score
            } else {
                0
            };
        }
        order_moves(
            &mut moves,
            &position.board,
            remembered.map(|e| e.best_move),
            &context.killers,
            &context.history,
            ply,
        );

        let mut best_score = -SCORE_INFINITY;
        let mut best_move = moves.get(0).unwrap();
        for (index, &mv) in moves.iter().enumerate() {
            let is_capture = position.board.piece_on(mv.to).is_some();
            let record = position.apply_move(mv);
            let gives_check = position.in_check();
            let extension = if gives_check && ply < MAX_PLY { 1 } else { 0 };
            let mut score;
            if index >= LATE_MOVE_INDEX && depth >= LATE_MOVE_MIN_DEPTH && !is_capture {
                // probe late quiet moves shallow and narrow; only a probe
                // that beats alpha earns the full re-search
                score = -self.negamax(
                    position,
                    depth - LATE_MOVE_REDUCTION,
                    -alpha - 1,
                    -alpha,
                    ply + 1,
                    context,
                );
                if score > alpha {
                    score = -self.negamax(
                        position,
                        depth - 1 + extension,
                        -beta,
                        -alpha,
                        ply + 1,
                        context,
                    );
                }
            } else {
                score = -self.negamax(
                    position,
                    depth - 1 + extension,
                    -beta,
                    -alpha,
                    ply + 1,
                    context,
                );
            }
            position.undo_move(record);

            if score > best_score {
                best_score = score;
                best_move = mv;
            }
            if best_score > alpha {
                alpha = best_score;
            }
            if alpha >= beta {
                if !is_capture {
                    context.killers.insert(ply, mv);
                    context.history.reward(mv, depth);
                }
                break;
            }
        }
        self.transposition_table.store(
            hash,
            TableEntry {
                depth,
                score: best_score,
                best_move,
            },
        );
        best_score
    }

    // Capture-only extension of the search beyond the nominal horizon.
    // Stand-pat bounds the score from below; recursion is finite because
    // every step removes material.
    fn quiescence(
        &self,
        position: &mut Position,
        mut alpha: Score,
        beta: Score,
        context: &mut SearchContext,
    ) -> Score {
        context.nodes += 1;
        let hash = self.hasher.hash(position);
        let stand_pat = self
            .evaluator
            .evaluate(&position.board, position.side_to_move, hash);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }
        let captures = position.capture_moves();
        for &mv in &captures {
            let record = position.apply_move(mv);
            let score = -self.quiescence(position, -beta, -alpha, context);
            position.undo_move(record);
            if score >= beta {
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }
        alpha
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}
