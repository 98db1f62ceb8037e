use crate::bitboard::{Bitboard, KING_ATTACKS, KNIGHT_ATTACKS};
use crate::board::Board;
use crate::movelist::MoveList;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType};
use crate::square::{file_of, rank_of, square_at, Square};

/// Generates the pseudo-legal moves of the piece on `from`: every move the
/// piece pattern allows, before considering whether the own king is left
/// in check. An empty origin yields an empty list.
pub fn pseudo_legal(board: &Board, from: Square) -> MoveList {
    let mut moves = MoveList::new();
    let piece = match board.piece_on(from) {
        Some(p) => p,
        None => return moves,
    };
    let own = board.color_occupancy(piece.color);
    let occupancy = board.occupancy();
    match piece.piece_type {
        PieceType::Knight => push_targets(&mut moves, from, KNIGHT_ATTACKS[from] & !own),
        PieceType::Bishop => push_targets(
            &mut moves,
            from,
            Bitboard::bishop_attacks(from, occupancy) & !own,
        ),
        PieceType::Rook => push_targets(
            &mut moves,
            from,
            Bitboard::rook_attacks(from, occupancy) & !own,
        ),
        PieceType::Queen => push_targets(
            &mut moves,
            from,
            (Bitboard::bishop_attacks(from, occupancy) | Bitboard::rook_attacks(from, occupancy))
                & !own,
        ),
        PieceType::King => {
            push_targets(&mut moves, from, KING_ATTACKS[from] & !own);
            castling_moves(board, from, piece.color, &mut moves);
        }
        PieceType::Pawn => pawn_moves(board, from, piece.color, &mut moves),
    }
    moves
}

fn push_targets(moves: &mut MoveList, from: Square, targets: Bitboard) {
    for to in targets {
        moves.push(Move::new(from, to));
    }
}

fn castling_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    let home_rank = if color == Color::White { 0 } else { 7 };
    if from != square_at(4, home_rank) {
        return;
    }
    let (kingside, queenside) = board.castling_rights().get(color);
    let occupancy = board.occupancy();
    let own_rook = Some(Piece::new(PieceType::Rook, color));
    if kingside
        && !occupancy.is_set(square_at(5, home_rank))
        && !occupancy.is_set(square_at(6, home_rank))
        && board.piece_on(square_at(7, home_rank)) == own_rook
    {
        moves.push(Move::new(from, square_at(6, home_rank)));
    }
    if queenside
        && !occupancy.is_set(square_at(1, home_rank))
        && !occupancy.is_set(square_at(2, home_rank))
        && !occupancy.is_set(square_at(3, home_rank))
        && board.piece_on(square_at(0, home_rank)) == own_rook
    {
        moves.push(Move::new(from, square_at(2, home_rank)));
    }
}

fn pawn_moves(board: &Board, from: Square, color: Color, moves: &mut MoveList) {
    let (dir, home_rank): (isize, usize) = match color {
        Color::White => (1, 1),
        Color::Black => (-1, 6),
    };
    let (file, rank) = (file_of(from) as isize, rank_of(from) as isize);

    let ahead = rank + dir;
    if (0..8).contains(&ahead) {
        let push = square_at(file as usize, ahead as usize);
        if board.piece_on(push).is_none() {
            moves.push(Move::new(from, push));
            if rank_of(from) == home_rank {
                let double = square_at(file as usize, (ahead + dir) as usize);
                if board.piece_on(double).is_none() {
                    moves.push(Move::new(from, double));
                }
            }
        }
        for df in [-1isize, 1] {
            let capture_file = file + df;
            if !(0..8).contains(&capture_file) {
                continue;
            }
            let target = square_at(capture_file as usize, ahead as usize);
            match board.piece_on(target) {
                Some(occupant) if occupant.color != color => moves.push(Move::new(from, target)),
                None if board.en_passant_target() == Some(target) => {
                    moves.push(Move::new(from, target))
                }
                _ => (),
            }
        }
    }
}

// Simulates the candidate (already known pseudo-legal) and rejects it if
// the own king ends up attacked. Castling additionally requires the king
// to start outside check and to cross a safe square, probed with a
// one-step king move.
fn survives_check(board: &mut Board, mv: Move, color: Color) -> bool {
    let piece = board.piece_on(mv.from).expect("candidate without a piece");
    if piece.piece_type == PieceType::King && file_of(mv.from).abs_diff(file_of(mv.to)) == 2 {
        if board.in_check(color) {
            return false;
        }
        let transit = square_at((file_of(mv.from) + file_of(mv.to)) / 2, rank_of(mv.from));
        let record = board.apply_move(Move::new(mv.from, transit), color);
        let transit_attacked = board.in_check(color);
        board.undo_move(record);
        if transit_attacked {
            return false;
        }
    }
    let record = board.apply_move(mv, color);
    let exposed = board.in_check(color);
    board.undo_move(record);
    !exposed
}

/// Whether `mv` is legal for `color`: pseudo-legal membership plus the
/// king-safety simulation
pub fn is_legal(board: &mut Board, mv: Move, color: Color) -> bool {
    match board.piece_on(mv.from) {
        Some(piece) if piece.color == color => (),
        _ => return false,
    }
    if !pseudo_legal(board, mv.from).iter().any(|m| m.to == mv.to) {
        return false;
    }
    survives_check(board, mv, color)
}

/// Every legal move for `color`, enumerated through the bitboards rather
/// than a grid scan. Generation order (ascending origin square, piece
/// pattern order per origin) is deterministic.
pub fn legal_moves(board: &mut Board, color: Color) -> MoveList {
    let mut moves = MoveList::new();
    for origin in board.color_occupancy(color) {
        let candidates = pseudo_legal(board, origin);
        for &candidate in &candidates {
            if survives_check(board, candidate, color) {
                moves.push(candidate);
            }
        }
    }
    moves
}

/// Legal destinations reachable from a single origin square
pub fn legal_destinations(board: &mut Board, from: Square, color: Color) -> Vec<Square> {
    match board.piece_on(from) {
        Some(piece) if piece.color == color => (),
        _ => return Vec::new(),
    }
    let candidates = pseudo_legal(board, from);
    candidates
        .iter()
        .filter(|mv| survives_check(board, **mv, color))
        .map(|mv| mv.to)
        .collect()
}

/// The legal capturing moves for `color` (including en passant), the
/// subset quiescence explores
pub fn capture_moves(board: &mut Board, color: Color) -> MoveList {
    let mut moves = MoveList::new();
    for origin in board.color_occupancy(color) {
        let piece = board.piece_on(origin).expect("occupancy out of sync");
        let candidates = pseudo_legal(board, origin);
        for &candidate in &candidates {
            let takes = board.piece_on(candidate.to).is_some()
                || (piece.piece_type == PieceType::Pawn
                    && board.en_passant_target() == Some(candidate.to)
                    && file_of(candidate.to) != file_of(origin));
            if takes && survives_check(board, candidate, color) {
                moves.push(candidate);
            }
        }
    }
    moves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::square::parse_square;

    fn destinations(board: &Board, from: &str) -> Vec<String> {
        let mut names: Vec<String> = pseudo_legal(board, parse_square(from).unwrap())
            .iter()
            .map(|m| crate::square::square_representation(m.to).unwrap())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn starting_position_has_twenty_moves() {
        let mut position = Position::startpos();
        let moves = position.legal_moves();
        assert_eq!(moves.len(), 20);
        let pawn_moves = moves
            .iter()
            .filter(|m| {
                position.board.piece_on(m.from).unwrap().piece_type == PieceType::Pawn
            })
            .count();
        assert_eq!(pawn_moves, 16);
    }

    #[test]
    fn knight_jumps_are_blocked_by_friends_only() {
        let mut board = Board::empty();
        board.add_piece(
            Piece::new(PieceType::Knight, Color::White),
            parse_square("d4").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Pawn, Color::White),
            parse_square("c6").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Pawn, Color::White),
            parse_square("e6").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Bishop, Color::Black),
            parse_square("e2").unwrap(),
        );
        assert_eq!(
            destinations(&board, "d4"),
            vec!["b3", "b5", "c2", "e2", "f3", "f5"]
        );
    }

    #[test]
    fn sliders_stop_at_the_first_blocker() {
        let mut board = Board::empty();
        board.add_piece(
            Piece::new(PieceType::Bishop, Color::White),
            parse_square("c1").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Pawn, Color::White),
            parse_square("d2").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Rook, Color::Black),
            parse_square("b2").unwrap(),
        );
        // the friendly pawn closes one diagonal, the enemy rook ends the other
        assert_eq!(destinations(&board, "c1"), vec!["b2"]);
    }

    #[test]
    fn pinned_rook_can_only_slide_along_the_pin() {
        let mut position = Position::from_fen("4r2k/8/8/8/8/8/4R3/4K3 w - - 0 1").unwrap();
        let e2 = parse_square("e2").unwrap();
        let mut reachable = position.legal_destinations(e2);
        reachable.sort();
        let mut expected: Vec<Square> = ["e3", "e4", "e5", "e6", "e7", "e8"]
            .iter()
            .map(|s| parse_square(s).unwrap())
            .collect();
        expected.sort();
        assert_eq!(reachable, expected);
    }

    #[test]
    fn castling_needs_empty_squares_and_the_rook_at_home() {
        let mut position =
            Position::from_fen("4k3/8/8/8/8/8/8/RN2K2R w KQ - 0 1").unwrap();
        let e1 = parse_square("e1").unwrap();
        let reachable = position.legal_destinations(e1);
        assert!(reachable.contains(&parse_square("g1").unwrap()));
        // the b1 knight blocks the queenside
        assert!(!reachable.contains(&parse_square("c1").unwrap()));
    }

    #[test]
    fn castling_is_refused_through_an_attacked_square() {
        // a black rook on f8 covers f1, the square the king crosses
        let mut position =
            Position::from_fen("4kr2/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        let e1 = parse_square("e1").unwrap();
        let reachable = position.legal_destinations(e1);
        assert!(!reachable.contains(&parse_square("g1").unwrap()));
    }

    #[test]
    fn castling_is_refused_while_in_check() {
        let mut position =
            Position::from_fen("4k3/8/8/8/8/8/4r3/4K2R w K - 0 1").unwrap();
        let e1 = parse_square("e1").unwrap();
        let reachable = position.legal_destinations(e1);
        assert!(!reachable.contains(&parse_square("g1").unwrap()));
    }

    #[test]
    fn en_passant_is_offered_only_on_the_fresh_target() {
        let mut position = Position::startpos();
        for text in ["e2e4", "a7a6", "e4e5", "f7f5"] {
            position.apply_move(Move::parse(text).unwrap());
        }
        let e5 = parse_square("e5").unwrap();
        let f6 = parse_square("f6").unwrap();
        assert!(position.legal_destinations(e5).contains(&f6));
        // any reply clears the target
        position.apply_move(Move::parse("b1c3").unwrap());
        position.apply_move(Move::parse("a6a5").unwrap());
        assert!(!position.legal_destinations(e5).contains(&f6));
    }

    #[test]
    fn a_fabricated_en_passant_target_enables_the_capture() {
        let mut board = Board::empty();
        board.add_piece(
            Piece::new(PieceType::Pawn, Color::White),
            parse_square("e5").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Pawn, Color::Black),
            parse_square("f5").unwrap(),
        );
        board.set_en_passant_target(Some(parse_square("f6").unwrap()));
        let moves = pseudo_legal(&board, parse_square("e5").unwrap());
        assert!(moves.iter().any(|m| m.to == parse_square("f6").unwrap()));
    }

    #[test]
    fn fabricated_castling_rights_follow_the_board_setters() {
        use crate::castling::CastlingRights;
        let mut board = Board::empty();
        board.add_piece(
            Piece::new(PieceType::King, Color::White),
            parse_square("e1").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Rook, Color::White),
            parse_square("a1").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Rook, Color::White),
            parse_square("h1").unwrap(),
        );
        board.add_piece(
            Piece::new(PieceType::Knight, Color::White),
            parse_square("b1").unwrap(),
        );
        board.set_castling_rights(CastlingRights::from_fen("KQ"));
        let moves = pseudo_legal(&board, parse_square("e1").unwrap());
        assert!(moves.iter().any(|m| m.to == parse_square("g1").unwrap()));
        // the b1 knight blocks the queenside wing
        assert!(!moves.iter().any(|m| m.to == parse_square("c1").unwrap()));
    }

    #[test]
    fn capture_moves_are_the_capturing_subset() {
        let mut position = Position::startpos();
        for text in ["e2e4", "d7d5"] {
            position.apply_move(Move::parse(text).unwrap());
        }
        let captures = position.capture_moves();
        assert_eq!(captures.len(), 1);
        assert_eq!(captures.get(0).unwrap(), Move::parse("e4d5").unwrap());
    }

    // Node counts from the chess programming wiki. Depth is kept shallow:
    // these positions cover castling, pins, promotions and en passant well
    // before depth four.
    const PERFT_POSITIONS: [(&str, [u64; 3]); 3] = [
        (
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            [20, 400, 8902],
        ),
        (
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            [14, 191, 2812],
        ),
        (
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            [48, 2039, 97862],
        ),
    ];

    #[test]
    fn perft_verification() {
        for (fen, expected) in PERFT_POSITIONS {
            let mut position = Position::from_fen(fen).unwrap();
            for (depth, nodes) in expected.iter().enumerate() {
                assert_eq!(
                    crate::perft(&mut position, depth as u32 + 1),
                    *nodes,
                    "perft({}) of {}",
                    depth + 1,
                    fen
                );
            }
        }
    }
}
