use std::fmt::{Display, Formatter};

use crate::bitboard::{Bitboard, KING_ATTACKS, KNIGHT_ATTACKS, PAWN_ATTACKS};
use crate::castling::CastlingRights;
use crate::move_generator;
use crate::movelist::MoveList;
use crate::moves::Move;
use crate::piece::{Color, Piece, PieceType};
use crate::record::{MoveRecord, NullRecord};
use crate::square::{file_of, parse_square, rank_of, square_at, square_representation, Square};

pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

// Bitboards are indexed by color and piece type, with a redundant
// color-occupancy board at index 6. The mailbox and the bitboards are
// mirrored on every mutation and must agree at all times.

#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pieces: [Option<Piece>; 64],
    bitboards: [[Bitboard; 7]; 2],
    castling: CastlingRights,
    en_passant: Option<Square>,
}

impl Board {
    pub fn empty() -> Board {
        Board {
            pieces: [None; 64],
            bitboards: [[Bitboard::EMPTY; 7]; 2],
            castling: CastlingRights::none(),
            en_passant: None,
        }
    }

    /// The standard starting placement with full castling rights
    pub fn standard() -> Board {
        let mut board = Board::empty();
        board.castling = CastlingRights::all();
        let back_rank = [
            PieceType::Rook,
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Queen,
            PieceType::King,
            PieceType::Bishop,
            PieceType::Knight,
            PieceType::Rook,
        ];
        for (file, &piece_type) in back_rank.iter().enumerate() {
            board.add_piece(Piece::new(piece_type, Color::White), square_at(file, 0));
            board.add_piece(Piece::new(PieceType::Pawn, Color::White), square_at(file, 1));
            board.add_piece(Piece::new(PieceType::Pawn, Color::Black), square_at(file, 6));
            board.add_piece(Piece::new(piece_type, Color::Black), square_at(file, 7));
        }
        board
    }

    /// Places a piece on a square, keeping the bitboards in sync.
    /// The square must be empty.
    pub fn add_piece(&mut self, piece: Piece, sq: Square) {
        debug_assert!(self.pieces[sq].is_none());
        self.pieces[sq] = Some(piece);
        self.bitboards[piece.color as usize][piece.piece_type as usize].set(sq);
        self.bitboards[piece.color as usize][6].set(sq);
    }

    /// Clears a square, returning whatever was removed
    pub fn remove_piece(&mut self, sq: Square) -> Option<Piece> {
        let removed = self.pieces[sq].take();
        if let Some(piece) = removed {
            self.bitboards[piece.color as usize][piece.piece_type as usize].unset(sq);
            self.bitboards[piece.color as usize][6].unset(sq);
        }
        removed
    }

    pub fn piece_on(&self, sq: Square) -> Option<Piece> {
        self.pieces[sq]
    }

    pub fn piece_bitboard(&self, piece_type: PieceType, color: Color) -> Bitboard {
        self.bitboards[color as usize][piece_type as usize]
    }

    pub fn color_occupancy(&self, color: Color) -> Bitboard {
        self.bitboards[color as usize][6]
    }

    pub fn occupancy(&self) -> Bitboard {
        self.bitboards[0][6] | self.bitboards[1][6]
    }

    pub fn piece_count(&self, piece_type: PieceType) -> u32 {
        (self.piece_bitboard(piece_type, Color::White)
            | self.piece_bitboard(piece_type, Color::Black))
        .pop_count()
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.piece_bitboard(PieceType::King, color).ls1b()
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn set_en_passant_target(&mut self, target: Option<Square>) {
        self.en_passant = target;
    }

    pub fn castling_rights(&self) -> CastlingRights {
        self.castling
    }

    pub fn set_castling_rights(&mut self, rights: CastlingRights) {
        self.castling = rights;
    }

    /// Applies a move for `mover`, returning the record needed to reverse
    /// it exactly. Castling is recognized as a two-file king move, en
    /// passant as a diagonal pawn move onto the empty target square, and a
    /// pawn reaching the last rank promotes (to a queen unless the move
    /// carries a choice).
    ///
    /// Moving from an empty square or moving an opponent piece is a
    /// programmer error and panics; callers validate first.
    pub fn apply_move(&mut self, mv: Move, mover: Color) -> MoveRecord {
        let piece = self.pieces[mv.from].unwrap_or_else(|| {
            panic!(
                "apply_move: no piece on {}",
                square_representation(mv.from).unwrap_or_default()
            )
        });
        assert!(
            piece.color == mover,
            "apply_move: piece on {} does not belong to the moving side",
            square_representation(mv.from).unwrap_or_default()
        );

        let prev_castling = self.castling;
        let prev_en_passant = self.en_passant;
        let mut captured = self.piece_on(mv.to);
        let mut captured_square = captured.map(|_| mv.to);
        let mut rook_move = None;

        if piece.piece_type == PieceType::King {
            self.castling.revoke(mover);
            // a two-file king move is a castle; relocate the rook too
            if file_of(mv.from).abs_diff(file_of(mv.to)) == 2 {
                let rank = rank_of(mv.from);
                let (rook_from, rook_to) = if file_of(mv.to) == 6 {
                    (square_at(7, rank), square_at(5, rank))
                } else {
                    (square_at(0, rank), square_at(3, rank))
                };
                let rook = self
                    .remove_piece(rook_from)
                    .expect("apply_move: castling without a rook");
                self.add_piece(rook, rook_to);
                rook_move = Some((rook_from, rook_to));
            }
        }
        if mv.from == 7 || mv.to == 7 {
            self.castling.revoke_kingside(Color::White);
        }
        if mv.from == 0 || mv.to == 0 {
            self.castling.revoke_queenside(Color::White);
        }
        if mv.from == 63 || mv.to == 63 {
            self.castling.revoke_kingside(Color::Black);
        }
        if mv.from == 56 || mv.to == 56 {
            self.castling.revoke_queenside(Color::Black);
        }

        // en passant: the captured pawn is behind the destination square
        if piece.piece_type == PieceType::Pawn
            && prev_en_passant == Some(mv.to)
            && captured.is_none()
            && file_of(mv.from) != file_of(mv.to)
        {
            let behind = if mover == Color::White {
                mv.to - 8
            } else {
                mv.to + 8
            };
            captured = self.remove_piece(behind);
            captured_square = Some(behind);
        } else if captured.is_some() {
            self.remove_piece(mv.to);
        }

        self.en_passant = None;
        if piece.piece_type == PieceType::Pawn && rank_of(mv.from).abs_diff(rank_of(mv.to)) == 2 {
            self.en_passant = Some((mv.from + mv.to) / 2);
        }

        self.remove_piece(mv.from);
        let promotion_rank = if mover == Color::White { 7 } else { 0 };
        let arriving = if piece.piece_type == PieceType::Pawn && rank_of(mv.to) == promotion_rank {
            Piece::new(mv.promotion.unwrap_or(PieceType::Queen), mover)
        } else {
            piece
        };
        self.add_piece(arriving, mv.to);

        MoveRecord {
            mv,
            moved: piece,
            captured,
            captured_square,
            prev_en_passant,
            prev_castling,
            rook_move,
        }
    }

    /// Reverses a move applied with [`Board::apply_move`], restoring the
    /// board bit for bit
    pub fn undo_move(&mut self, record: MoveRecord) {
        self.remove_piece(record.mv.to);
        self.add_piece(record.moved, record.mv.from);
        if let (Some(captured), Some(sq)) = (record.captured, record.captured_square) {
            self.add_piece(captured, sq);
        }
        if let Some((rook_from, rook_to)) = record.rook_move {
            let rook = self
                .remove_piece(rook_to)
                .expect("undo_move: castled rook missing");
            self.add_piece(rook, rook_from);
        }
        self.en_passant = record.prev_en_passant;
        self.castling = record.prev_castling;
    }

    /// Whether `sq` is reached by any attack pattern of `by`. Pawn reach
    /// is modeled as attacked squares, not legal captures, so empty
    /// squares are covered as well.
    pub fn square_attacked(&self, sq: Square, by: Color) -> bool {
        if !(PAWN_ATTACKS[by.opposite() as usize][sq] & self.piece_bitboard(PieceType::Pawn, by))
            .is_empty()
        {
            return true;
        }
        if !(KNIGHT_ATTACKS[sq] & self.piece_bitboard(PieceType::Knight, by)).is_empty() {
            return true;
        }
        if !(KING_ATTACKS[sq] & self.piece_bitboard(PieceType::King, by)).is_empty() {
            return true;
        }
        let occupancy = self.occupancy();
        let diagonal = self.piece_bitboard(PieceType::Bishop, by)
            | self.piece_bitboard(PieceType::Queen, by);
        if !(Bitboard::bishop_attacks(sq, occupancy) & diagonal).is_empty() {
            return true;
        }
        let cardinal =
            self.piece_bitboard(PieceType::Rook, by) | self.piece_bitboard(PieceType::Queen, by);
        !(Bitboard::rook_attacks(sq, occupancy) & cardinal).is_empty()
    }

    pub fn in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king) => self.square_attacked(king, color.opposite()),
            None => false,
        }
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                match self.pieces[square_at(file, rank)] {
                    Some(p) => write!(f, "{} ", p)?,
                    None => write!(f, ". ")?,
                }
            }
            if rank > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// A board plus the side to move: the unit the search operates on
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub board: Board,
    pub side_to_move: Color,
}

impl Position {
    pub fn startpos() -> Position {
        Position {
            board: Board::standard(),
            side_to_move: Color::White,
        }
    }

    /// Builds a position from a FEN string (clock fields are accepted and
    /// ignored)
    pub fn from_fen(fen: &str) -> Result<Position, String> {
        let mut sections = fen.split_whitespace();
        let placement = sections.next().ok_or("empty FEN")?;
        let side = sections.next().ok_or("FEN is missing the side to move")?;
        let castling = sections.next().unwrap_or("-");
        let en_passant = sections.next().unwrap_or("-");

        let mut board = Board::empty();
        let (mut file, mut rank) = (0usize, 7usize);
        for c in placement.chars() {
            if c == '/' {
                if rank == 0 {
                    return Err(String::from("too many ranks in FEN"));
                }
                rank -= 1;
                file = 0;
            } else if let Some(d) = c.to_digit(10) {
                file += d as usize;
            } else if let Some(piece) = Piece::from_char(c) {
                if file > 7 {
                    return Err(format!("rank overflow in FEN at '{}'", c));
                }
                board.add_piece(piece, square_at(file, rank));
                file += 1;
            } else {
                return Err(format!("unexpected character '{}' in FEN", c));
            }
        }
        board.castling = CastlingRights::from_fen(castling);
        board.en_passant = if en_passant == "-" {
            None
        } else {
            Some(parse_square(en_passant).ok_or("bad en-passant square in FEN")?)
        };

        let side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => return Err(format!("bad side to move '{}' in FEN", side)),
        };
        Ok(Position {
            board,
            side_to_move,
        })
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board.piece_on(square_at(file, rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push_str(&piece.to_string());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }
        fen.push(' ');
        fen.push_str(&self.side_to_move.to_string());
        fen.push(' ');
        fen.push_str(&self.board.castling.to_string());
        fen.push(' ');
        match self.board.en_passant {
            Some(sq) => fen.push_str(&square_representation(sq).unwrap()),
            None => fen.push('-'),
        }
        fen.push_str(" 0 1");
        fen
    }

    /// Applies a move for the side to move and passes the turn
    pub fn apply_move(&mut self, mv: Move) -> MoveRecord {
        let record = self.board.apply_move(mv, self.side_to_move);
        self.side_to_move = self.side_to_move.opposite();
        record
    }

    pub fn undo_move(&mut self, record: MoveRecord) {
        self.side_to_move = self.side_to_move.opposite();
        self.board.undo_move(record);
    }

    /// Passes the turn without touching any piece. Clears the en-passant
    /// target, which a skipped turn forfeits.
    pub fn apply_null(&mut self) -> NullRecord {
        let record = NullRecord {
            prev_en_passant: self.board.en_passant,
        };
        self.board.en_passant = None;
        self.side_to_move = self.side_to_move.opposite();
        record
    }

    pub fn undo_null(&mut self, record: NullRecord) {
        self.side_to_move = self.side_to_move.opposite();
        self.board.en_passant = record.prev_en_passant;
    }

    pub fn legal_moves(&mut self) -> MoveList {
        move_generator::legal_moves(&mut self.board, self.side_to_move)
    }

    pub fn capture_moves(&mut self) -> MoveList {
        move_generator::capture_moves(&mut self.board, self.side_to_move)
    }

    /// Legal destinations from one origin square
    pub fn legal_destinations(&mut self, from: Square) -> Vec<Square> {
        move_generator::legal_destinations(&mut self.board, from, self.side_to_move)
    }

    pub fn in_check(&self) -> bool {
        self.board.in_check(self.side_to_move)
    }

    pub fn is_checkmate(&mut self) -> bool {
        self.in_check() && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&mut self) -> bool {
        !self.in_check() && self.legal_moves().is_empty()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.board)?;
        write!(f, "fen: {}", self.to_fen())
    }
}
