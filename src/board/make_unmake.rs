//! Making and unmaking moves, with incremental hash maintenance.

use crate::zobrist::ZOBRIST;

use super::game::Game;
use super::types::{
    advance_square, retreat_square, CastlingRights, Color, Move, Piece, PieceKind, Square,
};

/// Snapshot of the state a move destroys; hold it until the matching
/// [`Game::unmake`].
#[derive(Clone, Copy, Debug)]
pub struct Undo {
    halfmove_clock: u32,
    captured: Option<Piece>,
    castling: CastlingRights,
    ep_square: Option<Square>,
}

/// Where the captured piece actually stands: the destination, except for
/// en passant where it is one rank behind it.
#[inline]
const fn capture_square<const WHITE: bool>(mv: Move) -> Square {
    if mv.is_en_passant() {
        retreat_square::<WHITE>(mv.to())
    } else {
        mv.to()
    }
}

impl Game {
    /// Make a move. The move must be legal in the current position (the
    /// legal generator only produces such moves).
    ///
    /// Returns the undo snapshot to pass to [`Game::unmake`].
    pub fn make(&mut self, mv: Move) -> Undo {
        match self.turn {
            Color::White => self.make_for::<true>(mv),
            Color::Black => self.make_for::<false>(mv),
        }
    }

    /// Unmake a move previously made with [`Game::make`]. Moves must be
    /// unmade in reverse order of making.
    pub fn unmake(&mut self, mv: Move, undo: Undo) {
        // The mover is the side that is no longer on turn
        match self.turn {
            Color::White => self.unmake_for::<false>(mv, undo),
            Color::Black => self.unmake_for::<true>(mv, undo),
        }
    }

    /// Make a move, run `f`, and unmake. Returns whatever `f` returned.
    ///
    /// The unmake runs on the closure's normal return; the game must not be
    /// left mid-move by other means.
    pub fn with_move<R>(&mut self, mv: Move, f: impl FnOnce(&mut Game) -> R) -> R {
        let undo = self.make(mv);
        let result = f(self);
        self.unmake(mv, undo);
        result
    }

    fn make_for<const WHITE: bool>(&mut self, mv: Move) -> Undo {
        let us = Color::from_white(WHITE);
        let them = us.opponent();
        debug_assert_eq!(self.turn, us);

        let from = mv.from();
        let to = mv.to();
        let piece_from = self.board.piece_at(from).expect("make from empty square");
        let piece_to = self.board.piece_at(to);

        let undo = Undo {
            halfmove_clock: self.halfmove_clock,
            captured: if mv.is_en_passant() {
                Some(Piece::new(them, PieceKind::Pawn))
            } else {
                piece_to
            },
            castling: self.castling,
            ep_square: self.ep_square,
        };

        // Clocks: reset the half-move clock on pawn moves and captures
        self.halfmove_clock += 1;
        self.ply += 1;
        if piece_from.kind() == PieceKind::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        }

        // Side to move
        self.turn = them;
        self.hash ^= ZOBRIST.side;

        // En-passant target: drop the old file token, set the new target on
        // double pushes only, add the new file token
        if let Some(old_ep) = self.ep_square {
            self.hash ^= ZOBRIST.en_passant_file[old_ep.file()];
        }
        self.ep_square = if mv.is_double_push() {
            Some(advance_square::<WHITE>(from))
        } else {
            None
        };
        if let Some(ep) = self.ep_square {
            debug_assert_eq!(ep.rank(), if WHITE { 2 } else { 5 });
            self.hash ^= ZOBRIST.en_passant_file[ep.file()];
        }

        // Castling rights can change when:
        //   1) the king moves (both of that side's rights go)
        //   2) a rook leaves its original corner
        //   3) a rook is captured on the *other* side's original corner
        // Castling itself is covered by rule 1.
        self.hash ^= ZOBRIST.castling[self.castling.mask() as usize];

        let (own_qs_corner, own_ks_corner) = if WHITE { (0, 7) } else { (56, 63) };
        let (their_qs_corner, their_ks_corner) = if WHITE { (56, 63) } else { (0, 7) };

        if piece_from.kind() == PieceKind::King {
            self.castling.revoke_both(us);
        } else if piece_from.kind() == PieceKind::Rook {
            if from.index() == own_ks_corner {
                self.castling.revoke(us, true);
            } else if from.index() == own_qs_corner {
                self.castling.revoke(us, false);
            }
        }

        // For en passant, piece_to is None, so this cannot trigger
        if piece_to == Some(Piece::new(them, PieceKind::Rook)) {
            if to.index() == their_ks_corner {
                self.castling.revoke(them, true);
            } else if to.index() == their_qs_corner {
                self.castling.revoke(them, false);
            }
        }

        self.hash ^= ZOBRIST.castling[self.castling.mask() as usize];

        // Remove the captured piece
        if mv.is_capture() {
            let capture_sq = capture_square::<WHITE>(mv);
            let captured = self.board.remove(capture_sq);
            self.hash ^= ZOBRIST.piece_square[captured.index()][capture_sq.index()];
        }

        // Move the mover; a promotion swaps the pawn for the promoted piece
        if let Some(kind) = mv.promotion() {
            let promoted = Piece::new(us, kind);
            self.hash ^= ZOBRIST.piece_square[piece_from.index()][from.index()];
            self.hash ^= ZOBRIST.piece_square[promoted.index()][to.index()];
            self.board.remove(from);
            self.board.put(promoted, to);
        } else {
            self.hash ^= ZOBRIST.piece_square[piece_from.index()][from.index()];
            self.hash ^= ZOBRIST.piece_square[piece_from.index()][to.index()];
            self.board.move_piece(from, to);
        }

        // Castling also moves the rook
        if mv.is_castle() {
            let rank_base = to.index() & 56;
            let (rook_from_file, rook_to_file) = if mv.is_kingside_castle() {
                (7, 5)
            } else {
                (0, 3)
            };
            let rook_from = Square::from_index(rank_base + rook_from_file);
            let rook_to = Square::from_index(rank_base + rook_to_file);
            let rook = Piece::new(us, PieceKind::Rook);

            self.hash ^= ZOBRIST.piece_square[rook.index()][rook_from.index()];
            self.hash ^= ZOBRIST.piece_square[rook.index()][rook_to.index()];
            self.board.move_piece(rook_from, rook_to);
        }

        self.history.push(self.hash);
        debug_assert_eq!(self.history.len(), self.ply + 1);

        undo
    }

    fn unmake_for<const WHITE: bool>(&mut self, mv: Move, undo: Undo) {
        let us = Color::from_white(WHITE);
        debug_assert_ne!(self.turn, us);

        self.castling = undo.castling;
        self.halfmove_clock = undo.halfmove_clock;
        self.ep_square = undo.ep_square;
        self.turn = us;

        // Rewind the hash instead of recomputing it
        self.history.pop();
        self.ply -= 1;
        self.hash = self.history[self.ply];
        debug_assert_eq!(self.history.len(), self.ply + 1);

        let from = mv.from();
        let to = mv.to();

        // Move the mover back; a promotion turns back into a pawn
        if mv.is_promotion() {
            self.board.remove(to);
            self.board.put(Piece::new(us, PieceKind::Pawn), from);
        } else {
            self.board.move_piece(to, from);
        }

        if mv.is_capture() {
            let captured = undo.captured.expect("unmake capture without a record");
            self.board.put(captured, capture_square::<WHITE>(mv));
        } else if mv.is_castle() {
            let rank_base = to.index() & 56;
            let (rook_from_file, rook_to_file) = if mv.is_kingside_castle() {
                (7, 5)
            } else {
                (0, 3)
            };
            self.board.move_piece(
                Square::from_index(rank_base + rook_to_file),
                Square::from_index(rank_base + rook_from_file),
            );
        }
    }
}
