//! Board-core test suite.

mod make_unmake;

use super::{Color, Game, Move, Piece, PieceKind, Square};
use crate::board::parse_uci_move;

/// Find a specific legal move or panic.
pub(super) fn find_move(
    game: &Game,
    from: Square,
    to: Square,
    promotion: Option<PieceKind>,
) -> Move {
    game.legal_moves()
        .find(from, to, promotion)
        .expect("expected move not found")
}

/// Parse and make a move given in UCI notation.
pub(super) fn apply_uci(game: &mut Game, uci: &str) {
    let mv = parse_uci_move(game, uci).expect("uci move not legal");
    game.make(mv);
}

/// Sorted UCI strings of all legal moves, for order-free set comparison.
pub(super) fn move_set(game: &Game) -> Vec<String> {
    let mut moves: Vec<String> = game.legal_moves().iter().map(Move::to_string).collect();
    moves.sort();
    moves
}

/// Check every representation invariant the board and game promise.
pub(super) fn assert_coherent(game: &Game) {
    let board = game.board();
    let white = board.occupancy(Color::White);
    let black = board.occupancy(Color::Black);

    // Color occupancies are disjoint and union to the occupied set
    assert!((white & black).is_empty(), "color occupancies overlap");
    assert_eq!(board.occupied(), white | black, "occupied out of sync");

    // Mailbox and piece bitboards agree on every square
    for index in 0..64 {
        let sq = Square::from_index(index);
        let at = board.piece_at(sq);
        for piece in Piece::ALL {
            assert_eq!(
                board.pieces_of(piece.color(), piece.kind()).contains(sq),
                at == Some(piece),
                "bitboard/mailbox disagree on {sq}"
            );
        }
    }

    // One king each
    assert_eq!(board.kings(Color::White).popcount(), 1);
    assert_eq!(board.kings(Color::Black).popcount(), 1);

    // The hash history tracks the current hash, which matches a recompute
    assert_eq!(game.history[game.ply()], game.hash());
    assert_eq!(game.hash(), game.hash_from_scratch());
}
