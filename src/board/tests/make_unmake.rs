//! Make/unmake round-trip and incremental-hash tests.

use rand::prelude::*;

use crate::board::{Color, Game, Move, Piece, PieceKind, Undo};

use super::{apply_uci, assert_coherent, find_move};

fn sq(name: &str) -> crate::board::Square {
    name.parse().unwrap()
}

#[test]
fn test_simple_move_round_trip() {
    let mut game = Game::new();
    let original = game.clone();

    let mv = find_move(&game, sq("e2"), sq("e4"), None);
    let undo = game.make(mv);
    assert_coherent(&game);
    assert_eq!(game.turn(), Color::Black);
    assert_eq!(game.ep_square(), Some(sq("e3")));

    game.unmake(mv, undo);
    assert_coherent(&game);
    assert!(game == original, "state not restored exactly");
}

#[test]
fn test_capture_round_trip() {
    let mut game = Game::from_fen("4k3/8/8/3p4/4P3/8/8/4K3 w - - 0 1");
    let original = game.clone();

    let mv = find_move(&game, sq("e4"), sq("d5"), None);
    assert!(mv.is_capture());
    let undo = game.make(mv);
    assert_coherent(&game);
    assert_eq!(game.board().piece_at(sq("d5")), Some(Piece::WhitePawn));
    assert_eq!(game.halfmove_clock(), 0);

    game.unmake(mv, undo);
    assert!(game == original);
    assert_eq!(game.board().piece_at(sq("d5")), Some(Piece::BlackPawn));
}

#[test]
fn test_en_passant_round_trip() {
    let mut game =
        Game::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3");
    let original = game.clone();

    let mv = find_move(&game, sq("e5"), sq("f6"), None);
    assert!(mv.is_en_passant());
    let undo = game.make(mv);
    assert_coherent(&game);
    // The captured pawn disappears from f5, not f6
    assert_eq!(game.board().piece_at(sq("f5")), None);
    assert_eq!(game.board().piece_at(sq("f6")), Some(Piece::WhitePawn));

    game.unmake(mv, undo);
    assert!(game == original);
    assert_eq!(game.board().piece_at(sq("f5")), Some(Piece::BlackPawn));
}

#[test]
fn test_promotion_round_trip() {
    let mut game = Game::from_fen("8/P7/8/8/8/8/8/K1k5 w - - 0 1");
    let original = game.clone();

    let mv = find_move(&game, sq("a7"), sq("a8"), Some(PieceKind::Queen));
    let undo = game.make(mv);
    assert_coherent(&game);
    assert_eq!(game.board().piece_at(sq("a8")), Some(Piece::WhiteQueen));
    assert!(game.board().pawns(Color::White).is_empty());

    game.unmake(mv, undo);
    assert!(game == original);
    assert_eq!(game.board().piece_at(sq("a7")), Some(Piece::WhitePawn));
}

#[test]
fn test_promotion_capture_round_trip() {
    let mut game = Game::from_fen("1n2k3/P7/8/8/8/8/8/4K3 w - - 0 1");
    let original = game.clone();

    let mv = find_move(&game, sq("a7"), sq("b8"), Some(PieceKind::Knight));
    assert!(mv.is_capture() && mv.is_promotion());
    let undo = game.make(mv);
    assert_coherent(&game);
    assert_eq!(game.board().piece_at(sq("b8")), Some(Piece::WhiteKnight));

    game.unmake(mv, undo);
    assert!(game == original);
    assert_eq!(game.board().piece_at(sq("b8")), Some(Piece::BlackKnight));
}

#[test]
fn test_castling_round_trip() {
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let original = game.clone();

    let mv = find_move(&game, sq("e1"), sq("g1"), None);
    assert!(mv.is_kingside_castle());
    let undo = game.make(mv);
    assert_coherent(&game);
    assert_eq!(game.board().piece_at(sq("g1")), Some(Piece::WhiteKing));
    assert_eq!(game.board().piece_at(sq("f1")), Some(Piece::WhiteRook));
    assert_eq!(game.board().piece_at(sq("h1")), None);
    assert!(!game.castling_rights().has(Color::White, true));
    assert!(!game.castling_rights().has(Color::White, false));

    game.unmake(mv, undo);
    assert!(game == original);
}

#[test]
fn test_rook_move_clears_one_castling_right() {
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    let mv = find_move(&game, sq("a1"), sq("a2"), None);
    let undo = game.make(mv);
    assert!(!game.castling_rights().has(Color::White, false));
    assert!(game.castling_rights().has(Color::White, true));
    assert!(game.castling_rights().has(Color::Black, true));
    game.unmake(mv, undo);
    assert!(game.castling_rights().has(Color::White, false));
}

#[test]
fn test_rook_capture_clears_enemy_castling_right() {
    // White rook takes the rook on h8; Black loses kingside castling
    let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1");
    apply_uci(&mut game, "h1h8");
    assert!(!game.castling_rights().has(Color::Black, true));
    assert!(game.castling_rights().has(Color::Black, false));
}

#[test]
fn test_halfmove_clock_counts_quiet_moves() {
    let mut game = Game::new();
    apply_uci(&mut game, "g1f3");
    assert_eq!(game.halfmove_clock(), 1);
    apply_uci(&mut game, "g8f6");
    assert_eq!(game.halfmove_clock(), 2);
    apply_uci(&mut game, "e2e4");
    assert_eq!(game.halfmove_clock(), 0);
}

#[test]
fn test_hash_matches_recompute_after_random_moves() {
    let mut game = Game::new();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);
    let mut history: Vec<(Move, Undo)> = Vec::new();

    for _ in 0..80 {
        let moves = game.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let undo = game.make(mv);
        history.push((mv, undo));

        assert_eq!(game.hash(), game.hash_from_scratch());
    }

    while let Some((mv, undo)) = history.pop() {
        game.unmake(mv, undo);
        assert_eq!(game.hash(), game.hash_from_scratch());
    }
}

#[test]
fn test_random_playout_round_trip_state() {
    let mut game = Game::new();
    let original = game.clone();

    let mut rng = StdRng::seed_from_u64(0x5EED);
    let mut history: Vec<(Move, Undo)> = Vec::new();

    for _ in 0..200 {
        let moves = game.legal_moves();
        if moves.is_empty() {
            break;
        }
        let mv = moves[rng.gen_range(0..moves.len())];
        let undo = game.make(mv);
        history.push((mv, undo));
        assert_coherent(&game);
    }

    while let Some((mv, undo)) = history.pop() {
        game.unmake(mv, undo);
        assert_coherent(&game);
    }

    assert!(game == original, "playout did not rewind to the start");
}

#[test]
fn test_with_move_runs_and_restores() {
    let mut game = Game::new();
    let original = game.clone();

    let mv = find_move(&game, sq("e2"), sq("e4"), None);
    let replies = game.with_move(mv, |g| {
        assert_eq!(g.turn(), Color::Black);
        g.legal_move_count()
    });
    assert_eq!(replies, 20);
    assert!(game == original);
}

#[test]
fn test_ply_and_fullmove_advance() {
    let mut game = Game::new();
    let start_ply = game.ply();
    assert_eq!(game.fullmove_number(), 1);

    apply_uci(&mut game, "e2e4");
    assert_eq!(game.ply(), start_ply + 1);
    apply_uci(&mut game, "e7e5");
    assert_eq!(game.ply(), start_ply + 2);
    assert_eq!(game.fullmove_number(), 2);
}
