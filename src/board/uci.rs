//! UCI move-string conversion.

use std::str::FromStr;

use super::error::MoveParseError;
use super::game::Game;
use super::types::{Move, PieceKind, Square};

/// Parse a UCI move string (`e2e4`, `e7e8q`) against the current position.
///
/// The returned move carries the exact flag bits the position implies
/// (capture, double push, en passant, castling, promotion). Strings that do
/// not name a legal move in this position are rejected.
pub fn parse_uci_move(game: &Game, s: &str) -> Result<Move, MoveParseError> {
    if !s.is_ascii() || (s.len() != 4 && s.len() != 5) {
        return Err(MoveParseError::InvalidLength { len: s.len() });
    }

    let from = Square::from_str(&s[0..2]).map_err(|_| MoveParseError::InvalidSquare {
        notation: s.to_string(),
    })?;
    let to = Square::from_str(&s[2..4]).map_err(|_| MoveParseError::InvalidSquare {
        notation: s.to_string(),
    })?;

    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(PieceKind::Queen),
        Some(b'r') => Some(PieceKind::Rook),
        Some(b'b') => Some(PieceKind::Bishop),
        Some(b'n') => Some(PieceKind::Knight),
        Some(&other) => {
            return Err(MoveParseError::InvalidPromotion {
                promotion: other as char,
            })
        }
    };

    game.legal_moves()
        .find(from, to, promotion)
        .ok_or_else(|| MoveParseError::IllegalMove {
            notation: s.to_string(),
        })
}
