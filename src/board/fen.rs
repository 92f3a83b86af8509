//! FEN parsing and serialization.

use super::error::FenError;
use super::game::Game;
use super::state::Board;
use super::types::{CastlingRights, Color, Piece, Square};

impl Game {
    /// Parse a game from FEN notation (six fields: placement, side,
    /// castling, en passant, half-move clock, full-move number; the last two
    /// may be omitted).
    pub fn try_from_fen(fen: &str) -> Result<Self, FenError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();

        if parts.len() < 4 {
            return Err(FenError::TooFewParts { found: parts.len() });
        }

        // 1. Piece placement, rank 8 first
        let mut board = Board::empty();
        for (rank_index, rank_str) in parts[0].split('/').enumerate() {
            if rank_index >= 8 {
                return Err(FenError::InvalidRank { rank: rank_index });
            }
            let rank = 7 - rank_index;
            let mut file = 0usize;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as usize;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenError::InvalidPiece { piece: c })?;
                    if file >= 8 {
                        return Err(FenError::TooManyFiles {
                            rank,
                            files: file + 1,
                        });
                    }
                    board.put(piece, Square::new(rank, file));
                    file += 1;
                }
            }
        }

        // 2. Active color
        let turn = match parts[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(FenError::InvalidSideToMove {
                    found: other.to_string(),
                })
            }
        };

        // 3. Castling availability
        let mut castling = CastlingRights::none();
        for c in parts[2].chars() {
            match c {
                'K' => castling.grant(Color::White, true),
                'Q' => castling.grant(Color::White, false),
                'k' => castling.grant(Color::Black, true),
                'q' => castling.grant(Color::Black, false),
                '-' => {}
                _ => return Err(FenError::InvalidCastling { castling: c }),
            }
        }

        // 4. En-passant target square
        let ep_square = if parts[3] == "-" {
            None
        } else {
            Some(
                parts[3]
                    .parse::<Square>()
                    .map_err(|_| FenError::InvalidEnPassant {
                        found: parts[3].to_string(),
                    })?,
            )
        };

        // 5. Half-move clock
        let halfmove_clock = parts
            .get(4)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0u32);

        // 6. Full-move number, converted to plies
        let fullmove: usize = parts.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);
        let ply = fullmove * 2 + turn.index();

        let mut game = Game {
            board,
            turn,
            castling,
            ep_square,
            halfmove_clock,
            ply,
            hash: 0,
            history: vec![0; ply + 1],
        };
        game.hash = game.hash_from_scratch();
        game.history[ply] = game.hash;
        Ok(game)
    }

    /// Parse a game from FEN notation.
    ///
    /// # Panics
    /// Panics if the FEN string is invalid. Use `try_from_fen` for fallible
    /// parsing.
    #[must_use]
    pub fn from_fen(fen: &str) -> Self {
        Self::try_from_fen(fen).expect("invalid FEN string")
    }

    /// Serialize the position to FEN notation.
    #[must_use]
    pub fn to_fen(&self) -> String {
        let mut out = String::new();

        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.board.piece_at(Square::new(rank, file)) {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from_digit(empty, 10).expect("digit"));
                            empty = 0;
                        }
                        out.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from_digit(empty, 10).expect("digit"));
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.turn {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        out.push_str(&self.castling.to_string());

        out.push(' ');
        match self.ep_square {
            Some(sq) => out.push_str(&sq.to_string()),
            None => out.push('-'),
        }

        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number()));

        out
    }
}
