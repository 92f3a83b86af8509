//! Single-pass legal move generation.
//!
//! Rather than generating pseudolegal moves and filtering, the generator
//! computes a checkmask and two pinmasks up front and intersects every
//! non-king destination set with them. Any destination surviving the masks
//! is legal, so moves are emitted directly with no trial make/unmake.
//!
//! Everything here is monomorphized on the side to move; the public entry
//! points fork into the two specialized variants.

use super::game::Game;
use super::lookup;
use super::state::Board;
use super::types::{
    advance_square, double_advance_square, Bitboard, Color, Move, MoveCounter, MoveList, MoveSink,
    Square, FLAG_BISHOP_PROMO, FLAG_BISHOP_PROMO_CAPTURE, FLAG_CAPTURE, FLAG_DOUBLE_PUSH,
    FLAG_EN_PASSANT, FLAG_KING_CASTLE, FLAG_KNIGHT_PROMO, FLAG_KNIGHT_PROMO_CAPTURE,
    FLAG_QUEEN_CASTLE, FLAG_QUEEN_PROMO, FLAG_QUEEN_PROMO_CAPTURE, FLAG_QUIET, FLAG_ROOK_PROMO,
    FLAG_ROOK_PROMO_CAPTURE,
};

// ---------------------------------------------------------------------------
// Side-to-move geometry

#[inline]
fn forward<const WHITE: bool>(bb: Bitboard) -> Bitboard {
    if WHITE {
        bb << 8
    } else {
        bb >> 8
    }
}

#[inline]
fn backward<const WHITE: bool>(bb: Bitboard) -> Bitboard {
    if WHITE {
        bb >> 8
    } else {
        bb << 8
    }
}

#[inline]
fn double_backward<const WHITE: bool>(bb: Bitboard) -> Bitboard {
    if WHITE {
        bb >> 16
    } else {
        bb << 16
    }
}

/// Squares our pawns attack toward the a-file side
#[inline]
fn left_pawn_attacks<const WHITE: bool>(pawns: Bitboard) -> Bitboard {
    forward::<WHITE>(pawns & !Bitboard::FILE_A) >> 1
}

/// Squares our pawns attack toward the h-file side
#[inline]
fn right_pawn_attacks<const WHITE: bool>(pawns: Bitboard) -> Bitboard {
    forward::<WHITE>(pawns & !Bitboard::FILE_H) << 1
}

/// Pawns that could produce the given left-capture destinations
#[inline]
fn reverse_left_pawn_attacks<const WHITE: bool>(targets: Bitboard) -> Bitboard {
    backward::<WHITE>(targets & !Bitboard::FILE_H) << 1
}

/// Pawns that could produce the given right-capture destinations
#[inline]
fn reverse_right_pawn_attacks<const WHITE: bool>(targets: Bitboard) -> Bitboard {
    backward::<WHITE>(targets & !Bitboard::FILE_A) >> 1
}

const fn pawn_start_rank<const WHITE: bool>() -> Bitboard {
    if WHITE {
        Bitboard::RANK_2
    } else {
        Bitboard::RANK_7
    }
}

/// The rank pawns promote from
const fn promotion_source_rank<const WHITE: bool>() -> Bitboard {
    if WHITE {
        Bitboard::RANK_7
    } else {
        Bitboard::RANK_2
    }
}

// ---------------------------------------------------------------------------
// Castling geometry

/// Squares strictly between two distinct squares on a shared rank
const fn squares_between(a: usize, b: usize) -> u64 {
    if a > b {
        (1u64 << a) - (2u64 << b)
    } else {
        (1u64 << b) - (2u64 << a)
    }
}

const fn king_start<const WHITE: bool>() -> usize {
    if WHITE {
        4
    } else {
        60
    }
}

const fn kingside_rook_start<const WHITE: bool>() -> usize {
    if WHITE {
        7
    } else {
        63
    }
}

const fn queenside_rook_start<const WHITE: bool>() -> usize {
    if WHITE {
        0
    } else {
        56
    }
}

const fn kingside_king_target<const WHITE: bool>() -> usize {
    if WHITE {
        6
    } else {
        62
    }
}

const fn queenside_king_target<const WHITE: bool>() -> usize {
    if WHITE {
        2
    } else {
        58
    }
}

/// Squares that must be empty for kingside castling
const fn castle_empty_kingside<const WHITE: bool>() -> Bitboard {
    Bitboard(squares_between(
        kingside_rook_start::<WHITE>(),
        king_start::<WHITE>(),
    ))
}

/// Squares that must be empty for queenside castling
const fn castle_empty_queenside<const WHITE: bool>() -> Bitboard {
    Bitboard(squares_between(
        queenside_rook_start::<WHITE>(),
        king_start::<WHITE>(),
    ))
}

/// The king's path for kingside castling: start, through, and destination.
/// None of these may be attacked.
const fn castle_path_kingside<const WHITE: bool>() -> Bitboard {
    let king = king_start::<WHITE>();
    let target = kingside_king_target::<WHITE>();
    Bitboard(squares_between(target, king) | (1u64 << target) | (1u64 << king))
}

/// The king's path for queenside castling. The rook traversal square next to
/// the corner is deliberately not part of this mask: it may be attacked.
const fn castle_path_queenside<const WHITE: bool>() -> Bitboard {
    let king = king_start::<WHITE>();
    let target = queenside_king_target::<WHITE>();
    Bitboard(squares_between(target, king) | (1u64 << target) | (1u64 << king))
}

// ---------------------------------------------------------------------------
// Masks

/// Checkmask: the set of destinations that resolve the current check for
/// non-king pieces. All ones when not in check; when a single piece checks,
/// the ray to it (inclusive); zero under double check.
fn compute_checkmask<const WHITE: bool>(game: &Game) -> Bitboard {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let board = game.board();

    let king = board.kings(us);
    let king_sq = king.lsb();
    let occupied = board.occupied();

    let mut checkmask = Bitboard::ALL;

    // Rook-class checks. Two rook-sliders *can* check at once: a promotion
    // can deliver a check on the file while discovering one on the rank.
    let rook_probe = lookup::rook_attacks(king_sq, occupied);
    let checkers = rook_probe & (board.rooks(them) | board.queens(them));
    if checkers.any() {
        if checkers.is_single() {
            checkmask &=
                rook_probe & (lookup::rook_attacks(checkers.lsb(), occupied) | checkers);
        } else {
            checkmask = Bitboard::EMPTY;
        }
    }

    // Bishop-class checks; two bishops can never check at once
    let bishop_probe = lookup::bishop_attacks(king_sq, occupied);
    let checkers = bishop_probe & (board.bishops(them) | board.queens(them));
    if checkers.any() {
        debug_assert!(checkers.is_single());
        checkmask &=
            bishop_probe & (lookup::bishop_attacks(checkers.lsb(), occupied) | checkers);
    }

    // A knight checker shrinks the mask to the knight itself; in a reachable
    // position a double check always involves a slider
    let checkers = lookup::knight_attacks(king_sq) & board.knights(them);
    if checkers.any() {
        debug_assert!(checkers.is_single());
        checkmask &= checkers;
    }

    // Pawn checkers, same shape
    let checkers = (left_pawn_attacks::<WHITE>(king) | right_pawn_attacks::<WHITE>(king))
        & board.pawns(them);
    if checkers.any() {
        debug_assert!(checkers.is_single());
        checkmask &= checkers;
    }

    checkmask
}

/// Union of rank/file pin rays: king through one own piece to an enemy rook
/// or queen. A piece on the mask may only move along the mask.
fn compute_pinmask_hv<const WHITE: bool>(game: &Game) -> Bitboard {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let board = game.board();

    let king_sq = board.king_square(us);
    let occupied = board.occupied();
    let enemy_sliders = board.rooks(them) | board.queens(them);

    // Own pieces directly visible from the king are pin candidates
    let probe = lookup::rook_attacks(king_sq, occupied);
    let candidates = probe & board.occupancy(us);

    // X-ray through the candidates. Sliders already seen by the first probe
    // are checking, not pinning.
    let xray = lookup::rook_attacks(king_sq, occupied & !candidates);
    let mut pinners = xray & enemy_sliders & !probe;

    let mut pinmask = Bitboard::EMPTY;
    while pinners.any() {
        let pinner_sq = pinners.pop_lsb();
        let pinned = lookup::rook_attacks(pinner_sq, occupied) & candidates;
        debug_assert!(pinned.is_single());
        pinmask |= (lookup::rook_attacks(pinned.lsb(), occupied) | pinned) & xray;
    }
    pinmask
}

/// Union of diagonal pin rays, for enemy bishops and queens.
fn compute_pinmask_diag<const WHITE: bool>(game: &Game) -> Bitboard {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let board = game.board();

    let king_sq = board.king_square(us);
    let occupied = board.occupied();
    let enemy_sliders = board.bishops(them) | board.queens(them);

    let probe = lookup::bishop_attacks(king_sq, occupied);
    let candidates = probe & board.occupancy(us);

    let xray = lookup::bishop_attacks(king_sq, occupied & !candidates);
    let mut pinners = xray & enemy_sliders & !probe;

    let mut pinmask = Bitboard::EMPTY;
    while pinners.any() {
        let pinner_sq = pinners.pop_lsb();
        let pinned = lookup::bishop_attacks(pinner_sq, occupied) & candidates;
        debug_assert!(pinned.is_single());
        pinmask |= (lookup::bishop_attacks(pinned.lsb(), occupied) | pinned) & xray;
    }
    pinmask
}

/// Every square the enemy attacks, computed with our king removed from the
/// occupancy so sliders see through it. Keeps the king from stepping
/// backwards along a checking ray, and doubles as the castling-path and
/// in-check test.
fn attacked_without_king<const WHITE: bool>(game: &Game) -> Bitboard {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let board = game.board();

    let king = board.kings(us);
    let occupied = board.occupied() ^ king;

    let enemy_pawns = board.pawns(them);
    let mut attacked = (backward::<WHITE>(enemy_pawns & !Bitboard::FILE_A) >> 1)
        | (backward::<WHITE>(enemy_pawns & !Bitboard::FILE_H) << 1);

    attacked |= lookup::king_attacks(board.king_square(them));

    let mut knights = board.knights(them);
    while knights.any() {
        attacked |= lookup::knight_attacks(knights.pop_lsb());
    }

    let mut diagonal = board.bishops(them) | board.queens(them);
    while diagonal.any() {
        attacked |= lookup::bishop_attacks(diagonal.pop_lsb(), occupied);
    }

    let mut orthogonal = board.rooks(them) | board.queens(them);
    while orthogonal.any() {
        attacked |= lookup::rook_attacks(orthogonal.pop_lsb(), occupied);
    }

    attacked
}

/// Is `sq` attacked by the enemies of the `WHITE` side?
pub(crate) fn square_attacked<const WHITE: bool>(board: &Board, sq: Square) -> bool {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let spot = Bitboard::from_square(sq);
    let occupied = board.occupied();

    let attackers = ((left_pawn_attacks::<WHITE>(spot) | right_pawn_attacks::<WHITE>(spot))
        & board.pawns(them))
        | (lookup::king_attacks(sq) & board.kings(them))
        | (lookup::knight_attacks(sq) & board.knights(them))
        | (lookup::bishop_attacks(sq, occupied) & (board.bishops(them) | board.queens(them)))
        | (lookup::rook_attacks(sq, occupied) & (board.rooks(them) | board.queens(them)));

    attackers.any()
}

// ---------------------------------------------------------------------------
// Emission

/// Emit one piece's destination set, or just count it. The capture flag is
/// synthesized branchlessly from the enemy occupancy.
#[inline]
fn emit_piece_moves<S: MoveSink>(sink: &mut S, from: Square, targets: Bitboard, enemy: Bitboard) {
    if S::COUNTS_ONLY {
        sink.add_count(u64::from(targets.popcount()));
        return;
    }
    let mut targets = targets;
    while targets.any() {
        let to = targets.pop_lsb();
        let flag = (((enemy.0 >> to.index()) & 1) << 2) as u16;
        sink.push(Move::from_parts(from, to, flag));
    }
}

/// Generate every legal move for the side to move, pushing into `sink`.
pub(crate) fn legal_moves<const WHITE: bool, S: MoveSink>(game: &Game, sink: &mut S) {
    let us = Color::from_white(WHITE);
    let them = us.opponent();
    let board = game.board();

    let pawns = board.pawns(us);
    let knights = board.knights(us);
    let bishops = board.bishops(us);
    let rooks = board.rooks(us);
    let queens = board.queens(us);
    let king = board.kings(us);

    let occupied = board.occupied();
    let own = board.occupancy(us);
    let enemy = board.occupancy(them);

    let checkmask = compute_checkmask::<WHITE>(game);
    let pin_hv = compute_pinmask_hv::<WHITE>(game);
    let pin_d = compute_pinmask_diag::<WHITE>(game);

    // Destinations open to non-pawn, non-king pieces
    let moveable = !own & checkmask;

    // Pawns, as set operations over all of them at once
    {
        // Diagonally pinned pawns cannot push; rank/file pinned pawns
        // cannot capture
        let pawns_not_hv = pawns & !pin_hv;
        let pawns_not_d = pawns & !pin_d;

        let mut quiet = pawns_not_d & backward::<WHITE>(!occupied);
        let mut double_push =
            quiet & pawn_start_rank::<WHITE>() & double_backward::<WHITE>(!occupied & checkmask);
        let mut left_capture = pawns_not_hv & reverse_left_pawn_attacks::<WHITE>(enemy & checkmask);
        let mut right_capture =
            pawns_not_hv & reverse_right_pawn_attacks::<WHITE>(enemy & checkmask);
        quiet &= backward::<WHITE>(checkmask);

        // A pinned pusher stays legal only if it stays on the pin ray
        let quiet_pinned = quiet & pin_hv;
        quiet = (quiet_pinned & backward::<WHITE>(pin_hv)) | (quiet & !pin_hv);

        let double_push_pinned = double_push & pin_hv;
        double_push =
            (double_push_pinned & double_backward::<WHITE>(pin_hv)) | (double_push & !pin_hv);

        // A pinned capturer must land on the diagonal pin ray
        let left_pinned = left_capture & pin_d;
        left_capture =
            (left_pinned & reverse_left_pawn_attacks::<WHITE>(pin_d)) | (left_capture & !pin_d);

        let right_pinned = right_capture & pin_d;
        right_capture =
            (right_pinned & reverse_right_pawn_attacks::<WHITE>(pin_d)) | (right_capture & !pin_d);

        // Split off promotions before emitting
        let promo_rank = promotion_source_rank::<WHITE>();
        let mut quiet_promo = quiet & promo_rank;
        let mut left_capture_promo = left_capture & promo_rank;
        let mut right_capture_promo = right_capture & promo_rank;
        quiet &= !promo_rank;
        left_capture &= !promo_rank;
        right_capture &= !promo_rank;

        if S::COUNTS_ONLY {
            sink.add_count(u64::from(
                quiet.popcount()
                    + double_push.popcount()
                    + left_capture.popcount()
                    + right_capture.popcount()
                    + 4 * (quiet_promo.popcount()
                        + left_capture_promo.popcount()
                        + right_capture_promo.popcount()),
            ));
        }

        // En passant. Removing the capturing and captured pawns together can
        // uncover a rook or queen along the king's rank, so both are lifted
        // off the board for a discovered-check probe. When two of our pawns
        // can capture, the geometry rules that rank check out, and the probe
        // is skipped.
        if let Some(ep_square) = game.ep_square() {
            let ep_spot = Bitboard::from_square(ep_square);
            let ep_target = backward::<WHITE>(ep_spot);

            let mut left_ep = pawns_not_hv & !Bitboard::FILE_A & ((ep_target & checkmask) << 1);
            let mut right_ep = pawns_not_hv & !Bitboard::FILE_H & ((ep_target & checkmask) >> 1);

            let capturers = left_ep | right_ep;
            if capturers.any()
                && ((left_ep.any() && right_ep.any())
                    || (lookup::rook_attacks(
                        king.lsb(),
                        occupied ^ (capturers | ep_spot | ep_target),
                    ) & (board.rooks(them) | board.queens(them)))
                        .is_empty())
            {
                // The diagonal-pin rule still applies to the landing square
                left_ep = (left_ep & pin_d & reverse_left_pawn_attacks::<WHITE>(pin_d))
                    | (left_ep & !pin_d);
                right_ep = (right_ep & pin_d & reverse_right_pawn_attacks::<WHITE>(pin_d))
                    | (right_ep & !pin_d);

                if S::COUNTS_ONLY {
                    sink.add_count(u64::from(left_ep.any()) + u64::from(right_ep.any()));
                } else {
                    if left_ep.any() {
                        sink.push(Move::from_parts(left_ep.lsb(), ep_square, FLAG_EN_PASSANT));
                    }
                    if right_ep.any() {
                        sink.push(Move::from_parts(right_ep.lsb(), ep_square, FLAG_EN_PASSANT));
                    }
                }
            }
        }

        if !S::COUNTS_ONLY {
            while quiet.any() {
                let from = quiet.pop_lsb();
                let to = advance_square::<WHITE>(from);
                sink.push(Move::from_parts(from, to, FLAG_QUIET));
            }

            while double_push.any() {
                let from = double_push.pop_lsb();
                let to = double_advance_square::<WHITE>(from);
                sink.push(Move::from_parts(from, to, FLAG_DOUBLE_PUSH));
            }

            while left_capture.any() {
                let from = left_capture.pop_lsb();
                let to = Square::from_index(advance_square::<WHITE>(from).index() - 1);
                sink.push(Move::from_parts(from, to, FLAG_CAPTURE));
            }

            while right_capture.any() {
                let from = right_capture.pop_lsb();
                let to = Square::from_index(advance_square::<WHITE>(from).index() + 1);
                sink.push(Move::from_parts(from, to, FLAG_CAPTURE));
            }

            while quiet_promo.any() {
                let from = quiet_promo.pop_lsb();
                let to = advance_square::<WHITE>(from);
                sink.push(Move::from_parts(from, to, FLAG_QUEEN_PROMO));
                sink.push(Move::from_parts(from, to, FLAG_ROOK_PROMO));
                sink.push(Move::from_parts(from, to, FLAG_KNIGHT_PROMO));
                sink.push(Move::from_parts(from, to, FLAG_BISHOP_PROMO));
            }

            while left_capture_promo.any() {
                let from = left_capture_promo.pop_lsb();
                let to = Square::from_index(advance_square::<WHITE>(from).index() - 1);
                sink.push(Move::from_parts(from, to, FLAG_QUEEN_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_ROOK_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_KNIGHT_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_BISHOP_PROMO_CAPTURE));
            }

            while right_capture_promo.any() {
                let from = right_capture_promo.pop_lsb();
                let to = Square::from_index(advance_square::<WHITE>(from).index() + 1);
                sink.push(Move::from_parts(from, to, FLAG_QUEEN_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_ROOK_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_KNIGHT_PROMO_CAPTURE));
                sink.push(Move::from_parts(from, to, FLAG_BISHOP_PROMO_CAPTURE));
            }
        }
    }

    // Knights: a pinned knight cannot move at all
    {
        let mut unpinned = knights & !(pin_hv | pin_d);
        while unpinned.any() {
            let from = unpinned.pop_lsb();
            emit_piece_moves(sink, from, lookup::knight_attacks(from) & moveable, enemy);
        }
    }

    // Bishops and the queens' diagonal component. Folding queens in here
    // makes their diagonal mobility free.
    {
        let diagonal_movers = (bishops | queens) & !pin_hv;
        let mut unpinned = diagonal_movers & !pin_d;
        let mut pinned = diagonal_movers & pin_d;

        while unpinned.any() {
            let from = unpinned.pop_lsb();
            emit_piece_moves(
                sink,
                from,
                lookup::bishop_attacks(from, occupied) & moveable,
                enemy,
            );
        }

        while pinned.any() {
            let from = pinned.pop_lsb();
            emit_piece_moves(
                sink,
                from,
                lookup::bishop_attacks(from, occupied) & moveable & pin_d,
                enemy,
            );
        }
    }

    // Rooks and the queens' orthogonal component
    {
        let orthogonal_movers = (rooks | queens) & !pin_d;
        let mut unpinned = orthogonal_movers & !pin_hv;
        let mut pinned = orthogonal_movers & pin_hv;

        while unpinned.any() {
            let from = unpinned.pop_lsb();
            emit_piece_moves(
                sink,
                from,
                lookup::rook_attacks(from, occupied) & moveable,
                enemy,
            );
        }

        while pinned.any() {
            let from = pinned.pop_lsb();
            emit_piece_moves(
                sink,
                from,
                lookup::rook_attacks(from, occupied) & moveable & pin_hv,
                enemy,
            );
        }
    }

    // King moves and castling. One attack map serves three purposes: king
    // destinations, the in-check test, and the castling-path test.
    {
        let banned = attacked_without_king::<WHITE>(game);
        let king_sq = king.lsb();
        let king_targets = lookup::king_attacks(king_sq) & !own & !banned;

        let can_kingside = game.castling_rights().has(us, true)
            && (castle_empty_kingside::<WHITE>() & occupied).is_empty()
            && (castle_path_kingside::<WHITE>() & banned).is_empty();
        let can_queenside = game.castling_rights().has(us, false)
            && (castle_empty_queenside::<WHITE>() & occupied).is_empty()
            && (castle_path_queenside::<WHITE>() & banned).is_empty();

        if S::COUNTS_ONLY {
            sink.add_count(u64::from(can_kingside) + u64::from(can_queenside));
        } else {
            if can_kingside {
                sink.push(Move::from_parts(
                    king_sq,
                    Square::from_index(king_sq.index() + 2),
                    FLAG_KING_CASTLE,
                ));
            }
            if can_queenside {
                sink.push(Move::from_parts(
                    king_sq,
                    Square::from_index(king_sq.index() - 2),
                    FLAG_QUEEN_CASTLE,
                ));
            }
        }

        emit_piece_moves(sink, king_sq, king_targets, enemy);
    }
}

// ---------------------------------------------------------------------------
// Public entry points

impl Game {
    /// Generate every legal move for the side to move into `sink`.
    ///
    /// Emission order is unspecified; only the set of moves is contractual.
    pub fn generate_moves<S: MoveSink>(&self, sink: &mut S) {
        match self.turn {
            Color::White => legal_moves::<true, S>(self, sink),
            Color::Black => legal_moves::<false, S>(self, sink),
        }
    }

    /// All legal moves for the side to move.
    #[must_use]
    pub fn legal_moves(&self) -> MoveList {
        let mut list = MoveList::new();
        self.generate_moves(&mut list);
        list
    }

    /// The number of legal moves, via the counting fast path.
    #[must_use]
    pub fn legal_move_count(&self) -> u64 {
        let mut counter = MoveCounter::new();
        self.generate_moves(&mut counter);
        counter.total()
    }

    /// Is the given side's king attacked?
    #[must_use]
    pub fn in_check(&self, color: Color) -> bool {
        match color {
            Color::White => {
                square_attacked::<true>(&self.board, self.board.king_square(Color::White))
            }
            Color::Black => {
                square_attacked::<false>(&self.board, self.board.king_square(Color::Black))
            }
        }
    }

    /// Is the side to move in check?
    #[must_use]
    pub fn is_check(&self) -> bool {
        self.in_check(self.turn)
    }

    /// Checkmate: in check with no legal moves.
    #[must_use]
    pub fn is_checkmate(&self) -> bool {
        self.is_check() && self.legal_move_count() == 0
    }

    /// Stalemate: not in check, but no legal moves.
    #[must_use]
    pub fn is_stalemate(&self) -> bool {
        !self.is_check() && self.legal_move_count() == 0
    }

    /// Count leaf nodes of the legal move tree to the given depth. Depth one
    /// uses the counting sink, so no moves are materialized at the frontier.
    #[must_use]
    pub fn perft(&mut self, depth: usize) -> u64 {
        if depth == 0 {
            return 1;
        }
        if depth == 1 {
            return self.legal_move_count();
        }

        let moves = self.legal_moves();
        let mut nodes = 0;
        for &mv in &moves {
            let undo = self.make(mv);
            nodes += self.perft(depth - 1);
            self.unmake(mv, undo);
        }
        nodes
    }
}
