//! The opaque board interface the search core is built against.
//!
//! The engine never looks inside a position: it enumerates legal points,
//! plays moves on cheap copies, asks eye/ownership questions and scores
//! terminal positions. Anything beyond this trait (rule-set arbitration,
//! superko flavors, handicap placement) is the board implementation's
//! business.

use thiserror::Error;

use crate::types::{Color, Coord, Move, Point};

/// Errors a board may report for an unplayable move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalMove {
    #[error("point {0:?} is occupied")]
    Occupied(Point),
    #[error("move at {0:?} would be suicide")]
    Suicide(Point),
    #[error("point {0:?} is a ko recapture")]
    Ko(Point),
    #[error("coordinate cannot be played on a board")]
    Unplayable,
}

/// A maximal chain of same-colored stones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub color: Color,
    pub stones: Vec<Point>,
}

/// Opaque game position.
///
/// Boards are copied cheaply: once per playout for the scratch board, and
/// once per pondering search. All mutation goes through [`Board::play`].
pub trait Board: Clone + Send + Sync + 'static {
    /// Side length of the board.
    fn size(&self) -> usize;

    /// Number of on-board points (`size * size`).
    fn num_points(&self) -> usize {
        self.size() * self.size()
    }

    /// Side to move.
    fn to_move(&self) -> Color;

    /// Number of moves played so far (passes included).
    fn move_count(&self) -> u32;

    fn komi(&self) -> f32;

    /// Handicap stone count, 0 in an even game.
    fn handicap(&self) -> u32;

    fn last_move(&self) -> Option<Move>;

    fn last_move_was_pass(&self) -> bool {
        matches!(
            self.last_move(),
            Some(Move {
                coord: Coord::Pass,
                ..
            })
        )
    }

    /// All points where `color` may legally play right now.
    fn legal_points(&self, color: Color) -> Vec<Point>;

    fn is_legal(&self, point: Point, color: Color) -> bool;

    /// True single-point eye of `color` (orthogonals all own, diagonals
    /// do not falsify). Filling such a point is never useful, so the
    /// search excludes these from expansion and playouts.
    fn is_one_point_eye(&self, point: Point, color: Color) -> bool;

    fn play(&mut self, mv: Move) -> Result<(), IllegalMove>;

    /// Stones captured *by* `color` so far. Feeds the mercy rule.
    fn captures(&self, color: Color) -> u32;

    /// Terminal-position owner of a point under area counting: the stone
    /// color, the color enclosing an empty region, or `Empty` for dame.
    fn point_owner(&self, point: Point) -> Color;

    /// Area score, Black minus White, komi already subtracted.
    fn area_score(&self) -> f32;

    /// Area score after removing the given dead groups from the board.
    fn score_with_dead(&self, dead: &[Group]) -> f32;

    fn group_at(&self, point: Point) -> Option<Group>;

    fn groups(&self) -> Vec<Group>;

    /// Rough number of moves this game still has in it; used by the time
    /// allocator to spread the remaining clock.
    fn estimated_moves_left(&self) -> u32;

    /// Diagnostic flag raised when the front-end fed us a position that
    /// repeats an earlier one. Never fatal.
    fn superko_violation(&self) -> bool;

    fn clear_superko_violation(&mut self);
}
