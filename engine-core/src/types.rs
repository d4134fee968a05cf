//! Basic Go vocabulary shared by every crate in the workspace.

use std::fmt;

/// Stone colors plus the two non-stone states a point can be in.
///
/// `Empty` doubles as the "dame" owner in ownership judgement; `Off`
/// exists for board implementations with sentinel borders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
    Empty,
    Off,
}

impl Color {
    /// The opposing stone color. Only meaningful for `Black` and `White`.
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            other => other,
        }
    }

    /// Whether this is an actual stone color.
    #[inline]
    pub fn is_stone(self) -> bool {
        matches!(self, Color::Black | Color::White)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Color::Black => "black",
            Color::White => "white",
            Color::Empty => "empty",
            Color::Off => "off",
        };
        f.write_str(s)
    }
}

/// Index of an on-board intersection, row-major from the lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Point(pub u16);

impl Point {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A board point or one of the two sentinel moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coord {
    Pass,
    Resign,
    Point(Point),
}

impl Coord {
    #[inline]
    pub fn is_pass(self) -> bool {
        matches!(self, Coord::Pass)
    }

    #[inline]
    pub fn is_resign(self) -> bool {
        matches!(self, Coord::Resign)
    }

    #[inline]
    pub fn point(self) -> Option<Point> {
        match self {
            Coord::Point(p) => Some(p),
            _ => None,
        }
    }

    /// GTP-style rendering ("E5", "pass", "resign") for a board of the
    /// given side length. The letter `I` is skipped per convention.
    pub fn gtp(self, size: usize) -> String {
        match self {
            Coord::Pass => "pass".to_string(),
            Coord::Resign => "resign".to_string(),
            Coord::Point(p) => {
                let col = p.index() % size;
                let row = p.index() / size;
                let letter = b"ABCDEFGHJKLMNOPQRSTUVWXYZ"[col] as char;
                format!("{}{}", letter, row + 1)
            }
        }
    }
}

/// A move: who played where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub coord: Coord,
    pub color: Color,
}

impl Move {
    pub fn new(coord: Coord, color: Color) -> Self {
        Self { coord, color }
    }
}
