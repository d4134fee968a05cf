//! Go board implementation for the engine framework
//!
//! This crate provides a complete reference implementation of the
//! [`engine_core::Board`] trait: Chinese-style area scoring, simple ko,
//! suicide prohibition, capture tracking and a positional-superko
//! diagnostic flag. It is the position type the search core's tests and
//! benches run against; the core itself never depends on it.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use engine_core::{Board, Color, Coord, Group, IllegalMove, Move, Point};

/// Fixed seed for the zobrist table so hashes are stable across runs.
const ZOBRIST_SEED: u64 = 0x600B_0A2D;

/// A Go position with the rule subset the search core needs.
#[derive(Debug, Clone)]
pub struct GoBoard {
    size: usize,
    stones: Vec<Color>,
    to_move: Color,
    moves: u32,
    komi: f32,
    handicap: u32,
    last: Option<Move>,
    /// Point forbidden to the next mover after a single-stone ko capture.
    ko: Option<Point>,
    /// Stones captured by Black / by White.
    captures: [u32; 2],
    zobrist: Arc<Vec<[u64; 2]>>,
    hash: u64,
    history: Vec<u64>,
    superko: bool,
}

impl GoBoard {
    pub fn new(size: usize, komi: f32) -> Self {
        assert!((2..=25).contains(&size), "unsupported board size {size}");
        let mut rng = ChaCha20Rng::seed_from_u64(ZOBRIST_SEED);
        let zobrist = (0..size * size)
            .map(|_| [rng.gen::<u64>(), rng.gen::<u64>()])
            .collect();
        Self {
            size,
            stones: vec![Color::Empty; size * size],
            to_move: Color::Black,
            moves: 0,
            komi,
            handicap: 0,
            last: None,
            ko: None,
            captures: [0, 0],
            zobrist: Arc::new(zobrist),
            hash: 0,
            history: vec![0],
            superko: false,
        }
    }

    /// Build a position from a diagram, rows listed top to bottom:
    /// `X`/`x` black stones, `O`/`o` white, `.` empty, spaces ignored.
    pub fn from_diagram(size: usize, rows: &[&str], to_move: Color, komi: f32) -> Self {
        assert_eq!(rows.len(), size, "diagram must have {size} rows");
        let mut board = Self::new(size, komi);
        for (i, row) in rows.iter().enumerate() {
            let y = size - 1 - i;
            let cells: Vec<char> = row.chars().filter(|c| !c.is_whitespace()).collect();
            assert_eq!(cells.len(), size, "diagram row {i} must have {size} cells");
            for (x, &c) in cells.iter().enumerate() {
                let p = Point((y * size + x) as u16);
                match c {
                    'X' | 'x' | '#' => board.place(p, Color::Black),
                    'O' | 'o' => board.place(p, Color::White),
                    '.' => {}
                    other => panic!("unknown diagram cell {other:?}"),
                }
            }
        }
        board.to_move = to_move;
        board.history.push(board.hash);
        board
    }

    /// Record the handicap stone count (stones are placed via diagram or
    /// regular plays).
    pub fn set_handicap(&mut self, handicap: u32) {
        self.handicap = handicap;
    }

    pub fn stone_at(&self, point: Point) -> Color {
        self.stones[point.index()]
    }

    /// Direct stone placement outside the move protocol (setup only).
    fn place(&mut self, point: Point, color: Color) {
        debug_assert_eq!(self.stones[point.index()], Color::Empty);
        self.stones[point.index()] = color;
        self.hash ^= self.zobrist_bit(point, color);
    }

    fn zobrist_bit(&self, point: Point, color: Color) -> u64 {
        let side = match color {
            Color::Black => 0,
            Color::White => 1,
            _ => unreachable!("zobrist of a non-stone"),
        };
        self.zobrist[point.index()][side]
    }

    fn xy(&self, p: Point) -> (usize, usize) {
        (p.index() % self.size, p.index() / self.size)
    }

    fn at(&self, x: usize, y: usize) -> Point {
        Point((y * self.size + x) as u16)
    }

    fn neighbors(&self, p: Point) -> Vec<Point> {
        let (x, y) = self.xy(p);
        let mut out = Vec::with_capacity(4);
        if x > 0 {
            out.push(self.at(x - 1, y));
        }
        if x + 1 < self.size {
            out.push(self.at(x + 1, y));
        }
        if y > 0 {
            out.push(self.at(x, y - 1));
        }
        if y + 1 < self.size {
            out.push(self.at(x, y + 1));
        }
        out
    }

    fn diagonals(&self, p: Point) -> Vec<Point> {
        let (x, y) = self.xy(p);
        let mut out = Vec::with_capacity(4);
        for (dx, dy) in [(-1isize, -1isize), (-1, 1), (1, -1), (1, 1)] {
            let nx = x as isize + dx;
            let ny = y as isize + dy;
            if nx >= 0 && ny >= 0 && (nx as usize) < self.size && (ny as usize) < self.size {
                out.push(self.at(nx as usize, ny as usize));
            }
        }
        out
    }

    /// Flood-fill the chain containing `p`.
    fn chain(&self, p: Point) -> Vec<Point> {
        let color = self.stones[p.index()];
        debug_assert!(color.is_stone());
        let mut seen = vec![false; self.stones.len()];
        let mut stack = vec![p];
        let mut out = Vec::new();
        seen[p.index()] = true;
        while let Some(q) = stack.pop() {
            out.push(q);
            for n in self.neighbors(q) {
                if !seen[n.index()] && self.stones[n.index()] == color {
                    seen[n.index()] = true;
                    stack.push(n);
                }
            }
        }
        out
    }

    fn chain_liberties(&self, chain: &[Point]) -> Vec<Point> {
        let mut seen = vec![false; self.stones.len()];
        let mut libs = Vec::new();
        for &q in chain {
            for n in self.neighbors(q) {
                if !seen[n.index()] && self.stones[n.index()] == Color::Empty {
                    seen[n.index()] = true;
                    libs.push(n);
                }
            }
        }
        libs
    }

    fn chain_has_liberty(&self, chain: &[Point]) -> bool {
        chain
            .iter()
            .any(|&q| self.neighbors(q).iter().any(|&n| self.stones[n.index()] == Color::Empty))
    }

    fn capture_index(color: Color) -> usize {
        match color {
            Color::Black => 0,
            Color::White => 1,
            _ => unreachable!("captures of a non-stone color"),
        }
    }
}

impl Board for GoBoard {
    fn size(&self) -> usize {
        self.size
    }

    fn to_move(&self) -> Color {
        self.to_move
    }

    fn move_count(&self) -> u32 {
        self.moves
    }

    fn komi(&self) -> f32 {
        self.komi
    }

    fn handicap(&self) -> u32 {
        self.handicap
    }

    fn last_move(&self) -> Option<Move> {
        self.last
    }

    fn legal_points(&self, color: Color) -> Vec<Point> {
        (0..self.stones.len() as u16)
            .map(Point)
            .filter(|&p| self.is_legal(p, color))
            .collect()
    }

    fn is_legal(&self, point: Point, color: Color) -> bool {
        if self.stones[point.index()] != Color::Empty {
            return false;
        }
        if self.ko == Some(point) {
            return false;
        }
        let mut suicide = true;
        for n in self.neighbors(point) {
            match self.stones[n.index()] {
                Color::Empty => return true,
                c if c == color => {
                    // Joining a chain that keeps another liberty is fine.
                    if self.chain_liberties(&self.chain(n)).len() > 1 {
                        suicide = false;
                    }
                }
                _ => {
                    // Capturing an adjacent chain frees at least this point.
                    if self.chain_liberties(&self.chain(n)).len() == 1 {
                        suicide = false;
                    }
                }
            }
        }
        !suicide
    }

    fn is_one_point_eye(&self, point: Point, color: Color) -> bool {
        if self.stones[point.index()] != Color::Empty {
            return false;
        }
        for n in self.neighbors(point) {
            if self.stones[n.index()] != color {
                return false;
            }
        }
        let diagonals = self.diagonals(point);
        let bad = diagonals
            .iter()
            .filter(|&&d| self.stones[d.index()] == color.opposite())
            .count();
        // A missing diagonal (edge or corner) counts against the eye.
        if diagonals.len() < 4 {
            bad == 0
        } else {
            bad <= 1
        }
    }

    fn play(&mut self, mv: Move) -> Result<(), IllegalMove> {
        let point = match mv.coord {
            Coord::Resign => return Err(IllegalMove::Unplayable),
            Coord::Pass => {
                self.ko = None;
                self.moves += 1;
                self.last = Some(mv);
                self.to_move = mv.color.opposite();
                return Ok(());
            }
            Coord::Point(p) => p,
        };
        if self.stones[point.index()] != Color::Empty {
            return Err(IllegalMove::Occupied(point));
        }
        if self.ko == Some(point) {
            return Err(IllegalMove::Ko(point));
        }

        let color = mv.color;
        self.stones[point.index()] = color;
        self.hash ^= self.zobrist_bit(point, color);

        // Capture neighboring opponent chains left without liberties.
        let mut captured = Vec::new();
        for n in self.neighbors(point) {
            if self.stones[n.index()] == color.opposite() {
                let chain = self.chain(n);
                if !self.chain_has_liberty(&chain) {
                    for &q in &chain {
                        self.hash ^= self.zobrist_bit(q, color.opposite());
                        self.stones[q.index()] = Color::Empty;
                    }
                    captured.extend(chain);
                }
            }
        }

        if captured.is_empty() {
            let own = self.chain(point);
            if !self.chain_has_liberty(&own) {
                self.hash ^= self.zobrist_bit(point, color);
                self.stones[point.index()] = Color::Empty;
                return Err(IllegalMove::Suicide(point));
            }
        }

        // Simple ko: a single-stone capture by a single stone in atari
        // forbids the immediate recapture.
        self.ko = if captured.len() == 1 {
            let own = self.chain(point);
            if own.len() == 1 && self.chain_liberties(&own).len() == 1 {
                Some(captured[0])
            } else {
                None
            }
        } else {
            None
        };

        self.captures[Self::capture_index(color)] += captured.len() as u32;
        if self.history.contains(&self.hash) {
            self.superko = true;
        }
        self.history.push(self.hash);
        self.moves += 1;
        self.last = Some(mv);
        self.to_move = color.opposite();
        Ok(())
    }

    fn captures(&self, color: Color) -> u32 {
        self.captures[Self::capture_index(color)]
    }

    fn point_owner(&self, point: Point) -> Color {
        match self.stones[point.index()] {
            Color::Empty => {}
            stone => return stone,
        }
        // Flood-fill the empty region and look at its border colors.
        let mut seen = vec![false; self.stones.len()];
        let mut stack = vec![point];
        seen[point.index()] = true;
        let mut touches_black = false;
        let mut touches_white = false;
        while let Some(q) = stack.pop() {
            for n in self.neighbors(q) {
                match self.stones[n.index()] {
                    Color::Empty => {
                        if !seen[n.index()] {
                            seen[n.index()] = true;
                            stack.push(n);
                        }
                    }
                    Color::Black => touches_black = true,
                    Color::White => touches_white = true,
                    Color::Off => {}
                }
            }
        }
        match (touches_black, touches_white) {
            (true, false) => Color::Black,
            (false, true) => Color::White,
            _ => Color::Empty,
        }
    }

    fn area_score(&self) -> f32 {
        let mut score = 0.0;
        for i in 0..self.stones.len() as u16 {
            match self.point_owner(Point(i)) {
                Color::Black => score += 1.0,
                Color::White => score -= 1.0,
                _ => {}
            }
        }
        score - self.komi
    }

    fn score_with_dead(&self, dead: &[Group]) -> f32 {
        let mut cleared = self.clone();
        for group in dead {
            for &p in &group.stones {
                if cleared.stones[p.index()].is_stone() {
                    cleared.stones[p.index()] = Color::Empty;
                }
            }
        }
        cleared.area_score()
    }

    fn group_at(&self, point: Point) -> Option<Group> {
        let color = self.stones[point.index()];
        if !color.is_stone() {
            return None;
        }
        Some(Group {
            color,
            stones: self.chain(point),
        })
    }

    fn groups(&self) -> Vec<Group> {
        let mut seen = vec![false; self.stones.len()];
        let mut out = Vec::new();
        for i in 0..self.stones.len() as u16 {
            let p = Point(i);
            if seen[p.index()] || !self.stones[p.index()].is_stone() {
                continue;
            }
            let chain = self.chain(p);
            for &q in &chain {
                seen[q.index()] = true;
            }
            out.push(Group {
                color: self.stones[p.index()],
                stones: chain,
            });
        }
        out
    }

    fn estimated_moves_left(&self) -> u32 {
        let empty = self
            .stones
            .iter()
            .filter(|&&c| c == Color::Empty)
            .count() as u32;
        (empty / 3).max(10)
    }

    fn superko_violation(&self) -> bool {
        self.superko
    }

    fn clear_superko_violation(&mut self) {
        self.superko = false;
    }
}
