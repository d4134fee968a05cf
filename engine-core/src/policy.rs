//! External collaborator traits: the playout policy run from tree leaves
//! and the prior module consulted at node expansion.
//!
//! Implementations could be:
//! - `LightPlayout`: uniformly random legal moves (the reference policy)
//! - a pattern-driven policy with its own gamma tables
//! - `EvenPrior`: seeds every candidate with even prior experience

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use crate::board::Board;
use crate::types::{Color, Coord};

/// Per-candidate prior experience collected during node expansion.
///
/// Entry `i` corresponds to candidate `i` of the expansion; priors are
/// expressed as equivalent playouts plus the win sum those playouts would
/// have produced.
#[derive(Debug, Clone)]
pub struct PriorMap {
    coords: Vec<Coord>,
    playouts: Vec<u32>,
    win_sums: Vec<f32>,
}

impl PriorMap {
    pub fn new(coords: Vec<Coord>) -> Self {
        let n = coords.len();
        Self {
            coords,
            playouts: vec![0; n],
            win_sums: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn coords(&self) -> &[Coord] {
        &self.coords
    }

    /// Add `games` equivalent playouts at the given mean value to
    /// candidate `i`.
    pub fn add(&mut self, i: usize, games: u32, value: f32) {
        self.playouts[i] += games;
        self.win_sums[i] += games as f32 * value;
    }

    /// Accumulated `(playouts, win_sum)` for candidate `i`.
    pub fn get(&self, i: usize) -> (u32, f32) {
        (self.playouts[i], self.win_sums[i])
    }
}

/// Random game policy invoked from tree leaves until the game terminates.
pub trait PlayoutPolicy<B: Board>: Send + Sync {
    /// Pick the next playout move for `color`, or `Coord::Pass` when the
    /// policy sees nothing worth playing.
    fn choose(&self, board: &B, color: Color, rng: &mut ChaCha20Rng) -> Coord;

    /// Optional position assessment folded into expansion priors.
    fn assess(&self, _board: &B, _color: Color, _map: &mut PriorMap) {}
}

/// Prior module consulted once per node expansion.
pub trait Prior<B: Board>: Send + Sync {
    fn assign(&self, board: &B, color: Color, map: &mut PriorMap);
}

/// The reference playout policy: a uniformly random legal move that does
/// not fill the mover's own eye.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightPlayout;

impl LightPlayout {
    pub fn new() -> Self {
        Self
    }
}

impl<B: Board> PlayoutPolicy<B> for LightPlayout {
    fn choose(&self, board: &B, color: Color, rng: &mut ChaCha20Rng) -> Coord {
        let mut candidates = board.legal_points(color);
        candidates.retain(|&p| !board.is_one_point_eye(p, color));
        if candidates.is_empty() {
            return Coord::Pass;
        }
        Coord::Point(candidates[rng.gen_range(0..candidates.len())])
    }
}

/// Seeds every expansion candidate with `eqex` playouts at an even 0.5
/// value, so fresh children start from a common baseline instead of a
/// zero-visit cliff.
#[derive(Debug, Clone, Copy)]
pub struct EvenPrior {
    pub eqex: u32,
}

impl EvenPrior {
    pub fn new(eqex: u32) -> Self {
        Self { eqex }
    }
}

impl Default for EvenPrior {
    fn default() -> Self {
        Self { eqex: 2 }
    }
}

impl<B: Board> Prior<B> for EvenPrior {
    fn assign(&self, _board: &B, _color: Color, map: &mut PriorMap) {
        for i in 0..map.len() {
            map.add(i, self.eqex, 0.5);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Point;

    #[test]
    fn test_prior_map_accumulates() {
        let mut map = PriorMap::new(vec![Coord::Pass, Coord::Point(Point(3))]);
        map.add(1, 4, 0.5);
        map.add(1, 2, 1.0);

        assert_eq!(map.get(0), (0, 0.0));
        let (games, sum) = map.get(1);
        assert_eq!(games, 6);
        assert!((sum - 4.0).abs() < 1e-6);
    }
}
