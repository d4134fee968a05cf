//! Search tree node representation.
//!
//! Nodes live in the tree's slab arena and are referenced by [`NodeId`]
//! indices. All mutable state is atomic: during a search the tree is
//! shared read-mostly between workers, with statistics updated by
//! fetch-add and the children link doubling as a one-shot expansion
//! latch.

use std::sync::atomic::{AtomicU32, Ordering};

use engine_core::{Color, Coord, Point};

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// `first_child` sentinel: node not expanded yet.
const FC_NONE: u32 = u32::MAX;
/// `first_child` sentinel: a worker holds the expansion latch.
const FC_EXPANDING: u32 = u32::MAX - 1;

/// Atomic f32 built on compare-exchange over the bit pattern; used for
/// the win sums that back every node value.
#[derive(Debug, Default)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn fetch_add(&self, value: f32) {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }
}

/// A `(playouts, win sum)` pair under the atomic discipline: playouts is
/// bumped before the sum so a torn read can only under-estimate the
/// value, and readers clamp to `[0, 1]`.
#[derive(Debug, Default)]
pub struct MoveStats {
    playouts: AtomicU32,
    win_sum: AtomicF32,
}

impl MoveStats {
    /// Fold one playout result in.
    #[inline]
    pub fn record(&self, result: f32) {
        self.playouts.fetch_add(1, Ordering::Relaxed);
        self.win_sum.fetch_add(result);
    }

    /// Fold a batch of equivalent experience in (priors, merges, book).
    pub fn add_games(&self, games: u32, win_sum: f32) {
        if games == 0 && win_sum == 0.0 {
            return;
        }
        self.playouts.fetch_add(games, Ordering::Relaxed);
        self.win_sum.fetch_add(win_sum);
    }

    #[inline]
    pub fn playouts(&self) -> u32 {
        self.playouts.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn win_sum(&self) -> f32 {
        self.win_sum.load()
    }

    /// Mean value in `[0, 1]`, or 0 for an unvisited pair.
    #[inline]
    pub fn value(&self) -> f32 {
        let n = self.playouts();
        if n == 0 {
            return 0.0;
        }
        (self.win_sum() / n as f32).clamp(0.0, 1.0)
    }

    /// Divide the accumulated experience by `k` (post-merge averaging).
    /// Only sound while the tree is exclusively owned.
    pub fn scale_down(&self, k: u32) {
        self.playouts
            .store(self.playouts() / k, Ordering::Relaxed);
        self.win_sum.store(self.win_sum() / k as f32);
    }

    pub fn copy_from(&self, src: &MoveStats) {
        self.playouts.store(src.playouts(), Ordering::Relaxed);
        self.win_sum.store(src.win_sum());
    }
}

const COORD_NONE: u32 = 0xFFFF;
const COORD_PASS: u32 = 0xFFFE;
const COORD_RESIGN: u32 = 0xFFFD;

fn pack_move(coord: Coord, color: Color) -> u32 {
    let code = match coord {
        Coord::Pass => COORD_PASS,
        Coord::Resign => COORD_RESIGN,
        Coord::Point(p) => p.0 as u32,
    };
    let color_bits = match color {
        Color::Black => 0u32,
        Color::White => 1,
        Color::Empty => 2,
        Color::Off => 3,
    };
    code | (color_bits << 16)
}

/// A node in the search tree.
#[derive(Debug)]
pub struct TreeNode {
    /// Packed move that leads here: coordinate in the low half, mover
    /// color above it. Written once before the node is published.
    mv: AtomicU32,
    parent: AtomicU32,
    /// Arena index of the first child, or one of the `FC_*` sentinels.
    /// Children of a node occupy one contiguous block.
    first_child: AtomicU32,
    child_count: AtomicU32,
    /// Direct playout statistics.
    pub u: MoveStats,
    /// Equivalent experience installed by the prior module at expansion.
    pub prior: MoveStats,
    /// All-moves-as-first statistics accumulated from sibling playouts.
    pub amaf: MoveStats,
    virtual_losses: AtomicU32,
}

impl Default for TreeNode {
    fn default() -> Self {
        Self {
            mv: AtomicU32::new(COORD_NONE),
            parent: AtomicU32::new(u32::MAX),
            first_child: AtomicU32::new(FC_NONE),
            child_count: AtomicU32::new(0),
            u: MoveStats::default(),
            prior: MoveStats::default(),
            amaf: MoveStats::default(),
            virtual_losses: AtomicU32::new(0),
        }
    }
}

impl TreeNode {
    pub fn set_move(&self, coord: Coord, color: Color) {
        self.mv.store(pack_move(coord, color), Ordering::Relaxed);
    }

    pub fn coord(&self) -> Coord {
        let word = self.mv.load(Ordering::Relaxed) & 0xFFFF;
        match word {
            COORD_PASS | COORD_NONE => Coord::Pass,
            COORD_RESIGN => Coord::Resign,
            p => Coord::Point(Point(p as u16)),
        }
    }

    pub fn color(&self) -> Color {
        match (self.mv.load(Ordering::Relaxed) >> 16) & 0x3 {
            0 => Color::Black,
            1 => Color::White,
            2 => Color::Empty,
            _ => Color::Off,
        }
    }

    pub fn parent_id(&self) -> NodeId {
        NodeId(self.parent.load(Ordering::Relaxed))
    }

    pub fn set_parent(&self, parent: NodeId) {
        self.parent.store(parent.0, Ordering::Relaxed);
    }

    /// The `(first, count)` child block, if this node is expanded.
    #[inline]
    pub fn children(&self) -> Option<(u32, u32)> {
        let first = self.first_child.load(Ordering::Acquire);
        if first >= FC_EXPANDING {
            return None;
        }
        Some((first, self.child_count.load(Ordering::Relaxed)))
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.children().is_some()
    }

    /// Take the expansion latch. Exactly one caller wins; losers fall
    /// through and play out from this node as-is.
    pub fn try_begin_expansion(&self) -> bool {
        self.first_child
            .compare_exchange(FC_NONE, FC_EXPANDING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Publish an initialized child block; pairs with `children()`'s
    /// acquire load.
    pub fn publish_children(&self, first: u32, count: u32) {
        self.child_count.store(count, Ordering::Relaxed);
        self.first_child.store(first, Ordering::Release);
    }

    /// Give the latch back after a failed allocation.
    pub fn cancel_expansion(&self) {
        self.first_child.store(FC_NONE, Ordering::Release);
    }

    #[inline]
    pub fn add_virtual_loss(&self) {
        self.virtual_losses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn remove_virtual_loss(&self) {
        self.virtual_losses.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn virtual_losses(&self) -> u32 {
        self.virtual_losses.load(Ordering::Relaxed)
    }

    /// Direct plus prior experience: `(playouts, win sum)`.
    #[inline]
    pub fn experience(&self) -> (u32, f32) {
        (
            self.u.playouts() + self.prior.playouts(),
            self.u.win_sum() + self.prior.win_sum(),
        )
    }

    /// Mean value over direct and prior experience, from this node's
    /// mover's perspective.
    pub fn value(&self) -> f32 {
        let (n, sum) = self.experience();
        if n == 0 {
            return 0.0;
        }
        (sum / n as f32).clamp(0.0, 1.0)
    }

    /// Copy move, statistics and virtual-loss state from `src`; children
    /// and parent links are the copying tree's business.
    pub fn copy_from(&self, src: &TreeNode) {
        self.mv.store(src.mv.load(Ordering::Relaxed), Ordering::Relaxed);
        self.u.copy_from(&src.u);
        self.prior.copy_from(&src.prior);
        self.amaf.copy_from(&src.amaf);
        self.virtual_losses
            .store(src.virtual_losses(), Ordering::Relaxed);
    }
}
