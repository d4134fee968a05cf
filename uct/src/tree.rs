//! Search tree with slab-arena node storage.
//!
//! Nodes live in fixed-size chunks behind an atomic bump pointer, so the
//! tree can be shared read-mostly between worker threads without locks:
//! statistics are atomic, and a node's child block is allocated
//! contiguously by whichever worker wins the expansion latch. Chunks are
//! materialized lazily as allocation reaches them, or all up front in
//! `fast_alloc` mode. When the arena runs out the tree goes `full`:
//! expansion stops silently while existing nodes keep accumulating
//! statistics.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::OnceLock;

use engine_core::{Board, Color, Coord, PlayoutPolicy, Prior, PriorMap};
use tracing::trace;

use crate::node::{AtomicF32, NodeId, TreeNode};

const CHUNK_LEN: u32 = 1024;

/// Bytes one arena slot costs; drives the `max_tree_size` capacity.
pub const NODE_SIZE: u64 = std::mem::size_of::<TreeNode>() as u64;

fn encode_color(color: Color) -> u32 {
    match color {
        Color::Black => 0,
        Color::White => 1,
        Color::Empty => 2,
        Color::Off => 3,
    }
}

fn decode_color(bits: u32) -> Color {
    match bits {
        0 => Color::Black,
        1 => Color::White,
        2 => Color::Empty,
        _ => Color::Off,
    }
}

fn new_chunk() -> Box<[TreeNode]> {
    (0..CHUNK_LEN)
        .map(|_| TreeNode::default())
        .collect::<Vec<_>>()
        .into_boxed_slice()
}

/// The search tree: root handle, global metadata and the node arena.
#[derive(Debug)]
pub struct Tree {
    chunks: Box<[OnceLock<Box<[TreeNode]>>]>,
    capacity: u32,
    used: AtomicU32,
    root: AtomicU32,
    /// Side to move at the root.
    root_color: AtomicU32,
    /// Self-imposed komi offset (dynkomi).
    extra_komi: AtomicF32,
    full: AtomicBool,
    fast_alloc: bool,
}

impl Tree {
    /// Create a tree holding only a root node. The root's `coord` is a
    /// pass and its color the opposite of `root_color`, so the root's
    /// children are `root_color` moves.
    pub fn init(root_color: Color, max_tree_size: u64, fast_alloc: bool) -> Tree {
        let tree = Self::bare(Self::capacity_for(max_tree_size), fast_alloc);
        tree.root_color
            .store(encode_color(root_color), Ordering::Relaxed);
        tree.root_node()
            .set_move(Coord::Pass, root_color.opposite());
        tree
    }

    fn capacity_for(max_tree_size: u64) -> u32 {
        (max_tree_size / NODE_SIZE).clamp(64, 0xFFFF_0000) as u32
    }

    fn bare(capacity: u32, fast_alloc: bool) -> Tree {
        let chunk_slots = (capacity as usize).div_ceil(CHUNK_LEN as usize);
        let chunks: Box<[OnceLock<Box<[TreeNode]>>]> =
            (0..chunk_slots).map(|_| OnceLock::new()).collect();
        if fast_alloc {
            // The whole arena is materialized at construction.
            for slot in chunks.iter() {
                let _ = slot.get_or_init(new_chunk);
            }
        } else {
            let _ = chunks[0].get_or_init(new_chunk);
        }
        Tree {
            chunks,
            capacity,
            used: AtomicU32::new(1),
            root: AtomicU32::new(0),
            root_color: AtomicU32::new(encode_color(Color::Black)),
            extra_komi: AtomicF32::new(0.0),
            full: AtomicBool::new(false),
            fast_alloc,
        }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        let chunk = self.chunks[(id.0 / CHUNK_LEN) as usize]
            .get()
            .expect("tree node in unallocated chunk");
        &chunk[(id.0 % CHUNK_LEN) as usize]
    }

    #[inline]
    pub fn root_id(&self) -> NodeId {
        NodeId(self.root.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn root_node(&self) -> &TreeNode {
        self.node(self.root_id())
    }

    pub fn root_color(&self) -> Color {
        decode_color(self.root_color.load(Ordering::Relaxed))
    }

    pub fn extra_komi(&self) -> f32 {
        self.extra_komi.load()
    }

    pub fn set_extra_komi(&self, komi: f32) {
        self.extra_komi.store(komi);
    }

    /// Number of allocated nodes.
    pub fn nodes_used(&self) -> u32 {
        self.used.load(Ordering::Relaxed).min(self.capacity)
    }

    /// Approximate memory footprint of the allocated nodes.
    pub fn nodes_size(&self) -> u64 {
        self.nodes_used() as u64 * NODE_SIZE
    }

    pub fn is_full(&self) -> bool {
        self.full.load(Ordering::Relaxed)
    }

    pub fn fast_alloc(&self) -> bool {
        self.fast_alloc
    }

    /// Reserve a contiguous block of `n` fresh nodes.
    fn alloc_block(&self, n: u32) -> Option<u32> {
        if n == 0 || self.full.load(Ordering::Relaxed) {
            return None;
        }
        let start = self.used.fetch_add(n, Ordering::Relaxed);
        if start as u64 + n as u64 > self.capacity as u64 {
            self.full.store(true, Ordering::Relaxed);
            return None;
        }
        let first_chunk = start / CHUNK_LEN;
        let last_chunk = (start + n - 1) / CHUNK_LEN;
        for chunk in first_chunk..=last_chunk {
            let _ = self.chunks[chunk as usize].get_or_init(new_chunk);
        }
        Some(start)
    }

    /// Child ids of `id` as an index range; empty when unexpanded.
    pub fn children_range(&self, id: NodeId) -> std::ops::Range<u32> {
        match self.node(id).children() {
            Some((first, count)) => first..first + count,
            None => 0..0,
        }
    }

    pub fn find_child(&self, parent: NodeId, coord: Coord) -> Option<NodeId> {
        self.children_range(parent)
            .map(NodeId)
            .find(|&c| self.node(c).coord() == coord)
    }

    /// Populate `id`'s children from the legal non-self-eye moves of
    /// `board` (plus a pass child) and install priors.
    ///
    /// Atomic w.r.t. concurrent descenders: the expansion latch admits
    /// one worker; everyone else simply keeps treating the node as a
    /// leaf. Returns false when the latch was lost or the arena is out
    /// of nodes.
    pub fn expand<B: Board>(
        &self,
        id: NodeId,
        board: &B,
        to_move: Color,
        prior: &dyn Prior<B>,
        playout: &dyn PlayoutPolicy<B>,
    ) -> bool {
        let node = self.node(id);
        if !node.try_begin_expansion() {
            return false;
        }

        let mut coords = vec![Coord::Pass];
        coords.extend(
            board
                .legal_points(to_move)
                .into_iter()
                .filter(|&p| !board.is_one_point_eye(p, to_move))
                .map(Coord::Point),
        );
        let mut map = PriorMap::new(coords);
        prior.assign(board, to_move, &mut map);
        playout.assess(board, to_move, &mut map);

        let count = map.len() as u32;
        let Some(first) = self.alloc_block(count) else {
            node.cancel_expansion();
            trace!(node = id.0, "tree full, expansion dropped");
            return false;
        };

        for (i, &coord) in map.coords().iter().enumerate() {
            let child = self.node(NodeId(first + i as u32));
            child.set_move(coord, to_move);
            child.set_parent(id);
            let (games, win_sum) = map.get(i);
            child.prior.add_games(games, win_sum);
        }
        node.publish_children(first, count);
        true
    }

    /// Make the child matching `coord` the new root, in place. The rest
    /// of the arena is simply unreferenced. Fails when no child matches.
    pub fn promote(&self, coord: Coord) -> bool {
        let Some(child) = self.find_child(self.root_id(), coord) else {
            return false;
        };
        let node = self.node(child);
        node.set_parent(NodeId::NONE);
        let mover = node.color();
        self.root.store(child.0, Ordering::Relaxed);
        self.root_color
            .store(encode_color(mover.opposite()), Ordering::Relaxed);
        true
    }

    /// Compact the subtree under the child matching `coord` into a fresh
    /// arena, preserving its statistics and discarding everything else.
    pub fn promoted(&self, coord: Coord) -> Option<Tree> {
        let child = self.find_child(self.root_id(), coord)?;
        let node = self.node(child);
        let dst = Self::bare(self.capacity, self.fast_alloc);
        dst.root_color.store(
            encode_color(node.color().opposite()),
            Ordering::Relaxed,
        );
        dst.set_extra_komi(self.extra_komi());
        dst.root_node().copy_from(node);
        self.copy_subtree(child, &dst, dst.root_id());
        Some(dst)
    }

    /// Full copy; used by root parallelization, one private tree per
    /// worker.
    pub fn copy(&self) -> Tree {
        let dst = Self::bare(self.capacity, self.fast_alloc);
        dst.root_color
            .store(self.root_color.load(Ordering::Relaxed), Ordering::Relaxed);
        dst.set_extra_komi(self.extra_komi());
        dst.root_node().copy_from(self.root_node());
        self.copy_subtree(self.root_id(), &dst, dst.root_id());
        dst
    }

    /// Copy the child blocks below `src_from` into `dst` below
    /// `dst_from` (the nodes themselves are assumed already copied).
    fn copy_subtree(&self, src_from: NodeId, dst: &Tree, dst_from: NodeId) {
        let mut stack = vec![(src_from, dst_from)];
        while let Some((s, d)) = stack.pop() {
            let Some((first, count)) = self.node(s).children() else {
                continue;
            };
            let Some(dst_first) = dst.alloc_block(count) else {
                continue;
            };
            for i in 0..count {
                let src_child = NodeId(first + i);
                let dst_child = NodeId(dst_first + i);
                dst.node(dst_child).copy_from(self.node(src_child));
                dst.node(dst_child).set_parent(d);
                stack.push((src_child, dst_child));
            }
            dst.node(d).publish_children(dst_first, count);
        }
    }

    /// Add `src`'s per-coordinate direct and AMAF statistics into this
    /// tree; children only `src` explored are copied over wholesale.
    /// Root-parallel merge, run strictly after all workers have joined.
    pub fn merge(&self, src: &Tree) {
        let mut stack = vec![(self.root_id(), src.root_id())];
        while let Some((d, s)) = stack.pop() {
            let dn = self.node(d);
            let sn = src.node(s);
            dn.u.add_games(sn.u.playouts(), sn.u.win_sum());
            dn.amaf.add_games(sn.amaf.playouts(), sn.amaf.win_sum());

            match (dn.children(), sn.children()) {
                (None, Some(_)) => src.copy_subtree(s, self, d),
                (Some(_), Some((s_first, s_count))) => {
                    for i in 0..s_count {
                        let src_child = NodeId(s_first + i);
                        let coord = src.node(src_child).coord();
                        if let Some(dst_child) = self.find_child(d, coord) {
                            stack.push((dst_child, src_child));
                        } else {
                            trace!(coord = ?coord, "merge: no matching child, dropped");
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Divide every node's direct and AMAF experience by `k`
    /// (post-merge averaging). Requires exclusive ownership.
    pub fn normalize(&self, k: u32) {
        if k <= 1 {
            return;
        }
        for i in 0..self.nodes_used() {
            let node = self.node(NodeId(i));
            node.u.scale_down(k);
            node.amaf.scale_down(k);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{EvenPrior, LightPlayout, Point};
    use games_go::GoBoard;

    fn small_tree() -> Tree {
        Tree::init(Color::Black, 1024 * 1024, false)
    }

    fn expand_root(tree: &Tree, board: &GoBoard) {
        assert!(tree.expand(
            tree.root_id(),
            board,
            tree.root_color(),
            &EvenPrior::new(2),
            &LightPlayout::new(),
        ));
    }

    #[test]
    fn test_init() {
        let tree = small_tree();
        assert_eq!(tree.root_color(), Color::Black);
        assert_eq!(tree.root_node().coord(), Coord::Pass);
        assert_eq!(tree.root_node().color(), Color::White);
        assert_eq!(tree.nodes_used(), 1);
        assert!(!tree.is_full());
    }

    #[test]
    fn test_expand_installs_children_and_priors() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        expand_root(&tree, &board);

        // Pass plus all 25 points of the empty board.
        let range = tree.children_range(tree.root_id());
        assert_eq!(range.len(), 26);

        let pass = tree.find_child(tree.root_id(), Coord::Pass).unwrap();
        assert_eq!(tree.node(pass).color(), Color::Black);
        assert_eq!(tree.node(pass).prior.playouts(), 2);
        assert!((tree.node(pass).value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_expansion_latch_loser_falls_through() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        // Simulate a concurrent expander holding the latch.
        assert!(tree.root_node().try_begin_expansion());
        assert!(!tree.expand(
            tree.root_id(),
            &board,
            Color::Black,
            &EvenPrior::new(2),
            &LightPlayout::new(),
        ));
        assert!(!tree.root_node().is_expanded());
    }

    #[test]
    fn test_arena_exhaustion_is_silent() {
        let board = GoBoard::new(9, 0.0);
        // Room for the root and very little else.
        let tree = Tree::init(Color::Black, 64 * NODE_SIZE, false);
        let expanded = tree.expand(
            tree.root_id(),
            &board,
            Color::Black,
            &EvenPrior::new(2),
            &LightPlayout::new(),
        );
        // 82 children do not fit in a 64-node arena.
        assert!(!expanded);
        assert!(tree.is_full());
        // The node survives unexpanded and keeps taking statistics.
        tree.root_node().u.record(1.0);
        assert_eq!(tree.root_node().u.playouts(), 1);
    }

    #[test]
    fn test_promote_in_place_preserves_stats() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        expand_root(&tree, &board);

        let coord = Coord::Point(Point(12));
        let child = tree.find_child(tree.root_id(), coord).unwrap();
        tree.node(child).u.add_games(7, 4.0);

        assert!(tree.promote(coord));
        assert_eq!(tree.root_id(), child);
        assert_eq!(tree.root_node().coord(), coord);
        assert_eq!(tree.root_node().u.playouts(), 7);
        assert_eq!(tree.root_color(), Color::White);
        assert!(tree.root_node().parent_id().is_none());
    }

    #[test]
    fn test_promote_unknown_coord_fails() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        expand_root(&tree, &board);
        // Children are Black moves; an impossible coordinate fails.
        assert!(!tree.promote(Coord::Resign));
    }

    #[test]
    fn test_promoted_compacts_subtree() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        expand_root(&tree, &board);
        let used_before = tree.nodes_used();

        let coord = Coord::Point(Point(6));
        let child = tree.find_child(tree.root_id(), coord).unwrap();
        tree.node(child).u.add_games(11, 6.0);

        let fresh = tree.promoted(coord).expect("child exists");
        assert_eq!(fresh.root_node().coord(), coord);
        assert_eq!(fresh.root_node().u.playouts(), 11);
        assert_eq!(fresh.root_color(), Color::White);
        // The siblings are gone: only the promoted node survives.
        assert_eq!(fresh.nodes_used(), 1);
        assert!(fresh.nodes_used() < used_before);
    }

    #[test]
    fn test_copy_is_deep() {
        let board = GoBoard::new(5, 0.0);
        let tree = small_tree();
        expand_root(&tree, &board);
        let coord = Coord::Point(Point(3));
        let child = tree.find_child(tree.root_id(), coord).unwrap();
        tree.node(child).u.add_games(5, 2.5);

        let copy = tree.copy();
        assert_eq!(copy.nodes_used(), tree.nodes_used());
        let copied = copy.find_child(copy.root_id(), coord).unwrap();
        assert_eq!(copy.node(copied).u.playouts(), 5);

        // Mutating the copy leaves the original untouched.
        copy.node(copied).u.record(1.0);
        assert_eq!(tree.node(child).u.playouts(), 5);
    }

    #[test]
    fn test_merge_normalize_averages_playouts() {
        let board = GoBoard::new(5, 0.0);
        let master = small_tree();
        expand_root(&master, &board);

        let coord = Coord::Point(Point(7));
        let a = master.copy();
        let b = master.copy();
        let ca = a.find_child(a.root_id(), coord).unwrap();
        let cb = b.find_child(b.root_id(), coord).unwrap();
        a.node(ca).u.add_games(10, 6.0);
        a.root_node().u.add_games(10, 4.0);
        b.node(cb).u.add_games(30, 12.0);
        b.root_node().u.add_games(30, 18.0);

        master.merge(&a);
        master.merge(&b);
        master.normalize(2);

        // Playouts equal the average of the two sources.
        assert_eq!(master.root_node().u.playouts(), 20);
        let child = master.find_child(master.root_id(), coord).unwrap();
        assert_eq!(master.node(child).u.playouts(), 20);
        // Win sums average too, so values stay consistent.
        assert!((master.node(child).u.win_sum() - 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_merge_carries_amaf_like_direct_stats() {
        let board = GoBoard::new(5, 0.0);
        let master = small_tree();
        expand_root(&master, &board);

        let coord = Coord::Point(Point(9));
        let a = master.copy();
        let b = master.copy();
        let ca = a.find_child(a.root_id(), coord).unwrap();
        a.node(ca).u.add_games(8, 4.0);
        a.node(ca).amaf.add_games(8, 4.0);

        // Worker b never touched this child at all.
        master.merge(&a);
        master.merge(&b);
        master.normalize(2);

        let child = master.find_child(master.root_id(), coord).unwrap();
        // A child explored by a single worker keeps the same relative
        // weight in both estimates after averaging.
        assert_eq!(master.node(child).u.playouts(), 4);
        assert_eq!(master.node(child).amaf.playouts(), 4);
        assert!(
            (master.node(child).u.value() - master.node(child).amaf.value()).abs() < 1e-6
        );
    }

    #[test]
    fn test_merge_copies_unexplored_subtrees() {
        let board = GoBoard::new(5, 0.0);
        let master = small_tree();
        // Master never expanded; the worker did.
        let worker = master.copy();
        expand_root(&worker, &board);
        let coord = Coord::Point(Point(4));
        let wc = worker.find_child(worker.root_id(), coord).unwrap();
        worker.node(wc).u.add_games(3, 2.0);

        master.merge(&worker);
        let mc = master.find_child(master.root_id(), coord).unwrap();
        assert_eq!(master.node(mc).u.playouts(), 3);
    }
}
