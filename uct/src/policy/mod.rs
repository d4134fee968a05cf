//! Tree selection policies.
//!
//! Both variants answer the same four questions: which child to descend
//! into, which child is the final move (`choose`, most-played), what a
//! node is worth (`evaluate`), and which child currently looks best by
//! value (`winner`, the "stop only if best == winner" gate).

mod ucb1;
mod ucb1amaf;

pub use ucb1::Ucb1;
pub use ucb1amaf::Ucb1Amaf;

use engine_config::{PolicyConfig, PolicyKind};

use crate::node::{NodeId, TreeNode};
use crate::tree::Tree;

/// Per-descent options the walker passes down.
#[derive(Debug, Clone, Copy)]
pub struct DescendOptions {
    /// Count virtual losses into the effective statistics.
    pub virtual_loss: bool,
    /// Root exploration bias mode (0 = off).
    pub root_heuristic: u8,
}

/// Effective `(playouts, win sum)` of a child: direct plus prior
/// experience, with virtual losses counted as playouts that won nothing.
fn effective(node: &TreeNode, virtual_loss: bool) -> (f32, f32) {
    let (n, sum) = node.experience();
    let mut n = n as f32;
    if virtual_loss {
        n += node.virtual_losses() as f32;
    }
    (n, sum)
}

/// Urgency of a child without any experience. At the root this may be
/// biased by the parent's current value instead of the policy constant.
fn first_play_urgency(policy_fpu: f32, at_root: bool, mode: u8, parent_value: f32) -> f32 {
    if !at_root || mode == 0 {
        return policy_fpu;
    }
    let d = parent_value - 0.5;
    match mode {
        1 => parent_value,
        2 => 0.5 + d / 2.0,
        _ => 0.5 + d.signum() * d * d,
    }
}

/// Small enum dispatch over the supported selection policies.
#[derive(Debug, Clone)]
pub enum TreePolicy {
    Ucb1(Ucb1),
    Ucb1Amaf(Ucb1Amaf),
}

impl TreePolicy {
    pub fn from_config(cfg: &PolicyConfig) -> TreePolicy {
        match cfg.kind {
            PolicyKind::Ucb1 => TreePolicy::Ucb1(Ucb1 {
                explore_p: cfg.explore_p,
                fpu: cfg.first_play_urgency,
            }),
            PolicyKind::Ucb1Amaf => TreePolicy::Ucb1Amaf(Ucb1Amaf {
                explore_p: cfg.explore_p,
                rave_equiv: cfg.rave_equiv,
                fpu: cfg.first_play_urgency,
            }),
        }
    }

    /// Whether backup should maintain AMAF statistics for this policy.
    pub fn uses_amaf(&self) -> bool {
        matches!(self, TreePolicy::Ucb1Amaf(_))
    }

    /// Pick the child to descend into, or `None` on a childless node.
    pub fn descend(&self, tree: &Tree, parent: NodeId, opts: DescendOptions) -> Option<NodeId> {
        let at_root = parent == tree.root_id();
        match self {
            TreePolicy::Ucb1(p) => p.descend(tree, parent, at_root, opts),
            TreePolicy::Ucb1Amaf(p) => p.descend(tree, parent, at_root, opts),
        }
    }

    /// Value estimate of a node from its mover's perspective.
    pub fn evaluate(&self, tree: &Tree, node: NodeId) -> f32 {
        match self {
            TreePolicy::Ucb1(p) => p.evaluate(tree, node),
            TreePolicy::Ucb1Amaf(p) => p.evaluate(tree, node),
        }
    }

    /// The move to actually play: the most-explored child, value as the
    /// tie-break.
    pub fn choose(&self, tree: &Tree, parent: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, u32, f32)> = None;
        for id in tree.children_range(parent).map(NodeId) {
            let node = tree.node(id);
            let playouts = node.u.playouts();
            let value = node.u.value();
            let better = match best {
                None => true,
                Some((_, bp, bv)) => playouts > bp || (playouts == bp && value > bv),
            };
            if better {
                best = Some((id, playouts, value));
            }
        }
        best.map(|(id, _, _)| id)
    }

    /// The child with the best value estimate among those explored at
    /// all.
    pub fn winner(&self, tree: &Tree, parent: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, f32)> = None;
        for id in tree.children_range(parent).map(NodeId) {
            if tree.node(id).u.playouts() == 0 {
                continue;
            }
            let score = self.evaluate(tree, id);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((id, score));
            }
        }
        best.map(|(id, _)| id)
    }
}
