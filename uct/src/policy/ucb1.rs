//! Plain UCB1 selection.

use crate::node::NodeId;
use crate::tree::Tree;

use super::{effective, first_play_urgency, DescendOptions};

/// `value + explore_p * sqrt(ln(parent) / child)`, prior experience
/// folded into both terms.
#[derive(Debug, Clone, Copy)]
pub struct Ucb1 {
    pub explore_p: f32,
    pub fpu: f32,
}

impl Ucb1 {
    pub(super) fn descend(
        &self,
        tree: &Tree,
        parent: NodeId,
        at_root: bool,
        opts: DescendOptions,
    ) -> Option<NodeId> {
        let pnode = tree.node(parent);
        let (parent_n, _) = pnode.experience();
        let ln_parent = (parent_n.max(1) as f32).ln();
        let parent_value = pnode.value();

        let mut best: Option<(NodeId, f32)> = None;
        for id in tree.children_range(parent).map(NodeId) {
            let child = tree.node(id);
            let (n, sum) = effective(child, opts.virtual_loss);
            let urgency = if n <= 0.0 {
                first_play_urgency(self.fpu, at_root, opts.root_heuristic, parent_value)
            } else {
                (sum / n).clamp(0.0, 1.0) + self.explore_p * (ln_parent / n).sqrt()
            };
            if best.map_or(true, |(_, b)| urgency > b) {
                best = Some((id, urgency));
            }
        }
        best.map(|(id, _)| id)
    }

    pub(super) fn evaluate(&self, tree: &Tree, node: NodeId) -> f32 {
        tree.node(node).value()
    }
}
