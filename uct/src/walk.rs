//! One descend-expand-simulate-backup cycle.
//!
//! Workers call [`uct_playout`] in a loop: descend the shared tree under
//! the selection policy, expand leaves that have earned it, hand the
//! position to the external playout policy until the game ends, then
//! walk the visited path backwards folding the result into every node
//! (and the ownership map) from the right perspective.

use rand::Rng;
use rand_chacha::ChaCha20Rng;

use engine_core::{Board, Color, Coord, Move, PlayoutPolicy, Point, Prior};
use engine_config::UctConfig;

use crate::node::NodeId;
use crate::ownermap::OwnerMap;
use crate::policy::{DescendOptions, TreePolicy};
use crate::tree::Tree;

/// Everything a worker needs to run playouts: configuration snapshot,
/// policies, the external collaborators and the ownership map. Shared
/// read-only across the pool.
pub struct SearchEnv<B: Board> {
    pub cfg: UctConfig,
    pub policy: TreePolicy,
    pub random_policy: Option<TreePolicy>,
    pub playout: Box<dyn PlayoutPolicy<B>>,
    pub prior: Box<dyn Prior<B>>,
    pub ownermap: OwnerMap,
}

impl<B: Board> SearchEnv<B> {
    pub fn new(
        cfg: UctConfig,
        board: &B,
        playout: Box<dyn PlayoutPolicy<B>>,
        prior: Box<dyn Prior<B>>,
    ) -> Self {
        let policy = TreePolicy::from_config(&cfg.policy);
        let random_policy = cfg.random_policy.as_ref().map(TreePolicy::from_config);
        let ownermap = OwnerMap::new(board.num_points());
        Self {
            cfg,
            policy,
            random_policy,
            playout,
            prior,
            ownermap,
        }
    }

    /// The policy steering this descent: the secondary policy on a
    /// 1-in-N basis when configured, the main one otherwise.
    fn descent_policy(&self, rng: &mut ChaCha20Rng) -> &TreePolicy {
        if let Some(random_policy) = &self.random_policy {
            if self.cfg.random_policy_chance > 0
                && rng.gen_range(0..self.cfg.random_policy_chance) == 0
            {
                return random_policy;
            }
        }
        &self.policy
    }
}

/// Convert a terminal score (Black minus White, extra komi included)
/// into a result in `[0, 1]` from the root color's perspective,
/// optionally shaped by the win margin.
fn playout_result(score: f32, root_color: Color, cfg: &UctConfig, board_points: usize) -> f32 {
    let root_score = match root_color {
        Color::White => -score,
        _ => score,
    };
    let win = if root_score > 0.0 {
        1.0
    } else if root_score < 0.0 {
        0.0
    } else {
        0.5
    };
    if cfg.val_scale <= 0.0 {
        return win;
    }
    let vp = if cfg.val_points > 0 {
        cfg.val_points as f32
    } else {
        board_points as f32
    };
    let margin = root_score.abs().min(vp) / vp;
    let shaped = 0.5 + root_score.signum() * margin / 2.0;
    let value = if cfg.val_extra {
        win + cfg.val_scale * (shaped - 0.5)
    } else {
        (1.0 - cfg.val_scale) * win + cfg.val_scale * shaped
    };
    value.clamp(0.0, 1.0)
}

/// Run one playout iteration for the side `color` to move at the root.
/// Returns the number of games added (always 1).
pub fn uct_playout<B: Board>(
    env: &SearchEnv<B>,
    board: &B,
    color: Color,
    tree: &Tree,
    rng: &mut ChaCha20Rng,
) -> u32 {
    let mut b = board.clone();
    let virtual_loss = env.cfg.thread_model.uses_virtual_loss();
    let opts = DescendOptions {
        virtual_loss,
        root_heuristic: env.cfg.root_heuristic,
    };
    let policy = env.descent_policy(rng);
    let record_amaf = env.policy.uses_amaf();

    let mut path: Vec<NodeId> = Vec::with_capacity(32);
    let mut moves: Vec<Move> = Vec::new();

    let mut node_id = tree.root_id();
    path.push(node_id);
    let mut to_play = color;
    let mut passes = u32::from(b.last_move_was_pass());

    // Descend the tree.
    loop {
        let node = tree.node(node_id);
        if !node.is_expanded() {
            if node.u.playouts() >= env.cfg.expand_p && !tree.is_full() {
                tree.expand(node_id, &b, to_play, env.prior.as_ref(), env.playout.as_ref());
            }
            if !node.is_expanded() {
                break;
            }
        }
        let Some(child_id) = policy.descend(tree, node_id, opts) else {
            break;
        };
        let child = tree.node(child_id);
        let coord = child.coord();
        if b.play(Move::new(coord, to_play)).is_err() {
            break;
        }
        if record_amaf {
            moves.push(Move::new(coord, to_play));
        }
        if virtual_loss {
            child.add_virtual_loss();
        }
        path.push(child_id);
        passes = if coord.is_pass() { passes + 1 } else { 0 };
        to_play = to_play.opposite();
        node_id = child_id;
        if passes >= 2 {
            break;
        }
    }

    // Simulate with the external playout policy.
    let mut game_len = 0u32;
    while passes < 2 && game_len < env.cfg.gamelen {
        let mut coord = env.playout.choose(&b, to_play, rng);
        if coord.is_resign() || b.play(Move::new(coord, to_play)).is_err() {
            coord = Coord::Pass;
            let _ = b.play(Move::new(coord, to_play));
        }
        if record_amaf && env.cfg.policy.playout_amaf && !coord.is_pass() {
            moves.push(Move::new(coord, to_play));
        }
        passes = if coord.is_pass() { passes + 1 } else { 0 };
        to_play = to_play.opposite();
        game_len += 1;

        if env.cfg.mercymin > 0 {
            let diff = b.captures(Color::Black) as i64 - b.captures(Color::White) as i64;
            if diff.unsigned_abs() > env.cfg.mercymin as u64 {
                break;
            }
        }
    }

    // Score from the root color's perspective.
    let score = b.area_score() - tree.extra_komi();
    let result = playout_result(score, color, &env.cfg, b.num_points());

    // Backup, each node from its own mover's perspective; virtual
    // losses applied on the way down are reversed here.
    for (i, &nid) in path.iter().enumerate() {
        let node = tree.node(nid);
        let node_result = if node.color() == color {
            result
        } else {
            1.0 - result
        };
        node.u.record(node_result);
        if virtual_loss && i > 0 {
            node.remove_virtual_loss();
        }
    }

    // AMAF: credit children of visited nodes whose move was first
    // played by their color anywhere later in the game.
    if record_amaf {
        let mut first_play: Vec<Option<Color>> = vec![None; b.num_points()];
        for mv in &moves {
            if let Coord::Point(p) = mv.coord {
                let slot = &mut first_play[p.index()];
                if slot.is_none() {
                    *slot = Some(mv.color);
                }
            }
        }
        for &nid in &path {
            for cid in tree.children_range(nid).map(NodeId) {
                let child = tree.node(cid);
                let Coord::Point(p) = child.coord() else {
                    continue;
                };
                if first_play[p.index()] == Some(child.color()) {
                    let amaf_result = if child.color() == color {
                        result
                    } else {
                        1.0 - result
                    };
                    child.amaf.record(amaf_result);
                }
            }
        }
    }

    // Ownership map; the playout counter moves first so per-point sums
    // never exceed it.
    env.ownermap.begin_game();
    for i in 0..b.num_points() {
        let p = Point(i as u16);
        env.ownermap.record_owner(p, b.point_owner(p));
    }

    1
}
