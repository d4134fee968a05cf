//! Search controller: the front-end thread's loop between pool start
//! and pool stop.
//!
//! The controller never touches the tree structurally; it polls root
//! statistics on a fixed interval, logs progress, watches the memory
//! cap and decides when the stop conditions have been met.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use engine_core::{Board, Color, TimeInfo};

use crate::pool;
use crate::timing::{time_prep, StopConditions};
use crate::tree::Tree;
use crate::walk::SearchEnv;

/// How often the controller inspects the tree for stopping, progress
/// reports and memory checks.
pub const TREE_BUSYWAIT_INTERVAL: Duration = Duration::from_millis(100);

/// Once per how many simulations (per thread) to log a progress line.
pub const TREE_SIMPROGRESS_INTERVAL: u32 = 10_000;

/// Run a time-limited search on the foreground. Returns the number of
/// games played during this call.
pub fn uct_search<B: Board>(
    env: &Arc<SearchEnv<B>>,
    tree: &Arc<Tree>,
    board: &B,
    ti: &TimeInfo,
    color: Color,
    seed: u64,
) -> u32 {
    let stop = time_prep(ti, &env.cfg, board);
    let pre_simulated = tree.root_node().u.playouts();
    if pre_simulated > 0 {
        debug!(games = pre_simulated, "pre-simulated games skipped");
    }

    let budget = match stop {
        StopConditions::Games { worst, .. } => Some(worst),
        StopConditions::Walltime { .. } => None,
    };
    let ctx = pool::start(
        env.clone(),
        tree.clone(),
        board.clone(),
        color,
        budget,
        seed,
    );

    // The live search tree is ctx.tree: normally the shared tree, but a
    // private worker tree under root parallelization, where the merged
    // result only lands in `tree` at stop time.
    let print_interval = TREE_SIMPROGRESS_INTERVAL
        * if env.cfg.thread_model.shares_tree() {
            env.cfg.threads as u32
        } else {
            1
        };
    let mut last_print = pre_simulated;
    let mut full_noted = false;

    loop {
        thread::sleep(TREE_BUSYWAIT_INTERVAL);
        let root = ctx.tree.root_id();
        let i = ctx.tree.root_node().u.playouts();

        if i.saturating_sub(last_print) > print_interval {
            last_print += print_interval; // keep the numbers tidy
            progress_status(env, &ctx.tree, color, last_print, board);
        }
        if !full_noted && ctx.tree.is_full() {
            warn!(
                nodes = ctx.tree.nodes_used(),
                bytes = ctx.tree.nodes_size(),
                "tree memory limit hit"
            );
            full_noted = true;
        }

        let mut desired_done = false;
        match stop {
            StopConditions::Walltime { desired, worst } => {
                let now = Instant::now();
                if now > worst {
                    break;
                }
                desired_done = now > desired;
            }
            StopConditions::Games { desired, worst } => {
                if i >= worst {
                    break;
                }
                desired_done = i >= desired;
            }
        }

        if let Some(best) = env.policy.choose(&ctx.tree, root) {
            let node = ctx.tree.node(best);
            let playouts = node.u.playouts();
            let value = node.u.value();
            // Early break in a won situation.
            if (playouts >= 2000 && value >= env.cfg.loss_threshold)
                || (playouts >= 500 && value >= 0.95)
            {
                debug!(playouts, value, "early break, position is won");
                break;
            }
            if desired_done {
                // Stop only once the most explored child also carries
                // the best value.
                if env.policy.winner(&ctx.tree, root) == Some(best) {
                    break;
                }
            }
        } else if desired_done {
            break;
        }
    }

    let summary = ctx.stop();
    progress_status(env, tree, color, summary.games, board);
    summary.games
}

fn progress_status<B: Board>(
    env: &SearchEnv<B>,
    tree: &Tree,
    color: Color,
    games: u32,
    board: &B,
) {
    let root = tree.root_id();
    match env.policy.choose(tree, root) {
        Some(best) => {
            let node = tree.node(best);
            info!(
                games,
                %color,
                best = %node.coord().gtp(board.size()),
                value = node.u.value(),
                playouts = node.u.playouts(),
                "search progress"
            );
        }
        None => info!(games, %color, "search progress: nothing explored yet"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{EvenPrior, LightPlayout};
    use engine_config::UctConfig;
    use games_go::GoBoard;

    fn search_env(cfg: UctConfig, board: &GoBoard) -> Arc<SearchEnv<GoBoard>> {
        Arc::new(SearchEnv::new(
            cfg,
            board,
            Box::new(LightPlayout::new()),
            Box::new(EvenPrior::new(2)),
        ))
    }

    #[test]
    fn test_games_search_hits_budget() {
        let board = GoBoard::new(5, 7.5);
        let env = search_env(UctConfig::for_testing(), &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let games = uct_search(&env, &tree, &board, &TimeInfo::games(300), Color::Black, 1);
        assert_eq!(games, 300);
        assert_eq!(tree.root_node().u.playouts(), 300);
    }

    #[test]
    fn test_walltime_search_stops() {
        let board = GoBoard::new(5, 7.5);
        let env = search_env(UctConfig::for_testing(), &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let ti = TimeInfo::walltime(
            Duration::from_millis(150),
            Duration::from_millis(400),
            true,
        );
        let started = Instant::now();
        let games = uct_search(&env, &tree, &board, &ti, Color::Black, 1);
        assert!(games > 0);
        // Bounded well below the test timeout even with join slack.
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_lagged_deadlines_still_search_one_interval() {
        let board = GoBoard::new(5, 7.5);
        let env = search_env(UctConfig::for_testing(), &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        // Both deadlines already in the past.
        let ti = TimeInfo::walltime(Duration::ZERO, Duration::ZERO, false);
        let games = uct_search(&env, &tree, &board, &ti, Color::Black, 1);
        // One polling interval of playouts still happened.
        assert!(games > 0);
    }
}
