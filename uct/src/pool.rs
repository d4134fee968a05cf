//! Worker pool orchestration.
//!
//! `start` spawns a manager thread which spawns N workers; each worker
//! grinds descend-playout iterations until the shared halt flag rises
//! (or its playout budget is reached) and reports completion over a
//! multi-producer channel. `SearchCtx::stop` sends the stop sentinel,
//! the manager raises the halt flag, joins every worker, performs the
//! root-parallel merge and hands back the aggregate game count.
//!
//! Thread layout:
//!
//! ```text
//! front-end thread        controller loop between start() and stop()
//!   manager               spawns and collects worker threads
//!     worker 0..N-1       uct_playout() loop until halt
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, trace};

use engine_core::{Board, Color};

use crate::tree::Tree;
use crate::walk::{uct_playout, SearchEnv};

/// State shared between the manager and its workers.
struct SearchShared {
    halt: AtomicBool,
}

enum PoolMsg {
    /// Caller wants the search wrapped up.
    Stop,
    /// A worker finished its iteration loop.
    Done { tid: usize, games: u32 },
}

/// What a finished search amounted to.
#[derive(Debug, Clone, Copy)]
pub struct SearchSummary {
    pub games: u32,
}

/// Handle to a running search. The `tree` field is the live search
/// tree: the shared tree, or worker 0's private copy under root
/// parallelization.
pub struct SearchCtx {
    pub tree: Arc<Tree>,
    pub color: Color,
    control: Sender<PoolMsg>,
    manager: JoinHandle<SearchSummary>,
}

impl SearchCtx {
    /// Stop the pool and wait for every worker to wind down. When the
    /// workers already ran out of budget this just collects the result.
    pub fn stop(self) -> SearchSummary {
        let _ = self.control.send(PoolMsg::Stop);
        self.manager.join().expect("search manager panicked")
    }
}

/// Start a search over `tree` with `color` to move on `board`.
///
/// `budget` caps the root playout count worker-side (games-dimension
/// searches); `seed` deterministically derives every worker's RNG.
pub fn start<B: Board>(
    env: Arc<SearchEnv<B>>,
    tree: Arc<Tree>,
    board: B,
    color: Color,
    budget: Option<u32>,
    seed: u64,
) -> SearchCtx {
    let threads = env.cfg.threads;
    let shared_tree = env.cfg.thread_model.shares_tree();

    let worker_trees: Vec<Arc<Tree>> = (0..threads)
        .map(|_| {
            if shared_tree {
                tree.clone()
            } else {
                Arc::new(tree.copy())
            }
        })
        .collect();
    let live_tree = worker_trees[0].clone();

    let mut seeder = ChaCha20Rng::seed_from_u64(seed);
    let worker_seeds: Vec<u64> = (0..threads).map(|_| seeder.next_u64()).collect();

    let (control, inbox) = channel();
    let manager = {
        let master = tree;
        let control = control.clone();
        thread::Builder::new()
            .name("uct-manager".into())
            .spawn(move || {
                manage(
                    env,
                    master,
                    worker_trees,
                    worker_seeds,
                    board,
                    color,
                    budget,
                    control,
                    inbox,
                )
            })
            .expect("failed to spawn search manager")
    };

    debug!(threads, %color, "search started");
    SearchCtx {
        tree: live_tree,
        color,
        control,
        manager,
    }
}

#[allow(clippy::too_many_arguments)]
fn manage<B: Board>(
    env: Arc<SearchEnv<B>>,
    master: Arc<Tree>,
    worker_trees: Vec<Arc<Tree>>,
    worker_seeds: Vec<u64>,
    board: B,
    color: Color,
    budget: Option<u32>,
    control: Sender<PoolMsg>,
    inbox: Receiver<PoolMsg>,
) -> SearchSummary {
    let threads = worker_trees.len();
    let shared = Arc::new(SearchShared {
        halt: AtomicBool::new(false),
    });

    let mut handles: Vec<Option<JoinHandle<()>>> = Vec::with_capacity(threads);
    for (tid, worker_tree) in worker_trees.iter().enumerate() {
        let env = env.clone();
        let tree = worker_tree.clone();
        let board = board.clone();
        let shared = shared.clone();
        let report = control.clone();
        let seed = worker_seeds[tid];
        let handle = thread::Builder::new()
            .name(format!("uct-worker-{tid}"))
            .spawn(move || {
                let mut rng = ChaCha20Rng::seed_from_u64(seed);
                let mut games = 0u32;
                loop {
                    if shared.halt.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Some(limit) = budget {
                        if tree.root_node().u.playouts() >= limit {
                            break;
                        }
                    }
                    games += uct_playout(&env, &board, color, &tree, &mut rng);
                }
                let _ = report.send(PoolMsg::Done { tid, games });
            })
            .expect("failed to spawn search worker");
        handles.push(Some(handle));
        trace!(tid, "spawned worker");
    }

    // Collect finishers one at a time; a Stop sentinel just raises the
    // halt flag and keeps collecting.
    let mut joined = 0;
    let mut total_games = 0u32;
    while joined < threads {
        match inbox.recv() {
            Ok(PoolMsg::Stop) => {
                shared.halt.store(true, Ordering::Relaxed);
            }
            Ok(PoolMsg::Done { tid, games }) => {
                if let Some(handle) = handles[tid].take() {
                    let _ = handle.join();
                }
                total_games += games;
                joined += 1;
                trace!(tid, games, "joined worker");
            }
            Err(_) => break,
        }
    }

    // Root parallelization: fold the private trees back into the
    // master, strictly after all workers have joined.
    if !env.cfg.thread_model.shares_tree() {
        for worker_tree in &worker_trees {
            master.merge(worker_tree);
        }
        master.normalize(threads as u32);
        debug!(threads, "root-parallel trees merged");
    }

    SearchSummary { games: total_games }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{EvenPrior, LightPlayout};
    use engine_config::{ThreadModel, UctConfig};
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
    fn test_budget_run_is_exact_single_threaded() {
        let board = GoBoard::new(5, 7.5);
        let cfg = UctConfig::for_testing();
        let env = search_env(cfg, &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let ctx = start(env, tree.clone(), board, Color::Black, Some(200), 1);
        // Workers exit on their own once the budget is reached.
        let summary = ctx.stop();
        assert_eq!(tree.root_node().u.playouts(), 200);
        assert_eq!(summary.games, 200);
    }

    #[test]
    fn test_stop_halts_all_workers() {
        let board = GoBoard::new(9, 7.5);
        let cfg = UctConfig::for_testing().with_threads(3);
        let env = search_env(cfg, &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let ctx = start(env, tree.clone(), board, Color::Black, None, 7);
        std::thread::sleep(std::time::Duration::from_millis(50));
        let summary = ctx.stop();
        // stop() returning means every worker joined; the counters must
        // be settled now.
        assert_eq!(summary.games, tree.root_node().u.playouts());
        assert!(summary.games > 0);

        // And they stay settled: no worker is left running.
        std::thread::sleep(std::time::Duration::from_millis(100));
        assert_eq!(summary.games, tree.root_node().u.playouts());
    }

    #[test]
    fn test_budget_overshoot_bounded_by_thread_count() {
        let board = GoBoard::new(5, 7.5);
        let cfg = UctConfig::for_testing()
            .with_threads(4)
            .with_thread_model(ThreadModel::TreeVl);
        let env = search_env(cfg, &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let ctx = start(env, tree.clone(), board, Color::Black, Some(500), 3);
        let summary = ctx.stop();
        let playouts = tree.root_node().u.playouts();
        assert!(playouts >= 500);
        // Each worker can overshoot by at most the playout it had in
        // flight when the budget landed.
        assert!(playouts <= 500 + 4);
        assert_eq!(summary.games, playouts);
    }

    #[test]
    fn test_root_parallel_merges_into_master() {
        let board = GoBoard::new(5, 7.5);
        let cfg = UctConfig::for_testing()
            .with_threads(2)
            .with_thread_model(ThreadModel::Root);
        let env = search_env(cfg, &board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

        let ctx = start(env, tree.clone(), board, Color::Black, Some(100), 9);
        // The live tree is a worker's private copy, not the master.
        assert!(!Arc::ptr_eq(&ctx.tree, &tree));
        let summary = ctx.stop();
        assert!(summary.games > 0);
        // Master got the merged, normalized statistics.
        let merged = tree.root_node().u.playouts();
        assert!(merged > 0);
        assert!(merged <= summary.games);
    }
}
