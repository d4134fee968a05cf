//! The engine surface: move notifications, move generation, pondering,
//! chat queries, dead-group reporting and the ownership display hook.
//!
//! The engine exclusively owns the search tree between searches; the
//! worker pool shares it while one runs. State lives across moves
//! through promotion and is dropped whenever the move stream stops
//! making sense.

use std::sync::Arc;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use engine_core::{
    Board, Color, Coord, EvenPrior, Group, LightPlayout, Move, PlayoutPolicy, Point, Prior,
    TimeBudget, TimeInfo,
};
use engine_config::{ConfigError, UctConfig};

use crate::book;
use crate::ownermap::{pass_is_safe, OwnerMap, GJ_MINGAMES};
use crate::pool::{self, SearchCtx};
use crate::search::uct_search;
use crate::tree::Tree;
use crate::walk::{uct_playout, SearchEnv};

/// Errors fatal at engine construction; the front-end is expected to
/// abort on them.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The UCT engine.
pub struct UctEngine<B: Board> {
    env: Arc<SearchEnv<B>>,
    tree: Option<Arc<Tree>>,
    ponder: Option<SearchCtx>,
    rng: ChaCha20Rng,
}

impl<B: Board> UctEngine<B> {
    /// Engine with the reference playout policy and even priors.
    pub fn new(cfg: UctConfig, board: &B) -> Result<Self, EngineError> {
        let eqex = cfg.prior_eqex;
        Self::with_policies(
            cfg,
            board,
            Box::new(LightPlayout::new()),
            Box::new(EvenPrior::new(eqex)),
        )
    }

    /// Engine with caller-supplied playout and prior collaborators.
    pub fn with_policies(
        cfg: UctConfig,
        board: &B,
        playout: Box<dyn PlayoutPolicy<B>>,
        prior: Box<dyn Prior<B>>,
    ) -> Result<Self, EngineError> {
        cfg.validate()?;
        let rng = match cfg.force_seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Ok(Self {
            env: Arc::new(SearchEnv::new(cfg, board, playout, prior)),
            tree: None,
            ponder: None,
            rng,
        })
    }

    pub fn cfg(&self) -> &UctConfig {
        &self.env.cfg
    }

    /// The current search tree, if any game state is live.
    pub fn tree(&self) -> Option<&Arc<Tree>> {
        self.tree.as_ref()
    }

    pub fn ownermap(&self) -> &OwnerMap {
        &self.env.ownermap
    }

    pub fn is_pondering(&self) -> bool {
        self.ponder.is_some()
    }

    fn setup_state(&mut self, board: &B, color: Color) {
        if let Some(seed) = self.env.cfg.force_seed {
            self.rng = ChaCha20Rng::seed_from_u64(seed);
        }
        debug!(%color, "fresh search state");
        let tree = Arc::new(Tree::init(
            color,
            self.env.cfg.max_tree_size,
            self.env.cfg.fast_alloc,
        ));
        if !self.env.cfg.no_book && board.move_count() == 0 && color == Color::Black {
            book::tree_load(
                &tree,
                board,
                &self.env.cfg.book_dir,
                self.env.prior.as_ref(),
                self.env.playout.as_ref(),
            );
        }
        self.tree = Some(tree);
    }

    fn reset_state(&mut self) {
        self.tree = None;
    }

    /// Make sure the tree matches `color` to move and the per-move state
    /// is clean. Non-alternating play is a fatal protocol violation.
    fn prepare_move(&mut self, board: &B, color: Color) {
        if let Some(tree) = &self.tree {
            if tree.root_color() != color {
                panic!(
                    "Non-alternating play detected: {} to move, {} expected",
                    color,
                    tree.root_color()
                );
            }
        } else {
            self.setup_state(board, color);
        }

        let cfg = &self.env.cfg;
        if cfg.dynkomi > 0
            && board.move_count() < cfg.dynkomi
            && cfg.dynkomi_mask.applies_to(color == Color::Black)
        {
            let tree = self.tree.as_ref().expect("state was just prepared");
            let extra = 7.0 * board.handicap() as f32 * (cfg.dynkomi - board.move_count()) as f32
                / cfg.dynkomi as f32;
            tree.set_extra_komi(extra);
            debug!(extra, "dynamic komi applied");
        }

        self.env.ownermap.reset();
    }

    /// Called for each move played by either side.
    pub fn notify_play(&mut self, board: &B, mv: Move) {
        if self.tree.is_none() {
            // Game beginning: build state now so the opening book is
            // loaded before anything else happens.
            self.prepare_move(board, mv.color);
        }
        self.pondering_stop();

        if mv.coord.is_resign() {
            self.reset_state();
            return;
        }

        let tree = self.tree.clone().expect("state exists past prepare");

        // genmove already promoted our own move; a front-end echoing it
        // back is not a new move.
        if tree.root_color() == mv.color.opposite() && tree.root_node().coord() == mv.coord {
            debug!(coord = %mv.coord.gtp(board.size()), "move already promoted");
            return;
        }

        if tree.root_color() != mv.color {
            panic!(
                "Non-alternating play detected: {} played, {} expected",
                mv.color,
                tree.root_color()
            );
        }

        if !self.promote(&tree, mv.coord) {
            if tree.root_node().is_expanded() {
                // Probable protocol irregularity; start over cleanly.
                warn!(coord = %mv.coord.gtp(board.size()), "cannot promote move node, resetting tree");
                self.reset_state();
            } else {
                // Never-searched tree: just flip it to the new side.
                self.tree = Some(Arc::new(Tree::init(
                    mv.color.opposite(),
                    self.env.cfg.max_tree_size,
                    self.env.cfg.fast_alloc,
                )));
            }
        }
    }

    /// Promote the child matching `coord` to the root: in place in
    /// arena (`fast_alloc`) mode, by compaction otherwise.
    fn promote(&mut self, tree: &Arc<Tree>, coord: Coord) -> bool {
        if tree.fast_alloc() {
            tree.promote(coord)
        } else {
            match tree.promoted(coord) {
                Some(fresh) => {
                    self.tree = Some(Arc::new(fresh));
                    true
                }
                None => false,
            }
        }
    }

    /// The central entry: search the position and return a coordinate,
    /// a pass, or a resignation.
    pub fn genmove(
        &mut self,
        board: &mut B,
        ti: &TimeInfo,
        color: Color,
        pass_all_alive: bool,
    ) -> Coord {
        let start_time = Instant::now();

        if board.superko_violation() {
            warn!("superko violation on incoming board; ignoring and playing on");
            board.clear_superko_violation();
        }

        self.pondering_stop();
        self.prepare_move(board, color);
        let tree = self.tree.clone().expect("state was just prepared");

        let seed = self.rng.gen();
        let games = uct_search(&self.env, &tree, board, ti, color, seed);

        let Some(best_id) = self.env.policy.choose(&tree, tree.root_id()) else {
            self.reset_state();
            return Coord::Pass;
        };
        let best = tree.node(best_id);
        let mut coord = best.coord();
        info!(
            winner = %coord.gtp(board.size()),
            value = best.u.value(),
            playouts = best.u.playouts(),
            root_playouts = tree.root_node().u.playouts(),
            games,
            "move chosen"
        );

        // Do not resign off a starved search: with hardly any playouts
        // the best value is nearly random and still beats resigning.
        if best.u.value() < self.env.cfg.resign_ratio
            && !coord.is_pass()
            && best.u.playouts() > GJ_MINGAMES
        {
            self.reset_state();
            return Coord::Resign;
        }

        // If the opponent just passed and we win the counting, pass too.
        if board.move_count() > 1 && board.last_move_was_pass() {
            while self.env.ownermap.playouts() < GJ_MINGAMES {
                uct_playout(&self.env, board, color, &tree, &mut self.rng);
            }
            if pass_is_safe(
                &self.env.ownermap,
                board,
                color,
                self.env.cfg.pass_all_alive || pass_all_alive,
            ) {
                info!("passing instead, the position looks safe");
                coord = Coord::Pass;
            }
        }

        if !self.promote(&tree, coord) {
            warn!(coord = %coord.gtp(board.size()), "cannot promote chosen move, resetting tree");
            self.reset_state();
        }

        // After a pass, pondering would keep skewing the ownership map
        // once the tree starts cutting playouts off.
        if self.env.cfg.pondering && !coord.is_pass() {
            if let Some(tree) = self.tree.clone() {
                self.ponder_start(board, tree, coord, color);
            }
        }

        debug!(elapsed = ?start_time.elapsed(), games, "genmove finished");
        coord
    }

    /// Start a headless background search on the position after our
    /// `coord`, with the opponent to move.
    fn ponder_start(&mut self, board: &B, tree: Arc<Tree>, coord: Coord, color: Color) {
        let mut after = board.clone();
        if after.play(Move::new(coord, color)).is_err() {
            return;
        }
        let opponent = color.opposite();
        info!(%opponent, "pondering started");
        let seed = self.rng.gen();
        self.ponder = Some(pool::start(
            self.env.clone(),
            tree,
            after,
            opponent,
            None,
            seed,
        ));
    }

    /// Stop a background search if one is running. Safe to call any
    /// time.
    pub fn pondering_stop(&mut self) {
        if let Some(ctx) = self.ponder.take() {
            let color = ctx.color;
            let summary = ctx.stop();
            debug!(%color, games = summary.games, "pondering stopped");
        }
    }

    /// Answer chat queries; currently only "winrate".
    pub fn chat(&self, board: &B, cmd: &str) -> Option<String> {
        let cmd = cmd.trim();
        if !cmd.to_ascii_lowercase().starts_with("winrate") {
            return None;
        }
        let Some(tree) = &self.tree else {
            return Some("no game context (yet?)".to_string());
        };
        let root = tree.root_node();
        let color = tree.root_color();
        // The root node's value is from its mover, our opponent.
        let winrate = (1.0 - root.value()) * 100.0;
        let mut reply = format!(
            "In {} playouts at {} threads, {} {} can win with {:.2}% probability",
            root.u.playouts(),
            self.env.cfg.threads,
            color,
            root.coord().gtp(board.size()),
            winrate
        );
        if tree.extra_komi().abs() >= 0.5 {
            reply.push_str(&format!(
                ", while self-imposing extra komi {:.1}",
                tree.extra_komi()
            ));
        }
        reply.push('.');
        Some(reply)
    }

    /// Groups currently judged dead. With no live state, a transient
    /// tree is mocked up, seeded with the minimum playouts, and torn
    /// down again so a subsequent genmove starts clean.
    pub fn dead_group_list(&mut self, board: &B) -> Vec<Group> {
        // The game is probably over, no use pondering on.
        self.pondering_stop();

        if self.env.cfg.pass_all_alive {
            return Vec::new();
        }

        let mock_state = self.tree.is_none();
        if mock_state {
            self.prepare_move(board, Color::Black);
            let tree = self.tree.clone().expect("state was just prepared");
            for _ in 0..GJ_MINGAMES {
                uct_playout(&self.env, board, Color::Black, &tree, &mut self.rng);
            }
        }

        let dead = self.env.ownermap.dead_groups(board);

        if mock_state {
            self.reset_state();
        }
        dead
    }

    /// One display character for a board point, from the current
    /// ownership judgement.
    pub fn printhook(
        &self,
        _board: &B,
        point: Point,
        out: &mut dyn std::fmt::Write,
    ) -> std::fmt::Result {
        write!(out, "{} ", self.env.ownermap.owner_char(point))
    }

    /// Tear the engine down: stop pondering, drop tree state.
    pub fn done(&mut self) {
        self.pondering_stop();
        self.reset_state();
    }

    /// Search the current position and persist the result into the
    /// opening book. Only meaningful with a games budget.
    pub fn gen_book(&mut self, board: &B, ti: &TimeInfo, color: Color) -> std::io::Result<()> {
        self.pondering_stop();
        self.prepare_move(board, color);
        let tree = self.tree.clone().expect("state was just prepared");

        // Don't count games that already went into the book.
        let TimeBudget::Games { games } = ti.budget else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "book generation needs a games budget",
            ));
        };
        let ti = TimeInfo::games(games + tree.root_node().u.playouts());

        let seed = self.rng.gen();
        uct_search(&self.env, &tree, board, &ti, color, seed);
        book::tree_save(
            &tree,
            board.size(),
            &self.env.cfg.book_dir,
            (games / 100).max(1),
        )
    }
}

impl<B: Board> Drop for UctEngine<B> {
    fn drop(&mut self) {
        self.pondering_stop();
    }
}
