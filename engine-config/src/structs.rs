//! Configuration struct definitions.
//!
//! All config structs with serde deserialization support and default
//! values from the `defaults` module.

use serde::Deserialize;
use thiserror::Error;

use crate::defaults;

// Serde default functions (required for #[serde(default = "...")])
fn d_threads() -> usize {
    defaults::THREADS
}
fn d_max_tree_size() -> u64 {
    defaults::MAX_TREE_SIZE
}
fn d_resign_ratio() -> f32 {
    defaults::RESIGN_RATIO
}
fn d_loss_threshold() -> f32 {
    defaults::LOSS_THRESHOLD
}
fn d_mercymin() -> u32 {
    defaults::MERCYMIN
}
fn d_gamelen() -> u32 {
    defaults::GAMELEN
}
fn d_expand_p() -> u32 {
    defaults::EXPAND_P
}
fn d_fuseki_end() -> u32 {
    defaults::FUSEKI_END
}
fn d_yose_start() -> u32 {
    defaults::YOSE_START
}
fn d_dynkomi() -> u32 {
    defaults::DYNKOMI
}
fn d_val_scale() -> f32 {
    defaults::VAL_SCALE
}
fn d_val_points() -> u32 {
    defaults::VAL_POINTS
}
fn d_val_extra() -> bool {
    defaults::VAL_EXTRA
}
fn d_explore_p() -> f32 {
    defaults::EXPLORE_P
}
fn d_rave_equiv() -> f32 {
    defaults::RAVE_EQUIV
}
fn d_fpu() -> f32 {
    defaults::FIRST_PLAY_URGENCY
}
fn d_prior_eqex() -> u32 {
    defaults::PRIOR_EQEX
}
fn d_playout_amaf() -> bool {
    defaults::PLAYOUT_AMAF
}

/// Errors raised while loading or validating a configuration. All of
/// these are fatal at the engine boundary: the front-end is expected to
/// refuse to start.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("fast_alloc is not supported with root parallelization")]
    FastAllocWithRoot,

    #[error("only one of random_policy and random_policy_chance is set")]
    RandomPolicyMismatch,

    #[error("invalid option value: {0}")]
    InvalidValue(&'static str),
}

/// How worker threads share (or do not share) the search tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadModel {
    /// Each worker searches a private tree copy; trees are merged and
    /// normalized at the end.
    Root,
    /// All workers grind on one shared tree.
    Tree,
    /// Shared tree plus virtual losses on descent, discouraging workers
    /// from piling onto the same branches.
    TreeVl,
}

impl ThreadModel {
    pub fn shares_tree(self) -> bool {
        !matches!(self, ThreadModel::Root)
    }

    pub fn uses_virtual_loss(self) -> bool {
        matches!(self, ThreadModel::TreeVl)
    }
}

/// Which colors dynamic komi applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DynkomiMask {
    #[default]
    Black,
    White,
    Both,
    None,
}

impl DynkomiMask {
    pub fn applies_to(self, black: bool) -> bool {
        match self {
            DynkomiMask::Black => black,
            DynkomiMask::White => !black,
            DynkomiMask::Both => true,
            DynkomiMask::None => false,
        }
    }
}

/// Tree selection policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Ucb1,
    #[default]
    Ucb1Amaf,
}

/// A selection policy with its sub-arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub kind: PolicyKind,
    /// Exploration coefficient of the UCB term.
    #[serde(default = "d_explore_p")]
    pub explore_p: f32,
    /// Equivalence parameter of the RAVE interpolation; the AMAF estimate
    /// loses half its weight once a child has this many direct playouts.
    #[serde(default = "d_rave_equiv")]
    pub rave_equiv: f32,
    /// Urgency assigned to children without any experience.
    #[serde(default = "d_fpu")]
    pub first_play_urgency: f32,
    /// Whether playout-stage moves feed the AMAF statistics, or only
    /// in-tree moves.
    #[serde(default = "d_playout_amaf")]
    pub playout_amaf: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            kind: PolicyKind::default(),
            explore_p: defaults::EXPLORE_P,
            rave_equiv: defaults::RAVE_EQUIV,
            first_play_urgency: defaults::FIRST_PLAY_URGENCY,
            playout_amaf: defaults::PLAYOUT_AMAF,
        }
    }
}

impl PolicyConfig {
    pub fn ucb1() -> Self {
        Self {
            kind: PolicyKind::Ucb1,
            ..Self::default()
        }
    }
}

/// The full configuration record the search core receives.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UctConfig {
    #[serde(default = "d_threads")]
    pub threads: usize,
    pub thread_model: ThreadModel,
    pub pondering: bool,
    /// Advisory cap on tree memory, in bytes.
    #[serde(default = "d_max_tree_size")]
    pub max_tree_size: u64,
    /// Preallocate the whole node arena at tree construction.
    pub fast_alloc: bool,
    /// Fixed random seed for reproducible searches.
    pub force_seed: Option<u64>,
    pub no_book: bool,
    /// Directory the opening book is loaded from and saved to.
    pub book_dir: std::path::PathBuf,
    #[serde(default = "d_resign_ratio")]
    pub resign_ratio: f32,
    #[serde(default = "d_loss_threshold")]
    pub loss_threshold: f32,
    /// Capture difference that ends a playout early; 0 disables the
    /// mercy rule.
    #[serde(default = "d_mercymin")]
    pub mercymin: u32,
    /// Maximum playout length in moves.
    #[serde(default = "d_gamelen")]
    pub gamelen: u32,
    /// Visits a leaf needs before it is expanded.
    #[serde(default = "d_expand_p")]
    pub expand_p: u32,
    /// Percent of the board played when the opening ends.
    #[serde(default = "d_fuseki_end")]
    pub fuseki_end: u32,
    /// Percent of the board played when the endgame starts.
    #[serde(default = "d_yose_start")]
    pub yose_start: u32,
    /// Move horizon for dynamic komi; 0 disables it.
    #[serde(default = "d_dynkomi")]
    pub dynkomi: u32,
    pub dynkomi_mask: DynkomiMask,
    /// How much of the result value reflects the win margin.
    #[serde(default = "d_val_scale")]
    pub val_scale: f32,
    /// Margin (in points) that saturates the scaling; 0 means the whole
    /// board.
    #[serde(default = "d_val_points")]
    pub val_points: u32,
    /// Push the scaled margin past the win bit instead of blending.
    #[serde(default = "d_val_extra")]
    pub val_extra: bool,
    /// Root exploration bias mode (0 = off).
    pub root_heuristic: u8,
    pub pass_all_alive: bool,
    /// Even-prior equivalent experience installed at expansion.
    #[serde(default = "d_prior_eqex")]
    pub prior_eqex: u32,
    pub policy: PolicyConfig,
    /// Secondary policy used for whole descents on a 1-in-N basis.
    pub random_policy: Option<PolicyConfig>,
    /// The N of the 1-in-N secondary policy; 0 disables it.
    pub random_policy_chance: u32,
}

impl Default for UctConfig {
    fn default() -> Self {
        Self {
            threads: defaults::THREADS,
            thread_model: ThreadModel::TreeVl,
            pondering: defaults::PONDERING,
            max_tree_size: defaults::MAX_TREE_SIZE,
            fast_alloc: defaults::FAST_ALLOC,
            force_seed: None,
            no_book: defaults::NO_BOOK,
            book_dir: std::path::PathBuf::from("."),
            resign_ratio: defaults::RESIGN_RATIO,
            loss_threshold: defaults::LOSS_THRESHOLD,
            mercymin: defaults::MERCYMIN,
            gamelen: defaults::GAMELEN,
            expand_p: defaults::EXPAND_P,
            fuseki_end: defaults::FUSEKI_END,
            yose_start: defaults::YOSE_START,
            dynkomi: defaults::DYNKOMI,
            dynkomi_mask: DynkomiMask::default(),
            val_scale: defaults::VAL_SCALE,
            val_points: defaults::VAL_POINTS,
            val_extra: defaults::VAL_EXTRA,
            root_heuristic: defaults::ROOT_HEURISTIC,
            pass_all_alive: defaults::PASS_ALL_ALIVE,
            prior_eqex: defaults::PRIOR_EQEX,
            policy: PolicyConfig::default(),
            random_policy: None,
            random_policy_chance: 0,
        }
    }
}

impl UctConfig {
    /// Reject mutually exclusive or nonsensical option combinations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fast_alloc && self.thread_model == ThreadModel::Root {
            return Err(ConfigError::FastAllocWithRoot);
        }
        if self.random_policy.is_some() != (self.random_policy_chance > 0) {
            return Err(ConfigError::RandomPolicyMismatch);
        }
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue("threads must be at least 1"));
        }
        if self.gamelen == 0 {
            return Err(ConfigError::InvalidValue("gamelen must be at least 1"));
        }
        if self.expand_p == 0 {
            return Err(ConfigError::InvalidValue("expand_p must be at least 1"));
        }
        Ok(())
    }

    /// A small fast configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            threads: 1,
            max_tree_size: 8 * 1024 * 1024,
            no_book: true,
            force_seed: Some(1),
            ..Self::default()
        }
    }

    /// Builder pattern: set the worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Builder pattern: set the thread model.
    pub fn with_thread_model(mut self, model: ThreadModel) -> Self {
        self.thread_model = model;
        self
    }

    /// Builder pattern: set the forced random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.force_seed = Some(seed);
        self
    }
}
