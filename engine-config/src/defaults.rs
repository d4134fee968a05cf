//! Default configuration values.
//!
//! Single source of truth for every default the search core assumes.

/// Simulations per move when no time info is supplied. Total over all
/// threads (except with root parallelization, where each worker owns its
/// own tree).
pub const MC_GAMES: u32 = 80_000;

pub const THREADS: usize = 1;
pub const MAX_TREE_SIZE: u64 = 3072 * 1024 * 1024;
pub const FAST_ALLOC: bool = false;
pub const PONDERING: bool = false;
pub const NO_BOOK: bool = false;

/// Resign when most playouts are lost.
pub const RESIGN_RATIO: f32 = 0.2;
/// Stop reading early once the best move wins this reliably.
pub const LOSS_THRESHOLD: f32 = 0.85;

pub const MERCYMIN: u32 = 0;
pub const GAMELEN: u32 = 600;
pub const EXPAND_P: u32 = 2;

/// Thinking time ramps up until this percentage of the board is played.
pub const FUSEKI_END: u32 = 20;
/// From here on the remaining time is spread uniformly.
pub const YOSE_START: u32 = 40;

pub const DYNKOMI: u32 = 0;
pub const DYNKOMI_BIG_BOARD: u32 = 200;

pub const VAL_SCALE: f32 = 0.04;
pub const VAL_POINTS: u32 = 40;
pub const VAL_EXTRA: bool = true;

pub const ROOT_HEURISTIC: u8 = 0;
pub const PASS_ALL_ALIVE: bool = false;

// Selection policy defaults
pub const EXPLORE_P: f32 = 0.2;
pub const RAVE_EQUIV: f32 = 3000.0;
pub const FIRST_PLAY_URGENCY: f32 = f32::INFINITY;
pub const PRIOR_EQEX: u32 = 2;
pub const PLAYOUT_AMAF: bool = true;
