//! Parallel Monte-Carlo tree search core for Go
//!
//! Given a position and a time or simulation budget, the engine picks a
//! move: worker threads repeatedly descend a shared statistics tree
//! under a UCB-style selection policy, hand leaf positions to an
//! external playout policy, and fold the simulated results back into
//! per-node win-rate estimates and a per-point ownership map. The tree
//! survives across moves through promotion and can keep searching on
//! the opponent's time.
//!
//! The crate is polymorphic over its collaborators:
//! - `engine_core::Board`: the opaque position
//! - `engine_core::PlayoutPolicy` / `engine_core::Prior`: simulation
//!   and expansion-prior modules
//! - `engine_config::UctConfig`: the fully populated configuration
//!   record
//!
//! # Example
//!
//! ```no_run
//! use engine_config::UctConfig;
//! use engine_core::{Color, TimeInfo};
//! use games_go::GoBoard;
//! use uct::UctEngine;
//!
//! let mut board = GoBoard::new(9, 7.5);
//! let mut engine = UctEngine::new(UctConfig::default(), &board).unwrap();
//! let coord = engine.genmove(&mut board, &TimeInfo::games(10_000), Color::Black, false);
//! println!("playing {}", coord.gtp(9));
//! ```

pub mod book;
pub mod engine;
pub mod node;
pub mod ownermap;
pub mod policy;
pub mod pool;
pub mod search;
pub mod timing;
pub mod tree;
pub mod walk;

// Re-export main types for convenience
pub use engine::{EngineError, UctEngine};
pub use node::{MoveStats, NodeId, TreeNode};
pub use ownermap::{pass_is_safe, OwnerMap, PointJudgement, GJ_MINGAMES, GJ_THRES};
pub use policy::TreePolicy;
pub use pool::{SearchCtx, SearchSummary};
pub use search::{uct_search, TREE_BUSYWAIT_INTERVAL};
pub use timing::StopConditions;
pub use tree::Tree;
pub use walk::{uct_playout, SearchEnv};
