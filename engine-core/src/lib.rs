//! Core traits and types for the Go UCT engine
//!
//! This crate provides the fundamental abstractions the search core is
//! polymorphic over:
//! - `Board`: opaque position interface (legal moves, play, eye queries)
//! - `PlayoutPolicy` / `Prior`: the external simulation and prior modules
//! - `Color` / `Coord` / `Move`: basic Go vocabulary
//! - `TimeInfo`: time-control input handed to the search by the front-end

pub mod board;
pub mod policy;
pub mod timeinfo;
pub mod types;

// Re-export main types for convenience
pub use board::{Board, Group, IllegalMove};
pub use policy::{EvenPrior, LightPlayout, PlayoutPolicy, Prior, PriorMap};
pub use timeinfo::{TimeBudget, TimeInfo, TimePeriod};
pub use types::{Color, Coord, Move, Point};
