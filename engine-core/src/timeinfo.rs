//! Time-control information handed to the search by the front-end.
//!
//! The front-end is responsible for folding total-game time down to
//! per-move budgets; the search core only ever accepts `None` or `Move`
//! periods.

use std::time::{Duration, Instant};

/// What the budget applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimePeriod {
    /// No time info supplied; the search falls back to a default
    /// per-move simulation budget.
    None,
    /// Budget for the next move.
    Move,
    /// Budget for the rest of the game. Not permitted at this layer.
    Total,
}

/// The budget dimension: a simulation count or wall-clock time.
#[derive(Debug, Clone, Copy)]
pub enum TimeBudget {
    Games {
        games: u32,
    },
    Walltime {
        /// Time the front-end recommends spending on this move.
        recommended: Duration,
        /// Hard ceiling for this move.
        max: Duration,
        /// When the clock for this move started ticking.
        timer_start: Instant,
        /// Estimated network lag to subtract from every deadline.
        net_lag: Duration,
        /// Whether we are in byoyomi (time-per-move overtime).
        byoyomi: bool,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TimeInfo {
    pub period: TimePeriod,
    pub budget: TimeBudget,
}

impl TimeInfo {
    /// No constraint; the search will use its default game budget.
    pub fn none() -> Self {
        Self {
            period: TimePeriod::None,
            budget: TimeBudget::Games { games: 0 },
        }
    }

    /// Fixed per-move simulation budget.
    pub fn games(games: u32) -> Self {
        Self {
            period: TimePeriod::Move,
            budget: TimeBudget::Games { games },
        }
    }

    /// Per-move wall-clock budget starting now.
    pub fn walltime(recommended: Duration, max: Duration, byoyomi: bool) -> Self {
        Self {
            period: TimePeriod::Move,
            budget: TimeBudget::Walltime {
                recommended,
                max,
                timer_start: Instant::now(),
                net_lag: Duration::ZERO,
                byoyomi,
            },
        }
    }

    pub fn is_byoyomi(&self) -> bool {
        matches!(
            self.budget,
            TimeBudget::Walltime { byoyomi: true, .. }
        )
    }
}
