//! Converts front-end time information into search stop conditions.
//!
//! Games budgets pass straight through. Wall-clock budgets get a soft
//! (`desired`) and a hard (`worst`) deadline: byoyomi centers the
//! recommendation between the two, main time ramps the soft budget up
//! through the opening and spreads the remaining clock from the
//! endgame's start.

use std::time::{Duration, Instant};

use tracing::debug;

use engine_core::{Board, TimeBudget, TimeInfo, TimePeriod};
use engine_config::{defaults, UctConfig};

/// Use at most 3 times the desired time on a single move in main time,
/// and 1.1 times in byoyomi.
const MAX_MAIN_TIME_EXTENSION: f64 = 3.0;
const MAX_BYOYOMI_TIME_EXTENSION: f64 = 1.1;

/// Never plan for fewer moves than this still to come.
const MIN_MOVES_LEFT: f64 = 30.0;

/// When to stop searching: either a playout budget or absolute
/// wall-clock instants. Both deadlines may legitimately lie in the past
/// (lag); the controller still polls at least once.
#[derive(Debug, Clone, Copy)]
pub enum StopConditions {
    Games { desired: u32, worst: u32 },
    Walltime { desired: Instant, worst: Instant },
}

/// Pre-process `time_info` into stop conditions for the controller.
pub fn time_prep<B: Board>(ti: &TimeInfo, cfg: &UctConfig, board: &B) -> StopConditions {
    assert!(
        ti.period != TimePeriod::Total,
        "per-move time info required; the front-end must fold down total time"
    );

    match ti.budget {
        TimeBudget::Games { games } => {
            let games = if ti.period == TimePeriod::None || games == 0 {
                defaults::MC_GAMES
            } else {
                games
            };
            // worst == desired: the controller will not hold out for
            // best == winner.
            StopConditions::Games {
                desired: games,
                worst: games,
            }
        }
        TimeBudget::Walltime {
            recommended,
            max,
            timer_start,
            net_lag,
            byoyomi,
        } => {
            let bsize = (board.size().saturating_sub(2)).pow(2) as f64;
            let (desired, worst) = walltime_budget(
                recommended.as_secs_f64(),
                max.as_secs_f64(),
                byoyomi,
                board.move_count() as f64,
                bsize,
                board.estimated_moves_left() as f64,
                cfg,
            );
            debug!(desired, worst, "wall-clock allocation");
            StopConditions::Walltime {
                desired: deadline(timer_start, desired, net_lag),
                worst: deadline(timer_start, worst, net_lag),
            }
        }
    }
}

/// The pure allocation: seconds of desired and worst-case time for this
/// move.
fn walltime_budget(
    recommended: f64,
    max_time: f64,
    byoyomi: bool,
    moves: f64,
    bsize: f64,
    est_moves_left: f64,
    cfg: &UctConfig,
) -> (f64, f64) {
    let mut desired = recommended;
    let worst;
    if byoyomi {
        // Make recommended the average of desired and worst.
        worst = desired * MAX_BYOYOMI_TIME_EXTENSION;
        desired *= 2.0 - MAX_BYOYOMI_TIME_EXTENSION;
    } else {
        let fuseki_end = cfg.fuseki_end as f64 * bsize / 100.0;
        let yose_start = cfg.yose_start as f64 * bsize / 100.0;

        // Moves we still have to play ourselves once yose starts.
        let left_at_yose_start =
            ((moves - yose_start) / 2.0 + est_moves_left).max(MIN_MOVES_LEFT);
        let longest = max_time / left_at_yose_start;
        if longest < desired {
            // The recommendation already exceeds what the clock can
            // sustain; keep it and let the clamps below bound it.
        } else if moves < fuseki_end {
            desired += (longest - desired) * moves / fuseki_end;
        } else if moves < yose_start {
            desired = longest;
        }
        worst = desired * MAX_MAIN_TIME_EXTENSION;
    }
    let worst = worst.min(max_time);
    let desired = desired.min(worst);
    (desired, worst)
}

fn deadline(timer_start: Instant, seconds: f64, net_lag: Duration) -> Instant {
    (timer_start + Duration::from_secs_f64(seconds.max(0.0)))
        .checked_sub(net_lag)
        .unwrap_or(timer_start)
}
