//! Per-point ownership histogram fed by playouts.
//!
//! Every completed playout bumps, for each board point, the counter of
//! the color that owned it at playout end. Judgements feed pass-safety
//! decisions and dead-group reporting. Workers update the map with
//! relaxed atomic increments; the controller reads it when idle.

use std::sync::atomic::{AtomicU32, Ordering};

use engine_core::{Board, Color, Group, Point};

/// Required share of one color before a point is considered settled.
pub const GJ_THRES: f32 = 0.8;
/// Looser fallback threshold used by the display hook.
pub const GJ_THRES_LOOSE: f32 = 0.67;
/// Playouts to accumulate before any group judgement is trusted.
pub const GJ_MINGAMES: u32 = 500;

/// Judgement of a single point. Variant order matches the display
/// characters `: X O ,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointJudgement {
    Dame,
    Black,
    White,
    Unclear,
}

/// Judgement of a whole group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStatus {
    Alive,
    Dead,
    Unknown,
}

/// Ownership counters: `[dame, black, white]` per point plus the number
/// of playouts folded in. Lifetime is the engine's, not the tree's.
#[derive(Debug)]
pub struct OwnerMap {
    counts: Box<[[AtomicU32; 3]]>,
    playouts: AtomicU32,
}

fn owner_index(owner: Color) -> usize {
    match owner {
        Color::Black => 1,
        Color::White => 2,
        _ => 0,
    }
}

impl OwnerMap {
    pub fn new(points: usize) -> Self {
        let counts = (0..points)
            .map(|_| [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)])
            .collect();
        Self {
            counts,
            playouts: AtomicU32::new(0),
        }
    }

    /// Forget everything; called when a new move is prepared.
    pub fn reset(&self) {
        self.playouts.store(0, Ordering::Relaxed);
        for point in self.counts.iter() {
            for counter in point {
                counter.store(0, Ordering::Relaxed);
            }
        }
    }

    pub fn playouts(&self) -> u32 {
        self.playouts.load(Ordering::Relaxed)
    }

    /// Start recording one playout. Bumped before the per-point counters
    /// so their sums never exceed the playout count.
    pub fn begin_game(&self) {
        self.playouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_owner(&self, point: Point, owner: Color) {
        self.counts[point.index()][owner_index(owner)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn point_counts(&self, point: Point) -> [u32; 3] {
        let c = &self.counts[point.index()];
        [
            c[0].load(Ordering::Relaxed),
            c[1].load(Ordering::Relaxed),
            c[2].load(Ordering::Relaxed),
        ]
    }

    /// Classify a point: a color (or dame) owning more than `thres` of
    /// the playouts wins, anything else is unclear.
    pub fn judge_point(&self, point: Point, thres: f32) -> PointJudgement {
        let playouts = self.playouts();
        if playouts == 0 {
            return PointJudgement::Unclear;
        }
        let [dame, black, white] = self.point_counts(point);
        let total = playouts as f32;
        if dame as f32 / total >= thres {
            PointJudgement::Dame
        } else if black as f32 / total >= thres {
            PointJudgement::Black
        } else if white as f32 / total >= thres {
            PointJudgement::White
        } else {
            PointJudgement::Unclear
        }
    }

    /// Display character for a point: `:XO,` at the strict threshold,
    /// with a lowercase `x`/`o` retry at the loose threshold when the
    /// strict judgement is unclear.
    pub fn owner_char(&self, point: Point) -> char {
        match self.judge_point(point, GJ_THRES) {
            PointJudgement::Dame => ':',
            PointJudgement::Black => 'X',
            PointJudgement::White => 'O',
            PointJudgement::Unclear => match self.judge_point(point, GJ_THRES_LOOSE) {
                PointJudgement::Dame => ':',
                PointJudgement::Black => 'x',
                PointJudgement::White => 'o',
                PointJudgement::Unclear => ',',
            },
        }
    }

    /// Classify a group by majority vote of its stones' judgements.
    pub fn judge_group(&self, group: &Group, thres: f32) -> GroupStatus {
        let mut own = 0usize;
        let mut opponent = 0usize;
        for &p in &group.stones {
            match self.judge_point(p, thres) {
                PointJudgement::Black if group.color == Color::Black => own += 1,
                PointJudgement::White if group.color == Color::White => own += 1,
                PointJudgement::Black | PointJudgement::White => opponent += 1,
                _ => {}
            }
        }
        if opponent * 2 > group.stones.len() {
            GroupStatus::Dead
        } else if own * 2 > group.stones.len() {
            GroupStatus::Alive
        } else {
            GroupStatus::Unknown
        }
    }

    /// All groups on `board` currently judged dead.
    pub fn dead_groups<B: Board>(&self, board: &B) -> Vec<Group> {
        board
            .groups()
            .into_iter()
            .filter(|g| self.judge_group(g, GJ_THRES) == GroupStatus::Dead)
            .collect()
    }
}

/// Would passing now concede anything? Requires enough playouts to trust
/// the ownership estimate, then scores the board with the judged-dead
/// groups removed.
pub fn pass_is_safe<B: Board>(
    map: &OwnerMap,
    board: &B,
    color: Color,
    pass_all_alive: bool,
) -> bool {
    if map.playouts() < GJ_MINGAMES {
        return false;
    }
    let dead = if pass_all_alive {
        Vec::new()
    } else {
        map.dead_groups(board)
    };
    let score = board.score_with_dead(&dead);
    match color {
        Color::Black => score > 0.0,
        Color::White => score < 0.0,
        _ => false,
    }
}
