//! Opening book persistence.
//!
//! The book is a JSON tree of `(coordinate, playouts, value)` records,
//! one file per board size. Loading seeds the statistics of a fresh
//! search tree: every book node is expanded through the regular
//! expansion path (so the search is never restricted to book moves) and
//! the recorded experience is added on top of the priors.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use engine_core::{Board, Coord, Move, PlayoutPolicy, Point, Prior};

use crate::node::NodeId;
use crate::tree::Tree;

#[derive(Debug, Serialize, Deserialize)]
struct BookNode {
    /// Point index, or -1 for a pass.
    coord: i32,
    playouts: u32,
    value: f32,
    #[serde(default)]
    children: Vec<BookNode>,
}

fn encode_coord(coord: Coord) -> i32 {
    match coord {
        Coord::Point(p) => p.0 as i32,
        _ => -1,
    }
}

fn decode_coord(code: i32, points: usize) -> Option<Coord> {
    if code < 0 {
        Some(Coord::Pass)
    } else if (code as usize) < points {
        Some(Coord::Point(Point(code as u16)))
    } else {
        None
    }
}

pub fn book_path(dir: &Path, board_size: usize) -> PathBuf {
    dir.join(format!("uctbook-{board_size}.json"))
}

/// Save the subtrees of `tree` whose nodes have at least `min_playouts`
/// direct playouts.
pub fn tree_save(
    tree: &Tree,
    board_size: usize,
    dir: &Path,
    min_playouts: u32,
) -> io::Result<()> {
    let record = collect(tree, tree.root_id(), min_playouts.max(1));
    let json = serde_json::to_string(&record)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let path = book_path(dir, board_size);
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "opening book saved");
    Ok(())
}

fn collect(tree: &Tree, id: NodeId, min_playouts: u32) -> BookNode {
    let node = tree.node(id);
    BookNode {
        coord: encode_coord(node.coord()),
        playouts: node.u.playouts(),
        value: node.u.value(),
        children: tree
            .children_range(id)
            .map(NodeId)
            .filter(|&c| tree.node(c).u.playouts() >= min_playouts)
            .map(|c| collect(tree, c, min_playouts))
            .collect(),
    }
}

/// Load the book for `board`'s size into a fresh tree, if one exists.
/// Returns whether anything was loaded. A missing book is not an error.
pub fn tree_load<B: Board>(
    tree: &Tree,
    board: &B,
    dir: &Path,
    prior: &dyn Prior<B>,
    playout: &dyn PlayoutPolicy<B>,
) -> bool {
    let path = book_path(dir, board.size());
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(_) => {
            debug!(path = %path.display(), "no opening book");
            return false;
        }
    };
    let record: BookNode = match serde_json::from_str(&data) {
        Ok(record) => record,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed opening book ignored");
            return false;
        }
    };

    seed(tree, tree.root_id(), board, &record, prior, playout);
    info!(path = %path.display(), "opening book loaded");
    true
}

fn seed<B: Board>(
    tree: &Tree,
    id: NodeId,
    board: &B,
    record: &BookNode,
    prior: &dyn Prior<B>,
    playout: &dyn PlayoutPolicy<B>,
) {
    let node = tree.node(id);
    node.u
        .add_games(record.playouts, record.playouts as f32 * record.value);
    if record.children.is_empty() {
        return;
    }

    let to_move = node.color().opposite();
    if !node.is_expanded() {
        tree.expand(id, board, to_move, prior, playout);
    }
    for child_record in &record.children {
        let Some(coord) = decode_coord(child_record.coord, board.num_points()) else {
            continue;
        };
        let Some(child_id) = tree.find_child(id, coord) else {
            continue;
        };
        let mut next = board.clone();
        if next.play(Move::new(coord, to_move)).is_err() {
            continue;
        }
        seed(tree, child_id, &next, child_record, prior, playout);
    }
}
