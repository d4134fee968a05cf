//! Search benchmarks for performance profiling.
//!
//! Run with: `cargo bench -p uct`
//!
//! These benchmarks measure:
//! - Full searches with varying playout budgets
//! - Single playout iterations from different game phases
//! - Tree operations (expansion, copy, merge)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use engine_config::UctConfig;
use engine_core::{Board, Color, Coord, EvenPrior, LightPlayout, Move, TimeInfo};
use games_go::GoBoard;
use uct::{uct_playout, uct_search, SearchEnv, Tree};

fn search_env(board: &GoBoard) -> Arc<SearchEnv<GoBoard>> {
    Arc::new(SearchEnv::new(
        UctConfig::for_testing(),
        board,
        Box::new(LightPlayout::new()),
        Box::new(EvenPrior::new(2)),
    ))
}

/// A midgame 9x9 position: a handful of stones on both sides.
fn midgame_board() -> GoBoard {
    let mut board = GoBoard::new(9, 7.5);
    let moves = [
        (4usize, 4usize, Color::Black),
        (2, 2, Color::White),
        (6, 2, Color::Black),
        (2, 6, Color::White),
        (6, 6, Color::Black),
        (4, 2, Color::White),
    ];
    for (x, y, color) in moves {
        let p = engine_core::Point((y * 9 + x) as u16);
        board.play(Move::new(Coord::Point(p), color)).unwrap();
    }
    board
}

fn bench_search_budgets(c: &mut Criterion) {
    let mut group = c.benchmark_group("uct_search_budgets");

    for games in [100u32, 400, 1600] {
        group.throughput(Throughput::Elements(games as u64));
        group.bench_with_input(BenchmarkId::new("empty_9x9", games), &games, |b, &games| {
            let board = GoBoard::new(9, 7.5);
            let env = search_env(&board);

            b.iter(|| {
                let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));
                black_box(uct_search(
                    &env,
                    &tree,
                    &board,
                    &TimeInfo::games(games),
                    Color::Black,
                    1,
                ))
            });
        });
    }

    group.finish();
}

fn bench_playout_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("uct_playout_phases");

    group.bench_function("opening", |b| {
        let board = GoBoard::new(9, 7.5);
        let env = search_env(&board);
        let tree = Tree::init(Color::Black, 8 * 1024 * 1024, false);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        b.iter(|| black_box(uct_playout(&env, &board, Color::Black, &tree, &mut rng)));
    });

    group.bench_function("midgame", |b| {
        let board = midgame_board();
        let env = search_env(&board);
        let tree = Tree::init(board.to_move(), 8 * 1024 * 1024, false);
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        b.iter(|| black_box(uct_playout(&env, &board, board.to_move(), &tree, &mut rng)));
    });

    group.finish();
}

fn bench_tree_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("uct_tree_ops");

    group.bench_function("expand_root", |b| {
        let board = GoBoard::new(9, 7.5);
        let prior = EvenPrior::new(2);
        let playout = LightPlayout::new();

        b.iter(|| {
            let tree = Tree::init(Color::Black, 8 * 1024 * 1024, false);
            black_box(tree.expand(tree.root_id(), &board, Color::Black, &prior, &playout))
        });
    });

    group.bench_function("copy_searched_tree", |b| {
        let board = GoBoard::new(9, 7.5);
        let env = search_env(&board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));
        uct_search(&env, &tree, &board, &TimeInfo::games(400), Color::Black, 1);

        b.iter(|| black_box(tree.copy()));
    });

    group.bench_function("merge_searched_trees", |b| {
        let board = GoBoard::new(9, 7.5);
        let env = search_env(&board);
        let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));
        uct_search(&env, &tree, &board, &TimeInfo::games(400), Color::Black, 1);
        let other = tree.copy();

        b.iter(|| {
            let dst = tree.copy();
            dst.merge(&other);
            dst.normalize(2);
            black_box(dst.nodes_used())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_search_budgets,
    bench_playout_phases,
    bench_tree_operations,
);

criterion_main!(benches);
