//! End-to-end engine scenarios on the reference Go board.

use std::sync::Arc;
use std::time::Duration;

use engine_config::{ThreadModel, UctConfig};
use engine_core::{Board, Color, Coord, EvenPrior, LightPlayout, Move, TimeInfo};
use games_go::GoBoard;
use uct::{uct_search, SearchEnv, Tree, UctEngine};

fn test_config(seed: u64) -> UctConfig {
    UctConfig::for_testing().with_seed(seed)
}

fn search_env(cfg: UctConfig, board: &GoBoard) -> Arc<SearchEnv<GoBoard>> {
    Arc::new(SearchEnv::new(
        cfg,
        board,
        Box::new(LightPlayout::new()),
        Box::new(EvenPrior::new(2)),
    ))
}

/// A 9x9 position where Black owns all but a small living white corner:
/// roughly 66 points to 15 before komi.
fn black_dominates() -> GoBoard {
    GoBoard::from_diagram(
        9,
        &[
            "...XOOOOO",
            "...XO.O.O",
            "...XOOOOO",
            "...XXXXXX",
            ".........",
            ".X.......",
            ".........",
            "...X.....",
            ".........",
        ],
        Color::Black,
        0.5,
    )
}

#[test]
fn test_genmove_on_empty_board_returns_legal_move() {
    let mut board = GoBoard::new(9, 7.5);
    let mut engine = UctEngine::new(test_config(1), &board).unwrap();

    let coord = engine.genmove(&mut board, &TimeInfo::games(1000), Color::Black, false);
    let point = coord.point().expect("empty board move should be on-board");
    assert!(board.is_legal(point, Color::Black));
    // One ownership update per playout, and nothing more.
    assert_eq!(engine.ownermap().playouts(), 1000);
}

#[test]
fn test_search_runs_exactly_the_requested_games() {
    let board = GoBoard::new(9, 7.5);
    let env = search_env(test_config(1), &board);
    let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

    let games = uct_search(&env, &tree, &board, &TimeInfo::games(1000), Color::Black, 1);
    assert_eq!(games, 1000);
    assert_eq!(tree.root_node().u.playouts(), 1000);
    assert_eq!(env.ownermap.playouts(), 1000);
}

#[test]
fn test_passes_when_opponent_passed_and_position_is_safe() {
    let mut board = black_dominates();
    // The opponent has just passed with Black clearly ahead.
    board.play(Move::new(Coord::Pass, Color::Black)).unwrap();
    board.play(Move::new(Coord::Pass, Color::White)).unwrap();

    let mut engine = UctEngine::new(test_config(2), &board).unwrap();
    let coord = engine.genmove(&mut board, &TimeInfo::games(1500), Color::Black, false);
    assert_eq!(coord, Coord::Pass);
}

#[test]
fn test_resigns_a_lost_position() {
    // On a 3x3 board with komi 15 Black can never catch up: every
    // playout is lost, and once the best child has enough evidence the
    // engine gives up. Margin blending keeps point moves ahead of the
    // pass (losing by less), so the best child is resignable.
    let mut board = GoBoard::new(3, 15.0);
    let mut cfg = test_config(3);
    cfg.val_scale = 0.5;
    cfg.val_points = 30;
    cfg.val_extra = false;
    let mut engine = UctEngine::new(cfg, &board).unwrap();

    let coord = engine.genmove(&mut board, &TimeInfo::games(8000), Color::Black, false);
    assert_eq!(coord, Coord::Resign);
    // Resigning drops the game state.
    assert!(engine.tree().is_none());
}

#[test]
fn test_promotion_keeps_the_chosen_subtree() {
    let mut board = GoBoard::new(9, 7.5);
    let mut engine = UctEngine::new(test_config(4), &board).unwrap();

    let coord = engine.genmove(&mut board, &TimeInfo::games(500), Color::Black, false);
    board.play(Move::new(coord, Color::Black)).unwrap();

    // The front-end notifies the move we just played; the tree must
    // stay promoted to its subtree.
    engine.notify_play(&board, Move::new(coord, Color::Black));

    let tree = engine.tree().expect("tree survives promotion");
    assert_eq!(tree.root_node().coord(), coord);
    assert_eq!(tree.root_color(), Color::White);
    assert!(tree.root_node().u.playouts() > 0);
}

#[test]
fn test_promotion_follows_the_opponent_move() {
    let mut board = GoBoard::new(9, 7.5);
    let mut engine = UctEngine::new(test_config(5), &board).unwrap();

    let ours = engine.genmove(&mut board, &TimeInfo::games(500), Color::Black, false);
    board.play(Move::new(ours, Color::Black)).unwrap();
    engine.notify_play(&board, Move::new(ours, Color::Black));

    // Opponent answers; their node becomes the root.
    let reply = board.legal_points(Color::White)[0];
    board.play(Move::new(Coord::Point(reply), Color::White)).unwrap();
    engine.notify_play(&board, Move::new(Coord::Point(reply), Color::White));

    let tree = engine.tree().expect("tree survives promotion");
    assert_eq!(tree.root_color(), Color::Black);
    // The root is either the promoted reply node or a fresh flipped
    // tree when the reply had never been explored.
    if tree.root_node().u.playouts() > 0 {
        assert_eq!(tree.root_node().coord(), Coord::Point(reply));
    }
}

#[test]
#[should_panic(expected = "Non-alternating")]
fn test_non_alternating_play_is_fatal() {
    let mut board = GoBoard::new(9, 7.5);
    let mut engine = UctEngine::new(test_config(6), &board).unwrap();

    let a = Coord::Point(board.legal_points(Color::Black)[0]);
    board.play(Move::new(a, Color::Black)).unwrap();
    engine.notify_play(&board, Move::new(a, Color::Black));

    let b = Coord::Point(board.legal_points(Color::Black)[1]);
    board.play(Move::new(b, Color::Black)).unwrap();
    engine.notify_play(&board, Move::new(b, Color::Black));
}

#[test]
fn test_parallel_aggregates_match_tree_growth() {
    let board = GoBoard::new(9, 7.5);
    let cfg = test_config(7)
        .with_threads(4)
        .with_thread_model(ThreadModel::TreeVl);
    let env = search_env(cfg, &board);
    let tree = Arc::new(Tree::init(Color::Black, 8 * 1024 * 1024, false));

    let games = uct_search(&env, &tree, &board, &TimeInfo::games(1000), Color::Black, 7);
    let playouts = tree.root_node().u.playouts();
    // Every worker playout lands in the shared root exactly once.
    assert_eq!(games, playouts);
    // The budget may be overshot by at most one in-flight playout per
    // worker.
    assert!(playouts >= 1000);
    assert!(playouts <= 1004);
}

#[test]
fn test_single_thread_determinism_under_forced_seed() {
    let run = || {
        let mut board = GoBoard::new(9, 7.5);
        let mut engine = UctEngine::new(test_config(42), &board).unwrap();
        engine.genmove(&mut board, &TimeInfo::games(600), Color::Black, false)
    };
    assert_eq!(run(), run());
}

#[test]
fn test_pondering_starts_and_stops() {
    let mut board = GoBoard::new(9, 7.5);
    let mut cfg = test_config(8);
    cfg.pondering = true;
    let mut engine = UctEngine::new(cfg, &board).unwrap();

    let ours = engine.genmove(&mut board, &TimeInfo::games(300), Color::Black, false);
    assert!(engine.is_pondering());
    board.play(Move::new(ours, Color::Black)).unwrap();

    // Give the background search a moment to accumulate playouts.
    std::thread::sleep(Duration::from_millis(150));

    let reply = board.legal_points(Color::White)[0];
    board.play(Move::new(Coord::Point(reply), Color::White)).unwrap();
    engine.notify_play(&board, Move::new(Coord::Point(reply), Color::White));
    assert!(!engine.is_pondering());

    engine.done();
    assert!(engine.tree().is_none());
}

#[test]
fn test_dead_group_list_mocks_and_cleans_state() {
    let board = GoBoard::from_diagram(
        3,
        &[
            ".X.", //
            ".XO",
            ".X.",
        ],
        Color::Black,
        0.0,
    );
    let mut engine = UctEngine::new(test_config(9), &board).unwrap();

    // No genmove has happened: the engine mocks a transient state.
    let dead = engine.dead_group_list(&board);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].color, Color::White);
    // The mock-up is gone so a later genmove starts clean.
    assert!(engine.tree().is_none());
}

#[test]
fn test_chat_reports_winrate() {
    let mut board = GoBoard::new(9, 7.5);
    let mut engine = UctEngine::new(test_config(10), &board).unwrap();

    assert_eq!(
        engine.chat(&board, "winrate").as_deref(),
        Some("no game context (yet?)")
    );
    assert!(engine.chat(&board, "help").is_none());

    engine.genmove(&mut board, &TimeInfo::games(300), Color::Black, false);
    let reply = engine.chat(&board, "winrate").unwrap();
    assert!(reply.contains("playouts"));
    assert!(reply.contains("probability"));
}

#[test]
fn test_printhook_emits_ownership_characters() {
    let mut board = black_dominates();
    let mut engine = UctEngine::new(test_config(11), &board).unwrap();
    engine.genmove(&mut board, &TimeInfo::games(800), Color::Black, false);

    let mut out = String::new();
    for i in 0..board.num_points() {
        engine
            .printhook(&board, engine_core::Point(i as u16), &mut out)
            .unwrap();
    }
    // Every point renders as one of the judgement characters.
    let chars: Vec<char> = out.chars().filter(|c| !c.is_whitespace()).collect();
    assert_eq!(chars.len(), board.num_points());
    assert!(chars.iter().all(|c| ":XO,xo".contains(*c)));
    // A clearly black-held point must show up as such somewhere.
    assert!(chars.contains(&'X'));
}

#[test]
fn test_superko_violation_is_only_a_warning() {
    let mut board = GoBoard::new(5, 0.0);
    let mut engine = UctEngine::new(test_config(12), &board).unwrap();

    let play = |b: &mut GoBoard, x: usize, y: usize, c: Color| {
        let p = engine_core::Point((y * 5 + x) as u16);
        b.play(Move::new(Coord::Point(p), c)).unwrap();
    };
    // Build a ko, take it, pass twice, retake: positional superko.
    play(&mut board, 1, 2, Color::Black);
    play(&mut board, 2, 2, Color::White);
    play(&mut board, 0, 1, Color::Black);
    play(&mut board, 3, 1, Color::White);
    play(&mut board, 1, 0, Color::Black);
    play(&mut board, 2, 0, Color::White);
    play(&mut board, 2, 1, Color::Black);
    play(&mut board, 1, 1, Color::White);
    board.play(Move::new(Coord::Pass, Color::Black)).unwrap();
    board.play(Move::new(Coord::Pass, Color::White)).unwrap();
    play(&mut board, 2, 1, Color::Black);
    assert!(board.superko_violation());

    // The engine warns, clears the flag and still produces a move.
    let coord = engine.genmove(&mut board, &TimeInfo::games(200), Color::White, false);
    assert!(!board.superko_violation());
    assert!(!coord.is_resign());
}
