//! Integration tests for drag, drop and reconciliation against a store

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use taskboard_reorder::{
    Board, CancelReason, Direction, DragPhase, Item, ItemId, ListId, ListLayout, MoveTarget,
    OrderKey, OrderKeySpace, Placement, Point, Reconciliation, Rect, ReorderCommand, ReorderConfig,
    ReorderEngine, ReorderError, ReorderStore, SubmitFailure,
};

/// Store that records what it saved and refuses items on request
#[derive(Default)]
struct MemoryStore {
    failing: Mutex<HashSet<ItemId>>,
    saved: Mutex<Vec<ReorderCommand>>,
}

impl MemoryStore {
    fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(ItemId::from(id));
    }

    fn saved(&self) -> Vec<ReorderCommand> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReorderStore for MemoryStore {
    async fn submit_reorder(&self, command: &ReorderCommand) -> Result<(), SubmitFailure> {
        if self.failing.lock().unwrap().contains(&command.item_id) {
            return Err(SubmitFailure::new("store unavailable"));
        }
        self.saved.lock().unwrap().push(command.clone());
        Ok(())
    }
}

fn key(s: &str) -> OrderKey {
    OrderKey::parse(s).unwrap()
}

fn ids(engine: &ReorderEngine, list: &str) -> Vec<String> {
    engine
        .board()
        .list(&ListId::from(list))
        .unwrap()
        .ids()
        .map(|id| id.to_string())
        .collect()
}

fn placement(engine: &ReorderEngine, id: &str) -> Placement {
    engine.board().item(&ItemId::from(id)).unwrap().placement()
}

/// Every item sits in exactly one list and keys strictly increase per list
fn assert_board_consistent(board: &Board) {
    let mut seen = HashSet::new();
    for list in board.lists() {
        for pair in list.items().windows(2) {
            assert!(
                pair[0].order_key < pair[1].order_key,
                "keys out of order in {}",
                list.id()
            );
        }
        for item in list.items() {
            assert_eq!(&item.list_id, list.id());
            assert!(seen.insert(item.id.clone()), "{} appears twice", item.id);
        }
    }
    assert_eq!(seen.len(), board.item_count());
}

/// Columns "a" and "b", 100 wide with a 20 gap, cards 40 tall from the top
fn column_layout(engine: &ReorderEngine) -> taskboard_reorder::BoardLayout {
    let mut layout = engine.layout();
    for (i, list) in engine.board().lists().enumerate() {
        let x = i as f64 * 120.0;
        let mut column = ListLayout::new(list.id().clone(), Rect::new(x, 0.0, 100.0, 600.0));
        for (row, id) in list.ids().enumerate() {
            column = column.with_item(id.clone(), Rect::new(x, row as f64 * 40.0, 100.0, 40.0));
        }
        layout = layout.with_list(column);
    }
    layout
}

#[tokio::test]
async fn test_reorder_within_list() {
    let mut board = Board::with_lists(["a"]).unwrap();
    board.insert_item(Item::new("x", "a", key("1"))).unwrap();
    board.insert_item(Item::new("y", "a", key("2"))).unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut engine = ReorderEngine::new(board, store.clone());
    let layout = column_layout(&engine);

    engine
        .drag_start(&ItemId::from("x"), Point::new(50.0, 20.0))
        .unwrap();
    let drop = engine
        .drag_move(&layout, Point::new(50.0, 100.0))
        .unwrap()
        .cloned()
        .unwrap();
    assert_eq!(drop.target_list_id, ListId::from("a"));
    assert_eq!(drop.insert_after_item_id, Some(ItemId::from("y")));
    assert_eq!(drop.insert_before_item_id, None);
    assert_eq!(drop.direction, Direction::Down);

    let report = engine.drop(&layout, Point::new(50.0, 100.0)).unwrap();
    let expected = OrderKeySpace::default()
        .key_between(Some(&key("2")), None)
        .unwrap();
    assert_eq!(report.commands, vec![ReorderCommand::new("x", "a", expected)]);
    assert_eq!(ids(&engine, "a"), vec!["y", "x"]);

    let results = engine.flush().await.unwrap();
    assert!(matches!(results[..], [Reconciliation::Confirmed { .. }]));
    assert_eq!(store.saved(), report.commands);
}

#[tokio::test]
async fn test_move_into_empty_list() {
    let mut board = Board::with_lists(["a", "b"]).unwrap();
    board.insert_item(Item::new("z", "a", key("1"))).unwrap();
    board.insert_item(Item::new("w", "a", key("2"))).unwrap();
    let mut engine = ReorderEngine::new(board, Arc::new(MemoryStore::default()));
    let layout = column_layout(&engine);

    engine
        .drag_start(&ItemId::from("z"), Point::new(50.0, 20.0))
        .unwrap();
    let report = engine.drop(&layout, Point::new(170.0, 300.0)).unwrap();
    assert_eq!(
        report.commands,
        vec![ReorderCommand::new("z", "b", OrderKey::initial())]
    );
    assert_eq!(ids(&engine, "a"), vec!["w"]);
    assert_eq!(ids(&engine, "b"), vec!["z"]);
    assert_board_consistent(engine.board());

    engine.flush().await.unwrap();
    assert_eq!(ids(&engine, "b"), vec!["z"]);
}

#[tokio::test]
async fn test_denied_move_changes_nothing() {
    let mut board = Board::with_lists(["a", "b"]).unwrap();
    board.insert_item(Item::new("z", "a", key("1"))).unwrap();
    let store = Arc::new(MemoryStore::default());
    let mut engine = ReorderEngine::new(board, store.clone())
        .with_policy(Arc::new(|_: &ItemId, list: &ListId| list.as_str() != "b"));
    let layout = column_layout(&engine);

    engine
        .drag_start(&ItemId::from("z"), Point::new(50.0, 20.0))
        .unwrap();
    let report = engine.drop(&layout, Point::new(170.0, 20.0)).unwrap();

    assert_eq!(
        report.outcome.cancel_reason(),
        Some(CancelReason::PermissionDenied)
    );
    assert!(report.commands.is_empty());
    assert!(matches!(
        report.error,
        Some(ReorderError::PermissionDenied { .. })
    ));
    assert_eq!(engine.phase(), DragPhase::Idle);
    assert_eq!(placement(&engine, "z"), Placement::new("a", key("1")));
    assert_eq!(engine.queued(), 0);

    engine.flush().await.unwrap();
    assert!(store.saved().is_empty());
}

#[tokio::test]
async fn test_failed_save_rolls_back_cross_list_move() {
    let mut board = Board::with_lists(["a", "b"]).unwrap();
    board.insert_item(Item::new("z", "a", key("5"))).unwrap();
    let store = Arc::new(MemoryStore::default());
    store.fail("z");
    let mut engine = ReorderEngine::new(board, store.clone());
    let layout = column_layout(&engine);

    engine
        .drag_start(&ItemId::from("z"), Point::new(50.0, 20.0))
        .unwrap();
    engine.drop(&layout, Point::new(170.0, 20.0)).unwrap();
    assert_eq!(ids(&engine, "b"), vec!["z"]);

    let results = engine.flush().await.unwrap();
    let [Reconciliation::RolledBack {
        restored, error, ..
    }] = &results[..]
    else {
        panic!("expected a single rollback, got {results:?}");
    };
    assert_eq!(restored, &Placement::new("a", key("5")));
    assert!(error.is_user_visible());
    assert_eq!(error.to_string(), "move could not be saved: store unavailable");

    assert_eq!(ids(&engine, "a"), vec!["z"]);
    assert!(ids(&engine, "b").is_empty());
    assert!(!engine.is_pending(&ItemId::from("z")));
}

#[tokio::test]
async fn test_only_the_failed_item_reverts() {
    let names = ["i0", "i1", "i2", "i3", "i4"];
    let mut board = Board::with_lists(["todo", "done"]).unwrap();
    let mut original = Vec::new();
    let mut lower = None;
    for name in names {
        let k = OrderKeySpace::default()
            .key_between(lower.as_ref(), None)
            .unwrap();
        board.insert_item(Item::new(name, "todo", k.clone())).unwrap();
        original.push(Placement::new("todo", k.clone()));
        lower = Some(k);
    }

    let store = Arc::new(MemoryStore::default());
    store.fail("i2");
    let mut engine = ReorderEngine::new(board, store);
    for name in names {
        engine
            .move_item(&ItemId::from(name), &MoveTarget::EndOf(ListId::from("done")))
            .unwrap();
    }
    assert_eq!(ids(&engine, "done"), names.to_vec());

    let results = engine.flush().await.unwrap();
    assert_eq!(results.iter().filter(|r| r.is_rolled_back()).count(), 1);

    for (i, name) in names.iter().enumerate() {
        let now = placement(&engine, name);
        if i == 2 {
            assert_eq!(now, original[i]);
        } else {
            assert_eq!(now.list_id, ListId::from("done"));
        }
    }
    assert_eq!(ids(&engine, "done"), vec!["i0", "i1", "i3", "i4"]);
    assert_board_consistent(engine.board());
}

#[tokio::test]
async fn test_new_drag_while_save_outstanding() {
    let mut board = Board::with_lists(["a", "b"]).unwrap();
    board.insert_item(Item::new("x", "a", key("1"))).unwrap();
    board.insert_item(Item::new("y", "a", key("2"))).unwrap();
    let mut engine = ReorderEngine::new(board, Arc::new(MemoryStore::default()));

    engine
        .move_item(&ItemId::from("x"), &MoveTarget::Step(Direction::Right))
        .unwrap();
    let submission = engine.take_submissions().pop().unwrap();
    let in_flight = tokio::spawn(engine.submit(submission));

    // The engine is free while the round trip runs
    let layout = column_layout(&engine);
    engine
        .drag_start(&ItemId::from("y"), Point::new(50.0, 10.0))
        .unwrap();
    engine.drag_move(&layout, Point::new(170.0, 60.0)).unwrap();
    engine.drop(&layout, Point::new(170.0, 60.0)).unwrap();

    let result = in_flight.await.unwrap();
    let reconciliation = engine.reconcile(result).unwrap();
    assert!(matches!(reconciliation, Reconciliation::Confirmed { .. }));
    assert!(engine.is_pending(&ItemId::from("y")));
    assert_eq!(ids(&engine, "b"), vec!["x", "y"]);

    engine.flush().await.unwrap();
    assert!(!engine.is_pending(&ItemId::from("y")));
}

#[tokio::test]
async fn test_repeated_moves_rebalance_and_stay_ordered() {
    let mut board = Board::with_lists(["todo"]).unwrap();
    board.insert_item(Item::new("a", "todo", key("1"))).unwrap();
    board.insert_item(Item::new("b", "todo", key("2"))).unwrap();
    board.insert_item(Item::new("c", "todo", key("3"))).unwrap();
    let config = ReorderConfig {
        max_key_len: 4,
        ..ReorderConfig::default()
    };
    let mut engine =
        ReorderEngine::with_config(board, Arc::new(MemoryStore::default()), &config);

    let mut saw_batch = false;
    for _ in 0..40 {
        // Keep pushing the second card to the top
        let second = ids(&engine, "todo")[1].clone();
        let commands = engine
            .move_item(&ItemId::from(second.as_str()), &MoveTarget::Step(Direction::Up))
            .unwrap();
        saw_batch |= commands.len() > 1;
        assert_board_consistent(engine.board());
        for item in engine.board().snapshot() {
            assert!(item.order_key.len() <= 4, "{} grew too long", item.order_key);
        }
    }
    assert!(saw_batch, "expected at least one renumbering");

    let results = engine.flush().await.unwrap();
    assert!(results
        .iter()
        .all(|r| matches!(r, Reconciliation::Confirmed { .. })));
}

#[tokio::test]
async fn test_keyboard_moves_follow_board_order() {
    let mut board = Board::with_lists(["todo", "doing", "done"]).unwrap();
    board.insert_item(Item::new("a", "todo", key("1"))).unwrap();
    board.insert_item(Item::new("b", "todo", key("2"))).unwrap();
    let mut engine = ReorderEngine::new(board, Arc::new(MemoryStore::default()));

    engine
        .move_item(&ItemId::from("b"), &MoveTarget::Step(Direction::Up))
        .unwrap();
    assert_eq!(ids(&engine, "todo"), vec!["b", "a"]);

    engine
        .move_item(&ItemId::from("a"), &MoveTarget::Step(Direction::Right))
        .unwrap();
    engine
        .move_item(&ItemId::from("a"), &MoveTarget::Step(Direction::Right))
        .unwrap();
    assert_eq!(ids(&engine, "done"), vec!["a"]);

    // Past the right edge: nothing to do
    let commands = engine
        .move_item(&ItemId::from("a"), &MoveTarget::Step(Direction::Right))
        .unwrap();
    assert!(commands.is_empty());

    engine
        .move_item(&ItemId::from("b"), &MoveTarget::StartOf(ListId::from("done")))
        .unwrap();
    assert_eq!(ids(&engine, "done"), vec!["b", "a"]);
    assert!(ids(&engine, "todo").is_empty());
    assert_board_consistent(engine.board());
}

#[tokio::test]
async fn test_refresh_keeps_optimistic_moves() {
    let mut board = Board::with_lists(["todo", "done"]).unwrap();
    board.insert_item(Item::new("a", "todo", key("1"))).unwrap();
    board.insert_item(Item::new("b", "todo", key("2"))).unwrap();
    let store = Arc::new(MemoryStore::default());
    store.fail("a");
    let mut engine = ReorderEngine::new(board, store);

    engine
        .move_item(&ItemId::from("a"), &MoveTarget::EndOf(ListId::from("done")))
        .unwrap();

    // Someone else moved a to the end of todo and added c
    engine
        .refresh(vec![
            Item::new("a", "todo", key("3")),
            Item::new("b", "todo", key("2")),
            Item::new("c", "done", key("a")),
        ])
        .unwrap();
    assert_eq!(ids(&engine, "done"), vec!["a", "c"]);

    // The failed save lands a where the remote put it
    engine.flush().await.unwrap();
    assert_eq!(ids(&engine, "todo"), vec!["b", "a"]);
    assert_eq!(placement(&engine, "a"), Placement::new("todo", key("3")));
    assert_board_consistent(engine.board());
}
