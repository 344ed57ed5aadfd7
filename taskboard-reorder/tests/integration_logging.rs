//! Integration tests for the warnings the engine logs

use async_trait::async_trait;
use std::sync::Arc;
use taskboard_reorder::{
    Board, Item, ItemId, ListId, MoveTarget, OrderKey, Point, ReorderCommand, ReorderEngine,
    ReorderError, ReorderStore, SubmitFailure,
};
use tracing_test::traced_test;

struct Offline;

#[async_trait]
impl ReorderStore for Offline {
    async fn submit_reorder(&self, _command: &ReorderCommand) -> Result<(), SubmitFailure> {
        Err(SubmitFailure::new("offline"))
    }
}

fn engine() -> ReorderEngine {
    let mut board = Board::with_lists(["todo", "done"]).unwrap();
    board
        .insert_item(Item::new("a", "todo", OrderKey::initial()))
        .unwrap();
    ReorderEngine::new(board, Arc::new(Offline))
}

#[test]
#[traced_test]
fn test_second_drag_start_is_logged_and_ignored() {
    let mut engine = engine();
    engine
        .drag_start(&ItemId::from("a"), Point::new(10.0, 10.0))
        .unwrap();
    let err = engine
        .drag_start(&ItemId::from("a"), Point::new(10.0, 10.0))
        .unwrap_err();

    assert!(matches!(err, ReorderError::InvalidState { .. }));
    assert!(!err.is_user_visible());
    assert!(logs_contain("ignoring gesture event"));
    assert!(logs_contain("drag started"));
}

#[test]
#[traced_test]
fn test_cancel_while_idle_is_logged() {
    let mut engine = engine();
    assert!(engine.cancel().is_err());
    assert!(logs_contain("ignoring gesture event"));
}

#[tokio::test]
#[traced_test]
async fn test_rollback_is_logged() {
    let mut engine = engine();
    engine
        .move_item(&ItemId::from("a"), &MoveTarget::EndOf(ListId::from("done")))
        .unwrap();
    let results = engine.flush().await.unwrap();

    assert!(results[0].is_rolled_back());
    assert!(logs_contain("rolling back reorder"));
    assert_eq!(
        engine.board().item(&ItemId::from("a")).unwrap().list_id,
        ListId::from("todo")
    );
}
