//! Keyboard and programmatic moves.
//!
//! A [`MoveTarget`] names where an item should go relative to where it is
//! now. It resolves to the same [`DropPosition`] a drag would produce, so
//! moves go through the command builder with identical permission, no-op
//! and rebalance rules.

use crate::error::{ReorderError, Result};
use crate::geometry::Direction;
use crate::resolver::DropPosition;
use crate::types::{Board, Item, ItemId, ListId};
use serde::{Deserialize, Serialize};
use MoveTarget::{EndOf, StartOf, Step};

/// Where a non-pointer move sends an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    /// Up/Down swap with the neighbor; Left/Right hop to the adjacent list
    /// at the same index
    Step(Direction),
    StartOf(ListId),
    EndOf(ListId),
}

/// Resolve `target` for `item_id` against the current board.
///
/// Returns `None` when the move would leave the board (stepping up from the
/// first item, right from the last list, and so on).
pub fn resolve_move(
    board: &Board,
    item_id: &ItemId,
    target: &MoveTarget,
) -> Result<Option<DropPosition>> {
    let item = board
        .item(item_id)
        .ok_or_else(|| ReorderError::item_not_found(item_id))?;
    let home = board
        .list(&item.list_id)
        .ok_or_else(|| ReorderError::list_not_found(&item.list_id))?;
    let index = home
        .position(item_id)
        .ok_or_else(|| ReorderError::item_not_found(item_id))?;

    let position = match target {
        Step(direction @ Direction::Up) => {
            let Some(slot) = index.checked_sub(1) else {
                return Ok(None);
            };
            let others: Vec<&Item> = home.without(item_id).collect();
            at_slot(&item.list_id, &others, slot, *direction)
        }
        Step(direction @ Direction::Down) => {
            if index + 1 >= home.len() {
                return Ok(None);
            }
            let others: Vec<&Item> = home.without(item_id).collect();
            at_slot(&item.list_id, &others, index + 1, *direction)
        }
        Step(direction @ (Direction::Left | Direction::Right)) => {
            let column = board
                .list_index(&item.list_id)
                .ok_or_else(|| ReorderError::list_not_found(&item.list_id))?;
            let neighbor = match direction {
                Direction::Left => column.checked_sub(1),
                _ => Some(column + 1),
            };
            let Some(list) = neighbor.and_then(|i| board.list_at(i)) else {
                return Ok(None);
            };
            let others: Vec<&Item> = list.items().iter().collect();
            at_slot(list.id(), &others, index.min(others.len()), *direction)
        }
        StartOf(list_id) | EndOf(list_id) => {
            let list = board
                .list(list_id)
                .ok_or_else(|| ReorderError::list_not_found(list_id))?;
            let others: Vec<&Item> = list.without(item_id).collect();
            match target {
                StartOf(_) => at_slot(list_id, &others, 0, Direction::Up),
                _ => at_slot(list_id, &others, others.len(), Direction::Down),
            }
        }
    };
    Ok(Some(position))
}

fn at_slot(list_id: &ListId, others: &[&Item], slot: usize, direction: Direction) -> DropPosition {
    let after = slot
        .checked_sub(1)
        .and_then(|i| others.get(i))
        .map(|i| i.id.clone());
    let before = others.get(slot).map(|i| i.id.clone());
    DropPosition::new(list_id.clone(), after, before).with_direction(direction)
}
