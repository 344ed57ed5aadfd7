//! Reorder commands: the minimal mutations that realize a drop.

use crate::error::{ReorderError, Result};
use crate::resolver::DropPosition;
use crate::types::{Board, Item, ItemId, ListId, OrderKey, OrderKeySpace, Placement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Target state of one item after a reorder.
///
/// Carries the full placement rather than a delta, so resubmitting the same
/// command is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReorderCommand {
    pub item_id: ItemId,
    pub new_list_id: ListId,
    pub new_order_key: OrderKey,
}

impl ReorderCommand {
    pub fn new(
        item_id: impl Into<ItemId>,
        new_list_id: impl Into<ListId>,
        new_order_key: OrderKey,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            new_list_id: new_list_id.into(),
            new_order_key,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            list_id: self.new_list_id.clone(),
            order_key: self.new_order_key.clone(),
        }
    }
}

/// Decides whether an item may land in a list
pub trait ReorderPolicy: Send + Sync {
    fn can_reorder(&self, item_id: &ItemId, destination: &ListId) -> bool;
}

/// Policy that accepts every move
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ReorderPolicy for AllowAll {
    fn can_reorder(&self, _item_id: &ItemId, _destination: &ListId) -> bool {
        true
    }
}

impl<F> ReorderPolicy for F
where
    F: Fn(&ItemId, &ListId) -> bool + Send + Sync,
{
    fn can_reorder(&self, item_id: &ItemId, destination: &ListId) -> bool {
        self(item_id, destination)
    }
}

/// Turns resolved drops into reorder commands
#[derive(Clone)]
pub struct CommandBuilder {
    key_space: OrderKeySpace,
    policy: Arc<dyn ReorderPolicy>,
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("key_space", &self.key_space)
            .finish_non_exhaustive()
    }
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new(OrderKeySpace::default())
    }
}

impl CommandBuilder {
    /// Create a builder that allows every move
    pub fn new(key_space: OrderKeySpace) -> Self {
        Self {
            key_space,
            policy: Arc::new(AllowAll),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ReorderPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn key_space(&self) -> &OrderKeySpace {
        &self.key_space
    }

    /// Build the commands that move `item_id` to `drop`.
    ///
    /// An empty result means the drop matches the item's current slot.
    /// Cross-list moves consult the policy first and fail with
    /// `PermissionDenied` when refused. Neighbors that are missing from the
    /// target list or not adjacent fail with `StaleDrop`.
    pub fn build(
        &self,
        board: &Board,
        item_id: &ItemId,
        drop: &DropPosition,
    ) -> Result<Vec<ReorderCommand>> {
        let item = board
            .item(item_id)
            .ok_or_else(|| ReorderError::item_not_found(item_id))?;
        let target = &drop.target_list_id;
        let list = board
            .list(target)
            .ok_or_else(|| ReorderError::list_not_found(target))?;

        if &item.list_id != target && !self.policy.can_reorder(item_id, target) {
            warn!(item_id = %item_id, list_id = %target, "move refused by policy");
            return Err(ReorderError::permission_denied(item_id, target));
        }

        let others: Vec<&Item> = list.without(item_id).collect();
        let slot = drop_slot(&others, item_id, drop)?;

        if &item.list_id == target {
            if let Some((prev, next)) = list.neighbors(item_id) {
                let current = DropPosition::new(
                    target.clone(),
                    prev.map(|i| i.id.clone()),
                    next.map(|i| i.id.clone()),
                );
                if drop.same_slot(&current) {
                    debug!(item_id = %item_id, "drop matches current position");
                    return Ok(Vec::new());
                }
            }
        }

        plan_insertion(board, &self.key_space, item_id, target, slot)
    }
}

/// Index among `others` at which the drop inserts, after checking that the
/// named neighbors exist and sit next to each other.
fn drop_slot(others: &[&Item], item_id: &ItemId, drop: &DropPosition) -> Result<usize> {
    let index_of = |id: &ItemId| {
        others.iter().position(|i| &i.id == id).ok_or_else(|| {
            ReorderError::stale_drop(
                item_id,
                format!("{} is not in list {}", id, drop.target_list_id),
            )
        })
    };

    let slot = match &drop.insert_after_item_id {
        Some(after) => index_of(after)? + 1,
        None => 0,
    };
    let adjacent = match &drop.insert_before_item_id {
        Some(before) => index_of(before)? == slot,
        None => slot == others.len(),
    };
    if !adjacent {
        warn!(
            item_id = %item_id,
            list_id = %drop.target_list_id,
            "drop neighbors are not adjacent"
        );
        return Err(ReorderError::stale_drop(item_id, "neighbors are not adjacent"));
    }
    Ok(slot)
}

/// Commands placing `item_id` at `slot` among the other items of `list_id`.
///
/// Normally a single command with a key between the new neighbors. When the
/// key space is exhausted there, the whole list is renumbered and every item
/// whose placement changes gets a command.
pub(crate) fn plan_insertion(
    board: &Board,
    key_space: &OrderKeySpace,
    item_id: &ItemId,
    list_id: &ListId,
    slot: usize,
) -> Result<Vec<ReorderCommand>> {
    let list = board
        .list(list_id)
        .ok_or_else(|| ReorderError::list_not_found(list_id))?;
    let others: Vec<&Item> = list.without(item_id).collect();
    let slot = slot.min(others.len());

    let lower = slot.checked_sub(1).map(|i| &others[i].order_key);
    let upper = others.get(slot).map(|i| &i.order_key);
    match key_space.key_between(lower, upper) {
        Ok(key) => Ok(vec![ReorderCommand::new(item_id.clone(), list_id.clone(), key)]),
        Err(ReorderError::RebalanceRequired { length, max }) => {
            debug!(list_id = %list_id, length, max, items = others.len() + 1, "rebalancing list");
            let mut order: Vec<&ItemId> = others.iter().map(|i| &i.id).collect();
            order.insert(slot, item_id);

            let keys = key_space.rebalanced(order.len());
            Ok(order
                .into_iter()
                .zip(keys)
                .filter(|(id, key)| {
                    board
                        .item(id)
                        .is_none_or(|i| &i.list_id != list_id || &i.order_key != key)
                })
                .map(|(id, key)| ReorderCommand::new(id.clone(), list_id.clone(), key))
                .collect())
        }
        Err(e) => Err(e),
    }
}
