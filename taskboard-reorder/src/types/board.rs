//! Board-level types: Item, Placement, OrderedList, Board

use super::ids::{ItemId, ListId};
use super::order_key::OrderKey;
use crate::error::{ReorderError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Where an item sits: which list owns it and its key within that list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub list_id: ListId,
    pub order_key: OrderKey,
}

impl Placement {
    pub fn new(list_id: impl Into<ListId>, order_key: OrderKey) -> Self {
        Self {
            list_id: list_id.into(),
            order_key,
        }
    }
}

/// An orderable card on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub list_id: ListId,
    pub order_key: OrderKey,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, list_id: impl Into<ListId>, order_key: OrderKey) -> Self {
        Self {
            id: id.into(),
            list_id: list_id.into(),
            order_key,
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            list_id: self.list_id.clone(),
            order_key: self.order_key.clone(),
        }
    }
}

/// A column: items kept sorted ascending by key, keys unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedList {
    id: ListId,
    items: Vec<Item>,
}

impl OrderedList {
    pub fn new(id: impl Into<ListId>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> &ListId {
        &self.id
    }

    /// Items in display order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item ids in display order
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.items.iter().map(|i| &i.id)
    }

    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.position(id).is_some()
    }

    /// The item currently holding `key`, if any
    pub fn holder_of(&self, key: &OrderKey) -> Option<&Item> {
        self.items
            .binary_search_by(|i| i.order_key.cmp(key))
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// Items in display order, skipping `skip`
    pub fn without<'a>(&'a self, skip: &'a ItemId) -> impl Iterator<Item = &'a Item> + 'a {
        self.items.iter().filter(move |i| &i.id != skip)
    }

    /// Immediate neighbors of `id` as `(previous, next)`
    pub fn neighbors(&self, id: &ItemId) -> Option<(Option<&Item>, Option<&Item>)> {
        let idx = self.position(id)?;
        let prev = idx.checked_sub(1).map(|i| &self.items[i]);
        Some((prev, self.items.get(idx + 1)))
    }

    fn insert_sorted(&mut self, item: Item) {
        let at = self
            .items
            .partition_point(|i| i.order_key < item.order_key);
        self.items.insert(at, item);
    }

    fn remove(&mut self, id: &ItemId) -> Option<Item> {
        let idx = self.position(id)?;
        Some(self.items.remove(idx))
    }
}

/// Lists in display order plus an item -> list index.
///
/// Every mutation keeps two invariants: an item lives in exactly one list,
/// and no list holds two items with equal keys.
#[derive(Debug, Clone, Default)]
pub struct Board {
    lists: IndexMap<ListId, OrderedList>,
    index: HashMap<ItemId, ListId>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board with empty lists in the given order
    pub fn with_lists<I, L>(ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = L>,
        L: Into<ListId>,
    {
        let mut board = Self::new();
        for id in ids {
            board.add_list(id)?;
        }
        Ok(board)
    }

    /// Append an empty list at the right end of the board
    pub fn add_list(&mut self, id: impl Into<ListId>) -> Result<()> {
        let id = id.into();
        if self.lists.contains_key(&id) {
            return Err(ReorderError::DuplicateList { id: id.to_string() });
        }
        self.lists.insert(id.clone(), OrderedList::new(id));
        Ok(())
    }

    /// Add a new item to its list
    pub fn insert_item(&mut self, item: Item) -> Result<()> {
        if self.index.contains_key(&item.id) {
            return Err(ReorderError::DuplicateItem {
                id: item.id.to_string(),
            });
        }
        let list = self
            .lists
            .get_mut(&item.list_id)
            .ok_or_else(|| ReorderError::list_not_found(&item.list_id))?;
        if let Some(holder) = list.holder_of(&item.order_key) {
            return Err(ReorderError::DuplicateOrderKey {
                list_id: item.list_id.to_string(),
                key: item.order_key.to_string(),
                holder: holder.id.to_string(),
            });
        }
        self.index.insert(item.id.clone(), item.list_id.clone());
        list.insert_sorted(item);
        Ok(())
    }

    /// Remove an item from whichever list holds it
    pub fn remove_item(&mut self, id: &ItemId) -> Option<Item> {
        let list_id = self.index.remove(id)?;
        self.lists.get_mut(&list_id)?.remove(id)
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        let list_id = self.index.get(id)?;
        let list = self.lists.get(list_id)?;
        list.items().iter().find(|i| &i.id == id)
    }

    pub fn contains_item(&self, id: &ItemId) -> bool {
        self.index.contains_key(id)
    }

    pub fn item_count(&self) -> usize {
        self.index.len()
    }

    pub fn list(&self, id: &ListId) -> Option<&OrderedList> {
        self.lists.get(id)
    }

    /// Lists in display order
    pub fn lists(&self) -> impl Iterator<Item = &OrderedList> {
        self.lists.values()
    }

    pub fn list_index(&self, id: &ListId) -> Option<usize> {
        self.lists.get_index_of(id)
    }

    pub fn list_at(&self, index: usize) -> Option<&OrderedList> {
        self.lists.get_index(index).map(|(_, list)| list)
    }

    /// Every item, list by list in display order
    pub fn snapshot(&self) -> Vec<Item> {
        self.lists
            .values()
            .flat_map(|l| l.items().iter().cloned())
            .collect()
    }

    /// Move one item atomically. Returns the item as it was before.
    pub fn place(&mut self, id: &ItemId, placement: Placement) -> Result<Item> {
        let mut previous = self.apply_batch(&[(id.clone(), placement)])?;
        previous
            .pop()
            .ok_or_else(|| ReorderError::item_not_found(id))
    }

    /// Apply a set of placements atomically: either every item moves or the
    /// board is left untouched. Returns the prior state of each item, in
    /// batch order.
    pub fn apply_batch(&mut self, batch: &[(ItemId, Placement)]) -> Result<Vec<Item>> {
        self.validate_batch(batch)?;

        let mut previous = Vec::with_capacity(batch.len());
        for (id, _) in batch {
            if let Some(item) = self.remove_item(id) {
                previous.push(item);
            }
        }
        for (id, placement) in batch {
            let item = Item {
                id: id.clone(),
                list_id: placement.list_id.clone(),
                order_key: placement.order_key.clone(),
            };
            self.index.insert(item.id.clone(), item.list_id.clone());
            if let Some(list) = self.lists.get_mut(&placement.list_id) {
                list.insert_sorted(item);
            }
        }
        Ok(previous)
    }

    fn validate_batch(&self, batch: &[(ItemId, Placement)]) -> Result<()> {
        let moving: HashSet<&ItemId> = batch.iter().map(|(id, _)| id).collect();
        if moving.len() != batch.len() {
            let dup = batch
                .iter()
                .enumerate()
                .find(|(i, (id, _))| batch[..*i].iter().any(|(other, _)| other == id))
                .map(|(_, (id, _))| id.to_string())
                .unwrap_or_default();
            return Err(ReorderError::DuplicateItem { id: dup });
        }

        let mut targets: HashMap<(&ListId, &OrderKey), &ItemId> = HashMap::new();
        for (id, placement) in batch {
            if !self.contains_item(id) {
                return Err(ReorderError::item_not_found(id));
            }
            let list = self
                .lists
                .get(&placement.list_id)
                .ok_or_else(|| ReorderError::list_not_found(&placement.list_id))?;

            let collision = list
                .holder_of(&placement.order_key)
                .filter(|holder| !moving.contains(&holder.id))
                .map(|holder| &holder.id)
                .or_else(|| {
                    targets
                        .get(&(&placement.list_id, &placement.order_key))
                        .copied()
                });
            if let Some(holder) = collision {
                return Err(ReorderError::DuplicateOrderKey {
                    list_id: placement.list_id.to_string(),
                    key: placement.order_key.to_string(),
                    holder: holder.to_string(),
                });
            }
            targets.insert((&placement.list_id, &placement.order_key), id);
        }
        Ok(())
    }
}
