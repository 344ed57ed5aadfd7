//! Drop position resolution.
//!
//! Maps pointer geometry to an insertion point. The UI hands over the board
//! layout it rendered for the current frame; resolution is a pure function of
//! that layout, the dragged item and the pointer, so calling it twice with the
//! same inputs always gives the same answer.

use crate::geometry::{Axis, Direction, Point, Rect};
use crate::types::{ItemId, ListId};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Rendered bounds of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemLayout {
    pub item_id: ItemId,
    pub bounds: Rect,
}

impl ItemLayout {
    pub fn new(item_id: impl Into<ItemId>, bounds: Rect) -> Self {
        Self {
            item_id: item_id.into(),
            bounds,
        }
    }
}

/// Rendered bounds of one list and its items, items in display order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListLayout {
    pub list_id: ListId,
    pub bounds: Rect,
    pub items: Vec<ItemLayout>,
}

impl ListLayout {
    pub fn new(list_id: impl Into<ListId>, bounds: Rect) -> Self {
        Self {
            list_id: list_id.into(),
            bounds,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item_id: impl Into<ItemId>, bounds: Rect) -> Self {
        self.items.push(ItemLayout::new(item_id, bounds));
        self
    }
}

/// Everything the resolver needs to know about the rendered board
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardLayout {
    pub axis: Axis,
    pub lists: Vec<ListLayout>,
}

impl BoardLayout {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            lists: Vec::new(),
        }
    }

    pub fn with_list(mut self, list: ListLayout) -> Self {
        self.lists.push(list);
        self
    }

    /// The list under the pointer.
    ///
    /// Columns are picked by X range and rows by Y range, so a pointer below
    /// the last card of a column still targets that column.
    pub fn list_at(&self, pointer: Point) -> Option<&ListLayout> {
        self.lists
            .iter()
            .find(|l| l.bounds.spans_across(self.axis, pointer))
    }
}

/// Resolved insertion point for a dragged item.
///
/// Both neighbors are `None` only when the target list holds nothing but
/// (possibly) the dragged item itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropPosition {
    pub target_list_id: ListId,
    pub insert_before_item_id: Option<ItemId>,
    pub insert_after_item_id: Option<ItemId>,
    pub direction: Direction,
}

impl DropPosition {
    pub fn new(
        target_list_id: impl Into<ListId>,
        insert_after_item_id: Option<ItemId>,
        insert_before_item_id: Option<ItemId>,
    ) -> Self {
        Self {
            target_list_id: target_list_id.into(),
            insert_before_item_id,
            insert_after_item_id,
            direction: Direction::default(),
        }
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Whether two positions name the same slot, ignoring direction
    pub fn same_slot(&self, other: &DropPosition) -> bool {
        self.target_list_id == other.target_list_id
            && self.insert_before_item_id == other.insert_before_item_id
            && self.insert_after_item_id == other.insert_after_item_id
    }
}

/// Pointer and direction of the previously resolved frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub pointer: Point,
    pub direction: Direction,
}

/// Resolve where `dragged` would land if released at `pointer`.
///
/// Returns `None` when the pointer is over no list.
pub fn resolve_drop(
    layout: &BoardLayout,
    dragged: &ItemId,
    pointer: Point,
    previous: Option<Frame>,
) -> Option<DropPosition> {
    let list = layout.list_at(pointer)?;
    let axis = layout.axis;
    let at = pointer.along(axis);

    let mut insert_after = None;
    let mut insert_before = None;
    for item in list.items.iter().filter(|i| &i.item_id != dragged) {
        if item.bounds.mid(axis) > at {
            insert_before = Some(item.item_id.clone());
            break;
        }
        insert_after = Some(item.item_id.clone());
    }

    let direction = match previous {
        Some(frame) => {
            Direction::of_displacement(frame.pointer, pointer).unwrap_or(frame.direction)
        }
        None => Direction::default(),
    };

    let position = DropPosition {
        target_list_id: list.list_id.clone(),
        insert_before_item_id: insert_before,
        insert_after_item_id: insert_after,
        direction,
    };
    trace!(
        list = %position.target_list_id,
        after = ?position.insert_after_item_id,
        before = ?position.insert_before_item_id,
        "resolved drop position"
    );
    Some(position)
}
