//! Drag session state machine.
//!
//! ```text
//! Idle --start--> Dragging --release (drop resolved)--> Dropped   --> Idle
//!                          --release (no target)------> Cancelled --> Idle
//!                          --cancel--------------------> Cancelled --> Idle
//! ```
//!
//! The controller owns at most one [`DragSession`] through a single optional
//! field, so a second concurrent session cannot exist. Every transition is
//! synchronous; the controller never touches the board and never renders.
//! Listeners hear about entering and leaving `Dragging`, nothing else.

use crate::error::{ReorderError, Result};
use crate::geometry::{Direction, Point};
use crate::resolver::{resolve_drop, BoardLayout, DropPosition, Frame};
use crate::types::{Board, ItemId, ListId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether a gesture is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPhase {
    Idle,
    Dragging,
}

impl fmt::Display for DragPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Dragging => f.write_str("dragging"),
        }
    }
}

/// One drag gesture, alive from drag start to drop or cancel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DragSession {
    pub dragged_item_id: ItemId,
    pub source_list_id: ListId,
    pub current_pointer_position: Point,
    /// List under the pointer, if any
    pub candidate_list_id: Option<ListId>,
    pub resolved_drop: Option<DropPosition>,
    #[serde(skip)]
    last_frame: Frame,
}

impl DragSession {
    fn new(dragged_item_id: ItemId, source_list_id: ListId, pointer: Point) -> Self {
        Self {
            dragged_item_id,
            source_list_id,
            current_pointer_position: pointer,
            candidate_list_id: None,
            resolved_drop: None,
            last_frame: Frame {
                pointer,
                direction: Direction::default(),
            },
        }
    }

    fn resolve(&mut self, layout: &BoardLayout, pointer: Point) {
        self.current_pointer_position = pointer;
        self.candidate_list_id = layout.list_at(pointer).map(|l| l.list_id.clone());
        self.resolved_drop =
            resolve_drop(layout, &self.dragged_item_id, pointer, Some(self.last_frame));
        if let Some(drop) = &self.resolved_drop {
            self.last_frame = Frame {
                pointer,
                direction: drop.direction,
            };
        }
    }
}

/// Why a session ended without a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Released while over no list
    NoTarget,
    /// Escape key, pointer left the window, or an explicit cancel
    UserCancelled,
    /// The destination refused the item
    PermissionDenied,
    /// The drop no longer matched the board
    Rejected,
}

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum DragOutcome {
    Dropped {
        session: DragSession,
        drop: DropPosition,
    },
    Cancelled {
        session: DragSession,
        reason: CancelReason,
    },
}

impl DragOutcome {
    pub fn session(&self) -> &DragSession {
        match self {
            Self::Dropped { session, .. } | Self::Cancelled { session, .. } => session,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped { .. })
    }

    pub fn cancel_reason(&self) -> Option<CancelReason> {
        match self {
            Self::Cancelled { reason, .. } => Some(*reason),
            Self::Dropped { .. } => None,
        }
    }

    /// Turn a drop into a cancellation, keeping the session
    pub fn into_cancelled(self, reason: CancelReason) -> Self {
        match self {
            Self::Dropped { session, .. } | Self::Cancelled { session, .. } => {
                Self::Cancelled { session, reason }
            }
        }
    }
}

/// Emitted when the controller enters or leaves `Dragging`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEvent {
    Started {
        item_id: ItemId,
        source_list_id: ListId,
    },
    Ended {
        item_id: ItemId,
    },
}

/// Receives drag affordance notifications
pub trait DragListener: Send + Sync {
    fn on_drag_event(&self, event: &DragEvent);
}

/// Tracks the lifecycle of one drag gesture at a time
#[derive(Default)]
pub struct DragController {
    session: Option<DragSession>,
    listeners: Vec<Arc<dyn DragListener>>,
}

impl fmt::Debug for DragController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DragController")
            .field("session", &self.session)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn DragListener>) {
        self.listeners.push(listener);
    }

    pub fn phase(&self) -> DragPhase {
        if self.session.is_some() {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    /// Snapshot of the active session
    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn resolved_drop(&self) -> Option<&DropPosition> {
        self.session.as_ref().and_then(|s| s.resolved_drop.as_ref())
    }

    /// Begin dragging `item_id`.
    ///
    /// Fails with `InvalidState` while another session is active and with
    /// `ItemNotFound` when the item is not on the board.
    pub fn start(
        &mut self,
        board: &Board,
        item_id: &ItemId,
        pointer: Point,
    ) -> Result<&DragSession> {
        if self.session.is_some() {
            return Err(self.reject("start a drag"));
        }
        let item = board
            .item(item_id)
            .ok_or_else(|| ReorderError::item_not_found(item_id))?;

        info!(item_id = %item.id, list_id = %item.list_id, "drag started");
        let session = DragSession::new(item.id.clone(), item.list_id.clone(), pointer);
        self.notify(&DragEvent::Started {
            item_id: session.dragged_item_id.clone(),
            source_list_id: session.source_list_id.clone(),
        });
        Ok(self.session.insert(session))
    }

    /// Pointer moved: re-resolve the drop target
    pub fn update(
        &mut self,
        layout: &BoardLayout,
        pointer: Point,
    ) -> Result<Option<&DropPosition>> {
        if self.session.is_none() {
            return Err(self.reject("move"));
        }
        let session = self.session.as_mut().expect("session checked above");
        session.resolve(layout, pointer);
        Ok(session.resolved_drop.as_ref())
    }

    /// Pointer released: resolve one last time and end the session
    pub fn release(&mut self, layout: &BoardLayout, pointer: Point) -> Result<DragOutcome> {
        let Some(mut session) = self.session.take() else {
            return Err(self.reject("drop"));
        };
        session.resolve(layout, pointer);

        let outcome = match session.resolved_drop.clone() {
            Some(drop) => {
                info!(
                    item_id = %session.dragged_item_id,
                    list_id = %drop.target_list_id,
                    "drag dropped"
                );
                DragOutcome::Dropped { session, drop }
            }
            None => {
                debug!(item_id = %session.dragged_item_id, "released over no list");
                DragOutcome::Cancelled {
                    session,
                    reason: CancelReason::NoTarget,
                }
            }
        };
        self.notify(&DragEvent::Ended {
            item_id: outcome.session().dragged_item_id.clone(),
        });
        Ok(outcome)
    }

    /// Explicit cancel (escape, pointer left the window)
    pub fn cancel(&mut self) -> Result<DragOutcome> {
        let Some(session) = self.session.take() else {
            return Err(self.reject("cancel"));
        };
        info!(item_id = %session.dragged_item_id, "drag cancelled");
        self.notify(&DragEvent::Ended {
            item_id: session.dragged_item_id.clone(),
        });
        Ok(DragOutcome::Cancelled {
            session,
            reason: CancelReason::UserCancelled,
        })
    }

    fn reject(&self, event: &'static str) -> ReorderError {
        let phase = self.phase();
        warn!(event, %phase, "ignoring gesture event");
        ReorderError::invalid_state(event, phase)
    }

    fn notify(&self, event: &DragEvent) {
        for listener in &self.listeners {
            listener.on_drag_event(event);
        }
    }
}
