//! Drag-and-drop reordering for kanban boards
//!
//! This crate owns the part of a board UI that decides where a dragged card
//! lands, turns that into persisted order changes, and keeps the screen
//! honest while the store catches up. It never renders and never talks to a
//! network itself; the UI feeds it pointer events and a layout snapshot, and
//! a [`ReorderStore`] implementation does the persisting.
//!
//! ## Overview
//!
//! - **Order keys** - base-62 fractional keys; inserting between two cards
//!   touches only the moved card until key precision runs out
//! - **One drag at a time** - the controller holds a single optional session
//! - **Optimistic** - moves show immediately and roll back per item when the
//!   store refuses them
//! - **Pure resolution** - drop targets depend only on the layout and pointer
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskboard_reorder::{
//!     Board, Item, ItemId, ListLayout, OrderKey, Point, Rect, ReorderEngine, ReorderStore,
//! };
//!
//! # async fn example(store: Arc<dyn ReorderStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut board = Board::with_lists(["todo", "done"])?;
//! board.insert_item(Item::new("card-1", "todo", OrderKey::initial()))?;
//!
//! let mut engine = ReorderEngine::new(board, store);
//! let layout = engine
//!     .layout()
//!     .with_list(
//!         ListLayout::new("todo", Rect::new(0.0, 0.0, 200.0, 600.0))
//!             .with_item("card-1", Rect::new(0.0, 0.0, 200.0, 48.0)),
//!     )
//!     .with_list(ListLayout::new("done", Rect::new(220.0, 0.0, 200.0, 600.0)));
//!
//! engine.drag_start(&ItemId::from("card-1"), Point::new(20.0, 20.0))?;
//! engine.drag_move(&layout, Point::new(260.0, 30.0))?;
//! let report = engine.drop(&layout, Point::new(260.0, 30.0))?;
//! println!("applied {} command(s)", report.commands.len());
//!
//! for reconciliation in engine.flush().await? {
//!     if let Some(error) = reconciliation.error() {
//!         eprintln!("{error}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
mod engine;
mod error;
pub mod geometry;
pub mod keyboard;
pub mod reconcile;
pub mod resolver;
pub mod session;
pub mod types;

pub use command::{AllowAll, CommandBuilder, ReorderCommand, ReorderPolicy};
pub use config::ReorderConfig;
pub use engine::{DropReport, ReorderEngine};
pub use error::{ErrorSeverity, ReorderError, Result};
pub use geometry::{Axis, Direction, Point, Rect};
pub use keyboard::MoveTarget;
pub use reconcile::{
    Reconciler, Reconciliation, ReorderStore, Submission, SubmissionResult, SubmitFailure, Ticket,
};
pub use resolver::{resolve_drop, BoardLayout, DropPosition, ItemLayout, ListLayout};
pub use session::{
    CancelReason, DragController, DragEvent, DragListener, DragOutcome, DragPhase, DragSession,
};

// Re-export commonly used types
pub use types::{Board, Item, ItemId, ListId, OrderKey, OrderKeySpace, OrderedList, Placement};

// Store implementations need the same macro the trait was declared with
pub use async_trait::async_trait;
