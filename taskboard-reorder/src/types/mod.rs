//! Core types for the reordering engine

mod board;
mod ids;
mod order_key;

// Re-export all types
pub use board::{Board, Item, OrderedList, Placement};
pub use ids::{ItemId, ListId};
pub use order_key::{OrderKey, OrderKeySpace, DEFAULT_MAX_KEY_LEN, MIN_MAX_KEY_LEN};
