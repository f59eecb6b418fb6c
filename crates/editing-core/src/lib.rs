//! Cutline Editing Core
//!
//! Everything that mutates a timeline in response to user gestures:
//!
//! - **Resolver:** turns a desired move/resize/drop into a valid,
//!   non-overlapping placement, with optional snapping
//! - **History:** branch-truncating snapshot stack for undo/redo
//! - **Editor:** the single owner of timeline state, recording every
//!   committed mutation into history
//!
//! Everything here is synchronous and in-memory.

pub mod editor;
pub mod history;
pub mod resolver;

pub use editor::Editor;
pub use history::{HistoryManager, HistoryState};
pub use resolver::*;
