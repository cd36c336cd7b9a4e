//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Storage (LocalStorage on web, in-memory elsewhere)
//! - Input mapping (key state, cursor unprojection)

pub mod input;
pub mod storage;

pub use input::{CanvasRect, KeyState, screen_to_world};
pub use storage::{KeyValueStore, MemoryStore, default_store};
