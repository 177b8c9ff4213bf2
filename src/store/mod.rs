//! Match persistence

pub mod save;
pub mod slot;

pub use save::{load_match, restore_match, save_match, LoadError, SaveState};
pub use slot::{FileSlot, MemorySlot, SaveSlot, StoreError};
