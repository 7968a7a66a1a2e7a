pub mod class_index;
pub mod slot_store;

pub use class_index::ClassIndex;
pub use slot_store::{Growth, Removed, SlotStore};
