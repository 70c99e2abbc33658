//! Storage crate: conversation state store implementations.
//!
//! ## Modules
//!
//! - [`memory_storage`] – MemoryStorage (single map behind one lock, lost on restart)

mod memory_storage;

pub use memory_storage::MemoryStorage;
