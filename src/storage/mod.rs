//! In-memory area registry.
//!
//! Areas live for the lifetime of the process; nothing is persisted.

mod memory;

pub use memory::AreaStore;
