//! Storage backends

mod memory;

pub use creditkit_common::database::{Database, Error};
pub use memory::MemoryDatabase;
