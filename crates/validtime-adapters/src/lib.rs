//! validtime adapters - Infrastructure implementations
//!
//! Concrete implementations of the storage port defined in validtime-core.

pub mod memory;
pub mod sqlite;
pub mod testing;

pub use memory::InMemoryKeyValueStore;
pub use sqlite::SqliteKeyValueStore;
pub use testing::FailingKeyValueStore;
