//! Screening stores
//!
//! - `MemoryStorage`: concurrent in-memory store, the primary backend
//! - `SnapshotCache`: JSON file that carries a store across restarts

mod memory;
pub use memory::MemoryStorage;

mod snapshot;
pub use snapshot::SnapshotCache;
