//! In-memory adapters for the persistence ports

pub mod memory_repository;
pub mod memory_store;

pub use memory_repository::InMemoryTransactionRepository;
pub use memory_store::InMemorySyncRecordStore;
