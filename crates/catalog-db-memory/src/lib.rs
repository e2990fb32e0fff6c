//! In-memory storage backend for the catalog service.
//!
//! This crate provides in-memory implementations of the `CatalogStorage` and
//! `AssociationStore` traits from `catalog-storage`. It backs the server when
//! no database is configured and doubles as a fixture in tests.
//!
//! # Example
//!
//! ```ignore
//! use catalog_db_memory::InMemoryStorage;
//! use catalog_storage::{CatalogStorage, NewTag};
//!
//! let storage = InMemoryStorage::new();
//! let tag = storage.create_tag(&NewTag { tag_name: "rock music".into() }).await?;
//! let links = storage.product_tags();
//! ```

mod association;
mod storage;

// Re-export the storage traits for convenience
pub use catalog_storage::{AssociationStore, CatalogStorage, StorageError};

pub use association::InMemoryAssociationStore;
pub use storage::InMemoryStorage;

/// Type alias for a shareable InMemoryStorage instance.
pub type DynInMemoryStorage = std::sync::Arc<InMemoryStorage>;

/// Creates a new in-memory storage instance.
pub fn create_storage() -> DynInMemoryStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}
