//! # catalog-storage
//!
//! Storage abstraction layer for the catalog service.
//!
//! This crate defines the traits and types that all storage backends must implement.
//! It does not contain any implementations - those are provided by separate crates.
//!
//! ## Overview
//!
//! - [`CatalogStorage`] covers CRUD for categories, products and tags.
//! - [`AssociationStore`] covers one many-to-many join table (list, bulk
//!   delete, bulk insert). The association reconciler is written against this
//!   trait only.
//!
//! ## Example
//!
//! ```ignore
//! use catalog_storage::{CatalogStorage, StorageError, Tag};
//!
//! async fn product_tags(
//!     storage: &dyn CatalogStorage,
//!     product_id: i64,
//! ) -> Result<Vec<Tag>, StorageError> {
//!     storage
//!         .get_product(product_id)
//!         .await?
//!         .ok_or_else(|| StorageError::not_found("Product", product_id))?;
//!     storage.list_tags_for_product(product_id).await
//! }
//! ```

mod error;
mod traits;
mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{AssociationStore, CatalogStorage};
pub use types::{
    AssociationRecord, AssociationTable, Category, CategoryPatch, DEFAULT_STOCK, EntityId,
    NewAssociation, NewCategory, NewProduct, NewTag, Product, ProductPatch, Tag, TagPatch,
    validate_id,
};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared catalog storage trait object.
pub type DynStorage = std::sync::Arc<dyn CatalogStorage>;

/// Type alias for a shared association store trait object.
pub type DynAssociationStore = std::sync::Arc<dyn AssociationStore>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use catalog_storage::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::traits::{AssociationStore, CatalogStorage};
    pub use crate::types::{
        AssociationRecord, AssociationTable, Category, EntityId, NewAssociation, Product, Tag,
    };
    pub use crate::{DynAssociationStore, DynStorage, StorageResult};
}
