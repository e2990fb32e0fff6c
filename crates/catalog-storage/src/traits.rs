//! Storage traits for the catalog storage abstraction layer.
//!
//! This module defines the core traits that all storage backends must implement.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::{
    AssociationRecord, AssociationTable, Category, CategoryPatch, EntityId, NewAssociation,
    NewCategory, NewProduct, NewTag, Product, ProductPatch, Tag, TagPatch,
};

/// Access to one many-to-many join table.
///
/// This is the only surface the association reconciler depends on. Each
/// method is a single round trip to the backend; none of them are expected to
/// be transactional with respect to each other.
///
/// # Example
///
/// ```ignore
/// use catalog_storage::{AssociationStore, StorageError};
///
/// async fn tag_ids(store: &dyn AssociationStore, product_id: i64) -> Result<Vec<i64>, StorageError> {
///     let rows = store.list_associations(product_id).await?;
///     Ok(rows.into_iter().map(|row| row.related).collect())
/// }
/// ```
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Returns the descriptor of the table this store operates on.
    fn table(&self) -> &AssociationTable;

    /// Lists every join row of the given owner, duplicates included.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues; an owner with no rows
    /// yields an empty vector.
    async fn list_associations(
        &self,
        owner: EntityId,
    ) -> Result<Vec<AssociationRecord>, StorageError>;

    /// Deletes the join rows with the given own identifiers.
    ///
    /// Returns the number of rows actually deleted. Unknown identifiers are
    /// ignored.
    async fn delete_associations(&self, record_ids: &[EntityId]) -> Result<u64, StorageError>;

    /// Inserts the given join rows and returns them with their identifiers.
    ///
    /// No uniqueness is enforced on the (owner, related) pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if an owner or related entity does
    /// not exist and the backend enforces referential integrity.
    async fn insert_associations(
        &self,
        records: &[NewAssociation],
    ) -> Result<Vec<AssociationRecord>, StorageError>;
}

/// CRUD access to categories, products and tags.
///
/// Implementations must be thread-safe (`Send + Sync`). `update_*` returns
/// `None` when the entity does not exist; `delete_*` returns the number of
/// rows removed.
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    // ==================== Categories ====================

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    async fn get_category(&self, id: EntityId) -> Result<Option<Category>, StorageError>;

    async fn create_category(&self, input: &NewCategory) -> Result<Category, StorageError>;

    async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Option<Category>, StorageError>;

    /// Deletes a category. Products in it keep existing with no category.
    async fn delete_category(&self, id: EntityId) -> Result<u64, StorageError>;

    // ==================== Products ====================

    async fn list_products(&self) -> Result<Vec<Product>, StorageError>;

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>, StorageError>;

    /// Creates a product.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if `category_id` names an unknown
    /// category.
    async fn create_product(&self, input: &NewProduct) -> Result<Product, StorageError>;

    async fn update_product(
        &self,
        id: EntityId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StorageError>;

    /// Deletes a product along with its tag associations.
    async fn delete_product(&self, id: EntityId) -> Result<u64, StorageError>;

    async fn list_products_in_category(
        &self,
        category_id: EntityId,
    ) -> Result<Vec<Product>, StorageError>;

    async fn list_products_for_tag(&self, tag_id: EntityId) -> Result<Vec<Product>, StorageError>;

    // ==================== Tags ====================

    async fn list_tags(&self) -> Result<Vec<Tag>, StorageError>;

    async fn get_tag(&self, id: EntityId) -> Result<Option<Tag>, StorageError>;

    async fn create_tag(&self, input: &NewTag) -> Result<Tag, StorageError>;

    async fn update_tag(&self, id: EntityId, patch: &TagPatch)
    -> Result<Option<Tag>, StorageError>;

    /// Deletes a tag along with its product associations.
    async fn delete_tag(&self, id: EntityId) -> Result<u64, StorageError>;

    /// Distinct tags associated with a product, ordered by id.
    async fn list_tags_for_product(&self, product_id: EntityId) -> Result<Vec<Tag>, StorageError>;

    /// Returns the ids from `ids` that name no tag, deduplicated and in
    /// first-occurrence order.
    async fn missing_tags(&self, ids: &[EntityId]) -> Result<Vec<EntityId>, StorageError>;

    // ==================== Metadata ====================

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
