use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use catalog_storage::{
    AssociationRecord, AssociationStore, AssociationTable, CatalogStorage, Category,
    CategoryPatch, DynAssociationStore, EntityId, NewAssociation, NewCategory, NewProduct, NewTag,
    Product, ProductPatch, StorageError, Tag, TagPatch,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::association::InMemoryAssociationStore;

/// In-memory catalog backend.
///
/// This storage implementation provides:
/// - CRUD for categories, products and tags
/// - A `product_tag` join table with cascading deletes
/// - Referential checks on product category and on join row inserts
///
/// Cloning is cheap and every clone shares the same tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<Tables>,
}

#[derive(Debug)]
struct Tables {
    categories: RwLock<BTreeMap<EntityId, Category>>,
    products: RwLock<BTreeMap<EntityId, Product>>,
    tags: RwLock<BTreeMap<EntityId, Tag>>,
    product_tags: Arc<InMemoryAssociationStore>,
    category_seq: AtomicI64,
    product_seq: AtomicI64,
    tag_seq: AtomicI64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            categories: RwLock::new(BTreeMap::new()),
            products: RwLock::new(BTreeMap::new()),
            tags: RwLock::new(BTreeMap::new()),
            product_tags: Arc::new(InMemoryAssociationStore::new(AssociationTable::PRODUCT_TAG)),
            category_seq: AtomicI64::new(1),
            product_seq: AtomicI64::new(1),
            tag_seq: AtomicI64::new(1),
        }
    }
}

impl InMemoryStorage {
    /// Creates a new empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the product/tag join table as an association store.
    ///
    /// Inserts through this handle fail with `InvalidInput` when the product
    /// or the tag does not exist.
    #[must_use]
    pub fn product_tags(&self) -> DynAssociationStore {
        Arc::new(ProductTagStore {
            tables: self.inner.clone(),
        })
    }

    /// Direct access to the raw join table, bypassing referential checks.
    #[must_use]
    pub fn product_tag_table(&self) -> &Arc<InMemoryAssociationStore> {
        &self.inner.product_tags
    }

    async fn ensure_category(&self, category_id: Option<EntityId>) -> Result<(), StorageError> {
        if let Some(id) = category_id {
            if !self.inner.categories.read().await.contains_key(&id) {
                return Err(StorageError::invalid_input(format!(
                    "category {id} does not exist"
                )));
            }
        }
        Ok(())
    }
}

fn next(seq: &AtomicI64) -> EntityId {
    seq.fetch_add(1, Ordering::SeqCst)
}

#[async_trait]
impl CatalogStorage for InMemoryStorage {
    // ==================== Categories ====================

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        Ok(self.inner.categories.read().await.values().cloned().collect())
    }

    async fn get_category(&self, id: EntityId) -> Result<Option<Category>, StorageError> {
        Ok(self.inner.categories.read().await.get(&id).cloned())
    }

    async fn create_category(&self, input: &NewCategory) -> Result<Category, StorageError> {
        input.validate()?;
        let category = Category {
            id: next(&self.inner.category_seq),
            category_name: input.category_name.clone(),
        };
        self.inner
            .categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Option<Category>, StorageError> {
        patch.validate()?;
        let mut categories = self.inner.categories.write().await;
        Ok(categories.get_mut(&id).map(|category| {
            patch.apply_to(category);
            category.clone()
        }))
    }

    async fn delete_category(&self, id: EntityId) -> Result<u64, StorageError> {
        let mut categories = self.inner.categories.write().await;
        if categories.remove(&id).is_none() {
            return Ok(0);
        }
        let mut products = self.inner.products.write().await;
        for product in products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(1)
    }

    // ==================== Products ====================

    async fn list_products(&self) -> Result<Vec<Product>, StorageError> {
        Ok(self.inner.products.read().await.values().cloned().collect())
    }

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>, StorageError> {
        Ok(self.inner.products.read().await.get(&id).cloned())
    }

    async fn create_product(&self, input: &NewProduct) -> Result<Product, StorageError> {
        input.validate()?;
        self.ensure_category(input.category_id).await?;
        let product = Product {
            id: next(&self.inner.product_seq),
            product_name: input.product_name.clone(),
            price: input.price,
            stock: input.stock,
            category_id: input.category_id,
        };
        self.inner
            .products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: EntityId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        patch.validate()?;
        self.ensure_category(patch.category_id).await?;
        let mut products = self.inner.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            patch.apply_to(product);
            product.clone()
        }))
    }

    async fn delete_product(&self, id: EntityId) -> Result<u64, StorageError> {
        if self.inner.products.write().await.remove(&id).is_none() {
            return Ok(0);
        }
        let cascaded = self.inner.product_tags.remove_owner(id).await;
        debug!(product_id = id, cascaded, "product deleted");
        Ok(1)
    }

    async fn list_products_in_category(
        &self,
        category_id: EntityId,
    ) -> Result<Vec<Product>, StorageError> {
        Ok(self
            .inner
            .products
            .read()
            .await
            .values()
            .filter(|p| p.category_id == Some(category_id))
            .cloned()
            .collect())
    }

    async fn list_products_for_tag(&self, tag_id: EntityId) -> Result<Vec<Product>, StorageError> {
        let owners = self.inner.product_tags.owners_of(tag_id).await;
        let products = self.inner.products.read().await;
        Ok(owners
            .iter()
            .filter_map(|id| products.get(id).cloned())
            .collect())
    }

    // ==================== Tags ====================

    async fn list_tags(&self) -> Result<Vec<Tag>, StorageError> {
        Ok(self.inner.tags.read().await.values().cloned().collect())
    }

    async fn get_tag(&self, id: EntityId) -> Result<Option<Tag>, StorageError> {
        Ok(self.inner.tags.read().await.get(&id).cloned())
    }

    async fn create_tag(&self, input: &NewTag) -> Result<Tag, StorageError> {
        input.validate()?;
        let tag = Tag {
            id: next(&self.inner.tag_seq),
            tag_name: input.tag_name.clone(),
        };
        self.inner.tags.write().await.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(
        &self,
        id: EntityId,
        patch: &TagPatch,
    ) -> Result<Option<Tag>, StorageError> {
        patch.validate()?;
        let mut tags = self.inner.tags.write().await;
        Ok(tags.get_mut(&id).map(|tag| {
            patch.apply_to(tag);
            tag.clone()
        }))
    }

    async fn delete_tag(&self, id: EntityId) -> Result<u64, StorageError> {
        if self.inner.tags.write().await.remove(&id).is_none() {
            return Ok(0);
        }
        let cascaded = self.inner.product_tags.remove_related(id).await;
        debug!(tag_id = id, cascaded, "tag deleted");
        Ok(1)
    }

    async fn list_tags_for_product(&self, product_id: EntityId) -> Result<Vec<Tag>, StorageError> {
        let related = self.inner.product_tags.related_of(product_id).await;
        let tags = self.inner.tags.read().await;
        Ok(related
            .iter()
            .filter_map(|id| tags.get(id).cloned())
            .collect())
    }

    async fn missing_tags(&self, ids: &[EntityId]) -> Result<Vec<EntityId>, StorageError> {
        let tags = self.inner.tags.read().await;
        let mut missing: Vec<EntityId> = Vec::new();
        for id in ids {
            if !tags.contains_key(id) && !missing.contains(id) {
                missing.push(*id);
            }
        }
        Ok(missing)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// `product_tag` handle that checks both ends of a row before inserting it.
struct ProductTagStore {
    tables: Arc<Tables>,
}

#[async_trait]
impl AssociationStore for ProductTagStore {
    fn table(&self) -> &AssociationTable {
        self.tables.product_tags.table()
    }

    async fn list_associations(
        &self,
        owner: EntityId,
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        self.tables.product_tags.list_associations(owner).await
    }

    async fn delete_associations(&self, record_ids: &[EntityId]) -> Result<u64, StorageError> {
        self.tables.product_tags.delete_associations(record_ids).await
    }

    async fn insert_associations(
        &self,
        records: &[NewAssociation],
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        // Held through the insert so a concurrent delete cascades over the new rows.
        let products = self.tables.products.read().await;
        let tags = self.tables.tags.read().await;
        for row in records {
            if !products.contains_key(&row.owner) {
                return Err(StorageError::invalid_input(format!(
                    "product {} does not exist",
                    row.owner
                )));
            }
            if !tags.contains_key(&row.related) {
                return Err(StorageError::invalid_input(format!(
                    "tag {} does not exist",
                    row.related
                )));
            }
        }
        let inserted = self.tables.product_tags.insert_associations(records).await?;
        drop(tags);
        drop(products);
        Ok(inserted)
    }
}
