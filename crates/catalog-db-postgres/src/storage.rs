//! PostgreSQL implementation of the CatalogStorage trait.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx_postgres::PgPool;
use tracing::instrument;

use catalog_storage::{
    AssociationTable, CatalogStorage, Category, CategoryPatch, DynAssociationStore, EntityId,
    NewCategory, NewProduct, NewTag, Product, ProductPatch, StorageError, Tag, TagPatch,
};

use crate::association::PgAssociationStore;
use crate::config::PostgresConfig;
use crate::migrations;
use crate::pool;
use crate::queries::{category, product, tag};

/// PostgreSQL storage backend for the catalog.
///
/// Cascades are left to the schema: deleting a product or a tag removes its
/// `product_tag` rows, deleting a category nulls `product.category_id`.
#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
    product_tags: Arc<PgAssociationStore>,
}

impl PostgresStorage {
    /// Creates a new `PostgresStorage` with the given configuration.
    ///
    /// This will:
    /// 1. Create a connection pool
    /// 2. Run migrations (if configured)
    ///
    /// # Errors
    ///
    /// Returns an error if the connection pool cannot be created
    /// or if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Self::from_pool(pool)
    }

    /// Creates a new `PostgresStorage` from an existing connection pool.
    ///
    /// Migrations are not run automatically when using this constructor.
    pub fn from_pool(pool: PgPool) -> Result<Self, StorageError> {
        let product_tags = PgAssociationStore::new(pool.clone(), AssociationTable::PRODUCT_TAG)?;
        Ok(Self {
            pool,
            product_tags: Arc::new(product_tags),
        })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the product/tag join table as an association store.
    #[must_use]
    pub fn product_tags(&self) -> DynAssociationStore {
        self.product_tags.clone()
    }
}

#[async_trait]
impl CatalogStorage for PostgresStorage {
    // ==================== Categories ====================

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        category::list(&self.pool).await
    }

    async fn get_category(&self, id: EntityId) -> Result<Option<Category>, StorageError> {
        category::get(&self.pool, id).await
    }

    #[instrument(skip(self, input))]
    async fn create_category(&self, input: &NewCategory) -> Result<Category, StorageError> {
        input.validate()?;
        category::create(&self.pool, input).await
    }

    #[instrument(skip(self, patch))]
    async fn update_category(
        &self,
        id: EntityId,
        patch: &CategoryPatch,
    ) -> Result<Option<Category>, StorageError> {
        patch.validate()?;
        category::update(&self.pool, id, patch).await
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: EntityId) -> Result<u64, StorageError> {
        category::delete(&self.pool, id).await
    }

    // ==================== Products ====================

    async fn list_products(&self) -> Result<Vec<Product>, StorageError> {
        product::list(&self.pool).await
    }

    async fn get_product(&self, id: EntityId) -> Result<Option<Product>, StorageError> {
        product::get(&self.pool, id).await
    }

    #[instrument(skip(self, input))]
    async fn create_product(&self, input: &NewProduct) -> Result<Product, StorageError> {
        input.validate()?;
        product::create(&self.pool, input).await
    }

    #[instrument(skip(self, patch))]
    async fn update_product(
        &self,
        id: EntityId,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, StorageError> {
        patch.validate()?;
        product::update(&self.pool, id, patch).await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: EntityId) -> Result<u64, StorageError> {
        product::delete(&self.pool, id).await
    }

    async fn list_products_in_category(
        &self,
        category_id: EntityId,
    ) -> Result<Vec<Product>, StorageError> {
        product::list_in_category(&self.pool, category_id).await
    }

    async fn list_products_for_tag(&self, tag_id: EntityId) -> Result<Vec<Product>, StorageError> {
        product::list_for_tag(&self.pool, tag_id).await
    }

    // ==================== Tags ====================

    async fn list_tags(&self) -> Result<Vec<Tag>, StorageError> {
        tag::list(&self.pool).await
    }

    async fn get_tag(&self, id: EntityId) -> Result<Option<Tag>, StorageError> {
        tag::get(&self.pool, id).await
    }

    #[instrument(skip(self, input))]
    async fn create_tag(&self, input: &NewTag) -> Result<Tag, StorageError> {
        input.validate()?;
        tag::create(&self.pool, input).await
    }

    #[instrument(skip(self, patch))]
    async fn update_tag(
        &self,
        id: EntityId,
        patch: &TagPatch,
    ) -> Result<Option<Tag>, StorageError> {
        patch.validate()?;
        tag::update(&self.pool, id, patch).await
    }

    #[instrument(skip(self))]
    async fn delete_tag(&self, id: EntityId) -> Result<u64, StorageError> {
        tag::delete(&self.pool, id).await
    }

    async fn list_tags_for_product(&self, product_id: EntityId) -> Result<Vec<Tag>, StorageError> {
        tag::list_for_product(&self.pool, product_id).await
    }

    async fn missing_tags(&self, ids: &[EntityId]) -> Result<Vec<EntityId>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        tag::missing(&self.pool, ids).await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
