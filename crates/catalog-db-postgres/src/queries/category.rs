//! Category queries.

use catalog_storage::{Category, CategoryPatch, EntityId, NewCategory, StorageError};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use crate::error::storage_error;

type CategoryRow = (i64, String);

fn into_category((id, category_name): CategoryRow) -> Category {
    Category { id, category_name }
}

pub async fn list(pool: &PgPool) -> Result<Vec<Category>, StorageError> {
    let rows: Vec<CategoryRow> = query_as("SELECT id, category_name FROM category ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to list categories"))?;

    Ok(rows.into_iter().map(into_category).collect())
}

pub async fn get(pool: &PgPool, id: EntityId) -> Result<Option<Category>, StorageError> {
    let row: Option<CategoryRow> =
        query_as("SELECT id, category_name FROM category WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(|e| storage_error(e, "Failed to read category"))?;

    Ok(row.map(into_category))
}

pub async fn create(pool: &PgPool, input: &NewCategory) -> Result<Category, StorageError> {
    let row: CategoryRow =
        query_as("INSERT INTO category (category_name) VALUES ($1) RETURNING id, category_name")
            .bind(&input.category_name)
            .fetch_one(pool)
            .await
            .map_err(|e| storage_error(e, "Failed to create category"))?;

    Ok(into_category(row))
}

pub async fn update(
    pool: &PgPool,
    id: EntityId,
    patch: &CategoryPatch,
) -> Result<Option<Category>, StorageError> {
    let row: Option<CategoryRow> = query_as(
        r#"UPDATE category
           SET category_name = COALESCE($2, category_name)
           WHERE id = $1
           RETURNING id, category_name"#,
    )
    .bind(id)
    .bind(patch.category_name.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error(e, "Failed to update category"))?;

    Ok(row.map(into_category))
}

/// Deletes a category. Products referencing it keep existing with a null
/// `category_id` (ON DELETE SET NULL).
pub async fn delete(pool: &PgPool, id: EntityId) -> Result<u64, StorageError> {
    let result = query("DELETE FROM category WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to delete category"))?;

    Ok(result.rows_affected())
}
