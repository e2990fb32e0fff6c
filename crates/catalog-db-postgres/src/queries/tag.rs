//! Tag queries.

use catalog_storage::{EntityId, NewTag, StorageError, Tag, TagPatch};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use crate::error::storage_error;

type TagRow = (i64, String);

fn into_tag((id, tag_name): TagRow) -> Tag {
    Tag { id, tag_name }
}

pub async fn list(pool: &PgPool) -> Result<Vec<Tag>, StorageError> {
    let rows: Vec<TagRow> = query_as("SELECT id, tag_name FROM tag ORDER BY id")
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to list tags"))?;

    Ok(rows.into_iter().map(into_tag).collect())
}

pub async fn get(pool: &PgPool, id: EntityId) -> Result<Option<Tag>, StorageError> {
    let row: Option<TagRow> = query_as("SELECT id, tag_name FROM tag WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to read tag"))?;

    Ok(row.map(into_tag))
}

pub async fn create(pool: &PgPool, input: &NewTag) -> Result<Tag, StorageError> {
    let row: TagRow = query_as("INSERT INTO tag (tag_name) VALUES ($1) RETURNING id, tag_name")
        .bind(&input.tag_name)
        .fetch_one(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to create tag"))?;

    Ok(into_tag(row))
}

pub async fn update(
    pool: &PgPool,
    id: EntityId,
    patch: &TagPatch,
) -> Result<Option<Tag>, StorageError> {
    let row: Option<TagRow> = query_as(
        r#"UPDATE tag
           SET tag_name = COALESCE($2, tag_name)
           WHERE id = $1
           RETURNING id, tag_name"#,
    )
    .bind(id)
    .bind(patch.tag_name.as_deref())
    .fetch_optional(pool)
    .await
    .map_err(|e| storage_error(e, "Failed to update tag"))?;

    Ok(row.map(into_tag))
}

/// Deletes a tag. Its join rows go with it (ON DELETE CASCADE).
pub async fn delete(pool: &PgPool, id: EntityId) -> Result<u64, StorageError> {
    let result = query("DELETE FROM tag WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to delete tag"))?;

    Ok(result.rows_affected())
}

/// Ids from `ids` with no matching tag row, in first-occurrence order.
pub async fn missing(pool: &PgPool, ids: &[EntityId]) -> Result<Vec<EntityId>, StorageError> {
    let rows: Vec<(i64,)> = query_as(
        r#"SELECT w.id
           FROM UNNEST($1::int8[]) WITH ORDINALITY AS w(id, pos)
           WHERE NOT EXISTS (SELECT 1 FROM tag t WHERE t.id = w.id)
           GROUP BY w.id
           ORDER BY MIN(w.pos)"#,
    )
    .bind(ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(|e| storage_error(e, "Failed to check tag ids"))?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Distinct tags linked to a product through `product_tag`.
pub async fn list_for_product(pool: &PgPool, product_id: EntityId) -> Result<Vec<Tag>, StorageError> {
    let rows: Vec<TagRow> = query_as(
        r#"SELECT t.id, t.tag_name
           FROM tag t
           WHERE EXISTS (
               SELECT 1 FROM product_tag pt
               WHERE pt.tag_id = t.id AND pt.product_id = $1
           )
           ORDER BY t.id"#,
    )
    .bind(product_id)
    .fetch_all(pool)
    .await
    .map_err(|e| storage_error(e, "Failed to list product tags"))?;

    Ok(rows.into_iter().map(into_tag).collect())
}
