//! Product queries.

use catalog_storage::{EntityId, NewProduct, Product, ProductPatch, StorageError};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;

use crate::error::storage_error;

type ProductRow = (i64, String, f64, i32, Option<i64>);

const COLUMNS: &str = "id, product_name, price, stock, category_id";

fn into_product((id, product_name, price, stock, category_id): ProductRow) -> Product {
    Product {
        id,
        product_name,
        price,
        stock,
        category_id,
    }
}

pub async fn list(pool: &PgPool) -> Result<Vec<Product>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM product ORDER BY id");
    let rows: Vec<ProductRow> = query_as(&sql)
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to list products"))?;

    Ok(rows.into_iter().map(into_product).collect())
}

pub async fn get(pool: &PgPool, id: EntityId) -> Result<Option<Product>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE id = $1");
    let row: Option<ProductRow> = query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to read product"))?;

    Ok(row.map(into_product))
}

/// Inserts a product. An unknown `category_id` fails the foreign key and is
/// reported as `InvalidInput`.
pub async fn create(pool: &PgPool, input: &NewProduct) -> Result<Product, StorageError> {
    let sql = format!(
        r#"INSERT INTO product (product_name, price, stock, category_id)
           VALUES ($1, $2, $3, $4)
           RETURNING {COLUMNS}"#
    );
    let row: ProductRow = query_as(&sql)
        .bind(&input.product_name)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.category_id)
        .fetch_one(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to create product"))?;

    Ok(into_product(row))
}

pub async fn update(
    pool: &PgPool,
    id: EntityId,
    patch: &ProductPatch,
) -> Result<Option<Product>, StorageError> {
    let sql = format!(
        r#"UPDATE product
           SET product_name = COALESCE($2, product_name),
               price = COALESCE($3, price),
               stock = COALESCE($4, stock),
               category_id = COALESCE($5, category_id)
           WHERE id = $1
           RETURNING {COLUMNS}"#
    );
    let row: Option<ProductRow> = query_as(&sql)
        .bind(id)
        .bind(patch.product_name.as_deref())
        .bind(patch.price)
        .bind(patch.stock)
        .bind(patch.category_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to update product"))?;

    Ok(row.map(into_product))
}

/// Deletes a product. Its join rows go with it (ON DELETE CASCADE).
pub async fn delete(pool: &PgPool, id: EntityId) -> Result<u64, StorageError> {
    let result = query("DELETE FROM product WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to delete product"))?;

    Ok(result.rows_affected())
}

pub async fn list_in_category(
    pool: &PgPool,
    category_id: EntityId,
) -> Result<Vec<Product>, StorageError> {
    let sql = format!("SELECT {COLUMNS} FROM product WHERE category_id = $1 ORDER BY id");
    let rows: Vec<ProductRow> = query_as(&sql)
        .bind(category_id)
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to list category products"))?;

    Ok(rows.into_iter().map(into_product).collect())
}

/// Distinct products linked to a tag through `product_tag`.
pub async fn list_for_tag(pool: &PgPool, tag_id: EntityId) -> Result<Vec<Product>, StorageError> {
    let sql = format!(
        r#"SELECT {COLUMNS}
           FROM product p
           WHERE EXISTS (
               SELECT 1 FROM product_tag pt
               WHERE pt.product_id = p.id AND pt.tag_id = $1
           )
           ORDER BY id"#
    );
    let rows: Vec<ProductRow> = query_as(&sql)
        .bind(tag_id)
        .fetch_all(pool)
        .await
        .map_err(|e| storage_error(e, "Failed to list tag products"))?;

    Ok(rows.into_iter().map(into_product).collect())
}
