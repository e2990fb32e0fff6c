//! PostgreSQL-backed association store.
//!
//! One instance serves one join table. The SQL is built once at construction
//! from the table descriptor, whose identifiers are validated first since they
//! are interpolated into the statements.

use std::sync::LazyLock;

use async_trait::async_trait;
use catalog_storage::{
    AssociationRecord, AssociationStore, AssociationTable, EntityId, NewAssociation, StorageError,
};
use regex::Regex;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use crate::error::storage_error;

/// Lowercase SQL identifier, at most 63 bytes.
static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("Invalid identifier regex"));

/// Checks that a table or column name is a plain lowercase SQL identifier.
pub fn validate_identifier(name: &str) -> Result<(), StorageError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(StorageError::invalid_input(format!(
            "invalid SQL identifier: {name:?}"
        )))
    }
}

#[derive(Debug, Clone)]
struct Statements {
    list: String,
    delete: String,
    insert: String,
}

impl Statements {
    fn build(table: &AssociationTable) -> Self {
        let AssociationTable {
            name,
            owner_column,
            related_column,
        } = table;

        Self {
            list: format!(
                r#"SELECT id, "{owner_column}", "{related_column}" FROM "{name}"
                   WHERE "{owner_column}" = $1
                   ORDER BY id"#
            ),
            delete: format!(r#"DELETE FROM "{name}" WHERE id = ANY($1)"#),
            insert: format!(
                r#"INSERT INTO "{name}" ("{owner_column}", "{related_column}")
                   SELECT * FROM UNNEST($1::int8[], $2::int8[])
                   RETURNING id, "{owner_column}", "{related_column}""#
            ),
        }
    }
}

/// Association store over one PostgreSQL join table.
#[derive(Debug, Clone)]
pub struct PgAssociationStore {
    pool: PgPool,
    table: AssociationTable,
    sql: Statements,
}

impl PgAssociationStore {
    /// Creates a store for the given join table.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a table or column name is not a plain
    /// identifier.
    pub fn new(pool: PgPool, table: AssociationTable) -> Result<Self, StorageError> {
        validate_identifier(table.name)?;
        validate_identifier(table.owner_column)?;
        validate_identifier(table.related_column)?;

        Ok(Self {
            pool,
            sql: Statements::build(&table),
            table,
        })
    }
}

#[async_trait]
impl AssociationStore for PgAssociationStore {
    fn table(&self) -> &AssociationTable {
        &self.table
    }

    #[instrument(skip(self), fields(table = self.table.name))]
    async fn list_associations(
        &self,
        owner: EntityId,
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        let rows: Vec<(i64, i64, i64)> = query_as(&self.sql.list)
            .bind(owner)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, &format!("list {}", self.table.name)))?;

        Ok(rows
            .into_iter()
            .map(|(id, owner, related)| AssociationRecord { id, owner, related })
            .collect())
    }

    #[instrument(skip(self, record_ids), fields(table = self.table.name, count = record_ids.len()))]
    async fn delete_associations(&self, record_ids: &[EntityId]) -> Result<u64, StorageError> {
        if record_ids.is_empty() {
            return Ok(0);
        }

        let result = query(&self.sql.delete)
            .bind(record_ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error(e, &format!("delete from {}", self.table.name)))?;

        debug!(deleted = result.rows_affected(), "association rows deleted");
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, records), fields(table = self.table.name, count = records.len()))]
    async fn insert_associations(
        &self,
        records: &[NewAssociation],
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let (owners, related): (Vec<i64>, Vec<i64>) =
            records.iter().map(|r| (r.owner, r.related)).unzip();

        let rows: Vec<(i64, i64, i64)> = query_as(&self.sql.insert)
            .bind(owners)
            .bind(related)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error(e, &format!("insert into {}", self.table.name)))?;

        debug!(inserted = rows.len(), "association rows inserted");
        Ok(rows
            .into_iter()
            .map(|(id, owner, related)| AssociationRecord { id, owner, related })
            .collect())
    }
}
