//! In-memory join table.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use catalog_storage::{
    AssociationRecord, AssociationStore, AssociationTable, EntityId, NewAssociation, StorageError,
};
use tokio::sync::RwLock;

/// One many-to-many join table held in memory.
///
/// Rows are keyed by their own identifier, which is allocated from a
/// monotonically increasing counter. No uniqueness is enforced on the
/// (owner, related) pair and no referential checks are made.
#[derive(Debug)]
pub struct InMemoryAssociationStore {
    table: AssociationTable,
    rows: RwLock<BTreeMap<EntityId, AssociationRecord>>,
    next_id: AtomicI64,
}

impl Default for InMemoryAssociationStore {
    fn default() -> Self {
        Self::new(AssociationTable::PRODUCT_TAG)
    }
}

impl InMemoryAssociationStore {
    #[must_use]
    pub fn new(table: AssociationTable) -> Self {
        Self {
            table,
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Generates the next row identifier.
    fn next_id(&self) -> EntityId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Total number of rows, all owners included.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Distinct related identifiers of an owner, ascending.
    pub async fn related_of(&self, owner: EntityId) -> BTreeSet<EntityId> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.owner == owner)
            .map(|row| row.related)
            .collect()
    }

    /// Distinct owners linked to a related identifier, ascending.
    pub async fn owners_of(&self, related: EntityId) -> BTreeSet<EntityId> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| row.related == related)
            .map(|row| row.owner)
            .collect()
    }

    /// Removes every row of an owner. Used for cascading deletes.
    pub async fn remove_owner(&self, owner: EntityId) -> u64 {
        self.remove_where(|row| row.owner == owner).await
    }

    /// Removes every row pointing at a related identifier.
    pub async fn remove_related(&self, related: EntityId) -> u64 {
        self.remove_where(|row| row.related == related).await
    }

    async fn remove_where(&self, predicate: impl Fn(&AssociationRecord) -> bool) -> u64 {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, row| !predicate(row));
        (before - rows.len()) as u64
    }
}

#[async_trait]
impl AssociationStore for InMemoryAssociationStore {
    fn table(&self) -> &AssociationTable {
        &self.table
    }

    async fn list_associations(
        &self,
        owner: EntityId,
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|row| row.owner == owner).copied().collect())
    }

    async fn delete_associations(&self, record_ids: &[EntityId]) -> Result<u64, StorageError> {
        if record_ids.is_empty() {
            return Ok(0);
        }
        let mut rows = self.rows.write().await;
        let deleted = record_ids
            .iter()
            .filter(|id| rows.remove(*id).is_some())
            .count();
        Ok(deleted as u64)
    }

    async fn insert_associations(
        &self,
        records: &[NewAssociation],
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        let mut rows = self.rows.write().await;
        let created: Vec<AssociationRecord> = records
            .iter()
            .map(|new| AssociationRecord {
                id: self.next_id(),
                owner: new.owner,
                related: new.related,
            })
            .collect();
        for row in &created {
            rows.insert(row.id, *row);
        }
        Ok(created)
    }
}
