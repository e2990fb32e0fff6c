use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use catalog_storage::{
    AssociationRecord, AssociationStore, AssociationTable, EntityId, NewAssociation, StorageError,
};

use super::*;

/// Association store that records every call and can be told to fail.
#[derive(Default)]
struct RecordingStore {
    rows: Mutex<Vec<AssociationRecord>>,
    next_id: AtomicI64,
    list_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    fail_list: AtomicBool,
    fail_delete: AtomicBool,
    fail_insert: AtomicBool,
    stall_insert: AtomicBool,
}

impl RecordingStore {
    fn with_rows(rows: &[(EntityId, EntityId, EntityId)]) -> Arc<Self> {
        let store = Self::default();
        let max_id = rows.iter().map(|r| r.0).max().unwrap_or(0);
        store.next_id.store(max_id + 1, Ordering::SeqCst);
        *store.rows.lock().unwrap() = rows
            .iter()
            .map(|&(id, owner, related)| AssociationRecord { id, owner, related })
            .collect();
        Arc::new(store)
    }

    fn related_of(&self, owner: EntityId) -> BTreeSet<EntityId> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.related)
            .collect()
    }

    fn row_ids(&self) -> BTreeSet<EntityId> {
        self.rows.lock().unwrap().iter().map(|r| r.id).collect()
    }

    fn mutation_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst) + self.insert_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssociationStore for RecordingStore {
    fn table(&self) -> &AssociationTable {
        &AssociationTable::PRODUCT_TAG
    }

    async fn list_associations(
        &self,
        owner: EntityId,
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(StorageError::connection("connection refused"));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.owner == owner)
            .copied()
            .collect())
    }

    async fn delete_associations(&self, record_ids: &[EntityId]) -> Result<u64, StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::connection("delete failed"));
        }
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !record_ids.contains(&r.id));
        Ok((before - rows.len()) as u64)
    }

    async fn insert_associations(
        &self,
        records: &[NewAssociation],
    ) -> Result<Vec<AssociationRecord>, StorageError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.stall_insert.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(StorageError::connection("insert failed"));
        }
        let mut rows = self.rows.lock().unwrap();
        let created: Vec<AssociationRecord> = records
            .iter()
            .map(|new| AssociationRecord {
                id: self.next_id.fetch_add(1, Ordering::SeqCst),
                owner: new.owner,
                related: new.related,
            })
            .collect();
        rows.extend(created.iter().copied());
        Ok(created)
    }
}

fn reconciler(store: &Arc<RecordingStore>) -> Reconciler {
    Reconciler::new(store.clone())
}

#[tokio::test]
async fn test_replaces_related_set() {
    let store = RecordingStore::with_rows(&[(10, 1, 1), (11, 1, 2)]);
    let outcome = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![2, 3]))
        .await
        .unwrap();

    assert_eq!(outcome.removed, 1);
    assert_eq!(outcome.inserted.len(), 1);
    assert_eq!(outcome.inserted[0].owner, 1);
    assert_eq!(outcome.inserted[0].related, 3);
    assert_eq!(store.related_of(1), BTreeSet::from([2, 3]));
    assert!(!store.row_ids().contains(&10));
    assert!(store.row_ids().contains(&11));
}

#[tokio::test]
async fn test_empty_to_empty_only_lists() {
    let store = RecordingStore::with_rows(&[]);
    let outcome = reconciler(&store)
        .reconcile(1, &DesiredSet::default())
        .await
        .unwrap();

    assert!(outcome.is_noop());
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_second_run_is_noop() {
    let store = RecordingStore::with_rows(&[(1, 5, 1), (2, 5, 4), (3, 5, 4)]);
    let reconciler = reconciler(&store);
    let desired = DesiredSet::from(vec![4, 6, 6]);

    reconciler.reconcile(5, &desired).await.unwrap();
    let calls_after_first = store.mutation_calls();
    let rows_after_first = store.row_ids();

    let outcome = reconciler.reconcile(5, &desired).await.unwrap();

    assert!(outcome.is_noop());
    assert_eq!(store.mutation_calls(), calls_after_first);
    assert_eq!(store.row_ids(), rows_after_first);
    assert_eq!(store.related_of(5), BTreeSet::from([4, 6]));
}

#[tokio::test]
async fn test_only_additions_skip_delete_call() {
    let store = RecordingStore::with_rows(&[(1, 1, 1)]);
    reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![1, 2]))
        .await
        .unwrap();

    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.insert_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_desired_clears_owner() {
    let store = RecordingStore::with_rows(&[(1, 1, 1), (2, 1, 2), (3, 2, 1)]);
    let outcome = reconciler(&store)
        .reconcile(1, &DesiredSet::default())
        .await
        .unwrap();

    assert_eq!(outcome.removed, 2);
    assert!(store.related_of(1).is_empty());
    assert_eq!(store.related_of(2), BTreeSet::from([1]));
}

#[tokio::test]
async fn test_invalid_input_makes_no_store_call() {
    let store = RecordingStore::with_rows(&[]);
    let reconciler = reconciler(&store);

    let err = reconciler
        .reconcile(1, &DesiredSet::from(vec![1, -2]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidInput { .. }));

    let err = reconciler
        .reconcile(0, &DesiredSet::from(vec![1]))
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::InvalidInput { .. }));

    assert_eq!(store.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_list_failure_is_store_unavailable() {
    let store = RecordingStore::with_rows(&[(1, 1, 1)]);
    store.fail_list.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![2]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::StoreUnavailable {
            operation: StoreOperation::List,
            ..
        }
    ));
    assert_eq!(store.mutation_calls(), 0);
}

#[tokio::test]
async fn test_insert_failure_after_delete_is_partial() {
    let store = RecordingStore::with_rows(&[(10, 1, 1), (11, 1, 2)]);
    store.fail_insert.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![2, 3]))
        .await
        .unwrap_err();

    match err {
        ReconcileError::PartialApplication {
            failed, applied, ..
        } => {
            assert_eq!(failed, StoreOperation::Insert);
            assert_eq!(applied, StoreOperation::Delete);
        }
        other => panic!("expected partial application, got {other:?}"),
    }
    // The delete side stays applied.
    assert_eq!(store.related_of(1), BTreeSet::from([2]));
}

#[tokio::test]
async fn test_delete_failure_after_insert_is_partial() {
    let store = RecordingStore::with_rows(&[(10, 1, 1)]);
    store.fail_delete.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![3]))
        .await
        .unwrap_err();

    assert!(err.is_partial());
    assert_eq!(err.failed_operation(), Some(StoreOperation::Delete));
    assert_eq!(store.related_of(1), BTreeSet::from([1, 3]));
}

#[tokio::test]
async fn test_both_batches_failing_is_reported_together() {
    let store = RecordingStore::with_rows(&[(10, 1, 1)]);
    store.fail_delete.store(true, Ordering::SeqCst);
    store.fail_insert.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![3]))
        .await
        .unwrap_err();

    assert!(matches!(err, ReconcileError::BatchesFailed { .. }));
    assert!(!err.is_partial());
    assert_eq!(store.related_of(1), BTreeSet::from([1]));
}

#[tokio::test]
async fn test_insert_failure_without_removals_is_not_partial() {
    let store = RecordingStore::with_rows(&[(10, 1, 1)]);
    store.fail_insert.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![1, 2]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::StoreUnavailable {
            operation: StoreOperation::Insert,
            ..
        }
    ));
}

#[tokio::test]
async fn test_delete_failure_without_additions_is_not_partial() {
    let store = RecordingStore::with_rows(&[(10, 1, 1), (11, 1, 2)]);
    store.fail_delete.store(true, Ordering::SeqCst);

    let err = reconciler(&store)
        .reconcile(1, &DesiredSet::from(vec![2]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ReconcileError::StoreUnavailable {
            operation: StoreOperation::Delete,
            ..
        }
    ));
    assert!(!err.is_partial());
    assert_eq!(store.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.related_of(1), BTreeSet::from([1, 2]));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_batch_times_out() {
    let store = RecordingStore::with_rows(&[(10, 1, 1)]);
    store.stall_insert.store(true, Ordering::SeqCst);

    let reconciler = Reconciler::with_config(
        store.clone(),
        ReconcilerConfig::default().with_batch_timeout(Duration::from_secs(5)),
    );

    let err = reconciler
        .reconcile(1, &DesiredSet::from(vec![2]))
        .await
        .unwrap_err();

    match err {
        ReconcileError::PartialApplication { failed, source, .. } => {
            assert_eq!(failed, StoreOperation::Insert);
            assert!(matches!(source, StorageError::Timeout { .. }));
        }
        other => panic!("expected partial application, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plan_does_not_mutate() {
    let store = RecordingStore::with_rows(&[(10, 1, 1), (11, 1, 2)]);
    let plan = reconciler(&store)
        .plan(1, &DesiredSet::from(vec![2, 3]))
        .await
        .unwrap();

    assert_eq!(plan.to_remove, vec![10]);
    assert_eq!(plan.related_to_add().collect::<Vec<_>>(), vec![3]);
    assert_eq!(store.mutation_calls(), 0);
}
