//! Applies reconciliation plans against an association store.

use std::future::Future;
use std::time::Duration;

use catalog_storage::{
    AssociationRecord, DynAssociationStore, EntityId, StorageError, validate_id,
};
use tracing::{debug, instrument};

use crate::desired::DesiredSet;
use crate::error::{ReconcileError, StoreOperation};
use crate::plan::ReconcilePlan;

#[cfg(test)]
mod tests;

/// Tuning knobs for [`Reconciler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Upper bound for each batch. `None` waits as long as the store does.
    pub batch_timeout: Option<Duration>,
}

impl ReconcilerConfig {
    /// Sets the per-batch timeout.
    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }
}

/// What a successful reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Rows deleted by the remove batch.
    pub removed: u64,
    /// Rows created by the add batch.
    pub inserted: Vec<AssociationRecord>,
}

impl ReconcileOutcome {
    /// Returns `true` if no row was touched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.inserted.is_empty()
    }
}

/// Replaces the association set of an owner with a desired set.
///
/// The reconciler holds no lock: two concurrent calls for the same owner race
/// and the last writer wins.
#[derive(Clone)]
pub struct Reconciler {
    store: DynAssociationStore,
    config: ReconcilerConfig,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("table", self.store.table())
            .field("config", &self.config)
            .finish()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(store: DynAssociationStore) -> Self {
        Self::with_config(store, ReconcilerConfig::default())
    }

    #[must_use]
    pub fn with_config(store: DynAssociationStore, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    /// Returns the store this reconciler writes to.
    #[must_use]
    pub fn store(&self) -> &DynAssociationStore {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Makes the owner's distinct related ids equal to the distinct ids of
    /// `desired`.
    ///
    /// An empty `desired` removes every association of the owner.
    ///
    /// # Errors
    ///
    /// See [`ReconcileError`]. On `PartialApplication` the association set is
    /// left half-updated; calling again with the same `desired` finishes it.
    #[instrument(skip(self, desired), fields(table = %self.store.table().name, desired = desired.len()))]
    pub async fn reconcile(
        &self,
        owner: EntityId,
        desired: &DesiredSet,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let plan = self.plan(owner, desired).await?;
        self.apply(&plan).await
    }

    /// Loads the current rows of `owner` and diffs them against `desired`
    /// without changing anything.
    pub async fn plan(
        &self,
        owner: EntityId,
        desired: &DesiredSet,
    ) -> Result<ReconcilePlan, ReconcileError> {
        validate_id("owner id", owner).map_err(|e| ReconcileError::invalid_input(e.to_string()))?;
        desired.validate()?;

        let current = self
            .store
            .list_associations(owner)
            .await
            .map_err(|source| ReconcileError::StoreUnavailable {
                operation: StoreOperation::List,
                source,
            })?;

        let plan = ReconcilePlan::compute(owner, desired, &current);
        debug!(
            owner,
            current = current.len(),
            remove = plan.to_remove.len(),
            add = plan.to_add.len(),
            retained = plan.retained,
            "association plan computed"
        );
        Ok(plan)
    }

    /// Runs the remove and add batches of `plan` concurrently.
    ///
    /// Empty batches are resolved without a store call.
    pub async fn apply(&self, plan: &ReconcilePlan) -> Result<ReconcileOutcome, ReconcileError> {
        let remove = async {
            if plan.to_remove.is_empty() {
                return Ok(0);
            }
            self.bounded(
                StoreOperation::Delete,
                self.store.delete_associations(&plan.to_remove),
            )
            .await
        };

        let add = async {
            if plan.to_add.is_empty() {
                return Ok(Vec::new());
            }
            self.bounded(
                StoreOperation::Insert,
                self.store.insert_associations(&plan.to_add),
            )
            .await
        };

        let (removed, inserted) = tokio::join!(remove, add);
        settle(plan, removed, inserted)
    }

    async fn bounded<T, F>(&self, operation: StoreOperation, batch: F) -> Result<T, StorageError>
    where
        F: Future<Output = Result<T, StorageError>>,
    {
        let Some(limit) = self.config.batch_timeout else {
            return batch.await;
        };

        tokio::time::timeout(limit, batch).await.map_err(|_| {
            StorageError::timeout(format!(
                "{operation} on {} exceeded {}ms",
                self.store.table().name,
                limit.as_millis()
            ))
        })?
    }
}

/// Folds the two batch results into one outcome.
///
/// A batch with no rows counts as "not applied", so a failure on the other
/// side is reported as `StoreUnavailable` rather than `PartialApplication`.
fn settle(
    plan: &ReconcilePlan,
    removed: Result<u64, StorageError>,
    inserted: Result<Vec<AssociationRecord>, StorageError>,
) -> Result<ReconcileOutcome, ReconcileError> {
    match (removed, inserted) {
        (Ok(removed), Ok(inserted)) => Ok(ReconcileOutcome { removed, inserted }),
        (Err(delete), Err(insert)) => Err(ReconcileError::BatchesFailed { delete, insert }),
        (Ok(_), Err(source)) if plan.to_remove.is_empty() => {
            Err(ReconcileError::StoreUnavailable {
                operation: StoreOperation::Insert,
                source,
            })
        }
        (Ok(_), Err(source)) => Err(ReconcileError::PartialApplication {
            failed: StoreOperation::Insert,
            applied: StoreOperation::Delete,
            source,
        }),
        (Err(source), Ok(_)) if plan.to_add.is_empty() => Err(ReconcileError::StoreUnavailable {
            operation: StoreOperation::Delete,
            source,
        }),
        (Err(source), Ok(_)) => Err(ReconcileError::PartialApplication {
            failed: StoreOperation::Delete,
            applied: StoreOperation::Insert,
            source,
        }),
    }
}
