//! Randomized convergence checks against the in-memory backend.

use std::collections::BTreeSet;
use std::sync::Arc;

use catalog_db_memory::InMemoryAssociationStore;
use catalog_reconcile::{DesiredSet, Reconciler};
use catalog_storage::{AssociationStore, AssociationTable, EntityId, NewAssociation};

const ROUNDS: usize = 200;
const OWNERS: EntityId = 4;

fn random_ids(rng: &mut fastrand::Rng, max_len: usize) -> Vec<EntityId> {
    let len = rng.usize(0..=max_len);
    (0..len).map(|_| rng.i64(1..=8)).collect()
}

async fn seed(store: &InMemoryAssociationStore, rng: &mut fastrand::Rng) {
    let mut rows = Vec::new();
    for owner in 1..=OWNERS {
        for related in random_ids(rng, 6) {
            rows.push(NewAssociation::new(owner, related));
        }
    }
    store.insert_associations(&rows).await.unwrap();
}

#[tokio::test]
async fn reconcile_converges_and_is_idempotent() {
    let mut rng = fastrand::Rng::with_seed(0x5eed);

    for _ in 0..ROUNDS {
        let store = Arc::new(InMemoryAssociationStore::new(AssociationTable::PRODUCT_TAG));
        seed(&store, &mut rng).await;
        let reconciler = Reconciler::new(store.clone());

        let owner = rng.i64(1..=OWNERS);
        let desired = DesiredSet::from(random_ids(&mut rng, 6));
        let wanted: BTreeSet<EntityId> = desired.as_slice().iter().copied().collect();

        let mut untouched = Vec::new();
        for other in (1..=OWNERS).filter(|o| *o != owner) {
            untouched.push((other, store.list_associations(other).await.unwrap()));
        }
        let before = store.list_associations(owner).await.unwrap();
        let before_ids: BTreeSet<EntityId> = before.iter().map(|r| r.id).collect();
        let before_related: BTreeSet<EntityId> = before.iter().map(|r| r.related).collect();

        reconciler.reconcile(owner, &desired).await.unwrap();

        // Exact set match.
        assert_eq!(store.related_of(owner).await, wanted);

        // Rows already matching the desired set are kept, not recreated.
        let after = store.list_associations(owner).await.unwrap();
        let kept_related: BTreeSet<EntityId> = after
            .iter()
            .filter(|r| before_ids.contains(&r.id))
            .map(|r| r.related)
            .collect();
        let expected_kept: BTreeSet<EntityId> =
            wanted.intersection(&before_related).copied().collect();
        assert_eq!(kept_related, expected_kept);

        // Other owners are never touched.
        for (other, rows) in &untouched {
            assert_eq!(&store.list_associations(*other).await.unwrap(), rows);
        }

        // A second pass has nothing to do.
        let len = store.len().await;
        let second = reconciler.reconcile(owner, &desired).await.unwrap();
        assert!(second.is_noop());
        assert_eq!(store.len().await, len);
    }
}

#[tokio::test]
async fn duplicate_desired_ids_produce_one_row_each() {
    let store = Arc::new(InMemoryAssociationStore::default());
    let reconciler = Reconciler::new(store.clone());

    let outcome = reconciler
        .reconcile(1, &DesiredSet::from(vec![3, 3, 4, 3]))
        .await
        .unwrap();

    assert_eq!(outcome.inserted.len(), 2);
    assert_eq!(store.len().await, 2);
}
