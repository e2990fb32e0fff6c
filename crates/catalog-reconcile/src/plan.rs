//! The set difference between current join rows and a desired set.

use std::collections::HashSet;

use catalog_storage::{AssociationRecord, EntityId, NewAssociation};

use crate::desired::DesiredSet;

/// Minimal changes that bring an owner's join rows in line with a desired set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Owner whose associations are replaced.
    pub owner: EntityId,
    /// Own identifiers of the rows to delete, in listing order.
    pub to_remove: Vec<EntityId>,
    /// Rows to insert, one per related id not currently present.
    pub to_add: Vec<NewAssociation>,
    /// Number of current rows left untouched (duplicates included).
    pub retained: usize,
}

impl ReconcilePlan {
    /// Diffs `current` against `desired`.
    ///
    /// Rows belonging to another owner are ignored. Duplicate rows whose
    /// related id stays desired are retained as they are; duplicate desired
    /// ids produce a single insert.
    #[must_use]
    pub fn compute(owner: EntityId, desired: &DesiredSet, current: &[AssociationRecord]) -> Self {
        let wanted: HashSet<EntityId> = desired.as_slice().iter().copied().collect();

        let mut present: HashSet<EntityId> = HashSet::with_capacity(current.len());
        let mut to_remove = Vec::new();
        let mut retained = 0;

        for record in current.iter().filter(|r| r.owner == owner) {
            present.insert(record.related);
            if wanted.contains(&record.related) {
                retained += 1;
            } else {
                to_remove.push(record.id);
            }
        }

        let to_add = desired
            .distinct()
            .into_iter()
            .filter(|related| !present.contains(related))
            .map(|related| NewAssociation::new(owner, related))
            .collect();

        Self {
            owner,
            to_remove,
            to_add,
            retained,
        }
    }

    /// Returns `true` when neither batch has any rows.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_remove.is_empty() && self.to_add.is_empty()
    }

    /// Related identifiers that will be inserted.
    pub fn related_to_add(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.to_add.iter().map(|row| row.related)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: EntityId, owner: EntityId, related: EntityId) -> AssociationRecord {
        AssociationRecord { id, owner, related }
    }

    #[test]
    fn test_replaces_one_tag() {
        let current = [rec(10, 1, 1), rec(11, 1, 2)];
        let plan = ReconcilePlan::compute(1, &DesiredSet::from(vec![2, 3]), &current);

        assert_eq!(plan.to_remove, vec![10]);
        assert_eq!(plan.to_add, vec![NewAssociation::new(1, 3)]);
        assert_eq!(plan.retained, 1);
        assert!(!plan.is_noop());
    }

    #[test]
    fn test_empty_current_and_desired() {
        let plan = ReconcilePlan::compute(1, &DesiredSet::default(), &[]);
        assert!(plan.is_noop());
        assert_eq!(plan.retained, 0);
    }

    #[test]
    fn test_empty_desired_removes_everything() {
        let current = [rec(1, 7, 1), rec(2, 7, 2), rec(3, 7, 2)];
        let plan = ReconcilePlan::compute(7, &DesiredSet::default(), &current);

        assert_eq!(plan.to_remove, vec![1, 2, 3]);
        assert!(plan.to_add.is_empty());
    }

    #[test]
    fn test_same_set_is_noop() {
        let current = [rec(5, 1, 3), rec(6, 1, 1)];
        let plan = ReconcilePlan::compute(1, &DesiredSet::from(vec![1, 3]), &current);
        assert!(plan.is_noop());
        assert_eq!(plan.retained, 2);
    }

    #[test]
    fn test_duplicate_desired_ids_insert_once() {
        let with_dupes = ReconcilePlan::compute(1, &DesiredSet::from(vec![1, 2, 2, 3]), &[]);
        let without = ReconcilePlan::compute(1, &DesiredSet::from(vec![1, 2, 3]), &[]);

        assert_eq!(with_dupes, without);
        assert_eq!(with_dupes.related_to_add().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_rows_are_left_alone_when_still_desired() {
        let current = [rec(1, 1, 4), rec(2, 1, 4), rec(3, 1, 5)];
        let plan = ReconcilePlan::compute(1, &DesiredSet::from(vec![4]), &current);

        assert_eq!(plan.to_remove, vec![3]);
        assert!(plan.to_add.is_empty());
        assert_eq!(plan.retained, 2);
    }

    #[test]
    fn test_duplicate_rows_all_removed_when_undesired() {
        let current = [rec(1, 1, 4), rec(2, 1, 4)];
        let plan = ReconcilePlan::compute(1, &DesiredSet::from(vec![9]), &current);

        assert_eq!(plan.to_remove, vec![1, 2]);
        assert_eq!(plan.related_to_add().collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_rows_of_other_owners_are_ignored() {
        let current = [rec(1, 1, 4), rec(2, 2, 5)];
        let plan = ReconcilePlan::compute(1, &DesiredSet::from(vec![5]), &current);

        assert_eq!(plan.to_remove, vec![1]);
        assert_eq!(plan.to_add, vec![NewAssociation::new(1, 5)]);
    }

    #[test]
    fn test_batches_never_overlap() {
        let current = [rec(1, 1, 1), rec(2, 1, 2), rec(3, 1, 3), rec(4, 1, 3)];
        let desired = DesiredSet::from(vec![3, 4, 4, 5, 1]);
        let plan = ReconcilePlan::compute(1, &desired, &current);

        let removed_related: HashSet<EntityId> = current
            .iter()
            .filter(|r| plan.to_remove.contains(&r.id))
            .map(|r| r.related)
            .collect();
        let added: HashSet<EntityId> = plan.related_to_add().collect();

        assert_eq!(removed_related, HashSet::from([2]));
        assert_eq!(added, HashSet::from([4, 5]));
        assert!(removed_related.is_disjoint(&added));
        assert!(
            removed_related
                .iter()
                .all(|id| !desired.as_slice().contains(id))
        );
    }
}
