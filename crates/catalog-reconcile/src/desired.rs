//! The caller-supplied target list of related identifiers.

use catalog_storage::{EntityId, validate_id};
use serde_json::Value;

use crate::error::ReconcileError;

/// Ordered list of related identifiers an owner should end up associated with.
///
/// Duplicates and an empty list are allowed; membership is what counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredSet {
    ids: Vec<EntityId>,
}

impl DesiredSet {
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    /// The identifiers as supplied, duplicates included.
    #[must_use]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifiers with duplicates removed, keeping first-occurrence order.
    #[must_use]
    pub fn distinct(&self) -> Vec<EntityId> {
        let mut seen = std::collections::HashSet::with_capacity(self.ids.len());
        self.ids.iter().copied().filter(|id| seen.insert(*id)).collect()
    }

    /// Rejects identifiers that no backend could have allocated.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        for id in &self.ids {
            validate_id("related id", *id)
                .map_err(|e| ReconcileError::invalid_input(e.to_string()))?;
        }
        Ok(())
    }

    /// Parses a JSON array of integer identifiers.
    ///
    /// Strings, floats, nulls and nested values are rejected, as is anything
    /// that is not an array.
    pub fn from_json(value: &Value) -> Result<Self, ReconcileError> {
        let items = value.as_array().ok_or_else(|| {
            ReconcileError::invalid_input(format!("expected an array of ids, got {value}"))
        })?;

        let ids = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                item.as_i64().ok_or_else(|| {
                    ReconcileError::invalid_input(format!(
                        "element {index} is not an integer id: {item}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let set = Self { ids };
        set.validate()?;
        Ok(set)
    }

    /// Reads the desired set from a named field of a request payload.
    ///
    /// - field missing (or `null`): `InvalidInput`
    /// - field present and empty: `Ok(None)`, meaning "leave associations alone"
    /// - otherwise: the parsed set
    ///
    /// An empty array does not clear the associations.
    pub fn from_payload_field(payload: &Value, field: &str) -> Result<Option<Self>, ReconcileError> {
        let object = payload.as_object().ok_or_else(|| {
            ReconcileError::invalid_input("request payload must be a JSON object")
        })?;

        match object.get(field) {
            None | Some(Value::Null) => Err(ReconcileError::invalid_input(format!(
                "missing required field `{field}`"
            ))),
            Some(value) => {
                let set = Self::from_json(value)?;
                if set.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(set))
                }
            }
        }
    }

    /// Like [`Self::from_payload_field`], except a missing or `null` field
    /// also yields `Ok(None)`.
    pub fn from_optional_payload_field(
        payload: &Value,
        field: &str,
    ) -> Result<Option<Self>, ReconcileError> {
        match payload.get(field) {
            None | Some(Value::Null) if payload.is_object() => Ok(None),
            _ => Self::from_payload_field(payload, field),
        }
    }
}

impl From<Vec<EntityId>> for DesiredSet {
    fn from(ids: Vec<EntityId>) -> Self {
        Self { ids }
    }
}

impl FromIterator<EntityId> for DesiredSet {
    fn from_iter<I: IntoIterator<Item = EntityId>>(iter: I) -> Self {
        Self::new(iter)
    }
}
