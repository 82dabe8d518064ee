//! Relationship edits with dirty checking.
//!
//! # Responsibility
//! - Add/remove ids on list relations and set/clear single relations of an
//!   owner entity.
//! - Skip the write when the edit does not change the stored value.
//!
//! # Invariants
//! - Ids are compared by string equality after canonicalization.
//! - Added targets are validated through the reference checks; removals are
//!   not.
//! - The owner is always re-fetched and returned populated, whether or not
//!   a write happened.
//!
//! # Concurrency
//! Every edit is a read-modify-write of one document without a version
//! check. Two concurrent edits of the same owner each compute their delta
//! from the list they read, and the later write replaces the whole list:
//! an addition made by the other writer can be lost.

use crate::error::{EntityError, EntityResult};
use crate::model::descriptor::RelationDescriptor;
use crate::repo::document_repo::Document;
use crate::service::lifecycle::EntityLifecycle;
use crate::service::reference::{all_exist, normalize_reference, resolve_reference};
use serde_json::Value;

/// Result of a relationship edit.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipEdit<T> {
    /// Owner after the edit, re-fetched and populated.
    pub entity: T,
    /// Whether the stored relation value changed.
    pub changed: bool,
}

impl<T> RelationshipEdit<T> {
    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<RelationshipEdit<U>, E> {
        Ok(RelationshipEdit {
            entity: f(self.entity)?,
            changed: self.changed,
        })
    }
}

/// Relationship mutator over one entity's lifecycle engine.
#[derive(Clone, Copy)]
pub struct RelationshipMutator<'w> {
    lifecycle: EntityLifecycle<'w>,
}

impl<'w> RelationshipMutator<'w> {
    pub fn new(lifecycle: EntityLifecycle<'w>) -> Self {
        Self { lifecycle }
    }

    /// Appends the ids of `candidates` not already present in `field`.
    pub fn add_many(
        &self,
        owner_id: &str,
        field: &str,
        candidates: &[Value],
    ) -> EntityResult<RelationshipEdit<Document>> {
        let relation = self.relation(field, true)?;
        let owner = self.lifecycle.load_raw(owner_id)?;
        if candidates.is_empty() {
            return Err(EntityError::invalid_argument(relation.target, Value::Array(Vec::new())));
        }

        let ids = candidates
            .iter()
            .map(|candidate| normalize_reference(relation, candidate))
            .collect::<EntityResult<Vec<_>>>()?;
        all_exist(&ids, &self.lifecycle.target_probe(relation)?)?;

        let mut current = id_list(&owner, field);
        let before = current.len();
        for id in ids {
            if !current.contains(&id) {
                current.push(id);
            }
        }

        let changed = current.len() != before;
        if changed {
            self.lifecycle
                .write_relation(owner_id, field, to_id_array(current))?;
        }
        self.finish(owner_id, changed)
    }

    /// Removes every id of `refs` from `field`; absent ids are ignored.
    pub fn remove_many(
        &self,
        owner_id: &str,
        field: &str,
        refs: &[Value],
    ) -> EntityResult<RelationshipEdit<Document>> {
        let relation = self.relation(field, true)?;
        let owner = self.lifecycle.load_raw(owner_id)?;
        if refs.is_empty() {
            return Err(EntityError::invalid_argument(relation.target, Value::Array(Vec::new())));
        }

        let removed = refs
            .iter()
            .map(|value| normalize_reference(relation, value))
            .collect::<EntityResult<Vec<_>>>()?;

        let current = id_list(&owner, field);
        let before = current.len();
        let kept: Vec<String> = current
            .into_iter()
            .filter(|id| !removed.contains(id))
            .collect();

        let changed = kept.len() != before;
        if changed {
            self.lifecycle.write_relation(owner_id, field, to_id_array(kept))?;
        }
        self.finish(owner_id, changed)
    }

    /// Points the single relation `field` at `reference`.
    pub fn add_single(
        &self,
        owner_id: &str,
        field: &str,
        reference: &Value,
    ) -> EntityResult<RelationshipEdit<Document>> {
        let relation = self.relation(field, false)?;
        let owner = self.lifecycle.load_raw(owner_id)?;
        let id = resolve_reference(relation, reference, &self.lifecycle.target_probe(relation)?)?;

        let changed = owner.get(field).and_then(Value::as_str) != Some(id.as_str());
        if changed {
            self.lifecycle
                .write_relation(owner_id, field, Value::String(id))?;
        }
        self.finish(owner_id, changed)
    }

    /// Clears the single relation `field`. Always persists.
    pub fn remove_single(&self, owner_id: &str, field: &str) -> EntityResult<RelationshipEdit<Document>> {
        let relation = self.relation(field, false)?;
        if relation.is_required() {
            return Err(EntityError::invalid_operation(field, Value::Null));
        }
        let owner = self.lifecycle.load_raw(owner_id)?;

        let changed = !owner.get(field).map_or(true, Value::is_null);
        self.lifecycle.write_relation(owner_id, field, Value::Null)?;
        self.finish(owner_id, changed)
    }

    fn relation(&self, field: &str, many: bool) -> EntityResult<&'static RelationDescriptor> {
        let descriptor = self.lifecycle.descriptor();
        let relation = descriptor
            .relation(field)
            .filter(|relation| relation.is_many() == many)
            .ok_or_else(|| EntityError::invalid_argument(descriptor.name, field))?;
        if descriptor.is_immutable(field) {
            return Err(EntityError::invalid_operation(field, descriptor.name));
        }
        Ok(relation)
    }

    fn finish(&self, owner_id: &str, changed: bool) -> EntityResult<RelationshipEdit<Document>> {
        Ok(RelationshipEdit {
            entity: self.lifecycle.get_by_id(owner_id)?,
            changed,
        })
    }
}

fn id_list(owner: &Document, field: &str) -> Vec<String> {
    owner
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn to_id_array(ids: Vec<String>) -> Value {
    Value::Array(ids.into_iter().map(Value::String).collect())
}

