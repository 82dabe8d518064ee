//! Typed entity service.
//!
//! # Responsibility
//! - Expose the lifecycle engine with typed inputs and outputs per entity.
//! - Resolve `Reference` values to canonical ids at the API boundary.
//!
//! # Invariants
//! - Inputs are serialized to documents before any validation runs; the
//!   engine never sees typed values.
//! - A stored document that does not deserialize into its entity type is an
//!   `Unexpected` failure.

use crate::error::{EntityError, EntityResult};
use crate::model::{Entity, EntityId, Reference};
use crate::repo::document_repo::Document;
use crate::repo::filter::Filter;
use crate::service::lifecycle::EntityLifecycle;
use crate::service::pagination::QueryPage;
use crate::service::relationship::{RelationshipEdit, RelationshipMutator};
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// Lifecycle operations for entity type `E`.
pub struct EntityService<'w, E> {
    lifecycle: EntityLifecycle<'w>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityService<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EntityService<'_, E> {}

impl<'w, E: Entity> EntityService<'w, E> {
    pub fn new(lifecycle: EntityLifecycle<'w>) -> Self {
        Self {
            lifecycle,
            _entity: PhantomData,
        }
    }

    /// Untyped engine behind this service.
    pub fn lifecycle(&self) -> EntityLifecycle<'w> {
        self.lifecycle
    }

    pub fn create(&self, input: &E::Create) -> EntityResult<E> {
        let doc = to_document::<E, _>(input)?;
        from_document(self.lifecycle.create(doc)?)
    }

    pub fn get_by_id(&self, id: EntityId) -> EntityResult<E> {
        from_document(self.lifecycle.get_by_id(&id.to_string())?)
    }

    pub fn get_by_filter(&self, filter: &Filter) -> EntityResult<E> {
        from_document(self.lifecycle.get_by_filter(filter)?)
    }

    pub fn query(
        &self,
        filter: &Filter,
        page: u64,
        items_per_page: u64,
    ) -> EntityResult<QueryPage<E>> {
        self.lifecycle
            .query(filter, page, items_per_page)?
            .try_map(from_document)
    }

    /// Runs update validation without writing.
    pub fn validate_update(&self, patch: &E::Patch) -> EntityResult<()> {
        let patch = to_document::<E, _>(patch)?;
        self.lifecycle.validate_update(&patch).map(|_| ())
    }

    pub fn update_with_filter(&self, filter: &Filter, patch: &E::Patch) -> EntityResult<()> {
        let patch = to_document::<E, _>(patch)?;
        self.lifecycle.update_with_filter(filter, &patch)
    }

    pub fn update_by_id(&self, id: EntityId, patch: &E::Patch) -> EntityResult<E> {
        let patch = to_document::<E, _>(patch)?;
        from_document(self.lifecycle.update_by_id(&id.to_string(), &patch)?)
    }

    pub fn delete_by_id(&self, id: EntityId) -> EntityResult<()> {
        self.lifecycle.delete_by_id(&id.to_string())
    }

    pub fn delete_by_filter(&self, filter: &Filter) -> EntityResult<()> {
        self.lifecycle.delete_by_filter(filter)
    }

    pub fn purge_by_id(&self, id: EntityId) -> EntityResult<()> {
        self.lifecycle.purge_by_id(&id.to_string())
    }

    pub fn exists(&self, id: EntityId) -> EntityResult<bool> {
        self.lifecycle.exists(&id.to_string())
    }

    pub fn all_exist(&self, ids: &[EntityId]) -> EntityResult<bool> {
        let ids: Vec<String> = ids.iter().map(EntityId::to_string).collect();
        self.lifecycle.all_exist(&ids)
    }

    pub(crate) fn add_many<T: Entity>(
        &self,
        field: &str,
        owner_id: EntityId,
        refs: &[Reference<T>],
    ) -> EntityResult<RelationshipEdit<E>> {
        self.mutator()
            .add_many(&owner_id.to_string(), field, &reference_values(refs))?
            .try_map(from_document)
    }

    pub(crate) fn remove_many<T: Entity>(
        &self,
        field: &str,
        owner_id: EntityId,
        refs: &[Reference<T>],
    ) -> EntityResult<RelationshipEdit<E>> {
        self.mutator()
            .remove_many(&owner_id.to_string(), field, &reference_values(refs))?
            .try_map(from_document)
    }

    pub(crate) fn add_single<T: Entity>(
        &self,
        field: &str,
        owner_id: EntityId,
        reference: &Reference<T>,
    ) -> EntityResult<RelationshipEdit<E>> {
        let reference = Value::String(reference.id().to_string());
        self.mutator()
            .add_single(&owner_id.to_string(), field, &reference)?
            .try_map(from_document)
    }

    pub(crate) fn remove_single(
        &self,
        field: &str,
        owner_id: EntityId,
    ) -> EntityResult<RelationshipEdit<E>> {
        self.mutator()
            .remove_single(&owner_id.to_string(), field)?
            .try_map(from_document)
    }

    fn mutator(&self) -> RelationshipMutator<'w> {
        RelationshipMutator::new(self.lifecycle)
    }
}

fn reference_values<T: Entity>(refs: &[Reference<T>]) -> Vec<Value> {
    refs.iter()
        .map(|reference| Value::String(reference.id().to_string()))
        .collect()
}

fn to_document<E: Entity, I: Serialize>(input: &I) -> EntityResult<Document> {
    let name = E::descriptor().name;
    match serde_json::to_value(input) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(EntityError::invalid_argument(name, other)),
        Err(err) => Err(EntityError::invalid_argument(name, Value::Null).with_cause(err)),
    }
}

fn from_document<E: Entity>(doc: Document) -> EntityResult<E> {
    let value = Value::Object(doc);
    serde_json::from_value(value.clone()).map_err(|err| {
        EntityError::unexpected(E::descriptor().name, value).with_cause(err)
    })
}
