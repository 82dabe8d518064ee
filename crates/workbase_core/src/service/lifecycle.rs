//! Generic entity lifecycle engine.
//!
//! # Responsibility
//! - Implement create/read/query/update/delete for any registered entity,
//!   driven by its `EntityDescriptor`.
//! - Enforce referential integrity the document store does not provide.
//! - Translate repository faults into the entity error taxonomy.
//!
//! # Invariants
//! - No write happens unless every relation value in the payload resolved
//!   to an existing, active target.
//! - `id`, `createdAt`, `updatedAt`, `deletedAt` and `_rev` are never
//!   accepted from callers.
//! - Reads, counts, updates and deletes only see active documents;
//!   `purge_by_id` is the only operation that reaches tombstones.
//! - Documents returned to callers never carry `_rev`, neither at the top
//!   level nor inside one-hop populated relations.

use crate::error::{EntityError, EntityErrorKind, EntityResult};
use crate::model::descriptor::{
    EntityDescriptor, RelationDescriptor, CREATED_AT_FIELD, DELETED_AT_FIELD, UPDATED_AT_FIELD,
};
use crate::model::now_epoch_ms;
use crate::registry::EntityRegistry;
use crate::repo::document_repo::{
    Document, DocumentRepository, FindOptions, Populate, RepoError, ID_FIELD, REVISION_FIELD,
};
use crate::repo::filter::Filter;
use crate::service::pagination::{page_window, QueryPage};
use crate::service::reference::{
    active, all_exist, normalize_relations, validate_concurrently, CollectionProbe,
    ExistenceCheck, RelationCheck, RelationIds,
};
use log::{error, info};
use serde_json::Value;
use std::time::Instant;

/// Lifecycle engine bound to one entity descriptor.
#[derive(Clone, Copy)]
pub struct EntityLifecycle<'w> {
    repo: &'w dyn DocumentRepository,
    registry: &'w EntityRegistry,
    descriptor: &'static EntityDescriptor,
}

impl<'w> EntityLifecycle<'w> {
    pub fn new(
        repo: &'w dyn DocumentRepository,
        registry: &'w EntityRegistry,
        descriptor: &'static EntityDescriptor,
    ) -> Self {
        Self {
            repo,
            registry,
            descriptor,
        }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Creates one entity and returns it fully populated.
    ///
    /// Relation failures and structural violations surface as
    /// `DataValidation` wrapping the original cause; nothing is written.
    pub fn create(&self, input: Document) -> EntityResult<Document> {
        let started_at = Instant::now();
        let result = self.create_inner(input);
        self.log_outcome("entity_create", started_at, &result);
        result
    }

    fn create_inner(&self, mut doc: Document) -> EntityResult<Document> {
        if let Some((field, value)) = doc
            .iter()
            .find(|(field, _)| EntityDescriptor::is_system_field(field))
        {
            return Err(EntityError::invalid_operation(field.clone(), value.clone()));
        }

        let relations = normalize_relations(self.descriptor, &mut doc)
            .map_err(|err| self.creation_failure(&doc, err))?;
        let checks = self.relation_checks(relations)?;
        validate_concurrently(&checks).map_err(|err| self.creation_failure(&doc, err))?;

        for relation in self.descriptor.relations {
            if relation.is_many() && !doc.contains_key(relation.field) {
                doc.insert(relation.field.to_string(), Value::Array(Vec::new()));
            }
        }
        let now = Value::from(now_epoch_ms());
        doc.insert(ID_FIELD.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
        doc.insert(CREATED_AT_FIELD.to_string(), now.clone());
        doc.insert(UPDATED_AT_FIELD.to_string(), now);

        self.descriptor.validate_document(&doc).map_err(|violation| {
            EntityError::data_validation(self.descriptor.name, Value::Object(doc.clone()))
                .with_cause(violation)
        })?;

        let payload = Value::Object(doc.clone());
        let stored = self
            .repo
            .insert(self.descriptor.collection, vec![doc])
            .map_err(|err| self.database_failure("insert", payload.clone(), err))?;

        let id = stored
            .first()
            .and_then(|doc| doc.get(ID_FIELD))
            .and_then(Value::as_str)
            .ok_or_else(|| EntityError::unexpected(self.descriptor.name, payload))?;
        self.get_by_id(id)
    }

    /// Loads one active entity with its relations populated one hop deep.
    pub fn get_by_id(&self, id: &str) -> EntityResult<Document> {
        self.find_populated(&Filter::by_id(id))?
            .ok_or_else(|| EntityError::data_not_found(self.descriptor.name, id))
    }

    /// Loads the first active entity matching `filter`, populated.
    pub fn get_by_filter(&self, filter: &Filter) -> EntityResult<Document> {
        self.ensure_filter(filter)?;
        self.find_populated(filter)?
            .ok_or_else(|| EntityError::data_not_found(self.descriptor.name, filter.describe()))
    }

    /// Returns one page of active entities matching `filter`.
    pub fn query(
        &self,
        filter: &Filter,
        page: u64,
        items_per_page: u64,
    ) -> EntityResult<QueryPage<Document>> {
        self.ensure_filter(filter)?;
        let scoped = active(filter);
        let count = self
            .repo
            .count(self.descriptor.collection, &scoped)
            .map_err(|err| self.database_failure("count", scoped.describe(), err))?;
        let window = page_window(self.descriptor.name, count, page, items_per_page)?;

        let populate = self.populate_specs()?;
        let options = FindOptions {
            skip: window.skip,
            limit: Some(window.limit),
            populate: &populate,
            ..FindOptions::default()
        };
        let results = self
            .repo
            .find(self.descriptor.collection, &scoped, &options)
            .map_err(|err| self.database_failure("find", scoped.describe(), err))?
            .into_iter()
            .map(|doc| strip_bookkeeping(self.descriptor, doc))
            .collect();

        Ok(QueryPage {
            results,
            number_of_items: count,
            page,
            items_per_page,
        })
    }

    /// Checks an update payload and returns it with relations canonicalized.
    ///
    /// Immutable fields are rejected first, independent of anything else in
    /// the payload. Relation failures surface as `InvalidOperation` naming
    /// the relation target.
    pub fn validate_update(&self, patch: &Document) -> EntityResult<Document> {
        if let Some((field, value)) = patch
            .iter()
            .find(|(field, _)| self.descriptor.is_immutable(field))
        {
            return Err(EntityError::invalid_operation(field.clone(), value.clone()));
        }

        let mut normalized = patch.clone();
        let relations =
            normalize_relations(self.descriptor, &mut normalized).map_err(update_failure)?;
        self.descriptor.validate_patch(&normalized).map_err(|violation| {
            EntityError::data_validation(self.descriptor.name, Value::Object(patch.clone()))
                .with_cause(violation)
        })?;

        let checks = self.relation_checks(relations)?;
        validate_concurrently(&checks).map_err(update_failure)?;
        Ok(normalized)
    }

    /// Applies `patch` to the single active entity matching `filter`.
    ///
    /// A filter that matches nothing fails `InvalidArgument`. A matched
    /// document whose content does not change still succeeds.
    pub fn update_with_filter(&self, filter: &Filter, patch: &Document) -> EntityResult<()> {
        let started_at = Instant::now();
        let result = self.update_inner(filter, patch);
        self.log_outcome("entity_update", started_at, &result);
        result
    }

    fn update_inner(&self, filter: &Filter, patch: &Document) -> EntityResult<()> {
        self.ensure_filter(filter)?;
        let mut normalized = self.validate_update(patch)?;
        normalized.insert(UPDATED_AT_FIELD.to_string(), Value::from(now_epoch_ms()));
        self.write_active(filter, &normalized)
    }

    /// Updates by id and returns the re-fetched entity.
    pub fn update_by_id(&self, id: &str, patch: &Document) -> EntityResult<Document> {
        self.update_with_filter(&Filter::by_id(id), patch)?;
        self.get_by_id(id)
    }

    /// Tombstones one active entity by id.
    pub fn delete_by_id(&self, id: &str) -> EntityResult<()> {
        self.delete_by_filter(&Filter::by_id(id))
    }

    /// Tombstones the single active entity matching `filter`.
    ///
    /// Dependent entities keep their references.
    pub fn delete_by_filter(&self, filter: &Filter) -> EntityResult<()> {
        let started_at = Instant::now();
        let result = self.ensure_filter(filter).and_then(|()| {
            let now = Value::from(now_epoch_ms());
            let mut tombstone = Document::new();
            tombstone.insert(DELETED_AT_FIELD.to_string(), now.clone());
            tombstone.insert(UPDATED_AT_FIELD.to_string(), now);
            self.write_active(filter, &tombstone)
        });
        self.log_outcome("entity_delete", started_at, &result);
        result
    }

    /// Physically removes one entity by id, tombstoned or not.
    pub fn purge_by_id(&self, id: &str) -> EntityResult<()> {
        let started_at = Instant::now();
        let filter = Filter::by_id(id);
        let result = self
            .repo
            .delete_one(self.descriptor.collection, &filter)
            .map_err(|err| self.database_failure("delete_one", filter.describe(), err))
            .and_then(|deleted| {
                if deleted == 1 {
                    Ok(())
                } else {
                    Err(EntityError::invalid_argument(
                        self.descriptor.name,
                        filter.describe(),
                    ))
                }
            });
        self.log_outcome("entity_purge", started_at, &result);
        result
    }

    /// Whether an active entity with `id` exists.
    pub fn exists(&self, id: &str) -> EntityResult<bool> {
        self.probe().exists(id)
    }

    /// `true` when every id exists; otherwise `DataNotFound` listing the
    /// missing ids in input order.
    pub fn all_exist(&self, ids: &[String]) -> EntityResult<bool> {
        all_exist(ids, &self.probe())
    }

    /// Existence check for the target of `relation`.
    pub(crate) fn target_probe(
        &self,
        relation: &RelationDescriptor,
    ) -> EntityResult<CollectionProbe<'w>> {
        Ok(CollectionProbe::new(self.repo, self.target(relation)?))
    }

    /// Loads one active document without population or stripping.
    pub(crate) fn load_raw(&self, id: &str) -> EntityResult<Document> {
        let filter = active(&Filter::by_id(id));
        self.repo
            .find_one(self.descriptor.collection, &filter, &[])
            .map_err(|err| self.database_failure("find_one", filter.describe(), err))?
            .ok_or_else(|| EntityError::data_not_found(self.descriptor.name, id))
    }

    /// Writes one relation field of an already validated owner.
    pub(crate) fn write_relation(&self, id: &str, field: &str, value: Value) -> EntityResult<()> {
        let started_at = Instant::now();
        let mut patch = Document::new();
        patch.insert(field.to_string(), value);
        patch.insert(UPDATED_AT_FIELD.to_string(), Value::from(now_epoch_ms()));
        let result = self.write_active(&Filter::by_id(id), &patch);
        self.log_outcome("entity_relation_write", started_at, &result);
        result
    }

    fn write_active(&self, filter: &Filter, patch: &Document) -> EntityResult<()> {
        let scoped = active(filter);
        let outcome = self
            .repo
            .update_one(self.descriptor.collection, &scoped, patch)
            .map_err(|err| self.database_failure("update_one", Value::Object(patch.clone()), err))?;
        if outcome.matched_count == 1 {
            Ok(())
        } else {
            Err(EntityError::invalid_argument(
                self.descriptor.name,
                filter.describe(),
            ))
        }
    }

    fn find_populated(&self, filter: &Filter) -> EntityResult<Option<Document>> {
        let scoped = active(filter);
        let populate = self.populate_specs()?;
        self.repo
            .find_one(self.descriptor.collection, &scoped, &populate)
            .map(|found| found.map(|doc| strip_bookkeeping(self.descriptor, doc)))
            .map_err(|err| self.database_failure("find_one", scoped.describe(), err))
    }

    fn relation_checks(
        &self,
        relations: Vec<(&'static RelationDescriptor, RelationIds)>,
    ) -> EntityResult<Vec<RelationCheck<CollectionProbe<'w>>>> {
        relations
            .into_iter()
            .map(|(relation, ids)| {
                Ok(RelationCheck {
                    relation,
                    ids,
                    target: self.target_probe(relation)?,
                })
            })
            .collect()
    }

    fn populate_specs(&self) -> EntityResult<Vec<Populate<'static>>> {
        self.descriptor
            .relations
            .iter()
            .map(|relation| {
                Ok(Populate {
                    field: relation.field,
                    collection: self.target(relation)?.collection,
                })
            })
            .collect()
    }

    fn target(&self, relation: &RelationDescriptor) -> EntityResult<&'static EntityDescriptor> {
        self.registry.get(relation.target).ok_or_else(|| {
            EntityError::unexpected(
                format!("{}.{}", self.descriptor.name, relation.field),
                relation.target,
            )
        })
    }

    fn probe(&self) -> CollectionProbe<'w> {
        CollectionProbe::new(self.repo, self.descriptor)
    }

    fn ensure_filter(&self, filter: &Filter) -> EntityResult<()> {
        match filter.invalid_field() {
            Some(field) => Err(EntityError::invalid_argument("filter", field)),
            None => Ok(()),
        }
    }

    fn creation_failure(&self, doc: &Document, err: EntityError) -> EntityError {
        if is_reference_failure(&err) {
            EntityError::data_validation(self.descriptor.name, Value::Object(doc.clone()))
                .with_cause(err)
        } else {
            err
        }
    }

    fn database_failure(&self, primitive: &str, value: Value, err: RepoError) -> EntityError {
        EntityError::database_operation(format!("{}.{primitive}", self.descriptor.collection), value)
            .with_cause(err)
    }

    fn log_outcome<T>(&self, event: &str, started_at: Instant, result: &EntityResult<T>) {
        match result {
            Ok(_) => info!(
                "event={} module=service status=ok entity={} duration_ms={}",
                event,
                self.descriptor.name,
                started_at.elapsed().as_millis()
            ),
            Err(err) if err.is_validation_class() || err.kind() == EntityErrorKind::DataNotFound => {
                info!(
                    "event={} module=service status=rejected entity={} duration_ms={} error_code={}",
                    event,
                    self.descriptor.name,
                    started_at.elapsed().as_millis(),
                    err.kind()
                )
            }
            Err(err) => error!(
                "event={} module=service status=error entity={} duration_ms={} error_code={} error={}",
                event,
                self.descriptor.name,
                started_at.elapsed().as_millis(),
                err.kind(),
                err
            ),
        }
    }
}

/// Missing or malformed reference, as opposed to an infrastructure fault.
fn is_reference_failure(err: &EntityError) -> bool {
    matches!(
        err.kind(),
        EntityErrorKind::DataNotFound | EntityErrorKind::InvalidArgument
    )
}

fn update_failure(err: EntityError) -> EntityError {
    if is_reference_failure(&err) {
        EntityError::invalid_operation(err.subject().to_string(), err.value().clone())
            .with_cause(err)
    } else {
        err
    }
}

/// Removes `_rev` from `doc` and from the populated objects of its relation
/// fields. Other object-valued fields are user data and stay untouched.
pub(crate) fn strip_bookkeeping(descriptor: &EntityDescriptor, mut doc: Document) -> Document {
    doc.remove(REVISION_FIELD);
    for relation in descriptor.relations {
        match doc.get_mut(relation.field) {
            Some(Value::Object(related)) => {
                related.remove(REVISION_FIELD);
            }
            Some(Value::Array(items)) => {
                for item in items.iter_mut() {
                    if let Value::Object(related) = item {
                        related.remove(REVISION_FIELD);
                    }
                }
            }
            _ => {}
        }
    }
    doc
}
