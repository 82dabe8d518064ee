//! Reference validation: canonical ids and existence checks.
//!
//! # Responsibility
//! - Resolve relation inputs (bare id or embedded object) into canonical ids.
//! - Confirm referenced ids exist in the target collection.
//! - Fan out independent relation checks of one write concurrently.
//!
//! # Invariants
//! - `all_exist` issues one membership query and reports every missing id,
//!   deduplicated, in caller order.
//! - Only active (not tombstoned) documents count as existing.
//! - Concurrent checks are never cancelled: every launched check completes
//!   and the first failure in relation declaration order is reported.

use crate::error::{EntityError, EntityResult};
use crate::model::descriptor::{EntityDescriptor, RelationDescriptor, RelationKind, DELETED_AT_FIELD};
use crate::repo::document_repo::{Document, DocumentRepository, FindOptions, ID_FIELD};
use crate::repo::filter::Filter;
use serde_json::Value;
use std::collections::HashSet;
use std::thread;
use uuid::Uuid;

/// Existence-check capability of one target entity.
pub trait ExistenceCheck: Sync {
    /// Entity name used as error subject.
    fn subject(&self) -> &str;
    fn exists(&self, id: &str) -> EntityResult<bool>;
    /// Returns the subset of `ids` that exist, in any order.
    fn find_existing(&self, ids: &[String]) -> EntityResult<Vec<String>>;
}

/// [`ExistenceCheck`] backed by a document collection.
#[derive(Clone, Copy)]
pub struct CollectionProbe<'w> {
    repo: &'w dyn DocumentRepository,
    descriptor: &'static EntityDescriptor,
}

impl<'w> CollectionProbe<'w> {
    pub fn new(repo: &'w dyn DocumentRepository, descriptor: &'static EntityDescriptor) -> Self {
        Self { repo, descriptor }
    }
}

impl ExistenceCheck for CollectionProbe<'_> {
    fn subject(&self) -> &str {
        self.descriptor.name
    }

    fn exists(&self, id: &str) -> EntityResult<bool> {
        let filter = active(&Filter::by_id(id));
        self.repo
            .count(self.descriptor.collection, &filter)
            .map(|count| count > 0)
            .map_err(|err| {
                EntityError::database_operation(
                    format!("{}.count", self.descriptor.collection),
                    filter.describe(),
                )
                .with_cause(err)
            })
    }

    fn find_existing(&self, ids: &[String]) -> EntityResult<Vec<String>> {
        let filter = active(&Filter::id_in(ids.iter().cloned()));
        let options = FindOptions {
            projection: Some(&[ID_FIELD]),
            ..FindOptions::default()
        };
        let docs = self
            .repo
            .find(self.descriptor.collection, &filter, &options)
            .map_err(|err| {
                EntityError::database_operation(
                    format!("{}.find", self.descriptor.collection),
                    filter.describe(),
                )
                .with_cause(err)
            })?;
        Ok(docs
            .iter()
            .filter_map(|doc| doc.get(ID_FIELD).and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

/// Restricts `filter` to documents without a `deletedAt` tombstone.
pub fn active(filter: &Filter) -> Filter {
    filter.and(&Filter::new().eq(DELETED_AT_FIELD, Value::Null))
}

/// Confirms every id exists; otherwise fails `DataNotFound` with the missing
/// subset as value.
pub fn all_exist(ids: &[String], target: &dyn ExistenceCheck) -> EntityResult<bool> {
    if ids.is_empty() {
        return Ok(true);
    }

    let found: HashSet<String> = target.find_existing(ids)?.into_iter().collect();
    let mut seen = HashSet::new();
    let missing: Vec<Value> = ids
        .iter()
        .filter(|id| !found.contains(id.as_str()) && seen.insert(id.as_str()))
        .map(|id| Value::String(id.clone()))
        .collect();

    if missing.is_empty() {
        Ok(true)
    } else {
        Err(EntityError::data_not_found(target.subject(), missing))
    }
}

/// Canonicalizes one relation input into an id string.
///
/// Accepts a UUID string or an object whose `id` is a UUID string.
pub fn normalize_reference(relation: &RelationDescriptor, value: &Value) -> EntityResult<String> {
    let candidate = match value {
        Value::String(id) => Some(id.as_str()),
        Value::Object(object) => object.get(ID_FIELD).and_then(Value::as_str),
        _ => None,
    };
    candidate
        .and_then(|id| Uuid::parse_str(id).ok())
        .map(|id| id.to_string())
        .ok_or_else(|| EntityError::invalid_argument(relation.target, value.clone()))
}

/// Canonicalizes `value` and confirms the referenced entity exists.
pub fn resolve_reference(
    relation: &RelationDescriptor,
    value: &Value,
    target: &dyn ExistenceCheck,
) -> EntityResult<String> {
    let id = normalize_reference(relation, value)?;
    if target.exists(&id)? {
        Ok(id)
    } else {
        Err(EntityError::invalid_argument(relation.target, id))
    }
}

/// Canonical ids written to one relation field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationIds {
    Single(String),
    Many(Vec<String>),
    /// Explicit `null` on a single relation.
    Cleared,
}

/// Canonicalizes every relation field present in `doc`, in place.
///
/// Returns the normalized ids per relation in declaration order. Relations
/// absent from `doc` are skipped. List relations keep the first occurrence
/// of each id.
pub fn normalize_relations(
    descriptor: &'static EntityDescriptor,
    doc: &mut Document,
) -> EntityResult<Vec<(&'static RelationDescriptor, RelationIds)>> {
    let mut normalized = Vec::new();
    for relation in descriptor.relations {
        let Some(value) = doc.get(relation.field) else {
            continue;
        };
        let (ids, canonical) = match (relation.kind, value) {
            (RelationKind::Single { .. }, Value::Null) => (RelationIds::Cleared, Value::Null),
            (RelationKind::Single { .. }, value) => {
                let id = normalize_reference(relation, value)?;
                (RelationIds::Single(id.clone()), Value::String(id))
            }
            (RelationKind::Many, Value::Array(items)) => {
                let mut ids: Vec<String> = Vec::with_capacity(items.len());
                for item in items {
                    let id = normalize_reference(relation, item)?;
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                let canonical = ids.iter().cloned().map(Value::String).collect();
                (RelationIds::Many(ids), Value::Array(canonical))
            }
            (RelationKind::Many, other) => {
                return Err(EntityError::invalid_argument(relation.target, other.clone()));
            }
        };
        doc.insert(relation.field.to_string(), canonical);
        normalized.push((relation, ids));
    }
    Ok(normalized)
}

/// One relation field awaiting its existence check.
pub struct RelationCheck<P> {
    pub relation: &'static RelationDescriptor,
    pub ids: RelationIds,
    pub target: P,
}

impl<P: ExistenceCheck> RelationCheck<P> {
    fn run(&self) -> EntityResult<()> {
        match &self.ids {
            RelationIds::Cleared => Ok(()),
            RelationIds::Single(id) => {
                if self.target.exists(id)? {
                    Ok(())
                } else {
                    Err(EntityError::invalid_argument(self.relation.target, id.clone()))
                }
            }
            RelationIds::Many(ids) => all_exist(ids, &self.target).map(|_| ()),
        }
    }
}

/// Runs every check, one scoped thread per relation field.
///
/// All checks run to completion; the first failure in `checks` order wins.
pub fn validate_concurrently<P: ExistenceCheck>(checks: &[RelationCheck<P>]) -> EntityResult<()> {
    match checks {
        [] => Ok(()),
        [single] => single.run(),
        _ => {
            let outcomes: Vec<EntityResult<()>> = thread::scope(|scope| {
                let handles: Vec<_> = checks
                    .iter()
                    .map(|check| (check.relation, scope.spawn(move || check.run())))
                    .collect();
                handles
                    .into_iter()
                    .map(|(relation, handle)| {
                        handle.join().unwrap_or_else(|_| {
                            Err(EntityError::unexpected(
                                "relation validation panicked",
                                relation.field,
                            ))
                        })
                    })
                    .collect()
            });
            outcomes.into_iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        all_exist, normalize_reference, normalize_relations, validate_concurrently,
        ExistenceCheck, RelationCheck, RelationIds,
    };
    use crate::model::workspace::WORKSPACE;
    use crate::error::{EntityErrorKind, EntityResult};
    use crate::model::descriptor::RelationDescriptor;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static OWNER: RelationDescriptor = RelationDescriptor::required_single("owner", "User");
    static MEMBERS: RelationDescriptor = RelationDescriptor::many("members", "User");

    const A: &str = "00000000-0000-4000-8000-00000000000a";
    const B: &str = "00000000-0000-4000-8000-00000000000b";
    const C: &str = "00000000-0000-4000-8000-00000000000c";

    struct FixedIds {
        known: Vec<&'static str>,
        calls: AtomicUsize,
    }

    impl FixedIds {
        fn new(known: &[&'static str]) -> Self {
            Self {
                known: known.to_vec(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ExistenceCheck for FixedIds {
        fn subject(&self) -> &str {
            "User"
        }

        fn exists(&self, id: &str) -> EntityResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.known.contains(&id))
        }

        fn find_existing(&self, ids: &[String]) -> EntityResult<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ids
                .iter()
                .filter(|id| self.known.contains(&id.as_str()))
                .cloned()
                .collect())
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn all_exist_reports_complete_missing_subset_in_input_order() {
        let target = FixedIds::new(&[B]);
        let err = all_exist(&ids(&[C, B, A, C]), &target).unwrap_err();
        assert_eq!(err.kind(), EntityErrorKind::DataNotFound);
        assert_eq!(err.subject(), "User");
        assert_eq!(err.value(), &json!([C, A]));
        assert_eq!(target.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn all_exist_accepts_empty_and_fully_present_sets() {
        let target = FixedIds::new(&[A, B]);
        assert!(all_exist(&[], &target).unwrap());
        assert!(all_exist(&ids(&[A, B]), &target).unwrap());
    }

    #[test]
    fn normalize_relations_dedupes_list_ids_in_input_order() {
        let mut doc = json!({
            "name": "Lab",
            "owner": {"id": A},
            "members": [B, {"id": A}, B, C, A]
        })
        .as_object()
        .cloned()
        .unwrap();

        let relations = normalize_relations(&WORKSPACE, &mut doc).unwrap();

        assert_eq!(doc["owner"], json!(A));
        assert_eq!(doc["members"], json!([B, A, C]));
        assert!(matches!(
            &relations[1].1,
            RelationIds::Many(members) if members == &ids(&[B, A, C])
        ));
    }

    #[test]
    fn normalize_accepts_bare_ids_and_embedded_objects() {
        assert_eq!(normalize_reference(&OWNER, &json!(A)).unwrap(), A);
        assert_eq!(
            normalize_reference(&OWNER, &json!({"id": A, "name": "Ada"})).unwrap(),
            A
        );

        let err = normalize_reference(&OWNER, &json!({"name": "Ada"})).unwrap_err();
        assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
        assert_eq!(err.subject(), "User");

        let err = normalize_reference(&OWNER, &Value::from(12)).unwrap_err();
        assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
    }

    #[test]
    fn concurrent_checks_report_first_failure_in_declaration_order() {
        let checks = vec![
            RelationCheck {
                relation: &OWNER,
                ids: RelationIds::Single(C.to_string()),
                target: FixedIds::new(&[A]),
            },
            RelationCheck {
                relation: &MEMBERS,
                ids: RelationIds::Many(ids(&[A, B])),
                target: FixedIds::new(&[A]),
            },
        ];

        let err = validate_concurrently(&checks).unwrap_err();
        assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
        assert_eq!(err.value(), &json!(C));
        // Both checks ran even though the first one failed.
        assert_eq!(checks[1].target.calls.load(Ordering::SeqCst), 1);
    }
}
