//! Declarative entity descriptors.
//!
//! # Responsibility
//! - Describe one entity type as data: collection, scalar fields, relation
//!   fields and immutable fields.
//! - Provide the structural pre-write validation used by the lifecycle engine.
//!
//! # Invariants
//! - System fields (`id`, `createdAt`, `updatedAt`, `deletedAt`, `_rev`) are
//!   implicit on every entity and never declared in `fields`.
//! - Relation values are canonical id strings by the time they are validated.

use crate::repo::document_repo::{Document, ID_FIELD, REVISION_FIELD};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const DELETED_AT_FIELD: &str = "deletedAt";

/// Fields owned by the engine/repository, rejected in update payloads.
pub const SYSTEM_FIELDS: &[&str] = &[
    ID_FIELD,
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
    DELETED_AT_FIELD,
    REVISION_FIELD,
];

/// JSON type accepted by a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Bool,
    /// Any JSON value.
    Json,
}

impl FieldKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::Json => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldDescriptor {
    pub const fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// Cardinality of a relation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One id, or `null` when not required.
    Single { required: bool },
    /// Zero or more ids.
    Many,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDescriptor {
    /// Field name on the owner document.
    pub field: &'static str,
    /// Registered name of the target entity.
    pub target: &'static str,
    pub kind: RelationKind,
}

impl RelationDescriptor {
    pub const fn required_single(field: &'static str, target: &'static str) -> Self {
        Self {
            field,
            target,
            kind: RelationKind::Single { required: true },
        }
    }

    pub const fn optional_single(field: &'static str, target: &'static str) -> Self {
        Self {
            field,
            target,
            kind: RelationKind::Single { required: false },
        }
    }

    pub const fn many(field: &'static str, target: &'static str) -> Self {
        Self {
            field,
            target,
            kind: RelationKind::Many,
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self.kind, RelationKind::Many)
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, RelationKind::Single { required: true })
    }
}

/// Structural validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub entity: &'static str,
    pub field: String,
    pub reason: String,
}

impl Display for SchemaViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.entity, self.field, self.reason)
    }
}

impl Error for SchemaViolation {}

/// Declarative description of one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Registered entity name, e.g. `User`.
    pub name: &'static str,
    /// Document collection name, e.g. `users`.
    pub collection: &'static str,
    pub fields: &'static [FieldDescriptor],
    pub relations: &'static [RelationDescriptor],
    /// Entity-specific immutable fields, on top of [`SYSTEM_FIELDS`].
    pub immutable_fields: &'static [&'static str],
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn relation(&self, field: &str) -> Option<&'static RelationDescriptor> {
        self.relations.iter().find(|relation| relation.field == field)
    }

    pub fn is_system_field(name: &str) -> bool {
        SYSTEM_FIELDS.contains(&name)
    }

    /// Whether an update payload may never carry `name`.
    pub fn is_immutable(&self, name: &str) -> bool {
        Self::is_system_field(name) || self.immutable_fields.contains(&name)
    }

    /// Validates a fully built document before insert.
    pub fn validate_document(&self, doc: &Document) -> Result<(), SchemaViolation> {
        match doc.get(ID_FIELD) {
            Some(Value::String(_)) => {}
            _ => return Err(self.violation(ID_FIELD, "must be a string id")),
        }
        for timestamp in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
            if !doc.get(timestamp).is_some_and(Value::is_i64) {
                return Err(self.violation(timestamp, "must be an epoch-ms integer"));
            }
        }
        if !doc
            .get(DELETED_AT_FIELD)
            .map_or(true, |value| value.is_null() || value.is_i64())
        {
            return Err(self.violation(DELETED_AT_FIELD, "must be null or an epoch-ms integer"));
        }

        for field in self.fields {
            match doc.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(self.violation(field.name, "is required"));
                }
                None | Some(Value::Null) => {}
                Some(value) => self.check_field(field, value)?,
            }
        }

        for relation in self.relations {
            match doc.get(relation.field) {
                None | Some(Value::Null) if relation.is_required() => {
                    return Err(self.violation(relation.field, "is a required relation"));
                }
                None => {}
                Some(value) => self.check_relation(relation, value)?,
            }
        }

        self.reject_unknown(doc)
    }

    /// Validates the fields present in an update payload.
    ///
    /// System fields are skipped here; the lifecycle rejects them earlier.
    pub fn validate_patch(&self, patch: &Document) -> Result<(), SchemaViolation> {
        for (name, value) in patch {
            if Self::is_system_field(name) {
                continue;
            }
            if let Some(field) = self.field(name) {
                if value.is_null() {
                    if field.required {
                        return Err(self.violation(name, "is required and cannot be cleared"));
                    }
                    continue;
                }
                self.check_field(field, value)?;
            } else if let Some(relation) = self.relation(name) {
                if value.is_null() && relation.is_required() {
                    return Err(self.violation(name, "is a required relation and cannot be cleared"));
                }
                self.check_relation(relation, value)?;
            } else {
                return Err(self.violation(name, "is not a known field"));
            }
        }
        Ok(())
    }

    fn check_field(&self, field: &FieldDescriptor, value: &Value) -> Result<(), SchemaViolation> {
        if field.kind.accepts(value) {
            Ok(())
        } else {
            Err(self.violation(
                field.name,
                &format!("expected {}, got `{value}`", field.kind.as_str()),
            ))
        }
    }

    fn check_relation(
        &self,
        relation: &RelationDescriptor,
        value: &Value,
    ) -> Result<(), SchemaViolation> {
        let valid = match relation.kind {
            RelationKind::Single { .. } => value.is_string() || value.is_null(),
            RelationKind::Many => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        };
        if valid {
            Ok(())
        } else {
            Err(self.violation(
                relation.field,
                &format!("malformed reference to {}: `{value}`", relation.target),
            ))
        }
    }

    fn reject_unknown(&self, doc: &Document) -> Result<(), SchemaViolation> {
        for name in doc.keys() {
            let known = Self::is_system_field(name)
                || self.field(name).is_some()
                || self.relation(name).is_some();
            if !known {
                return Err(self.violation(name, "is not a known field"));
            }
        }
        Ok(())
    }

    fn violation(&self, field: &str, reason: &str) -> SchemaViolation {
        SchemaViolation {
            entity: self.name,
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}
