//! Explicit entity registry.
//!
//! # Responsibility
//! - Map entity names to their descriptors for cross-entity existence checks.
//! - Reject inconsistent registrations before any document is touched.
//!
//! # Invariants
//! - Entity names and collection names are unique.
//! - After `validate`, every relation target resolves to a registered entity.
//! - The registry is built once and passed to the context; there is no
//!   process-global model table.

use crate::model::activity_log::ACTIVITY_LOG;
use crate::model::customer_payment::CUSTOMER_PAYMENT;
use crate::model::descriptor::EntityDescriptor;
use crate::model::process_tracking::PROCESS_TRACKING;
use crate::model::user::USER;
use crate::model::user_agent::USER_AGENT;
use crate::model::workspace::WORKSPACE;
use crate::repo::filter::is_valid_field_name;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Registration/validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidEntityName(String),
    DuplicateEntity(String),
    DuplicateCollection(String),
    InvalidFieldName {
        entity: String,
        field: String,
    },
    UnknownRelationTarget {
        entity: String,
        field: String,
        target: String,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEntityName(value) => write!(f, "entity name is invalid: `{value}`"),
            Self::DuplicateEntity(value) => write!(f, "entity already registered: {value}"),
            Self::DuplicateCollection(value) => {
                write!(f, "collection already registered: {value}")
            }
            Self::InvalidFieldName { entity, field } => {
                write!(f, "entity {entity} declares invalid field name `{field}`")
            }
            Self::UnknownRelationTarget {
                entity,
                field,
                target,
            } => write!(
                f,
                "relation {entity}.{field} targets unregistered entity {target}"
            ),
        }
    }
}

impl Error for RegistryError {}

/// Registry of entity descriptors keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<&'static str, &'static EntityDescriptor>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the six built-in entities, already validated.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for descriptor in [
            &USER,
            &WORKSPACE,
            &ACTIVITY_LOG,
            &USER_AGENT,
            &CUSTOMER_PAYMENT,
            &PROCESS_TRACKING,
        ] {
            registry.register(descriptor)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Registers one entity descriptor.
    pub fn register(&mut self, descriptor: &'static EntityDescriptor) -> Result<(), RegistryError> {
        if !is_valid_field_name(descriptor.name) {
            return Err(RegistryError::InvalidEntityName(descriptor.name.to_string()));
        }
        if self.entities.contains_key(descriptor.name) {
            return Err(RegistryError::DuplicateEntity(descriptor.name.to_string()));
        }
        if self
            .entities
            .values()
            .any(|existing| existing.collection == descriptor.collection)
        {
            return Err(RegistryError::DuplicateCollection(
                descriptor.collection.to_string(),
            ));
        }

        let declared = descriptor
            .fields
            .iter()
            .map(|field| field.name)
            .chain(descriptor.relations.iter().map(|relation| relation.field));
        for field in declared {
            if !is_valid_field_name(field) || EntityDescriptor::is_system_field(field) {
                return Err(RegistryError::InvalidFieldName {
                    entity: descriptor.name.to_string(),
                    field: field.to_string(),
                });
            }
        }

        self.entities.insert(descriptor.name, descriptor);
        Ok(())
    }

    /// Checks that every relation target is registered.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for descriptor in self.entities.values() {
            for relation in descriptor.relations {
                if !self.entities.contains_key(relation.target) {
                    return Err(RegistryError::UnknownRelationTarget {
                        entity: descriptor.name.to_string(),
                        field: relation.field.to_string(),
                        target: relation.target.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&'static EntityDescriptor> {
        self.entities.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Returns sorted entity names.
    pub fn names(&self) -> Vec<&'static str> {
        self.entities.keys().copied().collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static EntityDescriptor> + '_ {
        self.entities.values().copied()
    }
}
