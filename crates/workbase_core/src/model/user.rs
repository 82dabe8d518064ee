//! User entity.
//!
//! # Invariants
//! - `customerPayment` is optional; `workspaces` and `userAgents` are id sets.

use crate::error::EntityResult;
use crate::model::customer_payment::CustomerPayment;
use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor};
use crate::model::user_agent::UserAgent;
use crate::model::workspace::Workspace;
use crate::model::{Entity, EntityId, Reference};
use crate::service::entity_service::EntityService;
use crate::service::relationship::RelationshipEdit;
use serde::{Deserialize, Serialize};

pub static USER: EntityDescriptor = EntityDescriptor {
    name: "User",
    collection: "users",
    fields: &[
        FieldDescriptor::required("name", FieldKind::String),
        FieldDescriptor::optional("email", FieldKind::String),
    ],
    relations: &[
        RelationDescriptor::optional_single("customerPayment", "CustomerPayment"),
        RelationDescriptor::many("workspaces", "Workspace"),
        RelationDescriptor::many("userAgents", "UserAgent"),
    ],
    immutable_fields: &[],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub name: String,
    pub email: Option<String>,
    pub customer_payment: Option<Reference<CustomerPayment>>,
    #[serde(default)]
    pub workspaces: Vec<Reference<Workspace>>,
    #[serde(default)]
    pub user_agents: Vec<Reference<UserAgent>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_payment: Option<Reference<CustomerPayment>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub workspaces: Vec<Reference<Workspace>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub user_agents: Vec<Reference<UserAgent>>,
}

impl NewUser {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Partial update. `None` leaves a field untouched; `Some(None)` clears
/// an optional field.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_payment: Option<Option<Reference<CustomerPayment>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspaces: Option<Vec<Reference<Workspace>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agents: Option<Vec<Reference<UserAgent>>>,
}

impl Entity for User {
    type Create = NewUser;
    type Patch = UserPatch;

    fn descriptor() -> &'static EntityDescriptor {
        &USER
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

impl EntityService<'_, User> {
    pub fn add_workspaces(
        &self,
        user_id: EntityId,
        workspaces: &[Reference<Workspace>],
    ) -> EntityResult<RelationshipEdit<User>> {
        self.add_many("workspaces", user_id, workspaces)
    }

    pub fn remove_workspaces(
        &self,
        user_id: EntityId,
        workspaces: &[Reference<Workspace>],
    ) -> EntityResult<RelationshipEdit<User>> {
        self.remove_many("workspaces", user_id, workspaces)
    }

    pub fn add_user_agents(
        &self,
        user_id: EntityId,
        user_agents: &[Reference<UserAgent>],
    ) -> EntityResult<RelationshipEdit<User>> {
        self.add_many("userAgents", user_id, user_agents)
    }

    pub fn remove_user_agents(
        &self,
        user_id: EntityId,
        user_agents: &[Reference<UserAgent>],
    ) -> EntityResult<RelationshipEdit<User>> {
        self.remove_many("userAgents", user_id, user_agents)
    }

    pub fn set_customer_payment(
        &self,
        user_id: EntityId,
        payment: &Reference<CustomerPayment>,
    ) -> EntityResult<RelationshipEdit<User>> {
        self.add_single("customerPayment", user_id, payment)
    }

    pub fn remove_customer_payment(&self, user_id: EntityId) -> EntityResult<RelationshipEdit<User>> {
        self.remove_single("customerPayment", user_id)
    }
}
