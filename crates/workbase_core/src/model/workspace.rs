//! Workspace entity.
//!
//! # Invariants
//! - Every workspace has exactly one `owner`; `members` is an id set.

use crate::error::EntityResult;
use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor};
use crate::model::user::User;
use crate::model::{Entity, EntityId, Reference};
use crate::service::entity_service::EntityService;
use crate::service::relationship::RelationshipEdit;
use serde::{Deserialize, Serialize};

pub static WORKSPACE: EntityDescriptor = EntityDescriptor {
    name: "Workspace",
    collection: "workspaces",
    fields: &[
        FieldDescriptor::required("name", FieldKind::String),
        FieldDescriptor::optional("description", FieldKind::String),
    ],
    relations: &[
        RelationDescriptor::required_single("owner", "User"),
        RelationDescriptor::many("members", "User"),
    ],
    immutable_fields: &[],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    /// `None` only when the owner document has been purged.
    pub owner: Option<Reference<User>>,
    #[serde(default)]
    pub members: Vec<Reference<User>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkspace {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner: Reference<User>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<Reference<User>>,
}

impl NewWorkspace {
    pub fn new(name: impl Into<String>, owner: impl Into<Reference<User>>) -> Self {
        Self {
            name: name.into(),
            description: None,
            owner: owner.into(),
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Reference<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<Reference<User>>>,
}

impl Entity for Workspace {
    type Create = NewWorkspace;
    type Patch = WorkspacePatch;

    fn descriptor() -> &'static EntityDescriptor {
        &WORKSPACE
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

impl EntityService<'_, Workspace> {
    pub fn add_members(
        &self,
        workspace_id: EntityId,
        members: &[Reference<User>],
    ) -> EntityResult<RelationshipEdit<Workspace>> {
        self.add_many("members", workspace_id, members)
    }

    pub fn remove_members(
        &self,
        workspace_id: EntityId,
        members: &[Reference<User>],
    ) -> EntityResult<RelationshipEdit<Workspace>> {
        self.remove_many("members", workspace_id, members)
    }

    /// Transfers ownership. The owner relation can be replaced but never cleared.
    pub fn set_owner(
        &self,
        workspace_id: EntityId,
        owner: &Reference<User>,
    ) -> EntityResult<RelationshipEdit<Workspace>> {
        self.add_single("owner", workspace_id, owner)
    }
}
