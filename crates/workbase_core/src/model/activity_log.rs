//! Activity log entity.
//!
//! # Invariants
//! - `action` and `user` are fixed once written; logs are append-only records.

use crate::error::EntityResult;
use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor};
use crate::model::user::User;
use crate::model::workspace::Workspace;
use crate::model::{Entity, EntityId, Reference};
use crate::service::entity_service::EntityService;
use crate::service::relationship::RelationshipEdit;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub static ACTIVITY_LOG: EntityDescriptor = EntityDescriptor {
    name: "ActivityLog",
    collection: "activityLogs",
    fields: &[
        FieldDescriptor::required("action", FieldKind::String),
        FieldDescriptor::optional("details", FieldKind::Json),
    ],
    relations: &[
        RelationDescriptor::required_single("user", "User"),
        RelationDescriptor::optional_single("workspace", "Workspace"),
    ],
    immutable_fields: &["action", "user"],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub action: String,
    pub details: Option<Value>,
    pub user: Option<Reference<User>>,
    pub workspace: Option<Reference<Workspace>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivityLog {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub user: Reference<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Reference<Workspace>>,
}

impl NewActivityLog {
    pub fn new(action: impl Into<String>, user: impl Into<Reference<User>>) -> Self {
        Self {
            action: action.into(),
            details: None,
            user: user.into(),
            workspace: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Option<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Option<Reference<Workspace>>>,
}

impl Entity for ActivityLog {
    type Create = NewActivityLog;
    type Patch = ActivityLogPatch;

    fn descriptor() -> &'static EntityDescriptor {
        &ACTIVITY_LOG
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

impl EntityService<'_, ActivityLog> {
    pub fn set_workspace(
        &self,
        log_id: EntityId,
        workspace: &Reference<Workspace>,
    ) -> EntityResult<RelationshipEdit<ActivityLog>> {
        self.add_single("workspace", log_id, workspace)
    }

    pub fn remove_workspace(&self, log_id: EntityId) -> EntityResult<RelationshipEdit<ActivityLog>> {
        self.remove_single("workspace", log_id)
    }
}
