//! Process tracking entity: progress of one long-running job.

use crate::error::EntityResult;
use crate::model::activity_log::ActivityLog;
use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor};
use crate::model::user::User;
use crate::model::workspace::Workspace;
use crate::model::{Entity, EntityId, Reference};
use crate::service::entity_service::EntityService;
use crate::service::relationship::RelationshipEdit;
use serde::{Deserialize, Serialize};

pub static PROCESS_TRACKING: EntityDescriptor = EntityDescriptor {
    name: "ProcessTracking",
    collection: "processTrackings",
    fields: &[
        FieldDescriptor::required("name", FieldKind::String),
        FieldDescriptor::required("status", FieldKind::String),
        FieldDescriptor::optional("progress", FieldKind::Integer),
    ],
    relations: &[
        RelationDescriptor::optional_single("user", "User"),
        RelationDescriptor::optional_single("workspace", "Workspace"),
        RelationDescriptor::many("activityLogs", "ActivityLog"),
    ],
    immutable_fields: &[],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTracking {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub name: String,
    pub status: String,
    pub progress: Option<i64>,
    pub user: Option<Reference<User>>,
    pub workspace: Option<Reference<Workspace>>,
    #[serde(default)]
    pub activity_logs: Vec<Reference<ActivityLog>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProcessTracking {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Reference<Workspace>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub activity_logs: Vec<Reference<ActivityLog>>,
}

impl NewProcessTracking {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessTrackingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Option<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Option<Reference<User>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<Option<Reference<Workspace>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_logs: Option<Vec<Reference<ActivityLog>>>,
}

impl Entity for ProcessTracking {
    type Create = NewProcessTracking;
    type Patch = ProcessTrackingPatch;

    fn descriptor() -> &'static EntityDescriptor {
        &PROCESS_TRACKING
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

impl EntityService<'_, ProcessTracking> {
    pub fn add_activity_logs(
        &self,
        process_id: EntityId,
        logs: &[Reference<ActivityLog>],
    ) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.add_many("activityLogs", process_id, logs)
    }

    pub fn remove_activity_logs(
        &self,
        process_id: EntityId,
        logs: &[Reference<ActivityLog>],
    ) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.remove_many("activityLogs", process_id, logs)
    }

    pub fn set_user(
        &self,
        process_id: EntityId,
        user: &Reference<User>,
    ) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.add_single("user", process_id, user)
    }

    pub fn remove_user(&self, process_id: EntityId) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.remove_single("user", process_id)
    }

    pub fn set_workspace(
        &self,
        process_id: EntityId,
        workspace: &Reference<Workspace>,
    ) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.add_single("workspace", process_id, workspace)
    }

    pub fn remove_workspace(
        &self,
        process_id: EntityId,
    ) -> EntityResult<RelationshipEdit<ProcessTracking>> {
        self.remove_single("workspace", process_id)
    }
}
