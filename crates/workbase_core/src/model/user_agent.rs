//! User agent entity: one parsed client signature.

use crate::error::EntityResult;
use crate::model::descriptor::{EntityDescriptor, FieldDescriptor, FieldKind, RelationDescriptor};
use crate::model::user::User;
use crate::model::{Entity, EntityId, Reference};
use crate::service::entity_service::EntityService;
use crate::service::relationship::RelationshipEdit;
use serde::{Deserialize, Serialize};

pub static USER_AGENT: EntityDescriptor = EntityDescriptor {
    name: "UserAgent",
    collection: "userAgents",
    fields: &[
        FieldDescriptor::required("userAgent", FieldKind::String),
        FieldDescriptor::optional("browser", FieldKind::String),
        FieldDescriptor::optional("os", FieldKind::String),
        FieldDescriptor::optional("device", FieldKind::String),
    ],
    relations: &[RelationDescriptor::optional_single("user", "User")],
    immutable_fields: &[],
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgent {
    pub id: EntityId,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
    pub user_agent: String,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub device: Option<String>,
    pub user: Option<Reference<User>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserAgent {
    pub user_agent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Reference<User>>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAgentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Option<Reference<User>>>,
}

impl Entity for UserAgent {
    type Create = NewUserAgent;
    type Patch = UserAgentPatch;

    fn descriptor() -> &'static EntityDescriptor {
        &USER_AGENT
    }

    fn id(&self) -> EntityId {
        self.id
    }
}

impl EntityService<'_, UserAgent> {
    pub fn set_user(
        &self,
        agent_id: EntityId,
        user: &Reference<User>,
    ) -> EntityResult<RelationshipEdit<UserAgent>> {
        self.add_single("user", agent_id, user)
    }

    pub fn remove_user(&self, agent_id: EntityId) -> EntityResult<RelationshipEdit<UserAgent>> {
        self.remove_single("user", agent_id)
    }
}
