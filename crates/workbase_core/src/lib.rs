//! Entity persistence core for workbase.
//!
//! Six related entities (users, workspaces, activity logs, user agents,
//! customer payments, process tracking records) live in a schema-less
//! document store; this crate enforces the referential integrity,
//! relationship edits and paginated queries the store does not provide.

pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DbConfig};
pub use context::{ContextError, Workbase};
pub use error::{EntityError, EntityErrorKind, EntityResult};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::activity_log::{ActivityLog, ActivityLogPatch, NewActivityLog};
pub use model::customer_payment::{CustomerPayment, CustomerPaymentPatch, NewCustomerPayment};
pub use model::process_tracking::{NewProcessTracking, ProcessTracking, ProcessTrackingPatch};
pub use model::user::{NewUser, User, UserPatch};
pub use model::user_agent::{NewUserAgent, UserAgent, UserAgentPatch};
pub use model::workspace::{NewWorkspace, Workspace, WorkspacePatch};
pub use model::{Entity, EntityId, Reference};
pub use registry::{EntityRegistry, RegistryError};
pub use repo::document_repo::{
    Document, DocumentRepository, RepoError, RepoResult, SqliteDocumentRepository,
};
pub use repo::filter::Filter;
pub use service::entity_service::EntityService;
pub use service::lifecycle::EntityLifecycle;
pub use service::pagination::QueryPage;
pub use service::relationship::RelationshipEdit;

/// Minimal health-check API for embedding processes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
