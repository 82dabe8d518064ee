//! Process-level context: repository plus entity registry.
//!
//! # Responsibility
//! - Own the document repository and the validated entity registry.
//! - Hand out lifecycle engines and typed services borrowing both.
//!
//! # Invariants
//! - A `Workbase` is only constructed from a registry whose relation
//!   targets all resolve.

use crate::config::DbConfig;
use crate::db::{open_db_with_config, DbError};
use crate::error::{EntityError, EntityResult};
use crate::model::activity_log::ActivityLog;
use crate::model::customer_payment::CustomerPayment;
use crate::model::process_tracking::ProcessTracking;
use crate::model::user::User;
use crate::model::user_agent::UserAgent;
use crate::model::workspace::Workspace;
use crate::model::Entity;
use crate::registry::{EntityRegistry, RegistryError};
use crate::repo::document_repo::{DocumentRepository, RepoError, SqliteDocumentRepository};
use crate::service::entity_service::EntityService;
use crate::service::lifecycle::EntityLifecycle;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Context construction failures.
#[derive(Debug)]
pub enum ContextError {
    Db(DbError),
    Repo(RepoError),
    Registry(RegistryError),
}

impl Display for ContextError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "database open failed: {err}"),
            Self::Repo(err) => write!(f, "repository init failed: {err}"),
            Self::Registry(err) => write!(f, "entity registry invalid: {err}"),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Registry(err) => Some(err),
        }
    }
}

impl From<DbError> for ContextError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for ContextError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<RegistryError> for ContextError {
    fn from(value: RegistryError) -> Self {
        Self::Registry(value)
    }
}

/// Entry point for entity persistence.
#[derive(Clone)]
pub struct Workbase {
    repo: Arc<dyn DocumentRepository>,
    registry: EntityRegistry,
}

impl Workbase {
    /// Builds a context over any repository; validates the registry first.
    pub fn new(
        repo: Arc<dyn DocumentRepository>,
        registry: EntityRegistry,
    ) -> Result<Self, ContextError> {
        registry.validate()?;
        Ok(Self { repo, registry })
    }

    /// Context over `repo` with the six built-in entities.
    pub fn with_standard_entities(repo: Arc<dyn DocumentRepository>) -> Result<Self, ContextError> {
        Self::new(repo, EntityRegistry::standard()?)
    }

    /// Opens (and migrates) the SQLite database described by `config`.
    pub fn open(config: &DbConfig) -> Result<Self, ContextError> {
        let conn = open_db_with_config(config)?;
        let repo = SqliteDocumentRepository::try_new(conn)?;
        Self::with_standard_entities(Arc::new(repo))
    }

    /// Private in-memory database, mainly for tests and tooling.
    pub fn open_in_memory() -> Result<Self, ContextError> {
        Self::open(&DbConfig::default())
    }

    pub fn repository(&self) -> &dyn DocumentRepository {
        self.repo.as_ref()
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    /// Untyped engine for a registered entity name.
    pub fn lifecycle(&self, entity: &str) -> EntityResult<EntityLifecycle<'_>> {
        let descriptor = self
            .registry
            .get(entity)
            .ok_or_else(|| EntityError::invalid_argument("entity", entity))?;
        Ok(EntityLifecycle::new(self.repo.as_ref(), &self.registry, descriptor))
    }

    /// Typed service for `E`. `E` must be registered.
    pub fn service<E: Entity>(&self) -> EntityService<'_, E> {
        EntityService::new(EntityLifecycle::new(
            self.repo.as_ref(),
            &self.registry,
            E::descriptor(),
        ))
    }

    pub fn users(&self) -> EntityService<'_, User> {
        self.service()
    }

    pub fn workspaces(&self) -> EntityService<'_, Workspace> {
        self.service()
    }

    pub fn activity_logs(&self) -> EntityService<'_, ActivityLog> {
        self.service()
    }

    pub fn user_agents(&self) -> EntityService<'_, UserAgent> {
        self.service()
    }

    pub fn customer_payments(&self) -> EntityService<'_, CustomerPayment> {
        self.service()
    }

    pub fn process_trackings(&self) -> EntityService<'_, ProcessTracking> {
        self.service()
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextError, Workbase};
    use crate::error::EntityErrorKind;
    use crate::registry::EntityRegistry;
    use crate::repo::document_repo::SqliteDocumentRepository;
    use std::sync::Arc;

    #[test]
    fn in_memory_context_exposes_standard_entities() {
        let workbase = Workbase::open_in_memory().unwrap();
        assert_eq!(workbase.registry().len(), 6);
        assert_eq!(
            workbase.lifecycle("Workspace").unwrap().descriptor().collection,
            "workspaces"
        );
    }

    #[test]
    fn unknown_entity_name_is_invalid_argument() {
        let workbase = Workbase::open_in_memory().unwrap();
        let err = workbase.lifecycle("Invoice").err().unwrap();
        assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
    }

    #[test]
    fn registry_with_dangling_targets_is_rejected() {
        let repo = Arc::new(SqliteDocumentRepository::open_in_memory().unwrap());
        let mut registry = EntityRegistry::new();
        registry
            .register(&crate::model::workspace::WORKSPACE)
            .unwrap();
        assert!(matches!(
            Workbase::new(repo, registry),
            Err(ContextError::Registry(_))
        ));
    }
}
