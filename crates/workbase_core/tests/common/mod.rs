#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use workbase_core::repo::document_repo::{
    Document, DocumentRepository, FindOptions, Populate, RepoError, RepoResult,
    SqliteDocumentRepository, UpdateOutcome,
};
use workbase_core::{
    CustomerPayment, EntityId, NewCustomerPayment, NewUser, NewWorkspace, Filter, User, Workbase,
    Workspace,
};

/// Wraps the SQLite repository and counts write primitives.
pub struct CountingRepository {
    inner: SqliteDocumentRepository,
    inserts: AtomicUsize,
    updates: AtomicUsize,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self {
            inner: SqliteDocumentRepository::open_in_memory().unwrap(),
            inserts: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        }
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl DocumentRepository for CountingRepository {
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        self.inner.find_by_id(collection, id, populate)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        self.inner.find_one(collection, filter, populate)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions<'_>,
    ) -> RepoResult<Vec<Document>> {
        self.inner.find(collection, filter, options)
    }

    fn insert(&self, collection: &str, docs: Vec<Document>) -> RepoResult<Vec<Document>> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(collection, docs)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Document,
    ) -> RepoResult<UpdateOutcome> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update_one(collection, filter, patch)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        self.inner.delete_one(collection, filter)
    }

    fn count(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        self.inner.count(collection, filter)
    }
}

/// Wraps the SQLite repository and fails selected primitives on demand.
pub struct FaultyRepository {
    inner: SqliteDocumentRepository,
    failing: Mutex<Vec<&'static str>>,
    drop_inserted_ids: AtomicBool,
}

impl FaultyRepository {
    pub fn new() -> Self {
        Self {
            inner: SqliteDocumentRepository::open_in_memory().unwrap(),
            failing: Mutex::new(Vec::new()),
            drop_inserted_ids: AtomicBool::new(false),
        }
    }

    /// Makes `primitive` (`count`, `find`, `find_one`, ...) fail from now on.
    pub fn fail(&self, primitive: &'static str) {
        self.failing.lock().unwrap().push(primitive);
    }

    /// `insert` keeps storing documents but returns them without `id`.
    pub fn drop_inserted_ids(&self) {
        self.drop_inserted_ids.store(true, Ordering::SeqCst);
    }

    fn check(&self, primitive: &'static str) -> RepoResult<()> {
        if self.failing.lock().unwrap().contains(&primitive) {
            Err(RepoError::InvalidData(format!("{primitive} unavailable")))
        } else {
            Ok(())
        }
    }
}

impl DocumentRepository for FaultyRepository {
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        self.check("find_by_id")?;
        self.inner.find_by_id(collection, id, populate)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        self.check("find_one")?;
        self.inner.find_one(collection, filter, populate)
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions<'_>,
    ) -> RepoResult<Vec<Document>> {
        self.check("find")?;
        self.inner.find(collection, filter, options)
    }

    fn insert(&self, collection: &str, docs: Vec<Document>) -> RepoResult<Vec<Document>> {
        self.check("insert")?;
        let mut stored = self.inner.insert(collection, docs)?;
        if self.drop_inserted_ids.load(Ordering::SeqCst) {
            for doc in &mut stored {
                doc.remove("id");
            }
        }
        Ok(stored)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Document,
    ) -> RepoResult<UpdateOutcome> {
        self.check("update_one")?;
        self.inner.update_one(collection, filter, patch)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        self.check("delete_one")?;
        self.inner.delete_one(collection, filter)
    }

    fn count(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        self.check("count")?;
        self.inner.count(collection, filter)
    }
}

pub fn workbase() -> Workbase {
    Workbase::open_in_memory().unwrap()
}

/// Workbase over a [`CountingRepository`], plus a handle to the counters.
pub fn counting_workbase() -> (Workbase, Arc<CountingRepository>) {
    let repo = Arc::new(CountingRepository::new());
    let workbase = Workbase::with_standard_entities(repo.clone()).unwrap();
    (workbase, repo)
}

/// Workbase over a [`FaultyRepository`], plus a handle to arm faults.
pub fn faulty_workbase() -> (Workbase, Arc<FaultyRepository>) {
    let repo = Arc::new(FaultyRepository::new());
    let workbase = Workbase::with_standard_entities(repo.clone()).unwrap();
    (workbase, repo)
}

pub fn missing_id() -> EntityId {
    EntityId::new_v4()
}

pub fn create_user(workbase: &Workbase, name: &str) -> User {
    workbase.users().create(&NewUser::named(name)).unwrap()
}

pub fn create_payment(workbase: &Workbase, reference: &str) -> CustomerPayment {
    workbase
        .customer_payments()
        .create(&NewCustomerPayment::new("stripe", reference))
        .unwrap()
}

pub fn create_workspace(workbase: &Workbase, name: &str, owner: &User) -> Workspace {
    workbase
        .workspaces()
        .create(&NewWorkspace::new(name, owner.id))
        .unwrap()
}
