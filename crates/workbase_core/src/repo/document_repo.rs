//! Document repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the schema-less persistence primitives the entity engine needs.
//! - Keep SQL and JSON storage details inside the persistence boundary.
//!
//! # Invariants
//! - Every stored document carries a string `id`, unique per collection.
//! - `_rev` is owned by the repository: 0 on insert, +1 per modifying update.
//! - Reads return documents in insertion order.
//! - Population resolves one hop only; the populated documents keep their
//!   own references as ids.

use crate::db::migrations::latest_version;
use crate::db::{open_db_in_memory, DbError};
use crate::repo::filter::{Condition, Filter};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Schema-less document: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Field holding the document identity.
pub const ID_FIELD: &str = "id";
/// Internal bookkeeping field maintained by the repository.
pub const REVISION_FIELD: &str = "_rev";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for document persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Filter references a field that is not a plain identifier.
    InvalidFilterField(String),
    /// Stored or submitted data cannot be handled as a document.
    InvalidData(String),
    /// Connection mutex was poisoned by a panicking holder.
    LockPoisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "document repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "document repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "document repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidFilterField(field) => write!(f, "invalid filter field `{field}`"),
            Self::InvalidData(message) => write!(f, "invalid document data: {message}"),
            Self::LockPoisoned => write!(f, "document repository connection lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidData(value.to_string())
    }
}

/// One-hop population request: replace `field` ids with documents from
/// `collection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Populate<'a> {
    pub field: &'a str,
    pub collection: &'a str,
}

/// Options for [`DocumentRepository::find`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions<'a> {
    /// Top-level fields to keep. `id` is always kept.
    pub projection: Option<&'a [&'a str]>,
    pub skip: u64,
    pub limit: Option<u64>,
    pub populate: &'a [Populate<'a>],
}

/// Result of [`DocumentRepository::update_one`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents matched by the filter (0 or 1).
    pub matched_count: u64,
    /// Documents whose content actually changed (0 or 1).
    pub modified_count: u64,
}

/// Persistence primitives consumed by the entity engine.
pub trait DocumentRepository: Send + Sync {
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>>;
    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>>;
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions<'_>,
    ) -> RepoResult<Vec<Document>>;
    /// Inserts all documents atomically and returns the stored versions.
    fn insert(&self, collection: &str, docs: Vec<Document>) -> RepoResult<Vec<Document>>;
    /// Merges `patch` into the first matching document.
    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Document,
    ) -> RepoResult<UpdateOutcome>;
    /// Physically removes the first matching document; returns deleted count.
    fn delete_one(&self, collection: &str, filter: &Filter) -> RepoResult<u64>;
    fn count(&self, collection: &str, filter: &Filter) -> RepoResult<u64>;
}

/// SQLite-backed document repository.
///
/// Documents live as JSON text in the `documents` table; filters are
/// evaluated with `json_extract`/`json_each`.
pub struct SqliteDocumentRepository {
    conn: Mutex<Connection>,
}

impl SqliteDocumentRepository {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_document_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a fresh in-memory database and wraps it.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::LockPoisoned)
    }
}

impl DocumentRepository for SqliteDocumentRepository {
    fn find_by_id(
        &self,
        collection: &str,
        id: &str,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        self.find_one(collection, &Filter::by_id(id), populate)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
        populate: &[Populate<'_>],
    ) -> RepoResult<Option<Document>> {
        let options = FindOptions {
            limit: Some(1),
            populate,
            ..FindOptions::default()
        };
        Ok(self.find(collection, filter, &options)?.into_iter().next())
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions<'_>,
    ) -> RepoResult<Vec<Document>> {
        let conn = self.lock()?;
        let rows = select_rows(&conn, collection, filter, options.skip, options.limit)?;
        let mut docs = Vec::with_capacity(rows.len());
        for (_, mut doc) in rows {
            if let Some(fields) = options.projection {
                doc.retain(|key, _| key == ID_FIELD || fields.contains(&key.as_str()));
            }
            populate_document(&conn, &mut doc, options.populate)?;
            docs.push(doc);
        }
        Ok(docs)
    }

    fn insert(&self, collection: &str, docs: Vec<Document>) -> RepoResult<Vec<Document>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut stored = Vec::with_capacity(docs.len());
        for mut doc in docs {
            let id = match doc.get(ID_FIELD) {
                Some(Value::String(id)) => id.clone(),
                None => {
                    let id = Uuid::new_v4().to_string();
                    doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));
                    id
                }
                Some(other) => {
                    return Err(RepoError::InvalidData(format!(
                        "document id must be a string, got `{other}`"
                    )));
                }
            };
            doc.insert(REVISION_FIELD.to_string(), Value::from(0));
            tx.execute(
                "INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);",
                params![collection, id, serde_json::to_string(&doc)?],
            )?;
            stored.push(doc);
        }
        tx.commit()?;
        Ok(stored)
    }

    fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        patch: &Document,
    ) -> RepoResult<UpdateOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let Some((seq, current)) = select_rows(&tx, collection, filter, 0, Some(1))?
            .into_iter()
            .next()
        else {
            return Ok(UpdateOutcome::default());
        };

        let mut next = current.clone();
        for (key, value) in patch {
            if key == REVISION_FIELD {
                continue;
            }
            if key == ID_FIELD && current.get(ID_FIELD) != Some(value) {
                return Err(RepoError::InvalidData(format!(
                    "document id is immutable, got `{value}`"
                )));
            }
            next.insert(key.clone(), value.clone());
        }

        if next == current {
            return Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: 0,
            });
        }

        let revision = current
            .get(REVISION_FIELD)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        next.insert(REVISION_FIELD.to_string(), Value::from(revision + 1));
        tx.execute(
            "UPDATE documents SET body = ?1 WHERE seq = ?2;",
            params![serde_json::to_string(&next)?, seq],
        )?;
        tx.commit()?;

        Ok(UpdateOutcome {
            matched_count: 1,
            modified_count: 1,
        })
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        let conn = self.lock()?;
        let Some((seq, _)) = select_rows(&conn, collection, filter, 0, Some(1))?
            .into_iter()
            .next()
        else {
            return Ok(0);
        };
        let deleted = conn.execute("DELETE FROM documents WHERE seq = ?1;", [seq])?;
        Ok(deleted as u64)
    }

    fn count(&self, collection: &str, filter: &Filter) -> RepoResult<u64> {
        let conn = self.lock()?;
        let mut sql = String::from("SELECT COUNT(*) FROM documents WHERE collection = ?");
        let mut bind_values = vec![SqlValue::Text(collection.to_string())];
        push_filter_sql(&mut sql, &mut bind_values, filter)?;

        let count: i64 = conn.query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

fn select_rows(
    conn: &Connection,
    collection: &str,
    filter: &Filter,
    skip: u64,
    limit: Option<u64>,
) -> RepoResult<Vec<(i64, Document)>> {
    let mut sql = String::from("SELECT seq, body FROM documents WHERE collection = ?");
    let mut bind_values = vec![SqlValue::Text(collection.to_string())];
    push_filter_sql(&mut sql, &mut bind_values, filter)?;
    sql.push_str(" ORDER BY seq ASC");

    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        bind_values.push(SqlValue::Integer(to_sql_int(limit)));
        if skip > 0 {
            sql.push_str(" OFFSET ?");
            bind_values.push(SqlValue::Integer(to_sql_int(skip)));
        }
    } else if skip > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        bind_values.push(SqlValue::Integer(to_sql_int(skip)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params_from_iter(bind_values))?;
    let mut docs = Vec::new();
    while let Some(row) = rows.next()? {
        let seq: i64 = row.get(0)?;
        let body: String = row.get(1)?;
        docs.push((seq, parse_body(&body)?));
    }
    Ok(docs)
}

fn load_by_id(conn: &Connection, collection: &str, id: &str) -> RepoResult<Option<Document>> {
    Ok(select_rows(conn, collection, &Filter::by_id(id), 0, Some(1))?
        .into_iter()
        .next()
        .map(|(_, doc)| doc))
}

fn populate_document(
    conn: &Connection,
    doc: &mut Document,
    populate: &[Populate<'_>],
) -> RepoResult<()> {
    for spec in populate {
        let Some(current) = doc.get(spec.field) else {
            continue;
        };
        let populated = match current {
            Value::String(id) => match load_by_id(conn, spec.collection, id)? {
                Some(target) => Value::Object(target),
                None => Value::Null,
            },
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    if let Value::String(id) = item {
                        if let Some(target) = load_by_id(conn, spec.collection, id)? {
                            resolved.push(Value::Object(target));
                        }
                    }
                }
                Value::Array(resolved)
            }
            _ => continue,
        };
        doc.insert(spec.field.to_string(), populated);
    }
    Ok(())
}

fn push_filter_sql(
    sql: &mut String,
    bind_values: &mut Vec<SqlValue>,
    filter: &Filter,
) -> RepoResult<()> {
    if let Some(field) = filter.invalid_field() {
        return Err(RepoError::InvalidFilterField(field.to_string()));
    }

    for condition in filter.conditions() {
        match condition {
            Condition::Eq(field, value) if field == ID_FIELD => {
                sql.push_str(" AND id = ?");
                bind_values.push(json_to_sql(value));
            }
            Condition::Eq(field, Value::Null) => {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
                bind_values.push(json_path(field));
            }
            Condition::Eq(field, value) => {
                sql.push_str(" AND json_extract(body, ?) = ?");
                bind_values.push(json_path(field));
                bind_values.push(json_to_sql(value));
            }
            Condition::In(_, values) if values.is_empty() => {
                sql.push_str(" AND 0 = 1");
            }
            Condition::In(field, values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                if field == ID_FIELD {
                    sql.push_str(&format!(" AND id IN ({placeholders})"));
                } else {
                    sql.push_str(&format!(" AND json_extract(body, ?) IN ({placeholders})"));
                    bind_values.push(json_path(field));
                }
                bind_values.extend(values.iter().map(json_to_sql));
            }
            Condition::Contains(field, value) => {
                // json_each walks a scalar as a one-row set; only arrays qualify.
                sql.push_str(
                    " AND json_type(documents.body, ?) = 'array'
                      AND EXISTS (
                        SELECT 1
                        FROM json_each(documents.body, ?) AS item
                        WHERE item.value = ?
                    )",
                );
                bind_values.push(json_path(field));
                bind_values.push(json_path(field));
                bind_values.push(json_to_sql(value));
            }
        }
    }
    Ok(())
}

fn json_path(field: &str) -> SqlValue {
    SqlValue::Text(format!("$.{field}"))
}

// Mirrors how json_extract surfaces JSON values to SQL.
fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => SqlValue::Integer(int),
            None => SqlValue::Real(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn parse_body(body: &str) -> RepoResult<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(doc) => Ok(doc),
        other => Err(RepoError::InvalidData(format!(
            "stored document is not an object: `{other}`"
        ))),
    }
}

fn ensure_document_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "documents")? {
        return Err(RepoError::MissingRequiredTable("documents"));
    }

    for column in ["seq", "collection", "id", "body"] {
        if !table_has_column(conn, "documents", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "documents",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
