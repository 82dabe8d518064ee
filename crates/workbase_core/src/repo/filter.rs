//! Document filters understood by every repository implementation.
//!
//! # Responsibility
//! - Express conjunctive match conditions over top-level document fields.
//! - Render a JSON description for error payloads and logs.
//!
//! # Invariants
//! - Field names are plain top-level identifiers; nested paths are rejected.
//! - An empty filter matches every document of a collection.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static FIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field name regex"));

/// Returns whether `name` can be used as a filter field.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME_RE.is_match(name)
}

/// One match condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals value. `Value::Null` matches null or absent fields.
    Eq(String, Value),
    /// Field equals any of the values. An empty list matches nothing.
    In(String, Vec<Value>),
    /// List field contains the value.
    Contains(String, Value),
}

impl Condition {
    pub fn field(&self) -> &str {
        match self {
            Self::Eq(field, _) | Self::In(field, _) | Self::Contains(field, _) => field,
        }
    }
}

/// Conjunction of [`Condition`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches one document id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().eq("id", Value::String(id.into()))
    }

    /// Matches any of the given document ids.
    pub fn id_in<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new().is_in("id", ids.into_iter().map(|id| Value::String(id.into())))
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.conditions.push(Condition::In(
            field.into(),
            values.into_iter().map(Into::into).collect(),
        ));
        self
    }

    pub fn contains(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(field.into(), value.into()));
        self
    }

    /// Returns a copy of this filter extended with all conditions of `other`.
    pub fn and(&self, other: &Filter) -> Self {
        let mut conditions = self.conditions.clone();
        conditions.extend(other.conditions.iter().cloned());
        Self { conditions }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Returns the first field name that is not a plain identifier.
    pub fn invalid_field(&self) -> Option<&str> {
        self.conditions
            .iter()
            .map(Condition::field)
            .find(|field| !is_valid_field_name(field))
    }

    /// JSON rendering, e.g. `{"id": "..", "tags": {"$contains": "x"}}`.
    ///
    /// Repeated fields are merged into an `$and` list.
    pub fn describe(&self) -> Value {
        let mut object = Map::new();
        let mut repeated = Vec::new();
        for condition in &self.conditions {
            let rendered = match condition {
                Condition::Eq(_, value) => value.clone(),
                Condition::In(_, values) => {
                    Value::Object(Map::from_iter([("$in".to_string(), Value::Array(values.clone()))]))
                }
                Condition::Contains(_, value) => {
                    Value::Object(Map::from_iter([("$contains".to_string(), value.clone())]))
                }
            };
            let field = condition.field().to_string();
            if object.contains_key(&field) {
                repeated.push(Value::Object(Map::from_iter([(field, rendered)])));
            } else {
                object.insert(field, rendered);
            }
        }
        if !repeated.is_empty() {
            object.insert("$and".to_string(), Value::Array(repeated));
        }
        Value::Object(object)
    }
}
