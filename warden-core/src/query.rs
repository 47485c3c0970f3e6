//! Statement conditions and column assignments.
//!
//! Warden does not build SQL. A `Query` is a list of equality conditions
//! that storage adapters evaluate against their rows; statement callbacks
//! append to it before the service method runs.

use serde_json::{Map, Value};

/// A single predicate on a row.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
}

impl Condition {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Evaluate against a row. A missing column compares as `null`.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        match self {
            Condition::Eq { column, value } => row.get(column).unwrap_or(&Value::Null) == value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: Vec<Condition>,
    limit: Option<usize>,
    unfiltered: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Query::add_condition`] for an equality filter.
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.add_condition(Condition::eq(column, value));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Allow bulk writes that carry no condition at all.
    ///
    /// Adapters refuse a multi-row patch or remove with an empty
    /// condition list unless this is set.
    pub fn unfiltered(mut self) -> Self {
        self.unfiltered = true;
        self
    }

    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.limit
    }

    pub fn is_unfiltered(&self) -> bool {
        self.unfiltered
    }

    /// All conditions must hold.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.matches(row))
    }
}

/// Column assignments for a column-wise update (`patch`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes(Map<String, Value>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Write every assignment into `row`, except the `skip` columns.
    pub fn apply_to(&self, row: &mut Map<String, Value>, skip: &[&str]) {
        for (column, value) in &self.0 {
            if skip.contains(&column.as_str()) {
                continue;
            }
            row.insert(column.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for Changes {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
