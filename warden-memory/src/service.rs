use std::marker::PhantomData;

use anyhow::Result;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;
use warden_core::errors::WardenError;
use warden_core::{CallContext, Changes, Model, Query, Records, ServiceCapabilities};

type Row = Map<String, Value>;

/// In-memory table of `R` records.
pub struct MemoryService<R> {
    rows: RwLock<Vec<Row>>,
    pub capabilities: ServiceCapabilities,
    _record: PhantomData<fn() -> R>,
}

impl<R: Model> Default for MemoryService<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Model> MemoryService<R> {
    pub fn new() -> Self {
        Self::with_capabilities(ServiceCapabilities::standard_crud())
    }

    pub fn with_capabilities(capabilities: ServiceCapabilities) -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            capabilities,
            _record: PhantomData,
        }
    }

    /// Number of stored rows, ignoring any scoping.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Raw stored rows, as the adapter sees them.
    pub async fn rows(&self) -> Vec<Value> {
        self.rows
            .read()
            .await
            .iter()
            .cloned()
            .map(Value::Object)
            .collect()
    }

    fn table() -> &'static str {
        R::SCHEMA.table
    }

    fn pk() -> &'static str {
        R::SCHEMA.primary_key
    }

    fn not_found(id: &str) -> anyhow::Error {
        WardenError::not_found(format!("{} not found: {id}", Self::table())).into_anyhow()
    }

    fn to_row(record: &R) -> Result<Row> {
        match serde_json::to_value(record) {
            Ok(Value::Object(row)) => Ok(row),
            Ok(_) => Err(WardenError::unprocessable(format!(
                "records of `{}` must serialize to JSON objects",
                Self::table()
            ))
            .into_anyhow()),
            Err(e) => Err(WardenError::unprocessable(format!(
                "could not serialize a `{}` record",
                Self::table()
            ))
            .with_source(e.into())
            .into_anyhow()),
        }
    }

    fn from_row(row: &Row) -> Result<R> {
        serde_json::from_value(Value::Object(row.clone())).map_err(|e| {
            WardenError::unprocessable(format!("could not read a `{}` row", Self::table()))
                .with_source(e.into())
                .into_anyhow()
        })
    }

    fn row_id(row: &Row) -> Option<String> {
        match row.get(Self::pk()) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn is_target(row: &Row, id: Option<&str>, query: &Query) -> bool {
        id.map_or(true, |id| Self::row_id(row).as_deref() == Some(id)) && query.matches(row)
    }

    /// Bulk writes need at least one condition unless explicitly unfiltered.
    fn guard_bulk(id: Option<&str>, query: &Query, method: &str) -> Result<()> {
        if id.is_none() && query.conditions().is_empty() && !query.is_unfiltered() {
            warden_core::bail_warden!(
                bad_request,
                "refusing to {} every `{}` row without conditions",
                method,
                Self::table()
            );
        }
        Ok(())
    }

    pub async fn _find<P>(&self, _ctx: &CallContext, query: &Query, _params: P) -> Result<Vec<R>> {
        let rows = self.rows.read().await;
        let limit = query.max_rows().unwrap_or(usize::MAX);
        let found = rows
            .iter()
            .filter(|row| query.matches(row))
            .take(limit)
            .map(Self::from_row)
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(table = Self::table(), matched = found.len(), "memory find");
        Ok(found)
    }

    pub async fn _get<P>(&self, _ctx: &CallContext, id: &str, query: &Query, _params: P) -> Result<R> {
        let rows = self.rows.read().await;
        let row = rows
            .iter()
            .find(|row| Self::is_target(row, Some(id), query))
            .ok_or_else(|| Self::not_found(id))?;
        Self::from_row(row)
    }

    pub async fn _count<P>(&self, _ctx: &CallContext, query: &Query, _params: P) -> Result<usize> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|row| query.matches(row)).count())
    }

    pub async fn _create<P>(
        &self,
        _ctx: &CallContext,
        data: Records<R>,
        _params: P,
    ) -> Result<Records<R>> {
        let mut rows = self.rows.write().await;
        let mut staged: Vec<Row> = Vec::with_capacity(data.len());

        let created = data.try_map(|record| {
            let mut row = Self::to_row(&record)?;
            match Self::row_id(&row) {
                Some(id) => {
                    let taken = rows
                        .iter()
                        .chain(staged.iter())
                        .any(|r| Self::row_id(r).as_deref() == Some(id.as_str()));
                    if taken {
                        return Err(WardenError::conflict(format!(
                            "{} already exists: {id}",
                            Self::table()
                        ))
                        .into_anyhow());
                    }
                }
                None => {
                    row.insert(Self::pk().to_string(), Value::String(Uuid::new_v4().to_string()));
                }
            }

            let out = Self::from_row(&row)?;
            staged.push(row);
            Ok(out)
        })?;

        tracing::trace!(table = Self::table(), inserted = staged.len(), "memory create");
        rows.extend(staged);
        Ok(created)
    }

    pub async fn _update<P>(
        &self,
        _ctx: &CallContext,
        id: &str,
        data: R,
        query: &Query,
        _params: P,
    ) -> Result<R> {
        let mut rows = self.rows.write().await;
        let slot = rows
            .iter_mut()
            .find(|row| Self::is_target(row, Some(id), query))
            .ok_or_else(|| Self::not_found(id))?;

        let mut row = Self::to_row(&data)?;
        for column in R::SCHEMA.write_once_columns() {
            if let Some(value) = slot.get(column).cloned() {
                row.insert(column.to_string(), value);
            }
        }

        let out = Self::from_row(&row)?;
        *slot = row;
        Ok(out)
    }

    pub async fn _patch<P>(
        &self,
        _ctx: &CallContext,
        id: Option<&str>,
        changes: Changes,
        query: &Query,
        _params: P,
    ) -> Result<Vec<R>> {
        Self::guard_bulk(id, query, "patch")?;

        let write_once = R::SCHEMA.write_once_columns();
        let mut rows = self.rows.write().await;
        let mut patched: Vec<(usize, Row, R)> = Vec::new();
        for (i, row) in rows.iter().enumerate() {
            if !Self::is_target(row, id, query) {
                continue;
            }
            let mut next = row.clone();
            changes.apply_to(&mut next, &write_once);
            let record = Self::from_row(&next)?;
            patched.push((i, next, record));
        }

        if let (Some(id), true) = (id, patched.is_empty()) {
            return Err(Self::not_found(id));
        }

        tracing::trace!(table = Self::table(), matched = patched.len(), "memory patch");
        Ok(patched
            .into_iter()
            .map(|(i, row, record)| {
                rows[i] = row;
                record
            })
            .collect())
    }

    pub async fn _remove<P>(
        &self,
        _ctx: &CallContext,
        id: Option<&str>,
        query: &Query,
        _params: P,
    ) -> Result<Vec<R>> {
        Self::guard_bulk(id, query, "remove")?;

        let mut rows = self.rows.write().await;
        let removed = rows
            .iter()
            .filter(|row| Self::is_target(row, id, query))
            .map(Self::from_row)
            .collect::<Result<Vec<_>>>()?;

        if let (Some(id), true) = (id, removed.is_empty()) {
            return Err(Self::not_found(id));
        }

        rows.retain(|row| !Self::is_target(row, id, query));
        tracing::trace!(table = Self::table(), removed = removed.len(), "memory remove");
        Ok(removed)
    }
}

warden_core::warden_adapter!(
    [R: warden_core::Model, P: Send + 'static]
    MemoryService<R>,
    R,
    P
);
