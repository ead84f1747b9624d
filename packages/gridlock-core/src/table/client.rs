//! Fetch, insert, update and delete against a named table.

use std::fmt;
use std::sync::Arc;

use super::record::{Record, TableRecord};
use super::snapshot::Snapshot;
use crate::address::{self, HEADER_ROWS};
use crate::backend::GridBackend;
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::lock::{LockAcquired, LockCoordinator};
use crate::schema::TableSchema;
use crate::session::Session;

/// Outcome of a best-effort `update`.
///
/// Partial success is a normal outcome: every pair is attempted and each
/// failure is reported on its own.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Positions whose cell was written
    pub applied: Vec<usize>,
    /// Positions whose write failed, with the reason
    pub failed: Vec<(usize, GridError)>,
}

impl UpdateReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of a completed `delete`.
#[derive(Debug)]
pub struct DeleteReport {
    /// Positions removed, in the order they were removed (descending)
    pub deleted: Vec<usize>,
    /// How the table lock was obtained for the batch
    pub lock: Option<LockAcquired>,
}

/// Table operations on top of a grid backend.
#[derive(Clone)]
pub struct TableClient {
    backend: Arc<dyn GridBackend>,
    locks: LockCoordinator,
}

impl fmt::Debug for TableClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableClient")
            .field("locks", &self.locks)
            .finish()
    }
}

impl TableClient {
    pub fn new(backend: Arc<dyn GridBackend>, locks: LockCoordinator) -> Self {
        Self { backend, locks }
    }

    pub fn from_config(backend: Arc<dyn GridBackend>, config: &GridConfig) -> Self {
        let locks = LockCoordinator::from_config(backend.clone(), config);
        Self::new(backend, locks)
    }

    pub fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    pub fn backend(&self) -> &Arc<dyn GridBackend> {
        &self.backend
    }

    /// Reads the whole table.
    ///
    /// Never fails: an unreachable or missing table yields an empty snapshot
    /// whose `degraded` field carries the reason.
    pub fn fetch(&self, session: &Session, schema: &TableSchema) -> Snapshot {
        match self.try_fetch(session, schema) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Fetch of {}/{} failed: {}", session.store, schema.name, e);
                Snapshot::empty(&schema.name, Some(e))
            }
        }
    }

    /// Reads the whole table, returning the failure instead of an empty snapshot.
    pub fn try_fetch(&self, session: &Session, schema: &TableSchema) -> Result<Snapshot> {
        let values = self.backend.read_values(&session.store, &schema.name)?;
        let snapshot = Snapshot::from_values(schema, values);
        tracing::debug!(
            "Fetched {} records from {}/{}",
            snapshot.len(),
            session.store,
            schema.name
        );
        Ok(snapshot)
    }

    /// Appends one row below the last record. Takes no lock.
    ///
    /// The header row is frozen first so the append can never land above it.
    pub fn insert(&self, session: &Session, schema: &TableSchema, values: &[String]) -> Result<()> {
        if values.len() != schema.columns.len() {
            return Err(GridError::InvalidRecord {
                table: schema.name.clone(),
                reason: format!(
                    "expected {} values, got {}",
                    schema.columns.len(),
                    values.len()
                ),
            });
        }
        self.backend
            .freeze_rows(&session.store, &schema.name, HEADER_ROWS)?;
        self.backend
            .append_row(&session.store, &schema.name, values)?;
        tracing::debug!("Inserted row into {}/{}", session.store, schema.name);
        Ok(())
    }

    /// Appends a record, placing its values in schema column order.
    pub fn insert_record(&self, session: &Session, schema: &TableSchema, record: &Record) -> Result<()> {
        if let Some(unknown) = record.columns().find(|c| !schema.columns.iter().any(|s| s == c)) {
            return Err(GridError::ColumnNotFound {
                table: schema.name.clone(),
                column: unknown.to_string(),
            });
        }
        self.insert(session, schema, &record.values_for(&schema.columns))
    }

    /// Appends a typed record to its built-in table.
    pub fn insert_typed<T: TableRecord>(&self, session: &Session, record: &T) -> Result<()> {
        self.insert(session, &T::KIND.schema(), &record.to_values())
    }

    /// Writes `values[i]` into `column` of the record at `positions[i]`.
    ///
    /// The caller must hold the table lock and must have computed
    /// `positions` from a snapshot fetched after acquiring it. Writes are
    /// independent: a failed pair does not stop or undo the others.
    pub fn update(
        &self,
        session: &Session,
        schema: &TableSchema,
        positions: &[usize],
        column: &str,
        values: &[String],
    ) -> Result<UpdateReport> {
        let column_index = schema.column_index(column)?;
        if positions.len() != values.len() {
            return Err(GridError::InvalidArgument(format!(
                "{} positions but {} values",
                positions.len(),
                values.len()
            )));
        }

        let mut report = UpdateReport::default();
        for (&position, value) in positions.iter().zip(values) {
            let written = address::physical_address(column_index, position).and_then(|cell| {
                self.backend
                    .write_cell(&session.store, &schema.name, cell, value)
            });
            match written {
                Ok(()) => report.applied.push(position),
                Err(e) => {
                    tracing::warn!(
                        "Update of {}/{} {} at position {} failed: {}",
                        session.store,
                        schema.name,
                        column,
                        position,
                        e
                    );
                    report.failed.push((position, e));
                }
            }
        }
        Ok(report)
    }

    /// Removes the records at `positions`, taking the table lock itself.
    ///
    /// Positions are de-duplicated and removed in descending order so each
    /// remaining target keeps its physical row. If the lock cannot be taken
    /// nothing is deleted. A lock this call took is released afterwards; a
    /// lock the caller already held stays held.
    pub fn delete(&self, session: &Session, schema: &TableSchema, positions: &[usize]) -> Result<DeleteReport> {
        let mut ordered = positions.to_vec();
        ordered.sort_unstable_by(|a, b| b.cmp(a));
        ordered.dedup();
        if ordered.is_empty() {
            return Ok(DeleteReport {
                deleted: Vec::new(),
                lock: None,
            });
        }
        let rows = ordered
            .iter()
            .map(|&p| address::physical_row(p))
            .collect::<Result<Vec<_>>>()?;

        let acquired = self.locks.acquire(session, schema)?;

        let mut deleted = Vec::with_capacity(ordered.len());
        let mut failure = None;
        for (&position, &row) in ordered.iter().zip(&rows) {
            match self.backend.delete_row(&session.store, &schema.name, row) {
                Ok(()) => deleted.push(position),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        if acquired == LockAcquired::Fresh {
            if let Err(e) = self.locks.release(session, schema) {
                tracing::error!("Failed to release lock on {} after delete: {}", schema.name, e);
            }
        }

        if let Some(e) = failure {
            tracing::warn!(
                "Delete on {}/{} stopped after {} of {} rows: {}",
                session.store,
                schema.name,
                deleted.len(),
                ordered.len(),
                e
            );
            return Err(GridError::BatchInterrupted {
                table: schema.name.clone(),
                completed: deleted.len(),
                source: Box::new(e),
            });
        }

        tracing::debug!(
            "Deleted {} records from {}/{}",
            deleted.len(),
            session.store,
            schema.name
        );
        Ok(DeleteReport {
            deleted,
            lock: Some(acquired),
        })
    }

    /// Sets `column` to `value` on every record whose `key_column` is in `keys`.
    ///
    /// Positions are resolved from a snapshot fetched after taking the lock,
    /// so they cannot go stale between lookup and write.
    pub fn update_matching(
        &self,
        session: &Session,
        schema: &TableSchema,
        key_column: &str,
        keys: &[&str],
        column: &str,
        value: &str,
    ) -> Result<UpdateReport> {
        schema.column_index(key_column)?;
        schema.column_index(column)?;
        self.locks.with_lock(session, schema, || {
            let snapshot = self.try_fetch(session, schema)?;
            let positions = snapshot.positions_matching(key_column, keys);
            let values = vec![value.to_string(); positions.len()];
            self.update(session, schema, &positions, column, &values)
        })
    }

    /// Removes every record whose `key_column` is in `keys`, resolving
    /// positions under the lock.
    pub fn delete_matching(
        &self,
        session: &Session,
        schema: &TableSchema,
        key_column: &str,
        keys: &[&str],
    ) -> Result<DeleteReport> {
        schema.column_index(key_column)?;
        self.locks.with_lock(session, schema, || {
            let snapshot = self.try_fetch(session, schema)?;
            let positions = snapshot.positions_matching(key_column, keys);
            self.delete(session, schema, &positions)
        })
    }
}
