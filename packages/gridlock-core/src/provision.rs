//! Table creation with header, frozen header row and unlocked lock cell.

use std::fmt;
use std::sync::Arc;

use crate::address::HEADER_ROWS;
use crate::backend::GridBackend;
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::schema::{TableKind, TableSchema, UNLOCKED};
use crate::session::Session;

/// Names a hosting service gives the first table of a new store.
pub const DEFAULT_TABLE_NAMES: [&str; 4] =
    ["Untitled spreadsheet", "Sheet1", "工作表1", "未命名的工作表"];

/// What `setup` did to each table.
#[derive(Debug, Default)]
pub struct ProvisionReport {
    pub created: Vec<String>,
    /// Existing tables that were cleared and rewritten
    pub reset: Vec<String>,
    /// Existing tables left untouched
    pub skipped: Vec<String>,
    pub failed: Vec<(String, GridError)>,
    /// Default table removed after setup
    pub removed_default: Option<String>,
}

impl ProvisionReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Creates the tables of a store.
#[derive(Clone)]
pub struct Provisioner {
    backend: Arc<dyn GridBackend>,
    rows: u32,
    cols: u32,
}

impl fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provisioner")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .finish()
    }
}

impl Provisioner {
    pub fn new(backend: Arc<dyn GridBackend>) -> Self {
        Self {
            backend,
            rows: 1000,
            cols: 20,
        }
    }

    pub fn from_config(backend: Arc<dyn GridBackend>, config: &GridConfig) -> Self {
        Self {
            backend,
            rows: config.provision_rows,
            cols: config.provision_cols,
        }
    }

    /// Creates every table in `tables` that is missing from the store.
    ///
    /// Existing tables are skipped, or cleared and rewritten when
    /// `reset_existing` is set. A failure on one table is recorded and the
    /// others are still attempted. Only an unreachable or unknown store
    /// fails the call as a whole.
    pub fn setup(
        &self,
        session: &Session,
        tables: &[TableSchema],
        reset_existing: bool,
        delete_default: bool,
    ) -> Result<ProvisionReport> {
        let existing = self.backend.list_tables(&session.store)?;
        let mut report = ProvisionReport::default();

        for schema in tables {
            let present = existing.iter().any(|t| t == &schema.name);
            if present && !reset_existing {
                tracing::info!("Table {}/{} exists, skipping", session.store, schema.name);
                report.skipped.push(schema.name.clone());
                continue;
            }
            match self.prepare(session, schema, present) {
                Ok(()) if present => {
                    tracing::warn!("Table {}/{} reset", session.store, schema.name);
                    report.reset.push(schema.name.clone());
                }
                Ok(()) => {
                    tracing::info!("Table {}/{} created", session.store, schema.name);
                    report.created.push(schema.name.clone());
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to set up table {}/{}: {}",
                        session.store,
                        schema.name,
                        e
                    );
                    report.failed.push((schema.name.clone(), e));
                }
            }
        }

        if delete_default {
            match self.remove_default_table(session) {
                Ok(removed) => report.removed_default = removed,
                Err(e) => {
                    tracing::warn!("Failed to remove default table in {}: {}", session.store, e)
                }
            }
        }
        Ok(report)
    }

    /// Tables of a per-user data store.
    pub fn setup_user_store(&self, session: &Session, reset_existing: bool) -> Result<ProvisionReport> {
        let tables: Vec<_> = TableKind::USER_STORE.iter().map(|k| k.schema()).collect();
        self.setup(session, &tables, reset_existing, true)
    }

    /// Tables of the shared account directory.
    pub fn setup_directory(&self, session: &Session, reset_existing: bool) -> Result<ProvisionReport> {
        let tables: Vec<_> = TableKind::DIRECTORY_STORE
            .iter()
            .map(|k| k.schema())
            .collect();
        self.setup(session, &tables, reset_existing, true)
    }

    fn prepare(&self, session: &Session, schema: &TableSchema, present: bool) -> Result<()> {
        let store = &session.store;
        if present {
            self.backend.clear_table(store, &schema.name)?;
        } else {
            let cols = self.cols.max(schema.lock_cell.column + 1);
            self.backend
                .create_table(store, &schema.name, self.rows, cols)?;
        }
        self.backend
            .write_row(store, &schema.name, 1, &schema.columns)?;
        self.backend
            .freeze_rows(store, &schema.name, HEADER_ROWS)?;
        self.backend
            .write_cell(store, &schema.name, schema.lock_cell, UNLOCKED)
    }

    /// Deletes the first default-named table unless it is the only one.
    fn remove_default_table(&self, session: &Session) -> Result<Option<String>> {
        let tables = self.backend.list_tables(&session.store)?;
        let Some(default) = tables
            .iter()
            .find(|t| DEFAULT_TABLE_NAMES.contains(&t.as_str()))
        else {
            return Ok(None);
        };
        if tables.len() == 1 {
            tracing::warn!(
                "Not removing {} from {}: it is the only table",
                default,
                session.store
            );
            return Ok(None);
        }
        self.backend.delete_table(&session.store, default)?;
        tracing::info!("Removed default table {} from {}", default, session.store);
        Ok(Some(default.clone()))
    }
}
