//! Process-local grid store.
//!
//! Shared through `Arc`, a single `MemoryGrid` stands in for the hosted
//! service: every client handle sees the same tables. Each trait call takes
//! the store lock once, so two calls from one client are never atomic
//! together, which is the same guarantee the hosted service gives.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

use super::GridBackend;
use crate::address::CellAddress;
use crate::error::{GridError, Result};
use crate::session::StoreId;

#[derive(Debug, Default)]
struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
    row_count: u32,
    col_count: u32,
    frozen_rows: u32,
}

impl Sheet {
    fn new(name: &str, rows: u32, cols: u32) -> Self {
        Self {
            name: name.to_string(),
            rows: Vec::new(),
            row_count: rows,
            col_count: cols,
            frozen_rows: 0,
        }
    }

    fn last_non_blank_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|v| !v.is_empty()))
    }

    /// Rejects cells outside the declared grid, like the hosted store.
    fn check_bounds(&self, cell: CellAddress) -> Result<()> {
        if cell.row == 0 || cell.row > self.row_count {
            return Err(GridError::RowOutOfRange {
                table: self.name.clone(),
                row: cell.row,
            });
        }
        if cell.column >= self.col_count {
            return Err(GridError::InvalidCellAddress(format!(
                "{} is outside table '{}' ({} columns)",
                cell, self.name, self.col_count
            )));
        }
        Ok(())
    }

    /// Writes one in-bounds cell.
    fn set(&mut self, cell: CellAddress, value: &str) {
        let row_idx = (cell.row - 1) as usize;
        let col_idx = cell.column as usize;
        if self.rows.len() <= row_idx {
            self.rows.resize_with(row_idx + 1, Vec::new);
        }
        let row = &mut self.rows[row_idx];
        if row.len() <= col_idx {
            row.resize(col_idx + 1, String::new());
        }
        row[col_idx] = value.to_string();
    }

    fn get(&self, cell: CellAddress) -> String {
        self.rows
            .get((cell.row - 1) as usize)
            .and_then(|row| row.get(cell.column as usize))
            .cloned()
            .unwrap_or_default()
    }

    fn values(&self) -> Vec<Vec<String>> {
        let Some(last) = self.last_non_blank_row() else {
            return Vec::new();
        };
        let width = self.rows[..=last]
            .iter()
            .filter_map(|row| row.iter().rposition(|v| !v.is_empty()))
            .max()
            .map(|i| i + 1)
            .unwrap_or(0);
        self.rows[..=last]
            .iter()
            .map(|row| {
                let mut out: Vec<String> = row.iter().take(width).cloned().collect();
                out.resize(width, String::new());
                out
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Store {
    sheets: Vec<Sheet>,
}

impl Store {
    fn sheet(&self, store: &StoreId, table: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == table)
            .ok_or_else(|| table_not_found(store, table))
    }

    fn sheet_mut(&mut self, store: &StoreId, table: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == table)
            .ok_or_else(|| table_not_found(store, table))
    }
}

fn table_not_found(store: &StoreId, table: &str) -> GridError {
    GridError::TableNotFound {
        store: store.to_string(),
        table: table.to_string(),
    }
}

/// In-memory grid store with outage simulation.
#[derive(Debug, Default)]
pub struct MemoryGrid {
    stores: RwLock<HashMap<StoreId, Store>>,
    offline: AtomicBool,
    failing_cells: Mutex<HashSet<(String, CellAddress)>>,
    writes: AtomicU64,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a grid with the given stores already present.
    pub fn with_stores<'a>(stores: impl IntoIterator<Item = &'a StoreId>) -> Self {
        let grid = Self::new();
        {
            let mut map = grid.stores.write();
            for store in stores {
                map.entry(store.clone()).or_default();
            }
        }
        grid
    }

    /// While offline every call fails with a connectivity error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes writes to one cell of one table fail with a connectivity error.
    pub fn fail_writes_to(&self, table: &str, cell: CellAddress) {
        self.failing_cells.lock().insert((table.to_string(), cell));
    }

    pub fn clear_failures(&self) {
        self.failing_cells.lock().clear();
    }

    /// Number of successful mutating calls since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Frozen row count of a table.
    pub fn frozen_rows(&self, store: &StoreId, table: &str) -> Result<u32> {
        self.read(store, |s| Ok(s.sheet(store, table)?.frozen_rows))
    }

    /// Declared grid size of a table as `(rows, cols)`.
    pub fn dimensions(&self, store: &StoreId, table: &str) -> Result<(u32, u32)> {
        self.read(store, |s| {
            let sheet = s.sheet(store, table)?;
            Ok((sheet.row_count, sheet.col_count))
        })
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(GridError::Connectivity("grid store unreachable".to_string()));
        }
        Ok(())
    }

    fn read<R>(&self, store: &StoreId, f: impl FnOnce(&Store) -> Result<R>) -> Result<R> {
        self.check_online()?;
        let stores = self.stores.read();
        let s = stores
            .get(store)
            .ok_or_else(|| GridError::StoreNotFound(store.to_string()))?;
        f(s)
    }

    fn write<R>(&self, store: &StoreId, f: impl FnOnce(&mut Store) -> Result<R>) -> Result<R> {
        self.check_online()?;
        let mut stores = self.stores.write();
        let s = stores
            .get_mut(store)
            .ok_or_else(|| GridError::StoreNotFound(store.to_string()))?;
        let result = f(s)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }
}

impl GridBackend for MemoryGrid {
    fn create_store(&self, store: &StoreId) -> Result<()> {
        self.check_online()?;
        let mut stores = self.stores.write();
        if stores.contains_key(store) {
            return Err(GridError::InvalidArgument(format!(
                "store '{}' already exists",
                store
            )));
        }
        stores.insert(store.clone(), Store::default());
        Ok(())
    }

    fn list_tables(&self, store: &StoreId) -> Result<Vec<String>> {
        self.read(store, |s| Ok(s.sheets.iter().map(|t| t.name.clone()).collect()))
    }

    fn create_table(&self, store: &StoreId, table: &str, rows: u32, cols: u32) -> Result<()> {
        self.write(store, |s| {
            if s.sheets.iter().any(|t| t.name == table) {
                return Err(GridError::TableAlreadyExists(table.to_string()));
            }
            s.sheets.push(Sheet::new(table, rows, cols));
            Ok(())
        })
    }

    fn delete_table(&self, store: &StoreId, table: &str) -> Result<()> {
        self.write(store, |s| {
            let idx = s
                .sheets
                .iter()
                .position(|t| t.name == table)
                .ok_or_else(|| table_not_found(store, table))?;
            s.sheets.remove(idx);
            Ok(())
        })
    }

    fn clear_table(&self, store: &StoreId, table: &str) -> Result<()> {
        self.write(store, |s| {
            s.sheet_mut(store, table)?.rows.clear();
            Ok(())
        })
    }

    fn read_values(&self, store: &StoreId, table: &str) -> Result<Vec<Vec<String>>> {
        self.read(store, |s| Ok(s.sheet(store, table)?.values()))
    }

    fn read_cell(&self, store: &StoreId, table: &str, cell: CellAddress) -> Result<String> {
        self.read(store, |s| Ok(s.sheet(store, table)?.get(cell)))
    }

    fn write_cell(
        &self,
        store: &StoreId,
        table: &str,
        cell: CellAddress,
        value: &str,
    ) -> Result<()> {
        if self
            .failing_cells
            .lock()
            .contains(&(table.to_string(), cell))
        {
            return Err(GridError::Connectivity(format!(
                "write to {}!{} dropped",
                table, cell
            )));
        }
        self.write(store, |s| {
            let sheet = s.sheet_mut(store, table)?;
            sheet.check_bounds(cell)?;
            sheet.set(cell, value);
            Ok(())
        })
    }

    fn write_row(&self, store: &StoreId, table: &str, row: u32, values: &[String]) -> Result<()> {
        if row == 0 {
            return Err(GridError::RowOutOfRange {
                table: table.to_string(),
                row,
            });
        }
        self.write(store, |s| {
            let sheet = s.sheet_mut(store, table)?;
            let last = values.len().saturating_sub(1) as u32;
            sheet.check_bounds(CellAddress::new(last, row))?;
            for (col, value) in values.iter().enumerate() {
                sheet.set(CellAddress::new(col as u32, row), value);
            }
            Ok(())
        })
    }

    fn append_row(&self, store: &StoreId, table: &str, values: &[String]) -> Result<()> {
        self.write(store, |s| {
            let sheet = s.sheet_mut(store, table)?;
            let after_data = sheet.last_non_blank_row().map(|i| i + 1).unwrap_or(0);
            let target = after_data.max(sheet.frozen_rows as usize);
            sheet.rows.truncate(target);
            sheet.rows.resize_with(target, Vec::new);
            sheet.rows.push(values.to_vec());
            sheet.row_count = sheet.row_count.max(sheet.rows.len() as u32);
            sheet.col_count = sheet.col_count.max(values.len() as u32);
            Ok(())
        })
    }

    fn delete_row(&self, store: &StoreId, table: &str, row: u32) -> Result<()> {
        self.write(store, |s| {
            let sheet = s.sheet_mut(store, table)?;
            let limit = sheet.row_count.max(sheet.rows.len() as u32);
            if row == 0 || row > limit {
                return Err(GridError::RowOutOfRange {
                    table: table.to_string(),
                    row,
                });
            }
            let idx = (row - 1) as usize;
            if idx < sheet.rows.len() {
                sheet.rows.remove(idx);
            }
            sheet.row_count = sheet.row_count.saturating_sub(1).max(sheet.rows.len() as u32);
            Ok(())
        })
    }

    fn freeze_rows(&self, store: &StoreId, table: &str, rows: u32) -> Result<()> {
        self.write(store, |s| {
            s.sheet_mut(store, table)?.frozen_rows = rows;
            Ok(())
        })
    }
}
