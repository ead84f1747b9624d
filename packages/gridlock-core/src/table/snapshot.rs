//! Client-local copy of a table.

use chrono::{DateTime, Utc};

use super::record::{Record, TableRecord};
use crate::error::{GridError, Result};
use crate::schema::TableSchema;

/// Immutable copy of a table taken at `fetched_at`.
///
/// Positions index `records` and map to physical rows through
/// [`crate::address::physical_row`]. They only identify the same record in
/// the live table while nobody else inserts or deletes, which is why
/// mutations must be computed from a snapshot taken after acquiring the lock.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: String,
    pub header: Vec<String>,
    pub records: Vec<Record>,
    pub fetched_at: DateTime<Utc>,
    /// Set when the fetch failed and this snapshot is empty as a result
    pub degraded: Option<GridError>,
}

impl Snapshot {
    /// Builds a snapshot from raw grid values.
    ///
    /// Row 1 is the header. When the lock cell lives on the header row its
    /// column and anything right of it are not part of the header.
    pub fn from_values(schema: &TableSchema, values: Vec<Vec<String>>) -> Self {
        let mut rows = values.into_iter();
        let Some(mut header) = rows.next() else {
            return Self::empty(&schema.name, None);
        };
        if schema.lock_in_header() {
            header.truncate(schema.lock_cell.column as usize);
        }
        while header.last().is_some_and(|c| c.is_empty()) {
            header.pop();
        }
        let records = rows.map(|row| Record::from_row(&header, &row)).collect();
        Self {
            table: schema.name.clone(),
            header,
            records,
            fetched_at: Utc::now(),
            degraded: None,
        }
    }

    pub fn empty(table: &str, degraded: Option<GridError>) -> Self {
        Self {
            table: table.to_string(),
            header: Vec::new(),
            records: Vec::new(),
            fetched_at: Utc::now(),
            degraded,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    /// Positions of all records matching `predicate`, ascending.
    pub fn positions_where(&self, predicate: impl Fn(&Record) -> bool) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| predicate(r))
            .map(|(i, _)| i)
            .collect()
    }

    /// Positions whose `column` equals any of `wanted`, ascending.
    pub fn positions_matching(&self, column: &str, wanted: &[&str]) -> Vec<usize> {
        self.positions_where(|r| r.get(column).is_some_and(|v| wanted.contains(&v)))
    }

    /// Values of one column in record order; absent cells are empty text.
    pub fn column_values(&self, column: &str) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.get(column).unwrap_or_default())
            .collect()
    }

    /// Converts every record into its typed view.
    pub fn typed<T: TableRecord>(&self) -> Result<Vec<T>> {
        self.records.iter().map(T::from_record).collect()
    }
}
