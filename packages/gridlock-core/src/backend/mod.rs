//! Remote grid primitives.
//!
//! A backend exposes exactly the calls a hosted spreadsheet offers: whole
//! table reads, single cell reads and writes, row appends and row deletes.
//! There is no transaction or compare-and-set; each call is one round trip.

mod memory;
#[cfg(feature = "remote")]
mod http;

pub use memory::MemoryGrid;
#[cfg(feature = "remote")]
pub use http::HttpBackend;

use crate::address::CellAddress;
use crate::error::Result;
use crate::session::StoreId;

/// Backing store operations.
pub trait GridBackend: Send + Sync {
    /// Creates an empty store. Fails if it already exists.
    fn create_store(&self, store: &StoreId) -> Result<()>;

    /// Table names in creation order.
    fn list_tables(&self, store: &StoreId) -> Result<Vec<String>>;

    /// Creates a blank table sized `rows` x `cols`.
    fn create_table(&self, store: &StoreId, table: &str, rows: u32, cols: u32) -> Result<()>;

    fn delete_table(&self, store: &StoreId, table: &str) -> Result<()>;

    /// Blanks every cell of a table, keeping the table itself.
    fn clear_table(&self, store: &StoreId, table: &str) -> Result<()>;

    /// All values as equal-width rows, trailing blank rows dropped.
    fn read_values(&self, store: &StoreId, table: &str) -> Result<Vec<Vec<String>>>;

    /// Value of one cell; blank cells read as the empty string.
    fn read_cell(&self, store: &StoreId, table: &str, cell: CellAddress) -> Result<String>;

    fn write_cell(&self, store: &StoreId, table: &str, cell: CellAddress, value: &str)
        -> Result<()>;

    /// Writes `values` left to right starting at column `A` of `row`.
    fn write_row(&self, store: &StoreId, table: &str, row: u32, values: &[String]) -> Result<()>;

    /// Writes `values` below the last non-blank row.
    fn append_row(&self, store: &StoreId, table: &str, values: &[String]) -> Result<()>;

    /// Removes a physical row; later rows shift up by one.
    fn delete_row(&self, store: &StoreId, table: &str, row: u32) -> Result<()>;

    /// Pins the first `rows` rows so appends never land above them.
    fn freeze_rows(&self, store: &StoreId, table: &str, rows: u32) -> Result<()>;
}
