//! Table layouts: column order and lock cell per table.

use std::fmt;
use std::str::FromStr;

use crate::address::{self, CellAddress};
use crate::error::{GridError, Result};

/// Value stored in a lock cell when nobody holds the lock.
pub const UNLOCKED: &str = "Unlocked";

/// Column layout and lock cell of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table name inside the store
    pub name: String,
    /// Column names in physical order
    pub columns: Vec<String>,
    /// Reserved cell holding the lock state
    pub lock_cell: CellAddress,
}

impl TableSchema {
    /// Creates a schema whose lock cell sits on row 1 just right of the last column.
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        let lock_cell = CellAddress::new(columns.len() as u32, 1);
        Self::with_lock_cell(name, columns, lock_cell)
    }

    pub fn with_lock_cell(name: impl Into<String>, columns: &[&str], lock_cell: CellAddress) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            lock_cell,
        }
    }

    /// Zero-based index of a column.
    pub fn column_index(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| GridError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Cell holding `column` of the record at `position`.
    pub fn cell_for(&self, column: &str, position: usize) -> Result<CellAddress> {
        address::physical_address(self.column_index(column)?, position)
    }

    /// True when the lock cell shares the header row.
    pub fn lock_in_header(&self) -> bool {
        self.lock_cell.row <= address::HEADER_ROWS
    }
}

/// Tables used by the literature workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Document summaries (`user_docs`)
    Documents,
    /// Tag list (`user_tags`)
    Tags,
    /// Chat history (`user_chats`)
    ChatLog,
    /// Account directory (`user_info`)
    Account,
}

impl TableKind {
    /// Tables provisioned into every user data store.
    pub const USER_STORE: [TableKind; 3] = [TableKind::Documents, TableKind::Tags, TableKind::ChatLog];

    /// Tables provisioned into the account directory store.
    pub const DIRECTORY_STORE: [TableKind; 1] = [TableKind::Account];

    pub fn table_name(self) -> &'static str {
        match self {
            TableKind::Documents => "user_docs",
            TableKind::Tags => "user_tags",
            TableKind::ChatLog => "user_chats",
            TableKind::Account => "user_info",
        }
    }

    pub fn columns(self) -> &'static [&'static str] {
        match self {
            TableKind::Documents => &[
                "_fileId",
                "_fileName",
                "_summary",
                "_generatedTime",
                "_length",
                "_tag",
            ],
            TableKind::Tags => &["_tagId", "_tag"],
            TableKind::ChatLog => &["_fileId", "_role", "_content", "_model", "_time"],
            TableKind::Account => &[
                "_username",
                "_userId",
                "_email",
                "_password",
                "_registerTime",
                "_dbURL",
            ],
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            TableKind::Documents => "User documents table",
            TableKind::Tags => "User tags table",
            TableKind::ChatLog => "User chat history table",
            TableKind::Account => "Account directory table",
        }
    }

    /// Full schema. Lock cells: `G1`, `C1`, `F1`, `G1`.
    pub fn schema(self) -> TableSchema {
        TableSchema::new(self.table_name(), self.columns())
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for TableKind {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user_docs" | "documents" => Ok(TableKind::Documents),
            "user_tags" | "tags" => Ok(TableKind::Tags),
            "user_chats" | "chat-log" => Ok(TableKind::ChatLog),
            "user_info" | "account" => Ok(TableKind::Account),
            other => Err(GridError::InvalidArgument(format!("unknown table '{}'", other))),
        }
    }
}
