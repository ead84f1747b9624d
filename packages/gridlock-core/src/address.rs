//! Mapping between logical record positions and physical cell addresses.
//!
//! Physical rows are 1-based and row 1 is the header, so the record at
//! position `p` lives on row `p + HEADER_ROWS + 1`. Columns are lettered
//! `A..Z`, `AA..AZ`, ... in spreadsheet style.

use std::fmt;
use std::str::FromStr;

use crate::error::{GridError, Result};

/// Number of header rows above the record area.
pub const HEADER_ROWS: u32 = 1;

/// A single cell in a table, e.g. `G1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Zero-based column index (`A` = 0)
    pub column: u32,
    /// One-based row number
    pub row: u32,
}

impl CellAddress {
    pub fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Column letters of this cell.
    pub fn column_letter(&self) -> String {
        column_letter(self.column)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letter(self.column), self.row)
    }
}

impl FromStr for CellAddress {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GridError::InvalidCellAddress(s.to_string());
        let split = s
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = s.split_at(split);
        let column = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { column, row })
    }
}

/// Converts a zero-based column index to its letters (`0` -> `A`, `26` -> `AA`).
pub fn column_letter(index: u32) -> String {
    let mut n = index as u64 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        letters.push(b'A' + rem);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts column letters back to a zero-based index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut n: u64 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u64 + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
        if n > u32::MAX as u64 {
            return None;
        }
    }
    Some((n - 1) as u32)
}

/// Physical row number of the record at a zero-based position.
pub fn physical_row(position: usize) -> Result<u32> {
    u32::try_from(position)
        .ok()
        .and_then(|p| p.checked_add(HEADER_ROWS + 1))
        .ok_or_else(|| GridError::InvalidArgument(format!("position {} is too large", position)))
}

/// Zero-based record position of a physical row, or `None` for header rows.
pub fn logical_position(row: u32) -> Option<usize> {
    if row <= HEADER_ROWS {
        None
    } else {
        Some((row - HEADER_ROWS - 1) as usize)
    }
}

/// Cell holding column `column` (zero-based) of the record at `position`.
pub fn physical_address(column: usize, position: usize) -> Result<CellAddress> {
    let column = u32::try_from(column)
        .map_err(|_| GridError::InvalidArgument(format!("column {} is too large", column)))?;
    Ok(CellAddress::new(column, physical_row(position)?))
}
