//! HTTP endpoint implementations, one per grid primitive.

mod cell_handlers;
pub mod request_utils;
pub mod response;
mod table_handlers;

pub use cell_handlers::{append_row, delete_row, read_cell, read_values, write_cell, write_row};
pub use table_handlers::{
    clear_table, create_store, create_table, delete_table, freeze_rows, health, list_tables,
};
