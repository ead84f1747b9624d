//! Concurrent access to tables in a remote grid store.
//!
//! The store offers single-cell reads and writes, row appends and row
//! deletes, but no transactions. Writers coordinate through a cooperative
//! lock kept in a reserved cell of each table, and address records by
//! position in a snapshot fetched after taking that lock.

pub mod address;
pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod library;
pub mod lock;
pub mod provision;
pub mod schema;
pub mod session;
pub mod table;
pub mod wire;

pub use backend::{GridBackend, MemoryGrid};
pub use error::{GridError, Result};
pub use lock::{LockAcquired, LockCoordinator, LockOptions, LockState};
pub use session::{Identity, Session, StoreId};
pub use table::{Snapshot, TableClient};
