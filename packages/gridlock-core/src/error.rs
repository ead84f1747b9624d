//! Grid client error types.

use thiserror::Error;

/// Grid operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A remote call failed before producing an answer
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// Lock acquisition exceeded its deadline
    #[error("Timed out after {waited_ms}ms waiting for lock on '{table}' (held by '{holder}')")]
    LockTimeout {
        table: String,
        holder: String,
        waited_ms: u64,
    },

    /// Release attempted by a client that does not hold the lock
    #[error("Lock on '{table}' is not held by '{identity}' (current: '{current}')")]
    LockNotOwned {
        table: String,
        identity: String,
        current: String,
    },

    /// Store not found
    #[error("Store '{0}' not found")]
    StoreNotFound(String),

    /// Table not found in store
    #[error("Table '{table}' not found in store '{store}'")]
    TableNotFound { store: String, table: String },

    /// Table already exists
    #[error("Table '{0}' already exists")]
    TableAlreadyExists(String),

    /// Column not part of the table schema
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound { table: String, column: String },

    /// Physical row outside the table
    #[error("Row {row} out of range for table '{table}'")]
    RowOutOfRange { table: String, row: u32 },

    /// Malformed cell reference such as `7G`
    #[error("Invalid cell address '{0}'")]
    InvalidCellAddress(String),

    /// Malformed store id or share link
    #[error("Invalid store reference '{0}'")]
    InvalidStoreReference(String),

    /// Identity unusable as a lock holder
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// Record shape does not match the table
    #[error("Invalid record for table '{table}': {reason}")]
    InvalidRecord { table: String, reason: String },

    /// A record with the same key already exists
    #[error("'{key}' already exists in table '{table}'")]
    DuplicateRecord { table: String, key: String },

    /// Arguments rejected before any remote call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Multi-row batch stopped part way through
    #[error("Batch on '{table}' interrupted after {completed} operations: {source}")]
    BatchInterrupted {
        table: String,
        completed: usize,
        source: Box<GridError>,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error reported by a remote grid server with no local equivalent
    #[error("Remote error ({code}): {message}")]
    Remote { code: u16, message: String },
}

impl GridError {
    /// Stable identifier used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            GridError::Connectivity(_) => "connectivity",
            GridError::LockTimeout { .. } => "lock_timeout",
            GridError::LockNotOwned { .. } => "lock_not_owned",
            GridError::StoreNotFound(_) => "store_not_found",
            GridError::TableNotFound { .. } => "table_not_found",
            GridError::TableAlreadyExists(_) => "table_already_exists",
            GridError::ColumnNotFound { .. } => "column_not_found",
            GridError::RowOutOfRange { .. } => "row_out_of_range",
            GridError::InvalidCellAddress(_) => "invalid_cell_address",
            GridError::InvalidStoreReference(_) => "invalid_store_reference",
            GridError::InvalidIdentity(_) => "invalid_identity",
            GridError::InvalidRecord { .. } => "invalid_record",
            GridError::DuplicateRecord { .. } => "duplicate_record",
            GridError::InvalidArgument(_) => "invalid_argument",
            GridError::BatchInterrupted { .. } => "batch_interrupted",
            GridError::SerializationError(_) => "serialization",
            GridError::ConfigError(_) => "config",
            GridError::Remote { .. } => "remote",
        }
    }

    /// True for bad store/table/cell references. Mutations abort before writing.
    pub fn is_addressing(&self) -> bool {
        matches!(
            self,
            GridError::StoreNotFound(_)
                | GridError::TableNotFound { .. }
                | GridError::ColumnNotFound { .. }
                | GridError::RowOutOfRange { .. }
                | GridError::InvalidCellAddress(_)
                | GridError::InvalidStoreReference(_)
        )
    }

    /// True when trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GridError::Connectivity(_) | GridError::LockTimeout { .. }
        )
    }
}

/// Result alias for grid operations.
pub type Result<T> = std::result::Result<T, GridError>;
