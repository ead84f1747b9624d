//! Table access: snapshots, records, and the table client.

mod client;
mod record;
mod snapshot;

pub use client::{DeleteReport, TableClient, UpdateReport};
pub use record::{
    AccountRecord, ChatRecord, ChatRole, DocumentRecord, Record, TableRecord, TagRecord,
};
pub use snapshot::Snapshot;
