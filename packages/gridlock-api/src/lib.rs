//! HTTP front for a shared in-memory grid store.
//!
//! Exposes one endpoint per grid primitive so that independent client
//! processes can coordinate through a single store.

pub mod config;
pub mod handlers;
pub mod router;
pub mod server;
