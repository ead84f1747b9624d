//! Explicit client context passed to every operation.

use std::fmt;

use crate::error::{GridError, Result};
use crate::schema::UNLOCKED;

/// Identifier of a store on the backing service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(String);

impl StoreId {
    /// Accepts a bare id or a share link of the form `.../d/<id>/...`.
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let id = if reference.contains("/d/") {
            reference
                .split("/d/")
                .nth(1)
                .and_then(|rest| rest.split('/').next())
                .unwrap_or_default()
        } else if reference.contains('/') {
            return Err(GridError::InvalidStoreReference(reference.to_string()));
        } else {
            reference
        };

        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(GridError::InvalidStoreReference(reference.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque client identity written into lock cells.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(identity: impl Into<String>) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(GridError::InvalidIdentity("identity is empty".to_string()));
        }
        if identity == UNLOCKED {
            return Err(GridError::InvalidIdentity(format!(
                "'{}' is reserved for the lock sentinel",
                UNLOCKED
            )));
        }
        Ok(Self(identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which store to talk to, and who is talking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub store: StoreId,
    pub identity: Identity,
}

impl Session {
    pub fn new(store: StoreId, identity: Identity) -> Self {
        Self { store, identity }
    }

    /// Same identity against another store.
    pub fn for_store(&self, store: StoreId) -> Self {
        Self {
            store,
            identity: self.identity.clone(),
        }
    }
}
