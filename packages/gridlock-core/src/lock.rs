//! Cooperative per-table lock kept in a reserved cell.
//!
//! The lock cell holds either [`UNLOCKED`] or the identity of the holder.
//! Acquisition is a read followed by a separate write, so two clients that
//! both read `Unlocked` in the same instant can both write their identity;
//! the last write wins and the other client believes it holds the lock.
//! The backing store offers no compare-and-set to close that window.
//!
//! There is no expiry. A holder that never releases leaves the table locked
//! until an operator calls [`LockCoordinator::reset`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::backend::GridBackend;
use crate::clock::{Clock, SystemClock};
use crate::config::GridConfig;
use crate::error::{GridError, Result};
use crate::schema::{TableSchema, UNLOCKED};
use crate::session::{Identity, Session};

/// Observed content of a lock cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    LockedBy(String),
}

impl LockState {
    /// Only the exact sentinel counts as unlocked; a blank cell is held by `""`.
    pub fn from_cell(value: &str) -> Self {
        if value == UNLOCKED {
            LockState::Unlocked
        } else {
            LockState::LockedBy(value.to_string())
        }
    }

    pub fn holder(&self) -> Option<&str> {
        match self {
            LockState::Unlocked => None,
            LockState::LockedBy(holder) => Some(holder),
        }
    }

    pub fn is_held_by(&self, identity: &Identity) -> bool {
        self.holder() == Some(identity.as_str())
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => f.write_str(UNLOCKED),
            LockState::LockedBy(holder) => write!(f, "locked by '{}'", holder),
        }
    }
}

/// How a successful acquire got the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAcquired {
    /// The cell was unlocked and now holds our identity
    Fresh,
    /// We already held it; nothing was written
    Reentrant,
}

/// Polling parameters for `acquire`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(500),
        }
    }
}

impl LockOptions {
    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            timeout: config.lock_timeout(),
            poll_interval: config.lock_poll_interval(),
        }
    }
}

/// Acquires and releases table locks.
#[derive(Clone)]
pub struct LockCoordinator {
    backend: Arc<dyn GridBackend>,
    clock: Arc<dyn Clock>,
    options: LockOptions,
}

impl fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("options", &self.options)
            .finish()
    }
}

impl LockCoordinator {
    pub fn new(backend: Arc<dyn GridBackend>, clock: Arc<dyn Clock>, options: LockOptions) -> Self {
        Self {
            backend,
            clock,
            options,
        }
    }

    /// Coordinator on the system clock with configured timings.
    pub fn from_config(backend: Arc<dyn GridBackend>, config: &GridConfig) -> Self {
        Self::new(backend, Arc::new(SystemClock), LockOptions::from_config(config))
    }

    pub fn options(&self) -> LockOptions {
        self.options
    }

    /// Reads the lock cell without changing it.
    pub fn status(&self, session: &Session, schema: &TableSchema) -> Result<LockState> {
        let value = self
            .backend
            .read_cell(&session.store, &schema.name, schema.lock_cell)?;
        Ok(LockState::from_cell(&value))
    }

    /// Acquires with the coordinator's default timings.
    pub fn acquire(&self, session: &Session, schema: &TableSchema) -> Result<LockAcquired> {
        self.acquire_with(session, schema, self.options)
    }

    /// Polls the lock cell until it is ours or `options.timeout` elapses.
    ///
    /// Reentrant: succeeds without writing when the cell already holds our
    /// identity. Read or claim failures caused by connectivity are retried on
    /// the next poll; addressing errors abort immediately. On timeout nothing
    /// has been written.
    pub fn acquire_with(
        &self,
        session: &Session,
        schema: &TableSchema,
        options: LockOptions,
    ) -> Result<LockAcquired> {
        let identity = session.identity.as_str();
        let start = self.clock.now();
        let deadline = start + options.timeout;
        let mut last_holder = String::new();

        while self.clock.now() < deadline {
            match self
                .backend
                .read_cell(&session.store, &schema.name, schema.lock_cell)
            {
                Ok(value) => match LockState::from_cell(&value) {
                    LockState::Unlocked => {
                        match self.backend.write_cell(
                            &session.store,
                            &schema.name,
                            schema.lock_cell,
                            identity,
                        ) {
                            Ok(()) => {
                                tracing::info!(
                                    "Lock on {}/{} acquired by {}",
                                    session.store,
                                    schema.name,
                                    identity
                                );
                                return Ok(LockAcquired::Fresh);
                            }
                            Err(e) if e.is_addressing() => return Err(e),
                            Err(e) => {
                                tracing::warn!(
                                    "Failed to claim lock on {}/{}: {}",
                                    session.store,
                                    schema.name,
                                    e
                                );
                            }
                        }
                    }
                    LockState::LockedBy(holder) if holder == identity => {
                        tracing::debug!(
                            "Lock on {}/{} already held by {}",
                            session.store,
                            schema.name,
                            identity
                        );
                        return Ok(LockAcquired::Reentrant);
                    }
                    LockState::LockedBy(holder) => {
                        tracing::debug!(
                            "Lock on {}/{} held by '{}', waiting",
                            session.store,
                            schema.name,
                            holder
                        );
                        last_holder = holder;
                    }
                },
                Err(e) if e.is_addressing() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Failed to read lock on {}/{}: {}",
                        session.store,
                        schema.name,
                        e
                    );
                }
            }
            self.clock.sleep(options.poll_interval);
        }

        let waited = self.clock.now().saturating_duration_since(start);
        tracing::warn!(
            "Timed out waiting for lock on {}/{} after {:?}",
            session.store,
            schema.name,
            waited
        );
        Err(GridError::LockTimeout {
            table: schema.name.clone(),
            holder: last_holder,
            waited_ms: waited.as_millis() as u64,
        })
    }

    /// Writes the sentinel back if and only if we hold the lock.
    pub fn release(&self, session: &Session, schema: &TableSchema) -> Result<()> {
        let current = self
            .backend
            .read_cell(&session.store, &schema.name, schema.lock_cell)?;
        if !LockState::from_cell(&current).is_held_by(&session.identity) {
            tracing::warn!(
                "{} tried to release lock on {}/{} held by '{}'",
                session.identity,
                session.store,
                schema.name,
                current
            );
            return Err(GridError::LockNotOwned {
                table: schema.name.clone(),
                identity: session.identity.to_string(),
                current,
            });
        }
        self.backend
            .write_cell(&session.store, &schema.name, schema.lock_cell, UNLOCKED)?;
        tracing::info!(
            "Lock on {}/{} released by {}",
            session.store,
            schema.name,
            session.identity
        );
        Ok(())
    }

    /// Operator override: writes the sentinel regardless of holder.
    ///
    /// Returns the state found before the reset.
    pub fn reset(&self, session: &Session, schema: &TableSchema) -> Result<LockState> {
        let previous = self.status(session, schema)?;
        self.backend
            .write_cell(&session.store, &schema.name, schema.lock_cell, UNLOCKED)?;
        tracing::warn!(
            "Lock on {}/{} reset by {} (was {})",
            session.store,
            schema.name,
            session.identity,
            previous
        );
        Ok(previous)
    }

    /// Runs `f` while holding the table lock.
    ///
    /// The lock is released afterwards only if this call acquired it, so
    /// nesting inside an outer hold keeps the outer hold intact.
    pub fn with_lock<R>(
        &self,
        session: &Session,
        schema: &TableSchema,
        f: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let acquired = self.acquire(session, schema)?;
        let result = f();
        if acquired == LockAcquired::Fresh {
            match self.release(session, schema) {
                Ok(()) => {}
                Err(e) if result.is_ok() => return Err(e),
                Err(e) => {
                    tracing::error!("Failed to release lock on {}: {}", schema.name, e);
                }
            }
        }
        result
    }
}
