//! Serializes backup and restore operations against one database.

use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::{BackupError, BackupResult};
use crate::loader::Operation;

/// One guard per database. Clones share the same lock.
#[derive(Debug, Clone)]
pub struct OperationGuard {
    name: Arc<str>,
    lock: Arc<Mutex<()>>,
}

/// Held for the duration of an operation; releases the guard on drop.
#[derive(Debug)]
pub struct OperationPermit {
    operation: Operation,
    _guard: OwnedMutexGuard<()>,
}

impl OperationPermit {
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl OperationGuard {
    /// `name` identifies the database in `Busy` errors and must not carry
    /// credentials.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Arc::from(name.into()),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Take the guard without waiting.
    ///
    /// # Errors
    ///
    /// Returns `BackupError::Busy` while another operation holds it.
    pub fn try_acquire(&self, operation: Operation) -> BackupResult<OperationPermit> {
        let guard = self
            .lock
            .clone()
            .try_lock_owned()
            .map_err(|_| BackupError::Busy(self.name.to_string()))?;
        debug!(database = %self.name, %operation, "Operation guard acquired");
        Ok(OperationPermit {
            operation,
            _guard: guard,
        })
    }

    /// Whether an operation is currently running.
    pub fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}
