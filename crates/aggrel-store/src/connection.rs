//! Connection abstraction
//!
//! Backends supply statement execution and the three transaction primitives.
//! The provided [`Connection::transaction`] flattens nesting: only the
//! outermost scope talks to the backend, inner scopes join it.

use crate::errors::{backend, Result};
use aggrel_core::{BackendError, RepoError, RepoErrorKind, Row, SqlValue};
use aggrel_core_types::schema::OP_TRANSACTION;

/// Nesting bookkeeping for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxState {
    pub depth: u32,
    /// Set when an inner scope failed; the outermost scope must roll back
    pub rollback_only: bool,
}

pub trait Connection: Send {
    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend cannot be opened.
    fn open(&mut self) -> std::result::Result<(), BackendError>;

    /// # Errors
    ///
    /// Returns a [`BackendError`] if the backend fails to shut down cleanly.
    fn close(&mut self) -> std::result::Result<(), BackendError>;

    fn is_open(&self) -> bool;

    /// Execute a statement, returning the number of affected rows
    ///
    /// # Errors
    ///
    /// Returns the backend failure unclassified.
    fn execute(&mut self, sql: &str, params: &[SqlValue])
        -> std::result::Result<usize, BackendError>;

    /// Run a query, returning rows keyed by column name
    ///
    /// # Errors
    ///
    /// Returns the backend failure unclassified.
    fn query(&mut self, sql: &str, params: &[SqlValue])
        -> std::result::Result<Vec<Row>, BackendError>;

    /// Whether deleting a root row removes its child rows
    fn supports_cascade(&self) -> bool {
        true
    }

    /// # Errors
    ///
    /// Returns the backend failure unclassified.
    fn begin(&mut self) -> std::result::Result<(), BackendError>;

    /// # Errors
    ///
    /// Returns the backend failure unclassified.
    fn commit(&mut self) -> std::result::Result<(), BackendError>;

    /// # Errors
    ///
    /// Returns the backend failure unclassified.
    fn rollback(&mut self) -> std::result::Result<(), BackendError>;

    fn tx_state(&mut self) -> &mut TxState;

    /// Run `body` atomically
    ///
    /// Nested calls join the enclosing transaction. If any scope fails, the
    /// whole transaction rolls back; an outer body that swallows an inner
    /// failure gets `Unknown` ("transaction marked rollback-only").
    ///
    /// # Errors
    ///
    /// Returns the body's error, or a classified backend error from
    /// begin/commit/rollback.
    fn transaction<R, F>(&mut self, body: F) -> Result<R>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R>,
    {
        if self.tx_state().depth > 0 {
            self.tx_state().depth += 1;
            let result = body(self);
            let state = self.tx_state();
            state.depth -= 1;
            if result.is_err() {
                state.rollback_only = true;
            }
            return result;
        }

        self.begin().map_err(backend(OP_TRANSACTION))?;
        *self.tx_state() = TxState {
            depth: 1,
            rollback_only: false,
        };
        let result = body(self);
        let rollback_only = self.tx_state().rollback_only;
        *self.tx_state() = TxState::default();

        match result {
            Ok(value) if !rollback_only => match self.commit() {
                Ok(()) => Ok(value),
                Err(err) => {
                    if let Err(rb) = self.rollback() {
                        tracing::warn!(op = OP_TRANSACTION, error = %rb, "rollback after failed commit failed");
                    }
                    Err(backend(OP_TRANSACTION)(err))
                }
            },
            Ok(_) => {
                self.rollback().map_err(backend(OP_TRANSACTION))?;
                Err(RepoError::new(RepoErrorKind::Unknown)
                    .with_op(OP_TRANSACTION)
                    .with_message("transaction marked rollback-only"))
            }
            Err(err) => {
                if let Err(rb) = self.rollback() {
                    tracing::warn!(op = OP_TRANSACTION, error = %rb, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
