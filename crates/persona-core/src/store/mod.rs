//! Store handle
//!
//! Handlers hand a [`Statement`] to a [`PersonaStore`] and get back either the
//! affected row count (writes) or the matching rows (reads). The handle is
//! opened at startup, shared through `AppState`, and closed at shutdown.

mod memory;
mod mysql;

pub use memory::MemoryStore;
pub use mysql::{DatabaseOptions, MysqlStore};

use crate::capability::Capability;
use crate::model::Persona;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

/// Store-level failure. Details are for logs, never for clients.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("value conversion failed: {0}")]
    ValueConversionFailed(String),

    #[error("store is closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Bound parameter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
}

/// One parameterized SQL statement and the operation it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub capability: Capability,
    pub sql: &'static str,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(capability: Capability, sql: &'static str, params: Vec<SqlValue>) -> Self {
        Self {
            capability,
            sql,
            params,
        }
    }

    pub fn int(&self, index: usize) -> StoreResult<i64> {
        match self.params.get(index) {
            Some(SqlValue::Int(v)) => Ok(*v),
            other => Err(self.param_mismatch(index, "integer", other)),
        }
    }

    pub fn text(&self, index: usize) -> StoreResult<&str> {
        match self.params.get(index) {
            Some(SqlValue::Text(v)) => Ok(v),
            other => Err(self.param_mismatch(index, "text", other)),
        }
    }

    pub fn date(&self, index: usize) -> StoreResult<NaiveDate> {
        match self.params.get(index) {
            Some(SqlValue::Date(v)) => Ok(*v),
            other => Err(self.param_mismatch(index, "date", other)),
        }
    }

    fn param_mismatch(
        &self,
        index: usize,
        expected: &str,
        found: Option<&SqlValue>,
    ) -> StoreError {
        StoreError::QueryFailed(format!(
            "parameter {} of `{}` should be {}, found {:?}",
            index, self.sql, expected, found
        ))
    }
}

/// Shared database handle
#[async_trait]
pub trait PersonaStore: Send + Sync + 'static {
    /// Backend name for logs
    fn kind(&self) -> &'static str;

    /// Run a write, returning the number of affected rows
    async fn execute(&self, statement: &Statement) -> StoreResult<u64>;

    /// Run a read, returning every matching row in store order
    async fn query(&self, statement: &Statement) -> StoreResult<Vec<Persona>>;

    /// Release the underlying connection. Later calls fail with [`StoreError::Closed`].
    async fn close(&self) -> StoreResult<()>;
}
