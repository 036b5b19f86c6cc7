//! Data access: stored-procedure calls and ad hoc queries against MySQL.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

mod error;
#[cfg(test)]
pub mod fake;
mod mysql;
pub mod rows;
pub mod split;

pub use error::DataAccessError;
pub use mysql::MySqlGateway;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Positional argument for a procedure call or query placeholder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Param {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Float(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Param::Null)
    }
}

/// Handle to the database shared by every request.
///
/// Each call borrows a pooled connection for its own duration and runs in
/// autocommit mode. Anything that must succeed or fail as a whole goes
/// through [`Gateway::begin`].
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn call_procedure(&self, name: &str, args: &[Param]) -> Result<Vec<Row>, DataAccessError>;
    async fn run_query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError>;
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DataAccessError>;
    async fn close(&self);
}

/// An open transaction. Dropping it without [`UnitOfWork::commit`] rolls back.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn call_procedure(
        &mut self,
        name: &str,
        args: &[Param],
    ) -> Result<Vec<Row>, DataAccessError>;
    async fn run_query(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError>;
    async fn commit(self: Box<Self>) -> Result<(), DataAccessError>;
}
