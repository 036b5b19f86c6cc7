//! In-memory gateway for tests: scripted results and a call log.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use serde_json::Value;

use super::{DataAccessError, Gateway, Param, Row, UnitOfWork};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Procedure(String, Vec<Param>),
    Query(String, Vec<Param>),
    Begin,
    Commit,
    Rollback,
}

#[derive(Clone)]
enum Scripted {
    Rows(Vec<Row>),
    Fail(String),
}

#[derive(Default)]
struct Inner {
    procedures: Mutex<HashMap<String, Scripted>>,
    queries: Mutex<Vec<(String, Scripted)>>,
    log: Mutex<Vec<Call>>,
}

impl Inner {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }

    fn procedure(&self, name: &str, args: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        self.record(Call::Procedure(name.to_string(), args.to_vec()));
        match self.procedures.lock().unwrap().get(name).cloned() {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Fail(msg)) => Err(DataAccessError::Procedure {
                name: name.to_string(),
                source: sqlx::Error::Protocol(msg),
            }),
            None => Ok(Vec::new()),
        }
    }

    fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        self.record(Call::Query(sql.to_string(), params.to_vec()));
        let scripted = self
            .queries
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, s)| s.clone());
        match scripted {
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Fail(msg)) => Err(DataAccessError::Query(sqlx::Error::Protocol(msg))),
            None => Ok(Vec::new()),
        }
    }
}

/// Unscripted procedures and queries return no rows.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    inner: Arc<Inner>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_procedure(&self, name: &str, rows: Value) -> &Self {
        self.inner
            .procedures
            .lock()
            .unwrap()
            .insert(name.to_string(), Scripted::Rows(to_rows(rows)));
        self
    }

    pub fn fail_procedure(&self, name: &str, message: &str) -> &Self {
        self.inner
            .procedures
            .lock()
            .unwrap()
            .insert(name.to_string(), Scripted::Fail(message.to_string()));
        self
    }

    /// Scripts every query whose text contains `needle`.
    pub fn on_query(&self, needle: &str, rows: Value) -> &Self {
        self.inner
            .queries
            .lock()
            .unwrap()
            .push((needle.to_string(), Scripted::Rows(to_rows(rows))));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.log.lock().unwrap().clone()
    }

    pub fn procedure_calls(&self, name: &str) -> Vec<Vec<Param>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Procedure(n, args) if n == name => Some(args),
                _ => None,
            })
            .collect()
    }
}

fn to_rows(v: Value) -> Vec<Row> {
    v.as_array()
        .map(|rows| rows.iter().filter_map(|r| r.as_object().cloned()).collect())
        .unwrap_or_default()
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn call_procedure(&self, name: &str, args: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        self.inner.procedure(name, args)
    }

    async fn run_query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        self.inner.query(sql, params)
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DataAccessError> {
        self.inner.record(Call::Begin);
        Ok(Box::new(ScriptedUnitOfWork {
            inner: self.inner.clone(),
            committed: false,
        }))
    }

    async fn close(&self) {}
}

struct ScriptedUnitOfWork {
    inner: Arc<Inner>,
    committed: bool,
}

#[async_trait]
impl UnitOfWork for ScriptedUnitOfWork {
    async fn call_procedure(
        &mut self,
        name: &str,
        args: &[Param],
    ) -> Result<Vec<Row>, DataAccessError> {
        self.inner.procedure(name, args)
    }

    async fn run_query(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        self.inner.query(sql, params)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DataAccessError> {
        self.committed = true;
        self.inner.record(Call::Commit);
        Ok(())
    }
}

impl Drop for ScriptedUnitOfWork {
    fn drop(&mut self) {
        if !self.committed {
            self.inner.record(Call::Rollback);
        }
    }
}
