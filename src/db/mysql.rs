use anyhow::Context;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sqlx::{
    mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow},
    query::Query,
    Column, Executor, MySql, Row as _, Transaction, TypeInfo, ValueRef,
};
use time::{macros::format_description, Date, PrimitiveDateTime, Time};
use tracing::{debug, error, info};

use super::{DataAccessError, Gateway, Param, Row, UnitOfWork};
use crate::config::DatabaseConfig;

pub struct MySqlGateway {
    pool: MySqlPool,
}

impl MySqlGateway {
    pub async fn connect(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        let pool = MySqlPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await
            .context("connect to database")?;

        info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            pool_size = config.pool_size,
            "database pool ready"
        );
        Ok(Self { pool })
    }
}

#[async_trait]
impl Gateway for MySqlGateway {
    async fn call_procedure(&self, name: &str, args: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        let sql = call_statement(name, args.len())?;
        let rows = fetch(&self.pool, &sql, args).await.map_err(|source| {
            error!(procedure = name, error = %source, "procedure call failed");
            DataAccessError::Procedure {
                name: name.to_string(),
                source,
            }
        })?;
        debug!(procedure = name, rows = rows.len(), "procedure called");
        Ok(rows)
    }

    async fn run_query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        fetch(&self.pool, sql, params).await.map_err(|e| {
            error!(error = %e, "query failed");
            DataAccessError::Query(e)
        })
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DataAccessError> {
        let tx = self.pool.begin().await.map_err(DataAccessError::Transaction)?;
        debug!("transaction opened");
        Ok(Box::new(MySqlUnitOfWork { tx }))
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

struct MySqlUnitOfWork {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl UnitOfWork for MySqlUnitOfWork {
    async fn call_procedure(
        &mut self,
        name: &str,
        args: &[Param],
    ) -> Result<Vec<Row>, DataAccessError> {
        let sql = call_statement(name, args.len())?;
        fetch(&mut *self.tx, &sql, args)
            .await
            .map_err(|source| DataAccessError::Procedure {
                name: name.to_string(),
                source,
            })
    }

    async fn run_query(&mut self, sql: &str, params: &[Param]) -> Result<Vec<Row>, DataAccessError> {
        fetch(&mut *self.tx, sql, params)
            .await
            .map_err(DataAccessError::Query)
    }

    async fn commit(self: Box<Self>) -> Result<(), DataAccessError> {
        self.tx.commit().await.map_err(DataAccessError::Transaction)?;
        debug!("transaction committed");
        Ok(())
    }
}

fn call_statement(name: &str, arity: usize) -> Result<String, DataAccessError> {
    lazy_static! {
        static ref IDENT_RE: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    }
    if !IDENT_RE.is_match(name) {
        return Err(DataAccessError::InvalidProcedure(name.to_string()));
    }
    let placeholders = vec!["?"; arity].join(", ");
    Ok(format!("CALL {}({})", name, placeholders))
}

/// Rows of every result set the statement produces, in order.
async fn fetch<'c, E>(executor: E, sql: &str, params: &[Param]) -> Result<Vec<Row>, sqlx::Error>
where
    E: Executor<'c, Database = MySql>,
{
    let rows = bind_params(sqlx::query(sql), params)
        .fetch_all(executor)
        .await?;
    rows.iter().map(decode_row).collect()
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[Param],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            Param::Int(v) => query.bind(*v),
            Param::Float(v) => query.bind(*v),
            Param::Text(v) => query.bind(v.clone()),
            Param::Bool(v) => query.bind(*v),
            Param::Null => query.bind(None::<String>),
        };
    }
    query
}

fn decode_row(row: &MySqlRow) -> Result<Row, sqlx::Error> {
    let mut out = Row::new();
    for column in row.columns() {
        let value = decode_column(row, column.ordinal(), column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let ty = type_name.to_ascii_uppercase();
    let value = match ty.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get_unchecked::<bool, _>(idx)?),
        t if t.ends_with("INT UNSIGNED") => Value::from(row.try_get_unchecked::<u64, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::from(row.try_get_unchecked::<i64, _>(idx)?)
        }
        "FLOAT" => float(row.try_get_unchecked::<f32, _>(idx)? as f64),
        "DOUBLE" => float(row.try_get_unchecked::<f64, _>(idx)?),
        "DECIMAL" => {
            let raw: String = row.try_get_unchecked(idx)?;
            match raw.parse::<f64>() {
                Ok(v) => float(v),
                Err(_) => Value::String(raw),
            }
        }
        "DATETIME" | "TIMESTAMP" => {
            let v: PrimitiveDateTime = row.try_get_unchecked(idx)?;
            Value::String(
                v.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            )
        }
        "DATE" => {
            let v: Date = row.try_get_unchecked(idx)?;
            Value::String(
                v.format(format_description!("[year]-[month]-[day]"))
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            )
        }
        "TIME" => {
            let v: Time = row.try_get_unchecked(idx)?;
            Value::String(
                v.format(format_description!("[hour]:[minute]:[second]"))
                    .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            )
        }
        _ => match row.try_get_unchecked::<String, _>(idx) {
            Ok(s) => Value::String(s),
            Err(_) => {
                let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            }
        },
    };
    Ok(value)
}

fn float(v: f64) -> Value {
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
