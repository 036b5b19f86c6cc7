use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataAccessError {
    #[error("invalid procedure name: {0}")]
    InvalidProcedure(String),

    #[error("procedure {name} failed: {source}")]
    Procedure {
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("unexpected result: {0}")]
    Shape(String),
}

impl DataAccessError {
    /// True when the server reported that the named procedure does not exist.
    pub fn is_missing_procedure(&self) -> bool {
        match self {
            DataAccessError::Procedure { source, .. } => {
                let msg = match source {
                    sqlx::Error::Database(db) => db.message().to_string(),
                    other => other.to_string(),
                };
                msg.contains("PROCEDURE") && msg.contains("does not exist")
            }
            _ => false,
        }
    }
}
