use mysync_schema::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("mysync configuration has already been initialized")]
    AlreadyInitialized,

    #[error("cannot parse schema{} at line {line}: {reason}", table_suffix(.table))]
    Parse {
        table: Option<String>,
        line: usize,
        reason: String,
    },

    #[error("statement failed: {statement}: {source}")]
    Execution {
        statement: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn table_suffix(table: &Option<String>) -> String {
    table
        .as_ref()
        .map(|t| format!(" of table `{}`", t))
        .unwrap_or_default()
}

impl Error {
    /// The statement that failed, for execution errors.
    pub fn statement(&self) -> Option<&str> {
        match self {
            Error::Execution { statement, .. } => Some(statement),
            _ => None,
        }
    }
}
