use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RaccoonError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("Table `{table}` required by {dao} does not exist")]
    MissingTable { dao: &'static str, table: &'static str },

    #[error("Stored schema version {stored} of {dao} is newer than supported version {supported}")]
    SchemaTooNew {
        dao: &'static str,
        stored: i64,
        supported: i64,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl RaccoonError {
    /// True when the database rejected a write because of a UNIQUE constraint,
    /// e.g. inserting a group whose name is already taken.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RaccoonError::DatabaseError(SqlxError::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

impl From<figment::Error> for RaccoonError {
    fn from(e: figment::Error) -> Self {
        RaccoonError::Config(Box::new(e))
    }
}
