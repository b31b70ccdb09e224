use thiserror::Error;

/// Errors raised by a [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("request to table '{table}' failed: {source}")]
    Request {
        table: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("table '{table}' returned {status}: {body}")]
    Status {
        table: String,
        status: u16,
        body: String,
    },

    #[error("could not decode rows from '{table}': {message}")]
    Decode { table: String, message: String },

    #[error("insert into '{0}' returned no row")]
    EmptyInsert(String),

    #[error("memory store is unavailable")]
    Unavailable,
}
