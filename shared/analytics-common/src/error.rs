//! Error types for analytics database access

use thiserror::Error;

/// Analytics operation errors
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query error raised outside of the PostgreSQL driver
    #[error("Query error: {0}")]
    Query(String),

    /// A selected column has a type the row decoder does not handle
    #[error("Unsupported type {type_name} for column {column}")]
    UnsupportedColumn { column: String, type_name: String },

    /// PostgreSQL driver error
    #[error("PostgreSQL error: {0}")]
    Database(#[from] tokio_postgres::Error),
}
