//! Analytics Common Library
//!
//! Shared configuration, error types, window policy and row values for the
//! NEAR analytics aggregator. The aggregator reads from the indexer
//! PostgreSQL database and writes into a separate analytics database; both
//! sides exchange rows through the types defined here.

pub mod config;
pub mod connection;
pub mod error;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use config::AggregatorConfig;
pub use connection::{connect, connect_readonly};
pub use error::AnalyticsError;
pub use types::{row_values, ComputedRow, SqlValue};
pub use window::{
    is_supported_timestamp, Clock, ExecutionWindow, FixedClock, Periodicity, SystemClock,
    TimeRange, DAY_SECONDS, GENESIS_EPOCH_SECONDS, MAX_TIMESTAMP_SECONDS, WEEK_SECONDS,
};
