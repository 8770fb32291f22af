//! Error types for the aggregation engine

use analytics_common::AnalyticsError;
use near_rpc::FetchError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregatorError {
    /// Invalid combination of requested options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Requested or declared aggregation is not registered
    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    /// Statically declared dependencies loop back on themselves
    #[error("Dependency cycle detected: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    /// A window's drop/create/select/store cycle failed
    #[error("Failed to compute {aggregation}: {source}")]
    Compute {
        aggregation: String,
        #[source]
        source: AnalyticsError,
    },

    /// Contract code could not be fetched for the current classification batch
    #[error("Contract classification failed: {0}")]
    Classification(#[from] FetchError),

    /// A classification batch labelled none of its pending contracts
    #[error("Classification made no progress: {pending} pending contracts left unlabelled")]
    ClassificationStalled { pending: usize },

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

impl AggregatorError {
    pub fn compute(aggregation: &str, source: AnalyticsError) -> Self {
        AggregatorError::Compute {
            aggregation: aggregation.to_string(),
            source,
        }
    }
}
