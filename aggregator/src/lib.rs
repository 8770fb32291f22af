//! NEAR analytics aggregation engine
//!
//! Computes daily/weekly statistics from the NEAR indexer database into the
//! analytics database:
//! - [`registry`]: aggregation kinds by name
//! - [`scheduler`]: dependency-ordered, transactional runs
//! - [`backfill`]: genesis-to-now windows for full-history recomputes
//! - [`store`]: conflict-tolerant inserts
//! - [`contracts`]: SDK type classification of deployed contracts

pub mod aggregations;
pub mod backfill;
pub mod cli;
pub mod contracts;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod store;

pub use aggregations::{default_registry, Aggregation, Enrichment};
pub use backfill::{windows_since_genesis, BackfillWindows};
pub use contracts::{
    classify, ClassificationBacklogDrainer, ClassificationTarget, DrainReport, SdkType,
};
pub use error::AggregatorError;
pub use registry::AggregationRegistry;
pub use scheduler::{Enricher, RunMode, Scheduler};
pub use session::{ContractRegistry, Database, PgSession, Session};
pub use store::store;
