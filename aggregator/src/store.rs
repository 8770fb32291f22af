//! Conflict-tolerant store of computed rows
//!
//! Every registered insert ends in `ON CONFLICT DO NOTHING`, so storing the
//! same window twice leaves the table unchanged.

use analytics_common::{AnalyticsError, ComputedRow};
use tracing::debug;

use crate::aggregations::Aggregation;
use crate::session::Session;

/// Append `rows` to the aggregation's table inside the session's transaction
pub async fn store<S: Session + ?Sized>(
    session: &mut S,
    aggregation: &dyn Aggregation,
    rows: &[ComputedRow],
) -> Result<u64, AnalyticsError> {
    if rows.is_empty() {
        debug!("Nothing to store for {}", aggregation.name());
        return Ok(0);
    }

    let inserted = session.insert(aggregation.insert_sql(), rows).await?;
    let skipped = rows.len() as u64 - inserted.min(rows.len() as u64);

    debug!(
        "Stored {} rows into {} ({} already present)",
        inserted,
        aggregation.name(),
        skipped
    );
    Ok(inserted)
}
