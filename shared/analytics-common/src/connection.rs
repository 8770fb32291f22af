//! PostgreSQL connection management
//!
//! The aggregator holds two connections for the whole run: the indexer
//! database (read-only source) and the analytics database (read-write
//! destination). Each driver connection task is spawned onto the runtime.

use tokio_postgres::{Client, Config, NoTls};
use tracing::{info, warn};

use crate::error::AnalyticsError;

/// Open a read-write connection
pub async fn connect(database_url: &str, label: &'static str) -> Result<Client, AnalyticsError> {
    let config: Config = database_url.parse().map_err(|e| {
        AnalyticsError::Configuration(format!("Invalid {} database URL: {}", label, e))
    })?;

    info!(
        ">>> CONN: Connecting to {} database (db={}, user={})...",
        label,
        config.get_dbname().unwrap_or("<default>"),
        config.get_user().unwrap_or("<default>")
    );

    let (client, connection) = config.connect(NoTls).await.map_err(|e| {
        warn!(">>> CONN ERROR: {} connection failed: {}", label, e);
        AnalyticsError::Connection(format!("{} connection failed: {}", label, e))
    })?;

    // Spawn connection handler
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!("{} PostgreSQL connection error: {}", label, e);
        }
    });

    info!(">>> CONN: ✓ {} database connected", label);
    Ok(client)
}

/// Open a connection whose transactions default to READ ONLY
pub async fn connect_readonly(
    database_url: &str,
    label: &'static str,
) -> Result<Client, AnalyticsError> {
    let client = connect(database_url, label).await?;
    client
        .batch_execute("SET SESSION CHARACTERISTICS AS TRANSACTION READ ONLY")
        .await?;
    info!(">>> CONN: ✓ {} database session set to read-only", label);
    Ok(client)
}
