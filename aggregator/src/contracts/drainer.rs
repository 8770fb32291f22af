//! Classification backlog drainer
//!
//! Select a batch of pending contracts, fetch and classify each one, apply
//! all labels in one statement and commit. Repeat until nothing is pending.
//! A fetch that exhausts its retries aborts the current batch; batches
//! committed before it stay committed.

use std::time::Instant;

use async_trait::async_trait;
use near_rpc::ContractCodeSource;
use tracing::{debug, info, warn};

use super::sdk_type::{classify, detect_candidates, SdkType};
use crate::aggregations::Enrichment;
use crate::error::AggregatorError;
use crate::scheduler::Enricher;
use crate::session::{ContractRegistry, Session};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Committed batches
    pub batches: usize,
    /// Contracts labelled across all batches
    pub classified: u64,
}

pub struct ClassificationBacklogDrainer<S> {
    source: S,
    batch_size: usize,
}

impl<S: ContractCodeSource> ClassificationBacklogDrainer<S> {
    pub fn new(source: S, batch_size: usize) -> Self {
        Self {
            source,
            batch_size: batch_size.max(1),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Classify every pending contract, committing after each batch
    pub async fn drain<R: ContractRegistry + ?Sized>(
        &self,
        registry: &mut R,
    ) -> Result<DrainReport, AggregatorError> {
        let start = Instant::now();
        let mut report = DrainReport::default();

        loop {
            let targets = registry.pending_classifications(self.batch_size).await?;
            info!(
                "There are {} unique contracts pending for SDK type identification...",
                targets.len()
            );
            if targets.is_empty() {
                break;
            }

            let mut updates = Vec::with_capacity(targets.len());
            for target in &targets {
                debug!(
                    "Fetching contract code for {} at block {}...",
                    target.account_id, target.block_hash
                );
                let code = self
                    .source
                    .fetch_code(&target.account_id, &target.block_hash)
                    .await?
                    .into_bytes();

                let sdk_type = classify(&code);
                if sdk_type == SdkType::Unknown {
                    let candidates = detect_candidates(&code);
                    if candidates.len() > 1 {
                        warn!(
                            "⚠️ Markers of several SDKs ({:?}) in contract {}, falling back to UNKNOWN",
                            candidates, target.content_hash
                        );
                    }
                }

                updates.push((target.content_hash.clone(), sdk_type));
            }

            let updated = registry.set_sdk_types(&updates).await?;
            registry.commit().await?;

            // A pending row that cannot be labelled would be selected forever
            if updated == 0 {
                return Err(AggregatorError::ClassificationStalled {
                    pending: updates.len(),
                });
            }

            report.batches += 1;
            report.classified += updated;
        }

        info!(
            "✅ Finished updating unique_contracts: {} contracts in {} batches ({:.1}s)",
            report.classified,
            report.batches,
            start.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}

#[async_trait]
impl<S: ContractCodeSource> Enricher for ClassificationBacklogDrainer<S> {
    async fn enrich(
        &self,
        enrichment: Enrichment,
        session: &mut dyn Session,
    ) -> Result<(), AggregatorError> {
        match enrichment {
            Enrichment::ContractSdkTypes => {
                self.drain(session).await?;
            }
        }
        Ok(())
    }
}
