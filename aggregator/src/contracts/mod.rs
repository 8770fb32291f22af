//! Contract classification
//!
//! `unique_contracts` rows start with an empty `contract_sdk_type`. The
//! drainer resolves them batch by batch: fetch the code at the first
//! deployment block, classify it, write the label once.

pub mod drainer;
pub mod sdk_type;

use serde::{Deserialize, Serialize};

pub use drainer::{ClassificationBacklogDrainer, DrainReport};
pub use sdk_type::{classify, detect_candidates, SdkType};

/// A contract awaiting classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTarget {
    /// `contract_code_sha256`
    pub content_hash: String,
    /// Account the code was first deployed to
    pub account_id: String,
    /// Block of the first deployment; the code is viewed as of this block
    pub block_hash: String,
}
