//! Ledger capabilities: read-only UTXO access and transaction submission.

mod memory;

pub use memory::MemoryLedger;

use crate::domain::{Address, AssetId, OutputRef, Utxo};
use crate::foundation::{AmbassadorError, Result, TransactionId};
use async_trait::async_trait;
use thiserror::Error;

/// Read-only view of the current UTXO set.
#[async_trait]
pub trait UtxoFetcher: Send + Sync {
    /// Empty when the output was spent or never existed.
    async fn fetch_by_reference(&self, outref: &OutputRef) -> Result<Vec<Utxo>>;
    async fn fetch_by_address(&self, address: &Address) -> Result<Vec<Utxo>>;
    async fn fetch_by_asset(&self, asset: &AssetId) -> Result<Vec<Utxo>>;
}

/// Why the ledger refused a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("inputs already consumed: {}", join_refs(.outrefs))]
    InputsConsumed { outrefs: Vec<OutputRef> },
    #[error("{reason}")]
    Invalid { reason: String },
}

impl SubmitRejection {
    pub fn invalid(reason: impl Into<String>) -> Self {
        SubmitRejection::Invalid { reason: reason.into() }
    }
}

fn join_refs(outrefs: &[OutputRef]) -> String {
    outrefs.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl From<SubmitRejection> for AmbassadorError {
    fn from(rejection: SubmitRejection) -> Self {
        match rejection {
            SubmitRejection::InputsConsumed { outrefs } => AmbassadorError::StateAlreadyAdvanced { outref: join_refs(&outrefs) },
            SubmitRejection::Invalid { reason } => AmbassadorError::LedgerRejection { reason },
        }
    }
}

#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, tx_hex: &str) -> std::result::Result<TransactionId, SubmitRejection>;
}
