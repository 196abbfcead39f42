//! Domain layer: pure ledger and workflow logic, no I/O and no logging.

pub mod hashes;
pub mod model;
pub mod protocol;
pub mod signing;
pub mod transaction;
pub mod transition;
pub mod treasury;
pub mod workflow;

pub use model::{
    Address, AssetId, CounterDatum, MemberDatum, MemberMetadata, MembershipIntentDatum, OracleDatum, OutputRef, ProposalDatum,
    ProposalIntentDatum, ProposalMetadata, ProposalTerms, SignOffApprovalDatum, StateDatum, StateKind, TxOutput, Utxo, Value,
};
pub use protocol::ProtocolParams;
pub use transaction::{Transaction, TransactionBody, TransitionKind, Witness};
pub use treasury::{assess_treasury, TreasuryReport};
pub use workflow::{MembershipStage, ProposalStage, WorkflowStage};
