use crate::domain::model::{Address, AssetId, MemberMetadata, ProposalMetadata, Utxo};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeParams {
    pub base_fee: u64,
    pub fee_per_input: u64,
    /// Coin locked with every state token output.
    pub min_state_value: u64,
    /// Change below this is folded into the fee instead of creating dust.
    pub min_change_value: u64,
}

impl Default for FeeParams {
    fn default() -> Self {
        Self { base_fee: 200, fee_per_input: 50, min_state_value: 2_000, min_change_value: 1_000 }
    }
}

impl FeeParams {
    pub fn fee_for_inputs(&self, input_count: usize) -> u64 {
        self.base_fee.saturating_add(self.fee_per_input.saturating_mul(input_count as u64))
    }
}

/// Caller-provided funding for one build: wallet UTXOs that may pay the fee,
/// where change goes, and the timestamp written into new datums.
#[derive(Clone, Debug)]
pub struct BuildContext {
    pub fee_inputs: Vec<Utxo>,
    pub change_address: Address,
    pub now_millis: u64,
}

impl BuildContext {
    pub fn new(fee_inputs: Vec<Utxo>, change_address: Address, now_millis: u64) -> Self {
        Self { fee_inputs, change_address, now_millis }
    }
}

#[derive(Clone, Debug)]
pub struct MembershipApplication {
    pub proof_token: AssetId,
    pub metadata: MemberMetadata,
}

#[derive(Clone, Debug)]
pub struct ProjectProposal {
    pub proof_token: AssetId,
    pub title: String,
    pub fund_requested: u64,
    pub receiver: Address,
    pub metadata: ProposalMetadata,
}
