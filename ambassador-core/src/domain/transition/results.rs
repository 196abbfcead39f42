//! Rich result types for transition building (no logging in domain).

use crate::domain::model::{AssetId, OutputRef, StateKind};
use crate::domain::transaction::TransitionKind;
use crate::foundation::{PubKeyHash, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A state token output created by the transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOutput {
    pub kind: StateKind,
    pub token: AssetId,
    pub outref: OutputRef,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTransition {
    pub transition: TransitionKind,
    pub tx_id: TransactionId,
    pub tx_hex: String,
    pub consumed: Vec<OutputRef>,
    pub referenced: Vec<OutputRef>,
    pub minted: Vec<AssetId>,
    pub burned: Vec<AssetId>,
    pub successors: Vec<StateOutput>,
    /// Designated signers, in canonical order.
    pub required_signers: Vec<PubKeyHash>,
    pub threshold: u16,
    /// Owners of key-address inputs; the ledger wants their witness too.
    pub input_owners: BTreeSet<PubKeyHash>,
    pub fee: u64,
}

impl BuiltTransition {
    pub fn successor(&self, kind: StateKind) -> Option<&StateOutput> {
        self.successors.iter().find(|out| out.kind == kind)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionResult {
    pub selected: usize,
    pub total_input_amount: u64,
    pub fee_amount: u64,
    pub change_amount: u64,
    pub has_change_output: bool,
}
