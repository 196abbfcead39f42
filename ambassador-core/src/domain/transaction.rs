use crate::domain::hashes::{compute_tx_id, pub_key_hash};
use crate::domain::model::{AssetId, OutputRef, TxOutput};
use crate::foundation::util::encoding::decode_hex;
use crate::foundation::{AmbassadorError, PubKeyHash, Result, TransactionId, SCHNORR_PUBKEY_SIZE};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named state transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    ApplyMembership,
    ApproveMember,
    RejectMember,
    RemoveMember,
    ProposeProject,
    ApproveProposal,
    RejectProposal,
    ApproveSignOff,
    SignOff,
}

impl TransitionKind {
    pub const fn label(&self) -> &'static str {
        match self {
            TransitionKind::ApplyMembership => "apply_membership",
            TransitionKind::ApproveMember => "approve_member",
            TransitionKind::RejectMember => "reject_member",
            TransitionKind::RemoveMember => "remove_member",
            TransitionKind::ProposeProject => "propose_project",
            TransitionKind::ApproveProposal => "approve_proposal",
            TransitionKind::RejectProposal => "reject_proposal",
            TransitionKind::ApproveSignOff => "approve_sign_off",
            TransitionKind::SignOff => "sign_off",
        }
    }

    /// User transitions are authorized by the applicant alone; all others need the admin threshold.
    pub const fn is_admin(&self) -> bool {
        !matches!(self, TransitionKind::ApplyMembership | TransitionKind::ProposeProject)
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The signed part of a transaction. Its borsh bytes define the transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TransactionBody {
    pub transition: TransitionKind,
    pub inputs: Vec<OutputRef>,
    pub reference_inputs: Vec<OutputRef>,
    pub outputs: Vec<TxOutput>,
    /// Positive entries mint, negative entries burn.
    pub mint: BTreeMap<AssetId, i64>,
    pub fee: u64,
    pub required_signers: BTreeSet<PubKeyHash>,
    pub signer_threshold: u16,
    pub created_at_millis: u64,
}

impl TransactionBody {
    pub fn id(&self) -> Result<TransactionId> {
        let bytes = borsh::to_vec(self).map_err(|err| crate::serde_err!("borsh", err))?;
        Ok(compute_tx_id(&bytes))
    }

    pub fn minted(&self) -> impl Iterator<Item = &AssetId> {
        self.mint.iter().filter(|(_, qty)| **qty > 0).map(|(asset, _)| asset)
    }

    pub fn burned(&self) -> impl Iterator<Item = &AssetId> {
        self.mint.iter().filter(|(_, qty)| **qty < 0).map(|(asset, _)| asset)
    }
}

/// A BIP-340 signature over the transaction id with the signer's x-only key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Witness {
    pub pubkey: [u8; SCHNORR_PUBKEY_SIZE],
    pub signature: Vec<u8>,
}

impl Witness {
    pub fn pub_key_hash(&self) -> PubKeyHash {
        pub_key_hash(&self.pubkey)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub body: TransactionBody,
    pub witnesses: Vec<Witness>,
}

impl Transaction {
    pub fn unsigned(body: TransactionBody) -> Self {
        Self { body, witnesses: Vec::new() }
    }

    pub fn id(&self) -> Result<TransactionId> {
        self.body.id()
    }

    pub fn to_hex(&self) -> Result<String> {
        let bytes = borsh::to_vec(self).map_err(|err| crate::serde_err!("borsh", err))?;
        Ok(hex::encode(bytes))
    }

    pub fn from_hex(tx_hex: &str) -> Result<Self> {
        let bytes = decode_hex(tx_hex)?;
        borsh::from_slice(&bytes)
            .map_err(|err| AmbassadorError::EncodingError(format!("transaction decode failed: {err}")))
    }
}
