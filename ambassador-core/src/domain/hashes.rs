use crate::domain::model::{AssetId, ProposalTerms, StateKind};
use crate::foundation::{AssetName, Hash32, PolicyId, PubKeyHash, ScriptHash, SessionId, TransactionId};
use blake3::Hasher;

const TX_ID_DOMAIN_V1: &[u8] = b"ambassador:tx:v1:";
const PKH_DOMAIN_V1: &[u8] = b"ambassador:pkh:v1:";
const POLICY_DOMAIN_V1: &[u8] = b"ambassador:policy:v1:";
const SCRIPT_DOMAIN_V1: &[u8] = b"ambassador:script:v1:";
const TREASURY_DOMAIN_V1: &[u8] = b"ambassador:treasury:v1:";
const SINGLETON_DOMAIN_V1: &[u8] = b"ambassador:singleton:v1:";
const PROPOSAL_DOMAIN_V1: &[u8] = b"ambassador:proposal:v1:";
const INTENT_DOMAIN_V1: &[u8] = b"ambassador:membership-intent:v1:";
const MEMBER_DOMAIN_V1: &[u8] = b"ambassador:member:v1:";
const SESSION_DOMAIN_V1: &[u8] = b"ambassador:session:v1:";

/// Transaction id over the canonical body bytes.
pub fn compute_tx_id(body_bytes: &[u8]) -> TransactionId {
    let mut hasher = Hasher::new();
    hasher.update(TX_ID_DOMAIN_V1);
    hasher.update(body_bytes);
    TransactionId::new(*hasher.finalize().as_bytes())
}

/// Public-key-hash of a 32-byte x-only key.
pub fn pub_key_hash(xonly: &[u8; 32]) -> PubKeyHash {
    let mut hasher = Hasher::new();
    hasher.update(PKH_DOMAIN_V1);
    hasher.update(xonly);
    PubKeyHash::new(*hasher.finalize().as_bytes())
}

pub fn policy_id(instance: &str, kind: StateKind) -> PolicyId {
    PolicyId::new(tagged(POLICY_DOMAIN_V1, instance, kind.label()))
}

pub fn script_hash(instance: &str, kind: StateKind) -> ScriptHash {
    ScriptHash::new(tagged(SCRIPT_DOMAIN_V1, instance, kind.label()))
}

pub fn treasury_script_hash(instance: &str) -> ScriptHash {
    ScriptHash::new(tagged(TREASURY_DOMAIN_V1, instance, "treasury"))
}

/// Name of the single Oracle or Counter token.
pub fn singleton_name(instance: &str, kind: StateKind) -> AssetName {
    AssetName::new(tagged(SINGLETON_DOMAIN_V1, instance, kind.label()))
}

/// Proposal identity: shared by ProposalIntent, Proposal and SignOffApproval.
pub fn proposal_identity(terms: &ProposalTerms) -> AssetName {
    let mut hasher = Hasher::new();
    hasher.update(PROPOSAL_DOMAIN_V1);
    write_str(&mut hasher, &terms.title);
    hasher.update(terms.requester.as_ref());
    hasher.update(&terms.fund_requested.to_le_bytes());
    match terms.receiver {
        crate::domain::model::Address::Key(pkh) => {
            hasher.update(&[1]);
            hasher.update(pkh.as_ref());
        }
        crate::domain::model::Address::Script(hash) => {
            hasher.update(&[2]);
            hasher.update(hash.as_ref());
        }
    }
    AssetName::new(*hasher.finalize().as_bytes())
}

/// Membership intent identity, bound to the applicant's proof token.
pub fn membership_intent_identity(proof_token: &AssetId) -> AssetName {
    let mut hasher = Hasher::new();
    hasher.update(INTENT_DOMAIN_V1);
    hasher.update(proof_token.policy.as_ref());
    hasher.update(proof_token.name.as_ref());
    AssetName::new(*hasher.finalize().as_bytes())
}

/// Member identity, derived from the counter value consumed on approval.
pub fn member_identity(instance: &str, member_id: u64) -> AssetName {
    let mut hasher = Hasher::new();
    hasher.update(MEMBER_DOMAIN_V1);
    write_str(&mut hasher, instance);
    hasher.update(&member_id.to_le_bytes());
    AssetName::new(*hasher.finalize().as_bytes())
}

pub fn session_id(tx_id: &TransactionId, created_at_nanos: u64) -> SessionId {
    let mut hasher = Hasher::new();
    hasher.update(SESSION_DOMAIN_V1);
    hasher.update(tx_id.as_ref());
    hasher.update(&created_at_nanos.to_le_bytes());
    SessionId::new(*hasher.finalize().as_bytes())
}

fn tagged(domain: &[u8], instance: &str, label: &str) -> Hash32 {
    let mut hasher = Hasher::new();
    hasher.update(domain);
    write_str(&mut hasher, instance);
    write_str(&mut hasher, label);
    *hasher.finalize().as_bytes()
}

// Length-prefixed so ("ab", "c") and ("a", "bc") never collide.
fn write_str(hasher: &mut Hasher, value: &str) {
    hasher.update(&(value.len() as u32).to_le_bytes());
    hasher.update(value.as_bytes());
}
