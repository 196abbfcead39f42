use crate::domain::signing::witness::inspect_witnesses;
use crate::domain::transaction::Transaction;
use crate::foundation::{AmbassadorError, PubKeyHash, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Witness accounting against a designated signer set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProgress {
    /// Designated signers with a valid witness, in designated order.
    pub signed: Vec<PubKeyHash>,
    /// Designated signers without a valid witness.
    pub pending: Vec<PubKeyHash>,
    /// Valid witnesses from outside the designated set. Kept, never counted.
    pub foreign: Vec<PubKeyHash>,
    /// Witnesses whose signature does not verify.
    pub invalid: Vec<PubKeyHash>,
    pub threshold: u16,
    pub threshold_met: bool,
}

impl SigningProgress {
    pub fn collected(&self) -> usize {
        self.signed.len()
    }

    pub fn ensure_threshold(&self) -> Result<()> {
        if self.threshold_met {
            return Ok(());
        }
        Err(AmbassadorError::InsufficientSignatures {
            required: self.threshold as usize,
            collected: self.signed.len(),
            pending: self.pending.len(),
        })
    }

    /// One non-fatal `ForeignSignature` per foreign signer.
    pub fn foreign_advisories(&self) -> Vec<AmbassadorError> {
        self.foreign.iter().map(|pkh| AmbassadorError::ForeignSignature { pkh: pkh.to_string() }).collect()
    }
}

/// Counts witnesses on `tx_hex` toward `threshold` of `required_signers`.
///
/// The result only depends on which signers witnessed, never on the order
/// they signed in.
pub fn track_progress(tx_hex: &str, required_signers: &[PubKeyHash], threshold: u16) -> Result<SigningProgress> {
    let tx = Transaction::from_hex(tx_hex)?;
    progress_for(&tx, required_signers, threshold)
}

pub fn progress_for(tx: &Transaction, required_signers: &[PubKeyHash], threshold: u16) -> Result<SigningProgress> {
    let checks = inspect_witnesses(tx)?;
    let valid = checks.iter().filter(|c| c.valid).map(|c| c.pkh).collect::<BTreeSet<_>>();

    let mut designated = BTreeSet::new();
    let mut signed = Vec::new();
    let mut pending = Vec::new();
    for pkh in required_signers {
        if !designated.insert(*pkh) {
            continue;
        }
        if valid.contains(pkh) {
            signed.push(*pkh);
        } else {
            pending.push(*pkh);
        }
    }

    let foreign = checks.iter().filter(|c| c.valid && !designated.contains(&c.pkh)).map(|c| c.pkh).collect();
    let invalid = checks.iter().filter(|c| !c.valid).map(|c| c.pkh).collect();
    let threshold_met = signed.len() >= threshold as usize;

    Ok(SigningProgress { signed, pending, foreign, invalid, threshold, threshold_met })
}

/// Owners of key-address inputs that have not witnessed yet.
pub fn missing_input_owners(tx: &Transaction, input_owners: &BTreeSet<PubKeyHash>) -> Result<Vec<PubKeyHash>> {
    let checks = inspect_witnesses(tx)?;
    Ok(input_owners.iter().filter(|owner| !checks.iter().any(|c| c.valid && c.pkh == **owner)).copied().collect())
}
