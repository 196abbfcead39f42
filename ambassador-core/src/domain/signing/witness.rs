use crate::domain::transaction::{Transaction, Witness};
use crate::foundation::{AmbassadorError, PubKeyHash, Result, TransactionId};
use secp256k1::schnorr::Signature;
use secp256k1::{Keypair, Message, Secp256k1, XOnlyPublicKey};
use std::collections::BTreeSet;

/// Signs the transaction id with `keypair`. `aux_rand` is the BIP-340 auxiliary randomness.
pub fn sign_tx_id(keypair: &Keypair, tx_id: &TransactionId, aux_rand: &[u8; 32]) -> Witness {
    let secp = Secp256k1::signing_only();
    let msg = Message::from_digest(*tx_id.as_hash());
    let sig = secp.sign_schnorr_with_aux_rand(&msg, keypair, aux_rand);
    let (xonly, _) = keypair.x_only_public_key();
    Witness { pubkey: xonly.serialize(), signature: sig.as_ref().to_vec() }
}

pub fn verify_witness(witness: &Witness, tx_id: &TransactionId) -> bool {
    let Ok(xonly) = XOnlyPublicKey::from_slice(&witness.pubkey) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(&witness.signature) else {
        return false;
    };
    let secp = Secp256k1::verification_only();
    let msg = Message::from_digest(*tx_id.as_hash());
    secp.verify_schnorr(&sig, &msg, &xonly).is_ok()
}

/// Per-signer view of a witness set: duplicates collapse onto one entry,
/// valid if any of that signer's witnesses verifies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WitnessCheck {
    pub pkh: PubKeyHash,
    pub valid: bool,
}

pub fn inspect_witnesses(tx: &Transaction) -> Result<Vec<WitnessCheck>> {
    let tx_id = tx.id()?;
    let mut checks: Vec<WitnessCheck> = Vec::with_capacity(tx.witnesses.len());
    for witness in &tx.witnesses {
        let pkh = witness.pub_key_hash();
        let valid = verify_witness(witness, &tx_id);
        match checks.iter_mut().find(|c| c.pkh == pkh) {
            Some(existing) => existing.valid |= valid,
            None => checks.push(WitnessCheck { pkh, valid }),
        }
    }
    Ok(checks)
}

/// Public-key-hashes of every witness on the transaction, one entry per signer.
pub fn extract_witnesses(tx_hex: &str) -> Result<Vec<PubKeyHash>> {
    let tx = Transaction::from_hex(tx_hex)?;
    let mut seen = BTreeSet::new();
    Ok(tx.witnesses.iter().map(Witness::pub_key_hash).filter(|pkh| seen.insert(*pkh)).collect())
}

/// Appends one witness without touching the ones already collected.
pub fn append_witness(tx_hex: &str, witness: Witness) -> Result<String> {
    let mut tx = Transaction::from_hex(tx_hex)?;
    tx.witnesses.push(witness);
    tx.to_hex()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    pub tx_hex: String,
    pub added: Vec<PubKeyHash>,
}

/// Copies witnesses from an independently signed copy into `base_hex`.
///
/// Only signers without a valid witness in `base_hex` are taken over; the
/// bodies must be identical.
pub fn merge_witnesses(base_hex: &str, signed_hex: &str) -> Result<MergeOutcome> {
    let mut base = Transaction::from_hex(base_hex)?;
    let signed = Transaction::from_hex(signed_hex)?;
    if base.body != signed.body {
        return Err(AmbassadorError::TransactionMismatch {
            expected: base.id()?.to_string(),
            actual: signed.id()?.to_string(),
        });
    }

    let tx_id = base.id()?;
    let mut present = base
        .witnesses
        .iter()
        .filter(|w| verify_witness(w, &tx_id))
        .map(Witness::pub_key_hash)
        .collect::<BTreeSet<_>>();
    let mut added = Vec::new();
    for witness in signed.witnesses {
        let pkh = witness.pub_key_hash();
        if present.contains(&pkh) || !verify_witness(&witness, &tx_id) {
            continue;
        }
        present.insert(pkh);
        added.push(pkh);
        base.witnesses.push(witness);
    }
    Ok(MergeOutcome { tx_hex: base.to_hex()?, added })
}
