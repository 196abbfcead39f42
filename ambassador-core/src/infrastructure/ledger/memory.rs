use crate::domain::signing::verify_witness;
use crate::domain::{
    Address, AssetId, OracleDatum, OutputRef, ProtocolParams, StateDatum, StateKind, Transaction, TxOutput, Utxo, Value,
};
use crate::foundation::{AmbassadorError, PubKeyHash, Result, TransactionId};
use crate::infrastructure::ledger::{SubmitRejection, Submitter, UtxoFetcher};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

struct LedgerInner {
    utxos: BTreeMap<OutputRef, TxOutput>,
    accepted: Vec<TransactionId>,
    seeded: u64,
}

/// In-process ledger enforcing the rules the workflow relies on: single
/// spend, present reference inputs, valid witnesses, the signer threshold,
/// exact value balance and one live instance per state token. A proposal
/// identity is live under one stage at a time and never minted again once paid out.
pub struct MemoryLedger {
    params: ProtocolParams,
    inner: Mutex<LedgerInner>,
}

impl MemoryLedger {
    pub fn new(params: ProtocolParams) -> Self {
        Self { params, inner: Mutex::new(LedgerInner { utxos: BTreeMap::new(), accepted: Vec::new(), seeded: 0 }) }
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, LedgerInner>> {
        self.inner.lock().map_err(|_| AmbassadorError::StorageError {
            operation: "memory ledger lock".to_string(),
            details: "poisoned".to_string(),
        })
    }

    /// Creates an output out of thin air (bootstrap and tests).
    pub fn seed(&self, output: TxOutput) -> Result<Utxo> {
        let mut inner = self.lock_inner()?;
        inner.seeded += 1;
        let tx_id = TransactionId::new(*blake3::hash(format!("ambassador:genesis:{}", inner.seeded).as_bytes()).as_bytes());
        let outref = OutputRef::new(tx_id, 0);
        inner.utxos.insert(outref, output.clone());
        Ok(Utxo::new(outref, output))
    }

    pub fn utxos(&self) -> Result<Vec<Utxo>> {
        Ok(self.lock_inner()?.utxos.iter().map(|(outref, output)| Utxo::new(*outref, output.clone())).collect())
    }

    pub fn accepted(&self) -> Result<Vec<TransactionId>> {
        Ok(self.lock_inner()?.accepted.clone())
    }

    fn validate(&self, utxos: &BTreeMap<OutputRef, TxOutput>, tx: &Transaction, tx_id: &TransactionId) -> std::result::Result<(), SubmitRejection> {
        let body = &tx.body;

        let missing = body
            .inputs
            .iter()
            .chain(body.reference_inputs.iter())
            .filter(|outref| !utxos.contains_key(*outref))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(SubmitRejection::InputsConsumed { outrefs: missing });
        }
        if body.inputs.is_empty() {
            return Err(SubmitRejection::invalid("transaction spends no inputs"));
        }
        if body.inputs.iter().collect::<BTreeSet<_>>().len() != body.inputs.len() {
            return Err(SubmitRejection::invalid("duplicate input"));
        }

        let mut witnessed = BTreeSet::new();
        for witness in &tx.witnesses {
            let pkh = witness.pub_key_hash();
            if !verify_witness(witness, tx_id) {
                return Err(SubmitRejection::invalid(format!("invalid witness from {pkh}")));
            }
            witnessed.insert(pkh);
        }

        let inputs = body.inputs.iter().filter_map(|outref| utxos.get(outref)).collect::<Vec<_>>();
        for output in &inputs {
            if let Address::Key(owner) = output.address {
                if !witnessed.contains(&owner) {
                    return Err(SubmitRejection::invalid(format!("missing witness for input owner {owner}")));
                }
            }
        }

        let designated = body.required_signers.iter().filter(|pkh| witnessed.contains(*pkh)).count();
        if designated < body.signer_threshold as usize {
            return Err(SubmitRejection::invalid(format!(
                "signer threshold not met: {designated} of {} required",
                body.signer_threshold
            )));
        }

        let oracle = self.oracle_reference(utxos, &body.reference_inputs)?;

        let burns_any = body.mint.values().any(|qty| *qty < 0);
        let mints_admin_policy = body.minted().any(|asset| {
            !matches!(self.params.kind_of_policy(&asset.policy), Some(StateKind::MembershipIntent | StateKind::ProposalIntent) | None)
        });
        let spends_script = inputs.iter().any(|output| output.address.is_script());
        if burns_any || mints_admin_policy || spends_script {
            ensure_admin_authorized(oracle, &body.required_signers, body.signer_threshold)?;
        }

        for (asset, qty) in &body.mint {
            if *qty > 1 {
                return Err(SubmitRejection::invalid(format!("asset {asset} minted more than once")));
            }
            if *qty == 1 && utxos.values().any(|output| output.value.has_asset(asset)) {
                return Err(SubmitRejection::invalid(format!("asset {asset} already has a live instance")));
            }
        }

        for asset in body.minted().filter(|asset| self.is_proposal_stage(asset)) {
            let clash = utxos.iter().filter(|(outref, _)| !body.inputs.contains(*outref)).any(|(_, output)| {
                output.value.assets.keys().any(|held| held.name == asset.name && self.is_proposal_stage(held))
                    || matches!(&output.datum, Some(StateDatum::Member(member)) if member.completion.contains_key(&asset.name))
            });
            if clash {
                return Err(SubmitRejection::invalid(format!("proposal {} already live or paid out", asset.name)));
            }
        }

        check_balance(&inputs, &body.outputs, &body.mint, body.fee)
    }

    fn is_proposal_stage(&self, asset: &AssetId) -> bool {
        self.params.kind_of_policy(&asset.policy).is_some_and(|kind| kind.is_proposal_stage())
    }

    fn oracle_reference<'a>(
        &self,
        utxos: &'a BTreeMap<OutputRef, TxOutput>,
        reference_inputs: &[OutputRef],
    ) -> std::result::Result<&'a OracleDatum, SubmitRejection> {
        let oracle_token = self.params.oracle_token();
        reference_inputs
            .iter()
            .filter_map(|outref| utxos.get(outref))
            .find(|output| output.value.has_asset(&oracle_token))
            .and_then(|output| match &output.datum {
                Some(StateDatum::Oracle(datum)) => Some(datum),
                _ => None,
            })
            .ok_or_else(|| SubmitRejection::invalid("oracle is not referenced"))
    }
}

fn ensure_admin_authorized(
    oracle: &OracleDatum,
    required_signers: &BTreeSet<PubKeyHash>,
    threshold: u16,
) -> std::result::Result<(), SubmitRejection> {
    if let Some(outsider) = required_signers.iter().find(|pkh| !oracle.is_admin(pkh)) {
        return Err(SubmitRejection::invalid(format!("required signer {outsider} is not an oracle admin")));
    }
    if threshold < oracle.threshold {
        return Err(SubmitRejection::invalid(format!("signer threshold {threshold} below oracle threshold {}", oracle.threshold)));
    }
    Ok(())
}

fn check_balance(
    inputs: &[&TxOutput],
    outputs: &[TxOutput],
    mint: &BTreeMap<AssetId, i64>,
    fee: u64,
) -> std::result::Result<(), SubmitRejection> {
    let overflow = || SubmitRejection::invalid("value overflow");
    let mut consumed = Value::sum(inputs.iter().map(|output| &output.value)).ok_or_else(overflow)?;
    let mut produced = Value::sum(outputs.iter().map(|output| &output.value)).ok_or_else(overflow)?;
    produced = produced.checked_add(&Value::coin(fee)).ok_or_else(overflow)?;
    for (asset, qty) in mint {
        if *qty > 0 {
            consumed = consumed.with_asset(*asset, qty.unsigned_abs());
        } else {
            produced = produced.with_asset(*asset, qty.unsigned_abs());
        }
    }
    if consumed != produced {
        return Err(SubmitRejection::invalid(format!(
            "value not balanced: consumed coin {} produced coin {}",
            consumed.coin, produced.coin
        )));
    }
    Ok(())
}

#[async_trait]
impl UtxoFetcher for MemoryLedger {
    async fn fetch_by_reference(&self, outref: &OutputRef) -> Result<Vec<Utxo>> {
        let inner = self.lock_inner()?;
        Ok(inner.utxos.get(outref).map(|output| Utxo::new(*outref, output.clone())).into_iter().collect())
    }

    async fn fetch_by_address(&self, address: &Address) -> Result<Vec<Utxo>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .utxos
            .iter()
            .filter(|(_, output)| output.address == *address)
            .map(|(outref, output)| Utxo::new(*outref, output.clone()))
            .collect())
    }

    async fn fetch_by_asset(&self, asset: &AssetId) -> Result<Vec<Utxo>> {
        let inner = self.lock_inner()?;
        Ok(inner
            .utxos
            .iter()
            .filter(|(_, output)| output.value.has_asset(asset))
            .map(|(outref, output)| Utxo::new(*outref, output.clone()))
            .collect())
    }
}

#[async_trait]
impl Submitter for MemoryLedger {
    async fn submit(&self, tx_hex: &str) -> std::result::Result<TransactionId, SubmitRejection> {
        let tx = Transaction::from_hex(tx_hex).map_err(|err| SubmitRejection::invalid(err.to_string()))?;
        let tx_id = tx.id().map_err(|err| SubmitRejection::invalid(err.to_string()))?;

        let mut inner = self.lock_inner().map_err(|err| SubmitRejection::invalid(err.to_string()))?;
        if let Err(rejection) = self.validate(&inner.utxos, &tx, &tx_id) {
            debug!("memory ledger rejected tx_id={} reason={}", tx_id, rejection);
            return Err(rejection);
        }

        for outref in &tx.body.inputs {
            inner.utxos.remove(outref);
        }
        for (index, output) in tx.body.outputs.into_iter().enumerate() {
            inner.utxos.insert(OutputRef::new(tx_id, index as u32), output);
        }
        inner.accepted.push(tx_id);
        info!("memory ledger accepted tx_id={} transition={}", tx_id, tx.body.transition);
        Ok(tx_id)
    }
}
