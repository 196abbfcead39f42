use crate::domain::model::{AssetId, OutputRef, StateKind, TxOutput, Utxo, Value};
use crate::domain::transaction::{Transaction, TransactionBody, TransitionKind};
use crate::domain::transition::fee::{select_fee_inputs, sort_deterministic};
use crate::domain::transition::params::{BuildContext, FeeParams};
use crate::domain::transition::results::{BuiltTransition, StateOutput};
use crate::foundation::{AmbassadorError, PubKeyHash, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Collects the pieces of one transition and balances them into an unsigned transaction.
pub(crate) struct TxAssembler<'a> {
    fees: &'a FeeParams,
    transition: TransitionKind,
    inputs: Vec<Utxo>,
    reference_inputs: Vec<Utxo>,
    outputs: Vec<TxOutput>,
    mint: BTreeMap<AssetId, i64>,
    successors: Vec<(StateKind, AssetId, usize)>,
    required_signers: BTreeSet<PubKeyHash>,
    threshold: u16,
}

impl<'a> TxAssembler<'a> {
    pub(crate) fn new(fees: &'a FeeParams, transition: TransitionKind) -> Self {
        Self {
            fees,
            transition,
            inputs: Vec::new(),
            reference_inputs: Vec::new(),
            outputs: Vec::new(),
            mint: BTreeMap::new(),
            successors: Vec::new(),
            required_signers: BTreeSet::new(),
            threshold: 0,
        }
    }

    pub(crate) fn reference(&mut self, utxo: &Utxo) -> &mut Self {
        if !self.reference_inputs.iter().any(|u| u.outref == utxo.outref) {
            self.reference_inputs.push(utxo.clone());
        }
        self
    }

    pub(crate) fn spend(&mut self, utxo: &Utxo) -> &mut Self {
        if !self.inputs.iter().any(|u| u.outref == utxo.outref) {
            self.inputs.push(utxo.clone());
        }
        self
    }

    pub(crate) fn burn(&mut self, asset: AssetId) -> &mut Self {
        *self.mint.entry(asset).or_insert(0) -= 1;
        self
    }

    /// Mints `token` and places it in `output` as a new state record.
    pub(crate) fn mint_state(&mut self, kind: StateKind, token: AssetId, output: TxOutput) -> &mut Self {
        *self.mint.entry(token).or_insert(0) += 1;
        self.continue_state(kind, token, output)
    }

    /// Re-creates a state record whose token moves from a spent input.
    pub(crate) fn continue_state(&mut self, kind: StateKind, token: AssetId, output: TxOutput) -> &mut Self {
        self.successors.push((kind, token, self.outputs.len()));
        self.outputs.push(output);
        self
    }

    pub(crate) fn pay(&mut self, output: TxOutput) -> &mut Self {
        self.outputs.push(output);
        self
    }

    pub(crate) fn authorize(&mut self, signers: BTreeSet<PubKeyHash>, threshold: u16) -> &mut Self {
        self.required_signers = signers;
        self.threshold = threshold;
        self
    }

    pub(crate) fn finish(self, ctx: &BuildContext) -> Result<BuiltTransition> {
        let TxAssembler { fees, transition, mut inputs, mut reference_inputs, mut outputs, mut mint, successors, required_signers, threshold } =
            self;

        if required_signers.is_empty() || threshold == 0 {
            return Err(AmbassadorError::build_error("authorization", "transition has no required signers"));
        }
        mint.retain(|_, qty| *qty != 0);

        let mut available = sum_values(inputs.iter().map(|u| u.value()))?;
        let mut required = sum_values(outputs.iter().map(|o| &o.value))?;
        for (asset, qty) in &mint {
            let amount = qty.unsigned_abs();
            if *qty > 0 {
                available = available.with_asset(*asset, amount);
            } else {
                required = required.with_asset(*asset, amount);
            }
        }

        let candidates = ctx
            .fee_inputs
            .iter()
            .filter(|u| !inputs.iter().any(|i| i.outref == u.outref) && !reference_inputs.iter().any(|r| r.outref == u.outref))
            .cloned()
            .collect::<Vec<_>>();
        let selection = select_fee_inputs(fees, inputs.len(), &available, &required, &candidates)?;

        inputs.extend(selection.inputs);
        if !selection.change.is_empty() {
            outputs.push(TxOutput::new(ctx.change_address, selection.change));
        }

        // Deterministic ordering across builders.
        sort_deterministic(&mut inputs);
        sort_deterministic(&mut reference_inputs);

        let input_owners = inputs.iter().filter_map(|u| u.address().key_hash().copied()).collect::<BTreeSet<_>>();
        let consumed = inputs.iter().map(|u| u.outref).collect::<Vec<_>>();
        let referenced = reference_inputs.iter().map(|u| u.outref).collect::<Vec<_>>();

        let body = TransactionBody {
            transition,
            inputs: consumed.clone(),
            reference_inputs: referenced.clone(),
            outputs,
            mint,
            fee: selection.fee,
            required_signers: required_signers.clone(),
            signer_threshold: threshold,
            created_at_millis: ctx.now_millis,
        };
        let minted = body.minted().copied().collect();
        let burned = body.burned().copied().collect();
        let tx = Transaction::unsigned(body);
        let tx_id = tx.id()?;
        let tx_hex = tx.to_hex()?;

        let successors = successors
            .into_iter()
            .map(|(kind, token, index)| StateOutput { kind, token, outref: OutputRef::new(tx_id, index as u32) })
            .collect();

        Ok(BuiltTransition {
            transition,
            tx_id,
            tx_hex,
            consumed,
            referenced,
            minted,
            burned,
            successors,
            required_signers: required_signers.into_iter().collect(),
            threshold,
            input_owners,
            fee: selection.fee,
        })
    }
}

fn sum_values<'v>(values: impl Iterator<Item = &'v Value>) -> Result<Value> {
    Value::sum(values).ok_or_else(|| AmbassadorError::build_error("balance", "value overflow"))
}
