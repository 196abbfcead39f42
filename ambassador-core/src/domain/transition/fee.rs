use crate::domain::model::{Utxo, Value};
use crate::domain::transition::params::FeeParams;
use crate::domain::transition::results::SelectionResult;
use crate::foundation::{AmbassadorError, Result};

/// Sorts by output reference so every builder picks the same inputs.
pub fn sort_deterministic(utxos: &mut [Utxo]) {
    utxos.sort_by(|a, b| a.outref.cmp(&b.outref));
}

/// Outcome of fee balancing: extra inputs, the change value and the final fee.
#[derive(Clone, Debug)]
pub struct FeeSelection {
    pub inputs: Vec<Utxo>,
    pub change: Value,
    pub fee: u64,
    pub summary: SelectionResult,
}

/// Adds fee-paying inputs until `available` covers `required` plus the fee.
///
/// `available` already includes the transition's own inputs and mints;
/// `base_inputs` is how many inputs the transition spends before fee selection.
pub fn select_fee_inputs(
    fees: &FeeParams,
    base_inputs: usize,
    available: &Value,
    required: &Value,
    candidates: &[Utxo],
) -> Result<FeeSelection> {
    for (asset, qty) in &required.assets {
        if available.quantity_of(asset) < *qty {
            return Err(AmbassadorError::build_error(
                "balance",
                format!("asset {asset} short: need {qty}, have {}", available.quantity_of(asset)),
            ));
        }
    }

    let mut sorted = candidates.to_vec();
    sort_deterministic(&mut sorted);
    let mut remaining = sorted.into_iter();

    let mut selected = Vec::new();
    let mut total = available.clone();
    loop {
        let fee = fees.fee_for_inputs(base_inputs + selected.len());
        let needed = required
            .checked_add(&Value::coin(fee))
            .ok_or_else(|| AmbassadorError::build_error("balance", "required value overflow"))?;
        if let Some(change) = total.checked_sub(&needed) {
            let dust_with_assets = !change.assets.is_empty() && change.coin < fees.min_change_value;
            if !dust_with_assets {
                return Ok(finish_selection(fees, selected, change, fee, &total));
            }
        }
        match remaining.next() {
            Some(utxo) => {
                total = total
                    .checked_add(utxo.value())
                    .ok_or_else(|| AmbassadorError::build_error("balance", "input value overflow"))?;
                selected.push(utxo);
            }
            None => {
                return Err(AmbassadorError::InsufficientFunds {
                    purpose: "transaction fee".to_string(),
                    required: needed.coin,
                    available: total.coin,
                })
            }
        }
    }
}

fn finish_selection(fees: &FeeParams, selected: Vec<Utxo>, mut change: Value, mut fee: u64, total: &Value) -> FeeSelection {
    if change.assets.is_empty() && change.coin < fees.min_change_value {
        fee = fee.saturating_add(change.coin);
        change.coin = 0;
    }
    let has_change_output = !change.is_empty();
    let summary = SelectionResult {
        selected: selected.len(),
        total_input_amount: total.coin,
        fee_amount: fee,
        change_amount: change.coin,
        has_change_output,
    };
    FeeSelection { inputs: selected, change, fee, summary }
}

/// Picks treasury UTXOs in deterministic order until `amount` is covered.
pub fn select_treasury(utxos: &[Utxo], amount: u64) -> Result<(Vec<Utxo>, Value)> {
    let mut sorted = utxos.to_vec();
    sort_deterministic(&mut sorted);

    let mut selected = Vec::new();
    let mut total = Value::default();
    for utxo in sorted {
        if total.coin >= amount {
            break;
        }
        total = total
            .checked_add(utxo.value())
            .ok_or_else(|| AmbassadorError::build_error("treasury", "treasury value overflow"))?;
        selected.push(utxo);
    }
    if total.coin < amount {
        return Err(AmbassadorError::InsufficientFunds {
            purpose: "treasury withdrawal".to_string(),
            required: amount,
            available: total.coin,
        });
    }
    Ok((selected, total))
}
