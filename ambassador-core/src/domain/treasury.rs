use crate::domain::model::{StateDatum, Utxo};
use crate::foundation::{AmbassadorError, Result};
use serde::{Deserialize, Serialize};

/// Read-only treasury sufficiency snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryReport {
    pub balance: u64,
    /// Sum of `fund_requested` over proposals waiting in SignOffApproval.
    pub committed: u64,
    pub pending_sign_offs: usize,
    pub available: i128,
}

impl TreasuryReport {
    pub fn is_insufficient(&self) -> bool {
        self.available < 0
    }

    /// The report as it would read once one more sign-off for `fund_requested` is pending.
    pub fn including(&self, fund_requested: u64) -> TreasuryReport {
        TreasuryReport {
            balance: self.balance,
            committed: self.committed.saturating_add(fund_requested),
            pending_sign_offs: self.pending_sign_offs + 1,
            available: self.available - fund_requested as i128,
        }
    }

    /// `TreasuryInsufficientBalance` when the treasury is over-committed.
    pub fn advisory(&self) -> Option<AmbassadorError> {
        self.is_insufficient().then(|| AmbassadorError::TreasuryInsufficientBalance {
            balance: self.balance,
            committed: self.committed,
            available: self.available,
        })
    }
}

/// `available = Σ treasury coin − Σ fund_requested of pending sign-off approvals`.
pub fn assess_treasury(treasury: &[Utxo], sign_off_approvals: &[Utxo]) -> Result<TreasuryReport> {
    let balance = treasury
        .iter()
        .try_fold(0u64, |acc, utxo| acc.checked_add(utxo.value().coin))
        .ok_or_else(|| AmbassadorError::Message("treasury balance overflow".to_string()))?;

    let mut committed = 0u64;
    for utxo in sign_off_approvals {
        match utxo.datum() {
            Some(StateDatum::SignOffApproval(datum)) => {
                committed = committed
                    .checked_add(datum.terms.fund_requested)
                    .ok_or_else(|| AmbassadorError::Message("committed funds overflow".to_string()))?;
            }
            _ => return Err(AmbassadorError::invalid_datum(utxo.outref, "sign_off_approval datum")),
        }
    }

    Ok(TreasuryReport {
        balance,
        committed,
        pending_sign_offs: sign_off_approvals.len(),
        available: balance as i128 - committed as i128,
    })
}
