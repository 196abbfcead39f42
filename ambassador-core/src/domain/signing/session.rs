use crate::domain::hashes::session_id;
use crate::domain::model::OutputRef;
use crate::domain::signing::progress::SigningProgress;
use crate::domain::transaction::TransitionKind;
use crate::domain::transition::{BuiltTransition, StateOutput};
use crate::foundation::{AmbassadorError, PubKeyHash, Result, SessionId, TransactionId, NANOS_PER_SECOND};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Drafted,
    PartiallySigned { signed: usize },
    ThresholdReached,
    Finalized { tx_id: TransactionId },
    Expired,
    Abandoned { reason: String },
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Drafted => f.write_str("drafted"),
            SessionState::PartiallySigned { signed } => write!(f, "partially_signed({signed})"),
            SessionState::ThresholdReached => f.write_str("threshold_reached"),
            SessionState::Finalized { tx_id } => write!(f, "finalized({})", tx_id.short()),
            SessionState::Expired => f.write_str("expired"),
            SessionState::Abandoned { reason } => write!(f, "abandoned({reason})"),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    Drafted,
    PartiallySigned,
    ThresholdReached,
    Finalized,
    Expired,
    Abandoned,
}

const VALID_TRANSITIONS: &[(Phase, Phase)] = &[
    (Phase::Drafted, Phase::PartiallySigned),
    (Phase::Drafted, Phase::ThresholdReached),
    (Phase::Drafted, Phase::Expired),
    (Phase::Drafted, Phase::Abandoned),
    (Phase::PartiallySigned, Phase::ThresholdReached),
    (Phase::PartiallySigned, Phase::Expired),
    (Phase::PartiallySigned, Phase::Abandoned),
    (Phase::ThresholdReached, Phase::Finalized),
    (Phase::ThresholdReached, Phase::Expired),
    (Phase::ThresholdReached, Phase::Abandoned),
];

fn phase(state: &SessionState) -> Phase {
    match state {
        SessionState::Drafted => Phase::Drafted,
        SessionState::PartiallySigned { .. } => Phase::PartiallySigned,
        SessionState::ThresholdReached => Phase::ThresholdReached,
        SessionState::Finalized { .. } => Phase::Finalized,
        SessionState::Expired => Phase::Expired,
        SessionState::Abandoned { .. } => Phase::Abandoned,
    }
}

pub fn is_terminal(state: &SessionState) -> bool {
    matches!(phase(state), Phase::Finalized | Phase::Expired | Phase::Abandoned)
}

/// Staying in the same phase is allowed (more witnesses on a partial session).
pub fn ensure_valid_transition(from: &SessionState, to: &SessionState) -> Result<()> {
    let (from_phase, to_phase) = (phase(from), phase(to));
    if (from_phase == to_phase && !is_terminal(from)) || VALID_TRANSITIONS.contains(&(from_phase, to_phase)) {
        return Ok(());
    }
    Err(AmbassadorError::InvalidStateTransition { from: from.to_string(), to: to.to_string() })
}

/// Off-ledger bookkeeping for one candidate transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningSession {
    pub session_id: SessionId,
    pub transition: TransitionKind,
    pub tx_id: TransactionId,
    /// Candidate hex carrying every witness collected so far.
    pub tx_hex: String,
    pub required_signers: Vec<PubKeyHash>,
    pub threshold: u16,
    #[serde(default)]
    pub input_owners: BTreeSet<PubKeyHash>,
    pub consumed: Vec<OutputRef>,
    #[serde(default)]
    pub successors: Vec<StateOutput>,
    pub state: SessionState,
    pub created_at_nanos: u64,
    pub updated_at_nanos: u64,
    pub expires_at_nanos: u64,
    #[serde(default)]
    pub advisories: Vec<String>,
}

impl SigningSession {
    pub fn open(built: &BuiltTransition, now_nanos: u64, ttl_secs: u64) -> Self {
        Self {
            session_id: session_id(&built.tx_id, now_nanos),
            transition: built.transition,
            tx_id: built.tx_id,
            tx_hex: built.tx_hex.clone(),
            required_signers: built.required_signers.clone(),
            threshold: built.threshold,
            input_owners: built.input_owners.clone(),
            consumed: built.consumed.clone(),
            successors: built.successors.clone(),
            state: SessionState::Drafted,
            created_at_nanos: now_nanos,
            updated_at_nanos: now_nanos,
            expires_at_nanos: now_nanos.saturating_add(ttl_secs.saturating_mul(NANOS_PER_SECOND)),
            advisories: Vec::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        is_terminal(&self.state)
    }

    pub fn is_expired(&self, now_nanos: u64) -> bool {
        now_nanos >= self.expires_at_nanos
    }

    /// Fails unless the session can still collect witnesses or be finalized.
    pub fn ensure_open(&self, now_nanos: u64) -> Result<()> {
        if self.is_terminal() {
            return Err(AmbassadorError::InvalidStateTransition {
                from: self.state.to_string(),
                to: "signing".to_string(),
            });
        }
        if self.is_expired(now_nanos) {
            return Err(AmbassadorError::SessionExpired {
                session_id: self.session_id.to_string(),
                expired_at: self.expires_at_nanos,
                current_time: now_nanos,
            });
        }
        Ok(())
    }

    /// Stores the grown candidate and moves to the state implied by `progress`.
    pub fn record_progress(&mut self, tx_hex: String, progress: &SigningProgress, now_nanos: u64) -> Result<()> {
        let next = if progress.threshold_met {
            SessionState::ThresholdReached
        } else if progress.collected() > 0 {
            SessionState::PartiallySigned { signed: progress.collected() }
        } else {
            SessionState::Drafted
        };
        ensure_valid_transition(&self.state, &next)?;
        self.tx_hex = tx_hex;
        self.state = next;
        self.updated_at_nanos = now_nanos;
        for advisory in progress.foreign_advisories() {
            let text = advisory.to_string();
            if !self.advisories.contains(&text) {
                self.advisories.push(text);
            }
        }
        Ok(())
    }

    pub fn mark_finalized(&mut self, tx_id: TransactionId, now_nanos: u64) -> Result<()> {
        self.transition_to(SessionState::Finalized { tx_id }, now_nanos)
    }

    pub fn expire(&mut self, now_nanos: u64) -> Result<()> {
        self.transition_to(SessionState::Expired, now_nanos)
    }

    pub fn abandon(&mut self, reason: impl Into<String>, now_nanos: u64) -> Result<()> {
        self.transition_to(SessionState::Abandoned { reason: reason.into() }, now_nanos)
    }

    fn transition_to(&mut self, next: SessionState, now_nanos: u64) -> Result<()> {
        ensure_valid_transition(&self.state, &next)?;
        self.state = next;
        self.updated_at_nanos = now_nanos;
        Ok(())
    }
}
