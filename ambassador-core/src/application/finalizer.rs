use crate::application::lifecycle::LifecycleObserver;
use crate::domain::signing::{missing_input_owners, progress_for, SigningSession};
use crate::domain::transition::StateOutput;
use crate::domain::{OutputRef, Transaction, TransitionKind};
use crate::foundation::{now_nanos, AmbassadorError, Result, SessionId, TransactionId};
use crate::infrastructure::ledger::{SubmitRejection, Submitter};
use crate::infrastructure::storage::SessionStore;
use log::{info, warn};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalizedTransition {
    pub session_id: SessionId,
    pub transition: TransitionKind,
    pub tx_id: TransactionId,
    pub consumed: Vec<OutputRef>,
    pub successors: Vec<StateOutput>,
    /// Set once the indexer shows the successors; acceptance does not depend on it.
    pub indexed: bool,
}

/// Submits threshold-complete candidates. Never retries: a rejected
/// submission is reported once and the caller decides what to do next.
pub struct Finalizer {
    store: Arc<dyn SessionStore>,
    submitter: Arc<dyn Submitter>,
    observer: Arc<dyn LifecycleObserver>,
}

impl Finalizer {
    pub fn new(store: Arc<dyn SessionStore>, submitter: Arc<dyn Submitter>, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self { store, submitter, observer }
    }

    pub async fn finalize(&self, session_id: &SessionId) -> Result<FinalizedTransition> {
        let mut session = self
            .store
            .get(session_id)?
            .ok_or_else(|| AmbassadorError::SessionNotFound(session_id.to_string()))?;
        let now = now_nanos();
        if !session.is_terminal() && session.is_expired(now) {
            let old_state = session.state.clone();
            session.expire(now)?;
            self.store.save(&session)?;
            warn!("session expired before submission session_id={} transition={}", session_id, session.transition);
            self.observer.on_state_changed(session_id, &old_state, &session.state);
            return Err(AmbassadorError::SessionExpired {
                session_id: session_id.to_string(),
                expired_at: session.expires_at_nanos,
                current_time: now,
            });
        }
        session.ensure_open(now)?;
        ensure_complete(&session)?;

        match self.submitter.submit(&session.tx_hex).await {
            Ok(tx_id) => {
                session.mark_finalized(tx_id, now_nanos())?;
                self.store.save(&session)?;
                info!("transaction accepted session_id={} transition={} tx_id={}", session_id, session.transition, tx_id);
                self.observer.on_finalized(session_id, &tx_id);
                Ok(FinalizedTransition {
                    session_id: *session_id,
                    transition: session.transition,
                    tx_id,
                    consumed: session.consumed,
                    successors: session.successors,
                    indexed: false,
                })
            }
            Err(rejection) => {
                warn!("transaction rejected session_id={} transition={} reason={}", session_id, session.transition, rejection);
                if let SubmitRejection::InputsConsumed { .. } = &rejection {
                    let old_state = session.state.clone();
                    session.abandon(rejection.to_string(), now_nanos())?;
                    self.store.save(&session)?;
                    self.observer.on_state_changed(session_id, &old_state, &session.state);
                }
                self.observer.on_failed(session_id, &rejection.to_string());
                Err(rejection.into())
            }
        }
    }
}

/// Threshold of designated signers met and every key-address input owner witnessed.
fn ensure_complete(session: &SigningSession) -> Result<()> {
    let tx = Transaction::from_hex(&session.tx_hex)?;
    progress_for(&tx, &session.required_signers, session.threshold)?.ensure_threshold()?;

    let missing = missing_input_owners(&tx, &session.input_owners)?;
    if !missing.is_empty() {
        warn!(
            "input owners have not signed session_id={} missing={}",
            session.session_id,
            missing.iter().map(|pkh| pkh.short()).collect::<Vec<_>>().join(",")
        );
        return Err(AmbassadorError::InsufficientSignatures {
            required: session.input_owners.len(),
            collected: session.input_owners.len() - missing.len(),
            pending: missing.len(),
        });
    }
    Ok(())
}
