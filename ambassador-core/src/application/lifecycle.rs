use crate::domain::signing::{SessionState, SigningSession};
use crate::foundation::{AmbassadorError, PubKeyHash, SessionId, TransactionId};
use log::{debug, info, trace, warn};
use std::sync::Arc;

pub trait LifecycleObserver: Send + Sync {
    fn on_session_opened(&self, _session: &SigningSession) {}
    fn on_witness_added(&self, _session_id: &SessionId, _signer: &PubKeyHash) {}
    fn on_state_changed(&self, _session_id: &SessionId, _old_state: &SessionState, _new_state: &SessionState) {}
    fn on_threshold_met(&self, _session_id: &SessionId, _collected: usize, _threshold: u16) {}
    fn on_finalized(&self, _session_id: &SessionId, _tx_id: &TransactionId) {}
    fn on_failed(&self, _session_id: &SessionId, _reason: &str) {}
    fn on_advisory(&self, _advisory: &AmbassadorError) {}
}

pub struct NoopObserver;

impl LifecycleObserver for NoopObserver {}

pub struct CompositeObserver {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl CompositeObserver {
    pub fn new() -> Self {
        Self { observers: Vec::new() }
    }

    pub fn add_observer(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

impl Default for CompositeObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for CompositeObserver {
    fn on_session_opened(&self, session: &SigningSession) {
        trace!("on_session_opened dispatch observer_count={} session_id={}", self.observers.len(), session.session_id);
        for observer in &self.observers {
            observer.on_session_opened(session);
        }
    }

    fn on_witness_added(&self, session_id: &SessionId, signer: &PubKeyHash) {
        for observer in &self.observers {
            observer.on_witness_added(session_id, signer);
        }
    }

    fn on_state_changed(&self, session_id: &SessionId, old_state: &SessionState, new_state: &SessionState) {
        for observer in &self.observers {
            observer.on_state_changed(session_id, old_state, new_state);
        }
    }

    fn on_threshold_met(&self, session_id: &SessionId, collected: usize, threshold: u16) {
        for observer in &self.observers {
            observer.on_threshold_met(session_id, collected, threshold);
        }
    }

    fn on_finalized(&self, session_id: &SessionId, tx_id: &TransactionId) {
        for observer in &self.observers {
            observer.on_finalized(session_id, tx_id);
        }
    }

    fn on_failed(&self, session_id: &SessionId, reason: &str) {
        for observer in &self.observers {
            observer.on_failed(session_id, reason);
        }
    }

    fn on_advisory(&self, advisory: &AmbassadorError) {
        for observer in &self.observers {
            observer.on_advisory(advisory);
        }
    }
}

/// Writes every lifecycle event to the `log` facade.
pub struct LoggingObserver;

impl LifecycleObserver for LoggingObserver {
    fn on_session_opened(&self, session: &SigningSession) {
        info!(
            "signing session opened session_id={} transition={} tx_id={} threshold={} required_signers={}",
            session.session_id,
            session.transition,
            session.tx_id,
            session.threshold,
            session.required_signers.len()
        );
    }

    fn on_witness_added(&self, session_id: &SessionId, signer: &PubKeyHash) {
        debug!("witness added session_id={} signer={}", session_id, signer.short());
    }

    fn on_state_changed(&self, session_id: &SessionId, old_state: &SessionState, new_state: &SessionState) {
        info!("session state changed session_id={} old_state={} new_state={}", session_id, old_state, new_state);
    }

    fn on_threshold_met(&self, session_id: &SessionId, collected: usize, threshold: u16) {
        info!("signature threshold met session_id={} collected={} threshold={}", session_id, collected, threshold);
    }

    fn on_finalized(&self, session_id: &SessionId, tx_id: &TransactionId) {
        info!("session finalized session_id={} tx_id={}", session_id, tx_id);
    }

    fn on_failed(&self, session_id: &SessionId, reason: &str) {
        warn!("session failed session_id={} reason={}", session_id, reason);
    }

    fn on_advisory(&self, advisory: &AmbassadorError) {
        warn!("advisory code={:?} message={}", advisory.code(), advisory);
    }
}
