use crate::application::lifecycle::LifecycleObserver;
use crate::domain::signing::{merge_witnesses, track_progress, SigningProgress, SigningSession};
use crate::domain::transition::BuiltTransition;
use crate::foundation::{now_nanos, AmbassadorError, Result, SessionId, DEFAULT_SESSION_TTL_SECS};
use crate::infrastructure::ledger::UtxoFetcher;
use crate::infrastructure::signer::Signer;
use crate::infrastructure::storage::SessionStore;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Sequential hand-off: `signer` adds its witness to `candidate_hex`.
///
/// Witnesses already on the candidate are kept even if the signer's copy
/// dropped them, and a signer returning a different body is refused.
pub async fn sign_candidate(candidate_hex: &str, signer: &dyn Signer) -> Result<String> {
    let signed = signer.sign(candidate_hex, true).await?;
    Ok(merge_witnesses(candidate_hex, &signed)?.tx_hex)
}

/// Accumulates witnesses for persisted signing sessions.
pub struct SignatureCoordinator {
    store: Arc<dyn SessionStore>,
    fetcher: Arc<dyn UtxoFetcher>,
    observer: Arc<dyn LifecycleObserver>,
    session_ttl_secs: u64,
    /// Serializes read-merge-save per session so concurrent signers never drop each other's witness.
    session_locks: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SignatureCoordinator {
    pub fn new(store: Arc<dyn SessionStore>, fetcher: Arc<dyn UtxoFetcher>, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self { store, fetcher, observer, session_ttl_secs: DEFAULT_SESSION_TTL_SECS, session_locks: Mutex::new(HashMap::new()) }
    }

    pub fn with_session_ttl(mut self, session_ttl_secs: u64) -> Self {
        self.session_ttl_secs = session_ttl_secs;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn open_session(&self, built: &BuiltTransition) -> Result<SigningSession> {
        let session = SigningSession::open(built, now_nanos(), self.session_ttl_secs);
        self.store.save(&session)?;
        self.observer.on_session_opened(&session);
        Ok(session)
    }

    pub fn session(&self, session_id: &SessionId) -> Result<SigningSession> {
        self.store.get(session_id)?.ok_or_else(|| AmbassadorError::SessionNotFound(session_id.to_string()))
    }

    /// Asks `signer` for one more witness on the session's candidate.
    ///
    /// The signer works on a snapshot; its witnesses are merged onto whatever
    /// the session holds once it answers.
    pub async fn sign(&self, session_id: &SessionId, signer: &dyn Signer) -> Result<SigningProgress> {
        let session = self.open_for_signing(session_id)?;
        let signed = sign_candidate(&session.tx_hex, signer).await?;
        self.record(session_id, &signed)
    }

    /// Takes over witnesses from a copy signed independently of this session.
    pub fn merge_witnesses(&self, session_id: &SessionId, signed_hex: &str) -> Result<SigningProgress> {
        self.record(session_id, signed_hex)
    }

    pub fn progress(&self, session_id: &SessionId) -> Result<SigningProgress> {
        let session = self.session(session_id)?;
        track_progress(&session.tx_hex, &session.required_signers, session.threshold)
    }

    /// Checks the session against the current ledger.
    ///
    /// An expired session moves to `Expired`; a session whose inputs were
    /// consumed elsewhere moves to `Abandoned` and yields `StateAlreadyAdvanced`.
    pub async fn refresh(&self, session_id: &SessionId) -> Result<SigningSession> {
        let mut session = self.session(session_id)?;
        if session.is_terminal() {
            return Ok(session);
        }

        let now = now_nanos();
        if session.is_expired(now) {
            let old_state = session.state.clone();
            session.expire(now)?;
            self.store.save(&session)?;
            self.forget_lock(session_id);
            self.observer.on_state_changed(session_id, &old_state, &session.state);
            return Err(AmbassadorError::SessionExpired {
                session_id: session_id.to_string(),
                expired_at: session.expires_at_nanos,
                current_time: now,
            });
        }

        let mut consumed_elsewhere = None;
        for outref in &session.consumed {
            if self.fetcher.fetch_by_reference(outref).await?.is_empty() {
                consumed_elsewhere = Some(*outref);
                break;
            }
        }
        let Some(outref) = consumed_elsewhere else {
            return Ok(session);
        };

        let reason = format!("input {outref} consumed by another transaction");
        let old_state = session.state.clone();
        session.abandon(reason.clone(), now)?;
        self.store.save(&session)?;
        self.forget_lock(session_id);
        self.observer.on_state_changed(session_id, &old_state, &session.state);
        self.observer.on_failed(session_id, &reason);
        Err(AmbassadorError::StateAlreadyAdvanced { outref: outref.to_string() })
    }

    /// Discards the candidate; nothing reaches the ledger.
    pub fn abandon(&self, session_id: &SessionId, reason: &str) -> Result<SigningSession> {
        let mut session = self.session(session_id)?;
        let old_state = session.state.clone();
        session.abandon(reason, now_nanos())?;
        self.store.save(&session)?;
        self.forget_lock(session_id);
        self.observer.on_state_changed(session_id, &old_state, &session.state);
        Ok(session)
    }

    fn open_for_signing(&self, session_id: &SessionId) -> Result<SigningSession> {
        let session = self.session(session_id)?;
        session.ensure_open(now_nanos())?;
        Ok(session)
    }

    fn session_lock(&self, session_id: &SessionId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.session_locks.lock().map_err(|_| poisoned("session lock table"))?;
        Ok(locks.entry(*session_id).or_default().clone())
    }

    fn forget_lock(&self, session_id: &SessionId) {
        if let Ok(mut locks) = self.session_locks.lock() {
            locks.remove(session_id);
        }
    }

    fn record(&self, session_id: &SessionId, signed_hex: &str) -> Result<SigningProgress> {
        let lock = self.session_lock(session_id)?;
        let (session, old_state, progress, added) = {
            let _guard = lock.lock().map_err(|_| poisoned("session lock"))?;
            let mut session = self.open_for_signing(session_id)?;
            let outcome = merge_witnesses(&session.tx_hex, signed_hex)?;
            if outcome.added.is_empty() {
                debug!("merge added no witnesses session_id={}", session_id);
            }
            let progress = track_progress(&outcome.tx_hex, &session.required_signers, session.threshold)?;

            let old_state = session.state.clone();
            session.record_progress(outcome.tx_hex, &progress, now_nanos())?;
            self.store.save(&session)?;
            (session, old_state, progress, outcome.added)
        };

        for pkh in &added {
            self.observer.on_witness_added(&session.session_id, pkh);
        }
        for advisory in progress.foreign_advisories() {
            warn!("foreign witness retained session_id={} {}", session.session_id, advisory);
            self.observer.on_advisory(&advisory);
        }
        if !progress.invalid.is_empty() {
            warn!("invalid witnesses ignored session_id={} count={}", session.session_id, progress.invalid.len());
        }
        if old_state != session.state {
            self.observer.on_state_changed(&session.session_id, &old_state, &session.state);
            if progress.threshold_met {
                self.observer.on_threshold_met(&session.session_id, progress.collected(), progress.threshold);
            }
        }
        Ok(progress)
    }
}

fn poisoned(operation: &str) -> AmbassadorError {
    AmbassadorError::StorageError { operation: operation.to_string(), details: "poisoned".to_string() }
}
