use crate::fixtures::*;
use crate::integration::proposal_flow::land_proposal_intent;
use ambassador_core::application::{AmbassadorWorkflow, NoopObserver, SignatureCoordinator, WorkflowServices};
use ambassador_core::domain::signing::{extract_witnesses, SessionState};
use ambassador_core::domain::transition::ProjectProposal;
use ambassador_core::domain::{Address, AssetId, StateKind, Utxo};
use ambassador_core::foundation::{AmbassadorError, Disposition, ErrorCode, PubKeyHash, Result};
use ambassador_core::infrastructure::indexer::{CachedIndexer, IndexContext, StateIndexer};
use ambassador_core::infrastructure::signer::{KeypairSigner, Signer};
use ambassador_core::infrastructure::storage::SessionStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Answers like a networked signer: suspends once before signing.
struct YieldingSigner(KeypairSigner);

#[async_trait]
impl Signer for YieldingSigner {
    fn pub_key_hash(&self) -> PubKeyHash {
        self.0.pub_key_hash()
    }

    async fn sign(&self, tx_hex: &str, partial: bool) -> Result<String> {
        tokio::task::yield_now().await;
        self.0.sign(tx_hex, partial).await
    }
}

/// Reports an empty view while frozen, like an indexer that fell behind the ledger.
struct LaggingIndexer {
    inner: Arc<CachedIndexer>,
    frozen: AtomicBool,
}

#[async_trait]
impl StateIndexer for LaggingIndexer {
    async fn get_by_context(&self, context: &IndexContext) -> Result<Vec<Utxo>> {
        if self.frozen.load(Ordering::SeqCst) {
            return Ok(Vec::new());
        }
        self.inner.get_by_context(context).await
    }

    async fn sync(&self, context: &IndexContext) -> Result<usize> {
        if self.frozen.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.sync(context).await
    }

    async fn sync_all(&self) -> Result<usize> {
        if self.frozen.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.sync_all().await
    }
}

#[tokio::test]
async fn competing_candidates_on_one_intent_land_exactly_once() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;
    let intent = land_proposal_intent(&scenario).await;

    let approve = workflow.approve_proposal(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");
    let reject = workflow.reject_proposal(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("reject");
    assert_ne!(approve.built.tx_id, reject.built.tx_id);
    assert!(approve.built.consumed.iter().any(|outref| reject.built.consumed.contains(outref)));

    for pending in [&approve, &reject] {
        scenario.sign_with(&pending.session_id(), &[&scenario.admins[0], &scenario.admins[1]]).await;
    }

    let (approve_id, reject_id) = (approve.session_id(), reject.session_id());
    let (first, second) = tokio::join!(workflow.finalize(&approve_id), workflow.finalize(&reject_id));
    let (winner, loser, loser_id) = match (first, second) {
        (Ok(winner), Err(loser)) => (winner, loser, reject_id),
        (Err(loser), Ok(winner)) => (winner, loser, approve_id),
        (first, second) => panic!("expected exactly one acceptance, got {first:?} and {second:?}"),
    };

    assert_eq!(loser.code(), ErrorCode::StateAlreadyAdvanced);
    assert_eq!(loser.disposition(), Disposition::RefreshAndRestart);
    assert!(scenario.ledger.accepted().expect("accepted").contains(&winner.tx_id));
    assert!(scenario.live_with(&intent).is_empty());

    let abandoned = workflow.coordinator().session(&loser_id).expect("session");
    assert!(matches!(abandoned.state, SessionState::Abandoned { .. }));
    let err = workflow.sign(&loser_id, &scenario.admins[2]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn refresh_detects_a_consumed_input_before_submission() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;
    let intent = scenario.land_membership_intent().await;

    let approve = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");
    let reject = workflow.reject_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("reject");
    scenario.sign_with(&reject.session_id(), &[&scenario.admins[1]]).await;

    workflow.coordinator().refresh(&reject.session_id()).await.expect("still current");
    scenario.approve_with_quorum(&approve).await;

    let err = workflow.coordinator().refresh(&reject.session_id()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::StateAlreadyAdvanced);
    let stale = scenario.store.get(&reject.session_id()).expect("get").expect("session");
    assert!(matches!(stale.state, SessionState::Abandoned { .. }));
    assert!(scenario.store.list_open().expect("open").is_empty());

    // terminal sessions refresh as a no-op
    let again = workflow.coordinator().refresh(&reject.session_id()).await.expect("terminal");
    assert_eq!(again.state, stale.state);
}

#[tokio::test]
async fn expired_session_stops_collecting_witnesses() {
    let scenario = ScenarioBuilder::default().build();
    let intent = scenario.land_membership_intent().await;
    let pending =
        scenario.workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");

    let short_lived =
        SignatureCoordinator::new(scenario.store.clone(), scenario.ledger.clone(), Arc::new(NoopObserver)).with_session_ttl(0);
    let session = short_lived.open_session(&pending.built).expect("open");

    let err = short_lived.sign(&session.session_id, &scenario.admins[0]).await.unwrap_err();
    assert!(matches!(err, AmbassadorError::SessionExpired { .. }), "unexpected error: {err}");

    let err = short_lived.refresh(&session.session_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SessionExpired);
    assert_eq!(short_lived.session(&session.session_id).expect("session").state, SessionState::Expired);

    // the long-lived session for the same candidate is unaffected
    let progress = scenario.workflow.sign(&pending.session_id(), &scenario.admins[0]).await.expect("sign");
    assert_eq!(progress.collected(), 1);
}

#[tokio::test]
async fn finalizing_an_expired_session_moves_it_to_expired() {
    let scenario = ScenarioBuilder::default().build();
    let intent = scenario.land_membership_intent().await;
    let pending =
        scenario.workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");

    let short_lived =
        SignatureCoordinator::new(scenario.store.clone(), scenario.ledger.clone(), Arc::new(NoopObserver)).with_session_ttl(0);
    let session = short_lived.open_session(&pending.built).expect("open");

    let err = scenario.workflow.finalize(&session.session_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SessionExpired);
    let stored = scenario.store.get(&session.session_id).expect("get").expect("session");
    assert_eq!(stored.state, SessionState::Expired);
    assert!(scenario.store.list_open().expect("open").iter().all(|open| open.session_id != session.session_id));

    let err = scenario.workflow.finalize(&session.session_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    assert!(scenario.ledger.accepted().expect("accepted").iter().all(|tx_id| *tx_id != pending.built.tx_id));
}

#[tokio::test]
async fn concurrent_signers_keep_every_witness() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;
    let intent = scenario.land_membership_intent().await;
    let pending = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");
    let session_id = pending.session_id();

    let a = YieldingSigner(signer(ADMIN_SEEDS[0]));
    let b = YieldingSigner(signer(ADMIN_SEEDS[1]));
    let (first, second) = tokio::join!(workflow.sign(&session_id, &a), workflow.sign(&session_id, &b));
    first.expect("sign A");
    second.expect("sign B");

    let session = workflow.coordinator().session(&session_id).expect("session");
    assert_eq!(session.state, SessionState::ThresholdReached);
    let witnessed = extract_witnesses(&session.tx_hex).expect("extract");
    assert!(witnessed.contains(&a.pub_key_hash()) && witnessed.contains(&b.pub_key_hash()), "{witnessed:?}");

    let finalized = workflow.finalize(&session_id).await.expect("finalize");
    assert!(finalized.indexed);
}

#[tokio::test]
async fn accepted_transaction_is_reported_even_when_the_indexer_lags() {
    let scenario = ScenarioBuilder::default().build();
    let intent = scenario.land_membership_intent().await;

    let lagging = Arc::new(LaggingIndexer { inner: scenario.indexer.clone(), frozen: AtomicBool::new(false) });
    let services = WorkflowServices {
        indexer: lagging.clone(),
        fetcher: scenario.ledger.clone(),
        submitter: scenario.ledger.clone(),
        store: scenario.store.clone(),
        observer: Arc::new(NoopObserver),
    };
    let workflow = AmbassadorWorkflow::new(&scenario.config, services);

    let pending = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");
    let session_id = pending.session_id();
    for admin in &scenario.admins[..2] {
        workflow.sign(&session_id, admin).await.expect("sign");
    }
    lagging.frozen.store(true, Ordering::SeqCst);

    let finalized = workflow.finalize(&session_id).await.expect("accepted despite lag");
    assert!(!finalized.indexed);
    assert_eq!(finalized.tx_id, pending.built.tx_id);
    assert!(scenario.ledger.accepted().expect("accepted").contains(&finalized.tx_id));
    let session = workflow.coordinator().session(&session_id).expect("session");
    assert_eq!(session.state, SessionState::Finalized { tx_id: finalized.tx_id });

    lagging.frozen.store(false, Ordering::SeqCst);
    workflow.await_indexed(&finalized).await.expect("caught up");
    assert!(!workflow.records(StateKind::Member).await.expect("members").is_empty());
}

#[tokio::test]
async fn unknown_session_is_reported() {
    let scenario = ScenarioBuilder::default().build();
    let missing = ambassador_core::foundation::SessionId::new([0x5a; 32]);

    let err = scenario.workflow.finalize(&missing).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::SessionNotFound);
    let err = scenario.workflow.coordinator().abandon(&missing, "operator").unwrap_err();
    assert_eq!(err.code(), ErrorCode::SessionNotFound);
}
