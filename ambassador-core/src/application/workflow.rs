//! Sequences build → sign → finalize for every lifecycle transition.

use crate::application::coordinator::SignatureCoordinator;
use crate::application::finalizer::{FinalizedTransition, Finalizer};
use crate::application::lifecycle::LifecycleObserver;
use crate::application::monitoring::SyncMonitor;
use crate::domain::signing::{SigningProgress, SigningSession};
use crate::domain::transition::{BuildContext, BuiltTransition, MembershipApplication, ProjectProposal, TransitionBuilder};
use crate::domain::{
    assess_treasury, Address, AssetId, StateDatum, StateKind, TransitionKind, TreasuryReport, Utxo, WorkflowStage,
};
use crate::foundation::util::time::nanos_to_millis;
use crate::foundation::{now_nanos, AmbassadorError, PubKeyHash, Result, SessionId};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::indexer::{IndexContext, StateIndexer};
use crate::infrastructure::ledger::{Submitter, UtxoFetcher};
use crate::infrastructure::signer::Signer;
use crate::infrastructure::storage::{FileSessionStore, MemorySessionStore, SessionStore};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Capabilities the workflow runs against.
#[derive(Clone)]
pub struct WorkflowServices {
    pub indexer: Arc<dyn StateIndexer>,
    pub fetcher: Arc<dyn UtxoFetcher>,
    pub submitter: Arc<dyn Submitter>,
    pub store: Arc<dyn SessionStore>,
    pub observer: Arc<dyn LifecycleObserver>,
}

/// A built candidate with its open signing session.
#[derive(Clone, Debug)]
pub struct PendingTransition {
    pub built: BuiltTransition,
    pub session: SigningSession,
    /// Treasury position for transitions that commit or spend treasury funds.
    pub treasury: Option<TreasuryReport>,
}

impl PendingTransition {
    pub fn session_id(&self) -> SessionId {
        self.session.session_id
    }
}

/// File store when `storage.sessions_dir` is set, memory otherwise.
pub fn session_store_from_config(config: &AppConfig) -> Result<Arc<dyn SessionStore>> {
    match config.storage.sessions_path() {
        Some(path) => Ok(Arc::new(FileSessionStore::open(path)?)),
        None => Ok(Arc::new(MemorySessionStore::new())),
    }
}

pub struct AmbassadorWorkflow {
    builder: TransitionBuilder,
    indexer: Arc<dyn StateIndexer>,
    coordinator: SignatureCoordinator,
    finalizer: Finalizer,
    monitor: SyncMonitor,
    observer: Arc<dyn LifecycleObserver>,
}

impl AmbassadorWorkflow {
    pub fn new(config: &AppConfig, services: WorkflowServices) -> Self {
        let builder = TransitionBuilder::new(config.protocol_params(), config.fees.clone());
        let coordinator = SignatureCoordinator::new(services.store.clone(), services.fetcher, services.observer.clone())
            .with_session_ttl(config.signing.session_ttl_secs);
        let finalizer = Finalizer::new(services.store, services.submitter, services.observer.clone());
        let monitor = SyncMonitor::new(
            services.indexer.clone(),
            Duration::from_millis(config.indexer.poll_interval_ms),
            config.indexer.max_sync_attempts,
        );
        Self { builder, indexer: services.indexer, coordinator, finalizer, monitor, observer: services.observer }
    }

    pub fn builder(&self) -> &TransitionBuilder {
        &self.builder
    }

    pub fn coordinator(&self) -> &SignatureCoordinator {
        &self.coordinator
    }

    // --- current state lookups ---

    pub async fn oracle(&self) -> Result<Utxo> {
        self.singleton(StateKind::Oracle, self.builder.params().oracle_token()).await
    }

    pub async fn counter(&self) -> Result<Utxo> {
        self.singleton(StateKind::Counter, self.builder.params().counter_token()).await
    }

    /// Live records of one workflow kind as the indexer currently sees them.
    pub async fn records(&self, kind: StateKind) -> Result<Vec<Utxo>> {
        self.indexer.get_by_context(&IndexContext::State(kind)).await
    }

    /// The UTXO currently carrying `token`.
    pub async fn locate(&self, token: &AssetId) -> Result<Utxo> {
        self.indexer
            .get_by_context(&IndexContext::Token(*token))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AmbassadorError::missing_utxo(format!("utxo holding {token}"), token))
    }

    /// Lifecycle stage of the record identified by `token`.
    pub async fn stage_of(&self, token: &AssetId) -> Result<WorkflowStage> {
        let kind = self
            .builder
            .params()
            .kind_of_policy(&token.policy)
            .ok_or_else(|| AmbassadorError::missing_utxo("state token of a known policy", token))?;
        self.locate(token).await?;
        WorkflowStage::of_state(kind).ok_or_else(|| AmbassadorError::invalid_datum(token, "workflow record"))
    }

    pub async fn treasury_report(&self) -> Result<TreasuryReport> {
        let treasury = self.indexer.get_by_context(&IndexContext::Treasury).await?;
        let approvals = self.records(StateKind::SignOffApproval).await?;
        let report = assess_treasury(&treasury, &approvals)?;
        self.surface_treasury(&report);
        Ok(report)
    }

    // --- user-initiated transitions ---

    pub async fn apply_membership(&self, applicant: &Address, application: MembershipApplication) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let proof = self.locate(&application.proof_token).await?;
        let ctx = self.context(applicant, &[&proof]).await?;
        let built = self.builder.apply_membership(&oracle, &proof, application, &ctx)?;
        self.open(built, None)
    }

    pub async fn propose_project(&self, proposer: &Address, member_token: &AssetId, proposal: ProjectProposal) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let proof = self.locate(&proposal.proof_token).await?;
        let member = self.current(member_token, TransitionKind::ProposeProject, StateKind::Member).await?;
        let ctx = self.context(proposer, &[&proof]).await?;
        let built = self.builder.propose_project(&oracle, &proof, &member, proposal, &ctx)?;
        if let Some(intent) = built.successor(StateKind::ProposalIntent) {
            self.ensure_new_proposal(&member, &intent.token).await?;
        }
        self.open(built, None)
    }

    // --- admin transitions ---

    pub async fn approve_member(&self, intent_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let counter = self.counter().await?;
        let intent = self.current(intent_token, TransitionKind::ApproveMember, StateKind::MembershipIntent).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.approve_member(&oracle, &counter, &intent, required_signers, &ctx)?;
        self.open(built, None)
    }

    pub async fn reject_member(&self, intent_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let intent = self.current(intent_token, TransitionKind::RejectMember, StateKind::MembershipIntent).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.reject_member(&oracle, &intent, required_signers, &ctx)?;
        self.open(built, None)
    }

    pub async fn remove_member(&self, member_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let member = self.current(member_token, TransitionKind::RemoveMember, StateKind::Member).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.remove_member(&oracle, &member, required_signers, &ctx)?;
        self.open(built, None)
    }

    pub async fn approve_proposal(&self, intent_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let intent = self.current(intent_token, TransitionKind::ApproveProposal, StateKind::ProposalIntent).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.approve_proposal(&oracle, &intent, required_signers, &ctx)?;
        self.open(built, None)
    }

    pub async fn reject_proposal(&self, intent_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let intent = self.current(intent_token, TransitionKind::RejectProposal, StateKind::ProposalIntent).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.reject_proposal(&oracle, &intent, required_signers, &ctx)?;
        self.open(built, None)
    }

    /// Building never waits on the treasury; an over-commitment is only reported.
    pub async fn approve_sign_off(&self, proposal_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let proposal = self.current(proposal_token, TransitionKind::ApproveSignOff, StateKind::Proposal).await?;
        let fund_requested = match proposal.datum() {
            Some(StateDatum::Proposal(datum)) => datum.terms.fund_requested,
            _ => return Err(AmbassadorError::invalid_datum(proposal.outref, StateKind::Proposal.label())),
        };
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.approve_sign_off(&oracle, &proposal, required_signers, &ctx)?;

        let report = self.current_treasury().await?.including(fund_requested);
        self.surface_treasury(&report);
        self.open(built, Some(report))
    }

    pub async fn sign_off(&self, approval_token: &AssetId, required_signers: &[PubKeyHash], fee_payer: &Address) -> Result<PendingTransition> {
        let oracle = self.oracle().await?;
        let approval = self.current(approval_token, TransitionKind::SignOff, StateKind::SignOffApproval).await?;
        let requester = match approval.datum() {
            Some(StateDatum::SignOffApproval(datum)) => datum.terms.requester,
            _ => return Err(AmbassadorError::invalid_datum(approval.outref, StateKind::SignOffApproval.label())),
        };
        let member_token = self.builder.params().state_token(StateKind::Member, requester);
        let member = self.locate(&member_token).await?;
        let treasury = self.indexer.get_by_context(&IndexContext::Treasury).await?;
        let ctx = self.context(fee_payer, &[]).await?;
        let built = self.builder.sign_off(&oracle, &approval, &member, &treasury, required_signers, &ctx)?;

        let report = self.current_treasury().await?;
        self.surface_treasury(&report);
        self.open(built, Some(report))
    }

    // --- signing and submission ---

    pub async fn sign(&self, session_id: &SessionId, signer: &dyn Signer) -> Result<SigningProgress> {
        self.coordinator.sign(session_id, signer).await
    }

    pub fn merge_witnesses(&self, session_id: &SessionId, signed_hex: &str) -> Result<SigningProgress> {
        self.coordinator.merge_witnesses(session_id, signed_hex)
    }

    /// Submits the session's candidate once, then waits for the indexer to
    /// show the outcome. A rejection is returned as is; callers refresh and
    /// restart from current state rather than resubmitting.
    ///
    /// Once the ledger accepted the candidate the result is always `Ok`; an
    /// indexer that has not caught up leaves `indexed` unset and is reported
    /// as an advisory.
    pub async fn finalize(&self, session_id: &SessionId) -> Result<FinalizedTransition> {
        let mut finalized = self.finalizer.finalize(session_id).await?;
        match self.await_indexed(&finalized).await {
            Ok(()) => finalized.indexed = true,
            Err(err) => {
                warn!(
                    "transaction accepted but not yet indexed session_id={} tx_id={} error={}",
                    session_id, finalized.tx_id, err
                );
                self.observer.on_advisory(&err);
            }
        }
        Ok(finalized)
    }

    /// Polls the indexer until the successors of `finalized` are visible and
    /// its consumed records are gone, then refreshes every other snapshot.
    pub async fn await_indexed(&self, finalized: &FinalizedTransition) -> Result<()> {
        for successor in &finalized.successors {
            let outref = successor.outref;
            self.monitor
                .wait_for(&IndexContext::Token(successor.token), |utxos| utxos.iter().any(|utxo| utxo.outref == outref))
                .await?;
            self.monitor.wait_for(&IndexContext::State(successor.kind), |utxos| utxos.iter().any(|utxo| utxo.outref == outref)).await?;
        }
        if let Some(source) = source_kind(finalized.transition) {
            let consumed = finalized.consumed.clone();
            self.monitor
                .wait_for(&IndexContext::State(source), |utxos| utxos.iter().all(|utxo| !consumed.contains(&utxo.outref)))
                .await?;
        }
        self.indexer.sync_all().await?;
        info!("transition indexed transition={} tx_id={}", finalized.transition, finalized.tx_id);
        Ok(())
    }

    // --- helpers ---

    async fn singleton(&self, kind: StateKind, token: AssetId) -> Result<Utxo> {
        self.records(kind)
            .await?
            .into_iter()
            .find(|utxo| utxo.value().has_asset(&token))
            .ok_or_else(|| AmbassadorError::missing_utxo(kind.label(), token))
    }

    /// Locates the record for `token` and checks `transition` may start from its stage.
    async fn current(&self, token: &AssetId, transition: TransitionKind, expected: StateKind) -> Result<Utxo> {
        let kind = self.builder.params().kind_of_policy(&token.policy);
        if kind != Some(expected) {
            let from = kind.map(|k| k.label().to_string()).unwrap_or_else(|| "unknown policy".to_string());
            warn!("transition refused transition={} token={} from={}", transition, token, from);
            return Err(AmbassadorError::InvalidStateTransition { from, to: transition.to_string() });
        }
        if let (Some(stage), Some(_)) = (WorkflowStage::of_state(expected), WorkflowStage::source_of(transition)) {
            stage.apply(transition)?;
        }
        self.locate(token).await
    }

    /// A proposal identity is live under at most one stage and never proposed again once paid out.
    async fn ensure_new_proposal(&self, member: &Utxo, intent_token: &AssetId) -> Result<()> {
        for kind in StateKind::ALL.into_iter().filter(StateKind::is_proposal_stage) {
            let staged = self.builder.params().state_token(kind, intent_token.name);
            if !self.indexer.get_by_context(&IndexContext::Token(staged)).await?.is_empty() {
                warn!("proposal already live identity={} stage={}", intent_token.name, kind);
                return Err(AmbassadorError::InvalidStateTransition {
                    from: kind.label().to_string(),
                    to: TransitionKind::ProposeProject.to_string(),
                });
            }
        }
        if let Some(StateDatum::Member(datum)) = member.datum() {
            if datum.completion.contains_key(&intent_token.name) {
                warn!("proposal already paid out identity={} member={}", intent_token.name, datum.token);
                return Err(AmbassadorError::InvalidStateTransition {
                    from: "paid_out".to_string(),
                    to: TransitionKind::ProposeProject.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn context(&self, payer: &Address, exclude: &[&Utxo]) -> Result<BuildContext> {
        let fee_inputs = self
            .indexer
            .get_by_context(&IndexContext::Wallet(*payer))
            .await?
            .into_iter()
            .filter(|utxo| exclude.iter().all(|excluded| excluded.outref != utxo.outref))
            .filter(|utxo| !utxo.value().assets.keys().any(|asset| self.builder.params().is_state_asset(asset)))
            .collect();
        Ok(BuildContext::new(fee_inputs, *payer, nanos_to_millis(now_nanos())))
    }

    async fn current_treasury(&self) -> Result<TreasuryReport> {
        let treasury = self.indexer.get_by_context(&IndexContext::Treasury).await?;
        let approvals = self.records(StateKind::SignOffApproval).await?;
        assess_treasury(&treasury, &approvals)
    }

    fn surface_treasury(&self, report: &TreasuryReport) {
        if let Some(advisory) = report.advisory() {
            warn!(
                "treasury over-committed balance={} committed={} available={}",
                report.balance, report.committed, report.available
            );
            self.observer.on_advisory(&advisory);
        }
    }

    fn open(&self, built: BuiltTransition, treasury: Option<TreasuryReport>) -> Result<PendingTransition> {
        let session = self.coordinator.open_session(&built)?;
        info!(
            "candidate built transition={} tx_id={} session_id={} fee={}",
            built.transition, built.tx_id, session.session_id, built.fee
        );
        Ok(PendingTransition { built, session, treasury })
    }
}

/// Workflow record kind a transition consumes, if any.
fn source_kind(transition: TransitionKind) -> Option<StateKind> {
    match transition {
        TransitionKind::ApplyMembership | TransitionKind::ProposeProject => None,
        TransitionKind::ApproveMember | TransitionKind::RejectMember => Some(StateKind::MembershipIntent),
        TransitionKind::RemoveMember => Some(StateKind::Member),
        TransitionKind::ApproveProposal | TransitionKind::RejectProposal => Some(StateKind::ProposalIntent),
        TransitionKind::ApproveSignOff => Some(StateKind::Proposal),
        TransitionKind::SignOff => Some(StateKind::SignOffApproval),
    }
}
