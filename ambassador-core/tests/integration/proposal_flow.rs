use crate::fixtures::*;
use ambassador_core::application::PendingTransition;
use ambassador_core::domain::hashes::proposal_identity;
use ambassador_core::domain::transition::ProjectProposal;
use ambassador_core::domain::{Address, AssetId, ProposalStage, StateDatum, StateKind, WorkflowStage};
use ambassador_core::foundation::{AmbassadorError, ErrorCode};
use ambassador_core::infrastructure::ledger::{SubmitRejection, Submitter};
use ambassador_core::infrastructure::signer::Signer;

const FUND: u64 = 1_200;

fn receiver() -> Address {
    Address::Key(pkh_of(0x66))
}

fn proposal(fund_requested: u64) -> ProjectProposal {
    ProjectProposal {
        proof_token: proof_token(),
        title: "Docs translation".to_string(),
        fund_requested,
        receiver: receiver(),
        metadata: proposal_metadata(),
    }
}

pub(crate) async fn land_proposal_intent(scenario: &Scenario, member: &AssetId, fund_requested: u64) -> AssetId {
    let pending = scenario
        .workflow
        .propose_project(&scenario.applicant.address(), member, proposal(fund_requested))
        .await
        .expect("propose");
    scenario.sign_with(&pending.session_id(), &[&scenario.applicant]).await;
    let finalized = scenario.workflow.finalize(&pending.session_id()).await.expect("finalize proposal");
    successor_token(&finalized, StateKind::ProposalIntent)
}

async fn advance(scenario: &Scenario, pending: &PendingTransition, kind: StateKind) -> AssetId {
    successor_token(&scenario.approve_with_quorum(pending).await, kind)
}

#[tokio::test]
async fn proposal_is_approved_signed_off_and_paid() {
    let scenario = ScenarioBuilder::default().treasury(&[1_000, 4_000]).build();
    let workflow = &scenario.workflow;
    let (signers, payer) = (scenario.admin_pkhs(), scenario.fee_payer());

    let member = scenario.land_member().await;
    let intent = land_proposal_intent(&scenario, &member, FUND).await;
    assert_eq!(workflow.stage_of(&intent).await.expect("stage"), WorkflowStage::Proposal(ProposalStage::Intent));

    let pending = workflow.approve_proposal(&intent, &signers, &payer).await.expect("approve proposal");
    let proposal_token = advance(&scenario, &pending, StateKind::Proposal).await;
    assert_eq!(proposal_token.name, intent.name);

    let pending = workflow.approve_sign_off(&proposal_token, &signers, &payer).await.expect("approve sign-off");
    let report = pending.treasury.clone().expect("treasury report");
    assert_eq!((report.balance, report.committed, report.available), (5_000, FUND, 3_800));
    assert!(report.advisory().is_none());
    let approval = advance(&scenario, &pending, StateKind::SignOffApproval).await;
    assert_eq!(approval.name, intent.name);

    let pending_report = workflow.treasury_report().await.expect("report");
    assert_eq!(pending_report.committed, FUND);
    assert_eq!(pending_report.pending_sign_offs, 1);

    let pending = workflow.sign_off(&approval, &signers, &payer).await.expect("sign off");
    let paid_member = advance(&scenario, &pending, StateKind::Member).await;
    assert_eq!(paid_member, member);

    let utxos = scenario.ledger.utxos().expect("utxos");
    assert!(utxos.iter().any(|utxo| *utxo.address() == receiver() && utxo.value().coin == FUND));
    let treasury =
        utxos.iter().filter(|utxo| *utxo.address() == scenario.params.treasury_address()).map(|utxo| utxo.value().coin).sum::<u64>();
    assert_eq!(treasury, 3_800);
    assert!(scenario.live_with(&approval).is_empty());

    match workflow.locate(&member).await.expect("member").datum() {
        Some(StateDatum::Member(datum)) => {
            assert_eq!(datum.fund_received, FUND);
            assert_eq!(datum.completion.get(&intent.name), Some(&FUND));
            assert_eq!(datum.holder, scenario.applicant.pub_key_hash());
        }
        other => panic!("unexpected member datum: {other:?}"),
    }

    let settled = workflow.treasury_report().await.expect("report");
    assert_eq!((settled.balance, settled.committed, settled.pending_sign_offs), (3_800, 0, 0));
    let err = workflow.stage_of(&approval).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRequiredUtxo);

    // paid-out terms cannot be filed again
    let err = workflow.propose_project(&scenario.applicant.address(), &member, proposal(FUND)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}

#[tokio::test]
async fn same_terms_stay_unique_while_the_proposal_advances() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;
    let proposer = scenario.applicant.address();

    let member = scenario.land_member().await;
    let intent = land_proposal_intent(&scenario, &member, FUND).await;
    let err = workflow.propose_project(&proposer, &member, proposal(FUND)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

    let pending = workflow.approve_proposal(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve proposal");
    let proposal_token = advance(&scenario, &pending, StateKind::Proposal).await;
    let err = workflow.propose_project(&proposer, &member, proposal(FUND)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);

    // a duplicate assembled without the workflow is refused by the ledger
    let oracle = workflow.oracle().await.expect("oracle");
    let proof = workflow.locate(&proof_token()).await.expect("proof");
    let member_utxo = workflow.locate(&member).await.expect("member");
    let fee_inputs = scenario
        .ledger
        .utxos()
        .expect("utxos")
        .into_iter()
        .filter(|utxo| *utxo.address() == proposer && utxo.value().assets.is_empty())
        .collect();
    let built = workflow
        .builder()
        .propose_project(&oracle, &proof, &member_utxo, proposal(FUND), &build_context(proposer, fee_inputs))
        .expect("build duplicate");
    let rejection = scenario.ledger.submit(&sign_hex(&built.tx_hex, APPLICANT_SEED)).await.unwrap_err();
    assert!(
        matches!(&rejection, SubmitRejection::Invalid { reason } if reason.contains("already live")),
        "unexpected rejection: {rejection:?}"
    );
    assert_eq!(scenario.live_with(&proposal_token).len(), 1);
    assert!(scenario.live_with(&intent).is_empty());
}

#[tokio::test]
async fn intent_token_is_derived_from_the_terms() {
    let scenario = ScenarioBuilder::default().build();
    let member = scenario.land_member().await;

    let intent = land_proposal_intent(&scenario, &member, FUND).await;
    match scenario.workflow.locate(&intent).await.expect("intent").datum() {
        Some(StateDatum::ProposalIntent(datum)) => {
            assert_eq!(datum.terms.requester, member.name);
            assert_eq!(proposal_identity(&datum.terms), intent.name);
        }
        other => panic!("unexpected intent datum: {other:?}"),
    }
}

#[tokio::test]
async fn over_committed_treasury_still_builds_with_an_advisory() {
    let scenario = ScenarioBuilder::default().treasury(&[1_000]).build();
    let workflow = &scenario.workflow;
    let (signers, payer) = (scenario.admin_pkhs(), scenario.fee_payer());

    let member = scenario.land_member().await;
    let intent = land_proposal_intent(&scenario, &member, FUND).await;
    let pending = workflow.approve_proposal(&intent, &signers, &payer).await.expect("approve proposal");
    let proposal_token = advance(&scenario, &pending, StateKind::Proposal).await;

    let pending = workflow.approve_sign_off(&proposal_token, &signers, &payer).await.expect("approve sign-off");
    let report = pending.treasury.clone().expect("treasury report");
    assert_eq!(report.available, -200);
    assert!(matches!(report.advisory(), Some(AmbassadorError::TreasuryInsufficientBalance { available: -200, .. })));

    let approval = advance(&scenario, &pending, StateKind::SignOffApproval).await;
    let err = workflow.sign_off(&approval, &signers, &payer).await.unwrap_err();
    assert!(matches!(err, AmbassadorError::InsufficientFunds { .. }), "unexpected error: {err}");
    assert!(!scenario.live_with(&approval).is_empty());
}

#[tokio::test]
async fn rejected_proposal_never_reaches_the_treasury() {
    let scenario = ScenarioBuilder::default().build();
    let member = scenario.land_member().await;
    let intent = land_proposal_intent(&scenario, &member, FUND).await;

    let pending = scenario.workflow.reject_proposal(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("reject");
    let finalized = scenario.approve_with_quorum(&pending).await;

    assert!(finalized.successors.is_empty());
    assert!(scenario.live_with(&intent).is_empty());
    let report = scenario.workflow.treasury_report().await.expect("report");
    assert_eq!((report.balance, report.committed), (5_000, 0));
}
