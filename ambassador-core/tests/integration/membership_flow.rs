use crate::fixtures::*;
use ambassador_core::application::sign_candidate;
use ambassador_core::domain::signing::SessionState;
use ambassador_core::domain::{MembershipStage, StateDatum, StateKind, WorkflowStage};
use ambassador_core::foundation::ErrorCode;
use ambassador_core::infrastructure::signer::Signer;

#[tokio::test]
async fn apply_approve_remove_walks_the_membership_lifecycle() {
    let scenario = ScenarioBuilder::default().counter_start(5).build();
    let workflow = &scenario.workflow;

    let intent = scenario.land_membership_intent().await;
    assert_eq!(workflow.stage_of(&intent).await.expect("stage"), WorkflowStage::Membership(MembershipStage::Intent));
    assert!(scenario.live_with(&proof_token()).iter().any(|utxo| *utxo.address() == scenario.applicant.address()));

    let pending = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");
    let session_id = pending.session_id();
    assert!(pending.treasury.is_none());
    assert_eq!(pending.session.state, SessionState::Drafted);

    let progress = workflow.sign(&session_id, &scenario.admins[0]).await.expect("sign A");
    assert!(!progress.threshold_met);
    let err = workflow.finalize(&session_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientSignatures);

    let progress = workflow.sign(&session_id, &scenario.admins[1]).await.expect("sign B");
    assert!(progress.threshold_met);
    let finalized = workflow.finalize(&session_id).await.expect("finalize");
    let member = successor_token(&finalized, StateKind::Member);

    assert!(scenario.live_with(&intent).is_empty());
    assert_eq!(scenario.ledger.accepted().expect("accepted").last(), Some(&finalized.tx_id));
    let session = workflow.coordinator().session(&session_id).expect("session");
    assert_eq!(session.state, SessionState::Finalized { tx_id: finalized.tx_id });

    match workflow.locate(&member).await.expect("member").datum() {
        Some(StateDatum::Member(datum)) => {
            assert_eq!(datum.member_id, 5);
            assert_eq!(datum.holder, scenario.applicant.pub_key_hash());
        }
        other => panic!("unexpected member datum: {other:?}"),
    }
    match workflow.counter().await.expect("counter").datum() {
        Some(StateDatum::Counter(datum)) => assert_eq!(datum.count, 6),
        other => panic!("unexpected counter datum: {other:?}"),
    }

    let pending = workflow.remove_member(&member, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("remove");
    scenario.approve_with_quorum(&pending).await;

    assert!(scenario.live_with(&member).is_empty());
    assert!(workflow.records(StateKind::Member).await.expect("members").is_empty());
    let err = workflow.remove_member(&member, &scenario.admin_pkhs(), &scenario.fee_payer()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRequiredUtxo);
}

#[tokio::test]
async fn rejected_intent_leaves_counter_untouched() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;

    let intent = scenario.land_membership_intent().await;
    let pending = workflow.reject_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("reject");
    let finalized = scenario.approve_with_quorum(&pending).await;

    assert!(finalized.successors.is_empty());
    assert!(scenario.live_with(&intent).is_empty());
    assert!(workflow.records(StateKind::MembershipIntent).await.expect("intents").is_empty());
    match workflow.counter().await.expect("counter").datum() {
        Some(StateDatum::Counter(datum)) => assert_eq!(datum.count, 0),
        other => panic!("unexpected counter datum: {other:?}"),
    }
}

#[tokio::test]
async fn sequential_hand_off_merges_into_the_session() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;

    let intent = scenario.land_membership_intent().await;
    let pending = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");

    let from_a = sign_candidate(&pending.built.tx_hex, &scenario.admins[0]).await.expect("A signs");
    let from_b = sign_candidate(&from_a, &scenario.admins[1]).await.expect("B signs");

    let progress = workflow.merge_witnesses(&pending.session_id(), &from_b).expect("merge");
    assert!(progress.threshold_met);
    assert_eq!(progress.collected(), 2);

    let finalized = workflow.finalize(&pending.session_id()).await.expect("finalize");
    assert_eq!(finalized.tx_id, pending.built.tx_id);
}

#[tokio::test]
async fn complete_signing_refuses_to_hand_back_a_short_candidate() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;

    let intent = scenario.land_membership_intent().await;
    let pending = workflow.approve_member(&intent, &scenario.admin_pkhs(), &scenario.fee_payer()).await.expect("approve");

    let err = scenario.admins[0].sign(&pending.built.tx_hex, false).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InsufficientSignatures);

    let partial = scenario.admins[0].sign(&pending.built.tx_hex, true).await.expect("partial");
    assert!(scenario.admins[1].sign(&partial, false).await.is_ok());
}

#[tokio::test]
async fn transition_from_the_wrong_stage_is_refused() {
    let scenario = ScenarioBuilder::default().build();
    let workflow = &scenario.workflow;

    let member = scenario.land_member().await;
    let err = workflow.approve_member(&member, &scenario.admin_pkhs(), &scenario.fee_payer()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
    let err = workflow.approve_proposal(&member, &scenario.admin_pkhs(), &scenario.fee_payer()).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidStateTransition);
}
