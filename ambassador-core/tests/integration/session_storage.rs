use crate::fixtures::*;
use ambassador_core::application::{NoopObserver, SignatureCoordinator};
use ambassador_core::domain::signing::{SessionState, SigningSession};
use ambassador_core::domain::transition::{BuiltTransition, FeeParams, TransitionBuilder};
use ambassador_core::domain::{Address, StateKind};
use ambassador_core::foundation::NANOS_PER_SECOND;
use ambassador_core::infrastructure::ledger::MemoryLedger;
use ambassador_core::infrastructure::storage::{FileSessionStore, MemorySessionStore, SessionStore};
use std::sync::Arc;
use tempfile::TempDir;

fn candidate(counter_start: u64) -> BuiltTransition {
    let params = params();
    let payer = Address::Key(pkh_of(ADMIN_SEEDS[0]));
    TransitionBuilder::new(params.clone(), FeeParams::default())
        .approve_member(
            &oracle_utxo(&params, &admin_pkhs(), TEST_ADMIN_THRESHOLD),
            &counter_utxo(&params, counter_start),
            &membership_intent_utxo(&params, 0x31, pkh_of(APPLICANT_SEED)),
            &admin_pkhs(),
            &build_context(payer, vec![wallet_utxo(0x41, payer, WALLET_UTXO_COIN)]),
        )
        .expect("build")
}

fn exercise_store(store: &dyn SessionStore) {
    let later = SigningSession::open(&candidate(1), 2 * NANOS_PER_SECOND, 60);
    let earlier = SigningSession::open(&candidate(0), NANOS_PER_SECOND, 60);
    store.save(&later).expect("save later");
    store.save(&earlier).expect("save earlier");

    assert_eq!(store.get(&earlier.session_id).expect("get"), Some(earlier.clone()));
    let ids = store.list().expect("list").into_iter().map(|s| s.session_id).collect::<Vec<_>>();
    assert_eq!(ids, vec![earlier.session_id, later.session_id]);

    let mut done = later.clone();
    done.abandon("operator", 3 * NANOS_PER_SECOND).expect("abandon");
    store.save(&done).expect("overwrite");
    let open = store.list_open().expect("open");
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].session_id, earlier.session_id);

    assert!(store.delete(&earlier.session_id).expect("delete"));
    assert!(!store.delete(&earlier.session_id).expect("delete again"));
    assert!(store.get(&earlier.session_id).expect("get").is_none());
}

#[test]
fn memory_store_keeps_sessions_ordered() {
    exercise_store(&MemorySessionStore::new());
}

#[test]
fn file_store_keeps_sessions_ordered() {
    let dir = TempDir::new().expect("temp dir");
    exercise_store(&FileSessionStore::open(dir.path().join("sessions")).expect("open"));
}

#[test]
fn file_store_survives_reopen_and_skips_garbage() {
    let dir = TempDir::new().expect("temp dir");
    let session = SigningSession::open(&candidate(0), NANOS_PER_SECOND, 60);
    {
        let store = FileSessionStore::open(dir.path()).expect("open");
        store.save(&session).expect("save");
    }
    std::fs::write(dir.path().join("not-a-session.json"), b"{ broken").expect("write garbage");
    std::fs::write(dir.path().join("notes.txt"), b"ignored").expect("write other");

    let reopened = FileSessionStore::open(dir.path()).expect("reopen");
    assert_eq!(reopened.get(&session.session_id).expect("get"), Some(session.clone()));
    assert_eq!(reopened.list().expect("list"), vec![session]);
}

#[tokio::test]
async fn signing_resumes_from_a_persisted_session() {
    let dir = TempDir::new().expect("temp dir");
    let params = params();
    let ledger = Arc::new(MemoryLedger::new(params));
    let built = candidate(0);
    let admins = ADMIN_SEEDS.iter().map(|seed| signer(*seed)).collect::<Vec<_>>();

    let session_id = {
        let store = Arc::new(FileSessionStore::open(dir.path()).expect("open"));
        let coordinator = SignatureCoordinator::new(store, ledger.clone(), Arc::new(NoopObserver));
        let session = coordinator.open_session(&built).expect("open session");
        let progress = coordinator.sign(&session.session_id, &admins[0]).await.expect("sign A");
        assert_eq!(progress.collected(), 1);
        session.session_id
    };

    let store = Arc::new(FileSessionStore::open(dir.path()).expect("reopen"));
    let coordinator = SignatureCoordinator::new(store, ledger, Arc::new(NoopObserver));
    assert_eq!(coordinator.session(&session_id).expect("session").state, SessionState::PartiallySigned { signed: 1 });

    let progress = coordinator.sign(&session_id, &admins[2]).await.expect("sign C");
    assert!(progress.threshold_met);
    let session = coordinator.session(&session_id).expect("session");
    assert_eq!(session.state, SessionState::ThresholdReached);
    assert_eq!(session.successors.iter().map(|s| s.kind).collect::<Vec<_>>(), vec![StateKind::Counter, StateKind::Member]);
}
