use crate::fixtures::*;
use ambassador_core::application::SyncMonitor;
use ambassador_core::domain::{StateKind, TxOutput, Value};
use ambassador_core::foundation::ErrorCode;
use ambassador_core::infrastructure::indexer::{CachedIndexer, IndexContext, StateIndexer};
use ambassador_core::infrastructure::ledger::MemoryLedger;
use ambassador_core::infrastructure::signer::Signer;
use std::sync::Arc;
use std::time::Duration;

fn seeded() -> (Arc<MemoryLedger>, Arc<CachedIndexer>) {
    let params = params();
    let ledger = Arc::new(MemoryLedger::new(params.clone()));
    ledger.seed(oracle_output(&params, &admin_pkhs(), TEST_ADMIN_THRESHOLD)).expect("seed oracle");
    ledger.seed(counter_output(&params, 0)).expect("seed counter");
    ledger.seed(TxOutput::new(params.treasury_address(), Value::coin(1_000))).expect("seed treasury");
    let indexer = Arc::new(CachedIndexer::new(params, ledger.clone()));
    (ledger, indexer)
}

#[tokio::test]
async fn snapshots_stay_stale_until_synced() {
    let (ledger, indexer) = seeded();
    assert_eq!(indexer.get_by_context(&IndexContext::Treasury).await.expect("read").len(), 1);

    ledger.seed(TxOutput::new(params().treasury_address(), Value::coin(4_000))).expect("seed treasury");
    assert_eq!(indexer.get_by_context(&IndexContext::Treasury).await.expect("read").len(), 1);

    assert_eq!(indexer.sync(&IndexContext::Treasury).await.expect("sync"), 2);
    assert_eq!(indexer.get_by_context(&IndexContext::Treasury).await.expect("read").len(), 2);
}

#[tokio::test]
async fn state_context_holds_only_its_own_policy() {
    let (_, indexer) = seeded();
    let params = params();

    let oracles = indexer.get_by_context(&IndexContext::State(StateKind::Oracle)).await.expect("read");
    assert_eq!(oracles.len(), 1);
    assert!(oracles[0].value().has_asset(&params.oracle_token()));
    assert!(indexer.get_by_context(&IndexContext::State(StateKind::Member)).await.expect("read").is_empty());
}

#[tokio::test]
async fn sync_all_refreshes_every_context_read_so_far() {
    let (ledger, indexer) = seeded();
    let wallet = signer(ADMIN_SEEDS[0]).address();
    indexer.get_by_context(&IndexContext::Treasury).await.expect("read");
    indexer.get_by_context(&IndexContext::Wallet(wallet)).await.expect("read");

    ledger.seed(TxOutput::new(wallet, Value::coin(WALLET_UTXO_COIN))).expect("seed wallet");
    assert!(indexer.get_by_context(&IndexContext::Wallet(wallet)).await.expect("read").is_empty());

    assert_eq!(indexer.sync_all().await.expect("sync all"), 2);
    assert_eq!(indexer.get_by_context(&IndexContext::Wallet(wallet)).await.expect("read").len(), 1);
}

#[tokio::test]
async fn monitor_gives_up_after_max_attempts() {
    let (_, indexer) = seeded();
    let monitor = SyncMonitor::new(indexer, Duration::from_millis(1), 3);

    let attempt = monitor.wait_for(&IndexContext::Treasury, |utxos| utxos.len() == 1).await.expect("visible");
    assert_eq!(attempt, 1);

    let mut polls = 0;
    let err = monitor
        .wait_for(&IndexContext::Treasury, |_| {
            polls += 1;
            false
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Message);
    assert_eq!(polls, 3);
}
