#![allow(dead_code)]

use crate::fixtures::{
    admin_pkhs, counter_output, oracle_output, params, proof_token, signer, ADMIN_SEEDS, APPLICANT_SEED, OUTSIDER_SEED,
    PROOF_UTXO_COIN, TEST_ADMIN_THRESHOLD, TEST_INSTANCE, WALLET_UTXO_COIN,
};
use ambassador_core::application::{
    AmbassadorWorkflow, FinalizedTransition, NoopObserver, PendingTransition, WorkflowServices,
};
use ambassador_core::domain::{Address, AssetId, ProtocolParams, StateKind, TxOutput, Utxo, Value};
use ambassador_core::foundation::{PubKeyHash, SessionId};
use ambassador_core::infrastructure::config::AppConfig;
use ambassador_core::infrastructure::indexer::CachedIndexer;
use ambassador_core::infrastructure::ledger::MemoryLedger;
use ambassador_core::infrastructure::signer::{KeypairSigner, Signer};
use ambassador_core::infrastructure::storage::MemorySessionStore;
use std::sync::Arc;

/// A seeded in-memory deployment: Oracle, Counter, treasury, funded admin
/// wallets and an applicant holding a proof token.
pub struct Scenario {
    pub config: AppConfig,
    pub params: ProtocolParams,
    pub ledger: Arc<MemoryLedger>,
    pub indexer: Arc<CachedIndexer>,
    pub store: Arc<MemorySessionStore>,
    pub workflow: AmbassadorWorkflow,
    pub admins: Vec<KeypairSigner>,
    pub applicant: KeypairSigner,
    pub outsider: KeypairSigner,
}

pub struct ScenarioBuilder {
    threshold: u16,
    counter_start: u64,
    treasury: Vec<u64>,
    session_ttl_secs: u64,
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self { threshold: TEST_ADMIN_THRESHOLD, counter_start: 0, treasury: vec![5_000], session_ttl_secs: 3_600 }
    }
}

impl ScenarioBuilder {
    pub fn threshold(mut self, threshold: u16) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn counter_start(mut self, counter_start: u64) -> Self {
        self.counter_start = counter_start;
        self
    }

    pub fn treasury(mut self, treasury: &[u64]) -> Self {
        self.treasury = treasury.to_vec();
        self
    }

    pub fn session_ttl_secs(mut self, session_ttl_secs: u64) -> Self {
        self.session_ttl_secs = session_ttl_secs;
        self
    }

    pub fn build(self) -> Scenario {
        let mut config = AppConfig::default();
        config.protocol.instance = TEST_INSTANCE.to_string();
        config.signing.session_ttl_secs = self.session_ttl_secs;
        config.indexer.poll_interval_ms = 1;
        config.indexer.max_sync_attempts = 3;

        let params = params();
        let ledger = Arc::new(MemoryLedger::new(params.clone()));
        ledger.seed(oracle_output(&params, &admin_pkhs(), self.threshold)).expect("seed oracle");
        ledger.seed(counter_output(&params, self.counter_start)).expect("seed counter");
        for coin in &self.treasury {
            ledger.seed(TxOutput::new(params.treasury_address(), Value::coin(*coin))).expect("seed treasury");
        }

        let admins = ADMIN_SEEDS.iter().map(|seed| signer(*seed)).collect::<Vec<_>>();
        let applicant = signer(APPLICANT_SEED);
        let outsider = signer(OUTSIDER_SEED);
        for wallet in admins.iter().chain([&applicant, &outsider]) {
            for _ in 0..2 {
                ledger.seed(TxOutput::new(wallet.address(), Value::coin(WALLET_UTXO_COIN))).expect("seed wallet");
            }
        }
        ledger
            .seed(TxOutput::new(applicant.address(), Value::coin(PROOF_UTXO_COIN).with_asset(proof_token(), 1)))
            .expect("seed proof token");

        let indexer = Arc::new(CachedIndexer::new(params.clone(), ledger.clone()));
        let store = Arc::new(MemorySessionStore::new());
        let services = WorkflowServices {
            indexer: indexer.clone(),
            fetcher: ledger.clone(),
            submitter: ledger.clone(),
            store: store.clone(),
            observer: Arc::new(NoopObserver),
        };
        let workflow = AmbassadorWorkflow::new(&config, services);

        Scenario { config, params, ledger, indexer, store, workflow, admins, applicant, outsider }
    }
}

impl Scenario {
    pub fn admin_pkhs(&self) -> Vec<PubKeyHash> {
        self.admins.iter().map(|admin| admin.pub_key_hash()).collect()
    }

    /// Admin A pays fees for admin transitions, so A must be among the signers.
    pub fn fee_payer(&self) -> Address {
        self.admins[0].address()
    }

    pub async fn sign_with(&self, session_id: &SessionId, signers: &[&KeypairSigner]) {
        for signer in signers {
            self.workflow.sign(session_id, *signer).await.expect("sign");
        }
    }

    /// Signs with admins A and B, then finalizes.
    pub async fn approve_with_quorum(&self, pending: &PendingTransition) -> FinalizedTransition {
        let session_id = pending.session_id();
        self.sign_with(&session_id, &[&self.admins[0], &self.admins[1]]).await;
        self.workflow.finalize(&session_id).await.expect("finalize")
    }

    /// Applies for membership with the proof token and lands the intent.
    pub async fn land_membership_intent(&self) -> AssetId {
        let application = ambassador_core::domain::transition::MembershipApplication {
            proof_token: proof_token(),
            metadata: crate::fixtures::member_metadata(),
        };
        let pending = self.workflow.apply_membership(&self.applicant.address(), application).await.expect("apply");
        self.sign_with(&pending.session_id(), &[&self.applicant]).await;
        let finalized = self.workflow.finalize(&pending.session_id()).await.expect("finalize apply");
        successor_token(&finalized, StateKind::MembershipIntent)
    }

    /// Runs apply + approve and returns the new member's token.
    pub async fn land_member(&self) -> AssetId {
        let intent = self.land_membership_intent().await;
        let pending = self.workflow.approve_member(&intent, &self.admin_pkhs(), &self.fee_payer()).await.expect("approve member");
        let finalized = self.approve_with_quorum(&pending).await;
        successor_token(&finalized, StateKind::Member)
    }

    pub fn live_with(&self, token: &AssetId) -> Vec<Utxo> {
        self.ledger.utxos().expect("utxos").into_iter().filter(|utxo| utxo.value().has_asset(token)).collect()
    }
}

pub fn successor_token(finalized: &FinalizedTransition, kind: StateKind) -> AssetId {
    finalized.successors.iter().find(|out| out.kind == kind).map(|out| out.token).expect("successor token")
}
