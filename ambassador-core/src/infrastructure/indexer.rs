//! Cached, context-keyed view over the UTXO set.
//!
//! Reads are served from the last snapshot taken for a context; nothing is
//! refreshed until `sync` is called, so callers see a possibly stale view
//! and the ledger stays the final arbiter.

use crate::domain::{Address, AssetId, ProtocolParams, StateKind, Utxo};
use crate::foundation::Result;
use crate::infrastructure::ledger::UtxoFetcher;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IndexContext {
    /// Live records of one workflow kind, located by their state policy.
    State(StateKind),
    Treasury,
    Wallet(Address),
    Token(AssetId),
}

impl fmt::Display for IndexContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexContext::State(kind) => write!(f, "state:{kind}"),
            IndexContext::Treasury => f.write_str("treasury"),
            IndexContext::Wallet(address) => write!(f, "wallet:{address}"),
            IndexContext::Token(asset) => write!(f, "token:{asset}"),
        }
    }
}

#[async_trait]
pub trait StateIndexer: Send + Sync {
    async fn get_by_context(&self, context: &IndexContext) -> Result<Vec<Utxo>>;
    /// Refreshes the snapshot for `context`, returning how many UTXOs it now holds.
    async fn sync(&self, context: &IndexContext) -> Result<usize>;
    /// Refreshes every context read so far.
    async fn sync_all(&self) -> Result<usize>;
}

pub struct CachedIndexer {
    params: ProtocolParams,
    fetcher: Arc<dyn UtxoFetcher>,
    snapshots: RwLock<HashMap<IndexContext, Vec<Utxo>>>,
}

impl CachedIndexer {
    pub fn new(params: ProtocolParams, fetcher: Arc<dyn UtxoFetcher>) -> Self {
        Self { params, fetcher, snapshots: RwLock::new(HashMap::new()) }
    }

    async fn fetch(&self, context: &IndexContext) -> Result<Vec<Utxo>> {
        let mut utxos = match context {
            IndexContext::State(kind) => {
                let policy = self.params.policy(*kind);
                self.fetcher
                    .fetch_by_address(&self.params.address(*kind))
                    .await?
                    .into_iter()
                    .filter(|utxo| utxo.value().assets.keys().any(|asset| asset.policy == policy))
                    .collect()
            }
            IndexContext::Treasury => self.fetcher.fetch_by_address(&self.params.treasury_address()).await?,
            IndexContext::Wallet(address) => self.fetcher.fetch_by_address(address).await?,
            IndexContext::Token(asset) => self.fetcher.fetch_by_asset(asset).await?,
        };
        utxos.sort_by_key(|utxo| utxo.outref);
        Ok(utxos)
    }
}

#[async_trait]
impl StateIndexer for CachedIndexer {
    async fn get_by_context(&self, context: &IndexContext) -> Result<Vec<Utxo>> {
        if let Some(snapshot) = self.snapshots.read().await.get(context) {
            return Ok(snapshot.clone());
        }
        self.sync(context).await?;
        Ok(self.snapshots.read().await.get(context).cloned().unwrap_or_default())
    }

    async fn sync(&self, context: &IndexContext) -> Result<usize> {
        let utxos = self.fetch(context).await?;
        let count = utxos.len();
        self.snapshots.write().await.insert(context.clone(), utxos);
        debug!("indexer synced context={} utxos={}", context, count);
        Ok(count)
    }

    async fn sync_all(&self) -> Result<usize> {
        let contexts = self.snapshots.read().await.keys().cloned().collect::<Vec<_>>();
        for context in &contexts {
            self.sync(context).await?;
        }
        Ok(contexts.len())
    }
}
