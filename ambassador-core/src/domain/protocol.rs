use crate::domain::hashes::{policy_id, script_hash, singleton_name, treasury_script_hash};
use crate::domain::model::{Address, AssetId, StateDatum, StateKind, Utxo};
use crate::foundation::{AmbassadorError, AssetName, PolicyId, Result};
use std::collections::BTreeMap;

/// Policy ids and script addresses of one protocol deployment.
///
/// Everything is derived from the instance tag, so two processes configured
/// with the same tag agree on every identifier without exchanging data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    instance: String,
    policies: BTreeMap<StateKind, PolicyId>,
    addresses: BTreeMap<StateKind, Address>,
    treasury: Address,
    oracle_name: AssetName,
    counter_name: AssetName,
}

impl ProtocolParams {
    pub fn derive(instance: &str) -> Self {
        let policies = StateKind::ALL.iter().map(|kind| (*kind, policy_id(instance, *kind))).collect();
        let addresses = StateKind::ALL.iter().map(|kind| (*kind, Address::Script(script_hash(instance, *kind)))).collect();
        Self {
            instance: instance.to_string(),
            policies,
            addresses,
            treasury: Address::Script(treasury_script_hash(instance)),
            oracle_name: singleton_name(instance, StateKind::Oracle),
            counter_name: singleton_name(instance, StateKind::Counter),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn policy(&self, kind: StateKind) -> PolicyId {
        // Every kind is populated in `derive`.
        self.policies.get(&kind).copied().unwrap_or_else(|| policy_id(&self.instance, kind))
    }

    pub fn address(&self, kind: StateKind) -> Address {
        self.addresses.get(&kind).copied().unwrap_or_else(|| Address::Script(script_hash(&self.instance, kind)))
    }

    pub fn treasury_address(&self) -> Address {
        self.treasury
    }

    pub fn oracle_token(&self) -> AssetId {
        AssetId::new(self.policy(StateKind::Oracle), self.oracle_name)
    }

    pub fn counter_token(&self) -> AssetId {
        AssetId::new(self.policy(StateKind::Counter), self.counter_name)
    }

    pub fn state_token(&self, kind: StateKind, name: AssetName) -> AssetId {
        AssetId::new(self.policy(kind), name)
    }

    pub fn kind_of_policy(&self, policy: &PolicyId) -> Option<StateKind> {
        self.policies.iter().find(|(_, p)| *p == policy).map(|(kind, _)| *kind)
    }

    pub fn is_state_asset(&self, asset: &AssetId) -> bool {
        self.kind_of_policy(&asset.policy).is_some()
    }

    /// The state token carried by `utxo` of the given kind, if any.
    pub fn find_state_token(&self, utxo: &Utxo, kind: StateKind) -> Option<AssetId> {
        let policy = self.policy(kind);
        utxo.value().assets.iter().find(|(asset, qty)| asset.policy == policy && **qty > 0).map(|(asset, _)| *asset)
    }

    /// Checks that `utxo` sits at the kind's script address, holds its state
    /// token and carries a datum of the matching variant.
    pub fn expect_state<'a>(&self, utxo: &'a Utxo, kind: StateKind) -> Result<(AssetId, &'a StateDatum)> {
        let token = self
            .find_state_token(utxo, kind)
            .ok_or_else(|| AmbassadorError::missing_utxo(format!("{kind} state token"), utxo.outref))?;
        if *utxo.address() != self.address(kind) {
            return Err(AmbassadorError::missing_utxo(format!("{kind} at its script address"), utxo.outref));
        }
        match utxo.datum() {
            Some(datum) if datum.kind() == kind => Ok((token, datum)),
            _ => Err(AmbassadorError::invalid_datum(utxo.outref, format!("{kind} datum"))),
        }
    }
}
