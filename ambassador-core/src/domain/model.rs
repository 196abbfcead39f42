use crate::foundation::{AmbassadorError, AssetName, PolicyId, PubKeyHash, ScriptHash, TransactionId};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Ledger address: either a key hash (wallets) or a script hash (protocol state and treasury).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub enum Address {
    Key(PubKeyHash),
    Script(ScriptHash),
}

impl Address {
    pub fn key_hash(&self) -> Option<&PubKeyHash> {
        match self {
            Address::Key(pkh) => Some(pkh),
            Address::Script(_) => None,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Address::Script(_))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Key(pkh) => write!(f, "key:{}", pkh),
            Address::Script(hash) => write!(f, "script:{}", hash),
        }
    }
}

impl FromStr for Address {
    type Err = AmbassadorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix("key:") {
            return Ok(Address::Key(hex.parse()?));
        }
        if let Some(hex) = trimmed.strip_prefix("script:") {
            return Ok(Address::Script(hex.parse()?));
        }
        Err(AmbassadorError::EncodingError(format!("invalid address: {trimmed}")))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Native asset identity: minting policy plus asset name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct AssetId {
    pub policy: PolicyId,
    pub name: AssetName,
}

impl AssetId {
    pub const fn new(policy: PolicyId, name: AssetName) -> Self {
        Self { policy, name }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.policy, self.name)
    }
}

impl FromStr for AssetId {
    type Err = AmbassadorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (policy, name) =
            s.trim().split_once('.').ok_or_else(|| AmbassadorError::EncodingError(format!("invalid asset id: {s}")))?;
        Ok(AssetId { policy: policy.parse()?, name: name.parse()? })
    }
}

// String form so `AssetId` can key JSON maps.
impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Native coin plus a bag of native assets.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Value {
    pub coin: u64,
    #[serde(default)]
    pub assets: BTreeMap<AssetId, u64>,
}

impl Value {
    pub fn coin(coin: u64) -> Self {
        Self { coin, assets: BTreeMap::new() }
    }

    pub fn with_asset(mut self, asset: AssetId, quantity: u64) -> Self {
        if quantity > 0 {
            *self.assets.entry(asset).or_insert(0) += quantity;
        }
        self
    }

    pub fn quantity_of(&self, asset: &AssetId) -> u64 {
        self.assets.get(asset).copied().unwrap_or(0)
    }

    pub fn has_asset(&self, asset: &AssetId) -> bool {
        self.quantity_of(asset) > 0
    }

    pub fn is_empty(&self) -> bool {
        self.coin == 0 && self.assets.is_empty()
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.coin = out.coin.checked_add(other.coin)?;
        for (asset, qty) in &other.assets {
            let entry = out.assets.entry(*asset).or_insert(0);
            *entry = entry.checked_add(*qty)?;
        }
        Some(out)
    }

    /// Returns `None` if any component would go negative.
    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        let mut out = self.clone();
        out.coin = out.coin.checked_sub(other.coin)?;
        for (asset, qty) in &other.assets {
            let have = out.assets.get(asset).copied().unwrap_or(0);
            let left = have.checked_sub(*qty)?;
            if left == 0 {
                out.assets.remove(asset);
            } else {
                out.assets.insert(*asset, left);
            }
        }
        Some(out)
    }

    /// Splits off every asset matching `keep`, returning `(matching, rest)`.
    pub fn partition_assets(&self, keep: impl Fn(&AssetId) -> bool) -> (Value, Value) {
        let mut matching = Value::default();
        let mut rest = Value::coin(self.coin);
        for (asset, qty) in &self.assets {
            if keep(asset) {
                matching.assets.insert(*asset, *qty);
            } else {
                rest.assets.insert(*asset, *qty);
            }
        }
        (matching, rest)
    }

    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
        values.into_iter().try_fold(Value::default(), |acc, v| acc.checked_add(v))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OutputRef {
    pub tx_id: TransactionId,
    pub index: u32,
}

impl OutputRef {
    pub const fn new(tx_id: TransactionId, index: u32) -> Self {
        Self { tx_id, index }
    }
}

impl fmt::Display for OutputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
    #[serde(default)]
    pub datum: Option<StateDatum>,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self { address, value, datum: None }
    }

    pub fn with_datum(mut self, datum: StateDatum) -> Self {
        self.datum = Some(datum);
        self
    }
}

/// An unspent output together with its reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub outref: OutputRef,
    pub output: TxOutput,
}

impl Utxo {
    pub fn new(outref: OutputRef, output: TxOutput) -> Self {
        Self { outref, output }
    }

    pub fn address(&self) -> &Address {
        &self.output.address
    }

    pub fn value(&self) -> &Value {
        &self.output.value
    }

    pub fn datum(&self) -> Option<&StateDatum> {
        self.output.datum.as_ref()
    }
}

/// Which workflow record a state token represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Oracle,
    Counter,
    MembershipIntent,
    Member,
    ProposalIntent,
    Proposal,
    SignOffApproval,
}

impl StateKind {
    pub const ALL: [StateKind; 7] = [
        StateKind::Oracle,
        StateKind::Counter,
        StateKind::MembershipIntent,
        StateKind::Member,
        StateKind::ProposalIntent,
        StateKind::Proposal,
        StateKind::SignOffApproval,
    ];

    pub const fn label(&self) -> &'static str {
        match self {
            StateKind::Oracle => "oracle",
            StateKind::Counter => "counter",
            StateKind::MembershipIntent => "membership_intent",
            StateKind::Member => "member",
            StateKind::ProposalIntent => "proposal_intent",
            StateKind::Proposal => "proposal",
            StateKind::SignOffApproval => "sign_off_approval",
        }
    }

    /// Kinds that carry one proposal identity as it advances.
    pub const fn is_proposal_stage(&self) -> bool {
        matches!(self, StateKind::ProposalIntent | StateKind::Proposal | StateKind::SignOffApproval)
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct OracleDatum {
    pub admins: BTreeSet<PubKeyHash>,
    pub threshold: u16,
}

impl OracleDatum {
    pub fn is_admin(&self, pkh: &PubKeyHash) -> bool {
        self.admins.contains(pkh)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct CounterDatum {
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MemberMetadata {
    pub display_name: String,
    #[serde(default)]
    pub forum_handle: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MembershipIntentDatum {
    /// The applicant's proof token.
    pub token: AssetId,
    pub applicant: PubKeyHash,
    pub metadata: MemberMetadata,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct MemberDatum {
    pub token: AssetId,
    pub member_id: u64,
    pub holder: PubKeyHash,
    /// Paid-out proposal identity -> amount.
    #[serde(default)]
    pub completion: BTreeMap<AssetName, u64>,
    pub fund_received: u64,
    pub metadata: MemberMetadata,
}

/// Immutable part of a funding request; its hash is the proposal identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProposalTerms {
    pub title: String,
    /// Token name of the requesting member.
    pub requester: AssetName,
    pub fund_requested: u64,
    pub receiver: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProposalMetadata {
    pub description: String,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProposalIntentDatum {
    pub terms: ProposalTerms,
    pub metadata: ProposalMetadata,
    pub submitted_at_millis: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct ProposalDatum {
    pub terms: ProposalTerms,
    pub metadata: ProposalMetadata,
    pub submitted_at_millis: u64,
    pub approved_at_millis: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SignOffApprovalDatum {
    pub terms: ProposalTerms,
    pub metadata: ProposalMetadata,
    pub approved_at_millis: u64,
    pub sign_off_approved_at_millis: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StateDatum {
    Oracle(OracleDatum),
    Counter(CounterDatum),
    MembershipIntent(MembershipIntentDatum),
    Member(MemberDatum),
    ProposalIntent(ProposalIntentDatum),
    Proposal(ProposalDatum),
    SignOffApproval(SignOffApprovalDatum),
}

impl StateDatum {
    pub fn kind(&self) -> StateKind {
        match self {
            StateDatum::Oracle(_) => StateKind::Oracle,
            StateDatum::Counter(_) => StateKind::Counter,
            StateDatum::MembershipIntent(_) => StateKind::MembershipIntent,
            StateDatum::Member(_) => StateKind::Member,
            StateDatum::ProposalIntent(_) => StateKind::ProposalIntent,
            StateDatum::Proposal(_) => StateKind::Proposal,
            StateDatum::SignOffApproval(_) => StateKind::SignOffApproval,
        }
    }

    /// Proposal terms for any of the three proposal stages.
    pub fn proposal_terms(&self) -> Option<&ProposalTerms> {
        match self {
            StateDatum::ProposalIntent(d) => Some(&d.terms),
            StateDatum::Proposal(d) => Some(&d.terms),
            StateDatum::SignOffApproval(d) => Some(&d.terms),
            _ => None,
        }
    }
}
