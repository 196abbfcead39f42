use crate::domain::hashes::{member_identity, membership_intent_identity, proposal_identity};
use crate::domain::model::{
    Address, AssetId, CounterDatum, MemberDatum, MembershipIntentDatum, OracleDatum, ProposalDatum, ProposalIntentDatum,
    ProposalTerms, SignOffApprovalDatum, StateDatum, StateKind, TxOutput, Utxo, Value,
};
use crate::domain::protocol::ProtocolParams;
use crate::domain::transaction::TransitionKind;
use crate::domain::transition::assembler::TxAssembler;
use crate::domain::transition::fee::select_treasury;
use crate::domain::transition::params::{BuildContext, FeeParams, MembershipApplication, ProjectProposal};
use crate::domain::transition::results::BuiltTransition;
use crate::domain::transition::validation::{validate_member_metadata, validate_proposal};
use crate::foundation::{AmbassadorError, PubKeyHash, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Reads the state token and typed datum of `$utxo`, or returns from the caller.
macro_rules! expect_datum {
    ($params:expr, $utxo:expr, $kind:ident) => {
        match $params.expect_state($utxo, StateKind::$kind)? {
            (token, StateDatum::$kind(datum)) => (token, datum),
            _ => return Err(AmbassadorError::invalid_datum($utxo.outref, StateKind::$kind.label())),
        }
    };
}

/// Builds one unsigned candidate transaction per named transition.
///
/// Every state UTXO passed in is checked to carry the expected token and
/// datum before anything is assembled; the Oracle is always attached as a
/// reference input. The builder neither signs nor submits.
#[derive(Clone, Debug)]
pub struct TransitionBuilder {
    params: ProtocolParams,
    fees: FeeParams,
}

impl TransitionBuilder {
    pub fn new(params: ProtocolParams, fees: FeeParams) -> Self {
        Self { params, fees }
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn fees(&self) -> &FeeParams {
        &self.fees
    }

    /// User-initiated: creates a MembershipIntent bound to the applicant's proof token.
    pub fn apply_membership(
        &self,
        oracle: &Utxo,
        proof: &Utxo,
        application: MembershipApplication,
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        self.oracle(oracle)?;
        let applicant = self.proof_owner(proof, &application.proof_token)?;
        validate_member_metadata(&application.metadata)?;

        let token = self.params.state_token(StateKind::MembershipIntent, membership_intent_identity(&application.proof_token));
        let datum = StateDatum::MembershipIntent(MembershipIntentDatum {
            token: application.proof_token,
            applicant,
            metadata: application.metadata,
        });

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::ApplyMembership);
        asm.reference(oracle)
            .spend(proof)
            .pay(TxOutput::new(*proof.address(), proof.value().clone()))
            .mint_state(StateKind::MembershipIntent, token, self.state_output(StateKind::MembershipIntent, token, Value::default(), datum))
            .authorize(BTreeSet::from([applicant]), 1);
        asm.finish(ctx)
    }

    /// Consumes the intent and the Counter; the member id is the counter's current value.
    pub fn approve_member(
        &self,
        oracle: &Utxo,
        counter: &Utxo,
        intent: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (counter_token, counter_datum) = expect_datum!(self.params, counter, Counter);
        let (intent_token, intent_datum) = expect_datum!(self.params, intent, MembershipIntent);

        let member_id = counter_datum.count;
        let next = member_id.checked_add(1).ok_or_else(|| AmbassadorError::build_error("counter", "counter overflow"))?;
        let member_token = self.params.state_token(StateKind::Member, member_identity(self.params.instance(), member_id));

        let counter_out = self.state_output(
            StateKind::Counter,
            counter_token,
            self.unrelated(counter),
            StateDatum::Counter(CounterDatum { count: next }),
        );
        let member_out = self.state_output(
            StateKind::Member,
            member_token,
            self.unrelated(intent),
            StateDatum::Member(MemberDatum {
                token: member_token,
                member_id,
                holder: intent_datum.applicant,
                completion: BTreeMap::new(),
                fund_received: 0,
                metadata: intent_datum.metadata.clone(),
            }),
        );

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::ApproveMember);
        asm.reference(oracle)
            .spend(counter)
            .spend(intent)
            .burn(intent_token)
            .continue_state(StateKind::Counter, counter_token, counter_out)
            .mint_state(StateKind::Member, member_token, member_out)
            .authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    /// Burns a MembershipIntent without creating a Member.
    pub fn reject_member(
        &self,
        oracle: &Utxo,
        intent: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (intent_token, intent_datum) = expect_datum!(self.params, intent, MembershipIntent);

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::RejectMember);
        asm.reference(oracle).spend(intent).burn(intent_token);
        self.refund_unrelated(&mut asm, intent, Address::Key(intent_datum.applicant));
        asm.authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    pub fn remove_member(
        &self,
        oracle: &Utxo,
        member: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (member_token, member_datum) = expect_datum!(self.params, member, Member);

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::RemoveMember);
        asm.reference(oracle).spend(member).burn(member_token);
        self.refund_unrelated(&mut asm, member, Address::Key(member_datum.holder));
        asm.authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    /// User-initiated: a member files a funding request. The Member record is
    /// referenced, not spent.
    pub fn propose_project(
        &self,
        oracle: &Utxo,
        proof: &Utxo,
        member: &Utxo,
        proposal: ProjectProposal,
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        self.oracle(oracle)?;
        let owner = self.proof_owner(proof, &proposal.proof_token)?;
        let (member_token, member_datum) = expect_datum!(self.params, member, Member);
        if member_datum.holder != owner {
            return Err(AmbassadorError::missing_utxo("member record held by the proposer", member.outref));
        }
        validate_proposal(&proposal.title, proposal.fund_requested, &proposal.metadata)?;

        let terms = ProposalTerms {
            title: proposal.title,
            requester: member_token.name,
            fund_requested: proposal.fund_requested,
            receiver: proposal.receiver,
        };
        let token = self.params.state_token(StateKind::ProposalIntent, proposal_identity(&terms));
        let datum = StateDatum::ProposalIntent(ProposalIntentDatum {
            terms,
            metadata: proposal.metadata,
            submitted_at_millis: ctx.now_millis,
        });

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::ProposeProject);
        asm.reference(oracle)
            .reference(member)
            .spend(proof)
            .pay(TxOutput::new(*proof.address(), proof.value().clone()))
            .mint_state(StateKind::ProposalIntent, token, self.state_output(StateKind::ProposalIntent, token, Value::default(), datum))
            .authorize(BTreeSet::from([owner]), 1);
        asm.finish(ctx)
    }

    pub fn approve_proposal(
        &self,
        oracle: &Utxo,
        intent: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (intent_token, intent_datum) = expect_datum!(self.params, intent, ProposalIntent);
        self.check_identity(intent, &intent_token, &intent_datum.terms)?;

        let token = self.params.state_token(StateKind::Proposal, intent_token.name);
        let datum = StateDatum::Proposal(ProposalDatum {
            terms: intent_datum.terms.clone(),
            metadata: intent_datum.metadata.clone(),
            submitted_at_millis: intent_datum.submitted_at_millis,
            approved_at_millis: ctx.now_millis,
        });

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::ApproveProposal);
        asm.reference(oracle)
            .spend(intent)
            .burn(intent_token)
            .mint_state(StateKind::Proposal, token, self.state_output(StateKind::Proposal, token, self.unrelated(intent), datum))
            .authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    pub fn reject_proposal(
        &self,
        oracle: &Utxo,
        intent: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (intent_token, intent_datum) = expect_datum!(self.params, intent, ProposalIntent);

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::RejectProposal);
        asm.reference(oracle).spend(intent).burn(intent_token);
        self.refund_unrelated(&mut asm, intent, intent_datum.terms.receiver);
        asm.authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    pub fn approve_sign_off(
        &self,
        oracle: &Utxo,
        proposal: &Utxo,
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (proposal_token, proposal_datum) = expect_datum!(self.params, proposal, Proposal);
        self.check_identity(proposal, &proposal_token, &proposal_datum.terms)?;

        let token = self.params.state_token(StateKind::SignOffApproval, proposal_token.name);
        let datum = StateDatum::SignOffApproval(SignOffApprovalDatum {
            terms: proposal_datum.terms.clone(),
            metadata: proposal_datum.metadata.clone(),
            approved_at_millis: proposal_datum.approved_at_millis,
            sign_off_approved_at_millis: ctx.now_millis,
        });

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::ApproveSignOff);
        asm.reference(oracle)
            .spend(proposal)
            .burn(proposal_token)
            .mint_state(
                StateKind::SignOffApproval,
                token,
                self.state_output(StateKind::SignOffApproval, token, self.unrelated(proposal), datum),
            )
            .authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    /// Pays the receiver from the treasury, records the payout on the
    /// requesting Member and burns the SignOffApproval token.
    pub fn sign_off(
        &self,
        oracle: &Utxo,
        approval: &Utxo,
        member: &Utxo,
        treasury: &[Utxo],
        required_signers: &[PubKeyHash],
        ctx: &BuildContext,
    ) -> Result<BuiltTransition> {
        let oracle_datum = self.oracle(oracle)?;
        let signers = self.admin_signers(oracle_datum, required_signers)?;
        let (approval_token, approval_datum) = expect_datum!(self.params, approval, SignOffApproval);
        let (member_token, member_datum) = expect_datum!(self.params, member, Member);
        self.check_identity(approval, &approval_token, &approval_datum.terms)?;

        let terms = &approval_datum.terms;
        if member_token.name != terms.requester {
            return Err(AmbassadorError::missing_utxo("requesting member", member.outref));
        }
        if member_datum.completion.contains_key(&approval_token.name) {
            return Err(AmbassadorError::build_error("sign_off", format!("proposal {} already paid out", approval_token.name)));
        }

        let treasury_address = self.params.treasury_address();
        if treasury.is_empty() {
            return Err(AmbassadorError::missing_utxo("treasury utxo", treasury_address));
        }
        if let Some(stray) = treasury.iter().find(|u| *u.address() != treasury_address) {
            return Err(AmbassadorError::missing_utxo("treasury utxo at the treasury address", stray.outref));
        }
        let (selected, treasury_total) = select_treasury(treasury, terms.fund_requested)?;
        let treasury_change = treasury_total
            .checked_sub(&Value::coin(terms.fund_requested))
            .ok_or_else(|| AmbassadorError::build_error("treasury", "treasury change underflow"))?;

        let mut updated = member_datum.clone();
        updated.completion.insert(approval_token.name, terms.fund_requested);
        updated.fund_received = updated
            .fund_received
            .checked_add(terms.fund_requested)
            .ok_or_else(|| AmbassadorError::build_error("sign_off", "fund_received overflow"))?;
        let member_out = self.state_output(StateKind::Member, member_token, self.unrelated(member), StateDatum::Member(updated));

        let mut payment = Value::coin(terms.fund_requested);
        for (asset, qty) in self.unrelated(approval).assets {
            payment = payment.with_asset(asset, qty);
        }

        let mut asm = TxAssembler::new(&self.fees, TransitionKind::SignOff);
        asm.reference(oracle).spend(approval).burn(approval_token).spend(member);
        for utxo in &selected {
            asm.spend(utxo);
        }
        asm.continue_state(StateKind::Member, member_token, member_out).pay(TxOutput::new(terms.receiver, payment));
        if !treasury_change.is_empty() {
            asm.pay(TxOutput::new(treasury_address, treasury_change));
        }
        asm.authorize(signers, oracle_datum.threshold);
        asm.finish(ctx)
    }

    fn oracle<'a>(&self, oracle: &'a Utxo) -> Result<&'a OracleDatum> {
        let (_, datum) = expect_datum!(self.params, oracle, Oracle);
        Ok(datum)
    }

    fn admin_signers(&self, oracle: &OracleDatum, required_signers: &[PubKeyHash]) -> Result<BTreeSet<PubKeyHash>> {
        let signers = required_signers.iter().copied().collect::<BTreeSet<_>>();
        if let Some(outsider) = signers.iter().find(|pkh| !oracle.is_admin(pkh)) {
            return Err(AmbassadorError::build_error(
                "authorization",
                format!("required signer {outsider} is not an oracle admin"),
            ));
        }
        if oracle.threshold == 0 || signers.len() < oracle.threshold as usize {
            return Err(AmbassadorError::build_error(
                "authorization",
                format!("{} designated signers cannot reach threshold {}", signers.len(), oracle.threshold),
            ));
        }
        Ok(signers)
    }

    fn proof_owner(&self, proof: &Utxo, token: &AssetId) -> Result<PubKeyHash> {
        if !proof.value().has_asset(token) {
            return Err(AmbassadorError::missing_utxo(format!("proof token {token}"), proof.outref));
        }
        proof
            .address()
            .key_hash()
            .copied()
            .ok_or_else(|| AmbassadorError::missing_utxo("proof token at a wallet address", proof.outref))
    }

    fn check_identity(&self, utxo: &Utxo, token: &AssetId, terms: &ProposalTerms) -> Result<()> {
        if proposal_identity(terms) != token.name {
            return Err(AmbassadorError::invalid_datum(utxo.outref, "proposal terms matching the token identity"));
        }
        Ok(())
    }

    /// Non-protocol assets riding on a consumed state UTXO.
    fn unrelated(&self, utxo: &Utxo) -> Value {
        let (unrelated, _) = utxo.value().partition_assets(|asset| !self.params.is_state_asset(asset));
        unrelated
    }

    fn refund_unrelated(&self, asm: &mut TxAssembler<'_>, utxo: &Utxo, owner: Address) {
        let unrelated = self.unrelated(utxo);
        if unrelated.assets.is_empty() {
            return;
        }
        let mut value = Value::coin(utxo.value().coin);
        value.assets = unrelated.assets;
        asm.pay(TxOutput::new(owner, value));
    }

    fn state_output(&self, kind: StateKind, token: AssetId, carry: Value, datum: StateDatum) -> TxOutput {
        let mut value = Value::coin(self.fees.min_state_value).with_asset(token, 1);
        for (asset, qty) in carry.assets {
            value = value.with_asset(asset, qty);
        }
        TxOutput::new(self.params.address(kind), value).with_datum(datum)
    }
}
