use crate::domain::model::StateKind;
use crate::domain::transaction::TransitionKind;
use crate::foundation::{AmbassadorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStage {
    Intent,
    /// Accepted; stays current until explicitly removed.
    Member,
    Rejected,
    Removed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStage {
    Intent,
    Proposal,
    SignOffApproval,
    Rejected,
    PaidOut,
}

const MEMBERSHIP_TRANSITIONS: &[(MembershipStage, TransitionKind, MembershipStage)] = &[
    (MembershipStage::Intent, TransitionKind::ApproveMember, MembershipStage::Member),
    (MembershipStage::Intent, TransitionKind::RejectMember, MembershipStage::Rejected),
    (MembershipStage::Member, TransitionKind::RemoveMember, MembershipStage::Removed),
];

const PROPOSAL_TRANSITIONS: &[(ProposalStage, TransitionKind, ProposalStage)] = &[
    (ProposalStage::Intent, TransitionKind::ApproveProposal, ProposalStage::Proposal),
    (ProposalStage::Intent, TransitionKind::RejectProposal, ProposalStage::Rejected),
    (ProposalStage::Proposal, TransitionKind::ApproveSignOff, ProposalStage::SignOffApproval),
    (ProposalStage::SignOffApproval, TransitionKind::SignOff, ProposalStage::PaidOut),
];

impl MembershipStage {
    pub fn can_transition_to(&self, next: MembershipStage) -> bool {
        MEMBERSHIP_TRANSITIONS.iter().any(|(from, _, to)| from == self && *to == next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn allowed_transitions(&self) -> Vec<TransitionKind> {
        MEMBERSHIP_TRANSITIONS.iter().filter(|(from, _, _)| from == self).map(|(_, kind, _)| *kind).collect()
    }

    pub fn apply(&self, transition: TransitionKind) -> Result<MembershipStage> {
        MEMBERSHIP_TRANSITIONS
            .iter()
            .find(|(from, kind, _)| from == self && *kind == transition)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| refused(self, transition))
    }
}

impl ProposalStage {
    pub fn can_transition_to(&self, next: ProposalStage) -> bool {
        PROPOSAL_TRANSITIONS.iter().any(|(from, _, to)| from == self && *to == next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    pub fn allowed_transitions(&self) -> Vec<TransitionKind> {
        PROPOSAL_TRANSITIONS.iter().filter(|(from, _, _)| from == self).map(|(_, kind, _)| *kind).collect()
    }

    pub fn apply(&self, transition: TransitionKind) -> Result<ProposalStage> {
        PROPOSAL_TRANSITIONS
            .iter()
            .find(|(from, kind, _)| from == self && *kind == transition)
            .map(|(_, _, to)| *to)
            .ok_or_else(|| refused(self, transition))
    }
}

/// Stage of either lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "lifecycle", content = "stage", rename_all = "snake_case")]
pub enum WorkflowStage {
    Membership(MembershipStage),
    Proposal(ProposalStage),
}

impl WorkflowStage {
    /// Stage represented by a live state token of `kind`. Oracle and Counter are not workflow records.
    pub fn of_state(kind: StateKind) -> Option<WorkflowStage> {
        match kind {
            StateKind::MembershipIntent => Some(WorkflowStage::Membership(MembershipStage::Intent)),
            StateKind::Member => Some(WorkflowStage::Membership(MembershipStage::Member)),
            StateKind::ProposalIntent => Some(WorkflowStage::Proposal(ProposalStage::Intent)),
            StateKind::Proposal => Some(WorkflowStage::Proposal(ProposalStage::Proposal)),
            StateKind::SignOffApproval => Some(WorkflowStage::Proposal(ProposalStage::SignOffApproval)),
            StateKind::Oracle | StateKind::Counter => None,
        }
    }

    /// Stage a transition starts from; `None` for the user-initiated creations.
    pub fn source_of(transition: TransitionKind) -> Option<WorkflowStage> {
        match transition {
            TransitionKind::ApplyMembership | TransitionKind::ProposeProject => None,
            TransitionKind::ApproveMember | TransitionKind::RejectMember => {
                Some(WorkflowStage::Membership(MembershipStage::Intent))
            }
            TransitionKind::RemoveMember => Some(WorkflowStage::Membership(MembershipStage::Member)),
            TransitionKind::ApproveProposal | TransitionKind::RejectProposal => {
                Some(WorkflowStage::Proposal(ProposalStage::Intent))
            }
            TransitionKind::ApproveSignOff => Some(WorkflowStage::Proposal(ProposalStage::Proposal)),
            TransitionKind::SignOff => Some(WorkflowStage::Proposal(ProposalStage::SignOffApproval)),
        }
    }

    /// Stage reached once `transition` lands on the ledger.
    pub fn target_of(transition: TransitionKind) -> WorkflowStage {
        match transition {
            TransitionKind::ApplyMembership => WorkflowStage::Membership(MembershipStage::Intent),
            TransitionKind::ProposeProject => WorkflowStage::Proposal(ProposalStage::Intent),
            TransitionKind::ApproveMember => WorkflowStage::Membership(MembershipStage::Member),
            TransitionKind::RejectMember => WorkflowStage::Membership(MembershipStage::Rejected),
            TransitionKind::RemoveMember => WorkflowStage::Membership(MembershipStage::Removed),
            TransitionKind::ApproveProposal => WorkflowStage::Proposal(ProposalStage::Proposal),
            TransitionKind::RejectProposal => WorkflowStage::Proposal(ProposalStage::Rejected),
            TransitionKind::ApproveSignOff => WorkflowStage::Proposal(ProposalStage::SignOffApproval),
            TransitionKind::SignOff => WorkflowStage::Proposal(ProposalStage::PaidOut),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            WorkflowStage::Membership(stage) => stage.is_terminal(),
            WorkflowStage::Proposal(stage) => stage.is_terminal(),
        }
    }

    pub fn allowed_transitions(&self) -> Vec<TransitionKind> {
        match self {
            WorkflowStage::Membership(stage) => stage.allowed_transitions(),
            WorkflowStage::Proposal(stage) => stage.allowed_transitions(),
        }
    }

    pub fn apply(&self, transition: TransitionKind) -> Result<WorkflowStage> {
        match self {
            WorkflowStage::Membership(stage) => stage.apply(transition).map(WorkflowStage::Membership),
            WorkflowStage::Proposal(stage) => stage.apply(transition).map(WorkflowStage::Proposal),
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStage::Membership(stage) => write!(f, "membership:{stage:?}"),
            WorkflowStage::Proposal(stage) => write!(f, "proposal:{stage:?}"),
        }
    }
}

fn refused(from: &impl fmt::Debug, transition: TransitionKind) -> AmbassadorError {
    AmbassadorError::InvalidStateTransition { from: format!("{from:?}"), to: transition.to_string() }
}
