//! Approval workflow state machine for asset requests.
//!
//! Allocation, maintenance, warranty and disposal requests pass through the
//! same three-step chain: department manager, then IT manager, then
//! director. Which role may act in which state, and where each action leads,
//! is a single lookup table ([`TRANSITIONS`]); nothing else in the code base
//! compares state strings.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Kind of request travelling through the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Allocation,
    Maintenance,
    Warranty,
    Disposal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalState {
    Pending,
    #[serde(rename = "IN_PROGRESS_STEP_1")]
    InProgressStep1,
    #[serde(rename = "IN_PROGRESS_STEP_2")]
    InProgressStep2,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Employee,
    DepartmentManager,
    ItManager,
    Director,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalAction {
    Approve,
    Reject,
}

impl ApprovalState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgressStep1 => "IN_PROGRESS_STEP_1",
            Self::InProgressStep2 => "IN_PROGRESS_STEP_2",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    /// Parse the backend's `CurrentState` column.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS_STEP_1" => Ok(Self::InProgressStep1),
            "IN_PROGRESS_STEP_2" => Ok(Self::InProgressStep2),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(CoreError::Validation(format!(
                "Invalid approval state '{s}'"
            ))),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// 1-based number of the approval step awaiting a decision, if any.
    pub fn step_number(self) -> Option<u8> {
        match self {
            Self::Pending => Some(1),
            Self::InProgressStep1 => Some(2),
            Self::InProgressStep2 => Some(3),
            Self::Approved | Self::Rejected => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// One row of the transition table: in `from`, `role` performing `action`
/// moves the request to `to`. [`Role::Admin`] is handled separately and may
/// act wherever any role may.
pub struct Transition {
    pub from: ApprovalState,
    pub role: Role,
    pub action: ApprovalAction,
    pub to: ApprovalState,
}

pub const TRANSITIONS: &[Transition] = &[
    Transition {
        from: ApprovalState::Pending,
        role: Role::DepartmentManager,
        action: ApprovalAction::Approve,
        to: ApprovalState::InProgressStep1,
    },
    Transition {
        from: ApprovalState::Pending,
        role: Role::DepartmentManager,
        action: ApprovalAction::Reject,
        to: ApprovalState::Rejected,
    },
    Transition {
        from: ApprovalState::InProgressStep1,
        role: Role::ItManager,
        action: ApprovalAction::Approve,
        to: ApprovalState::InProgressStep2,
    },
    Transition {
        from: ApprovalState::InProgressStep1,
        role: Role::ItManager,
        action: ApprovalAction::Reject,
        to: ApprovalState::Rejected,
    },
    Transition {
        from: ApprovalState::InProgressStep2,
        role: Role::Director,
        action: ApprovalAction::Approve,
        to: ApprovalState::Approved,
    },
    Transition {
        from: ApprovalState::InProgressStep2,
        role: Role::Director,
        action: ApprovalAction::Reject,
        to: ApprovalState::Rejected,
    },
];

fn lookup(state: ApprovalState, action: ApprovalAction) -> Option<&'static Transition> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == state && t.action == action)
}

/// Roles allowed to decide a request in `state`. Empty for terminal states.
pub fn eligible_roles(state: ApprovalState) -> Vec<Role> {
    let mut roles: Vec<Role> = Vec::new();
    for t in TRANSITIONS.iter().filter(|t| t.from == state) {
        if !roles.contains(&t.role) {
            roles.push(t.role);
        }
    }
    if !roles.is_empty() {
        roles.push(Role::Admin);
    }
    roles
}

pub fn can_act(state: ApprovalState, role: Role) -> bool {
    eligible_roles(state).contains(&role)
}

/// Next state for `role` performing `action` in `state`.
pub fn transition(
    state: ApprovalState,
    role: Role,
    action: ApprovalAction,
) -> Result<ApprovalState, CoreError> {
    if state.is_terminal() {
        return Err(CoreError::Conflict(format!(
            "Request is already {} and cannot change",
            state.as_str()
        )));
    }

    let row = lookup(state, action).ok_or_else(|| {
        CoreError::Validation(format!(
            "No transition for {action:?} from {}",
            state.as_str()
        ))
    })?;

    if role != row.role && role != Role::Admin {
        return Err(CoreError::Forbidden(format!(
            "Role {role:?} cannot act on a request in {}",
            state.as_str()
        )));
    }

    Ok(row.to)
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An approval request as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    #[serde(rename = "RequestID")]
    pub id: DbId,
    #[serde(rename = "RequestType")]
    pub kind: RequestKind,
    #[serde(rename = "CurrentState")]
    pub state: ApprovalState,
    #[serde(rename = "RequestedBy", default)]
    pub requested_by: Option<DbId>,
}

impl ApprovalRequest {
    /// Apply a decision, leaving the request untouched on error.
    pub fn decide(
        &mut self,
        role: Role,
        action: ApprovalAction,
    ) -> Result<ApprovalState, CoreError> {
        self.state = transition(self.state, role, action)?;
        Ok(self.state)
    }

    /// Whether `role` should be offered approve/reject controls.
    pub fn awaits(&self, role: Role) -> bool {
        can_act(self.state, role)
    }
}
