use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity of an authenticated actor, supplied by the identity
/// provider at the boundary. The core never reads ambient session state;
/// every operation that needs an identity takes one of these explicitly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApproverId(pub String);

impl fmt::Display for ApproverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AreaId(pub String);

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Snapshot reference to an approver. Does not own the employee record;
/// `display_name` is captured at configuration time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverRef {
    pub approver_id: ApproverId,
    pub display_name: String,
}

impl ApproverRef {
    pub fn new(approver_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { approver_id: ApproverId(approver_id.into()), display_name: display_name.into() }
    }
}

/// An organizational unit whose configuration mandates certain approvers
/// for any request touching it. Order of `mandatory_approvers` is the
/// order they are appended to a request's approver list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedArea {
    pub id: AreaId,
    pub name: String,
    pub mandatory_approvers: Vec<ApproverRef>,
}
