use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task application.
///
/// Statuses the engine does not recognise are kept verbatim in `Unknown`
/// so that records round-trip untouched; the engine treats them as having
/// no outgoing transitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApplicationStatus {
    Applied,
    Accepted,
    Rejected,
    Withdrawn,
    Completed,
    InProgress,
    Unknown(String),
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Applied => "APPLIED",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
            Self::Completed => "COMPLETED",
            Self::InProgress => "IN_PROGRESS",
            Self::Unknown(raw) => raw,
        }
    }

    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Withdrawn | Self::Completed)
    }
}

impl From<&str> for ApplicationStatus {
    fn from(value: &str) -> Self {
        match value {
            "APPLIED" => Self::Applied,
            "ACCEPTED" => Self::Accepted,
            "REJECTED" => Self::Rejected,
            "WITHDRAWN" => Self::Withdrawn,
            "COMPLETED" => Self::Completed,
            "IN_PROGRESS" => Self::InProgress,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ApplicationStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ApplicationStatus> for String {
    fn from(status: ApplicationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the actor asking for a status change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Developer,
    Manager,
    Unknown(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "ADMIN",
            Self::Developer => "DEVELOPER",
            Self::Manager => "MANAGER",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "ADMIN" => Self::Admin,
            "DEVELOPER" => Self::Developer,
            "MANAGER" => Self::Manager,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A developer's application to a task, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskApplication {
    pub id: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub applicant_name: Option<String>,
    #[serde(default)]
    pub applied_on: Option<String>,
}

impl TaskApplication {
    /// Creates an application with no descriptive metadata.
    pub fn new(id: impl Into<String>, status: ApplicationStatus) -> Self {
        Self {
            id: id.into(),
            status,
            position: None,
            applicant_name: None,
            applied_on: None,
        }
    }
}

/// Statuses reachable from `current` in one step.
///
/// Unknown statuses fall through to the empty set.
pub fn allowed_transitions(current: &ApplicationStatus) -> &'static [ApplicationStatus] {
    use ApplicationStatus::*;

    const FROM_APPLIED: &[ApplicationStatus] = &[Withdrawn, Accepted, Rejected];
    const FROM_ACCEPTED: &[ApplicationStatus] = &[Completed, Rejected];
    const FROM_IN_PROGRESS: &[ApplicationStatus] = &[Completed];

    match current {
        Applied => FROM_APPLIED,
        Accepted => FROM_ACCEPTED,
        InProgress => FROM_IN_PROGRESS,
        Rejected | Withdrawn | Completed | Unknown(_) => &[],
    }
}

/// Whether `role` may set an application to `target` at all, regardless of
/// where the application currently is.
pub fn can_role_update_status(role: &Role, target: &ApplicationStatus) -> bool {
    use ApplicationStatus::*;

    match role {
        Role::Admin => matches!(target, Accepted | Rejected | Withdrawn | Completed),
        Role::Developer => matches!(target, Withdrawn),
        Role::Manager => matches!(target, Accepted | Rejected | Completed),
        Role::Unknown(_) => false,
    }
}

/// A move is legal only when the edge exists and the role may set the target.
pub fn is_transition_allowed(
    current: &ApplicationStatus,
    role: &Role,
    target: &ApplicationStatus,
) -> bool {
    allowed_transitions(current).contains(target) && can_role_update_status(role, target)
}

/// The subset of `allowed_transitions(current)` that `role` may perform.
pub fn permitted_targets(current: &ApplicationStatus, role: &Role) -> Vec<ApplicationStatus> {
    allowed_transitions(current)
        .iter()
        .filter(|target| can_role_update_status(role, target))
        .cloned()
        .collect()
}
