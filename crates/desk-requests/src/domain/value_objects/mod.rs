//! Value Objects module
//!
//! Immutable, validated domain primitives.

use serde::{Deserialize, Serialize};

/// Identifier value object for people and devices (clients, technicians,
/// actors, tracked assets)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(String);

impl EntityId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier value object for service requests
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Human-readable ticket number, allocated once by the store and immutable
/// afterwards. Conventionally `TKT-<year>-<sequence>`, but only uniqueness
/// and monotonic allocation are guaranteed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketNumber(String);

impl TicketNumber {
    pub fn from_string(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TicketNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Request priority
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_label(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Service request lifecycle status
///
/// `resolved` and `closed` are terminal: `resolved → closed` is the only
/// transition that leaves a terminal state. Among the non-terminal states
/// every move is legal; entering `assigned` additionally requires an
/// assignee (checked by the aggregate, which also owns the auto-promotion
/// rule for assignment of an open request).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Open,
    Assigned,
    InProgress,
    Resolved,
    Closed,
}

impl RequestStatus {
    /// Whether the resolution lock applies (status and assignment frozen)
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Resolved | RequestStatus::Closed)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, RequestStatus::Resolved)
    }

    /// Pure state-pair legality; preconditions on the assignee are the
    /// aggregate's concern
    pub fn can_transition_to(&self, target: RequestStatus) -> bool {
        use RequestStatus::*;
        match (*self, target) {
            (Resolved, Closed) => true,
            (Resolved | Closed, _) => false,
            (Assigned | InProgress, Resolved) => true,
            (Open, Resolved) => false,
            (_, Closed) => false,
            (_, Open | Assigned | InProgress) => true,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            RequestStatus::Open => "open",
            RequestStatus::Assigned => "assigned",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Resolved => "resolved",
            RequestStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Actor role, carried into every lifecycle and visibility operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Technician,
    Client,
}

impl Role {
    /// May open new service requests
    pub fn can_submit_requests(&self) -> bool {
        matches!(self, Role::Admin | Role::Client)
    }

    /// May apply non-empty patches (status, assignment, notes)
    pub fn can_edit_requests(&self) -> bool {
        matches!(self, Role::Admin | Role::Technician)
    }

    /// May drive single and bulk assignment
    pub fn can_assign(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Technician => "technician",
            Role::Client => "client",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Acting identity for an operation. Not a stored entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    id: EntityId,
    role: Role,
}

impl Actor {
    pub fn new(id: EntityId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: EntityId) -> Self {
        Self::new(id, Role::Admin)
    }

    pub fn technician(id: EntityId) -> Self {
        Self::new(id, Role::Technician)
    }

    pub fn client(id: EntityId) -> Self {
        Self::new(id, Role::Client)
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_between_working_states() {
        use RequestStatus::*;
        assert!(Open.can_transition_to(Assigned));
        assert!(Open.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Open));
        assert!(InProgress.can_transition_to(Open));
        assert!(InProgress.can_transition_to(Assigned));
    }

    #[test]
    fn test_resolution_reachable_from_active_work_only() {
        use RequestStatus::*;
        assert!(Assigned.can_transition_to(Resolved));
        assert!(InProgress.can_transition_to(Resolved));
        assert!(!Open.can_transition_to(Resolved));
    }

    #[test]
    fn test_terminal_states_are_frozen() {
        use RequestStatus::*;
        assert!(Resolved.can_transition_to(Closed));
        assert!(!Resolved.can_transition_to(Open));
        assert!(!Resolved.can_transition_to(InProgress));
        assert!(!Closed.can_transition_to(Open));
        assert!(!Closed.can_transition_to(Resolved));
        assert!(!Open.can_transition_to(Closed));
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Admin.can_submit_requests());
        assert!(Role::Admin.can_edit_requests());
        assert!(Role::Admin.can_assign());

        assert!(Role::Technician.can_edit_requests());
        assert!(!Role::Technician.can_submit_requests());
        assert!(!Role::Technician.can_assign());

        assert!(Role::Client.can_submit_requests());
        assert!(!Role::Client.can_edit_requests());
        assert!(!Role::Client.can_assign());
    }

    #[test]
    fn test_status_wire_labels() {
        let json = serde_json::to_string(&RequestStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(RequestStatus::InProgress.to_string(), "in_progress");
        assert_eq!(Priority::Urgent.to_string(), "urgent");
    }
}
