//! Data Transfer Objects (DTOs)
//!
//! Objects for transferring data across boundaries.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{EntityId, Priority, RequestId, RequestStatus};

/// Command to open a new service request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateRequestCommand {
    pub client_id: EntityId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub device_id: Option<EntityId>,
    pub category: Option<String>,
    /// Denormalized display name, carried on the record for queue search
    pub client_name: Option<String>,
}

impl CreateRequestCommand {
    pub fn new(
        client_id: EntityId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            client_id,
            title: title.into(),
            description: description.into(),
            priority,
            device_id: None,
            category: None,
            client_name: None,
        }
    }
}

/// Partial update for a service request. Unset fields are left untouched;
/// the assignment field is an explicit three-way change so "no change"
/// and "unassign" can never be confused.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub assignment: AssignmentChange,
    pub resolution_notes: Option<String>,
}

impl RequestPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.assignment == AssignmentChange::Keep
            && self.resolution_notes.is_none()
    }

    pub fn assign(technician_id: EntityId) -> Self {
        Self {
            assignment: AssignmentChange::AssignTo(technician_id),
            ..Self::default()
        }
    }

    pub fn unassign() -> Self {
        Self {
            assignment: AssignmentChange::Clear,
            ..Self::default()
        }
    }

    pub fn transition(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn resolve(notes: impl Into<String>) -> Self {
        Self {
            status: Some(RequestStatus::Resolved),
            resolution_notes: Some(notes.into()),
            ..Self::default()
        }
    }
}

/// Requested change to a request's assignee
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentChange {
    #[default]
    Keep,
    Clear,
    AssignTo(EntityId),
}

/// Outcome of a bulk assignment: how many went through, and which ids
/// were skipped (resolution-locked or missing)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkAssignmentReport {
    pub updated_count: usize,
    pub skipped: Vec<RequestId>,
}
