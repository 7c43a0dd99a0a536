//! ServiceRequest Aggregate
//!
//! Aggregate root for the helpdesk ticket lifecycle. Owns the status state
//! machine, the assignment rules, and the resolution lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::RequestEvent;
use crate::domain::value_objects::{EntityId, Priority, RequestId, RequestStatus, TicketNumber};

/// ServiceRequest aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceRequest {
    id: RequestId,
    ticket_number: TicketNumber,
    title: String,
    description: String,
    priority: Priority,
    category: Option<String>,
    client_id: EntityId,
    client_name: Option<String>,
    device_id: Option<EntityId>,
    submitted_by: EntityId,
    assigned_to: Option<EntityId>,
    status: RequestStatus,
    resolution_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    assigned_at: Option<DateTime<Utc>>,
    version: u64,
    #[serde(skip)]
    events: Vec<RequestEvent>,
}

impl ServiceRequest {
    /// Create a new request. Always starts `open` and unassigned; the
    /// ticket number must come from the store's allocator and is never
    /// changed afterwards.
    pub fn create(
        ticket_number: TicketNumber,
        client_id: EntityId,
        submitted_by: EntityId,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
    ) -> Self {
        let now = Utc::now();
        let id = RequestId::new();

        let mut request = Self {
            id: id.clone(),
            ticket_number: ticket_number.clone(),
            title: title.into(),
            description: description.into(),
            priority,
            category: None,
            client_id: client_id.clone(),
            client_name: None,
            device_id: None,
            submitted_by,
            assigned_to: None,
            status: RequestStatus::Open,
            resolution_notes: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            version: 1,
            events: vec![],
        };

        request.raise_event(RequestEvent::Created {
            request_id: id,
            ticket_number,
            client_id,
            created_at: now,
        });

        request
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &RequestId { &self.id }
    pub fn ticket_number(&self) -> &TicketNumber { &self.ticket_number }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> &str { &self.description }
    pub fn priority(&self) -> Priority { self.priority }
    pub fn category(&self) -> Option<&str> { self.category.as_deref() }
    pub fn client_id(&self) -> &EntityId { &self.client_id }
    pub fn client_name(&self) -> Option<&str> { self.client_name.as_deref() }
    pub fn device_id(&self) -> Option<&EntityId> { self.device_id.as_ref() }
    pub fn submitted_by(&self) -> &EntityId { &self.submitted_by }
    pub fn assigned_to(&self) -> Option<&EntityId> { self.assigned_to.as_ref() }
    pub fn status(&self) -> RequestStatus { self.status }
    pub fn resolution_notes(&self) -> Option<&str> { self.resolution_notes.as_deref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn assigned_at(&self) -> Option<DateTime<Utc>> { self.assigned_at }
    pub fn version(&self) -> u64 { self.version }
    pub fn is_assigned(&self) -> bool { self.assigned_to.is_some() }

    /// Partition predicate for presentation: everything not yet resolved
    /// counts as active (a closed ticket left the resolved list already)
    pub fn is_active(&self) -> bool {
        !self.status.is_resolved()
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Assign (or reassign) a technician. Stamps a fresh `assigned_at` and
    /// auto-promotes an open request to `assigned`; this is the one place
    /// status changes as a side effect of assignment.
    pub fn assign_to(&mut self, technician_id: EntityId) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(self.locked());
        }

        let now = Utc::now();
        self.assigned_to = Some(technician_id.clone());
        self.assigned_at = Some(now);

        if self.status == RequestStatus::Open {
            self.status = RequestStatus::Assigned;
            self.raise_event(RequestEvent::StatusChanged {
                request_id: self.id.clone(),
                from: RequestStatus::Open,
                to: RequestStatus::Assigned,
            });
        }

        self.touch();

        self.raise_event(RequestEvent::Assigned {
            request_id: self.id.clone(),
            ticket_number: self.ticket_number.clone(),
            technician_id,
            assigned_at: now,
        });

        Ok(())
    }

    /// Remove the assignee and the assignment timestamp together. Status is
    /// left alone; there is no demotion rule.
    pub fn clear_assignment(&mut self) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(self.locked());
        }

        if self.assigned_to.is_none() {
            return Ok(());
        }

        self.assigned_to = None;
        self.assigned_at = None;
        self.touch();

        self.raise_event(RequestEvent::Unassigned {
            request_id: self.id.clone(),
            ticket_number: self.ticket_number.clone(),
        });

        Ok(())
    }

    /// Move the request to a new status, enforcing the transition table.
    /// Re-stating the current status on a non-terminal request is a no-op.
    pub fn transition_to(&mut self, target: RequestStatus) -> Result<(), LifecycleError> {
        if self.status.is_terminal()
            && !(self.status == RequestStatus::Resolved && target == RequestStatus::Closed)
        {
            return Err(self.locked());
        }

        if target == self.status {
            return Ok(());
        }

        if !self.status.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        if target == RequestStatus::Assigned && self.assigned_to.is_none() {
            return Err(LifecycleError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }

        let from = self.status;
        let now = Utc::now();
        self.status = target;
        self.touch();

        match target {
            RequestStatus::Resolved => self.raise_event(RequestEvent::Resolved {
                request_id: self.id.clone(),
                ticket_number: self.ticket_number.clone(),
                resolved_at: now,
            }),
            RequestStatus::Closed => self.raise_event(RequestEvent::Closed {
                request_id: self.id.clone(),
                ticket_number: self.ticket_number.clone(),
            }),
            _ => self.raise_event(RequestEvent::StatusChanged {
                request_id: self.id.clone(),
                from,
                to: target,
            }),
        }

        Ok(())
    }

    /// Amend resolution notes. On a resolved or closed request this is the
    /// one field the lock leaves open, and only while the policy allows it.
    pub fn amend_resolution_notes(
        &mut self,
        notes: impl Into<String>,
        policy: &LifecyclePolicy,
    ) -> Result<(), LifecycleError> {
        if self.status.is_terminal() && !policy.notes_amendable_after_resolution {
            return Err(self.locked());
        }

        self.resolution_notes = Some(notes.into());
        self.touch();
        Ok(())
    }

    // =========================================================================
    // Creation-time detail setters
    // =========================================================================

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = Some(category.into());
        self.touch();
    }

    pub fn set_device(&mut self, device_id: EntityId) {
        self.device_id = Some(device_id);
        self.touch();
    }

    pub fn set_client_name(&mut self, client_name: impl Into<String>) {
        self.client_name = Some(client_name.into());
        self.touch();
    }

    // =========================================================================
    // Private
    // =========================================================================

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn take_events(&mut self) -> Vec<RequestEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: RequestEvent) {
        self.events.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn locked(&self) -> LifecycleError {
        LifecycleError::ResolutionLocked {
            ticket: self.ticket_number.clone(),
        }
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

/// Tunable lifecycle rules
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    /// Whether `resolution_notes` may still change once the request is
    /// resolved or closed
    pub notes_amendable_after_resolution: bool,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            notes_amendable_after_resolution: true,
        }
    }
}

impl LifecyclePolicy {
    /// Freeze the whole record at resolution, notes included
    pub fn strict() -> Self {
        Self {
            notes_amendable_after_resolution: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("request {ticket} is resolution-locked")]
    ResolutionLocked { ticket: TicketNumber },
}
