//! Domain Events
//!
//! Events raised by the service request aggregate to communicate state
//! changes. Drained by the application layer after a successful store
//! write; the assignment event additionally feeds the notification sink.

use chrono::{DateTime, Utc};

use crate::domain::value_objects::{EntityId, RequestId, RequestStatus, TicketNumber};

/// Service-request domain events
#[derive(Clone, Debug)]
pub enum RequestEvent {
    Created {
        request_id: RequestId,
        ticket_number: TicketNumber,
        client_id: EntityId,
        created_at: DateTime<Utc>,
    },

    Assigned {
        request_id: RequestId,
        ticket_number: TicketNumber,
        technician_id: EntityId,
        assigned_at: DateTime<Utc>,
    },

    Unassigned {
        request_id: RequestId,
        ticket_number: TicketNumber,
    },

    StatusChanged {
        request_id: RequestId,
        from: RequestStatus,
        to: RequestStatus,
    },

    Resolved {
        request_id: RequestId,
        ticket_number: TicketNumber,
        resolved_at: DateTime<Utc>,
    },

    Closed {
        request_id: RequestId,
        ticket_number: TicketNumber,
    },
}

impl RequestEvent {
    /// Get the request ID this event belongs to
    pub fn request_id(&self) -> &RequestId {
        match self {
            RequestEvent::Created { request_id, .. } => request_id,
            RequestEvent::Assigned { request_id, .. } => request_id,
            RequestEvent::Unassigned { request_id, .. } => request_id,
            RequestEvent::StatusChanged { request_id, .. } => request_id,
            RequestEvent::Resolved { request_id, .. } => request_id,
            RequestEvent::Closed { request_id, .. } => request_id,
        }
    }

    /// Get event type name
    pub fn event_type(&self) -> &'static str {
        match self {
            RequestEvent::Created { .. } => "request.created",
            RequestEvent::Assigned { .. } => "request.assigned",
            RequestEvent::Unassigned { .. } => "request.unassigned",
            RequestEvent::StatusChanged { .. } => "request.status_changed",
            RequestEvent::Resolved { .. } => "request.resolved",
            RequestEvent::Closed { .. } => "request.closed",
        }
    }
}
