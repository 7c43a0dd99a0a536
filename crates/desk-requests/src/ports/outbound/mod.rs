//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that infrastructure
//! must implement.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{ServiceRequest, Technician};
use crate::domain::value_objects::{EntityId, Priority, RequestId, RequestStatus, TicketNumber};

/// Request store port
///
/// The store is the sole owner of request records. `update` is a
/// compare-and-swap on the record's version: the write succeeds only if
/// the caller's copy is current, so concurrent writers lose cleanly
/// instead of silently clobbering each other.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Insert a new request; the id must be unused
    async fn create(&self, request: &ServiceRequest) -> Result<ServiceRequest, RepositoryError>;

    /// Find request by ID
    async fn get(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError>;

    /// Find request by ticket number
    async fn get_by_ticket(
        &self,
        ticket_number: &TicketNumber,
    ) -> Result<Option<ServiceRequest>, RepositoryError>;

    /// List requests matching the query, in creation order
    async fn list(&self, query: &StoreQuery) -> Result<Vec<ServiceRequest>, RepositoryError>;

    /// Write back a mutated request. Fails with `Conflict` when the stored
    /// version moved on; the returned copy carries the bumped version.
    async fn update(&self, request: &ServiceRequest) -> Result<ServiceRequest, RepositoryError>;

    /// Allocate the next ticket number: monotonic, unique, never reused
    async fn next_ticket_number(&self) -> Result<TicketNumber, RepositoryError>;
}

/// Technician directory port
#[async_trait]
pub trait TechnicianDirectory: Send + Sync {
    /// Find technician by ID
    async fn get(&self, id: &EntityId) -> Result<Option<Technician>, RepositoryError>;

    /// Technicians currently marked available
    async fn list_available(&self) -> Result<Vec<Technician>, RepositoryError>;
}

/// Notification port, fire-and-forget: delivery failures are the
/// implementation's problem and never propagate into the workflow
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_assignment(&self, ticket_number: &TicketNumber, technician_name: &str);
}

/// Criteria for `RequestRepository::list`; unset fields match everything
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreQuery {
    pub client_id: Option<EntityId>,
    pub assigned_to: Option<EntityId>,
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
}

impl StoreQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_client(client_id: EntityId) -> Self {
        Self {
            client_id: Some(client_id),
            ..Self::default()
        }
    }

    pub fn for_technician(technician_id: EntityId) -> Self {
        Self {
            assigned_to: Some(technician_id),
            ..Self::default()
        }
    }

    pub fn with_status(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn matches(&self, request: &ServiceRequest) -> bool {
        if let Some(client_id) = &self.client_id {
            if request.client_id() != client_id {
                return false;
            }
        }
        if let Some(technician_id) = &self.assigned_to {
            if request.assigned_to() != Some(technician_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if request.status() != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if request.priority() != priority {
                return false;
            }
        }
        true
    }
}

/// Repository error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,

    #[error("duplicate record id")]
    DuplicateId,

    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict { expected: u64, actual: u64 },

    #[error("storage error: {0}")]
    Storage(String),
}
