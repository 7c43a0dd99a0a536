//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces.

use async_trait::async_trait;

use crate::application::dto::{BulkAssignmentReport, CreateRequestCommand, RequestPatch};
use crate::domain::aggregates::{LifecycleError, ServiceRequest, Technician};
use crate::domain::services::{QueueStats, RequestFilters};
use crate::domain::value_objects::{Actor, EntityId, RequestId, Role};

/// Request lifecycle use cases
#[async_trait]
pub trait RequestUseCases: Send + Sync {
    /// Open a new service request (client or admin)
    async fn create_request(
        &self,
        command: CreateRequestCommand,
        actor: &Actor,
    ) -> Result<ServiceRequest, WorkflowError>;

    /// Apply a partial update: status transition, assignment change,
    /// resolution notes. All-or-nothing against the store.
    async fn apply_update(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        patch: RequestPatch,
    ) -> Result<ServiceRequest, WorkflowError>;

    /// Visibility-checked read; a request the actor may not see reads as
    /// absent
    async fn get_request(
        &self,
        request_id: &RequestId,
        actor: &Actor,
    ) -> Result<Option<ServiceRequest>, WorkflowError>;

    /// The actor's queue with conjunctive filters applied, in creation
    /// order
    async fn visible_requests(
        &self,
        actor: &Actor,
        filters: RequestFilters,
    ) -> Result<Vec<ServiceRequest>, WorkflowError>;

    /// Dashboard counters over the actor's visible queue
    async fn queue_stats(&self, actor: &Actor) -> Result<QueueStats, WorkflowError>;
}

/// Assignment orchestration use cases
#[async_trait]
pub trait AssignmentUseCases: Send + Sync {
    /// Assign one request to a technician (admin only); emits one
    /// assignment notification on success
    async fn assign_single(
        &self,
        request_id: &RequestId,
        technician_id: &EntityId,
        actor: &Actor,
    ) -> Result<ServiceRequest, WorkflowError>;

    /// Assign many requests to one technician with per-item partial
    /// success: resolution-locked and missing requests are skipped and
    /// reported, never block the rest
    async fn assign_bulk(
        &self,
        request_ids: &[RequestId],
        technician_id: &EntityId,
        actor: &Actor,
    ) -> Result<BulkAssignmentReport, WorkflowError>;

    /// Assignment candidates: available technicians with their active
    /// request counts hydrated from the store
    async fn available_technicians(&self) -> Result<Vec<Technician>, WorkflowError>;
}

/// Workflow error taxonomy surfaced to callers. Nothing here is retried
/// automatically; a concurrent-modification loser re-fetches and decides
/// for itself.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WorkflowError {
    #[error("service request {0} not found")]
    RequestNotFound(RequestId),

    #[error("technician {0} not found")]
    TechnicianNotFound(EntityId),

    #[error("role {role} may not {action}")]
    Unauthorized { role: Role, action: &'static str },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error("concurrent modification of request {id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        id: RequestId,
        expected: u64,
        actual: u64,
    },

    #[error("repository failure: {0}")]
    Repository(String),
}
