//! OpenDesk Service Request Engine
//!
//! Core of the OpenDesk IT helpdesk: the service request lifecycle state
//! machine, assignment and bulk-assignment orchestration, and role-aware
//! visibility over the ticket queue.
//!
//! ## Architecture
//!
//! - **Domain Layer**: `ServiceRequest` aggregate, value objects, domain events
//! - **Application Layer**: Use case orchestration, DTOs
//! - **Ports Layer**: Hexagonal architecture interfaces
//! - **Infrastructure Layer**: In-memory adapters
//!
//! ## Key Rules
//!
//! - Status machine: open → assigned → in_progress → resolved → closed
//! - Resolution lock: a resolved or closed request's status and assignment
//!   are frozen; only `resolved → closed` remains legal
//! - Assigning an open request auto-promotes it to assigned and stamps
//!   `assigned_at`
//! - Bulk assignment applies per ticket with partial success; locked
//!   tickets are skipped, never block the rest
//! - Visibility: admins see everything, technicians their assigned work,
//!   clients their own requests

pub mod domain;
pub mod application;
pub mod ports;
pub mod infrastructure;

// Re-exports for convenience
pub use domain::aggregates::{
    Availability, LifecycleError, LifecyclePolicy, ServiceRequest, Technician,
};
pub use domain::value_objects::{
    Actor, EntityId, Priority, RequestId, RequestStatus, Role, TicketNumber,
};
pub use domain::events::RequestEvent;
pub use domain::services::{
    AssignmentFilter, QueueStats, RequestFilters, VisibilityService, WorkloadService,
};
pub use application::{AssignmentService, RequestService};
pub use application::dto::{
    AssignmentChange, BulkAssignmentReport, CreateRequestCommand, RequestPatch,
};
pub use ports::inbound::{AssignmentUseCases, RequestUseCases, WorkflowError};
pub use ports::outbound::{
    NotificationSink, RepositoryError, RequestRepository, StoreQuery, TechnicianDirectory,
};
pub use infrastructure::{
    InMemoryRequestStore, InMemoryTechnicianDirectory, RecordingNotificationSink,
    TracingNotificationSink,
};
