//! Command handlers
//!
//! Application services that orchestrate use cases: load, authorize,
//! mutate the aggregate, write back through the store's compare-and-swap,
//! then log drained domain events and emit notifications.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::dto::{
    AssignmentChange, BulkAssignmentReport, CreateRequestCommand, RequestPatch,
};
use crate::domain::aggregates::{LifecycleError, LifecyclePolicy, ServiceRequest, Technician};
use crate::domain::events::RequestEvent;
use crate::domain::services::{QueueStats, RequestFilters, VisibilityService, WorkloadService};
use crate::domain::value_objects::{Actor, EntityId, RequestId, RequestStatus, Role};
use crate::ports::inbound::{AssignmentUseCases, RequestUseCases, WorkflowError};
use crate::ports::outbound::{
    NotificationSink, RepositoryError, RequestRepository, StoreQuery, TechnicianDirectory,
};

/// Request lifecycle application service
pub struct RequestService {
    request_repo: Arc<dyn RequestRepository>,
    policy: LifecyclePolicy,
}

impl RequestService {
    pub fn new(request_repo: Arc<dyn RequestRepository>) -> Self {
        Self {
            request_repo,
            policy: LifecyclePolicy::default(),
        }
    }

    pub fn with_policy(request_repo: Arc<dyn RequestRepository>, policy: LifecyclePolicy) -> Self {
        Self {
            request_repo,
            policy,
        }
    }

    /// The store query matching the actor's base visibility set
    fn scope_query(actor: &Actor) -> StoreQuery {
        match actor.role() {
            Role::Admin => StoreQuery::all(),
            Role::Technician => StoreQuery::for_technician(actor.id().clone()),
            Role::Client => StoreQuery::for_client(actor.id().clone()),
        }
    }

    fn log_events(events: &[RequestEvent]) {
        for event in events {
            debug!("{} on request {}", event.event_type(), event.request_id());
        }
    }
}

#[async_trait]
impl RequestUseCases for RequestService {
    async fn create_request(
        &self,
        command: CreateRequestCommand,
        actor: &Actor,
    ) -> Result<ServiceRequest, WorkflowError> {
        if !actor.role().can_submit_requests() {
            return Err(WorkflowError::Unauthorized {
                role: actor.role(),
                action: "create service requests",
            });
        }

        // Clients open requests for themselves only
        if actor.role() == Role::Client && &command.client_id != actor.id() {
            return Err(WorkflowError::Unauthorized {
                role: actor.role(),
                action: "create requests for another client",
            });
        }

        let ticket_number = self
            .request_repo
            .next_ticket_number()
            .await
            .map_err(store_error)?;

        let mut request = ServiceRequest::create(
            ticket_number,
            command.client_id,
            actor.id().clone(),
            command.title,
            command.description,
            command.priority,
        );

        if let Some(category) = command.category {
            request.set_category(category);
        }
        if let Some(device_id) = command.device_id {
            request.set_device(device_id);
        }
        if let Some(client_name) = command.client_name {
            request.set_client_name(client_name);
        }

        let events = request.take_events();
        let stored = self
            .request_repo
            .create(&request)
            .await
            .map_err(store_error)?;

        Self::log_events(&events);
        info!(
            "Created request {} for client {}",
            stored.ticket_number(),
            stored.client_id()
        );

        Ok(stored)
    }

    async fn apply_update(
        &self,
        request_id: &RequestId,
        actor: &Actor,
        patch: RequestPatch,
    ) -> Result<ServiceRequest, WorkflowError> {
        // An empty patch is a read, with the same visibility rules
        if patch.is_empty() {
            return self
                .get_request(request_id, actor)
                .await?
                .ok_or_else(|| WorkflowError::RequestNotFound(request_id.clone()));
        }

        if !actor.role().can_edit_requests() {
            return Err(WorkflowError::Unauthorized {
                role: actor.role(),
                action: "update service requests",
            });
        }

        let mut request = self
            .request_repo
            .get(request_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| WorkflowError::RequestNotFound(request_id.clone()))?;

        // Assignment first so an open request auto-promotes before a status
        // change in the same patch is validated; notes before status so a
        // patch that resolves and carries notes is judged against the
        // pre-transition status
        match &patch.assignment {
            AssignmentChange::Keep => {}
            AssignmentChange::Clear => request.clear_assignment()?,
            AssignmentChange::AssignTo(technician_id) => {
                request.assign_to(technician_id.clone())?
            }
        }

        if let Some(notes) = patch.resolution_notes {
            request.amend_resolution_notes(notes, &self.policy)?;
        }

        if let Some(target) = patch.status {
            request.transition_to(target)?;
        }

        if request.status() == RequestStatus::Resolved && request.resolution_notes().is_none() {
            warn!(
                "Request {} resolved without resolution notes",
                request.ticket_number()
            );
        }

        let events = request.take_events();
        let stored = self
            .request_repo
            .update(&request)
            .await
            .map_err(|e| update_error(request_id, e))?;

        Self::log_events(&events);

        Ok(stored)
    }

    async fn get_request(
        &self,
        request_id: &RequestId,
        actor: &Actor,
    ) -> Result<Option<ServiceRequest>, WorkflowError> {
        let request = self
            .request_repo
            .get(request_id)
            .await
            .map_err(store_error)?;

        // Invisible reads as absent; existence is not leaked
        Ok(request.filter(|r| VisibilityService::is_visible_to(r, actor)))
    }

    async fn visible_requests(
        &self,
        actor: &Actor,
        filters: RequestFilters,
    ) -> Result<Vec<ServiceRequest>, WorkflowError> {
        let scoped = self
            .request_repo
            .list(&Self::scope_query(actor))
            .await
            .map_err(store_error)?;

        Ok(VisibilityService::visible_requests(&scoped, actor, &filters)
            .cloned()
            .collect())
    }

    async fn queue_stats(&self, actor: &Actor) -> Result<QueueStats, WorkflowError> {
        let visible = self
            .visible_requests(actor, RequestFilters::default())
            .await?;

        Ok(WorkloadService::queue_stats(&visible, Utc::now()))
    }
}

/// Assignment orchestration service. Delegates every mutation to the
/// lifecycle service and owns the notification side of assignment.
pub struct AssignmentService {
    lifecycle: Arc<dyn RequestUseCases>,
    directory: Arc<dyn TechnicianDirectory>,
    request_repo: Arc<dyn RequestRepository>,
    notifications: Arc<dyn NotificationSink>,
}

impl AssignmentService {
    pub fn new(
        lifecycle: Arc<dyn RequestUseCases>,
        directory: Arc<dyn TechnicianDirectory>,
        request_repo: Arc<dyn RequestRepository>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            lifecycle,
            directory,
            request_repo,
            notifications,
        }
    }

    /// Authority and technician resolution, checked before any mutation
    async fn resolve_for_assignment(
        &self,
        technician_id: &EntityId,
        actor: &Actor,
    ) -> Result<Technician, WorkflowError> {
        if !actor.role().can_assign() {
            return Err(WorkflowError::Unauthorized {
                role: actor.role(),
                action: "assign technicians",
            });
        }

        self.directory
            .get(technician_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| WorkflowError::TechnicianNotFound(technician_id.clone()))
    }
}

#[async_trait]
impl AssignmentUseCases for AssignmentService {
    async fn assign_single(
        &self,
        request_id: &RequestId,
        technician_id: &EntityId,
        actor: &Actor,
    ) -> Result<ServiceRequest, WorkflowError> {
        let technician = self.resolve_for_assignment(technician_id, actor).await?;

        let updated = self
            .lifecycle
            .apply_update(request_id, actor, RequestPatch::assign(technician_id.clone()))
            .await?;

        self.notifications
            .notify_assignment(updated.ticket_number(), &technician.name)
            .await;

        info!(
            "Assigned request {} to technician {}",
            updated.ticket_number(),
            technician.name
        );

        Ok(updated)
    }

    async fn assign_bulk(
        &self,
        request_ids: &[RequestId],
        technician_id: &EntityId,
        actor: &Actor,
    ) -> Result<BulkAssignmentReport, WorkflowError> {
        let technician = self.resolve_for_assignment(technician_id, actor).await?;

        let mut report = BulkAssignmentReport::default();
        let mut seen = HashSet::new();

        for request_id in request_ids {
            if !seen.insert(request_id.clone()) {
                continue;
            }

            let patch = RequestPatch::assign(technician_id.clone());
            match self.lifecycle.apply_update(request_id, actor, patch).await {
                Ok(updated) => {
                    self.notifications
                        .notify_assignment(updated.ticket_number(), &technician.name)
                        .await;
                    report.updated_count += 1;
                }
                Err(WorkflowError::Lifecycle(LifecycleError::ResolutionLocked { .. })) => {
                    warn!("Skipping resolution-locked request {} in bulk assignment", request_id);
                    report.skipped.push(request_id.clone());
                }
                Err(WorkflowError::RequestNotFound(_)) => {
                    warn!("Skipping missing request {} in bulk assignment", request_id);
                    report.skipped.push(request_id.clone());
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            "Bulk assignment to {}: {} updated, {} skipped",
            technician.name,
            report.updated_count,
            report.skipped.len()
        );

        Ok(report)
    }

    async fn available_technicians(&self) -> Result<Vec<Technician>, WorkflowError> {
        let mut candidates = self
            .directory
            .list_available()
            .await
            .map_err(store_error)?;

        let requests = self
            .request_repo
            .list(&StoreQuery::all())
            .await
            .map_err(store_error)?;

        for technician in &mut candidates {
            technician.active_request_count =
                WorkloadService::active_request_count(&requests, &technician.id);
        }

        Ok(candidates)
    }
}

fn store_error(err: RepositoryError) -> WorkflowError {
    WorkflowError::Repository(err.to_string())
}

/// Conflict and not-found on a write-back carry the request id context
fn update_error(request_id: &RequestId, err: RepositoryError) -> WorkflowError {
    match err {
        RepositoryError::NotFound => WorkflowError::RequestNotFound(request_id.clone()),
        RepositoryError::Conflict { expected, actual } => WorkflowError::ConcurrentModification {
            id: request_id.clone(),
            expected,
            actual,
        },
        other => WorkflowError::Repository(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Availability;
    use crate::domain::value_objects::{Priority, TicketNumber};
    use crate::infrastructure::{
        InMemoryRequestStore, InMemoryTechnicianDirectory, RecordingNotificationSink,
    };

    fn admin() -> Actor {
        Actor::admin(EntityId::from_string("admin-1"))
    }

    fn roster() -> Arc<InMemoryTechnicianDirectory> {
        let directory = InMemoryTechnicianDirectory::new();
        directory.upsert(Technician::new(
            EntityId::from_string("tech-7"),
            "Dana Reyes",
            "dana@opendesk.io",
        ));
        directory.upsert(Technician::new(
            EntityId::from_string("tech-9"),
            "Li Wei",
            "li@opendesk.io",
        ));
        directory.upsert(
            Technician::new(
                EntityId::from_string("tech-3"),
                "Sam Okafor",
                "sam@opendesk.io",
            )
            .with_availability(Availability::Offline),
        );
        Arc::new(directory)
    }

    struct Fixture {
        store: Arc<InMemoryRequestStore>,
        lifecycle: Arc<RequestService>,
        assignment: AssignmentService,
        sink: Arc<RecordingNotificationSink>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryRequestStore::new());
        let lifecycle = Arc::new(RequestService::new(store.clone()));
        let sink = Arc::new(RecordingNotificationSink::new());
        let assignment = AssignmentService::new(
            lifecycle.clone(),
            roster(),
            store.clone(),
            sink.clone(),
        );
        Fixture {
            store,
            lifecycle,
            assignment,
            sink,
        }
    }

    async fn open_request(fx: &Fixture, client: &str, title: &str) -> ServiceRequest {
        let command = CreateRequestCommand::new(
            EntityId::from_string(client),
            title,
            "details",
            Priority::Medium,
        );
        fx.lifecycle
            .create_request(command, &Actor::client(EntityId::from_string(client)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_request_starts_open() {
        let fx = fixture();

        let request = open_request(&fx, "c1", "PC won't boot").await;

        assert_eq!(request.status(), RequestStatus::Open);
        assert!(request.assigned_to().is_none());
        assert!(request.ticket_number().as_str().starts_with("TKT-"));
        assert_eq!(request.submitted_by().as_str(), "c1");
        assert_eq!(request.version(), 1);
    }

    #[tokio::test]
    async fn test_technician_cannot_create_requests() {
        let fx = fixture();
        let command = CreateRequestCommand::new(
            EntityId::from_string("c1"),
            "Broken dock",
            "details",
            Priority::Low,
        );

        let result = fx
            .lifecycle
            .create_request(command, &Actor::technician(EntityId::from_string("tech-7")))
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_client_cannot_create_for_another_client() {
        let fx = fixture();
        let command = CreateRequestCommand::new(
            EntityId::from_string("c2"),
            "Broken dock",
            "details",
            Priority::Low,
        );

        let result = fx
            .lifecycle
            .create_request(command, &Actor::client(EntityId::from_string("c1")))
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_ticket_numbers_unique_and_sequential() {
        let fx = fixture();

        let mut tickets = Vec::new();
        for i in 0..5 {
            let request = open_request(&fx, "c1", &format!("Issue {i}")).await;
            tickets.push(request.ticket_number().clone());
        }

        let distinct: HashSet<_> = tickets.iter().collect();
        assert_eq!(distinct.len(), 5);
        assert!(tickets[0].as_str().ends_with("-001"));
        assert!(tickets[4].as_str().ends_with("-005"));
    }

    #[tokio::test]
    async fn test_client_patch_is_unauthorized() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let result = fx
            .lifecycle
            .apply_update(
                request.id(),
                &Actor::client(EntityId::from_string("c1")),
                RequestPatch::transition(RequestStatus::InProgress),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
    }

    #[tokio::test]
    async fn test_empty_patch_is_a_read() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let read = fx
            .lifecycle
            .apply_update(
                request.id(),
                &Actor::client(EntityId::from_string("c1")),
                RequestPatch::default(),
            )
            .await
            .unwrap();

        assert_eq!(read.updated_at(), request.updated_at());
        assert_eq!(read.version(), request.version());
    }

    #[tokio::test]
    async fn test_technician_progresses_assigned_work() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;
        let tech_id = EntityId::from_string("tech-7");

        fx.assignment
            .assign_single(request.id(), &tech_id, &admin())
            .await
            .unwrap();

        let updated = fx
            .lifecycle
            .apply_update(
                request.id(),
                &Actor::technician(tech_id),
                RequestPatch::transition(RequestStatus::InProgress),
            )
            .await
            .unwrap();

        assert_eq!(updated.status(), RequestStatus::InProgress);
        assert!(updated.updated_at() > request.updated_at());
    }

    #[tokio::test]
    async fn test_assignment_auto_promotes_and_notifies() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let updated = fx
            .assignment
            .assign_single(request.id(), &EntityId::from_string("tech-7"), &admin())
            .await
            .unwrap();

        assert_eq!(updated.status(), RequestStatus::Assigned);
        assert_eq!(updated.assigned_to().unwrap().as_str(), "tech-7");
        assert!(updated.assigned_at().is_some());

        let notices = fx.sink.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].ticket_number, *updated.ticket_number());
        assert_eq!(notices[0].technician_name, "Dana Reyes");
    }

    #[tokio::test]
    async fn test_assignment_requires_admin() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let result = fx
            .assignment
            .assign_single(
                request.id(),
                &EntityId::from_string("tech-7"),
                &Actor::technician(EntityId::from_string("tech-9")),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Unauthorized { .. })));
        assert!(fx.sink.notices().is_empty());
    }

    #[tokio::test]
    async fn test_assigning_unknown_technician_fails_before_mutation() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let result = fx
            .assignment
            .assign_single(request.id(), &EntityId::from_string("tech-404"), &admin())
            .await;

        assert!(matches!(result, Err(WorkflowError::TechnicianNotFound(_))));

        let unchanged = fx.store.get(request.id()).await.unwrap().unwrap();
        assert_eq!(unchanged.status(), RequestStatus::Open);
        assert!(unchanged.assigned_to().is_none());
    }

    #[tokio::test]
    async fn test_resolution_lock_is_enforced_end_to_end() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;
        let tech_id = EntityId::from_string("tech-7");

        fx.assignment
            .assign_single(request.id(), &tech_id, &admin())
            .await
            .unwrap();
        fx.lifecycle
            .apply_update(request.id(), &admin(), RequestPatch::resolve("replaced PSU"))
            .await
            .unwrap();

        let result = fx
            .assignment
            .assign_single(request.id(), &EntityId::from_string("tech-9"), &admin())
            .await;
        assert!(matches!(
            result,
            Err(WorkflowError::Lifecycle(LifecycleError::ResolutionLocked { .. }))
        ));

        // The stored record is untouched by the failed attempt
        let stored = fx.store.get(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), RequestStatus::Resolved);
        assert_eq!(stored.assigned_to().unwrap().as_str(), "tech-7");
        assert_eq!(stored.resolution_notes(), Some("replaced PSU"));
    }

    #[tokio::test]
    async fn test_bulk_assignment_partial_success() {
        let fx = fixture();
        let tech_id = EntityId::from_string("tech-7");

        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(open_request(&fx, "c1", &format!("Active {i}")).await.id().clone());
        }
        let resolved = open_request(&fx, "c1", "Already handled").await;
        fx.lifecycle
            .apply_update(resolved.id(), &admin(), RequestPatch::assign(tech_id.clone()))
            .await
            .unwrap();
        fx.lifecycle
            .apply_update(resolved.id(), &admin(), RequestPatch::resolve("done"))
            .await
            .unwrap();
        fx.sink.clear();
        ids.push(resolved.id().clone());

        let report = fx
            .assignment
            .assign_bulk(&ids, &tech_id, &admin())
            .await
            .unwrap();

        assert_eq!(report.updated_count, 3);
        assert_eq!(report.skipped, vec![resolved.id().clone()]);
        assert_eq!(fx.sink.notices().len(), 3);

        for id in &ids[..3] {
            let stored = fx.store.get(id).await.unwrap().unwrap();
            assert_eq!(stored.status(), RequestStatus::Assigned);
            assert_eq!(stored.assigned_to(), Some(&tech_id));
        }
    }

    #[tokio::test]
    async fn test_bulk_assignment_ignores_duplicate_ids() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;
        let ids = vec![
            request.id().clone(),
            request.id().clone(),
            request.id().clone(),
        ];

        let report = fx
            .assignment
            .assign_bulk(&ids, &EntityId::from_string("tech-7"), &admin())
            .await
            .unwrap();

        assert_eq!(report.updated_count, 1);
        assert!(report.skipped.is_empty());
        assert_eq!(fx.sink.notices().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_assignment_skips_missing_ids() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;
        let ghost = RequestId::from_string("no-such-request");
        let ids = vec![request.id().clone(), ghost.clone()];

        let report = fx
            .assignment
            .assign_bulk(&ids, &EntityId::from_string("tech-7"), &admin())
            .await
            .unwrap();

        assert_eq!(report.updated_count, 1);
        assert_eq!(report.skipped, vec![ghost]);
    }

    #[tokio::test]
    async fn test_bulk_unknown_technician_aborts_whole_batch() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let result = fx
            .assignment
            .assign_bulk(
                &[request.id().clone()],
                &EntityId::from_string("tech-404"),
                &admin(),
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::TechnicianNotFound(_))));
        assert!(fx.sink.notices().is_empty());

        let unchanged = fx.store.get(request.id()).await.unwrap().unwrap();
        assert_eq!(unchanged.status(), RequestStatus::Open);
    }

    #[tokio::test]
    async fn test_visible_requests_are_role_scoped() {
        let fx = fixture();
        open_request(&fx, "c1", "Mine").await;
        open_request(&fx, "c2", "Theirs").await;

        let visible = fx
            .lifecycle
            .visible_requests(
                &Actor::client(EntityId::from_string("c1")),
                RequestFilters::default(),
            )
            .await
            .unwrap();

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].title(), "Mine");
    }

    #[tokio::test]
    async fn test_get_request_hides_foreign_records() {
        let fx = fixture();
        let request = open_request(&fx, "c1", "PC won't boot").await;

        let own = fx
            .lifecycle
            .get_request(request.id(), &Actor::client(EntityId::from_string("c1")))
            .await
            .unwrap();
        assert!(own.is_some());

        let foreign = fx
            .lifecycle
            .get_request(request.id(), &Actor::client(EntityId::from_string("c2")))
            .await
            .unwrap();
        assert!(foreign.is_none());
    }

    #[tokio::test]
    async fn test_queue_stats_follow_visibility() {
        let fx = fixture();
        open_request(&fx, "c1", "One").await;
        open_request(&fx, "c1", "Two").await;
        open_request(&fx, "c2", "Other").await;

        let admin_stats = fx.lifecycle.queue_stats(&admin()).await.unwrap();
        assert_eq!(admin_stats.total, 3);
        assert_eq!(admin_stats.open_tickets, 3);
        assert_eq!(admin_stats.unassigned, 3);

        let client_stats = fx
            .lifecycle
            .queue_stats(&Actor::client(EntityId::from_string("c2")))
            .await
            .unwrap();
        assert_eq!(client_stats.total, 1);
    }

    #[tokio::test]
    async fn test_available_technicians_with_hydrated_workload() {
        let fx = fixture();
        let tech_id = EntityId::from_string("tech-7");

        for i in 0..2 {
            let request = open_request(&fx, "c1", &format!("Job {i}")).await;
            fx.assignment
                .assign_single(request.id(), &tech_id, &admin())
                .await
                .unwrap();
        }

        let candidates = fx.assignment.available_technicians().await.unwrap();

        // The offline technician is not offered
        assert_eq!(candidates.len(), 2);
        let dana = candidates.iter().find(|t| t.id == tech_id).unwrap();
        assert_eq!(dana.active_request_count, 2);
        let li = candidates
            .iter()
            .find(|t| t.id.as_str() == "tech-9")
            .unwrap();
        assert_eq!(li.active_request_count, 0);
    }

    #[tokio::test]
    async fn test_strict_policy_resolves_with_notes_in_one_patch() {
        let store = Arc::new(InMemoryRequestStore::new());
        let lifecycle = Arc::new(RequestService::with_policy(
            store.clone(),
            LifecyclePolicy::strict(),
        ));
        let client = Actor::client(EntityId::from_string("c1"));
        let command = CreateRequestCommand::new(
            EntityId::from_string("c1"),
            "PC won't boot",
            "details",
            Priority::High,
        );
        let request = lifecycle.create_request(command, &client).await.unwrap();
        lifecycle
            .apply_update(
                request.id(),
                &admin(),
                RequestPatch::assign(EntityId::from_string("tech-7")),
            )
            .await
            .unwrap();

        // Notes arriving with the resolution land before the lock engages
        let resolved = lifecycle
            .apply_update(request.id(), &admin(), RequestPatch::resolve("replaced PSU"))
            .await
            .unwrap();
        assert_eq!(resolved.status(), RequestStatus::Resolved);
        assert_eq!(resolved.resolution_notes(), Some("replaced PSU"));

        // A later amendment is what strict policy forbids
        let late = lifecycle
            .apply_update(
                request.id(),
                &admin(),
                RequestPatch {
                    resolution_notes: Some("late edit".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            late,
            Err(WorkflowError::Lifecycle(LifecycleError::ResolutionLocked { .. }))
        ));
    }

    /// Store wrapper that lets a rival writer commit between a read and
    /// the write-back
    struct RacingStore {
        inner: Arc<InMemoryRequestStore>,
        rival: EntityId,
    }

    #[async_trait]
    impl RequestRepository for RacingStore {
        async fn create(
            &self,
            request: &ServiceRequest,
        ) -> Result<ServiceRequest, RepositoryError> {
            self.inner.create(request).await
        }

        async fn get(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
            let read = self.inner.get(id).await?;
            if let Some(current) = &read {
                let mut raced = current.clone();
                if raced.assign_to(self.rival.clone()).is_ok() {
                    self.inner.update(&raced).await?;
                }
            }
            Ok(read)
        }

        async fn get_by_ticket(
            &self,
            ticket_number: &TicketNumber,
        ) -> Result<Option<ServiceRequest>, RepositoryError> {
            self.inner.get_by_ticket(ticket_number).await
        }

        async fn list(&self, query: &StoreQuery) -> Result<Vec<ServiceRequest>, RepositoryError> {
            self.inner.list(query).await
        }

        async fn update(
            &self,
            request: &ServiceRequest,
        ) -> Result<ServiceRequest, RepositoryError> {
            self.inner.update(request).await
        }

        async fn next_ticket_number(&self) -> Result<TicketNumber, RepositoryError> {
            self.inner.next_ticket_number().await
        }
    }

    #[tokio::test]
    async fn test_losing_concurrent_writer_surfaces_conflict() {
        let store = Arc::new(InMemoryRequestStore::new());
        let setup = RequestService::new(store.clone());
        let client = Actor::client(EntityId::from_string("c1"));
        let command = CreateRequestCommand::new(
            EntityId::from_string("c1"),
            "PC won't boot",
            "details",
            Priority::High,
        );
        let request = setup.create_request(command, &client).await.unwrap();

        let racing = Arc::new(RacingStore {
            inner: store.clone(),
            rival: EntityId::from_string("tech-raced"),
        });
        let service = RequestService::new(racing);

        let result = service
            .apply_update(
                request.id(),
                &admin(),
                RequestPatch::transition(RequestStatus::InProgress),
            )
            .await;

        match result {
            Err(WorkflowError::ConcurrentModification { expected, actual, .. }) => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 2);
            }
            other => panic!("expected a version conflict, got {other:?}"),
        }

        // The winner's write is preserved untouched; nothing retried
        let stored = store.get(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.assigned_to().unwrap().as_str(), "tech-raced");
        assert_eq!(stored.version(), 2);
        assert_eq!(stored.status(), RequestStatus::Assigned);
    }

    #[tokio::test]
    async fn test_full_lifecycle_scenario() {
        let fx = fixture();
        let client = Actor::client(EntityId::from_string("c1"));

        let command = CreateRequestCommand::new(
            EntityId::from_string("c1"),
            "PC won't boot",
            "No POST, no beeps",
            Priority::High,
        );
        let request = fx.lifecycle.create_request(command, &client).await.unwrap();
        assert_eq!(request.status(), RequestStatus::Open);
        assert!(request.assigned_to().is_none());
        assert!(request.ticket_number().as_str().ends_with("-001"));

        let assigned = fx
            .assignment
            .assign_single(request.id(), &EntityId::from_string("tech-7"), &admin())
            .await
            .unwrap();
        assert_eq!(assigned.status(), RequestStatus::Assigned);
        assert!(assigned.assigned_at().is_some());
        assert_eq!(fx.sink.notices().len(), 1);

        let resolved = fx
            .lifecycle
            .apply_update(request.id(), &admin(), RequestPatch::resolve("replaced PSU"))
            .await
            .unwrap();
        assert_eq!(resolved.status(), RequestStatus::Resolved);

        let locked = fx
            .assignment
            .assign_single(request.id(), &EntityId::from_string("tech-9"), &admin())
            .await;
        assert!(matches!(
            locked,
            Err(WorkflowError::Lifecycle(LifecycleError::ResolutionLocked { .. }))
        ));

        let stored = fx.store.get(request.id()).await.unwrap().unwrap();
        assert_eq!(stored.assigned_to().unwrap().as_str(), "tech-7");
        assert_eq!(stored.status(), RequestStatus::Resolved);
    }
}
