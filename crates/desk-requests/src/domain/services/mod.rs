//! Domain services module
//!
//! Stateless projections over request collections: role-aware visibility,
//! the active/resolved partition, and workload/queue derivations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::ServiceRequest;
use crate::domain::value_objects::{Actor, EntityId, Priority, RequestStatus, Role};

/// Optional, conjunctive queue filters; a request must match every one
/// that is set
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestFilters {
    /// Case-insensitive substring over title, ticket number, and client
    /// display name
    pub search: Option<String>,
    pub status: Option<RequestStatus>,
    pub priority: Option<Priority>,
    pub assignment: Option<AssignmentFilter>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentFilter {
    Unassigned,
    Assigned,
    /// Requests assigned to the acting technician; ignored for other roles
    Mine,
}

/// Role-aware projection over the request collection
pub struct VisibilityService;

impl VisibilityService {
    /// Lazily filter `requests` down to what `actor` may see, with
    /// `filters` applied conjunctively. Input order is preserved; the
    /// returned iterator borrows only the request collection (actor and
    /// filters are captured by value), so callers may pass temporaries.
    pub fn visible_requests<'a, I>(
        requests: I,
        actor: &Actor,
        filters: &RequestFilters,
    ) -> impl Iterator<Item = &'a ServiceRequest> + 'a
    where
        I: IntoIterator<Item = &'a ServiceRequest>,
        I::IntoIter: 'a,
    {
        let actor = actor.clone();
        let filters = filters.clone();
        requests.into_iter().filter(move |request| {
            Self::is_visible_to(request, &actor) && Self::matches_filters(request, &actor, &filters)
        })
    }

    /// Role-based base set: admins see everything, technicians their
    /// assigned work, clients their own requests
    pub fn is_visible_to(request: &ServiceRequest, actor: &Actor) -> bool {
        match actor.role() {
            Role::Admin => true,
            Role::Technician => request.assigned_to() == Some(actor.id()),
            Role::Client => request.client_id() == actor.id(),
        }
    }

    /// Split into (active, resolved) for two-list presentation; only the
    /// active side is eligible for bulk selection
    pub fn partition_by_resolution<'a, I>(
        requests: I,
    ) -> (Vec<&'a ServiceRequest>, Vec<&'a ServiceRequest>)
    where
        I: IntoIterator<Item = &'a ServiceRequest>,
    {
        requests.into_iter().partition(|request| request.is_active())
    }

    fn matches_filters(request: &ServiceRequest, actor: &Actor, filters: &RequestFilters) -> bool {
        if let Some(search) = &filters.search {
            if !Self::matches_search(request, search) {
                return false;
            }
        }

        if let Some(status) = filters.status {
            if request.status() != status {
                return false;
            }
        }

        if let Some(priority) = filters.priority {
            if request.priority() != priority {
                return false;
            }
        }

        if let Some(assignment) = filters.assignment {
            let matched = match assignment {
                AssignmentFilter::Unassigned => request.assigned_to().is_none(),
                AssignmentFilter::Assigned => request.assigned_to().is_some(),
                AssignmentFilter::Mine => {
                    actor.role() != Role::Technician
                        || request.assigned_to() == Some(actor.id())
                }
            };
            if !matched {
                return false;
            }
        }

        true
    }

    fn matches_search(request: &ServiceRequest, search: &str) -> bool {
        let needle = search.to_lowercase();

        request.title().to_lowercase().contains(&needle)
            || request
                .ticket_number()
                .as_str()
                .to_lowercase()
                .contains(&needle)
            || request
                .client_name()
                .map(|name| name.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Workload and queue derivations recomputed from the request collection
/// on demand; transient staleness between a write and the next read is
/// acceptable
pub struct WorkloadService;

impl WorkloadService {
    /// Count of a technician's not-yet-terminal requests
    pub fn active_request_count<'a, I>(requests: I, technician_id: &EntityId) -> u32
    where
        I: IntoIterator<Item = &'a ServiceRequest>,
    {
        requests
            .into_iter()
            .filter(|request| {
                request.assigned_to() == Some(technician_id) && !request.status().is_terminal()
            })
            .count() as u32
    }

    /// Dashboard counters over a request collection
    pub fn queue_stats<'a, I>(requests: I, now: DateTime<Utc>) -> QueueStats
    where
        I: IntoIterator<Item = &'a ServiceRequest>,
    {
        let today = now.date_naive();
        let mut stats = QueueStats::default();

        for request in requests {
            stats.total += 1;

            if !request.status().is_terminal() {
                stats.open_tickets += 1;
                if request.assigned_to().is_none() {
                    stats.unassigned += 1;
                }
            }

            if request.status().is_resolved() && request.updated_at().date_naive() == today {
                stats.resolved_today += 1;
            }
        }

        stats
    }
}

/// Queue counters for dashboards
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: usize,
    /// Requests still in open, assigned, or in_progress
    pub open_tickets: usize,
    /// Open tickets with no assignee yet
    pub unassigned: usize,
    pub resolved_today: usize,
}
