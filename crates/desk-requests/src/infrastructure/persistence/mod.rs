//! In-memory request store
//!
//! Reference store for tests and single-node deployments. Writes are
//! versioned: `update` succeeds only when the caller's copy matches the
//! stored version, and the winner's copy comes back with the version
//! bumped.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::aggregates::ServiceRequest;
use crate::domain::value_objects::{RequestId, TicketNumber};
use crate::ports::outbound::{RepositoryError, RequestRepository, StoreQuery};

/// In-memory request store with versioned writes
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: DashMap<String, ServiceRequest>,
    ticket_seq: AtomicU64,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.requests.len()
    }
}

#[async_trait]
impl RequestRepository for InMemoryRequestStore {
    async fn create(&self, request: &ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        match self.requests.entry(request.id().to_string()) {
            Entry::Occupied(_) => Err(RepositoryError::DuplicateId),
            Entry::Vacant(vacant) => {
                vacant.insert(request.clone());
                Ok(request.clone())
            }
        }
    }

    async fn get(&self, id: &RequestId) -> Result<Option<ServiceRequest>, RepositoryError> {
        Ok(self.requests.get(id.as_str()).map(|r| r.clone()))
    }

    async fn get_by_ticket(
        &self,
        ticket_number: &TicketNumber,
    ) -> Result<Option<ServiceRequest>, RepositoryError> {
        Ok(self
            .requests
            .iter()
            .find(|r| r.ticket_number() == ticket_number)
            .map(|r| r.clone()))
    }

    async fn list(&self, query: &StoreQuery) -> Result<Vec<ServiceRequest>, RepositoryError> {
        let mut matched: Vec<ServiceRequest> = self
            .requests
            .iter()
            .filter(|r| query.matches(r))
            .map(|r| r.clone())
            .collect();

        matched.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.ticket_number().as_str().cmp(b.ticket_number().as_str()))
        });

        Ok(matched)
    }

    async fn update(&self, request: &ServiceRequest) -> Result<ServiceRequest, RepositoryError> {
        match self.requests.entry(request.id().to_string()) {
            Entry::Vacant(_) => Err(RepositoryError::NotFound),
            Entry::Occupied(mut occupied) => {
                let stored_version = occupied.get().version();
                if stored_version != request.version() {
                    return Err(RepositoryError::Conflict {
                        expected: request.version(),
                        actual: stored_version,
                    });
                }

                let mut accepted = request.clone();
                accepted.set_version(stored_version + 1);
                occupied.insert(accepted.clone());
                Ok(accepted)
            }
        }
    }

    async fn next_ticket_number(&self) -> Result<TicketNumber, RepositoryError> {
        let seq = self.ticket_seq.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TicketNumber::from_string(format!(
            "TKT-{}-{:03}",
            Utc::now().year(),
            seq
        )))
    }
}
