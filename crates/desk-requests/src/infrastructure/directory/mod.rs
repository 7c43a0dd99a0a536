//! In-memory technician directory
//!
//! Roster lookups for assignment. The workload counts on returned
//! technicians are whatever was last upserted; callers wanting live
//! counts hydrate them from the request store.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::aggregates::Technician;
use crate::domain::value_objects::EntityId;
use crate::ports::outbound::{RepositoryError, TechnicianDirectory};

/// In-memory technician directory
#[derive(Default)]
pub struct InMemoryTechnicianDirectory {
    roster: DashMap<String, Technician>,
}

impl InMemoryTechnicianDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a roster entry
    pub fn upsert(&self, technician: Technician) {
        self.roster.insert(technician.id.to_string(), technician);
    }

    pub fn remove(&self, id: &EntityId) {
        self.roster.remove(id.as_str());
    }

    pub fn count(&self) -> usize {
        self.roster.len()
    }
}

#[async_trait]
impl TechnicianDirectory for InMemoryTechnicianDirectory {
    async fn get(&self, id: &EntityId) -> Result<Option<Technician>, RepositoryError> {
        Ok(self.roster.get(id.as_str()).map(|t| t.clone()))
    }

    async fn list_available(&self) -> Result<Vec<Technician>, RepositoryError> {
        let mut available: Vec<Technician> = self
            .roster
            .iter()
            .filter(|t| t.is_available())
            .map(|t| t.clone())
            .collect();

        available.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(available)
    }
}
