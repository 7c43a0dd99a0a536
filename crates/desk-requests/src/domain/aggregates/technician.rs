//! Technician entity
//!
//! Read-mostly view supplied by the directory. `active_request_count` is
//! derived from the request store at read time, never stored as truth.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::EntityId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Technician {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub availability: Availability,
    pub active_request_count: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Available,
    Busy,
    Offline,
}

impl Technician {
    pub fn new(id: EntityId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            availability: Availability::Available,
            active_request_count: 0,
        }
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}
