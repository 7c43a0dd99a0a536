//! Aggregates module

pub mod service_request;
pub mod technician;

pub use service_request::{LifecycleError, LifecyclePolicy, ServiceRequest};
pub use technician::{Availability, Technician};
