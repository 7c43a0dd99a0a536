//! Infrastructure adapters for the outbound ports

pub mod directory;
pub mod notify;
pub mod persistence;

pub use directory::InMemoryTechnicianDirectory;
pub use notify::{AssignmentNotice, RecordingNotificationSink, TracingNotificationSink};
pub use persistence::InMemoryRequestStore;
