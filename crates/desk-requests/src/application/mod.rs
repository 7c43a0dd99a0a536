pub mod commands;
pub mod dto;

pub use commands::{AssignmentService, RequestService};
pub use dto::*;
