//! Notification adapters
//!
//! Assignment notices are fire-and-forget: a sink never fails the
//! workflow that triggered it.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::domain::value_objects::TicketNumber;
use crate::ports::outbound::NotificationSink;

/// Sink that logs each assignment notice
#[derive(Default)]
pub struct TracingNotificationSink;

impl TracingNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSink for TracingNotificationSink {
    async fn notify_assignment(&self, ticket_number: &TicketNumber, technician_name: &str) {
        info!("Request {} assigned to {}", ticket_number, technician_name);
    }
}

/// A captured assignment notice
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssignmentNotice {
    pub ticket_number: TicketNumber,
    pub technician_name: String,
}

/// Sink that records every notice, for tests and dry runs
#[derive(Default)]
pub struct RecordingNotificationSink {
    notices: Mutex<Vec<AssignmentNotice>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<AssignmentNotice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.notices.lock().unwrap().clear();
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify_assignment(&self, ticket_number: &TicketNumber, technician_name: &str) {
        self.notices.lock().unwrap().push(AssignmentNotice {
            ticket_number: ticket_number.clone(),
            technician_name: technician_name.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_sink_captures_notices() {
        let sink = RecordingNotificationSink::new();

        sink.notify_assignment(&TicketNumber::from_string("TKT-2024-001"), "Dana Reyes")
            .await;
        sink.notify_assignment(&TicketNumber::from_string("TKT-2024-002"), "Li Wei")
            .await;

        let notices = sink.notices();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].technician_name, "Dana Reyes");

        sink.clear();
        assert!(sink.notices().is_empty());
    }
}
