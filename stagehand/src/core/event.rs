//! Task event type, one entry of the tracker's append-only event log.

use super::TaskStatus;
use serde::{Deserialize, Serialize};

/// An event recorded against a tracked task.
///
/// Deserialized from the tracker's event endpoint. The tracker attaches
/// more fields than the orchestrator reads; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// The service that emitted the event.
    #[serde(default)]
    pub caller: Option<String>,

    /// The status carried by the event.
    pub status: TaskStatus,

    /// Free-form event message.
    #[serde(default)]
    pub message: Option<String>,

    /// When the event was recorded (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl TaskEvent {
    /// Creates a new event with the given status.
    #[must_use]
    pub fn new(status: TaskStatus) -> Self {
        Self {
            caller: None,
            status,
            message: None,
            timestamp: Some(crate::utils::iso_timestamp()),
        }
    }

    /// Sets the caller.
    #[must_use]
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_builder() {
        let event = TaskEvent::new(TaskStatus::Running)
            .with_caller("executor")
            .with_message("job accepted");

        assert_eq!(event.status, TaskStatus::Running);
        assert_eq!(event.caller.as_deref(), Some("executor"));
        assert_eq!(event.message.as_deref(), Some("job accepted"));
    }

    #[test]
    fn test_event_tolerates_extra_fields() {
        let raw = r#"{
            "status": "started",
            "message": "blank message",
            "thread_id": "",
            "timestamp": "2019-05-16T19:56:33.231452+00:00",
            "task": {"run_id": "574b1db2", "task_id": "157dee55"}
        }"#;

        let event: TaskEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.status, TaskStatus::Started);
        assert!(event.caller.is_none());
    }
}
