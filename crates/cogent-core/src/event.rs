use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ShutdownSignal, TimeoutScope};

/// One execution event. Append-only; never mutated after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ExecutionEvent {
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    /// Whether this event ends a run's stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskCompleted { .. } | EventKind::TaskFailed { .. }
        )
    }
}

/// Event payloads, tagged by `event_type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EventKind {
    TaskStarted {
        request_id: String,
    },
    LlmResponse {
        iteration: usize,
        summary: String,
    },
    ToolCallCompleted {
        tool: String,
        success: bool,
        duration_ms: u64,
        iteration: usize,
    },
    /// Soft iteration overage: past the nominal limit, still inside
    /// the safety margin.
    IterationLimitApproaching {
        completed: usize,
        limit: usize,
    },
    ShutdownRequested {
        signal: ShutdownSignal,
    },
    TaskFailed {
        error_type: ErrorKind,
        message: String,
        iterations_completed: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        timeout: Option<TimeoutScope>,
        #[serde(skip_serializing_if = "Option::is_none")]
        shutdown_signal: Option<ShutdownSignal>,
        #[serde(skip_serializing_if = "Option::is_none")]
        trace: Option<String>,
    },
    TaskCompleted {
        output: String,
        iterations_completed: usize,
        duration_ms: u64,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: ExecutionEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_tag_on_the_wire() {
        let event = ExecutionEvent::now(EventKind::TaskStarted {
            request_id: "r-1".into(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "task_started");
        assert_eq!(json["request_id"], "r-1");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn task_failed_omits_absent_context() {
        let event = ExecutionEvent::now(EventKind::TaskFailed {
            error_type: ErrorKind::Provider,
            message: "rate limited".into(),
            iterations_completed: 2,
            timeout: None,
            shutdown_signal: None,
            trace: None,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "task_failed");
        assert_eq!(json["error_type"], "ProviderError");
        assert!(json.get("timeout").is_none());
        assert!(json.get("trace").is_none());
    }

    #[test]
    fn terminal_events() {
        assert!(ExecutionEvent::now(EventKind::TaskCompleted {
            output: String::new(),
            iterations_completed: 1,
            duration_ms: 5,
        })
        .is_terminal());
        assert!(!ExecutionEvent::now(EventKind::LlmResponse {
            iteration: 1,
            summary: String::new(),
        })
        .is_terminal());
    }

    #[tokio::test]
    async fn all_subscribers_receive_all_events() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(ExecutionEvent::now(EventKind::TaskStarted {
            request_id: "r-2".into(),
        }));

        for rx in [&mut rx1, &mut rx2] {
            let event = rx.recv().await.unwrap();
            assert!(matches!(event.kind, EventKind::TaskStarted { .. }));
        }
    }

    #[test]
    fn publish_without_subscribers_is_lossy_not_fatal() {
        let bus = EventBus::default();
        bus.publish(ExecutionEvent::now(EventKind::TaskStarted {
            request_id: "r-3".into(),
        }));
    }
}
