use thiserror::Error;

/// One listener that returned an error during dispatch.
#[derive(Error, Debug)]
#[error("listener #{position} failed: {source}")]
pub struct ListenerFailure {
    /// Index of the listener in dispatch order.
    pub position: usize,
    #[source]
    pub source: anyhow::Error,
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("No listeners registered for event type '{event_type}'")]
    UnknownEventType { event_type: String },

    #[error("Listener is not registered for event type '{event_type}'")]
    ListenerNotRegistered { event_type: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Listener #{position} for '{event_type}' failed: {source}")]
    ListenerFailed {
        event_type: String,
        position: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("{} listener(s) for '{event_type}' failed", .failures.len())]
    ListenersFailed {
        event_type: String,
        failures: Vec<ListenerFailure>,
    },
}

impl EventBusError {
    /// True for both flavours of "nothing to unregister".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EventBusError::UnknownEventType { .. } | EventBusError::ListenerNotRegistered { .. }
        )
    }

    /// True when a listener body produced the error.
    pub fn is_listener_failure(&self) -> bool {
        matches!(
            self,
            EventBusError::ListenerFailed { .. } | EventBusError::ListenersFailed { .. }
        )
    }

    /// The event type the failing operation was working on, if any.
    pub fn event_type(&self) -> Option<&str> {
        match self {
            EventBusError::UnknownEventType { event_type }
            | EventBusError::ListenerNotRegistered { event_type }
            | EventBusError::ListenerFailed { event_type, .. }
            | EventBusError::ListenersFailed { event_type, .. } => Some(event_type),
            EventBusError::InvalidArgument(_) => None,
        }
    }
}
