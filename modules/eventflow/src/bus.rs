//! The registry and the dispatch loop.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result as ListenerResult;
use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::config::{BusConfig, FailurePolicy};
use crate::error::{EventBusError, ListenerFailure};
use crate::listener::Listener;
use crate::types::{empty_payload, Event, EventRecord, EventTypes, Payload};

type Registry = HashMap<String, Vec<Listener>>;

/// Maps event types to ordered listener lists and fires events at them.
///
/// Dispatch is synchronous: `fire` returns once every listener for the type
/// has run. The listener list is snapshotted before dispatch, so listeners
/// added or removed while a fire is in flight only affect later fires, and
/// listeners are free to call back into the bus.
pub struct EventBus {
    registry: RwLock<Registry>,
    config: BusConfig,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Append `listener` to the list for `event_type`. Duplicates are kept.
    pub fn register(&self, event_type: impl Into<String>, listener: Listener) {
        let event_type = event_type.into();
        let mut registry = self.write();
        let listeners = registry.entry(event_type.clone()).or_default();
        listeners.push(listener);
        debug!(event_type = %event_type, listeners = listeners.len(), "Registered listener");
    }

    /// Register and hand the same listener back, for inline binding:
    ///
    /// ```
    /// # use eventflow::{EventBus, Listener};
    /// let bus = EventBus::new();
    /// let on_greet = bus.on("greet", Listener::new(|_| Ok(())));
    /// bus.unregister("greet", &on_greet).unwrap();
    /// ```
    pub fn on(&self, event_type: impl Into<String>, listener: Listener) -> Listener {
        self.register(event_type, listener.clone());
        listener
    }

    /// Wrap a closure in a [`Listener`], register it, and return the handle.
    pub fn listen<F>(&self, event_type: impl Into<String>, f: F) -> Listener
    where
        F: Fn(&mut EventRecord) -> ListenerResult<()> + Send + Sync + 'static,
    {
        self.on(event_type, Listener::new(f))
    }

    /// Remove the first registration of `listener` under `event_type`.
    ///
    /// Removing something that is not there is an error. A type left with
    /// no listeners is dropped from the registry.
    pub fn unregister(&self, event_type: &str, listener: &Listener) -> Result<(), EventBusError> {
        let mut registry = self.write();
        let Some(listeners) = registry.get_mut(event_type) else {
            return Err(EventBusError::UnknownEventType {
                event_type: event_type.to_string(),
            });
        };
        let Some(index) = listeners.iter().position(|l| l.same_as(listener)) else {
            return Err(EventBusError::ListenerNotRegistered {
                event_type: event_type.to_string(),
            });
        };
        listeners.remove(index);
        let remaining = listeners.len();
        if remaining == 0 {
            registry.remove(event_type);
        }
        debug!(event_type, listeners = remaining, "Unregistered listener");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    /// Listener count per event type. Types without listeners are absent.
    pub fn listener_count_by_type(&self) -> BTreeMap<String, usize> {
        self.read()
            .iter()
            .filter(|(_, listeners)| !listeners.is_empty())
            .map(|(event_type, listeners)| (event_type.clone(), listeners.len()))
            .collect()
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.read().get(event_type).map_or(0, Vec::len)
    }

    /// Sum of listeners across all event types.
    pub fn total_listener_count(&self) -> usize {
        self.read().values().map(Vec::len).sum()
    }

    /// Same as [`EventBus::total_listener_count`].
    pub fn len(&self) -> usize {
        self.total_listener_count()
    }

    pub fn is_empty(&self) -> bool {
        self.total_listener_count() == 0
    }

    /// Number of event types with at least one listener.
    pub fn event_type_count(&self) -> usize {
        self.read().values().filter(|l| !l.is_empty()).count()
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Fire `event_type` with `data`, invoking its listeners in order.
    ///
    /// Listeners share one record, so their edits to `record.data` reach the
    /// listeners after them and are written back into `data` before return,
    /// on success and on failure alike. No listeners means no-op.
    pub fn fire(&self, event_type: &str, data: &mut Payload) -> Result<(), EventBusError> {
        self.fire_at(event_type, data, Utc::now())
    }

    /// Fire with a fresh empty payload.
    pub fn fire_empty(&self, event_type: &str) -> Result<(), EventBusError> {
        self.fire(event_type, &mut empty_payload())
    }

    /// Fire with an explicit event timestamp instead of now.
    pub fn fire_at(
        &self,
        event_type: &str,
        data: &mut Payload,
        timestamp: DateTime<Utc>,
    ) -> Result<(), EventBusError> {
        let listeners = self.snapshot(event_type);
        if listeners.is_empty() {
            trace!(event_type, "No listeners, nothing to fire");
            return Ok(());
        }

        debug!(event_type, listeners = listeners.len(), "Firing event");
        if self.config.log_payloads {
            trace!(event_type, payload = %data, "Event payload");
        }

        let mut record = Event::at(event_type, std::mem::take(data), timestamp).into_record();
        let result = self.dispatch(event_type, &listeners, &mut record);
        *data = record.data;
        result
    }

    /// Fire each type in order with the same payload.
    ///
    /// A bare string is rejected up front rather than split into characters.
    /// The batch stops at the first event type whose dispatch fails.
    pub fn fire_many(
        &self,
        event_types: impl Into<EventTypes>,
        data: &mut Payload,
    ) -> Result<(), EventBusError> {
        let types = match event_types.into() {
            EventTypes::Sequence(types) => types,
            EventTypes::Bare(bare) => {
                return Err(EventBusError::InvalidArgument(format!(
                    "expected a sequence of event types, got the single string '{bare}'"
                )));
            }
        };

        for event_type in &types {
            self.fire(event_type, data)?;
        }
        Ok(())
    }

    fn dispatch(
        &self,
        event_type: &str,
        listeners: &[Listener],
        record: &mut EventRecord,
    ) -> Result<(), EventBusError> {
        let mut failures = Vec::new();

        for (position, listener) in listeners.iter().enumerate() {
            let Err(source) = listener.call(record) else {
                continue;
            };
            match self.config.failure_policy {
                FailurePolicy::Abort => {
                    debug!(event_type, position, error = %source, "Listener failed, aborting dispatch");
                    return Err(EventBusError::ListenerFailed {
                        event_type: event_type.to_string(),
                        position,
                        source,
                    });
                }
                FailurePolicy::Continue => {
                    debug!(event_type, position, error = %source, "Listener failed, continuing dispatch");
                    failures.push(ListenerFailure { position, source });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(EventBusError::ListenersFailed {
                event_type: event_type.to_string(),
                failures,
            })
        }
    }

    fn snapshot(&self, event_type: &str) -> Vec<Listener> {
        self.read().get(event_type).cloned().unwrap_or_default()
    }

    // Listeners never run under the lock, so poisoning can only come from a
    // panic inside this module's own bookkeeping; the map is still coherent.
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<EventBus events={}>", self.event_type_count())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count_by_type())
            .field("config", &self.config)
            .finish()
    }
}
