//! # Event Sinks
//!
//! Where the [`Registry`](crate::Registry) delivers [`RegistryEvent`]s after
//! a mutation commits. Events are delivered in emission order and only for
//! mutations that succeeded.

use std::fmt::Debug;

use parking_lot::Mutex;

use gist_core::RegistryEvent;

/// Receives committed registry events.
pub trait EventSink: Send + Sync + Debug {
    fn publish(&self, events: &[RegistryEvent]);
}

/// Buffers events in memory for tests and in-process indexers.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<RegistryEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every event received so far.
    pub fn events(&self) -> Vec<RegistryEvent> {
        self.events.lock().clone()
    }

    /// Remove and return every event received so far.
    pub fn take(&self) -> Vec<RegistryEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemoryEventSink {
    fn publish(&self, events: &[RegistryEvent]) {
        self.events.lock().extend_from_slice(events);
    }
}

/// Emits one `info` line per event under the `gist::events` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn publish(&self, events: &[RegistryEvent]) {
        for event in events {
            match event.to_json() {
                Ok(payload) => {
                    tracing::info!(target: "gist::events", event = event.name(), %payload, "registry event")
                }
                Err(e) => {
                    tracing::error!(target: "gist::events", event = event.name(), error = %e, "event serialization failed")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gist_core::{Address, RequestId};

    #[test]
    fn memory_sink_preserves_order() {
        let sink = MemoryEventSink::new();
        let by = Address::repeat_byte(1);
        sink.publish(&[RegistryEvent::RequestDisabled {
            request_id: RequestId(1),
            by,
        }]);
        sink.publish(&[RegistryEvent::RequestEnabled {
            request_id: RequestId(1),
            by,
        }]);
        let names: Vec<_> = sink.events().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["RequestDisabled", "RequestEnabled"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn tracing_sink_accepts_events() {
        TracingEventSink.publish(&[RegistryEvent::RequestEnabled {
            request_id: RequestId(7),
            by: Address::ZERO,
        }]);
    }
}
