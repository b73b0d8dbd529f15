//! Lifecycle notifications.
//!
//! | Event              | Fired when                                         |
//! |--------------------|----------------------------------------------------|
//! | `Connecting`       | permissions granted, transport opening             |
//! | `Connected`        | transport up, handshake sent                       |
//! | `Running`          | sync complete, execution phase active              |
//! | `Disconnected`     | transport error or close; protocol reset to idle   |
//! | `PermissionDenied` | a required permission was not granted              |
//! | `Shutdown`         | every `shutdown()` call                            |
//!
//! Events are queued by the session and delivered to observers once per
//! tick. An observer that fails or panics is logged and skipped; it never
//! unwinds into the session.

use std::collections::VecDeque;
use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::warn;

use crate::connection::Permissions;
use crate::protocol::OperatingModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Connecting { url: String },
    Connected,
    Running { operating_model: OperatingModel },
    Disconnected { reason: String },
    PermissionDenied { origin: String, missing: Permissions },
    Shutdown,
}

pub type ObserverError = Box<dyn Error + Send + Sync>;

type Observer = Box<dyn FnMut(&LifecycleEvent) -> Result<(), ObserverError> + Send>;

#[derive(Default)]
pub struct EventQueue {
    pending: VecDeque<LifecycleEvent>,
    observers: Vec<Observer>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&LifecycleEvent) -> Result<(), ObserverError> + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn push(&mut self, event: LifecycleEvent) {
        self.pending.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = LifecycleEvent>) {
        self.pending.extend(events);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Deliver every queued event to every observer, in order. Returns the
    /// delivered events.
    pub fn notify(&mut self) -> Vec<LifecycleEvent> {
        let events: Vec<LifecycleEvent> = self.pending.drain(..).collect();
        for event in &events {
            for (index, observer) in self.observers.iter_mut().enumerate() {
                match catch_unwind(AssertUnwindSafe(|| observer(event))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Observer {} failed on {:?}: {}", index, event, e),
                    Err(_) => warn!("Observer {} panicked on {:?}", index, event),
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[test]
    fn observers_see_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut queue = EventQueue::new();
        let sink = Arc::clone(&seen);
        queue.subscribe(move |e| {
            sink.lock().push(e.clone());
            Ok(())
        });

        queue.push(LifecycleEvent::Connected);
        queue.push(LifecycleEvent::Shutdown);
        assert_eq!(queue.notify().len(), 2);
        assert_eq!(
            *seen.lock(),
            vec![LifecycleEvent::Connected, LifecycleEvent::Shutdown]
        );
        assert_eq!(queue.pending_len(), 0);
    }

    #[test]
    fn failing_and_panicking_observers_are_contained() {
        let count = Arc::new(Mutex::new(0));
        let mut queue = EventQueue::new();
        queue.subscribe(|_| Err("nope".into()));
        queue.subscribe(|_| panic!("observer bug"));
        let sink = Arc::clone(&count);
        queue.subscribe(move |_| {
            *sink.lock() += 1;
            Ok(())
        });

        queue.push(LifecycleEvent::Connected);
        queue.notify();
        assert_eq!(*count.lock(), 1);
    }
}
