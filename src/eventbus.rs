use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::event::InputEvent;

/// Trait for reacting to events from one device.
pub trait InputListener: Send {
    fn on_input(&mut self, event: &InputEvent);
}

impl<F> InputListener for F
where
    F: FnMut(&InputEvent) + Send,
{
    fn on_input(&mut self, event: &InputEvent) {
        self(event)
    }
}

/// Determines which kinds of events a listener wants to receive.
#[derive(Debug, Clone, Copy)]
pub enum EventFilter {
    All,
    AxisOnly,
    ButtonsOnly,
    MotionOnly,
    Custom(fn(&InputEvent) -> bool),
}

impl EventFilter {
    fn accepts(&self, event: &InputEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::AxisOnly => event.kind.is_axis(),
            EventFilter::ButtonsOnly => event.kind.is_button(),
            EventFilter::MotionOnly => event.kind.is_motion(),
            EventFilter::Custom(f) => f(event),
        }
    }
}

struct ListenerEntry {
    listener: Box<dyn InputListener>,
    enabled: bool,
    filter: EventFilter,
    label: Option<String>,
}

/// Subscriber list owned by one device. Listeners run in registration order.
#[derive(Default)]
pub struct InputEventBus {
    next_id: u64,
    listeners: BTreeMap<u64, ListenerEntry>,
}

impl std::fmt::Debug for InputEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputEventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl InputEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener with a filter and an optional diagnostic label.
    pub fn add_listener(
        &mut self,
        listener: impl InputListener + 'static,
        filter: EventFilter,
        label: Option<String>,
    ) -> u64 {
        let id = self.next_id;
        self.listeners.insert(
            id,
            ListenerEntry {
                listener: Box::new(listener),
                enabled: true,
                filter,
                label,
            },
        );
        self.next_id += 1;
        id
    }

    /// Builder form of [`add_listener`](Self::add_listener) with [`EventFilter::All`].
    #[must_use]
    pub fn with(mut self, listener: impl InputListener + 'static) -> Self {
        self.add_listener(listener, EventFilter::All, None);
        self
    }

    pub fn enable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Mutes a listener without removing it.
    pub fn disable(&mut self, id: u64) {
        if let Some(entry) = self.listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    pub fn remove_listener(&mut self, id: u64) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn emit(&mut self, event: &InputEvent) {
        for entry in self.listeners.values_mut() {
            if !entry.enabled || !entry.filter.accepts(event) {
                continue;
            }
            if let Some(label) = &entry.label {
                trace!(listener = %label, device = %event.device, "dispatch");
            }
            entry.listener.on_input(event);
        }
    }

    pub fn emit_all(&mut self, events: &[InputEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Shared buffer listener for hosts that prefer pulling events.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything recorded so far.
    pub fn drain(&self) -> Vec<InputEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl InputListener for EventLog {
    fn on_input(&mut self, event: &InputEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::InputKind;
    use crate::transport::DeviceId;

    fn ev(kind: InputKind) -> InputEvent {
        InputEvent { device: DeviceId(1), at_ms: 0, kind }
    }

    #[test]
    fn filters_and_muting() {
        let all = EventLog::new();
        let keys = EventLog::new();
        let mut bus = InputEventBus::new();
        bus.add_listener(all.clone(), EventFilter::All, None);
        let k = bus.add_listener(keys.clone(), EventFilter::ButtonsOnly, Some("keys".into()));

        bus.emit_all(&[
            ev(InputKind::KeyDown { key: 3 }),
            ev(InputKind::Motion { motion: [0.0; 6] }),
        ]);
        assert_eq!(all.drain().len(), 2);
        assert_eq!(keys.drain(), vec![ev(InputKind::KeyDown { key: 3 })]);

        bus.disable(k);
        bus.emit_all(&[ev(InputKind::KeyUp { key: 3 })]);
        assert!(keys.is_empty());
        bus.enable(k);
        bus.emit_all(&[ev(InputKind::KeyUp { key: 3 })]);
        assert_eq!(keys.len(), 1);

        assert!(bus.remove_listener(k));
        assert!(!bus.remove_listener(k));
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn closures_are_listeners() {
        let mut seen = 0usize;
        {
            let counter = Arc::new(Mutex::new(0usize));
            let c = counter.clone();
            let mut bus = InputEventBus::new().with(move |_: &InputEvent| {
                *c.lock().unwrap() += 1;
            });
            bus.emit_all(&[ev(InputKind::KeyDown { key: 1 })]);
            seen += *counter.lock().unwrap();
        }
        assert_eq!(seen, 1);
    }
}
