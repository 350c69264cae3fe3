//! Event bus - Per-instance custom events.
//!
//! Listeners registered on an instance are called when that same instance
//! emits; events never bubble to the parent. Listeners the parent attached
//! to the component placeholder (`_parentListeners`) become the initial
//! registrations.
//!
//! Registrations are identified by [`ListenerId`] for removal, the same
//! id-tagged registry shape as the keyboard handler registry.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::trace;
use serde_json::Value;

use super::{Instance, InstanceFlags};
use crate::vnode::{Listener, Listeners};

/// Handle for removing a single listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(usize);

#[derive(Clone)]
struct Registration {
    id: ListenerId,
    listener: Listener,
    once: bool,
}

#[derive(Default)]
pub(crate) struct EventBus {
    events: BTreeMap<String, Vec<Registration>>,
    next_id: usize,
}

impl EventBus {
    fn add(&mut self, event: &str, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.events
            .entry(event.to_string())
            .or_default()
            .push(Registration { id, listener, once });
        id
    }
}

/// Reset the bus and attach the parent's placeholder listeners.
pub(crate) fn init_events(vm: &Instance) {
    *vm.0.events.borrow_mut() = EventBus::default();
    if let Some(listeners) = vm.options().parent_listeners() {
        update_component_listeners(vm, &listeners);
    }
}

fn update_component_listeners(vm: &Instance, listeners: &Listeners) {
    for (event, handlers) in listeners {
        for handler in handlers {
            vm.add_listener(event, handler.clone(), false);
        }
    }
}

impl Instance {
    fn add_listener(&self, event: &str, listener: Listener, once: bool) -> ListenerId {
        if event.starts_with("hook:") {
            self.insert_flags(InstanceFlags::HAS_HOOK_EVENT);
        }
        self.0.events.borrow_mut().add(event, listener, once)
    }

    /// Listen for `event` on this instance.
    pub fn on(&self, event: &str, listener: impl Fn(&Instance, &[Value]) + 'static) -> ListenerId {
        self.add_listener(event, Rc::new(listener), false)
    }

    /// Listen for the next `event` only.
    pub fn once(&self, event: &str, listener: impl Fn(&Instance, &[Value]) + 'static) -> ListenerId {
        self.add_listener(event, Rc::new(listener), true)
    }

    /// Remove listeners.
    ///
    /// - `off(None, None)` removes everything
    /// - `off(Some(event), None)` removes all listeners of `event`
    /// - `off(Some(event), Some(id))` removes one listener
    /// - `off(None, Some(id))` removes one listener from whichever event holds it
    pub fn off(&self, event: Option<&str>, id: Option<ListenerId>) {
        let mut bus = self.0.events.borrow_mut();
        match (event, id) {
            (None, None) => bus.events.clear(),
            (Some(event), None) => {
                bus.events.remove(event);
            }
            (Some(event), Some(id)) => {
                if let Some(registrations) = bus.events.get_mut(event) {
                    registrations.retain(|r| r.id != id);
                    if registrations.is_empty() {
                        bus.events.remove(event);
                    }
                }
            }
            (None, Some(id)) => {
                for registrations in bus.events.values_mut() {
                    registrations.retain(|r| r.id != id);
                }
                bus.events.retain(|_, registrations| !registrations.is_empty());
            }
        }
    }

    /// Call every listener of `event`, in registration order.
    pub fn emit(&self, event: &str, args: &[Value]) {
        let registrations = {
            let mut bus = self.0.events.borrow_mut();
            let Some(registrations) = bus.events.get_mut(event) else {
                return;
            };
            let snapshot = registrations.clone();
            registrations.retain(|r| !r.once);
            if registrations.is_empty() {
                bus.events.remove(event);
            }
            snapshot
        };

        trace!("{} emit {event}", self.component_name());
        for registration in registrations {
            (registration.listener)(self, args);
        }
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.0
            .events
            .borrow()
            .events
            .get(event)
            .map_or(0, Vec::len)
    }
}
