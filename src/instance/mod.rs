//! Component instances.
//!
//! An [`Instance`] is a shared handle. Construction goes through
//! [`ComponentClass::new_instance`](crate::ComponentClass::new_instance) (or
//! `construct`), which runs the initializer exactly once before the caller
//! sees the instance.
//!
//! # Submodules
//!
//! - `init` - the ordered initializer and the internal fast path
//! - `lifecycle` - parent/child links, hook invocation, mount, destroy
//! - `events` - per-instance event bus
//! - `render` - slots, element factory, rendering
//! - `state` - props, methods, data, computed, watchers
//! - `inject` - provide / inject
//! - `proxy` - render proxy and development access guard
//!
//! # Phases
//!
//! ```text
//! Uninitialized → OptionsResolved → Proxied → LifecycleLinked → EventsReady
//!   → RenderReady → BeforeCreateFired → InjectionsReady → StateReady
//!   → ProvideReady → CreatedFired → (Mounted | AwaitingManualMount) → Destroyed
//! ```
//!
//! Phases only move forward.

mod events;
mod init;
mod inject;
mod lifecycle;
mod proxy;
mod render;
mod state;

pub use events::ListenerId;
pub use init::{InitOptions, InternalComponentOptions};
pub use lifecycle::call_hook;
pub use proxy::RenderProxy;
pub use render::{resolve_slots, ElementFactory};

use std::cell::{Cell, OnceCell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use log::trace;
use serde_json::{Map, Value};
use spark_signals::Signal;

use crate::class::ComponentClass;
use crate::error::ComponentError;
use crate::options::Options;
use crate::runtime::Runtime;
use crate::util::classify;

use events::EventBus;
use lifecycle::Relations;
use render::RenderState;
use state::State;

// =============================================================================
// Flags & Phase
// =============================================================================

bitflags! {
    /// Instance status bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        /// The instance is a component and must never be wrapped as
        /// reactive data itself.
        const IS_COMPONENT = 1 << 0;
        /// Someone listens to `hook:*` events.
        const HAS_HOOK_EVENT = 1 << 1;
        const IS_MOUNTED = 1 << 2;
        const IS_BEING_DESTROYED = 1 << 3;
        const IS_DESTROYED = 1 << 4;
    }
}

/// Initialization phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    OptionsResolved,
    Proxied,
    LifecycleLinked,
    EventsReady,
    RenderReady,
    BeforeCreateFired,
    InjectionsReady,
    StateReady,
    ProvideReady,
    CreatedFired,
    AwaitingManualMount,
    Mounted,
    Destroyed,
}

// =============================================================================
// Instance
// =============================================================================

struct InstanceInner {
    runtime: Rc<Runtime>,
    constructor: ComponentClass,
    uid: Cell<u64>,
    flags: Cell<InstanceFlags>,
    phase: Cell<Phase>,
    options: OnceCell<Rc<Options>>,
    render_proxy: OnceCell<RenderProxy>,
    self_ref: OnceCell<WeakInstance>,
    relations: RefCell<Relations>,
    events: RefCell<EventBus>,
    render: RefCell<RenderState>,
    state: RefCell<State>,
    injected: RefCell<BTreeMap<String, Signal<Value>>>,
    provided: RefCell<Option<Rc<Map<String, Value>>>>,
}

/// Shared handle to a component instance.
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

/// Non-owning handle, used for back references (parent, root, self).
#[derive(Clone, Default)]
pub struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(Instance)
    }

    pub fn ptr_eq(&self, other: &WeakInstance) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Instance {
    /// Allocate an instance and run the initializer on it.
    pub(crate) fn construct(
        ctor: &ComponentClass,
        options: Option<InitOptions>,
    ) -> Result<Instance, ComponentError> {
        let vm = Instance(Rc::new(InstanceInner {
            runtime: ctor.runtime(),
            constructor: ctor.clone(),
            uid: Cell::new(0),
            flags: Cell::new(InstanceFlags::empty()),
            phase: Cell::new(Phase::Uninitialized),
            options: OnceCell::new(),
            render_proxy: OnceCell::new(),
            self_ref: OnceCell::new(),
            relations: RefCell::new(Relations::default()),
            events: RefCell::new(EventBus::default()),
            render: RefCell::new(RenderState::default()),
            state: RefCell::new(State::default()),
            injected: RefCell::new(BTreeMap::new()),
            provided: RefCell::new(None),
        }));
        if let Err(err) = init::init(&vm, options) {
            // A half-built child must not stay listed under its parent
            if let Some(parent) = vm.parent() {
                parent
                    .0
                    .relations
                    .borrow_mut()
                    .children
                    .retain(|child| !child.ptr_eq(&vm));
            }
            return Err(err);
        }
        Ok(vm)
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // -------------------------------------------------------------------------
    // Identity
    // -------------------------------------------------------------------------

    pub fn uid(&self) -> u64 {
        self.0.uid.get()
    }

    pub fn constructor(&self) -> &ComponentClass {
        &self.0.constructor
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.0.runtime
    }

    /// Resolved options (`$options`). Empty before resolution.
    pub fn options(&self) -> Rc<Options> {
        self.0
            .options
            .get()
            .cloned()
            .unwrap_or_else(|| Rc::new(Options::new()))
    }

    pub(crate) fn set_options(&self, options: Rc<Options>) {
        let fresh = self.0.options.set(options).is_ok();
        debug_assert!(fresh, "options resolved twice");
    }

    /// The object render functions read through.
    pub fn render_proxy(&self) -> Option<RenderProxy> {
        self.0.render_proxy.get().cloned()
    }

    /// The instance itself, bypassing any proxy (`_self`).
    pub fn self_ref(&self) -> Option<Instance> {
        self.0.self_ref.get().and_then(WeakInstance::upgrade)
    }

    // -------------------------------------------------------------------------
    // Flags & phase
    // -------------------------------------------------------------------------

    pub fn flags(&self) -> InstanceFlags {
        self.0.flags.get()
    }

    pub(crate) fn insert_flags(&self, flags: InstanceFlags) {
        self.0.flags.set(self.0.flags.get() | flags);
    }

    /// Excluded from outer reactive wrapping.
    pub fn is_component(&self) -> bool {
        self.flags().contains(InstanceFlags::IS_COMPONENT)
    }

    pub fn is_mounted(&self) -> bool {
        self.flags().contains(InstanceFlags::IS_MOUNTED)
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags().contains(InstanceFlags::IS_DESTROYED)
    }

    /// Destroyed, or in the middle of being destroyed.
    pub fn is_torn_down(&self) -> bool {
        self.flags()
            .intersects(InstanceFlags::IS_BEING_DESTROYED | InstanceFlags::IS_DESTROYED)
    }

    pub fn phase(&self) -> Phase {
        self.0.phase.get()
    }

    pub(crate) fn advance(&self, phase: Phase) {
        let current = self.0.phase.get();
        debug_assert!(phase > current, "phase {phase:?} entered after {current:?}");
        trace!("uid {} {:?} -> {:?}", self.uid(), current, phase);
        self.0.phase.set(phase);
    }

    // -------------------------------------------------------------------------
    // Naming
    // -------------------------------------------------------------------------

    /// `<Root>`, `<Name>` or `<Anonymous>`, for warnings.
    pub fn component_name(&self) -> String {
        let is_root = self
            .0
            .relations
            .try_borrow()
            .ok()
            .is_some_and(|r| r.parent.is_none() && r.root.ptr_eq(&self.downgrade()));
        if is_root {
            return "<Root>".to_string();
        }
        let options = self.options();
        match options.get_name().or_else(|| options.component_tag()) {
            Some(name) => format!("<{}>", classify(&name)),
            None => "<Anonymous>".to_string(),
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.uid())
            .field("name", &self.options().get_name())
            .field("phase", &self.phase())
            .finish()
    }
}

impl fmt::Debug for WeakInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(vm) => write!(f, "WeakInstance({})", vm.uid()),
            None => f.write_str("WeakInstance(<dropped>)"),
        }
    }
}
