//! Component classes - The extensible definition graph.
//!
//! A [`ComponentClass`] is a shared handle to a class definition. The base
//! class carries the global options; [`ComponentClass::extend`] derives a
//! subclass whose options are its parent's merged with its own declared
//! extension.
//!
//! # Cached configuration
//!
//! Each class keeps:
//! - `options` - effective merged configuration
//! - `super_options` - parent's configuration at the last merge
//! - `extend_options` - this class's own declared overrides
//! - `sealed_options` - snapshot of `options` right after the last merge
//!
//! `options` is never mutated in place. Global changes (`mixin`,
//! `register_component`, `patch_options`) swap in a new `Rc`, which
//! subclasses notice by identity the next time they are resolved (see
//! [`resolve_constructor_options`]).
//!
//! # Example
//!
//! ```ignore
//! use spark_component::{ComponentClass, Options, Runtime};
//!
//! let runtime = Runtime::new();
//! let base = ComponentClass::base(&runtime);
//! let button = base.extend(Options::new().name("button"));
//! let vm = button.new_instance(Options::new())?;
//! ```

use std::cell::{Ref, RefCell, RefMut};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::error::ComponentError;
use crate::instance::{InitOptions, Instance};
use crate::options::{
    merge_options, resolve_constructor_options, validate_component_name, OptionKey, OptionValue,
    Options,
};
use crate::runtime::Runtime;

pub(crate) struct ClassInner {
    pub(crate) cid: u32,
    pub(crate) runtime: Rc<Runtime>,
    pub(crate) options: Rc<Options>,
    pub(crate) super_class: Option<ComponentClass>,
    pub(crate) super_options: Option<Rc<Options>>,
    pub(crate) extend_options: Options,
    pub(crate) sealed_options: Rc<Options>,
}

/// Shared handle to a component class.
#[derive(Clone)]
pub struct ComponentClass(Rc<RefCell<ClassInner>>);

impl ComponentClass {
    /// Root class of a runtime, holding the global options.
    pub fn base(runtime: &Rc<Runtime>) -> Self {
        let mut options = Options::new();
        options.insert(
            OptionKey::Components,
            OptionValue::Components(Rc::new(BTreeMap::new())),
        );
        let options = Rc::new(options);
        Self(Rc::new(RefCell::new(ClassInner {
            cid: runtime.next_cid(),
            runtime: runtime.clone(),
            sealed_options: options.clone(),
            options,
            super_class: None,
            super_options: None,
            extend_options: Options::new(),
        })))
    }

    pub(crate) fn inner(&self) -> Ref<'_, ClassInner> {
        self.0.borrow()
    }

    pub(crate) fn inner_mut(&self) -> RefMut<'_, ClassInner> {
        self.0.borrow_mut()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn cid(&self) -> u32 {
        self.inner().cid
    }

    pub fn runtime(&self) -> Rc<Runtime> {
        self.inner().runtime.clone()
    }

    /// Current options, as last stored. Use [`Self::resolve_options`] to
    /// bring them up to date with ancestors first.
    pub fn options(&self) -> Rc<Options> {
        self.inner().options.clone()
    }

    pub fn super_class(&self) -> Option<ComponentClass> {
        self.inner().super_class.clone()
    }

    pub fn super_options(&self) -> Option<Rc<Options>> {
        self.inner().super_options.clone()
    }

    pub fn extend_options(&self) -> Options {
        self.inner().extend_options.clone()
    }

    pub fn sealed_options(&self) -> Rc<Options> {
        self.inner().sealed_options.clone()
    }

    pub fn name(&self) -> Option<Rc<str>> {
        self.inner().options.get_name()
    }

    pub fn ptr_eq(&self, other: &ComponentClass) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Effective options, re-merged if an ancestor changed.
    pub fn resolve_options(&self) -> Rc<Options> {
        resolve_constructor_options(self)
    }

    // -------------------------------------------------------------------------
    // Definition API
    // -------------------------------------------------------------------------

    /// Derive a subclass.
    pub fn extend(&self, extend_options: Options) -> ComponentClass {
        let runtime = self.runtime();
        let super_options = self.options();

        let name = extend_options
            .get_name()
            .or_else(|| super_options.get_name());
        if let Some(name) = &name {
            validate_component_name(&runtime, name);
        }

        let mut options = merge_options(&runtime, &super_options, &extend_options, None);

        let sub = ComponentClass(Rc::new(RefCell::new(ClassInner {
            cid: runtime.next_cid(),
            runtime: runtime.clone(),
            options: super_options.clone(),
            super_class: Some(self.clone()),
            super_options: Some(super_options.clone()),
            extend_options,
            sealed_options: super_options,
        })));

        // Self registration enables recursive references by name
        if let Some(name) = &name {
            options.register_component(name, sub.clone());
        }

        let options = Rc::new(options);
        {
            let mut inner = sub.inner_mut();
            inner.sealed_options = options.clone();
            inner.options = options;
        }
        debug!("extended class {} into {} ({:?})", self.cid(), sub.cid(), name);
        sub
    }

    /// Merge `mixin` into this class's options.
    ///
    /// Produces a new options identity, so every subclass re-merges on its
    /// next resolution.
    pub fn mixin(&self, mixin: Options) -> &Self {
        let runtime = self.runtime();
        let current = self.options();
        let merged = merge_options(&runtime, &current, &mixin, None);
        self.inner_mut().options = Rc::new(merged);
        self
    }

    /// Register a component in this class's `components` registry.
    pub fn register_component(&self, name: &str, class: &ComponentClass) -> &Self {
        validate_component_name(&self.runtime(), name);
        let mut next = (*self.options()).clone();
        next.register_component(name, class.clone());
        self.inner_mut().options = Rc::new(next);
        self
    }

    /// Attach a value to this class's options after definition.
    ///
    /// The options are replaced copy-on-write and not re-sealed, so the
    /// attachment shows up as a late modification and survives the next
    /// re-merge triggered by an ancestor change.
    pub fn patch_options(&self, key: OptionKey, value: OptionValue) -> &Self {
        let mut next = (*self.options()).clone();
        next.insert(key, value);
        self.inner_mut().options = Rc::new(next);
        self
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Construct and initialize an instance with user options.
    pub fn new_instance(&self, options: Options) -> Result<Instance, ComponentError> {
        Instance::construct(self, Some(InitOptions::User(options)))
    }

    /// Construct and initialize an instance with explicit init options
    /// (user options, internal child options, or none).
    pub fn construct(&self, options: Option<InitOptions>) -> Result<Instance, ComponentError> {
        Instance::construct(self, options)
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inner) => f
                .debug_struct("ComponentClass")
                .field("cid", &inner.cid)
                .field("name", &inner.options.get_name())
                .finish(),
            Err(_) => f.write_str("ComponentClass(<borrowed>)"),
        }
    }
}
