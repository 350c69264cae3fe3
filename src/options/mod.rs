//! Options - The configuration object governing a component.
//!
//! An [`Options`] value is a mapping of [`OptionKey`] to [`OptionValue`].
//! Values are reference counted so two configurations can be compared entry
//! by entry by identity ([`OptionValue::ptr_eq`]), which is how the resolver
//! detects late modifications of a class's options.
//!
//! An `Options` may carry a prototype: lookups that miss the own entries fall
//! through to it. Only the internal component fast path builds prototyped
//! options; everything else is flat.
//!
//! # Example
//!
//! ```ignore
//! use spark_component::{Options, LifecycleHook};
//! use serde_json::json;
//!
//! let options = Options::new()
//!     .name("Counter")
//!     .data(|_| json!({ "count": 0 }).as_object().cloned().unwrap_or_default())
//!     .method("increment", |vm, _| {
//!         let count = vm.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
//!         vm.set("count", json!(count + 1));
//!         Ok(serde_json::Value::Null)
//!     })
//!     .hook(LifecycleHook::Created, |_| Ok(()));
//! ```

mod merge;
mod resolve;

pub use merge::{merge_options, validate_component_name};
pub use resolve::{resolve_constructor_options, resolve_modified_options};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::class::ComponentClass;
use crate::error::ComponentError;
use crate::instance::{ElementFactory, Instance, RenderProxy, WeakInstance};
use crate::vnode::{Listeners, VNode};

// =============================================================================
// Lifecycle Hooks
// =============================================================================

/// Named extension points invoked at fixed points of an instance's life.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleHook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
}

impl LifecycleHook {
    pub const ALL: [LifecycleHook; 8] = [
        Self::BeforeCreate,
        Self::Created,
        Self::BeforeMount,
        Self::Mounted,
        Self::BeforeUpdate,
        Self::Updated,
        Self::BeforeDestroy,
        Self::Destroyed,
    ];

    /// Hook name as used in `hook:<name>` events.
    pub fn name(self) -> &'static str {
        match self {
            Self::BeforeCreate => "beforeCreate",
            Self::Created => "created",
            Self::BeforeMount => "beforeMount",
            Self::Mounted => "mounted",
            Self::BeforeUpdate => "beforeUpdate",
            Self::Updated => "updated",
            Self::BeforeDestroy => "beforeDestroy",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Lifecycle hook callback. The instance is the receiver.
pub type Hook = Rc<dyn Fn(&Instance) -> Result<(), ComponentError>>;

/// Produces the initial data object of an instance.
pub type DataFn = Rc<dyn Fn(&Instance) -> Map<String, Value>>;

/// Produces the values an instance provides to its descendants.
pub type ProvideFn = Rc<dyn Fn(&Instance) -> Map<String, Value>>;

/// Instance method.
pub type MethodFn = Rc<dyn Fn(&Instance, &[Value]) -> Result<Value, ComponentError>>;

/// Computed property getter.
pub type ComputedFn = Rc<dyn Fn(&Instance) -> Value>;

/// Render function. Reads state through the proxy, builds nodes with the factory.
pub type RenderFn = Rc<dyn Fn(&RenderProxy, &ElementFactory) -> VNode>;

/// Default value factory for props and injections.
pub type DefaultFn = Rc<dyn Fn(&Instance) -> Value>;

// =============================================================================
// Props
// =============================================================================

/// Expected type of a prop value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl PropType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Default for a missing prop or injection.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Called with the instance; use for objects that must not be shared.
    Factory(DefaultFn),
}

impl DefaultValue {
    pub fn produce(&self, vm: &Instance) -> Value {
        match self {
            Self::Value(v) => v.clone(),
            Self::Factory(f) => f(vm),
        }
    }
}

impl From<Value> for DefaultValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Declaration of a single prop.
#[derive(Clone, Default)]
pub struct PropOptions {
    /// Accepted types. Empty accepts anything.
    pub types: Vec<PropType>,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl PropOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(ty: PropType) -> Self {
        Self {
            types: vec![ty],
            ..Self::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn default_factory(mut self, f: impl Fn(&Instance) -> Value + 'static) -> Self {
        self.default = Some(DefaultValue::Factory(Rc::new(f)));
        self
    }

    pub fn is_boolean(&self) -> bool {
        self.types.contains(&PropType::Boolean)
    }
}

// =============================================================================
// Inject / Watch
// =============================================================================

/// Declaration of a single injection.
#[derive(Clone)]
pub struct InjectOptions {
    /// Key looked up in ancestors' provided values.
    pub from: String,
    pub default: Option<DefaultValue>,
}

impl InjectOptions {
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            from: key.into(),
            default: None,
        }
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }
}

/// Watcher callback with its flags.
#[derive(Clone)]
pub struct WatchHandler {
    /// Called with `(vm, new, old)`.
    pub handler: Rc<dyn Fn(&Instance, &Value, &Value)>,
    /// Also call once with the initial value (`old` is `Null`).
    pub immediate: bool,
}

impl WatchHandler {
    pub fn new(handler: impl Fn(&Instance, &Value, &Value) + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            immediate: false,
        }
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

// =============================================================================
// Option Keys & Values
// =============================================================================

/// Option names.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    Name,
    Hook(LifecycleHook),
    Components,
    Props,
    Methods,
    Data,
    Computed,
    Watch,
    Provide,
    Inject,
    Render,
    StaticRenderFns,
    El,
    Extends,
    Mixins,
    Abstract,
    // Internal, set only by the fast path
    Parent,
    ParentVnode,
    ParentListeners,
    RenderChildren,
    ComponentTag,
    PropsData,
    /// User-defined key, merged by a registered strategy or child-wins.
    Custom(String),
}

impl OptionKey {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

/// Option values. Payloads are shared so identity is observable.
#[derive(Clone)]
pub enum OptionValue {
    Text(Rc<str>),
    Flag(bool),
    Hooks(Rc<Vec<Hook>>),
    Components(Rc<BTreeMap<String, ComponentClass>>),
    Props(Rc<BTreeMap<String, PropOptions>>),
    Methods(Rc<BTreeMap<String, MethodFn>>),
    Data(DataFn),
    Computed(Rc<BTreeMap<String, ComputedFn>>),
    Watch(Rc<BTreeMap<String, Vec<WatchHandler>>>),
    Provide(ProvideFn),
    Inject(Rc<BTreeMap<String, InjectOptions>>),
    Render(RenderFn),
    StaticRenderFns(Rc<Vec<RenderFn>>),
    Extends(Rc<Options>),
    Mixins(Rc<Vec<Rc<Options>>>),
    Parent(WeakInstance),
    Vnode(Rc<VNode>),
    Listeners(Rc<Listeners>),
    Children(Rc<Vec<VNode>>),
    Value(Rc<Value>),
}

impl OptionValue {
    /// Identity comparison. Flags compare by value.
    pub fn ptr_eq(&self, other: &OptionValue) -> bool {
        use OptionValue as V;
        match (self, other) {
            (V::Text(a), V::Text(b)) => Rc::ptr_eq(a, b),
            (V::Flag(a), V::Flag(b)) => a == b,
            (V::Hooks(a), V::Hooks(b)) => Rc::ptr_eq(a, b),
            (V::Components(a), V::Components(b)) => Rc::ptr_eq(a, b),
            (V::Props(a), V::Props(b)) => Rc::ptr_eq(a, b),
            (V::Methods(a), V::Methods(b)) => Rc::ptr_eq(a, b),
            (V::Data(a), V::Data(b)) => Rc::ptr_eq(a, b),
            (V::Computed(a), V::Computed(b)) => Rc::ptr_eq(a, b),
            (V::Watch(a), V::Watch(b)) => Rc::ptr_eq(a, b),
            (V::Provide(a), V::Provide(b)) => Rc::ptr_eq(a, b),
            (V::Inject(a), V::Inject(b)) => Rc::ptr_eq(a, b),
            (V::Render(a), V::Render(b)) => Rc::ptr_eq(a, b),
            (V::StaticRenderFns(a), V::StaticRenderFns(b)) => Rc::ptr_eq(a, b),
            (V::Extends(a), V::Extends(b)) => Rc::ptr_eq(a, b),
            (V::Mixins(a), V::Mixins(b)) => Rc::ptr_eq(a, b),
            (V::Parent(a), V::Parent(b)) => a.ptr_eq(b),
            (V::Vnode(a), V::Vnode(b)) => Rc::ptr_eq(a, b),
            (V::Listeners(a), V::Listeners(b)) => Rc::ptr_eq(a, b),
            (V::Children(a), V::Children(b)) => Rc::ptr_eq(a, b),
            (V::Value(a), V::Value(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "Text",
            Self::Flag(_) => "Flag",
            Self::Hooks(_) => "Hooks",
            Self::Components(_) => "Components",
            Self::Props(_) => "Props",
            Self::Methods(_) => "Methods",
            Self::Data(_) => "Data",
            Self::Computed(_) => "Computed",
            Self::Watch(_) => "Watch",
            Self::Provide(_) => "Provide",
            Self::Inject(_) => "Inject",
            Self::Render(_) => "Render",
            Self::StaticRenderFns(_) => "StaticRenderFns",
            Self::Extends(_) => "Extends",
            Self::Mixins(_) => "Mixins",
            Self::Parent(_) => "Parent",
            Self::Vnode(_) => "Vnode",
            Self::Listeners(_) => "Listeners",
            Self::Children(_) => "Children",
            Self::Value(_) => "Value",
        }
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Flag(b) => write!(f, "Flag({b})"),
            Self::Hooks(h) => write!(f, "Hooks(len={})", h.len()),
            Self::Components(c) => write!(f, "Components({:?})", c.keys().collect::<Vec<_>>()),
            Self::Value(v) => write!(f, "Value({v})"),
            other => f.write_str(other.kind()),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// A configuration object.
#[derive(Clone, Default)]
pub struct Options {
    entries: BTreeMap<OptionKey, OptionValue>,
    proto: Option<Rc<Options>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty options whose lookups fall through to `proto`.
    pub fn with_prototype(proto: Rc<Options>) -> Self {
        Self {
            entries: BTreeMap::new(),
            proto: Some(proto),
        }
    }

    pub fn prototype(&self) -> Option<&Rc<Options>> {
        self.proto.as_ref()
    }

    // -------------------------------------------------------------------------
    // Raw access
    // -------------------------------------------------------------------------

    /// Look up a key, falling through the prototype chain.
    pub fn get(&self, key: &OptionKey) -> Option<&OptionValue> {
        match self.entries.get(key) {
            Some(value) => Some(value),
            None => self.proto.as_ref().and_then(|p| p.get(key)),
        }
    }

    /// Look up a key in the own entries only.
    pub fn get_own(&self, key: &OptionKey) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn has_own(&self, key: &OptionKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: OptionKey, value: OptionValue) -> Option<OptionValue> {
        self.entries.insert(key, value)
    }

    pub fn remove(&mut self, key: &OptionKey) -> Option<OptionValue> {
        self.entries.remove(key)
    }

    /// Own keys.
    pub fn own_keys(&self) -> impl Iterator<Item = &OptionKey> {
        self.entries.keys()
    }

    /// Own keys plus every key reachable through the prototype chain.
    pub fn keys(&self) -> BTreeSet<OptionKey> {
        let mut keys = self
            .proto
            .as_ref()
            .map(|p| p.keys())
            .unwrap_or_default();
        keys.extend(self.entries.keys().cloned());
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.proto.is_none()
    }

    // -------------------------------------------------------------------------
    // Typed getters
    // -------------------------------------------------------------------------

    pub fn get_name(&self) -> Option<Rc<str>> {
        self.text(&OptionKey::Name)
    }

    pub fn get_el(&self) -> Option<Rc<str>> {
        self.text(&OptionKey::El)
    }

    pub fn component_tag(&self) -> Option<Rc<str>> {
        self.text(&OptionKey::ComponentTag)
    }

    fn text(&self, key: &OptionKey) -> Option<Rc<str>> {
        match self.get(key) {
            Some(OptionValue::Text(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.get(&OptionKey::Abstract), Some(OptionValue::Flag(true)))
    }

    /// Callbacks registered for `hook`, in registration order.
    pub fn hooks(&self, hook: LifecycleHook) -> Rc<Vec<Hook>> {
        match self.get(&OptionKey::Hook(hook)) {
            Some(OptionValue::Hooks(h)) => h.clone(),
            _ => Rc::new(Vec::new()),
        }
    }

    pub fn components(&self) -> Option<Rc<BTreeMap<String, ComponentClass>>> {
        match self.get(&OptionKey::Components) {
            Some(OptionValue::Components(c)) => Some(c.clone()),
            _ => None,
        }
    }

    pub fn props(&self) -> Option<Rc<BTreeMap<String, PropOptions>>> {
        match self.get(&OptionKey::Props) {
            Some(OptionValue::Props(p)) => Some(p.clone()),
            _ => None,
        }
    }

    pub fn methods(&self) -> Option<Rc<BTreeMap<String, MethodFn>>> {
        match self.get(&OptionKey::Methods) {
            Some(OptionValue::Methods(m)) => Some(m.clone()),
            _ => None,
        }
    }

    pub fn data_fn(&self) -> Option<DataFn> {
        match self.get(&OptionKey::Data) {
            Some(OptionValue::Data(d)) => Some(d.clone()),
            _ => None,
        }
    }

    pub fn get_computed(&self) -> Option<Rc<BTreeMap<String, ComputedFn>>> {
        match self.get(&OptionKey::Computed) {
            Some(OptionValue::Computed(c)) => Some(c.clone()),
            _ => None,
        }
    }

    pub fn watchers(&self) -> Option<Rc<BTreeMap<String, Vec<WatchHandler>>>> {
        match self.get(&OptionKey::Watch) {
            Some(OptionValue::Watch(w)) => Some(w.clone()),
            _ => None,
        }
    }

    pub fn provide_fn(&self) -> Option<ProvideFn> {
        match self.get(&OptionKey::Provide) {
            Some(OptionValue::Provide(p)) => Some(p.clone()),
            _ => None,
        }
    }

    pub fn injections(&self) -> Option<Rc<BTreeMap<String, InjectOptions>>> {
        match self.get(&OptionKey::Inject) {
            Some(OptionValue::Inject(i)) => Some(i.clone()),
            _ => None,
        }
    }

    pub fn render_fn(&self) -> Option<RenderFn> {
        match self.get(&OptionKey::Render) {
            Some(OptionValue::Render(r)) => Some(r.clone()),
            _ => None,
        }
    }

    pub fn static_render_fns(&self) -> Option<Rc<Vec<RenderFn>>> {
        match self.get(&OptionKey::StaticRenderFns) {
            Some(OptionValue::StaticRenderFns(r)) => Some(r.clone()),
            _ => None,
        }
    }

    pub fn extends_options(&self) -> Option<Rc<Options>> {
        match self.get(&OptionKey::Extends) {
            Some(OptionValue::Extends(e)) => Some(e.clone()),
            _ => None,
        }
    }

    pub fn mixin_options(&self) -> Option<Rc<Vec<Rc<Options>>>> {
        match self.get(&OptionKey::Mixins) {
            Some(OptionValue::Mixins(m)) => Some(m.clone()),
            _ => None,
        }
    }

    /// Parent instance (fast path only).
    pub fn parent(&self) -> Option<Instance> {
        match self.get(&OptionKey::Parent) {
            Some(OptionValue::Parent(p)) => p.upgrade(),
            _ => None,
        }
    }

    /// The placeholder node that created this instance (fast path only).
    pub fn parent_vnode(&self) -> Option<Rc<VNode>> {
        match self.get(&OptionKey::ParentVnode) {
            Some(OptionValue::Vnode(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn parent_listeners(&self) -> Option<Rc<Listeners>> {
        match self.get(&OptionKey::ParentListeners) {
            Some(OptionValue::Listeners(l)) => Some(l.clone()),
            _ => None,
        }
    }

    pub fn render_children(&self) -> Option<Rc<Vec<VNode>>> {
        match self.get(&OptionKey::RenderChildren) {
            Some(OptionValue::Children(c)) => Some(c.clone()),
            _ => None,
        }
    }

    pub fn get_props_data(&self) -> Option<Rc<Value>> {
        match self.get(&OptionKey::PropsData) {
            Some(OptionValue::Value(v)) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn custom(&self, key: &str) -> Option<&OptionValue> {
        self.get(&OptionKey::Custom(key.to_string()))
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn name(mut self, name: &str) -> Self {
        self.entries.insert(OptionKey::Name, OptionValue::Text(Rc::from(name)));
        self
    }

    /// Mount target; instances mount automatically when set.
    pub fn el(mut self, target: &str) -> Self {
        self.entries.insert(OptionKey::El, OptionValue::Text(Rc::from(target)));
        self
    }

    /// Abstract components are skipped when linking parents.
    pub fn abstract_component(mut self) -> Self {
        self.entries.insert(OptionKey::Abstract, OptionValue::Flag(true));
        self
    }

    /// Append a hook callback.
    pub fn hook(
        mut self,
        hook: LifecycleHook,
        callback: impl Fn(&Instance) -> Result<(), ComponentError> + 'static,
    ) -> Self {
        let callback: Hook = Rc::new(callback);
        match self.entries.get_mut(&OptionKey::Hook(hook)) {
            Some(OptionValue::Hooks(hooks)) => Rc::make_mut(hooks).push(callback),
            _ => {
                self.entries
                    .insert(OptionKey::Hook(hook), OptionValue::Hooks(Rc::new(vec![callback])));
            }
        }
        self
    }

    pub fn component(mut self, name: &str, class: &ComponentClass) -> Self {
        self.register_component(name, class.clone());
        self
    }

    pub fn prop(mut self, name: &str, prop: PropOptions) -> Self {
        match self.entries.get_mut(&OptionKey::Props) {
            Some(OptionValue::Props(props)) => {
                Rc::make_mut(props).insert(name.to_string(), prop);
            }
            _ => {
                let props = BTreeMap::from([(name.to_string(), prop)]);
                self.entries.insert(OptionKey::Props, OptionValue::Props(Rc::new(props)));
            }
        }
        self
    }

    pub fn method(
        mut self,
        name: &str,
        f: impl Fn(&Instance, &[Value]) -> Result<Value, ComponentError> + 'static,
    ) -> Self {
        let f: MethodFn = Rc::new(f);
        match self.entries.get_mut(&OptionKey::Methods) {
            Some(OptionValue::Methods(methods)) => {
                Rc::make_mut(methods).insert(name.to_string(), f);
            }
            _ => {
                let methods = BTreeMap::from([(name.to_string(), f)]);
                self.entries
                    .insert(OptionKey::Methods, OptionValue::Methods(Rc::new(methods)));
            }
        }
        self
    }

    pub fn data(mut self, f: impl Fn(&Instance) -> Map<String, Value> + 'static) -> Self {
        self.entries.insert(OptionKey::Data, OptionValue::Data(Rc::new(f)));
        self
    }

    pub fn computed(mut self, name: &str, f: impl Fn(&Instance) -> Value + 'static) -> Self {
        let f: ComputedFn = Rc::new(f);
        match self.entries.get_mut(&OptionKey::Computed) {
            Some(OptionValue::Computed(computed)) => {
                Rc::make_mut(computed).insert(name.to_string(), f);
            }
            _ => {
                let computed = BTreeMap::from([(name.to_string(), f)]);
                self.entries
                    .insert(OptionKey::Computed, OptionValue::Computed(Rc::new(computed)));
            }
        }
        self
    }

    /// Watch a data path (`"user.name"` walks into objects).
    pub fn watch(mut self, path: &str, handler: WatchHandler) -> Self {
        match self.entries.get_mut(&OptionKey::Watch) {
            Some(OptionValue::Watch(watch)) => {
                Rc::make_mut(watch)
                    .entry(path.to_string())
                    .or_default()
                    .push(handler);
            }
            _ => {
                let watch = BTreeMap::from([(path.to_string(), vec![handler])]);
                self.entries.insert(OptionKey::Watch, OptionValue::Watch(Rc::new(watch)));
            }
        }
        self
    }

    pub fn provide(mut self, f: impl Fn(&Instance) -> Map<String, Value> + 'static) -> Self {
        self.entries.insert(OptionKey::Provide, OptionValue::Provide(Rc::new(f)));
        self
    }

    pub fn inject(mut self, name: &str, inject: InjectOptions) -> Self {
        match self.entries.get_mut(&OptionKey::Inject) {
            Some(OptionValue::Inject(injects)) => {
                Rc::make_mut(injects).insert(name.to_string(), inject);
            }
            _ => {
                let injects = BTreeMap::from([(name.to_string(), inject)]);
                self.entries.insert(OptionKey::Inject, OptionValue::Inject(Rc::new(injects)));
            }
        }
        self
    }

    pub fn render(mut self, f: impl Fn(&RenderProxy, &ElementFactory) -> VNode + 'static) -> Self {
        self.entries.insert(OptionKey::Render, OptionValue::Render(Rc::new(f)));
        self
    }

    /// Append a static subtree render function, addressed by index from
    /// [`RenderProxy::render_static`].
    pub fn static_render_fn(
        mut self,
        f: impl Fn(&RenderProxy, &ElementFactory) -> VNode + 'static,
    ) -> Self {
        let f: RenderFn = Rc::new(f);
        match self.entries.get_mut(&OptionKey::StaticRenderFns) {
            Some(OptionValue::StaticRenderFns(fns)) => Rc::make_mut(fns).push(f),
            _ => {
                self.entries.insert(
                    OptionKey::StaticRenderFns,
                    OptionValue::StaticRenderFns(Rc::new(vec![f])),
                );
            }
        }
        self
    }

    /// Props for a root instance (children receive theirs from the vnode).
    pub fn props_data(mut self, data: Value) -> Self {
        self.entries.insert(OptionKey::PropsData, OptionValue::Value(Rc::new(data)));
        self
    }

    pub fn extends(mut self, base: Options) -> Self {
        self.entries.insert(OptionKey::Extends, OptionValue::Extends(Rc::new(base)));
        self
    }

    pub fn mixin(mut self, mixin: Options) -> Self {
        match self.entries.get_mut(&OptionKey::Mixins) {
            Some(OptionValue::Mixins(mixins)) => Rc::make_mut(mixins).push(Rc::new(mixin)),
            _ => {
                self.entries
                    .insert(OptionKey::Mixins, OptionValue::Mixins(Rc::new(vec![Rc::new(mixin)])));
            }
        }
        self
    }

    pub fn custom_value(mut self, key: &str, value: Value) -> Self {
        self.entries
            .insert(OptionKey::custom(key), OptionValue::Value(Rc::new(value)));
        self
    }

    /// Add `class` to the own `components` registry (copy-on-write).
    pub(crate) fn register_component(&mut self, name: &str, class: ComponentClass) {
        let mut components = self
            .components()
            .unwrap_or_else(|| Rc::new(BTreeMap::new()));
        Rc::make_mut(&mut components).insert(name.to_string(), class);
        self.entries
            .insert(OptionKey::Components, OptionValue::Components(components));
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("entries", &self.entries)
            .field("has_prototype", &self.proto.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prototype_fallthrough() {
        let base = Rc::new(Options::new().name("Base").el("#app"));
        let mut child = Options::with_prototype(base.clone());
        child.insert(OptionKey::El, OptionValue::Text(Rc::from("#other")));

        assert_eq!(child.get_name().as_deref(), Some("Base"));
        assert_eq!(child.get_el().as_deref(), Some("#other"));
        assert!(!child.has_own(&OptionKey::Name));
        assert!(Rc::ptr_eq(child.prototype().unwrap(), &base));
        assert!(child.keys().contains(&OptionKey::Name));
    }

    #[test]
    fn test_hook_builder_appends_in_order() {
        let options = Options::new()
            .hook(LifecycleHook::Created, |_| Ok(()))
            .hook(LifecycleHook::Created, |_| Ok(()));
        assert_eq!(options.hooks(LifecycleHook::Created).len(), 2);
        assert!(options.hooks(LifecycleHook::Mounted).is_empty());
    }

    #[test]
    fn test_ptr_eq_is_identity_not_equality() {
        let a = OptionValue::Value(Rc::new(json!(1)));
        let b = OptionValue::Value(Rc::new(json!(1)));
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert!(OptionValue::Flag(true).ptr_eq(&OptionValue::Flag(true)));
    }

    #[test]
    fn test_prop_options() {
        let prop = PropOptions::of(PropType::Boolean).required();
        assert!(prop.is_boolean());
        assert!(prop.required);
        assert!(PropType::Number.matches(&json!(3)));
        assert!(!PropType::Number.matches(&json!("3")));
    }

    #[test]
    fn test_lifecycle_hook_names() {
        assert_eq!(LifecycleHook::BeforeCreate.to_string(), "beforeCreate");
        assert_eq!(LifecycleHook::ALL.len(), 8);
    }
}
