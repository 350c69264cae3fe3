//! Reactive state - Props, methods, data, computed and watchers.
//!
//! Initialized in that order. Props and data keys each own a
//! `Signal<Value>`; computed values are `derived` from whatever their getter
//! reads; watchers are effects over a dotted data path.
//!
//! Reads go props → data → computed → injected. Data keys starting with `$`
//! or `_` are kept in `$data` but never readable by name.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::{derived, effect, signal, Signal};

use super::lifecycle::without_tracking;
use super::Instance;
use crate::error::ComponentError;
use crate::options::{MethodFn, PropOptions, PropType, WatchHandler};
use crate::util::{hyphenate, is_reserved};

type ComputedGetter = Rc<dyn Fn() -> Value>;

#[derive(Default)]
pub(crate) struct State {
    pub(crate) props: BTreeMap<String, Signal<Value>>,
    pub(crate) methods: BTreeMap<String, MethodFn>,
    pub(crate) data: BTreeMap<String, Signal<Value>>,
    pub(crate) computed: BTreeMap<String, ComputedGetter>,
    pub(crate) watchers: Vec<Box<dyn FnOnce()>>,
}

pub(crate) fn init_state(vm: &Instance) {
    init_props(vm);
    init_methods(vm);
    init_data(vm);
    init_computed(vm);
    init_watch(vm);
}

// =============================================================================
// Props
// =============================================================================

const RESERVED_ATTRIBUTES: [&str; 5] = ["key", "ref", "slot", "slot-scope", "is"];

fn init_props(vm: &Instance) {
    let options = vm.options();
    let Some(props) = options.props() else {
        return;
    };
    let props_data = options.get_props_data();

    let mut signals = BTreeMap::new();
    for (key, prop) in props.iter() {
        if RESERVED_ATTRIBUTES.contains(&hyphenate(key).as_str()) {
            vm.runtime().warn(
                Some(vm),
                format!("\"{key}\" is a reserved attribute and cannot be used as component prop."),
            );
        }
        let value = validate_prop(vm, key, prop, props_data.as_deref());
        signals.insert(key.clone(), signal(value));
    }
    vm.0.state.borrow_mut().props = signals;
}

/// Resolve the value of one prop from the passed data.
///
/// - boolean props that are absent and have no default become `false`
/// - boolean props passed as `""` or their own hyphenated name become `true`,
///   unless `String` is accepted and listed first
/// - absent props take their default, else `Null`
pub(crate) fn validate_prop(
    vm: &Instance,
    key: &str,
    prop: &PropOptions,
    props_data: Option<&Value>,
) -> Value {
    let absent = !props_data
        .and_then(Value::as_object)
        .is_some_and(|data| data.contains_key(key));
    let mut value = props_data.and_then(|data| data.get(key)).cloned();

    if prop.is_boolean() {
        match &value {
            None if prop.default.is_none() => value = Some(Value::Bool(false)),
            Some(Value::String(s)) if s.is_empty() || *s == hyphenate(key) => {
                let position = |ty: PropType| prop.types.iter().position(|t| *t == ty);
                let boolean = position(PropType::Boolean);
                let string = position(PropType::String);
                if string.is_none() || boolean < string {
                    value = Some(Value::Bool(true));
                }
            }
            _ => {}
        }
    }

    let value = match value {
        Some(value) => value,
        None => prop
            .default
            .as_ref()
            .map(|default| default.produce(vm))
            .unwrap_or(Value::Null),
    };
    assert_prop(vm, key, prop, &value, absent);
    value
}

fn assert_prop(vm: &Instance, key: &str, prop: &PropOptions, value: &Value, absent: bool) {
    if prop.required && absent {
        vm.runtime()
            .warn(Some(vm), format!("Missing required prop: \"{key}\""));
        return;
    }
    if value.is_null() && !prop.required {
        return;
    }
    if prop.types.is_empty() || prop.types.iter().any(|ty| ty.matches(value)) {
        return;
    }
    let expected: Vec<String> = prop.types.iter().map(|ty| format!("{ty:?}")).collect();
    vm.runtime().warn(
        Some(vm),
        format!(
            "Invalid prop: type check failed for prop \"{key}\". Expected {}, got {}",
            expected.join(", "),
            value_kind(value)
        ),
    );
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

// =============================================================================
// Methods
// =============================================================================

fn init_methods(vm: &Instance) {
    let options = vm.options();
    let Some(methods) = options.methods() else {
        return;
    };

    for key in methods.keys() {
        if vm.0.state.borrow().props.contains_key(key) {
            vm.runtime().warn(
                Some(vm),
                format!("Method \"{key}\" has already been defined as a prop."),
            );
        }
        if is_reserved(key) {
            vm.runtime().warn(
                Some(vm),
                format!(
                    "Method \"{key}\" conflicts with an existing instance method. \
                     Avoid defining component methods that start with _ or $."
                ),
            );
        }
    }
    vm.0.state.borrow_mut().methods = (*methods).clone();
}

// =============================================================================
// Data
// =============================================================================

fn init_data(vm: &Instance) {
    let data = match vm.options().data_fn() {
        Some(data_fn) => data_fn(vm),
        None => Map::new(),
    };

    let mut signals = BTreeMap::new();
    for (key, value) in data {
        let (in_methods, in_props) = {
            let state = vm.0.state.borrow();
            (state.methods.contains_key(&key), state.props.contains_key(&key))
        };
        if in_methods {
            vm.runtime().warn(
                Some(vm),
                format!("Method \"{key}\" has already been defined as a data property."),
            );
        }
        if in_props {
            vm.runtime().warn(
                Some(vm),
                format!(
                    "The data property \"{key}\" is already declared as a prop. \
                     Use prop default value instead."
                ),
            );
        }
        signals.insert(key, signal(value));
    }
    vm.0.state.borrow_mut().data = signals;
}

// =============================================================================
// Computed
// =============================================================================

fn init_computed(vm: &Instance) {
    let options = vm.options();
    let Some(computed) = options.get_computed() else {
        return;
    };

    for (key, getter) in computed.iter() {
        let (in_data, in_props) = {
            let state = vm.0.state.borrow();
            (state.data.contains_key(key), state.props.contains_key(key))
        };
        if in_data {
            vm.runtime().warn(
                Some(vm),
                format!("The computed property \"{key}\" is already defined in data."),
            );
            continue;
        }
        if in_props {
            vm.runtime().warn(
                Some(vm),
                format!("The computed property \"{key}\" is already defined as a prop."),
            );
            continue;
        }

        let weak = vm.downgrade();
        let getter = getter.clone();
        let value = derived(move || match weak.upgrade() {
            Some(vm) => getter(&vm),
            None => Value::Null,
        });
        let read: ComputedGetter = Rc::new(move || value.get());
        vm.0.state.borrow_mut().computed.insert(key.clone(), read);
    }
}

// =============================================================================
// Watch
// =============================================================================

fn init_watch(vm: &Instance) {
    let Some(watchers) = vm.options().watchers() else {
        return;
    };
    for (path, handlers) in watchers.iter() {
        for handler in handlers {
            create_watcher(vm, path, handler.clone());
        }
    }
}

/// Call `handler` whenever the value at `path` changes.
///
/// The path is read inside an effect, so any signal it touches is a
/// dependency. The first run only records the value, unless the handler is
/// `immediate`.
fn create_watcher(vm: &Instance, path: &str, handler: WatchHandler) {
    let weak = vm.downgrade();
    let path = path.to_string();
    let last: Rc<RefCell<Option<Value>>> = Rc::new(RefCell::new(None));

    let stop = effect(move || {
        let Some(vm) = weak.upgrade() else {
            return;
        };
        let current = vm.get_path(&path);
        let previous = last.borrow_mut().replace(current.clone());
        without_tracking(|| match previous {
            None if handler.immediate => (handler.handler)(&vm, &current, &Value::Null),
            Some(old) if old != current => (handler.handler)(&vm, &current, &old),
            _ => {}
        });
    });
    vm.0.state.borrow_mut().watchers.push(Box::new(stop));
}

pub(crate) fn teardown_watchers(vm: &Instance) {
    let watchers = std::mem::take(&mut vm.0.state.borrow_mut().watchers);
    for stop in watchers {
        stop();
    }
}

// =============================================================================
// Instance accessors
// =============================================================================

enum Binding {
    Signal(Signal<Value>),
    Computed(ComputedGetter),
}

impl Instance {
    fn lookup(&self, key: &str) -> Option<Binding> {
        {
            let state = self.0.state.borrow();
            if let Some(prop) = state.props.get(key) {
                return Some(Binding::Signal(prop.clone()));
            }
            if !is_reserved(key) {
                if let Some(data) = state.data.get(key) {
                    return Some(Binding::Signal(data.clone()));
                }
            }
            if let Some(computed) = state.computed.get(key) {
                return Some(Binding::Computed(computed.clone()));
            }
        }
        self.0
            .injected
            .borrow()
            .get(key)
            .cloned()
            .map(Binding::Signal)
    }

    /// Read a prop, data, computed or injected value.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.lookup(key)? {
            Binding::Signal(signal) => Some(signal.get()),
            Binding::Computed(read) => Some(read()),
        }
    }

    /// Read a dotted path such as `"user.name"` or `"items.0"`.
    pub fn get_path(&self, path: &str) -> Value {
        let mut segments = path.split('.');
        let Some(first) = segments.next() else {
            return Value::Null;
        };
        let mut value = self.get(first).unwrap_or(Value::Null);
        for segment in segments {
            value = match &value {
                Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            };
        }
        value
    }

    /// Write a data value. Returns whether anything was written.
    ///
    /// Writing a prop or an injection works but warns, since the parent
    /// overwrites it on its next render. Computed values are read-only.
    pub fn set(&self, key: &str, value: Value) -> bool {
        let (is_prop, is_data, is_computed) = {
            let state = self.0.state.borrow();
            (
                state.props.contains_key(key),
                !is_reserved(key) && state.data.contains_key(key),
                state.computed.contains_key(key),
            )
        };
        let is_injected = self.0.injected.borrow().contains_key(key);

        if is_prop {
            self.runtime().warn(
                Some(self),
                format!(
                    "Avoid mutating a prop directly since the value will be overwritten \
                     whenever the parent component re-renders. Prop being mutated: \"{key}\""
                ),
            );
        } else if is_computed {
            self.runtime().warn(
                Some(self),
                format!("Computed property \"{key}\" was assigned to but it has no setter."),
            );
            return false;
        } else if is_injected && !is_data {
            self.runtime().warn(
                Some(self),
                format!(
                    "Avoid mutating an injected value directly since the changes will be \
                     overwritten whenever the provided component re-renders. \
                     Injection being mutated: \"{key}\""
                ),
            );
        } else if !is_data {
            self.runtime().warn(
                Some(self),
                format!("Property \"{key}\" is not declared in data and cannot be set."),
            );
            return false;
        }

        match self.lookup(key) {
            Some(Binding::Signal(signal)) => {
                signal.set(value);
                true
            }
            _ => false,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some() || self.has_method(key)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.0.state.borrow().methods.contains_key(name)
    }

    /// Call a declared method with the instance as receiver.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, ComponentError> {
        let method = self.0.state.borrow().methods.get(name).cloned();
        match method {
            Some(method) => method(self, args),
            None => Err(ComponentError::UnknownMethod(name.to_string())),
        }
    }

    /// Every data key, including reserved ones (`$data`).
    pub fn data_raw(&self) -> Map<String, Value> {
        let signals: Vec<(String, Signal<Value>)> = self
            .0
            .state
            .borrow()
            .data
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        signals.into_iter().map(|(k, s)| (k, s.get())).collect()
    }

    /// Resolved prop values (`$props`).
    pub fn props(&self) -> Map<String, Value> {
        let signals: Vec<(String, Signal<Value>)> = self
            .0
            .state
            .borrow()
            .props
            .iter()
            .map(|(k, s)| (k.clone(), s.clone()))
            .collect();
        signals.into_iter().map(|(k, s)| (k, s.get())).collect()
    }

    /// Watch `path` until the instance is destroyed (`$watch`).
    pub fn watch(&self, path: &str, handler: WatchHandler) {
        create_watcher(self, path, handler);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::options::{Options, PropOptions, PropType};
    use crate::{ComponentClass, Runtime};

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn instance(options: Options) -> Instance {
        let runtime = Runtime::new();
        ComponentClass::base(&runtime).new_instance(options).unwrap()
    }

    #[test]
    fn test_props_defaults_and_boolean_casting() {
        let vm = instance(
            Options::new()
                .prop("size", PropOptions::of(PropType::Number).default_value(json!(10)))
                .prop("disabled", PropOptions::of(PropType::Boolean))
                .prop("checked", PropOptions::of(PropType::Boolean))
                .prop(
                    "label",
                    PropOptions {
                        types: vec![PropType::String, PropType::Boolean],
                        ..PropOptions::default()
                    },
                )
                .prop("title", PropOptions::of(PropType::String))
                .props_data(json!({ "checked": "", "label": "" })),
        );

        assert_eq!(vm.get("size"), Some(json!(10)));
        assert_eq!(vm.get("disabled"), Some(json!(false)));
        assert_eq!(vm.get("checked"), Some(json!(true)));
        // String listed first keeps the empty string
        assert_eq!(vm.get("label"), Some(json!("")));
        assert_eq!(vm.get("title"), Some(Value::Null));
        assert_eq!(vm.props().len(), 5);
    }

    #[test]
    fn test_default_factory_gets_fresh_value() {
        let vm = instance(Options::new().prop(
            "items",
            PropOptions::of(PropType::Array).default_factory(|_| json!([])),
        ));
        assert_eq!(vm.get("items"), Some(json!([])));
    }

    #[test]
    fn test_data_is_reactive_and_reserved_keys_hidden() {
        let vm = instance(
            Options::new().data(|_| object(json!({ "count": 1, "_secret": 2, "$meta": 3 }))),
        );

        assert_eq!(vm.get("count"), Some(json!(1)));
        assert_eq!(vm.get("_secret"), None);
        assert_eq!(vm.get("$meta"), None);
        assert_eq!(vm.data_raw().len(), 3);

        assert!(vm.set("count", json!(5)));
        assert_eq!(vm.get("count"), Some(json!(5)));
        assert!(!vm.set("undeclared", json!(1)));
    }

    #[test]
    fn test_data_sees_props() {
        let vm = instance(
            Options::new()
                .prop("start", PropOptions::of(PropType::Number))
                .props_data(json!({ "start": 7 }))
                .data(|vm| {
                    let start = vm.get("start").unwrap_or(Value::Null);
                    object(json!({ "current": start }))
                }),
        );
        assert_eq!(vm.get("current"), Some(json!(7)));
    }

    #[test]
    fn test_methods() {
        let vm = instance(
            Options::new()
                .data(|_| object(json!({ "count": 0 })))
                .method("add", |vm, args| {
                    let by = args.first().and_then(Value::as_i64).unwrap_or(1);
                    let count = vm.get("count").and_then(|v| v.as_i64()).unwrap_or(0);
                    vm.set("count", json!(count + by));
                    Ok(json!(count + by))
                }),
        );

        assert_eq!(vm.call_method("add", &[json!(3)]), Ok(json!(3)));
        assert_eq!(vm.get("count"), Some(json!(3)));
        assert!(vm.has("add"));
        assert_eq!(
            vm.call_method("nope", &[]),
            Err(ComponentError::UnknownMethod("nope".to_string()))
        );
    }

    #[test]
    fn test_computed_tracks_data() {
        let vm = instance(
            Options::new()
                .data(|_| object(json!({ "first": "Ada", "last": "Lovelace" })))
                .computed("full", |vm| {
                    let first = vm.get("first").unwrap_or(Value::Null);
                    let last = vm.get("last").unwrap_or(Value::Null);
                    json!(format!(
                        "{} {}",
                        first.as_str().unwrap_or_default(),
                        last.as_str().unwrap_or_default()
                    ))
                }),
        );

        assert_eq!(vm.get("full"), Some(json!("Ada Lovelace")));
        vm.set("last", json!("Byron"));
        assert_eq!(vm.get("full"), Some(json!("Ada Byron")));
        assert!(!vm.set("full", json!("x")));
    }

    #[test]
    fn test_computed_conflicting_with_data_is_skipped() {
        let vm = instance(
            Options::new()
                .data(|_| object(json!({ "x": 1 })))
                .computed("x", |_| json!(2)),
        );
        assert_eq!(vm.get("x"), Some(json!(1)));
    }

    #[test]
    fn test_watch_reports_new_and_old() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let vm = instance(
            Options::new()
                .data(|_| object(json!({ "user": { "name": "a" } })))
                .watch(
                    "user.name",
                    WatchHandler::new(move |_, new, old| {
                        seen_clone.borrow_mut().push((new.clone(), old.clone()));
                    }),
                ),
        );

        assert!(seen.borrow().is_empty());
        vm.set("user", json!({ "name": "b" }));
        assert_eq!(*seen.borrow(), vec![(json!("b"), json!("a"))]);
    }

    #[test]
    fn test_immediate_watcher_and_teardown() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        let vm = instance(Options::new().data(|_| object(json!({ "n": 1 }))));

        vm.watch(
            "n",
            WatchHandler::new(move |_, new, old| {
                seen_clone.borrow_mut().push((new.clone(), old.clone()));
            })
            .immediate(),
        );
        assert_eq!(*seen.borrow(), vec![(json!(1), Value::Null)]);

        vm.destroy();
        vm.set("n", json!(2));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_watch_handler_reads_are_not_dependencies() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let vm = instance(Options::new().data(|_| object(json!({ "n": 1, "other": "x" }))));

        vm.watch(
            "n",
            WatchHandler::new(move |vm, _, _| {
                let _ = vm.get("other");
                calls_clone.set(calls_clone.get() + 1);
            }),
        );
        vm.set("n", json!(2));
        assert_eq!(calls.get(), 1);

        vm.set("other", json!("y"));
        assert_eq!(calls.get(), 1);
        vm.set("n", json!(3));
        assert_eq!(calls.get(), 2);
    }
}
