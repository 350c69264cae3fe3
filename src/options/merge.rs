//! Options Merge Engine - Combine two configurations with per-key strategies.
//!
//! `merge_options(parent, child, vm)` first folds the child's `extends` and
//! `mixins` into the parent, then merges every key either side carries:
//!
//! | Key                                   | Strategy                                   |
//! |---------------------------------------|--------------------------------------------|
//! | lifecycle hooks                       | parent then child, deduped by identity     |
//! | `data`, `provide`                     | combined fn, child data deep-merged over parent |
//! | `watch`                               | handlers concatenated per watched path     |
//! | `props`, `methods`, `inject`, `computed`, `components` | map merge, child wins     |
//! | `el`, `propsData`                     | child wins, warns without an instance      |
//! | custom keys                           | registered strategy, else child wins       |
//! | everything else                       | child wins                                 |
//!
//! `extends` and `mixins` are consumed and never appear in the result, so a
//! merged configuration can be merged again without re-applying them.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::{DataFn, Hook, OptionKey, OptionValue, Options, WatchHandler};
use crate::instance::Instance;
use crate::runtime::Runtime;

/// Tags that cannot be used as component names.
const RESERVED_TAGS: &[&str] = &["slot", "component"];

// =============================================================================
// Entry Point
// =============================================================================

/// Merge `child` over `parent`.
///
/// `vm` is the instance under construction, absent when merging class
/// definitions (`extend`, `mixin`, resolver re-merges).
pub fn merge_options(
    runtime: &Runtime,
    parent: &Options,
    child: &Options,
    vm: Option<&Instance>,
) -> Options {
    if let Some(components) = child.components() {
        for name in components.keys() {
            validate_component_name(runtime, name);
        }
    }

    let mut base = Cow::Borrowed(parent);
    if let Some(extends) = child.extends_options() {
        base = Cow::Owned(merge_options(runtime, &base, &extends, vm));
    }
    if let Some(mixins) = child.mixin_options() {
        for mixin in mixins.iter() {
            base = Cow::Owned(merge_options(runtime, &base, mixin, vm));
        }
    }

    let mut keys: BTreeSet<OptionKey> = base.keys();
    keys.extend(child.keys());

    let mut merged = Options::new();
    for key in keys {
        if matches!(key, OptionKey::Extends | OptionKey::Mixins) {
            continue;
        }
        if let Some(value) = merge_field(runtime, &key, base.get(&key), child.get(&key), vm) {
            merged.insert(key, value);
        }
    }
    merged
}

// =============================================================================
// Strategy Dispatch
// =============================================================================

/// Apply a typed strategy when both sides hold `$variant`, default otherwise.
macro_rules! typed_strategy {
    ($parent:expr, $child:expr, $variant:ident, $merge:expr) => {{
        let parent = $parent;
        let child = $child;
        let p = match parent {
            Some(OptionValue::$variant(v)) => Some(v),
            _ => None,
        };
        let c = match child {
            Some(OptionValue::$variant(v)) => Some(v),
            _ => None,
        };
        if p.is_none() != parent.is_none() || c.is_none() != child.is_none() {
            default_strategy(parent, child)
        } else {
            $merge(p, c).map(OptionValue::$variant)
        }
    }};
}

fn merge_field(
    runtime: &Runtime,
    key: &OptionKey,
    parent: Option<&OptionValue>,
    child: Option<&OptionValue>,
    vm: Option<&Instance>,
) -> Option<OptionValue> {
    match key {
        OptionKey::Hook(_) => typed_strategy!(parent, child, Hooks, merge_hooks),
        OptionKey::Data => typed_strategy!(parent, child, Data, merge_data_fn),
        OptionKey::Provide => typed_strategy!(parent, child, Provide, merge_data_fn),
        OptionKey::Watch => typed_strategy!(parent, child, Watch, merge_watch),
        OptionKey::Props => typed_strategy!(parent, child, Props, extend_map),
        OptionKey::Methods => typed_strategy!(parent, child, Methods, extend_map),
        OptionKey::Inject => typed_strategy!(parent, child, Inject, extend_map),
        OptionKey::Computed => typed_strategy!(parent, child, Computed, extend_map),
        OptionKey::Components => typed_strategy!(parent, child, Components, extend_map),
        OptionKey::El | OptionKey::PropsData => {
            if vm.is_none() && child.is_some() {
                runtime.warn(
                    None,
                    format!(
                        "option \"{}\" can only be used during instance creation",
                        if *key == OptionKey::El { "el" } else { "propsData" }
                    ),
                );
            }
            default_strategy(parent, child)
        }
        OptionKey::Custom(name) => match runtime.config().merge_strategies.get(name) {
            Some(strategy) => strategy(parent, child, vm),
            None => default_strategy(parent, child),
        },
        _ => default_strategy(parent, child),
    }
}

/// Child wins when present.
fn default_strategy(parent: Option<&OptionValue>, child: Option<&OptionValue>) -> Option<OptionValue> {
    child.or(parent).cloned()
}

// =============================================================================
// Strategies
// =============================================================================

fn merge_hooks(parent: Option<&Rc<Vec<Hook>>>, child: Option<&Rc<Vec<Hook>>>) -> Option<Rc<Vec<Hook>>> {
    let child = match child {
        Some(child) => child,
        None => return parent.cloned(),
    };
    let mut hooks: Vec<Hook> = Vec::new();
    for hook in parent.into_iter().flat_map(|p| p.iter()).chain(child.iter()) {
        if !hooks.iter().any(|h| Rc::ptr_eq(h, hook)) {
            hooks.push(hook.clone());
        }
    }
    Some(Rc::new(hooks))
}

fn merge_data_fn(parent: Option<&DataFn>, child: Option<&DataFn>) -> Option<DataFn> {
    match (parent, child) {
        (None, child) => child.cloned(),
        (parent, None) => parent.cloned(),
        (Some(parent), Some(child)) => {
            let parent = parent.clone();
            let child = child.clone();
            let merged: DataFn = Rc::new(move |vm: &Instance| merge_data(child(vm), parent(vm)));
            Some(merged)
        }
    }
}

/// Deep-merge `from` into `to`. Keys already in `to` win; nested objects
/// present on both sides are merged recursively.
pub(crate) fn merge_data(mut to: Map<String, Value>, from: Map<String, Value>) -> Map<String, Value> {
    for (key, from_value) in from {
        match to.get_mut(&key) {
            None => {
                to.insert(key, from_value);
            }
            Some(Value::Object(to_object)) => {
                if let Value::Object(from_object) = from_value {
                    let merged = merge_data(std::mem::take(to_object), from_object);
                    *to_object = merged;
                }
            }
            Some(_) => {}
        }
    }
    to
}

fn merge_watch(
    parent: Option<&Rc<BTreeMap<String, Vec<WatchHandler>>>>,
    child: Option<&Rc<BTreeMap<String, Vec<WatchHandler>>>>,
) -> Option<Rc<BTreeMap<String, Vec<WatchHandler>>>> {
    match (parent, child) {
        (None, child) => child.cloned(),
        (parent, None) => parent.cloned(),
        (Some(parent), Some(child)) => {
            let mut merged = (**parent).clone();
            for (path, handlers) in child.iter() {
                merged
                    .entry(path.clone())
                    .or_default()
                    .extend(handlers.iter().cloned());
            }
            Some(Rc::new(merged))
        }
    }
}

fn extend_map<T: Clone>(
    parent: Option<&Rc<BTreeMap<String, T>>>,
    child: Option<&Rc<BTreeMap<String, T>>>,
) -> Option<Rc<BTreeMap<String, T>>> {
    match (parent, child) {
        (None, child) => child.cloned(),
        (parent, None) => parent.cloned(),
        (Some(parent), Some(child)) => {
            let mut merged = (**parent).clone();
            merged.extend(child.iter().map(|(k, v)| (k.clone(), v.clone())));
            Some(Rc::new(merged))
        }
    }
}

// =============================================================================
// Component Names
// =============================================================================

/// Check a component name, warning when it is unusable. Returns validity.
pub fn validate_component_name(runtime: &Runtime, name: &str) -> bool {
    let mut chars = name.chars();
    let well_formed = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'));
    if !well_formed {
        runtime.warn(
            None,
            format!(
                "Invalid component name: \"{name}\". Component names should start with a letter \
                 and contain only alphanumerics, '-', '.' or '_'"
            ),
        );
        return false;
    }
    if RESERVED_TAGS.contains(&name.to_ascii_lowercase().as_str()) {
        runtime.warn(
            None,
            format!("Do not use built-in or reserved element as component id: {name}"),
        );
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{LifecycleHook, PropOptions, PropType};
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_hooks_concatenate_parent_first() {
        let runtime = Runtime::new();
        let parent = Options::new().hook(LifecycleHook::Created, |_| Ok(()));
        let child = Options::new().hook(LifecycleHook::Created, |_| Ok(()));

        let merged = merge_options(&runtime, &parent, &child, None);
        let hooks = merged.hooks(LifecycleHook::Created);
        assert_eq!(hooks.len(), 2);
        assert!(Rc::ptr_eq(&hooks[0], &parent.hooks(LifecycleHook::Created)[0]));
        assert!(Rc::ptr_eq(&hooks[1], &child.hooks(LifecycleHook::Created)[0]));
    }

    #[test]
    fn test_hooks_dedupe_by_identity() {
        let runtime = Runtime::new();
        let parent = Options::new().hook(LifecycleHook::Mounted, |_| Ok(()));

        // Merging a configuration into itself must not duplicate callbacks
        let merged = merge_options(&runtime, &parent, &parent, None);
        assert_eq!(merged.hooks(LifecycleHook::Mounted).len(), 1);
    }

    #[test]
    fn test_parent_only_value_keeps_identity() {
        let runtime = Runtime::new();
        let parent = Options::new().method("save", |_, _| Ok(Value::Null));
        let merged = merge_options(&runtime, &parent, &Options::new(), None);

        let a = parent.get(&OptionKey::Methods).unwrap();
        let b = merged.get(&OptionKey::Methods).unwrap();
        assert!(a.ptr_eq(b));
    }

    #[test]
    fn test_maps_child_overrides() {
        let runtime = Runtime::new();
        let parent = Options::new()
            .prop("title", PropOptions::of(PropType::String))
            .prop("size", PropOptions::of(PropType::Number));
        let child = Options::new().prop("size", PropOptions::of(PropType::String));

        let merged = merge_options(&runtime, &parent, &child, None);
        let props = merged.props().unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props["size"].types, vec![PropType::String]);
        assert_eq!(props["title"].types, vec![PropType::String]);
    }

    #[test]
    fn test_watch_handlers_concatenate() {
        let runtime = Runtime::new();
        let parent = Options::new().watch("count", WatchHandler::new(|_, _, _| {}));
        let child = Options::new()
            .watch("count", WatchHandler::new(|_, _, _| {}))
            .watch("name", WatchHandler::new(|_, _, _| {}));

        let merged = merge_options(&runtime, &parent, &child, None);
        let watch = merged.watchers().unwrap();
        assert_eq!(watch["count"].len(), 2);
        assert_eq!(watch["name"].len(), 1);
    }

    #[test]
    fn test_merge_data_child_wins_and_nests() {
        let child = obj(json!({ "a": 1, "nested": { "x": 1 } }));
        let parent = obj(json!({ "a": 2, "b": 3, "nested": { "x": 2, "y": 2 } }));

        let merged = merge_data(child, parent);
        assert_eq!(
            Value::Object(merged),
            json!({ "a": 1, "b": 3, "nested": { "x": 1, "y": 2 } })
        );
    }

    #[test]
    fn test_extends_and_mixins_fold_in_order() {
        let runtime = Runtime::new();
        let extends = Options::new()
            .name("Extended")
            .custom_value("who", json!("extends"));
        let mixin = Options::new().custom_value("who", json!("mixin"));
        let child = Options::new().extends(extends).mixin(mixin);

        let merged = merge_options(&runtime, &Options::new(), &child, None);

        // Mixins fold after extends, so they win over it
        assert_eq!(merged.get_name().as_deref(), Some("Extended"));
        match merged.custom("who") {
            Some(OptionValue::Value(v)) => assert_eq!(**v, json!("mixin")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!merged.has_own(&OptionKey::Extends));
        assert!(!merged.has_own(&OptionKey::Mixins));
    }

    #[test]
    fn test_custom_strategy() {
        let config = crate::runtime::Config::default().with_merge_strategy("tags", |p, c, _| {
            let mut tags = Vec::new();
            for side in [p, c].into_iter().flatten() {
                if let OptionValue::Value(v) = side {
                    tags.extend(v.as_array().cloned().unwrap_or_default());
                }
            }
            Some(OptionValue::Value(Rc::new(Value::Array(tags))))
        });
        let runtime = Runtime::with_config(config);

        let parent = Options::new().custom_value("tags", json!(["a"]));
        let child = Options::new().custom_value("tags", json!(["b"]));
        let merged = merge_options(&runtime, &parent, &child, None);

        match merged.custom("tags") {
            Some(OptionValue::Value(v)) => assert_eq!(**v, json!(["a", "b"])),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unregistered_custom_key_child_wins() {
        let runtime = Runtime::new();
        let parent = Options::new().custom_value("level", json!(1));
        let child = Options::new().custom_value("level", json!(2));
        let merged = merge_options(&runtime, &parent, &child, None);
        match merged.custom("level") {
            Some(OptionValue::Value(v)) => assert_eq!(**v, json!(2)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_validate_component_name() {
        let runtime = Runtime::new();
        assert!(validate_component_name(&runtime, "todo-item"));
        assert!(validate_component_name(&runtime, "TodoItem"));
        assert!(!validate_component_name(&runtime, "1item"));
        assert!(!validate_component_name(&runtime, "slot"));
        assert!(!validate_component_name(&runtime, ""));
    }
}
