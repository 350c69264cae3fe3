//! Constructor Options Resolver - Keep a class's options current with its ancestors.
//!
//! Resolution is a memoized walk up the class chain. A class re-merges only
//! when its parent's resolved options are no longer the `Rc` it cached in
//! `super_options`; otherwise the stored options are returned as-is, so
//! repeated resolution with no ancestor change is identity-stable.
//!
//! Values attached to a class's options after its last merge (through
//! [`ComponentClass::patch_options`] or `register_component`) are found by
//! diffing the options against the sealed snapshot and folded into the
//! class's `extend_options` before re-merging, so they are not lost.

use std::rc::Rc;

use log::debug;

use super::{merge_options, Options};
use crate::class::ComponentClass;

/// Effective options for `class`.
pub fn resolve_constructor_options(class: &ComponentClass) -> Rc<Options> {
    let (candidate, super_class, cached_super) = {
        let inner = class.inner();
        (
            inner.options.clone(),
            inner.super_class.clone(),
            inner.super_options.clone(),
        )
    };

    let Some(super_class) = super_class else {
        return candidate;
    };

    let super_options = resolve_constructor_options(&super_class);
    if cached_super.is_some_and(|cached| Rc::ptr_eq(&cached, &super_options)) {
        return candidate;
    }

    debug!(
        "super options of class {} changed, re-merging",
        class.cid()
    );

    let modified = resolve_modified_options(class);
    let extend_options = {
        let mut inner = class.inner_mut();
        inner.super_options = Some(super_options.clone());
        if let Some(modified) = modified {
            for key in modified.keys() {
                if let Some(value) = modified.get(&key) {
                    inner.extend_options.insert(key, value.clone());
                }
            }
        }
        inner.extend_options.clone()
    };

    let runtime = class.runtime();
    let mut options = merge_options(&runtime, &super_options, &extend_options, None);
    if let Some(name) = options.get_name() {
        options.register_component(&name, class.clone());
    }

    let options = Rc::new(options);
    {
        let mut inner = class.inner_mut();
        inner.options = options.clone();
        inner.sealed_options = options.clone();
    }
    options
}

/// Keys of `class.options` whose value is not the one sealed at the last merge.
///
/// Returns `None` when nothing was modified.
pub fn resolve_modified_options(class: &ComponentClass) -> Option<Options> {
    let inner = class.inner();
    let latest = &inner.options;
    let sealed = &inner.sealed_options;

    let mut modified: Option<Options> = None;
    for key in latest.keys() {
        let Some(value) = latest.get(&key) else {
            continue;
        };
        let unchanged = sealed.get(&key).is_some_and(|s| s.ptr_eq(value));
        if !unchanged {
            modified
                .get_or_insert_with(Options::new)
                .insert(key, value.clone());
        }
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{LifecycleHook, OptionKey, OptionValue};
    use crate::runtime::Runtime;
    use serde_json::json;

    #[test]
    fn test_root_class_returns_options_unchanged() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let first = resolve_constructor_options(&base);
        let second = resolve_constructor_options(&base);
        assert!(Rc::ptr_eq(&first, &base.options()));
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_resolution_is_idempotent_without_ancestor_change() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let sub = base.extend(Options::new().name("item"));
        let first = resolve_constructor_options(&sub);
        let second = resolve_constructor_options(&sub);
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_ancestor_change_triggers_remerge() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let sub = base.extend(Options::new().hook(LifecycleHook::Created, |_| Ok(())));
        let before = sub.options();

        base.mixin(Options::new().hook(LifecycleHook::Created, |_| Ok(())));
        let after = resolve_constructor_options(&sub);

        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(after.hooks(LifecycleHook::Created).len(), 2);
        assert!(Rc::ptr_eq(&sub.super_options().unwrap(), &base.options()));
        assert!(Rc::ptr_eq(&sub.sealed_options(), &after));
    }

    #[test]
    fn test_grandchild_sees_grandparent_change() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let mid = base.extend(Options::new());
        let leaf = mid.extend(Options::new());

        base.mixin(Options::new().custom_value("theme", json!("dark")));
        let resolved = resolve_constructor_options(&leaf);

        assert!(resolved.custom("theme").is_some());
        assert!(Rc::ptr_eq(&leaf.super_options().unwrap(), &mid.options()));
    }

    #[test]
    fn test_late_patch_survives_remerge() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let sub = base.extend(Options::new().name("card"));

        sub.patch_options(
            OptionKey::custom("late"),
            OptionValue::Value(Rc::new(json!("attached"))),
        );
        let modified = resolve_modified_options(&sub).unwrap();
        assert!(modified.has_own(&OptionKey::custom("late")));

        base.mixin(Options::new().custom_value("global", json!(1)));
        let resolved = resolve_constructor_options(&sub);

        assert!(resolved.custom("late").is_some());
        assert!(resolved.custom("global").is_some());
        assert!(sub.extend_options().has_own(&OptionKey::custom("late")));
        assert!(resolved.components().unwrap()["card"].ptr_eq(&sub));
    }

    #[test]
    fn test_no_modifications_after_extend() {
        let runtime = Runtime::new();
        let base = crate::ComponentClass::base(&runtime);
        let sub = base.extend(Options::new().name("plain"));
        assert!(resolve_modified_options(&sub).is_none());
    }
}
