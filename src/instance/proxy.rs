//! Render proxy - What render functions read the instance through.
//!
//! With the guard on, reading a name the instance does not declare logs a
//! development warning. Names starting with `$` or `_` are instance
//! internals and always allowed. Without the guard, reads go straight
//! through and a miss is silently `Null`.

use serde_json::Value;

use super::{Instance, WeakInstance};
use crate::error::ComponentError;
use crate::util::is_reserved;
use crate::vnode::VNode;

#[derive(Clone)]
pub struct RenderProxy {
    target: WeakInstance,
    guarded: bool,
}

impl RenderProxy {
    pub(crate) fn new(vm: &Instance, guarded: bool) -> Self {
        Self {
            target: vm.downgrade(),
            guarded,
        }
    }

    pub fn is_guarded(&self) -> bool {
        self.guarded
    }

    pub fn instance(&self) -> Option<Instance> {
        self.target.upgrade()
    }

    /// Read a prop, data, computed or injected value.
    pub fn get(&self, key: &str) -> Value {
        let Some(vm) = self.target.upgrade() else {
            return Value::Null;
        };
        if let Some(value) = vm.get(key) {
            return value;
        }
        if self.guarded && !is_reserved(key) && !vm.has_method(key) {
            vm.runtime().warn(
                Some(&vm),
                &format!(
                    "Property or method \"{key}\" is not defined on the instance but \
                     referenced during render."
                ),
            );
        }
        Value::Null
    }

    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value, ComponentError> {
        match self.target.upgrade() {
            Some(vm) => vm.call_method(method, args),
            None => Err(ComponentError::UnknownMethod(method.to_string())),
        }
    }

    pub fn slot(&self, name: &str) -> Vec<VNode> {
        self.target
            .upgrade()
            .map(|vm| vm.slot(name))
            .unwrap_or_default()
    }

    /// Render static subtree `index`, cached after the first call.
    pub fn render_static(&self, index: usize) -> VNode {
        let Some(vm) = self.target.upgrade() else {
            return VNode::empty();
        };
        let cached = vm.0.render.borrow().static_trees.get(&index).cloned();
        if let Some(tree) = cached {
            return tree;
        }

        let render = vm
            .options()
            .static_render_fns()
            .and_then(|fns| fns.get(index).cloned());
        let tree = match render {
            Some(render) => render(self, &vm.create_element()),
            None => {
                vm.runtime()
                    .warn(Some(&vm), &format!("Static render function {index} is not defined."));
                VNode::empty()
            }
        };
        vm.0.render.borrow_mut().static_trees.insert(index, tree.clone());
        tree
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use serde_json::json;

    use crate::{ComponentClass, Config, Options, Runtime};

    #[test]
    fn test_get_reads_through() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let vm = base
            .new_instance(
                Options::new().data(|_| json!({ "n": 2 }).as_object().cloned().unwrap_or_default()),
            )
            .unwrap();
        let proxy = vm.render_proxy().unwrap();

        assert_eq!(proxy.get("n"), json!(2));
        assert_eq!(proxy.get("missing"), json!(null));
        assert!(proxy.instance().unwrap().ptr_eq(&vm));
    }

    #[test]
    fn test_guard_follows_config() {
        let unguarded = Runtime::with_config(Config {
            dev_proxy: false,
            ..Config::default()
        });
        let vm = ComponentClass::base(&unguarded)
            .new_instance(Options::new())
            .unwrap();
        assert!(!vm.render_proxy().unwrap().is_guarded());

        let guarded = Runtime::with_config(Config {
            dev_proxy: true,
            ..Config::default()
        });
        let vm = ComponentClass::base(&guarded)
            .new_instance(Options::new())
            .unwrap();
        assert!(vm.render_proxy().unwrap().is_guarded());
    }

    #[test]
    fn test_render_static_is_cached() {
        let runtime = Runtime::new();
        let calls = Rc::new(Cell::new(0));
        let calls_clone = calls.clone();
        let vm = ComponentClass::base(&runtime)
            .new_instance(Options::new().static_render_fn(move |_, h| {
                calls_clone.set(calls_clone.get() + 1);
                h.text("static")
            }))
            .unwrap();
        let proxy = vm.render_proxy().unwrap();

        assert_eq!(proxy.render_static(0).text_content(), "static");
        assert_eq!(proxy.render_static(0).text_content(), "static");
        assert_eq!(calls.get(), 1);
        assert!(proxy.render_static(5).is_whitespace());
    }
}
