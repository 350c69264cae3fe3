//! Provide / inject - Values handed down the instance tree.
//!
//! Injections resolve before state, so data and computed can read them;
//! provided values are computed after state, so they can expose it.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::signal;

use super::Instance;

pub(crate) fn init_injections(vm: &Instance) {
    let Some(injections) = vm.options().injections() else {
        return;
    };

    let mut resolved = BTreeMap::new();
    for (key, inject) in injections.iter() {
        let value = match resolve_provided(vm, &inject.from) {
            Some(value) => value,
            None => match &inject.default {
                Some(default) => default.produce(vm),
                None => {
                    vm.runtime()
                        .warn(Some(vm), format!("Injection \"{key}\" not found"));
                    Value::Null
                }
            },
        };
        resolved.insert(key.clone(), signal(value));
    }
    *vm.0.injected.borrow_mut() = resolved;
}

/// Nearest ancestor (or self) providing `key`.
fn resolve_provided(vm: &Instance, key: &str) -> Option<Value> {
    let mut source = Some(vm.clone());
    while let Some(current) = source {
        if let Some(value) = current.provided().and_then(|p| p.get(key).cloned()) {
            return Some(value);
        }
        source = current.parent();
    }
    None
}

pub(crate) fn init_provide(vm: &Instance) {
    if let Some(provide) = vm.options().provide_fn() {
        let provided = provide(vm);
        *vm.0.provided.borrow_mut() = Some(Rc::new(provided));
    }
}

impl Instance {
    /// Values this instance provides to its descendants.
    pub fn provided(&self) -> Option<Rc<Map<String, Value>>> {
        self.0.provided.borrow().clone()
    }

    /// Names of the injections this instance resolved.
    pub fn injected_keys(&self) -> Vec<String> {
        self.0.injected.borrow().keys().cloned().collect()
    }
}
