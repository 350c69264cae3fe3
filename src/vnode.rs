//! Virtual nodes produced by render functions.
//!
//! Nodes are plain values. A component placeholder carries a
//! [`ComponentVNodeOptions`] payload describing the child to instantiate;
//! once the child exists the placeholder records a weak link to it.
//!
//! Diffing and patching are not part of this crate: a re-render replaces the
//! previous tree wholesale.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::class::ComponentClass;
use crate::instance::{Instance, WeakInstance};

/// Event listener. Receives the emitting instance and the event arguments.
pub type Listener = Rc<dyn Fn(&Instance, &[Value])>;

/// Listeners by event name, in registration order.
pub type Listeners = BTreeMap<String, Vec<Listener>>;

// =============================================================================
// VNodeData
// =============================================================================

/// Attributes, listeners and slot assignment of a node.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub attrs: Map<String, Value>,
    pub on: Listeners,
    /// Named slot this node fills when passed as component children.
    pub slot: Option<String>,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    pub fn on(mut self, event: &str, listener: impl Fn(&Instance, &[Value]) + 'static) -> Self {
        self.on
            .entry(event.to_string())
            .or_default()
            .push(Rc::new(listener));
        self
    }

    pub fn slot(mut self, name: &str) -> Self {
        self.slot = Some(name.to_string());
        self
    }
}

// =============================================================================
// Component payload
// =============================================================================

/// What a component placeholder hands to the child it creates.
#[derive(Clone)]
pub struct ComponentVNodeOptions {
    pub ctor: ComponentClass,
    /// Object of prop values extracted from the placeholder's attributes.
    pub props_data: Rc<Value>,
    pub listeners: Rc<Listeners>,
    /// Slot content.
    pub children: Rc<Vec<VNode>>,
    /// Tag the component was referenced by.
    pub tag: Rc<str>,
}

// =============================================================================
// VNode
// =============================================================================

#[derive(Clone, Default)]
pub struct VNode {
    pub tag: Option<String>,
    pub data: VNodeData,
    pub children: Vec<VNode>,
    pub text: Option<String>,
    pub component_options: Option<ComponentVNodeOptions>,
    component_instance: RefCell<WeakInstance>,
}

impl VNode {
    pub fn element(tag: &str, data: VNodeData, children: Vec<VNode>) -> Self {
        Self {
            tag: Some(tag.to_string()),
            data,
            children,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Placeholder rendered when there is nothing to show.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_component(&self) -> bool {
        self.component_options.is_some()
    }

    pub fn is_whitespace(&self) -> bool {
        self.tag.is_none()
            && self.component_options.is_none()
            && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
    }

    /// The child instance created for this placeholder, while it lives.
    pub fn component_instance(&self) -> Option<Instance> {
        self.component_instance.borrow().upgrade()
    }

    pub(crate) fn set_component_instance(&self, vm: &Instance) {
        *self.component_instance.borrow_mut() = vm.downgrade();
    }

    /// Concatenated text of this subtree, descending into mounted components.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        if let Some(child) = self.component_instance() {
            if let Some(tree) = child.vnode() {
                tree.collect_text(out);
            }
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("attrs", &self.data.attrs)
            .field("children", &self.children)
            .finish()
    }
}
