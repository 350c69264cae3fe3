//! Render context - Slots, the element factory and tree production.
//!
//! Slot content arrives as the placeholder's children (`_renderChildren`) and
//! is grouped by each node's `slot` name. Render functions receive the
//! instance's [`RenderProxy`] and its [`ElementFactory`]; the factory turns
//! registered component tags into component placeholders.

use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::{Instance, WeakInstance};
use crate::class::ComponentClass;
use crate::options::{resolve_constructor_options, Options};
use crate::util::{camelize, capitalize, hyphenate};
use crate::vnode::{ComponentVNodeOptions, Listeners, VNode, VNodeData};

#[derive(Default)]
pub(crate) struct RenderState {
    /// Tree produced by the latest render.
    pub(crate) vnode: Option<Rc<VNode>>,
    pub(crate) slots: BTreeMap<String, Vec<VNode>>,
    pub(crate) factory: Option<ElementFactory>,
    pub(crate) el: Option<String>,
    pub(crate) stop_render: Option<Box<dyn FnOnce()>>,
    /// Component instances created by the latest render.
    pub(crate) instances: Vec<Instance>,
    pub(crate) static_trees: BTreeMap<usize, VNode>,
}

pub(crate) fn init_render(vm: &Instance) {
    let slots = vm
        .options()
        .render_children()
        .map(|children| resolve_slots(&children))
        .unwrap_or_default();

    let mut render = vm.0.render.borrow_mut();
    render.vnode = None;
    render.static_trees.clear();
    render.slots = slots;
    render.factory = Some(ElementFactory::new(vm));
}

/// Group slot content by slot name.
///
/// Nodes without a `slot` go to `"default"`. A `template` node contributes
/// its children rather than itself. Slots holding only whitespace text are
/// dropped.
pub fn resolve_slots(children: &[VNode]) -> BTreeMap<String, Vec<VNode>> {
    let mut slots: BTreeMap<String, Vec<VNode>> = BTreeMap::new();
    for child in children {
        let name = child.data.slot.as_deref().unwrap_or("default");
        let nodes = slots.entry(name.to_string()).or_default();
        if child.tag.as_deref() == Some("template") {
            nodes.extend(child.children.iter().cloned());
        } else {
            nodes.push(child.clone());
        }
    }
    slots.retain(|_, nodes| !nodes.iter().all(VNode::is_whitespace));
    slots
}

/// Run the render function through the proxy.
pub(crate) fn render_vnode(vm: &Instance) -> VNode {
    let Some(render) = vm.options().render_fn() else {
        return VNode::empty();
    };
    match vm.render_proxy() {
        Some(proxy) => render(&proxy, &vm.create_element()),
        None => VNode::empty(),
    }
}

// =============================================================================
// Element factory
// =============================================================================

/// Creates vnodes in the context of one instance (`$createElement`).
#[derive(Clone)]
pub struct ElementFactory {
    context: WeakInstance,
}

impl ElementFactory {
    pub(crate) fn new(vm: &Instance) -> Self {
        Self {
            context: vm.downgrade(),
        }
    }

    pub fn context(&self) -> Option<Instance> {
        self.context.upgrade()
    }

    /// Element or component node.
    ///
    /// `tag` is looked up in the context's components as written, camelized
    /// and capitalized. A match yields a component placeholder; anything
    /// else is a plain element.
    pub fn h(&self, tag: &str, data: VNodeData, children: Vec<VNode>) -> VNode {
        let Some(vm) = self.context.upgrade() else {
            return VNode::element(tag, data, children);
        };
        match resolve_component(&vm.options(), tag) {
            Some(ctor) => create_component(ctor, tag, data, children),
            None => VNode::element(tag, data, children),
        }
    }

    pub fn text(&self, text: impl Into<String>) -> VNode {
        VNode::text(text)
    }
}

fn resolve_component(options: &Options, id: &str) -> Option<ComponentClass> {
    let components = options.components()?;
    if let Some(ctor) = components.get(id) {
        return Some(ctor.clone());
    }
    let camelized = camelize(id);
    if let Some(ctor) = components.get(&camelized) {
        return Some(ctor.clone());
    }
    components.get(&capitalize(&camelized)).cloned()
}

fn create_component(ctor: ComponentClass, tag: &str, mut data: VNodeData, children: Vec<VNode>) -> VNode {
    let options = resolve_constructor_options(&ctor);
    let props_data = extract_props(&options, &mut data.attrs);
    let listeners: Listeners = std::mem::take(&mut data.on);

    let name = options
        .get_name()
        .map(|name| name.to_string())
        .unwrap_or_else(|| tag.to_string());
    let mut vnode = VNode::element(
        &format!("component-{}-{}", ctor.cid(), name),
        data,
        Vec::new(),
    );
    vnode.component_options = Some(ComponentVNodeOptions {
        ctor,
        props_data: Rc::new(Value::Object(props_data)),
        listeners: Rc::new(listeners),
        children: Rc::new(children),
        tag: Rc::from(tag),
    });
    vnode
}

/// Move declared props out of `attrs`, matching `fooBar` or `foo-bar`.
fn extract_props(options: &Options, attrs: &mut Map<String, Value>) -> Map<String, Value> {
    let mut props_data = Map::new();
    let Some(props) = options.props() else {
        return props_data;
    };
    for key in props.keys() {
        let value = attrs
            .remove(key)
            .or_else(|| attrs.remove(&hyphenate(key)));
        if let Some(value) = value {
            props_data.insert(key.clone(), value);
        }
    }
    props_data
}

// =============================================================================
// Instance accessors
// =============================================================================

impl Instance {
    /// Tree from the latest render (`_vnode`).
    pub fn vnode(&self) -> Option<Rc<VNode>> {
        self.0.render.borrow().vnode.clone()
    }

    /// Placeholder node in the parent's tree (`$vnode`).
    pub fn parent_vnode(&self) -> Option<Rc<VNode>> {
        self.options().parent_vnode()
    }

    pub fn slots(&self) -> BTreeMap<String, Vec<VNode>> {
        self.0.render.borrow().slots.clone()
    }

    pub fn slot(&self, name: &str) -> Vec<VNode> {
        self.0
            .render
            .borrow()
            .slots
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Mount target, once mounted.
    pub fn el(&self) -> Option<String> {
        self.0.render.borrow().el.clone()
    }

    /// Placeholder attributes not consumed as props (`$attrs`).
    pub fn attrs(&self) -> Map<String, Value> {
        self.parent_vnode()
            .map(|vnode| vnode.data.attrs.clone())
            .unwrap_or_default()
    }

    /// Listeners the parent attached to the placeholder (`$listeners`).
    pub fn listeners(&self) -> Rc<Listeners> {
        self.options().parent_listeners().unwrap_or_default()
    }

    pub fn create_element(&self) -> ElementFactory {
        self.0
            .render
            .borrow()
            .factory
            .clone()
            .unwrap_or_else(|| ElementFactory::new(self))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::options::{PropOptions, PropType};
    use crate::{ComponentClass, Runtime};

    #[test]
    fn test_resolve_slots_groups_by_name() {
        let children = vec![
            VNode::text("a"),
            VNode::element("h1", VNodeData::new().slot("header"), vec![]),
            VNode::text("  "),
            VNode::element("template", VNodeData::new().slot("footer"), vec![VNode::text("f")]),
        ];
        let slots = resolve_slots(&children);

        assert_eq!(slots["default"].len(), 2);
        assert_eq!(slots["header"][0].tag.as_deref(), Some("h1"));
        assert_eq!(slots["footer"][0].text.as_deref(), Some("f"));
    }

    #[test]
    fn test_whitespace_only_slot_dropped() {
        let slots = resolve_slots(&[VNode::text(" "), VNode::text("\n")]);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_factory_resolves_component_tags() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let item = base.extend(
            Options::new()
                .name("TodoItem")
                .prop("itemTitle", PropOptions::of(PropType::String)),
        );
        let vm = base
            .new_instance(Options::new().component("TodoItem", &item))
            .unwrap();
        let h = vm.create_element();

        let node = h.h(
            "todo-item",
            VNodeData::new()
                .attr("item-title", json!("milk"))
                .attr("class", json!("row"))
                .on("done", |_, _| {}),
            vec![VNode::text("slot")],
        );

        let component = node.component_options.as_ref().unwrap();
        assert!(component.ctor.ptr_eq(&item));
        assert_eq!(*component.props_data, json!({ "itemTitle": "milk" }));
        assert_eq!(component.listeners["done"].len(), 1);
        assert_eq!(component.children.len(), 1);
        assert_eq!(&*component.tag, "todo-item");
        assert_eq!(node.tag, Some(format!("component-{}-TodoItem", item.cid())));
        assert_eq!(node.data.attrs.get("class"), Some(&json!("row")));
        assert!(node.children.is_empty());

        let plain = h.h("div", VNodeData::new(), vec![]);
        assert!(!plain.is_component());
    }

    #[test]
    fn test_child_receives_slots_and_attrs() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let card = base.extend(
            Options::new()
                .name("card")
                .render(|vm, h| h.h("section", VNodeData::new(), vm.slot("default"))),
        );
        let root = base
            .new_instance(
                Options::new()
                    .el("#app")
                    .component("card", &card)
                    .render(|_, h| {
                        h.h(
                            "card",
                            VNodeData::new().attr("id", json!("main")),
                            vec![VNode::text("body")],
                        )
                    }),
            )
            .unwrap();

        let child = root.children()[0].clone();
        assert_eq!(child.slot("default").len(), 1);
        assert_eq!(child.attrs().get("id"), Some(&json!("main")));
        assert_eq!(root.vnode().unwrap().text_content(), "body");
    }
}
