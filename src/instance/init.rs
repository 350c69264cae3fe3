//! Instance initializer - The ordered construction sequence.
//!
//! ```text
//! uid → IS_COMPONENT → options → render proxy → _self → relations → events
//!   → render context → beforeCreate → inject → state → provide → created
//!   → mount (if el)
//! ```
//!
//! Each step advances the instance [`Phase`]. A failing hook aborts the
//! sequence; later phases never run. A hook that destroys its own instance
//! ends the sequence too, leaving the instance in `Destroyed`.

use std::rc::Rc;

use log::debug;

use super::{events, inject, lifecycle, render, state, Instance, InstanceFlags, Phase, RenderProxy};
use crate::error::ComponentError;
use crate::options::{
    merge_options, resolve_constructor_options, LifecycleHook, OptionKey, OptionValue, Options,
    RenderFn,
};
use crate::vnode::VNode;

// =============================================================================
// Init options
// =============================================================================

/// Options handed to construction.
///
/// `Internal` selects the fast path used for child components created while
/// rendering; it skips the general merge entirely.
pub enum InitOptions {
    User(Options),
    Internal(InternalComponentOptions),
}

impl From<Options> for InitOptions {
    fn from(options: Options) -> Self {
        Self::User(options)
    }
}

impl From<InternalComponentOptions> for InitOptions {
    fn from(options: InternalComponentOptions) -> Self {
        Self::Internal(options)
    }
}

/// What a rendering parent passes to a child component it instantiates.
#[derive(Clone)]
pub struct InternalComponentOptions {
    pub parent: super::WeakInstance,
    /// The placeholder node; its component payload supplies props,
    /// listeners, slot content and tag.
    pub parent_vnode: Rc<VNode>,
    /// Overrides the inherited render function.
    pub render: Option<RenderFn>,
    pub static_render_fns: Option<Rc<Vec<RenderFn>>>,
}

impl InternalComponentOptions {
    pub fn new(parent: &Instance, parent_vnode: Rc<VNode>) -> Self {
        Self {
            parent: parent.downgrade(),
            parent_vnode,
            render: None,
            static_render_fns: None,
        }
    }

    pub fn with_render(mut self, render: RenderFn, static_render_fns: Vec<RenderFn>) -> Self {
        self.render = Some(render);
        self.static_render_fns = Some(Rc::new(static_render_fns));
        self
    }
}

// =============================================================================
// Init
// =============================================================================

pub(crate) fn init(vm: &Instance, options: Option<InitOptions>) -> Result<(), ComponentError> {
    vm.0.uid.set(vm.runtime().uids().next());
    vm.insert_flags(InstanceFlags::IS_COMPONENT);

    let options = match options {
        Some(InitOptions::Internal(internal)) => init_internal_component(vm, internal),
        Some(InitOptions::User(user)) => resolve_user_options(vm, &user),
        None => resolve_user_options(vm, &Options::new()),
    };
    vm.set_options(Rc::new(options));
    vm.advance(Phase::OptionsResolved);

    let guarded = vm.runtime().config().dev_proxy;
    let fresh = vm.0.render_proxy.set(RenderProxy::new(vm, guarded)).is_ok();
    debug_assert!(fresh, "render proxy installed twice");
    vm.advance(Phase::Proxied);

    let fresh = vm.0.self_ref.set(vm.downgrade()).is_ok();
    debug_assert!(fresh, "self reference installed twice");

    lifecycle::init_lifecycle(vm);
    vm.advance(Phase::LifecycleLinked);

    events::init_events(vm);
    vm.advance(Phase::EventsReady);

    render::init_render(vm);
    vm.advance(Phase::RenderReady);

    lifecycle::call_hook(vm, LifecycleHook::BeforeCreate)?;
    if vm.is_torn_down() {
        return Ok(());
    }
    vm.advance(Phase::BeforeCreateFired);

    inject::init_injections(vm);
    vm.advance(Phase::InjectionsReady);

    state::init_state(vm);
    vm.advance(Phase::StateReady);

    inject::init_provide(vm);
    vm.advance(Phase::ProvideReady);

    lifecycle::call_hook(vm, LifecycleHook::Created)?;
    if vm.is_torn_down() {
        return Ok(());
    }
    vm.advance(Phase::CreatedFired);

    debug!("{} initialized (uid {})", vm.component_name(), vm.uid());

    match vm.options().get_el() {
        Some(el) => lifecycle::mount_component(vm, Some(el.to_string())),
        None => {
            vm.advance(Phase::AwaitingManualMount);
            Ok(())
        }
    }
}

fn resolve_user_options(vm: &Instance, user: &Options) -> Options {
    let ctor_options = resolve_constructor_options(vm.constructor());
    merge_options(vm.runtime(), &ctor_options, user, Some(vm))
}

/// Build the options of a child component without merging.
///
/// The result's prototype is the constructor's current options, so every
/// key not set here resolves from the class.
pub(crate) fn init_internal_component(vm: &Instance, internal: InternalComponentOptions) -> Options {
    let mut opts = Options::with_prototype(vm.constructor().options());

    opts.insert(OptionKey::Parent, OptionValue::Parent(internal.parent));

    if let Some(component) = &internal.parent_vnode.component_options {
        opts.insert(
            OptionKey::PropsData,
            OptionValue::Value(component.props_data.clone()),
        );
        opts.insert(
            OptionKey::ParentListeners,
            OptionValue::Listeners(component.listeners.clone()),
        );
        opts.insert(
            OptionKey::RenderChildren,
            OptionValue::Children(component.children.clone()),
        );
        opts.insert(
            OptionKey::ComponentTag,
            OptionValue::Text(component.tag.clone()),
        );
    }
    opts.insert(OptionKey::ParentVnode, OptionValue::Vnode(internal.parent_vnode));

    if let Some(render) = internal.render {
        opts.insert(OptionKey::Render, OptionValue::Render(render));
        if let Some(static_fns) = internal.static_render_fns {
            opts.insert(OptionKey::StaticRenderFns, OptionValue::StaticRenderFns(static_fns));
        }
    }
    opts
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::json;

    use super::*;
    use crate::vnode::{ComponentVNodeOptions, VNodeData};
    use crate::{ComponentClass, Runtime};

    fn placeholder(ctor: &ComponentClass) -> Rc<VNode> {
        let mut vnode = VNode::element("component-1-child", VNodeData::new(), Vec::new());
        vnode.component_options = Some(ComponentVNodeOptions {
            ctor: ctor.clone(),
            props_data: Rc::new(json!({ "size": 3 })),
            listeners: Rc::new(Default::default()),
            children: Rc::new(vec![VNode::text("slot text")]),
            tag: Rc::from("child"),
        });
        Rc::new(vnode)
    }

    #[test]
    fn test_uids_are_sequential() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let uids: Vec<u64> = (0..4)
            .map(|_| base.new_instance(Options::new()).unwrap().uid())
            .collect();
        assert_eq!(uids, vec![0, 1, 2, 3]);
        assert_eq!(runtime.uids().allocated(), 4);
    }

    #[test]
    fn test_phases_without_el() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let vm = base.new_instance(Options::new()).unwrap();

        assert_eq!(vm.phase(), Phase::AwaitingManualMount);
        assert!(vm.is_component());
        assert!(vm.self_ref().unwrap().ptr_eq(&vm));
        assert!(vm.render_proxy().is_some());
    }

    #[test]
    fn test_hook_order() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut options = Options::new().el("#app");
        for hook in LifecycleHook::ALL {
            let log = log.clone();
            options = options.hook(hook, move |vm| {
                log.borrow_mut().push((hook, vm.phase()));
                Ok(())
            });
        }
        let vm = base.new_instance(options).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                (LifecycleHook::BeforeCreate, Phase::RenderReady),
                (LifecycleHook::Created, Phase::ProvideReady),
                (LifecycleHook::BeforeMount, Phase::CreatedFired),
                (LifecycleHook::Mounted, Phase::Mounted),
            ]
        );
        assert!(vm.is_mounted());
    }

    #[test]
    fn test_failing_hook_aborts_init() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let created = Rc::new(RefCell::new(false));
        let created_clone = created.clone();

        let result = base.new_instance(
            Options::new()
                .hook(LifecycleHook::BeforeCreate, |_| {
                    Err(ComponentError::hook(LifecycleHook::BeforeCreate, "nope"))
                })
                .hook(LifecycleHook::Created, move |_| {
                    *created_clone.borrow_mut() = true;
                    Ok(())
                }),
        );

        assert_eq!(
            result.unwrap_err(),
            ComponentError::hook(LifecycleHook::BeforeCreate, "nope")
        );
        assert!(!*created.borrow());
    }

    #[test]
    fn test_fast_path_prototype_is_ctor_options() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let child = base.extend(Options::new().name("child").custom_value("x", json!(1)));
        let parent = base.new_instance(Options::new()).unwrap();

        let vnode = placeholder(&child);
        let vm = child
            .construct(Some(InternalComponentOptions::new(&parent, vnode.clone()).into()))
            .unwrap();

        let options = vm.options();
        assert!(Rc::ptr_eq(options.prototype().unwrap(), &child.options()));
        assert!(vm.options().parent().unwrap().ptr_eq(&parent));
        assert!(Rc::ptr_eq(&options.parent_vnode().unwrap(), &vnode));
        assert_eq!(*options.get_props_data().unwrap(), json!({ "size": 3 }));
        assert_eq!(options.component_tag().as_deref(), Some("child"));
        assert_eq!(options.render_children().unwrap().len(), 1);
        // Falls through to the class
        assert_eq!(options.get_name().as_deref(), Some("child"));
        assert!(!options.has_own(&OptionKey::Name));
        assert!(!options.has_own(&OptionKey::Render));
    }

    #[test]
    fn test_fast_path_render_override() {
        let runtime = Runtime::new();
        let base = ComponentClass::base(&runtime);
        let child = base.extend(Options::new().render(|_, _| VNode::text("class")));
        let parent = base.new_instance(Options::new()).unwrap();

        let render: RenderFn = Rc::new(|_, _| VNode::text("override"));
        let internal = InternalComponentOptions::new(&parent, placeholder(&child))
            .with_render(render.clone(), Vec::new());
        let vm = child.construct(Some(internal.into())).unwrap();

        assert!(Rc::ptr_eq(&vm.options().render_fn().unwrap(), &render));
        assert!(vm.options().has_own(&OptionKey::StaticRenderFns));
    }
}
