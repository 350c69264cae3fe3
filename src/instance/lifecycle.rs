//! Lifecycle - Relations, hook invocation, mount and teardown.
//!
//! # Mounting
//!
//! Mounting installs ONE render effect per instance. The effect's first run
//! renders the tree and creates child instances (through the internal fast
//! path), mounting each before the parent completes. Later runs, triggered
//! by any state the render read, replace the tree:
//!
//! ```text
//! beforeUpdate → destroy children → render → create children → updated
//! ```
//!
//! Children therefore report `mounted` before their parent. The rendering
//! instance owns the children it instantiated until the next render or its
//! own teardown.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use log::{error, trace};
use spark_signals::{effect, with_context, AnyReaction};

use super::init::{InitOptions, InternalComponentOptions};
use super::{render, state, Instance, InstanceFlags, Phase, WeakInstance};
use crate::error::ComponentError;
use crate::options::LifecycleHook;
use crate::vnode::VNode;

// =============================================================================
// Relations
// =============================================================================

#[derive(Default)]
pub(crate) struct Relations {
    pub(crate) parent: Option<WeakInstance>,
    pub(crate) root: WeakInstance,
    pub(crate) children: Vec<Instance>,
}

/// Link the instance into its parent's children.
///
/// Abstract ancestors are skipped: a concrete child attaches to the first
/// non-abstract ancestor, and an abstract instance is never listed as a
/// child at all.
pub(crate) fn init_lifecycle(vm: &Instance) {
    let options = vm.options();
    let mut parent = options.parent();

    if !options.is_abstract() {
        while let Some(p) = parent.clone() {
            if !p.options().is_abstract() {
                break;
            }
            match p.parent() {
                Some(next) => parent = Some(next),
                None => break,
            }
        }
        if let Some(p) = &parent {
            p.0.relations.borrow_mut().children.push(vm.clone());
        }
    }

    let root = match &parent {
        Some(p) => p.root().downgrade(),
        None => vm.downgrade(),
    };

    let mut relations = vm.0.relations.borrow_mut();
    relations.parent = parent.as_ref().map(Instance::downgrade);
    relations.root = root;
    relations.children.clear();
}

impl Instance {
    pub fn parent(&self) -> Option<Instance> {
        self.0
            .relations
            .borrow()
            .parent
            .as_ref()
            .and_then(WeakInstance::upgrade)
    }

    /// Topmost ancestor, or the instance itself.
    pub fn root(&self) -> Instance {
        self.0
            .relations
            .borrow()
            .root
            .upgrade()
            .unwrap_or_else(|| self.clone())
    }

    pub fn children(&self) -> Vec<Instance> {
        self.0.relations.borrow().children.clone()
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Invoke every callback registered for `hook`, in merge order.
///
/// The first failing callback aborts the rest and its error is returned.
/// When anyone listens for `hook:<name>`, that event is emitted afterwards.
pub fn call_hook(vm: &Instance, hook: LifecycleHook) -> Result<(), ComponentError> {
    let handlers = vm.options().hooks(hook);
    trace!("{} {hook} ({} handlers)", vm.component_name(), handlers.len());

    without_tracking(|| -> Result<(), ComponentError> {
        for handler in handlers.iter() {
            handler(vm)?;
        }
        if vm.flags().contains(InstanceFlags::HAS_HOOK_EVENT) {
            vm.emit(&format!("hook:{}", hook.name()), &[]);
        }
        Ok(())
    })
}

/// Run `f` with no enclosing reaction collecting its reads.
///
/// Effects created inside `f` still track their own reads, which
/// `spark_signals::untrack` would suppress.
pub(crate) fn without_tracking<T>(f: impl FnOnce() -> T) -> T {
    struct Restore(Option<Option<Weak<dyn AnyReaction>>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            if let Some(previous) = self.0.take() {
                with_context(|ctx| ctx.set_active_reaction(previous));
            }
        }
    }

    let _restore = Restore(Some(with_context(|ctx| ctx.set_active_reaction(None))));
    f()
}

// =============================================================================
// Mount
// =============================================================================

impl Instance {
    /// Mount an instance created without `el`.
    pub fn mount(&self, target: &str) -> Result<(), ComponentError> {
        mount_component(self, Some(target.to_string()))
    }

    /// Tear the instance down. Safe to call more than once.
    pub fn destroy(&self) {
        if self.is_torn_down() {
            return;
        }

        if let Err(err) = call_hook(self, LifecycleHook::BeforeDestroy) {
            error!("{} {err}", self.component_name());
        }
        self.insert_flags(InstanceFlags::IS_BEING_DESTROYED);

        if let Some(parent) = self.parent() {
            if !parent.flags().contains(InstanceFlags::IS_BEING_DESTROYED) {
                parent
                    .0
                    .relations
                    .borrow_mut()
                    .children
                    .retain(|child| !child.ptr_eq(self));
            }
        }

        let stop = self.0.render.borrow_mut().stop_render.take();
        if let Some(stop) = stop {
            stop();
        }
        state::teardown_watchers(self);
        self.insert_flags(InstanceFlags::IS_DESTROYED);

        let children = std::mem::take(&mut self.0.relations.borrow_mut().children);
        let rendered = {
            let mut render = self.0.render.borrow_mut();
            render.vnode = None;
            std::mem::take(&mut render.instances)
        };
        for child in children.into_iter().chain(rendered) {
            child.destroy();
        }
        self.advance(Phase::Destroyed);

        if let Err(err) = call_hook(self, LifecycleHook::Destroyed) {
            error!("{} {err}", self.component_name());
        }
        self.off(None, None);
    }
}

pub(crate) fn mount_component(vm: &Instance, el: Option<String>) -> Result<(), ComponentError> {
    if vm.is_destroyed() {
        return Err(ComponentError::Destroyed(vm.uid()));
    }
    if vm.is_mounted() {
        vm.runtime().warn(Some(vm), "Instance is already mounted.");
        return Ok(());
    }

    vm.0.render.borrow_mut().el = el;
    if vm.options().render_fn().is_none() {
        vm.runtime()
            .warn(Some(vm), "Failed to mount component: render function not defined.");
    }

    call_hook(vm, LifecycleHook::BeforeMount)?;
    if vm.is_torn_down() {
        return Ok(());
    }

    // The first run's outcome, read back once `effect` returns
    let first_run: Rc<RefCell<Option<Result<(), ComponentError>>>> = Rc::new(RefCell::new(None));
    let first_run_slot = first_run.clone();
    let weak = vm.downgrade();

    let stop = effect(move || {
        let Some(vm) = weak.upgrade() else {
            return;
        };
        if first_run_slot.borrow().is_none() {
            let result = render_component(&vm);
            *first_run_slot.borrow_mut() = Some(result);
        } else if let Err(err) = update_component(&vm) {
            error!("{} update failed: {err}", vm.component_name());
        }
    });

    let result = first_run.borrow().clone().unwrap_or(Ok(()));
    if let Err(err) = result {
        stop();
        return Err(err);
    }
    // Destroyed from inside its own first render
    if vm.is_torn_down() {
        stop();
        return Ok(());
    }
    vm.0.render.borrow_mut().stop_render = Some(Box::new(stop));

    vm.insert_flags(InstanceFlags::IS_MOUNTED);
    vm.advance(Phase::Mounted);
    call_hook(vm, LifecycleHook::Mounted)
}

/// Render the tree and instantiate every component placeholder in it.
fn render_component(vm: &Instance) -> Result<(), ComponentError> {
    let tree = Rc::new(render::render_vnode(vm));
    create_children(vm, &tree)?;
    vm.0.render.borrow_mut().vnode = Some(tree);
    Ok(())
}

fn create_children(vm: &Instance, node: &VNode) -> Result<(), ComponentError> {
    if let Some(component) = &node.component_options {
        let placeholder = Rc::new(node.clone());
        let internal = InternalComponentOptions::new(vm, placeholder.clone());
        // The child's reads belong to the child, not to this render
        return without_tracking(|| -> Result<(), ComponentError> {
            let child = component
                .ctor
                .construct(Some(InitOptions::Internal(internal)))?;
            if child.is_torn_down() {
                return Ok(());
            }
            node.set_component_instance(&child);
            placeholder.set_component_instance(&child);
            // Abstract children are not in `children`; this keeps them alive
            vm.0.render.borrow_mut().instances.push(child.clone());
            // Slot content belongs to the child's own render
            mount_component(&child, None)
        });
    }
    for child in &node.children {
        create_children(vm, child)?;
    }
    Ok(())
}

fn update_component(vm: &Instance) -> Result<(), ComponentError> {
    if vm.flags().contains(InstanceFlags::IS_BEING_DESTROYED) {
        return Ok(());
    }
    call_hook(vm, LifecycleHook::BeforeUpdate)?;
    let previous = std::mem::take(&mut vm.0.render.borrow_mut().instances);
    without_tracking(|| {
        for child in previous {
            child.destroy();
        }
    });
    render_component(vm)?;
    call_hook(vm, LifecycleHook::Updated)
}
