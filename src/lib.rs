//! # spark-component
//!
//! Construction lifecycle of reactive UI component instances.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! Component definitions form a class graph. Each [`ComponentClass`] caches
//! its merged [`Options`]; when an ancestor's options change identity, the
//! class re-merges on its next resolution while keeping attachments made
//! directly on it.
//!
//! Constructing an [`Instance`] runs one ordered initializer:
//! ```text
//! options → proxy → relations → events → render → beforeCreate
//!   → inject → state → provide → created → mount (if el)
//! ```
//!
//! Child components created while rendering take a fast path that skips the
//! general merge and prototypes their options on the class's own.
//!
//! ## Modules
//!
//! - [`options`] - Options model, merge engine, constructor resolver
//! - [`class`] - Component classes (`extend`, `mixin`, late attachment)
//! - [`instance`] - Instances, the initializer and its subsystems
//! - [`runtime`] - Uid allocation and configuration
//! - [`vnode`] - Render output

pub mod class;
pub mod error;
pub mod instance;
pub mod options;
pub mod runtime;
pub mod util;
pub mod vnode;

pub use class::ComponentClass;
pub use error::ComponentError;

pub use instance::{
    call_hook, resolve_slots, ElementFactory, InitOptions, Instance, InstanceFlags,
    InternalComponentOptions, ListenerId, Phase, RenderProxy, WeakInstance,
};

pub use options::{
    merge_options, resolve_constructor_options, resolve_modified_options, DefaultValue,
    InjectOptions, LifecycleHook, OptionKey, OptionValue, Options, PropOptions, PropType,
    WatchHandler,
};

pub use runtime::{Config, MergeStrategy, Runtime, UidAllocator};

pub use vnode::{ComponentVNodeOptions, Listener, Listeners, VNode, VNodeData};
