//! Runtime - Uid allocation and configuration shared by a component graph.
//!
//! Every [`ComponentClass`](crate::ComponentClass) belongs to one runtime and
//! every instance inherits its class's runtime. The runtime owns the only
//! mutable process-level state the core needs: the instance uid counter and
//! the class id counter.
//!
//! Execution is single-threaded (`Rc`/`Cell`), so the counters carry no
//! synchronization.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use log::warn;

use crate::instance::Instance;
use crate::options::OptionValue;

// =============================================================================
// Uid Allocator
// =============================================================================

/// Monotonic instance id source.
///
/// Starts at 0, increments on every construction, never reused or reset.
#[derive(Debug, Default)]
pub struct UidAllocator {
    next: Cell<u64>,
}

impl UidAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next uid.
    pub fn next(&self) -> u64 {
        let uid = self.next.get();
        self.next.set(uid + 1);
        uid
    }

    /// Number of uids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.next.get()
    }
}

// =============================================================================
// Config
// =============================================================================

/// Custom merge strategy for a custom option key.
///
/// Receives the parent value, the child value and the instance being
/// constructed (absent when merging class definitions). Returning `None`
/// drops the key from the merged options.
pub type MergeStrategy =
    Rc<dyn Fn(Option<&OptionValue>, Option<&OptionValue>, Option<&Instance>) -> Option<OptionValue>>;

/// Runtime configuration.
#[derive(Clone)]
pub struct Config {
    /// Suppress development warnings.
    pub silent: bool,

    /// Install the checked render proxy that warns on undeclared property
    /// access. Defaults to on in debug builds.
    pub dev_proxy: bool,

    /// Strategies for custom option keys, by key name.
    pub merge_strategies: BTreeMap<String, MergeStrategy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            silent: false,
            dev_proxy: cfg!(debug_assertions),
            merge_strategies: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Register a strategy for a custom option key.
    pub fn with_merge_strategy(
        mut self,
        key: impl Into<String>,
        strategy: impl Fn(Option<&OptionValue>, Option<&OptionValue>, Option<&Instance>) -> Option<OptionValue>
            + 'static,
    ) -> Self {
        self.merge_strategies.insert(key.into(), Rc::new(strategy));
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("silent", &self.silent)
            .field("dev_proxy", &self.dev_proxy)
            .field("merge_strategies", &self.merge_strategies.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// Runtime
// =============================================================================

/// Instantiation context shared by a class graph and its instances.
#[derive(Debug, Default)]
pub struct Runtime {
    config: Config,
    uids: UidAllocator,
    next_cid: Cell<u32>,
}

impl Runtime {
    /// Runtime with the default configuration.
    pub fn new() -> Rc<Self> {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Rc<Self> {
        Rc::new(Self {
            config,
            uids: UidAllocator::new(),
            next_cid: Cell::new(0),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uids(&self) -> &UidAllocator {
        &self.uids
    }

    /// Allocate a class id. The base class takes 0.
    pub(crate) fn next_cid(&self) -> u32 {
        let cid = self.next_cid.get();
        self.next_cid.set(cid + 1);
        cid
    }

    /// Emit a development warning, tagged with the component when known.
    pub(crate) fn warn(&self, vm: Option<&Instance>, message: impl fmt::Display) {
        if self.config.silent {
            return;
        }
        match vm {
            Some(vm) => warn!("{message} (found in {})", vm.component_name()),
            None => warn!("{message}"),
        }
    }
}
