//! Reactive runtime - the explicit tracking context.
//!
//! Everything the engine would otherwise keep in process-wide mutable state
//! lives here instead: the active-effect stack, the flush queue, the
//! monotonic effect id counter, and the identity registry mapping raw
//! container targets to their reactive wrappers. A `Runtime` handle is
//! cheap to clone and is threaded explicitly to deps, containers, cells,
//! and renderers at construction.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::container::{Reactive, ReactiveInner};
use super::effect::Effect;

// =============================================================================
// Runtime
// =============================================================================

/// Shared reactive context. Clones refer to the same runtime.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Rc<RuntimeInner>,
}

pub(crate) struct RuntimeInner {
    /// Stack of currently running effects (nested effect creation pushes).
    pub(crate) active: RefCell<Vec<Effect>>,

    /// Pending effects keyed by creation id. BTreeMap keeps the flush
    /// order (ascending id) for free and deduplicates enqueues.
    pub(crate) queue: RefCell<BTreeMap<u64, Effect>>,

    /// True while `flush()` is draining the queue.
    pub(crate) flushing: Cell<bool>,

    /// True once an enqueue has requested a deferred flush.
    pub(crate) scheduled: Cell<bool>,

    /// Monotonic id source for effects (flush ordering tie-break).
    next_effect_id: Cell<u64>,

    /// Identity registry: raw container pointer -> reactive wrapper.
    /// Guarantees one wrapper per target; entries are weak so wrappers
    /// die with their last user.
    pub(crate) registry: RefCell<FxHashMap<usize, Weak<ReactiveInner>>>,

    /// Callbacks to run after the next flush completes.
    pub(crate) tick_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
}

impl Runtime {
    /// Create a fresh runtime with an empty queue and registry.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                active: RefCell::new(Vec::new()),
                queue: RefCell::new(BTreeMap::new()),
                flushing: Cell::new(false),
                scheduled: Cell::new(false),
                next_effect_id: Cell::new(0),
                registry: RefCell::new(FxHashMap::default()),
                tick_callbacks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// The effect currently collecting dependencies, if any.
    pub fn current_effect(&self) -> Option<Effect> {
        self.inner.active.borrow().last().cloned()
    }

    pub(crate) fn push_active(&self, effect: Effect) {
        self.inner.active.borrow_mut().push(effect);
    }

    pub(crate) fn pop_active(&self) {
        self.inner.active.borrow_mut().pop();
    }

    pub(crate) fn next_effect_id(&self) -> u64 {
        let id = self.inner.next_effect_id.get();
        self.inner.next_effect_id.set(id + 1);
        id
    }

    /// Look up the wrapper for a raw target, dropping dead entries.
    pub(crate) fn lookup_reactive(&self, ptr: usize) -> Option<Reactive> {
        let mut registry = self.inner.registry.borrow_mut();
        match registry.get(&ptr) {
            Some(weak) => match weak.upgrade() {
                Some(inner) => Some(Reactive { inner }),
                None => {
                    registry.remove(&ptr);
                    None
                }
            },
            None => None,
        }
    }

    pub(crate) fn register_reactive(&self, ptr: usize, inner: &Rc<ReactiveInner>) {
        self.inner
            .registry
            .borrow_mut()
            .insert(ptr, Rc::downgrade(inner));
    }

    /// Whether two handles refer to the same runtime.
    pub fn same_runtime(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
