//! Single-value reactive cells: strict refs and lazily memoized computeds.
//!
//! `Ref` holds exactly one scalar. Containers are rejected with a typed
//! error: every value kind gets a single unambiguous reactivity path, and
//! containers go through [`crate::reactive::reactive`] instead.
//!
//! `Computed` wraps a getter in an internal effect whose scheduler only
//! flips a dirty flag and notifies the computed's own dep. Recomputation
//! is deferred to the next read, so consumers reading `.get()` many times
//! between invalidations pay for one getter call.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

use super::dep::Dep;
use super::effect::Effect;
use super::runtime::Runtime;

/// Structural misuse of the reactivity API. Fails fast and loud: this is
/// a programming error, not a runtime data condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    #[error("refs hold scalar values only; wrap containers with reactive() instead")]
    Container,
}

// =============================================================================
// Ref
// =============================================================================

/// A single scalar reactive cell.
#[derive(Clone)]
pub struct Ref {
    inner: Rc<RefInner>,
}

struct RefInner {
    rt: Runtime,
    value: RefCell<Value>,
    dep: Dep,
}

impl Ref {
    /// Create a ref. Container values are rejected.
    pub fn new(rt: &Runtime, value: Value) -> Result<Ref, RefError> {
        if value.is_container() {
            return Err(RefError::Container);
        }
        Ok(Ref {
            inner: Rc::new(RefInner {
                rt: rt.clone(),
                value: RefCell::new(value),
                dep: Dep::new(),
            }),
        })
    }

    /// Tracked read.
    pub fn get(&self) -> Value {
        self.inner.dep.depend(&self.inner.rt);
        self.inner.value.borrow().clone()
    }

    /// Untracked read.
    pub fn peek(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    /// Write. Container values are rejected; subscribers are notified
    /// only on a genuine value change.
    pub fn set(&self, value: Value) -> Result<(), RefError> {
        if value.is_container() {
            return Err(RefError::Container);
        }
        let changed = {
            let mut slot = self.inner.value.borrow_mut();
            if slot.same(&value) {
                false
            } else {
                *slot = value;
                true
            }
        };
        if changed {
            self.inner.dep.notify(&self.inner.rt);
        }
        Ok(())
    }

    /// Live subscriber count (diagnostic).
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }
}

// =============================================================================
// Computed
// =============================================================================

/// A lazily recomputed, memoized derived value.
#[derive(Clone)]
pub struct Computed {
    inner: Rc<ComputedInner>,
}

struct ComputedInner {
    rt: Runtime,
    /// Consumers subscribe here, decoupled from the getter's own deps.
    dep: Dep,
    dirty: Rc<Cell<bool>>,
    value: Rc<RefCell<Value>>,
    effect: Effect,
}

impl Computed {
    /// Create a computed. The getter runs once immediately to seed the
    /// cache and collect dependencies.
    pub fn new(rt: &Runtime, getter: impl Fn() -> Value + 'static) -> Computed {
        let dep = Dep::new();
        let dirty = Rc::new(Cell::new(false));
        let value = Rc::new(RefCell::new(Value::Undefined));

        let body = {
            let value = value.clone();
            move || {
                *value.borrow_mut() = getter();
            }
        };

        // On invalidation: mark dirty and propagate "this value changed"
        // to consumers without recomputing. Repeated invalidations while
        // already dirty are collapsed.
        let scheduler = {
            let dirty = dirty.clone();
            let dep = dep.clone();
            let rt = rt.clone();
            move |_effect: &Effect| {
                if !dirty.get() {
                    dirty.set(true);
                    dep.notify(&rt);
                }
            }
        };

        let effect = Effect::with_scheduler(rt, body, scheduler);

        Computed {
            inner: Rc::new(ComputedInner {
                rt: rt.clone(),
                dep,
                dirty,
                value,
                effect,
            }),
        }
    }

    /// Tracked read. Recomputes only if a dependency changed since the
    /// last read.
    pub fn get(&self) -> Value {
        self.inner.dep.depend(&self.inner.rt);
        if self.inner.dirty.get() {
            self.inner.effect.run();
            self.inner.dirty.set(false);
        }
        self.inner.value.borrow().clone()
    }

    /// Stop the internal effect. The cached value remains readable but
    /// never updates again.
    pub fn stop(&self) {
        self.inner.effect.stop();
    }
}
