//! Effect - a re-runnable computation with tracked dependencies.
//!
//! An effect runs synchronously once at creation, collecting the deps it
//! reads. Every re-run unsubscribes from all previously recorded deps and
//! resubscribes fresh, because dependencies may change run to run. A
//! custom scheduler callback lets owners (computed cells) intercept
//! invalidation instead of going through the flush queue.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::dep::Dep;
use super::runtime::Runtime;

type Scheduler = Rc<dyn Fn(&Effect)>;

/// A re-runnable computation with its own dependency list.
#[derive(Clone)]
pub struct Effect {
    pub(crate) inner: Rc<EffectInner>,
}

pub(crate) struct EffectInner {
    /// Creation-order id, used as the flush ordering tie-break.
    id: u64,
    rt: Runtime,
    /// Cleared permanently by `stop()`.
    active: Cell<bool>,
    /// Set while the body executes (re-entrancy guard for notify).
    running: Cell<bool>,
    body: RefCell<Box<dyn FnMut()>>,
    scheduler: Option<Scheduler>,
    /// Deps this effect is currently subscribed to, for cleanup.
    deps: RefCell<Vec<Dep>>,
}

impl Effect {
    /// Create an effect and run it once synchronously.
    ///
    /// The initial run is not fault-isolated: a panic propagates to the
    /// caller (mount-time errors are the creator's concern). Later
    /// scheduled re-runs are isolated by the flush queue.
    pub fn new(rt: &Runtime, body: impl FnMut() + 'static) -> Self {
        Self::build(rt, Box::new(body), None)
    }

    /// Create an effect whose invalidation goes through `scheduler`
    /// instead of the flush queue. The scheduler receives the effect and
    /// decides when (or whether) to re-run it.
    pub fn with_scheduler(
        rt: &Runtime,
        body: impl FnMut() + 'static,
        scheduler: impl Fn(&Effect) + 'static,
    ) -> Self {
        Self::build(rt, Box::new(body), Some(Rc::new(scheduler)))
    }

    fn build(rt: &Runtime, body: Box<dyn FnMut()>, scheduler: Option<Scheduler>) -> Self {
        let effect = Self {
            inner: Rc::new(EffectInner {
                id: rt.next_effect_id(),
                rt: rt.clone(),
                active: Cell::new(true),
                running: Cell::new(false),
                body: RefCell::new(body),
                scheduler,
                deps: RefCell::new(Vec::new()),
            }),
        };
        effect.run();
        effect
    }

    /// Run the effect body, re-collecting dependencies.
    ///
    /// A stopped effect still executes its body but performs no tracking.
    pub fn run(&self) {
        if !self.inner.active.get() {
            (self.inner.body.borrow_mut())();
            return;
        }
        if self.inner.running.get() {
            return;
        }

        self.cleanup_deps();
        self.inner.running.set(true);
        self.inner.rt.push_active(self.clone());

        // Restores the previous active effect even if the body panics, so
        // a caught panic in one flushed effect cannot corrupt tracking for
        // the rest of the batch.
        let _guard = RunGuard { effect: self };
        (self.inner.body.borrow_mut())();
    }

    /// Permanently deactivate: unsubscribe from every dep and stop
    /// tracking. The body may still be invoked directly afterwards.
    pub fn stop(&self) {
        self.cleanup_deps();
        self.inner.active.set(false);
    }

    /// Route an invalidation: custom scheduler if present, flush queue
    /// otherwise.
    pub(crate) fn schedule(&self, rt: &Runtime) {
        match &self.inner.scheduler {
            Some(scheduler) => scheduler.clone()(self),
            None => rt.enqueue(self.clone()),
        }
    }

    fn cleanup_deps(&self) {
        let deps: Vec<Dep> = self.inner.deps.borrow_mut().drain(..).collect();
        for dep in deps {
            dep.remove(self.inner.id);
        }
    }

    pub(crate) fn record_dep(&self, dep: Dep) {
        self.inner.deps.borrow_mut().push(dep);
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub(crate) fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    /// Number of deps currently subscribed to (diagnostic).
    pub fn dep_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    pub(crate) fn downgrade(&self) -> std::rc::Weak<EffectInner> {
        Rc::downgrade(&self.inner)
    }
}

struct RunGuard<'a> {
    effect: &'a Effect,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.effect.inner.rt.pop_active();
        self.effect.inner.running.set(false);
    }
}
