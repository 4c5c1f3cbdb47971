//! Flush queue - batched, ordered, fault-isolated effect re-runs.
//!
//! A notified effect never re-runs synchronously inside the mutation that
//! triggered it; it is enqueued, deduplicated by id, and drained by
//! [`Runtime::flush`] in ascending creation-id order (FIFO by declaration
//! order). Mutations within one synchronous block therefore coalesce into
//! a single downstream re-run per affected effect.
//!
//! The host event loop decides when the deferred tick happens: it checks
//! [`Runtime::has_pending`] and calls [`Runtime::flush`] once per tick.

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::effect::Effect;
use super::runtime::Runtime;

impl Runtime {
    /// Add an effect to the pending set. The first enqueue after an empty
    /// queue marks a flush as scheduled; duplicates within one batch are
    /// dropped.
    pub(crate) fn enqueue(&self, effect: Effect) {
        if !effect.is_active() {
            return;
        }
        self.inner
            .queue
            .borrow_mut()
            .entry(effect.id())
            .or_insert(effect);
        self.inner.scheduled.set(true);
    }

    /// Whether a deferred flush has been requested and not yet drained.
    pub fn has_pending(&self) -> bool {
        self.inner.scheduled.get()
    }

    /// Drain the flush queue.
    ///
    /// Pending effects are snapshotted in ascending creation-id order and
    /// run one by one; an inactive effect is skipped, and a panic in one
    /// effect is caught and logged without aborting the rest of the batch.
    /// Mutations arriving mid-flush enqueue into the live queue; the drain
    /// loops until the queue stays empty, then runs `next_tick` callbacks.
    pub fn flush(&self) {
        if self.inner.flushing.get() {
            return;
        }
        self.inner.flushing.set(true);

        loop {
            let batch: Vec<Effect> = {
                let mut queue = self.inner.queue.borrow_mut();
                if queue.is_empty() {
                    break;
                }
                // BTreeMap::into_values is already id-ascending.
                std::mem::take(&mut *queue).into_values().collect()
            };

            for effect in batch {
                if !effect.is_active() {
                    continue;
                }
                let outcome = catch_unwind(AssertUnwindSafe(|| effect.run()));
                if outcome.is_err() {
                    tracing::error!(
                        effect_id = effect.id(),
                        "effect panicked during flush, continuing with remaining effects"
                    );
                }
            }
        }

        self.inner.scheduled.set(false);
        self.inner.flushing.set(false);

        loop {
            let callbacks: Vec<Box<dyn FnOnce()>> =
                std::mem::take(&mut *self.inner.tick_callbacks.borrow_mut());
            if callbacks.is_empty() {
                break;
            }
            for callback in callbacks {
                callback();
            }
        }
    }

    /// Run `callback` after the next flush completes. If nothing is
    /// pending the callback still runs on the next `flush()` call.
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.inner
            .tick_callbacks
            .borrow_mut()
            .push(Box::new(callback));
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::reactive::{Dep, Effect, Runtime};

    #[test]
    fn test_flush_runs_in_creation_order() {
        let rt = Runtime::new();
        let order: Rc<std::cell::RefCell<Vec<u32>>> = Rc::new(std::cell::RefCell::new(Vec::new()));
        let dep = Dep::new();

        let order_a = order.clone();
        let rt_a = rt.clone();
        let dep_a = dep.clone();
        let _first = Effect::new(&rt, move || {
            dep_a.depend(&rt_a);
            order_a.borrow_mut().push(1);
        });

        let order_b = order.clone();
        let rt_b = rt.clone();
        let dep_b = dep.clone();
        let _second = Effect::new(&rt, move || {
            dep_b.depend(&rt_b);
            order_b.borrow_mut().push(2);
        });

        order.borrow_mut().clear();
        dep.notify(&rt);
        assert!(rt.has_pending());
        rt.flush();

        assert_eq!(*order.borrow(), vec![1, 2]);
        assert!(!rt.has_pending());
    }

    #[test]
    fn test_enqueue_deduplicates() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let dep = Dep::new();

        let runs_inner = runs.clone();
        let rt_inner = rt.clone();
        let dep_inner = dep.clone();
        let _effect = Effect::new(&rt, move || {
            dep_inner.depend(&rt_inner);
            runs_inner.set(runs_inner.get() + 1);
        });
        assert_eq!(runs.get(), 1);

        dep.notify(&rt);
        dep.notify(&rt);
        dep.notify(&rt);
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_stopped_effect_skipped_in_flush() {
        let rt = Runtime::new();
        let runs = Rc::new(Cell::new(0));
        let dep = Dep::new();

        let runs_inner = runs.clone();
        let rt_inner = rt.clone();
        let dep_inner = dep.clone();
        let effect = Effect::new(&rt, move || {
            dep_inner.depend(&rt_inner);
            runs_inner.set(runs_inner.get() + 1);
        });

        dep.notify(&rt);
        effect.stop();
        rt.flush();
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_panic_isolation_between_effects() {
        let rt = Runtime::new();
        let dep = Dep::new();
        let survived = Rc::new(Cell::new(0));

        let rt_a = rt.clone();
        let dep_a = dep.clone();
        let armed = Rc::new(Cell::new(false));
        let armed_a = armed.clone();
        let _bad = Effect::new(&rt, move || {
            dep_a.depend(&rt_a);
            if armed_a.get() {
                panic!("boom");
            }
        });

        let rt_b = rt.clone();
        let dep_b = dep.clone();
        let survived_b = survived.clone();
        let _good = Effect::new(&rt, move || {
            dep_b.depend(&rt_b);
            survived_b.set(survived_b.get() + 1);
        });
        assert_eq!(survived.get(), 1);

        armed.set(true);
        let hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(|_| {}));
        dep.notify(&rt);
        rt.flush();
        std::panic::set_hook(hook);

        assert_eq!(survived.get(), 2);
    }

    #[test]
    fn test_next_tick_runs_after_flush() {
        let rt = Runtime::new();
        let seen = Rc::new(Cell::new(false));
        let seen_inner = seen.clone();
        rt.next_tick(move || seen_inner.set(true));
        assert!(!seen.get());
        rt.flush();
        assert!(seen.get());
    }
}
