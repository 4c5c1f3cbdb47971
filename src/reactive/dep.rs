//! Dep - the subscriber set behind one observable slot.
//!
//! A `Dep` is created lazily per observed property/key, plus one extra
//! "iteration" dep per container for structural changes. Subscribers are
//! effects, keyed by their creation id (identity-based, unordered).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::effect::{Effect, EffectInner};
use super::runtime::Runtime;

/// Dependency-tracking subscriber set for one observable slot.
#[derive(Clone)]
pub struct Dep {
    inner: Rc<DepInner>,
}

struct DepInner {
    /// Subscribed effects by creation id. Weak so a dep never keeps a
    /// stopped effect alive.
    subs: RefCell<BTreeMap<u64, Weak<EffectInner>>>,
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DepInner {
                subs: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Subscribe the currently running effect, if there is one.
    ///
    /// Idempotent within a run: an effect reading the same slot twice is
    /// recorded once. The dep is also recorded on the effect so the next
    /// run can unsubscribe before re-collecting.
    pub fn depend(&self, rt: &Runtime) {
        let Some(effect) = rt.current_effect() else {
            return;
        };
        let id = effect.id();
        let already = {
            let mut subs = self.inner.subs.borrow_mut();
            if subs.contains_key(&id) {
                true
            } else {
                subs.insert(id, effect.downgrade());
                false
            }
        };
        if !already {
            effect.record_dep(self.clone());
        }
    }

    /// Notify all subscribers of a change.
    ///
    /// The subscriber set is snapshotted first so effects removed during
    /// iteration are tolerated. The effect currently mid-run is skipped
    /// (re-entrancy guard); every other subscriber is routed to its custom
    /// scheduler or enqueued on the runtime flush queue.
    pub fn notify(&self, rt: &Runtime) {
        let snapshot: Vec<Effect> = self
            .inner
            .subs
            .borrow()
            .values()
            .filter_map(|weak| weak.upgrade().map(|inner| Effect { inner }))
            .collect();

        for effect in snapshot {
            if effect.is_running() {
                continue;
            }
            effect.schedule(rt);
        }
    }

    /// Remove one subscriber (called from effect cleanup).
    pub(crate) fn remove(&self, id: u64) {
        self.inner.subs.borrow_mut().remove(&id);
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subs
            .borrow()
            .values()
            .filter(|w| w.upgrade().is_some())
            .count()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}
