//! Scope - the disposal unit for rendered fragments.
//!
//! A scope owns the effects, listener detachers, and child scopes created
//! while compiling one template fragment. Cleanup is recursive and runs
//! children first, so nested fragments release their resources before the
//! parent does. Lists are drained during cleanup, which makes a repeat
//! cleanup a harmless no-op.

use std::cell::RefCell;
use std::rc::Rc;

use super::effect::Effect;

type Detach = Box<dyn FnOnce()>;

/// Disposal unit owning effects, listener detachers, and child scopes.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    effects: RefCell<Vec<Effect>>,
    listeners: RefCell<Vec<Detach>>,
    children: RefCell<Vec<Scope>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect to be stopped on cleanup.
    pub fn add_effect(&self, effect: Effect) {
        self.inner.effects.borrow_mut().push(effect);
    }

    /// Register an event-listener detacher to run on cleanup.
    pub fn add_listener(&self, detach: impl FnOnce() + 'static) {
        self.inner.listeners.borrow_mut().push(Box::new(detach));
    }

    /// Create a child scope owned by this one.
    pub fn child(&self) -> Scope {
        let child = Scope::new();
        self.inner.children.borrow_mut().push(child.clone());
        child
    }

    /// Detach a specific child (used when a fragment is unmounted ahead
    /// of its parent). The child itself is not cleaned up here.
    pub fn release_child(&self, child: &Scope) {
        self.inner
            .children
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(&c.inner, &child.inner));
    }

    /// Tear down, depth-first: child scopes, then owned effects, then
    /// owned listeners. Safe to call repeatedly.
    pub fn cleanup(&self) {
        let children: Vec<Scope> = self.inner.children.borrow_mut().drain(..).collect();
        for child in children {
            child.cleanup();
        }

        let effects: Vec<Effect> = self.inner.effects.borrow_mut().drain(..).collect();
        for effect in effects {
            effect.stop();
        }

        let listeners: Vec<Detach> = self.inner.listeners.borrow_mut().drain(..).collect();
        for detach in listeners {
            detach();
        }
    }

    /// Number of directly owned effects (diagnostic).
    pub fn effect_count(&self) -> usize {
        self.inner.effects.borrow().len()
    }

    /// Number of direct children (diagnostic).
    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::reactive::Runtime;

    #[test]
    fn test_cleanup_is_recursive_and_ordered() {
        let rt = Runtime::new();
        let parent = Scope::new();
        let child_a = parent.child();
        let child_b = parent.child();

        let own = Effect::new(&rt, || {});
        let eff_a = Effect::new(&rt, || {});
        let eff_b = Effect::new(&rt, || {});
        parent.add_effect(own.clone());
        child_a.add_effect(eff_a.clone());
        child_b.add_effect(eff_b.clone());

        parent.cleanup();
        assert!(!own.is_active());
        assert!(!eff_a.is_active());
        assert!(!eff_b.is_active());
        assert_eq!(parent.child_count(), 0);
    }

    #[test]
    fn test_repeat_cleanup_is_noop() {
        let rt = Runtime::new();
        let scope = Scope::new();
        let detached = Rc::new(Cell::new(0));

        scope.add_effect(Effect::new(&rt, || {}));
        let detached_inner = detached.clone();
        scope.add_listener(move || detached_inner.set(detached_inner.get() + 1));

        scope.cleanup();
        scope.cleanup();
        assert_eq!(detached.get(), 1);
    }

    #[test]
    fn test_children_release_before_parent_listeners() {
        let rt = Runtime::new();
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

        let parent = Scope::new();
        let child = parent.child();

        let order_child = order.clone();
        child.add_listener(move || order_child.borrow_mut().push("child-listener"));
        let order_parent = order.clone();
        parent.add_listener(move || order_parent.borrow_mut().push("parent-listener"));
        parent.add_effect(Effect::new(&rt, || {}));

        parent.cleanup();
        assert_eq!(*order.borrow(), vec!["child-listener", "parent-listener"]);
    }
}
