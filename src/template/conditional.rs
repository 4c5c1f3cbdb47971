//! Conditional branch rendering (`v-if` / `v-else-if` / `v-else`).
//!
//! One effect owns the whole chain. Each run it evaluates conditions in
//! source order until one is truthy (an `else` branch is always truthy),
//! so at most one branch is ever mounted. Switching branches destroys
//! the old subtree and cleans up its scope before the replacement is
//! cloned from its template and compiled.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::Node;
use crate::eval::Bindings;
use crate::reactive::{Effect, Scope};

use super::Ctx;
use super::compile::compile_tree;

pub(crate) struct Branch {
    /// Condition source, or `None` for a bare `else`.
    pub(crate) cond: Option<String>,
    /// Detached element the mounted subtree is cloned from.
    pub(crate) template: Node,
}

struct Mounted {
    index: usize,
    node: Node,
    scope: Scope,
}

pub(crate) fn mount_conditional(
    ctx: &Ctx,
    anchor: Node,
    branches: Vec<Branch>,
    bindings: &Bindings,
    scope: &Scope,
) {
    let ctx = ctx.clone();
    let rt = ctx.rt.clone();
    let bindings = bindings.clone();
    let parent_scope = scope.clone();
    let mounted: Rc<RefCell<Option<Mounted>>> = Rc::new(RefCell::new(None));

    scope.add_effect(Effect::new(&rt, move || {
        // First truthy condition wins; later branches are not evaluated,
        // so their dependencies stay untracked until they can matter.
        let active = branches.iter().position(|branch| match &branch.cond {
            Some(src) => ctx.eval(src, &bindings).truthy(),
            None => true,
        });

        if mounted.borrow().as_ref().map(|m| m.index) == active {
            return;
        }

        if let Some(old) = mounted.borrow_mut().take() {
            old.node.destroy();
            parent_scope.release_child(&old.scope);
            old.scope.cleanup();
        }

        let Some(index) = active else { return };
        let Some(parent) = anchor.parent() else { return };

        let node = branches[index].template.deep_clone();
        if parent
            .insert_before(&node, anchor.next_sibling().as_ref())
            .is_err()
        {
            return;
        }
        let branch_scope = parent_scope.child();
        compile_tree(&ctx, &node, &bindings, &branch_scope);
        *mounted.borrow_mut() = Some(Mounted {
            index,
            node,
            scope: branch_scope,
        });
    }));
}
