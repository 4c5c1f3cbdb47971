//! Template binding layer - wires a document tree to reactive state.
//!
//! [`mount`] walks a node tree once and installs fine-grained effects
//! for every directive it finds:
//!
//! - `{{ expr }}` text interpolation
//! - `:name="expr"` reactive attribute binding
//! - `@event="expr"` event listeners
//! - `v-model="target"` two-way input binding
//! - `v-if` / `v-else-if` / `v-else` branch chains
//! - `v-for="item in items"` keyed list rendering (optional `:key`)
//!
//! There is no virtual tree and no diffing pass: each directive owns one
//! effect that patches its own node when a dependency changes. Mounting
//! returns a [`Scope`] that tears everything down on cleanup.

use crate::eval::{Bindings, ExprCache, assign, evaluate};
use crate::reactive::Runtime;
use crate::value::Value;

pub mod compile;
mod conditional;
mod list;

pub use compile::mount;

/// Shared state for one mount: the runtime handle and the parsed
/// expression cache. Cheap to clone into effect closures.
#[derive(Clone)]
pub(crate) struct Ctx {
    pub(crate) rt: Runtime,
    pub(crate) cache: ExprCache,
}

impl Ctx {
    pub(crate) fn new(rt: &Runtime) -> Self {
        Self {
            rt: rt.clone(),
            cache: ExprCache::new(),
        }
    }

    pub(crate) fn eval(&self, src: &str, scope: &Bindings) -> Value {
        evaluate(&self.rt, &self.cache, src, scope)
    }

    pub(crate) fn assign(&self, src: &str, scope: &Bindings, value: Value) -> bool {
        assign(&self.rt, &self.cache, src, scope, value)
    }
}
