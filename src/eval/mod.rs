//! Sandboxed expression evaluation for templates.
//!
//! Expressions are parsed from a restricted grammar (identifiers, member
//! and index access, literals, arithmetic/comparison/logical operators,
//! ternary, assignment, calls into scope-bound callables) and interpreted
//! against a [`Bindings`] chain. Host-language code is never compiled or
//! executed.
//!
//! The public entry points never fail outward: a lex/parse error is
//! logged once per source string and the expression evaluates to
//! `Undefined` from then on.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::reactive::{Key, Reactive, Ref, Runtime};
use crate::value::Value;

pub mod interp;
pub mod parser;
pub mod token;

pub use interp::{assign_expr, eval_expr};
pub use parser::{BinOp, Expr, UnaryOp, parse};

/// Lex/parse failure. Internal: callers of [`evaluate`] only ever see
/// `Undefined`.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct SyntaxError {
    message: String,
}

impl SyntaxError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Bindings
// =============================================================================

/// One identifier binding: a plain value, or a ref that is auto-unwrapped
/// (and tracked) on read.
#[derive(Clone)]
pub enum Binding {
    Value(Value),
    Ref(Ref),
}

/// A lexical chain of identifier bindings for one template fragment.
///
/// Lookups walk local variables, then parents, then the root data map
/// (where a miss still registers the key dep, so creating the key later
/// retriggers readers).
#[derive(Clone)]
pub struct Bindings {
    inner: Rc<BindingsInner>,
}

struct BindingsInner {
    vars: RefCell<IndexMap<String, Binding>>,
    parent: Option<Bindings>,
    /// Root data map. Identifiers not bound anywhere resolve against it.
    fallback: Option<Reactive>,
}

impl Bindings {
    /// Root scope, optionally backed by a reactive data map.
    pub fn root(data: Option<Reactive>) -> Bindings {
        Bindings {
            inner: Rc::new(BindingsInner {
                vars: RefCell::new(IndexMap::new()),
                parent: None,
                fallback: data,
            }),
        }
    }

    /// Extended scope for a nested fragment (list items, branches).
    pub fn child(&self) -> Bindings {
        Bindings {
            inner: Rc::new(BindingsInner {
                vars: RefCell::new(IndexMap::new()),
                parent: Some(self.clone()),
                fallback: None,
            }),
        }
    }

    /// Bind an identifier in this scope, shadowing outer bindings.
    pub fn define(&self, name: impl Into<String>, binding: Binding) {
        self.inner.vars.borrow_mut().insert(name.into(), binding);
    }

    /// Resolve an identifier. Refs are unwrapped with a tracked read;
    /// unknown names yield `Undefined`.
    pub fn lookup(&self, name: &str) -> Value {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let binding = current.inner.vars.borrow().get(name).cloned();
            if let Some(binding) = binding {
                return match binding {
                    Binding::Value(v) => v,
                    Binding::Ref(r) => r.get(),
                };
            }
            if let Some(data) = &current.inner.fallback {
                return data.get(&Key::name(name));
            }
            scope = current.inner.parent.as_ref();
        }
        Value::Undefined
    }

    /// Write through an identifier. Ref bindings set the ref (rejecting
    /// containers), plain bindings are replaced in place, and unknown
    /// names land on the root data map (creating the key).
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let binding = current.inner.vars.borrow().get(name).cloned();
            if let Some(binding) = binding {
                return match binding {
                    Binding::Ref(r) => r.set(value).is_ok(),
                    Binding::Value(_) => {
                        current
                            .inner
                            .vars
                            .borrow_mut()
                            .insert(name.to_string(), Binding::Value(value));
                        true
                    }
                };
            }
            if let Some(data) = &current.inner.fallback {
                data.set(Key::name(name), value);
                return true;
            }
            scope = current.inner.parent.as_ref();
        }
        false
    }
}

// =============================================================================
// Expression cache + entry points
// =============================================================================

/// Per-compiler cache of parsed expressions. A source string that fails
/// to parse is cached as `None` so it is logged once, not per re-run.
#[derive(Clone, Default)]
pub struct ExprCache {
    cache: Rc<RefCell<FxHashMap<String, Option<Rc<Expr>>>>>,
}

impl ExprCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse (or fetch) an expression.
    pub fn parse(&self, src: &str) -> Option<Rc<Expr>> {
        if let Some(cached) = self.cache.borrow().get(src) {
            return cached.clone();
        }
        let parsed = match parser::parse(src) {
            Ok(expr) => Some(Rc::new(expr)),
            Err(err) => {
                tracing::warn!(expression = src, error = %err, "failed to parse expression");
                None
            }
        };
        self.cache
            .borrow_mut()
            .insert(src.to_string(), parsed.clone());
        parsed
    }
}

/// Evaluate an expression source against a binding scope. Never fails:
/// any error yields `Undefined`.
pub fn evaluate(rt: &Runtime, cache: &ExprCache, src: &str, scope: &Bindings) -> Value {
    match cache.parse(src) {
        Some(expr) => eval_expr(rt, &expr, scope),
        None => Value::Undefined,
    }
}

/// Assign a value through an expression used as a write target (two-way
/// binding). Returns false when the target is invalid.
pub fn assign(rt: &Runtime, cache: &ExprCache, src: &str, scope: &Bindings, value: Value) -> bool {
    match cache.parse(src) {
        Some(expr) => assign_expr(rt, &expr, value, scope),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_chain_shadowing() {
        let rt = Runtime::new();
        let data = Reactive::new_map(&rt, vec![("x", Value::Num(1.0))]);
        let root = Bindings::root(Some(data));
        let child = root.child();
        child.define("x", Binding::Value(Value::Num(9.0)));

        assert_eq!(root.lookup("x").as_num(), 1.0);
        assert_eq!(child.lookup("x").as_num(), 9.0);
        assert!(matches!(root.lookup("missing"), Value::Undefined));
    }

    #[test]
    fn test_ref_bindings_unwrap() {
        let rt = Runtime::new();
        let root = Bindings::root(None);
        let cell = Ref::new(&rt, Value::Num(3.0)).unwrap();
        root.define("n", Binding::Ref(cell.clone()));

        assert_eq!(root.lookup("n").as_num(), 3.0);
        assert!(root.assign("n", Value::Num(4.0)));
        assert_eq!(cell.peek().as_num(), 4.0);
        // Container into a ref binding is rejected.
        assert!(!root.assign("n", Value::list(vec![])));
    }

    #[test]
    fn test_unknown_assign_creates_data_key() {
        let rt = Runtime::new();
        let data = Reactive::new_map(&rt, vec![]);
        let root = Bindings::root(Some(data.clone()));
        assert!(root.assign("fresh", Value::Num(1.0)));
        assert_eq!(data.get(&Key::name("fresh")).as_num(), 1.0);
    }

    #[test]
    fn test_cache_reuses_parse() {
        let cache = ExprCache::new();
        let first = cache.parse("a + b").unwrap();
        let second = cache.parse("a + b").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(cache.parse("1 +").is_none());
        assert!(cache.parse("1 +").is_none());
    }
}
