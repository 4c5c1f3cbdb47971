//! Dynamic value model shared by the reactivity core and the expression
//! evaluator.
//!
//! Rust has no transparent property interception, so observable state is
//! expressed as a small dynamic `Value` enum instead: scalars, raw (not yet
//! observed) containers, reactive container handles, and scope-bound
//! callables. The reactive layer wraps raw containers lazily; see
//! [`crate::reactive::container`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactive::Reactive;

// =============================================================================
// Raw container storage
// =============================================================================

/// Raw ordered-sequence storage. Identity is the `Rc` allocation.
pub type RawList = Rc<RefCell<Vec<Value>>>;

/// Raw keyed-mapping storage, insertion-ordered for stable enumeration.
pub type RawMap = Rc<RefCell<IndexMap<String, Value>>>;

/// A scope-bound callable usable from template expressions.
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Value>;

// =============================================================================
// Value
// =============================================================================

/// A dynamic value flowing through state, templates, and expressions.
#[derive(Clone)]
pub enum Value {
    /// Absent value. Failed expressions and missing keys evaluate to this.
    Undefined,
    /// Explicit null.
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    /// Unobserved list container.
    List(RawList),
    /// Unobserved map container.
    Map(RawMap),
    /// Observed container handle (list or map variant).
    Reactive(Reactive),
    /// Callable bound into a template scope.
    Func(NativeFn),
}

impl Value {
    /// Build a string value.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Build a raw list from values.
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    /// Build a raw map from key/value pairs.
    pub fn map(entries: Vec<(&str, Value)>) -> Self {
        let map: IndexMap<String, Value> = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Value::Map(Rc::new(RefCell::new(map)))
    }

    /// Whether this value is a container (raw or reactive).
    ///
    /// Containers are rejected by strict refs and routed through the
    /// reactive container layer instead.
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_) | Value::Reactive(_))
    }

    /// Truthiness: `Undefined`, `Null`, `false`, `0`, `NaN` and `""` are
    /// falsy; everything else is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Reactive(_) | Value::Func(_) => true,
        }
    }

    /// `Object.is`-style identity: containers and functions compare by
    /// pointer, numbers by bit pattern (`NaN` equals `NaN`), strings by
    /// content. A reactive handle is identical to its raw target.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => match (self.container_ptr(), other.container_ptr()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Identity pointer of the underlying raw container, if any.
    ///
    /// Reactive handles report their raw target, so a wrapper and its
    /// target share an identity.
    pub fn container_ptr(&self) -> Option<usize> {
        match self {
            Value::List(l) => Some(Rc::as_ptr(l) as *const () as usize),
            Value::Map(m) => Some(Rc::as_ptr(m) as *const () as usize),
            Value::Reactive(r) => Some(r.target_ptr()),
            _ => None,
        }
    }

    /// Coerce to a number for arithmetic. Non-numeric values yield `NaN`
    /// except booleans and numeric strings.
    pub fn as_num(&self) -> f64 {
        match self {
            Value::Num(n) => *n,
            Value::Bool(true) => 1.0,
            Value::Bool(false) | Value::Null => 0.0,
            Value::Str(s) => s.trim().parse().unwrap_or(f64::NAN),
            _ => f64::NAN,
        }
    }

    /// Display coercion used by text interpolation. `Undefined` and `Null`
    /// render empty so templates stay resilient to transient gaps.
    ///
    /// Rendering a reactive list reads it through its deps, so an
    /// interpolation showing a list re-renders when the list changes.
    pub fn display(&self) -> String {
        match self {
            Value::Undefined | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Num(n) => fmt_num(*n),
            Value::Str(s) => s.to_string(),
            Value::List(l) => l
                .borrow()
                .iter()
                .map(Value::display)
                .collect::<Vec<_>>()
                .join(","),
            Value::Map(_) => "[object]".to_string(),
            Value::Reactive(r) => r.display(),
            Value::Func(_) => "[function]".to_string(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{}", fmt_num(*n)),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(l) => write!(f, "List({:p})", Rc::as_ptr(l)),
            Value::Map(m) => write!(f, "Map({:p})", Rc::as_ptr(m)),
            Value::Reactive(r) => write!(f, "Reactive(0x{:x})", r.target_ptr()),
            Value::Func(_) => write!(f, "[function]"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Num(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Num(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s.as_str()))
    }
}

/// Format a number the way templates expect: integral values render
/// without a trailing `.0`.
fn fmt_num(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Num(0.0).truthy());
        assert!(!Value::Num(f64::NAN).truthy());
        assert!(!Value::str("").truthy());

        assert!(Value::Bool(true).truthy());
        assert!(Value::Num(-1.0).truthy());
        assert!(Value::str("0").truthy());
        assert!(Value::list(vec![]).truthy());
    }

    #[test]
    fn test_same_scalars() {
        assert!(Value::Num(1.5).same(&Value::Num(1.5)));
        assert!(Value::Num(f64::NAN).same(&Value::Num(f64::NAN)));
        assert!(!Value::Num(0.0).same(&Value::Num(-0.0)));
        assert!(Value::str("a").same(&Value::str("a")));
        assert!(!Value::str("a").same(&Value::Num(1.0)));
    }

    #[test]
    fn test_same_containers_by_identity() {
        let a = Value::list(vec![Value::Num(1.0)]);
        let b = Value::list(vec![Value::Num(1.0)]);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Num(3.0).display(), "3");
        assert_eq!(Value::Num(3.25).display(), "3.25");
        assert_eq!(Value::Undefined.display(), "");
        assert_eq!(Value::Null.display(), "");
        assert_eq!(Value::str("hi").display(), "hi");
    }
}
