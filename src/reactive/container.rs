//! Reactive containers - deep observation for lists and maps.
//!
//! Instead of transparent proxy interception, observation is an explicit
//! capability set: `get(key)`, `set(key, value)`, `delete(key)`, `keys()`,
//! backed by a tagged ordered-sequence (list) variant and a keyed-mapping
//! (map) variant. Every access routes through deps:
//!
//! - one dep per observed key, created lazily
//! - one iteration dep per container (structural changes: add/remove keys,
//!   full iteration)
//! - one length dep per list
//!
//! Wrapping is identity-preserving: the runtime registry maps a raw target
//! to its single wrapper, so `reactive(x)` is idempotent and never creates
//! two wrappers for one target. Nested containers are wrapped lazily on
//! first access, and mutators always write raw (unwrapped) values so the
//! raw target stays the single source of truth.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::{RawList, RawMap, Value};

use super::dep::Dep;
use super::runtime::Runtime;

// =============================================================================
// Keys
// =============================================================================

/// A property key: a list index or a map field name.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Key {
    Index(usize),
    Name(Rc<str>),
}

impl Key {
    pub fn name(s: impl AsRef<str>) -> Self {
        Key::Name(Rc::from(s.as_ref()))
    }
}

// =============================================================================
// Reactive handle
// =============================================================================

pub(crate) enum RawTarget {
    List(RawList),
    Map(RawMap),
}

/// An observed container handle. Clones share the wrapper.
#[derive(Clone)]
pub struct Reactive {
    pub(crate) inner: Rc<ReactiveInner>,
}

pub(crate) struct ReactiveInner {
    rt: Runtime,
    target: RawTarget,
    key_deps: RefCell<FxHashMap<Key, Dep>>,
    iter_dep: Dep,
    length_dep: Dep,
}

/// Wrap a container value in its reactive handle.
///
/// Identity rules: the same raw target always yields the same wrapper
/// (runtime registry lookup), and wrapping an already-reactive value is a
/// no-op. Scalars pass through unchanged.
pub fn reactive(rt: &Runtime, value: Value) -> Value {
    match value {
        Value::Reactive(_) => value,
        Value::List(list) => Value::Reactive(wrap(rt, RawTarget::List(list))),
        Value::Map(map) => Value::Reactive(wrap(rt, RawTarget::Map(map))),
        other => other,
    }
}

fn wrap(rt: &Runtime, target: RawTarget) -> Reactive {
    let ptr = match &target {
        RawTarget::List(l) => Rc::as_ptr(l) as *const () as usize,
        RawTarget::Map(m) => Rc::as_ptr(m) as *const () as usize,
    };
    if let Some(existing) = rt.lookup_reactive(ptr) {
        return existing;
    }
    let inner = Rc::new(ReactiveInner {
        rt: rt.clone(),
        target,
        key_deps: RefCell::new(FxHashMap::default()),
        iter_dep: Dep::new(),
        length_dep: Dep::new(),
    });
    rt.register_reactive(ptr, &inner);
    Reactive { inner }
}

impl Reactive {
    /// Wrap a fresh list. Convenience for building state in Rust code.
    pub fn new_list(rt: &Runtime, items: Vec<Value>) -> Reactive {
        match reactive(rt, Value::list(items)) {
            Value::Reactive(r) => r,
            _ => unreachable!(),
        }
    }

    /// Wrap a fresh map. Convenience for building state in Rust code.
    pub fn new_map(rt: &Runtime, entries: Vec<(&str, Value)>) -> Reactive {
        match reactive(rt, Value::map(entries)) {
            Value::Reactive(r) => r,
            _ => unreachable!(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.inner.target, RawTarget::List(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self.inner.target, RawTarget::Map(_))
    }

    /// Identity of the underlying raw target.
    pub fn target_ptr(&self) -> usize {
        match &self.inner.target {
            RawTarget::List(l) => Rc::as_ptr(l) as *const () as usize,
            RawTarget::Map(m) => Rc::as_ptr(m) as *const () as usize,
        }
    }

    /// The raw target as a plain value (for storage inside other raw
    /// containers).
    pub(crate) fn raw_value(&self) -> Value {
        match &self.inner.target {
            RawTarget::List(l) => Value::List(l.clone()),
            RawTarget::Map(m) => Value::Map(m.clone()),
        }
    }

    fn rt(&self) -> &Runtime {
        &self.inner.rt
    }

    fn key_dep(&self, key: &Key) -> Dep {
        self.inner
            .key_deps
            .borrow_mut()
            .entry(key.clone())
            .or_insert_with(Dep::new)
            .clone()
    }

    // =========================================================================
    // Capability set: get / set / delete / keys / len
    // =========================================================================

    /// Read one property. Depends on that key's dep; a returned raw
    /// container is wrapped lazily.
    ///
    /// Lists expose the pseudo-key `length`, tracked by the length dep.
    pub fn get(&self, key: &Key) -> Value {
        if self.is_list() {
            if let Key::Name(name) = key {
                if &**name == "length" {
                    return Value::Num(self.len() as f64);
                }
            }
        }
        self.key_dep(key).depend(self.rt());

        let raw = match (&self.inner.target, key) {
            (RawTarget::List(list), Key::Index(i)) => {
                list.borrow().get(*i).cloned().unwrap_or(Value::Undefined)
            }
            (RawTarget::Map(map), Key::Name(name)) => map
                .borrow()
                .get(&**name)
                .cloned()
                .unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        };
        reactive(self.rt(), raw)
    }

    /// Write one property.
    ///
    /// Reactive values are unwrapped to their raw target before storage.
    /// The key dep is notified only on a genuine change (or key creation);
    /// structural changes (new key, list growth) also notify the iteration
    /// dep, and the length dep for lists.
    pub fn set(&self, key: Key, value: Value) {
        let value = to_raw(value);
        match &self.inner.target {
            RawTarget::List(list) => self.set_list(list, key, value),
            RawTarget::Map(map) => self.set_map(map, key, value),
        }
    }

    fn set_list(&self, list: &RawList, key: Key, value: Value) {
        match key {
            Key::Index(i) => {
                let (changed, structural) = {
                    let mut items = list.borrow_mut();
                    if i < items.len() {
                        let changed = !items[i].same(&value);
                        if changed {
                            items[i] = value;
                        }
                        (changed, false)
                    } else {
                        // Out-of-range write grows the list, padding with
                        // undefined holes.
                        items.resize(i, Value::Undefined);
                        items.push(value);
                        (true, true)
                    }
                };
                if changed {
                    self.notify_key(&Key::Index(i));
                }
                if structural {
                    self.inner.iter_dep.notify(self.rt());
                    self.inner.length_dep.notify(self.rt());
                }
            }
            Key::Name(name) if &*name == "length" => {
                let new_len = value.as_num();
                if !new_len.is_finite() || new_len < 0.0 {
                    return;
                }
                let new_len = new_len as usize;
                let old_len = list.borrow().len();
                if new_len == old_len {
                    return;
                }
                list.borrow_mut().resize(new_len, Value::Undefined);
                self.notify_all_indices();
                self.inner.iter_dep.notify(self.rt());
                self.inner.length_dep.notify(self.rt());
            }
            Key::Name(_) => {}
        }
    }

    fn set_map(&self, map: &RawMap, key: Key, value: Value) {
        let Key::Name(name) = key else { return };
        let (changed, added) = {
            let mut entries = map.borrow_mut();
            match entries.get(&*name) {
                Some(old) => {
                    let changed = !old.same(&value);
                    if changed {
                        entries.insert(name.to_string(), value);
                    }
                    (changed, false)
                }
                None => {
                    entries.insert(name.to_string(), value);
                    (true, true)
                }
            }
        };
        if changed {
            self.notify_key(&Key::Name(name));
        }
        if added {
            self.inner.iter_dep.notify(self.rt());
        }
    }

    /// Delete one property. Notifies the key dep and the iteration dep
    /// only if the key actually existed.
    pub fn delete(&self, key: &Key) -> bool {
        let existed = match (&self.inner.target, key) {
            (RawTarget::List(list), Key::Index(i)) => {
                let mut items = list.borrow_mut();
                if *i < items.len() {
                    items[*i] = Value::Undefined;
                    true
                } else {
                    false
                }
            }
            (RawTarget::Map(map), Key::Name(name)) => {
                map.borrow_mut().shift_remove(&**name).is_some()
            }
            _ => false,
        };
        if existed {
            self.notify_key(key);
            self.inner.iter_dep.notify(self.rt());
        }
        existed
    }

    /// Enumerate keys. Depends on the iteration dep so adding or removing
    /// entries retriggers enumerating effects.
    pub fn keys(&self) -> Vec<Key> {
        self.inner.iter_dep.depend(self.rt());
        match &self.inner.target {
            RawTarget::List(list) => (0..list.borrow().len()).map(Key::Index).collect(),
            RawTarget::Map(map) => map.borrow().keys().map(|k| Key::name(k)).collect(),
        }
    }

    /// Container size. Lists track the length dep, maps the iteration dep.
    pub fn len(&self) -> usize {
        match &self.inner.target {
            RawTarget::List(list) => {
                self.inner.length_dep.depend(self.rt());
                list.borrow().len()
            }
            RawTarget::Map(map) => {
                self.inner.iter_dep.depend(self.rt());
                map.borrow().len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a map key exists. Depends on that key's dep so later
    /// creation retriggers.
    pub fn has(&self, key: &Key) -> bool {
        self.key_dep(key).depend(self.rt());
        match (&self.inner.target, key) {
            (RawTarget::List(list), Key::Index(i)) => *i < list.borrow().len(),
            (RawTarget::Map(map), Key::Name(name)) => map.borrow().contains_key(&**name),
            _ => false,
        }
    }

    /// Full-list snapshot in order, wrapped. Depends on the iteration dep,
    /// the length dep, and every index dep: the caller observed every
    /// slot.
    pub fn to_vec(&self) -> Vec<Value> {
        self.depend_read_all();
        let raw: Vec<Value> = match &self.inner.target {
            RawTarget::List(list) => list.borrow().clone(),
            RawTarget::Map(_) => Vec::new(),
        };
        raw.into_iter().map(|v| reactive(self.rt(), v)).collect()
    }

    /// Full-map snapshot in insertion order, wrapped. Depends on the
    /// iteration dep.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.inner.iter_dep.depend(self.rt());
        let raw: Vec<(Rc<str>, Value)> = match &self.inner.target {
            RawTarget::Map(map) => map
                .borrow()
                .iter()
                .map(|(k, v)| (Rc::from(k.as_str()), v.clone()))
                .collect(),
            RawTarget::List(_) => Vec::new(),
        };
        raw.into_iter()
            .map(|(k, v)| (k, reactive(self.rt(), v)))
            .collect()
    }

    // =========================================================================
    // List mutators (raw storage, then notify)
    // =========================================================================

    /// Append to the end. Structural: iteration + length.
    pub fn push(&self, value: Value) {
        let RawTarget::List(list) = &self.inner.target else {
            return;
        };
        list.borrow_mut().push(to_raw(value));
        self.notify_structural(false);
    }

    /// Remove from the end. Notifies the removed index, iteration, length.
    pub fn pop(&self) -> Value {
        let RawTarget::List(list) = &self.inner.target else {
            return Value::Undefined;
        };
        let (removed, index) = {
            let mut items = list.borrow_mut();
            match items.pop() {
                Some(v) => {
                    let index = items.len();
                    (v, index)
                }
                None => return Value::Undefined,
            }
        };
        self.notify_key(&Key::Index(index));
        self.notify_structural(false);
        reactive(self.rt(), removed)
    }

    /// Insert at the front. Position-changing: every index may have
    /// shifted.
    pub fn unshift(&self, value: Value) {
        let RawTarget::List(list) = &self.inner.target else {
            return;
        };
        list.borrow_mut().insert(0, to_raw(value));
        self.notify_structural(true);
    }

    /// Remove from the front. Position-changing.
    pub fn shift(&self) -> Value {
        let RawTarget::List(list) = &self.inner.target else {
            return Value::Undefined;
        };
        let removed = {
            let mut items = list.borrow_mut();
            if items.is_empty() {
                return Value::Undefined;
            }
            items.remove(0)
        };
        self.notify_structural(true);
        reactive(self.rt(), removed)
    }

    /// Replace a range. Position-changing. Returns the removed values.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Vec<Value> {
        let RawTarget::List(list) = &self.inner.target else {
            return Vec::new();
        };
        let removed: Vec<Value> = {
            let mut storage = list.borrow_mut();
            let start = start.min(storage.len());
            let end = (start + delete_count).min(storage.len());
            storage
                .splice(start..end, items.into_iter().map(to_raw))
                .collect()
        };
        self.notify_structural(true);
        removed
            .into_iter()
            .map(|v| reactive(self.rt(), v))
            .collect()
    }

    /// In-place sort with a caller comparator. Position-changing.
    pub fn sort_by(&self, compare: impl Fn(&Value, &Value) -> Ordering) {
        let RawTarget::List(list) = &self.inner.target else {
            return;
        };
        list.borrow_mut().sort_by(|a, b| compare(a, b));
        self.notify_structural(true);
    }

    /// In-place reverse. Position-changing.
    pub fn reverse(&self) {
        let RawTarget::List(list) = &self.inner.target else {
            return;
        };
        list.borrow_mut().reverse();
        self.notify_structural(true);
    }

    // =========================================================================
    // List readers (conservative tracking: length + every index)
    // =========================================================================

    /// Membership test by identity.
    pub fn includes(&self, needle: &Value) -> bool {
        self.depend_read_all();
        match &self.inner.target {
            RawTarget::List(list) => list.borrow().iter().any(|v| v.same(needle)),
            RawTarget::Map(_) => false,
        }
    }

    /// First index of `needle`, or -1.
    pub fn index_of(&self, needle: &Value) -> Value {
        self.depend_read_all();
        match &self.inner.target {
            RawTarget::List(list) => Value::Num(
                list.borrow()
                    .iter()
                    .position(|v| v.same(needle))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            ),
            RawTarget::Map(_) => Value::Num(-1.0),
        }
    }

    /// First element matching the predicate, wrapped.
    pub fn find(&self, predicate: impl Fn(&Value) -> bool) -> Value {
        for item in self.to_vec() {
            if predicate(&item) {
                return item;
            }
        }
        Value::Undefined
    }

    /// New list of elements matching the predicate, wrapped reactive.
    pub fn filter(&self, predicate: impl Fn(&Value) -> bool) -> Value {
        let kept: Vec<Value> = self
            .to_vec()
            .into_iter()
            .filter(|v| predicate(v))
            .map(to_raw)
            .collect();
        reactive(self.rt(), Value::list(kept))
    }

    /// New list produced by the transform, wrapped reactive.
    pub fn map_items(&self, transform: impl Fn(&Value) -> Value) -> Value {
        let mapped: Vec<Value> = self
            .to_vec()
            .iter()
            .map(|v| to_raw(transform(v)))
            .collect();
        reactive(self.rt(), Value::list(mapped))
    }

    /// Sub-range copy, wrapped reactive.
    pub fn slice(&self, start: usize, end: Option<usize>) -> Value {
        let items = self.to_vec();
        let end = end.unwrap_or(items.len()).min(items.len());
        let start = start.min(end);
        let out: Vec<Value> = items[start..end].iter().cloned().map(to_raw).collect();
        reactive(self.rt(), Value::list(out))
    }

    /// Concatenation with another list value, wrapped reactive.
    pub fn concat(&self, other: &Value) -> Value {
        let mut out: Vec<Value> = self.to_vec().into_iter().map(to_raw).collect();
        match other {
            Value::Reactive(r) if r.is_list() => {
                out.extend(r.to_vec().into_iter().map(to_raw));
            }
            Value::List(l) => out.extend(l.borrow().iter().cloned()),
            other => out.push(to_raw(other.clone())),
        }
        reactive(self.rt(), Value::list(out))
    }

    /// Joined display of all elements.
    pub fn join(&self, separator: &str) -> Value {
        let joined = self
            .to_vec()
            .iter()
            .map(Value::display)
            .collect::<Vec<_>>()
            .join(separator);
        Value::Str(Rc::from(joined.as_str()))
    }

    /// Display coercion for interpolation: lists join with commas (a
    /// tracked read), maps render opaquely.
    pub fn display(&self) -> String {
        if self.is_list() {
            self.to_vec()
                .iter()
                .map(Value::display)
                .collect::<Vec<_>>()
                .join(",")
        } else {
            "[object]".to_string()
        }
    }

    // =========================================================================
    // Notify / depend helpers
    // =========================================================================

    fn notify_key(&self, key: &Key) {
        let dep = {
            let deps = self.inner.key_deps.borrow();
            deps.get(key).cloned()
        };
        if let Some(dep) = dep {
            dep.notify(self.rt());
        }
    }

    /// Structural mutation: iteration + length, plus every index dep for
    /// position-changing operations.
    fn notify_structural(&self, positions_changed: bool) {
        if positions_changed {
            self.notify_all_indices();
        }
        self.inner.iter_dep.notify(self.rt());
        self.inner.length_dep.notify(self.rt());
    }

    fn notify_all_indices(&self) {
        let deps: Vec<Dep> = self
            .inner
            .key_deps
            .borrow()
            .iter()
            .filter_map(|(key, dep)| match key {
                Key::Index(_) => Some(dep.clone()),
                Key::Name(_) => None,
            })
            .collect();
        for dep in deps {
            dep.notify(self.rt());
        }
    }

    /// Conservative read tracking for search/scan methods: the underlying
    /// operation may compare against any element, so depend on iteration,
    /// length, and every existing index.
    fn depend_read_all(&self) {
        self.inner.iter_dep.depend(self.rt());
        let len = match &self.inner.target {
            RawTarget::List(list) => {
                self.inner.length_dep.depend(self.rt());
                list.borrow().len()
            }
            RawTarget::Map(_) => return,
        };
        for i in 0..len {
            self.key_dep(&Key::Index(i)).depend(self.rt());
        }
    }
}

/// Unwrap a reactive handle to its raw target for storage. Raw storage
/// must never hold wrappers, or nested access would double-wrap.
fn to_raw(value: Value) -> Value {
    match value {
        Value::Reactive(r) => r.raw_value(),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::reactive::{Effect, Runtime};

    fn counting_effect(rt: &Runtime, body: impl Fn() + 'static) -> (Effect, Rc<Cell<u32>>) {
        let runs = Rc::new(Cell::new(0));
        let runs_inner = runs.clone();
        let effect = Effect::new(rt, move || {
            runs_inner.set(runs_inner.get() + 1);
            body();
        });
        (effect, runs)
    }

    #[test]
    fn test_identity_preserving_wrap() {
        let rt = Runtime::new();
        let raw = Value::map(vec![("a", Value::Num(1.0))]);
        let first = reactive(&rt, raw.clone());
        let second = reactive(&rt, raw.clone());
        let rewrapped = reactive(&rt, first.clone());

        assert!(first.same(&second));
        assert!(first.same(&rewrapped));
        let (Value::Reactive(a), Value::Reactive(b)) = (&first, &second) else {
            panic!("expected reactive handles");
        };
        assert!(Rc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn test_set_same_value_does_not_notify() {
        let rt = Runtime::new();
        let state = Reactive::new_map(&rt, vec![("count", Value::Num(1.0))]);

        let state_read = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            state_read.get(&Key::name("count"));
        });
        assert_eq!(runs.get(), 1);

        state.set(Key::name("count"), Value::Num(1.0));
        rt.flush();
        assert_eq!(runs.get(), 1);

        state.set(Key::name("count"), Value::Num(2.0));
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_new_key_notifies_iteration() {
        let rt = Runtime::new();
        let state = Reactive::new_map(&rt, vec![("a", Value::Num(1.0))]);

        let state_keys = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            state_keys.keys();
        });
        assert_eq!(runs.get(), 1);

        state.set(Key::name("b"), Value::Num(2.0));
        rt.flush();
        assert_eq!(runs.get(), 2);

        // Changing an existing key is not structural.
        state.set(Key::name("a"), Value::Num(5.0));
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_delete_notifies_only_when_present() {
        let rt = Runtime::new();
        let state = Reactive::new_map(&rt, vec![("a", Value::Num(1.0))]);

        let state_keys = state.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            state_keys.keys();
        });

        assert!(!state.delete(&Key::name("missing")));
        rt.flush();
        assert_eq!(runs.get(), 1);

        assert!(state.delete(&Key::name("a")));
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_lazy_nested_wrapping() {
        let rt = Runtime::new();
        let nested = Value::map(vec![("x", Value::Num(1.0))]);
        let state = Reactive::new_map(&rt, vec![("inner", nested.clone())]);

        let first = state.get(&Key::name("inner"));
        let second = state.get(&Key::name("inner"));
        assert!(matches!(first, Value::Reactive(_)));
        assert!(first.same(&second));
        assert!(first.same(&nested));
    }

    #[test]
    fn test_list_index_write_notifies_index_dep() {
        let rt = Runtime::new();
        let list = Reactive::new_list(&rt, vec![Value::Num(1.0), Value::Num(2.0)]);

        let list_read = list.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            list_read.get(&Key::Index(0));
        });

        list.set(Key::Index(1), Value::Num(9.0));
        rt.flush();
        assert_eq!(runs.get(), 1);

        list.set(Key::Index(0), Value::Num(9.0));
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_push_notifies_length_and_iteration() {
        let rt = Runtime::new();
        let list = Reactive::new_list(&rt, vec![Value::Num(1.0)]);

        let list_len = list.clone();
        let (_len_effect, len_runs) = counting_effect(&rt, move || {
            list_len.len();
        });
        let list_iter = list.clone();
        let (_iter_effect, iter_runs) = counting_effect(&rt, move || {
            list_iter.keys();
        });

        list.push(Value::Num(2.0));
        rt.flush();
        assert_eq!(len_runs.get(), 2);
        assert_eq!(iter_runs.get(), 2);
    }

    #[test]
    fn test_position_changing_ops_notify_every_index() {
        let rt = Runtime::new();
        let list = Reactive::new_list(
            &rt,
            vec![Value::Num(1.0), Value::Num(2.0), Value::Num(3.0)],
        );

        let list_read = list.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            list_read.get(&Key::Index(2));
        });

        list.reverse();
        rt.flush();
        assert_eq!(runs.get(), 2);

        list.unshift(Value::Num(0.0));
        rt.flush();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn test_readers_track_conservatively() {
        let rt = Runtime::new();
        let list = Reactive::new_list(&rt, vec![Value::Num(1.0), Value::Num(2.0)]);

        let list_read = list.clone();
        let (_effect, runs) = counting_effect(&rt, move || {
            list_read.includes(&Value::Num(5.0));
        });

        // An in-place element change can flip the search result.
        list.set(Key::Index(1), Value::Num(5.0));
        rt.flush();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_mutators_store_raw_values() {
        let rt = Runtime::new();
        let list = Reactive::new_list(&rt, vec![]);
        let item = reactive(&rt, Value::map(vec![("id", Value::Num(1.0))]));

        list.push(item.clone());
        let RawTarget::List(storage) = &list.inner.target else {
            panic!("expected list");
        };
        assert!(matches!(storage.borrow()[0], Value::Map(_)));

        // Reading re-wraps to the identical wrapper.
        let out = list.get(&Key::Index(0));
        assert!(out.same(&item));
    }

    #[test]
    fn test_reader_results_are_wrapped() {
        let rt = Runtime::new();
        let list = Reactive::new_list(&rt, vec![Value::Num(1.0), Value::Num(2.0)]);
        let doubled = list.map_items(|v| Value::Num(v.as_num() * 2.0));
        let Value::Reactive(doubled) = doubled else {
            panic!("expected reactive result");
        };
        assert!(doubled.is_list());
        assert_eq!(doubled.get(&Key::Index(1)).as_num(), 4.0);
    }
}
