//! Keyed list rendering (`v-for="item in items"` with optional `:key`).
//!
//! One effect owns the block. Each run it projects a key per item,
//! matches keys against the previous run's records, and reuses matched
//! subtrees in place: scalar items update through a per-item ref, and
//! container items are reused only when the same container identity is
//! still behind the key. Unmatched records are destroyed, new items are
//! cloned from the template and compiled, and a final pass walks the
//! sibling run after the anchor to put nodes in source order.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::dom::Node;
use crate::eval::{Binding, Bindings};
use crate::reactive::{Effect, Ref, Scope};
use crate::value::Value;

use super::Ctx;
use super::compile::compile_tree;

// =============================================================================
// v-for expression
// =============================================================================

pub(crate) struct RepeatSpec {
    pub(crate) item: String,
    pub(crate) index: Option<String>,
    pub(crate) source: String,
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Parse `item in items` or `(item, i) in items`.
pub(crate) fn parse_repeat(src: &str) -> Option<RepeatSpec> {
    let (lhs, source) = src.split_once(" in ")?;
    let lhs = lhs.trim();
    let source = source.trim().to_string();
    if source.is_empty() {
        return None;
    }
    if let Some(inner) = lhs.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        let mut parts = inner.splitn(2, ',');
        let item = parts.next()?.trim().to_string();
        let index = parts
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if !is_ident(&item) || !index.as_deref().map(is_ident).unwrap_or(true) {
            return None;
        }
        Some(RepeatSpec {
            item,
            index,
            source,
        })
    } else if is_ident(lhs) {
        Some(RepeatSpec {
            item: lhs.to_string(),
            index: None,
            source,
        })
    } else {
        None
    }
}

// =============================================================================
// Keys and records
// =============================================================================

/// Hashable projection of a `:key` result. Numbers hash by bit pattern,
/// containers by identity; keyless items fall back to position.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
enum KeyVal {
    Num(u64),
    Str(String),
    Bool(bool),
    Identity(usize),
    Index(usize),
}

struct ItemRecord {
    node: Node,
    scope: Scope,
    /// Scalar slot the item identifier reads through. `None` for
    /// container items, which bind the container itself.
    value_ref: Option<Ref>,
    index_ref: Ref,
    /// Container identity at creation, for reuse checks.
    identity: Option<usize>,
}

pub(crate) fn mount_list(
    ctx: &Ctx,
    anchor: Node,
    template: Node,
    spec: RepeatSpec,
    key_expr: Option<String>,
    bindings: &Bindings,
    scope: &Scope,
) {
    let ctx = ctx.clone();
    let rt = ctx.rt.clone();
    let bindings = bindings.clone();
    let parent_scope = scope.clone();
    let records: Rc<RefCell<IndexMap<KeyVal, ItemRecord>>> = Rc::new(RefCell::new(IndexMap::new()));

    scope.add_effect(Effect::new(&rt, move || {
        let items = match ctx.eval(&spec.source, &bindings) {
            Value::Reactive(r) if r.is_list() => r.to_vec(),
            Value::List(raw) => raw.borrow().clone(),
            _ => Vec::new(),
        };

        let mut old = std::mem::take(&mut *records.borrow_mut());
        let mut next: IndexMap<KeyVal, ItemRecord> = IndexMap::with_capacity(items.len());

        for (position, value) in items.iter().enumerate() {
            let key = project_key(&ctx, &spec, key_expr.as_deref(), &bindings, position, value);
            if next.contains_key(&key) {
                // First occurrence of a key wins.
                tracing::warn!(key = ?key, "duplicate key in list rendering");
                continue;
            }

            if let Some(record) = old.shift_remove(&key) {
                let reusable = match (&record.value_ref, value.container_ptr()) {
                    (Some(_), None) => true,
                    (None, Some(ptr)) => record.identity == Some(ptr),
                    _ => false,
                };
                if reusable {
                    if let Some(value_ref) = &record.value_ref {
                        let _ = value_ref.set(value.clone());
                    }
                    let _ = record.index_ref.set(Value::Num(position as f64));
                    next.insert(key, record);
                    continue;
                }
                // Same key, different shape or identity: rebuild.
                drop_record(&parent_scope, record);
            }

            let Ok(index_ref) = Ref::new(&ctx.rt, Value::Num(position as f64)) else {
                continue;
            };
            let item_bindings = bindings.child();
            if let Some(alias) = &spec.index {
                item_bindings.define(alias.clone(), Binding::Ref(index_ref.clone()));
            }
            let value_ref = if value.is_container() {
                item_bindings.define(spec.item.clone(), Binding::Value(value.clone()));
                None
            } else {
                match Ref::new(&ctx.rt, value.clone()) {
                    Ok(r) => {
                        item_bindings.define(spec.item.clone(), Binding::Ref(r.clone()));
                        Some(r)
                    }
                    Err(_) => {
                        item_bindings.define(spec.item.clone(), Binding::Value(value.clone()));
                        None
                    }
                }
            };

            let node = template.deep_clone();
            let item_scope = parent_scope.child();
            compile_tree(&ctx, &node, &item_bindings, &item_scope);
            next.insert(
                key,
                ItemRecord {
                    node,
                    scope: item_scope,
                    value_ref,
                    index_ref,
                    identity: value.container_ptr(),
                },
            );
        }

        for (_, record) in old {
            drop_record(&parent_scope, record);
        }

        // Walk the run after the anchor into source order.
        if let Some(parent) = anchor.parent() {
            let mut prev = anchor.clone();
            for record in next.values() {
                if prev.next_sibling().as_ref() != Some(&record.node) {
                    let _ = parent.insert_before(&record.node, prev.next_sibling().as_ref());
                }
                prev = record.node.clone();
            }
        }

        *records.borrow_mut() = next;
    }));
}

fn drop_record(parent_scope: &Scope, record: ItemRecord) {
    record.node.destroy();
    parent_scope.release_child(&record.scope);
    record.scope.cleanup();
}

fn project_key(
    ctx: &Ctx,
    spec: &RepeatSpec,
    key_expr: Option<&str>,
    bindings: &Bindings,
    position: usize,
    value: &Value,
) -> KeyVal {
    if let Some(src) = key_expr {
        let key_scope = bindings.child();
        key_scope.define(spec.item.clone(), Binding::Value(value.clone()));
        if let Some(alias) = &spec.index {
            key_scope.define(alias.clone(), Binding::Value(Value::Num(position as f64)));
        }
        let projected = ctx.eval(src, &key_scope);
        match projected {
            Value::Num(n) => KeyVal::Num(n.to_bits()),
            Value::Str(s) => KeyVal::Str(s.to_string()),
            Value::Bool(b) => KeyVal::Bool(b),
            other => match other.container_ptr() {
                Some(ptr) => KeyVal::Identity(ptr),
                None => KeyVal::Index(position),
            },
        }
    } else {
        // Keyless items key by position, containers included: reordering
        // a keyless list degrades to rebuild (the identity check in the
        // reuse test catches the mismatch), and the same container
        // appearing at two positions renders once per position.
        KeyVal::Index(position)
    }
}
