//! One-pass template compilation.
//!
//! The walk visits each node exactly once. Structural directives
//! (`v-for`, then `v-if` chains) replace their element with a comment
//! anchor and hand the detached element over as a template; everything
//! else installs per-node effects and recurses into a snapshot of the
//! children taken before any effect can mutate them.

use std::rc::Rc;

use crate::dom::{Event, Node};
use crate::eval::{Binding, Bindings};
use crate::reactive::{Effect, Reactive, Runtime, Scope};
use crate::value::Value;

use super::Ctx;
use super::conditional::{Branch, mount_conditional};
use super::list::{mount_list, parse_repeat};

/// Bind a node tree to a reactive data map. Directives on descendants
/// of `root` become live effects; the root element itself is left
/// untouched. The returned scope stops every effect and detaches every
/// listener on [`Scope::cleanup`].
pub fn mount(rt: &Runtime, root: &Node, data: Reactive) -> Scope {
    let ctx = Ctx::new(rt);
    let bindings = Bindings::root(Some(data));
    let scope = Scope::new();
    compile_children(&ctx, root, &bindings, &scope);
    scope
}

/// Compile a subtree rooted at `node` (directives on `node` included).
/// Structural directives are handled by the parent walk, never here.
pub(crate) fn compile_tree(ctx: &Ctx, node: &Node, bindings: &Bindings, scope: &Scope) {
    if node.is_element() {
        compile_directives(ctx, node, bindings, scope);
        compile_children(ctx, node, bindings, scope);
    } else if node.is_text() {
        compile_text(ctx, node, bindings, scope);
    }
}

pub(crate) fn compile_children(ctx: &Ctx, parent: &Node, bindings: &Bindings, scope: &Scope) {
    let children = parent.children();
    let mut i = 0;
    while i < children.len() {
        let node = children[i].clone();
        i += 1;

        if !node.is_element() {
            if node.is_text() {
                compile_text(ctx, &node, bindings, scope);
            }
            continue;
        }

        // v-for wins over v-if on the same element.
        if let Some(repeat) = node.attr("v-for") {
            let Some(mut spec) = parse_repeat(&repeat) else {
                tracing::warn!(expression = %repeat, "unparseable v-for expression");
                continue;
            };
            // `v-for-index` names the index alias when the shorthand
            // `(item, i)` form is not used.
            if spec.index.is_none() {
                spec.index = node.attr("v-for-index").filter(|s| !s.is_empty());
            }
            let key_expr = node.attr(":key");
            let anchor = node.document().create_comment("for");
            if parent.insert_before(&anchor, Some(&node)).is_err() {
                continue;
            }
            node.detach();
            node.remove_attr("v-for");
            node.remove_attr("v-for-index");
            node.remove_attr(":key");
            mount_list(ctx, anchor, node, spec, key_expr, bindings, scope);
            continue;
        }

        if let Some(cond) = node.attr("v-if") {
            node.remove_attr("v-if");
            let mut branches = vec![Branch {
                cond: Some(cond),
                template: node.clone(),
            }];
            // Consume the directly following v-else-if / v-else siblings.
            while i < children.len() {
                let sibling = children[i].clone();
                if let Some(cond) = sibling.attr("v-else-if") {
                    sibling.remove_attr("v-else-if");
                    branches.push(Branch {
                        cond: Some(cond),
                        template: sibling,
                    });
                    i += 1;
                } else if sibling.is_element() && sibling.attr("v-else").is_some() {
                    sibling.remove_attr("v-else");
                    branches.push(Branch {
                        cond: None,
                        template: sibling,
                    });
                    i += 1;
                    break;
                } else {
                    break;
                }
            }
            let anchor = node.document().create_comment("if");
            if parent.insert_before(&anchor, Some(&node)).is_err() {
                continue;
            }
            for branch in &branches {
                branch.template.detach();
            }
            mount_conditional(ctx, anchor, branches, bindings, scope);
            continue;
        }

        compile_directives(ctx, &node, bindings, scope);
        compile_children(ctx, &node, bindings, scope);
    }
}

// =============================================================================
// Text interpolation
// =============================================================================

enum Segment {
    Literal(String),
    Expr(String),
}

/// Split text into literal and `{{ expr }}` segments. `None` when the
/// text contains no interpolation at all.
fn parse_segments(text: &str) -> Option<Vec<Segment>> {
    if !text.contains("{{") {
        return None;
    }
    let mut segments = Vec::new();
    let mut rest = text;
    loop {
        match rest.find("{{") {
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                break;
            }
            Some(open) => {
                if open > 0 {
                    segments.push(Segment::Literal(rest[..open].to_string()));
                }
                let after = &rest[open + 2..];
                match after.find("}}") {
                    Some(close) => {
                        segments.push(Segment::Expr(after[..close].trim().to_string()));
                        rest = &after[close + 2..];
                    }
                    None => {
                        // Unterminated mustache stays literal.
                        segments.push(Segment::Literal(rest[open..].to_string()));
                        break;
                    }
                }
            }
        }
    }
    Some(segments)
}

fn compile_text(ctx: &Ctx, node: &Node, bindings: &Bindings, scope: &Scope) {
    let Some(text) = node.text() else { return };
    let Some(segments) = parse_segments(&text) else {
        return;
    };
    let rt = ctx.rt.clone();
    let ctx = ctx.clone();
    let node = node.clone();
    let bindings = bindings.clone();
    scope.add_effect(Effect::new(&rt, move || {
        let mut out = String::new();
        for segment in &segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Expr(src) => out.push_str(&ctx.eval(src, &bindings).display()),
            }
        }
        node.set_text(out);
    }));
}

// =============================================================================
// Element directives
// =============================================================================

fn compile_directives(ctx: &Ctx, node: &Node, bindings: &Bindings, scope: &Scope) {
    for (name, src) in node.attrs() {
        if let Some(attr) = name.strip_prefix(':') {
            node.remove_attr(&name);
            bind_attr(ctx, node, attr, &src, bindings, scope);
        } else if let Some(event) = name.strip_prefix('@') {
            node.remove_attr(&name);
            bind_event(ctx, node, event, &src, bindings, scope);
        } else if name == "v-model" {
            node.remove_attr(&name);
            bind_model(ctx, node, &src, bindings, scope);
        }
    }
}

/// `:attr="expr"`. `Undefined`, `Null` and `false` remove the attribute,
/// `true` sets a bare marker, anything else renders as a string.
fn bind_attr(ctx: &Ctx, node: &Node, attr: &str, src: &str, bindings: &Bindings, scope: &Scope) {
    let rt = ctx.rt.clone();
    let ctx = ctx.clone();
    let node = node.clone();
    let attr = attr.to_string();
    let src = src.to_string();
    let bindings = bindings.clone();
    scope.add_effect(Effect::new(&rt, move || {
        match ctx.eval(&src, &bindings) {
            Value::Undefined | Value::Null | Value::Bool(false) => node.remove_attr(&attr),
            Value::Bool(true) => node.set_attr(&attr, ""),
            value => node.set_attr(&attr, value.display()),
        }
    }));
}

/// `@event="expr"`. The expression runs untracked with `$event` bound to
/// the payload; if it evaluates to a callable, the callable is invoked
/// with the payload as its argument.
fn bind_event(ctx: &Ctx, node: &Node, event: &str, src: &str, bindings: &Bindings, scope: &Scope) {
    let ctx = ctx.clone();
    let src = src.to_string();
    let bindings = bindings.clone();
    let handler: Rc<dyn Fn(&Event)> = Rc::new(move |event: &Event| {
        let handler_scope = bindings.child();
        handler_scope.define("$event", Binding::Value(event.payload.clone()));
        if let Value::Func(f) = ctx.eval(&src, &handler_scope) {
            f(&[event.payload.clone()]);
        }
    });
    let id = node.add_listener(event, handler);
    let node = node.clone();
    scope.add_listener(move || node.remove_listener(id));
}

/// `v-model="target"`: a render effect keeps the `value` attribute in
/// sync, and an `input` listener writes the payload back through the
/// target expression.
fn bind_model(ctx: &Ctx, node: &Node, src: &str, bindings: &Bindings, scope: &Scope) {
    bind_attr(ctx, node, "value", src, bindings, scope);

    let ctx = ctx.clone();
    let src = src.to_string();
    let bindings = bindings.clone();
    let handler: Rc<dyn Fn(&Event)> = Rc::new(move |event: &Event| {
        if !ctx.assign(&src, &bindings, event.payload.clone()) {
            tracing::warn!(target = %src, "v-model target is not assignable");
        }
    });
    let id = node.add_listener("input", handler);
    let node = node.clone();
    scope.add_listener(move || node.remove_listener(id));
}
