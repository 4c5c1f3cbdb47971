//! Tree-walking interpreter over template bindings.
//!
//! Evaluation never fails outward: missing identifiers and keys yield
//! `Undefined`, invalid operations yield `Undefined` or `NaN`, and bad
//! assignment targets are logged and ignored. Templates stay resilient to
//! transient gaps by design.

use std::rc::Rc;

use crate::reactive::{Key, Runtime};
use crate::value::Value;

use super::Bindings;
use super::parser::{BinOp, Expr, UnaryOp};

/// Evaluate a parsed expression against a binding scope.
pub fn eval_expr(rt: &Runtime, expr: &Expr, scope: &Bindings) -> Value {
    match expr {
        Expr::Num(n) => Value::Num(*n),
        Expr::Str(s) => Value::Str(s.clone()),
        Expr::Bool(b) => Value::Bool(*b),
        Expr::Null => Value::Null,
        Expr::Undefined => Value::Undefined,
        Expr::Ident(name) => scope.lookup(name),
        Expr::Member(object, name) => member(&eval_expr(rt, object, scope), name),
        Expr::Index(object, index) => {
            let object = eval_expr(rt, object, scope);
            let index = eval_expr(rt, index, scope);
            indexed(&object, &index)
        }
        Expr::Call(callee, args) => call(rt, callee, args, scope),
        Expr::Unary(op, operand) => {
            let operand = eval_expr(rt, operand, scope);
            match op {
                UnaryOp::Not => Value::Bool(!operand.truthy()),
                UnaryOp::Neg => Value::Num(-operand.as_num()),
            }
        }
        Expr::Binary(op, lhs, rhs) => binary(rt, *op, lhs, rhs, scope),
        Expr::Ternary(cond, then, alt) => {
            if eval_expr(rt, cond, scope).truthy() {
                eval_expr(rt, then, scope)
            } else {
                eval_expr(rt, alt, scope)
            }
        }
        Expr::Assign(target, rhs) => {
            let value = eval_expr(rt, rhs, scope);
            assign_expr(rt, target, value.clone(), scope);
            value
        }
    }
}

/// Write a value through an assignment target expression. Returns false
/// (after logging) when the target cannot accept the write.
pub fn assign_expr(rt: &Runtime, target: &Expr, value: Value, scope: &Bindings) -> bool {
    match target {
        Expr::Ident(name) => {
            let ok = scope.assign(name, value);
            if !ok {
                tracing::warn!(name = &**name, "assignment target rejected the value");
            }
            ok
        }
        Expr::Member(object, name) => {
            let object = eval_expr(rt, object, scope);
            match object {
                Value::Reactive(r) => {
                    r.set(Key::Name(name.clone()), value);
                    true
                }
                _ => {
                    tracing::warn!(name = &**name, "member assignment on a non-container");
                    false
                }
            }
        }
        Expr::Index(object, index) => {
            let object = eval_expr(rt, object, scope);
            let index = eval_expr(rt, index, scope);
            match (&object, value_key(&index)) {
                (Value::Reactive(r), Some(key)) => {
                    r.set(key, value);
                    true
                }
                _ => {
                    tracing::warn!("index assignment on a non-container");
                    false
                }
            }
        }
        _ => false,
    }
}

fn member(object: &Value, name: &Rc<str>) -> Value {
    match object {
        Value::Reactive(r) => r.get(&Key::Name(name.clone())),
        Value::Str(s) if &**name == "length" => Value::Num(s.chars().count() as f64),
        // Raw containers in bindings are read untracked; reactive state
        // reaches expressions already wrapped.
        Value::Map(m) => m.borrow().get(&**name).cloned().unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn indexed(object: &Value, index: &Value) -> Value {
    match (object, value_key(index)) {
        (Value::Reactive(r), Some(key)) => r.get(&key),
        (Value::List(l), Some(Key::Index(i))) => {
            l.borrow().get(i).cloned().unwrap_or(Value::Undefined)
        }
        (Value::Map(m), Some(Key::Name(name))) => m
            .borrow()
            .get(&*name)
            .cloned()
            .unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

/// Convert an evaluated index value to a container key.
fn value_key(index: &Value) -> Option<Key> {
    match index {
        Value::Num(n) if *n >= 0.0 && n.fract() == 0.0 => Some(Key::Index(*n as usize)),
        Value::Num(_) => None,
        Value::Str(s) => Some(Key::Name(s.clone())),
        _ => None,
    }
}

fn call(rt: &Runtime, callee: &Expr, args: &[Expr], scope: &Bindings) -> Value {
    let args: Vec<Value> = args.iter().map(|a| eval_expr(rt, a, scope)).collect();

    // Method-style calls on reactive lists dispatch to the container's
    // read capability set.
    if let Expr::Member(object, name) = callee {
        let object = eval_expr(rt, object, scope);
        if let Value::Reactive(r) = &object {
            if r.is_list() {
                match &**name {
                    "includes" => {
                        let needle = args.first().cloned().unwrap_or(Value::Undefined);
                        return Value::Bool(r.includes(&needle));
                    }
                    "indexOf" => {
                        let needle = args.first().cloned().unwrap_or(Value::Undefined);
                        return r.index_of(&needle);
                    }
                    "slice" => {
                        let start = args.first().map(|v| v.as_num().max(0.0) as usize);
                        let end = args.get(1).map(|v| v.as_num().max(0.0) as usize);
                        return r.slice(start.unwrap_or(0), end);
                    }
                    "concat" => {
                        let other = args.first().cloned().unwrap_or(Value::list(vec![]));
                        return r.concat(&other);
                    }
                    "join" => {
                        let sep = args
                            .first()
                            .map(Value::display)
                            .unwrap_or_else(|| ",".to_string());
                        return r.join(&sep);
                    }
                    _ => {}
                }
            }
        }
        return invoke(&member(&object, name), &args);
    }

    invoke(&eval_expr(rt, callee, scope), &args)
}

fn invoke(callee: &Value, args: &[Value]) -> Value {
    match callee {
        Value::Func(f) => f(args),
        _ => {
            tracing::trace!("call on a non-callable value");
            Value::Undefined
        }
    }
}

fn binary(rt: &Runtime, op: BinOp, lhs: &Expr, rhs: &Expr, scope: &Bindings) -> Value {
    // Logical operators short-circuit and yield the deciding operand.
    match op {
        BinOp::And => {
            let left = eval_expr(rt, lhs, scope);
            return if left.truthy() {
                eval_expr(rt, rhs, scope)
            } else {
                left
            };
        }
        BinOp::Or => {
            let left = eval_expr(rt, lhs, scope);
            return if left.truthy() {
                left
            } else {
                eval_expr(rt, rhs, scope)
            };
        }
        _ => {}
    }

    let left = eval_expr(rt, lhs, scope);
    let right = eval_expr(rt, rhs, scope);
    match op {
        BinOp::Add => {
            if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
                Value::str(format!("{}{}", left.display(), right.display()))
            } else {
                Value::Num(left.as_num() + right.as_num())
            }
        }
        BinOp::Sub => Value::Num(left.as_num() - right.as_num()),
        BinOp::Mul => Value::Num(left.as_num() * right.as_num()),
        BinOp::Div => Value::Num(left.as_num() / right.as_num()),
        BinOp::Rem => Value::Num(left.as_num() % right.as_num()),
        BinOp::Lt => compare(&left, &right, |o| o.is_lt()),
        BinOp::Le => compare(&left, &right, |o| o.is_le()),
        BinOp::Gt => compare(&left, &right, |o| o.is_gt()),
        BinOp::Ge => compare(&left, &right, |o| o.is_ge()),
        BinOp::Eq => Value::Bool(loose_eq(&left, &right)),
        BinOp::Ne => Value::Bool(!loose_eq(&left, &right)),
        BinOp::And | BinOp::Or => unreachable!(),
    }
}

fn compare(left: &Value, right: &Value, test: impl Fn(std::cmp::Ordering) -> bool) -> Value {
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Value::Bool(test(a.cmp(b)));
    }
    match left.as_num().partial_cmp(&right.as_num()) {
        Some(ordering) => Value::Bool(test(ordering)),
        None => Value::Bool(false),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    use Value::*;
    match (left, right) {
        (Undefined | Null, Undefined | Null) => true,
        (Str(a), Str(b)) => a == b,
        (Num(_), _) | (_, Num(_)) | (Bool(_), _) | (_, Bool(_)) => {
            let (a, b) = (left.as_num(), right.as_num());
            a == b
        }
        _ => left.same(right),
    }
}
