//! Tree-walking evaluator.

use super::parser::{BinaryOp, Expr, Stmt, UnaryOp};
use super::scope::{Scope, Segment};
use crate::error::{EddyError, Result};
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Evaluates a program against a scope, holding `let` bindings.
pub(crate) struct Evaluator<'s> {
    scope: &'s mut dyn Scope,
    locals: HashMap<String, Value>,
    /// Navigation through null yields null, and ordering against null is false.
    null_safe: bool,
}

impl<'s> Evaluator<'s> {
    pub(crate) fn new(scope: &'s mut dyn Scope) -> Self {
        Self {
            scope,
            locals: HashMap::new(),
            null_safe: false,
        }
    }

    /// Treat missing paths as null instead of failing.
    pub(crate) fn null_safe(mut self, enabled: bool) -> Self {
        self.null_safe = enabled;
        self
    }

    /// Run every statement; the program's value is the last statement's.
    pub(crate) fn run(&mut self, program: &[Stmt]) -> Result<Value> {
        let mut last = Value::null();
        for stmt in program {
            last = self.statement(stmt)?;
        }
        Ok(last)
    }

    fn statement(&mut self, stmt: &Stmt) -> Result<Value> {
        match stmt {
            Stmt::Let(name, expr) => {
                let value = self.eval(expr)?;
                self.locals.insert(name.clone(), value.clone());
                Ok(value)
            }
            Stmt::Assign(target, expr) => {
                let value = self.eval(expr)?;
                self.assign(target, value.clone())?;
                Ok(value)
            }
            Stmt::Expr(expr) => self.eval(expr),
        }
    }

    fn assign(&mut self, target: &Expr, value: Value) -> Result<()> {
        let mut segments = Vec::new();
        let root = self.place(target, &mut segments)?;

        if let Some(local) = self.locals.get_mut(&root) {
            if segments.is_empty() {
                *local = value;
                return Ok(());
            }
            return set_at(local, &segments, value);
        }
        self.scope.assign(&root, &segments, value)
    }

    /// Resolve a place expression into its root name and path segments.
    fn place(&mut self, expr: &Expr, segments: &mut Vec<Segment>) -> Result<String> {
        match expr {
            Expr::Ident(name) => Ok(name.clone()),
            Expr::Member(base, field) => {
                let root = self.place(base, segments)?;
                segments.push(Segment::Field(field.clone()));
                Ok(root)
            }
            Expr::Index(base, index) => {
                let root = self.place(base, segments)?;
                let key = self.eval(index)?;
                segments.push(match &key.0 {
                    JsonValue::String(s) => Segment::Field(s.clone()),
                    _ => Segment::Index(as_index(&key)?),
                });
                Ok(root)
            }
            _ => Err(EddyError::runtime("invalid assignment target")),
        }
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(v) => Ok(Value(v.clone())),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|e| self.eval(e).map(Value::into_inner))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value(JsonValue::Array(values)))
            }
            Expr::Ident(name) => match self.locals.get(name) {
                Some(v) => Ok(v.clone()),
                None => self.scope.lookup(name),
            },
            Expr::Member(base, field) => {
                let base = self.eval(base)?;
                if self.null_safe && base.is_null() {
                    return Ok(Value::null());
                }
                member(&base, field)
            }
            Expr::Index(base, index) => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                if self.null_safe && base.is_null() {
                    return Ok(Value::null());
                }
                index_into(&base, &index)
            }
            Expr::Call(callee, args) => self.call(callee, args),
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::bool(!v.is_truthy())),
                    UnaryOp::Neg => Ok(Value::number(-number(&v, "-")?)),
                }
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let l = self.eval(lhs)?;
                if l.is_truthy() { self.eval(rhs) } else { Ok(l) }
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let l = self.eval(lhs)?;
                if l.is_truthy() { Ok(l) } else { self.eval(rhs) }
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval(lhs)?;
                let r = self.eval(rhs)?;
                let ordering =
                    matches!(op, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge);
                if self.null_safe && ordering && (l.is_null() || r.is_null()) {
                    return Ok(Value::bool(false));
                }
                binary(*op, &l, &r)
            }
            Expr::Conditional(cond, then, otherwise) => {
                if self.eval(cond)?.is_truthy() {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value> {
        let args = args
            .iter()
            .map(|a| self.eval(a))
            .collect::<Result<Vec<_>>>()?;

        match callee {
            Expr::Ident(name) => builtin(name, &args),
            Expr::Member(object, method) => match object.as_ref() {
                Expr::Ident(object) if !self.locals.contains_key(object) => {
                    self.scope.call(object, method, args)
                }
                _ => Err(EddyError::runtime(format!("{} is not a function", method))),
            },
            _ => Err(EddyError::runtime("expression is not callable")),
        }
    }
}

/// Write `value` at `segments` inside `target`.
pub(crate) fn set_at(target: &mut Value, segments: &[Segment], value: Value) -> Result<()> {
    let Some((last, parents)) = segments.split_last() else {
        *target = value;
        return Ok(());
    };

    let mut current = &mut target.0;
    for segment in parents {
        current = match segment {
            Segment::Field(name) => {
                if !current.is_object() {
                    *current = JsonValue::Object(serde_json::Map::new());
                }
                match current {
                    JsonValue::Object(map) => map.entry(name.clone()).or_insert(JsonValue::Null),
                    _ => return Err(EddyError::runtime("expected object")),
                }
            }
            Segment::Index(idx) => match current {
                JsonValue::Array(arr) if *idx < arr.len() => &mut arr[*idx],
                _ => {
                    return Err(EddyError::runtime(format!(
                        "cannot set index [{}] on a non-array or past its end",
                        idx
                    )));
                }
            },
        };
    }

    match last {
        Segment::Field(name) => {
            if !current.is_object() {
                *current = JsonValue::Object(serde_json::Map::new());
            }
            if let JsonValue::Object(map) = current {
                map.insert(name.clone(), value.0);
            }
            Ok(())
        }
        Segment::Index(idx) => match current {
            JsonValue::Array(arr) if *idx < arr.len() => {
                arr[*idx] = value.0;
                Ok(())
            }
            JsonValue::Array(arr) if *idx == arr.len() => {
                arr.push(value.0);
                Ok(())
            }
            _ => Err(EddyError::runtime(format!(
                "cannot set index [{}] on a non-array or past its end",
                idx
            ))),
        },
    }
}

fn member(base: &Value, field: &str) -> Result<Value> {
    match &base.0 {
        JsonValue::Null => Err(EddyError::runtime(format!(
            "cannot read property '{}' of null",
            field
        ))),
        JsonValue::Object(map) => Ok(map.get(field).cloned().map(Value).unwrap_or_default()),
        JsonValue::Array(arr) if field == "length" => Ok(Value::int(arr.len() as i64)),
        JsonValue::String(s) if field == "length" => Ok(Value::int(s.chars().count() as i64)),
        _ => Ok(Value::null()),
    }
}

fn index_into(base: &Value, index: &Value) -> Result<Value> {
    match (&base.0, &index.0) {
        (JsonValue::Null, _) => Err(EddyError::runtime(format!(
            "cannot read index {} of null",
            index.0
        ))),
        (_, JsonValue::String(key)) => member(base, key),
        (JsonValue::Array(arr), _) => {
            Ok(arr.get(as_index(index)?).cloned().map(Value).unwrap_or_default())
        }
        (JsonValue::String(s), _) => Ok(s
            .chars()
            .nth(as_index(index)?)
            .map(|c| Value::string(c.to_string()))
            .unwrap_or_default()),
        _ => Ok(Value::null()),
    }
}

fn as_index(v: &Value) -> Result<usize> {
    match v.0.as_f64() {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(n as usize),
        _ => Err(EddyError::runtime(format!("invalid index {}", v.0))),
    }
}

fn number(v: &Value, op: &str) -> Result<f64> {
    v.0.as_f64().ok_or_else(|| {
        EddyError::runtime(format!(
            "operator '{}' expects a number, got {}",
            op,
            v.type_name()
        ))
    })
}

/// Text form used for string concatenation and `string()`.
pub(crate) fn display(v: &Value) -> String {
    match &v.0 {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Equality with numbers compared by value.
pub(crate) fn loose_eq(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        (JsonValue::Array(x), JsonValue::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (JsonValue::Object(x), JsonValue::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| loose_eq(v, other)))
        }
        _ => a == b,
    }
}

fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    let ordering = match (&l.0, &r.0) {
        (JsonValue::Number(a), JsonValue::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .and_then(|(a, b)| a.partial_cmp(&b)),
        (JsonValue::String(a), JsonValue::String(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EddyError::runtime(format!(
                "cannot compare {} with {}",
                l.type_name(),
                r.type_name()
            )));
        }
    };

    let Some(ordering) = ordering else {
        return Ok(Value::bool(false));
    };
    Ok(Value::bool(match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => false,
    }))
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Result<Value> {
    match op {
        BinaryOp::Add => match (&l.0, &r.0) {
            (JsonValue::Number(_), JsonValue::Number(_)) => {
                Ok(Value::number(number(l, "+")? + number(r, "+")?))
            }
            (JsonValue::String(_), _) | (_, JsonValue::String(_)) => {
                Ok(Value::string(format!("{}{}", display(l), display(r))))
            }
            _ => Err(EddyError::runtime(format!(
                "cannot add {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        },
        BinaryOp::Sub => Ok(Value::number(number(l, "-")? - number(r, "-")?)),
        BinaryOp::Mul => Ok(Value::number(number(l, "*")? * number(r, "*")?)),
        BinaryOp::Div | BinaryOp::Rem => {
            let symbol = if op == BinaryOp::Div { "/" } else { "%" };
            let a = number(l, symbol)?;
            let b = number(r, symbol)?;
            if b == 0.0 {
                return Err(EddyError::runtime("division by zero"));
            }
            Ok(Value::number(if op == BinaryOp::Div { a / b } else { a % b }))
        }
        BinaryOp::Eq => Ok(Value::bool(loose_eq(&l.0, &r.0))),
        BinaryOp::Ne => Ok(Value::bool(!loose_eq(&l.0, &r.0))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, l, r),
        // Short-circuit operators are handled by the evaluator
        BinaryOp::And | BinaryOp::Or => Err(EddyError::runtime("unexpected logical operator")),
    }
}

/// Names of the pure functions available in every dialect.
pub(crate) const BUILTINS: &[&str] = &[
    "len", "number", "string", "exists", "lower", "upper", "contains", "keys",
];

fn builtin(name: &str, args: &[Value]) -> Result<Value> {
    let name = name.strip_prefix('$').unwrap_or(name);
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    let arity = |n: usize| {
        if args.len() == n {
            Ok(())
        } else {
            Err(EddyError::runtime(format!(
                "{}() takes {} argument(s), got {}",
                name,
                n,
                args.len()
            )))
        }
    };

    match name {
        "len" | "count" | "length" => {
            arity(1)?;
            match &arg(0).0 {
                JsonValue::String(s) => Ok(Value::int(s.chars().count() as i64)),
                JsonValue::Array(a) => Ok(Value::int(a.len() as i64)),
                JsonValue::Object(o) => Ok(Value::int(o.len() as i64)),
                JsonValue::Null => Ok(Value::int(0)),
                _ => Ok(Value::int(1)),
            }
        }
        "number" => {
            arity(1)?;
            let v = arg(0);
            match &v.0 {
                JsonValue::Bool(b) => Ok(Value::int(i64::from(*b))),
                _ => v.as_f64().map(Value::number).ok_or_else(|| {
                    EddyError::runtime(format!("cannot convert {} to a number", v.0))
                }),
            }
        }
        "string" => {
            arity(1)?;
            Ok(Value::string(display(&arg(0))))
        }
        "exists" => {
            arity(1)?;
            Ok(Value::bool(!arg(0).is_null()))
        }
        "lower" | "lowercase" => {
            arity(1)?;
            Ok(Value::string(display(&arg(0)).to_lowercase()))
        }
        "upper" | "uppercase" => {
            arity(1)?;
            Ok(Value::string(display(&arg(0)).to_uppercase()))
        }
        "contains" => {
            arity(2)?;
            let needle = arg(1);
            match &arg(0).0 {
                JsonValue::String(s) => Ok(Value::bool(s.contains(&display(&needle)))),
                JsonValue::Array(a) => Ok(Value::bool(a.iter().any(|v| loose_eq(v, &needle.0)))),
                other => Err(EddyError::runtime(format!(
                    "contains() expects a string or array, got {}",
                    Value(other.clone()).type_name()
                ))),
            }
        }
        "keys" => {
            arity(1)?;
            match &arg(0).0 {
                JsonValue::Object(o) => Ok(Value(JsonValue::Array(
                    o.keys().cloned().map(JsonValue::String).collect(),
                ))),
                _ => Ok(Value(JsonValue::Array(Vec::new()))),
            }
        }
        _ => Err(EddyError::runtime(format!("{} is not defined", name))),
    }
}

/// Check whether a free function name refers to a builtin.
pub(crate) fn is_builtin(name: &str) -> bool {
    let name = name.strip_prefix('$').unwrap_or(name);
    BUILTINS.contains(&name)
        || matches!(name, "count" | "length" | "lowercase" | "uppercase")
}
