//! A small expression language for loop conditions.
//!
//! Two dialects share one grammar:
//!
//! - [`Dialect::Query`] is a single read-only expression over message
//!   fields (`payload.items.length > 3`, `$.loop.index < 5`).
//! - [`Dialect::Script`] allows `let` bindings, assignments to `msg` and
//!   method calls on the `context`, `flow`, `global` and `env` objects.
//!   Statements are separated by `;` and the last one gives the value.
//!
//! Both dialects may call the pure functions `len`, `number`, `string`,
//! `exists`, `lower`, `upper`, `contains` and `keys` (optionally written
//! with a `$` prefix).
//!
//! ```
//! use eddy_core::expr::{Dialect, Expression, QueryScope};
//! use eddy_core::Message;
//!
//! let expr = Expression::compile("payload * 2 >= 10", Dialect::Query).unwrap();
//! let msg = Message::new(5_i64);
//! let result = expr.evaluate(&mut QueryScope::new(&msg)).unwrap();
//! assert!(result.is_truthy());
//! ```

mod eval;
mod lexer;
mod parser;
mod scope;

pub use scope::{QueryScope, Scope, ScriptScope, Segment};

use crate::error::{EddyError, Result};
use crate::value::Value;
use eval::{Evaluator, is_builtin};
use parser::{Expr, Stmt, parse_program};

/// Expression dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Single side-effect free expression over message fields.
    Query,
    /// Statements with access to message, context storage and environment.
    Script,
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    dialect: Dialect,
    program: Vec<Stmt>,
}

impl Expression {
    /// Parse and check an expression for a dialect.
    ///
    /// Syntax errors yield `ExpressionSyntax`; constructs the dialect does not
    /// allow yield `ExpressionForbidden`. Both are configuration errors.
    pub fn compile(source: &str, dialect: Dialect) -> Result<Self> {
        let program = parse_program(source)?;
        let forbidden = |cause: &str| EddyError::ExpressionForbidden {
            expression: source.to_string(),
            cause: cause.to_string(),
        };

        if dialect == Dialect::Query {
            if program.len() != 1 {
                return Err(forbidden("a query is a single expression"));
            }
            match &program[0] {
                Stmt::Expr(expr) => check_calls(expr, dialect).map_err(|c| forbidden(&c))?,
                Stmt::Let(..) => return Err(forbidden("bindings are not allowed in a query")),
                Stmt::Assign(..) => {
                    return Err(forbidden("assignments are not allowed in a query"));
                }
            }
        } else {
            for stmt in &program {
                match stmt {
                    Stmt::Expr(expr) | Stmt::Let(_, expr) => check_calls(expr, dialect),
                    Stmt::Assign(target, value) => {
                        check_calls(target, dialect).and_then(|()| check_calls(value, dialect))
                    }
                }
                .map_err(|c| forbidden(&c))?;
            }
        }

        Ok(Self {
            source: source.to_string(),
            dialect,
            program,
        })
    }

    /// Evaluate against a scope.
    ///
    /// Failures are `ExpressionRuntime` errors. Queries read missing paths
    /// as null; scripts fail on them.
    pub fn evaluate(&self, scope: &mut dyn Scope) -> Result<Value> {
        Evaluator::new(scope)
            .null_safe(self.dialect == Dialect::Query)
            .run(&self.program)
    }

    /// The source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The dialect this expression was compiled for.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Walk an expression and reject calls the dialect cannot make.
fn check_calls(expr: &Expr, dialect: Dialect) -> std::result::Result<(), String> {
    match expr {
        Expr::Literal(_) | Expr::Ident(_) => Ok(()),
        Expr::Array(items) => items.iter().try_for_each(|e| check_calls(e, dialect)),
        Expr::Member(base, _) => check_calls(base, dialect),
        Expr::Index(base, index) => {
            check_calls(base, dialect)?;
            check_calls(index, dialect)
        }
        Expr::Unary(_, operand) => check_calls(operand, dialect),
        Expr::Binary(_, lhs, rhs) => {
            check_calls(lhs, dialect)?;
            check_calls(rhs, dialect)
        }
        Expr::Conditional(cond, then, otherwise) => {
            check_calls(cond, dialect)?;
            check_calls(then, dialect)?;
            check_calls(otherwise, dialect)
        }
        Expr::Call(callee, args) => {
            args.iter().try_for_each(|e| check_calls(e, dialect))?;
            match callee.as_ref() {
                Expr::Ident(name) if is_builtin(name) => Ok(()),
                Expr::Ident(name) => Err(format!("unknown function '{}'", name)),
                Expr::Member(object, method) if dialect == Dialect::Script => {
                    match object.as_ref() {
                        Expr::Ident(_) => Ok(()),
                        _ => Err(format!("'{}' must be called on a named object", method)),
                    }
                }
                Expr::Member(_, method) => {
                    Err(format!("method call '{}' is not allowed in a query", method))
                }
                _ => Err("expression is not callable".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::testing::TestContextBuilder;
    use serde_json::json;

    fn query(src: &str, msg: &Message) -> Result<Value> {
        Expression::compile(src, Dialect::Query)?.evaluate(&mut QueryScope::new(msg))
    }

    #[test]
    fn query_arithmetic_and_comparison() {
        let msg = Message::new(json!({"items": [1, 2, 3], "name": "eddy"}));
        assert_eq!(query("payload.items.length", &msg).unwrap(), Value::int(3));
        assert_eq!(query("payload.items[1] * 10", &msg).unwrap(), Value::int(20));
        assert_eq!(query("$.payload.name == 'eddy'", &msg).unwrap(), Value::bool(true));
        assert_eq!(query("7 % 4 + 0.5", &msg).unwrap(), Value::number(3.5));
        assert_eq!(query("'a' + 1", &msg).unwrap(), Value::string("a1"));
        assert_eq!(query("1 < 2 ? 'yes' : 'no'", &msg).unwrap(), Value::string("yes"));
    }

    #[test]
    fn query_logic_short_circuits() {
        let msg = Message::new(0_i64);
        // The right side would fail on null, so it must not run
        assert_eq!(query("missing && missing.x", &msg).unwrap(), Value::null());
        assert_eq!(query("payload || 'fallback'", &msg).unwrap(), Value::string("fallback"));
        assert_eq!(query("not payload", &msg).unwrap(), Value::bool(true));
    }

    #[test]
    fn query_builtins() {
        let msg = Message::new(json!({"tags": ["a", "b"]}));
        assert_eq!(query("$count(payload.tags)", &msg).unwrap(), Value::int(2));
        assert_eq!(query("contains(payload.tags, 'b')", &msg).unwrap(), Value::bool(true));
        assert_eq!(query("number('4') + 1", &msg).unwrap(), Value::int(5));
        assert_eq!(query("exists(topic)", &msg).unwrap(), Value::bool(false));
        assert_eq!(query("upper('x')", &msg).unwrap(), Value::string("X"));
    }

    #[test]
    fn query_rejects_effects_at_compile_time() {
        for src in [
            "payload = 1",
            "let a = 1",
            "1; 2",
            "flow.get('x')",
            "eval('1')",
        ] {
            let err = Expression::compile(src, Dialect::Query).unwrap_err();
            assert_eq!(err.code(), "E104", "{src}");
            assert!(err.is_config_error());
        }
    }

    #[test]
    fn syntax_errors_are_config_errors() {
        let err = Expression::compile("payload >", Dialect::Query).unwrap_err();
        assert_eq!(err.code(), "E103");
        assert!(err.is_config_error());
    }

    #[test]
    fn runtime_errors() {
        let msg = Message::new(json!({"n": 1}));
        for src in ["payload.n / 0", "payload < 'x'", "payload.n - 'a'"] {
            let err = query(src, &msg).unwrap_err();
            assert!(err.is_evaluation_error(), "{src}: {err}");
        }
    }

    #[test]
    fn missing_paths_depend_on_dialect() {
        let msg = Message::new(json!({"n": 1}));
        assert_eq!(query("missing.field", &msg).unwrap(), Value::null());
        assert_eq!(query("payload.retry.count < 3", &msg).unwrap(), Value::bool(false));

        let test = TestContextBuilder::new().build().unwrap();
        let ctx = test.context();
        let mut msg = msg;
        let script = Expression::compile("msg.payload.retry.count < 3", Dialect::Script).unwrap();
        let err = script.evaluate(&mut ScriptScope::new(&mut msg, &ctx)).unwrap_err();
        assert!(err.is_evaluation_error());
    }

    #[test]
    fn script_mutates_message_and_context() {
        let test = TestContextBuilder::new()
            .with_env_vars(&[("STEP", "3")])
            .build()
            .unwrap();
        let ctx = test.context();
        let mut msg = Message::new(4_i64);

        let script = Expression::compile(
            "let step = number(env.get('STEP'));\n\
             msg.payload = msg.payload + step;\n\
             flow.set('last', msg.payload);\n\
             msg.payload > 5",
            Dialect::Script,
        )
        .unwrap();

        let result = script.evaluate(&mut ScriptScope::new(&mut msg, &ctx)).unwrap();
        assert_eq!(result, Value::bool(true));
        assert_eq!(msg.payload(), Value::int(7));
        assert_eq!(test.flow_value("last"), Some(Value::int(7)));
    }

    #[test]
    fn script_locals_shadow_nothing_outside() {
        let ctx = TestContextBuilder::new().build().unwrap().context();
        let mut msg = Message::new(1_i64);
        let script =
            Expression::compile("let acc = [0]; acc[0] = 5; acc[0] + msg.payload", Dialect::Script)
                .unwrap();
        let result = script.evaluate(&mut ScriptScope::new(&mut msg, &ctx)).unwrap();
        assert_eq!(result, Value::int(6));
    }

    #[test]
    fn script_unknown_names_fail_at_runtime() {
        let ctx = TestContextBuilder::new().build().unwrap().context();
        let mut msg = Message::new(1_i64);
        let script = Expression::compile("process.exit(1)", Dialect::Script).unwrap();
        let err = script
            .evaluate(&mut ScriptScope::new(&mut msg, &ctx))
            .unwrap_err();
        assert!(err.is_evaluation_error());

        let script = Expression::compile("undefinedThing > 1", Dialect::Script).unwrap();
        assert!(script.evaluate(&mut ScriptScope::new(&mut msg, &ctx)).is_err());
    }

    #[test]
    fn accessors() {
        let expr = Expression::compile("1", Dialect::Script).unwrap();
        assert_eq!(expr.source(), "1");
        assert_eq!(expr.dialect(), Dialect::Script);
    }
}
