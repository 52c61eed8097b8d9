//! Loop conditions for conditional loops.

use super::config::ConditionType;
use eddy_core::error::{EddyError, Result};
use eddy_core::expr::{Dialect, Expression, QueryScope, ScriptScope};
use eddy_core::message::Message;
use eddy_core::traits::Context;
use eddy_core::value::Value;
use regex::Regex;
use serde_json::Value as JsonValue;

/// A compiled loop condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Script run with `msg`, context storage and `env` in scope.
    Script(Expression),
    /// Read-only expression over message fields.
    Query(Expression),
    /// Regular expression tested against the payload.
    Pattern(Regex),
}

impl Condition {
    /// Compile condition text for the given type.
    pub fn compile(condition_type: ConditionType, source: &str) -> Result<Self> {
        match condition_type {
            ConditionType::Script => Ok(Self::Script(Expression::compile(source, Dialect::Script)?)),
            ConditionType::Query => Ok(Self::Query(Expression::compile(source, Dialect::Query)?)),
            ConditionType::Pattern => Regex::new(source)
                .map(Self::Pattern)
                .map_err(|e| EddyError::InvalidConfig {
                    field: "condition".to_string(),
                    cause: format!("invalid pattern: {}", e),
                }),
        }
    }

    /// Evaluate against the current message.
    ///
    /// Scripts see `msg.loop.index` set to the index of the iteration about
    /// to run, and may modify the message.
    pub fn evaluate(&self, ctx: &Context, msg: &mut Message, index: i64) -> Result<bool> {
        match self {
            Self::Script(script) => {
                msg.set("loop.index", index + 1)?;
                let result = script.evaluate(&mut ScriptScope::new(msg, ctx))?;
                Ok(result.is_truthy())
            }
            Self::Query(query) => Ok(query.evaluate(&mut QueryScope::new(msg))?.is_truthy()),
            Self::Pattern(re) => Ok(pattern_subject(&msg.payload()).is_some_and(|s| re.is_match(&s))),
        }
    }

    /// The condition text.
    pub fn source(&self) -> &str {
        match self {
            Self::Script(e) | Self::Query(e) => e.source(),
            Self::Pattern(re) => re.as_str(),
        }
    }
}

/// Text a pattern is matched against, or `None` when there is no payload.
fn pattern_subject(payload: &Value) -> Option<String> {
    match &payload.0 {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::testing::TestContextBuilder;
    use serde_json::json;

    fn ctx() -> Context {
        TestContextBuilder::new().build().unwrap().context()
    }

    #[test]
    fn pattern_matches_payload_text() {
        let cond = Condition::compile(ConditionType::Pattern, r"^\d+$").unwrap();
        let ctx = ctx();

        assert!(cond.evaluate(&ctx, &mut Message::new("123"), -1).unwrap());
        assert!(cond.evaluate(&ctx, &mut Message::new(42_i64), -1).unwrap());
        assert!(!cond.evaluate(&ctx, &mut Message::new("12a"), -1).unwrap());
        assert!(!cond.evaluate(&ctx, &mut Message::new(json!(null)), -1).unwrap());

        let cond = Condition::compile(ConditionType::Pattern, "\"a\":1").unwrap();
        assert!(cond.evaluate(&ctx, &mut Message::new(json!({"a": 1})), 0).unwrap());
    }

    #[test]
    fn bad_pattern_is_a_config_error() {
        let err = Condition::compile(ConditionType::Pattern, "(unclosed").unwrap_err();
        assert!(err.is_config_error());
        assert_eq!(err.code(), "E802");
    }

    #[test]
    fn query_reads_message_fields() {
        let cond = Condition::compile(ConditionType::Query, "payload < 3").unwrap();
        let ctx = ctx();
        assert!(cond.evaluate(&ctx, &mut Message::new(2_i64), 0).unwrap());
        assert!(!cond.evaluate(&ctx, &mut Message::new(3_i64), 0).unwrap());
    }

    #[test]
    fn script_sees_next_index() {
        let cond = Condition::compile(ConditionType::Script, "msg.loop.index < 2").unwrap();
        let ctx = ctx();
        let mut msg = Message::new(0_i64);

        assert!(cond.evaluate(&ctx, &mut msg, -1).unwrap());
        assert_eq!(msg.get("loop.index"), Some(Value::int(0)));
        assert!(cond.evaluate(&ctx, &mut msg, 0).unwrap());
        assert!(!cond.evaluate(&ctx, &mut msg, 1).unwrap());
    }

    #[test]
    fn runtime_failure_surfaces() {
        let cond = Condition::compile(ConditionType::Query, "payload / 0 > 1").unwrap();
        let err = cond.evaluate(&ctx(), &mut Message::new(1_i64), 0);
        assert!(err.unwrap_err().is_evaluation_error());

        let cond = Condition::compile(ConditionType::Script, "msg.payload.a.b").unwrap();
        let err = cond.evaluate(&ctx(), &mut Message::new(1_i64), 0);
        assert!(err.unwrap_err().is_evaluation_error());
    }

    #[test]
    fn query_on_missing_path_is_false() {
        let cond = Condition::compile(ConditionType::Query, "payload.retry.count < 3").unwrap();
        let mut msg = Message::new(json!({"x": 1}));
        assert!(!cond.evaluate(&ctx(), &mut msg, -1).unwrap());
    }

    #[test]
    fn source_is_kept() {
        let cond = Condition::compile(ConditionType::Script, "true").unwrap();
        assert_eq!(cond.source(), "true");
    }
}
