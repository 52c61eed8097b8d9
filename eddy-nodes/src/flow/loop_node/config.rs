//! Static loop configuration.

use eddy_core::error::{EddyError, Result};
use eddy_core::message::Message;
use serde::{Deserialize, Serialize};

/// Which kind of loop the node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopKind {
    /// Fixed number of iterations with an accumulating value.
    Counted,
    /// Iterate while a condition holds.
    Conditional,
    /// One iteration per element of a collection.
    Enumerated,
}

/// How a conditional loop evaluates its condition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Script with access to `msg`, context storage and the environment.
    Script,
    /// Read-only expression over message fields.
    #[default]
    Query,
    /// Regular expression tested against the payload.
    Pattern,
}

/// When the condition is first checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionWhen {
    /// Check before every iteration, including the first.
    #[default]
    Before,
    /// Always run the first iteration, then check.
    After,
}

/// Where an enumerated loop takes its collection from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationType {
    /// A message property path.
    #[default]
    Msg,
    /// A flow context key.
    Flow,
    /// A global context key.
    Global,
    /// A JSON literal.
    Json,
    /// A string literal, enumerated by character.
    Str,
    /// An environment variable, enumerated by character.
    Env,
    /// A query expression evaluated against the message.
    Query,
}

/// Payload sent on each continue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPayload {
    /// `loop.index`.
    Index,
    /// `loop.value`.
    Value,
    /// `loop.key`.
    Key,
    /// The payload the loop started with.
    Original,
    /// Leave the payload alone.
    #[default]
    Unchanged,
}

/// Payload sent on done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalPayload {
    /// The payload the loop started with.
    Original,
    /// Leave the payload alone.
    #[default]
    Unchanged,
}

/// A numeric setting written as a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberSetting {
    /// Plain number.
    Number(f64),
    /// Numeric text, e.g. `"10"`.
    Text(String),
}

impl NumberSetting {
    /// Whether the setting is effectively unset (empty text).
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    /// Parse the setting.
    pub fn parse(&self, field: &str) -> Result<f64> {
        let n = match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
        };
        n.filter(|n| n.is_finite())
            .ok_or_else(|| EddyError::InvalidConfig {
                field: field.to_string(),
                cause: format!("'{}' is not a valid number", self),
            })
    }
}

impl std::fmt::Display for NumberSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for NumberSetting {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Resolve a numeric field: the static setting when present, otherwise the
/// same-named message property.
///
/// Returns `Ok(None)` when neither supplies a value. A value that is present
/// but not numeric is an error.
pub(crate) fn resolve_number(
    setting: Option<&NumberSetting>,
    msg: &Message,
    field: &str,
) -> Result<Option<f64>> {
    if let Some(setting) = setting.filter(|s| !s.is_blank()) {
        return setting.parse(field).map(Some);
    }

    let Some(value) = msg.get(field).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    value
        .as_f64()
        .filter(|n| n.is_finite())
        .map(Some)
        .ok_or_else(|| EddyError::InvalidConfig {
            field: format!("msg.{}", field),
            cause: format!("{} is not a valid number", value.inner()),
        })
}

/// Loop node configuration.
///
/// # Example
///
/// ```yaml
/// kind: counted
/// count: 3
/// initial: 10
/// step: 5
/// loop_payload: value
/// final_payload: original
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Loop kind.
    pub kind: LoopKind,

    /// Counted: number of iterations (else `msg.count`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<NumberSetting>,
    /// Counted: first value (else `msg.initial`, else 0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<NumberSetting>,
    /// Counted: value increment (else `msg.step`, else 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<NumberSetting>,

    /// Conditional: condition source text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Conditional: how the condition is evaluated.
    #[serde(default)]
    pub condition_type: ConditionType,
    /// Conditional: check before or after the first iteration.
    #[serde(default)]
    pub when: ConditionWhen,

    /// Enumerated: the collection reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumeration: Option<String>,
    /// Enumerated: how `enumeration` is interpreted.
    #[serde(default)]
    pub enumeration_type: EnumerationType,

    /// Elapsed-time budget per run in milliseconds (else `msg.limit`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<NumberSetting>,
    /// Payload policy on continue.
    #[serde(default)]
    pub loop_payload: LoopPayload,
    /// Payload policy on done.
    #[serde(default)]
    pub final_payload: FinalPayload,
    /// Sessions older than this are dropped by expiry sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ttl_ms: Option<u64>,
}

impl LoopConfig {
    fn with_kind(kind: LoopKind) -> Self {
        Self {
            kind,
            count: None,
            initial: None,
            step: None,
            condition: None,
            condition_type: ConditionType::default(),
            when: ConditionWhen::default(),
            enumeration: None,
            enumeration_type: EnumerationType::default(),
            limit: None,
            loop_payload: LoopPayload::default(),
            final_payload: FinalPayload::default(),
            session_ttl_ms: None,
        }
    }

    /// A counted loop.
    pub fn counted(count: f64, initial: f64, step: f64) -> Self {
        Self {
            count: Some(count.into()),
            initial: Some(initial.into()),
            step: Some(step.into()),
            ..Self::with_kind(LoopKind::Counted)
        }
    }

    /// A counted loop that reads `count`, `initial` and `step` from each
    /// starting message.
    pub fn counted_from_message() -> Self {
        Self::with_kind(LoopKind::Counted)
    }

    /// A conditional loop.
    pub fn conditional(condition_type: ConditionType, condition: impl Into<String>) -> Self {
        Self {
            condition: Some(condition.into()),
            condition_type,
            ..Self::with_kind(LoopKind::Conditional)
        }
    }

    /// An enumerated loop.
    pub fn enumerated(enumeration_type: EnumerationType, enumeration: impl Into<String>) -> Self {
        Self {
            enumeration: Some(enumeration.into()),
            enumeration_type,
            ..Self::with_kind(LoopKind::Enumerated)
        }
    }

    /// Check the condition after the first iteration.
    pub fn evaluate_after(mut self) -> Self {
        self.when = ConditionWhen::After;
        self
    }

    /// Set the time limit in milliseconds.
    pub fn with_limit(mut self, millis: f64) -> Self {
        self.limit = Some(millis.into());
        self
    }

    /// Set the payload policy on continue.
    pub fn with_loop_payload(mut self, policy: LoopPayload) -> Self {
        self.loop_payload = policy;
        self
    }

    /// Set the payload policy on done.
    pub fn with_final_payload(mut self, policy: FinalPayload) -> Self {
        self.final_payload = policy;
        self
    }

    /// Set the session TTL used by expiry sweeps.
    pub fn with_session_ttl(mut self, millis: u64) -> Self {
        self.session_ttl_ms = Some(millis);
        self
    }

    /// Parse and validate YAML configuration.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self> {
        let config: Self = serde_yaml::from_value(value.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that can never work.
    ///
    /// Numeric settings left unset are accepted, since each starting message
    /// may supply them.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, cause: &str| EddyError::InvalidConfig {
            field: field.to_string(),
            cause: cause.to_string(),
        };

        for (field, setting) in [
            ("count", &self.count),
            ("initial", &self.initial),
            ("step", &self.step),
            ("limit", &self.limit),
        ] {
            if let Some(setting) = setting.as_ref().filter(|s| !s.is_blank()) {
                setting.parse(field)?;
            }
        }

        match self.kind {
            LoopKind::Counted => {}
            LoopKind::Conditional => {
                if self.condition.as_deref().is_none_or(|c| c.trim().is_empty()) {
                    return Err(invalid("condition", "a conditional loop needs a condition"));
                }
            }
            LoopKind::Enumerated => {
                let needs_text = !matches!(self.enumeration_type, EnumerationType::Str);
                match self.enumeration.as_deref() {
                    None => {
                        return Err(invalid(
                            "enumeration",
                            "an enumerated loop needs an enumeration",
                        ));
                    }
                    Some(e) if needs_text && e.trim().is_empty() => {
                        return Err(invalid("enumeration", "enumeration reference is empty"));
                    }
                    Some(_) => {}
                }
            }
        }

        if self.loop_payload == LoopPayload::Key && self.kind != LoopKind::Enumerated {
            tracing::warn!(
                kind = ?self.kind,
                "loop_payload 'key' only has a value for enumerated loops"
            );
        }

        Ok(())
    }
}
