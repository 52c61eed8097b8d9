//! Loop strategies: one per loop kind.

use super::condition::Condition;
use super::config::{ConditionWhen, LoopConfig, LoopKind, NumberSetting, resolve_number};
use super::enumeration::{Element, Enumeration, EnumerationSource};
use eddy_core::error::{EddyError, Result};
use eddy_core::message::Message;
use eddy_core::traits::Context;
use eddy_core::value::Value;

/// Per-kind loop behavior, fixed when the node is built.
#[derive(Debug, Clone)]
pub enum LoopStrategy {
    /// Fixed iteration count with an accumulating value.
    Counted {
        /// Static count, else read from the message.
        count: Option<NumberSetting>,
        /// Static initial value, else read from the message.
        initial: Option<NumberSetting>,
        /// Static step, else read from the message.
        step: Option<NumberSetting>,
    },
    /// Iterate while a condition holds.
    Conditional {
        /// The compiled condition.
        condition: Condition,
        /// Run the first iteration without checking.
        evaluate_after: bool,
    },
    /// Iterate over a collection.
    Enumerated {
        /// Where the collection comes from.
        source: EnumerationSource,
    },
}

/// Counted loop state.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedState {
    /// Number of iterations.
    pub count: f64,
    /// Value of the first iteration.
    pub initial: f64,
    /// Increment per iteration.
    pub step: f64,
    /// Value of the latest iteration.
    pub current_value: f64,
}

/// Variant-specific session state.
#[derive(Debug, Clone)]
pub enum StrategyState {
    /// Not initialized yet.
    Pending,
    /// Counted loop state.
    Counted(CountedState),
    /// Conditional loops keep no state of their own.
    Conditional,
    /// Captured collection and cursor.
    Enumerated(Enumeration),
}

/// Annotations produced by a continue decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    /// `loop.value`, `loop.count`, `loop.initial`, `loop.step`.
    Counted {
        /// Value for this iteration.
        value: f64,
        /// Iteration count.
        count: f64,
        /// Initial value.
        initial: f64,
        /// Step.
        step: f64,
    },
    /// `loop.enumeration`, `loop.key` (pairs only), `loop.value`.
    Element {
        /// The whole collection.
        enumeration: Value,
        /// Key, for key/value collections.
        key: Option<String>,
        /// Element value.
        value: Value,
    },
}

/// Outcome of a strategy decision.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Whether another iteration runs.
    pub proceed: bool,
    /// Annotations for the iteration, when it runs.
    pub annotation: Option<Annotation>,
}

impl Decision {
    fn stop() -> Self {
        Self {
            proceed: false,
            annotation: None,
        }
    }

    fn next(annotation: Option<Annotation>) -> Self {
        Self {
            proceed: true,
            annotation,
        }
    }
}

impl LoopStrategy {
    /// Build the strategy for a configuration.
    ///
    /// Compiles conditions and prepares enumeration sources.
    pub fn from_config(config: &LoopConfig) -> Result<Self> {
        Ok(match config.kind {
            LoopKind::Counted => Self::Counted {
                count: config.count.clone(),
                initial: config.initial.clone(),
                step: config.step.clone(),
            },
            LoopKind::Conditional => {
                let source = config.condition.as_deref().ok_or_else(|| {
                    EddyError::InvalidConfig {
                        field: "condition".to_string(),
                        cause: "a conditional loop needs a condition".to_string(),
                    }
                })?;
                Self::Conditional {
                    condition: Condition::compile(config.condition_type, source)?,
                    evaluate_after: config.when == ConditionWhen::After,
                }
            }
            LoopKind::Enumerated => {
                let reference = config.enumeration.as_deref().ok_or_else(|| {
                    EddyError::InvalidConfig {
                        field: "enumeration".to_string(),
                        cause: "an enumerated loop needs an enumeration".to_string(),
                    }
                })?;
                Self::Enumerated {
                    source: EnumerationSource::prepare(config.enumeration_type, reference)?,
                }
            }
        })
    }

    /// The loop kind this strategy implements.
    pub fn kind(&self) -> LoopKind {
        match self {
            Self::Counted { .. } => LoopKind::Counted,
            Self::Conditional { .. } => LoopKind::Conditional,
            Self::Enumerated { .. } => LoopKind::Enumerated,
        }
    }

    /// Set up state for a new run from the starting message.
    pub fn initialize(&self, msg: &Message, ctx: &Context) -> Result<StrategyState> {
        match self {
            Self::Counted {
                count,
                initial,
                step,
            } => {
                let count = resolve_number(count.as_ref(), msg, "count")?.ok_or_else(|| {
                    EddyError::InvalidConfig {
                        field: "count".to_string(),
                        cause: "no count configured and msg.count is missing".to_string(),
                    }
                })?;
                let initial = resolve_number(initial.as_ref(), msg, "initial")?.unwrap_or(0.0);
                let step = resolve_number(step.as_ref(), msg, "step")?.unwrap_or(1.0);
                Ok(StrategyState::Counted(CountedState {
                    count,
                    initial,
                    step,
                    current_value: initial,
                }))
            }
            Self::Conditional { .. } => Ok(StrategyState::Conditional),
            Self::Enumerated { source } => {
                let collection = source.resolve(msg, ctx)?;
                let enumeration = Enumeration::capture(collection).map_err(|e| {
                    EddyError::InvalidConfig {
                        field: "enumeration".to_string(),
                        cause: format!("{}: {}", source.describe(), e),
                    }
                })?;
                Ok(StrategyState::Enumerated(enumeration))
            }
        }
    }

    /// Decide whether the iteration after `index` runs.
    ///
    /// State only advances on a continue decision.
    pub fn decide(
        &self,
        state: &mut StrategyState,
        index: i64,
        msg: &mut Message,
        ctx: &Context,
    ) -> Result<Decision> {
        match (self, state) {
            (Self::Counted { .. }, StrategyState::Counted(counted)) => {
                let next = index + 1;
                if (next as f64) >= counted.count {
                    return Ok(Decision::stop());
                }
                counted.current_value = if next == 0 {
                    counted.initial
                } else {
                    counted.current_value + counted.step
                };
                Ok(Decision::next(Some(Annotation::Counted {
                    value: counted.current_value,
                    count: counted.count,
                    initial: counted.initial,
                    step: counted.step,
                })))
            }
            (
                Self::Conditional {
                    condition,
                    evaluate_after,
                },
                StrategyState::Conditional,
            ) => {
                if *evaluate_after && index == -1 {
                    return Ok(Decision::next(None));
                }
                if condition.evaluate(ctx, msg, index)? {
                    Ok(Decision::next(None))
                } else {
                    Ok(Decision::stop())
                }
            }
            (Self::Enumerated { .. }, StrategyState::Enumerated(enumeration)) => {
                let Some(element) = enumeration.next_element() else {
                    return Ok(Decision::stop());
                };
                let (key, value) = match element {
                    Element::Value(value) => (None, value),
                    Element::Pair(key, value) => (Some(key), value),
                };
                Ok(Decision::next(Some(Annotation::Element {
                    enumeration: enumeration.source().clone(),
                    key,
                    value,
                })))
            }
            (strategy, state) => Err(EddyError::runtime(format!(
                "{:?} loop cannot advance from state {:?}",
                strategy.kind(),
                state
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::loop_node::config::{ConditionType, EnumerationType};
    use eddy_core::testing::TestContextBuilder;
    use serde_json::json;

    fn ctx() -> Context {
        TestContextBuilder::new().build().unwrap().context()
    }

    fn run(strategy: &LoopStrategy, msg: &mut Message) -> Vec<Decision> {
        let ctx = ctx();
        let mut state = strategy.initialize(msg, &ctx).unwrap();
        let mut index = -1;
        let mut decisions = Vec::new();
        loop {
            let decision = strategy.decide(&mut state, index, msg, &ctx).unwrap();
            let proceed = decision.proceed;
            decisions.push(decision);
            if !proceed || decisions.len() > 20 {
                return decisions;
            }
            index += 1;
        }
    }

    #[test]
    fn counted_values_accumulate() {
        let strategy = LoopStrategy::from_config(&LoopConfig::counted(3.0, 10.0, 5.0)).unwrap();
        let decisions = run(&strategy, &mut Message::new(0_i64));

        let values: Vec<f64> = decisions
            .iter()
            .filter_map(|d| match d.annotation {
                Some(Annotation::Counted { value, .. }) => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![10.0, 15.0, 20.0]);
        assert_eq!(decisions.len(), 4);
        assert!(!decisions[3].proceed);
    }

    #[test]
    fn counted_reads_message_fields() {
        let strategy = LoopStrategy::from_config(&LoopConfig::counted_from_message()).unwrap();
        let mut msg = Message::new(0_i64)
            .with("count", "2")
            .unwrap()
            .with("initial", 1_i64)
            .unwrap();
        let decisions = run(&strategy, &mut msg);
        assert_eq!(decisions.len(), 3);
        assert_eq!(
            decisions[1].annotation,
            Some(Annotation::Counted {
                value: 2.0,
                count: 2.0,
                initial: 1.0,
                step: 1.0
            })
        );
    }

    #[test]
    fn counted_without_count_fails() {
        let strategy = LoopStrategy::from_config(&LoopConfig::counted_from_message()).unwrap();
        let err = strategy.initialize(&Message::new(0_i64), &ctx()).unwrap_err();
        assert!(err.is_config_error());

        let msg = Message::new(0_i64).with("count", "many").unwrap();
        assert!(strategy.initialize(&msg, &ctx()).is_err());
    }

    #[test]
    fn zero_count_stops_immediately() {
        let strategy = LoopStrategy::from_config(&LoopConfig::counted(0.0, 0.0, 1.0)).unwrap();
        let decisions = run(&strategy, &mut Message::new(0_i64));
        assert_eq!(decisions, vec![Decision::stop()]);
    }

    #[test]
    fn conditional_after_runs_first_iteration() {
        let config = LoopConfig::conditional(ConditionType::Query, "false").evaluate_after();
        let strategy = LoopStrategy::from_config(&config).unwrap();
        let decisions = run(&strategy, &mut Message::new(0_i64));
        assert_eq!(decisions.len(), 2);
        assert!(decisions[0].proceed);
        assert!(!decisions[1].proceed);

        let config = LoopConfig::conditional(ConditionType::Query, "false");
        let strategy = LoopStrategy::from_config(&config).unwrap();
        assert_eq!(run(&strategy, &mut Message::new(0_i64)).len(), 1);
    }

    #[test]
    fn enumerated_pairs() {
        let config = LoopConfig::enumerated(EnumerationType::Json, r#"{"x": 1, "y": 2}"#);
        let strategy = LoopStrategy::from_config(&config).unwrap();
        let decisions = run(&strategy, &mut Message::new(0_i64));

        assert_eq!(decisions.len(), 3);
        assert_eq!(
            decisions[0].annotation,
            Some(Annotation::Element {
                enumeration: Value(json!({"x": 1, "y": 2})),
                key: Some("x".into()),
                value: Value::int(1),
            })
        );
    }

    #[test]
    fn enumerated_non_collection_fails() {
        let config = LoopConfig::enumerated(EnumerationType::Msg, "payload");
        let strategy = LoopStrategy::from_config(&config).unwrap();
        let err = strategy.initialize(&Message::new(5_i64), &ctx()).unwrap_err();
        assert!(err.to_string().contains("msg.payload"));
    }

    #[test]
    fn mismatched_state_is_an_error() {
        let strategy = LoopStrategy::from_config(&LoopConfig::counted(1.0, 0.0, 1.0)).unwrap();
        let mut state = StrategyState::Pending;
        let err = strategy
            .decide(&mut state, -1, &mut Message::new(0_i64), &ctx())
            .unwrap_err();
        assert!(err.to_string().contains("Pending"));
    }
}
