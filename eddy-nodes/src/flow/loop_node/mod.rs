//! Loop node (per-message iteration).
//!
//! Each message that enters the node starts a loop session keyed by its
//! `_msgid`. The message leaves on `continue`, passes through the loop body
//! and comes back in; every return is one more activation of the same
//! session. When the loop ends the message leaves on `done` carrying a
//! `loop` summary and the session is dropped.
//!
//! Three loop kinds are supported:
//! - **counted**: `count` iterations with a value starting at `initial` and
//!   advancing by `step`
//! - **conditional**: iterate while a script, query or pattern condition holds
//! - **enumerated**: one iteration per element of an array, string or object
//!
//! Two control commands are honoured on `msg.command`: `restart` starts a
//! live session over and `break` ends it. An optional elapsed-time limit ends
//! a run regardless of its kind.

mod condition;
mod config;
mod enumeration;
mod session;
mod strategy;

pub use condition::Condition;
pub use config::{
    ConditionType, ConditionWhen, EnumerationType, FinalPayload, LoopConfig, LoopKind,
    LoopPayload, NumberSetting,
};
pub use enumeration::{Element, Enumeration, EnumerationSource};
pub use session::{LoopSession, SessionStore};
pub use strategy::{Annotation, CountedState, Decision, LoopStrategy, StrategyState};

use config::resolve_number;
use eddy_core::error::{EddyError, Result, ResultExt};
use eddy_core::message::Message;
use eddy_core::status::{NodeStatus, StatusFill, StatusShape};
use eddy_core::traits::{Context, Node, NodeFuture, NodeInfo, NodeOutput, Port, PortDirection};
use eddy_core::types::MessageId;
use eddy_core::value::Value;
use parking_lot::Mutex;
use serde_json::json;

/// Output port for messages whose loop has finished.
pub const DONE_PORT: &str = "done";

/// Output port for messages entering another iteration.
pub const CONTINUE_PORT: &str = "continue";

/// Message property holding loop annotations.
pub const LOOP_FIELD: &str = "loop";

/// Command that starts a live session over.
pub const RESTART_COMMAND: &str = "restart";

/// Command that ends a session.
pub const BREAK_COMMAND: &str = "break";

/// Loop node - per-message iteration.
///
/// # Ports
/// - Input: "in" - Starting messages and messages returning from the loop body
/// - Output: "done" (slot 0) - Activated when the loop terminates
/// - Output: "continue" (slot 1) - Activated for each iteration
/// - Output: "error" - Error output
///
/// # Example Configuration
/// ```yaml
/// nodes:
///   pages:
///     type: std::loop
///     config:
///       kind: enumerated
///       enumeration: payload.urls
///       enumeration_type: msg
///       loop_payload: value
///       final_payload: original
///       limit: 30000
///     outputs:
///       continue: -> fetch.in
///       done: -> report.in
/// ```
#[derive(Debug)]
pub struct LoopNode {
    config: LoopConfig,
    /// The strategy, or the setup error every session start reports.
    strategy: std::result::Result<LoopStrategy, EddyError>,
    sessions: Mutex<SessionStore>,
}

impl LoopNode {
    /// Build a loop node.
    ///
    /// A configuration that cannot be set up (a bad pattern, an unparsable
    /// query or JSON literal) is logged once here. The node is still created
    /// and rejects every session start with that error.
    pub fn new(config: LoopConfig) -> Self {
        let strategy = config.validate().and_then(|()| LoopStrategy::from_config(&config));
        if let Err(e) = &strategy {
            tracing::error!(
                kind = ?config.kind,
                error = %e,
                code = e.code(),
                "Loop node setup failed"
            );
        }
        Self {
            config,
            strategy,
            sessions: Mutex::new(SessionStore::new()),
        }
    }

    /// Build a loop node, failing on configuration that cannot be set up.
    pub fn try_new(config: LoopConfig) -> Result<Self> {
        config.validate()?;
        let strategy = LoopStrategy::from_config(&config)?;
        Ok(Self {
            config,
            strategy: Ok(strategy),
            sessions: Mutex::new(SessionStore::new()),
        })
    }

    /// Build a loop node from YAML configuration.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self> {
        Ok(Self::new(LoopConfig::from_yaml(value)?))
    }

    /// The node configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// The setup error, if the configuration could not be set up.
    pub fn setup_error(&self) -> Option<&EddyError> {
        self.strategy.as_ref().err()
    }

    /// Number of in-flight sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Check whether a message currently has a session.
    pub fn has_session(&self, id: &MessageId) -> bool {
        self.sessions.lock().contains(id)
    }

    /// Process one activation and pick the output port.
    pub fn activate(&self, ctx: &Context, mut msg: Message) -> Result<NodeOutput> {
        let id = msg.id();
        let command = msg.command();
        let mut sessions = self.sessions.lock();

        let restart = command.as_deref() == Some(RESTART_COMMAND);
        if restart || !sessions.contains(&id) {
            let live = sessions.contains(&id);
            if let Err(err) = self.start_run(ctx, &mut sessions, &id, &mut msg) {
                let session = sessions.remove(&id);
                ctx.error(format!("loop setup failed for message {}: {}", id, err));
                ctx.status(NodeStatus::new(StatusFill::Red, StatusShape::Ring, "error"));

                // A live session that fails to restart still releases its message
                return match session {
                    Some(session) if live => {
                        self.finish(&mut msg, session, true, Some(&err))?;
                        Ok(NodeOutput::new(DONE_PORT, msg))
                    }
                    _ => Err(err),
                };
            }
        }

        let session = sessions.get(&id).ok_or_else(|| EddyError::NodeExecution {
            node_id: ctx.node_id(),
            msg_id: id.clone(),
            cause: "loop session vanished during activation".to_string(),
        })?;

        let elapsed = ctx.clock().millis_since(session.started_at);
        let mut broken = command.as_deref() == Some(BREAK_COMMAND);
        let mut failure = None;

        let decision = if session.limit_exceeded(elapsed) {
            session.timed_out = true;
            tracing::debug!(
                msg_id = %id,
                elapsed_ms = elapsed,
                limit_ms = ?session.limit_millis,
                "Loop time limit reached"
            );
            None
        } else if broken {
            tracing::debug!(msg_id = %id, index = session.index, "Loop break requested");
            None
        } else {
            let strategy = self.strategy.as_ref().map_err(|e| e.clone())?;
            match strategy
                .decide(&mut session.state, session.index, &mut msg, ctx)
                .evaluation_for(ctx.node_id())
            {
                Ok(decision) if decision.proceed => Some(decision),
                Ok(_) => None,
                Err(err) => {
                    tracing::warn!(
                        node_id = %ctx.node_id(),
                        msg_id = %id,
                        index = session.index,
                        error = %err,
                        "Loop condition failed, ending loop"
                    );
                    broken = true;
                    failure = Some(err);
                    None
                }
            }
        };

        match decision {
            Some(decision) => {
                session.index += 1;
                session.total_iterations += 1;
                msg.clear_command();
                self.annotate_iteration(&mut msg, session, decision.annotation)?;

                tracing::debug!(
                    msg_id = %id,
                    index = session.index,
                    total = session.total_iterations,
                    "Loop continues"
                );
                Ok(NodeOutput::new(CONTINUE_PORT, msg))
            }
            None => {
                let session = sessions.remove(&id).ok_or_else(|| EddyError::NodeExecution {
                    node_id: ctx.node_id(),
                    msg_id: id.clone(),
                    cause: "loop session vanished during activation".to_string(),
                })?;

                self.finish(&mut msg, session, broken, failure.as_ref())?;
                ctx.status(NodeStatus::clear());
                Ok(NodeOutput::new(DONE_PORT, msg))
            }
        }
    }

    /// Create or restart the session for `id` and initialize its run.
    ///
    /// On failure the session is left in the store for the caller to drop.
    fn start_run(
        &self,
        ctx: &Context,
        sessions: &mut SessionStore,
        id: &MessageId,
        msg: &mut Message,
    ) -> Result<()> {
        let fresh = !sessions.contains(id);
        if fresh {
            sessions.create(id.clone(), msg.payload());
        }

        let session = sessions
            .get(id)
            .ok_or_else(|| EddyError::runtime("session missing after creation"))?;
        if !fresh {
            session.restart_count += 1;
            msg.set_payload(session.original_payload.clone());
            tracing::debug!(
                msg_id = %id,
                restarts = session.restart_count,
                total = session.total_iterations,
                "Loop restarted"
            );
        }
        self.initialize_run(ctx, session, msg)
            .config_for(ctx.node_id())?;

        ctx.status(NodeStatus::new(StatusFill::Blue, StatusShape::Dot, "looping"));
        Ok(())
    }

    /// Reset a session for a new run.
    fn initialize_run(&self, ctx: &Context, session: &mut LoopSession, msg: &Message) -> Result<()> {
        let strategy = self.strategy.as_ref().map_err(|e| e.clone())?;
        let limit = resolve_number(self.config.limit.as_ref(), msg, "limit")?;
        let state = strategy.initialize(msg, ctx)?;

        session.index = -1;
        session.timed_out = false;
        session.limit_millis = limit;
        session.started_at = ctx.clock().now();
        session.state = state;

        tracing::debug!(
            node_id = %ctx.node_id(),
            msg_id = %session.id,
            kind = ?strategy.kind(),
            limit_ms = ?limit,
            "Loop session started"
        );
        Ok(())
    }

    /// Write the iteration annotations and apply the loop payload policy.
    fn annotate_iteration(
        &self,
        msg: &mut Message,
        session: &LoopSession,
        annotation: Option<Annotation>,
    ) -> Result<()> {
        msg.set("loop.index", session.index)?;

        match annotation {
            Some(Annotation::Counted {
                value,
                count,
                initial,
                step,
            }) => {
                msg.set("loop.value", Value::number(value))?;
                msg.set("loop.count", Value::number(count))?;
                msg.set("loop.initial", Value::number(initial))?;
                msg.set("loop.step", Value::number(step))?;
            }
            Some(Annotation::Element {
                enumeration,
                key,
                value,
            }) => {
                msg.set("loop.enumeration", enumeration)?;
                if let Some(key) = key {
                    msg.set("loop.key", key)?;
                }
                msg.set("loop.value", value)?;
            }
            None => {}
        }

        let payload = match self.config.loop_payload {
            LoopPayload::Index => Value::int(session.index),
            LoopPayload::Value => msg.get("loop.value").unwrap_or_default(),
            LoopPayload::Key => msg.get("loop.key").unwrap_or_default(),
            LoopPayload::Original => session.original_payload.clone(),
            LoopPayload::Unchanged => return Ok(()),
        };
        msg.set_payload(payload);
        Ok(())
    }

    /// Write the `loop` summary for a finished session and apply the final
    /// payload policy.
    fn finish(
        &self,
        msg: &mut Message,
        session: LoopSession,
        broken: bool,
        failure: Option<&EddyError>,
    ) -> Result<()> {
        let mut summary = json!({
            "broken": broken,
            "timeout": session.timed_out,
            "passed": {
                "total": session.total_iterations,
                "last": session.index + 1,
            },
            "restarts": session.restart_count,
        });
        if let Some(err) = failure {
            summary["error"] = json!(err.to_string());
        }
        msg.set(LOOP_FIELD, Value(summary))?;

        if self.config.final_payload == FinalPayload::Original {
            msg.set_payload(session.original_payload);
        }
        msg.clear_command();

        tracing::debug!(
            msg_id = %session.id,
            broken = broken,
            timeout = session.timed_out,
            total = session.total_iterations,
            restarts = session.restart_count,
            "Loop done"
        );
        Ok(())
    }

    /// Drop sessions whose run outlived its time limit or the configured
    /// session TTL. Returns the swept message ids.
    pub fn sweep_expired(&self, ctx: &Context) -> Vec<MessageId> {
        let clock = ctx.clock();
        let ttl = self.config.session_ttl_ms;

        let swept = self.sessions.lock().sweep(|session| {
            let elapsed = clock.millis_since(session.started_at);
            session.limit_exceeded(elapsed) || ttl.is_some_and(|ttl| elapsed >= ttl)
        });

        for id in &swept {
            ctx.warn(format!("dropped expired loop session for message {}", id));
        }
        swept
    }
}

impl Node for LoopNode {
    fn info(&self) -> NodeInfo {
        NodeInfo::new("std", "loop")
            .with_description("Per-message counted, conditional or enumerated iteration")
            .with_inputs(vec![Port::input()])
            .with_outputs(vec![
                Port::named(DONE_PORT, PortDirection::Output)
                    .with_description("Activated when the loop terminates"),
                Port::named(CONTINUE_PORT, PortDirection::Output)
                    .with_description("Activated for each loop iteration"),
                Port::error(),
            ])
    }

    fn execute<'a>(&'a self, ctx: Context, msg: Message) -> NodeFuture<'a> {
        Box::pin(async move { self.activate(&ctx, msg) })
    }

    fn shutdown(&self, ctx: &Context) {
        let dropped = {
            let mut sessions = self.sessions.lock();
            let n = sessions.len();
            sessions.clear();
            n
        };
        if dropped > 0 {
            ctx.log(format!("loop node closed, {} live sessions dropped", dropped));
        }
        ctx.status(NodeStatus::clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::testing::TestContextBuilder;

    #[test]
    fn loop_node_info() {
        let node = LoopNode::new(LoopConfig::counted(3.0, 0.0, 1.0));
        let info = node.info();

        assert_eq!(info.name, "std::loop");
        assert_eq!(info.inputs.len(), 1);
        assert_eq!(info.outputs.len(), 3);
        assert_eq!(info.output_slot(DONE_PORT), Some(0));
        assert_eq!(info.output_slot(CONTINUE_PORT), Some(1));
    }

    #[test]
    fn counted_loop_emits_then_finishes() {
        let test = TestContextBuilder::new().build().unwrap();
        let ctx = test.context();
        let node = LoopNode::new(LoopConfig::counted(2.0, 0.0, 1.0));

        let mut msg = Message::with_id(MessageId::from("m"), "p");
        for expected in 0..2_i64 {
            let out = node.activate(&ctx, msg).unwrap();
            assert_eq!(out.port, CONTINUE_PORT);
            assert_eq!(out.message.get("loop.index"), Some(Value::int(expected)));
            msg = out.message;
        }

        let out = node.activate(&ctx, msg).unwrap();
        assert_eq!(out.port, DONE_PORT);
        assert_eq!(out.message.get("loop.passed.last"), Some(Value::int(2)));
        assert_eq!(node.session_count(), 0);
    }

    #[test]
    fn try_new_rejects_bad_setup() {
        let config = LoopConfig::conditional(ConditionType::Pattern, "[");
        assert!(LoopNode::try_new(config.clone()).is_err());

        let node = LoopNode::new(config);
        assert!(node.setup_error().is_some());
    }

    #[test]
    fn annotate_sets_null_payload_without_key() {
        let node = LoopNode::new(
            LoopConfig::counted(1.0, 0.0, 1.0).with_loop_payload(LoopPayload::Key),
        );
        let ctx = TestContextBuilder::new().build().unwrap().context();
        let out = node.activate(&ctx, Message::new("keep")).unwrap();
        assert_eq!(out.port, CONTINUE_PORT);
        assert!(out.message.payload().is_null());
    }
}
