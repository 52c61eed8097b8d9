//! Per-message loop sessions.

use super::strategy::StrategyState;
use eddy_core::types::MessageId;
use eddy_core::value::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Loop state for one in-flight message.
#[derive(Debug, Clone)]
pub struct LoopSession {
    /// Message identifier the session is keyed by.
    pub id: MessageId,
    /// Payload captured when the session was created.
    pub original_payload: Value,
    /// Times the session was restarted.
    pub restart_count: u32,
    /// Continue decisions across all runs.
    pub total_iterations: u64,
    /// Index of the latest iteration in this run; -1 before the first.
    pub index: i64,
    /// Clock reading (nanoseconds) at the start of this run.
    pub started_at: u64,
    /// Elapsed-time budget for this run.
    pub limit_millis: Option<f64>,
    /// Set once the time guard fires.
    pub timed_out: bool,
    /// Strategy state for this run.
    pub state: StrategyState,
}

impl LoopSession {
    /// A fresh, uninitialized session.
    pub fn new(id: MessageId, original_payload: Value) -> Self {
        Self {
            id,
            original_payload,
            restart_count: 0,
            total_iterations: 0,
            index: -1,
            started_at: 0,
            limit_millis: None,
            timed_out: false,
            state: StrategyState::Pending,
        }
    }

    /// Whether this run has used up its time budget.
    pub fn limit_exceeded(&self, elapsed_millis: u64) -> bool {
        self.limit_millis
            .is_some_and(|limit| elapsed_millis as f64 >= limit)
    }
}

/// Sessions keyed by message identifier.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<MessageId, LoopSession>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a live session.
    pub fn get(&mut self, id: &MessageId) -> Option<&mut LoopSession> {
        self.sessions.get_mut(id)
    }

    /// Check whether a session exists.
    pub fn contains(&self, id: &MessageId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Create a session, replacing any existing one for the same id.
    pub fn create(&mut self, id: MessageId, original_payload: Value) -> &mut LoopSession {
        let session = LoopSession::new(id.clone(), original_payload);
        match self.sessions.entry(id) {
            Entry::Occupied(mut slot) => {
                slot.insert(session);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(session),
        }
    }

    /// Remove a session.
    pub fn remove(&mut self, id: &MessageId) -> Option<LoopSession> {
        self.sessions.remove(id)
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session.
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Remove every session matching `expired`, returning their ids sorted.
    pub fn sweep(&mut self, mut expired: impl FnMut(&LoopSession) -> bool) -> Vec<MessageId> {
        let mut removed: Vec<MessageId> = self
            .sessions
            .values()
            .filter(|s| expired(s))
            .map(|s| s.id.clone())
            .collect();
        for id in &removed {
            self.sessions.remove(id);
        }
        removed.sort();
        removed
    }
}
