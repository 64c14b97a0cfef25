// src/session/history.rs - Rolling, process-wide conversation history

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::provider::{Part, Turn};

/// Bounded FIFO of role-tagged turns shared by every session.
///
/// Only completed exchanges are recorded, and always as a user/model pair
/// under a single lock, so concurrent sessions never interleave partial turns.
#[derive(Clone)]
pub struct ConversationHistory {
    turns: Arc<Mutex<VecDeque<Turn>>>,
    max_turns: usize,
}

impl ConversationHistory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Arc::new(Mutex::new(VecDeque::new())),
            max_turns,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Turn>> {
        self.turns.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Oldest-first copy, used as upstream context for the next turn.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().iter().cloned().collect()
    }

    /// Append a completed exchange and evict the oldest exchanges past the
    /// limit. Eviction drops whole user/model pairs, so context always opens
    /// with a user turn; an odd limit effectively rounds down.
    pub fn record_exchange(&self, user_parts: Vec<Part>, model_text: impl Into<String>) -> usize {
        let mut turns = self.lock();
        turns.push_back(Turn::user(user_parts));
        turns.push_back(Turn::model(model_text));
        while turns.len() > self.max_turns {
            turns.drain(..2);
        }
        turns.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}
