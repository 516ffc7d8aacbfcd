//! Per-conversation chat history
//!
//! Each conversation key owns a `Mutex`-guarded turn list. The orchestrator
//! holds that lock from history load through append, so concurrent requests
//! on one key are serialized while different keys proceed in parallel.

use crate::assistant::types::ChatTurn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub type HistorySlot = Arc<Mutex<Vec<ChatTurn>>>;

pub struct ConversationHistory {
    limit: usize,
    conversations: RwLock<HashMap<String, HistorySlot>>,
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// The turn list for `key`, created empty on first use
    pub async fn slot(&self, key: &str) -> HistorySlot {
        if let Some(slot) = self.conversations.read().await.get(key) {
            return slot.clone();
        }
        let mut conversations = self.conversations.write().await;
        conversations.entry(key.to_string()).or_default().clone()
    }

    /// Copy of the turns for `key`
    pub async fn snapshot(&self, key: &str) -> Vec<ChatTurn> {
        let slot = self.conversations.read().await.get(key).cloned();
        match slot {
            Some(slot) => slot.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Append turns, dropping the oldest beyond the limit
    pub fn append_bounded(&self, turns: &mut Vec<ChatTurn>, new_turns: impl IntoIterator<Item = ChatTurn>) {
        turns.extend(new_turns);
        if turns.len() > self.limit {
            let excess = turns.len() - self.limit;
            turns.drain(..excess);
        }
    }
}
