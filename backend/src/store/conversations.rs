use super::{read, write};
use crate::models::Conversation;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// Energy advisor exchanges, oldest evicted first.
pub struct ConversationLog {
    entries: RwLock<VecDeque<Conversation>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl Default for ConversationLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ConversationLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn append(&self, user_message: &str, ai_response: &str) -> Conversation {
        let entry = Conversation {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_message: user_message.to_string(),
            ai_response: ai_response.to_string(),
            created_at: Utc::now(),
        };

        let mut entries = write(&self.entries);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
        entry
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Vec<Conversation> {
        read(&self.entries).iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
