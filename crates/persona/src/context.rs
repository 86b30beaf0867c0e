//! Conversation context: a bounded rolling buffer of recent turns per
//! conversation, held in a capacity-limited cache.
//!
//! Each buffer keeps at most `max_turns` turns and drops the oldest first.
//! The cache holds at most `max_conversations` buffers; inserting a new one
//! past capacity evicts the least recently appended-to conversation.

use chatwithyou_core::message::{ConversationId, Role, Turn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

pub const DEFAULT_MAX_TURNS: usize = 10;
pub const DEFAULT_MAX_CONVERSATIONS: usize = 1_000;

/// Process-wide store of conversation buffers.
pub struct ContextStore {
    max_turns: usize,
    max_conversations: usize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    buffers: HashMap<ConversationId, Buffer>,
    /// Monotonic counter standing in for recency.
    tick: u64,
}

struct Buffer {
    turns: VecDeque<Turn>,
    last_used: u64,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS, DEFAULT_MAX_CONVERSATIONS)
    }
}

impl ContextStore {
    /// Both limits are clamped to at least 1.
    pub fn new(max_turns: usize, max_conversations: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            max_conversations: max_conversations.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a turn, creating the buffer if needed. Never fails.
    pub fn append(&self, conversation_id: &ConversationId, role: Role, content: impl Into<String>) {
        let turn = Turn {
            role,
            content: content.into(),
        };

        let mut inner = self.lock();
        inner.tick += 1;
        let tick = inner.tick;

        if !inner.buffers.contains_key(conversation_id)
            && inner.buffers.len() >= self.max_conversations
        {
            let oldest = inner
                .buffers
                .iter()
                .min_by_key(|(_, b)| b.last_used)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                inner.buffers.remove(&oldest);
                debug!(conversation_id = %oldest, "Evicted least recently used context");
            }
        }

        let buffer = inner
            .buffers
            .entry(conversation_id.clone())
            .or_insert_with(|| Buffer {
                turns: VecDeque::with_capacity(self.max_turns + 1),
                last_used: tick,
            });
        buffer.turns.push_back(turn);
        while buffer.turns.len() > self.max_turns {
            buffer.turns.pop_front();
        }
        buffer.last_used = tick;
    }

    /// The last `count` turns, oldest first. Does not affect recency.
    pub fn recent_turns(&self, conversation_id: &ConversationId, count: usize) -> Vec<Turn> {
        let inner = self.lock();
        match inner.buffers.get(conversation_id) {
            Some(buffer) => {
                let skip = buffer.turns.len().saturating_sub(count);
                buffer.turns.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// Drop a conversation's buffer. Idempotent.
    pub fn clear(&self, conversation_id: &ConversationId) {
        if self.lock().buffers.remove(conversation_id).is_some() {
            debug!(conversation_id = %conversation_id, "Cleared conversation context");
        }
    }

    pub fn turn_count(&self, conversation_id: &ConversationId) -> usize {
        self.lock()
            .buffers
            .get(conversation_id)
            .map_or(0, |b| b.turns.len())
    }

    /// Number of conversations currently cached.
    pub fn len(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every buffer, returning how many conversations were held.
    pub fn flush(&self) -> usize {
        let mut inner = self.lock();
        let held = inner.buffers.len();
        inner.buffers.clear();
        inner.tick = 0;
        held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    #[test]
    fn unknown_conversation_is_empty() {
        let store = ContextStore::default();
        assert_eq!(store.turn_count(&id("nope")), 0);
        assert!(store.recent_turns(&id("nope"), 6).is_empty());
    }

    #[test]
    fn buffer_is_capped_fifo() {
        let store = ContextStore::new(10, 100);
        let c = id("c");
        for i in 0..=10 {
            store.append(&c, Role::User, format!("m{i}"));
            assert_eq!(store.turn_count(&c), (i + 1).min(10));
        }

        let turns = store.recent_turns(&c, 10);
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "m1");
        assert_eq!(turns[9].content, "m10");
        assert!(turns.iter().all(|t| t.content != "m0"));
    }

    #[test]
    fn recent_turns_returns_tail_in_order() {
        let store = ContextStore::default();
        let c = id("c");
        store.append(&c, Role::User, "q1");
        store.append(&c, Role::Assistant, "a1");
        store.append(&c, Role::User, "q2");

        let turns = store.recent_turns(&c, 2);
        assert_eq!(turns, vec![Turn::assistant("a1"), Turn::user("q2")]);
        assert_eq!(store.recent_turns(&c, 50).len(), 3);
    }

    #[test]
    fn clear_is_idempotent() {
        let store = ContextStore::default();
        let c = id("c");
        store.append(&c, Role::User, "hi");
        store.clear(&c);
        assert_eq!(store.turn_count(&c), 0);
        store.clear(&c);
        assert_eq!(store.turn_count(&c), 0);
    }

    #[test]
    fn least_recently_appended_conversation_is_evicted() {
        let store = ContextStore::new(10, 2);
        store.append(&id("a"), Role::User, "1");
        store.append(&id("b"), Role::User, "1");
        // touch "a" so "b" becomes the oldest
        store.append(&id("a"), Role::Assistant, "2");
        store.append(&id("c"), Role::User, "1");

        assert_eq!(store.len(), 2);
        assert_eq!(store.turn_count(&id("a")), 2);
        assert_eq!(store.turn_count(&id("b")), 0);
        assert_eq!(store.turn_count(&id("c")), 1);
    }

    #[test]
    fn reads_do_not_refresh_recency() {
        let store = ContextStore::new(10, 2);
        store.append(&id("a"), Role::User, "1");
        store.append(&id("b"), Role::User, "1");
        let _ = store.recent_turns(&id("a"), 6);
        store.append(&id("c"), Role::User, "1");
        assert_eq!(store.turn_count(&id("a")), 0);
        assert_eq!(store.turn_count(&id("b")), 1);
    }

    #[test]
    fn flush_releases_everything() {
        let store = ContextStore::default();
        store.append(&id("a"), Role::User, "1");
        store.append(&id("b"), Role::User, "1");
        assert_eq!(store.flush(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_appends_are_not_lost() {
        let store = Arc::new(ContextStore::new(1_000, 10));
        let c = id("shared");
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                let c = c.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        store.append(&c, Role::User, format!("{t}-{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.turn_count(&c), 400);
    }
}
