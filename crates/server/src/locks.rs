//! Per-conversation send serialization.
//!
//! Two sends to the same conversation must not interleave their context
//! reads and writes, so each send holds that conversation's async lock
//! from history load to context update.

use chatwithyou_core::ConversationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type ConversationLock = Arc<tokio::sync::Mutex<()>>;

#[derive(Default)]
pub struct SendLocks {
    locks: Mutex<HashMap<ConversationId, ConversationLock>>,
}

impl SendLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle on the lock for `conversation_id`, created on first use.
    ///
    /// The map entry lives as long as some handle does; dropping the last
    /// one removes it, including when the owning request is cancelled.
    pub fn acquire(&self, conversation_id: &ConversationId) -> SendPermit<'_> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks.entry(conversation_id.clone()).or_default().clone();
        SendPermit {
            locks: self,
            conversation_id: conversation_id.clone(),
            lock: Some(lock),
        }
    }

    fn release(&self, conversation_id: &ConversationId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(conversation_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(conversation_id);
        }
    }

    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A claim on one conversation's lock entry.
pub struct SendPermit<'a> {
    locks: &'a SendLocks,
    conversation_id: ConversationId,
    lock: Option<ConversationLock>,
}

impl SendPermit<'_> {
    /// Wait for exclusive access to the conversation.
    pub async fn lock(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match &self.lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        }
    }
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        drop(self.lock.take());
        self.locks.release(&self.conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shares_lock(a: &SendPermit<'_>, b: &SendPermit<'_>) -> bool {
        match (&a.lock, &b.lock) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[test]
    fn same_conversation_shares_a_lock() {
        let locks = SendLocks::new();
        let id = ConversationId::from("c1");
        let a = locks.acquire(&id);
        let b = locks.acquire(&id);
        assert!(shares_lock(&a, &b));
        assert!(!shares_lock(&a, &locks.acquire(&ConversationId::from("c2"))));
    }

    #[test]
    fn entry_removed_when_last_permit_drops() {
        let locks = SendLocks::new();
        let id = ConversationId::from("c1");
        let held = locks.acquire(&id);
        let other = locks.acquire(&id);
        drop(other);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn lock_excludes_a_second_holder() {
        let locks = SendLocks::new();
        let id = ConversationId::from("c1");
        let first = locks.acquire(&id);
        let _guard = first.lock().await;
        let second = locks.acquire(&id);
        let attempt = tokio::time::timeout(Duration::from_millis(10), second.lock()).await;
        assert!(attempt.is_err());
    }

    #[tokio::test]
    async fn cancelled_holder_drops_its_entry() {
        let locks = SendLocks::new();
        let id = ConversationId::from("c1");
        let send = async {
            let permit = locks.acquire(&id);
            let _guard = permit.lock().await;
            tokio::time::sleep(Duration::from_secs(60)).await;
        };
        assert!(tokio::time::timeout(Duration::from_millis(10), send).await.is_err());
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_leaves_holder_entry_intact() {
        let locks = SendLocks::new();
        let id = ConversationId::from("c1");
        let holder = locks.acquire(&id);
        let guard = holder.lock().await;

        let waiter = async {
            let permit = locks.acquire(&id);
            let _guard = permit.lock().await;
        };
        assert!(tokio::time::timeout(Duration::from_millis(10), waiter).await.is_err());
        assert_eq!(locks.len(), 1);

        drop(guard);
        drop(holder);
        assert!(locks.is_empty());
    }
}
