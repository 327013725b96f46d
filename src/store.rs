//! In-memory per-chat conversation store with TTL-based pruning.
//!
//! Process-lifetime only; restarting the bot discards all history. Shared as
//! `Arc<tokio::sync::Mutex<ThreadStore>>` so each operation is atomic even if
//! dispatch is ever parallelized across chats.

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::message::Message;

/// Default age in hours after which a message drops out of its thread.
pub const DEFAULT_TTL_HOURS: i64 = 3;

/// Maps chat id to its ordered message history, youngest last.
pub struct ThreadStore {
    threads: HashMap<i64, Vec<Message>>,
    ttl: Duration,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            threads: HashMap::new(),
            ttl,
        }
    }

    /// Appends to the message's chat thread, creating it on first use. No dedup.
    pub fn put(&mut self, message: Message) {
        self.threads.entry(message.chat).or_default().push(message);
    }

    /// Returns the thread for `chat` with expired messages pruned.
    ///
    /// The pruned thread is written back so subsequent reads see the shortened
    /// history. Unknown chat yields an empty thread.
    pub fn thread(&mut self, chat: i64) -> Vec<Message> {
        let Some(found) = self.threads.get_mut(&chat) else {
            return Vec::new();
        };

        let now = Utc::now();
        let ttl = self.ttl;
        found.retain(|msg| now - msg.timestamp < ttl);
        found.clone()
    }

    /// Removes the entire thread for `chat`. A no-op for unknown chats.
    pub fn clear(&mut self, chat: i64) {
        self.threads.remove(&chat);
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new()
    }
}
