use colloq_core::session::Message;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Hit/miss/eviction counters for the message cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Messages dropped from the front of a full session entry.
    pub evictions: u64,
    /// Whole session entries removed.
    pub purges: u64,
}

/// Bounded per-session mirror of recent messages.
///
/// Each entry keeps at most `capacity` messages, oldest evicted first. The
/// cache only ever holds a suffix of a session's message sequence; the
/// authoritative session record is never truncated through it.
///
/// The cache itself is not synchronized. It lives inside the session state
/// and is mutated under that state's write guard.
#[derive(Debug)]
pub struct SessionCache {
    capacity: usize,
    entries: HashMap<String, VecDeque<Message>>,
    stats: CacheStats,
}

impl SessionCache {
    /// Creates an empty cache bounded to `capacity` messages per session.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the cached messages when the entry exists and is non-empty.
    ///
    /// An empty entry counts as a miss so the caller goes to the network.
    pub fn get(&mut self, session_id: &str) -> Option<Vec<Message>> {
        match self.entries.get(session_id) {
            Some(entry) if !entry.is_empty() => {
                self.stats.hits += 1;
                Some(entry.iter().cloned().collect())
            }
            _ => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Replaces a session's entry with the newest `capacity` messages.
    pub fn populate(&mut self, session_id: impl Into<String>, messages: &[Message]) {
        let skip = messages.len().saturating_sub(self.capacity);
        let entry: VecDeque<Message> = messages[skip..].iter().cloned().collect();
        self.entries.insert(session_id.into(), entry);
    }

    /// Creates an empty entry unless one already exists.
    pub fn ensure_entry(&mut self, session_id: impl Into<String>) {
        self.entries.entry(session_id.into()).or_default();
    }

    /// Appends to an existing entry, evicting from the front past capacity.
    ///
    /// Returns false when the session has no entry; nothing is cached then.
    pub fn append(&mut self, session_id: &str, message: Message) -> bool {
        let Some(entry) = self.entries.get_mut(session_id) else {
            return false;
        };

        entry.push_back(message);
        while entry.len() > self.capacity {
            entry.pop_front();
            self.stats.evictions += 1;
        }
        true
    }

    /// Removes a session's entry entirely.
    pub fn purge(&mut self, session_id: &str) -> bool {
        let removed = self.entries.remove(session_id).is_some();
        if removed {
            self.stats.purges += 1;
        }
        removed
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.contains_key(session_id)
    }

    /// Number of cached messages for a session; 0 when it has no entry.
    pub fn len(&self, session_id: &str) -> usize {
        self.entries.get(session_id).map_or(0, VecDeque::len)
    }

    /// Cached messages without touching the hit/miss counters.
    pub fn peek(&self, session_id: &str) -> Option<&VecDeque<Message>> {
        self.entries.get(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Message {
        Message::user(format!("message {n}"))
    }

    #[test]
    fn test_append_evicts_oldest_first() {
        let mut cache = SessionCache::new(3);
        cache.ensure_entry("s1");
        for n in 0..5 {
            assert!(cache.append("s1", numbered(n)));
        }

        let contents: Vec<String> = cache
            .peek("s1")
            .unwrap()
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);
        assert_eq!(cache.stats().evictions, 2);
    }

    #[test]
    fn test_append_without_entry_is_ignored() {
        let mut cache = SessionCache::new(3);
        assert!(!cache.append("missing", numbered(0)));
        assert!(!cache.contains("missing"));
    }

    #[test]
    fn test_populate_keeps_newest_suffix() {
        let mut cache = SessionCache::new(100);
        let messages: Vec<Message> = (0..150).map(numbered).collect();
        cache.populate("s1", &messages);

        assert_eq!(cache.len("s1"), 100);
        assert_eq!(cache.peek("s1").unwrap().front().unwrap().content, "message 50");
    }

    #[test]
    fn test_empty_entry_counts_as_miss() {
        let mut cache = SessionCache::new(10);
        cache.ensure_entry("s1");
        assert!(cache.get("s1").is_none());

        cache.append("s1", numbered(0));
        assert_eq!(cache.get("s1").map(|m| m.len()), Some(1));

        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_purge_removes_entry() {
        let mut cache = SessionCache::new(10);
        cache.populate("s1", &[numbered(0)]);

        assert!(cache.purge("s1"));
        assert!(!cache.purge("s1"));
        assert_eq!(cache.len("s1"), 0);
        assert_eq!(cache.stats().purges, 1);
    }
}
