use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// Position in completion order, starting at 0.
    pub seq: u64,
    pub prompt: String,
    pub response: String,
}

#[derive(Default)]
struct HistoryInner {
    entries: Vec<HistoryEntry>,
    next_seq: u64,
}

/// Append-only log of completed round trips, shared by every background unit.
///
/// Cloning yields another handle to the same log. Entries appear in the order
/// completions land, which need not match dispatch order.
#[derive(Clone, Default)]
pub struct SessionHistory {
    inner: Arc<Mutex<HistoryInner>>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        // Entries are plain data; a panicked writer cannot leave them half-built.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn append(&self, prompt: impl Into<String>, response: impl Into<String>) -> u64 {
        let mut inner = self.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push(HistoryEntry {
            seq,
            prompt: prompt.into(),
            response: response.into(),
        });
        seq
    }

    /// Snapshot in insertion order.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn last(&self) -> Option<HistoryEntry> {
        self.lock().entries.last().cloned()
    }

    /// Empties the log in one step. Sequence numbers keep counting.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        removed
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_insertion_order() {
        let history = SessionHistory::new();
        assert!(history.is_empty());
        assert_eq!(history.append("p1", "r1"), 0);
        assert_eq!(history.append("p2", "r2"), 1);

        let entries = history.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prompt, "p1");
        assert_eq!(entries[1].response, "r2");
        assert_eq!(history.last().map(|e| e.seq), Some(1));
    }

    #[test]
    fn test_clear_empties_but_keeps_counting() {
        let history = SessionHistory::new();
        history.append("a", "b");
        history.append("c", "d");
        assert_eq!(history.clear(), 2);
        assert!(history.is_empty());
        assert_eq!(history.append("e", "f"), 2);
    }

    #[test]
    fn test_concurrent_appends_from_threads() {
        let history = SessionHistory::new();
        let handles: Vec<_> = (0..8)
            .map(|thread| {
                let history = history.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        history.append(format!("t{thread}-p{i}"), "r");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let entries = history.entries();
        assert_eq!(entries.len(), 400);
        let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, (0..400).collect::<Vec<u64>>());
    }

    #[test]
    fn test_to_json_lists_entries() {
        let history = SessionHistory::new();
        history.append("prompt", "response");
        let json = history.to_json().expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["prompt"], "prompt");
        assert_eq!(value[0]["seq"], 0);
    }
}
