// SPDX-FileCopyrightText: 2026 BlueCon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, append-only log of seen persistent ids.

use serde::{Deserialize, Serialize};

/// Ordered log of persistent ids, oldest first.
///
/// With a limit set, appending past the limit evicts the oldest ids. The
/// push provider only redelivers recent messages, so the most recent
/// window is what protects against reprocessing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentIdLog {
    ids: Vec<String>,
}

impl PersistentIdLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|seen| seen == id)
    }

    /// Appends `id` unless already present. Returns whether the log changed.
    pub fn append(&mut self, id: &str, max_ids: Option<usize>) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        if let Some(max) = max_ids
            && max > 0
            && self.ids.len() > max
        {
            let excess = self.ids.len() - max;
            self.ids.drain(..excess);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn append_skips_duplicates() {
        let mut log = PersistentIdLog::new();
        assert!(log.append("a", None));
        assert!(!log.append("a", None));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn limit_evicts_oldest_first() {
        let mut log = PersistentIdLog::new();
        for id in ["a", "b", "c", "d"] {
            log.append(id, Some(3));
        }
        assert_eq!(log.to_vec(), vec!["b", "c", "d"]);
        assert!(!log.contains("a"));
    }

    #[test]
    fn zero_limit_means_unbounded() {
        let mut log = PersistentIdLog::new();
        for i in 0..50 {
            log.append(&i.to_string(), Some(0));
        }
        assert_eq!(log.len(), 50);
    }

    proptest! {
        #[test]
        fn log_never_holds_duplicates_and_respects_limit(
            ids in proptest::collection::vec("[a-e]{1,2}", 0..64),
            max in 1usize..16,
        ) {
            let mut log = PersistentIdLog::new();
            for id in &ids {
                log.append(id, Some(max));
            }
            let all = log.to_vec();
            let mut dedup = all.clone();
            dedup.sort();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), all.len());
            prop_assert!(all.len() <= max);
        }

        #[test]
        fn most_recent_id_is_always_retained(
            ids in proptest::collection::vec("[a-z]{1,3}", 1..64),
            max in 1usize..16,
        ) {
            let mut log = PersistentIdLog::new();
            for id in &ids {
                log.append(id, Some(max));
                prop_assert!(log.contains(id));
            }
        }
    }
}
