//! Quest Dirty Tracking
//!
//! Tasks signal here whenever a player's progress or completion changes so
//! dependent state (sync, UI, persistence) can be recomputed.

use std::collections::BTreeSet;

/// Sink for "this quest's computed state is stale" notifications
pub trait QuestCache {
    fn mark_quest_dirty(&mut self, quest_id: &str);
}

/// Collects dirty quest ids until drained
#[derive(Debug, Clone, Default)]
pub struct DirtyQuests {
    dirty: BTreeSet<String>,
}

impl DirtyQuests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dirty(&self, quest_id: &str) -> bool {
        self.dirty.contains(quest_id)
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    /// Take every dirty id, leaving the set empty
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}

impl QuestCache for DirtyQuests {
    fn mark_quest_dirty(&mut self, quest_id: &str) {
        if !self.dirty.contains(quest_id) {
            self.dirty.insert(quest_id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain() {
        let mut cache = DirtyQuests::new();
        cache.mark_quest_dirty("b");
        cache.mark_quest_dirty("a");
        cache.mark_quest_dirty("b");
        assert_eq!(cache.len(), 2);
        assert!(cache.is_dirty("a"));

        assert_eq!(cache.drain(), vec!["a".to_string(), "b".to_string()]);
        assert!(cache.is_empty());
    }
}
