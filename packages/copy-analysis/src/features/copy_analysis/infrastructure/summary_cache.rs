//! LRU cache of callee analyses
//!
//! A callee's result depends on the caller state it starts from, the
//! arguments it receives and the chain of callers above it (which bounds how
//! deep it may descend), so all of those form the key.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::features::copy_analysis::application::context::ArgumentInfo;
use crate::features::copy_analysis::domain::{CopyAnalysisMap, ReturnValueAndPredicateKind};
use crate::shared::models::AnalysisEntity;

/// Structural cache key of one callee analysis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SummaryKey {
    pub callee: String,
    pub initial_data: CopyAnalysisMap,
    pub arguments: Vec<ArgumentInfo>,
    pub call_stack: Vec<String>,
}

/// What a call site needs from its callee's analysis
#[derive(Debug, Clone, PartialEq)]
pub struct InterproceduralSummary {
    /// Callee exit data (still including callee-owned entities)
    pub exit: CopyAnalysisMap,

    /// Whether the callee can return normally
    pub exit_reachable: bool,

    /// Return value with callee-owned entities already stripped
    pub return_value: Option<ReturnValueAndPredicateKind>,

    /// Callee parameters in ordinal order
    pub parameters: Vec<AnalysisEntity>,
}

impl InterproceduralSummary {
    pub fn parameter(&self, ordinal: usize) -> Option<&AnalysisEntity> {
        self.parameters.get(ordinal)
    }
}

/// LRU cache for callee summaries
pub struct SummaryCache {
    cache: LruCache<SummaryKey, InterproceduralSummary>,

    /// Cache hits counter
    hits: usize,

    /// Cache misses counter
    misses: usize,
}

impl SummaryCache {
    /// Create a cache holding at most `max_size` summaries (at least one)
    pub fn new(max_size: usize) -> Self {
        let capacity = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a summary; updates hit/miss statistics
    pub fn get(&mut self, key: &SummaryKey) -> Option<&InterproceduralSummary> {
        match self.cache.get(key) {
            Some(summary) => {
                self.hits += 1;
                Some(summary)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: SummaryKey, summary: InterproceduralSummary) {
        self.cache.put(key, summary);
    }

    pub fn contains(&self, key: &SummaryKey) -> bool {
        self.cache.contains(key)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Get cache hit rate (0.0-1.0)
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f32 / total as f32
        }
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Get cache statistics as a string
    pub fn stats(&self) -> String {
        format!(
            "Summary cache: {} entries, {} hits, {} misses, {:.2}% hit rate",
            self.len(),
            self.hits,
            self.misses,
            self.hit_rate() * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(callee: &str) -> SummaryKey {
        SummaryKey {
            callee: callee.to_string(),
            initial_data: CopyAnalysisMap::new(),
            arguments: Vec::new(),
            call_stack: vec!["Main".to_string()],
        }
    }

    fn summary() -> InterproceduralSummary {
        InterproceduralSummary {
            exit: CopyAnalysisMap::new(),
            exit_reachable: true,
            return_value: None,
            parameters: Vec::new(),
        }
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let mut cache = SummaryCache::new(4);
        assert!(cache.get(&key("A")).is_none());
        cache.put(key("A"), summary());
        assert!(cache.get(&key("A")).is_some());

        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert!((cache.hit_rate() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = SummaryCache::new(2);
        cache.put(key("A"), summary());
        cache.put(key("B"), summary());
        cache.get(&key("A"));
        cache.put(key("C"), summary());

        assert!(cache.contains(&key("A")));
        assert!(!cache.contains(&key("B")));
        assert!(cache.contains(&key("C")));
    }

    #[test]
    fn test_call_stack_is_part_of_key() {
        let mut cache = SummaryCache::new(4);
        cache.put(key("A"), summary());

        let mut deeper = key("A");
        deeper.call_stack.push("Helper".to_string());
        assert!(!cache.contains(&deeper));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut cache = SummaryCache::new(0);
        cache.put(key("A"), summary());
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), "Summary cache: 0 entries, 0 hits, 0 misses, 0.00% hit rate");
    }
}
