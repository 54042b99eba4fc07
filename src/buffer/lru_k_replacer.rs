use std::collections::{HashMap, VecDeque};

use crate::common::{PageId, Timestamp};

/// Access history of one cached page
#[derive(Debug)]
struct AccessHistory {
    /// Most recent access at the back, at most k entries
    history: VecDeque<Timestamp>,
}

impl AccessHistory {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }

    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance, or None (+inf) with fewer than k accesses
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    fn earliest_timestamp(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

/// LRU-K ranking of cached pages.
///
/// The victim is the candidate with the largest backward k-distance
/// (time since its k-th most recent access). Pages with fewer than k
/// accesses count as +inf; ties among them go to the earliest access.
///
/// The replacer does not know which pages may be evicted: callers pass a
/// predicate to [`LruKReplacer::evict`] and only pages it accepts are
/// considered. The buffer pool uses this to skip dirty pages.
///
/// Not internally synchronized; the owner keeps it behind its cache mutex.
pub struct LruKReplacer {
    k: usize,
    current_timestamp: Timestamp,
    pages: HashMap<PageId, AccessHistory>,
}

impl LruKReplacer {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            current_timestamp: 0,
            pages: HashMap::new(),
        }
    }

    /// Records an access to `page_id`, starting to track it if new.
    pub fn record_access(&mut self, page_id: PageId) {
        let timestamp = self.current_timestamp;
        self.current_timestamp += 1;

        self.pages
            .entry(page_id)
            .or_insert_with(AccessHistory::new)
            .record_access(timestamp, self.k);
    }

    /// Picks and stops tracking the best-ranked page accepted by
    /// `is_candidate`. Returns None when no tracked page qualifies.
    pub fn evict<F>(&mut self, mut is_candidate: F) -> Option<PageId>
    where
        F: FnMut(&PageId) -> bool,
    {
        let now = self.current_timestamp;

        let mut victim: Option<(PageId, Option<Timestamp>, Option<Timestamp>)> = None;

        for (page_id, info) in self.pages.iter() {
            if !is_candidate(page_id) {
                continue;
            }

            let k_dist = info.k_distance(now, self.k);
            let earliest = info.earliest_timestamp();

            let better = match &victim {
                None => true,
                Some((_, v_dist, v_earliest)) => match (v_dist, k_dist) {
                    (None, Some(_)) => false,
                    (Some(_), None) => true,
                    (None, None) => earliest < *v_earliest,
                    (Some(v), Some(c)) => c > *v,
                },
            };

            if better {
                victim = Some((*page_id, k_dist, earliest));
            }
        }

        let (page_id, _, _) = victim?;
        self.pages.remove(&page_id);
        Some(page_id)
    }

    /// Stops tracking a page (discarded or reloaded).
    pub fn remove(&mut self, page_id: PageId) {
        self.pages.remove(&page_id);
    }

    /// Number of tracked pages.
    pub fn size(&self) -> usize {
        self.pages.len()
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId::new(1), n)
    }

    #[test]
    fn test_evict_empty() {
        let mut replacer = LruKReplacer::new(2);
        assert_eq!(replacer.evict(|_| true), None);
        assert_eq!(replacer.k(), 2);
    }

    #[test]
    fn test_infinite_distance_first_then_earliest() {
        let mut replacer = LruKReplacer::new(2);

        replacer.record_access(pid(0));
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));
        replacer.record_access(pid(2));

        // pid(1) and pid(2) have one access (+inf); pid(1) was touched first
        assert_eq!(replacer.evict(|_| true), Some(pid(1)));
        assert_eq!(replacer.evict(|_| true), Some(pid(2)));
        assert_eq!(replacer.evict(|_| true), Some(pid(0)));
        assert_eq!(replacer.size(), 0);
    }

    #[test]
    fn test_largest_k_distance() {
        let mut replacer = LruKReplacer::new(2);

        for n in 0..3 {
            replacer.record_access(pid(n));
            replacer.record_access(pid(n));
        }
        // Page 0 is now the most recently used twice over
        replacer.record_access(pid(0));
        replacer.record_access(pid(0));

        assert_eq!(replacer.evict(|_| true), Some(pid(1)));
    }

    #[test]
    fn test_predicate_filters_candidates() {
        let mut replacer = LruKReplacer::new(2);
        replacer.record_access(pid(0));
        replacer.record_access(pid(1));

        assert_eq!(replacer.evict(|p| *p != pid(0)), Some(pid(1)));
        assert_eq!(replacer.evict(|p| *p != pid(0)), None);
        assert_eq!(replacer.size(), 1);
    }

    #[test]
    fn test_remove() {
        let mut replacer = LruKReplacer::new(2);
        replacer.record_access(pid(0));
        replacer.remove(pid(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(|_| true), None);
    }
}
