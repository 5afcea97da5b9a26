//! N+1 navigation detection.
//!
//! Navigating a relationship one parent at a time costs one query per
//! parent. The tracker counts those navigations per (table, relationship)
//! and logs a warning pointing at [`Session::prefetch`](crate::Session::prefetch)
//! once a threshold is reached.

use std::collections::HashMap;
use std::panic::Location;

const TARGET: &str = "multicol::n1";

/// Where a single-parent navigation was requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub table: &'static str,
    pub relationship: &'static str,
    pub file: &'static str,
    pub line: u32,
}

/// Counters reported by [`N1QueryTracker::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct N1Stats {
    /// Navigations recorded.
    pub total_loads: usize,
    /// Distinct (table, relationship) pairs navigated.
    pub relationships_loaded: usize,
    /// Pairs at or above the threshold.
    pub potential_n1: usize,
}

/// Counts single-parent navigations per relationship.
#[derive(Debug)]
pub struct N1QueryTracker {
    counts: HashMap<(&'static str, &'static str), usize>,
    threshold: usize,
    enabled: bool,
    call_sites: Vec<CallSite>,
}

impl Default for N1QueryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl N1QueryTracker {
    /// A tracker warning at the third navigation of a relationship.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            threshold: 3,
            enabled: true,
            call_sites: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Record one navigation of `relationship` from a `table` row.
    ///
    /// The warning fires once, when the count reaches the threshold.
    #[track_caller]
    pub fn record_load(&mut self, table: &'static str, relationship: &'static str) {
        if !self.enabled {
            return;
        }
        let count = self.counts.entry((table, relationship)).or_insert(0);
        *count += 1;
        let count = *count;

        let caller = Location::caller();
        self.call_sites.push(CallSite {
            table,
            relationship,
            file: caller.file(),
            line: caller.line(),
        });

        if count == self.threshold {
            self.emit_warning(table, relationship, count);
        }
    }

    fn emit_warning(&self, table: &'static str, relationship: &'static str, count: usize) {
        tracing::warn!(
            target: TARGET,
            table,
            relationship,
            queries = count,
            threshold = self.threshold,
            "N+1 navigation pattern detected; load the relationship for all rows with Session::prefetch()"
        );
        let sites = self
            .call_sites
            .iter()
            .filter(|s| s.table == table && s.relationship == relationship)
            .take(5);
        for (index, site) in sites.enumerate() {
            tracing::debug!(target: TARGET, index, file = site.file, line = site.line, "navigation call site");
        }
    }

    /// Forget all counts and call sites.
    pub fn reset(&mut self) {
        self.counts.clear();
        self.call_sites.clear();
    }

    pub fn count_for(&self, table: &str, relationship: &str) -> usize {
        self.counts
            .iter()
            .find(|((t, r), _)| *t == table && *r == relationship)
            .map_or(0, |(_, count)| *count)
    }

    pub fn stats(&self) -> N1Stats {
        N1Stats {
            total_loads: self.counts.values().sum(),
            relationships_loaded: self.counts.len(),
            potential_n1: self
                .counts
                .values()
                .filter(|&&count| count >= self.threshold)
                .count(),
        }
    }

    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tracker = N1QueryTracker::new();
        assert_eq!(tracker.threshold(), 3);
        assert!(tracker.is_enabled());
        assert_eq!(tracker.stats(), N1Stats::default());
    }

    #[test]
    fn test_counts_per_relationship() {
        let mut tracker = N1QueryTracker::new();
        tracker.record_load("membership", "person");
        tracker.record_load("membership", "person");
        tracker.record_load("group", "members");

        assert_eq!(tracker.count_for("membership", "person"), 2);
        assert_eq!(tracker.count_for("group", "members"), 1);
        assert_eq!(tracker.count_for("person", "groups"), 0);
    }

    #[test]
    fn test_disabled_tracker_records_nothing() {
        let mut tracker = N1QueryTracker::new();
        tracker.disable();
        tracker.record_load("membership", "person");
        assert_eq!(tracker.count_for("membership", "person"), 0);
        assert!(tracker.call_sites().is_empty());

        tracker.enable();
        tracker.record_load("membership", "person");
        assert_eq!(tracker.count_for("membership", "person"), 1);
    }

    #[test]
    fn test_stats_and_threshold() {
        let mut tracker = N1QueryTracker::new().with_threshold(2);
        tracker.record_load("membership", "person");
        tracker.record_load("membership", "person");
        tracker.record_load("person", "groups");

        let stats = tracker.stats();
        assert_eq!(stats.total_loads, 3);
        assert_eq!(stats.relationships_loaded, 2);
        assert_eq!(stats.potential_n1, 1);
    }

    #[test]
    fn test_call_site_points_at_caller() {
        let mut tracker = N1QueryTracker::new();
        tracker.record_load("person", "membership_set");
        let site = &tracker.call_sites()[0];
        assert_eq!(site.relationship, "membership_set");
        assert!(site.file.ends_with("n1_detection.rs"));
        assert!(site.line > 0);
    }

    #[test]
    fn test_reset() {
        let mut tracker = N1QueryTracker::new();
        tracker.record_load("person", "groups");
        tracker.reset();
        assert_eq!(tracker.stats().total_loads, 0);
        assert!(tracker.call_sites().is_empty());
    }
}
