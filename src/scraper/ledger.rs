//! Accumulation state for the scroll-and-extract loop.

use std::collections::HashSet;

use crate::domain::Review;

/// Insertion-ordered, deduplicated accumulation of review records across
/// extraction passes, plus the idle-pass bookkeeping that ends the loop.
///
/// The id set and the record list always agree: an id is in the set iff
/// exactly one record carrying it is in the list, at its first-seen
/// position. Records are never updated after insertion; the first capture
/// wins, even across passes that see the same card again.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    reviews: Vec<Review>,
    seen: HashSet<String>,
    new_this_pass: usize,
    idle_passes: u32,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_pass(&mut self) {
        self.new_this_pass = 0;
    }

    /// True when `id` has not been captured yet. Checked before a card is
    /// parsed so already-seen cards cost nothing.
    pub fn is_new(&self, id: &str) -> bool {
        !self.seen.contains(id)
    }

    /// Insert a freshly parsed record. Returns false and keeps the first
    /// capture when the id is already present.
    pub fn insert(&mut self, review: Review) -> bool {
        if !self.seen.insert(review.id.clone()) {
            return false;
        }
        self.reviews.push(review);
        self.new_this_pass += 1;
        true
    }

    /// Close out a pass, updating the idle counter. Returns how many new
    /// records the pass inserted.
    pub fn end_pass(&mut self) -> usize {
        if self.new_this_pass == 0 {
            self.idle_passes += 1;
        } else {
            self.idle_passes = 0;
        }
        self.new_this_pass
    }

    /// True once `max_idle_passes` consecutive passes inserted nothing.
    pub fn exhausted(&self, max_idle_passes: u32) -> bool {
        self.idle_passes >= max_idle_passes
    }

    pub fn idle_passes(&self) -> u32 {
        self.idle_passes
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn into_reviews(self) -> Vec<Review> {
        self.reviews
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str) -> Review {
        Review::new(id, "Cafe Luna")
    }

    fn run_pass(ledger: &mut Ledger, ids: &[&str]) -> usize {
        ledger.begin_pass();
        for id in ids {
            if ledger.is_new(id) {
                ledger.insert(review(id));
            }
        }
        ledger.end_pass()
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut ledger = Ledger::new();
        let mut first = review("a");
        first.text = "first capture".into();
        assert!(ledger.insert(first));

        let mut second = review("a");
        second.text = "second capture".into();
        assert!(!ledger.insert(second));

        let reviews = ledger.into_reviews();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].text, "first capture");
    }

    #[test]
    fn test_overlapping_passes_accumulate_in_first_seen_order() {
        let mut ledger = Ledger::new();
        assert_eq!(run_pass(&mut ledger, &["a", "b", "c"]), 3);
        assert_eq!(run_pass(&mut ledger, &["c", "d"]), 1);
        assert_eq!(run_pass(&mut ledger, &[]), 0);

        let ids: Vec<String> = ledger
            .into_reviews()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_replaying_a_full_pass_is_idempotent() {
        let mut ledger = Ledger::new();
        run_pass(&mut ledger, &["a", "b", "c"]);
        run_pass(&mut ledger, &["a", "b", "c"]);
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_idle_counter_requires_consecutive_empty_passes() {
        let mut ledger = Ledger::new();
        run_pass(&mut ledger, &["a"]);
        run_pass(&mut ledger, &["a"]);
        assert_eq!(ledger.idle_passes(), 1);

        // A productive pass resets the streak.
        run_pass(&mut ledger, &["b"]);
        assert_eq!(ledger.idle_passes(), 0);

        for expected in 1..=5 {
            run_pass(&mut ledger, &["a", "b"]);
            assert_eq!(ledger.idle_passes(), expected);
        }
        assert!(ledger.exhausted(5));
    }

    #[test]
    fn test_exhausted_only_at_threshold() {
        let mut ledger = Ledger::new();
        for _ in 0..4 {
            run_pass(&mut ledger, &[]);
            assert!(!ledger.exhausted(5));
        }
        run_pass(&mut ledger, &[]);
        assert!(ledger.exhausted(5));
    }

    #[test]
    fn test_end_to_end_accumulation_scenario() {
        let mut ledger = Ledger::new();
        run_pass(&mut ledger, &["a", "b", "c"]);
        run_pass(&mut ledger, &["c", "d"]);
        let mut idle = 0;
        while !ledger.exhausted(5) {
            run_pass(&mut ledger, &[]);
            idle += 1;
        }
        assert_eq!(idle, 5);

        let reviews = ledger.into_reviews();
        assert_eq!(reviews.len(), 4);
        assert!(reviews.iter().all(|r| r.company_name == "Cafe Luna"));
    }
}
