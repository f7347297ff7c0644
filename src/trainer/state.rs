use std::collections::{BTreeSet, HashSet, VecDeque};

/// Per-session bookkeeping of which word ids may still be drawn.
///
/// Two independent exclusions apply: the last `window` sampled ids are
/// skipped for the next draw, and mastered ids are gone for good.
#[derive(Debug, Clone)]
pub struct SessionState {
    working_set: BTreeSet<u32>,
    recency: VecDeque<u32>,
    window: usize,
    mastered: HashSet<u32>,
}

impl SessionState {
    pub fn new(ids: impl IntoIterator<Item = u32>, window: usize) -> Self {
        Self {
            working_set: ids.into_iter().collect(),
            recency: VecDeque::with_capacity(window),
            window,
            mastered: HashSet::new(),
        }
    }

    /// Ids the next draw may pick from. When the recency window would
    /// exclude every remaining id, its oldest entries are ignored until at
    /// least one id is eligible; empty only when the working set is.
    pub fn eligible(&self) -> Vec<u32> {
        for keep in (0..=self.recency.len()).rev() {
            let excluded: HashSet<u32> = self.recency.iter().rev().take(keep).copied().collect();
            let eligible: Vec<u32> = self
                .working_set
                .iter()
                .copied()
                .filter(|id| !excluded.contains(id))
                .collect();
            if !eligible.is_empty() || keep == 0 {
                return eligible;
            }
        }
        Vec::new()
    }

    /// Remembers a drawn id, keeping only the most recent `window` of them.
    pub fn record_sampled(&mut self, id: u32) {
        if self.window == 0 {
            return;
        }
        self.recency.push_back(id);
        while self.recency.len() > self.window {
            self.recency.pop_front();
        }
    }

    /// Removes an id from the working set for the rest of the session.
    pub fn master(&mut self, id: u32) {
        if self.working_set.remove(&id) {
            self.mastered.insert(id);
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.working_set.is_empty()
    }

    pub fn working_set(&self) -> &BTreeSet<u32> {
        &self.working_set
    }

    pub fn recency_len(&self) -> usize {
        self.recency.len()
    }

    pub fn is_mastered(&self, id: u32) -> bool {
        self.mastered.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_recent_ids_are_excluded() {
        let mut state = SessionState::new(0..5, 2);
        state.record_sampled(1);
        state.record_sampled(3);
        assert_eq!(state.eligible(), vec![0, 2, 4]);

        state.record_sampled(4);
        assert_eq!(state.recency_len(), 2);
        assert_eq!(state.eligible(), vec![0, 1, 2]);
    }

    #[test]
    fn test_window_shrinks_instead_of_stalling() {
        let mut state = SessionState::new(0..3, 10);
        state.record_sampled(0);
        state.record_sampled(1);
        state.record_sampled(2);
        // Everything is recent; the oldest recent id becomes drawable again.
        assert_eq!(state.eligible(), vec![0]);

        let mut single = SessionState::new([7], 3);
        single.record_sampled(7);
        assert_eq!(single.eligible(), vec![7]);
    }

    #[test]
    fn test_zero_window_excludes_nothing() {
        let mut state = SessionState::new(0..2, 0);
        state.record_sampled(0);
        assert_eq!(state.recency_len(), 0);
        assert_eq!(state.eligible(), vec![0, 1]);
    }

    #[test]
    fn test_mastery_removes_for_good() {
        let mut state = SessionState::new(0..2, 1);
        state.master(0);
        assert!(state.is_mastered(0));
        state.record_sampled(1);
        assert_eq!(state.eligible(), vec![1]);

        state.master(1);
        assert!(state.is_exhausted());
        assert!(state.eligible().is_empty());
    }

    proptest! {
        #[test]
        fn prop_recency_bounded_and_last_excluded(
            size in 2u32..30,
            window in 1usize..10,
            draws in proptest::collection::vec(0u32..30, 1..60),
        ) {
            let mut state = SessionState::new(0..size, window);
            for draw in draws {
                let id = draw % size;
                state.record_sampled(id);
                prop_assert!(state.recency_len() <= window);
                prop_assert!(!state.eligible().contains(&id));
            }
        }

        #[test]
        fn prop_mastered_ids_never_return(
            size in 1u32..20,
            mastered in proptest::collection::vec(0u32..20, 0..20),
            draws in proptest::collection::vec(0u32..20, 0..40),
        ) {
            let mut state = SessionState::new(0..size, 3);
            for id in &mastered {
                state.master(*id);
            }
            for draw in draws {
                state.record_sampled(draw % size);
                let eligible = state.eligible();
                for id in &mastered {
                    prop_assert!(!eligible.contains(id));
                    prop_assert!(!state.working_set().contains(id));
                }
            }
        }
    }
}
