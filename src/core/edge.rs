//! Edge detection on the per-tick decision.

/// Remembers the last decision so repeats are suppressed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EdgeState {
    last_decision: Option<bool>,
}

impl EdgeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `decision`; returns it if it differs from the previous one (or is the first).
    pub fn observe(&mut self, decision: bool) -> Option<bool> {
        if self.last_decision == Some(decision) {
            return None;
        }
        self.last_decision = Some(decision);
        Some(decision)
    }

    pub fn last_decision(&self) -> Option<bool> {
        self.last_decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_decision_is_an_edge() {
        let mut edge = EdgeState::new();
        assert_eq!(edge.last_decision(), None);
        assert_eq!(edge.observe(false), Some(false));
        assert_eq!(edge.observe(false), None);
        assert_eq!(edge.observe(true), Some(true));
        assert_eq!(edge.last_decision(), Some(true));
    }

    proptest! {
        #[test]
        fn prop_edges_match_changes(decisions in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut edge = EdgeState::new();
            let emitted = decisions.iter().filter_map(|d| edge.observe(*d)).count();

            let changes = decisions.windows(2).filter(|w| w[0] != w[1]).count();
            let expected = if decisions.is_empty() { 0 } else { changes + 1 };
            prop_assert_eq!(emitted, expected);
        }
    }
}
