use rand::Rng;
use std::collections::HashSet;

use quiz_core::model::QuizId;

/// State of one `play` round: the ids not asked yet and the running score.
///
/// Ids are drawn uniformly and removed as they are drawn, so no quiz is asked
/// twice in the same round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayRound {
    pending: Vec<QuizId>,
    score: u32,
}

impl PlayRound {
    /// Start a round over a snapshot of ids. Duplicates are dropped.
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = QuizId>) -> Self {
        let mut seen = HashSet::new();
        let pending = ids.into_iter().filter(|id| seen.insert(*id)).collect();
        Self { pending, score: 0 }
    }

    /// Pick and remove one pending id, or `None` once the round is exhausted.
    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<QuizId> {
        if self.pending.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..self.pending.len());
        Some(self.pending.swap_remove(idx))
    }

    pub fn record_correct(&mut self) {
        self.score = self.score.saturating_add(1);
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}
