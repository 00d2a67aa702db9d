//! Session score and high-score tracking.
//!
//! Persisting the high score is the host's business; the scoreboard only seeds
//! from a previous best and flags when the running score passes it.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub score: u64,
    pub is_new_high: bool,
}

/// Receives every accepted score change.
pub trait ScoreSink {
    fn on_score(&mut self, update: ScoreUpdate);
}

/// Sink that drops updates, for hosts that only read the score from the HUD.
pub struct NullScoreSink;

impl ScoreSink for NullScoreSink {
    fn on_score(&mut self, _update: ScoreUpdate) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scoreboard {
    score: u64,
    high_score: u64,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session against a best score loaded from elsewhere.
    pub fn with_high_score(high_score: u64) -> Self {
        Self {
            score: 0,
            high_score,
        }
    }

    pub fn increment(&mut self) -> ScoreUpdate {
        self.score = self.score.saturating_add(1);
        let is_new_high = self.score > self.high_score;
        if is_new_high {
            self.high_score = self.score;
        }
        ScoreUpdate {
            score: self.score,
            is_new_high,
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    /// New session: score back to zero, best kept.
    pub fn restart(&mut self) {
        self.score = 0;
    }
}
