//! Rolling-window action rate ("slaps per second").
//!
//! The estimator keeps a log of accepted action timestamps. The reported rate is
//! the number of entries inside a trailing query window; history is kept for a
//! separate, longer retention horizon so the window can be read at any point
//! between pruning passes without undercounting.

use std::collections::VecDeque;
use core::time::Duration;

use crate::clock::Instant;

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(1);
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct RateEstimator {
    log: VecDeque<Instant>,
    window: Duration,
    retention: Duration,
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateEstimator {
    pub fn new() -> Self {
        Self {
            log: VecDeque::new(),
            window: DEFAULT_WINDOW,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Estimator with custom spans. `retention` is raised to `window` if shorter,
    /// since pruning inside the window would make `rate` undercount.
    pub fn with_spans(window: Duration, retention: Duration) -> Self {
        Self {
            log: VecDeque::new(),
            window,
            retention: retention.max(window),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Append an action timestamp.
    ///
    /// A reading earlier than the last entry is clamped to it; the log must stay
    /// non-decreasing for the window count and pruning to be exact.
    pub fn record(&mut self, now: Instant) {
        let at = match self.log.back() {
            Some(&last) if now < last => {
                log::warn!(
                    "clock went backwards ({}ms < {}ms); clamping",
                    now.as_millis(),
                    last.as_millis()
                );
                last
            }
            _ => now,
        };
        self.log.push_back(at);
    }

    /// Count of entries `t` with `now - window < t <= now`, using the configured window.
    pub fn rate(&self, now: Instant) -> u32 {
        self.rate_within(now, self.window)
    }

    /// Count of entries `t` with `now - window < t <= now`. When `now` is closer to the
    /// origin than `window`, every entry up to `now` counts.
    pub fn rate_within(&self, now: Instant, window: Duration) -> u32 {
        let floor = now.checked_sub(window);
        let count = self
            .log
            .iter()
            .rev()
            .skip_while(|&&t| t > now)
            .take_while(|&&t| floor.is_none_or(|f| t > f))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Drop entries `t <= now - retention`, using the configured retention.
    pub fn prune(&mut self, now: Instant) {
        self.prune_older_than(now, self.retention);
    }

    pub fn prune_older_than(&mut self, now: Instant, retention: Duration) {
        let Some(horizon) = now.checked_sub(retention) else {
            return;
        };
        while self.log.front().is_some_and(|&t| t <= horizon) {
            self.log.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub fn last(&self) -> Option<Instant> {
        self.log.back().copied()
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}
