//! Millisecond instants and the clock seam.
//!
//! `std::time::Instant` is not available on `wasm32-unknown-unknown`, so the core
//! works with its own monotonic millisecond counter. In the browser it is fed from
//! `performance.now()`; in tests from a [`crate::scheduler::VirtualTimeline`].

use core::time::Duration;

/// Monotonic instant with millisecond resolution, measured from an arbitrary origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant(u64);

impl Instant {
    pub const ZERO: Instant = Instant(0);

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// `self - span`, or `None` when that would fall before the origin.
    pub fn checked_sub(self, span: Duration) -> Option<Instant> {
        self.0.checked_sub(duration_ms(span)).map(Instant)
    }

    pub fn saturating_add(self, span: Duration) -> Instant {
        Instant(self.0.saturating_add(duration_ms(span)))
    }

    /// Elapsed time since `earlier`; zero if `earlier` is actually later.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

fn duration_ms(span: Duration) -> u64 {
    u64::try_from(span.as_millis()).unwrap_or(u64::MAX)
}

/// Source of "now" for the core.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Browser clock backed by `performance.now()`.
///
/// Readings are clamped so the clock never runs backwards, even if the
/// performance timer is unavailable for a frame and reads as zero.
#[derive(Default)]
pub struct PerformanceClock {
    last: std::cell::Cell<u64>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Instant {
        let raw = web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or(0.0);
        let ms = (raw.max(0.0) as u64).max(self.last.get());
        self.last.set(ms);
        Instant(ms)
    }
}
