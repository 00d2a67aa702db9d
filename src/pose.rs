//! Character placement and shake offsets.
//!
//! Positions are never mutated in place. The character has one immutable
//! [`BasePose`]; every frame the drawn position is `base + offset`, where the offset
//! comes from a pure function of a jitter sample or of the time since impact. Idle
//! shake therefore cannot walk the character off its anchor over time.

use core::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, by: Offset) -> Point {
        Point::new(self.x + by.dx as f64, self.y + by.dy as f64)
    }

    /// Linear interpolation, `t` clamped to 0..=1.
    pub fn lerp(self, to: Point, t: f64) -> Point {
        let t = t.clamp(0.0, 1.0);
        Point::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }
}

/// Whole-pixel displacement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { dx: 0, dy: 0 };

    pub const fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

impl core::ops::Add for Offset {
    type Output = Offset;

    fn add(self, rhs: Offset) -> Offset {
        Offset::new(self.dx + rhs.dx, self.dy + rhs.dy)
    }
}

/// Cubic ease-out on `t` in 0..=1 (fast start, soft landing).
pub fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - t.clamp(0.0, 1.0);
    1.0 - inv * inv * inv
}

/// Anchor positions for the character and the hand's off-screen marks.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasePose {
    pub character: Point,
    pub cheek: Point,
    pub cheek_slapped: Point,
    /// Where the hand appears before the approach and returns to after the retract.
    pub hand_start: Point,
    /// Retract end point; a little lower than the start for follow-through.
    pub hand_follow_through: Point,
}

impl Default for BasePose {
    fn default() -> Self {
        Self {
            character: Point::new(400.0, 300.0),
            cheek: Point::new(350.0, 280.0),
            cheek_slapped: Point::new(350.0, 285.0),
            hand_start: Point::new(600.0, 280.0),
            hand_follow_through: Point::new(600.0, 320.0),
        }
    }
}

/// Drawn positions for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedBody {
    pub character: Point,
    pub cheek: Point,
    pub cheek_slapped: Point,
}

impl BasePose {
    pub fn place(&self, offset: Offset) -> PlacedBody {
        PlacedBody {
            character: self.character.offset(offset),
            cheek: self.cheek.offset(offset),
            cheek_slapped: self.cheek_slapped.offset(offset),
        }
    }
}

// --- Jitter -----------------------------------------------------------------

/// Small deterministic pseudo-random source for shake offsets (not crypto secure).
#[derive(Clone, Debug)]
pub struct Jitter {
    state: u64,
}

impl Jitter {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the browser RNG.
    #[cfg(feature = "rng")]
    pub fn from_entropy() -> Self {
        let mut buf = [0u8; 8];
        match getrandom::getrandom(&mut buf) {
            Ok(()) => Self::new(u64::from_le_bytes(buf)),
            Err(err) => {
                log::warn!("getrandom failed ({err}); using fixed jitter seed");
                Self::new(0x5eed)
            }
        }
    }

    fn next_u32(&mut self) -> u32 {
        // Knuth MMIX LCG; the high bits are the well-mixed ones.
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.state >> 33) as u32
    }

    /// Uniform integer in `lo..=hi` (arguments may be given in either order).
    pub fn between(&mut self, lo: i32, hi: i32) -> i32 {
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
        let span = (hi as i64 - lo as i64 + 1) as u64;
        (lo as i64 + (self.next_u32() as u64 % span) as i64) as i32
    }
}

// --- Shake ------------------------------------------------------------------

/// Random idle displacement within `±amplitude` on each axis.
pub fn idle_offset(jitter: &mut Jitter, amplitude: i32) -> Offset {
    let a = amplitude.abs();
    Offset::new(jitter.between(-a, a), jitter.between(-a, a))
}

/// Impact shake parameters: the body swings out to a random peak and back
/// (`half_period` each way), `cycles` times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImpactShake {
    pub peak: Offset,
    pub half_period: Duration,
    pub cycles: u32,
}

impl ImpactShake {
    pub fn roll(jitter: &mut Jitter, amplitude: i32, half_period: Duration, cycles: u32) -> Self {
        let a = amplitude.abs();
        Self {
            peak: Offset::new(jitter.between(-a, a), jitter.between(-a, a)),
            half_period,
            cycles,
        }
    }

    pub fn total(&self) -> Duration {
        self.half_period.saturating_mul(2).saturating_mul(self.cycles)
    }

    /// Offset `elapsed` after impact. Triangle wave 0 → peak → 0 per cycle; zero once
    /// all cycles are done.
    pub fn offset_at(&self, elapsed: Duration) -> Offset {
        let half = self.half_period.as_millis() as u64;
        if half == 0 || elapsed >= self.total() {
            return Offset::ZERO;
        }
        let pos = elapsed.as_millis() as u64 % (2 * half);
        let frac = if pos <= half {
            pos as f64 / half as f64
        } else {
            (2 * half - pos) as f64 / half as f64
        };
        Offset::new(
            (self.peak.dx as f64 * frac).round() as i32,
            (self.peak.dy as f64 * frac).round() as i32,
        )
    }
}
