//! Tunables for a slap session.
//!
//! Everything the sequencer and the shell need is plain data here, with defaults
//! matching the prototype. Under the `serde_json` feature a config can be loaded
//! from a (partial) JSON object; missing fields keep their defaults.

use core::time::Duration;

use crate::error::ConfigError;
use crate::pose::BasePose;
use crate::sequencer::{DurationCurve, SequenceVariant};

/// Idle shake: a fresh random offset every `interval_ms`, within `±amplitude_px`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdleShakeConfig {
    pub interval_ms: u64,
    pub amplitude_px: i32,
}

impl Default for IdleShakeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            amplitude_px: 1,
        }
    }
}

/// Impact shake: swing to a random peak within `±amplitude_px` and back, `cycles` times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImpactShakeConfig {
    pub amplitude_px: i32,
    pub half_period_ms: u64,
    pub cycles: u32,
}

impl Default for ImpactShakeConfig {
    fn default() -> Self {
        Self {
            amplitude_px: 8,
            half_period_ms: 50,
            cycles: 3,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GameConfig {
    /// Stage duration at zero rate.
    pub base_duration_ms: u64,
    /// Floor for the stage duration.
    pub min_duration_ms: u64,
    /// Stage duration shaved off per slap-per-second.
    pub speed_factor_ms: u64,
    pub rate_window_ms: u64,
    pub retention_ms: u64,
    pub variant: SequenceVariant,
    pub pose: BasePose,
    pub idle_shake: IdleShakeConfig,
    pub impact_shake: ImpactShakeConfig,
    /// Best score from a previous session, if the host keeps one.
    pub high_score: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            base_duration_ms: 300,
            min_duration_ms: 20,
            speed_factor_ms: 200,
            rate_window_ms: 1_000,
            retention_ms: 2_000,
            variant: SequenceVariant::default(),
            pose: BasePose::default(),
            idle_shake: IdleShakeConfig::default(),
            impact_shake: ImpactShakeConfig::default(),
            high_score: 0,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_window_ms == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.retention_ms < self.rate_window_ms {
            return Err(ConfigError::RetentionShorterThanWindow {
                window_ms: self.rate_window_ms,
                retention_ms: self.retention_ms,
            });
        }
        if self.min_duration_ms == 0 {
            return Err(ConfigError::ZeroMinDuration);
        }
        if self.min_duration_ms > self.base_duration_ms {
            return Err(ConfigError::MinAboveBase {
                min_ms: self.min_duration_ms,
                base_ms: self.base_duration_ms,
            });
        }
        Ok(())
    }

    #[cfg(feature = "serde_json")]
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn curve(&self) -> DurationCurve {
        DurationCurve::from_millis(
            self.base_duration_ms,
            self.min_duration_ms,
            self.speed_factor_ms,
        )
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn rate_retention(&self) -> Duration {
        Duration::from_millis(self.retention_ms)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_millis(self.idle_shake.interval_ms)
    }
}
