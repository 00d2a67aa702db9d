//! Configuration errors. The slap core itself has no error path; a rejected
//! trigger is an ordinary [`crate::Outcome::Ignored`].

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("rate window must be longer than 0ms")]
    ZeroWindow,

    #[error("retention {retention_ms}ms is shorter than the rate window {window_ms}ms")]
    RetentionShorterThanWindow { window_ms: u64, retention_ms: u64 },

    #[error("minimum stage duration must be longer than 0ms")]
    ZeroMinDuration,

    #[error("minimum stage duration {min_ms}ms exceeds base duration {base_ms}ms")]
    MinAboveBase { min_ms: u64, base_ms: u64 },

    #[cfg(feature = "serde_json")]
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}
