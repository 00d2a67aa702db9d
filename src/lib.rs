//! Slap Rush core crate.
//!
//! A clicker prototype: every slap scores a point, and the slap animation speeds up
//! the faster the player slaps. The interesting part is pure Rust and runs natively:
//! the rolling-window [`RateEstimator`], the rate → stage duration [`DurationCurve`]
//! and the [`SlapSequencer`] state machine that plays one animation episode at a time
//! through an injected [`Scheduler`]. The `web` module is the browser shell that
//! wires those pieces to a canvas, `setTimeout` and `requestAnimationFrame`.

use wasm_bindgen::prelude::*;

pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod pose;
pub mod rate;
pub mod scene;
pub mod scheduler;
pub mod score;
pub mod sequencer;
mod web;

pub use clock::{Clock, Instant, PerformanceClock};
pub use config::GameConfig;
pub use error::ConfigError;
pub use rate::RateEstimator;
pub use scheduler::{Scheduler, TimerHandle, TimeoutScheduler, VirtualTimeline};
pub use score::{ScoreSink, ScoreUpdate, Scoreboard};
pub use sequencer::{
    DurationCurve, Hud, Outcome, SequenceVariant, SequencerState, SlapSequencer, SlapVisual,
    Stage, StageTiming, VisualSink,
};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    web::init_logging(if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    });
}

// -----------------------------------------------------------------------------
// JS entrypoints
// -----------------------------------------------------------------------------

#[wasm_bindgen]
pub fn start_game() -> Result<(), JsValue> {
    web::start(GameConfig::default())
}

/// Start with a JSON config object; omitted fields keep their defaults.
#[cfg(feature = "serde_json")]
#[wasm_bindgen]
pub fn start_game_with_config(json: &str) -> Result<(), JsValue> {
    let config = GameConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
    web::start(config)
}

/// Scene teardown: cancel the running slap and stop the frame loop.
#[wasm_bindgen]
pub fn stop_game() {
    web::stop();
}
