//! Browser shell: canvas, input listeners, frame loop and console logging.
//!
//! The shell owns no game rules. Pointer presses and Space key-downs become
//! `trigger` calls, `setTimeout` runs the stage callbacks, and every animation frame
//! draws the [`Scene`] plus the score / APS overlay. The character is drawn with
//! placeholder shapes until real art lands.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, window};

use crate::clock::{Clock, Instant, PerformanceClock};
use crate::config::GameConfig;
use crate::input::PressGate;
use crate::pose::{Jitter, Offset, idle_offset};
use crate::scene::Scene;
use crate::scheduler::TimeoutScheduler;
use crate::score::{ScoreSink, ScoreUpdate};
use crate::sequencer::{CheekFrame, Hud, SlapSequencer, SlapVisual};

const CANVAS_ID: &str = "slap-canvas";
const CANVAS_W: u32 = 1280;
const CANVAS_H: u32 = 720;
const SLAP_KEY: &str = " ";

// --- Console logging --------------------------------------------------------

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = JsValue::from_str(&format!("[{}] {}", record.level(), record.args()));
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&line),
            log::Level::Warn => web_sys::console::warn_1(&line),
            log::Level::Info => web_sys::console::info_1(&line),
            log::Level::Debug | log::Level::Trace => web_sys::console::log_1(&line),
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route `log` records to the browser console. Later calls are no-ops.
pub fn init_logging(level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// --- Shell state ------------------------------------------------------------

/// Announces the first time a session passes the stored best.
struct BestAnnouncer {
    announced: bool,
}

impl ScoreSink for BestAnnouncer {
    fn on_score(&mut self, update: ScoreUpdate) {
        if update.is_new_high && !self.announced {
            self.announced = true;
            log::info!("New high score! ({})", update.score);
        }
    }
}

struct GameShell {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    clock: Rc<PerformanceClock>,
    config: GameConfig,
    sequencer: SlapSequencer<SlapVisual>,
    scene: Rc<RefCell<Scene>>,
    gate: PressGate,
    jitter: Jitter,
    idle: Offset,
    last_idle: Instant,
}

impl GameShell {
    fn slap(&mut self) {
        let now = self.clock.now();
        self.sequencer.trigger(now);
    }

    fn frame(&mut self) {
        let now = self.clock.now();
        let hud = self.sequencer.hud(now);
        if self.sequencer.is_busy() {
            self.idle = Offset::ZERO;
        } else if now.saturating_duration_since(self.last_idle) >= self.config.idle_interval() {
            self.idle = idle_offset(&mut self.jitter, self.config.idle_shake.amplitude_px);
            self.last_idle = now;
        }
        render(self, now, hud);
    }

    fn teardown(&mut self) {
        if self.sequencer.cancel() {
            self.scene.borrow_mut().reset();
        }
    }
}

thread_local! {
    static SHELL: RefCell<Option<GameShell>> = const { RefCell::new(None) };
    static LISTENERS_INSTALLED: Cell<bool> = const { Cell::new(false) };
    static LOOP_RUNNING: Cell<bool> = const { Cell::new(false) };
}

fn with_shell(f: impl FnOnce(&mut GameShell)) {
    SHELL.with(|cell| {
        if let Some(shell) = cell.borrow_mut().as_mut() {
            f(shell);
        }
    });
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn seed_jitter(clock: &PerformanceClock) -> Jitter {
    #[cfg(feature = "rng")]
    {
        let _ = clock;
        Jitter::from_entropy()
    }
    #[cfg(not(feature = "rng"))]
    {
        Jitter::new(clock.now().as_millis() ^ 0x9e37_79b9_7f4a_7c15)
    }
}

// --- Entry ------------------------------------------------------------------

/// Build the canvas and session from `config` and start (or restart) the game.
pub fn start(config: GameConfig) -> Result<(), JsValue> {
    config.validate().map_err(to_js)?;
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let canvas: HtmlCanvasElement = if let Some(el) = doc.get_element_by_id(CANVAS_ID) {
        el.dyn_into()?
    } else {
        let c: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
        c.set_id(CANVAS_ID);
        c.set_width(CANVAS_W);
        c.set_height(CANVAS_H);
        c.set_attribute("style", "display:block; margin:0 auto; max-width:100%; background:#34495e; touch-action:none;").ok();
        doc.body()
            .ok_or_else(|| JsValue::from_str("no body"))?
            .append_child(&c)?;
        c
    };
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let clock = Rc::new(PerformanceClock::new());
    let mut jitter = seed_jitter(&clock);
    let scene = Rc::new(RefCell::new(Scene::new(
        clock.clone(),
        config.impact_shake,
        Jitter::new(jitter.between(0, i32::MAX) as u64),
    )));
    let sequencer = SlapSequencer::from_config(&config, Rc::new(TimeoutScheduler::new()), scene.clone())
        .map_err(to_js)?
        .with_score_sink(BestAnnouncer { announced: false });

    let now = clock.now();
    let shell = GameShell {
        canvas: canvas.clone(),
        ctx,
        clock,
        config,
        sequencer,
        scene,
        gate: PressGate::new(),
        jitter,
        idle: Offset::ZERO,
        last_idle: now,
    };
    SHELL.with(|cell| {
        if let Some(mut old) = cell.borrow_mut().replace(shell) {
            old.teardown();
        }
    });

    if !LISTENERS_INSTALLED.with(|f| f.replace(true)) {
        install_listeners(&canvas)?;
    }
    if !LOOP_RUNNING.with(|f| f.replace(true)) {
        start_frame_loop();
    }
    log::info!("Slap Rush started! Click or press SPACE to slap.");
    Ok(())
}

/// Cancel any running slap and drop the session. The frame loop stops on its next tick.
pub fn stop() {
    SHELL.with(|cell| {
        if let Some(mut shell) = cell.borrow_mut().take() {
            shell.teardown();
        }
    });
}

fn install_listeners(canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;

    // Pointer covers mouse and touch.
    {
        let closure = Closure::wrap(Box::new(move |_evt: web_sys::MouseEvent| {
            with_shell(GameShell::slap);
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            let key = evt.key();
            if key != SLAP_KEY {
                return;
            }
            evt.prevent_default();
            if evt.repeat() {
                return;
            }
            with_shell(|shell| {
                if shell.gate.press(&key) {
                    shell.slap();
                }
            });
        }) as Box<dyn FnMut(_)>);
        win.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    {
        let closure = Closure::wrap(Box::new(move |evt: web_sys::KeyboardEvent| {
            let key = evt.key();
            with_shell(|shell| shell.gate.release(&key));
        }) as Box<dyn FnMut(_)>);
        win.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    // Key-ups are lost while the page is unfocused.
    {
        let closure = Closure::wrap(Box::new(move || {
            with_shell(|shell| shell.gate.release_all());
        }) as Box<dyn FnMut()>);
        win.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref())?;
        closure.forget();
    }
    Ok(())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

fn start_frame_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |_ts: f64| {
        let alive = SHELL.with(|cell| match cell.borrow_mut().as_mut() {
            Some(shell) => {
                shell.frame();
                true
            }
            None => false,
        });
        if !alive {
            // The closure is still running here, so it is not dropped; a restart
            // allocates a fresh loop.
            LOOP_RUNNING.with(|r| r.set(false));
            return;
        }
        if let Some(w) = window() {
            if let Some(cb) = f.borrow().as_ref() {
                let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
            }
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(w) = window() {
        if let Some(cb) = g.borrow().as_ref() {
            let _ = w.request_animation_frame(cb.as_ref().unchecked_ref());
        }
    }
}

// --- Rendering (placeholder art) --------------------------------------------

fn render(shell: &GameShell, now: Instant, hud: Hud) {
    let ctx = &shell.ctx;
    let w = shell.canvas.width() as f64;
    let h = shell.canvas.height() as f64;
    let scene = shell.scene.borrow();

    ctx.set_fill_style_str("#34495e");
    ctx.fill_rect(0.0, 0.0, w, h);

    let body = shell.config.pose.place(shell.idle + scene.shake_offset(now));

    // Character base
    ctx.set_fill_style_str("#ecf0f1");
    ctx.fill_rect(body.character.x - 100.0, body.character.y - 150.0, 200.0, 300.0);

    // Cheek
    ctx.begin_path();
    match scene.cheek() {
        CheekFrame::Normal => {
            ctx.set_fill_style_str("#ffb6c1");
            ctx.arc(body.cheek.x, body.cheek.y, 30.0, 0.0, std::f64::consts::TAU)
                .ok();
        }
        CheekFrame::Slapped => {
            ctx.set_fill_style_str("#ff69b4");
            ctx.ellipse(
                body.cheek_slapped.x,
                body.cheek_slapped.y,
                17.5,
                12.5,
                0.0,
                0.0,
                std::f64::consts::TAU,
            )
            .ok();
        }
    }
    ctx.fill();

    // Hand
    if let Some(hand) = scene.hand_position(now) {
        ctx.set_fill_style_str("#ffd700");
        ctx.fill_rect(hand.x - 40.0, hand.y - 50.0, 80.0, 100.0);
    }

    // Overlay
    ctx.set_text_align("left");
    ctx.set_fill_style_str("#ffffff");
    ctx.set_font("bold 24px sans-serif");
    ctx.fill_text(&format!("Score: {}", hud.score), 20.0, 44.0).ok();
    ctx.set_font("20px sans-serif");
    ctx.fill_text(&format!("APS: {}", hud.rate), 20.0, 74.0).ok();
    ctx.fill_text(&format!("Best: {}", hud.high_score), 20.0, 100.0).ok();
}
