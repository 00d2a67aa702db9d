//! Deferred callback scheduling.
//!
//! The sequencer never sleeps or polls; it hands each stage to a [`Scheduler`] as a
//! one-shot callback. Two implementations live here: [`VirtualTimeline`], a
//! deterministic clock + scheduler pair driven by the host (and by every test), and
//! [`TimeoutScheduler`], which forwards to the browser's `setTimeout`.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use core::time::Duration;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::clock::{Clock, Instant};

pub type Callback = Box<dyn FnOnce()>;

/// Opaque id of a scheduled callback, only meaningful to the scheduler that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// "Run this after `delay`" primitive.
///
/// Callbacks registered with non-decreasing delays must run in registration order.
pub trait Scheduler {
    fn after(&self, delay: Duration, callback: Callback) -> TimerHandle;

    /// Drop a pending callback. Unknown or already-fired handles are ignored.
    fn cancel(&self, handle: TimerHandle);
}

// --- Virtual timeline -------------------------------------------------------

/// Host-driven time source and scheduler.
///
/// Time only moves when [`VirtualTimeline::advance_to`] is called. Due callbacks fire
/// in `(due, registration)` order, and while one is running [`Clock::now`] reads its
/// due instant, so callbacks scheduled from inside a callback are relative to the
/// moment it fired.
#[derive(Default)]
pub struct VirtualTimeline {
    now: Cell<Instant>,
    next_seq: Cell<u64>,
    pending: RefCell<BTreeMap<(Instant, u64), Callback>>,
}

impl VirtualTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: Instant) -> Self {
        let timeline = Self::default();
        timeline.now.set(start);
        timeline
    }

    /// Fire everything due at or before `target`, then park the clock at `target`.
    /// Returns the number of callbacks that ran. Moving backwards is a no-op.
    pub fn advance_to(&self, target: Instant) -> usize {
        let mut fired = 0;
        loop {
            // Release the borrow before running the callback; it may schedule more.
            let next = {
                let mut pending = self.pending.borrow_mut();
                match pending.first_key_value() {
                    Some((&(due, _), _)) if due <= target => pending.pop_first(),
                    _ => None,
                }
            };
            let Some(((due, _), callback)) = next else { break };
            if due > self.now.get() {
                self.now.set(due);
            }
            callback();
            fired += 1;
        }
        if target > self.now.get() {
            self.now.set(target);
        }
        fired
    }

    pub fn advance(&self, by: Duration) -> usize {
        self.advance_to(self.now.get().saturating_add(by))
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Due instant of the earliest pending callback.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.borrow().first_key_value().map(|(&(due, _), _)| due)
    }
}

impl Clock for VirtualTimeline {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl Scheduler for VirtualTimeline {
    fn after(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        let due = self.now.get().saturating_add(delay);
        self.pending.borrow_mut().insert((due, seq), callback);
        TimerHandle(seq)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending
            .borrow_mut()
            .retain(|&(_, seq), _| seq != handle.0);
    }
}

// --- Browser setTimeout -----------------------------------------------------

/// Values kept alive until their timer has run or been cancelled.
///
/// A finished callback cannot drop its own closure while it is still on the stack, so
/// it only reports its key; the entry is released on the next `after` or `cancel`.
struct Retained<T> {
    live: RefCell<HashMap<u64, T>>,
    finished: Rc<RefCell<Vec<u64>>>,
}

impl<T> Default for Retained<T> {
    fn default() -> Self {
        Self {
            live: RefCell::new(HashMap::new()),
            finished: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T> Retained<T> {
    fn finished_list(&self) -> Rc<RefCell<Vec<u64>>> {
        self.finished.clone()
    }

    fn insert(&self, key: u64, value: T) {
        self.collect();
        self.live.borrow_mut().insert(key, value);
    }

    fn release(&self, key: u64) -> Option<T> {
        self.collect();
        self.live.borrow_mut().remove(&key)
    }

    fn collect(&self) {
        let done = std::mem::take(&mut *self.finished.borrow_mut());
        if done.is_empty() {
            return;
        }
        let mut live = self.live.borrow_mut();
        for key in done {
            live.remove(&key);
        }
    }

    fn len(&self) -> usize {
        self.live.borrow().len()
    }
}

/// Scheduler backed by `window.setTimeout`.
///
/// Browsers run timeouts with equal or increasing delays in registration order,
/// which is all the sequencer relies on. Each closure is owned here until it has
/// run or its timeout was cleared. A timeout that cannot be registered is logged and
/// dropped; the caller stays in whatever state it was waiting in.
#[derive(Default)]
pub struct TimeoutScheduler {
    next_key: Cell<u64>,
    timers: Retained<(i32, Closure<dyn FnMut()>)>,
}

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closures still owned by the scheduler.
    pub fn retained(&self) -> usize {
        self.timers.len()
    }
}

impl Scheduler for TimeoutScheduler {
    fn after(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let key = self.next_key.get();
        self.next_key.set(key + 1);
        let Some(win) = web_sys::window() else {
            log::warn!("setTimeout unavailable: no window");
            return TimerHandle(key);
        };
        let ms = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        let finished = self.timers.finished_list();
        let closure: Closure<dyn FnMut()> = Closure::once(move || {
            callback();
            finished.borrow_mut().push(key);
        });
        match win.set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            ms,
        ) {
            Ok(id) => self.timers.insert(key, (id, closure)),
            Err(err) => log::warn!("setTimeout failed: {:?}", err),
        }
        TimerHandle(key)
    }

    fn cancel(&self, handle: TimerHandle) {
        let Some((id, _closure)) = self.timers.release(handle.0) else {
            return;
        };
        if let Some(win) = web_sys::window() {
            win.clear_timeout_with_handle(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<(&'static str, u64)>>>, impl Fn(&'static str, &Rc<VirtualTimeline>) -> Callback) {
        let log: Rc<RefCell<Vec<(&'static str, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |tag: &'static str, tl: &Rc<VirtualTimeline>| -> Callback {
            let sink = sink.clone();
            let tl = tl.clone();
            Box::new(move || sink.borrow_mut().push((tag, tl.now().as_millis())))
        };
        (log, make)
    }

    #[test]
    fn fires_in_due_then_registration_order() {
        let tl = Rc::new(VirtualTimeline::new());
        let (log, make) = recorder();
        tl.after(Duration::from_millis(20), make("late", &tl));
        tl.after(Duration::from_millis(10), make("a", &tl));
        tl.after(Duration::from_millis(10), make("b", &tl));
        assert_eq!(tl.advance_to(Instant::from_millis(15)), 2);
        assert_eq!(*log.borrow(), vec![("a", 10), ("b", 10)]);
        assert_eq!(tl.now(), Instant::from_millis(15));
        tl.advance(Duration::from_millis(100));
        assert_eq!(log.borrow().last(), Some(&("late", 20)));
        assert_eq!(tl.pending(), 0);
    }

    #[test]
    fn cancelled_callback_never_runs() {
        let tl = Rc::new(VirtualTimeline::new());
        let (log, make) = recorder();
        let h = tl.after(Duration::from_millis(5), make("x", &tl));
        tl.after(Duration::from_millis(6), make("y", &tl));
        tl.cancel(h);
        tl.advance(Duration::from_millis(10));
        assert_eq!(*log.borrow(), vec![("y", 6)]);
    }

    #[test]
    fn nested_scheduling_is_relative_to_fire_time() {
        let tl = Rc::new(VirtualTimeline::new());
        let hits = Rc::new(Cell::new(0u64));
        let (tl2, hits2) = (tl.clone(), hits.clone());
        tl.after(
            Duration::from_millis(10),
            Box::new(move || {
                let hits3 = hits2.clone();
                let tl3 = tl2.clone();
                tl2.after(
                    Duration::from_millis(10),
                    Box::new(move || hits3.set(tl3.now().as_millis())),
                );
            }),
        );
        tl.advance_to(Instant::from_millis(100));
        assert_eq!(hits.get(), 20);
    }

    #[test]
    fn advancing_backwards_keeps_time() {
        let tl = VirtualTimeline::starting_at(Instant::from_millis(50));
        assert_eq!(tl.advance_to(Instant::from_millis(10)), 0);
        assert_eq!(tl.now(), Instant::from_millis(50));
        assert_eq!(tl.next_due(), None);
    }

    #[test]
    fn retained_values_are_released_once_finished_or_cancelled() {
        let kept: Retained<&'static str> = Retained::default();
        kept.insert(0, "first");
        kept.insert(1, "second");
        kept.insert(2, "third");
        assert_eq!(kept.len(), 3);

        kept.finished_list().borrow_mut().push(0);
        // Still owned until the next insert or release.
        assert_eq!(kept.len(), 3);
        assert_eq!(kept.release(2), Some("third"));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.release(0), None);
        assert_eq!(kept.release(2), None);

        kept.finished_list().borrow_mut().push(1);
        kept.insert(3, "fourth");
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.release(3), Some("fourth"));
    }
}
