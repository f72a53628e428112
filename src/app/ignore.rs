//! Ignore-mode controller.
//!
//! Lets a technician suppress object-temperature reporting for a bounded
//! window by holding the front-panel button, or remotely through the
//! `/ignore` and `/reset` control paths.
//!
//! ```text
//!            long press / "/ignore"
//!   ┌──────┐ ─────────────────────────▶ ┌──────────────────┐
//!   │ Idle │                            │ Active(expiry)   │ ─┐ long press /
//!   └──────┘ ◀───────────────────────── └──────────────────┘ ◀┘ "/ignore" (re-arm)
//!            timer expiry / "/reset"
//! ```
//!
//! ## Contexts
//!
//! [`on_button_edge`](IgnoreController::on_button_edge) runs in the GPIO
//! ISR, [`on_timer_expired`](IgnoreController::on_timer_expired) in the
//! esp_timer task, and the request handler reads and forces state from the
//! main loop.  Everything here is lock-free atomics; nothing allocates or
//! touches the bus or network stack.
//!
//! The state is one `AtomicU32` word: `0` is Idle, any other value is the
//! expiry tick with its low bit forced high (so it can never collide with
//! Idle).  A single store is the whole transition, so readers never see a
//! flag without its expiry.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use log::info;

use crate::app::ports::OneShotTimer;

/// A release this long after an accepted press activates ignore mode.
pub const LONG_PRESS_MS: u32 = 2_000;
/// Releases shorter than this are contact bounce.
pub const GLITCH_MS: u32 = 500;
/// Minimum quiet time after a release before a new press is accepted.
pub const REARM_MS: u32 = 1_000;

const IDLE_WORD: u32 = 0;

/// Observable ignore-mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreMode {
    Idle,
    Active { expiry_ms: u32 },
}

/// Raw button transition.  The switch is active-low, so `Pressed` is the
/// falling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Pressed,
    Released,
}

/// How the gesture tracker classified an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    /// Press accepted as the start of a gesture.
    PressAccepted,
    /// Press arrived within [`REARM_MS`] of the last release.
    PressRejected,
    /// Release with no accepted press outstanding.
    StrayRelease,
    /// Release within [`GLITCH_MS`]; bounce.
    Bounce,
    /// Release in (`GLITCH_MS`, `LONG_PRESS_MS`]; no-op.
    ShortPress,
    /// Release after more than [`LONG_PRESS_MS`]; activates ignore mode.
    LongPress,
}

/// Who requested a transition.  Logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Button,
    Remote,
}

// ───────────────────────────────────────────────────────────────
// Gesture tracker
// ───────────────────────────────────────────────────────────────

/// Edge timestamps for one press cycle.  Written only from the ISR.
struct GestureTracker {
    press_pending: AtomicBool,
    pressed_at_ms: AtomicU32,
    has_released: AtomicBool,
    released_at_ms: AtomicU32,
}

impl GestureTracker {
    const fn new() -> Self {
        Self {
            press_pending: AtomicBool::new(false),
            pressed_at_ms: AtomicU32::new(0),
            has_released: AtomicBool::new(false),
            released_at_ms: AtomicU32::new(0),
        }
    }

    fn observe(&self, edge: ButtonEdge, now_ms: u32) -> Gesture {
        match edge {
            ButtonEdge::Pressed => {
                if self.has_released.load(Ordering::Acquire) {
                    let quiet = now_ms.wrapping_sub(self.released_at_ms.load(Ordering::Relaxed));
                    if quiet < REARM_MS {
                        return Gesture::PressRejected;
                    }
                }
                self.pressed_at_ms.store(now_ms, Ordering::Relaxed);
                self.press_pending.store(true, Ordering::Release);
                Gesture::PressAccepted
            }
            ButtonEdge::Released => {
                self.released_at_ms.store(now_ms, Ordering::Relaxed);
                self.has_released.store(true, Ordering::Release);

                if !self.press_pending.swap(false, Ordering::AcqRel) {
                    return Gesture::StrayRelease;
                }
                let held = now_ms.wrapping_sub(self.pressed_at_ms.load(Ordering::Relaxed));
                if held > LONG_PRESS_MS {
                    Gesture::LongPress
                } else if held > GLITCH_MS {
                    Gesture::ShortPress
                } else {
                    Gesture::Bounce
                }
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// Process-wide ignore-mode state plus the timer that ends it.
///
/// `const`-constructible so firmware can keep one in a `static` and hand
/// `&'static` references to the ISR and timer callbacks.
pub struct IgnoreController<T> {
    state: AtomicU32,
    duration_ms: AtomicU32,
    gesture: GestureTracker,
    timer: T,
}

impl<T: OneShotTimer> IgnoreController<T> {
    pub const fn new(timer: T, duration_ms: u32) -> Self {
        Self {
            state: AtomicU32::new(IDLE_WORD),
            duration_ms: AtomicU32::new(duration_ms),
            gesture: GestureTracker::new(),
            timer,
        }
    }

    /// Change the active window length.  Applies to the next activation.
    pub fn set_duration_ms(&self, duration_ms: u32) {
        self.duration_ms.store(duration_ms, Ordering::Relaxed);
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms.load(Ordering::Relaxed)
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Current state.  Never blocks.
    pub fn mode(&self) -> IgnoreMode {
        match self.state.load(Ordering::Acquire) {
            IDLE_WORD => IgnoreMode::Idle,
            expiry_ms => IgnoreMode::Active { expiry_ms },
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) != IDLE_WORD
    }

    /// Milliseconds until expiry, `None` when idle.
    pub fn remaining_ms(&self, now_ms: u32) -> Option<u32> {
        match self.mode() {
            IgnoreMode::Idle => None,
            IgnoreMode::Active { expiry_ms } => {
                let left = expiry_ms.wrapping_sub(now_ms);
                // A deadline already behind us reads as a huge wrapped value.
                // The forced low bit can add one tick on top of the window.
                Some(if left > self.duration_ms().saturating_add(1) { 0 } else { left })
            }
        }
    }

    /// Enter (or extend) ignore mode and (re)arm the expiry timer.
    ///
    /// Order matters: the old deadline is cancelled before the new state is
    /// published, so a stale expiry cannot clear this activation.
    pub fn activate(&self, now_ms: u32, trigger: Trigger) {
        let duration = self.duration_ms();
        self.timer.cancel();
        self.state
            .store(now_ms.wrapping_add(duration) | 1, Ordering::Release);
        self.timer.arm(duration);
        if trigger != Trigger::Button {
            info!("Ignore: active for {}s ({:?})", duration / 1_000, trigger);
        }
    }

    /// Leave ignore mode immediately and drop the pending expiry.
    pub fn reset(&self, trigger: Trigger) {
        let was_active = self.state.swap(IDLE_WORD, Ordering::AcqRel) != IDLE_WORD;
        self.timer.cancel();
        if was_active && trigger != Trigger::Button {
            info!("Ignore: cleared ({:?})", trigger);
        }
    }

    /// Expiry timer callback.  Unconditional and idempotent.
    pub fn on_timer_expired(&self) {
        self.state.store(IDLE_WORD, Ordering::Release);
    }

    /// Button edge callback.  ISR-safe: no logging, no allocation.
    pub fn on_button_edge(&self, edge: ButtonEdge, now_ms: u32) -> Gesture {
        let gesture = self.gesture.observe(edge, now_ms);
        if gesture == Gesture::LongPress {
            self.activate(now_ms, Trigger::Button);
        }
        gesture
    }
}
