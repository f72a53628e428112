//! One-shot ignore-mode expiry timer on ESP-IDF's esp_timer API.
//!
//! The callback runs in the esp_timer task (not ISR) and only calls
//! [`IgnoreController::on_timer_expired`], which is a single atomic store.
//! On simulation targets the timer records what it was asked to do; tests
//! fire expiry by hand.

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use core::sync::atomic::AtomicPtr;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::app::ignore::IgnoreController;
use crate::app::ports::OneShotTimer;
#[cfg(target_os = "espidf")]
use crate::drivers::hw_init::HwInitError;

/// Sentinel for "not armed" in `armed_ms`.
const DISARMED: u32 = 0;

pub struct IgnoreExpiryTimer {
    /// Duration of the pending one-shot, `DISARMED` when none.
    armed_ms: AtomicU32,
    #[cfg(target_os = "espidf")]
    handle: AtomicPtr<esp_timer>,
}

impl Default for IgnoreExpiryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreExpiryTimer {
    pub const fn new() -> Self {
        Self {
            armed_ms: AtomicU32::new(DISARMED),
            #[cfg(target_os = "espidf")]
            handle: AtomicPtr::new(core::ptr::null_mut()),
        }
    }

    /// Pending one-shot duration, if armed.
    pub fn armed_ms(&self) -> Option<u32> {
        match self.armed_ms.load(Ordering::Acquire) {
            DISARMED => None,
            ms => Some(ms),
        }
    }

    fn mark_fired(&self) {
        self.armed_ms.store(DISARMED, Ordering::Release);
    }
}

// ── ESP-IDF ───────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn expiry_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static IgnoreController` registered in
    // `create()`; statics are never freed.
    let ctl = unsafe { &*(arg as *const IgnoreController<IgnoreExpiryTimer>) };
    ctl.timer().mark_fired();
    ctl.on_timer_expired();
}

#[cfg(target_os = "espidf")]
impl IgnoreExpiryTimer {
    /// Create the underlying esp_timer, wired to `owner`.  Call once at boot
    /// before the button ISR is attached.
    pub fn create(
        owner: &'static IgnoreController<IgnoreExpiryTimer>,
    ) -> Result<(), HwInitError> {
        let args = esp_timer_create_args_t {
            callback: Some(expiry_cb),
            arg: owner as *const _ as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"ignore_expiry".as_ptr(),
            skip_unhandled_events: false,
        };
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        // SAFETY: args outlives the call; handle is written by esp_timer_create.
        let ret = unsafe { esp_timer_create(&args, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerCreateFailed(ret));
        }
        owner.timer().handle.store(handle, Ordering::Release);
        log::info!("hw_timer: ignore expiry timer created");
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl OneShotTimer for IgnoreExpiryTimer {
    fn arm(&self, duration_ms: u32) {
        let handle = self.handle.load(Ordering::Acquire);
        if handle.is_null() {
            return;
        }
        self.armed_ms.store(duration_ms.max(1), Ordering::Release);
        // SAFETY: handle came from esp_timer_create and is never deleted.
        unsafe {
            esp_timer_start_once(handle, u64::from(duration_ms) * 1_000);
        }
    }

    fn cancel(&self) {
        self.armed_ms.store(DISARMED, Ordering::Release);
        let handle = self.handle.load(Ordering::Acquire);
        if !handle.is_null() {
            // SAFETY: as above.  ESP_ERR_INVALID_STATE (not running) is fine.
            unsafe {
                esp_timer_stop(handle);
            }
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl IgnoreExpiryTimer {
    /// Simulated expiry: what the esp_timer callback does on hardware.
    pub fn fire(owner: &IgnoreController<IgnoreExpiryTimer>) {
        if owner.timer().armed_ms().is_some() {
            owner.timer().mark_fired();
            owner.on_timer_expired();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl OneShotTimer for IgnoreExpiryTimer {
    fn arm(&self, duration_ms: u32) {
        self.armed_ms.store(duration_ms.max(1), Ordering::Release);
    }

    fn cancel(&self) {
        self.armed_ms.store(DISARMED, Ordering::Release);
    }
}
