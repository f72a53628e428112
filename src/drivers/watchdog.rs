//! Task Watchdog Timer (TWDT) driver.
//!
//! Wraps the ESP-IDF TWDT API so the device resets if the supervisor loop
//! stops feeding it.  The timeout comes from config and is applied when the
//! supervisor arms the watchdog after starting the WiFi join.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

use crate::app::ports::WatchdogPort;

#[derive(Default)]
pub struct TaskWatchdog {
    subscribed: bool,
    timeout_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    feeds: u32,
}

impl TaskWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.subscribed
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Simulation: number of feeds since arming.
    #[cfg(not(target_os = "espidf"))]
    pub fn feeds(&self) -> u32 {
        self.feeds
    }
}

#[cfg(target_os = "espidf")]
impl WatchdogPort for TaskWatchdog {
    /// Reconfigure the TWDT and subscribe the calling task.  Re-arming
    /// after a restart-less re-bootstrap only updates the timeout.
    fn arm(&mut self, timeout_ms: u32) {
        // SAFETY: TWDT calls from the main task; cfg outlives the call.
        unsafe {
            let cfg = esp_task_wdt_config_t {
                timeout_ms,
                idle_core_mask: 0,
                trigger_panic: true,
            };
            let ret = esp_task_wdt_reconfigure(&cfg);
            if ret != ESP_OK as i32 {
                log::warn!("Watchdog: reconfigure returned {} (may already be configured)", ret);
            }

            if !self.subscribed {
                let ret = esp_task_wdt_add(core::ptr::null_mut());
                self.subscribed = ret == ESP_OK as i32;
                if !self.subscribed {
                    log::warn!("Watchdog: failed to subscribe ({})", ret);
                    return;
                }
            }
        }
        self.timeout_ms = timeout_ms;
        info!("Watchdog: armed ({} ms timeout, panic on trigger)", timeout_ms);
    }

    fn feed(&mut self) {
        if self.subscribed {
            // SAFETY: the current task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl WatchdogPort for TaskWatchdog {
    fn arm(&mut self, timeout_ms: u32) {
        self.subscribed = true;
        self.timeout_ms = timeout_ms;
        self.feeds = 0;
        info!("Watchdog(sim): armed ({} ms)", timeout_ms);
    }

    fn feed(&mut self) {
        if self.subscribed {
            self.feeds = self.feeds.wrapping_add(1);
        }
    }
}
