//! Whole-device reset.

use crate::app::ports::ResetPort;

#[derive(Debug, Default)]
pub struct SystemReset {
    #[cfg(not(target_os = "espidf"))]
    count: u32,
}

impl SystemReset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulation: resets requested so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(target_os = "espidf")]
impl ResetPort for SystemReset {
    fn reset(&mut self) {
        log::warn!("System: restarting");
        // SAFETY: esp_restart does not return.
        unsafe { esp_idf_svc::sys::esp_restart() }
    }
}

#[cfg(not(target_os = "espidf"))]
impl ResetPort for SystemReset {
    fn reset(&mut self) {
        self.count = self.count.wrapping_add(1);
        log::warn!("System(sim): restart requested (#{})", self.count);
    }
}
