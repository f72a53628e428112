//! Activity LED driver.
//!
//! Lit while a request is being served.  Generic over any
//! `embedded_hal` [`OutputPin`]; on the board that is [`GpioOutput`], a
//! raw-GPIO pin configured by `hw_init`.  On host/test the pin write is a
//! no-op and only the in-memory state is tracked.

use core::convert::Infallible;

use embedded_hal::digital::{Error as _, ErrorType, OutputPin};
use log::warn;

use crate::app::ports::IndicatorPort;
use crate::drivers::hw_init;

/// Output GPIO already configured by [`hw_init::init_peripherals`].
pub struct GpioOutput {
    pin: i32,
}

impl GpioOutput {
    pub fn new(pin: i32) -> Self {
        Self { pin }
    }
}

impl ErrorType for GpioOutput {
    type Error = Infallible;
}

impl OutputPin for GpioOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        hw_init::gpio_write(self.pin, true);
        Ok(())
    }
}

pub struct ActivityLed<P> {
    pin: P,
    lit: bool,
}

impl<P: OutputPin> ActivityLed<P> {
    pub fn new(pin: P) -> Self {
        Self { pin, lit: false }
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> IndicatorPort for ActivityLed<P> {
    fn set_active(&mut self, on: bool) {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        match res {
            Ok(()) => self.lit = on,
            Err(e) => warn!("LED: pin write failed ({:?})", e.kind()),
        }
    }
}
