use core::convert::Infallible;

use crate::hal::gpio::{Output, Pin, PushPull};
use crate::hal::prelude::*;

use prbs_touch::DriveLineOutput;

/// Push-pull GPIOs driving the electrode rows, indexed by drive line
pub struct DriveLines<const LINES: usize> {
    pins: [Pin<Output<PushPull>>; LINES],
}

impl<const LINES: usize> DriveLines<LINES> {
    /// Take the pins and force them all low
    pub fn new(mut pins: [Pin<Output<PushPull>>; LINES]) -> Self {
        for pin in pins.iter_mut() {
            pin.set_low().ok();
        }
        Self { pins }
    }
}

impl<const LINES: usize> DriveLineOutput for DriveLines<LINES> {
    type Error = Infallible;

    fn set(&mut self, line: usize, high: bool) -> Result<(), Infallible> {
        match self.pins.get_mut(line) {
            Some(pin) if high => pin.set_high(),
            Some(pin) => pin.set_low(),
            None => Ok(()),
        }
    }

    fn settle(&mut self, ticks: u32) {
        cortex_m::asm::delay(ticks);
    }
}
