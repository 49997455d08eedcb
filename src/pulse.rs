//! Timed control pulses.
//!
//! A hobby servo reads its target angle from the width of a HIGH pulse repeated
//! roughly every 20 ms. Pulses here are bit-banged: drive the line high,
//! busy-wait the width, drive it low. Interrupts stay masked for the whole
//! pulse so a timer tick cannot stretch it or toggle the same line.

use embedded_hal::digital::PinState;

use crate::hal::{ControlLine, ServoHardware};
use crate::throttle::Throttle;
use crate::{Error, Result};

/// Default pulse width for 0 degrees (microseconds).
pub const PULSE_MIN_US_DEFAULT: u16 = 500;

/// Default pulse width for 180 degrees (microseconds).
pub const PULSE_MAX_US_DEFAULT: u16 = 2_400;

/// Full travel of a positional servo (degrees).
pub const FULL_RANGE_DEGREES: u8 = 180;

/// Minimum time between two pulses on one servo (milliseconds).
pub const PULSE_REFRESH_INTERVAL_MS: u32 = 21;

/// Pulse widths for 0 and 180 degrees.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseRange {
    min_us: u16,
    max_us: u16,
}

impl Default for PulseRange {
    fn default() -> Self {
        Self {
            min_us: PULSE_MIN_US_DEFAULT,
            max_us: PULSE_MAX_US_DEFAULT,
        }
    }
}

impl PulseRange {
    /// Create a range mapping 0 degrees to `min_us` and 180 degrees to `max_us`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPulseRange`] unless `min_us < max_us`.
    pub const fn new(min_us: u16, max_us: u16) -> Result<Self> {
        if min_us >= max_us {
            return Err(Error::InvalidPulseRange { min_us, max_us });
        }
        Ok(Self { min_us, max_us })
    }

    /// Pulse width for 0 degrees.
    #[must_use]
    pub const fn min_us(self) -> u16 {
        self.min_us
    }

    /// Pulse width for 180 degrees.
    #[must_use]
    pub const fn max_us(self) -> u16 {
        self.max_us
    }

    /// Linear map of `degrees` (0..=180, larger values are capped) onto the range.
    #[must_use]
    pub fn width_us(self, degrees: u8) -> u16 {
        let degrees = u32::from(degrees.min(FULL_RANGE_DEGREES));
        let span = u32::from(self.max_us.saturating_sub(self.min_us));
        let offset = degrees
            .saturating_mul(span)
            .checked_div(u32::from(FULL_RANGE_DEGREES))
            .unwrap_or(0);
        // offset <= span, so the sum stays within max_us.
        u16::try_from(offset).map_or(self.max_us, |offset| self.min_us.saturating_add(offset))
    }
}

/// Emits pulses for one servo, at most once per [`PULSE_REFRESH_INTERVAL_MS`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct PulseGenerator {
    range: PulseRange,
    throttle: Throttle,
}

impl Default for PulseGenerator {
    fn default() -> Self {
        Self {
            range: PulseRange::default(),
            throttle: Throttle::new(PULSE_REFRESH_INTERVAL_MS),
        }
    }
}

impl PulseGenerator {
    pub(crate) const fn range(&self) -> PulseRange {
        self.range
    }

    pub(crate) const fn set_range(&mut self, range: PulseRange) {
        self.range = range;
    }

    /// Emit a pulse for `degrees`. Returns whether the line was driven.
    pub(crate) fn emit_degrees<H: ServoHardware>(
        &mut self,
        hardware: &mut H,
        line: ControlLine,
        degrees: u8,
    ) -> bool {
        let width_us = self.range.width_us(degrees);
        self.emit(hardware, line, width_us)
    }

    /// Emit one HIGH pulse of exactly `width_us`. Returns whether the line was driven;
    /// a pulse inside the refresh interval is dropped without touching the line.
    pub(crate) fn emit<H: ServoHardware>(
        &mut self,
        hardware: &mut H,
        line: ControlLine,
        width_us: u16,
    ) -> bool {
        if !self.throttle.ready(hardware.now_ms()) {
            return false;
        }

        critical_section::with(|_| {
            hardware.set_line(line, PinState::High);
            hardware.delay_us(u32::from(width_us));
            hardware.set_line(line, PinState::Low);
        });
        self.throttle.mark(hardware.now_ms());
        trace!("pulse line={} width={}us", line.number(), width_us);
        true
    }
}
