//! Mock hardware for host tests.
//!
//! [`MockHardware`] records every line operation and busy-wait so tests can check
//! exactly which pulses went out. Time only moves when the test calls
//! [`advance_ms`](MockHardware::advance_ms); busy-waits are recorded, not slept.

use embedded_hal::digital::PinState;
use heapless::Vec;

use crate::hal::{ControlLine, ServoHardware};
use crate::{Error, Result};

/// Recorded events before the log stops accepting more.
pub const MOCK_EVENT_CAPACITY: usize = 1024;

/// Something the engine did to the hardware.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineEvent {
    /// A line was configured as an output.
    Configured(ControlLine),
    /// A line was driven high or low.
    Driven(ControlLine, PinState),
    /// A busy-wait of this many microseconds.
    Delayed(u32),
}

/// [`ServoHardware`] that records what it is asked to do.
#[derive(Debug)]
pub struct MockHardware {
    now_ms: u32,
    line_count: u8,
    events: Vec<LineEvent, MOCK_EVENT_CAPACITY>,
    timer_starts: u32,
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHardware {
    /// Mock board with 32 control lines, clock at 0 ms.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_lines(32)
    }

    /// Mock board with control lines `0..line_count`.
    #[must_use]
    pub const fn with_lines(line_count: u8) -> Self {
        Self {
            now_ms: 0,
            line_count,
            events: Vec::new(),
            timer_starts: 0,
        }
    }

    /// Move the clock forward.
    pub const fn advance_ms(&mut self, ms: u32) {
        self.now_ms = self.now_ms.wrapping_add(ms);
    }

    /// Set the clock.
    pub const fn set_now_ms(&mut self, now_ms: u32) {
        self.now_ms = now_ms;
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn events(&self) -> &[LineEvent] {
        &self.events
    }

    /// Forget recorded events.
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// How often the tick timer was started.
    #[must_use]
    pub const fn timer_starts(&self) -> u32 {
        self.timer_starts
    }

    /// Widths of complete HIGH pulses on `line`, oldest first.
    #[must_use]
    pub fn pulse_widths(&self, line: ControlLine) -> Vec<u16, MOCK_EVENT_CAPACITY> {
        let mut widths = Vec::new();
        for window in self.events.windows(3) {
            match window {
                [
                    LineEvent::Driven(high_line, PinState::High),
                    LineEvent::Delayed(us),
                    LineEvent::Driven(low_line, PinState::Low),
                ] if *high_line == line && *low_line == line => {
                    let _ = widths.push(u16::try_from(*us).unwrap_or(u16::MAX));
                }
                _ => {}
            }
        }
        widths
    }

    /// Number of complete HIGH pulses on `line`.
    #[must_use]
    pub fn pulse_count(&self, line: ControlLine) -> usize {
        self.pulse_widths(line).len()
    }

    fn record(&mut self, event: LineEvent) {
        // A full log drops new events; tests that need more clear it.
        let _ = self.events.push(event);
    }
}

impl ServoHardware for MockHardware {
    fn configure_output(&mut self, line: ControlLine) -> Result<()> {
        if line.number() >= self.line_count {
            return Err(Error::UnknownLine(line.number()));
        }
        self.record(LineEvent::Configured(line));
        Ok(())
    }

    fn set_line(&mut self, line: ControlLine, state: PinState) {
        self.record(LineEvent::Driven(line, state));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(LineEvent::Delayed(us));
    }

    fn now_ms(&self) -> u32 {
        self.now_ms
    }

    fn start_tick_timer(&mut self) {
        self.timer_starts = self.timer_starts.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_widths_pair_high_delay_low_on_one_line() {
        let mut hardware = MockHardware::new();
        let line = ControlLine::from(2);
        let other = ControlLine::from(4);

        hardware.set_line(line, PinState::High);
        hardware.delay_us(1200);
        hardware.set_line(line, PinState::Low);
        hardware.set_line(other, PinState::High);
        hardware.delay_us(900);
        hardware.set_line(other, PinState::Low);

        assert_eq!(hardware.pulse_widths(line).as_slice(), &[1200]);
        assert_eq!(hardware.pulse_count(other), 1);
    }

    #[test]
    fn lines_past_the_board_are_unknown() {
        let mut hardware = MockHardware::with_lines(4);
        assert!(hardware.configure_output(ControlLine::from(3)).is_ok());
        assert_eq!(
            hardware.configure_output(ControlLine::from(4)),
            Err(Error::UnknownLine(4))
        );
        assert_eq!(
            hardware.events(),
            &[LineEvent::Configured(ControlLine::from(3))]
        );
    }
}
