//! Hardware the servo engine needs, and adapters onto `embedded-hal`.
//!
//! The engine never touches registers or pins directly. Everything goes through
//! [`ServoHardware`]: a digital output per control line, a millisecond clock, a
//! microsecond busy-wait, and the shared periodic tick timer.
//!
//! [`HalBoard`] builds a [`ServoHardware`] from `embedded-hal` output pins and a
//! delay, plus a [`MillisClock`] and a [`TickTimer`]. Host tests use
//! `mock::MockHardware` instead.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};

use crate::timer::TickTimer;
use crate::{Error, Result};

/// Identifier of a servo control line (a GPIO number on most boards).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlLine(u8);

impl ControlLine {
    /// Line number as an index.
    #[must_use]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Line number.
    #[must_use]
    pub const fn number(self) -> u8 {
        self.0
    }
}

impl From<u8> for ControlLine {
    fn from(number: u8) -> Self {
        Self(number)
    }
}

impl TryFrom<i32> for ControlLine {
    type Error = Error;

    fn try_from(number: i32) -> Result<Self> {
        u8::try_from(number)
            .map(Self)
            .map_err(|_| Error::InvalidLine(number))
    }
}

/// Monotonic millisecond clock. The value wraps; callers only compare differences.
pub trait MillisClock {
    /// Milliseconds since some fixed point.
    fn now_ms(&self) -> u32;
}

/// Everything the servo engine needs from the board.
pub trait ServoHardware {
    /// Configure `line` as a digital output, driven low.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownLine`] if the board has no such output.
    fn configure_output(&mut self, line: ControlLine) -> Result<()>;

    /// Drive `line` high or low.
    fn set_line(&mut self, line: ControlLine, state: PinState);

    /// Busy-wait for `us` microseconds.
    fn delay_us(&mut self, us: u32);

    /// Current time in wrapping milliseconds.
    fn now_ms(&self) -> u32;

    /// Start the shared periodic tick interrupt. Must be safe to call repeatedly.
    fn start_tick_timer(&mut self);
}

/// [`ServoHardware`] built from `embedded-hal` pins, where control line `n` is `pins[n]`.
pub struct HalBoard<P, D, C, T, const LINES: usize> {
    pins: [P; LINES],
    delay: D,
    clock: C,
    timer: T,
}

impl<P, D, C, T, const LINES: usize> HalBoard<P, D, C, T, LINES>
where
    P: OutputPin,
    D: DelayNs,
    C: MillisClock,
    T: TickTimer,
{
    /// Create a board from its output pins, a busy-wait delay, a clock and the tick timer.
    pub const fn new(pins: [P; LINES], delay: D, clock: C, timer: T) -> Self {
        Self {
            pins,
            delay,
            clock,
            timer,
        }
    }

    /// The tick timer.
    pub const fn timer(&self) -> &T {
        &self.timer
    }
}

impl<P, D, C, T, const LINES: usize> ServoHardware for HalBoard<P, D, C, T, LINES>
where
    P: OutputPin,
    D: DelayNs,
    C: MillisClock,
    T: TickTimer,
{
    fn configure_output(&mut self, line: ControlLine) -> Result<()> {
        let pin = self
            .pins
            .get_mut(line.index())
            .ok_or(Error::UnknownLine(line.number()))?;
        if pin.set_low().is_err() {
            warn!("HalBoard: line {} did not accept set_low", line.number());
        }
        Ok(())
    }

    fn set_line(&mut self, line: ControlLine, state: PinState) {
        if let Some(pin) = self.pins.get_mut(line.index()) {
            // A failed drive costs one pulse; the next refresh retries.
            if pin.set_state(state).is_err() {
                warn!("HalBoard: line {} did not accept {}", line.number(), state);
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn now_ms(&self) -> u32 {
        self.clock.now_ms()
    }

    fn start_tick_timer(&mut self) {
        self.timer.start();
    }
}

/// [`MillisClock`] backed by `embassy_time::Instant`.
#[cfg(feature = "embassy")]
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

#[cfg(feature = "embassy")]
impl MillisClock for EmbassyClock {
    fn now_ms(&self) -> u32 {
        // Keep the low 32 bits; the clock is defined to wrap.
        let millis = embassy_time::Instant::now().as_millis() & u64::from(u32::MAX);
        u32::try_from(millis).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    struct TestPin {
        high: bool,
        writes: u32,
    }

    impl embedded_hal::digital::ErrorType for TestPin {
        type Error = Infallible;
    }

    impl OutputPin for TestPin {
        fn set_low(&mut self) -> core::result::Result<(), Infallible> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Infallible> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    struct TestDelay {
        total_ns: u64,
    }

    impl DelayNs for TestDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += u64::from(ns);
        }
    }

    struct TestClock(Cell<u32>);

    impl MillisClock for TestClock {
        fn now_ms(&self) -> u32 {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct TestTimer {
        starts: u32,
    }

    impl TickTimer for TestTimer {
        fn start(&mut self) {
            self.starts += 1;
        }
    }

    fn board() -> HalBoard<TestPin, TestDelay, TestClock, TestTimer, 2> {
        HalBoard::new(
            [
                TestPin {
                    high: true,
                    writes: 0,
                },
                TestPin {
                    high: true,
                    writes: 0,
                },
            ],
            TestDelay { total_ns: 0 },
            TestClock(Cell::new(7)),
            TestTimer::default(),
        )
    }

    #[test]
    fn control_line_from_negative_number_is_rejected() {
        assert_eq!(ControlLine::try_from(-1), Err(Error::InvalidLine(-1)));
        assert_eq!(ControlLine::try_from(300), Err(Error::InvalidLine(300)));
        assert_eq!(ControlLine::try_from(9), Ok(ControlLine::from(9)));
    }

    #[test]
    fn configure_output_drives_existing_line_low() {
        let mut board = board();
        board.configure_output(ControlLine::from(1)).unwrap();
        assert!(!board.pins[1].high);
        assert!(board.pins[0].high);
    }

    #[test]
    fn configure_output_rejects_missing_line() {
        let mut board = board();
        assert_eq!(
            board.configure_output(ControlLine::from(2)),
            Err(Error::UnknownLine(2))
        );
    }

    #[test]
    fn set_line_and_delay_reach_the_hal() {
        let mut board = board();
        board.set_line(ControlLine::from(0), PinState::Low);
        board.set_line(ControlLine::from(0), PinState::High);
        board.set_line(ControlLine::from(5), PinState::Low);
        board.delay_us(1500);
        assert!(board.pins[0].high);
        assert_eq!(board.pins[0].writes, 2);
        assert_eq!(board.delay.total_ns, 1_500_000);
        assert_eq!(board.now_ms(), 7);
    }

    struct StuckPin;

    impl embedded_hal::digital::ErrorType for StuckPin {
        type Error = embedded_hal::digital::ErrorKind;
    }

    impl OutputPin for StuckPin {
        fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
            Err(embedded_hal::digital::ErrorKind::Other)
        }

        fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
            Err(embedded_hal::digital::ErrorKind::Other)
        }
    }

    #[test]
    fn failed_drive_still_times_the_pulse() {
        let mut board = HalBoard::new(
            [StuckPin],
            TestDelay { total_ns: 0 },
            TestClock(Cell::new(0)),
            TestTimer::default(),
        );
        assert_eq!(board.configure_output(ControlLine::from(0)), Ok(()));

        board.set_line(ControlLine::from(0), PinState::High);
        board.delay_us(1000);
        board.set_line(ControlLine::from(0), PinState::Low);
        assert_eq!(board.delay.total_ns, 1_000_000);
    }

    #[test]
    fn start_tick_timer_forwards_to_timer() {
        let mut board = board();
        board.start_tick_timer();
        board.start_tick_timer();
        assert_eq!(board.timer().starts, 2);
    }
}
