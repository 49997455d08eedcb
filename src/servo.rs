//! One bit-banged hobby servo.
//!
//! [`ServoMotor`] holds everything about a single servo: its control line, angle
//! constraints, last commanded angle, pulse timing and sweep state. It owns no
//! hardware; each operation borrows the board's [`ServoHardware`].
//!
//! Most code uses a [`Servo`](crate::Servo) handle instead, which reaches its
//! `ServoMotor` inside a shared [`ServoBank`](crate::ServoBank).
//!
//! Nothing here fails at runtime. Until [`try_attach`](ServoMotor::try_attach)
//! succeeds every other operation does nothing.

use crate::hal::{ControlLine, ServoHardware};
use crate::pulse::{FULL_RANGE_DEGREES, PulseGenerator, PulseRange};
use crate::sweep::{Direction, Sweep, SweepConfig};
use crate::{Error, Result};

/// Clamp `degrees` into `low..=high`. Requires `low <= high`.
pub(crate) fn clamp_degrees(degrees: i32, low: u8, high: u8) -> u8 {
    let clamped = degrees.clamp(i32::from(low), i32::from(high));
    // Within low..=high, so it fits.
    u8::try_from(clamped).unwrap_or(high)
}

/// State of one servo motor.
#[derive(Clone, Copy, Debug)]
pub struct ServoMotor {
    line: Option<ControlLine>,
    low: u8,
    high: u8,
    angle: u8,
    pulse: PulseGenerator,
    sweep: Sweep,
}

impl Default for ServoMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoMotor {
    /// An unattached servo.
    #[must_use]
    pub fn new() -> Self {
        Self {
            line: None,
            low: 0,
            high: FULL_RANGE_DEGREES,
            angle: 0,
            pulse: PulseGenerator::default(),
            sweep: Sweep::idle(),
        }
    }

    /// Attach to control `line` and limit travel to `low..=high` degrees.
    ///
    /// Inverted bounds are swapped. On success the line is configured as an output
    /// and the servo is commanded to 0 degrees (clamped into the bounds). On failure
    /// nothing changes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLine`] if `line` is negative or not a line number.
    /// - [`Error::ConstraintOutOfRange`] if either bound is outside 0..=180.
    /// - [`Error::UnknownLine`] if the hardware has no such output.
    pub fn try_attach<H: ServoHardware>(
        &mut self,
        hardware: &mut H,
        line: i32,
        low: i32,
        high: i32,
    ) -> Result<()> {
        let (low, high) = if high < low { (high, low) } else { (low, high) };
        let control_line = ControlLine::try_from(line)?;
        let full_range = 0..=i32::from(FULL_RANGE_DEGREES);
        if !full_range.contains(&low) || !full_range.contains(&high) {
            return Err(Error::ConstraintOutOfRange { low, high });
        }
        let low_degrees = clamp_degrees(low, 0, FULL_RANGE_DEGREES);
        let high_degrees = clamp_degrees(high, 0, FULL_RANGE_DEGREES);
        hardware.configure_output(control_line)?;

        self.line = Some(control_line);
        self.low = low_degrees;
        self.high = high_degrees;
        info!(
            "servo attached line={} constraints={}..={}",
            control_line.number(),
            low_degrees,
            high_degrees
        );
        self.write(hardware, 0);
        Ok(())
    }

    /// Whether [`try_attach`](Self::try_attach) has succeeded.
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.line.is_some()
    }

    /// The control line, once attached.
    #[must_use]
    pub const fn control_line(&self) -> Option<ControlLine> {
        self.line
    }

    /// Angle constraints as `(low, high)`.
    #[must_use]
    pub const fn constraints(&self) -> (u8, u8) {
        (self.low, self.high)
    }

    /// Command `degrees`, clamped into the constraints.
    ///
    /// The angle is recorded even if the pulse itself is dropped because the last
    /// one went out less than a refresh interval ago.
    pub fn write<H: ServoHardware>(&mut self, hardware: &mut H, degrees: i32) {
        let Some(line) = self.line else {
            return;
        };
        let degrees = clamp_degrees(degrees, self.low, self.high);
        self.pulse.emit_degrees(hardware, line, degrees);
        self.angle = degrees;
    }

    /// Re-send the pulse for the current angle.
    pub fn refresh<H: ServoHardware>(&mut self, hardware: &mut H) {
        self.write(hardware, i32::from(self.angle));
    }

    /// Send one pulse of exactly `width_us`. The recorded angle is unchanged.
    pub fn write_microseconds<H: ServoHardware>(&mut self, hardware: &mut H, width_us: u16) {
        let Some(line) = self.line else {
            return;
        };
        self.pulse.emit(hardware, line, width_us);
    }

    /// Last commanded angle. There is no position feedback.
    #[must_use]
    pub const fn read(&self) -> u8 {
        self.angle
    }

    /// Pulse widths used for 0 and 180 degrees.
    #[must_use]
    pub const fn pulse_range(&self) -> PulseRange {
        self.pulse.range()
    }

    /// Use `range` for angle-to-pulse conversion from now on.
    pub const fn set_pulse_range(&mut self, range: PulseRange) {
        self.pulse.set_range(range);
    }

    /// Start sweeping: jump to the (clamped) start angle and send its pulse.
    ///
    /// This only sets up the sweep. Something must call
    /// [`sweep_step`](Self::sweep_step) periodically; the dispatcher does so for
    /// registered servos.
    pub fn enable_sweep<H: ServoHardware>(&mut self, hardware: &mut H, config: SweepConfig) {
        if !self.is_attached() {
            return;
        }
        self.angle = self.sweep.begin(config, self.low, self.high);
        debug!(
            "servo sweep from {} step {} policy {}",
            self.angle,
            config.step_size,
            config.policy
        );
        self.refresh(hardware);
    }

    /// Stop sweeping. The servo holds its current angle.
    pub const fn disable_sweep(&mut self) {
        self.sweep.disable();
    }

    /// Whether a sweep is running.
    #[must_use]
    pub const fn is_sweeping(&self) -> bool {
        self.sweep.is_enabled()
    }

    /// Direction of the current or last sweep.
    #[must_use]
    pub const fn sweep_direction(&self) -> Direction {
        self.sweep.direction()
    }

    /// Advance a running sweep by one step. Does not send a pulse.
    pub fn sweep_step(&mut self) {
        if !self.is_attached() || !self.is_sweeping() {
            return;
        }
        let next = self.sweep.step(i16::from(self.angle));
        self.angle = clamp_degrees(i32::from(next), self.low, self.high);
    }
}
