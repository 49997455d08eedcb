//! Non-blocking sweeps.
//!
//! A sweep moves a servo's target angle by a fixed step on every dispatcher tick.
//! What happens at the end of the range is chosen by [`SweepPolicy`].

use crate::servo::clamp_degrees;

/// What a sweep does when it steps past the end of its range.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SweepPolicy {
    /// Turn around at either end and keep going back and forth.
    #[default]
    Reverse,
    /// Jump back to the start and sweep again in the same direction.
    SkipReverse,
    /// Sweep once, land exactly on the stop angle, then stop sweeping.
    Single,
}

/// Direction the sweep is currently moving in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Increasing angle.
    Clockwise,
    /// Decreasing angle.
    CounterClockwise,
}

/// Sweep parameters for [`Servo::enable_sweep`](crate::Servo::enable_sweep).
///
/// `start` and `stop` are clamped into the servo's angle constraints when the sweep
/// begins. The default sweeps 0 to 180 degrees in steps of 5, reversing at each end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SweepConfig {
    /// Degrees moved per tick.
    pub step_size: u8,
    /// Angle the sweep begins at.
    pub start: i32,
    /// Angle the sweep heads towards.
    pub stop: i32,
    /// End-of-range behavior.
    pub policy: SweepPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            step_size: 5,
            start: 0,
            stop: 180,
            policy: SweepPolicy::Reverse,
        }
    }
}

impl SweepConfig {
    /// Sweep from `start` towards `stop` in steps of `step_size` degrees.
    #[must_use]
    pub const fn new(step_size: u8, start: i32, stop: i32, policy: SweepPolicy) -> Self {
        Self {
            step_size,
            start,
            stop,
            policy,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RangePosition {
    Above,
    Below,
    Within,
}

/// Per-servo sweep state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Sweep {
    enabled: bool,
    direction: Direction,
    step_size: u8,
    start: u8,
    stop: u8,
    policy: SweepPolicy,
}

impl Sweep {
    pub(crate) const fn idle() -> Self {
        Self {
            enabled: false,
            direction: Direction::Clockwise,
            step_size: 0,
            start: 0,
            stop: 0,
            policy: SweepPolicy::Reverse,
        }
    }

    /// Enter the sweeping state. Returns the angle the sweep starts at.
    pub(crate) fn begin(&mut self, config: SweepConfig, low: u8, high: u8) -> u8 {
        // Direction follows the caller's endpoints, before clamping.
        self.direction = if config.start < config.stop {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        self.start = clamp_degrees(config.start, low, high);
        self.stop = clamp_degrees(config.stop, low, high);
        self.step_size = config.step_size;
        self.policy = config.policy;
        self.enabled = true;
        self.start
    }

    pub(crate) const fn disable(&mut self) {
        self.enabled = false;
    }

    pub(crate) const fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) const fn direction(&self) -> Direction {
        self.direction
    }

    /// Advance `angle` one step and apply the end-of-range policy.
    ///
    /// The result may overshoot the range by less than one step under
    /// [`SweepPolicy::Reverse`]; callers clamp it into the servo's constraints.
    pub(crate) fn step(&mut self, angle: i16) -> i16 {
        let step = i16::from(self.step_size);
        let next = match self.direction {
            Direction::Clockwise => angle.saturating_add(step),
            Direction::CounterClockwise => angle.saturating_sub(step),
        };

        match (self.policy, self.position(next)) {
            (_, RangePosition::Within) => next,
            (SweepPolicy::Reverse, RangePosition::Above) => {
                self.direction = Direction::CounterClockwise;
                next
            }
            (SweepPolicy::Reverse, RangePosition::Below) => {
                self.direction = Direction::Clockwise;
                next
            }
            (SweepPolicy::SkipReverse, _) => i16::from(self.start),
            (SweepPolicy::Single, _) => {
                self.enabled = false;
                i16::from(self.stop)
            }
        }
    }

    fn position(&self, angle: i16) -> RangePosition {
        let low = i16::from(self.start.min(self.stop));
        let high = i16::from(self.start.max(self.stop));
        if angle > high {
            RangePosition::Above
        } else if angle < low {
            RangePosition::Below
        } else {
            RangePosition::Within
        }
    }
}
