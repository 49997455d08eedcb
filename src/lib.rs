//! Interrupt-driven, bit-banged control of hobby servos.
//!
//! A servo is steered by a pulse of 500 to 2400 µs on its control line, repeated
//! every 20 ms or so. This crate generates those pulses in software on any
//! output line and lets a periodic timer interrupt keep them coming, which also
//! drives non-blocking sweeps.
//!
//! # Glossary
//!
//! - **Control line:** the digital output wired to a servo's signal input.
//! - **Constraints:** the `low..=high` degrees a servo may be commanded to.
//! - **Refresh:** re-sending the pulse for the current angle. Pulses are throttled
//!   to one per [`PULSE_REFRESH_INTERVAL_MS`] per servo.
//! - **Tick:** one serviced timer interrupt, at most every [`TICK_INTERVAL_MS`].
//! - **Registry:** the ordered set of servos the tick services, at most
//!   [`DEFAULT_REGISTRY_CAPACITY`] by default.
//! - **Sweep:** automatic stepping between two angles under a [`SweepPolicy`].
//!
//! # Layers
//!
//! - [`ServoMotor`]: one servo. Every call takes the [`ServoHardware`] explicitly.
//! - [`ServoBank`]: the board, a fixed set of servo slots and the registry.
//! - [`ServoBankStatic`] and [`Servo`]: a bank in a `static`, shared with the
//!   interrupt handler, and a handle per servo.
//!
//! Boards built from `embedded-hal` parts use [`HalBoard`]. With the `host` feature,
//! `mock::MockHardware` records line activity for host tests.
#![cfg_attr(not(any(test, feature = "host")), no_std)]

#[macro_use]
mod fmt;

mod bank;
mod dispatcher;
mod error;
mod hal;
#[cfg(any(test, feature = "host"))]
pub mod mock;
mod pulse;
mod registry;
mod servo;
mod shared;
mod sweep;
mod throttle;
mod timer;

pub use crate::bank::ServoBank;
pub use crate::dispatcher::TICK_INTERVAL_MS;
pub use crate::error::{Error, Result};
#[cfg(feature = "embassy")]
pub use crate::hal::EmbassyClock;
pub use crate::hal::{ControlLine, HalBoard, MillisClock, ServoHardware};
pub use crate::pulse::{
    FULL_RANGE_DEGREES, PULSE_MAX_US_DEFAULT, PULSE_MIN_US_DEFAULT, PULSE_REFRESH_INTERVAL_MS,
    PulseRange,
};
pub use crate::registry::{DEFAULT_REGISTRY_CAPACITY, ServoId};
pub use crate::servo::ServoMotor;
pub use crate::shared::{Servo, ServoBankStatic};
pub use crate::sweep::{Direction, SweepConfig, SweepPolicy};
pub use crate::timer::{CLOCK_SELECT_MASK, ExternalTick, OverflowTimer, TickTimer, TimerRegisters};
