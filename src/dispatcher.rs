//! Periodic servicing of registered servos.
//!
//! The hardware tick interrupt fires much faster than servos need. The
//! [`Dispatcher`] lets one tick through every [`TICK_INTERVAL_MS`]; on that tick
//! it walks the registry in order and, for each servo, advances its sweep and
//! re-sends its pulse.

use crate::hal::{ControlLine, ServoHardware};
use crate::registry::{Registry, ServoId};
use crate::servo::ServoMotor;
use crate::throttle::Throttle;

/// Minimum time between two serviced ticks (milliseconds).
pub const TICK_INTERVAL_MS: u32 = 30;

/// What the dispatcher does to each registered servo on a tick.
pub(crate) trait TickHandler<H> {
    /// Control line used to keep registry entries unique. `None` while unattached.
    fn control_line(&self) -> Option<ControlLine>;

    /// Advance a running sweep.
    fn sweep_step(&mut self);

    /// Re-send the pulse for the current angle.
    fn refresh(&mut self, hardware: &mut H);
}

impl<H: ServoHardware> TickHandler<H> for ServoMotor {
    fn control_line(&self) -> Option<ControlLine> {
        ServoMotor::control_line(self)
    }

    fn sweep_step(&mut self) {
        ServoMotor::sweep_step(self);
    }

    fn refresh(&mut self, hardware: &mut H) {
        ServoMotor::refresh(self, hardware);
    }
}

/// Result of asking to register a servo.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Registration {
    Added,
    Duplicate,
    Full,
    Unattached,
}

fn line_of<H, U: TickHandler<H>>(units: &[Option<U>], id: ServoId) -> Option<ControlLine> {
    units
        .get(id.index())
        .and_then(Option::as_ref)
        .and_then(|unit| <U as TickHandler<H>>::control_line(unit))
}

/// Registry plus the tick rate limiter.
#[derive(Clone, Debug)]
pub(crate) struct Dispatcher<const CAPACITY: usize> {
    registry: Registry<CAPACITY>,
    gate: Throttle,
}

impl<const CAPACITY: usize> Dispatcher<CAPACITY> {
    pub(crate) const fn new() -> Self {
        Self {
            registry: Registry::new(),
            gate: Throttle::new(TICK_INTERVAL_MS),
        }
    }

    pub(crate) fn registered(&self) -> &[ServoId] {
        self.registry.as_slice()
    }

    pub(crate) fn is_registered(&self, id: ServoId) -> bool {
        self.registry.contains(id)
    }

    /// Add `id` unless the registry is full or a servo on the same line is present.
    pub(crate) fn register<H, U: TickHandler<H>>(
        &mut self,
        id: ServoId,
        units: &[Option<U>],
    ) -> Registration {
        let Some(line) = line_of::<H, U>(units, id) else {
            return Registration::Unattached;
        };
        if self.registry.is_full() {
            return Registration::Full;
        }
        let duplicate = self
            .registry
            .as_slice()
            .iter()
            .any(|&other| line_of::<H, U>(units, other) == Some(line));
        if duplicate {
            return Registration::Duplicate;
        }
        if self.registry.push(id) {
            Registration::Added
        } else {
            Registration::Full
        }
    }

    /// Remove the entry whose servo shares `id`'s control line.
    pub(crate) fn unregister<H, U: TickHandler<H>>(
        &mut self,
        id: ServoId,
        units: &[Option<U>],
    ) -> Option<ServoId> {
        let line = line_of::<H, U>(units, id)?;
        self.registry
            .remove_first(|other| line_of::<H, U>(units, other) == Some(line))
    }

    /// Remove `id` itself, whatever its line. Used when its slot is released.
    pub(crate) fn forget(&mut self, id: ServoId) -> Option<ServoId> {
        self.registry.remove_first(|other| other == id)
    }

    /// Service every registered servo if a tick interval has passed.
    /// Returns whether the tick body ran.
    pub(crate) fn on_interrupt<H, U>(&mut self, units: &mut [Option<U>], hardware: &mut H) -> bool
    where
        H: ServoHardware,
        U: TickHandler<H>,
    {
        if !self.gate.ready(hardware.now_ms()) {
            return false;
        }
        for id in self.registry.as_slice() {
            if let Some(Some(unit)) = units.get_mut(id.index()) {
                unit.sweep_step();
                unit.refresh(hardware);
            }
        }
        self.gate.mark(hardware.now_ms());
        trace!("tick serviced {} servos", self.registry.as_slice().len());
        true
    }
}
