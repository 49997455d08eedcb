//! The arena of servos serviced by one tick interrupt.
//!
//! A [`ServoBank`] owns the board's [`ServoHardware`], `UNITS` servo slots and the
//! dispatcher whose registry holds up to `CAPACITY` of them. Servos are addressed
//! by [`ServoId`]. Every operation takes `&mut self`, so the bank has to live
//! somewhere both the main program and the interrupt handler can lock; see
//! [`ServoBankStatic`](crate::ServoBankStatic).

use crate::dispatcher::{Dispatcher, Registration};
use crate::hal::{ControlLine, ServoHardware};
use crate::pulse::PulseRange;
use crate::registry::{DEFAULT_REGISTRY_CAPACITY, ServoId};
use crate::servo::ServoMotor;
use crate::sweep::SweepConfig;
use crate::{Error, Result};

/// Fixed set of servos plus the registry the tick interrupt walks.
pub struct ServoBank<H, const UNITS: usize, const CAPACITY: usize = DEFAULT_REGISTRY_CAPACITY> {
    hardware: H,
    units: [Option<ServoMotor>; UNITS],
    dispatcher: Dispatcher<CAPACITY>,
}

impl<H: ServoHardware, const UNITS: usize, const CAPACITY: usize> ServoBank<H, UNITS, CAPACITY> {
    /// An empty bank driving `hardware`.
    pub const fn new(hardware: H) -> Self {
        Self {
            hardware,
            units: [const { None }; UNITS],
            dispatcher: Dispatcher::new(),
        }
    }

    /// The board.
    pub const fn hardware(&self) -> &H {
        &self.hardware
    }

    /// The board, mutably.
    pub const fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    /// Claim a free slot for a new, unattached servo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BankFull`] when every slot is taken.
    pub fn add_servo(&mut self) -> Result<ServoId> {
        let index = self
            .units
            .iter()
            .position(Option::is_none)
            .ok_or(Error::BankFull)?;
        let id = u8::try_from(index).map(ServoId::new).map_err(|_| Error::BankFull)?;
        if let Some(slot) = self.units.get_mut(index) {
            *slot = Some(ServoMotor::new());
        }
        Ok(id)
    }

    /// Deregister the servo and free its slot.
    ///
    /// Only this servo's own registry entry is removed, never another servo's
    /// entry on the same control line.
    pub fn release(&mut self, id: ServoId) {
        if self.dispatcher.forget(id).is_some() {
            info!("servo {} deregistered", id.index());
        }
        if let Some(slot) = self.units.get_mut(id.index()) {
            *slot = None;
        }
    }

    /// The servo in slot `id`.
    #[must_use]
    pub fn servo(&self, id: ServoId) -> Option<&ServoMotor> {
        self.units.get(id.index()).and_then(Option::as_ref)
    }

    fn with_servo<R>(
        &mut self,
        id: ServoId,
        f: impl FnOnce(&mut ServoMotor, &mut H) -> R,
    ) -> Option<R> {
        let unit = self.units.get_mut(id.index()).and_then(Option::as_mut)?;
        Some(f(unit, &mut self.hardware))
    }

    /// See [`ServoMotor::try_attach`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownServo`] for an empty slot, otherwise as
    /// [`ServoMotor::try_attach`].
    ///
    /// Re-attaching a registered servo to another control line re-registers it on
    /// the new line, or drops it from the registry if that line is already serviced.
    pub fn try_attach(&mut self, id: ServoId, line: i32, low: i32, high: i32) -> Result<()> {
        let previous_line = self.servo(id).and_then(ServoMotor::control_line);
        let result = self
            .with_servo(id, |unit, hardware| unit.try_attach(hardware, line, low, high))
            .ok_or(Error::UnknownServo(id.index()))?;
        match result {
            Ok(()) => self.follow_line_change(id, previous_line),
            Err(err) => warn!("servo {} attach rejected: {}", id.index(), err),
        }
        result
    }

    /// Keep registry entries unique by control line after `id` may have moved.
    fn follow_line_change(&mut self, id: ServoId, previous_line: Option<ControlLine>) {
        let line = self.servo(id).and_then(ServoMotor::control_line);
        if line == previous_line || self.dispatcher.forget(id).is_none() {
            return;
        }
        match self.dispatcher.register::<H, _>(id, &self.units) {
            Registration::Added => debug!("servo {} re-registered on its new line", id.index()),
            Registration::Duplicate | Registration::Full | Registration::Unattached => {
                warn!("servo {} deregistered: new line already serviced", id.index());
            }
        }
    }

    /// Attach, reporting only success.
    pub fn attach(&mut self, id: ServoId, line: i32, low: i32, high: i32) -> bool {
        self.try_attach(id, line, low, high).is_ok()
    }

    /// Whether the servo is attached.
    #[must_use]
    pub fn is_attached(&self, id: ServoId) -> bool {
        self.servo(id).is_some_and(ServoMotor::is_attached)
    }

    /// See [`ServoMotor::write`].
    pub fn write(&mut self, id: ServoId, degrees: i32) {
        self.with_servo(id, |unit, hardware| unit.write(hardware, degrees));
    }

    /// See [`ServoMotor::refresh`].
    pub fn refresh(&mut self, id: ServoId) {
        self.with_servo(id, |unit, hardware| unit.refresh(hardware));
    }

    /// See [`ServoMotor::write_microseconds`].
    pub fn write_microseconds(&mut self, id: ServoId, width_us: u16) {
        self.with_servo(id, |unit, hardware| {
            unit.write_microseconds(hardware, width_us);
        });
    }

    /// Last commanded angle, 0 for an empty slot.
    #[must_use]
    pub fn read(&self, id: ServoId) -> u8 {
        self.servo(id).map_or(0, ServoMotor::read)
    }

    /// See [`ServoMotor::set_pulse_range`].
    pub fn set_pulse_range(&mut self, id: ServoId, range: PulseRange) {
        self.with_servo(id, |unit, _| unit.set_pulse_range(range));
    }

    /// Start the tick timer and add the servo to the registry.
    ///
    /// Does nothing for an unattached servo. Adding is skipped, silently, when the
    /// registry is full or already holds a servo on the same control line.
    pub fn enable_callback(&mut self, id: ServoId) {
        if !self.is_attached(id) {
            return;
        }
        self.hardware.start_tick_timer();
        match self.dispatcher.register::<H, _>(id, &self.units) {
            Registration::Added => info!("servo {} registered", id.index()),
            Registration::Duplicate => debug!("servo {} line already registered", id.index()),
            Registration::Full => warn!("servo {} not registered: registry full", id.index()),
            Registration::Unattached => {}
        }
    }

    /// Remove the registry entry on this servo's control line. The tick timer keeps
    /// running for the others.
    pub fn disable_callback(&mut self, id: ServoId) {
        if self.dispatcher.unregister::<H, _>(id, &self.units).is_some() {
            info!("servo {} deregistered", id.index());
        }
    }

    /// Whether the servo itself is in the registry.
    #[must_use]
    pub fn is_registered(&self, id: ServoId) -> bool {
        self.dispatcher.is_registered(id)
    }

    /// Registered servos in service order.
    #[must_use]
    pub fn registered(&self) -> &[ServoId] {
        self.dispatcher.registered()
    }

    /// Register the servo and start sweeping. See [`ServoMotor::enable_sweep`].
    pub fn enable_sweep(&mut self, id: ServoId, config: SweepConfig) {
        if !self.is_attached(id) {
            return;
        }
        self.enable_callback(id);
        self.with_servo(id, |unit, hardware| unit.enable_sweep(hardware, config));
    }

    /// Stop sweeping. Registry membership is unchanged.
    pub fn disable_sweep(&mut self, id: ServoId) {
        self.with_servo(id, |unit, _| unit.disable_sweep());
    }

    /// Whether the servo is sweeping.
    #[must_use]
    pub fn is_sweeping(&self, id: ServoId) -> bool {
        self.servo(id).is_some_and(ServoMotor::is_sweeping)
    }

    /// See [`ServoMotor::sweep_step`].
    pub fn sweep_step(&mut self, id: ServoId) {
        self.with_servo(id, |unit, _| unit.sweep_step());
    }

    /// Tick interrupt body. Returns whether the rate limiter let this tick through.
    pub fn on_interrupt(&mut self) -> bool {
        self.dispatcher
            .on_interrupt(&mut self.units, &mut self.hardware)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHardware;

    type Bank = ServoBank<MockHardware, 6>;

    fn attached(bank: &mut Bank, line: i32) -> ServoId {
        let id = bank.add_servo().unwrap();
        assert!(bank.attach(id, line, 0, 180));
        id
    }

    #[test]
    fn slots_run_out_and_are_reused() {
        let mut bank = ServoBank::<MockHardware, 2>::new(MockHardware::new());
        let first = bank.add_servo().unwrap();
        let second = bank.add_servo().unwrap();
        assert_eq!(bank.add_servo(), Err(Error::BankFull));

        bank.release(first);
        assert!(bank.servo(first).is_none());
        assert_eq!(bank.add_servo(), Ok(first));
        assert_ne!(first, second);
    }

    #[test]
    fn attach_on_empty_slot_is_unknown() {
        let mut bank = Bank::new(MockHardware::new());
        let id = bank.add_servo().unwrap();
        bank.release(id);
        assert_eq!(
            bank.try_attach(id, 3, 0, 180),
            Err(Error::UnknownServo(id.index()))
        );
        assert_eq!(bank.read(id), 0);
    }

    #[test]
    fn enable_callback_on_unattached_servo_does_nothing() {
        let mut bank = Bank::new(MockHardware::new());
        let id = bank.add_servo().unwrap();
        bank.enable_callback(id);
        assert!(bank.registered().is_empty());
        assert_eq!(bank.hardware().timer_starts(), 0);
    }

    #[test]
    fn enable_callback_starts_timer_every_time() {
        let mut bank = Bank::new(MockHardware::new());
        let id = attached(&mut bank, 3);
        bank.enable_callback(id);
        bank.enable_callback(id);
        assert_eq!(bank.registered(), &[id]);
        assert_eq!(bank.hardware().timer_starts(), 2);
    }

    #[test]
    fn enable_sweep_registers_implicitly() {
        let mut bank = Bank::new(MockHardware::new());
        let id = attached(&mut bank, 3);
        bank.enable_sweep(id, SweepConfig::default());
        assert!(bank.is_registered(id));
        assert!(bank.is_sweeping(id));

        bank.disable_sweep(id);
        assert!(!bank.is_sweeping(id));
        assert!(bank.is_registered(id));
    }

    #[test]
    fn tick_refreshes_registered_servo_only() {
        let mut bank = Bank::new(MockHardware::new());
        let registered = attached(&mut bank, 3);
        let _idle = attached(&mut bank, 4);
        bank.write(registered, 90);
        bank.enable_callback(registered);
        bank.hardware_mut().clear_events();

        bank.hardware_mut().advance_ms(30);
        assert!(bank.on_interrupt());

        let hardware = bank.hardware();
        assert_eq!(
            hardware.pulse_widths(ControlLine::from(3)).as_slice(),
            &[1450]
        );
        assert_eq!(hardware.pulse_count(ControlLine::from(4)), 0);
    }

    #[test]
    fn release_leaves_other_servo_on_same_line_registered() {
        let mut bank = Bank::new(MockHardware::new());
        let kept = attached(&mut bank, 3);
        let released = attached(&mut bank, 3);
        bank.enable_callback(kept);

        bank.release(released);
        assert_eq!(bank.registered(), &[kept]);
    }

    #[test]
    fn reattach_onto_serviced_line_drops_registration() {
        let mut bank = Bank::new(MockHardware::new());
        let mover = attached(&mut bank, 1);
        let owner = attached(&mut bank, 2);
        bank.enable_callback(mover);
        bank.enable_callback(owner);

        assert!(bank.attach(mover, 2, 0, 180));
        assert_eq!(bank.registered(), &[owner]);
        assert!(!bank.is_registered(mover));
    }

    #[test]
    fn reattach_onto_free_line_stays_registered() {
        let mut bank = Bank::new(MockHardware::new());
        let mover = attached(&mut bank, 1);
        let other = attached(&mut bank, 2);
        bank.enable_callback(mover);
        bank.enable_callback(other);

        assert!(bank.attach(mover, 5, 0, 180));
        assert_eq!(bank.registered(), &[other, mover]);

        // Same line again keeps its place.
        assert!(bank.attach(mover, 5, 10, 170));
        assert_eq!(bank.registered(), &[other, mover]);
    }

    #[test]
    fn release_deregisters() {
        let mut bank = Bank::new(MockHardware::new());
        let id = attached(&mut bank, 3);
        bank.enable_callback(id);
        bank.release(id);
        assert!(bank.registered().is_empty());
    }
}
