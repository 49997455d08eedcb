//! The shared periodic tick timer.
//!
//! Every registered servo is serviced from one periodic interrupt. [`TickTimer`]
//! starts that interrupt; starting it again must change nothing.
//!
//! [`OverflowTimer`] drives the common "8-bit timer with a clock-select field and an
//! overflow interrupt" layout through [`TimerRegisters`]. If the timer is stopped
//! (clock-select bits all zero) it programs the given prescaler; a timer that is
//! already counting keeps whatever prescaler it has, since other code may share it.
//! The prescaler that yields a useful overflow rate is board specific; check it
//! against the real part.

/// Starts the periodic interrupt that drives
/// [`ServoBankStatic::on_interrupt`](crate::ServoBankStatic::on_interrupt).
pub trait TickTimer {
    /// Start the periodic interrupt. Idempotent.
    fn start(&mut self);
}

/// Clock-select bits of the timer control register.
pub const CLOCK_SELECT_MASK: u8 = 0b0000_0111;

/// Register access for an overflow-interrupt timer.
pub trait TimerRegisters {
    /// Read the control register holding the clock-select bits.
    fn control(&self) -> u8;

    /// Write the control register holding the clock-select bits.
    fn set_control(&mut self, value: u8);

    /// Set the overflow interrupt enable bit.
    fn enable_overflow_interrupt(&mut self);
}

/// [`TickTimer`] over an overflow-interrupt timer.
pub struct OverflowTimer<R> {
    registers: R,
    clock_select: u8,
}

impl<R: TimerRegisters> OverflowTimer<R> {
    /// Wrap timer registers. `clock_select` is the prescaler code written into the
    /// clock-select bits when the timer is found stopped; bits outside
    /// [`CLOCK_SELECT_MASK`] are ignored.
    pub const fn new(registers: R, clock_select: u8) -> Self {
        Self {
            registers,
            clock_select: clock_select & CLOCK_SELECT_MASK,
        }
    }

    /// The wrapped registers.
    pub const fn registers(&self) -> &R {
        &self.registers
    }
}

impl<R: TimerRegisters> TickTimer for OverflowTimer<R> {
    fn start(&mut self) {
        let control = self.registers.control();
        if (control & CLOCK_SELECT_MASK) == 0 {
            self.registers
                .set_control((control & !CLOCK_SELECT_MASK) | self.clock_select);
            debug!("OverflowTimer: clock select set to {}", self.clock_select);
        }
        self.registers.enable_overflow_interrupt();
    }
}

/// [`TickTimer`] for setups where something else already calls
/// [`ServoBankStatic::on_interrupt`](crate::ServoBankStatic::on_interrupt)
/// periodically, such as an embassy task or an existing timer interrupt.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExternalTick;

impl TickTimer for ExternalTick {
    fn start(&mut self) {}
}
