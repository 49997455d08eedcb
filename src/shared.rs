//! The bank shared between the main program and the tick interrupt, and the
//! per-servo [`Servo`] handle.
//!
//! [`ServoBankStatic`] keeps a [`ServoBank`] behind a critical-section mutex.
//! Every handle operation locks it with interrupts masked, so the interrupt
//! handler never sees a half-updated registry, and the handler itself runs
//! under the same lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use servo_kit::{ServoBankStatic, SweepConfig, SweepPolicy};
//!
//! // `Board` implements `ServoHardware`, e.g. a `HalBoard` over the MCU's pins.
//! static SERVOS: ServoBankStatic<Board, 4> = ServoBankStatic::new_static();
//!
//! fn main() -> ! {
//!     SERVOS.init(Board::take()).unwrap();
//!
//!     let arm = SERVOS.servo().unwrap();
//!     if arm.attach_constrained(9, 10, 170) {
//!         arm.write(90);
//!         arm.enable_sweep(SweepConfig::new(5, 10, 170, SweepPolicy::Reverse));
//!     }
//!     loop { /* the sweep runs from the timer interrupt */ }
//! }
//!
//! #[interrupt]
//! fn TIMER_OVERFLOW() {
//!     SERVOS.on_interrupt();
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::bank::ServoBank;
use crate::hal::ServoHardware;
use crate::pulse::{FULL_RANGE_DEGREES, PulseRange};
use crate::registry::{DEFAULT_REGISTRY_CAPACITY, ServoId};
use crate::sweep::SweepConfig;
use crate::{Error, Result};

/// Static resources shared by [`Servo`] handles and the tick interrupt.
pub struct ServoBankStatic<
    H,
    const UNITS: usize,
    const CAPACITY: usize = DEFAULT_REGISTRY_CAPACITY,
> {
    bank: Mutex<CriticalSectionRawMutex, RefCell<Option<ServoBank<H, UNITS, CAPACITY>>>>,
}

impl<H: ServoHardware, const UNITS: usize, const CAPACITY: usize>
    ServoBankStatic<H, UNITS, CAPACITY>
{
    /// Create static resources. Call [`init`](Self::init) before use.
    #[must_use]
    pub const fn new_static() -> Self {
        Self {
            bank: Mutex::new(RefCell::new(None)),
        }
    }

    /// Hand over the board.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyInitialized`] if a board was already given, or
    /// [`Error::BankBusy`] when called from inside [`with`](Self::with). The new
    /// board is dropped in both cases.
    pub fn init(&self, hardware: H) -> Result<()> {
        self.bank.lock(|bank| {
            let Ok(mut bank) = bank.try_borrow_mut() else {
                return Err(Error::BankBusy);
            };
            if bank.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            *bank = Some(ServoBank::new(hardware));
            info!("servo bank ready: {} slots, {} registered max", UNITS, CAPACITY);
            Ok(())
        })
    }

    /// Run `f` on the bank with interrupts masked.
    ///
    /// Returns `None` before [`init`](Self::init), or when called from inside
    /// another `with`.
    pub fn with<R>(&self, f: impl FnOnce(&mut ServoBank<H, UNITS, CAPACITY>) -> R) -> Option<R> {
        self.bank.lock(|bank| {
            let mut bank = bank.try_borrow_mut().ok()?;
            bank.as_mut().map(f)
        })
    }

    /// Tick interrupt handler body. Call it from the periodic timer interrupt.
    pub fn on_interrupt(&self) {
        self.with(ServoBank::on_interrupt);
    }

    /// Claim a slot and return its handle.
    ///
    /// # Errors
    ///
    /// [`Error::NotInitialized`] before [`init`](Self::init); [`Error::BankFull`]
    /// when every slot is taken.
    pub fn servo(&self) -> Result<Servo<'_, H, UNITS, CAPACITY>> {
        let id = self.with(ServoBank::add_servo).ok_or(Error::NotInitialized)??;
        Ok(Servo { bank: self, id })
    }
}

/// Handle to one servo in a [`ServoBankStatic`].
///
/// All operations lock the bank briefly. Before a successful attach they do
/// nothing. Dropping the handle removes the servo from the tick registry and
/// frees its slot.
pub struct Servo<
    'a,
    H: ServoHardware,
    const UNITS: usize,
    const CAPACITY: usize = DEFAULT_REGISTRY_CAPACITY,
> {
    bank: &'a ServoBankStatic<H, UNITS, CAPACITY>,
    id: ServoId,
}

impl<H: ServoHardware, const UNITS: usize, const CAPACITY: usize> Servo<'_, H, UNITS, CAPACITY> {
    /// Slot of this servo in the bank.
    #[must_use]
    pub const fn id(&self) -> ServoId {
        self.id
    }

    /// Attach with the full 0..=180 degree range.
    pub fn attach(&self, line: i32) -> bool {
        self.attach_constrained(line, 0, i32::from(FULL_RANGE_DEGREES))
    }

    /// Attach with travel limited to `low..=high` degrees (swapped if inverted).
    pub fn attach_constrained(&self, line: i32, low: i32, high: i32) -> bool {
        self.try_attach(line, low, high).is_ok()
    }

    /// Attach, reporting why it failed. See
    /// [`ServoMotor::try_attach`](crate::ServoMotor::try_attach).
    ///
    /// # Errors
    ///
    /// As [`ServoMotor::try_attach`](crate::ServoMotor::try_attach).
    pub fn try_attach(&self, line: i32, low: i32, high: i32) -> Result<()> {
        self.bank
            .with(|bank| bank.try_attach(self.id, line, low, high))
            .unwrap_or(Err(Error::NotInitialized))
    }

    /// Whether the servo is attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.bank
            .with(|bank| bank.is_attached(self.id))
            .unwrap_or(false)
    }

    /// Command `degrees`, clamped into the constraints.
    pub fn write(&self, degrees: i32) {
        self.bank.with(|bank| bank.write(self.id, degrees));
    }

    /// Re-send the pulse for the last commanded angle.
    pub fn refresh(&self) {
        self.bank.with(|bank| bank.refresh(self.id));
    }

    /// Send one pulse of exactly `width_us`, leaving the recorded angle alone.
    pub fn write_microseconds(&self, width_us: u16) {
        self.bank
            .with(|bank| bank.write_microseconds(self.id, width_us));
    }

    /// Last commanded angle.
    #[must_use]
    pub fn read(&self) -> u8 {
        self.bank.with(|bank| bank.read(self.id)).unwrap_or(0)
    }

    /// Use `range` for angle-to-pulse conversion.
    pub fn set_pulse_range(&self, range: PulseRange) {
        self.bank
            .with(|bank| bank.set_pulse_range(self.id, range));
    }

    /// Have the tick interrupt refresh this servo's pulse.
    pub fn enable_callback(&self) {
        self.bank.with(|bank| bank.enable_callback(self.id));
    }

    /// Stop the tick interrupt servicing this servo's control line.
    pub fn disable_callback(&self) {
        self.bank.with(|bank| bank.disable_callback(self.id));
    }

    /// Whether the tick interrupt services this servo.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.bank
            .with(|bank| bank.is_registered(self.id))
            .unwrap_or(false)
    }

    /// Start a sweep driven by the tick interrupt. Registers the servo if needed.
    pub fn enable_sweep(&self, config: SweepConfig) {
        self.bank.with(|bank| bank.enable_sweep(self.id, config));
    }

    /// Stop sweeping. The tick interrupt keeps refreshing the servo.
    pub fn disable_sweep(&self) {
        self.bank.with(|bank| bank.disable_sweep(self.id));
    }

    /// Whether a sweep is running.
    #[must_use]
    pub fn is_sweeping(&self) -> bool {
        self.bank
            .with(|bank| bank.is_sweeping(self.id))
            .unwrap_or(false)
    }

    /// Advance the sweep by one step without waiting for a tick.
    pub fn sweep_step(&self) {
        self.bank.with(|bank| bank.sweep_step(self.id));
    }
}

impl<H: ServoHardware, const UNITS: usize, const CAPACITY: usize> Drop
    for Servo<'_, H, UNITS, CAPACITY>
{
    fn drop(&mut self) {
        self.bank.with(|bank| bank.release(self.id));
    }
}
