use derive_more::{Display, Error};

/// Errors reported when configuring servos.
///
/// Runtime operations (writes, sweeps, registry changes) never fail; they quietly
/// do nothing when the servo is not attached or a fixed capacity is exhausted.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The control line number is negative or too large to be a line.
    #[display("control line {_0} is not a valid line number")]
    InvalidLine(#[error(not(source))] i32),

    /// An angle constraint lies outside 0..=180 degrees.
    #[display("angle constraints {low}..={high} are outside 0..=180 degrees")]
    ConstraintOutOfRange {
        /// Requested lower bound (after normalization).
        low: i32,
        /// Requested upper bound (after normalization).
        high: i32,
    },

    /// The hardware has no output for this control line.
    #[display("hardware has no output line {_0}")]
    UnknownLine(#[error(not(source))] u8),

    /// The pulse width range is empty or inverted.
    #[display("pulse range {min_us}..{max_us} us is empty")]
    InvalidPulseRange {
        /// Pulse width for 0 degrees.
        min_us: u16,
        /// Pulse width for 180 degrees.
        max_us: u16,
    },

    /// Every servo slot in the bank is in use.
    #[display("all servo slots are in use")]
    BankFull,

    /// No servo occupies this slot.
    #[display("no servo in slot {_0}")]
    UnknownServo(#[error(not(source))] usize),

    /// The shared bank already holds hardware.
    #[display("servo bank is already initialized")]
    AlreadyInitialized,

    /// The shared bank has not been given its hardware yet.
    #[display("servo bank is not initialized")]
    NotInitialized,

    /// The shared bank is already borrowed by an enclosing call on this context.
    #[display("servo bank is in use")]
    BankBusy,
}

/// Result type for this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
