use thiserror::Error;

/// Errors raised by the lookahead-array containers.
///
/// Every failure is detected before any mutation happens; an operation that
/// returns an error leaves its container unchanged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColaError {
    /// `min`/`max`/`last` on an empty container.
    #[error("container is empty")]
    Empty,

    /// A `(level, offset)` location that does not address an allocated slot.
    #[error("location ({level}, {offset}) does not address an allocated slot")]
    IndexOutOfRange { level: usize, offset: usize },

    /// `mark`/`remove` with `begin >= end`.
    #[error("range begin must be strictly less than end")]
    InvalidRange,

    /// Dictionary `add` with a key that is already present.
    #[error("key is already present")]
    DuplicateKey,

    /// A cursor advanced after its store was modified.
    #[error("store was mutated while a cursor was active")]
    StoreMutated,
}
