use crate::element::ElementKind;
use thiserror::Error;

/// Errors raised by the tuple codec and tuple value accessors.
///
/// Every failure is reported at the operation boundary; no operation leaves a
/// partially written buffer or partially decoded tuple behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TupleError {
    /// Decoding or `last` on an empty tuple or empty input.
    #[error("tuple is empty")]
    Empty,

    /// Item access outside `[-len, len)`.
    #[error("index {index} out of range for tuple of {len} items")]
    IndexOutOfRange { index: isize, len: usize },

    /// `decode_key` on an input that does not hold exactly one item.
    #[error("expected a single item, found {actual}")]
    ArityMismatch { actual: usize },

    /// A decoded element cannot be represented as the requested type.
    #[error("cannot convert {found:?} element to {wanted}")]
    UnsupportedType { wanted: &'static str, found: ElementKind },

    /// Unknown type code, missing terminator, or truncated body.
    #[error("malformed tuple: {0}")]
    MalformedTuple(String),

    /// `unpack_prefixed` on a slice that does not start with the prefix.
    #[error("slice does not start with the expected prefix")]
    PrefixMismatch,
}

impl TupleError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self { TupleError::MalformedTuple(reason.into()) }
}
