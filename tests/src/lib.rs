//! Shared helpers for the cross-crate integration tests.

use std::cmp::Ordering;

use bytes::Bytes;

/// Comparer for packed keys: plain lexicographic byte order.
pub fn byte_order(a: &Bytes, b: &Bytes) -> Ordering { a.as_ref().cmp(b.as_ref()) }
