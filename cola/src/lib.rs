//! # strata-cola
//!
//! Ordered containers built on a cache-oblivious lookahead array (COLA):
//! a doubling-array store with amortized O(log N) insertion and O(log² N)
//! lookup, tuned for append-heavy workloads.
//!
//! - [`ColaStore`] — the level-indexed backbone. Level `k` holds either
//!   nothing or exactly `2^k` sorted items; the set of allocated levels is
//!   the binary representation of the item count.
//! - [`ColaOrderedSet`] / [`ColaOrderedDict`] — unique-element set and
//!   key → value dictionary over the store.
//! - [`ColaRangeSet`] / [`ColaRangeDictionary`] — sorted lists of disjoint
//!   half-open intervals (bare, or carrying a value per interval) with
//!   merge/split/overwrite semantics; the shape used for read/write
//!   conflict ranges and transaction-local writes.
//!
//! All containers are single-threaded and synchronous; ordering comes from
//! a [`Comparer`] supplied at construction. Detached cursors snapshot the
//! store's mutation counter and fail with [`ColaError::StoreMutated`] once
//! the store changes underneath them.
//!
//! ## Example
//!
//! ```
//! use strata_cola::ColaOrderedSet;
//!
//! let mut set = ColaOrderedSet::<i32>::new();
//! for v in [5, 3, 8, 1, 9, 2, 7] {
//!     set.add(v);
//! }
//! assert_eq!(set.to_vec(), vec![1, 2, 3, 5, 7, 8, 9]);
//! ```

pub mod cmp;
pub mod dict;
pub mod error;
pub mod range_dict;
pub mod range_set;
pub mod set;
pub mod store;

pub use cmp::{Comparer, NaturalOrder};
pub use dict::ColaOrderedDict;
pub use error::ColaError;
pub use range_dict::{ColaRangeDictionary, RangeEntry};
pub use range_set::{ColaRangeSet, Span};
pub use set::ColaOrderedSet;
pub use store::{ColaCursor, ColaIter, ColaStore};
