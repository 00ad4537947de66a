//! # strata-tuple
//!
//! An order-preserving binary codec for heterogeneous tuples, mapping typed
//! records to byte strings such that lexicographic comparison of two
//! encodings equals element-by-element comparison of the source tuples.
//! This is the bridge between typed application data and an opaque
//! byte-ordered key space.
//!
//! ## Wire format
//!
//! Each scalar encodes as a type code followed by a body:
//!
//! | Code        | Type            | Body |
//! |-------------|-----------------|------|
//! | `0x00`      | Nil             | empty |
//! | `0x01`      | Byte string     | `0x00`-escaped bytes, `0x00` terminator |
//! | `0x02`      | Unicode string  | UTF-8, same escaping |
//! | `0x03`      | Nested tuple    | escaped encoded body, `0x00` terminator |
//! | `0x0C..0x13`| Negative int    | one's-complement magnitude, 8..1 bytes |
//! | `0x14`      | Zero            | empty |
//! | `0x15..0x1C`| Positive int    | big-endian magnitude, 1..8 bytes |
//! | `0x20`/`0x21`| f32 / f64      | IEEE-754 big-endian, sign-mangled |
//! | `0x30`/`0x31`| UUID-128 / 64  | 16 / 8 bytes |
//! | `0xFE`/`0xFF`| Directory / System | marker only |
//!
//! Booleans share the integer encoding (`0` / `1`); timestamps and time
//! intervals are carried as signed 64-bit tick counts.
//!
//! ## Example
//!
//! ```
//! use strata_tuple::{encode_key, unpack, Tuple};
//!
//! let key = encode_key(("users", 42i64));
//! let tuple = unpack(key).unwrap();
//! assert_eq!(tuple.get_as::<String>(0).unwrap(), "users");
//! assert_eq!(tuple.get_as::<i64>(1).unwrap(), 42);
//!
//! // every key under ("users",) falls in its derived range
//! let range = Tuple::from(("users",)).range();
//! assert!(range.contains(&encode_key(("users", 42i64))));
//! ```

pub mod buffer;
pub mod decode;
pub mod element;
pub mod encode;
pub mod error;
pub mod pack;
pub mod sliced;
#[allow(clippy::module_inception)]
pub mod tuple;

pub use buffer::{KeyReader, KeyWriter};
pub use decode::{decode_element, decode_next, FromElement, TupleDecode};
pub use element::{Element, ElementKind, Uuid64};
pub use encode::TuplePack;
pub use error::TupleError;
pub use pack::{
    decode_at, decode_first, decode_key, decode_last, dump_key, encode_key, encode_keys, pack, pack_prefixed, prefix_successor,
    to_range, unpack, unpack_as, unpack_prefixed, KeyRange,
};
pub use sliced::SlicedTuple;
pub use tuple::Tuple;
