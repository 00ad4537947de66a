//! The tagged sum of scalar values a tuple item can hold.
//!
//! Equality and hashing on [`Element`] are keyed to the wire format: two
//! elements are equal exactly when their encodings are byte-equal. That
//! makes `Bool(true)` equal to `Int(1)` (booleans share the integer
//! encoding) while keeping `Float(1.0)` distinct from `Double(1.0)` (their
//! encodings differ). [`Element::eq_strict`] distinguishes representations,
//! [`Element::similar_to`] unifies them across numeric kinds.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire type codes. The table is bit-exact; see the format documentation on
/// the crate root.
pub(crate) mod codes {
    pub const NIL: u8 = 0x00;
    pub const BYTES: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const NESTED: u8 = 0x03;
    /// Negative integers occupy `0x0C..0x13` (8 down to 1 body bytes).
    pub const NEG_INT_START: u8 = 0x0C;
    pub const INT_ZERO: u8 = 0x14;
    /// Positive integers occupy `0x15..0x1C` (1 up to 8 body bytes).
    pub const POS_INT_END: u8 = 0x1C;
    pub const FLOAT: u8 = 0x20;
    pub const DOUBLE: u8 = 0x21;
    pub const UUID128: u8 = 0x30;
    pub const UUID64: u8 = 0x31;
    pub const DIRECTORY: u8 = 0xFE;
    pub const SYSTEM: u8 = 0xFF;
}

/// A 64-bit UUID. Distinct from plain integers so that it keeps its fixed
/// 8-byte wire representation (`0x31`) instead of the variable-width integer
/// encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uuid64(pub u64);

impl fmt::Display for Uuid64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{{{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}}}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// A dynamically typed tuple item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    /// Absence of a value; encodes as the single byte `0x00`.
    Nil,
    /// Raw byte string.
    Bytes(Bytes),
    /// UTF-8 string.
    String(String),
    /// Nested tuple.
    Tuple(Vec<Element>),
    /// Signed integer. Canonical for every magnitude representable as `i64`.
    Int(i64),
    /// Unsigned integer, canonical only above `i64::MAX`.
    UInt(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean; shares the integer encoding (`0` / `1`).
    Bool(bool),
    /// 128-bit UUID.
    Uuid(Uuid),
    /// 64-bit UUID.
    Uuid64(Uuid64),
    /// Sentinel marker for directory-partition key dumps.
    Directory,
    /// Sentinel marker for system-keyspace key dumps.
    System,
}

/// The kind of an [`Element`], used in conversion errors and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Nil,
    Bytes,
    String,
    Tuple,
    Int,
    UInt,
    Float,
    Double,
    Bool,
    Uuid,
    Uuid64,
    Directory,
    System,
}

impl ElementKind {
    pub fn of(element: &Element) -> Self {
        match element {
            Element::Nil => ElementKind::Nil,
            Element::Bytes(_) => ElementKind::Bytes,
            Element::String(_) => ElementKind::String,
            Element::Tuple(_) => ElementKind::Tuple,
            Element::Int(_) => ElementKind::Int,
            Element::UInt(_) => ElementKind::UInt,
            Element::Float(_) => ElementKind::Float,
            Element::Double(_) => ElementKind::Double,
            Element::Bool(_) => ElementKind::Bool,
            Element::Uuid(_) => ElementKind::Uuid,
            Element::Uuid64(_) => ElementKind::Uuid64,
            Element::Directory => ElementKind::Directory,
            Element::System => ElementKind::System,
        }
    }
}

impl Element {
    pub fn kind(&self) -> ElementKind { ElementKind::of(self) }

    /// Canonical integer value for the kinds that share the integer
    /// encoding: `Int`, `UInt` and `Bool`.
    pub(crate) fn as_canonical_int(&self) -> Option<i128> {
        match self {
            Element::Int(v) => Some(*v as i128),
            Element::UInt(v) => Some(*v as i128),
            Element::Bool(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Rank of this element's class in the wire format's cross-type order.
    fn order_class(&self) -> u8 {
        match self {
            Element::Nil => 0,
            Element::Bytes(_) => 1,
            Element::String(_) => 2,
            Element::Tuple(_) => 3,
            Element::Int(_) | Element::UInt(_) | Element::Bool(_) => 4,
            Element::Float(_) => 5,
            Element::Double(_) => 6,
            Element::Uuid(_) => 7,
            Element::Uuid64(_) => 8,
            Element::Directory => 9,
            Element::System => 10,
        }
    }

    /// Total order matching lexicographic comparison of the encoded forms.
    pub fn cmp_canonical(&self, other: &Element) -> Ordering {
        let (ca, cb) = (self.order_class(), other.order_class());
        if ca != cb {
            return ca.cmp(&cb);
        }
        match (self, other) {
            (Element::Bytes(a), Element::Bytes(b)) => a.cmp(b),
            (Element::String(a), Element::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Element::Tuple(a), Element::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.cmp_canonical(y) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Element::Float(a), Element::Float(b)) => f32_order_key(*a).cmp(&f32_order_key(*b)),
            (Element::Double(a), Element::Double(b)) => f64_order_key(*a).cmp(&f64_order_key(*b)),
            (Element::Uuid(a), Element::Uuid(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Element::Uuid64(a), Element::Uuid64(b)) => a.0.cmp(&b.0),
            (a, b) => match (a.as_canonical_int(), b.as_canonical_int()) {
                (Some(x), Some(y)) => x.cmp(&y),
                // Same class with no canonical integer: Nil, Directory, System.
                _ => Ordering::Equal,
            },
        }
    }

    /// Strict equality: same representation, same payload. Distinguishes
    /// `Bool(true)` from `Int(1)` where the default equality does not.
    pub fn eq_strict(&self, other: &Element) -> bool {
        match (self, other) {
            (Element::Int(a), Element::Int(b)) => a == b,
            (Element::UInt(a), Element::UInt(b)) => a == b,
            (Element::Bool(a), Element::Bool(b)) => a == b,
            (Element::Tuple(a), Element::Tuple(b)) => a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_strict(y)),
            (Element::Int(_), _) | (Element::UInt(_), _) | (Element::Bool(_), _) => false,
            (_, Element::Int(_)) | (_, Element::UInt(_)) | (_, Element::Bool(_)) => false,
            (a, b) => a == b,
        }
    }

    /// Loose equivalence: numeric kinds compare by mathematical value, and a
    /// decimal string compares equal to the number it spells.
    pub fn similar_to(&self, other: &Element) -> bool {
        if self == other {
            return true;
        }
        match (self.numeric_value(), other.numeric_value()) {
            (Some(a), Some(b)) => a.value_eq(&b),
            _ => false,
        }
    }

    fn numeric_value(&self) -> Option<Numeric> {
        match self {
            Element::Int(_) | Element::UInt(_) | Element::Bool(_) => self.as_canonical_int().map(Numeric::Int),
            Element::Float(f) => Some(Numeric::Float(*f as f64)),
            Element::Double(d) => Some(Numeric::Float(*d)),
            Element::String(s) => {
                if let Ok(i) = s.parse::<i128>() {
                    Some(Numeric::Int(i))
                } else {
                    s.parse::<f64>().ok().map(Numeric::Float)
                }
            }
            _ => None,
        }
    }
}

enum Numeric {
    Int(i128),
    Float(f64),
}

impl Numeric {
    fn value_eq(&self, other: &Numeric) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            (Numeric::Float(a), Numeric::Float(b)) => a == b,
            (Numeric::Int(i), Numeric::Float(f)) | (Numeric::Float(f), Numeric::Int(i)) => {
                f.is_finite() && f.trunc() == *f && f.abs() < (1u128 << 127) as f64 && *i == *f as i128
            }
        }
    }
}

/// Order-preserving transform of float bits: flip the sign bit of positives,
/// all bits of negatives. Comparing the transformed bits equals comparing
/// the encoded bodies byte by byte.
pub(crate) fn f32_order_key(value: f32) -> u32 {
    let bits = value.to_bits();
    if bits & 0x8000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000
    }
}

pub(crate) fn f64_order_key(value: f64) -> u64 {
    let bits = value.to_bits();
    if bits & 0x8000_0000_0000_0000 != 0 {
        !bits
    } else {
        bits ^ 0x8000_0000_0000_0000
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Element::Nil, Element::Nil) => true,
            (Element::Directory, Element::Directory) => true,
            (Element::System, Element::System) => true,
            (Element::Bytes(a), Element::Bytes(b)) => a == b,
            (Element::String(a), Element::String(b)) => a == b,
            (Element::Tuple(a), Element::Tuple(b)) => a == b,
            (Element::Float(a), Element::Float(b)) => a.to_bits() == b.to_bits(),
            (Element::Double(a), Element::Double(b)) => a.to_bits() == b.to_bits(),
            (Element::Uuid(a), Element::Uuid(b)) => a == b,
            (Element::Uuid64(a), Element::Uuid64(b)) => a == b,
            (a, b) => match (a.as_canonical_int(), b.as_canonical_int()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // The class discriminant feeds the hash, not the variant, so that
        // Bool(true) and Int(1) hash identically (they are equal).
        match self {
            Element::Nil => 0u8.hash(state),
            Element::Bytes(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Element::String(s) => {
                2u8.hash(state);
                s.hash(state);
            }
            Element::Tuple(items) => {
                3u8.hash(state);
                items.hash(state);
            }
            Element::Int(_) | Element::UInt(_) | Element::Bool(_) => {
                4u8.hash(state);
                self.as_canonical_int().hash(state);
            }
            Element::Float(f) => {
                5u8.hash(state);
                f.to_bits().hash(state);
            }
            Element::Double(d) => {
                6u8.hash(state);
                d.to_bits().hash(state);
            }
            Element::Uuid(u) => {
                7u8.hash(state);
                u.hash(state);
            }
            Element::Uuid64(u) => {
                8u8.hash(state);
                u.hash(state);
            }
            Element::Directory => 9u8.hash(state),
            Element::System => 10u8.hash(state),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Nil => write!(f, "nil"),
            Element::Bytes(b) => {
                write!(f, "'")?;
                for &byte in b.iter() {
                    if (0x20..0x7F).contains(&byte) && byte != b'\'' {
                        write!(f, "{}", byte as char)?;
                    } else {
                        write!(f, "\\x{byte:02x}")?;
                    }
                }
                write!(f, "'")
            }
            Element::String(s) => write!(f, "{s:?}"),
            Element::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Element::Int(v) => write!(f, "{v}"),
            Element::UInt(v) => write!(f, "{v}"),
            Element::Float(v) => write!(f, "{v}"),
            Element::Double(v) => write!(f, "{v}"),
            Element::Bool(v) => write!(f, "{v}"),
            Element::Uuid(u) => write!(f, "{{{u}}}"),
            Element::Uuid64(u) => write!(f, "{u}"),
            Element::Directory => write!(f, "<directory>"),
            Element::System => write!(f, "<system>"),
        }
    }
}

impl From<i64> for Element {
    fn from(v: i64) -> Self { Element::Int(v) }
}

impl From<i32> for Element {
    fn from(v: i32) -> Self { Element::Int(v as i64) }
}

impl From<i16> for Element {
    fn from(v: i16) -> Self { Element::Int(v as i64) }
}

impl From<i8> for Element {
    fn from(v: i8) -> Self { Element::Int(v as i64) }
}

impl From<u64> for Element {
    fn from(v: u64) -> Self {
        // Canonical form: UInt only for magnitudes i64 cannot hold.
        if v <= i64::MAX as u64 {
            Element::Int(v as i64)
        } else {
            Element::UInt(v)
        }
    }
}

impl From<u32> for Element {
    fn from(v: u32) -> Self { Element::Int(v as i64) }
}

impl From<u16> for Element {
    fn from(v: u16) -> Self { Element::Int(v as i64) }
}

impl From<u8> for Element {
    fn from(v: u8) -> Self { Element::Int(v as i64) }
}

impl From<bool> for Element {
    fn from(v: bool) -> Self { Element::Bool(v) }
}

impl From<f32> for Element {
    fn from(v: f32) -> Self { Element::Float(v) }
}

impl From<f64> for Element {
    fn from(v: f64) -> Self { Element::Double(v) }
}

impl From<&str> for Element {
    fn from(v: &str) -> Self { Element::String(v.to_owned()) }
}

impl From<String> for Element {
    fn from(v: String) -> Self { Element::String(v) }
}

impl From<Bytes> for Element {
    fn from(v: Bytes) -> Self { Element::Bytes(v) }
}

impl From<Vec<u8>> for Element {
    fn from(v: Vec<u8>) -> Self { Element::Bytes(Bytes::from(v)) }
}

impl From<&[u8]> for Element {
    fn from(v: &[u8]) -> Self { Element::Bytes(Bytes::copy_from_slice(v)) }
}

impl From<Uuid> for Element {
    fn from(v: Uuid) -> Self { Element::Uuid(v) }
}

impl From<Uuid64> for Element {
    fn from(v: Uuid64) -> Self { Element::Uuid64(v) }
}

impl From<Vec<Element>> for Element {
    fn from(v: Vec<Element>) -> Self { Element::Tuple(v) }
}

impl<T: Into<Element>> From<Option<T>> for Element {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Element::Nil,
        }
    }
}
