//! Streaming scalar decoder and the [`FromElement`] conversion trait.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::buffer::KeyReader;
use crate::element::{codes, Element, ElementKind, Uuid64};
use crate::encode::unmangle_float_bytes;
use crate::error::TupleError;

/// All-ones value of `width` bytes: `2^(8*width) - 1`.
fn ones(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    let mut out = 0u64;
    for &b in bytes {
        out = (out << 8) | b as u64;
    }
    out
}

/// Decode exactly one element from the reader.
pub fn decode_element(r: &mut KeyReader<'_>) -> Result<Element, TupleError> {
    let code = r.read_byte()?;
    match code {
        codes::NIL => Ok(Element::Nil),
        codes::BYTES => {
            let body = r.read_until_terminator()?;
            Ok(Element::Bytes(Bytes::copy_from_slice(&body)))
        }
        codes::STRING => {
            let body = r.read_until_terminator()?;
            match String::from_utf8(body.into_owned()) {
                Ok(s) => Ok(Element::String(s)),
                Err(err) => {
                    tracing::trace!("rejecting string element: {err}");
                    Err(TupleError::malformed("string body is not valid UTF-8"))
                }
            }
        }
        codes::NESTED => {
            let body = r.read_until_terminator()?;
            let mut inner = KeyReader::new(&body);
            let mut items = Vec::new();
            while !inner.is_empty() {
                items.push(decode_element(&mut inner)?);
            }
            Ok(Element::Tuple(items))
        }
        codes::NEG_INT_START..=codes::POS_INT_END => decode_int(r, code),
        codes::FLOAT => {
            let mut body = [0u8; 4];
            body.copy_from_slice(r.read_bytes(4)?);
            unmangle_float_bytes(&mut body);
            Ok(Element::Float(f32::from_bits(u32::from_be_bytes(body))))
        }
        codes::DOUBLE => {
            let mut body = [0u8; 8];
            body.copy_from_slice(r.read_bytes(8)?);
            unmangle_float_bytes(&mut body);
            Ok(Element::Double(f64::from_bits(u64::from_be_bytes(body))))
        }
        codes::UUID128 => {
            let mut body = [0u8; 16];
            body.copy_from_slice(r.read_bytes(16)?);
            Ok(Element::Uuid(Uuid::from_bytes(body)))
        }
        codes::UUID64 => {
            let mut body = [0u8; 8];
            body.copy_from_slice(r.read_bytes(8)?);
            Ok(Element::Uuid64(Uuid64(u64::from_be_bytes(body))))
        }
        codes::DIRECTORY => Ok(Element::Directory),
        codes::SYSTEM => Ok(Element::System),
        other => {
            tracing::trace!("rejecting unknown type code {other:#04x}");
            Err(TupleError::malformed(format!("unknown type code {other:#04x}")))
        }
    }
}

fn decode_int(r: &mut KeyReader<'_>, code: u8) -> Result<Element, TupleError> {
    if code == codes::INT_ZERO {
        return Ok(Element::Int(0));
    }
    if code > codes::INT_ZERO {
        let n = (code - codes::INT_ZERO) as usize;
        let body = r.read_bytes(n).map_err(|_| TupleError::malformed("truncated integer body"))?;
        let value = read_be(body);
        if value <= i64::MAX as u64 {
            Ok(Element::Int(value as i64))
        } else {
            Ok(Element::UInt(value))
        }
    } else {
        let n = (codes::INT_ZERO - code) as usize;
        let body = r.read_bytes(n).map_err(|_| TupleError::malformed("truncated integer body"))?;
        let magnitude = ones(n) - read_be(body);
        if magnitude > i64::MIN.unsigned_abs() {
            return Err(TupleError::UnsupportedType { wanted: "i64", found: ElementKind::Int });
        }
        Ok(Element::Int((magnitude as i128).wrapping_neg() as i64))
    }
}

/// Decode the next element and convert it, or `None` at end of input.
pub fn decode_next<T: FromElement>(r: &mut KeyReader<'_>) -> Result<Option<T>, TupleError> {
    if r.is_empty() {
        return Ok(None);
    }
    let element = decode_element(r)?;
    T::from_element(element).map(Some)
}

/// Checked conversion out of a dynamically typed element.
///
/// Conversions follow the coercing-accessor contract: integer kinds convert
/// across widths when the value fits, booleans accept 0/1, floats widen, and
/// everything else requires the matching representation.
pub trait FromElement: Sized {
    fn from_element(element: Element) -> Result<Self, TupleError>;
}

impl FromElement for Element {
    fn from_element(element: Element) -> Result<Self, TupleError> { Ok(element) }
}

fn int_in_range<T>(element: Element, wanted: &'static str, lo: i128, hi: i128, convert: impl Fn(i128) -> T) -> Result<T, TupleError> {
    match element.as_canonical_int() {
        Some(v) if (lo..=hi).contains(&v) => Ok(convert(v)),
        _ => Err(TupleError::UnsupportedType { wanted, found: element.kind() }),
    }
}

macro_rules! impl_from_element_int {
    ($ty:ty, $name:literal) => {
        impl FromElement for $ty {
            fn from_element(element: Element) -> Result<Self, TupleError> {
                int_in_range(element, $name, <$ty>::MIN as i128, <$ty>::MAX as i128, |v| v as $ty)
            }
        }
    };
}

impl_from_element_int!(i8, "i8");
impl_from_element_int!(i16, "i16");
impl_from_element_int!(i32, "i32");
impl_from_element_int!(i64, "i64");
impl_from_element_int!(u8, "u8");
impl_from_element_int!(u16, "u16");
impl_from_element_int!(u32, "u32");
impl_from_element_int!(u64, "u64");

impl FromElement for bool {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element.as_canonical_int() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(TupleError::UnsupportedType { wanted: "bool", found: element.kind() }),
        }
    }
}

impl FromElement for f32 {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Float(v) => Ok(v),
            other => Err(TupleError::UnsupportedType { wanted: "f32", found: other.kind() }),
        }
    }
}

impl FromElement for f64 {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Double(v) => Ok(v),
            Element::Float(v) => Ok(v as f64),
            Element::Int(v) => Ok(v as f64),
            Element::UInt(v) => Ok(v as f64),
            other => Err(TupleError::UnsupportedType { wanted: "f64", found: other.kind() }),
        }
    }
}

impl FromElement for String {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::String(s) => Ok(s),
            other => Err(TupleError::UnsupportedType { wanted: "String", found: other.kind() }),
        }
    }
}

impl FromElement for Bytes {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Bytes(b) => Ok(b),
            other => Err(TupleError::UnsupportedType { wanted: "Bytes", found: other.kind() }),
        }
    }
}

impl FromElement for Vec<u8> {
    fn from_element(element: Element) -> Result<Self, TupleError> { Bytes::from_element(element).map(|b| b.to_vec()) }
}

impl FromElement for Uuid {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Uuid(u) => Ok(u),
            other => Err(TupleError::UnsupportedType { wanted: "Uuid", found: other.kind() }),
        }
    }
}

impl FromElement for Uuid64 {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Uuid64(u) => Ok(u),
            other => Err(TupleError::UnsupportedType { wanted: "Uuid64", found: other.kind() }),
        }
    }
}

impl FromElement for Vec<Element> {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Tuple(items) => Ok(items),
            other => Err(TupleError::UnsupportedType { wanted: "Vec<Element>", found: other.kind() }),
        }
    }
}

impl<T: FromElement> FromElement for Option<T> {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        match element {
            Element::Nil => Ok(None),
            other => T::from_element(other).map(Some),
        }
    }
}

impl FromElement for DateTime<Utc> {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        let kind = element.kind();
        let ticks = i64::from_element(element)?;
        let secs = ticks.div_euclid(10_000_000);
        let nanos = (ticks.rem_euclid(10_000_000) * 100) as u32;
        DateTime::<Utc>::from_timestamp(secs, nanos).ok_or(TupleError::UnsupportedType { wanted: "DateTime<Utc>", found: kind })
    }
}

impl FromElement for TimeDelta {
    fn from_element(element: Element) -> Result<Self, TupleError> {
        let ticks = i64::from_element(element)?;
        let secs = ticks.div_euclid(10_000_000);
        let nanos = (ticks.rem_euclid(10_000_000) * 100) as u32;
        Ok(TimeDelta::new(secs, nanos).unwrap_or(TimeDelta::MAX))
    }
}

/// A Rust tuple of convertible scalars, decodable in one shot with a fixed
/// arity. The typed counterpart of the variadic `encode_key` surface.
pub trait TupleDecode: Sized {
    const ARITY: usize;

    fn decode_from(r: &mut KeyReader<'_>) -> Result<Self, TupleError>;
}

macro_rules! impl_tuple_decode {
    ($len:expr, $($name:ident),+) => {
        impl<$($name: FromElement),+> TupleDecode for ($($name,)+) {
            const ARITY: usize = $len;

            fn decode_from(r: &mut KeyReader<'_>) -> Result<Self, TupleError> {
                Ok(($($name::from_element(decode_element(r)?)?,)+))
            }
        }
    };
}

impl_tuple_decode!(1, A);
impl_tuple_decode!(2, A, B);
impl_tuple_decode!(3, A, B, C);
impl_tuple_decode!(4, A, B, C, D);
impl_tuple_decode!(5, A, B, C, D, E);
impl_tuple_decode!(6, A, B, C, D, E, F);
impl_tuple_decode!(7, A, B, C, D, E, F, G);
impl_tuple_decode!(8, A, B, C, D, E, F, G, H);
