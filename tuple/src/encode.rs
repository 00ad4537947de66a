//! Scalar encoders and the [`TuplePack`] trait.
//!
//! Every scalar encodes as `type_code (u8) || body`. Integers pick the
//! minimum body width that represents the magnitude; negatives store the
//! one's complement of the magnitude so that the byte order of encodings
//! matches the numeric order of values. Floats flip the sign bit of
//! positives and every bit of negatives for the same reason.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::buffer::KeyWriter;
use crate::element::{codes, Element, Uuid64};

/// Number of bytes needed to hold `magnitude`; 0 for 0.
fn byte_width(magnitude: u64) -> usize { ((64 - magnitude.leading_zeros() as usize) + 7) / 8 }

/// All-ones value of `width` bytes: `2^(8*width) - 1`.
fn ones(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    }
}

pub(crate) fn write_nil(w: &mut KeyWriter) { w.write_byte(codes::NIL) }

pub(crate) fn write_byte_string(w: &mut KeyWriter, bytes: &[u8]) {
    w.write_byte(codes::BYTES);
    w.write_escaped(bytes);
}

pub(crate) fn write_string(w: &mut KeyWriter, s: &str) {
    w.write_byte(codes::STRING);
    w.write_escaped(s.as_bytes());
}

pub(crate) fn write_int(w: &mut KeyWriter, value: i64) {
    if value >= 0 {
        return write_uint(w, value as u64);
    }
    let magnitude = value.unsigned_abs();
    let n = byte_width(magnitude);
    w.write_byte(codes::INT_ZERO - n as u8);
    let body = (ones(n) - magnitude).to_be_bytes();
    w.write_bytes(&body[8 - n..]);
}

pub(crate) fn write_uint(w: &mut KeyWriter, value: u64) {
    let n = byte_width(value);
    w.write_byte(codes::INT_ZERO + n as u8);
    let body = value.to_be_bytes();
    w.write_bytes(&body[8 - n..]);
}

pub(crate) fn write_bool(w: &mut KeyWriter, value: bool) {
    // Booleans share the integer encoding: 0x14 for false, 0x15 0x01 for true.
    if value {
        w.write_byte_pair(codes::INT_ZERO + 1, 0x01);
    } else {
        w.write_byte(codes::INT_ZERO);
    }
}

pub(crate) fn write_float(w: &mut KeyWriter, value: f32) {
    w.write_byte(codes::FLOAT);
    let mut body = value.to_bits().to_be_bytes();
    mangle_float_bytes(&mut body);
    w.write_bytes(&body);
}

pub(crate) fn write_double(w: &mut KeyWriter, value: f64) {
    w.write_byte(codes::DOUBLE);
    let mut body = value.to_bits().to_be_bytes();
    mangle_float_bytes(&mut body);
    w.write_bytes(&body);
}

/// Encode-direction sign mangling: negatives flip every bit, positives flip
/// the sign bit. The decoder applies [`unmangle_float_bytes`].
pub(crate) fn mangle_float_bytes(body: &mut [u8]) {
    if body[0] & 0x80 != 0 {
        for b in body.iter_mut() {
            *b = !*b;
        }
    } else {
        body[0] ^= 0x80;
    }
}

pub(crate) fn unmangle_float_bytes(body: &mut [u8]) {
    if body[0] & 0x80 == 0 {
        for b in body.iter_mut() {
            *b = !*b;
        }
    } else {
        body[0] ^= 0x80;
    }
}

pub(crate) fn write_uuid(w: &mut KeyWriter, value: &Uuid) {
    w.write_byte(codes::UUID128);
    w.write_bytes(value.as_bytes());
}

pub(crate) fn write_uuid64(w: &mut KeyWriter, value: Uuid64) {
    w.write_byte(codes::UUID64);
    w.write_bytes(&value.0.to_be_bytes());
}

/// Encode a nested tuple: the concatenated element encodings with `0x00`
/// escaped, closed by the `0x00` terminator.
pub(crate) fn write_nested(w: &mut KeyWriter, items: &[Element]) {
    let mut body = KeyWriter::with_capacity(items.len() * 4);
    for item in items {
        write_element(&mut body, item);
    }
    w.write_byte(codes::NESTED);
    w.write_escaped(body.as_slice());
}

/// Runtime dispatch over the scalar sum.
pub(crate) fn write_element(w: &mut KeyWriter, element: &Element) {
    match element {
        Element::Nil => write_nil(w),
        Element::Bytes(b) => write_byte_string(w, b),
        Element::String(s) => write_string(w, s),
        Element::Tuple(items) => write_nested(w, items),
        Element::Int(v) => write_int(w, *v),
        Element::UInt(v) => write_uint(w, *v),
        Element::Float(v) => write_float(w, *v),
        Element::Double(v) => write_double(w, *v),
        Element::Bool(v) => write_bool(w, *v),
        Element::Uuid(u) => write_uuid(w, u),
        Element::Uuid64(u) => write_uuid64(w, *u),
        Element::Directory => w.write_byte(codes::DIRECTORY),
        Element::System => w.write_byte(codes::SYSTEM),
    }
}

/// A value that knows how to append its tuple encoding to a [`KeyWriter`].
///
/// Rust tuples of packable values are themselves packable, which gives the
/// variadic `encode_key((a, b, c))` surface without boxing the items.
pub trait TuplePack {
    fn pack_into(&self, w: &mut KeyWriter);
}

impl TuplePack for Element {
    fn pack_into(&self, w: &mut KeyWriter) { write_element(w, self) }
}

impl<T: TuplePack + ?Sized> TuplePack for &T {
    fn pack_into(&self, w: &mut KeyWriter) { T::pack_into(self, w) }
}

impl TuplePack for i64 {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, *self) }
}

impl TuplePack for i32 {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, *self as i64) }
}

impl TuplePack for i16 {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, *self as i64) }
}

impl TuplePack for i8 {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, *self as i64) }
}

impl TuplePack for u64 {
    fn pack_into(&self, w: &mut KeyWriter) { write_uint(w, *self) }
}

impl TuplePack for u32 {
    fn pack_into(&self, w: &mut KeyWriter) { write_uint(w, *self as u64) }
}

impl TuplePack for u16 {
    fn pack_into(&self, w: &mut KeyWriter) { write_uint(w, *self as u64) }
}

impl TuplePack for u8 {
    fn pack_into(&self, w: &mut KeyWriter) { write_uint(w, *self as u64) }
}

impl TuplePack for bool {
    fn pack_into(&self, w: &mut KeyWriter) { write_bool(w, *self) }
}

impl TuplePack for f32 {
    fn pack_into(&self, w: &mut KeyWriter) { write_float(w, *self) }
}

impl TuplePack for f64 {
    fn pack_into(&self, w: &mut KeyWriter) { write_double(w, *self) }
}

impl TuplePack for str {
    fn pack_into(&self, w: &mut KeyWriter) { write_string(w, self) }
}

impl TuplePack for String {
    fn pack_into(&self, w: &mut KeyWriter) { write_string(w, self) }
}

impl TuplePack for [u8] {
    fn pack_into(&self, w: &mut KeyWriter) { write_byte_string(w, self) }
}

impl TuplePack for Vec<u8> {
    fn pack_into(&self, w: &mut KeyWriter) { write_byte_string(w, self) }
}

impl TuplePack for Bytes {
    fn pack_into(&self, w: &mut KeyWriter) { write_byte_string(w, self) }
}

impl TuplePack for Uuid {
    fn pack_into(&self, w: &mut KeyWriter) { write_uuid(w, self) }
}

impl TuplePack for Uuid64 {
    fn pack_into(&self, w: &mut KeyWriter) { write_uuid64(w, *self) }
}

impl<T: TuplePack> TuplePack for Option<T> {
    fn pack_into(&self, w: &mut KeyWriter) {
        match self {
            Some(v) => v.pack_into(w),
            None => write_nil(w),
        }
    }
}

/// 100-nanosecond ticks since the Unix epoch.
pub fn datetime_to_ticks(value: &DateTime<Utc>) -> i64 {
    match value.timestamp_nanos_opt() {
        Some(nanos) => nanos / 100,
        // Past the nanosecond-representable span: fall back to microseconds.
        None => value.timestamp_micros().saturating_mul(10),
    }
}

/// 100-nanosecond ticks spanned by the interval.
pub fn timedelta_to_ticks(value: &TimeDelta) -> i64 {
    match value.num_nanoseconds() {
        Some(nanos) => nanos / 100,
        None => value.num_microseconds().map(|us| us.saturating_mul(10)).unwrap_or(i64::MAX),
    }
}

impl TuplePack for DateTime<Utc> {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, datetime_to_ticks(self)) }
}

impl TuplePack for TimeDelta {
    fn pack_into(&self, w: &mut KeyWriter) { write_int(w, timedelta_to_ticks(self)) }
}

macro_rules! impl_tuple_pack {
    ($($name:ident),+) => {
        impl<$($name: TuplePack),+> TuplePack for ($($name,)+) {
            fn pack_into(&self, w: &mut KeyWriter) {
                #[allow(non_snake_case)]
                let ($(ref $name,)+) = *self;
                $($name.pack_into(w);)+
            }
        }
    };
}

impl_tuple_pack!(A);
impl_tuple_pack!(A, B);
impl_tuple_pack!(A, B, C);
impl_tuple_pack!(A, B, C, D);
impl_tuple_pack!(A, B, C, D, E);
impl_tuple_pack!(A, B, C, D, E, F);
impl_tuple_pack!(A, B, C, D, E, F, G);
impl_tuple_pack!(A, B, C, D, E, F, G, H);
