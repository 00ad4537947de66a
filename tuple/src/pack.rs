//! Packing, unpacking and key-range derivation.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::buffer::{KeyReader, KeyWriter};
use crate::decode::{decode_next, FromElement, TupleDecode};
use crate::encode::TuplePack;
use crate::error::TupleError;
use crate::sliced::SlicedTuple;
use crate::tuple::Tuple;

/// Encode every item of `tuple` in order, with no outer framing.
pub fn pack(tuple: &Tuple) -> Bytes { tuple.pack() }

/// Write `prefix` verbatim, then the tuple encoding.
pub fn pack_prefixed(prefix: &[u8], tuple: &Tuple) -> Bytes {
    let mut w = KeyWriter::with_capacity(prefix.len() + tuple.len() * 8 + 8);
    w.write_bytes(prefix);
    tuple.pack_into(&mut w);
    w.freeze()
}

/// Encode any packable value (or Rust tuple of packable values) as a key.
pub fn encode_key<T: TuplePack>(value: T) -> Bytes {
    let mut w = KeyWriter::new();
    value.pack_into(&mut w);
    w.freeze()
}

/// Batch form of [`encode_key`]: every item (preceded by the optional shared
/// prefix) is packed into a single backing buffer, and the returned slices
/// all share that buffer. Saves one allocation per key.
pub fn encode_keys<T: TuplePack>(items: &[T], prefix: Option<&[u8]>) -> Vec<Bytes> {
    let prefix_len = prefix.map_or(0, <[u8]>::len);
    let mut w = KeyWriter::with_capacity(items.len() * (prefix_len + 8));
    let mut ends = Vec::with_capacity(items.len());
    for item in items {
        if let Some(p) = prefix {
            w.write_bytes(p);
        }
        item.pack_into(&mut w);
        ends.push(w.position());
    }
    let buf = w.freeze();
    let mut out = Vec::with_capacity(ends.len());
    let mut start = 0;
    for end in ends {
        out.push(buf.slice(start..end));
        start = end;
    }
    out
}

/// Parse a packed tuple. The empty slice decodes to the empty tuple; any
/// unparseable or trailing bytes fail with `MalformedTuple`.
pub fn unpack(bytes: impl Into<Bytes>) -> Result<Tuple, TupleError> {
    let bytes = bytes.into();
    if bytes.is_empty() {
        return Ok(Tuple::Empty);
    }
    SlicedTuple::parse(bytes).map(Tuple::Sliced)
}

/// Like [`unpack`], after checking for and stripping `prefix`.
pub fn unpack_prefixed(bytes: impl Into<Bytes>, prefix: &[u8]) -> Result<Tuple, TupleError> {
    let bytes = bytes.into();
    if !bytes.starts_with(prefix) {
        return Err(TupleError::PrefixMismatch);
    }
    unpack(bytes.slice(prefix.len()..))
}

/// Decode only the first item of a packed tuple.
pub fn decode_first<T: FromElement>(bytes: &[u8]) -> Result<T, TupleError> {
    let mut r = KeyReader::new(bytes);
    decode_next(&mut r)?.ok_or(TupleError::Empty)
}

/// Decode only the last item of a packed tuple.
pub fn decode_last<T: FromElement>(bytes: &[u8]) -> Result<T, TupleError> {
    let mut r = KeyReader::new(bytes);
    let mut last = None;
    while let Some(el) = decode_next(&mut r)? {
        last = Some(el);
    }
    match last {
        Some(el) => T::from_element(el),
        None => Err(TupleError::Empty),
    }
}

/// Decode the sole item of a packed singleton tuple.
pub fn decode_key<T: FromElement>(bytes: &[u8]) -> Result<T, TupleError> {
    let mut r = KeyReader::new(bytes);
    let first = decode_next(&mut r)?.ok_or(TupleError::Empty)?;
    let mut extra = 0;
    while decode_next::<crate::element::Element>(&mut r)?.is_some() {
        extra += 1;
    }
    if extra > 0 {
        return Err(TupleError::ArityMismatch { actual: extra + 1 });
    }
    T::from_element(first)
}

/// Decode a packed tuple straight into a Rust tuple of the expected types;
/// the arity must match exactly.
pub fn unpack_as<T: TupleDecode>(bytes: &[u8]) -> Result<T, TupleError> {
    let mut r = KeyReader::new(bytes);
    if r.is_empty() {
        return Err(TupleError::Empty);
    }
    let out = T::decode_from(&mut r)?;
    if !r.is_empty() {
        let mut extra = 0;
        while decode_next::<crate::element::Element>(&mut r)?.is_some() {
            extra += 1;
        }
        return Err(TupleError::ArityMismatch { actual: T::ARITY + extra });
    }
    Ok(out)
}

/// Human-readable rendition of a packed key, for logs and key dumps:
/// `("users", 42)` when the bytes parse as a tuple, a hex dump otherwise.
/// Directory- and system-keyspace markers render as `<directory>` and
/// `<system>`. Informational only; the byte encoding is the contract.
pub fn dump_key(bytes: &[u8]) -> String {
    match unpack(Bytes::copy_from_slice(bytes)) {
        Ok(tuple) => tuple.to_string(),
        Err(_) => {
            let mut out = String::with_capacity(bytes.len() * 3 + 2);
            out.push('<');
            for (i, b) in bytes.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&format!("{b:02X}"));
            }
            out.push('>');
            out
        }
    }
}

/// Decode the item at `index` of a packed tuple, skipping everything before
/// it without materializing the rest.
pub fn decode_at<T: FromElement>(bytes: &[u8], index: usize) -> Result<T, TupleError> {
    let mut r = KeyReader::new(bytes);
    let mut seen = 0;
    while let Some(el) = decode_next::<crate::element::Element>(&mut r)? {
        if seen == index {
            return T::from_element(el);
        }
        seen += 1;
    }
    if seen == 0 {
        Err(TupleError::Empty)
    } else {
        Err(TupleError::IndexOutOfRange { index: index as isize, len: seen })
    }
}

/// A half-open byte-key interval `[begin, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    pub begin: Bytes,
    pub end: Bytes,
}

impl KeyRange {
    pub fn new(begin: impl Into<Bytes>, end: impl Into<Bytes>) -> Self { KeyRange { begin: begin.into(), end: end.into() } }

    /// Whether `key` falls inside `[begin, end)`.
    pub fn contains(&self, key: &[u8]) -> bool { *key >= *self.begin && *key < *self.end }

    /// Whether the interval holds no key at all.
    pub fn is_empty(&self) -> bool { *self.begin >= *self.end }

    /// Whether any key lies in both intervals.
    pub fn intersects(&self, other: &KeyRange) -> bool {
        !self.is_empty() && !other.is_empty() && *self.begin < *other.end && *other.begin < *self.end
    }
}

/// The smallest key strictly greater than every key that starts with
/// `prefix`: the prefix with its rightmost non-`0xFF` byte incremented and
/// everything after it dropped. `None` when no such key exists (the prefix
/// is empty or all `0xFF`).
pub fn prefix_successor(prefix: &[u8]) -> Option<Bytes> {
    let last = prefix.iter().rposition(|&b| b != 0xFF)?;
    let mut out = prefix[..=last].to_vec();
    out[last] += 1;
    Some(Bytes::from(out))
}

/// The range of every key that strictly extends `prefix`:
/// `[prefix || 0x00, prefix || 0xFF)`. The prefix itself is excluded.
pub fn to_range(prefix: &[u8]) -> KeyRange {
    let mut begin = Vec::with_capacity(prefix.len() + 1);
    begin.extend_from_slice(prefix);
    begin.push(0x00);
    let mut end = Vec::with_capacity(prefix.len() + 1);
    end.extend_from_slice(prefix);
    end.push(0xFF);
    KeyRange { begin: Bytes::from(begin), end: Bytes::from(end) }
}
