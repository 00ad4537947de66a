//! Decoded view of a packed tuple that remembers each item's byte window.
//!
//! Unpacking validates the whole input once and records where every item
//! starts and ends; items are only materialized on access, and the raw
//! window of an item can be handed out without re-decoding anything.

use std::ops::Range;

use bytes::Bytes;

use crate::buffer::KeyReader;
use crate::decode::decode_element;
use crate::element::Element;
use crate::error::TupleError;

#[derive(Debug, Clone)]
pub struct SlicedTuple {
    bytes: Bytes,
    windows: Vec<Range<usize>>,
}

impl SlicedTuple {
    /// Validate `bytes` as a packed tuple and record the item windows.
    pub(crate) fn parse(bytes: Bytes) -> Result<SlicedTuple, TupleError> {
        let mut windows = Vec::new();
        let mut reader = KeyReader::new(&bytes);
        while !reader.is_empty() {
            let start = reader.position();
            decode_element(&mut reader)?;
            windows.push(start..reader.position());
        }
        Ok(SlicedTuple { bytes, windows })
    }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    /// The encoded bytes of item `index`, sharing the original backing buffer.
    pub fn raw_item(&self, index: usize) -> Option<Bytes> {
        self.windows.get(index).map(|w| self.bytes.slice(w.clone()))
    }

    /// Decode item `index`. The windows were validated at parse time, so this
    /// only fails if `index` is out of range.
    pub fn element(&self, index: usize) -> Result<Element, TupleError> {
        let window = self.windows.get(index).ok_or(TupleError::IndexOutOfRange { index: index as isize, len: self.len() })?;
        let mut reader = KeyReader::new(&self.bytes[window.clone()]);
        decode_element(&mut reader)
    }

    /// The packed form of the viewed items, zero-copy.
    pub fn packed(&self) -> Bytes {
        match (self.windows.first(), self.windows.last()) {
            (Some(first), Some(last)) => self.bytes.slice(first.start..last.end),
            _ => Bytes::new(),
        }
    }

    /// Sub-view of items `[from, to)`; bounds are already clamped by the
    /// caller.
    pub(crate) fn slice(&self, from: usize, to: usize) -> SlicedTuple {
        SlicedTuple { bytes: self.bytes.clone(), windows: self.windows[from..to].to_vec() }
    }

    pub fn iter(&self) -> impl Iterator<Item = Result<Element, TupleError>> + '_ { (0..self.len()).map(|i| self.element(i)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::KeyWriter;
    use crate::encode::TuplePack;

    fn packed<T: TuplePack>(value: T) -> Bytes {
        let mut w = KeyWriter::new();
        value.pack_into(&mut w);
        w.freeze()
    }

    #[test]
    fn windows_cover_input() {
        let buf = packed((1i64, "ab", false));
        let sliced = SlicedTuple::parse(buf.clone()).unwrap();
        assert_eq!(sliced.len(), 3);
        assert_eq!(sliced.packed(), buf);
        assert_eq!(sliced.raw_item(0).unwrap().as_ref(), &[0x15, 0x01]);
        assert_eq!(sliced.element(1).unwrap(), Element::from("ab"));
        assert!(sliced.element(3).is_err());
    }

    #[test]
    fn sub_slice_is_contiguous() {
        let buf = packed((1i64, 2i64, 3i64, 4i64));
        let sliced = SlicedTuple::parse(buf).unwrap();
        let mid = sliced.slice(1, 3);
        assert_eq!(mid.len(), 2);
        assert_eq!(mid.packed().as_ref(), &[0x15, 0x02, 0x15, 0x03]);
    }

    #[test]
    fn trailing_garbage_fails_parse() {
        let mut buf = packed(1i64).to_vec();
        buf.push(0x42);
        assert!(SlicedTuple::parse(Bytes::from(buf)).is_err());
    }
}
