//! In-memory tuple values.
//!
//! All tuple shapes are cases of one enum: the empty singleton, inline
//! fixed-arity records for the common short keys, a shared list window for
//! larger arities, lazy linked/joined compositions that borrow their head
//! through an `Arc` instead of copying it, a binary-prefixed wrapper, a
//! memoized form carrying its packed bytes, and the decoded sliced view.
//!
//! Tuples are immutable; `append` and `concat` return new values.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use bytes::Bytes;

use crate::buffer::KeyWriter;
use crate::decode::FromElement;
use crate::element::Element;
use crate::encode::write_element;
use crate::error::TupleError;
use crate::pack::{to_range, KeyRange};
use crate::sliced::SlicedTuple;

#[derive(Debug, Clone)]
pub enum Tuple {
    /// The empty tuple.
    Empty,
    Fixed1([Element; 1]),
    Fixed2([Element; 2]),
    Fixed3([Element; 3]),
    Fixed4([Element; 4]),
    Fixed5([Element; 5]),
    Fixed6([Element; 6]),
    /// Window over a shared item list; used for arities above six and for
    /// slices of other tuples.
    List { items: Arc<[Element]>, offset: usize, len: usize },
    /// Binary prefix followed by the inner tuple. The prefix is written
    /// verbatim before the items; this is the only shape that interposes
    /// non-element bytes, and it never appears as an item of another tuple.
    Prefixed { prefix: Bytes, rest: Arc<Tuple> },
    /// Head tuple plus one appended item.
    Linked { head: Arc<Tuple>, last: Box<Element> },
    /// Two tuples composed end to end without copying either.
    Joined { head: Arc<Tuple>, tail: Arc<Tuple> },
    /// Items plus their cached packed form.
    Memoized { items: Arc<Tuple>, packed: Bytes },
    /// Decoded view over packed bytes; see [`SlicedTuple`].
    Sliced(SlicedTuple),
}

impl Default for Tuple {
    fn default() -> Self { Tuple::Empty }
}

impl Tuple {
    pub fn empty() -> Tuple { Tuple::Empty }

    /// Build the canonical shape for an owned item list: `Empty`, a fixed
    /// record up to arity six, or a list window above that.
    pub fn from_elements(items: Vec<Element>) -> Tuple {
        match items.len() {
            0 => Tuple::Empty,
            1 => match <[Element; 1]>::try_from(items) {
                Ok(arr) => Tuple::Fixed1(arr),
                Err(items) => Tuple::list_from(items),
            },
            2 => match <[Element; 2]>::try_from(items) {
                Ok(arr) => Tuple::Fixed2(arr),
                Err(items) => Tuple::list_from(items),
            },
            3 => match <[Element; 3]>::try_from(items) {
                Ok(arr) => Tuple::Fixed3(arr),
                Err(items) => Tuple::list_from(items),
            },
            4 => match <[Element; 4]>::try_from(items) {
                Ok(arr) => Tuple::Fixed4(arr),
                Err(items) => Tuple::list_from(items),
            },
            5 => match <[Element; 5]>::try_from(items) {
                Ok(arr) => Tuple::Fixed5(arr),
                Err(items) => Tuple::list_from(items),
            },
            6 => match <[Element; 6]>::try_from(items) {
                Ok(arr) => Tuple::Fixed6(arr),
                Err(items) => Tuple::list_from(items),
            },
            _ => Tuple::list_from(items),
        }
    }

    fn list_from(items: Vec<Element>) -> Tuple {
        let len = items.len();
        Tuple::List { items: items.into(), offset: 0, len }
    }

    /// Wrap `rest` behind a raw binary prefix.
    pub fn prefixed(prefix: impl Into<Bytes>, rest: Tuple) -> Tuple {
        Tuple::Prefixed { prefix: prefix.into(), rest: Arc::new(rest) }
    }

    pub fn len(&self) -> usize {
        match self {
            Tuple::Empty => 0,
            Tuple::Fixed1(_) => 1,
            Tuple::Fixed2(_) => 2,
            Tuple::Fixed3(_) => 3,
            Tuple::Fixed4(_) => 4,
            Tuple::Fixed5(_) => 5,
            Tuple::Fixed6(_) => 6,
            Tuple::List { len, .. } => *len,
            Tuple::Prefixed { rest, .. } => rest.len(),
            Tuple::Linked { head, .. } => head.len() + 1,
            Tuple::Joined { head, tail } => head.len() + tail.len(),
            Tuple::Memoized { items, .. } => items.len(),
            Tuple::Sliced(sliced) => sliced.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// The inline item slice, for the flat shapes.
    fn as_flat(&self) -> Option<&[Element]> {
        match self {
            Tuple::Empty => Some(&[]),
            Tuple::Fixed1(a) => Some(a),
            Tuple::Fixed2(a) => Some(a),
            Tuple::Fixed3(a) => Some(a),
            Tuple::Fixed4(a) => Some(a),
            Tuple::Fixed5(a) => Some(a),
            Tuple::Fixed6(a) => Some(a),
            Tuple::List { items, offset, len } => Some(&items[*offset..*offset + *len]),
            _ => None,
        }
    }

    /// Item at `index`; negative indices count from the tail (`-1` is the
    /// last item).
    pub fn get(&self, index: isize) -> Result<Element, TupleError> {
        let len = self.len();
        let resolved = if index < 0 { index + len as isize } else { index };
        if resolved < 0 || resolved >= len as isize {
            return Err(TupleError::IndexOutOfRange { index, len });
        }
        self.get_at(resolved as usize)
    }

    fn get_at(&self, index: usize) -> Result<Element, TupleError> {
        if let Some(items) = self.as_flat() {
            return items.get(index).cloned().ok_or(TupleError::IndexOutOfRange { index: index as isize, len: self.len() });
        }
        match self {
            Tuple::Prefixed { rest, .. } => rest.get_at(index),
            Tuple::Linked { head, last } => {
                if index < head.len() {
                    head.get_at(index)
                } else {
                    Ok((**last).clone())
                }
            }
            Tuple::Joined { head, tail } => {
                if index < head.len() {
                    head.get_at(index)
                } else {
                    tail.get_at(index - head.len())
                }
            }
            Tuple::Memoized { items, .. } => items.get_at(index),
            Tuple::Sliced(sliced) => sliced.element(index),
            // flat shapes handled above
            _ => Err(TupleError::IndexOutOfRange { index: index as isize, len: self.len() }),
        }
    }

    /// Item at `index`, converted through the coercing accessor.
    pub fn get_as<T: FromElement>(&self, index: isize) -> Result<T, TupleError> { T::from_element(self.get(index)?) }

    pub fn first(&self) -> Result<Element, TupleError> {
        if self.is_empty() {
            return Err(TupleError::Empty);
        }
        self.get_at(0)
    }

    pub fn last(&self) -> Result<Element, TupleError> {
        if self.is_empty() {
            return Err(TupleError::Empty);
        }
        self.get_at(self.len() - 1)
    }

    pub fn last_as<T: FromElement>(&self) -> Result<T, TupleError> { T::from_element(self.last()?) }

    /// Visit every item in order without materializing intermediate tuples.
    fn visit(&self, f: &mut impl FnMut(&Element)) -> Result<(), TupleError> {
        if let Some(items) = self.as_flat() {
            for item in items {
                f(item);
            }
            return Ok(());
        }
        match self {
            Tuple::Prefixed { rest, .. } => rest.visit(f),
            Tuple::Linked { head, last } => {
                head.visit(f)?;
                f(last);
                Ok(())
            }
            Tuple::Joined { head, tail } => {
                head.visit(f)?;
                tail.visit(f)
            }
            Tuple::Memoized { items, .. } => items.visit(f),
            Tuple::Sliced(sliced) => {
                for item in sliced.iter() {
                    f(&item?);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Owned snapshot of the items in order.
    pub fn to_vec(&self) -> Vec<Element> {
        let mut out = Vec::with_capacity(self.len());
        // Sliced windows were validated at parse time; the visitor cannot
        // fail on any shape reachable from safe constructors.
        let _ = self.visit(&mut |el| out.push(el.clone()));
        out
    }

    pub fn iter(&self) -> std::vec::IntoIter<Element> { self.to_vec().into_iter() }

    /// Items `[from, to)`, both bounds clamped to `[0, len]`.
    pub fn slice(&self, from: usize, to: usize) -> Tuple {
        let len = self.len();
        let from = from.min(len);
        let to = to.min(len);
        if from >= to {
            return Tuple::Empty;
        }
        match self {
            Tuple::List { items, offset, .. } => Tuple::List { items: items.clone(), offset: offset + from, len: to - from },
            Tuple::Sliced(sliced) => {
                let sub = sliced.slice(from, to);
                Tuple::Sliced(sub)
            }
            _ => {
                let items = self.to_vec();
                Tuple::from_elements(items[from..to].to_vec())
            }
        }
    }

    /// A new tuple with `item` appended.
    pub fn append(&self, item: impl Into<Element>) -> Tuple {
        let el = item.into();
        match self {
            Tuple::Empty => Tuple::Fixed1([el]),
            Tuple::Fixed1([a]) => Tuple::Fixed2([a.clone(), el]),
            Tuple::Fixed2([a, b]) => Tuple::Fixed3([a.clone(), b.clone(), el]),
            Tuple::Fixed3([a, b, c]) => Tuple::Fixed4([a.clone(), b.clone(), c.clone(), el]),
            Tuple::Fixed4([a, b, c, d]) => Tuple::Fixed5([a.clone(), b.clone(), c.clone(), d.clone(), el]),
            Tuple::Fixed5([a, b, c, d, e]) => Tuple::Fixed6([a.clone(), b.clone(), c.clone(), d.clone(), e.clone(), el]),
            Tuple::Fixed6(items) => {
                let mut v = items.to_vec();
                v.push(el);
                Tuple::from_elements(v)
            }
            other => Tuple::Linked { head: Arc::new(other.clone()), last: Box::new(el) },
        }
    }

    /// A new tuple holding the items of `self` followed by the items of
    /// `other`. Large inputs are composed lazily without copying.
    pub fn concat(&self, other: &Tuple) -> Tuple {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        if self.len() + other.len() <= 6 && !self.carries_prefix() && !other.carries_prefix() {
            let mut items = self.to_vec();
            items.extend(other.to_vec());
            return Tuple::from_elements(items);
        }
        Tuple::Joined { head: Arc::new(self.clone()), tail: Arc::new(other.clone()) }
    }

    /// Whether any part of this tuple carries a binary prefix. Such tuples
    /// must never be flattened to a bare item list, or the prefix bytes
    /// would be lost from the encoding.
    fn carries_prefix(&self) -> bool {
        match self {
            Tuple::Prefixed { .. } => true,
            Tuple::Linked { head, .. } => head.carries_prefix(),
            Tuple::Joined { head, tail } => head.carries_prefix() || tail.carries_prefix(),
            Tuple::Memoized { items, .. } => items.carries_prefix(),
            _ => false,
        }
    }

    /// Append this tuple's encoding to a writer. Recurses structurally so
    /// that a prefixed head keeps its raw bytes even inside linked or
    /// joined compositions.
    pub fn pack_into(&self, w: &mut KeyWriter) {
        match self {
            Tuple::Prefixed { prefix, rest } => {
                w.write_bytes(prefix);
                rest.pack_into(w);
            }
            Tuple::Memoized { packed, .. } => w.write_bytes(packed),
            Tuple::Sliced(sliced) => w.write_bytes(&sliced.packed()),
            Tuple::Linked { head, last } => {
                head.pack_into(w);
                write_element(w, last);
            }
            Tuple::Joined { head, tail } => {
                head.pack_into(w);
                tail.pack_into(w);
            }
            _ => {
                if let Some(items) = self.as_flat() {
                    for el in items {
                        write_element(w, el);
                    }
                }
            }
        }
    }

    /// Encode every item in order; no outer framing.
    pub fn pack(&self) -> Bytes {
        match self {
            Tuple::Memoized { packed, .. } => packed.clone(),
            Tuple::Sliced(sliced) => sliced.packed(),
            _ => {
                let mut w = KeyWriter::with_capacity(self.len() * 8 + 8);
                self.pack_into(&mut w);
                w.freeze()
            }
        }
    }

    /// Cached packed bytes, when this shape carries them.
    fn cached_bytes(&self) -> Option<Bytes> {
        match self {
            Tuple::Memoized { packed, .. } => Some(packed.clone()),
            Tuple::Sliced(sliced) => Some(sliced.packed()),
            _ => None,
        }
    }

    /// Eagerly pack and cache the encoded form. Subsequent `pack` calls
    /// return the cache and equality can short-circuit on byte equality.
    pub fn memoize(&self) -> Tuple {
        match self {
            Tuple::Memoized { .. } => self.clone(),
            _ => Tuple::Memoized { packed: self.pack(), items: Arc::new(self.clone()) },
        }
    }

    /// Whether the first items of `self` equal the items of `prefix`.
    pub fn starts_with(&self, prefix: &Tuple) -> bool {
        if prefix.len() > self.len() {
            return false;
        }
        let mine = self.to_vec();
        prefix.to_vec().iter().zip(mine.iter()).all(|(a, b)| a == b)
    }

    /// The encoded bytes of item `index` without re-decoding, for the
    /// sliced shape only.
    pub fn raw_item(&self, index: usize) -> Option<Bytes> {
        match self {
            Tuple::Sliced(sliced) => sliced.raw_item(index),
            _ => None,
        }
    }

    /// The half-open key range of every packed key that extends this tuple.
    pub fn range(&self) -> KeyRange { to_range(&self.pack()) }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        if let (Some(a), Some(b)) = (self.cached_bytes(), other.cached_bytes()) {
            // encoding equality coincides with structural equality
            return a == b;
        }
        if self.len() != other.len() {
            return false;
        }
        self.to_vec() == other.to_vec()
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        let _ = self.visit(&mut |el| el.hash(state));
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let items = self.to_vec();
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
}

impl From<Vec<Element>> for Tuple {
    fn from(items: Vec<Element>) -> Tuple { Tuple::from_elements(items) }
}

impl FromIterator<Element> for Tuple {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Tuple { Tuple::from_elements(iter.into_iter().collect()) }
}

impl From<SlicedTuple> for Tuple {
    fn from(sliced: SlicedTuple) -> Tuple { Tuple::Sliced(sliced) }
}

macro_rules! impl_tuple_from {
    ($variant:ident, $($name:ident : $idx:tt),+) => {
        impl<$($name: Into<Element>),+> From<($($name,)+)> for Tuple {
            fn from(t: ($($name,)+)) -> Tuple { Tuple::$variant([$(t.$idx.into()),+]) }
        }
    };
}

impl_tuple_from!(Fixed1, A:0);
impl_tuple_from!(Fixed2, A:0, B:1);
impl_tuple_from!(Fixed3, A:0, B:1, C:2);
impl_tuple_from!(Fixed4, A:0, B:1, C:2, D:3);
impl_tuple_from!(Fixed5, A:0, B:1, C:2, D:3, E:4);
impl_tuple_from!(Fixed6, A:0, B:1, C:2, D:3, E:4, F:5);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::{pack, unpack};

    #[test]
    fn append_upgrades_shapes() {
        let mut t = Tuple::Empty;
        for i in 0..6i64 {
            t = t.append(i);
            assert_eq!(t.len(), (i + 1) as usize);
        }
        assert!(matches!(t, Tuple::Fixed6(_)));
        let t7 = t.append(6i64);
        assert!(matches!(t7, Tuple::List { .. }));
        assert_eq!(t7.len(), 7);
        let t8 = t7.append(7i64);
        assert!(matches!(t8, Tuple::Linked { .. }));
        assert_eq!(t8.get_as::<i64>(-1).unwrap(), 7);
    }

    #[test]
    fn negative_indexing() {
        let t = Tuple::from((1i64, "two", false));
        assert_eq!(t.get_as::<i64>(0).unwrap(), 1);
        assert_eq!(t.get_as::<String>(-2).unwrap(), "two");
        assert_eq!(t.get_as::<bool>(-1).unwrap(), false);
        assert!(matches!(t.get(3), Err(TupleError::IndexOutOfRange { .. })));
        assert!(matches!(t.get(-4), Err(TupleError::IndexOutOfRange { .. })));
    }

    #[test]
    fn slicing_clamps() {
        let t = Tuple::from((1i64, 2i64, 3i64));
        assert_eq!(t.slice(1, 3).to_vec(), vec![Element::Int(2), Element::Int(3)]);
        assert_eq!(t.slice(0, 99).len(), 3);
        assert!(t.slice(2, 1).is_empty());
        assert!(t.slice(5, 9).is_empty());
    }

    #[test]
    fn concat_is_lazy_for_large_inputs() {
        let a = Tuple::from_elements((0..5i64).map(Element::from).collect());
        let b = Tuple::from_elements((5..10i64).map(Element::from).collect());
        let joined = a.concat(&b);
        assert!(matches!(joined, Tuple::Joined { .. }));
        assert_eq!(joined.len(), 10);
        assert_eq!(joined.pack(), {
            let mut all = a.to_vec();
            all.extend(b.to_vec());
            Tuple::from_elements(all).pack()
        });
    }

    #[test]
    fn concat_with_empty_is_identity() {
        let t = Tuple::from((1i64,));
        assert_eq!(t.concat(&Tuple::Empty), t);
        assert_eq!(Tuple::Empty.concat(&t), t);
    }

    #[test]
    fn memoized_pack_is_cached_and_equal() {
        let t = Tuple::from(("users", 42i64));
        let m = t.memoize();
        assert_eq!(m.pack(), t.pack());
        assert_eq!(m, t);
        assert_eq!(t, m);
    }

    #[test]
    fn prefixed_writes_prefix_verbatim() {
        let inner = Tuple::from((1i64,));
        let p = Tuple::prefixed(&b"\xFE\x01"[..], inner.clone());
        let packed = p.pack();
        assert_eq!(&packed[..2], b"\xFE\x01");
        assert_eq!(&packed[2..], inner.pack().as_ref());
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn prefix_survives_append_and_concat() {
        let p = Tuple::prefixed(&b"pfx"[..], Tuple::from((1i64,)));
        let expected_head = [b'p', b'f', b'x', 0x15, 0x01];

        let appended = p.append(2i64);
        assert_eq!(appended.pack().as_ref(), [&expected_head[..], &[0x15, 0x02]].concat().as_slice());

        let joined = p.concat(&Tuple::from((2i64,)));
        assert!(matches!(joined, Tuple::Joined { .. }));
        assert_eq!(joined.pack(), appended.pack());

        let memo = p.memoize().append(2i64);
        assert_eq!(memo.pack(), appended.pack());
    }

    #[test]
    fn sliced_roundtrip_preserves_equality_and_hash() {
        use std::collections::hash_map::DefaultHasher;
        fn hash_of(t: &Tuple) -> u64 {
            let mut h = DefaultHasher::new();
            t.hash(&mut h);
            h.finish()
        }
        let t = Tuple::from((true, "x"));
        let decoded = unpack(pack(&t)).unwrap();
        assert_eq!(decoded, t);
        assert_eq!(hash_of(&decoded), hash_of(&t));
    }

    #[test]
    fn display_format() {
        assert_eq!(Tuple::Empty.to_string(), "()");
        assert_eq!(Tuple::from(("hello",)).to_string(), "(\"hello\",)");
        assert_eq!(Tuple::from((1i64, true)).to_string(), "(1, true)");
    }

    #[test]
    fn starts_with_compares_items() {
        let base = Tuple::from(("users", 42i64));
        assert!(base.starts_with(&Tuple::from(("users",))));
        assert!(base.starts_with(&base));
        assert!(base.append("x").starts_with(&base));
        assert!(!base.starts_with(&Tuple::from(("orders",))));
        assert!(!Tuple::from(("users",)).starts_with(&base));
        assert!(base.starts_with(&Tuple::Empty));
    }

    #[test]
    fn raw_item_only_on_sliced() {
        let t = Tuple::from((1i64, "x"));
        assert_eq!(t.raw_item(0), None);
        let decoded = unpack(pack(&t)).unwrap();
        assert_eq!(decoded.raw_item(0).unwrap().as_ref(), &[0x15, 0x01]);
        assert_eq!(decoded.raw_item(1).unwrap().as_ref(), &[0x02, b'x', 0x00]);
        assert_eq!(decoded.raw_item(2), None);
    }

    #[test]
    fn last_on_empty_fails() {
        assert!(matches!(Tuple::Empty.last(), Err(TupleError::Empty)));
        assert!(matches!(Tuple::Empty.last_as::<i64>(), Err(TupleError::Empty)));
    }
}
