//! Set of non-overlapping half-open ranges.
//!
//! The valueless sibling of the range dictionary: `mark` coalesces
//! unconditionally on overlap or adjacency, so the set always holds the
//! minimal list of disjoint intervals covering everything ever marked.

use std::cmp::Ordering;
use std::fmt;

use crate::cmp::{Comparer, NaturalOrder};
use crate::error::ColaError;
use crate::store::ColaStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span<K> {
    pub begin: K,
    pub end: K,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ByBegin<C>(pub C);

impl<K, C: Comparer<K>> Comparer<Span<K>> for ByBegin<C> {
    fn compare(&self, a: &Span<K>, b: &Span<K>) -> Ordering { self.0.compare(&a.begin, &b.begin) }
}

pub struct ColaRangeSet<K, C: Comparer<K> = NaturalOrder> {
    store: ColaStore<Span<K>, ByBegin<C>>,
    bounds: Option<(K, K)>,
}

impl<K, C: Comparer<K> + Default> ColaRangeSet<K, C> {
    pub fn new() -> Self { Self::with_comparer(C::default()) }
}

impl<K, C: Comparer<K> + Default> Default for ColaRangeSet<K, C> {
    fn default() -> Self { Self::new() }
}

impl<K, C: Comparer<K>> ColaRangeSet<K, C> {
    pub fn with_comparer(cmp: C) -> Self { ColaRangeSet { store: ColaStore::with_comparer(ByBegin(cmp)), bounds: None } }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn bounds(&self) -> Option<(&K, &K)> { self.bounds.as_ref().map(|(lo, hi)| (lo, hi)) }

    pub fn clear(&mut self) {
        self.store.clear();
        self.bounds = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Span<K>> { self.store.iter() }

    fn k(&self, a: &K, b: &K) -> Ordering { self.store.comparer().0.compare(a, b) }

    fn refresh_bounds(&mut self)
    where
        K: Clone,
    {
        self.bounds = match (self.store.min(), self.store.max()) {
            (Some(first), Some(last)) => Some((first.begin.clone(), last.end.clone())),
            _ => None,
        };
    }

    /// Add `[begin, end)` to the coverage; every overlapping or abutting
    /// span fuses into one.
    pub fn mark(&mut self, begin: K, end: K) -> Result<(), ColaError>
    where
        K: Clone,
    {
        if self.k(&begin, &end) != Ordering::Less {
            return Err(ColaError::InvalidRange);
        }
        let mut new_begin = begin;
        let mut new_end = end;
        let mut absorbed: Vec<K> = Vec::new();
        {
            let mut cur = self.store.cursor();
            cur.seek_by(&self.store, |x| self.k(&x.begin, &new_begin), true)?;
            let mut back = cur.clone();
            if let Some(prev) = back.previous(&self.store)? {
                // reaches or touches the new span from the left
                if self.k(&prev.end, &new_begin) != Ordering::Less {
                    absorbed.push(prev.begin.clone());
                    new_begin = prev.begin.clone();
                    if self.k(&prev.end, &new_end) == Ordering::Greater {
                        new_end = prev.end.clone();
                    }
                }
            }
            while let Some(x) = cur.next(&self.store)? {
                // overlapping or abutting on the right
                if self.k(&x.begin, &new_end) == Ordering::Greater {
                    break;
                }
                absorbed.push(x.begin.clone());
                if self.k(&x.end, &new_end) == Ordering::Greater {
                    new_end = x.end.clone();
                }
            }
        }
        for key in &absorbed {
            if let Some((level, offset)) = self.store.find_by(|x| self.k(&x.begin, key)) {
                let _ = self.store.remove_at(level, offset);
            }
        }
        self.store.insert(Span { begin: new_begin, end: new_end });
        self.refresh_bounds();
        Ok(())
    }

    /// Whether any span overlaps `[begin, end)`.
    pub fn intersect_range(&self, begin: &K, end: &K) -> bool {
        if self.k(begin, end) != Ordering::Less || self.store.is_empty() {
            return false;
        }
        let mut cur = self.store.cursor();
        if cur.seek_by(&self.store, |x| self.k(&x.begin, begin), true).is_err() {
            return false;
        }
        let mut back = cur.clone();
        if let Ok(Some(prev)) = back.previous(&self.store) {
            if self.k(&prev.end, begin) == Ordering::Greater {
                return true;
            }
        }
        if let Ok(Some(x)) = cur.next(&self.store) {
            if self.k(&x.begin, end) == Ordering::Less {
                return true;
            }
        }
        false
    }

    /// Whether `key` falls inside any span.
    pub fn contains(&self, key: &K) -> bool {
        let mut cur = self.store.cursor();
        if cur.seek_by(&self.store, |x| self.k(&x.begin, key), false).is_err() {
            return false;
        }
        match cur.previous(&self.store) {
            Ok(Some(span)) => self.k(&span.end, key) == Ordering::Greater,
            _ => false,
        }
    }
}

impl<K: fmt::Debug, C: Comparer<K>> fmt::Display for ColaRangeSet<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, span) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{:?},{:?})", span.begin, span.end)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(set: &ColaRangeSet<i64>) -> Vec<(i64, i64)> { set.iter().map(|s| (s.begin, s.end)).collect() }

    #[test]
    fn disjoint_spans_stay_separate() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(10, 20).expect("mark");
        set.mark(30, 40).expect("mark");
        set.mark(0, 5).expect("mark");
        assert_eq!(spans(&set), vec![(0, 5), (10, 20), (30, 40)]);
        assert_eq!(set.bounds(), Some((&0, &40)));
    }

    #[test]
    fn adjacency_always_coalesces() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(0, 5).expect("mark");
        set.mark(5, 10).expect("mark");
        assert_eq!(spans(&set), vec![(0, 10)]);
    }

    #[test]
    fn overlap_fuses_many() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(0, 2).expect("mark");
        set.mark(4, 6).expect("mark");
        set.mark(8, 10).expect("mark");
        set.mark(1, 9).expect("mark");
        assert_eq!(spans(&set), vec![(0, 10)]);
    }

    #[test]
    fn subrange_is_absorbed() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(0, 10).expect("mark");
        set.mark(3, 4).expect("mark");
        assert_eq!(spans(&set), vec![(0, 10)]);
    }

    #[test]
    fn invalid_range_rejected() {
        let mut set = ColaRangeSet::<i64>::new();
        assert_eq!(set.mark(5, 5), Err(ColaError::InvalidRange));
        assert!(set.is_empty());
    }

    #[test]
    fn intersect_and_contains() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(0, 5).expect("mark");
        set.mark(10, 15).expect("mark");
        assert!(set.intersect_range(&4, &11));
        assert!(!set.intersect_range(&5, &10));
        assert!(set.contains(&0));
        assert!(set.contains(&14));
        assert!(!set.contains(&5));
        assert!(!set.contains(&20));
    }

    #[test]
    fn display_dump() {
        let mut set = ColaRangeSet::<i64>::new();
        set.mark(1, 2).expect("mark");
        assert_eq!(set.to_string(), "{[1,2)}");
    }
}
