//! Dictionary keyed by non-overlapping half-open ranges.
//!
//! Entries `(begin, end, value)` with `begin < end` are kept sorted by
//! begin, pairwise disjoint, and with adjacent equal-valued entries merged.
//! `mark` overwrites a range (splitting and truncating what it lands on),
//! `remove` cuts a region out and pulls everything after it through a
//! caller-supplied shift, and `intersect` answers overlap queries. This is
//! the structure behind read/write conflict tracking and transaction-local
//! write maps.

use std::cmp::Ordering;
use std::fmt;

use crate::cmp::{Comparer, NaturalOrder};
use crate::error::ColaError;
use crate::store::ColaStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry<K, V> {
    pub begin: K,
    pub end: K,
    pub value: V,
}

/// Orders entries by their begin key; ends never participate (entries are
/// disjoint, so begin order is total).
#[derive(Debug, Default, Clone, Copy)]
pub struct ByBegin<C>(pub C);

impl<K, V, C: Comparer<K>> Comparer<RangeEntry<K, V>> for ByBegin<C> {
    fn compare(&self, a: &RangeEntry<K, V>, b: &RangeEntry<K, V>) -> Ordering { self.0.compare(&a.begin, &b.begin) }
}

pub struct ColaRangeDictionary<K, V, CK: Comparer<K> = NaturalOrder, CV: Comparer<V> = NaturalOrder> {
    store: ColaStore<RangeEntry<K, V>, ByBegin<CK>>,
    value_cmp: CV,
    bounds: Option<(K, K)>,
}

impl<K, V, CK: Comparer<K> + Default, CV: Comparer<V> + Default> ColaRangeDictionary<K, V, CK, CV> {
    pub fn new() -> Self { Self::with_comparers(CK::default(), CV::default()) }
}

impl<K, V, CK: Comparer<K> + Default, CV: Comparer<V> + Default> Default for ColaRangeDictionary<K, V, CK, CV> {
    fn default() -> Self { Self::new() }
}

impl<K, V, CK: Comparer<K>, CV: Comparer<V>> ColaRangeDictionary<K, V, CK, CV> {
    pub fn with_comparers(key_cmp: CK, value_cmp: CV) -> Self {
        ColaRangeDictionary { store: ColaStore::with_comparer(ByBegin(key_cmp)), value_cmp, bounds: None }
    }

    /// Number of disjoint entries (not covered keys).
    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    /// Cached `(min begin, max end)` over all entries.
    pub fn bounds(&self) -> Option<(&K, &K)> { self.bounds.as_ref().map(|(lo, hi)| (lo, hi)) }

    pub fn clear(&mut self) {
        self.store.clear();
        self.bounds = None;
    }

    /// Ordered iterator over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &RangeEntry<K, V>> { self.store.iter() }

    fn k(&self, a: &K, b: &K) -> Ordering { self.store.comparer().0.compare(a, b) }

    fn veq(&self, a: &V, b: &V) -> bool { self.value_cmp.compare(a, b) == Ordering::Equal }

    fn remove_entry_at(&mut self, begin: &K) {
        if let Some((level, offset)) = self.store.find_by(|x| self.k(&x.begin, begin)) {
            let _ = self.store.remove_at(level, offset);
        }
    }

    fn refresh_bounds(&mut self)
    where
        K: Clone,
    {
        self.bounds = match (self.store.min(), self.store.max()) {
            (Some(first), Some(last)) => Some((first.begin.clone(), last.end.clone())),
            _ => None,
        };
    }

    /// The value covering `key`, when some entry contains it.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut cur = self.store.cursor();
        cur.seek_by(&self.store, |x| self.k(&x.begin, key), false).ok()?;
        let entry = cur.previous(&self.store).ok()??;
        if self.k(&entry.end, key) == Ordering::Greater {
            Some(&entry.value)
        } else {
            None
        }
    }

    /// Set `[begin, end)` to `value`, splitting, truncating or absorbing
    /// whatever the new range lands on and merging adjacent entries that
    /// carry an equal value. Fails with `InvalidRange` when `begin >= end`;
    /// validation precedes every edit, so a failed call changes nothing.
    pub fn mark(&mut self, begin: K, end: K, value: V) -> Result<(), ColaError>
    where
        K: Clone,
        V: Clone,
    {
        if self.k(&begin, &end) != Ordering::Less {
            return Err(ColaError::InvalidRange);
        }
        if self.store.is_empty() {
            self.store.insert(RangeEntry { begin: begin.clone(), end: end.clone(), value });
            self.bounds = Some((begin, end));
            return Ok(());
        }

        // fast paths on the cached bounds
        let (disjoint_after, disjoint_before, covers_all) = match &self.bounds {
            Some((lo, hi)) => (
                self.k(&begin, hi) == Ordering::Greater,
                self.k(&end, lo) == Ordering::Less,
                self.k(&begin, lo) != Ordering::Greater && self.k(&end, hi) != Ordering::Less,
            ),
            None => (false, false, false),
        };
        if disjoint_after || disjoint_before {
            self.store.insert(RangeEntry { begin, end, value });
            self.refresh_bounds();
            return Ok(());
        }
        if covers_all {
            self.store.clear();
            self.store.insert(RangeEntry { begin: begin.clone(), end: end.clone(), value });
            self.bounds = Some((begin, end));
            return Ok(());
        }

        // collect the entries the new range touches: the rightmost entry
        // starting at or before `begin` (when it reaches past `begin`, or
        // abuts it with an equal value) and every later entry starting
        // before `end` (or at `end` with an equal value)
        let mut affected: Vec<RangeEntry<K, V>> = Vec::new();
        {
            let mut cur = self.store.cursor();
            cur.seek_by(&self.store, |x| self.k(&x.begin, &begin), true)?;
            let mut back = cur.clone();
            if let Some(prev) = back.previous(&self.store)? {
                match self.k(&prev.end, &begin) {
                    Ordering::Greater => affected.push(prev.clone()),
                    Ordering::Equal if self.veq(&prev.value, &value) => affected.push(prev.clone()),
                    _ => {}
                }
            }
            while let Some(x) = cur.next(&self.store)? {
                match self.k(&x.begin, &end) {
                    Ordering::Less => affected.push(x.clone()),
                    Ordering::Equal if self.veq(&x.value, &value) => {
                        affected.push(x.clone());
                        break;
                    }
                    _ => break,
                }
            }
        }

        let mut new_begin = begin.clone();
        let mut new_end = end.clone();
        let mut keep: Vec<RangeEntry<K, V>> = Vec::new();
        for x in &affected {
            if self.k(&x.end, &begin) == Ordering::Equal {
                // left adjacency, equal value: absorb
                new_begin = x.begin.clone();
            } else if self.k(&x.begin, &end) == Ordering::Equal {
                // right adjacency, equal value: absorb
                new_end = x.end.clone();
            } else if self.veq(&x.value, &value) {
                // overlap with equal value: extend over it
                if self.k(&x.begin, &new_begin) == Ordering::Less {
                    new_begin = x.begin.clone();
                }
                if self.k(&x.end, &new_end) == Ordering::Greater {
                    new_end = x.end.clone();
                }
            } else {
                // overlap with different value: truncate to the pieces that
                // stick out on either side
                if self.k(&x.begin, &begin) == Ordering::Less {
                    keep.push(RangeEntry { begin: x.begin.clone(), end: begin.clone(), value: x.value.clone() });
                }
                if self.k(&x.end, &end) == Ordering::Greater {
                    keep.push(RangeEntry { begin: end.clone(), end: x.end.clone(), value: x.value.clone() });
                }
            }
        }

        tracing::debug!(touched = affected.len(), kept = keep.len(), "marking range");
        for x in &affected {
            let key = x.begin.clone();
            self.remove_entry_at(&key);
        }
        for piece in keep {
            self.store.insert(piece);
        }
        self.store.insert(RangeEntry { begin: new_begin, end: new_end, value });
        self.refresh_bounds();
        Ok(())
    }

    /// Remove `[begin, end)` from the coverage, then shift every entry at or
    /// after the cut with `apply_shift(key, shift)`. Entries straddling a
    /// cut edge are truncated and keep their value; an entry covering the
    /// whole cut contracts in place. The caller's shift must preserve key
    /// order (it typically subtracts the cut width). Equal-valued neighbors
    /// made adjacent by the cut are merged.
    pub fn remove<S, F>(&mut self, begin: &K, end: &K, shift: &S, apply_shift: F) -> Result<(), ColaError>
    where
        K: Clone,
        V: Clone,
        F: Fn(&K, &S) -> K,
    {
        if self.k(begin, end) != Ordering::Less {
            return Err(ColaError::InvalidRange);
        }
        if self.store.is_empty() {
            return Ok(());
        }

        // everything from the first entry reaching past `begin` onward is
        // rewritten; the nearest untouched predecessor is remembered for
        // seam coalescing
        let mut affected: Vec<RangeEntry<K, V>> = Vec::new();
        let mut seam: Option<RangeEntry<K, V>> = None;
        {
            let mut cur = self.store.cursor();
            cur.seek_by(&self.store, |x| self.k(&x.begin, begin), true)?;
            let mut back = cur.clone();
            if let Some(prev) = back.previous(&self.store)? {
                match self.k(&prev.end, begin) {
                    Ordering::Greater => affected.push(prev.clone()),
                    Ordering::Equal => seam = Some(prev.clone()),
                    Ordering::Less => {}
                }
            }
            while let Some(x) = cur.next(&self.store)? {
                affected.push(x.clone());
            }
        }
        if affected.is_empty() {
            return Ok(());
        }

        let mut pieces: Vec<RangeEntry<K, V>> = Vec::new();
        for x in &affected {
            if self.k(&x.begin, begin) == Ordering::Less {
                if self.k(&x.end, end) == Ordering::Greater {
                    // covers the whole cut: contract in place
                    pieces.push(RangeEntry { begin: x.begin.clone(), end: apply_shift(&x.end, shift), value: x.value.clone() });
                } else {
                    // straddles the left edge: truncate at the cut
                    pieces.push(RangeEntry { begin: x.begin.clone(), end: begin.clone(), value: x.value.clone() });
                }
            } else if self.k(&x.begin, end) == Ordering::Less {
                if self.k(&x.end, end) == Ordering::Greater {
                    // straddles the right edge: the tail survives, shifted
                    pieces.push(RangeEntry { begin: apply_shift(end, shift), end: apply_shift(&x.end, shift), value: x.value.clone() });
                }
                // else: swallowed by the cut
            } else {
                pieces.push(RangeEntry { begin: apply_shift(&x.begin, shift), end: apply_shift(&x.end, shift), value: x.value.clone() });
            }
        }

        // merge equal-valued pieces that the cut made adjacent
        let mut merged: Vec<RangeEntry<K, V>> = Vec::new();
        for piece in pieces {
            if let Some(last) = merged.last_mut() {
                let adjacent = self.store.comparer().0.compare(&last.end, &piece.begin) == Ordering::Equal;
                if adjacent && self.value_cmp.compare(&last.value, &piece.value) == Ordering::Equal {
                    last.end = piece.end;
                    continue;
                }
            }
            merged.push(piece);
        }

        // the untouched predecessor may now abut the first rewritten piece
        let mut absorb_seam = false;
        if let (Some(pred), Some(first)) = (&seam, merged.first()) {
            if self.k(&pred.end, &first.begin) == Ordering::Equal && self.veq(&pred.value, &first.value) {
                absorb_seam = true;
            }
        }

        tracing::debug!(rewritten = affected.len(), "removing range with shift");
        for x in &affected {
            let key = x.begin.clone();
            self.remove_entry_at(&key);
        }
        if absorb_seam {
            if let Some(pred) = seam {
                let key = pred.begin.clone();
                self.remove_entry_at(&key);
                if let Some(first) = merged.first_mut() {
                    first.begin = pred.begin;
                }
            }
        }
        for piece in merged {
            if self.k(&piece.begin, &piece.end) == Ordering::Less {
                self.store.insert(piece);
            }
        }
        self.refresh_bounds();
        Ok(())
    }

    /// Whether any entry overlapping `[begin, end)` satisfies the
    /// predicate. An empty or inverted probe range intersects nothing.
    pub fn intersect<A>(&self, begin: &K, end: &K, arg: &A, predicate: impl Fn(&V, &A) -> bool) -> bool {
        if self.k(begin, end) != Ordering::Less || self.store.is_empty() {
            return false;
        }
        let mut cur = self.store.cursor();
        if cur.seek_by(&self.store, |x| self.k(&x.begin, begin), true).is_err() {
            return false;
        }
        let mut back = cur.clone();
        if let Ok(Some(prev)) = back.previous(&self.store) {
            if self.k(&prev.end, begin) == Ordering::Greater && predicate(&prev.value, arg) {
                return true;
            }
        }
        while let Ok(Some(x)) = cur.next(&self.store) {
            if self.k(&x.begin, end) != Ordering::Less {
                break;
            }
            if predicate(&x.value, arg) {
                return true;
            }
        }
        false
    }
}

impl<K: fmt::Debug, V: fmt::Debug, CK: Comparer<K>, CV: Comparer<V>> fmt::Display for ColaRangeDictionary<K, V, CK, CV> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, entry) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "[{:?},{:?})={:?}", entry.begin, entry.end, entry.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Dict = ColaRangeDictionary<i64, &'static str>;

    fn entries(dict: &Dict) -> Vec<(i64, i64, &'static str)> { dict.iter().map(|e| (e.begin, e.end, e.value)).collect() }

    fn assert_invariants(dict: &Dict) {
        let list = entries(dict);
        for pair in list.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "entries overlap: {list:?}");
            if pair[0].1 == pair[1].0 {
                assert_ne!(pair[0].2, pair[1].2, "adjacent equal values not merged: {list:?}");
            }
        }
        for e in &list {
            assert!(e.0 < e.1, "empty entry: {list:?}");
        }
        match (list.first(), list.last()) {
            (Some(first), Some(last)) => assert_eq!(dict.bounds(), Some((&first.0, &last.1))),
            _ => assert_eq!(dict.bounds(), None),
        }
    }

    #[test]
    fn invalid_range_is_rejected_without_mutation() {
        let mut dict = Dict::new();
        dict.mark(0, 10, "A").expect("mark");
        assert_eq!(dict.mark(5, 5, "B"), Err(ColaError::InvalidRange));
        assert_eq!(dict.mark(7, 3, "B"), Err(ColaError::InvalidRange));
        assert_eq!(entries(&dict), vec![(0, 10, "A")]);
    }

    #[test]
    fn mark_splits_and_remerges() {
        let mut dict = Dict::new();
        dict.mark(0, 10, "A").expect("mark");
        dict.mark(4, 5, "B").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 4, "A"), (4, 5, "B"), (5, 10, "A")]);
        assert_invariants(&dict);

        dict.mark(3, 7, "A").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 10, "A")]);
        assert_invariants(&dict);
    }

    #[test]
    fn mark_inside_same_begin_truncates_to_tail() {
        let mut dict = Dict::new();
        dict.mark(5, 10, "A").expect("mark");
        dict.mark(5, 7, "B").expect("mark");
        assert_eq!(entries(&dict), vec![(5, 7, "B"), (7, 10, "A")]);
        assert_invariants(&dict);
    }

    #[test]
    fn mark_extends_on_adjacency_with_equal_value() {
        let mut dict = Dict::new();
        dict.mark(0, 5, "A").expect("mark");
        dict.mark(5, 8, "A").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 8, "A")]);

        dict.mark(8, 9, "B").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 8, "A"), (8, 9, "B")]);
        assert_invariants(&dict);
    }

    #[test]
    fn mark_disjoint_fast_paths() {
        let mut dict = Dict::new();
        dict.mark(10, 20, "A").expect("mark");
        dict.mark(30, 40, "B").expect("mark");
        dict.mark(0, 5, "C").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 5, "C"), (10, 20, "A"), (30, 40, "B")]);
        assert_invariants(&dict);

        dict.mark(-5, 100, "Z").expect("mark");
        assert_eq!(entries(&dict), vec![(-5, 100, "Z")]);
        assert_invariants(&dict);
    }

    #[test]
    fn mark_overwrites_several_entries() {
        let mut dict = Dict::new();
        dict.mark(0, 2, "A").expect("mark");
        dict.mark(3, 5, "B").expect("mark");
        dict.mark(6, 8, "C").expect("mark");
        dict.mark(1, 7, "X").expect("mark");
        assert_eq!(entries(&dict), vec![(0, 1, "A"), (1, 7, "X"), (7, 8, "C")]);
        assert_invariants(&dict);
    }

    #[test]
    fn get_point_queries() {
        let mut dict = Dict::new();
        dict.mark(0, 10, "A").expect("mark");
        dict.mark(4, 5, "B").expect("mark");
        assert_eq!(dict.get(&0), Some(&"A"));
        assert_eq!(dict.get(&4), Some(&"B"));
        assert_eq!(dict.get(&5), Some(&"A"));
        assert_eq!(dict.get(&9), Some(&"A"));
        assert_eq!(dict.get(&10), None);
        assert_eq!(dict.get(&-1), None);
    }

    #[test]
    fn intersect_respects_predicate_and_window() {
        let mut dict = Dict::new();
        dict.mark(0, 5, "A").expect("mark");
        dict.mark(10, 15, "B").expect("mark");
        assert!(dict.intersect(&3, &12, &"A", |v, want| v == want));
        assert!(dict.intersect(&3, &12, &"B", |v, want| v == want));
        assert!(!dict.intersect(&5, &10, &(), |_, _| true));
        assert!(!dict.intersect(&12, &12, &(), |_, _| true));
        assert!(dict.intersect(&14, &99, &(), |_, _| true));
    }

    #[test]
    fn remove_cuts_and_shifts() {
        let shift = |k: &i64, delta: &i64| k + delta;
        let mut dict = Dict::new();
        dict.mark(0, 10, "A").expect("mark");
        dict.mark(20, 30, "B").expect("mark");
        // cut [10, 20): B slides left against A
        dict.remove(&10, &20, &-10, shift).expect("remove");
        assert_eq!(entries(&dict), vec![(0, 10, "A"), (10, 20, "B")]);
        assert_invariants(&dict);
    }

    #[test]
    fn remove_inside_single_entry_contracts_it() {
        let shift = |k: &i64, delta: &i64| k + delta;
        let mut dict = Dict::new();
        dict.mark(0, 100, "A").expect("mark");
        dict.remove(&10, &20, &-10, shift).expect("remove");
        assert_eq!(entries(&dict), vec![(0, 90, "A")]);
        assert_invariants(&dict);
    }

    #[test]
    fn remove_seam_coalesces_equal_values() {
        let shift = |k: &i64, delta: &i64| k + delta;
        let mut dict = Dict::new();
        dict.mark(0, 10, "A").expect("mark");
        dict.mark(20, 30, "A").expect("mark");
        dict.remove(&10, &20, &-10, shift).expect("remove");
        assert_eq!(entries(&dict), vec![(0, 20, "A")]);
        assert_invariants(&dict);
    }

    #[test]
    fn remove_truncates_straddlers() {
        let shift = |k: &i64, delta: &i64| k + delta;
        let mut dict = Dict::new();
        dict.mark(0, 15, "A").expect("mark");
        dict.mark(15, 25, "B").expect("mark");
        dict.mark(25, 40, "C").expect("mark");
        // cut [10, 30): A loses its tail, B disappears, C loses its head
        dict.remove(&10, &30, &-20, shift).expect("remove");
        assert_eq!(entries(&dict), vec![(0, 10, "A"), (10, 20, "C")]);
        assert_invariants(&dict);
    }

    #[test]
    fn remove_shifts_every_later_entry() {
        let shift = |k: &i64, delta: &i64| k + delta;
        let mut dict = Dict::new();
        for (b, e, v) in [(0, 5, "A"), (10, 15, "B"), (20, 25, "C"), (30, 35, "D")] {
            dict.mark(b, e, v).expect("mark");
        }
        dict.remove(&6, &8, &-2, shift).expect("remove");
        assert_eq!(entries(&dict), vec![(0, 5, "A"), (8, 13, "B"), (18, 23, "C"), (28, 33, "D")]);
        assert_invariants(&dict);
    }

    #[test]
    fn display_dump() {
        let mut dict = Dict::new();
        dict.mark(0, 4, "A").expect("mark");
        dict.mark(4, 5, "B").expect("mark");
        assert_eq!(dict.to_string(), "{[0,4)=\"A\", [4,5)=\"B\"}");
    }
}
