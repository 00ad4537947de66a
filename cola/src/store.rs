//! The level-indexed doubling-array store.
//!
//! State is a count `N` plus levels `L[0..D)`, where level `k` is either
//! unallocated or holds exactly `2^k` items sorted under the configured
//! comparer. The allocation bitmap is the binary representation of `N`:
//! level `k` is allocated iff bit `k` of `N` is set. Levels are mutually
//! independent; a key in level 3 may be smaller than a key in level 1.
//!
//! Insertion merges the carry chain of low levels into the first free level
//! (amortized O(log N) comparisons); removal redistributes the smallest
//! allocated level downward. Merge passes borrow scratch buffers from a
//! small per-store pool instead of allocating.

use std::cmp::Ordering;

use crate::cmp::{Comparer, NaturalOrder};
use crate::error::ColaError;

/// Number of pre-allocated scratch buffers (sizes `1, 2, 4, .. 2^(M-1)`).
const SPARE_LEVELS: usize = 6;

pub struct ColaStore<T, C: Comparer<T> = NaturalOrder> {
    count: usize,
    levels: Vec<Option<Vec<T>>>,
    spares: Vec<Option<Vec<T>>>,
    #[cfg(debug_assertions)]
    spare_loans: u8,
    version: u64,
    cmp: C,
}

impl<T, C: Comparer<T> + Default> ColaStore<T, C> {
    pub fn new() -> Self { Self::with_comparer(C::default()) }
}

impl<T, C: Comparer<T> + Default> Default for ColaStore<T, C> {
    fn default() -> Self { Self::new() }
}

impl<T, C: Comparer<T>> ColaStore<T, C> {
    pub fn with_comparer(cmp: C) -> Self {
        ColaStore {
            count: 0,
            levels: Vec::new(),
            spares: (0..SPARE_LEVELS).map(|i| Some(Vec::with_capacity(1 << i))).collect(),
            #[cfg(debug_assertions)]
            spare_loans: 0,
            version: 0,
            cmp,
        }
    }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    /// Current number of levels, allocated or not.
    pub fn depth(&self) -> usize { self.levels.len() }

    /// Item capacity of the current level array: `2^depth - 1`.
    pub fn capacity(&self) -> usize { (1usize << self.levels.len()) - 1 }

    pub fn comparer(&self) -> &C { &self.cmp }

    /// Monotonic mutation counter; cursors snapshot it to detect staleness.
    pub fn version(&self) -> u64 { self.version }

    pub fn clear(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.count = 0;
        self.levels.clear();
    }

    fn loan_spare(&mut self, idx: usize) -> Vec<T> {
        if idx < SPARE_LEVELS {
            #[cfg(debug_assertions)]
            {
                debug_assert_eq!(self.spare_loans & (1 << idx), 0, "spare {idx} loaned twice");
                self.spare_loans |= 1 << idx;
            }
            if let Some(buf) = self.spares[idx].take() {
                return buf;
            }
        }
        Vec::with_capacity(1 << idx)
    }

    /// Returned buffers must be empty so they hold no stale references.
    fn restore_spare(&mut self, idx: usize, buf: Vec<T>) {
        debug_assert!(buf.is_empty(), "returned spare still holds items");
        if idx < SPARE_LEVELS {
            #[cfg(debug_assertions)]
            {
                self.spare_loans &= !(1 << idx);
            }
            self.spares[idx] = Some(buf);
        }
    }

    /// Insert `value`. The lowest free level `k` receives the merge of the
    /// new item and every level below `k`, all of which become free.
    pub fn insert(&mut self, value: T) {
        self.version = self.version.wrapping_add(1);
        let k = (self.count + 1).trailing_zeros() as usize;
        if self.levels.len() <= k {
            self.levels.resize_with(k + 1, || None);
        }
        if k == 0 {
            self.levels[0] = Some(vec![value]);
            self.count += 1;
            return;
        }
        tracing::trace!(target_level = k, "merge cascade");
        let mut current = self.loan_spare(0);
        current.push(value);
        for j in 0..k {
            // The final merge writes straight into the vector that becomes
            // level k; intermediate merges go through the spare pool.
            let mut merged = if j + 1 == k { Vec::with_capacity(1 << (j + 1)) } else { self.loan_spare(j + 1) };
            let mut level_items = self.levels[j].take().unwrap_or_default();
            debug_assert_eq!(level_items.len(), 1 << j);
            merge_sorted(&mut merged, &mut current, &mut level_items, &self.cmp);
            self.restore_spare(j, current);
            current = merged;
        }
        self.levels[k] = Some(current);
        self.count += 1;
    }

    /// Locate `value`, scanning levels from the smallest upward. An exact
    /// match on the most recent insert is O(1) whenever the count is odd.
    pub fn find(&self, value: &T) -> Option<(usize, usize)> {
        let cmp = &self.cmp;
        self.find_by(|x| cmp.compare(x, value))
    }

    /// Locate the item for which `probe` answers `Equal`; `probe(x)` orders
    /// the stored item `x` against the target.
    pub fn find_by(&self, mut probe: impl FnMut(&T) -> Ordering) -> Option<(usize, usize)> {
        for (k, level) in self.levels.iter().enumerate() {
            if let Some(items) = level {
                if let Ok(offset) = items.binary_search_by(|x| probe(x)) {
                    return Some((k, offset));
                }
            }
        }
        None
    }

    pub fn get(&self, level: usize, offset: usize) -> Option<&T> {
        self.levels.get(level).and_then(|l| l.as_ref()).and_then(|items| items.get(offset))
    }

    /// Replace the item at a slot with one that compares equal to it; used
    /// for overwrite-style upserts that keep the order untouched.
    pub fn replace_at(&mut self, level: usize, offset: usize, value: T) -> Result<T, ColaError> {
        match self.levels.get_mut(level).and_then(|l| l.as_mut()).and_then(|items| items.get_mut(offset)) {
            Some(slot) => {
                debug_assert_eq!(self.cmp.compare(&value, slot), Ordering::Equal, "replacement must not change the order");
                self.version = self.version.wrapping_add(1);
                Ok(std::mem::replace(slot, value))
            }
            None => Err(ColaError::IndexOutOfRange { level, offset }),
        }
    }

    /// Remove the item at `(level, offset)`. The smallest allocated level
    /// donates its final item into the vacated slot's level (when removing
    /// from a deeper level) and scatters the rest across the freed lower
    /// levels.
    pub fn remove_at(&mut self, level: usize, offset: usize) -> Result<T, ColaError> {
        let allocated = self.levels.get(level).is_some_and(|l| l.is_some());
        if !allocated || offset >= (1usize << level) {
            return Err(ColaError::IndexOutOfRange { level, offset });
        }
        self.version = self.version.wrapping_add(1);
        let first = self.count.trailing_zeros() as usize;
        let removed = if level == first {
            let mut items = self.levels[level].take().unwrap_or_default();
            let removed = items.remove(offset);
            self.spread_down(level, items);
            removed
        } else {
            let removed = match self.levels.get_mut(level).and_then(|l| l.as_mut()) {
                Some(items) => items.remove(offset),
                None => return Err(ColaError::IndexOutOfRange { level, offset }),
            };
            let mut small = self.levels[first].take().unwrap_or_default();
            if let Some(donor) = small.pop() {
                if let Some(items) = self.levels.get_mut(level).and_then(|l| l.as_mut()) {
                    let cmp = &self.cmp;
                    let pos = items.partition_point(|x| cmp.compare(x, &donor) == Ordering::Less);
                    items.insert(pos, donor);
                }
            }
            self.spread_down(first, small);
            removed
        };
        self.count -= 1;
        let depth = self.levels.len();
        if depth >= 2 && self.levels[depth - 1].is_none() && self.levels[depth - 2].is_none() {
            self.levels.pop();
            tracing::debug!(depth = depth - 1, "shrunk level array");
        }
        Ok(removed)
    }

    /// Scatter `2^from_level - 1` items across levels `0..from_level`,
    /// which are all free. Consecutive sorted chunks keep every level
    /// sorted.
    fn spread_down(&mut self, from_level: usize, mut items: Vec<T>) {
        debug_assert_eq!(items.len() + 1, 1usize << from_level);
        for j in (0..from_level).rev() {
            let size = 1usize << j;
            if items.len() < size {
                break;
            }
            let tail = items.split_off(items.len() - size);
            self.levels[j] = Some(tail);
        }
        debug_assert!(items.is_empty());
    }

    /// Smallest item across all allocated levels.
    pub fn min(&self) -> Option<&T> {
        let mut best: Option<&T> = None;
        for items in self.levels.iter().flatten() {
            if let Some(first) = items.first() {
                best = match best {
                    Some(b) if self.cmp.compare(first, b) != Ordering::Less => Some(b),
                    _ => Some(first),
                };
            }
        }
        best
    }

    /// Largest item across all allocated levels.
    pub fn max(&self) -> Option<&T> {
        let mut best: Option<&T> = None;
        for items in self.levels.iter().flatten() {
            if let Some(last) = items.last() {
                best = match best {
                    Some(b) if self.cmp.compare(last, b) != Ordering::Greater => Some(b),
                    _ => Some(last),
                };
            }
        }
        best
    }

    /// Ordered borrowing iterator (k-way merge across the levels).
    pub fn iter(&self) -> ColaIter<'_, T, C> { ColaIter { store: self, offsets: vec![0; self.levels.len()] } }

    /// Ordered snapshot.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Slices of the allocated levels, smallest level first.
    pub fn allocated_levels(&self) -> impl Iterator<Item = &[T]> { self.levels.iter().flatten().map(Vec::as_slice) }

    /// Detached directional cursor positioned before the first item.
    pub fn cursor(&self) -> ColaCursor {
        ColaCursor { offsets: vec![0; self.levels.len()], direction: Direction::Forward, version: self.version }
    }

    /// Verify the structural invariants; debug builds only.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self) {
        let mut total = 0;
        for (k, level) in self.levels.iter().enumerate() {
            let bit_set = self.count & (1usize << k) != 0;
            assert_eq!(level.is_some(), bit_set, "level {k} allocation does not match count bit");
            if let Some(items) = level {
                assert_eq!(items.len(), 1 << k, "level {k} holds the wrong number of items");
                total += items.len();
                for pair in items.windows(2) {
                    assert_eq!(self.cmp.compare(&pair[0], &pair[1]), Ordering::Less, "level {k} is not strictly increasing");
                }
            }
        }
        assert_eq!(total, self.count, "level sizes do not add up to the count");
        assert_eq!(self.spare_loans, 0, "a spare buffer was leaked");
        for (i, spare) in self.spares.iter().enumerate() {
            if let Some(buf) = spare {
                assert!(buf.is_empty(), "spare {i} still holds items");
            }
        }
    }
}

/// Stable two-way merge; drains both sources.
fn merge_sorted<T, C: Comparer<T>>(dst: &mut Vec<T>, a: &mut Vec<T>, b: &mut Vec<T>, cmp: &C) {
    let mut ai = a.drain(..).peekable();
    let mut bi = b.drain(..).peekable();
    loop {
        let take_a = match (ai.peek(), bi.peek()) {
            (Some(x), Some(y)) => cmp.compare(x, y) != Ordering::Greater,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        if take_a {
            if let Some(v) = ai.next() {
                dst.push(v);
            }
        } else if let Some(v) = bi.next() {
            dst.push(v);
        }
    }
}

/// Borrowing ordered iterator over a store.
pub struct ColaIter<'a, T, C: Comparer<T>> {
    store: &'a ColaStore<T, C>,
    offsets: Vec<usize>,
}

impl<'a, T, C: Comparer<T>> Iterator for ColaIter<'a, T, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let mut best: Option<(usize, &'a T)> = None;
        for (k, level) in self.store.levels.iter().enumerate() {
            let Some(items) = level else { continue };
            let Some(item) = items.get(self.offsets[k]) else { continue };
            best = match best {
                Some((_, b)) if self.store.cmp.compare(item, b) != Ordering::Less => best,
                _ => Some((k, item)),
            };
        }
        let (k, item) = best?;
        self.offsets[k] += 1;
        Some(item)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// A detached directional cursor over a [`ColaStore`].
///
/// The cursor holds per-level positions plus the store version it was
/// created against; it borrows nothing, so the store stays usable between
/// steps. Every operation re-validates the version and fails with
/// [`ColaError::StoreMutated`] once the store has changed. A cursor must
/// only be used with the store that created it.
///
/// The cursor sits between items: `next` yields the item to the right of
/// the position, `previous` the item to the left. Changing direction
/// adjusts every per-level position by one slot, so the first step after a
/// reversal yields the item that was yielded last.
#[derive(Debug, Clone)]
pub struct ColaCursor {
    offsets: Vec<isize>,
    direction: Direction,
    version: u64,
}

impl ColaCursor {
    fn check<T, C: Comparer<T>>(&self, store: &ColaStore<T, C>) -> Result<(), ColaError> {
        if self.version != store.version {
            return Err(ColaError::StoreMutated);
        }
        debug_assert_eq!(self.offsets.len(), store.levels.len());
        Ok(())
    }

    /// Position before the smallest item.
    pub fn seek_first<T, C: Comparer<T>>(&mut self, store: &ColaStore<T, C>) -> Result<(), ColaError> {
        self.check(store)?;
        self.offsets.iter_mut().for_each(|off| *off = 0);
        self.direction = Direction::Forward;
        Ok(())
    }

    /// Position before the largest item (for reverse traversal).
    pub fn seek_last<T, C: Comparer<T>>(&mut self, store: &ColaStore<T, C>) -> Result<(), ColaError> {
        self.check(store)?;
        for (k, level) in store.levels.iter().enumerate() {
            self.offsets[k] = match level {
                Some(items) => items.len() as isize - 1,
                None => -1,
            };
        }
        self.direction = Direction::Reverse;
        Ok(())
    }

    /// Position before the first item `>= value` (or `> value` when
    /// `or_equal` is false).
    pub fn seek<T, C: Comparer<T>>(&mut self, store: &ColaStore<T, C>, value: &T, or_equal: bool) -> Result<(), ColaError> {
        let cmp = &store.cmp;
        self.seek_by(store, |x| cmp.compare(x, value), or_equal)
    }

    /// As [`ColaCursor::seek`], with `probe(x)` ordering stored items
    /// against the target.
    pub fn seek_by<T, C: Comparer<T>, F: FnMut(&T) -> Ordering>(
        &mut self,
        store: &ColaStore<T, C>,
        mut probe: F,
        or_equal: bool,
    ) -> Result<(), ColaError> {
        self.check(store)?;
        for (k, level) in store.levels.iter().enumerate() {
            self.offsets[k] = match level {
                Some(items) => items.partition_point(|x| {
                    let ord = probe(x);
                    ord == Ordering::Less || (!or_equal && ord == Ordering::Equal)
                }) as isize,
                None => 0,
            };
        }
        self.direction = Direction::Forward;
        Ok(())
    }

    /// Yield the next item in ascending order. Changing direction adjusts
    /// every per-level position by one slot.
    pub fn next<'a, T, C: Comparer<T>>(&mut self, store: &'a ColaStore<T, C>) -> Result<Option<&'a T>, ColaError> {
        self.check(store)?;
        if self.direction == Direction::Reverse {
            self.offsets.iter_mut().for_each(|off| *off += 1);
            self.direction = Direction::Forward;
        }
        let mut best: Option<(usize, &'a T)> = None;
        for (k, level) in store.levels.iter().enumerate() {
            let Some(items) = level else { continue };
            let off = self.offsets[k];
            if off < 0 || off as usize >= items.len() {
                continue;
            }
            let item = &items[off as usize];
            best = match best {
                Some((_, b)) if store.cmp.compare(item, b) != Ordering::Less => best,
                _ => Some((k, item)),
            };
        }
        match best {
            Some((k, item)) => {
                self.offsets[k] += 1;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Yield the next item in descending order.
    pub fn previous<'a, T, C: Comparer<T>>(&mut self, store: &'a ColaStore<T, C>) -> Result<Option<&'a T>, ColaError> {
        self.check(store)?;
        if self.direction == Direction::Forward {
            self.offsets.iter_mut().for_each(|off| *off -= 1);
            self.direction = Direction::Reverse;
        }
        let mut best: Option<(usize, &'a T)> = None;
        for (k, level) in store.levels.iter().enumerate() {
            let Some(items) = level else { continue };
            let off = self.offsets[k];
            if off < 0 || off as usize >= items.len() {
                continue;
            }
            let item = &items[off as usize];
            best = match best {
                Some((_, b)) if store.cmp.compare(item, b) != Ordering::Greater => best,
                _ => Some((k, item)),
            };
        }
        match best {
            Some((k, item)) => {
                self.offsets[k] -= 1;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}
