//! Ordered set of unique elements over a [`ColaStore`].

use crate::cmp::{Comparer, NaturalOrder};
use crate::store::{ColaCursor, ColaIter, ColaStore};

pub struct ColaOrderedSet<T, C: Comparer<T> = NaturalOrder> {
    store: ColaStore<T, C>,
}

impl<T, C: Comparer<T> + Default> ColaOrderedSet<T, C> {
    pub fn new() -> Self { Self::with_comparer(C::default()) }
}

impl<T, C: Comparer<T> + Default> Default for ColaOrderedSet<T, C> {
    fn default() -> Self { Self::new() }
}

impl<T, C: Comparer<T>> ColaOrderedSet<T, C> {
    pub fn with_comparer(cmp: C) -> Self { ColaOrderedSet { store: ColaStore::with_comparer(cmp) } }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn clear(&mut self) { self.store.clear() }

    /// Insert `value` unless an equivalent element is already present.
    /// Returns whether the set changed.
    pub fn add(&mut self, value: T) -> bool {
        if self.store.find(&value).is_some() {
            return false;
        }
        self.store.insert(value);
        true
    }

    /// Insert `value`, overwriting any equivalent element. Returns the
    /// element that was displaced.
    pub fn set(&mut self, value: T) -> Option<T> {
        match self.store.find(&value) {
            Some((level, offset)) => self.store.replace_at(level, offset, value).ok(),
            None => {
                self.store.insert(value);
                None
            }
        }
    }

    pub fn contains(&self, value: &T) -> bool { self.store.find(value).is_some() }

    /// The stored element equivalent to `value`, when present. Useful for
    /// canonicalization when the comparer deems distinct representations
    /// equivalent.
    pub fn try_get_value(&self, value: &T) -> Option<&T> {
        self.store.find(value).and_then(|(level, offset)| self.store.get(level, offset))
    }

    /// Remove the element equivalent to `value`; returns whether the set
    /// changed.
    pub fn remove(&mut self, value: &T) -> bool {
        match self.store.find(value) {
            Some((level, offset)) => self.store.remove_at(level, offset).is_ok(),
            None => false,
        }
    }

    /// Remove and return the stored element equivalent to `value`.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let (level, offset) = self.store.find(value)?;
        self.store.remove_at(level, offset).ok()
    }

    pub fn min(&self) -> Option<&T> { self.store.min() }

    pub fn max(&self) -> Option<&T> { self.store.max() }

    /// Ordered iterator over the elements.
    pub fn iter(&self) -> ColaIter<'_, T, C> { self.store.iter() }

    pub fn cursor(&self) -> ColaCursor { self.store.cursor() }

    pub fn store(&self) -> &ColaStore<T, C> { &self.store }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.store.to_vec()
    }
}

impl<T, C: Comparer<T>> Extend<T> for ColaOrderedSet<T, C> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}
