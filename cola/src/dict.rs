//! Ordered key → value dictionary over a [`ColaStore`].
//!
//! Slots hold `(key, value)` pairs but only the key participates in the
//! order, so values can change freely without disturbing the levels.

use std::cmp::Ordering;

use crate::cmp::{Comparer, NaturalOrder};
use crate::error::ColaError;
use crate::store::{ColaCursor, ColaStore};

#[derive(Debug, Clone)]
pub struct Slot<K, V> {
    pub key: K,
    pub value: V,
}

/// Lifts a key comparer to dictionary slots.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyOrder<C>(pub C);

impl<K, V, C: Comparer<K>> Comparer<Slot<K, V>> for KeyOrder<C> {
    fn compare(&self, a: &Slot<K, V>, b: &Slot<K, V>) -> Ordering { self.0.compare(&a.key, &b.key) }
}

pub struct ColaOrderedDict<K, V, C: Comparer<K> = NaturalOrder> {
    store: ColaStore<Slot<K, V>, KeyOrder<C>>,
}

impl<K, V, C: Comparer<K> + Default> ColaOrderedDict<K, V, C> {
    pub fn new() -> Self { Self::with_comparer(C::default()) }
}

impl<K, V, C: Comparer<K> + Default> Default for ColaOrderedDict<K, V, C> {
    fn default() -> Self { Self::new() }
}

impl<K, V, C: Comparer<K>> ColaOrderedDict<K, V, C> {
    pub fn with_comparer(cmp: C) -> Self { ColaOrderedDict { store: ColaStore::with_comparer(KeyOrder(cmp)) } }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn is_empty(&self) -> bool { self.store.is_empty() }

    pub fn clear(&mut self) { self.store.clear() }

    fn locate(&self, key: &K) -> Option<(usize, usize)> {
        let cmp = &self.store.comparer().0;
        self.store.find_by(|slot| cmp.compare(&slot.key, key))
    }

    /// Insert a new pair; fails with `DuplicateKey` when the key exists.
    pub fn add(&mut self, key: K, value: V) -> Result<(), ColaError> {
        if self.locate(&key).is_some() {
            return Err(ColaError::DuplicateKey);
        }
        self.store.insert(Slot { key, value });
        Ok(())
    }

    /// Insert or overwrite the pair for `key`.
    pub fn set_item(&mut self, key: K, value: V) {
        match self.locate(&key) {
            Some((level, offset)) => {
                let _ = self.store.replace_at(level, offset, Slot { key, value });
            }
            None => self.store.insert(Slot { key, value }),
        }
    }

    /// Upsert; returns whether the key was new.
    pub fn add_or_update(&mut self, key: K, value: V) -> bool {
        match self.locate(&key) {
            Some((level, offset)) => {
                let _ = self.store.replace_at(level, offset, Slot { key, value });
                false
            }
            None => {
                self.store.insert(Slot { key, value });
                true
            }
        }
    }

    /// Return the stored value for `key`, inserting `value` when absent;
    /// the flag reports whether the insert happened.
    pub fn get_or_add(&mut self, key: K, value: V) -> (&V, bool)
    where
        K: Clone,
    {
        let probe = key.clone();
        let was_new = match self.locate(&probe) {
            Some(_) => false,
            None => {
                self.store.insert(Slot { key, value });
                true
            }
        };
        let slot = self.locate(&probe).and_then(|(level, offset)| self.store.get(level, offset));
        // present either way: found above or just inserted
        (&slot.unwrap().value, was_new)
    }

    /// The stored (canonical) key equivalent to `key`.
    pub fn try_get_key(&self, key: &K) -> Option<&K> {
        self.locate(key).and_then(|(level, offset)| self.store.get(level, offset)).map(|slot| &slot.key)
    }

    pub fn try_get_value(&self, key: &K) -> Option<&V> {
        self.locate(key).and_then(|(level, offset)| self.store.get(level, offset)).map(|slot| &slot.value)
    }

    pub fn contains_key(&self, key: &K) -> bool { self.locate(key).is_some() }

    /// Remove the pair for `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (level, offset) = self.locate(key)?;
        self.store.remove_at(level, offset).ok().map(|slot| slot.value)
    }

    /// Remove every key yielded by `keys`.
    pub fn remove_range<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for key in keys {
            self.remove(key);
        }
    }

    /// Values whose keys fall between `lo` and `hi` under the given
    /// inclusivity. The result order is unspecified (it follows the level
    /// layout, not the key order); callers must not rely on it.
    pub fn find_between(&self, lo: &K, lo_inclusive: bool, hi: &K, hi_inclusive: bool) -> Vec<&V> {
        let cmp = &self.store.comparer().0;
        let mut out = Vec::new();
        for items in self.store.allocated_levels() {
            let start = items.partition_point(|slot| {
                let ord = cmp.compare(&slot.key, lo);
                ord == Ordering::Less || (!lo_inclusive && ord == Ordering::Equal)
            });
            let end = items.partition_point(|slot| {
                let ord = cmp.compare(&slot.key, hi);
                ord == Ordering::Less || (hi_inclusive && ord == Ordering::Equal)
            });
            out.extend(items[start..end].iter().map(|slot| &slot.value));
        }
        out
    }

    /// Pair with the smallest key.
    pub fn first(&self) -> Option<(&K, &V)> { self.store.min().map(|slot| (&slot.key, &slot.value)) }

    /// Pair with the largest key.
    pub fn last(&self) -> Option<(&K, &V)> { self.store.max().map(|slot| (&slot.key, &slot.value)) }

    /// Ordered iterator over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> { self.store.iter().map(|slot| (&slot.key, &slot.value)) }

    pub fn keys(&self) -> impl Iterator<Item = &K> { self.store.iter().map(|slot| &slot.key) }

    pub fn values(&self) -> impl Iterator<Item = &V> { self.store.iter().map(|slot| &slot.value) }

    pub fn cursor(&self) -> ColaCursor { self.store.cursor() }

    pub fn store(&self) -> &ColaStore<Slot<K, V>, KeyOrder<C>> { &self.store }
}
