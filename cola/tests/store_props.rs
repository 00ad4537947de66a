//! Randomized structural checks for the store and the range dictionary,
//! validated against naive reference models.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_cola::{ColaOrderedDict, ColaRangeDictionary, ColaStore};

#[test]
fn store_bitmap_matches_count_through_workload() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut store: ColaStore<u64> = ColaStore::new();
    let mut reference = std::collections::BTreeSet::new();
    for step in 0..3000 {
        if reference.is_empty() || rng.gen_bool(0.65) {
            let v = rng.gen::<u64>();
            if reference.insert(v) {
                store.insert(v);
            }
        } else {
            let idx = rng.gen_range(0..reference.len());
            let pick = *reference.iter().nth(idx).expect("non-empty");
            reference.remove(&pick);
            let (level, offset) = store.find(&pick).expect("present");
            store.remove_at(level, offset).expect("remove");
        }
        assert_eq!(store.len(), reference.len(), "count diverged at step {step}");
        // allocation bitmap is the binary representation of the count
        let sizes: Vec<usize> = store.allocated_levels().map(<[u64]>::len).collect();
        let mut expected = Vec::new();
        for k in 0..usize::BITS {
            if store.len() & (1 << k) != 0 {
                expected.push(1usize << k);
            }
        }
        assert_eq!(sizes, expected, "bitmap diverged at step {step}");
    }
    assert!(store.iter().copied().eq(reference.iter().copied()));
}

#[test]
fn find_after_insert_returns_each_item() {
    let mut rng = StdRng::seed_from_u64(0xf1);
    let mut store: ColaStore<u32> = ColaStore::new();
    let mut inserted = Vec::new();
    for _ in 0..500 {
        let v = rng.gen::<u32>();
        if !inserted.contains(&v) {
            store.insert(v);
            inserted.push(v);
        }
        for &v in &inserted {
            let (level, offset) = store.find(&v).expect("inserted value must be findable");
            assert_eq!(store.get(level, offset), Some(&v));
        }
    }
}

#[test]
fn dict_tracks_reference_map() {
    let mut rng = StdRng::seed_from_u64(0xd1c7);
    let mut dict: ColaOrderedDict<u16, u32> = ColaOrderedDict::new();
    let mut reference = BTreeMap::new();
    for _ in 0..2000 {
        let k = rng.gen_range(0..500u16);
        match rng.gen_range(0..4) {
            0 => {
                let v = rng.gen();
                dict.set_item(k, v);
                reference.insert(k, v);
            }
            1 => {
                let v = rng.gen();
                assert_eq!(dict.add_or_update(k, v), !reference.contains_key(&k));
                reference.insert(k, v);
            }
            2 => {
                assert_eq!(dict.remove(&k), reference.remove(&k));
            }
            _ => {
                assert_eq!(dict.try_get_value(&k), reference.get(&k));
            }
        }
        assert_eq!(dict.len(), reference.len());
    }
    let ours: Vec<(u16, u32)> = dict.iter().map(|(k, v)| (*k, *v)).collect();
    let theirs: Vec<(u16, u32)> = reference.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(ours, theirs);
}

/// Reference model: coverage as a point → value map over a small key space.
#[derive(Default)]
struct CoverageModel {
    points: BTreeMap<i64, char>,
}

impl CoverageModel {
    fn mark(&mut self, begin: i64, end: i64, value: char) {
        for p in begin..end {
            self.points.insert(p, value);
        }
    }
}

#[test]
fn range_dict_coverage_matches_model() {
    let mut rng = StdRng::seed_from_u64(0x4a4a);
    let mut dict: ColaRangeDictionary<i64, char> = ColaRangeDictionary::new();
    let mut model = CoverageModel::default();
    let values = ['A', 'B', 'C'];
    for _ in 0..400 {
        let begin = rng.gen_range(0..100);
        let end = begin + rng.gen_range(1..20);
        let value = values[rng.gen_range(0..values.len())];
        dict.mark(begin, end, value).expect("mark");
        model.mark(begin, end, value);

        // every covered point answers with the model's value
        for p in 0..130 {
            assert_eq!(dict.get(&p).copied(), model.points.get(&p).copied(), "point {p} diverged");
        }

        // structural invariants: sorted, disjoint, no adjacent equal values
        let entries: Vec<_> = dict.iter().collect();
        for pair in entries.windows(2) {
            assert!(pair[0].end <= pair[1].begin);
            if pair[0].end == pair[1].begin {
                assert_ne!(pair[0].value, pair[1].value);
            }
        }
    }
}

#[test]
fn range_dict_remove_shift_property() {
    let shift = |k: &i64, delta: &i64| k + delta;
    let mut rng = StdRng::seed_from_u64(0x77aa);
    for _ in 0..200 {
        let mut dict: ColaRangeDictionary<i64, u8> = ColaRangeDictionary::new();
        let mut originals = Vec::new();
        let mut cursor = 0i64;
        for v in 0..rng.gen_range(1..8u8) {
            let begin = cursor + rng.gen_range(1..10);
            let end = begin + rng.gen_range(1..10);
            dict.mark(begin, end, v).expect("mark");
            originals.push((begin, end, v));
            cursor = end;
        }
        let b = rng.gen_range(0..cursor);
        let e = b + rng.gen_range(1..15);
        let width = e - b;
        dict.remove(&b, &e, &-width, shift).expect("remove");

        // every entry that started at or after the cut moved left by its width
        for (begin, end, v) in &originals {
            if *begin >= e {
                assert_eq!(dict.get(&(begin - width)).copied(), Some(*v), "entry ({begin},{end}) did not shift");
            }
        }
    }
}
