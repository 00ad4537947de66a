//! Conflict-range style usage: packed tuple keys feeding the range
//! dictionary, the way a transaction tracks its read/write footprint.

use anyhow::Result;
use bytes::Bytes;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata_cola::ColaRangeDictionary;
use strata_tests::byte_order;
use strata_tuple::{encode_keys, pack, Tuple};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Access {
    Read,
    Write,
}

type ConflictMap = ColaRangeDictionary<Bytes, Access, fn(&Bytes, &Bytes) -> std::cmp::Ordering>;

fn conflict_map() -> ConflictMap { ConflictMap::with_comparers(byte_order, strata_cola::NaturalOrder) }

#[test]
fn tuple_key_ranges_partition_by_prefix() -> Result<()> {
    let mut conflicts = conflict_map();

    // read the whole ("users",) subtree, then write one row inside it
    let users = Tuple::from(("users",));
    let range = users.range();
    conflicts.mark(range.begin.clone(), range.end.clone(), Access::Read)?;

    let row = pack(&users.append(42i64));
    let row_range = strata_tuple::to_range(&row);
    conflicts.mark(row_range.begin.clone(), row_range.end.clone(), Access::Write)?;

    // the written row reports Write, its siblings still report Read
    assert_eq!(conflicts.get(&row_range.begin), Some(&Access::Write));
    let sibling = pack(&users.append(41i64));
    assert_eq!(conflicts.get(&sibling), Some(&Access::Read));

    // a disjoint subtree is untouched
    let orders = pack(&Tuple::from(("orders",)));
    assert_eq!(conflicts.get(&orders), None);
    assert!(!conflicts.intersect(&strata_tuple::to_range(&orders).begin, &strata_tuple::to_range(&orders).end, &(), |_, _| true));
    Ok(())
}

#[test]
fn write_conflict_detection_over_batch_keys() -> Result<()> {
    let mut conflicts = conflict_map();

    // batch-encode a row of keys sharing one backing buffer
    let keys = encode_keys(&[10i64, 20, 30, 40], Some(&b"t\x00"[..]));
    for pair in keys.iter().tuple_windows::<(_, _)>() {
        // mark [key_i, key_{i+1}) alternately as read and write
        let (a, b) = pair;
        let access = if a.len() % 2 == 0 { Access::Read } else { Access::Write };
        conflicts.mark(a.clone(), b.clone(), access)?;
    }
    assert!(conflicts.intersect(&keys[0], &keys[3], &Access::Read, |v, want| v == want));

    // sorted order of the packed keys matches insertion order of the values
    let sorted: Vec<&Bytes> = keys.iter().sorted_by(|a, b| byte_order(a, b)).collect();
    assert_eq!(sorted, keys.iter().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn randomized_conflict_map_stays_disjoint() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0xfdb);
    let mut conflicts = conflict_map();
    for _ in 0..300 {
        let a: u16 = rng.gen_range(0..1000);
        let b: u16 = a + rng.gen_range(1..100);
        let begin = Bytes::copy_from_slice(&a.to_be_bytes());
        let end = Bytes::copy_from_slice(&b.to_be_bytes());
        let access = if rng.gen_bool(0.5) { Access::Read } else { Access::Write };
        conflicts.mark(begin, end, access)?;

        let entries: Vec<_> = conflicts.iter().collect();
        for pair in entries.windows(2) {
            assert!(pair[0].end <= pair[1].begin, "overlap in conflict map");
            if pair[0].end == pair[1].begin {
                assert_ne!(pair[0].value, pair[1].value, "unmerged adjacency");
            }
        }
    }
    Ok(())
}
