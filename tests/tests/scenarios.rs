//! End-to-end acceptance scenarios for the codec and the containers.

use anyhow::Result;
use strata_cola::{ColaOrderedSet, ColaRangeDictionary};
use strata_tuple::{encode_key, pack, to_range, unpack, Tuple};

#[test]
fn integer_key_vectors() {
    assert_eq!(encode_key(-1i64).as_ref(), &[0x13, 0xFE]);
    assert_eq!(encode_key(0i64).as_ref(), &[0x14]);
    assert_eq!(encode_key(1i64).as_ref(), &[0x15, 0x01]);
    assert_eq!(encode_key(256i64).as_ref(), &[0x16, 0x01, 0x00]);
}

#[test]
fn string_key_vectors() {
    assert_eq!(encode_key("hi").as_ref(), &[0x02, 0x68, 0x69, 0x00]);
    assert_eq!(encode_key("a\0b").as_ref(), &[0x02, 0x61, 0x00, 0xFF, 0x62, 0x00]);
}

#[test]
fn mixed_key_roundtrip() -> Result<()> {
    let key = encode_key((true, "x"));
    assert_eq!(key.as_ref(), &[0x15, 0x01, 0x02, 0x78, 0x00]);
    let tuple = unpack(key)?;
    assert_eq!(tuple.len(), 2);
    assert!(tuple.get_as::<bool>(0)?);
    assert_eq!(tuple.get_as::<String>(1)?, "x");
    assert_eq!(tuple, Tuple::from((true, "x")));
    Ok(())
}

#[test]
fn cola_set_bitmap_and_traversal() {
    let mut set = ColaOrderedSet::<i32>::new();
    for (i, v) in [5, 3, 8, 1, 9, 2, 7].into_iter().enumerate() {
        set.add(v);
        let count = i + 1;
        let sizes: Vec<usize> = set.store().allocated_levels().map(<[i32]>::len).collect();
        let expected: Vec<usize> = (0..usize::BITS).filter(|k| count & (1 << k) != 0).map(|k| 1usize << k).collect();
        assert_eq!(sizes, expected, "allocation bitmap after {count} inserts");
    }
    assert_eq!(set.to_vec(), vec![1, 2, 3, 5, 7, 8, 9]);
}

#[test]
fn range_dictionary_mark_scenario() -> Result<()> {
    let mut dict: ColaRangeDictionary<i64, &str> = ColaRangeDictionary::new();
    dict.mark(0, 10, "A")?;
    dict.mark(4, 5, "B")?;
    let entries: Vec<_> = dict.iter().map(|e| (e.begin, e.end, e.value)).collect();
    assert_eq!(entries, vec![(0, 4, "A"), (4, 5, "B"), (5, 10, "A")]);

    dict.mark(3, 7, "A")?;
    let entries: Vec<_> = dict.iter().map(|e| (e.begin, e.end, e.value)).collect();
    assert_eq!(entries, vec![(0, 10, "A")]);
    Ok(())
}

#[test]
fn tuple_range_scenario() -> Result<()> {
    let users = Tuple::from(("users",));
    let packed = pack(&users);
    let range = to_range(&packed);

    let mut begin = packed.to_vec();
    begin.push(0x00);
    let mut end = packed.to_vec();
    end.push(0xFF);
    assert_eq!(range.begin.as_ref(), begin.as_slice());
    assert_eq!(range.end.as_ref(), end.as_slice());

    for k in 0..50i64 {
        let key = pack(&users.append(k));
        assert!(range.contains(&key));
    }
    assert!(range.contains(&pack(&users.append("zzz"))));
    assert!(!range.contains(&packed));
    Ok(())
}
