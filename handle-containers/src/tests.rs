// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap as StdHashMap, VecDeque};
use std::hash::Hasher;
use std::rc::Rc;

use object_alloc::{Exhausted, NodeAlloc};
use page_alloc::{PageProvider, PageProviderBuilder};
use rand::seq::SliceRandom;
use rand::Rng;
use segment_alloc::{
    DynamicSegmentBuilder, FastNodeAlloc, PoolNodeAlloc, SharedDynamicSegment, SharedStaticSegment,
    SimpleNodeAlloc, StaticSegment,
};

use super::*;
use crate::hash::INITIAL_BUCKETS;

const PAGE_SIZE: usize = 4096;

fn provider(pages: usize) -> Rc<PageProvider> {
    let _ = env_logger::try_init();
    Rc::new(
        PageProviderBuilder::default()
            .page_size(PAGE_SIZE)
            .build(pages * PAGE_SIZE)
            .unwrap(),
    )
}

// Small minimum chunks, so that one node costs one 64-byte chunk.
fn segment(pages: usize) -> SharedDynamicSegment {
    DynamicSegmentBuilder::default()
        .pages(pages)
        .min_packets(4)
        .build_shared(&provider(pages))
        .unwrap()
}

fn static_segment(pages: usize) -> SharedStaticSegment {
    StaticSegment::new(&provider(pages), pages)
        .unwrap()
        .into_shared()
}

fn assert_all_free(seg: &SharedDynamicSegment) {
    let seg = seg.borrow();
    assert_eq!(seg.free_packets(), seg.total_packets(), "{}", seg.dump());
    assert_eq!(seg.chunk_count(), 1);
}

#[derive(Debug)]
struct Counted(Rc<Cell<usize>>);

impl Drop for Counted {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

// Array

#[test]
fn test_array_basic() {
    let seg = segment(4);
    let mut a = Array::new(seg.clone());
    assert!(a.is_empty());
    assert_eq!(a.capacity(), 0);
    for i in 0..100u64 {
        a.push(i).unwrap();
    }
    assert_eq!(a.len(), 100);
    assert!(a.capacity() >= 100);
    assert_eq!(a[42], 42);
    a[42] = 4200;
    assert_eq!(a.get(42), Some(&4200));
    assert_eq!(a.get(100), None);
    assert_eq!(a.pop(), Some(99));

    a.insert(0, 1000).unwrap();
    let len = a.len();
    a.insert(len, 2000).unwrap();
    a.insert(50, 3000).unwrap();
    assert_eq!(a.len(), 102);
    assert_eq!(a[0], 1000);
    assert_eq!(a[50], 3000);
    assert_eq!(a[101], 2000);

    assert_eq!(a.remove(50), 3000);
    assert_eq!(a.remove(0), 1000);
    assert_eq!(a.swap_remove(0), 0);
    assert_eq!(a[0], 2000);
    let expected: Vec<u64> = std::iter::once(2000)
        .chain((1..99).map(|i| if i == 42 { 4200 } else { i }))
        .collect();
    assert_eq!(a.as_slice(), &expected[..]);
    assert!(a.contains(&4200));
    for v in a.iter_mut() {
        *v += 1;
    }
    assert_eq!(a[1], 2);

    a.clear();
    assert!(a.is_empty());
    drop(a);
    assert_all_free(&seg);
}

#[test]
fn test_array_grows_in_place() {
    let seg = segment(4);
    let mut a = Array::new(seg.clone());
    a.push(0u64).unwrap();
    let base = a.as_slice().as_ptr();
    for i in 1..300 {
        a.push(i).unwrap();
    }
    // the buffer is the only allocation, so every growth absorbs the free space after it
    assert_eq!(a.as_slice().as_ptr(), base);
    assert_eq!(seg.borrow().chunk_count(), 2);
    assert!(a.iter().copied().eq(0..300));
}

#[test]
fn test_array_reserve() {
    let seg = segment(4);
    let mut a = Array::<u32>::with_capacity(seg.clone(), 10).unwrap();
    assert!(a.capacity() >= 10);
    a.reserve(500).unwrap();
    assert!(a.capacity() >= 500);
    assert_eq!(a.reserve(usize::MAX), Err(Exhausted));
    assert!(a.is_empty());
}

#[test]
fn test_array_exhausted() {
    let seg = segment(1);
    let mut a = Array::new(seg);
    let mut n = 0u64;
    while a.push(n).is_ok() {
        n += 1;
    }
    assert!(n > 0);
    assert_eq!(a.len() as u64, n);
    assert!(a.iter().copied().eq(0..n));
    assert_eq!(a.pop(), Some(n - 1));
}

#[test]
fn test_array_drops_elements() {
    let drops = Rc::new(Cell::new(0));
    let seg = segment(1);
    let mut a = Array::new(seg.clone());
    for _ in 0..10 {
        a.push(Counted(drops.clone())).unwrap();
    }
    drop(a.remove(3));
    assert_eq!(drops.get(), 1);
    a.clear();
    assert_eq!(drops.get(), 10);
    for _ in 0..3 {
        a.push(Counted(drops.clone())).unwrap();
    }
    drop(a);
    assert_eq!(drops.get(), 13);
    assert_all_free(&seg);
}

#[test]
#[should_panic]
fn test_array_insert_out_of_bounds() {
    let mut a = Array::new(segment(1));
    a.insert(1, 0u8).unwrap();
}

// List

fn exercise_list<A: NodeAlloc<u64>>(alloc: &A) {
    let mut list: List<u64, A> = List::new(alloc);
    for i in 1..=5 {
        list.push_back(i).unwrap();
    }
    list.push_front(0).unwrap();
    assert_eq!(list.len(), 6);
    assert!(list.iter().copied().eq(0..=5));
    assert!(list.iter().rev().copied().eq((0..=5).rev()));
    assert_eq!(list.front(), Some(&0));
    assert_eq!(list.back(), Some(&5));
    assert_eq!(list.pop_front(), Some(0));
    assert_eq!(list.pop_back(), Some(5));

    let three = list.find(&3).unwrap();
    unsafe {
        list.insert_after(three, 30).unwrap();
        list.insert_before(three, 20).unwrap();
        assert_eq!(*list.get(three), 3);
        *list.get_mut(three) = 33;
    }
    assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 2, 20, 33, 30, 4]);
    assert_eq!(unsafe { list.remove(three) }, 33);
    assert!(!list.contains(&33));

    list.push_back(2).unwrap();
    list.push_front(2).unwrap();
    assert_eq!(list.remove_all(&2), 3);
    assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![1, 20, 30, 4]);
    for v in list.iter_mut() {
        *v *= 10;
    }
    *list.front_mut().unwrap() += 1;
    *list.back_mut().unwrap() += 2;
    assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![11, 200, 300, 42]);

    let first = list.cursor_front().unwrap();
    let second = unsafe { list.next(first) }.unwrap();
    assert_eq!(unsafe { list.prev(second) }, Some(first));
    assert_eq!(unsafe { list.prev(first) }, None);
    assert_eq!(unsafe { list.next(list.cursor_back().unwrap()) }, None);
    assert_eq!(list.find_by(|&v| v > 250), unsafe { list.next(second) });

    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.pop_front(), None);
    assert_eq!(list.front(), None);
    assert_eq!(list.cursor_back(), None);
}

#[test]
fn test_list_simple() {
    let seg = segment(4);
    exercise_list(&SimpleNodeAlloc::<u64>::new(seg.clone()));
    assert_all_free(&seg);
}

#[test]
fn test_list_pool() {
    let seg = segment(4);
    exercise_list(&PoolNodeAlloc::<u64>::new(seg.clone(), 16));
    assert_all_free(&seg);
}

#[test]
fn test_pool_small_elements() {
    let seg = segment(4);
    // u32 and u8 slots cannot hold a free-list link, but the containers only allocate their
    // rebound node types from these pools.
    let pool = PoolNodeAlloc::<u32>::new(seg.clone(), 16);
    let mut list = List::new(&pool);
    for i in 0..16u32 {
        list.push_back(i).unwrap();
    }
    assert!(list.push_back(16).is_err());
    assert_eq!(list.pop_front(), Some(0));
    list.push_back(16).unwrap();
    assert!(list.iter().copied().eq(1..=16));

    let pool = PoolNodeAlloc::<u8>::new(seg.clone(), 8);
    let mut set = TreeSet::new(&pool);
    for b in [5u8, 1, 7, 3, 1] {
        set.insert(b).unwrap();
    }
    assert!(set.iter().copied().eq([1u8, 3, 5, 7]));
    assert!(set.remove(&3));
    assert_eq!(set.first(), Some(&1));

    drop(list);
    drop(set);
    assert_all_free(&seg);
}

#[test]
fn test_list_fast() {
    exercise_list(&FastNodeAlloc::<u64>::new(static_segment(4)));
}

#[test]
fn test_list_against_vecdeque() {
    let seg = segment(16);
    let alloc = SimpleNodeAlloc::<u32>::new(seg.clone());
    let mut list = List::new(&alloc);
    let mut model = VecDeque::new();
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        match rng.gen_range(0..4) {
            0 => {
                let v = rng.gen();
                list.push_back(v).unwrap();
                model.push_back(v);
            }
            1 => {
                let v = rng.gen();
                list.push_front(v).unwrap();
                model.push_front(v);
            }
            2 => assert_eq!(list.pop_front(), model.pop_front()),
            _ => assert_eq!(list.pop_back(), model.pop_back()),
        }
        assert_eq!(list.len(), model.len());
    }
    assert!(list.iter().eq(model.iter()));
    drop(list);
    assert_all_free(&seg);
}

#[test]
fn test_list_drops_elements() {
    let drops = Rc::new(Cell::new(0));
    let seg = segment(2);
    let alloc = SimpleNodeAlloc::<Counted>::new(seg.clone());
    let mut list = List::new(&alloc);
    for _ in 0..5 {
        list.push_back(Counted(drops.clone())).unwrap();
    }
    drop(list.pop_back());
    assert_eq!(drops.get(), 1);
    drop(list);
    assert_eq!(drops.get(), 5);
    assert_all_free(&seg);
}

// TreeMap

#[test]
fn test_tree_against_btreemap() {
    let seg = segment(64);
    let alloc = SimpleNodeAlloc::<(u32, u32)>::new(seg.clone());
    let mut tree = TreeMap::new(&alloc);
    let mut model = BTreeMap::new();
    let mut rng = rand::thread_rng();
    for i in 0..3000 {
        let k = rng.gen_range(0..500u32);
        if rng.gen_bool(0.6) {
            let v = rng.gen::<u32>();
            assert_eq!(tree.insert_unique(k, v).unwrap(), model.insert(k, v));
        } else {
            assert_eq!(tree.remove(&k), model.remove(&k));
        }
        assert_eq!(tree.len(), model.len());
        if i % 100 == 0 {
            tree.check_invariants();
        }
    }
    tree.check_invariants();
    assert!(tree.iter().eq(model.iter()));
    assert!(tree.iter().rev().eq(model.iter().rev()));
    assert_eq!(tree.iter().len(), model.len());
    assert_eq!(tree.first(), model.iter().next());
    assert_eq!(tree.last(), model.iter().next_back());
    for k in 0..500 {
        assert_eq!(tree.get(&k), model.get(&k));
        assert_eq!(tree.count(&k), model.contains_key(&k) as usize);
    }
    drop(tree);
    assert_all_free(&seg);
}

#[test]
fn test_tree_duplicates() {
    let seg = segment(4);
    let alloc = SimpleNodeAlloc::<(u32, &'static str)>::new(seg.clone());
    let mut tree = TreeMap::new(&alloc);
    for &(k, v) in &[(5, "a"), (3, "x"), (5, "b"), (7, "y"), (5, "c"), (1, "w")] {
        tree.insert(k, v).unwrap();
    }
    tree.check_invariants();
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.count(&5), 3);
    assert_eq!(tree.get(&5), Some(&"a"));
    assert_eq!(tree.get_all(&5).copied().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![1, 3, 5, 5, 5, 7]);

    assert_eq!(tree.insert_unique(5, "z").unwrap(), Some("a"));
    assert_eq!(tree.remove(&5), Some("z"));
    assert_eq!(tree.get(&5), Some(&"b"));
    assert_eq!(tree.replace(&5, "q"), 2);
    assert_eq!(tree.get_all(&5).copied().collect::<Vec<_>>(), vec!["q", "q"]);
    assert_eq!(tree.count(&4), 0);
    assert_eq!(tree.replace(&4, "none"), 0);
    *tree.get_mut(&7).unwrap() = "yy";
    assert_eq!(tree.remove_entry(&7), Some((7, "yy")));
    tree.check_invariants();
    assert_eq!(tree.values().copied().collect::<Vec<_>>(), vec!["w", "x", "q", "q"]);
}

fn shuffled_tree<A: NodeAlloc<(u64, u64)>>(alloc: &A) {
    let mut keys: Vec<u64> = (0..200).collect();
    keys.shuffle(&mut rand::thread_rng());
    let mut tree: TreeMap<u64, u64, A> = TreeMap::new(alloc);
    for &k in &keys {
        assert_eq!(tree.insert_unique(k, k * 2).unwrap(), None);
    }
    tree.check_invariants();
    assert!(tree.keys().copied().eq(0..200));
    for &k in keys.iter().step_by(2) {
        assert_eq!(tree.remove(&k), Some(k * 2));
    }
    tree.check_invariants();
    assert_eq!(tree.len(), 100);
    let (last, v) = tree.pop_last().unwrap();
    assert_eq!(v, last * 2);
    assert!(tree.keys().all(|&k| k < last));
    assert_eq!(tree.len(), 99);
    while let Some((k, v)) = tree.pop_first() {
        assert_eq!(v, k * 2);
        if k % 7 == 0 {
            tree.check_invariants();
        }
    }
    assert!(tree.is_empty());
    tree.check_invariants();
}

#[test]
fn test_tree_pool() {
    let seg = segment(16);
    shuffled_tree(&PoolNodeAlloc::<(u64, u64)>::new(seg.clone(), 256));
    assert_all_free(&seg);
}

#[test]
fn test_tree_fast() {
    shuffled_tree(&FastNodeAlloc::<(u64, u64)>::new(static_segment(16)));
}

#[test]
fn test_tree_simple() {
    let seg = segment(16);
    shuffled_tree(&SimpleNodeAlloc::<(u64, u64)>::new(seg.clone()));
    assert_all_free(&seg);
}

#[test]
fn test_tree_empty_allocates_nothing() {
    let seg = segment(1);
    let alloc = SimpleNodeAlloc::<(u32, u32)>::new(seg.clone());
    let mut tree = TreeMap::new(&alloc);
    assert_eq!(tree.get(&1), None);
    assert_eq!(tree.remove(&1), None);
    assert_eq!(tree.first(), None);
    assert_eq!(tree.pop_last(), None);
    assert_eq!(tree.iter().next(), None);
    tree.clear();
    tree.check_invariants();
    assert_eq!(seg.borrow().chunk_count(), 1);

    // the sentinel and one node, in front of the free remainder
    tree.insert(1, 1).unwrap();
    assert_eq!(seg.borrow().chunk_count(), 3);
    drop(tree);
    assert_all_free(&seg);
}

#[test]
fn test_tree_exhausted() {
    let seg = segment(2);
    let alloc = SimpleNodeAlloc::<(u64, u64)>::new(seg.clone());
    let mut tree = TreeMap::new(&alloc);
    let mut n = 0;
    while tree.insert(n, n).is_ok() {
        n += 1;
    }
    assert!(n > 0);
    assert_eq!(tree.len() as u64, n);
    tree.check_invariants();
    assert!(tree.keys().copied().eq(0..n));
    assert_eq!(tree.insert_unique(0, 7), Ok(Some(0)));
    assert_eq!(tree.remove(&(n / 2)), Some(n / 2));
    tree.insert(n, n).unwrap();
    tree.check_invariants();
}

#[test]
fn test_tree_drops_entries() {
    let drops = Rc::new(Cell::new(0));
    let seg = segment(4);
    let alloc = SimpleNodeAlloc::<(u32, Counted)>::new(seg.clone());
    let mut tree = TreeMap::new(&alloc);
    for k in 0..20 {
        tree.insert(k % 5, Counted(drops.clone())).unwrap();
    }
    drop(tree.remove(&3));
    assert_eq!(drops.get(), 1);
    assert!(tree.insert_unique(4, Counted(drops.clone())).unwrap().is_some());
    assert_eq!(drops.get(), 2);
    tree.clear();
    assert_eq!(drops.get(), 21);
    for k in 0..3 {
        tree.insert(k, Counted(drops.clone())).unwrap();
    }
    drop(tree);
    assert_eq!(drops.get(), 24);
    assert_all_free(&seg);
}

#[test]
fn test_tree_append() {
    let seg = segment(8);
    let alloc = SimpleNodeAlloc::<(u32, u32)>::new(seg.clone());
    let mut evens = TreeMap::new(&alloc);
    let mut odds = TreeMap::new(&alloc);
    for k in 0..50 {
        if k % 2 == 0 {
            evens.insert(k, k).unwrap();
        } else {
            odds.insert(k, k).unwrap();
        }
    }
    evens.append(&mut odds).unwrap();
    assert!(odds.is_empty());
    assert_eq!(evens.len(), 50);
    assert!(evens.keys().copied().eq(0..50));
    evens.check_invariants();
    odds.check_invariants();
}

// TreeSet

#[test]
fn test_set_ops() {
    let seg = segment(8);
    let simple = SimpleNodeAlloc::<u64>::new(seg.clone());
    let pool = PoolNodeAlloc::<u64>::new(seg.clone(), 32);
    let mut a = TreeSet::new(&simple);
    let mut b = TreeSet::new(&pool);
    for k in 1..=6u64 {
        assert!(a.insert(k).unwrap());
    }
    assert!(!a.insert(3).unwrap());
    assert_eq!(a.len(), 6);
    for k in 4..=8u64 {
        b.insert(k).unwrap();
    }

    assert!(a.intersection(&b).copied().eq(4..=6));
    assert!(a.union(&b).copied().eq(1..=8));
    assert!(a.difference(&b).copied().eq(1..=3));
    assert!(b.difference(&a).copied().eq(7..=8));
    assert!(!a.is_subset(&b));
    assert!(!a.is_disjoint(&b));

    let mut c = TreeSet::new(&simple);
    for k in [4u64, 6] {
        c.insert(k).unwrap();
    }
    assert!(c.is_subset(&a));
    assert!(c.is_subset(&b));
    assert!(a.is_superset(&c));

    assert!(a.remove(&4));
    assert!(!a.remove(&4));
    assert_eq!(a.take(&5), Some(5));
    assert!(!c.is_subset(&a));
    assert_eq!(a.first(), Some(&1));
    assert_eq!(a.last(), Some(&6));
    assert!(a.iter().rev().copied().eq(vec![6, 3, 2, 1]));

    a.clear();
    assert!(a.is_empty());
    assert!(a.is_subset(&b));
    assert!(a.is_disjoint(&b));
    assert_eq!(a.union(&b).count(), 5);
}

#[test]
fn test_set_ops_against_btreeset() {
    let seg = segment(32);
    let alloc = SimpleNodeAlloc::<u64>::new(seg.clone());
    let mut rng = rand::thread_rng();
    for _ in 0..10 {
        let mut a = TreeSet::new(&alloc);
        let mut b = TreeSet::new(&alloc);
        let mut ma = BTreeSet::new();
        let mut mb = BTreeSet::new();
        for _ in 0..100 {
            let k = rng.gen_range(0..150u64);
            assert_eq!(a.insert(k).unwrap(), ma.insert(k));
            let k = rng.gen_range(0..150u64);
            assert_eq!(b.insert(k).unwrap(), mb.insert(k));
        }
        assert!(a.iter().eq(ma.iter()));
        assert!(a.intersection(&b).eq(ma.intersection(&mb)));
        assert!(a.union(&b).eq(ma.union(&mb)));
        assert!(a.difference(&b).eq(ma.difference(&mb)));
        assert_eq!(a.is_subset(&b), ma.is_subset(&mb));
        assert_eq!(a.is_disjoint(&b), ma.is_disjoint(&mb));
    }
    assert_all_free(&seg);
}

// HashMap

#[test]
fn test_fnv_vectors() {
    let mut h = FnvHasher::default();
    assert_eq!(h.finish(), 0xcbf2_9ce4_8422_2325);
    h.write(b"a");
    assert_eq!(h.finish(), 0xaf63_dc4c_8601_ec8c);
    let mut h = FnvHasher::default();
    h.write(b"foobar");
    assert_eq!(h.finish(), 0x8594_4171_f739_67e8);
}

#[test]
fn test_hash_against_std() {
    let seg = segment(64);
    let alloc = SimpleNodeAlloc::<(u32, u64)>::new(seg.clone());
    let mut map = HashMap::new(seg.clone(), &alloc);
    let mut model = StdHashMap::new();
    let mut rng = rand::thread_rng();
    for _ in 0..5000 {
        let k = rng.gen_range(0..400u32);
        if rng.gen_range(0..3) < 2 {
            let v = rng.gen::<u64>();
            assert_eq!(map.insert(k, v).unwrap(), model.insert(k, v));
        } else {
            assert_eq!(map.remove(&k), model.remove(&k));
        }
        assert_eq!(map.len(), model.len());
    }
    for k in 0..400 {
        assert_eq!(map.get(&k), model.get(&k));
        assert_eq!(map.contains_key(&k), model.contains_key(&k));
    }
    assert_eq!(map.iter().len(), map.len());
    let mut entries: Vec<(u32, u64)> = map.iter().map(|(&k, &v)| (k, v)).collect();
    entries.sort();
    let mut expected: Vec<(u32, u64)> = model.into_iter().collect();
    expected.sort();
    assert_eq!(entries, expected);
    drop(map);
    assert_all_free(&seg);
}

#[test]
fn test_hash_growth() {
    let seg = segment(16);
    let alloc = SimpleNodeAlloc::<(u64, u64)>::new(seg.clone());
    let mut map = HashMap::new(seg.clone(), &alloc);
    assert_eq!(map.bucket_count(), 0);
    assert_eq!(map.get(&0), None);
    assert_eq!(map.remove(&0), None);
    map.insert(0, 0).unwrap();
    assert_eq!(map.bucket_count(), INITIAL_BUCKETS);
    for k in 1..100 {
        map.insert(k, k * k).unwrap();
        assert!(map.len() * 4 <= map.bucket_count() * 3);
    }
    assert_eq!(map.bucket_count(), 256);
    for k in 0..100 {
        assert_eq!(map.get(&k), Some(&(k * k)));
    }
    *map.get_mut(&7).unwrap() += 1;
    assert_eq!(map.get(&7), Some(&50));
    let mut keys: Vec<u64> = map.keys().copied().collect();
    keys.sort_unstable();
    assert!(keys.into_iter().eq(0..100));
    assert_eq!(map.values().count(), 100);

    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.bucket_count(), 256);
    assert_eq!(map.iter().next(), None);
    drop(map);
    assert_all_free(&seg);
}

#[test]
fn test_hash_drops_entries() {
    let drops = Rc::new(Cell::new(0));
    let seg = segment(4);
    let alloc = SimpleNodeAlloc::<(u32, Counted)>::new(seg.clone());
    let mut map = HashMap::new(seg.clone(), &alloc);
    map.insert(1, Counted(drops.clone())).unwrap();
    assert!(map.insert(1, Counted(drops.clone())).unwrap().is_some());
    assert_eq!(drops.get(), 1);
    map.insert(2, Counted(drops.clone())).unwrap();
    drop(map.remove(&2));
    assert_eq!(drops.get(), 2);
    for k in 3..6 {
        map.insert(k, Counted(drops.clone())).unwrap();
    }
    map.clear();
    assert_eq!(drops.get(), 6);
    map.insert(6, Counted(drops.clone())).unwrap();
    drop(map);
    assert_eq!(drops.get(), 7);
    assert_all_free(&seg);
}

#[test]
fn test_hash_pool_exhausted() {
    let seg = segment(16);
    let pool = PoolNodeAlloc::<(u64, u64)>::new(seg.clone(), 128);
    let mut map = HashMap::new(seg.clone(), &pool);
    for k in 0..128 {
        map.insert(k, k).unwrap();
    }
    assert_eq!(map.insert(500, 0), Err(Exhausted));
    assert_eq!(map.len(), 128);
    // replacing a value needs no node
    assert_eq!(map.insert(5, 55), Ok(Some(5)));
    assert_eq!(map.remove(&0), Some(0));
    map.insert(500, 1).unwrap();
    assert_eq!(map.get(&500), Some(&1));
    for k in 1..128 {
        assert_eq!(map.get(&k), Some(if k == 5 { &55 } else { &k }));
    }
}

// RingQueue

#[test]
fn test_ring_wraparound() {
    let seg = segment(1);
    let mut q = RingQueue::new(seg.clone(), 4).unwrap();
    assert_eq!(q.capacity(), 4);
    assert!(q.is_empty());
    for i in 1..=4 {
        q.enqueue(i).unwrap();
    }
    assert!(q.is_full());
    assert_eq!(q.enqueue(5), Err(5));
    assert_eq!(q.dequeue(), Some(1));
    assert_eq!(q.dequeue(), Some(2));
    q.enqueue(5).unwrap();
    q.enqueue(6).unwrap();
    assert!(q.is_full());
    assert!(q.iter().copied().eq(3..=6));
    assert_eq!(q.peek(), Some(&3));
    assert_eq!(q.get(3), Some(&6));
    assert_eq!(q.get(4), None);
    *q.peek_mut().unwrap() = 30;
    assert_eq!(q.iter().len(), 4);
    for want in [30, 4, 5, 6] {
        assert_eq!(q.dequeue(), Some(want));
    }
    assert_eq!(q.dequeue(), None);
    assert_eq!(q.peek(), None);
    drop(q);
    assert_all_free(&seg);
}

#[test]
fn test_ring_against_vecdeque() {
    let seg = segment(1);
    let mut q = RingQueue::new(seg, 7).unwrap();
    let mut model = VecDeque::new();
    let mut rng = rand::thread_rng();
    for _ in 0..2000 {
        if rng.gen() {
            let v: u32 = rng.gen();
            if model.len() < 7 {
                q.enqueue(v).unwrap();
                model.push_back(v);
            } else {
                assert_eq!(q.enqueue(v), Err(v));
            }
        } else {
            assert_eq!(q.dequeue(), model.pop_front());
        }
        assert_eq!(q.len(), model.len());
        assert_eq!(q.is_full(), model.len() == 7);
    }
    assert!(q.iter().eq(model.iter()));
}

#[test]
fn test_ring_zero_capacity() {
    let mut q = RingQueue::<u64>::new(segment(1), 0).unwrap();
    assert!(q.is_full());
    assert!(q.is_empty());
    assert_eq!(q.enqueue(1), Err(1));
    assert_eq!(q.dequeue(), None);
}

#[test]
fn test_ring_drops_remaining() {
    let drops = Rc::new(Cell::new(0));
    let mut q = RingQueue::new(segment(1), 3).unwrap();
    for _ in 0..3 {
        q.enqueue(Counted(drops.clone())).unwrap();
    }
    let rejected = q.enqueue(Counted(drops.clone()));
    assert!(rejected.is_err());
    drop(rejected);
    assert_eq!(drops.get(), 1);
    drop(q.dequeue());
    q.enqueue(Counted(drops.clone())).unwrap();
    assert_eq!(drops.get(), 2);
    drop(q);
    assert_eq!(drops.get(), 5);
}
