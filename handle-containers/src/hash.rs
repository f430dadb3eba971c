// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A separately-chained hash map.
//!
//! Entries live in nodes from a single node allocator. Each bucket of the table is the head link
//! of a singly-linked chain of nodes, and the table itself is an `Array` of links in a dynamic
//! segment. Every node caches its key's hash, so growing the table only relinks existing nodes
//! into a new head array: growth allocates one array and never allocates or moves a node.

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::mem;
use std::ptr;

use object_alloc::{Exhausted, NodeAlloc, NodePointer, Parser};
use segment_alloc::SharedDynamicSegment;

use crate::array::Array;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// The 64-bit FNV-1a hash.
#[derive(Copy, Clone, Debug)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> FnvHasher {
        FnvHasher(FNV_OFFSET_BASIS)
    }
}

impl Hasher for FnvHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

fn hash_of<K: Hash>(key: &K) -> u64 {
    let mut hasher = FnvHasher::default();
    key.hash(&mut hasher);
    hasher.finish()
}

/// The number of buckets allocated on first insertion.
pub const INITIAL_BUCKETS: usize = 8;

pub struct HashNode<K, V, P: Parser> {
    entry: (K, V),
    hash: u64,
    next: NodePointer<P, HashNode<K, V, P>>,
}

type LinkOf<K, V, A> =
    NodePointer<<A as NodeAlloc<(K, V)>>::Parser, HashNode<K, V, <A as NodeAlloc<(K, V)>>::Parser>>;

/// A hash map with unique keys.
///
/// The table starts with no buckets and allocates `INITIAL_BUCKETS` on the first insertion. It
/// doubles whenever an insertion would push the load factor above 3/4. If the larger table cannot
/// be allocated, the insertion proceeds with the current table.
pub struct HashMap<K, V, A: NodeAlloc<(K, V)>> {
    alloc: A::Rebind<HashNode<K, V, A::Parser>>,
    buckets: Array<LinkOf<K, V, A>>,
    len: usize,
}

impl<K, V, A: NodeAlloc<(K, V)>> HashMap<K, V, A> {
    /// Creates an empty map whose bucket table lives in `segment` and whose nodes come from
    /// `alloc`'s policy.
    pub fn new(segment: SharedDynamicSegment, alloc: &A) -> HashMap<K, V, A> {
        HashMap {
            alloc: alloc.rebind::<HashNode<K, V, A::Parser>>(),
            buckets: Array::new(segment),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    // Moves every node into a fresh table of `count` buckets. On failure nothing changes.
    fn rehash(&mut self, count: usize) -> Result<(), Exhausted> {
        let mut table = Array::with_capacity(self.buckets.segment().clone(), count)?;
        for _ in 0..count {
            table.push(NodePointer::null())?;
        }
        for i in 0..self.buckets.len() {
            let mut cur = self.buckets[i];
            while !cur.is_null() {
                let node = unsafe { cur.as_mut() };
                let next = node.next;
                let idx = (node.hash % count as u64) as usize;
                node.next = table[idx];
                table[idx] = cur;
                cur = next;
            }
        }
        trace!("hash map: rehash {} -> {} buckets", self.buckets.len(), count);
        self.buckets = table;
        Ok(())
    }

    // Makes sure a table exists, and grows it if one more entry would overload it.
    fn reserve_one(&mut self) -> Result<(), Exhausted> {
        let buckets = self.buckets.len();
        if buckets == 0 {
            return self.rehash(INITIAL_BUCKETS);
        }
        if (self.len + 1) * 4 > buckets * 3 {
            if let Err(Exhausted) = self.rehash(buckets * 2) {
                debug!("hash map: cannot grow past {} buckets", buckets);
            }
        }
        Ok(())
    }

    /// Drops every entry. The bucket table is kept.
    pub fn clear(&mut self) {
        for i in 0..self.buckets.len() {
            let mut cur = self.buckets[i];
            self.buckets[i] = NodePointer::null();
            while !cur.is_null() {
                let next = unsafe { (*cur.as_ptr()).next };
                unsafe { self.alloc.delete(cur.handle()) };
                cur = next;
            }
        }
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<K, V, A> {
        Iter {
            buckets: self.buckets.as_slice(),
            cur: NodePointer::null(),
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }
}

impl<K: Hash + Eq, V, A: NodeAlloc<(K, V)>> HashMap<K, V, A> {
    fn find(&self, hash: u64, key: &K) -> Option<LinkOf<K, V, A>> {
        if self.buckets.is_empty() {
            return None;
        }
        let mut cur = self.buckets[self.bucket_of(hash)];
        while !cur.is_null() {
            let node = unsafe { cur.as_ref() };
            if node.hash == hash && node.entry.0 == *key {
                return Some(cur);
            }
            cur = node.next;
        }
        None
    }

    /// Inserts an entry. If the key was present, its value is replaced and the old value returned.
    pub fn insert(&mut self, key: K, value: V) -> Result<Option<V>, Exhausted> {
        let hash = hash_of(&key);
        if let Some(found) = self.find(hash, &key) {
            let old = unsafe { &mut found.as_mut().entry.1 };
            return Ok(Some(mem::replace(old, value)));
        }
        self.reserve_one()?;
        let idx = self.bucket_of(hash);
        let handle = self.alloc.allocate_with(HashNode {
            entry: (key, value),
            hash,
            next: self.buckets[idx],
        })?;
        self.buckets[idx] = NodePointer::from_handle(handle);
        self.len += 1;
        Ok(None)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(hash_of(key), key)
            .map(|n| unsafe { &n.as_ref().entry.1 })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(hash_of(key), key)
            .map(|n| unsafe { &mut n.as_mut().entry.1 })
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(hash_of(key), key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = hash_of(key);
        let idx = self.bucket_of(hash);
        let mut prev: LinkOf<K, V, A> = NodePointer::null();
        let mut cur = self.buckets[idx];
        while !cur.is_null() {
            let node = unsafe { cur.as_ref() };
            let next = node.next;
            if node.hash == hash && node.entry.0 == *key {
                if prev.is_null() {
                    self.buckets[idx] = next;
                } else {
                    unsafe { prev.as_mut().next = next };
                }
                let removed = unsafe {
                    let HashNode { entry, .. } = ptr::read(cur.as_ptr());
                    self.alloc.deallocate(cur.handle());
                    entry
                };
                self.len -= 1;
                return Some(removed);
            }
            prev = cur;
            cur = next;
        }
        None
    }
}

impl<K, V, A: NodeAlloc<(K, V)>> Drop for HashMap<K, V, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Debug, V: Debug, A: NodeAlloc<(K, V)>> Debug for HashMap<K, V, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Iterates over a `HashMap`'s entries in bucket order.
pub struct Iter<'a, K, V, A: NodeAlloc<(K, V)>> {
    buckets: &'a [LinkOf<K, V, A>],
    cur: LinkOf<K, V, A>,
    remaining: usize,
    _marker: PhantomData<&'a (K, V)>,
}

impl<'a, K, V, A: NodeAlloc<(K, V)>> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        while self.cur.is_null() {
            let (&head, rest) = self.buckets.split_first()?;
            self.cur = head;
            self.buckets = rest;
        }
        let node: &'a HashNode<K, V, A::Parser> = unsafe { self.cur.as_ref() };
        self.cur = node.next;
        self.remaining -= 1;
        Some((&node.entry.0, &node.entry.1))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, A: NodeAlloc<(K, V)>> ExactSizeIterator for Iter<'a, K, V, A> {}

impl<'a, K, V, A: NodeAlloc<(K, V)>> IntoIterator for &'a HashMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, A>;

    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}
