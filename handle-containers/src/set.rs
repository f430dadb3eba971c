// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! An ordered set, and sorted-merge set operations.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::iter::Peekable;

use object_alloc::{Exhausted, NodeAlloc};

use crate::tree::{self, TreeMap};

type SetAlloc<K, A> = <A as NodeAlloc<K>>::Rebind<(K, ())>;

/// An ordered set of unique keys, stored as a `TreeMap` with unit values.
pub struct TreeSet<K, A: NodeAlloc<K>> {
    map: TreeMap<K, (), SetAlloc<K, A>>,
}

impl<K, A: NodeAlloc<K>> TreeSet<K, A> {
    pub fn new(alloc: &A) -> TreeSet<K, A> {
        TreeSet {
            map: TreeMap::new(&alloc.rebind::<(K, ())>()),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn iter(&self) -> Iter<K, A> {
        Iter(self.map.iter())
    }

    pub fn first(&self) -> Option<&K> {
        self.map.first().map(|(k, _)| k)
    }

    pub fn last(&self) -> Option<&K> {
        self.map.last().map(|(k, _)| k)
    }

    pub fn pop_first(&mut self) -> Option<K> {
        self.map.pop_first().map(|(k, _)| k)
    }

    pub fn pop_last(&mut self) -> Option<K> {
        self.map.pop_last().map(|(k, _)| k)
    }
}

impl<K: Ord, A: NodeAlloc<K>> TreeSet<K, A> {
    /// Adds `key`. Returns `false` if an equal key was already present, in which case the set is
    /// unchanged and `key` is dropped.
    pub fn insert(&mut self, key: K) -> Result<bool, Exhausted> {
        if self.map.contains_key(&key) {
            return Ok(false);
        }
        self.map.insert(key, ())?;
        Ok(true)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.map.remove(key).is_some()
    }

    pub fn take(&mut self, key: &K) -> Option<K> {
        self.map.remove_entry(key).map(|(k, _)| k)
    }

    /// The keys in both `self` and `other`, in order.
    pub fn intersection<'a, B: NodeAlloc<K>>(&'a self, other: &'a TreeSet<K, B>) -> Intersection<'a, K, A, B> {
        Intersection {
            a: self.iter().peekable(),
            b: other.iter().peekable(),
        }
    }

    /// The keys in `self` or `other`, in order, each yielded once.
    pub fn union<'a, B: NodeAlloc<K>>(&'a self, other: &'a TreeSet<K, B>) -> Union<'a, K, A, B> {
        Union {
            a: self.iter().peekable(),
            b: other.iter().peekable(),
        }
    }

    /// The keys in `self` but not in `other`, in order.
    pub fn difference<'a, B: NodeAlloc<K>>(&'a self, other: &'a TreeSet<K, B>) -> Difference<'a, K, A, B> {
        Difference {
            a: self.iter().peekable(),
            b: other.iter().peekable(),
        }
    }

    pub fn is_subset<B: NodeAlloc<K>>(&self, other: &TreeSet<K, B>) -> bool {
        self.len() <= other.len() && self.difference(other).next().is_none()
    }

    pub fn is_superset<B: NodeAlloc<K>>(&self, other: &TreeSet<K, B>) -> bool {
        other.is_subset(self)
    }

    pub fn is_disjoint<B: NodeAlloc<K>>(&self, other: &TreeSet<K, B>) -> bool {
        self.intersection(other).next().is_none()
    }
}

impl<K: Debug, A: NodeAlloc<K>> Debug for TreeSet<K, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, K, A: NodeAlloc<K>>(tree::Iter<'a, K, (), SetAlloc<K, A>>);

impl<'a, K, A: NodeAlloc<K>> Iterator for Iter<'a, K, A> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K, A: NodeAlloc<K>> DoubleEndedIterator for Iter<'a, K, A> {
    fn next_back(&mut self) -> Option<&'a K> {
        self.0.next_back().map(|(k, _)| k)
    }
}

impl<'a, K, A: NodeAlloc<K>> ExactSizeIterator for Iter<'a, K, A> {}

impl<'a, K, A: NodeAlloc<K>> IntoIterator for &'a TreeSet<K, A> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, A>;

    fn into_iter(self) -> Iter<'a, K, A> {
        self.iter()
    }
}

pub struct Intersection<'a, K, A: NodeAlloc<K>, B: NodeAlloc<K>> {
    a: Peekable<Iter<'a, K, A>>,
    b: Peekable<Iter<'a, K, B>>,
}

impl<'a, K: Ord, A: NodeAlloc<K>, B: NodeAlloc<K>> Iterator for Intersection<'a, K, A, B> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        loop {
            let x: &'a K = *self.a.peek()?;
            let y: &'a K = *self.b.peek()?;
            match x.cmp(y) {
                Ordering::Less => {
                    self.a.next();
                }
                Ordering::Greater => {
                    self.b.next();
                }
                Ordering::Equal => {
                    self.b.next();
                    return self.a.next();
                }
            }
        }
    }
}

pub struct Union<'a, K, A: NodeAlloc<K>, B: NodeAlloc<K>> {
    a: Peekable<Iter<'a, K, A>>,
    b: Peekable<Iter<'a, K, B>>,
}

impl<'a, K: Ord, A: NodeAlloc<K>, B: NodeAlloc<K>> Iterator for Union<'a, K, A, B> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let ord = match (self.a.peek(), self.b.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(y),
        };
        match ord {
            Ordering::Less => self.a.next(),
            Ordering::Greater => self.b.next(),
            Ordering::Equal => {
                self.b.next();
                self.a.next()
            }
        }
    }
}

pub struct Difference<'a, K, A: NodeAlloc<K>, B: NodeAlloc<K>> {
    a: Peekable<Iter<'a, K, A>>,
    b: Peekable<Iter<'a, K, B>>,
}

impl<'a, K: Ord, A: NodeAlloc<K>, B: NodeAlloc<K>> Iterator for Difference<'a, K, A, B> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        loop {
            let x: &'a K = *self.a.peek()?;
            let y: &'a K = match self.b.peek() {
                Some(y) => *y,
                None => return self.a.next(),
            };
            match x.cmp(y) {
                Ordering::Less => return self.a.next(),
                Ordering::Equal => {
                    self.a.next();
                    self.b.next();
                }
                Ordering::Greater => {
                    self.b.next();
                }
            }
        }
    }
}
