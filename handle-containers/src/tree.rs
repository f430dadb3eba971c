// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! An ordered multi-map backed by a red-black tree.
//!
//! # Design
//!
//! The tree follows the classic sentinel formulation: every leaf link and the root's parent link
//! point at a single black `nil` node owned by the tree, rather than at a null handle. This lets
//! the fix-up passes read the color and parent of a missing child without special cases. The
//! sentinel's entry is never initialized.
//!
//! The sentinel is allocated on the first insertion, so an empty tree owns no memory. Until then
//! both `root` and `nil` are null handles, and every search terminates immediately because
//! `root == nil`.
//!
//! Keys may repeat. A new key is placed after every equal key already in the tree, so equal keys
//! iterate in insertion order, and lookups find the earliest of them.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::mem::{self, MaybeUninit};
use std::ptr;

use object_alloc::{Exhausted, NodeAlloc, NodePointer, Parser};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

pub struct TreeNode<K, V, P: Parser> {
    entry: MaybeUninit<(K, V)>,
    color: Color,
    parent: Link<K, V, P>,
    left: Link<K, V, P>,
    right: Link<K, V, P>,
}

type Link<K, V, P> = NodePointer<P, TreeNode<K, V, P>>;
type LinkOf<K, V, A> = Link<K, V, <A as NodeAlloc<(K, V)>>::Parser>;

// Field accessors. All of them require `x` to be a live node of the tree (or its sentinel).

#[inline]
unsafe fn left<K, V, P: Parser>(x: Link<K, V, P>) -> Link<K, V, P> {
    (*x.as_ptr()).left
}

#[inline]
unsafe fn right<K, V, P: Parser>(x: Link<K, V, P>) -> Link<K, V, P> {
    (*x.as_ptr()).right
}

#[inline]
unsafe fn parent<K, V, P: Parser>(x: Link<K, V, P>) -> Link<K, V, P> {
    (*x.as_ptr()).parent
}

#[inline]
unsafe fn color<K, V, P: Parser>(x: Link<K, V, P>) -> Color {
    (*x.as_ptr()).color
}

#[inline]
unsafe fn set_left<K, V, P: Parser>(x: Link<K, V, P>, y: Link<K, V, P>) {
    (*x.as_ptr()).left = y;
}

#[inline]
unsafe fn set_right<K, V, P: Parser>(x: Link<K, V, P>, y: Link<K, V, P>) {
    (*x.as_ptr()).right = y;
}

#[inline]
unsafe fn set_parent<K, V, P: Parser>(x: Link<K, V, P>, y: Link<K, V, P>) {
    (*x.as_ptr()).parent = y;
}

#[inline]
unsafe fn set_color<K, V, P: Parser>(x: Link<K, V, P>, c: Color) {
    (*x.as_ptr()).color = c;
}

// Entry accessors; `x` must not be the sentinel.

#[inline]
unsafe fn entry<'a, K, V, P: Parser>(x: Link<K, V, P>) -> (&'a K, &'a V) {
    let (k, v) = (*x.as_ptr()).entry.assume_init_ref();
    (k, v)
}

#[inline]
unsafe fn key<'a, K, V: 'a, P: Parser>(x: Link<K, V, P>) -> &'a K {
    &(*x.as_ptr()).entry.assume_init_ref().0
}

#[inline]
unsafe fn value_mut<'a, K: 'a, V, P: Parser>(x: Link<K, V, P>) -> &'a mut V {
    &mut (*x.as_ptr()).entry.assume_init_mut().1
}

/// An ordered map that allows duplicate keys.
///
/// Nodes are allocated from `A::Rebind<TreeNode<K, V, _>>`, built from the allocator passed to
/// `new`.
pub struct TreeMap<K, V, A: NodeAlloc<(K, V)>> {
    alloc: A::Rebind<TreeNode<K, V, A::Parser>>,
    root: LinkOf<K, V, A>,
    nil: LinkOf<K, V, A>,
    len: usize,
}

impl<K, V, A: NodeAlloc<(K, V)>> TreeMap<K, V, A> {
    pub fn new(alloc: &A) -> TreeMap<K, V, A> {
        TreeMap {
            alloc: alloc.rebind::<TreeNode<K, V, A::Parser>>(),
            root: NodePointer::null(),
            nil: NodePointer::null(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn ensure_nil(&mut self) -> Result<(), Exhausted> {
        if self.nil.is_null() {
            let handle = self.alloc.allocate_with(TreeNode {
                entry: MaybeUninit::uninit(),
                color: Color::Black,
                parent: NodePointer::null(),
                left: NodePointer::null(),
                right: NodePointer::null(),
            })?;
            self.nil = NodePointer::from_handle(handle);
            self.root = self.nil;
            trace!("tree: sentinel allocated");
        }
        Ok(())
    }

    // Allocates an unlinked red node. The sentinel must exist.
    fn new_node(&mut self, key: K, value: V) -> Result<LinkOf<K, V, A>, Exhausted> {
        let nil = self.nil;
        let handle = self.alloc.allocate_with(TreeNode {
            entry: MaybeUninit::new((key, value)),
            color: Color::Red,
            parent: nil,
            left: nil,
            right: nil,
        })?;
        Ok(NodePointer::from_handle(handle))
    }

    unsafe fn min(&self, mut x: LinkOf<K, V, A>) -> LinkOf<K, V, A> {
        while left(x) != self.nil {
            x = left(x);
        }
        x
    }

    unsafe fn max(&self, mut x: LinkOf<K, V, A>) -> LinkOf<K, V, A> {
        while right(x) != self.nil {
            x = right(x);
        }
        x
    }

    unsafe fn successor(&self, mut x: LinkOf<K, V, A>) -> LinkOf<K, V, A> {
        if right(x) != self.nil {
            return self.min(right(x));
        }
        let mut y = parent(x);
        while y != self.nil && x == right(y) {
            x = y;
            y = parent(y);
        }
        y
    }

    unsafe fn predecessor(&self, mut x: LinkOf<K, V, A>) -> LinkOf<K, V, A> {
        if left(x) != self.nil {
            return self.max(left(x));
        }
        let mut y = parent(x);
        while y != self.nil && x == left(y) {
            x = y;
            y = parent(y);
        }
        y
    }

    unsafe fn rotate_left(&mut self, x: LinkOf<K, V, A>) {
        let y = right(x);
        set_right(x, left(y));
        if left(y) != self.nil {
            set_parent(left(y), x);
        }
        set_parent(y, parent(x));
        if parent(x) == self.nil {
            self.root = y;
        } else if x == left(parent(x)) {
            set_left(parent(x), y);
        } else {
            set_right(parent(x), y);
        }
        set_left(y, x);
        set_parent(x, y);
    }

    unsafe fn rotate_right(&mut self, y: LinkOf<K, V, A>) {
        let x = left(y);
        set_left(y, right(x));
        if right(x) != self.nil {
            set_parent(right(x), y);
        }
        set_parent(x, parent(y));
        if parent(y) == self.nil {
            self.root = x;
        } else if y == right(parent(y)) {
            set_right(parent(y), x);
        } else {
            set_left(parent(y), x);
        }
        set_right(x, y);
        set_parent(y, x);
    }

    unsafe fn insert_fix(&mut self, mut z: LinkOf<K, V, A>) {
        while color(parent(z)) == Color::Red {
            let p = parent(z);
            let g = parent(p);
            if p == left(g) {
                let uncle = right(g);
                if color(uncle) == Color::Red {
                    set_color(p, Color::Black);
                    set_color(uncle, Color::Black);
                    set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == right(p) {
                        z = p;
                        self.rotate_left(z);
                    }
                    set_color(parent(z), Color::Black);
                    set_color(parent(parent(z)), Color::Red);
                    self.rotate_right(parent(parent(z)));
                }
            } else {
                let uncle = left(g);
                if color(uncle) == Color::Red {
                    set_color(p, Color::Black);
                    set_color(uncle, Color::Black);
                    set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == left(p) {
                        z = p;
                        self.rotate_right(z);
                    }
                    set_color(parent(z), Color::Black);
                    set_color(parent(parent(z)), Color::Red);
                    self.rotate_left(parent(parent(z)));
                }
            }
        }
        set_color(self.root, Color::Black);
    }

    unsafe fn remove_fix(&mut self, mut x: LinkOf<K, V, A>) {
        while x != self.root && color(x) == Color::Black {
            if x == left(parent(x)) {
                let mut w = right(parent(x));
                if color(w) == Color::Red {
                    set_color(w, Color::Black);
                    set_color(parent(x), Color::Red);
                    self.rotate_left(parent(x));
                    w = right(parent(x));
                }
                if color(left(w)) == Color::Black && color(right(w)) == Color::Black {
                    set_color(w, Color::Red);
                    x = parent(x);
                } else {
                    if color(right(w)) == Color::Black {
                        set_color(left(w), Color::Black);
                        set_color(w, Color::Red);
                        self.rotate_right(w);
                        w = right(parent(x));
                    }
                    set_color(w, color(parent(x)));
                    set_color(parent(x), Color::Black);
                    set_color(right(w), Color::Black);
                    self.rotate_left(parent(x));
                    x = self.root;
                }
            } else {
                let mut w = left(parent(x));
                if color(w) == Color::Red {
                    set_color(w, Color::Black);
                    set_color(parent(x), Color::Red);
                    self.rotate_right(parent(x));
                    w = left(parent(x));
                }
                if color(right(w)) == Color::Black && color(left(w)) == Color::Black {
                    set_color(w, Color::Red);
                    x = parent(x);
                } else {
                    if color(left(w)) == Color::Black {
                        set_color(right(w), Color::Black);
                        set_color(w, Color::Red);
                        self.rotate_left(w);
                        w = left(parent(x));
                    }
                    set_color(w, color(parent(x)));
                    set_color(parent(x), Color::Black);
                    set_color(left(w), Color::Black);
                    self.rotate_right(parent(x));
                    x = self.root;
                }
            }
        }
        set_color(x, Color::Black);
    }

    /// Unlinks `z`, frees a node, and returns `z`'s entry.
    ///
    /// When `z` has two children, its in-order successor `y` is spliced out instead and `y`'s
    /// entry moves into `z`'s node.
    unsafe fn remove_node(&mut self, z: LinkOf<K, V, A>) -> (K, V) {
        let nil = self.nil;
        let y = if left(z) == nil || right(z) == nil {
            z
        } else {
            self.successor(z)
        };
        let x = if left(y) != nil { left(y) } else { right(y) };

        // x may be the sentinel; its parent link is what remove_fix climbs from.
        set_parent(x, parent(y));
        if parent(y) == nil {
            self.root = x;
        } else if y == left(parent(y)) {
            set_left(parent(y), x);
        } else {
            set_right(parent(y), x);
        }

        let removed = ptr::read((*z.as_ptr()).entry.as_ptr());
        if y != z {
            ptr::copy_nonoverlapping(
                (*y.as_ptr()).entry.as_ptr(),
                (*z.as_ptr()).entry.as_mut_ptr(),
                1,
            );
        }
        if color(y) == Color::Black {
            self.remove_fix(x);
        }
        self.alloc.deallocate(y.handle());
        self.len -= 1;
        removed
    }

    pub fn first(&self) -> Option<(&K, &V)> {
        if self.root == self.nil {
            None
        } else {
            Some(unsafe { entry(self.min(self.root)) })
        }
    }

    pub fn last(&self) -> Option<(&K, &V)> {
        if self.root == self.nil {
            None
        } else {
            Some(unsafe { entry(self.max(self.root)) })
        }
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        if self.root == self.nil {
            None
        } else {
            unsafe {
                let x = self.min(self.root);
                Some(self.remove_node(x))
            }
        }
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        if self.root == self.nil {
            None
        } else {
            unsafe {
                let x = self.max(self.root);
                Some(self.remove_node(x))
            }
        }
    }

    /// Drops every entry and frees every node except the sentinel.
    pub fn clear(&mut self) {
        let nil = self.nil;
        let mut x = self.root;
        // Free leaves bottom-up, following parent links back toward the root.
        unsafe {
            while x != nil {
                if left(x) != nil {
                    x = left(x);
                } else if right(x) != nil {
                    x = right(x);
                } else {
                    let p = parent(x);
                    if p != nil {
                        if left(p) == x {
                            set_left(p, nil);
                        } else {
                            set_right(p, nil);
                        }
                    }
                    ptr::drop_in_place((*x.as_ptr()).entry.as_mut_ptr());
                    self.alloc.deallocate(x.handle());
                    x = p;
                }
            }
        }
        self.root = nil;
        self.len = 0;
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> Iter<K, V, A> {
        let (front, back) = if self.root == self.nil {
            (self.nil, self.nil)
        } else {
            unsafe { (self.min(self.root), self.max(self.root)) }
        };
        Iter {
            map: self,
            front,
            back,
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self)
    where
        K: Ord,
    {
        if self.root == self.nil {
            assert_eq!(self.len, 0);
            return;
        }
        unsafe {
            assert_eq!(color(self.root), Color::Black, "red root");
            assert!(parent(self.root) == self.nil);
            assert_eq!(color(self.nil), Color::Black, "red sentinel");
            let mut count = 0;
            self.check_subtree(self.root, &mut count);
            assert_eq!(count, self.len);
        }
    }

    // Returns the black height of the subtree at `x`.
    #[cfg(test)]
    unsafe fn check_subtree(&self, x: LinkOf<K, V, A>, count: &mut usize) -> usize
    where
        K: Ord,
    {
        if x == self.nil {
            return 1;
        }
        *count += 1;
        let (l, r) = (left(x), right(x));
        if color(x) == Color::Red {
            assert_eq!(color(l), Color::Black, "red node with red left child");
            assert_eq!(color(r), Color::Black, "red node with red right child");
        }
        if l != self.nil {
            assert!(parent(l) == x);
            assert!(key(l) <= key(x));
        }
        if r != self.nil {
            assert!(parent(r) == x);
            assert!(key(x) <= key(r));
        }
        let lh = self.check_subtree(l, count);
        let rh = self.check_subtree(r, count);
        assert_eq!(lh, rh, "unequal black heights");
        lh + (color(x) == Color::Black) as usize
    }
}

impl<K: Ord, V, A: NodeAlloc<(K, V)>> TreeMap<K, V, A> {
    // The earliest node with key `k`, or the sentinel.
    fn find_first(&self, k: &K) -> LinkOf<K, V, A> {
        let mut x = self.root;
        let mut found = self.nil;
        unsafe {
            while x != self.nil {
                match k.cmp(key(x)) {
                    Ordering::Less => x = left(x),
                    Ordering::Greater => x = right(x),
                    Ordering::Equal => {
                        found = x;
                        x = left(x);
                    }
                }
            }
        }
        found
    }

    // Links the unlinked node `z` below the last node not greater than its key, then rebalances.
    unsafe fn attach(&mut self, z: LinkOf<K, V, A>) {
        let nil = self.nil;
        let mut y = nil;
        let mut x = self.root;
        while x != nil {
            y = x;
            x = if key(z) < key(x) { left(x) } else { right(x) };
        }
        set_parent(z, y);
        if y == nil {
            self.root = z;
        } else if key(z) < key(y) {
            set_left(y, z);
        } else {
            set_right(y, z);
        }
        self.insert_fix(z);
        self.len += 1;
    }

    /// Inserts an entry, after any entries with an equal key.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Exhausted> {
        self.ensure_nil()?;
        let z = self.new_node(key, value)?;
        unsafe { self.attach(z) };
        Ok(())
    }

    /// Inserts an entry, or replaces the value of the first entry with an equal key.
    ///
    /// Returns the replaced value, if any.
    pub fn insert_unique(&mut self, key: K, value: V) -> Result<Option<V>, Exhausted> {
        let found = self.find_first(&key);
        if found != self.nil {
            return Ok(Some(mem::replace(unsafe { value_mut(found) }, value)));
        }
        self.insert(key, value)?;
        Ok(None)
    }

    /// Moves every entry of `other` into `self`.
    ///
    /// Fails if a node cannot be allocated, in which case the entries not yet moved stay in
    /// `other`.
    pub fn append<B: NodeAlloc<(K, V)>>(&mut self, other: &mut TreeMap<K, V, B>) -> Result<(), Exhausted> {
        self.ensure_nil()?;
        while !other.is_empty() {
            let handle = self.alloc.allocate()?;
            let (key, value) = match other.pop_first() {
                Some(entry) => entry,
                None => break,
            };
            let nil = self.nil;
            let z = NodePointer::from_handle(handle);
            unsafe {
                ptr::write(
                    z.as_ptr(),
                    TreeNode {
                        entry: MaybeUninit::new((key, value)),
                        color: Color::Red,
                        parent: nil,
                        left: nil,
                        right: nil,
                    },
                );
                self.attach(z);
            }
        }
        Ok(())
    }

    /// The value of the first entry with key `k`.
    pub fn get(&self, k: &K) -> Option<&V> {
        let x = self.find_first(k);
        if x == self.nil {
            None
        } else {
            Some(unsafe { entry(x).1 })
        }
    }

    pub fn get_mut(&mut self, k: &K) -> Option<&mut V> {
        let x = self.find_first(k);
        if x == self.nil {
            None
        } else {
            Some(unsafe { value_mut(x) })
        }
    }

    /// The values of every entry with key `k`, in insertion order.
    pub fn get_all<'a>(&'a self, k: &'a K) -> EqualRange<'a, K, V, A> {
        EqualRange {
            map: self,
            cur: self.find_first(k),
            key: k,
        }
    }

    pub fn contains_key(&self, k: &K) -> bool {
        self.find_first(k) != self.nil
    }

    /// The number of entries with key `k`.
    pub fn count(&self, k: &K) -> usize {
        self.get_all(k).count()
    }

    /// Removes the first entry with key `k` and returns its value.
    pub fn remove(&mut self, k: &K) -> Option<V> {
        self.remove_entry(k).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, k: &K) -> Option<(K, V)> {
        let z = self.find_first(k);
        if z == self.nil {
            None
        } else {
            Some(unsafe { self.remove_node(z) })
        }
    }

    /// Sets the value of every entry with key `k` to a clone of `value`.
    ///
    /// Returns the number of entries updated.
    pub fn replace(&mut self, k: &K, value: V) -> usize
    where
        V: Clone,
    {
        let mut x = self.find_first(k);
        let mut count = 0;
        unsafe {
            while x != self.nil && key(x) == k {
                *value_mut(x) = value.clone();
                count += 1;
                x = self.successor(x);
            }
        }
        count
    }
}

impl<K, V, A: NodeAlloc<(K, V)>> Drop for TreeMap<K, V, A> {
    fn drop(&mut self) {
        self.clear();
        if !self.nil.is_null() {
            unsafe { self.alloc.deallocate(self.nil.handle()) };
        }
    }
}

impl<K: Debug, V: Debug, A: NodeAlloc<(K, V)>> Debug for TreeMap<K, V, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An in-order iterator over a `TreeMap`.
pub struct Iter<'a, K, V, A: NodeAlloc<(K, V)>> {
    map: &'a TreeMap<K, V, A>,
    front: LinkOf<K, V, A>,
    back: LinkOf<K, V, A>,
    remaining: usize,
}

impl<'a, K, V, A: NodeAlloc<(K, V)>> Iterator for Iter<'a, K, V, A> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let x = self.front;
        self.remaining -= 1;
        unsafe {
            self.front = self.map.successor(x);
            Some(entry(x))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, A: NodeAlloc<(K, V)>> DoubleEndedIterator for Iter<'a, K, V, A> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        if self.remaining == 0 {
            return None;
        }
        let x = self.back;
        self.remaining -= 1;
        unsafe {
            self.back = self.map.predecessor(x);
            Some(entry(x))
        }
    }
}

impl<'a, K, V, A: NodeAlloc<(K, V)>> ExactSizeIterator for Iter<'a, K, V, A> {}

impl<'a, K, V, A: NodeAlloc<(K, V)>> IntoIterator for &'a TreeMap<K, V, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, A>;

    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}

/// The values of every entry with one key. See `TreeMap::get_all`.
pub struct EqualRange<'a, K, V, A: NodeAlloc<(K, V)>> {
    map: &'a TreeMap<K, V, A>,
    cur: LinkOf<K, V, A>,
    key: &'a K,
}

impl<'a, K: Ord, V, A: NodeAlloc<(K, V)>> Iterator for EqualRange<'a, K, V, A> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        unsafe {
            if self.cur == self.map.nil || key(self.cur) != self.key {
                return None;
            }
            let x = self.cur;
            self.cur = self.map.successor(x);
            Some(entry(x).1)
        }
    }
}
