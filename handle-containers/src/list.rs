// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A doubly-linked list with handle links.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

use object_alloc::{Exhausted, NodeAlloc, NodePointer, Parser};

pub struct ListNode<T, P: Parser> {
    value: T,
    prev: NodePointer<P, ListNode<T, P>>,
    next: NodePointer<P, ListNode<T, P>>,
}

/// A position in a `List`: the handle of one of its nodes.
pub type Cursor<T, A> =
    NodePointer<<A as NodeAlloc<T>>::Parser, ListNode<T, <A as NodeAlloc<T>>::Parser>>;

/// A doubly-linked list whose nodes come from a `NodeAlloc`.
///
/// The list allocates `ListNode<T, _>`s from `A::Rebind`, built from the allocator passed to
/// `new`. Operations that add an element return a `Cursor` to its node, which stays valid until
/// that element is removed.
pub struct List<T, A: NodeAlloc<T>> {
    alloc: A::Rebind<ListNode<T, A::Parser>>,
    head: Cursor<T, A>,
    tail: Cursor<T, A>,
    len: usize,
}

impl<T, A: NodeAlloc<T>> List<T, A> {
    pub fn new(alloc: &A) -> List<T, A> {
        List {
            alloc: alloc.rebind::<ListNode<T, A::Parser>>(),
            head: NodePointer::null(),
            tail: NodePointer::null(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn new_node(
        &mut self,
        value: T,
        prev: Cursor<T, A>,
        next: Cursor<T, A>,
    ) -> Result<Cursor<T, A>, Exhausted> {
        let handle = self.alloc.allocate_with(ListNode { value, prev, next })?;
        Ok(NodePointer::from_handle(handle))
    }

    // Links a fresh node between `prev` and `next`, either of which may be null.
    fn link_between(
        &mut self,
        value: T,
        prev: Cursor<T, A>,
        next: Cursor<T, A>,
    ) -> Result<Cursor<T, A>, Exhausted> {
        let node = self.new_node(value, prev, next)?;
        unsafe {
            if prev.is_null() {
                self.head = node;
            } else {
                (*prev.as_ptr()).next = node;
            }
            if next.is_null() {
                self.tail = node;
            } else {
                (*next.as_ptr()).prev = node;
            }
        }
        self.len += 1;
        Ok(node)
    }

    pub fn push_front(&mut self, value: T) -> Result<Cursor<T, A>, Exhausted> {
        let head = self.head;
        self.link_between(value, NodePointer::null(), head)
    }

    pub fn push_back(&mut self, value: T) -> Result<Cursor<T, A>, Exhausted> {
        let tail = self.tail;
        self.link_between(value, tail, NodePointer::null())
    }

    /// Inserts `value` right after the node at `cursor`.
    ///
    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn insert_after(&mut self, cursor: Cursor<T, A>, value: T) -> Result<Cursor<T, A>, Exhausted> {
        let next = (*cursor.as_ptr()).next;
        self.link_between(value, cursor, next)
    }

    /// Inserts `value` right before the node at `cursor`.
    ///
    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn insert_before(&mut self, cursor: Cursor<T, A>, value: T) -> Result<Cursor<T, A>, Exhausted> {
        let prev = (*cursor.as_ptr()).prev;
        self.link_between(value, prev, cursor)
    }

    /// Unlinks the node at `cursor` and returns its value.
    ///
    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn remove(&mut self, cursor: Cursor<T, A>) -> T {
        let node = cursor.as_ptr();
        let (prev, next) = ((*node).prev, (*node).next);
        if prev.is_null() {
            self.head = next;
        } else {
            (*prev.as_ptr()).next = next;
        }
        if next.is_null() {
            self.tail = prev;
        } else {
            (*next.as_ptr()).prev = prev;
        }
        self.len -= 1;
        let value = std::ptr::read(&(*node).value);
        self.alloc.deallocate(cursor.handle());
        value
    }

    pub fn pop_front(&mut self) -> Option<T> {
        if self.head.is_null() {
            None
        } else {
            Some(unsafe { self.remove(self.head) })
        }
    }

    pub fn pop_back(&mut self) -> Option<T> {
        if self.tail.is_null() {
            None
        } else {
            Some(unsafe { self.remove(self.tail) })
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.cursor_front().map(|c| unsafe { &c.as_ref().value })
    }

    pub fn back(&self) -> Option<&T> {
        self.cursor_back().map(|c| unsafe { &c.as_ref().value })
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        self.cursor_front().map(|c| unsafe { &mut c.as_mut().value })
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        self.cursor_back().map(|c| unsafe { &mut c.as_mut().value })
    }

    pub fn cursor_front(&self) -> Option<Cursor<T, A>> {
        Some(self.head).filter(|c| !c.is_null())
    }

    pub fn cursor_back(&self) -> Option<Cursor<T, A>> {
        Some(self.tail).filter(|c| !c.is_null())
    }

    /// The node after `cursor`, if any.
    ///
    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn next(&self, cursor: Cursor<T, A>) -> Option<Cursor<T, A>> {
        Some((*cursor.as_ptr()).next).filter(|c| !c.is_null())
    }

    /// The node before `cursor`, if any.
    ///
    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn prev(&self, cursor: Cursor<T, A>) -> Option<Cursor<T, A>> {
        Some((*cursor.as_ptr()).prev).filter(|c| !c.is_null())
    }

    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn get(&self, cursor: Cursor<T, A>) -> &T {
        &cursor.as_ref().value
    }

    /// # Safety
    ///
    /// `cursor` must refer to a node currently in this list.
    pub unsafe fn get_mut(&mut self, cursor: Cursor<T, A>) -> &mut T {
        &mut cursor.as_mut().value
    }

    /// The first node whose value satisfies `pred`.
    pub fn find_by<F: FnMut(&T) -> bool>(&self, mut pred: F) -> Option<Cursor<T, A>> {
        let mut cur = self.head;
        while !cur.is_null() {
            let node = unsafe { cur.as_ref() };
            if pred(&node.value) {
                return Some(cur);
            }
            cur = node.next;
        }
        None
    }

    /// The first node equal to `value`.
    pub fn find(&self, value: &T) -> Option<Cursor<T, A>>
    where
        T: PartialEq,
    {
        self.find_by(|v| v == value)
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.find(value).is_some()
    }

    /// Removes every element equal to `value`, returning how many were removed.
    pub fn remove_all(&mut self, value: &T) -> usize
    where
        T: PartialEq,
    {
        let mut removed = 0;
        let mut cur = self.head;
        while !cur.is_null() {
            let next = unsafe { (*cur.as_ptr()).next };
            if unsafe { &cur.as_ref().value } == value {
                drop(unsafe { self.remove(cur) });
                removed += 1;
            }
            cur = next;
        }
        removed
    }

    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
    }

    pub fn iter(&self) -> Iter<T, A> {
        Iter {
            front: self.head,
            back: self.tail,
            remaining: self.len,
            _marker: PhantomData,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<T, A> {
        IterMut {
            front: self.head,
            back: self.tail,
            remaining: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T, A: NodeAlloc<T>> Drop for List<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Debug, A: NodeAlloc<T>> Debug for List<T, A> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

pub struct Iter<'a, T, A: NodeAlloc<T>> {
    front: Cursor<T, A>,
    back: Cursor<T, A>,
    remaining: usize,
    _marker: PhantomData<&'a List<T, A>>,
}

impl<'a, T, A: NodeAlloc<T>> Iterator for Iter<'a, T, A> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node: &'a ListNode<T, A::Parser> = unsafe { self.front.as_ref() };
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, A: NodeAlloc<T>> DoubleEndedIterator for Iter<'a, T, A> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let node: &'a ListNode<T, A::Parser> = unsafe { self.back.as_ref() };
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<'a, T, A: NodeAlloc<T>> ExactSizeIterator for Iter<'a, T, A> {}

pub struct IterMut<'a, T, A: NodeAlloc<T>> {
    front: Cursor<T, A>,
    back: Cursor<T, A>,
    remaining: usize,
    _marker: PhantomData<&'a mut List<T, A>>,
}

impl<'a, T, A: NodeAlloc<T>> Iterator for IterMut<'a, T, A> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        let node: &'a mut ListNode<T, A::Parser> = unsafe { self.front.as_mut() };
        self.front = node.next;
        self.remaining -= 1;
        Some(&mut node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T, A: NodeAlloc<T>> DoubleEndedIterator for IterMut<'a, T, A> {
    fn next_back(&mut self) -> Option<&'a mut T> {
        if self.remaining == 0 {
            return None;
        }
        let node: &'a mut ListNode<T, A::Parser> = unsafe { self.back.as_mut() };
        self.back = node.prev;
        self.remaining -= 1;
        Some(&mut node.value)
    }
}

impl<'a, T, A: NodeAlloc<T>> IntoIterator for &'a List<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, A>;

    fn into_iter(self) -> Iter<'a, T, A> {
        self.iter()
    }
}
