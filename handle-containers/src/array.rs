// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A growable array in a dynamic segment.

use std::fmt::{self, Debug, Formatter};
use std::ops::{Index, IndexMut};
use std::ptr;
use std::slice;

use object_alloc::Exhausted;
use segment_alloc::{LinearAlloc, SharedDynamicSegment};

/// A contiguous growable array.
///
/// Elements live in a single `LinearAlloc` buffer. When the buffer is full it at least doubles,
/// growing in place whenever the chunk after it in the segment is free.
pub struct Array<T> {
    buf: LinearAlloc<T>,
    len: usize,
}

impl<T> Array<T> {
    /// Creates an empty array. Nothing is allocated until the first insertion.
    pub fn new(segment: SharedDynamicSegment) -> Array<T> {
        Array {
            buf: LinearAlloc::new(segment),
            len: 0,
        }
    }

    pub fn with_capacity(segment: SharedDynamicSegment, capacity: usize) -> Result<Array<T>, Exhausted> {
        Ok(Array {
            buf: LinearAlloc::with_capacity(segment, capacity)?,
            len: 0,
        })
    }

    pub fn segment(&self) -> &SharedDynamicSegment {
        self.buf.segment()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Makes room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<(), Exhausted> {
        let needed = self.len.checked_add(additional).ok_or(Exhausted)?;
        self.buf.reserve(needed)
    }

    fn grow_for_one(&mut self) -> Result<(), Exhausted> {
        if self.len < self.buf.capacity() {
            return Ok(());
        }
        let target = self.buf.capacity().saturating_mul(2).max(4);
        self.buf.reserve(target)
    }

    /// Appends `value`. On failure `value` is dropped and the array is unchanged.
    pub fn push(&mut self, value: T) -> Result<(), Exhausted> {
        self.grow_for_one()?;
        unsafe { ptr::write(self.buf.as_ptr().add(self.len), value) };
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(unsafe { ptr::read(self.buf.as_ptr().add(self.len)) })
    }

    /// Inserts `value` at `index`, shifting later elements up.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, value: T) -> Result<(), Exhausted> {
        assert!(
            index <= self.len,
            "insertion index ({}) is out of bounds (len {})",
            index,
            self.len
        );
        self.grow_for_one()?;
        unsafe {
            self.buf.shift_forward(index, 1, self.len);
            ptr::write(self.buf.as_ptr().add(index), value);
        }
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the element at `index`, shifting later elements down.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "removal index ({}) is out of bounds (len {})",
            index,
            self.len
        );
        unsafe {
            let value = ptr::read(self.buf.as_ptr().add(index));
            self.buf.shift_backward(index, 1, self.len);
            self.len -= 1;
            value
        }
    }

    /// Removes the element at `index`, replacing it with the last element.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn swap_remove(&mut self, index: usize) -> T {
        assert!(index < self.len, "swap_remove index ({}) is out of bounds", index);
        let last = self.len - 1;
        self.as_mut_slice().swap(index, last);
        self.len = last;
        unsafe { ptr::read(self.buf.as_ptr().add(last)) }
    }

    /// Drops every element. The buffer is kept.
    pub fn clear(&mut self) {
        let len = self.len;
        // leak rather than double drop if an element's destructor panics
        self.len = 0;
        unsafe { ptr::drop_in_place(slice::from_raw_parts_mut(self.buf.as_ptr(), len)) };
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.buf.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.buf.as_ptr(), self.len) }
    }

    pub fn iter(&self) -> slice::Iter<T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<T> {
        self.as_mut_slice().iter_mut()
    }

    pub fn contains(&self, value: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(value)
    }
}

impl<T> Drop for Array<T> {
    fn drop(&mut self) {
        self.clear();
        trace!("array dropped (capacity {})", self.buf.capacity());
    }
}

impl<T> Index<usize> for Array<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T> IndexMut<usize> for Array<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> slice::Iter<'a, T> {
        self.iter()
    }
}

impl<T: Debug> Debug for Array<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
