// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A bounded FIFO queue over a circular buffer.

use std::fmt::{self, Debug, Formatter};
use std::ptr;

use object_alloc::Exhausted;
use segment_alloc::{LinearAlloc, SharedDynamicSegment};

/// A fixed-capacity queue.
///
/// The buffer is allocated once, in `new`, and never grows. Slot `front` holds the oldest element
/// and the next element is written at `(front + len) % capacity`.
pub struct RingQueue<T> {
    buf: LinearAlloc<T>,
    capacity: usize,
    front: usize,
    len: usize,
}

impl<T> RingQueue<T> {
    pub fn new(segment: SharedDynamicSegment, capacity: usize) -> Result<RingQueue<T>, Exhausted> {
        Ok(RingQueue {
            buf: LinearAlloc::with_capacity(segment, capacity)?,
            capacity,
            front: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    fn slot(&self, i: usize) -> *mut T {
        unsafe { self.buf.as_ptr().add((self.front + i) % self.capacity) }
    }

    /// Appends `value` at the rear. If the queue is full, `value` is handed back.
    pub fn enqueue(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        unsafe { ptr::write(self.slot(self.len), value) };
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the element at the front.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = unsafe { ptr::read(self.slot(0)) };
        self.front = (self.front + 1) % self.capacity;
        self.len -= 1;
        Some(value)
    }

    pub fn peek(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn peek_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            None
        } else {
            Some(unsafe { &mut *self.slot(0) })
        }
    }

    /// The `i`th element counting from the front.
    pub fn get(&self, i: usize) -> Option<&T> {
        if i < self.len {
            Some(unsafe { &*self.slot(i) })
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        while self.dequeue().is_some() {}
        self.front = 0;
    }

    pub fn iter(&self) -> Iter<T> {
        Iter { queue: self, next: 0 }
    }
}

impl<T> Drop for RingQueue<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Debug> Debug for RingQueue<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterates from front to rear.
pub struct Iter<'a, T> {
    queue: &'a RingQueue<T>,
    next: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let item = self.queue.get(self.next)?;
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.queue.len - self.next;
        (n, Some(n))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
