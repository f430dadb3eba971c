// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};

use object_alloc::Exhausted;

use crate::dynamic::{DynHandle, DynamicSegment, SharedDynamicSegment};

/// A growable buffer of `T`s carved from a dynamic segment.
///
/// `LinearAlloc` only manages capacity: it never constructs or drops elements. Growth goes through
/// `DynamicSegment::realloc`, so a buffer followed by free space grows without copying.
pub struct LinearAlloc<T> {
    segment: SharedDynamicSegment,
    handle: DynHandle,
    capacity: usize,
    _marker: PhantomData<T>,
}

impl<T> LinearAlloc<T> {
    /// Creates an empty buffer. Nothing is allocated until the first `reserve`.
    pub fn new(segment: SharedDynamicSegment) -> LinearAlloc<T> {
        LinearAlloc {
            segment,
            handle: 0,
            capacity: if mem::size_of::<T>() == 0 { usize::MAX } else { 0 },
            _marker: PhantomData,
        }
    }

    pub fn with_capacity(segment: SharedDynamicSegment, capacity: usize) -> Result<LinearAlloc<T>, Exhausted> {
        let mut buf = LinearAlloc::new(segment);
        buf.reserve(capacity)?;
        Ok(buf)
    }

    pub fn segment(&self) -> &SharedDynamicSegment {
        &self.segment
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Makes room for at least `capacity` elements in total.
    ///
    /// Existing elements are preserved. The resulting capacity may exceed the request, since the
    /// segment hands out whole packets. On failure the buffer is unchanged.
    pub fn reserve(&mut self, capacity: usize) -> Result<(), Exhausted> {
        if capacity <= self.capacity {
            return Ok(());
        }
        let bytes = capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or(Exhausted)?;
        let handle = self
            .segment
            .borrow_mut()
            .realloc(self.handle, bytes, mem::align_of::<T>())?;
        self.handle = handle;
        self.capacity = unsafe { DynamicSegment::usable_size(handle) } / mem::size_of::<T>();
        trace!("linear reserve({}) -> capacity {}", capacity, self.capacity);
        Ok(())
    }

    /// A pointer to the first slot. Dangling (but aligned) while nothing is allocated.
    pub fn as_ptr(&self) -> *mut T {
        if self.handle == 0 {
            NonNull::dangling().as_ptr()
        } else {
            unsafe { DynamicSegment::pointer_of(self.handle) as *mut T }
        }
    }

    /// Moves the elements in `[index, len)` forward by `count` slots.
    ///
    /// # Safety
    ///
    /// `len + count` must not exceed the capacity. The vacated slots are left logically
    /// uninitialized; the caller owns the elements' lifecycle.
    pub unsafe fn shift_forward(&mut self, index: usize, count: usize, len: usize) {
        debug_assert!(index <= len && len + count <= self.capacity);
        let p = self.as_ptr();
        ptr::copy(p.add(index), p.add(index + count), len - index);
    }

    /// Moves the elements in `[index + count, len)` back by `count` slots, over `[index, index +
    /// count)`.
    ///
    /// # Safety
    ///
    /// `index + count <= len <= capacity`, and the overwritten slots must already have been
    /// dropped or moved out.
    pub unsafe fn shift_backward(&mut self, index: usize, count: usize, len: usize) {
        debug_assert!(index + count <= len && len <= self.capacity);
        let p = self.as_ptr();
        ptr::copy(p.add(index + count), p.add(index), len - index - count);
    }

    /// Frees the buffer. Elements still in it are not dropped.
    pub fn release(&mut self) {
        if self.handle != 0 {
            self.segment.borrow_mut().dealloc(self.handle);
            self.handle = 0;
            self.capacity = 0;
        }
    }
}

impl<T> Drop for LinearAlloc<T> {
    fn drop(&mut self) {
        self.release();
    }
}
