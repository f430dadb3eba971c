// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A fixed-capacity pool of nodes in a single segment allocation.
//!
//! The pool's block is allocated from the dynamic segment on the first `allocate`. Fresh slots
//! are handed out by bumping `next_offset`; freed slots are pushed onto a LIFO list threaded
//! through the slots themselves, each freed slot storing the offset of the next one in its first
//! word. The list is terminated by `NIL` rather than zero, since zero is the offset of the first
//! slot.

use std::marker::PhantomData;
use std::mem;
use std::ptr;

use object_alloc::{Exhausted, NodeAlloc};

use crate::dynamic::{DynHandle, DynamicSegment, SharedDynamicSegment};
use crate::ptr::{PoolHandle, PoolParser};

const NIL: usize = usize::MAX;

/// A node allocator with a fixed number of slots.
///
/// Allocation beyond `capacity` live nodes fails with `Exhausted`; the pool never grows.
///
/// `T` must be at least as large as a `usize`, so that a freed slot can hold the free-list link.
/// This is checked at compile time, but only for element types that are actually allocated: a
/// pool of small values may still be created and rebound to a larger node type.
pub struct PoolNodeAlloc<T> {
    segment: SharedDynamicSegment,
    chunk: DynHandle,
    capacity: usize,
    next_offset: usize,
    recycled_head: usize,
    _marker: PhantomData<T>,
}

impl<T> PoolNodeAlloc<T> {
    const SLOT_HOLDS_LINK: () = assert!(
        mem::size_of::<T>() >= mem::size_of::<usize>(),
        "pool elements must be at least as large as a usize"
    );

    pub fn new(segment: SharedDynamicSegment, capacity: usize) -> PoolNodeAlloc<T> {
        PoolNodeAlloc {
            segment,
            chunk: 0,
            capacity,
            next_offset: 0,
            recycled_head: NIL,
            _marker: PhantomData,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn segment(&self) -> &SharedDynamicSegment {
        &self.segment
    }

    fn block_align() -> usize {
        mem::align_of::<T>().max(mem::align_of::<usize>())
    }

    fn init_block(&mut self) -> Result<(), Exhausted> {
        let bytes = self
            .capacity
            .checked_mul(mem::size_of::<T>())
            .ok_or(Exhausted)?;
        self.chunk = self.segment.borrow_mut().alloc(bytes, Self::block_align())?;
        debug!(
            "pool: {} slots of {} bytes in chunk {:#x}",
            self.capacity,
            mem::size_of::<T>(),
            self.chunk
        );
        Ok(())
    }

    unsafe fn slot(&self, offset: usize) -> *mut usize {
        DynamicSegment::pointer_of(self.chunk).add(offset) as *mut usize
    }
}

unsafe impl<T> NodeAlloc<T> for PoolNodeAlloc<T> {
    type Parser = PoolParser;
    type Rebind<U> = PoolNodeAlloc<U>;

    fn allocate(&mut self) -> Result<PoolHandle, Exhausted> {
        let () = Self::SLOT_HOLDS_LINK;
        if self.chunk == 0 {
            self.init_block()?;
        }
        let offset = if self.recycled_head != NIL {
            let offset = self.recycled_head;
            // Slots are only size-aligned, not necessarily usize-aligned.
            self.recycled_head = unsafe { ptr::read_unaligned(self.slot(offset)) };
            offset
        } else if self.next_offset + mem::size_of::<T>() <= self.capacity * mem::size_of::<T>() {
            let offset = self.next_offset;
            self.next_offset += mem::size_of::<T>();
            offset
        } else {
            trace!("pool allocate: all {} slots in use", self.capacity);
            return Err(Exhausted);
        };
        trace!("pool allocate -> offset {}", offset);
        Ok(PoolHandle {
            chunk: self.chunk,
            offset,
        })
    }

    unsafe fn deallocate(&mut self, handle: PoolHandle) {
        debug_assert_eq!(handle.chunk, self.chunk, "handle from another pool");
        ptr::write_unaligned(self.slot(handle.offset), self.recycled_head);
        self.recycled_head = handle.offset;
        trace!("pool deallocate(offset {})", handle.offset);
    }

    fn rebind<U>(&self) -> PoolNodeAlloc<U> {
        PoolNodeAlloc::new(self.segment.clone(), self.capacity)
    }
}

impl<T> Drop for PoolNodeAlloc<T> {
    fn drop(&mut self) {
        if self.chunk != 0 {
            self.segment.borrow_mut().dealloc(self.chunk);
        }
    }
}
