// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::marker::PhantomData;
use std::mem;

use object_alloc::{Exhausted, NodeAlloc};

use crate::ptr::RawParser;
use crate::static_segment::SharedStaticSegment;

/// A node allocator that never reclaims.
///
/// Every `allocate` bumps the underlying static segment, and `deallocate` does nothing. Memory
/// comes back only when the segment itself is dropped or reset, which makes this suitable for
/// nodes that live as long as the allocator does.
pub struct FastNodeAlloc<T> {
    segment: SharedStaticSegment,
    _marker: PhantomData<T>,
}

impl<T> FastNodeAlloc<T> {
    pub fn new(segment: SharedStaticSegment) -> FastNodeAlloc<T> {
        FastNodeAlloc {
            segment,
            _marker: PhantomData,
        }
    }

    pub fn segment(&self) -> &SharedStaticSegment {
        &self.segment
    }
}

impl<T> Clone for FastNodeAlloc<T> {
    fn clone(&self) -> FastNodeAlloc<T> {
        FastNodeAlloc::new(self.segment.clone())
    }
}

unsafe impl<T> NodeAlloc<T> for FastNodeAlloc<T> {
    type Parser = RawParser;
    type Rebind<U> = FastNodeAlloc<U>;

    fn allocate(&mut self) -> Result<usize, Exhausted> {
        self.segment
            .borrow_mut()
            .alloc(mem::size_of::<T>(), mem::align_of::<T>())
            .map(|ptr| ptr.as_ptr() as usize)
    }

    unsafe fn deallocate(&mut self, handle: usize) {
        trace!("fast deallocate({:#x}): leaked until segment release", handle);
    }

    fn rebind<U>(&self) -> FastNodeAlloc<U> {
        FastNodeAlloc::new(self.segment.clone())
    }
}
