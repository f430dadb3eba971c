// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use std::marker::PhantomData;
use std::mem;

use object_alloc::{Exhausted, NodeAlloc};

use crate::dynamic::{DynHandle, SharedDynamicSegment};
use crate::ptr::DynamicParser;

/// A node allocator which makes one segment allocation per node.
pub struct SimpleNodeAlloc<T> {
    segment: SharedDynamicSegment,
    _marker: PhantomData<T>,
}

impl<T> SimpleNodeAlloc<T> {
    pub fn new(segment: SharedDynamicSegment) -> SimpleNodeAlloc<T> {
        SimpleNodeAlloc {
            segment,
            _marker: PhantomData,
        }
    }

    pub fn segment(&self) -> &SharedDynamicSegment {
        &self.segment
    }
}

impl<T> Clone for SimpleNodeAlloc<T> {
    fn clone(&self) -> SimpleNodeAlloc<T> {
        SimpleNodeAlloc::new(self.segment.clone())
    }
}

unsafe impl<T> NodeAlloc<T> for SimpleNodeAlloc<T> {
    type Parser = DynamicParser;
    type Rebind<U> = SimpleNodeAlloc<U>;

    fn allocate(&mut self) -> Result<DynHandle, Exhausted> {
        self.segment
            .borrow_mut()
            .alloc(mem::size_of::<T>(), mem::align_of::<T>())
    }

    unsafe fn deallocate(&mut self, handle: DynHandle) {
        self.segment.borrow_mut().dealloc(handle);
    }

    fn rebind<U>(&self) -> SimpleNodeAlloc<U> {
        SimpleNodeAlloc::new(self.segment.clone())
    }
}
