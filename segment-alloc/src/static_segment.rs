// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A bump allocator over a run of pages.

use std::cell::RefCell;
use std::ptr::NonNull;
use std::rc::Rc;

use object_alloc::Exhausted;
use page_alloc::PageProvider;

use crate::align::{align_and_record, check_align, unalign};

pub type SharedStaticSegment = Rc<RefCell<StaticSegment>>;

/// A segment which only ever grows.
///
/// Each `alloc` advances a bump offset by `size + align` bytes. Individual allocations are never
/// freed; the whole run of pages goes back to the provider when the segment is dropped.
#[derive(Debug)]
pub struct StaticSegment {
    provider: Rc<PageProvider>,
    base: NonNull<u8>,
    size: usize,
    used: usize,
}

impl StaticSegment {
    /// Reserves `pages` pages (at least one) from `provider`.
    pub fn new(provider: &Rc<PageProvider>, pages: usize) -> Result<StaticSegment, Exhausted> {
        let size = pages.max(1) * provider.page_size();
        let base = provider.request_segment(size)?;
        debug!("static segment: {} bytes at {:?}", size, base);
        Ok(StaticSegment {
            provider: provider.clone(),
            base,
            size,
            used: 0,
        })
    }

    pub fn into_shared(self) -> SharedStaticSegment {
        Rc::new(RefCell::new(self))
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// The allocation consumes `size + align` bytes of the segment regardless of how much padding
    /// was actually needed. On failure the segment is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two or exceeds `MAX_ALIGN`.
    pub fn alloc(&mut self, size: usize, align: usize) -> Result<NonNull<u8>, Exhausted> {
        check_align(align);
        let footprint = size.checked_add(align).ok_or(Exhausted)?;
        if footprint > self.remaining() {
            trace!("static alloc({}, {}) -> exhausted", size, align);
            return Err(Exhausted);
        }
        let ptr = unsafe {
            let base = self.base.as_ptr().add(self.used);
            align_and_record(base, align)
        };
        self.used += footprint;
        trace!("static alloc({}, {}) -> {:?}", size, align, ptr);
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    /// Recovers the unaligned address an allocation was carved from.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `alloc` on a static segment.
    pub unsafe fn base_of(ptr: NonNull<u8>) -> *mut u8 {
        unalign(ptr.as_ptr())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn remaining(&self) -> usize {
        self.size - self.used
    }

    /// Whether `ptr` lies inside this segment.
    pub fn contains(&self, ptr: *const u8) -> bool {
        let base = self.base.as_ptr() as usize;
        (ptr as usize).wrapping_sub(base) < self.size
    }

    /// Forgets every allocation.
    ///
    /// Pointers previously returned by `alloc` must no longer be used.
    pub fn reset(&mut self) {
        trace!("static reset: {} bytes reclaimed", self.used);
        self.used = 0;
    }
}

impl Drop for StaticSegment {
    fn drop(&mut self) {
        debug!("static segment: releasing {:?}", self.base);
        self.provider.release_segment(self.base);
    }
}
