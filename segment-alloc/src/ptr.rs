// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Handle types, their parsers, and typed handle pointers.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::ptr;

use object_alloc::Parser;

use crate::dynamic::{DynHandle, DynamicSegment};

/// Resolves `DynamicSegment` handles.
#[derive(Debug)]
pub enum DynamicParser {}

impl Parser for DynamicParser {
    type Handle = DynHandle;

    fn null() -> DynHandle {
        0
    }

    unsafe fn parse<T>(handle: DynHandle) -> *mut T {
        DynamicSegment::pointer_of(handle) as *mut T
    }
}

/// A slot inside a dynamic segment allocation: the allocation's handle plus a byte offset.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct PoolHandle {
    pub chunk: DynHandle,
    pub offset: usize,
}

impl PoolHandle {
    pub fn is_null(self) -> bool {
        self.chunk == 0
    }

    /// # Safety
    ///
    /// `chunk` must be null or a live dynamic segment handle.
    pub unsafe fn resolve(self) -> *mut u8 {
        if self.is_null() {
            ptr::null_mut()
        } else {
            DynamicSegment::pointer_of(self.chunk).add(self.offset)
        }
    }
}

/// Resolves `PoolHandle`s.
#[derive(Debug)]
pub enum PoolParser {}

impl Parser for PoolParser {
    type Handle = PoolHandle;

    fn null() -> PoolHandle {
        PoolHandle::default()
    }

    unsafe fn parse<T>(handle: PoolHandle) -> *mut T {
        handle.resolve() as *mut T
    }
}

/// Resolves handles that are plain addresses.
#[derive(Debug)]
pub enum RawParser {}

impl Parser for RawParser {
    type Handle = usize;

    fn null() -> usize {
        0
    }

    unsafe fn parse<T>(handle: usize) -> *mut T {
        handle as *mut T
    }
}

/// A typed dynamic segment handle.
///
/// Two `Pointer`s are equal if and only if they hold the same handle. Two different handles that
/// happen to resolve to the same address compare unequal.
pub struct Pointer<T> {
    handle: DynHandle,
    _marker: PhantomData<*mut T>,
}

impl<T> Pointer<T> {
    pub fn new(handle: DynHandle) -> Pointer<T> {
        Pointer {
            handle,
            _marker: PhantomData,
        }
    }

    pub fn null() -> Pointer<T> {
        Pointer::new(0)
    }

    pub fn handle(&self) -> DynHandle {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle == 0
    }

    /// # Safety
    ///
    /// The handle must be non-null and live.
    pub unsafe fn get(&self) -> *mut T {
        DynamicSegment::pointer_of(self.handle) as *mut T
    }

    /// # Safety
    ///
    /// The handle must be live and point to an initialized `T`.
    pub unsafe fn as_ref<'a>(&self) -> &'a T {
        &*self.get()
    }

    /// # Safety
    ///
    /// As for `as_ref`, with no other reference to the value alive.
    pub unsafe fn as_mut<'a>(&self) -> &'a mut T {
        &mut *self.get()
    }

    pub fn cast<U>(self) -> Pointer<U> {
        Pointer::new(self.handle)
    }
}

impl<T> Clone for Pointer<T> {
    fn clone(&self) -> Pointer<T> {
        *self
    }
}

impl<T> Copy for Pointer<T> {}

impl<T> PartialEq for Pointer<T> {
    fn eq(&self, other: &Pointer<T>) -> bool {
        self.handle == other.handle
    }
}

impl<T> Eq for Pointer<T> {}

impl<T> Debug for Pointer<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Pointer({:#x})", self.handle)
    }
}

/// A typed pool handle.
///
/// Unlike `Pointer`, equality compares the *resolved addresses*: two `OffsetPointer`s built from
/// different handles are equal if they land on the same byte.
pub struct OffsetPointer<T> {
    handle: PoolHandle,
    _marker: PhantomData<*mut T>,
}

impl<T> OffsetPointer<T> {
    /// # Safety
    ///
    /// Comparing the pointer resolves its handle, so the handle must stay live (or null) for as
    /// long as the pointer is compared or dereferenced.
    pub unsafe fn new(handle: PoolHandle) -> OffsetPointer<T> {
        OffsetPointer {
            handle,
            _marker: PhantomData,
        }
    }

    pub fn null() -> OffsetPointer<T> {
        OffsetPointer {
            handle: PoolHandle::default(),
            _marker: PhantomData,
        }
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle
    }

    pub fn is_null(&self) -> bool {
        self.handle.is_null()
    }

    pub fn get(&self) -> *mut T {
        unsafe { self.handle.resolve() as *mut T }
    }

    /// # Safety
    ///
    /// The handle must point to an initialized `T`.
    pub unsafe fn as_ref<'a>(&self) -> &'a T {
        &*self.get()
    }

    /// # Safety
    ///
    /// As for `as_ref`, with no other reference to the value alive.
    pub unsafe fn as_mut<'a>(&self) -> &'a mut T {
        &mut *self.get()
    }
}

impl<T> Clone for OffsetPointer<T> {
    fn clone(&self) -> OffsetPointer<T> {
        *self
    }
}

impl<T> Copy for OffsetPointer<T> {}

impl<T> PartialEq for OffsetPointer<T> {
    fn eq(&self, other: &OffsetPointer<T>) -> bool {
        self.get() == other.get()
    }
}

impl<T> Eq for OffsetPointer<T> {}

impl<T> Debug for OffsetPointer<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "OffsetPointer({:?} -> {:?})", self.handle, self.get())
    }
}
