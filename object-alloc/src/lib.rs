// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Handle-based node allocator traits.
//!
//! Allocators in this workspace never hand out raw pointers to their clients. Instead, they hand
//! out *handles*: opaque, copyable values which must be resolved through a `Parser` in order to
//! obtain an address. Containers store handles, not pointers, so that the memory underneath them
//! can in principle be reindexed without the container noticing.

use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::ptr;

use thiserror::Error;

/// An error indicating that no memory is available.
///
/// The `Exhausted` error indicates that an allocation request has failed due to resources being
/// unavailable. It strongly implies that *some* sequence of deallocations would allow a subsequent
/// reissuing of the original allocation request to succeed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Error)]
#[error("allocator exhausted")]
pub struct Exhausted;

/// A static capability that resolves handles into addresses.
///
/// A `Parser` carries no state. Everything needed to find the memory behind a handle must be
/// encoded in the handle itself, so that a container can resolve its links without holding a
/// reference to the allocator that issued them.
pub trait Parser {
    /// The handle type issued by allocators using this parser.
    type Handle: Copy + Eq + Debug;

    /// The handle value that refers to nothing.
    fn null() -> Self::Handle;

    fn is_null(handle: Self::Handle) -> bool {
        handle == Self::null()
    }

    /// Resolves `handle` to a typed address.
    ///
    /// # Safety
    ///
    /// `handle` must be non-null and must have been issued by a live allocator using this parser.
    /// The allocator must not have deallocated it since.
    unsafe fn parse<T>(handle: Self::Handle) -> *mut T;
}

/// Shorthand for the handle type of a `NodeAlloc`.
pub type HandleOf<A, T> = <<A as NodeAlloc<T>>::Parser as Parser>::Handle;

/// Allocators which allocate fixed-size nodes of a particular type.
///
/// A `NodeAlloc<T>` hands out slots large enough and aligned enough for a single `T`, addressed by
/// handles of its `Parser`. Unlike a general-purpose allocator, slots returned by `allocate` are
/// uninitialized, and `deallocate` never runs destructors; `allocate_with` and `delete` are the
/// initializing and dropping counterparts.
///
/// # Rebinding
///
/// A container that is parameterized on an allocator for its element type `T` usually needs to
/// allocate something else entirely, such as a list node wrapping a `T`. `Rebind<U>` names the same
/// allocation policy for another element type, and `rebind` builds an instance of it which shares
/// this allocator's backing memory.
///
/// # Safety
///
/// Implementations must return slots that are valid for reads and writes of a `T`, aligned to
/// `align_of::<T>()`, and disjoint from every other live slot, until they are passed back to
/// `deallocate`.
pub unsafe trait NodeAlloc<T>: Sized {
    /// The parser which resolves this allocator's handles.
    type Parser: Parser;

    /// The same policy, parameterized on another element type.
    type Rebind<U>: NodeAlloc<U, Parser = Self::Parser>;

    /// Allocates an uninitialized slot.
    fn allocate(&mut self) -> Result<HandleOf<Self, T>, Exhausted>;

    /// Returns a slot to the allocator without dropping its contents.
    ///
    /// # Safety
    ///
    /// `handle` must have been returned by `allocate` on this allocator (or one sharing its
    /// backing memory) and must not have been deallocated already.
    unsafe fn deallocate(&mut self, handle: HandleOf<Self, T>);

    /// Builds an allocator for `U` which shares this allocator's backing memory.
    fn rebind<U>(&self) -> Self::Rebind<U>;

    /// Allocates a slot and moves `value` into it.
    ///
    /// On failure, `value` is dropped.
    fn allocate_with(&mut self, value: T) -> Result<HandleOf<Self, T>, Exhausted> {
        let handle = self.allocate()?;
        unsafe { ptr::write(Self::parse(handle), value) };
        Ok(handle)
    }

    /// Drops the value in `handle` and deallocates its slot.
    ///
    /// # Safety
    ///
    /// In addition to the requirements of `deallocate`, the slot must hold an initialized `T`.
    unsafe fn delete(&mut self, handle: HandleOf<Self, T>) {
        ptr::drop_in_place(Self::parse(handle));
        self.deallocate(handle);
    }

    /// Resolves a handle issued by this allocator.
    ///
    /// # Safety
    ///
    /// See `Parser::parse`.
    unsafe fn parse(handle: HandleOf<Self, T>) -> *mut T {
        <Self::Parser as Parser>::parse::<T>(handle)
    }

    fn null_handle() -> HandleOf<Self, T> {
        <Self::Parser as Parser>::null()
    }
}

/// A typed, non-owning reference to a node, stored as a handle.
///
/// `NodePointer` is what containers store in place of a raw pointer. It does not own the node it
/// refers to: copies are free, dropping one does nothing, and two `NodePointer`s are equal if and
/// only if their handles are equal.
pub struct NodePointer<P: Parser, T> {
    handle: P::Handle,
    _marker: PhantomData<*mut T>,
}

impl<P: Parser, T> NodePointer<P, T> {
    pub fn from_handle(handle: P::Handle) -> NodePointer<P, T> {
        NodePointer {
            handle,
            _marker: PhantomData,
        }
    }

    pub fn null() -> NodePointer<P, T> {
        NodePointer::from_handle(P::null())
    }

    pub fn handle(self) -> P::Handle {
        self.handle
    }

    pub fn is_null(self) -> bool {
        P::is_null(self.handle)
    }

    /// Resolves the handle to a raw pointer.
    ///
    /// # Safety
    ///
    /// See `Parser::parse`.
    pub unsafe fn as_ptr(self) -> *mut T {
        P::parse::<T>(self.handle)
    }

    /// # Safety
    ///
    /// The handle must be live and the node initialized, and the returned reference must not
    /// outlive the node or alias a mutable reference to it.
    pub unsafe fn as_ref<'a>(self) -> &'a T {
        &*self.as_ptr()
    }

    /// # Safety
    ///
    /// As for `as_ref`, and additionally no other reference to the node may exist while the
    /// returned one is alive.
    pub unsafe fn as_mut<'a>(self) -> &'a mut T {
        &mut *self.as_ptr()
    }
}

impl<P: Parser, T> Clone for NodePointer<P, T> {
    fn clone(&self) -> NodePointer<P, T> {
        *self
    }
}

impl<P: Parser, T> Copy for NodePointer<P, T> {}

impl<P: Parser, T> PartialEq for NodePointer<P, T> {
    fn eq(&self, other: &NodePointer<P, T>) -> bool {
        self.handle == other.handle
    }
}

impl<P: Parser, T> Eq for NodePointer<P, T> {}

impl<P: Parser, T> Default for NodePointer<P, T> {
    fn default() -> NodePointer<P, T> {
        NodePointer::null()
    }
}

impl<P: Parser, T> Debug for NodePointer<P, T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "NodePointer({:?})", self.handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    // Heap-backed allocator whose handles are plain addresses.
    struct BoxParser;

    impl Parser for BoxParser {
        type Handle = usize;

        fn null() -> usize {
            0
        }

        unsafe fn parse<T>(handle: usize) -> *mut T {
            handle as *mut T
        }
    }

    struct BoxAlloc<T> {
        live: usize,
        _marker: PhantomData<T>,
    }

    impl<T> BoxAlloc<T> {
        fn new() -> BoxAlloc<T> {
            BoxAlloc {
                live: 0,
                _marker: PhantomData,
            }
        }
    }

    unsafe impl<T> NodeAlloc<T> for BoxAlloc<T> {
        type Parser = BoxParser;
        type Rebind<U> = BoxAlloc<U>;

        fn allocate(&mut self) -> Result<usize, Exhausted> {
            self.live += 1;
            let b: Box<mem::MaybeUninit<T>> = Box::new(mem::MaybeUninit::uninit());
            Ok(Box::into_raw(b) as usize)
        }

        unsafe fn deallocate(&mut self, handle: usize) {
            self.live -= 1;
            drop(Box::from_raw(handle as *mut mem::MaybeUninit<T>));
        }

        fn rebind<U>(&self) -> BoxAlloc<U> {
            BoxAlloc::new()
        }
    }

    #[test]
    fn test_allocate_with_and_delete() {
        let mut alloc = BoxAlloc::<String>::new();
        let h = alloc.allocate_with("hello".to_string()).unwrap();
        let p = NodePointer::<BoxParser, String>::from_handle(h);
        unsafe {
            assert_eq!(p.as_ref(), "hello");
            p.as_mut().push_str(", world");
            assert_eq!(p.as_ref(), "hello, world");
            alloc.delete(h);
        }
        assert_eq!(alloc.live, 0);
    }

    #[test]
    fn test_node_pointer_equality_is_by_handle() {
        let a = NodePointer::<BoxParser, u64>::from_handle(0x1000);
        let b = NodePointer::<BoxParser, u64>::from_handle(0x1000);
        let c = NodePointer::<BoxParser, u64>::from_handle(0x2000);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(NodePointer::<BoxParser, u64>::default().is_null());
        assert!(!a.is_null());
    }

    #[test]
    fn test_rebind_shares_policy() {
        let alloc = BoxAlloc::<u8>::new();
        let mut other: BoxAlloc<(u64, u64)> = alloc.rebind();
        let h = other.allocate_with((1, 2)).unwrap();
        unsafe {
            assert_eq!(*BoxAlloc::<(u64, u64)>::parse(h), (1, 2));
            other.delete(h);
        }
        assert_eq!(BoxAlloc::<u8>::null_handle(), 0);
    }
}
