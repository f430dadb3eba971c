// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! A testing framework to detect memory corruption issues in node allocators.
//!
//! See `TestBuilder` for documentation on running tests.

use std::collections::HashSet;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hasher;
use std::hint::black_box;
use std::marker::PhantomData;

use object_alloc::{HandleOf, NodeAlloc};
use twox_hash::XxHash64;

/// A type to test for memory corruption issues.
///
/// A `CorruptionTester` is a header followed by `N` random bytes. The header holds a state nonce
/// and a hash. The hash covers the nonce, the random bytes and, once the object has been placed,
/// its own address. Copying the object elsewhere, overwriting any part of it, or dropping it twice
/// is therefore detected (with very high probability).
///
/// # Lifecycle
///
/// 1. `CorruptionTester::new` returns an object in the `New` state. Its address is not yet known,
///    so the hash does not cover it.
/// 2. Once the allocator has placed the object (via `allocate_with`), the test calls
///    `update_new`, which moves it to the `Valid` state and binds the hash to its address.
/// 3. When the object is dropped, it must be in the `New` or `Valid` state, and moves to the
///    `Dropped` state.
///
/// Any other transition panics.
#[repr(C)]
pub struct CorruptionTester<const N: usize = 24> {
    header: Header,
    random: [u8; N],
}

#[repr(C)]
#[derive(Copy, Clone, Debug)]
struct Header {
    state_nonce: u32,
    hash: u32,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    New,
    Valid,
    Dropped,
    Invalid,
}

// These nonces are random values to make it unlikely that they will appear in memory by accident.
const NONCE_NEW: u32 = 3_254_320_468;
const NONCE_VALID: u32 = 3_033_817_838;
const NONCE_DROPPED: u32 = 2_620_515_550;

impl<const N: usize> CorruptionTester<N> {
    pub fn new() -> CorruptionTester<N> {
        let mut random = [0u8; N];
        for b in random.iter_mut() {
            *b = rand::random();
        }
        let tester = CorruptionTester {
            header: Header {
                state_nonce: NONCE_NEW,
                hash: Self::hash(0, NONCE_NEW, &random),
            },
            random,
        };
        assert_eq!(tester.state(), State::New);
        tester
    }

    /// Computes the tester's state.
    pub fn state(&self) -> State {
        let Header { state_nonce, hash } = self.header;
        match state_nonce {
            NONCE_NEW if hash == Self::hash(0, state_nonce, &self.random) => State::New,
            NONCE_VALID | NONCE_DROPPED if hash == Self::hash(self.addr(), state_nonce, &self.random) => {
                if state_nonce == NONCE_VALID {
                    State::Valid
                } else {
                    State::Dropped
                }
            }
            _ => State::Invalid,
        }
    }

    /// Moves the tester from `New` to `Valid`, binding it to its current address.
    pub fn update_new(&mut self) {
        assert_eq!(self.state(), State::New);
        self.update_state(NONCE_VALID);
    }

    fn update_state(&mut self, nonce: u32) {
        self.header.state_nonce = nonce;
        self.header.hash = Self::hash(self.addr(), nonce, &self.random);
    }

    fn addr(&self) -> usize {
        self as *const CorruptionTester<N> as usize
    }

    /// Hashes the pointer, state nonce, and random bytes.
    fn hash(ptr: usize, state_nonce: u32, random_bytes: &[u8]) -> u32 {
        let mut hasher = XxHash64::with_seed(ptr as u64);
        hasher.write_u32(state_nonce);
        hasher.write(random_bytes);
        hasher.finish() as u32
    }
}

impl<const N: usize> Default for CorruptionTester<N> {
    fn default() -> CorruptionTester<N> {
        CorruptionTester::new()
    }
}

impl<const N: usize> Drop for CorruptionTester<N> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            // Panicking again would abort without a useful message.
            return;
        }
        let state = self.state();
        if state != State::Valid && state != State::New {
            panic!(
                "unexpected state {:?} for object {:?} at address {:#x}",
                state,
                self,
                self.addr()
            );
        }
        self.update_state(NONCE_DROPPED);
        // keep the optimizer from removing the store
        black_box(&*self);
    }
}

impl<const N: usize> Debug for CorruptionTester<N> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{{header: {:?} random: {:?}}}", self.header, &self.random[..])
    }
}

/// A builder for corruption tests.
///
/// A `TestBuilder` takes a function that constructs a fresh allocator of `CorruptionTester`s.
/// `test` then randomly allocates and deallocates objects, verifying every object it deallocates
/// and every object still live at the end. An allocator that hands out overlapping slots, moves
/// objects, or scribbles on live memory fails the test.
pub struct TestBuilder<A, F: Fn() -> A, const N: usize> {
    new: F,
    test_iters: usize,
    max_live: usize,
    _marker: PhantomData<A>,
}

impl<A, F, const N: usize> TestBuilder<A, F, N>
where
    A: NodeAlloc<CorruptionTester<N>>,
    F: Fn() -> A,
{
    pub fn new(new: F) -> TestBuilder<A, F, N> {
        TestBuilder {
            new,
            test_iters: crate::test_iters(10_000),
            max_live: usize::MAX,
            _marker: PhantomData,
        }
    }

    /// Configures the number of allocate or deallocate steps.
    ///
    /// The default is 10,000, or the value of `NODE_ALLOC_TEST_ITERS` if set.
    pub fn test_iters(mut self, iters: usize) -> TestBuilder<A, F, N> {
        self.test_iters = iters;
        self
    }

    /// Caps the number of simultaneously live objects.
    ///
    /// Use this for allocators with a fixed capacity. Once the cap is reached, the next step
    /// always deallocates.
    pub fn max_live(mut self, max_live: usize) -> TestBuilder<A, F, N> {
        assert!(max_live > 0);
        self.max_live = max_live;
        self
    }

    pub fn test(self) {
        debug!(
            "corruption test: {} iterations, {}-byte objects",
            self.test_iters,
            std::mem::size_of::<CorruptionTester<N>>()
        );
        let mut tester = Tester::<A, N>::new((self.new)());
        for _ in 0..self.test_iters {
            let full = tester.live.len() >= self.max_live;
            if full || (rand::random() && !tester.live.is_empty()) {
                tester.dealloc(rand::random());
            } else {
                tester.alloc();
            }
        }
        tester.drop_and_check();
    }
}

struct Tester<A: NodeAlloc<CorruptionTester<N>>, const N: usize> {
    alloc: A,
    live: Vec<HandleOf<A, CorruptionTester<N>>>,
    live_addrs: HashSet<usize>,
}

impl<A: NodeAlloc<CorruptionTester<N>>, const N: usize> Tester<A, N> {
    fn new(alloc: A) -> Tester<A, N> {
        Tester {
            alloc,
            live: Vec::new(),
            live_addrs: HashSet::new(),
        }
    }

    fn alloc(&mut self) {
        let handle = self
            .alloc
            .allocate_with(CorruptionTester::new())
            .expect("allocation failed");
        let obj = unsafe { A::parse(handle) };
        assert_eq!(
            obj as usize % std::mem::align_of::<CorruptionTester<N>>(),
            0,
            "misaligned object at {:?}",
            obj
        );
        // check for double-allocate of the same address
        assert!(
            self.live_addrs.insert(obj as usize),
            "address {:?} allocated twice",
            obj
        );
        unsafe { (*obj).update_new() };
        self.live.push(handle);
    }

    fn dealloc(&mut self, idx: usize) {
        let handle = self.live.swap_remove(idx % self.live.len());
        let obj = unsafe { A::parse(handle) };
        // make sure it's still valid
        assert_eq!(unsafe { (*obj).state() }, State::Valid, "object at {:?}", obj);
        self.live_addrs.remove(&(obj as usize));
        unsafe { self.alloc.delete(handle) };
    }

    fn drop_and_check(mut self) {
        for &handle in &self.live {
            let obj = unsafe { A::parse(handle) };
            assert_eq!(unsafe { (*obj).state() }, State::Valid, "object at {:?}", obj);
        }
        while !self.live.is_empty() {
            let idx = self.live.len() - 1;
            self.dealloc(idx);
        }
    }
}
