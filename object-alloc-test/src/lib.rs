// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Test harnesses for `NodeAlloc` implementations.

#[macro_use]
extern crate log;

pub mod corruption;

/// The environment variable that overrides the number of iterations randomized tests run.
pub const ITERS_VAR: &str = "NODE_ALLOC_TEST_ITERS";

/// The number of iterations a randomized test should run.
///
/// This is the value of the `NODE_ALLOC_TEST_ITERS` environment variable if it is set and parses,
/// and `default` otherwise.
pub fn test_iters(default: usize) -> usize {
    match std::env::var(ITERS_VAR) {
        Ok(val) => match val.parse() {
            Ok(iters) => iters,
            Err(_) => {
                warn!("ignoring unparseable {}={:?}", ITERS_VAR, val);
                default
            }
        },
        Err(_) => default,
    }
}

/// Call a function once for each alignment.
///
/// `foreach_align` calls `f` once for each power of two from 1 up to and including `max`.
///
/// `foreach_align` is useful for testing allocators whose behavior may be sensitive to requested
/// alignment.
pub fn foreach_align<F: FnMut(usize)>(max: usize, mut f: F) {
    let mut align = 1;
    while align <= max {
        f(align);
        align *= 2;
    }
}
