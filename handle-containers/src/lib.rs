// Copyright 2017-2018 the authors. See the 'Copyright and license' section of the
// README.md file at the top-level directory of this repository.
//
// Licensed under the Apache License, Version 2.0 (the LICENSE-APACHE file) or
// the MIT license (the LICENSE-MIT file) at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Containers that address their memory through allocator handles.
//!
//! Node-based containers (`List`, `TreeMap`, `TreeSet`, `HashMap`) are generic over a
//! `NodeAlloc` policy and store `NodePointer`s rather than references. Each container rebinds the
//! allocator it is given to its own node type, so one allocator value (and the segment behind it)
//! can serve many containers of different types.
//!
//! Contiguous containers (`Array`, `RingQueue`) grow a single buffer in a dynamic segment through
//! `segment_alloc::LinearAlloc`.
//!
//! Every operation that may allocate returns `Result<_, Exhausted>`. No container is thread-safe.

#[macro_use]
extern crate log;

pub mod array;
pub mod hash;
pub mod list;
pub mod ring;
pub mod set;
pub mod tree;
#[cfg(test)]
mod tests;

pub use crate::array::Array;
pub use crate::hash::{FnvHasher, HashMap};
pub use crate::list::List;
pub use crate::ring::RingQueue;
pub use crate::set::TreeSet;
pub use crate::tree::TreeMap;
